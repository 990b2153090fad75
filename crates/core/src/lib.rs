//! Pacandé Core - Domain types and rules.
//!
//! This crate provides the pieces shared by every Pacandé component:
//! - `storefront` - The JSON API serving the shop, carts and shipments
//! - `cli` - Command-line tools for migrations and bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no
//! database access, no HTTP. Pricing, the cart, the shipment lifecycle and
//! the authorization rules can all be tested without any infrastructure.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, roles, statuses and prices
//! - [`pricing`] - Subtotal, shipping policy and grand total
//! - [`cart`] - Per-user cart over a keyed storage
//! - [`access`] - Role checks for shipments and account management

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod cart;
pub mod pricing;
pub mod types;

pub use types::*;
