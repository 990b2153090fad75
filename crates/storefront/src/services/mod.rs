//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login, bearer tokens and self-service profile
//! - `cart` - Server-held carts, totals, quotes and checkout
//! - `payment` - Simulated payment processor
//! - `products` - Product catalog
//! - `shipments` - Shipment lifecycle
//! - `users` - Account administration and step-up confirmation
//!
//! Services own their validation and authorization and never see HTTP types.

pub mod auth;
pub mod cart;
pub mod payment;
pub mod products;
pub mod shipments;
pub mod users;
