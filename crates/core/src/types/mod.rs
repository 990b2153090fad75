//! Core types for Pacandé.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{PriceError, RawPrice};
pub use role::{Role, RoleParseError};
pub use status::{ShipmentStatus, StatusParseError};
