//! Domain models for storefront.

pub mod product;
pub mod session;
pub mod shipment;
pub mod user;

pub use product::{Product, ProductDraft, ProductFilter};
pub use session::{Claims, CurrentUser};
pub use shipment::{DEFAULT_SHIPPING_METHOD, Shipment, ShipmentCursor, ShipmentItem};
pub use user::{NewUser, User, UserChanges};
