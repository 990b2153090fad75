//! Shipment domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pacande_core::{ProductId, ShipmentId, ShipmentStatus, UserId};

/// Shipping method used when the client does not choose one.
pub const DEFAULT_SHIPPING_METHOD: &str = "mensajería";

/// One product line of a shipment, with the catalog price at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentItem {
    /// Product reference.
    #[serde(rename = "producto")]
    pub product_id: ProductId,
    /// Product name at creation.
    #[serde(rename = "nombre")]
    pub name: String,
    /// Units shipped, at least 1.
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    /// Unit price snapshot.
    #[serde(rename = "precio", with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

/// A persisted order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shipment {
    /// Shipment ID.
    pub id: ShipmentId,
    /// Owning client.
    #[serde(rename = "cliente")]
    pub client_id: UserId,
    /// Delivery address.
    #[serde(rename = "direccionEnvio")]
    pub shipping_address: String,
    /// Contact phone.
    #[serde(rename = "telefono")]
    pub phone: Option<String>,
    /// Delivery notes.
    #[serde(rename = "notasAdicionales")]
    pub notes: Option<String>,
    /// Creation time; listings are ordered by it, newest first.
    #[serde(rename = "fechaEnvio")]
    pub ship_date: DateTime<Utc>,
    /// Lifecycle state.
    #[serde(rename = "estado")]
    pub status: ShipmentStatus,
    /// Ordered, non-empty product lines.
    #[serde(rename = "productos")]
    pub items: Vec<ShipmentItem>,
    /// Carrier or delivery method.
    #[serde(rename = "metodoEnvio")]
    pub shipping_method: String,
    /// Shipping charge.
    #[serde(rename = "costoEnvio", with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
    /// Items plus shipping, computed at creation.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl Shipment {
    /// Keyset position of this shipment in a newest-first listing.
    #[must_use]
    pub const fn cursor(&self) -> ShipmentCursor {
        ShipmentCursor {
            ship_date: self.ship_date,
            id: self.id,
        }
    }
}

/// Position in a listing ordered by `(ship_date, id)` descending.
///
/// A page "after" a cursor holds strictly older shipments (ties broken by id).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipmentCursor {
    /// Ship date of the last row seen.
    pub ship_date: DateTime<Utc>,
    /// Id of the last row seen.
    pub id: ShipmentId,
}

impl ShipmentCursor {
    /// Whether `shipment` sorts after this cursor in newest-first order.
    #[must_use]
    pub fn precedes(&self, shipment: &Shipment) -> bool {
        (shipment.ship_date, shipment.id) < (self.ship_date, self.id)
    }
}
