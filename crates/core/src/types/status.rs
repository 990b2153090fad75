//! Shipment status and its lifecycle.
//!
//! ```text
//! pendiente ──► enviado ──► entregado
//!     │
//!     └──────► cancelado
//! ```
//!
//! `entregado` and `cancelado` are terminal: no transition leaves them.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Delivery status of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.shipment_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    /// Created, awaiting dispatch.
    #[default]
    Pendiente,
    /// Handed to the carrier.
    Enviado,
    /// Delivered to the client.
    Entregado,
    /// Cancelled before dispatch.
    Cancelado,
}

/// Error returned when a status name is not one of the four states.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid shipment status: {0:?} (expected pendiente, enviado, entregado or cancelado)")]
pub struct StatusParseError(pub String);

impl ShipmentStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 4] = [
        Self::Pendiente,
        Self::Enviado,
        Self::Entregado,
        Self::Cancelado,
    ];

    /// The wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Enviado => "enviado",
            Self::Entregado => "entregado",
            Self::Cancelado => "cancelado",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Entregado | Self::Cancelado)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Self-transitions are not allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pendiente, Self::Enviado | Self::Cancelado) | (Self::Enviado, Self::Entregado)
        )
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pendiente" => Ok(Self::Pendiente),
            "enviado" => Ok(Self::Enviado),
            "entregado" => Ok(Self::Entregado),
            "cancelado" => Ok(Self::Cancelado),
            _ => Err(StatusParseError(s.to_owned())),
        }
    }
}
