//! Order totals: subtotal, shipping and grand total.
//!
//! Everything here is pure decimal arithmetic. Amounts are in the store's
//! base currency unit; no rounding is applied.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{PriceError, RawPrice};

/// One priced line of an order or cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    /// Human-readable name used in error messages.
    pub label: String,
    /// Unit price, numeric or formatted.
    pub price: RawPrice,
    /// Number of units, at least 1.
    pub quantity: u32,
}

impl LineInput {
    /// Build a line from a catalog price.
    #[must_use]
    pub fn new(label: impl Into<String>, price: impl Into<RawPrice>, quantity: u32) -> Self {
        Self {
            label: label.into(),
            price: price.into(),
            quantity,
        }
    }
}

/// Errors produced while pricing an order.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// A line's price could not be normalised.
    #[error("invalid price for {item}: {source}")]
    InvalidPrice {
        /// Label of the offending line.
        item: String,
        /// Underlying normalisation error.
        source: PriceError,
    },
    /// A line has quantity zero.
    #[error("invalid quantity for {item}: must be at least 1")]
    InvalidQuantity {
        /// Label of the offending line.
        item: String,
    },
    /// The total does not fit in a decimal.
    #[error("order total overflows")]
    Overflow,
}

/// How shipping is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ShippingPolicy {
    /// One fixed cost per order.
    Flat {
        /// Cost charged regardless of contents.
        cost: Decimal,
    },
    /// A base cost covering `free_units` units, plus a surcharge per extra unit.
    Tiered {
        /// Cost for orders up to `free_units` units.
        base: Decimal,
        /// Units included in the base cost.
        free_units: u32,
        /// Charge for every unit beyond `free_units`.
        unit_surcharge: Decimal,
    },
}

impl ShippingPolicy {
    /// Default flat shipping cost.
    pub const DEFAULT_FLAT_COST: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

    /// Shipping cost for an order containing `units` units in total.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if the tiered surcharge overflows.
    pub fn cost_for(&self, units: u64) -> Result<Decimal, PricingError> {
        match *self {
            Self::Flat { cost } => Ok(cost),
            Self::Tiered {
                base,
                free_units,
                unit_surcharge,
            } => {
                let extra = units.saturating_sub(u64::from(free_units));
                unit_surcharge
                    .checked_mul(Decimal::from(extra))
                    .and_then(|surcharge| base.checked_add(surcharge))
                    .ok_or(PricingError::Overflow)
            }
        }
    }
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self::Flat {
            cost: Self::DEFAULT_FLAT_COST,
        }
    }
}

/// The computed totals of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Sum of price × quantity over all lines.
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    /// Shipping charged for the order.
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
    /// `subtotal + shipping_cost`.
    #[serde(with = "rust_decimal::serde::float")]
    pub grand_total: Decimal,
    /// Total number of units.
    pub units: u64,
}

impl Totals {
    /// Combine a subtotal with an explicit shipping cost.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if the sum overflows.
    pub fn with_shipping(
        subtotal: Decimal,
        shipping_cost: Decimal,
        units: u64,
    ) -> Result<Self, PricingError> {
        let grand_total = subtotal
            .checked_add(shipping_cost)
            .ok_or(PricingError::Overflow)?;
        Ok(Self {
            subtotal,
            shipping_cost,
            grand_total,
            units,
        })
    }
}

/// Sum of price × quantity over `lines`, with the total unit count.
///
/// # Errors
///
/// Returns [`PricingError::InvalidPrice`] or [`PricingError::InvalidQuantity`]
/// naming the first bad line, or [`PricingError::Overflow`].
pub fn subtotal(lines: &[LineInput]) -> Result<(Decimal, u64), PricingError> {
    lines
        .iter()
        .try_fold((Decimal::ZERO, 0_u64), |(sum, units), line| {
            if line.quantity == 0 {
                return Err(PricingError::InvalidQuantity {
                    item: line.label.clone(),
                });
            }
            let price = line
                .price
                .normalize()
                .map_err(|source| PricingError::InvalidPrice {
                    item: line.label.clone(),
                    source,
                })?;
            let amount = price
                .checked_mul(Decimal::from(line.quantity))
                .and_then(|line_total| sum.checked_add(line_total))
                .ok_or(PricingError::Overflow)?;
            Ok((amount, units.saturating_add(u64::from(line.quantity))))
        })
}

/// Price `lines` and charge shipping according to `policy`.
///
/// # Errors
///
/// See [`subtotal`] and [`ShippingPolicy::cost_for`].
pub fn calculate(lines: &[LineInput], policy: &ShippingPolicy) -> Result<Totals, PricingError> {
    let (subtotal, units) = subtotal(lines)?;
    let shipping = policy.cost_for(units)?;
    Totals::with_shipping(subtotal, shipping, units)
}
