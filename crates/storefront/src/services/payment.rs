//! Simulated payment.
//!
//! There is no gateway: cash on delivery always succeeds, cards are checked
//! for shape and then approved at random with a configured probability.

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payment details submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "metodoPago", deny_unknown_fields)]
pub enum PaymentDetails {
    /// Credit or debit card.
    #[serde(rename = "tarjeta", alias = "card")]
    Card {
        /// 16 digits, spaces allowed.
        numero: String,
        /// Cardholder name.
        titular: String,
        /// Expiry as `MM/YY`.
        vencimiento: String,
        /// 3 or 4 digits.
        cvv: String,
    },
    /// Cash on delivery.
    #[serde(rename = "contraEntrega", alias = "cash")]
    CashOnDelivery,
}

/// What was charged, safe to echo back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentReceipt {
    /// `tarjeta` or `contraEntrega`.
    #[serde(rename = "metodoPago")]
    pub method: &'static str,
    /// Last four card digits.
    #[serde(rename = "ultimosDigitos", skip_serializing_if = "Option::is_none")]
    pub last_digits: Option<String>,
}

/// Errors from the simulated processor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// A card field is malformed.
    #[error("{field}: {message}")]
    InvalidCard {
        /// Wire name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: &'static str,
    },
    /// The card was declined.
    #[error("tarjeta rechazada: fondos insuficientes")]
    Declined,
}

/// Random-approval card processor.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedPayments {
    approval_rate: f64,
}

impl SimulatedPayments {
    /// Approve cards with probability `approval_rate`, clamped to `[0, 1]`.
    #[must_use]
    pub fn new(approval_rate: f64) -> Self {
        let approval_rate = if approval_rate.is_nan() {
            0.0
        } else {
            approval_rate.clamp(0.0, 1.0)
        };
        Self { approval_rate }
    }

    /// Charge `details` as of `today`.
    ///
    /// # Errors
    ///
    /// `InvalidCard` for malformed card data, `Declined` when the simulated
    /// issuer refuses.
    pub fn charge(
        &self,
        details: &PaymentDetails,
        today: NaiveDate,
    ) -> Result<PaymentReceipt, PaymentError> {
        match details {
            PaymentDetails::CashOnDelivery => Ok(PaymentReceipt {
                method: "contraEntrega",
                last_digits: None,
            }),
            PaymentDetails::Card {
                numero,
                titular,
                vencimiento,
                cvv,
            } => {
                let number = validate_card(numero, titular, vencimiento, cvv, today)?;
                if !rand::rng().random_bool(self.approval_rate) {
                    tracing::info!("Simulated card payment declined");
                    return Err(PaymentError::Declined);
                }
                Ok(PaymentReceipt {
                    method: "tarjeta",
                    last_digits: number.get(12..).map(str::to_owned),
                })
            }
        }
    }
}

/// Check card shape and return the number without whitespace.
fn validate_card(
    number: &str,
    holder: &str,
    expiry: &str,
    cvv: &str,
    today: NaiveDate,
) -> Result<String, PaymentError> {
    let number: String = number.chars().filter(|c| !c.is_whitespace()).collect();
    if number.len() != 16 || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::InvalidCard {
            field: "pago.numero",
            message: "el número de tarjeta debe tener 16 dígitos",
        });
    }

    let holder = holder.trim();
    if holder.chars().count() < 3
        || !holder
            .chars()
            .all(|c| c.is_alphabetic() || c.is_whitespace())
    {
        return Err(PaymentError::InvalidCard {
            field: "pago.titular",
            message: "nombre de titular inválido",
        });
    }

    if !expiry_is_valid(expiry, today) {
        return Err(PaymentError::InvalidCard {
            field: "pago.vencimiento",
            message: "fecha de vencimiento inválida",
        });
    }

    if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(PaymentError::InvalidCard {
            field: "pago.cvv",
            message: "CVV inválido",
        });
    }

    Ok(number)
}

/// `MM/YY`, valid through the end of that month.
fn expiry_is_valid(expiry: &str, today: NaiveDate) -> bool {
    let Some((month, year)) = expiry.trim().split_once('/') else {
        return false;
    };
    let (Ok(month), Ok(year)) = (month.trim().parse::<u32>(), year.trim().parse::<i32>()) else {
        return false;
    };
    if !(1..=12).contains(&month) || !(0..100).contains(&year) {
        return false;
    }

    let current_year = today.year() % 100;
    year > current_year || (year == current_year && month >= today.month())
}
