//! Price values as they arrive from clients and the catalog.
//!
//! Catalog prices are plain decimals. Carts built by older clients carry
//! display strings such as `"$40.000"` (Colombian thousands separators), so a
//! price is accepted either as a JSON number or as a string and normalised
//! by keeping only its digits.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price as supplied by a caller: a number or a formatted string.
///
/// `Text` is listed first so that strings are never parsed as decimals;
/// `"40.000"` means forty thousand, not forty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    /// A formatted price string, e.g. `"$40.000"`.
    Text(String),
    /// A numeric price.
    Amount(Decimal),
}

/// Why a raw price could not be normalised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The string contains no digits at all.
    #[error("price {0:?} contains no digits")]
    NoDigits(String),
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// Too many digits to represent.
    #[error("price is out of range")]
    OutOfRange,
}

impl RawPrice {
    /// Normalise to a non-negative decimal amount.
    ///
    /// Strings keep only their ASCII digits (`"$40.000"` → `40000`);
    /// numbers are taken as-is.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] if a string has no digits, the amount is
    /// negative, or the digits overflow a decimal.
    pub fn normalize(&self) -> Result<Decimal, PriceError> {
        match self {
            Self::Amount(amount) if amount.is_sign_negative() && !amount.is_zero() => {
                Err(PriceError::Negative)
            }
            Self::Amount(amount) => Ok(*amount),
            Self::Text(text) => {
                let digits: String = text.chars().filter(char::is_ascii_digit).collect();
                if digits.is_empty() {
                    return Err(PriceError::NoDigits(text.clone()));
                }
                digits
                    .parse::<Decimal>()
                    .map_err(|_| PriceError::OutOfRange)
            }
        }
    }
}

impl From<Decimal> for RawPrice {
    fn from(amount: Decimal) -> Self {
        Self::Amount(amount)
    }
}

impl From<&str> for RawPrice {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl fmt::Display for RawPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Amount(amount) => write!(f, "{amount}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_currency_formatting() {
        assert_eq!(RawPrice::from("$40.000").normalize().unwrap(), Decimal::from(40_000));
        assert_eq!(RawPrice::from("COP 1.250.000").normalize().unwrap(), Decimal::from(1_250_000));
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(
            RawPrice::Amount(Decimal::new(1999, 2)).normalize().unwrap(),
            Decimal::new(1999, 2)
        );
    }

    #[test]
    fn test_no_digits() {
        assert!(matches!(
            RawPrice::from("gratis").normalize(),
            Err(PriceError::NoDigits(_))
        ));
    }

    #[test]
    fn test_negative_amount() {
        assert_eq!(
            RawPrice::Amount(Decimal::from(-5)).normalize(),
            Err(PriceError::Negative)
        );
    }

    #[test]
    fn test_too_many_digits() {
        let huge = "9".repeat(40);
        assert_eq!(
            RawPrice::Text(huge).normalize(),
            Err(PriceError::OutOfRange)
        );
    }

    #[test]
    fn test_deserialize_string_and_number() {
        let text: RawPrice = serde_json::from_str("\"40.000\"").unwrap();
        assert_eq!(text.normalize().unwrap(), Decimal::from(40_000));

        let number: RawPrice = serde_json::from_str("100000").unwrap();
        assert_eq!(number.normalize().unwrap(), Decimal::from(100_000));
    }
}
