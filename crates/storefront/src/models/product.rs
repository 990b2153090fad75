//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pacande_core::ProductId;
use pacande_core::cart::CartProduct;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long description.
    pub description: String,
    /// Unit price in the base currency unit.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Top-level category, e.g. `"mochilas"`.
    pub category: String,
    /// Optional subcategory.
    pub subcategory: Option<String>,
    /// Image URL.
    pub image_url: Option<String>,
    /// Advertised discount percentage (0-100). Display only; never applied
    /// to `price`.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub discount: Option<Decimal>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.name.clone(),
            price: product.price,
            image: product.image_url.clone(),
        }
    }
}

/// Validated product fields for create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    /// Display name, non-blank.
    pub name: String,
    /// Long description.
    pub description: String,
    /// Unit price, non-negative.
    pub price: Decimal,
    /// Category.
    pub category: String,
    /// Subcategory.
    pub subcategory: Option<String>,
    /// Image URL.
    pub image_url: Option<String>,
    /// Discount percentage, within 0-100.
    pub discount: Option<Decimal>,
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductFilter {
    /// Only products in this category.
    pub category: Option<String>,
    /// Only products in this subcategory.
    pub subcategory: Option<String>,
}

impl ProductFilter {
    /// Whether `product` passes the filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.category
            .as_deref()
            .is_none_or(|category| product.category == category)
            && self
                .subcategory
                .as_deref()
                .is_none_or(|sub| product.subcategory.as_deref() == Some(sub))
    }
}
