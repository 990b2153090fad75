//! Product catalog: public reads, Admin-only writes.

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use pacande_core::access::{self, AccessError, Actor};
use pacande_core::{ProductId, RawPrice, Role};

use crate::db::{ProductStore, RepositoryError};
use crate::models::{Product, ProductDraft, ProductFilter};

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum ProductError {
    /// A request field is missing or invalid.
    #[error("{field}: {message}")]
    Validation {
        /// Wire name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The requester may not perform this operation.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// No product with this id.
    #[error("product not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Product fields as submitted, before validation.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    /// Display name.
    pub name: String,
    /// Long description.
    pub description: Option<String>,
    /// Unit price, numeric or formatted.
    pub price: Option<RawPrice>,
    /// Category.
    pub category: String,
    /// Subcategory.
    pub subcategory: Option<String>,
    /// Image URL.
    pub image_url: Option<String>,
    /// Discount percentage.
    pub discount: Option<Decimal>,
}

impl ProductInput {
    fn validate(self) -> Result<ProductDraft, ProductError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ProductError::Validation {
                field: "name",
                message: "el nombre es obligatorio".to_owned(),
            });
        }
        let category = self.category.trim();
        if category.is_empty() {
            return Err(ProductError::Validation {
                field: "category",
                message: "la categoría es obligatoria".to_owned(),
            });
        }
        let price = self
            .price
            .ok_or_else(|| ProductError::Validation {
                field: "price",
                message: "el precio es obligatorio".to_owned(),
            })?
            .normalize()
            .map_err(|e| ProductError::Validation {
                field: "price",
                message: e.to_string(),
            })?;
        if self
            .discount
            .is_some_and(|discount| !(Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&discount))
        {
            return Err(ProductError::Validation {
                field: "discount",
                message: "el descuento debe estar entre 0 y 100".to_owned(),
            });
        }

        Ok(ProductDraft {
            name: name.to_owned(),
            description: self.description.unwrap_or_default().trim().to_owned(),
            price,
            category: category.to_owned(),
            subcategory: self
                .subcategory
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty()),
            image_url: self
                .image_url
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty()),
            discount: self.discount,
        })
    }
}

/// Catalog service.
#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductStore>,
}

impl ProductService {
    /// Create a new catalog service.
    #[must_use]
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }

    /// Products matching `filter`.
    ///
    /// # Errors
    ///
    /// `Repository` on storage failure.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, ProductError> {
        Ok(self.products.list(filter).await?)
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent.
    pub async fn get(&self, id: ProductId) -> Result<Product, ProductError> {
        self.products
            .get_by_id(id)
            .await?
            .ok_or(ProductError::NotFound)
    }

    /// Add a product to the catalog.
    ///
    /// # Errors
    ///
    /// `Access` below Admin, `Validation` for bad fields.
    pub async fn create(&self, requester: &Actor, input: ProductInput) -> Result<Product, ProductError> {
        access::require_role(Some(requester), Role::Admin)?;
        let draft = input.validate()?;
        let product = self.products.create(draft).await?;
        tracing::info!(product_id = %product.id, actor_id = %requester.id, "Product created");
        Ok(product)
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// `Access` below Admin, `Validation`, or `NotFound`.
    pub async fn update(
        &self,
        requester: &Actor,
        id: ProductId,
        input: ProductInput,
    ) -> Result<Product, ProductError> {
        access::require_role(Some(requester), Role::Admin)?;
        let draft = input.validate()?;
        self.products
            .update(id, draft)
            .await?
            .ok_or(ProductError::NotFound)
    }

    /// Remove a product. Existing shipments keep their snapshot.
    ///
    /// # Errors
    ///
    /// `Access` below Admin, `NotFound` if absent.
    pub async fn delete(&self, requester: &Actor, id: ProductId) -> Result<(), ProductError> {
        access::require_role(Some(requester), Role::Admin)?;
        if !self.products.delete(id).await? {
            return Err(ProductError::NotFound);
        }
        tracing::info!(product_id = %id, actor_id = %requester.id, "Product deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pacande_core::UserId;

    use super::*;
    use crate::db::memory::MemoryProductStore;

    fn service() -> ProductService {
        ProductService::new(Arc::new(MemoryProductStore::default()))
    }

    fn input(price: &str) -> ProductInput {
        ProductInput {
            name: "Sombrero".to_owned(),
            description: Some("Sombrero de paja toquilla".to_owned()),
            price: Some(RawPrice::from(price)),
            category: "sombreros".to_owned(),
            ..ProductInput::default()
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_price() {
        let admin = Actor::new(UserId::generate(), Role::Admin);
        let product = service().create(&admin, input("$85.000")).await.unwrap();
        assert_eq!(product.price, Decimal::from(85_000));
    }

    #[tokio::test]
    async fn test_users_cannot_write() {
        let user = Actor::new(UserId::generate(), Role::User);
        assert!(matches!(
            service().create(&user, input("1000")).await,
            Err(ProductError::Access(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_blank_name() {
        let admin = Actor::new(UserId::generate(), Role::Admin);
        let mut blank = input("1000");
        blank.name = "  ".to_owned();
        assert!(matches!(
            service().create(&admin, blank).await,
            Err(ProductError::Validation { field: "name", .. })
        ));
    }

    #[tokio::test]
    async fn test_discount_range() {
        let admin = Actor::new(UserId::generate(), Role::Admin);
        let service = service();

        let mut on_sale = input("1000");
        on_sale.discount = Some(Decimal::from(25));
        let product = service.create(&admin, on_sale).await.unwrap();
        assert_eq!(product.discount, Some(Decimal::from(25)));

        for bad in [Decimal::from(-1), Decimal::from(101)] {
            let mut out_of_range = input("1000");
            out_of_range.discount = Some(bad);
            assert!(matches!(
                service.create(&admin, out_of_range).await,
                Err(ProductError::Validation { field: "discount", .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_filter_by_category() {
        let admin = Actor::new(UserId::generate(), Role::Admin);
        let service = service();
        service.create(&admin, input("1000")).await.unwrap();
        let mut bag = input("2000");
        bag.category = "mochilas".to_owned();
        service.create(&admin, bag).await.unwrap();

        let filter = ProductFilter {
            category: Some("mochilas".to_owned()),
            subcategory: None,
        };
        let listed = service.list(&filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].category, "mochilas");
    }
}
