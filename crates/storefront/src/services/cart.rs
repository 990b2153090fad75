//! Server-held carts, totals and checkout.
//!
//! Carts live in an in-process cache keyed by user id and expire after a
//! period without access. Checkout turns the cart into a shipment and only
//! empties it once the shipment is stored.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::sync::Cache;
use serde::Serialize;
use thiserror::Error;

use pacande_core::access::Actor;
use pacande_core::cart::{CartError, CartItem, CartProduct, CartStorage, CartStore};
use pacande_core::pricing::{self, LineInput, PricingError, ShippingPolicy, Totals};
use pacande_core::{ProductId, UserId};

use crate::db::{ProductStore, RepositoryError};
use crate::models::Shipment;
use crate::services::payment::{PaymentDetails, PaymentError, PaymentReceipt, SimulatedPayments};
use crate::services::shipments::{DraftLine, ShipmentDraft, ShipmentError, ShipmentService};

/// Upper bound on carts held in memory.
const MAX_CARTS: u64 = 100_000;

/// [`CartStorage`] backed by a bounded moka cache with idle expiry.
#[derive(Clone)]
pub struct MokaCartStorage {
    carts: Cache<UserId, Vec<CartItem>>,
}

impl MokaCartStorage {
    /// Create a storage whose carts expire after `idle` without access.
    #[must_use]
    pub fn new(idle: Duration) -> Self {
        Self {
            carts: Cache::builder()
                .max_capacity(MAX_CARTS)
                .time_to_idle(idle)
                .build(),
        }
    }
}

impl CartStorage for MokaCartStorage {
    fn get(&self, user: UserId) -> Vec<CartItem> {
        self.carts.get(&user).unwrap_or_default()
    }

    fn set(&self, user: UserId, cart: Vec<CartItem>) {
        if cart.is_empty() {
            self.carts.invalidate(&user);
        } else {
            self.carts.insert(user, cart);
        }
    }
}

/// Errors from cart and checkout operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// Cart rule violated.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// A line could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Payment rejected.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Shipment creation failed.
    #[error(transparent)]
    Shipment(#[from] ShipmentError),

    /// The product to add does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// A checkout field is missing or invalid.
    #[error("{field}: {message}")]
    Validation {
        /// Wire name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: &'static str,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A cart with its totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    /// Lines in insertion order.
    pub items: Vec<CartItem>,
    /// Subtotal, shipping and grand total.
    pub totals: Totals,
}

/// Delivery and payment details for checkout.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Street address.
    pub address: String,
    /// City, appended to the address.
    pub city: Option<String>,
    /// Department or region, appended to the address.
    pub region: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Delivery notes.
    pub notes: Option<String>,
    /// Carrier or delivery method.
    pub shipping_method: Option<String>,
    /// How the order is paid.
    pub payment: PaymentDetails,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    /// The stored shipment.
    #[serde(rename = "envio")]
    pub shipment: Shipment,
    /// Payment summary.
    #[serde(rename = "pago")]
    pub payment: PaymentReceipt,
}

/// Cart service.
#[derive(Clone)]
pub struct CartService {
    storage: Arc<dyn CartStorage>,
    products: Arc<dyn ProductStore>,
    shipments: ShipmentService,
    payments: SimulatedPayments,
    shipping: ShippingPolicy,
}

impl CartService {
    /// Create a new cart service.
    #[must_use]
    pub fn new(
        storage: Arc<dyn CartStorage>,
        products: Arc<dyn ProductStore>,
        shipments: ShipmentService,
        payments: SimulatedPayments,
        shipping: ShippingPolicy,
    ) -> Self {
        Self {
            storage,
            products,
            shipments,
            payments,
            shipping,
        }
    }

    fn cart(&self, user: UserId) -> CartStore<'_, dyn CartStorage> {
        CartStore::new(self.storage.as_ref(), Some(user))
    }

    /// The user's cart lines.
    #[must_use]
    pub fn contents(&self, user: UserId) -> Vec<CartItem> {
        self.cart(user).contents()
    }

    /// Add `quantity` units of a catalog product.
    ///
    /// # Errors
    ///
    /// `ProductNotFound` for an unknown product, `Cart` for a zero quantity.
    pub async fn add(
        &self,
        user: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<CartItem>, CartServiceError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity.into());
        }
        let product = self
            .products
            .get_by_id(product_id)
            .await?
            .ok_or(CartServiceError::ProductNotFound(product_id))?;

        Ok(self.cart(user).add_item(CartProduct::from(&product), quantity)?)
    }

    /// Set the quantity of a line already in the cart.
    ///
    /// # Errors
    ///
    /// `Cart` for a zero quantity or a product not in the cart.
    pub fn update(
        &self,
        user: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<CartItem>, CartServiceError> {
        Ok(self.cart(user).update_quantity(product_id, quantity)?)
    }

    /// Remove a line. Absent products are ignored.
    ///
    /// # Errors
    ///
    /// Never in practice; the cart is always bound to a user here.
    pub fn remove(
        &self,
        user: UserId,
        product_id: ProductId,
    ) -> Result<Vec<CartItem>, CartServiceError> {
        Ok(self.cart(user).remove_item(product_id)?)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Never in practice; the cart is always bound to a user here.
    pub fn clear(&self, user: UserId) -> Result<(), CartServiceError> {
        Ok(self.cart(user).clear()?)
    }

    /// The cart priced at current catalog prices with the configured
    /// shipping policy.
    ///
    /// # Errors
    ///
    /// `Pricing` on overflow, `Repository` on storage failure.
    pub async fn totals(&self, user: UserId) -> Result<CartSummary, CartServiceError> {
        let cart = self.cart(user);
        let items = self.reprice(&cart).await?;
        let totals = pricing::calculate(&cart.lines(), &self.shipping)?;
        Ok(CartSummary { items, totals })
    }

    /// Bring the cart's name and price snapshots up to date with the
    /// catalog, dropping products that were removed from it.
    async fn reprice(
        &self,
        cart: &CartStore<'_, dyn CartStorage>,
    ) -> Result<Vec<CartItem>, CartServiceError> {
        let ids: Vec<ProductId> = cart.contents().iter().map(|item| item.product_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let catalog: HashMap<ProductId, CartProduct> = self
            .products
            .get_many(&ids)
            .await?
            .iter()
            .map(|product| (product.id, CartProduct::from(product)))
            .collect();

        let items = cart.reprice(|id| catalog.get(&id).cloned())?;
        if items.len() < ids.len() {
            tracing::info!(
                dropped = ids.len() - items.len(),
                "Removed cart lines for deleted products"
            );
        }
        Ok(items)
    }

    /// Price arbitrary lines with the configured shipping policy.
    ///
    /// # Errors
    ///
    /// `Pricing` naming the first bad line.
    pub fn quote(&self, lines: &[LineInput]) -> Result<Totals, CartServiceError> {
        Ok(pricing::calculate(lines, &self.shipping)?)
    }

    /// Pay for the cart and turn it into a shipment.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty cart or a blank address, `Payment` if the
    /// card is rejected, `Shipment` if the shipment cannot be created.
    pub async fn checkout(
        &self,
        requester: &Actor,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, CartServiceError> {
        let cart = self.cart(requester.id);
        let items = self.reprice(&cart).await?;
        if items.is_empty() {
            return Err(CartServiceError::Validation {
                field: "carrito",
                message: "el carrito está vacío",
            });
        }

        let address = compose_address(&request);
        if address.is_empty() {
            return Err(CartServiceError::Validation {
                field: "direccionEnvio",
                message: "la dirección de envío es obligatoria",
            });
        }

        let units = items
            .iter()
            .fold(0_u64, |sum, item| sum.saturating_add(u64::from(item.quantity)));
        let shipping_cost = self.shipping.cost_for(units)?;

        let receipt = self
            .payments
            .charge(&request.payment, Utc::now().date_naive())?;

        let draft = ShipmentDraft {
            client: Some(requester.id),
            shipping_address: address,
            items: items
                .iter()
                .map(|item| DraftLine {
                    product: item.product_id.to_string(),
                    quantity: i64::from(item.quantity),
                })
                .collect(),
            shipping_method: request.shipping_method,
            shipping_cost: Some(shipping_cost),
            phone: request.phone,
            notes: request.notes,
        };
        let shipment = self.shipments.create(requester, draft).await?;

        cart.clear()?;
        tracing::info!(
            shipment_id = %shipment.id,
            payment = receipt.method,
            "Checkout completed"
        );

        Ok(CheckoutOutcome {
            shipment,
            payment: receipt,
        })
    }
}

/// `address, city, region`, skipping blank parts.
fn compose_address(request: &CheckoutRequest) -> String {
    [
        Some(request.address.as_str()),
        request.city.as_deref(),
        request.region.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use pacande_core::cart::MemoryCartStorage;
    use pacande_core::{Role, ShipmentStatus};

    use super::*;
    use crate::db::Stores;
    use crate::models::{Product, ProductDraft};

    async fn setup(approval: f64) -> (CartService, Stores, Product) {
        let stores = Stores::in_memory();
        let product = stores
            .products
            .create(ProductDraft {
                name: "Mochila wayuu".to_owned(),
                description: String::new(),
                price: Decimal::from(100_000),
                category: "mochilas".to_owned(),
                subcategory: None,
                image_url: None,
                discount: None,
            })
            .await
            .unwrap();
        let shipments = ShipmentService::new(
            Arc::clone(&stores.shipments),
            Arc::clone(&stores.products),
            Arc::clone(&stores.users),
        );
        let service = CartService::new(
            Arc::new(MemoryCartStorage::new()),
            Arc::clone(&stores.products),
            shipments,
            SimulatedPayments::new(approval),
            ShippingPolicy::default(),
        );
        (service, stores, product)
    }

    fn checkout_request(payment: PaymentDetails) -> CheckoutRequest {
        CheckoutRequest {
            address: "Carrera 24 # 12-30".to_owned(),
            city: Some("Pasto".to_owned()),
            region: Some("Nariño".to_owned()),
            phone: Some("3001234567".to_owned()),
            notes: None,
            shipping_method: None,
            payment,
        }
    }

    fn card() -> PaymentDetails {
        PaymentDetails::Card {
            numero: "4111111111111111".to_owned(),
            titular: "Ana Pérez".to_owned(),
            vencimiento: "12/99".to_owned(),
            cvv: "123".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_totals_use_flat_shipping() {
        let (service, _, product) = setup(1.0).await;
        let user = UserId::generate();
        service.add(user, product.id, 2).await.unwrap();

        let summary = service.totals(user).await.unwrap();
        assert_eq!(summary.totals.subtotal, Decimal::from(200_000));
        assert_eq!(summary.totals.grand_total, Decimal::from(210_000));
    }

    #[tokio::test]
    async fn test_price_change_reaches_totals_and_checkout() {
        let (service, stores, product) = setup(1.0).await;
        let actor = Actor::new(UserId::generate(), Role::User);
        service.add(actor.id, product.id, 1).await.unwrap();

        stores
            .products
            .update(
                product.id,
                ProductDraft {
                    name: product.name.clone(),
                    description: String::new(),
                    price: Decimal::from(150_000),
                    category: product.category.clone(),
                    subcategory: None,
                    image_url: None,
                    discount: None,
                },
            )
            .await
            .unwrap();

        let summary = service.totals(actor.id).await.unwrap();
        assert_eq!(summary.items[0].price, Decimal::from(150_000));
        assert_eq!(summary.totals.grand_total, Decimal::from(160_000));

        let outcome = service
            .checkout(&actor, checkout_request(PaymentDetails::CashOnDelivery))
            .await
            .unwrap();
        assert_eq!(outcome.shipment.total, summary.totals.grand_total);
    }

    #[tokio::test]
    async fn test_deleted_product_leaves_cart() {
        let (service, stores, product) = setup(1.0).await;
        let actor = Actor::new(UserId::generate(), Role::User);
        service.add(actor.id, product.id, 1).await.unwrap();
        stores.products.delete(product.id).await.unwrap();

        let summary = service.totals(actor.id).await.unwrap();
        assert!(summary.items.is_empty());
        assert!(matches!(
            service
                .checkout(&actor, checkout_request(PaymentDetails::CashOnDelivery))
                .await,
            Err(CartServiceError::Validation { field: "carrito", .. })
        ));
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let (service, _, _) = setup(1.0).await;
        assert!(matches!(
            service.add(UserId::generate(), ProductId::generate(), 1).await,
            Err(CartServiceError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_checkout_creates_shipment_and_clears_cart() {
        let (service, _, product) = setup(1.0).await;
        let actor = Actor::new(UserId::generate(), Role::User);
        service.add(actor.id, product.id, 2).await.unwrap();

        let outcome = service
            .checkout(&actor, checkout_request(PaymentDetails::CashOnDelivery))
            .await
            .unwrap();

        assert_eq!(outcome.shipment.status, ShipmentStatus::Pendiente);
        assert_eq!(outcome.shipment.total, Decimal::from(210_000));
        assert_eq!(
            outcome.shipment.shipping_address,
            "Carrera 24 # 12-30, Pasto, Nariño"
        );
        assert!(service.contents(actor.id).is_empty());
    }

    #[tokio::test]
    async fn test_declined_card_keeps_cart() {
        let (service, stores, product) = setup(0.0).await;
        let actor = Actor::new(UserId::generate(), Role::User);
        service.add(actor.id, product.id, 1).await.unwrap();

        let err = service
            .checkout(&actor, checkout_request(card()))
            .await
            .unwrap_err();

        assert!(matches!(err, CartServiceError::Payment(PaymentError::Declined)));
        assert_eq!(service.contents(actor.id).len(), 1);
        assert!(stores.shipments.list_page(None, None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_checkout() {
        let (service, _, _) = setup(1.0).await;
        let actor = Actor::new(UserId::generate(), Role::User);
        assert!(matches!(
            service.checkout(&actor, checkout_request(card())).await,
            Err(CartServiceError::Validation { field: "carrito", .. })
        ));
    }

    #[test]
    fn test_moka_storage_drops_empty_carts() {
        let storage = MokaCartStorage::new(Duration::from_secs(60));
        let user = UserId::generate();
        let cart = CartStore::new(&storage, Some(user));
        cart.add_item(
            CartProduct {
                id: ProductId::generate(),
                title: "Ruana".to_owned(),
                price: Decimal::from(90_000),
                image: None,
            },
            1,
        )
        .unwrap();
        assert_eq!(storage.get(user).len(), 1);

        cart.clear().unwrap();
        assert!(storage.get(user).is_empty());
    }
}
