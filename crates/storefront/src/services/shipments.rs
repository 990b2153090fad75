//! Shipment lifecycle: creation, role-scoped queries and status transitions.
//!
//! Authorization and validation always run before the store is written;
//! a rejected request leaves nothing behind.

use std::collections::HashMap;
use std::sync::Arc;

use async_stream::stream;
use chrono::Utc;
use futures::{Stream, StreamExt};
use rust_decimal::Decimal;
use thiserror::Error;

use pacande_core::access::{self, AccessError, Actor};
use pacande_core::pricing::{self, LineInput, PricingError, Totals};
use pacande_core::{ProductId, Role, ShipmentId, ShipmentStatus, UserId};

use crate::db::{ProductStore, RepositoryError, ShipmentStore, UserStore};
use crate::models::{DEFAULT_SHIPPING_METHOD, Product, Shipment, ShipmentCursor, ShipmentItem};

/// Rows fetched per store round trip when streaming a listing.
pub const LISTING_PAGE_SIZE: u32 = 50;

/// Errors from shipment operations.
#[derive(Debug, Error)]
pub enum ShipmentError {
    /// A request field is missing or invalid.
    #[error("{field}: {message}")]
    Validation {
        /// Wire name of the offending field, e.g. `productos[0].cantidad`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The requester may not perform this operation.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// No shipment with this id.
    #[error("shipment not found")]
    NotFound,

    /// The state machine does not allow this transition.
    #[error("cannot change status from {from} to {to}")]
    InvalidTransition {
        /// Status at the time of the request.
        from: ShipmentStatus,
        /// Requested status.
        to: ShipmentStatus,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ShipmentError {
    fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// One requested product line. Quantities are signed so that zero and
/// negative values can be reported rather than rejected by the decoder.
#[derive(Debug, Clone)]
pub struct DraftLine {
    /// Product id as sent by the client.
    pub product: String,
    /// Requested units.
    pub quantity: i64,
}

/// A shipment as requested by a client, before validation.
#[derive(Debug, Clone, Default)]
pub struct ShipmentDraft {
    /// Owning client; defaults to the requester.
    pub client: Option<UserId>,
    /// Delivery address.
    pub shipping_address: String,
    /// Product lines in order.
    pub items: Vec<DraftLine>,
    /// Carrier or delivery method.
    pub shipping_method: Option<String>,
    /// Shipping charge.
    pub shipping_cost: Option<Decimal>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Delivery notes.
    pub notes: Option<String>,
}

/// Shipment lifecycle service.
#[derive(Clone)]
pub struct ShipmentService {
    shipments: Arc<dyn ShipmentStore>,
    products: Arc<dyn ProductStore>,
    users: Arc<dyn UserStore>,
}

impl ShipmentService {
    /// Create a new shipment service.
    #[must_use]
    pub fn new(
        shipments: Arc<dyn ShipmentStore>,
        products: Arc<dyn ProductStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            shipments,
            products,
            users,
        }
    }

    /// Validate, price and persist a new shipment in state `pendiente`.
    ///
    /// # Errors
    ///
    /// `Access` if a regular user targets another client, `Validation`
    /// naming the first bad field, or `Repository`.
    pub async fn create(
        &self,
        requester: &Actor,
        draft: ShipmentDraft,
    ) -> Result<Shipment, ShipmentError> {
        let client_id = self.resolve_client(requester, draft.client).await?;

        let shipping_address = draft.shipping_address.trim();
        if shipping_address.is_empty() {
            return Err(ShipmentError::validation(
                "direccionEnvio",
                "la dirección de envío es obligatoria",
            ));
        }

        let items = self.resolve_items(&draft.items).await?;

        let shipping_cost = draft.shipping_cost.ok_or_else(|| {
            ShipmentError::validation("costoEnvio", "el costo de envío es obligatorio")
        })?;
        if shipping_cost.is_sign_negative() && !shipping_cost.is_zero() {
            return Err(ShipmentError::validation(
                "costoEnvio",
                "el costo de envío no puede ser negativo",
            ));
        }

        let totals = price_items(&items, shipping_cost)?;

        let shipment = Shipment {
            id: ShipmentId::generate(),
            client_id,
            shipping_address: shipping_address.to_owned(),
            phone: non_blank(draft.phone),
            notes: non_blank(draft.notes),
            ship_date: Utc::now(),
            status: ShipmentStatus::Pendiente,
            items,
            shipping_method: non_blank(draft.shipping_method)
                .unwrap_or_else(|| DEFAULT_SHIPPING_METHOD.to_owned()),
            shipping_cost,
            total: totals.grand_total,
        };

        self.shipments.insert(&shipment).await?;

        tracing::info!(
            shipment_id = %shipment.id,
            client_id = %shipment.client_id,
            total = %shipment.total,
            "Shipment created"
        );
        Ok(shipment)
    }

    async fn resolve_client(
        &self,
        requester: &Actor,
        requested: Option<UserId>,
    ) -> Result<UserId, ShipmentError> {
        match requested {
            None => Ok(requester.id),
            Some(client) if client == requester.id => Ok(client),
            Some(_) if !requester.role.at_least(Role::Admin) => Err(AccessError::Forbidden(
                "users may only create shipments for themselves",
            )
            .into()),
            Some(client) => match self.users.get_by_id(client).await? {
                Some(_) => Ok(client),
                None => Err(ShipmentError::validation("cliente", "el cliente no existe")),
            },
        }
    }

    /// Check every line and snapshot catalog names and prices.
    async fn resolve_items(&self, lines: &[DraftLine]) -> Result<Vec<ShipmentItem>, ShipmentError> {
        if lines.is_empty() {
            return Err(ShipmentError::validation(
                "productos",
                "debe incluir al menos un producto",
            ));
        }

        let mut parsed = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            let quantity = u32::try_from(line.quantity)
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| {
                    ShipmentError::validation(
                        format!("productos[{index}].cantidad"),
                        "la cantidad debe ser mayor que cero",
                    )
                })?;
            let product_id: ProductId = line.product.parse().map_err(|_| {
                ShipmentError::validation(
                    format!("productos[{index}].producto"),
                    "identificador de producto inválido",
                )
            })?;
            parsed.push((product_id, quantity));
        }

        let ids: Vec<ProductId> = parsed.iter().map(|(id, _)| *id).collect();
        let catalog: HashMap<ProductId, Product> = self
            .products
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        parsed
            .into_iter()
            .enumerate()
            .map(|(index, (product_id, quantity))| {
                let product = catalog.get(&product_id).ok_or_else(|| {
                    ShipmentError::validation(
                        format!("productos[{index}].producto"),
                        "el producto no existe",
                    )
                })?;
                Ok(ShipmentItem {
                    product_id,
                    name: product.name.clone(),
                    quantity,
                    unit_price: product.price,
                })
            })
            .collect()
    }

    /// Shipments visible to `requester`, newest first.
    ///
    /// Regular users always get their own shipments, whatever `client` says.
    #[must_use]
    pub fn list(&self, requester: &Actor, client: Option<UserId>) -> ShipmentListing {
        ShipmentListing {
            store: Arc::clone(&self.shipments),
            client: access::scope_shipment_listing(requester, client),
            page_size: LISTING_PAGE_SIZE,
        }
    }

    /// Fetch one shipment.
    ///
    /// # Errors
    ///
    /// `NotFound` if absent, `Access` if a regular user does not own it.
    pub async fn get(&self, requester: &Actor, id: ShipmentId) -> Result<Shipment, ShipmentError> {
        let shipment = self
            .shipments
            .get_by_id(id)
            .await?
            .ok_or(ShipmentError::NotFound)?;
        access::authorize_shipment_read(requester, shipment.client_id)?;
        Ok(shipment)
    }

    /// Move a shipment to `status`.
    ///
    /// # Errors
    ///
    /// `Access` below Admin, `NotFound`, or `InvalidTransition` if the state
    /// machine forbids the move or another request changed the status first.
    pub async fn update_status(
        &self,
        requester: &Actor,
        id: ShipmentId,
        status: ShipmentStatus,
    ) -> Result<Shipment, ShipmentError> {
        access::require_role(Some(requester), Role::Admin)?;

        let current = self
            .shipments
            .get_by_id(id)
            .await?
            .ok_or(ShipmentError::NotFound)?;

        if !current.status.can_transition_to(status) {
            return Err(ShipmentError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let Some(updated) = self
            .shipments
            .update_status(id, current.status, status)
            .await?
        else {
            let now = self
                .shipments
                .get_by_id(id)
                .await?
                .ok_or(ShipmentError::NotFound)?;
            return Err(ShipmentError::InvalidTransition {
                from: now.status,
                to: status,
            });
        };

        tracing::info!(
            shipment_id = %id,
            from = %current.status,
            to = %status,
            actor_id = %requester.id,
            "Shipment status changed"
        );
        Ok(updated)
    }

    /// Delete a shipment.
    ///
    /// # Errors
    ///
    /// `Access` below Admin, `NotFound` if absent.
    pub async fn delete(&self, requester: &Actor, id: ShipmentId) -> Result<(), ShipmentError> {
        access::require_role(Some(requester), Role::Admin)?;

        if !self.shipments.delete(id).await? {
            return Err(ShipmentError::NotFound);
        }

        tracing::info!(shipment_id = %id, actor_id = %requester.id, "Shipment deleted");
        Ok(())
    }
}

fn price_items(items: &[ShipmentItem], shipping_cost: Decimal) -> Result<Totals, ShipmentError> {
    let lines: Vec<LineInput> = items
        .iter()
        .map(|item| LineInput::new(item.name.clone(), item.unit_price, item.quantity))
        .collect();

    let (subtotal, units) = pricing::subtotal(&lines).map_err(pricing_error)?;
    Totals::with_shipping(subtotal, shipping_cost, units).map_err(pricing_error)
}

fn pricing_error(err: PricingError) -> ShipmentError {
    ShipmentError::validation("productos", err.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// A lazy, restartable listing of shipments.
///
/// Nothing is read until [`ShipmentListing::stream`] is polled; each call to
/// `stream` starts again from the newest shipment.
#[derive(Clone)]
pub struct ShipmentListing {
    store: Arc<dyn ShipmentStore>,
    client: Option<UserId>,
    page_size: u32,
}

impl ShipmentListing {
    /// Client filter actually applied.
    #[must_use]
    pub const fn client(&self) -> Option<UserId> {
        self.client
    }

    /// Use a different page size (minimum 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Stream shipments newest first, fetching one page at a time.
    pub fn stream(&self) -> impl Stream<Item = Result<Shipment, ShipmentError>> + Send + '_ {
        stream! {
            let mut after: Option<ShipmentCursor> = None;
            loop {
                let page = match self.store.list_page(self.client, after, self.page_size).await {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(ShipmentError::Repository(e));
                        break;
                    }
                };

                let full = u32::try_from(page.len()).is_ok_and(|n| n >= self.page_size);
                after = page.last().map(Shipment::cursor);
                for shipment in page {
                    yield Ok(shipment);
                }
                if !full {
                    break;
                }
            }
        }
    }

    /// Drain the stream into a vector.
    ///
    /// # Errors
    ///
    /// The first repository error encountered.
    pub async fn collect(&self) -> Result<Vec<Shipment>, ShipmentError> {
        let mut shipments = Vec::new();
        let mut stream = std::pin::pin!(self.stream());
        while let Some(shipment) = stream.next().await {
            shipments.push(shipment?);
        }
        Ok(shipments)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::Stores;
    use crate::models::ProductDraft;

    async fn setup() -> (ShipmentService, Stores, Product) {
        let stores = Stores::in_memory();
        let product = stores
            .products
            .create(ProductDraft {
                name: "Mochila".to_owned(),
                description: "Mochila tejida".to_owned(),
                price: Decimal::from(100_000),
                category: "mochilas".to_owned(),
                subcategory: None,
                image_url: None,
                discount: None,
            })
            .await
            .unwrap();
        let service = ShipmentService::new(
            Arc::clone(&stores.shipments),
            Arc::clone(&stores.products),
            Arc::clone(&stores.users),
        );
        (service, stores, product)
    }

    fn draft(product: &Product, quantity: i64) -> ShipmentDraft {
        ShipmentDraft {
            shipping_address: "Calle 18 # 25-40, Pasto".to_owned(),
            items: vec![DraftLine {
                product: product.id.to_string(),
                quantity,
            }],
            shipping_cost: Some(Decimal::from(10_000)),
            ..ShipmentDraft::default()
        }
    }

    fn actor(role: Role) -> Actor {
        Actor::new(UserId::generate(), role)
    }

    #[tokio::test]
    async fn test_create_computes_total_from_catalog() {
        let (service, _, product) = setup().await;
        let user = actor(Role::User);

        let shipment = service.create(&user, draft(&product, 2)).await.unwrap();

        assert_eq!(shipment.total, Decimal::from(210_000));
        assert_eq!(shipment.status, ShipmentStatus::Pendiente);
        assert_eq!(shipment.client_id, user.id);
        assert_eq!(shipment.shipping_method, DEFAULT_SHIPPING_METHOD);
        assert_eq!(shipment.items[0].unit_price, Decimal::from(100_000));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_items_without_writing() {
        let (service, stores, product) = setup().await;
        let user = actor(Role::User);
        let mut empty = draft(&product, 1);
        empty.items.clear();

        let err = service.create(&user, empty).await.unwrap_err();
        assert!(matches!(err, ShipmentError::Validation { ref field, .. } if field == "productos"));
        assert!(stores.shipments.list_page(None, None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_names_bad_line() {
        let (service, _, product) = setup().await;
        let err = service
            .create(&actor(Role::User), draft(&product, 0))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ShipmentError::Validation { ref field, .. } if field == "productos[0].cantidad")
        );

        let mut unknown = draft(&product, 1);
        unknown.items[0].product = ProductId::generate().to_string();
        let err = service.create(&actor(Role::User), unknown).await.unwrap_err();
        assert!(
            matches!(err, ShipmentError::Validation { ref field, .. } if field == "productos[0].producto")
        );
    }

    #[tokio::test]
    async fn test_create_rejects_negative_shipping() {
        let (service, _, product) = setup().await;
        let mut negative = draft(&product, 1);
        negative.shipping_cost = Some(Decimal::from(-1));

        let err = service.create(&actor(Role::User), negative).await.unwrap_err();
        assert!(matches!(err, ShipmentError::Validation { ref field, .. } if field == "costoEnvio"));
    }

    #[tokio::test]
    async fn test_user_cannot_create_for_someone_else() {
        let (service, _, product) = setup().await;
        let mut other = draft(&product, 1);
        other.client = Some(UserId::generate());

        let err = service.create(&actor(Role::User), other).await.unwrap_err();
        assert!(matches!(err, ShipmentError::Access(AccessError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_listing_is_scoped_for_users() {
        let (service, _, product) = setup().await;
        let ana = actor(Role::User);
        let luis = actor(Role::User);
        service.create(&ana, draft(&product, 1)).await.unwrap();
        service.create(&luis, draft(&product, 1)).await.unwrap();

        let listed = service.list(&ana, Some(luis.id)).collect().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].client_id, ana.id);

        let all = service.list(&actor(Role::Admin), None).collect().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_listing_streams_across_pages() {
        let (service, _, product) = setup().await;
        let ana = actor(Role::User);
        for _ in 0..5 {
            service.create(&ana, draft(&product, 1)).await.unwrap();
        }

        let listing = service.list(&ana, None).with_page_size(2);
        let first = listing.collect().await.unwrap();
        let again = listing.collect().await.unwrap();

        assert_eq!(first.len(), 5);
        assert_eq!(first, again);
        assert!(first.windows(2).all(|w| w[0].ship_date >= w[1].ship_date));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (service, _, product) = setup().await;
        let admin = actor(Role::Admin);
        let shipment = service.create(&actor(Role::User), draft(&product, 1)).await.unwrap();

        let sent = service
            .update_status(&admin, shipment.id, ShipmentStatus::Enviado)
            .await
            .unwrap();
        assert_eq!(sent.status, ShipmentStatus::Enviado);

        let err = service
            .update_status(&admin, shipment.id, ShipmentStatus::Cancelado)
            .await
            .unwrap_err();
        assert!(matches!(err, ShipmentError::InvalidTransition { .. }));

        service
            .update_status(&admin, shipment.id, ShipmentStatus::Entregado)
            .await
            .unwrap();
        for next in ShipmentStatus::ALL {
            assert!(
                service
                    .update_status(&admin, shipment.id, next)
                    .await
                    .is_err()
            );
        }
    }

    #[tokio::test]
    async fn test_users_cannot_change_status_or_delete() {
        let (service, _, product) = setup().await;
        let user = actor(Role::User);
        let shipment = service.create(&user, draft(&product, 1)).await.unwrap();

        assert!(matches!(
            service
                .update_status(&user, shipment.id, ShipmentStatus::Enviado)
                .await,
            Err(ShipmentError::Access(AccessError::Forbidden(_)))
        ));
        assert!(matches!(
            service.delete(&user, shipment.id).await,
            Err(ShipmentError::Access(AccessError::Forbidden(_)))
        ));
    }

    #[tokio::test]
    async fn test_get_enforces_ownership() {
        let (service, _, product) = setup().await;
        let owner = actor(Role::User);
        let shipment = service.create(&owner, draft(&product, 1)).await.unwrap();

        assert!(service.get(&owner, shipment.id).await.is_ok());
        assert!(service.get(&actor(Role::Admin), shipment.id).await.is_ok());
        assert!(matches!(
            service.get(&actor(Role::User), shipment.id).await,
            Err(ShipmentError::Access(AccessError::Forbidden(_)))
        ));
        assert!(matches!(
            service.get(&owner, ShipmentId::generate()).await,
            Err(ShipmentError::NotFound)
        ));
    }
}
