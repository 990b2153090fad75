//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::Stores;
use crate::services::auth::{AuthService, TokenService};
use crate::services::cart::{CartService, MokaCartStorage};
use crate::services::payment::SimulatedPayments;
use crate::services::products::ProductService;
use crate::services::shipments::ShipmentService;
use crate::services::users::{StepUpGrants, UserAdminService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like stores, services and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    stores: Stores,
    tokens: TokenService,
    products: ProductService,
    shipments: ShipmentService,
    cart: CartService,
    users: UserAdminService,
}

impl AppState {
    /// Create application state backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let stores = Stores::postgres(&pool);
        Self::build(config, stores, Some(pool))
    }

    /// Create application state over arbitrary stores, without a database pool.
    ///
    /// Readiness checks report ready when no pool is configured.
    #[must_use]
    pub fn with_stores(config: StorefrontConfig, stores: Stores) -> Self {
        Self::build(config, stores, None)
    }

    fn build(config: StorefrontConfig, stores: Stores, pool: Option<PgPool>) -> Self {
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl);
        let products = ProductService::new(Arc::clone(&stores.products));
        let shipments = ShipmentService::new(
            Arc::clone(&stores.shipments),
            Arc::clone(&stores.products),
            Arc::clone(&stores.users),
        );
        let cart = CartService::new(
            Arc::new(MokaCartStorage::new(config.cart_idle)),
            Arc::clone(&stores.products),
            shipments.clone(),
            SimulatedPayments::new(config.payment_approval_rate),
            config.shipping,
        );
        let users = UserAdminService::new(
            Arc::clone(&stores.users),
            StepUpGrants::new(config.auth.step_up_ttl),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stores,
                tokens,
                products,
                shipments,
                cart,
                users,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool, if any.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Get the stores.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Authentication service bound to the account store.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.inner.stores.users.as_ref(), &self.inner.tokens)
    }

    /// Catalog service.
    #[must_use]
    pub fn products(&self) -> &ProductService {
        &self.inner.products
    }

    /// Shipment lifecycle service.
    #[must_use]
    pub fn shipments(&self) -> &ShipmentService {
        &self.inner.shipments
    }

    /// Cart and checkout service.
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    /// Account administration service.
    #[must_use]
    pub fn users(&self) -> &UserAdminService {
        &self.inner.users
    }
}
