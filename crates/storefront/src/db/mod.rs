//! Persistence for the storefront.
//!
//! # Database: `pacande`
//!
//! ## Tables (schema `storefront`)
//!
//! - `user` - Accounts, unique by email, with role and password hash
//! - `product` - Catalog
//! - `shipment` - Orders; product lines are stored as a JSONB array
//!
//! Services talk to the store traits below, never to `sqlx` directly. The
//! `PostgreSQL` implementations live in [`users`], [`products`] and
//! [`shipments`]; [`memory`] holds in-process implementations used by tests
//! and local demos.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p pacande-cli -- migrate
//! ```

pub mod memory;
pub mod products;
pub mod shipments;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use pacande_core::{Email, ProductId, Role, ShipmentId, ShipmentStatus, UserId};

use crate::models::{
    NewUser, Product, ProductDraft, ProductFilter, Shipment, ShipmentCursor, User, UserChanges,
};

pub use products::PgProductRepository;
pub use shipments::PgShipmentRepository;
pub use users::PgUserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account.
    ///
    /// Fails with [`RepositoryError::Conflict`] if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Fetch an account by id.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Fetch an account and its password hash by email.
    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Fetch the password hash of an account.
    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError>;

    /// List accounts, optionally only those with `role`, oldest first.
    async fn list(&self, role: Option<Role>) -> Result<Vec<User>, RepositoryError>;

    /// Apply a partial update.
    ///
    /// Fails with [`RepositoryError::NotFound`] for an unknown id and
    /// [`RepositoryError::Conflict`] if the new email is taken.
    async fn update(&self, id: UserId, changes: UserChanges) -> Result<User, RepositoryError>;

    /// Delete an account. Returns whether it existed.
    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError>;
}

/// Catalog storage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// List products matching `filter`, by name.
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    /// Fetch a product by id.
    async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Fetch every product among `ids` that exists, in no particular order.
    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Insert a product.
    async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError>;

    /// Replace a product's fields. `None` if it does not exist.
    async fn update(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product. Returns whether it existed.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Shipment storage.
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// Persist a complete shipment in a single write.
    async fn insert(&self, shipment: &Shipment) -> Result<(), RepositoryError>;

    /// Fetch a shipment by id.
    async fn get_by_id(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError>;

    /// One page of shipments ordered by `(ship_date, id)` descending,
    /// optionally for a single client, strictly after `after`.
    async fn list_page(
        &self,
        client: Option<UserId>,
        after: Option<ShipmentCursor>,
        limit: u32,
    ) -> Result<Vec<Shipment>, RepositoryError>;

    /// Set the status to `to` only if it is currently `from`.
    ///
    /// Returns the updated shipment, or `None` if the shipment is missing or
    /// its status is no longer `from`.
    async fn update_status(
        &self,
        id: ShipmentId,
        from: ShipmentStatus,
        to: ShipmentStatus,
    ) -> Result<Option<Shipment>, RepositoryError>;

    /// Delete a shipment. Returns whether it existed.
    async fn delete(&self, id: ShipmentId) -> Result<bool, RepositoryError>;
}

/// The set of stores a running storefront uses.
#[derive(Clone)]
pub struct Stores {
    /// Accounts.
    pub users: Arc<dyn UserStore>,
    /// Catalog.
    pub products: Arc<dyn ProductStore>,
    /// Shipments.
    pub shipments: Arc<dyn ShipmentStore>,
}

impl Stores {
    /// Stores backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            shipments: Arc::new(PgShipmentRepository::new(pool.clone())),
        }
    }

    /// Fresh, empty in-process stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUserStore::default()),
            products: Arc::new(memory::MemoryProductStore::default()),
            shipments: Arc::new(memory::MemoryShipmentStore::default()),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
