//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod user;

use sqlx::PgPool;
use thiserror::Error;

use pacande_storefront::config::{self, ConfigError};
use pacande_storefront::db::{self, RepositoryError};
use pacande_storefront::services::auth::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying migrations failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Account fields were rejected.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// An account with this email already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Connect to the storefront database named by the environment.
async fn connect() -> Result<PgPool, CliError> {
    let database_url = config::database_url_from_env()?;
    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&database_url).await?)
}
