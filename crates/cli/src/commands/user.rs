//! Account bootstrap commands.
//!
//! # Usage
//!
//! ```bash
//! pacande user create-superadmin -e admin@pacande.co -n "Admin" -p 'a long password'
//! ```

use pacande_core::{Email, Role};
use pacande_storefront::db::{PgUserRepository, RepositoryError, UserStore};
use pacande_storefront::models::NewUser;
use pacande_storefront::services::auth::{self, AuthError};

use super::{CliError, connect};

/// Minimum password length, matching registration.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Create a SuperAdmin account.
///
/// # Errors
///
/// Returns `CliError::Auth` for a bad email, blank name or short password
/// and `CliError::UserExists` if the email is taken.
pub async fn create_superadmin(email: &str, name: &str, password: &str) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(AuthError::from)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::MissingField { field: "nombre" }.into());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        ))
        .into());
    }
    let password_hash = auth::hash_password(password)?;

    let pool = connect().await?;
    let users = PgUserRepository::new(pool);

    tracing::info!("Creating SuperAdmin: {}", email);
    let user = users
        .create(NewUser {
            name: name.to_owned(),
            email: email.clone(),
            password_hash,
            role: Role::SuperAdmin,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => CliError::UserExists(email.to_string()),
            other => CliError::Repository(other),
        })?;

    tracing::info!(user_id = %user.id, "SuperAdmin created");
    Ok(())
}
