//! Authentication service.
//!
//! Password registration and login, bearer token issue, and self-service
//! profile changes.

mod error;
mod token;

pub use error::AuthError;
pub use token::{IssuedToken, TokenService};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use pacande_core::{Email, Role, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User, UserChanges};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Self-service profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New email address (unparsed).
    pub email: Option<String>,
    /// New profile picture path.
    pub profile_picture: Option<String>,
}

/// Authentication service.
///
/// Handles user registration, login, and profile management.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, tokens: &'a TokenService) -> Self {
        Self { users, tokens }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user with email and password.
    ///
    /// New accounts always get [`Role::User`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if the name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let name = required(name, "nombre")?;
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(NewUser {
                name,
                email,
                password_hash,
                role: Role::User,
            })
            .await
            .map_err(map_conflict)?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, IssuedToken), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.tokens.issue(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, token))
    }

    /// Resolve a bearer token to the account it names, as currently stored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` for an invalid token or a deleted
    /// account.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let user_id = self.tokens.verify(token)?;
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the account no longer exists.
    pub async fn profile(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    /// Update the caller's own name, email or picture. Never touches the role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField`, `AuthError::InvalidEmail` or
    /// `AuthError::UserAlreadyExists`.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        let changes = UserChanges {
            name: update.name.as_deref().map(|n| required(n, "nombre")).transpose()?,
            email: update.email.as_deref().map(Email::parse).transpose()?,
            profile_picture: update.profile_picture,
            ..UserChanges::default()
        };

        if changes.is_empty() {
            return self.profile(user_id).await;
        }

        self.users
            .update(user_id, changes)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::Unauthenticated,
                other => map_conflict(other),
            })
    }

    /// Change the caller's password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong and
    /// `AuthError::WeakPassword` if `new` is too short.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        self.verify_password(user_id, current).await?;
        validate_password(new)?;

        let changes = UserChanges {
            password_hash: Some(hash_password(new)?),
            ..UserChanges::default()
        };
        self.users.update(user_id, changes).await.map_err(|e| match e {
            RepositoryError::NotFound => AuthError::Unauthenticated,
            other => AuthError::Repository(other),
        })?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    /// Check `password` against the stored hash of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on mismatch or unknown user.
    pub async fn verify_password(&self, user_id: UserId, password: &str) -> Result<(), AuthError> {
        let hash = self
            .users
            .get_password_hash(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, &hash)
    }
}

fn map_conflict(err: RepositoryError) -> AuthError {
    match err {
        RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
        other => AuthError::Repository(other),
    }
}

fn required(value: &str, field: &'static str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::MissingField { field });
    }
    Ok(value.to_owned())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::db::memory::MemoryUserStore;

    fn tokens() -> TokenService {
        TokenService::new(
            &SecretString::from("kX9#mP2$vL7@qR4!wZ8&nB3*jH6^tF1%"),
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryUserStore::default();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        let user = auth
            .register("Ana", "Ana@Pacande.co", "contraseña-segura")
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.email.as_str(), "ana@pacande.co");

        let (logged_in, token) = auth
            .login("ana@pacande.co", "contraseña-segura")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(auth.authenticate(&token.token).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = MemoryUserStore::default();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        auth.register("Ana", "ana@pacande.co", "contraseña-segura")
            .await
            .unwrap();

        assert!(matches!(
            auth.login("ana@pacande.co", "otra-cosa").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nadie@pacande.co", "contraseña-segura").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let store = MemoryUserStore::default();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        auth.register("Ana", "ana@pacande.co", "contraseña-segura")
            .await
            .unwrap();

        assert!(matches!(
            auth.register("Otra", "ANA@pacande.co", "contraseña-segura").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let store = MemoryUserStore::default();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        let user = auth
            .register("Ana", "ana@pacande.co", "contraseña-segura")
            .await
            .unwrap();

        assert!(matches!(
            auth.change_password(user.id, "equivocada", "nueva-clave-123").await,
            Err(AuthError::InvalidCredentials)
        ));
        auth.change_password(user.id, "contraseña-segura", "nueva-clave-123")
            .await
            .unwrap();
        assert!(auth.login("ana@pacande.co", "nueva-clave-123").await.is_ok());
    }
}
