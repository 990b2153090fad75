//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pacande_core::{Email, Role, UserId};

/// A storefront account (domain type).
///
/// Never carries the password hash; credentials are read separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    #[serde(rename = "nombre")]
    pub name: String,
    /// Unique, normalised email address.
    #[serde(rename = "correo")]
    pub email: Email,
    /// Current role.
    #[serde(rename = "rol")]
    pub role: Role,
    /// Stored path of the profile picture, if any.
    #[serde(rename = "profilePicture")]
    pub profile_picture: Option<String>,
    /// When the account was created.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Data required to create an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Initial role.
    pub role: Role,
}

/// Partial update of an account. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    /// New display name.
    pub name: Option<String>,
    /// New email address.
    pub email: Option<Email>,
    /// New role.
    pub role: Option<Role>,
    /// New Argon2 PHC string.
    pub password_hash: Option<String>,
    /// New profile picture path.
    pub profile_picture: Option<String>,
}

impl UserChanges {
    /// Whether the update touches nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.password_hash.is_none()
            && self.profile_picture.is_none()
    }
}
