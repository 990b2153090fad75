//! Authenticated request identity.
//!
//! A bearer token only names its subject; the role used for every decision
//! is the one currently stored, loaded on each request.

use serde::{Deserialize, Serialize};

use pacande_core::access::Actor;
use pacande_core::{Email, Role, UserId};

use super::user::User;

/// The account behind the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Display name.
    #[serde(rename = "nombre")]
    pub name: String,
    /// User's email address.
    #[serde(rename = "correo")]
    pub email: Email,
    /// Role as currently stored.
    #[serde(rename = "rol")]
    pub role: Role,
}

impl CurrentUser {
    /// The authorization view of this user.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// Role at issue time (informational).
    pub rol: Role,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}
