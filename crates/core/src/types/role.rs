//! Account roles.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Role of an account, totally ordered by privilege.
///
/// `User < Admin < SuperAdmin`. Comparisons go through [`Role::at_least`]
/// (or the derived `Ord`), never through string matching.
///
/// On the wire roles use the storefront's historic spellings (`"Usuario"`,
/// `"Admin"`, `"Superadmin"`); parsing is case-insensitive and also accepts
/// the database spellings (`"user"`, `"admin"`, `"super_admin"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.user_role", rename_all = "snake_case")
)]
pub enum Role {
    /// Regular customer.
    #[default]
    User,
    /// Store staff: manages shipments, products and customer accounts.
    Admin,
    /// Full access including staff accounts and role changes.
    SuperAdmin,
}

/// Error returned when a role name is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0}")]
pub struct RoleParseError(pub String);

impl Role {
    /// All roles in ascending privilege order.
    pub const ALL: [Self; 3] = [Self::User, Self::Admin, Self::SuperAdmin];

    /// Numeric privilege level (User 0, Admin 1, SuperAdmin 2).
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Admin => 1,
            Self::SuperAdmin => 2,
        }
    }

    /// Whether this role grants at least the privileges of `minimum`.
    #[must_use]
    pub const fn at_least(self, minimum: Self) -> bool {
        self.level() >= minimum.level()
    }

    /// The wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "Usuario",
            Self::Admin => "Admin",
            Self::SuperAdmin => "Superadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "usuario" | "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "superadmin" | "super_admin" => Ok(Self::SuperAdmin),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
