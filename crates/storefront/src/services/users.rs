//! Account administration for Admins and SuperAdmins.
//!
//! Every decision is made against the target's role as currently stored.
//! SuperAdmin mutations of other accounts additionally need a step-up grant
//! obtained from [`UserAdminService::verify_password`].

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;

use pacande_core::access::{self, AccessError, AccountChange, Actor};
use pacande_core::{Email, EmailError, Role, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::{User, UserChanges};
use crate::services::auth::{self, AuthError};

/// Upper bound on outstanding grants; one per SuperAdmin is the norm.
const MAX_GRANTS: u64 = 1_000;

/// Errors from account administration.
#[derive(Debug, Error)]
pub enum UserAdminError {
    /// The requester may not perform this operation.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Wrong password, or a step-up grant is missing or expired.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account with this id.
    #[error("user not found")]
    NotFound,

    /// A request field is invalid.
    #[error("{field}: {message}")]
    Validation {
        /// Wire name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Password hashing failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<EmailError> for UserAdminError {
    fn from(err: EmailError) -> Self {
        Self::Validation {
            field: "correo",
            message: err.to_string(),
        }
    }
}

/// An administrative edit of an account. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct AccountEdit {
    /// New display name.
    pub name: Option<String>,
    /// New email (unparsed).
    pub email: Option<String>,
    /// New role.
    pub role: Option<Role>,
    /// New password (plain text, hashed here).
    pub password: Option<String>,
}

/// Short-lived, single-use password confirmations, keyed by requester.
#[derive(Clone)]
pub struct StepUpGrants {
    grants: Cache<UserId, ()>,
}

impl StepUpGrants {
    /// Create a grant store whose grants expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            grants: Cache::builder()
                .max_capacity(MAX_GRANTS)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Record a successful confirmation for `user`.
    pub async fn grant(&self, user: UserId) {
        self.grants.insert(user, ()).await;
    }

    /// Use up the grant of `user`. Returns whether one was present.
    pub async fn consume(&self, user: UserId) -> bool {
        self.grants.remove(&user).await.is_some()
    }
}

/// Account administration service.
#[derive(Clone)]
pub struct UserAdminService {
    users: Arc<dyn UserStore>,
    grants: StepUpGrants,
}

impl UserAdminService {
    /// Create a new administration service.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, grants: StepUpGrants) -> Self {
        Self { users, grants }
    }

    /// Accounts visible to `requester`: every account for a SuperAdmin,
    /// regular users only for an Admin.
    ///
    /// # Errors
    ///
    /// `Access` below Admin.
    pub async fn list(&self, requester: &Actor) -> Result<Vec<User>, UserAdminError> {
        access::require_role(Some(requester), Role::Admin)?;
        let role = (requester.role != Role::SuperAdmin).then_some(Role::User);
        Ok(self.users.list(role).await?)
    }

    /// Fetch one account.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `Access` if the target is out of the requester's reach.
    pub async fn get(&self, requester: &Actor, id: UserId) -> Result<User, UserAdminError> {
        access::require_role(Some(requester), Role::Admin)?;
        let target = self.load(id).await?;
        access::authorize_account_view(requester, target.id, target.role)?;
        Ok(target)
    }

    /// Confirm the requester's own password. A match records a step-up
    /// grant and returns `true`; a mismatch returns `false`.
    ///
    /// # Errors
    ///
    /// `Access` below Admin.
    pub async fn verify_password(
        &self,
        requester: &Actor,
        password: &str,
    ) -> Result<bool, UserAdminError> {
        access::require_role(Some(requester), Role::Admin)?;

        let Some(hash) = self.users.get_password_hash(requester.id).await? else {
            return Ok(false);
        };
        if auth::verify_password(password, &hash).is_err() {
            tracing::info!(user_id = %requester.id, "Step-up password mismatch");
            return Ok(false);
        }

        self.grants.grant(requester.id).await;
        tracing::info!(user_id = %requester.id, "Step-up granted");
        Ok(true)
    }

    /// Edit an account.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Access` (role rules), `InvalidCredentials` if a
    /// SuperAdmin has no step-up grant, or `Validation`.
    pub async fn update(
        &self,
        requester: &Actor,
        id: UserId,
        edit: AccountEdit,
    ) -> Result<User, UserAdminError> {
        access::require_role(Some(requester), Role::Admin)?;
        let target = self.load(id).await?;
        access::authorize_account_update(
            requester,
            target.id,
            target.role,
            AccountChange { role: edit.role },
        )?;

        let changes = build_changes(edit, target.role)?;
        let spent = self.step_up(requester, target.id).await?;

        if changes.is_empty() {
            return Ok(target);
        }

        let new_role = changes.role;
        let written = self.users.update(id, changes).await.map_err(|e| match e {
            RepositoryError::NotFound => UserAdminError::NotFound,
            RepositoryError::Conflict(_) => UserAdminError::Validation {
                field: "correo",
                message: "ya existe una cuenta con este correo".to_owned(),
            },
            other => UserAdminError::Repository(other),
        });
        let updated = self.settle(requester, spent, written).await?;

        tracing::info!(
            target_id = %id,
            actor_id = %requester.id,
            role_changed = new_role.is_some(),
            "User updated"
        );
        Ok(updated)
    }

    /// Delete an account.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Access` (role rules, self-deletion), or
    /// `InvalidCredentials` if a SuperAdmin has no step-up grant.
    pub async fn delete(&self, requester: &Actor, id: UserId) -> Result<(), UserAdminError> {
        access::require_role(Some(requester), Role::Admin)?;
        let target = self.load(id).await?;
        access::authorize_account_delete(requester, target.id, target.role)?;
        let spent = self.step_up(requester, target.id).await?;

        let deleted = match self.users.delete(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(UserAdminError::NotFound),
            Err(e) => Err(e.into()),
        };
        self.settle(requester, spent, deleted).await?;

        tracing::info!(target_id = %id, actor_id = %requester.id, "User deleted");
        Ok(())
    }

    async fn load(&self, id: UserId) -> Result<User, UserAdminError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or(UserAdminError::NotFound)
    }

    /// Spend the requester's grant if the action needs one. Returns whether
    /// a grant was spent.
    async fn step_up(&self, requester: &Actor, target: UserId) -> Result<bool, UserAdminError> {
        if !access::requires_step_up(requester, target) {
            return Ok(false);
        }
        if !self.grants.consume(requester.id).await {
            tracing::warn!(user_id = %requester.id, "Sensitive action without step-up");
            return Err(UserAdminError::InvalidCredentials);
        }
        Ok(true)
    }

    /// A grant is only used up by a write that went through.
    async fn settle<T>(
        &self,
        requester: &Actor,
        spent: bool,
        outcome: Result<T, UserAdminError>,
    ) -> Result<T, UserAdminError> {
        if spent && outcome.is_err() {
            self.grants.grant(requester.id).await;
            tracing::debug!(user_id = %requester.id, "Step-up restored after failed write");
        }
        outcome
    }
}

fn build_changes(edit: AccountEdit, current_role: Role) -> Result<UserChanges, UserAdminError> {
    let name = match edit.name.as_deref().map(str::trim) {
        Some("") => {
            return Err(UserAdminError::Validation {
                field: "nombre",
                message: "el nombre no puede estar vacío".to_owned(),
            });
        }
        other => other.map(str::to_owned),
    };
    let email = edit.email.as_deref().map(Email::parse).transpose()?;
    let password_hash = match edit.password.as_deref() {
        Some(password) if password.chars().count() < 8 => {
            return Err(UserAdminError::Validation {
                field: "contraseña",
                message: "la contraseña debe tener al menos 8 caracteres".to_owned(),
            });
        }
        Some(password) => Some(auth::hash_password(password)?),
        None => None,
    };

    Ok(UserChanges {
        name,
        email,
        role: edit.role.filter(|role| *role != current_role),
        password_hash,
        profile_picture: None,
    })
}
