//! Authorization rules for shipments and account management.
//!
//! These functions decide, they do not fetch: callers load the requester and
//! the target's *current* role from the store and pass them in. A missing
//! requester is always rejected.

use crate::types::{Role, UserId};

/// An authenticated account acting on the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Account id.
    pub id: UserId,
    /// Current role as stored.
    pub role: Role,
}

impl Actor {
    /// Create an actor.
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

/// Why an action was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No authenticated requester.
    #[error("authentication required")]
    Unauthenticated,
    /// The requester is authenticated but not allowed.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
}

/// Whether `role` grants at least `minimum`. `None` never does.
#[must_use]
pub const fn has_role(role: Option<Role>, minimum: Role) -> bool {
    match role {
        Some(role) => role.at_least(minimum),
        None => false,
    }
}

/// Require an authenticated requester with at least `minimum`.
///
/// # Errors
///
/// [`AccessError::Unauthenticated`] without a requester,
/// [`AccessError::Forbidden`] if the role is too low.
pub const fn require_role(actor: Option<&Actor>, minimum: Role) -> Result<(), AccessError> {
    match actor {
        None => Err(AccessError::Unauthenticated),
        Some(actor) if actor.role.at_least(minimum) => Ok(()),
        Some(_) => Err(AccessError::Forbidden("insufficient role")),
    }
}

/// Requested changes to another account, as far as authorization cares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountChange {
    /// New role, if the request carries one.
    pub role: Option<Role>,
}

/// Check that `actor` may view the account `target_id` whose role is `target_role`.
///
/// Admins only see regular users; SuperAdmins see everyone.
///
/// # Errors
///
/// [`AccessError::Forbidden`] when the target is out of reach.
pub fn authorize_account_view(
    actor: &Actor,
    target_id: UserId,
    target_role: Role,
) -> Result<(), AccessError> {
    require_role(Some(actor), Role::Admin)?;
    if actor.role == Role::SuperAdmin || actor.id == target_id {
        return Ok(());
    }
    if target_role == Role::User {
        Ok(())
    } else {
        Err(AccessError::Forbidden("admins may only manage regular users"))
    }
}

/// Check that `actor` may apply `change` to the account `target_id`.
///
/// A role in `change` equal to the target's current role is not a change.
///
/// # Errors
///
/// [`AccessError::Forbidden`] if an Admin targets a non-User account, anyone
/// but a SuperAdmin changes a role, or the requester changes their own role.
pub fn authorize_account_update(
    actor: &Actor,
    target_id: UserId,
    target_role: Role,
    change: AccountChange,
) -> Result<(), AccessError> {
    require_role(Some(actor), Role::Admin)?;

    let role_changes = change.role.is_some_and(|role| role != target_role);
    if role_changes && actor.id == target_id {
        return Err(AccessError::Forbidden("cannot change your own role"));
    }
    if role_changes && actor.role != Role::SuperAdmin {
        return Err(AccessError::Forbidden("only a superadmin can change roles"));
    }
    if actor.role == Role::Admin && target_role != Role::User {
        return Err(AccessError::Forbidden("admins may only manage regular users"));
    }
    Ok(())
}

/// Check that `actor` may delete the account `target_id`.
///
/// # Errors
///
/// [`AccessError::Forbidden`] if an Admin targets a non-User account or the
/// requester targets themselves.
pub fn authorize_account_delete(
    actor: &Actor,
    target_id: UserId,
    target_role: Role,
) -> Result<(), AccessError> {
    require_role(Some(actor), Role::Admin)?;
    if actor.id == target_id {
        return Err(AccessError::Forbidden("cannot delete your own account"));
    }
    if actor.role == Role::Admin && target_role != Role::User {
        return Err(AccessError::Forbidden("admins may only manage regular users"));
    }
    Ok(())
}

/// Whether a mutation of `target_id` by `actor` needs a fresh password
/// confirmation: SuperAdmins acting on someone else.
#[must_use]
pub fn requires_step_up(actor: &Actor, target_id: UserId) -> bool {
    actor.role == Role::SuperAdmin && actor.id != target_id
}

/// Check that `actor` may read a shipment owned by `client`.
///
/// # Errors
///
/// [`AccessError::Forbidden`] when a regular user reads someone else's shipment.
pub fn authorize_shipment_read(actor: &Actor, client: UserId) -> Result<(), AccessError> {
    if actor.role.at_least(Role::Admin) || actor.id == client {
        Ok(())
    } else {
        Err(AccessError::Forbidden("shipment belongs to another client"))
    }
}

/// The client filter actually applied to a shipment listing.
///
/// Regular users are always scoped to themselves, whatever they asked for.
#[must_use]
pub fn scope_shipment_listing(actor: &Actor, requested: Option<UserId>) -> Option<UserId> {
    if actor.role.at_least(Role::Admin) {
        requested
    } else {
        Some(actor.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor::new(UserId::generate(), role)
    }

    #[test]
    fn test_has_role_fails_closed() {
        assert!(!has_role(None, Role::User));
        assert!(has_role(Some(Role::User), Role::User));
        assert!(!has_role(Some(Role::Admin), Role::SuperAdmin));
        assert!(has_role(Some(Role::SuperAdmin), Role::Admin));
    }

    #[test]
    fn test_require_role() {
        assert_eq!(
            require_role(None, Role::User),
            Err(AccessError::Unauthenticated)
        );
        assert!(matches!(
            require_role(Some(&actor(Role::User)), Role::Admin),
            Err(AccessError::Forbidden(_))
        ));
        assert!(require_role(Some(&actor(Role::Admin)), Role::Admin).is_ok());
    }

    #[test]
    fn test_admin_never_touches_staff() {
        let admin = actor(Role::Admin);
        for target_role in [Role::Admin, Role::SuperAdmin] {
            let target = UserId::generate();
            assert!(authorize_account_view(&admin, target, target_role).is_err());
            assert!(
                authorize_account_update(&admin, target, target_role, AccountChange::default())
                    .is_err()
            );
            assert!(authorize_account_delete(&admin, target, target_role).is_err());
        }
    }

    #[test]
    fn test_admin_manages_regular_users() {
        let admin = actor(Role::Admin);
        let target = UserId::generate();
        assert!(authorize_account_view(&admin, target, Role::User).is_ok());
        assert!(
            authorize_account_update(&admin, target, Role::User, AccountChange::default())
                .is_ok()
        );
        assert!(authorize_account_delete(&admin, target, Role::User).is_ok());
    }

    #[test]
    fn test_admin_cannot_change_roles() {
        let admin = actor(Role::Admin);
        let target = UserId::generate();
        let promote = AccountChange {
            role: Some(Role::Admin),
        };
        assert!(authorize_account_update(&admin, target, Role::User, promote).is_err());

        let unchanged = AccountChange {
            role: Some(Role::User),
        };
        assert!(authorize_account_update(&admin, target, Role::User, unchanged).is_ok());
    }

    #[test]
    fn test_superadmin_reaches_everyone_but_self() {
        let root = actor(Role::SuperAdmin);
        for target_role in Role::ALL {
            let target = UserId::generate();
            let change = AccountChange {
                role: Some(Role::Admin),
            };
            assert!(authorize_account_update(&root, target, target_role, change).is_ok());
            assert!(authorize_account_delete(&root, target, target_role).is_ok());
        }

        let demote_self = AccountChange {
            role: Some(Role::User),
        };
        assert!(authorize_account_update(&root, root.id, Role::SuperAdmin, demote_self).is_err());
        assert!(authorize_account_delete(&root, root.id, Role::SuperAdmin).is_err());
        assert!(
            authorize_account_update(&root, root.id, Role::SuperAdmin, AccountChange::default())
                .is_ok()
        );
    }

    #[test]
    fn test_regular_user_cannot_manage_accounts() {
        let user = actor(Role::User);
        let target = UserId::generate();
        assert!(authorize_account_view(&user, target, Role::User).is_err());
        assert!(authorize_account_delete(&user, target, Role::User).is_err());
    }

    #[test]
    fn test_step_up_only_for_superadmin_on_others() {
        let root = actor(Role::SuperAdmin);
        let admin = actor(Role::Admin);
        assert!(requires_step_up(&root, UserId::generate()));
        assert!(!requires_step_up(&root, root.id));
        assert!(!requires_step_up(&admin, UserId::generate()));
    }

    #[test]
    fn test_shipment_read_and_scope() {
        let user = actor(Role::User);
        let other = UserId::generate();
        assert!(authorize_shipment_read(&user, user.id).is_ok());
        assert!(authorize_shipment_read(&user, other).is_err());
        assert_eq!(scope_shipment_listing(&user, Some(other)), Some(user.id));
        assert_eq!(scope_shipment_listing(&user, None), Some(user.id));

        let admin = actor(Role::Admin);
        assert!(authorize_shipment_read(&admin, other).is_ok());
        assert_eq!(scope_shipment_listing(&admin, Some(other)), Some(other));
        assert_eq!(scope_shipment_listing(&admin, None), None);
    }
}
