//! Authentication extractors.
//!
//! Requests authenticate with `Authorization: Bearer <token>`. The token
//! only names its subject; the account (and its current role) is reloaded
//! from the store on every request, so role changes and deletions take
//! effect immediately.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use pacande_core::Role;
use pacande_core::access::{self, Actor};

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Extractor that requires an authenticated account of any role.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hola, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires an Admin or SuperAdmin.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that requires a SuperAdmin.
pub struct RequireSuperAdmin(pub CurrentUser);

impl RequireAuth {
    /// The authorization view of the requester.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        self.0.actor()
    }
}

impl RequireAdmin {
    /// The authorization view of the requester.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        self.0.actor()
    }
}

impl RequireSuperAdmin {
    /// The authorization view of the requester.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        self.0.actor()
    }
}

/// Pull the token out of an `Authorization: Bearer` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<CurrentUser, AppError> {
    let token = bearer_token(parts).ok_or(AppError::Unauthenticated)?;
    let user = CurrentUser::from(state.auth().authenticate(token).await?);

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::Span::current().record("user_id", tracing::field::display(user.id));
    Ok(user)
}

async fn authenticate_with_role(
    parts: &Parts,
    state: &AppState,
    minimum: Role,
) -> Result<CurrentUser, AppError> {
    let user = authenticate(parts, state).await?;
    access::require_role(Some(&user.actor()), minimum)?;
    Ok(user)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate_with_role(parts, state, Role::Admin)
            .await
            .map(Self)
    }
}

impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate_with_role(parts, state, Role::SuperAdmin)
            .await
            .map(Self)
    }
}
