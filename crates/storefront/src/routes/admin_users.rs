//! Account administration route handlers.
//!
//! The `/admin/...` routes admit Admins and SuperAdmins; the
//! `/admin/superadmin/...` variants admit SuperAdmins only. Either way the
//! service applies the same role rules against the target's current role,
//! and SuperAdmin edits of other accounts need a prior step-up through
//! `POST /admin/verify-password`.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use pacande_core::access::Actor;
use pacande_core::{Role, RoleParseError, UserId};

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{RequireAdmin, RequireSuperAdmin};
use crate::models::User;
use crate::routes::auth::MessageResponse;
use crate::services::users::AccountEdit;
use crate::state::AppState;

/// Body of account edit requests.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    /// New display name.
    pub nombre: Option<String>,
    /// New email address.
    pub correo: Option<String>,
    /// New role.
    pub rol: Option<String>,
    /// New password.
    #[serde(rename = "contraseña", alias = "contrasena")]
    pub password: Option<String>,
}

impl UpdateUserRequest {
    fn into_edit(self) -> Result<AccountEdit> {
        let role = self
            .rol
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(|e: RoleParseError| AppError::validation("rol", e.to_string()))?;
        Ok(AccountEdit {
            name: self.nombre,
            email: self.correo,
            role,
            password: self.password.filter(|p| !p.is_empty()),
        })
    }
}

/// Body of `POST /admin/verify-password`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyPasswordRequest {
    /// The requester's own password.
    #[serde(rename = "contraseña", alias = "contrasena")]
    pub password: String,
}

/// Result of a step-up confirmation.
#[derive(Serialize)]
pub struct VerifyPasswordResponse {
    /// Whether the password matched. Only a match grants step-up.
    pub valid: bool,
}

/// Accounts visible to the requester.
#[instrument(skip(state, admin))]
pub async fn list(State(state): State<AppState>, admin: RequireAdmin) -> Result<Json<Vec<User>>> {
    Ok(Json(state.users().list(&admin.actor()).await?))
}

/// One account.
#[instrument(skip(state, admin))]
pub async fn show(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<User>> {
    Ok(Json(state.users().get(&admin.actor(), id).await?))
}

/// Confirm the requester's password and open a step-up window.
#[instrument(skip(state, admin, body))]
pub async fn verify_password(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiJson(body): ApiJson<VerifyPasswordRequest>,
) -> Result<Json<VerifyPasswordResponse>> {
    let valid = state
        .users()
        .verify_password(&admin.actor(), &body.password)
        .await?;
    Ok(Json(VerifyPasswordResponse { valid }))
}

/// Edit an account (Admin route).
#[instrument(skip(state, admin, body))]
pub async fn update(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> Result<Json<User>> {
    apply_update(&state, &admin.actor(), id, body).await
}

/// Delete an account (Admin route).
#[instrument(skip(state, admin))]
pub async fn delete(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<MessageResponse>> {
    apply_delete(&state, &admin.actor(), id).await
}

/// Edit an account (SuperAdmin route).
#[instrument(skip(state, superadmin, body))]
pub async fn superadmin_update(
    State(state): State<AppState>,
    superadmin: RequireSuperAdmin,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> Result<Json<User>> {
    apply_update(&state, &superadmin.actor(), id, body).await
}

/// Delete an account (SuperAdmin route).
#[instrument(skip(state, superadmin))]
pub async fn superadmin_delete(
    State(state): State<AppState>,
    superadmin: RequireSuperAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<MessageResponse>> {
    apply_delete(&state, &superadmin.actor(), id).await
}

async fn apply_update(
    state: &AppState,
    actor: &Actor,
    id: UserId,
    body: UpdateUserRequest,
) -> Result<Json<User>> {
    let edit = body.into_edit()?;
    Ok(Json(state.users().update(actor, id, edit).await?))
}

async fn apply_delete(state: &AppState, actor: &Actor, id: UserId) -> Result<Json<MessageResponse>> {
    state.users().delete(actor, id).await?;
    Ok(Json(MessageResponse {
        mensaje: "Usuario eliminado correctamente",
    }))
}
