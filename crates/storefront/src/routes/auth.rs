//! Authentication route handlers.
//!
//! Registration and login are public; profile routes act on the bearer of
//! the token and never on another account.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, User};
use crate::services::auth::ProfileUpdate;
use crate::state::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Body of `POST /auth/registro`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    /// Display name.
    pub nombre: String,
    /// Email address.
    pub correo: String,
    /// Password, at least 8 characters.
    #[serde(rename = "contraseña", alias = "contrasena")]
    pub password: String,
}

/// Body of `POST /auth/login`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    /// Email address.
    pub correo: String,
    /// Password.
    #[serde(rename = "contraseña", alias = "contrasena")]
    pub password: String,
}

/// Body of `PUT /auth/actualizar`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    /// New display name.
    pub nombre: Option<String>,
    /// New email address.
    pub correo: Option<String>,
    /// New profile picture path.
    #[serde(rename = "profilePicture")]
    pub profile_picture: Option<String>,
}

/// Body of `PUT /auth/cambiar-contrasena`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Current password.
    pub contrasena_actual: String,
    /// Replacement password.
    pub nueva_contrasena: String,
}

/// Response of a successful login.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The logged-in account.
    pub usuario: CurrentUser,
}

/// Plain acknowledgement.
#[derive(Serialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub mensaje: &'static str,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new account with role User.
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let user = state
        .auth()
        .register(&body.nombre, &body.correo, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange credentials for a bearer token.
#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (user, issued) = state.auth().login(&body.correo, &body.password).await?;
    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        usuario: user.into(),
    }))
}

/// The requester's own account.
#[instrument(skip(state, auth))]
pub async fn profile(State(state): State<AppState>, auth: RequireAuth) -> Result<Json<User>> {
    Ok(Json(state.auth().profile(auth.0.id).await?))
}

/// Update the requester's name, email or picture.
#[instrument(skip(state, auth))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>> {
    let update = ProfileUpdate {
        name: body.nombre,
        email: body.correo,
        profile_picture: body.profile_picture,
    };
    Ok(Json(state.auth().update_profile(auth.0.id, update).await?))
}

/// Change the requester's password.
#[instrument(skip(state, auth, body))]
pub async fn change_password(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .auth()
        .change_password(auth.0.id, &body.contrasena_actual, &body.nueva_contrasena)
        .await?;
    Ok(Json(MessageResponse {
        mensaje: "Contraseña actualizada correctamente",
    }))
}
