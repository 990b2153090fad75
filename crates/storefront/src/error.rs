//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error becomes a JSON body `{"error": "...", "field": "..."}`; the
//! `field` key is present only for validation errors. Details of server-side
//! failures are replaced by a generic message unless the process runs in
//! development mode (see [`expose_internal_errors`]).

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use pacande_core::access::AccessError;
use pacande_core::cart::CartError;
use pacande_core::types::id::IdParseError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartServiceError;
use crate::services::payment::PaymentError;
use crate::services::products::ProductError;
use crate::services::shipments::ShipmentError;
use crate::services::users::UserAdminError;

static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Include internal error details in responses (development only).
pub fn expose_internal_errors(enabled: bool) {
    EXPOSE_INTERNAL_ERRORS.store(enabled, Ordering::Relaxed);
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A request field is missing or invalid.
    #[error("Validation error: {message}")]
    Validation {
        /// Wire name of the offending field, if known.
        field: Option<String>,
        /// Client-facing message.
        message: String,
    },

    /// Wrong password or missing step-up confirmation.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// User is not authenticated.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Validation error naming `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let body = match self {
            Self::Validation { field, message } => ErrorBody {
                error: message,
                field,
            },
            Self::InvalidCredentials => ErrorBody {
                error: "Credenciales inválidas".to_owned(),
                field: None,
            },
            Self::Unauthenticated => ErrorBody {
                error: "Autenticación requerida".to_owned(),
                field: None,
            },
            Self::Forbidden(message) | Self::NotFound(message) => ErrorBody {
                error: message,
                field: None,
            },
            err @ (Self::Database(_) | Self::Internal(_)) => ErrorBody {
                error: if EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed) {
                    err.to_string()
                } else {
                    "Error interno del servidor".to_owned()
                },
                field: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// =============================================================================
// Conversions
// =============================================================================

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Recurso no encontrado".to_owned()),
            other => Self::Database(other),
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => Self::Unauthenticated,
            AccessError::Forbidden(reason) => Self::Forbidden(reason.to_owned()),
        }
    }
}

impl From<IdParseError> for AppError {
    fn from(err: IdParseError) -> Self {
        Self::validation("id", err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail(e) => Self::validation("correo", e.to_string()),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::UserAlreadyExists => {
                Self::validation("correo", "Ya existe una cuenta con este correo")
            }
            AuthError::WeakPassword(message) => Self::validation("contraseña", message),
            AuthError::MissingField { field } => {
                Self::validation(field, format!("El campo {field} es obligatorio"))
            }
            AuthError::Unauthenticated => Self::Unauthenticated,
            AuthError::Repository(e) => e.into(),
            e @ (AuthError::Token(_) | AuthError::PasswordHash) => Self::Internal(e.to_string()),
        }
    }
}

impl From<ShipmentError> for AppError {
    fn from(err: ShipmentError) -> Self {
        match err {
            ShipmentError::Validation { field, message } => Self::validation(field, message),
            ShipmentError::Access(e) => e.into(),
            ShipmentError::NotFound => Self::NotFound("Envío no encontrado".to_owned()),
            e @ ShipmentError::InvalidTransition { .. } => Self::validation("estado", e.to_string()),
            ShipmentError::Repository(e) => e.into(),
        }
    }
}

impl From<UserAdminError> for AppError {
    fn from(err: UserAdminError) -> Self {
        match err {
            UserAdminError::Access(e) => e.into(),
            UserAdminError::InvalidCredentials => Self::InvalidCredentials,
            UserAdminError::NotFound => Self::NotFound("Usuario no encontrado".to_owned()),
            UserAdminError::Validation { field, message } => Self::validation(field, message),
            UserAdminError::Auth(e) => e.into(),
            UserAdminError::Repository(e) => e.into(),
        }
    }
}

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::Validation { field, message } => Self::validation(field, message),
            ProductError::Access(e) => e.into(),
            ProductError::NotFound => Self::NotFound("Producto no encontrado".to_owned()),
            ProductError::Repository(e) => e.into(),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidCard { field, message } => Self::validation(field, message),
            e @ PaymentError::Declined => Self::validation("pago", e.to_string()),
        }
    }
}

impl From<CartServiceError> for AppError {
    fn from(err: CartServiceError) -> Self {
        match err {
            CartServiceError::Cart(CartError::Unauthenticated) => Self::Unauthenticated,
            CartServiceError::Cart(e @ CartError::InvalidQuantity) => {
                Self::validation("cantidad", e.to_string())
            }
            CartServiceError::Cart(e @ CartError::ItemNotFound(_)) => Self::NotFound(e.to_string()),
            CartServiceError::Pricing(e) => Self::validation("productos", e.to_string()),
            CartServiceError::Payment(e) => e.into(),
            CartServiceError::Shipment(e) => e.into(),
            CartServiceError::ProductNotFound(_) => {
                Self::NotFound("Producto no encontrado".to_owned())
            }
            CartServiceError::Validation { field, message } => Self::validation(field, message),
            CartServiceError::Repository(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation("body", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation("id", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation("query", rejection.body_text())
    }
}

// =============================================================================
// Sentry helpers
// =============================================================================

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
