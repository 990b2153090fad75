//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with `request_id` and `user_id` fields)
//! 3. Request ID (propagate or generate `x-request-id`)
//! 4. CORS (origins from configuration)
//! 5. `Cache-Control: no-store` on every response
//!
//! Authentication is not a layer: handlers opt in through the
//! [`RequireAuth`], [`RequireAdmin`] and [`RequireSuperAdmin`] extractors.

pub mod auth;
pub mod request_id;

pub use auth::{RequireAdmin, RequireAuth, RequireSuperAdmin};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
