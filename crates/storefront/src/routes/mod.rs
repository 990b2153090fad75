//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                               - Liveness
//! GET    /health/ready                         - Readiness (database)
//!
//! # Auth (under /api)
//! POST   /auth/registro                        - Register
//! POST   /auth/login                           - Login, returns bearer token
//! GET    /auth/perfil                          - Own profile
//! PUT    /auth/actualizar                      - Update own profile
//! PUT    /auth/cambiar-contrasena              - Change own password
//!
//! # Products
//! GET    /products?category=&subcategory=      - Catalog
//! GET    /products/{id}                        - Product detail
//! POST   /products                             - Create (Admin)
//! PUT    /products/{id}                        - Update (Admin)
//! DELETE /products/{id}                        - Delete (Admin)
//!
//! # Cart
//! GET    /cart                                 - Cart lines
//! DELETE /cart                                 - Empty cart
//! POST   /cart/items                           - Add product
//! PUT    /cart/items/{productId}               - Set quantity
//! DELETE /cart/items/{productId}               - Remove line
//! GET    /cart/totals                          - Cart with totals
//! POST   /cart/quote                           - Price arbitrary lines
//! POST   /cart/checkout                        - Pay and create shipment
//!
//! # Shipments
//! POST   /shipments                            - Create
//! GET    /shipments?cliente=                   - Role-scoped list
//! GET    /shipments/{id}                       - Detail
//! PUT    /shipments/{id}                       - Change status (Admin)
//! DELETE /shipments/{id}                       - Delete (Admin)
//!
//! # Account administration
//! POST   /admin/verify-password                - Step-up confirmation
//! GET    /admin/usuarios                       - Visible accounts
//! GET    /admin/usuarios/{id}                  - One account
//! PUT    /admin/usuarios/{id}                  - Edit account
//! DELETE /admin/eliminar-usuario/{id}          - Delete account
//! PUT    /admin/superadmin/usuarios/{id}       - Edit account (SuperAdmin)
//! DELETE /admin/superadmin/eliminar-usuario/{id} - Delete account (SuperAdmin)
//! ```

pub mod admin_users;
pub mod auth;
pub mod cart;
pub mod products;
pub mod shipments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/registro", post(auth::register))
        .route("/login", post(auth::login))
        .route("/perfil", get(auth::profile))
        .route("/actualizar", put(auth::update_profile))
        .route("/cambiar-contrasena", put(auth::change_password))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{product_id}", put(cart::update).delete(cart::remove))
        .route("/totals", get(cart::totals))
        .route("/quote", post(cart::quote))
        .route("/checkout", post(cart::checkout))
}

/// Create the shipment routes router.
pub fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shipments::list).post(shipments::create))
        .route(
            "/{id}",
            get(shipments::show)
                .put(shipments::update_status)
                .delete(shipments::delete),
        )
}

/// Create the account administration routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/verify-password", post(admin_users::verify_password))
        .route("/usuarios", get(admin_users::list))
        .route(
            "/usuarios/{id}",
            get(admin_users::show).put(admin_users::update),
        )
        .route(
            "/eliminar-usuario/{id}",
            axum::routing::delete(admin_users::delete),
        )
        .route(
            "/superadmin/usuarios/{id}",
            put(admin_users::superadmin_update),
        )
        .route(
            "/superadmin/eliminar-usuario/{id}",
            axum::routing::delete(admin_users::superadmin_delete),
        )
}

/// Create all API routes (mounted under `/api`).
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/shipments", shipment_routes())
        .nest("/admin", admin_routes())
}

/// Create all routes for the storefront, health checks included.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity when a pool is configured.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
