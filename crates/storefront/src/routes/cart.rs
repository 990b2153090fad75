//! Cart route handlers.
//!
//! Carts are held server side and keyed by the authenticated user, so every
//! cart route requires a bearer token.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use pacande_core::cart::CartItem;
use pacande_core::pricing::{LineInput, Totals};
use pacande_core::{ProductId, RawPrice};

use crate::error::{Result, add_breadcrumb};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireAuth;
use crate::services::cart::{CartSummary, CheckoutOutcome, CheckoutRequest};
use crate::services::payment::PaymentDetails;
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

const fn one() -> u32 {
    1
}

/// Body of `POST /cart/items`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddItemRequest {
    /// Catalog product.
    pub producto: ProductId,
    /// Units to add.
    #[serde(default = "one")]
    pub cantidad: u32,
}

/// Body of `PUT /cart/items/{productId}`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateItemRequest {
    /// New quantity, at least 1.
    pub cantidad: u32,
}

/// One line of a quote.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuoteLine {
    /// Label used in error messages.
    #[serde(default, alias = "title")]
    pub nombre: String,
    /// Unit price, numeric or formatted.
    #[serde(alias = "price")]
    pub precio: RawPrice,
    /// Units.
    #[serde(alias = "quantity")]
    pub cantidad: u32,
}

/// Body of `POST /cart/quote`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuoteRequest {
    /// Lines to price.
    pub productos: Vec<QuoteLine>,
}

/// Body of `POST /cart/checkout`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CheckoutBody {
    /// Street address.
    #[serde(default)]
    pub direccion: String,
    /// City.
    pub ciudad: Option<String>,
    /// Department or region.
    pub departamento: Option<String>,
    /// Contact phone.
    pub telefono: Option<String>,
    /// Delivery notes.
    pub notas_adicionales: Option<String>,
    /// Delivery method.
    pub metodo_envio: Option<String>,
    /// Payment details.
    pub pago: PaymentDetails,
}

// =============================================================================
// Handlers
// =============================================================================

/// The requester's cart lines.
#[instrument(skip(state, auth))]
pub async fn show(State(state): State<AppState>, auth: RequireAuth) -> Json<Vec<CartItem>> {
    Json(state.cart().contents(auth.0.id))
}

/// Add a product to the cart.
#[instrument(skip(state, auth))]
pub async fn add(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> Result<Json<Vec<CartItem>>> {
    let items = state
        .cart()
        .add(auth.0.id, body.producto, body.cantidad)
        .await?;

    let product_id = body.producto.to_string();
    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", &product_id)]));
    Ok(Json(items))
}

/// Set the quantity of a cart line.
#[instrument(skip(state, auth))]
pub async fn update(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> Result<Json<Vec<CartItem>>> {
    Ok(Json(state.cart().update(auth.0.id, product_id, body.cantidad)?))
}

/// Remove a cart line. Removing an absent product is not an error.
#[instrument(skip(state, auth))]
pub async fn remove(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<Vec<CartItem>>> {
    Ok(Json(state.cart().remove(auth.0.id, product_id)?))
}

/// Empty the cart.
#[instrument(skip(state, auth))]
pub async fn clear(State(state): State<AppState>, auth: RequireAuth) -> Result<StatusCode> {
    state.cart().clear(auth.0.id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// The cart at current catalog prices with subtotal, shipping and grand total.
#[instrument(skip(state, auth))]
pub async fn totals(State(state): State<AppState>, auth: RequireAuth) -> Result<Json<CartSummary>> {
    Ok(Json(state.cart().totals(auth.0.id).await?))
}

/// Price arbitrary lines with the configured shipping policy.
#[instrument(skip(state, _auth))]
pub async fn quote(
    State(state): State<AppState>,
    _auth: RequireAuth,
    ApiJson(body): ApiJson<QuoteRequest>,
) -> Result<Json<Totals>> {
    let lines: Vec<LineInput> = body
        .productos
        .into_iter()
        .map(|line| LineInput::new(line.nombre, line.precio, line.cantidad))
        .collect();
    Ok(Json(state.cart().quote(&lines)?))
}

/// Pay for the cart and turn it into a shipment.
#[instrument(skip(state, auth, body))]
pub async fn checkout(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> Result<impl IntoResponse> {
    let request = CheckoutRequest {
        address: body.direccion,
        city: body.ciudad,
        region: body.departamento,
        phone: body.telefono,
        notes: body.notas_adicionales,
        shipping_method: body.metodo_envio,
        payment: body.pago,
    };
    let outcome: CheckoutOutcome = state.cart().checkout(&auth.actor(), request).await?;
    add_breadcrumb("cart", "Checkout completed", None);
    Ok((StatusCode::CREATED, Json(outcome)))
}
