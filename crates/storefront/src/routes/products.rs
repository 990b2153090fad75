//! Product catalog route handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use pacande_core::{ProductId, RawPrice};

use crate::error::Result;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductFilter};
use crate::services::products::ProductInput;
use crate::state::AppState;

/// Body of product create and update requests.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ProductRequest {
    #[serde(default)]
    name: String,
    description: Option<String>,
    /// Number or formatted string such as `"$85.000"`.
    price: Option<RawPrice>,
    #[serde(default)]
    category: String,
    subcategory: Option<String>,
    image_url: Option<String>,
    /// Percentage, 0-100.
    discount: Option<Decimal>,
}

impl From<ProductRequest> for ProductInput {
    fn from(body: ProductRequest) -> Self {
        Self {
            name: body.name,
            description: body.description,
            price: body.price,
            category: body.category,
            subcategory: body.subcategory,
            image_url: body.image_url,
            discount: body.discount,
        }
    }
}

/// List products, optionally filtered by category and subcategory.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.products().list(&filter).await?))
}

/// Get one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.products().get(id).await?))
}

/// Add a product.
#[instrument(skip(state, admin))]
pub async fn create(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<impl IntoResponse> {
    let product = state.products().create(&admin.actor(), body.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields.
#[instrument(skip(state, admin))]
pub async fn update(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<Json<Product>> {
    let product = state
        .products()
        .update(&admin.actor(), id, body.into())
        .await?;
    Ok(Json(product))
}

/// Remove a product.
#[instrument(skip(state, admin))]
pub async fn delete(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode> {
    state.products().delete(&admin.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
