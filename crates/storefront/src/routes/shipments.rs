//! Shipment route handlers.
//!
//! Creation and reads are open to any authenticated account (scoped to the
//! requester's own shipments for regular users); status changes and
//! deletion need an Admin.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use pacande_core::{ShipmentId, ShipmentStatus, UserId};

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::Shipment;
use crate::services::shipments::{DraftLine, ShipmentDraft};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// One line of a new shipment.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShipmentLineRequest {
    /// Product id.
    #[serde(default)]
    pub producto: String,
    /// Units ordered.
    #[serde(default)]
    pub cantidad: i64,
    /// Client-side price; ignored, the catalog price is used.
    #[serde(default)]
    pub precio: Option<serde_json::Value>,
}

/// Body of `POST /shipments`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateShipmentRequest {
    /// Target client; defaults to the requester.
    #[serde(default)]
    pub cliente: Option<String>,
    /// Delivery address.
    #[serde(default)]
    pub direccion_envio: String,
    /// Ordered products.
    #[serde(default)]
    pub productos: Vec<ShipmentLineRequest>,
    /// Shipping cost.
    #[serde(default)]
    pub costo_envio: Option<Decimal>,
    /// Delivery method.
    #[serde(default)]
    pub metodo_envio: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub telefono: Option<String>,
    /// Delivery notes.
    #[serde(default)]
    pub notas_adicionales: Option<String>,
    /// Client-side total; ignored, the total is computed server side.
    #[serde(default)]
    pub total: Option<serde_json::Value>,
}

/// Query of `GET /shipments`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListShipmentsQuery {
    /// Only shipments of this client (Admins only).
    pub cliente: Option<String>,
}

/// Body of `PUT /shipments/{id}`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    /// New status.
    pub estado: String,
}

fn parse_client(value: Option<&str>) -> Result<Option<UserId>> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<UserId>()
                .map_err(|_| AppError::validation("cliente", "identificador de cliente inválido"))
        })
        .transpose()
}

impl CreateShipmentRequest {
    fn into_draft(self) -> Result<ShipmentDraft> {
        Ok(ShipmentDraft {
            client: parse_client(self.cliente.as_deref())?,
            shipping_address: self.direccion_envio,
            items: self
                .productos
                .into_iter()
                .map(|line| DraftLine {
                    product: line.producto,
                    quantity: line.cantidad,
                })
                .collect(),
            shipping_method: self.metodo_envio,
            shipping_cost: self.costo_envio,
            phone: self.telefono,
            notes: self.notas_adicionales,
        })
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a shipment; the total is computed from catalog prices.
#[instrument(skip(state, auth, body))]
pub async fn create(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiJson(body): ApiJson<CreateShipmentRequest>,
) -> Result<impl IntoResponse> {
    let draft = body.into_draft()?;
    let shipment = state.shipments().create(&auth.actor(), draft).await?;
    Ok((StatusCode::CREATED, Json(shipment)))
}

/// List shipments newest first, scoped by role.
#[instrument(skip(state, auth))]
pub async fn list(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiQuery(query): ApiQuery<ListShipmentsQuery>,
) -> Result<Json<Vec<Shipment>>> {
    let client = parse_client(query.cliente.as_deref())?;
    let shipments = state
        .shipments()
        .list(&auth.actor(), client)
        .collect()
        .await?;
    Ok(Json(shipments))
}

/// Get one shipment.
#[instrument(skip(state, auth))]
pub async fn show(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiPath(id): ApiPath<ShipmentId>,
) -> Result<Json<Shipment>> {
    Ok(Json(state.shipments().get(&auth.actor(), id).await?))
}

/// Move a shipment along its lifecycle.
#[instrument(skip(state, admin, body))]
pub async fn update_status(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiPath(id): ApiPath<ShipmentId>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Shipment>> {
    let status: ShipmentStatus = body
        .estado
        .parse()
        .map_err(|e: pacande_core::StatusParseError| AppError::validation("estado", e.to_string()))?;
    let shipment = state
        .shipments()
        .update_status(&admin.actor(), id, status)
        .await?;
    Ok(Json(shipment))
}

/// Delete a shipment.
#[instrument(skip(state, admin))]
pub async fn delete(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiPath(id): ApiPath<ShipmentId>,
) -> Result<StatusCode> {
    state.shipments().delete(&admin.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client() {
        assert_eq!(parse_client(None).unwrap(), None);
        assert_eq!(parse_client(Some("  ")).unwrap(), None);
        let id = UserId::generate();
        assert_eq!(parse_client(Some(&id.to_string())).unwrap(), Some(id));
        assert!(matches!(
            parse_client(Some("nope")),
            Err(AppError::Validation { field: Some(f), .. }) if f == "cliente"
        ));
    }

    #[test]
    fn test_request_ignores_client_total() {
        let body: CreateShipmentRequest = serde_json::from_str(
            r#"{"direccionEnvio":"Calle 1","productos":[{"producto":"x","cantidad":2,"precio":"$1"}],"costoEnvio":10000,"total":5}"#,
        )
        .unwrap();
        let draft = body.into_draft().unwrap();
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].quantity, 2);
        assert_eq!(draft.shipping_cost, Some(Decimal::from(10_000)));
    }

    #[test]
    fn test_request_rejects_unknown_fields() {
        assert!(
            serde_json::from_str::<CreateShipmentRequest>(r#"{"direccionEnvio":"x","estado":"enviado"}"#)
                .is_err()
        );
    }
}
