//! Shipment repository.
//!
//! A shipment and its product lines are one row: lines live in a JSONB
//! column, so creating a shipment is a single `INSERT` and there is never a
//! half-written order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use pacande_core::{ProductId, ShipmentId, ShipmentStatus, UserId};

use super::{RepositoryError, ShipmentStore};
use crate::models::{Shipment, ShipmentCursor, ShipmentItem};

const SHIPMENT_COLUMNS: &str = "id, client_id, shipping_address, phone, notes, ship_date, status, \
     items, shipping_method, shipping_cost, total";

/// Storage form of a product line. Prices stay decimal strings in JSONB.
#[derive(Debug, Serialize, Deserialize)]
struct ItemRecord {
    product_id: ProductId,
    name: String,
    quantity: u32,
    unit_price: Decimal,
}

impl From<&ShipmentItem> for ItemRecord {
    fn from(item: &ShipmentItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

impl From<ItemRecord> for ShipmentItem {
    fn from(record: ItemRecord) -> Self {
        Self {
            product_id: record.product_id,
            name: record.name,
            quantity: record.quantity,
            unit_price: record.unit_price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ShipmentRow {
    id: Uuid,
    client_id: Uuid,
    shipping_address: String,
    phone: Option<String>,
    notes: Option<String>,
    ship_date: DateTime<Utc>,
    status: ShipmentStatus,
    items: Json<Vec<ItemRecord>>,
    shipping_method: String,
    shipping_cost: Decimal,
    total: Decimal,
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = RepositoryError;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        let items: Vec<ShipmentItem> = row.items.0.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return Err(RepositoryError::DataCorruption(format!(
                "shipment {} has no items",
                row.id
            )));
        }

        Ok(Self {
            id: ShipmentId::new(row.id),
            client_id: UserId::new(row.client_id),
            shipping_address: row.shipping_address,
            phone: row.phone,
            notes: row.notes,
            ship_date: row.ship_date,
            status: row.status,
            items,
            shipping_method: row.shipping_method,
            shipping_cost: row.shipping_cost,
            total: row.total,
        })
    }
}

/// `PostgreSQL` shipment storage.
#[derive(Clone)]
pub struct PgShipmentRepository {
    pool: PgPool,
}

impl PgShipmentRepository {
    /// Create a new shipment repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShipmentStore for PgShipmentRepository {
    async fn insert(&self, shipment: &Shipment) -> Result<(), RepositoryError> {
        let items: Vec<ItemRecord> = shipment.items.iter().map(ItemRecord::from).collect();

        sqlx::query(
            "INSERT INTO storefront.shipment
                 (id, client_id, shipping_address, phone, notes, ship_date, status,
                  items, shipping_method, shipping_cost, total)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(shipment.id)
        .bind(shipment.client_id)
        .bind(&shipment.shipping_address)
        .bind(&shipment.phone)
        .bind(&shipment.notes)
        .bind(shipment.ship_date)
        .bind(shipment.status)
        .bind(Json(items))
        .bind(&shipment.shipping_method)
        .bind(shipment.shipping_cost)
        .bind(shipment.total)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError> {
        let row: Option<ShipmentRow> = sqlx::query_as(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM storefront.shipment WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Shipment::try_from).transpose()
    }

    async fn list_page(
        &self,
        client: Option<UserId>,
        after: Option<ShipmentCursor>,
        limit: u32,
    ) -> Result<Vec<Shipment>, RepositoryError> {
        let rows: Vec<ShipmentRow> = sqlx::query_as(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM storefront.shipment
             WHERE ($1::uuid IS NULL OR client_id = $1)
               AND ($2::timestamptz IS NULL OR (ship_date, id) < ($2, $3))
             ORDER BY ship_date DESC, id DESC
             LIMIT $4"
        ))
        .bind(client)
        .bind(after.map(|c| c.ship_date))
        .bind(after.map(|c| c.id))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Shipment::try_from).collect()
    }

    async fn update_status(
        &self,
        id: ShipmentId,
        from: ShipmentStatus,
        to: ShipmentStatus,
    ) -> Result<Option<Shipment>, RepositoryError> {
        let row: Option<ShipmentRow> = sqlx::query_as(&format!(
            "UPDATE storefront.shipment SET status = $3
             WHERE id = $1 AND status = $2
             RETURNING {SHIPMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Shipment::try_from).transpose()
    }

    async fn delete(&self, id: ShipmentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.shipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
