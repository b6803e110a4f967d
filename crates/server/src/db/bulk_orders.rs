//! Bulk order repository.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use aqualedger_core::{
    BottleType, BulkOrderAmounts, BulkOrderId, BusinessId, EventType, PaymentStatus, UserId,
};

use super::RepositoryError;
use crate::models::BulkOrder;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct BulkOrderRow {
    id: i32,
    business_id: String,
    customer_name: String,
    phone: String,
    address: String,
    event_type: EventType,
    delivery_dates: Vec<NaiveDate>,
    quantity: i32,
    bottle_type: BottleType,
    price_per_bottle: Decimal,
    total_amount: Decimal,
    paid_amount: Decimal,
    pending_amount: Decimal,
    payment_status: PaymentStatus,
    notes: Option<String>,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BulkOrderRow> for BulkOrder {
    type Error = RepositoryError;

    fn try_from(row: BulkOrderRow) -> Result<Self, Self::Error> {
        if row.delivery_dates.is_empty() {
            return Err(RepositoryError::DataCorruption(format!(
                "bulk order {} has no delivery dates",
                row.id
            )));
        }

        Ok(Self {
            id: BulkOrderId::new(row.id),
            business_id: BusinessId::new(row.business_id),
            customer_name: row.customer_name,
            phone: row.phone,
            address: row.address,
            event_type: row.event_type,
            delivery_dates: row.delivery_dates,
            quantity: row.quantity,
            bottle_type: row.bottle_type,
            price_per_bottle: row.price_per_bottle,
            total_amount: row.total_amount,
            paid_amount: row.paid_amount,
            pending_amount: row.pending_amount,
            payment_status: row.payment_status,
            notes: row.notes,
            created_by: row.created_by.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const BULK_ORDER_COLUMNS: &str = "id, business_id, customer_name, phone, address, event_type, \
     delivery_dates, quantity, bottle_type, price_per_bottle, total_amount, paid_amount, \
     pending_amount, payment_status, notes, created_by, created_at, updated_at";

/// Filters for listing bulk orders. `created_from` is inclusive,
/// `created_before` exclusive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkOrderFilter {
    pub payment_status: Option<PaymentStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

/// The caller-supplied part of a bulk order.
#[derive(Debug, Clone)]
pub struct BulkOrderFields {
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub event_type: EventType,
    pub delivery_dates: Vec<NaiveDate>,
    pub quantity: i32,
    pub bottle_type: BottleType,
    pub price_per_bottle: Decimal,
    pub paid_amount: Decimal,
    pub notes: Option<String>,
}

impl From<&BulkOrder> for BulkOrderFields {
    fn from(order: &BulkOrder) -> Self {
        Self {
            customer_name: order.customer_name.clone(),
            phone: order.phone.clone(),
            address: order.address.clone(),
            event_type: order.event_type,
            delivery_dates: order.delivery_dates.clone(),
            quantity: order.quantity,
            bottle_type: order.bottle_type,
            price_per_bottle: order.price_per_bottle,
            paid_amount: order.paid_amount,
            notes: order.notes.clone(),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for bulk order database operations.
pub struct BulkOrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BulkOrderRepository<'a> {
    /// Create a new bulk order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List bulk orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn list(
        &self,
        business: &BusinessId,
        filter: BulkOrderFilter,
    ) -> Result<Vec<BulkOrder>, RepositoryError> {
        let rows = sqlx::query_as::<_, BulkOrderRow>(&format!(
            r"
            SELECT {BULK_ORDER_COLUMNS}
            FROM aqua.bulk_order
            WHERE business_id = $1
              AND ($2::aqua.payment_status IS NULL OR payment_status = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR created_at >= $3)
              AND ($4::TIMESTAMPTZ IS NULL OR created_at < $4)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(business)
        .bind(filter.payment_status)
        .bind(filter.created_from)
        .bind(filter.created_before)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a bulk order of `business` by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn get(
        &self,
        business: &BusinessId,
        id: BulkOrderId,
    ) -> Result<Option<BulkOrder>, RepositoryError> {
        let row = sqlx::query_as::<_, BulkOrderRow>(&format!(
            "SELECT {BULK_ORDER_COLUMNS} FROM aqua.bulk_order WHERE business_id = $1 AND id = $2"
        ))
        .bind(business)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert a bulk order with its derived amounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, fields, amounts), fields(business = %business))]
    pub async fn create(
        &self,
        business: &BusinessId,
        fields: &BulkOrderFields,
        amounts: &BulkOrderAmounts,
        created_by: Option<UserId>,
    ) -> Result<BulkOrder, RepositoryError> {
        let row = sqlx::query_as::<_, BulkOrderRow>(&format!(
            r"
            INSERT INTO aqua.bulk_order
                (business_id, customer_name, phone, address, event_type, delivery_dates,
                 quantity, bottle_type, price_per_bottle, total_amount, paid_amount,
                 pending_amount, payment_status, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {BULK_ORDER_COLUMNS}
            "
        ))
        .bind(business)
        .bind(&fields.customer_name)
        .bind(&fields.phone)
        .bind(&fields.address)
        .bind(fields.event_type)
        .bind(&fields.delivery_dates)
        .bind(fields.quantity)
        .bind(fields.bottle_type)
        .bind(fields.price_per_bottle)
        .bind(amounts.total_amount)
        .bind(fields.paid_amount)
        .bind(amounts.pending_amount)
        .bind(amounts.payment_status)
        .bind(fields.notes.as_deref())
        .bind(created_by)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Delete a bulk order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists in
    /// `business`.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn delete(&self, business: &BusinessId, id: BulkOrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM aqua.bulk_order WHERE business_id = $1 AND id = $2")
            .bind(business)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// Transaction-scoped writes
// =============================================================================

/// Lock a bulk order for a read-modify-write.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(
    conn: &mut PgConnection,
    business: &BusinessId,
    id: BulkOrderId,
) -> Result<Option<BulkOrder>, RepositoryError> {
    let row = sqlx::query_as::<_, BulkOrderRow>(&format!(
        r"
        SELECT {BULK_ORDER_COLUMNS}
        FROM aqua.bulk_order
        WHERE business_id = $1 AND id = $2
        FOR UPDATE
        "
    ))
    .bind(business)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Overwrite every editable column together with the re-derived amounts.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order is gone.
pub async fn store(
    conn: &mut PgConnection,
    id: BulkOrderId,
    fields: &BulkOrderFields,
    amounts: &BulkOrderAmounts,
) -> Result<BulkOrder, RepositoryError> {
    let row = sqlx::query_as::<_, BulkOrderRow>(&format!(
        r"
        UPDATE aqua.bulk_order
        SET customer_name = $2,
            phone = $3,
            address = $4,
            event_type = $5,
            delivery_dates = $6,
            quantity = $7,
            bottle_type = $8,
            price_per_bottle = $9,
            total_amount = $10,
            paid_amount = $11,
            pending_amount = $12,
            payment_status = $13,
            notes = $14,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {BULK_ORDER_COLUMNS}
        "
    ))
    .bind(id)
    .bind(&fields.customer_name)
    .bind(&fields.phone)
    .bind(&fields.address)
    .bind(fields.event_type)
    .bind(&fields.delivery_dates)
    .bind(fields.quantity)
    .bind(fields.bottle_type)
    .bind(fields.price_per_bottle)
    .bind(amounts.total_amount)
    .bind(fields.paid_amount)
    .bind(amounts.pending_amount)
    .bind(amounts.payment_status)
    .bind(fields.notes.as_deref())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(TryInto::try_into).transpose()?.ok_or(RepositoryError::NotFound)
}
