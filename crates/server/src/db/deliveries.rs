//! Daily delivery repository.
//!
//! Reads go through [`DeliveryRepository`]. Writes that move money are free
//! functions over `&mut PgConnection`; the ledger service calls them between
//! locking the customer and refreshing the customer's totals.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use aqualedger_core::{BottleType, BusinessId, CustomerId, DeliveryId, UserId};

use super::RepositoryError;
use crate::models::{CustomerDayStatus, Delivery, DeliveryWithCustomer};

/// Message for a second delivery on the same customer-day.
pub const DUPLICATE_DELIVERY: &str = "Delivery already exists for this customer on this date";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct DeliveryRow {
    id: i32,
    business_id: String,
    customer_id: i32,
    delivery_date: NaiveDate,
    delivered: bool,
    quantity_delivered: i32,
    amount_billed: Decimal,
    is_paid: bool,
    paid_amount: Decimal,
    delivered_by: Option<i32>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        Self {
            id: DeliveryId::new(row.id),
            business_id: BusinessId::new(row.business_id),
            customer_id: CustomerId::new(row.customer_id),
            delivery_date: row.delivery_date,
            delivered: row.delivered,
            quantity_delivered: row.quantity_delivered,
            amount_billed: row.amount_billed,
            is_paid: row.is_paid,
            paid_amount: row.paid_amount,
            delivered_by: row.delivered_by.map(UserId::new),
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeliveryWithCustomerRow {
    #[sqlx(flatten)]
    delivery: DeliveryRow,
    customer_name: String,
    customer_phone: String,
    customer_address: String,
}

impl From<DeliveryWithCustomerRow> for DeliveryWithCustomer {
    fn from(row: DeliveryWithCustomerRow) -> Self {
        Self {
            delivery: row.delivery.into(),
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_address: row.customer_address,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DayStatusRow {
    id: i32,
    name: String,
    address: String,
    phone: String,
    bottle_type: BottleType,
    price_per_bottle: Decimal,
    delivered: Option<bool>,
    delivery_id: Option<i32>,
    quantity_delivered: Option<i32>,
    amount_billed: Option<Decimal>,
}

impl From<DayStatusRow> for CustomerDayStatus {
    fn from(row: DayStatusRow) -> Self {
        Self {
            id: CustomerId::new(row.id),
            name: row.name,
            address: row.address,
            phone: row.phone,
            bottle_type: row.bottle_type,
            price_per_bottle: row.price_per_bottle,
            delivered_today: row.delivered.unwrap_or(false),
            delivery_id: row.delivery_id.map(DeliveryId::new),
            quantity_delivered: row.quantity_delivered.unwrap_or(0),
            amount_billed: row.amount_billed.unwrap_or(Decimal::ZERO),
        }
    }
}

const DELIVERY_COLUMNS: &str = "id, business_id, customer_id, delivery_date, delivered, \
     quantity_delivered, amount_billed, is_paid, paid_amount, delivered_by, notes, created_at, updated_at";

const JOINED_COLUMNS: &str = "d.id, d.business_id, d.customer_id, d.delivery_date, d.delivered, \
     d.quantity_delivered, d.amount_billed, d.is_paid, d.paid_amount, d.delivered_by, d.notes, \
     d.created_at, d.updated_at, c.name AS customer_name, c.phone AS customer_phone, \
     c.address AS customer_address";

/// Filters for listing deliveries. Both date bounds are inclusive.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub customer_id: Option<CustomerId>,
}

/// Column values for a freshly recorded delivery.
#[derive(Debug, Clone)]
pub struct DeliveryInsert<'a> {
    pub business_id: &'a BusinessId,
    pub customer_id: CustomerId,
    pub delivery_date: NaiveDate,
    pub quantity_delivered: i32,
    pub amount_billed: Decimal,
    pub is_paid: bool,
    pub paid_amount: Decimal,
    pub delivered_by: UserId,
    pub notes: Option<&'a str>,
}

/// Column values written by a calendar mark or unmark.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryMark<'a> {
    pub business_id: &'a BusinessId,
    pub customer_id: CustomerId,
    pub delivery_date: NaiveDate,
    pub delivered: bool,
    pub quantity_delivered: i32,
    pub amount_billed: Decimal,
    pub delivered_by: UserId,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for delivery reads.
pub struct DeliveryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DeliveryRepository<'a> {
    /// Create a new delivery repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List deliveries with their customer, most recent day first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn list(
        &self,
        business: &BusinessId,
        filter: DeliveryFilter,
    ) -> Result<Vec<DeliveryWithCustomer>, RepositoryError> {
        let rows = sqlx::query_as::<_, DeliveryWithCustomerRow>(&format!(
            r"
            SELECT {JOINED_COLUMNS}
            FROM aqua.daily_delivery d
            JOIN aqua.daily_customer c ON c.id = d.customer_id
            WHERE d.business_id = $1
              AND ($2::DATE IS NULL OR d.delivery_date >= $2)
              AND ($3::DATE IS NULL OR d.delivery_date <= $3)
              AND ($4::INTEGER IS NULL OR d.customer_id = $4)
            ORDER BY d.delivery_date DESC, d.id DESC
            "
        ))
        .bind(business)
        .bind(filter.start)
        .bind(filter.end)
        .bind(filter.customer_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Deliveries on one calendar day, newest record first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn on_date(
        &self,
        business: &BusinessId,
        date: NaiveDate,
    ) -> Result<Vec<DeliveryWithCustomer>, RepositoryError> {
        let rows = sqlx::query_as::<_, DeliveryWithCustomerRow>(&format!(
            r"
            SELECT {JOINED_COLUMNS}
            FROM aqua.daily_delivery d
            JOIN aqua.daily_customer c ON c.id = d.customer_id
            WHERE d.business_id = $1 AND d.delivery_date = $2
            ORDER BY d.created_at DESC, d.id DESC
            "
        ))
        .bind(business)
        .bind(date)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every active customer, by name, with their delivery on `date` if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn day_status(
        &self,
        business: &BusinessId,
        date: NaiveDate,
    ) -> Result<Vec<CustomerDayStatus>, RepositoryError> {
        let rows = sqlx::query_as::<_, DayStatusRow>(
            r"
            SELECT c.id, c.name, c.address, c.phone, c.bottle_type, c.price_per_bottle,
                   d.delivered, d.id AS delivery_id, d.quantity_delivered, d.amount_billed
            FROM aqua.daily_customer c
            LEFT JOIN aqua.daily_delivery d
                   ON d.customer_id = c.id AND d.delivery_date = $2
            WHERE c.business_id = $1 AND c.is_active
            ORDER BY c.name, c.id
            ",
        )
        .bind(business)
        .bind(date)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Deliveries with `first <= delivery_date <= last`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn between(
        &self,
        business: &BusinessId,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<Delivery>, RepositoryError> {
        let rows = sqlx::query_as::<_, DeliveryRow>(&format!(
            r"
            SELECT {DELIVERY_COLUMNS}
            FROM aqua.daily_delivery
            WHERE business_id = $1 AND delivery_date BETWEEN $2 AND $3
            ORDER BY delivery_date, id
            "
        ))
        .bind(business)
        .bind(first)
        .bind(last)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a delivery of `business` by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn get(
        &self,
        business: &BusinessId,
        id: DeliveryId,
    ) -> Result<Option<Delivery>, RepositoryError> {
        let row = sqlx::query_as::<_, DeliveryRow>(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM aqua.daily_delivery WHERE business_id = $1 AND id = $2"
        ))
        .bind(business)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a delivery together with its customer's display fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn get_with_customer(
        &self,
        business: &BusinessId,
        id: DeliveryId,
    ) -> Result<Option<DeliveryWithCustomer>, RepositoryError> {
        let row = sqlx::query_as::<_, DeliveryWithCustomerRow>(&format!(
            r"
            SELECT {JOINED_COLUMNS}
            FROM aqua.daily_delivery d
            JOIN aqua.daily_customer c ON c.id = d.customer_id
            WHERE d.business_id = $1 AND d.id = $2
            "
        ))
        .bind(business)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

// =============================================================================
// Ledger writes (transaction-scoped)
// =============================================================================

/// Lock a delivery row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(
    conn: &mut PgConnection,
    business: &BusinessId,
    id: DeliveryId,
) -> Result<Option<Delivery>, RepositoryError> {
    let row = sqlx::query_as::<_, DeliveryRow>(&format!(
        r"
        SELECT {DELIVERY_COLUMNS}
        FROM aqua.daily_delivery
        WHERE business_id = $1 AND id = $2
        FOR UPDATE
        "
    ))
    .bind(business)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Insert a new delivery.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the customer already has a
/// delivery on that date.
pub async fn insert(
    conn: &mut PgConnection,
    new: &DeliveryInsert<'_>,
) -> Result<Delivery, RepositoryError> {
    let row = sqlx::query_as::<_, DeliveryRow>(&format!(
        r"
        INSERT INTO aqua.daily_delivery
            (business_id, customer_id, delivery_date, delivered, quantity_delivered,
             amount_billed, is_paid, paid_amount, delivered_by, notes)
        VALUES ($1, $2, $3, TRUE, $4, $5, $6, $7, $8, $9)
        RETURNING {DELIVERY_COLUMNS}
        "
    ))
    .bind(new.business_id)
    .bind(new.customer_id)
    .bind(new.delivery_date)
    .bind(new.quantity_delivered)
    .bind(new.amount_billed)
    .bind(new.is_paid)
    .bind(new.paid_amount)
    .bind(new.delivered_by)
    .bind(new.notes)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::conflict_on_unique(e, DUPLICATE_DELIVERY))?;

    Ok(row.into())
}

/// Create or overwrite the customer's delivery for one day.
///
/// Payment columns are left alone on an existing row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn upsert_mark(
    conn: &mut PgConnection,
    mark: &DeliveryMark<'_>,
) -> Result<Delivery, RepositoryError> {
    let row = sqlx::query_as::<_, DeliveryRow>(&format!(
        r"
        INSERT INTO aqua.daily_delivery
            (business_id, customer_id, delivery_date, delivered, quantity_delivered,
             amount_billed, delivered_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (customer_id, delivery_date) DO UPDATE
        SET delivered = EXCLUDED.delivered,
            quantity_delivered = EXCLUDED.quantity_delivered,
            amount_billed = EXCLUDED.amount_billed,
            delivered_by = EXCLUDED.delivered_by,
            updated_at = NOW()
        RETURNING {DELIVERY_COLUMNS}
        "
    ))
    .bind(mark.business_id)
    .bind(mark.customer_id)
    .bind(mark.delivery_date)
    .bind(mark.delivered)
    .bind(mark.quantity_delivered)
    .bind(mark.amount_billed)
    .bind(mark.delivered_by)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Overwrite a delivery's editable fields with their final values.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the new date collides with another
/// delivery of the same customer.
pub async fn store_fields(
    conn: &mut PgConnection,
    delivery: &Delivery,
) -> Result<Delivery, RepositoryError> {
    let row = sqlx::query_as::<_, DeliveryRow>(&format!(
        r"
        UPDATE aqua.daily_delivery
        SET delivery_date = $2,
            quantity_delivered = $3,
            amount_billed = $4,
            notes = $5,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {DELIVERY_COLUMNS}
        "
    ))
    .bind(delivery.id)
    .bind(delivery.delivery_date)
    .bind(delivery.quantity_delivered)
    .bind(delivery.amount_billed)
    .bind(delivery.notes.as_deref())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| RepositoryError::conflict_on_unique(e, DUPLICATE_DELIVERY))?;

    row.map(Into::into).ok_or(RepositoryError::NotFound)
}

/// Replace a delivery's payment.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the delivery is gone.
pub async fn store_payment(
    conn: &mut PgConnection,
    id: DeliveryId,
    paid_amount: Decimal,
    is_paid: bool,
) -> Result<Delivery, RepositoryError> {
    let row = sqlx::query_as::<_, DeliveryRow>(&format!(
        r"
        UPDATE aqua.daily_delivery
        SET paid_amount = $2, is_paid = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {DELIVERY_COLUMNS}
        "
    ))
    .bind(id)
    .bind(paid_amount)
    .bind(is_paid)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Into::into).ok_or(RepositoryError::NotFound)
}

/// The customer a delivery belongs to, read without locking.
///
/// Writers call this first so they can lock the customer before the
/// delivery, the same order a mark takes.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn owner_of(
    conn: &mut PgConnection,
    business: &BusinessId,
    id: DeliveryId,
) -> Result<Option<CustomerId>, RepositoryError> {
    let owner = sqlx::query_scalar::<_, CustomerId>(
        "SELECT customer_id FROM aqua.daily_delivery WHERE business_id = $1 AND id = $2",
    )
    .bind(business)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(owner)
}
