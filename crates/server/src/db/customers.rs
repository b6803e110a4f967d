//! Daily customer repository.
//!
//! Plain CRUD goes through [`CustomerRepository`]. The ledger functions at
//! the bottom of the module take a `&mut PgConnection` so the ledger service
//! can run them inside its own transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use aqualedger_core::{BottleType, BusinessId, CustomerId, CustomerTotals, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::Customer;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` customer queries.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    business_id: String,
    name: String,
    address: String,
    phone: String,
    bottle_type: BottleType,
    price_per_bottle: Decimal,
    is_active: bool,
    total_billed: Decimal,
    total_paid: Decimal,
    pending_balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: CustomerId::new(row.id),
            business_id: BusinessId::new(row.business_id),
            name: row.name,
            address: row.address,
            phone: row.phone,
            bottle_type: row.bottle_type,
            price_per_bottle: row.price_per_bottle,
            is_active: row.is_active,
            total_billed: row.total_billed,
            total_paid: row.total_paid,
            pending_balance: row.pending_balance,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const CUSTOMER_COLUMNS: &str = "id, business_id, name, address, phone, bottle_type, \
     price_per_bottle, is_active, total_billed, total_paid, pending_balance, created_at, updated_at";

/// Filters for listing customers.
#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    pub is_active: Option<bool>,
    /// Case-insensitive substring of name, phone or address.
    pub search: Option<String>,
}

/// Fields for a new customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub bottle_type: BottleType,
    pub price_per_bottle: Decimal,
    pub is_active: bool,
}

/// Fields an update may change. `None` leaves the column as is.
#[derive(Debug, Clone, Default)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub bottle_type: Option<BottleType>,
    pub price_per_bottle: Option<Decimal>,
    pub is_active: Option<bool>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for customer database operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List customers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, filter), fields(business = %business))]
    pub async fn list(
        &self,
        business: &BusinessId,
        filter: &CustomerFilter,
    ) -> Result<Vec<Customer>, RepositoryError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            SELECT {CUSTOMER_COLUMNS}
            FROM aqua.daily_customer
            WHERE business_id = $1
              AND ($2::BOOLEAN IS NULL OR is_active = $2)
              AND ($3::TEXT IS NULL OR name ILIKE $3 OR phone ILIKE $3 OR address ILIKE $3)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(business)
        .bind(filter.is_active)
        .bind(search)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Active customers sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn list_active_by_name(
        &self,
        business: &BusinessId,
        only: Option<CustomerId>,
    ) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            SELECT {CUSTOMER_COLUMNS}
            FROM aqua.daily_customer
            WHERE business_id = $1
              AND is_active
              AND ($2::INTEGER IS NULL OR id = $2)
            ORDER BY name, id
            "
        ))
        .bind(business)
        .bind(only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Customers created within `[from, to)`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn list_created_between(
        &self,
        business: &BusinessId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Customer>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            SELECT {CUSTOMER_COLUMNS}
            FROM aqua.daily_customer
            WHERE business_id = $1
              AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2)
              AND ($3::TIMESTAMPTZ IS NULL OR created_at < $3)
            ORDER BY name, id
            "
        ))
        .bind(business)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a customer of `business` by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn get(
        &self,
        business: &BusinessId,
        id: CustomerId,
    ) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM aqua.daily_customer WHERE business_id = $1 AND id = $2"
        ))
        .bind(business)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a customer with zeroed ledger totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, new), fields(business = %business, name = %new.name))]
    pub async fn create(
        &self,
        business: &BusinessId,
        new: &NewCustomer,
        created_by: Option<UserId>,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            INSERT INTO aqua.daily_customer
                (business_id, name, address, phone, bottle_type, price_per_bottle, is_active, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(business)
        .bind(&new.name)
        .bind(&new.address)
        .bind(&new.phone)
        .bind(new.bottle_type)
        .bind(new.price_per_bottle)
        .bind(new.is_active)
        .bind(created_by)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Apply a patch. Ledger totals are never touched here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such customer exists in
    /// `business`.
    #[instrument(skip(self, patch), fields(business = %business))]
    pub async fn update(
        &self,
        business: &BusinessId,
        id: CustomerId,
        patch: &CustomerPatch,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            r"
            UPDATE aqua.daily_customer
            SET name = COALESCE($3, name),
                address = COALESCE($4, address),
                phone = COALESCE($5, phone),
                bottle_type = COALESCE($6, bottle_type),
                price_per_bottle = COALESCE($7, price_per_bottle),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(business)
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.address.as_deref())
        .bind(patch.phone.as_deref())
        .bind(patch.bottle_type)
        .bind(patch.price_per_bottle)
        .bind(patch.is_active)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Hard-delete a customer. Their deliveries go with them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such customer exists in
    /// `business`.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn delete(&self, business: &BusinessId, id: CustomerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM aqua.daily_customer WHERE business_id = $1 AND id = $2")
            .bind(business)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// IDs of every customer in `business`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn ids(&self, business: &BusinessId) -> Result<Vec<CustomerId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, CustomerId>(
            "SELECT id FROM aqua.daily_customer WHERE business_id = $1 ORDER BY id",
        )
        .bind(business)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }
}

// =============================================================================
// Ledger (transaction-scoped)
// =============================================================================

/// Lock a customer row for the rest of the transaction.
///
/// Every ledger write takes this lock first, which serializes concurrent
/// mutations of the same customer.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(
    conn: &mut PgConnection,
    business: &BusinessId,
    id: CustomerId,
) -> Result<Option<Customer>, RepositoryError> {
    let row = sqlx::query_as::<_, CustomerRow>(&format!(
        r"
        SELECT {CUSTOMER_COLUMNS}
        FROM aqua.daily_customer
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

/// Sum a customer's deliveries as they stand in the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delivery_totals(
    conn: &mut PgConnection,
    id: CustomerId,
) -> Result<CustomerTotals, RepositoryError> {
    let (billed, paid): (Decimal, Decimal) = sqlx::query_as(
        r"
        SELECT COALESCE(SUM(amount_billed), 0), COALESCE(SUM(paid_amount), 0)
        FROM aqua.daily_delivery
        WHERE customer_id = $1
        ",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(CustomerTotals::new(billed, paid))
}

/// Write new running totals, deriving `pending_balance` from them.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the customer row is gone.
pub async fn store_totals(
    conn: &mut PgConnection,
    id: CustomerId,
    totals: &CustomerTotals,
) -> Result<Customer, RepositoryError> {
    let row = sqlx::query_as::<_, CustomerRow>(&format!(
        r"
        UPDATE aqua.daily_customer
        SET total_billed = $2,
            total_paid = $3,
            pending_balance = $4,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {CUSTOMER_COLUMNS}
        "
    ))
    .bind(id)
    .bind(totals.total_billed)
    .bind(totals.total_paid)
    .bind(totals.pending_balance())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Into::into).ok_or(RepositoryError::NotFound)
}
