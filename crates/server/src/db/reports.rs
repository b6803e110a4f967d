//! Aggregate queries behind the dashboard.
//!
//! Deliveries are bucketed by `delivery_date`, which is already a
//! business-local day. Bulk orders are bucketed by `created_at` shifted into
//! the business's UTC offset, passed in as whole seconds.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use aqualedger_core::{BusinessId, YearMonth};

use super::RepositoryError;

/// Billed amount and bottle count over a set of deliveries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct DeliverySums {
    pub amount: Decimal,
    pub quantity: i64,
}

/// Outstanding money across the business.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct PendingSums {
    pub customers: Decimal,
    pub bulk_orders: Decimal,
}

/// Customer head counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct CustomerCounts {
    pub active: i64,
    pub total: i64,
}

/// Delivery revenue on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub quantity: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct MonthRow {
    year: i32,
    month: i32,
    amount: Decimal,
}

/// Repository for dashboard aggregates.
pub struct ReportRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReportRepository<'a> {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Sum deliveries with `from <= delivery_date < before`. An open `before`
    /// runs to the latest recorded day.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn delivery_sums(
        &self,
        business: &BusinessId,
        from: NaiveDate,
        before: Option<NaiveDate>,
    ) -> Result<DeliverySums, RepositoryError> {
        let sums = sqlx::query_as::<_, DeliverySums>(
            r"
            SELECT COALESCE(SUM(amount_billed), 0) AS amount,
                   COALESCE(SUM(quantity_delivered), 0)::BIGINT AS quantity
            FROM aqua.daily_delivery
            WHERE business_id = $1
              AND delivery_date >= $2
              AND ($3::DATE IS NULL OR delivery_date < $3)
            ",
        )
        .bind(business)
        .bind(from)
        .bind(before)
        .fetch_one(self.pool)
        .await?;

        Ok(sums)
    }

    /// Sum `total_amount` of bulk orders created in `[from, before)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn bulk_order_total(
        &self,
        business: &BusinessId,
        from: DateTime<Utc>,
        before: Option<DateTime<Utc>>,
    ) -> Result<Decimal, RepositoryError> {
        let total: Decimal = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(total_amount), 0)
            FROM aqua.bulk_order
            WHERE business_id = $1
              AND created_at >= $2
              AND ($3::TIMESTAMPTZ IS NULL OR created_at < $3)
            ",
        )
        .bind(business)
        .bind(from)
        .bind(before)
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }

    /// Customer pending balances plus unpaid bulk order remainders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn pending_sums(&self, business: &BusinessId) -> Result<PendingSums, RepositoryError> {
        let sums = sqlx::query_as::<_, PendingSums>(
            r"
            SELECT
                (SELECT COALESCE(SUM(pending_balance), 0)
                 FROM aqua.daily_customer WHERE business_id = $1) AS customers,
                (SELECT COALESCE(SUM(pending_amount), 0)
                 FROM aqua.bulk_order
                 WHERE business_id = $1 AND payment_status IN ('pending', 'partial')) AS bulk_orders
            ",
        )
        .bind(business)
        .fetch_one(self.pool)
        .await?;

        Ok(sums)
    }

    /// Count active and all customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn customer_counts(
        &self,
        business: &BusinessId,
    ) -> Result<CustomerCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, CustomerCounts>(
            r"
            SELECT COUNT(*) FILTER (WHERE is_active) AS active, COUNT(*) AS total
            FROM aqua.daily_customer
            WHERE business_id = $1
            ",
        )
        .bind(business)
        .fetch_one(self.pool)
        .await?;

        Ok(counts)
    }

    /// Per-day delivery totals for `from..=to`, ascending. Days without
    /// deliveries are absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn daily_trend(
        &self,
        business: &BusinessId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TrendPoint>, RepositoryError> {
        let points = sqlx::query_as::<_, TrendPoint>(
            r"
            SELECT delivery_date AS date,
                   SUM(amount_billed) AS amount,
                   SUM(quantity_delivered)::BIGINT AS quantity
            FROM aqua.daily_delivery
            WHERE business_id = $1 AND delivery_date BETWEEN $2 AND $3
            GROUP BY delivery_date
            ORDER BY delivery_date
            ",
        )
        .bind(business)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool)
        .await?;

        Ok(points)
    }

    /// Delivery revenue per calendar month from `from`'s month onward.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn monthly_delivery_totals(
        &self,
        business: &BusinessId,
        from: YearMonth,
    ) -> Result<Vec<(YearMonth, Decimal)>, RepositoryError> {
        let rows = sqlx::query_as::<_, MonthRow>(
            r"
            SELECT EXTRACT(YEAR FROM delivery_date)::INT AS year,
                   EXTRACT(MONTH FROM delivery_date)::INT AS month,
                   SUM(amount_billed) AS amount
            FROM aqua.daily_delivery
            WHERE business_id = $1 AND delivery_date >= $2
            GROUP BY 1, 2
            ORDER BY 1, 2
            ",
        )
        .bind(business)
        .bind(from.first_day())
        .fetch_all(self.pool)
        .await?;

        month_rows(rows)
    }

    /// Bulk order revenue per business-local calendar month, for orders
    /// created at or after `from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn monthly_bulk_order_totals(
        &self,
        business: &BusinessId,
        from: DateTime<Utc>,
        utc_offset_secs: i32,
    ) -> Result<Vec<(YearMonth, Decimal)>, RepositoryError> {
        let rows = sqlx::query_as::<_, MonthRow>(
            r"
            WITH local AS (
                SELECT ((created_at AT TIME ZONE 'UTC') + make_interval(secs => $3))::DATE AS day,
                       total_amount
                FROM aqua.bulk_order
                WHERE business_id = $1 AND created_at >= $2
            )
            SELECT EXTRACT(YEAR FROM day)::INT AS year,
                   EXTRACT(MONTH FROM day)::INT AS month,
                   SUM(total_amount) AS amount
            FROM local
            GROUP BY 1, 2
            ORDER BY 1, 2
            ",
        )
        .bind(business)
        .bind(from)
        .bind(f64::from(utc_offset_secs))
        .fetch_all(self.pool)
        .await?;

        month_rows(rows)
    }
}

fn month_rows(rows: Vec<MonthRow>) -> Result<Vec<(YearMonth, Decimal)>, RepositoryError> {
    rows.into_iter()
        .map(|row| {
            let month = u32::try_from(row.month)
                .ok()
                .and_then(|m| YearMonth::new(row.year, m).ok())
                .ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "invalid month bucket {}-{}",
                        row.year, row.month
                    ))
                })?;
            Ok((month, row.amount))
        })
        .collect()
}
