//! Database operations for the `aqua` `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `app_user` - Users who operate the system (admin or worker)
//! - `otp` - Hashed one-time login codes
//! - `daily_customer` - Recurring customers with denormalized ledger totals
//! - `daily_delivery` - One row per customer per calendar day
//! - `bulk_order` - One-off event orders
//! - `session` - tower-sessions store
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/`, embedded in
//! [`MIGRATOR`], and run via:
//! ```bash
//! al-cli migrate
//! ```
//!
//! All queries are runtime-checked (`sqlx::query_as::<_, Row>`) so the crate
//! builds without a live database.

pub mod bulk_orders;
pub mod customers;
pub mod deliveries;
pub mod otps;
pub mod reports;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use bulk_orders::BulkOrderRepository;
pub use customers::CustomerRepository;
pub use deliveries::DeliveryRepository;
pub use otps::OtpRepository;
pub use reports::ReportRepository;
pub use users::UserRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("{0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to [`RepositoryError::Conflict`]
    /// with `message`, passing every other error through.
    pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_string());
        }
        Self::Database(err)
    }

    /// Whether a value overflowed a `NUMERIC` column (SQLSTATE 22003).
    #[must_use]
    pub fn is_numeric_overflow(&self) -> bool {
        matches!(
            self,
            Self::Database(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE)
        )
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
#[must_use]
pub fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("ravi"), "%ravi%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }
}
