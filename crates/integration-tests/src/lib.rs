//! Integration tests for Aqualedger.
//!
//! # Running Tests
//!
//! ```bash
//! # Database-backed tests (migrations are applied automatically)
//! AQUALEDGER_DATABASE_URL=postgres://... cargo test -p aqualedger-integration-tests -- --ignored
//!
//! # HTTP tests additionally need a running server
//! AQUALEDGER_TEST_BASE_URL=http://localhost:5000 cargo test -p aqualedger-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `ledger` - Daily deliveries and customer totals
//! - `bulk_orders` - Bulk order amounts and payment status
//! - `reports` - Matrix, report totals and CSV export
//! - `auth` - One-time code sign-in
//! - `api` - HTTP surface of a running server
//!
//! Every database test works inside its own freshly named business, so tests
//! can share one database and run in parallel.

use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use aqualedger_core::{BottleType, BusinessId, Email, UserRole};
use aqualedger_server::config::BusinessCalendar;
use aqualedger_server::db::customers::NewCustomer;
use aqualedger_server::db::users::NewUser;
use aqualedger_server::db::{self, CustomerRepository, MIGRATOR, UserRepository};
use aqualedger_server::models::{CurrentUser, Customer};
use aqualedger_server::services::{LedgerService, ReportService};
use rust_decimal::Decimal;

/// Connect to the test database and apply migrations.
///
/// # Panics
///
/// Panics if no database URL is configured or the database is unreachable.
pub async fn test_pool() -> PgPool {
    dotenvy::dotenv().ok();

    let url = std::env::var("AQUALEDGER_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("AQUALEDGER_DATABASE_URL or DATABASE_URL must be set");

    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to test database");
    MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// Base URL of a running server for HTTP tests.
#[must_use]
pub fn base_url() -> String {
    std::env::var("AQUALEDGER_TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// A business no other test uses.
#[must_use]
pub fn fresh_business() -> BusinessId {
    BusinessId::new(format!("test-{}", Uuid::new_v4().simple()))
}

/// An email address no other test uses.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// A signed-in user for exercising services.
pub struct TestContext {
    pub pool: PgPool,
    pub business: BusinessId,
    pub user: CurrentUser,
}

impl TestContext {
    /// Fresh business with an admin user.
    ///
    /// # Panics
    ///
    /// Panics if the database is unreachable.
    pub async fn new() -> Self {
        let pool = test_pool().await;
        let business = fresh_business();

        let email = Email::parse(&unique_email("admin")).expect("valid email");
        let user = UserRepository::new(&pool)
            .create_with_role(
                &NewUser {
                    email: &email,
                    name: "Test Admin",
                    phone: None,
                    business_id: &business,
                },
                UserRole::Admin,
            )
            .await
            .expect("Failed to create test user");

        Self {
            user: CurrentUser::from(&user),
            pool,
            business,
        }
    }

    #[must_use]
    pub fn ledger(&self) -> LedgerService<'_> {
        LedgerService::new(&self.pool, BusinessCalendar::utc())
    }

    #[must_use]
    pub fn reports(&self) -> ReportService<'_> {
        ReportService::new(&self.pool, BusinessCalendar::utc())
    }

    /// Create an active 20L customer at `price` per bottle.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn customer(&self, name: &str, price: i64) -> Customer {
        CustomerRepository::new(&self.pool)
            .create(
                &self.business,
                &NewCustomer {
                    name: name.to_string(),
                    address: "1 Test Street".to_string(),
                    phone: "9000000000".to_string(),
                    bottle_type: BottleType::L20,
                    price_per_bottle: Decimal::from(price),
                    is_active: true,
                },
                Some(self.user.id),
            )
            .await
            .expect("Failed to create customer")
    }

    /// Re-read a customer.
    ///
    /// # Panics
    ///
    /// Panics if the customer is missing.
    pub async fn reload(&self, customer: &Customer) -> Customer {
        CustomerRepository::new(&self.pool)
            .get(&self.business, customer.id)
            .await
            .expect("Failed to load customer")
            .expect("customer exists")
    }
}
