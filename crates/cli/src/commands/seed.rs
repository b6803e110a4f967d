//! Seed a business with demo data.
//!
//! Creates an admin and a delivery worker, five daily customers with a few
//! days of delivery history and three bulk orders. Safe to run twice: users
//! are matched by email, customers and bulk orders are only created for a
//! business that has none, and marks are upserts.
//!
//! # Usage
//!
//! ```bash
//! al-cli seed --days 7
//! ```

use chrono::Duration;
use rust_decimal::Decimal;

use aqualedger_core::{BottleType, BusinessId, CustomerId, Email, EventType, UserRole};
use aqualedger_server::config::ServerConfig;
use aqualedger_server::db::bulk_orders::{BulkOrderFields, BulkOrderFilter};
use aqualedger_server::db::customers::NewCustomer;
use aqualedger_server::db::users::NewUser;
use aqualedger_server::db::{BulkOrderRepository, CustomerRepository, UserRepository};
use aqualedger_server::models::{CurrentUser, User};
use aqualedger_server::services::LedgerService;
use aqualedger_server::services::ledger::MarkDelivery;
use sqlx::PgPool;

use super::{CliError, business_or_default, connect};

const SEED_USERS: [(&str, &str, &str, UserRole); 2] = [
    ("admin@waterdelivery.com", "Admin User", "9876543210", UserRole::Admin),
    ("worker@waterdelivery.com", "Delivery Worker", "9876543211", UserRole::Worker),
];

// (name, address, phone, bottle type, price per bottle)
const SEED_CUSTOMERS: [(&str, &str, &str, BottleType, i64); 5] = [
    ("Rajesh Kumar", "123 MG Road, Bangalore", "9876501234", BottleType::L20, 50),
    ("Priya Sharma", "456 Brigade Road, Bangalore", "9876501235", BottleType::L20, 50),
    ("Amit Patel", "789 Indiranagar, Bangalore", "9876501236", BottleType::L10, 30),
    ("Sneha Reddy", "321 Koramangala, Bangalore", "9876501237", BottleType::L20, 50),
    ("Vikram Singh", "654 Whitefield, Bangalore", "9876501238", BottleType::L20, 50),
];

/// Seed demo data for the `--business` flag or the configured default.
pub async fn run(days: u32, business: Option<String>) -> Result<(), CliError> {
    let (config, pool) = connect().await?;
    let business = business_or_default(business, &config);

    let admin = seed_users(&pool, &business).await?;
    let customers = seed_customers(&pool, &business, &admin).await?;
    let marks = seed_deliveries(&pool, &config, &admin, &customers, days).await?;
    let orders = seed_bulk_orders(&pool, &config, &business, &admin).await?;

    tracing::info!(
        business = %business,
        customers = customers.len(),
        marks,
        bulk_orders = orders,
        "Seed complete"
    );
    Ok(())
}

/// Create the demo users that do not exist yet. Returns the admin.
async fn seed_users(pool: &PgPool, business: &BusinessId) -> Result<CurrentUser, CliError> {
    let users = UserRepository::new(pool);
    let mut admin: Option<User> = None;

    for (email, name, phone, role) in SEED_USERS {
        let email = Email::parse(email).map_err(|e| CliError::Invalid(e.to_string()))?;

        let user = match users.get_by_email(&email).await? {
            Some(existing) => {
                tracing::info!(email = %email, "User already exists, skipping");
                existing
            }
            None => {
                let new = NewUser {
                    email: &email,
                    name,
                    phone: Some(phone),
                    business_id: business,
                };
                let created = users.create_with_role(&new, role).await?;
                tracing::info!(email = %email, role = %role, "User created");
                created
            }
        };

        if role.is_admin() {
            admin = Some(user);
        }
    }

    let admin = admin.ok_or_else(|| CliError::Invalid("admin user missing".to_owned()))?;
    if admin.business_id != *business {
        return Err(CliError::Invalid(format!(
            "{} belongs to business {}",
            admin.email, admin.business_id
        )));
    }
    Ok(CurrentUser::from(&admin))
}

/// Create the demo customers when the business has none.
async fn seed_customers(
    pool: &PgPool,
    business: &BusinessId,
    admin: &CurrentUser,
) -> Result<Vec<CustomerId>, CliError> {
    let repo = CustomerRepository::new(pool);

    let existing = repo.ids(business).await?;
    if !existing.is_empty() {
        tracing::info!(count = existing.len(), "Customers already exist, skipping");
        return Ok(existing);
    }

    let mut ids = Vec::with_capacity(SEED_CUSTOMERS.len());
    for (name, address, phone, bottle_type, price) in SEED_CUSTOMERS {
        let customer = repo
            .create(
                business,
                &NewCustomer {
                    name: name.to_owned(),
                    address: address.to_owned(),
                    phone: phone.to_owned(),
                    bottle_type,
                    price_per_bottle: Decimal::from(price),
                    is_active: true,
                },
                Some(admin.id),
            )
            .await?;
        ids.push(customer.id);
    }

    tracing::info!(count = ids.len(), "Customers created");
    Ok(ids)
}

/// Mark deliveries for the last `days` days, skipping a fixed pattern of
/// customer-days so that balances differ.
async fn seed_deliveries(
    pool: &PgPool,
    config: &ServerConfig,
    admin: &CurrentUser,
    customers: &[CustomerId],
    days: u32,
) -> Result<usize, CliError> {
    let ledger = LedgerService::new(pool, config.calendar);
    let today = config.calendar.today();
    let mut marks = 0;

    for offset in 1..=i64::from(days) {
        let date = today - Duration::days(offset);

        for (index, &customer_id) in (0_i64..).zip(customers) {
            if (offset + index) % 4 == 0 {
                continue;
            }
            ledger
                .mark_delivery(
                    admin,
                    MarkDelivery {
                        customer_id,
                        delivered: true,
                        quantity: Some(if index % 2 == 0 { 1 } else { 2 }),
                        date: Some(date),
                    },
                )
                .await?;
            marks += 1;
        }
    }

    tracing::info!(marks, days, "Deliveries marked");
    Ok(marks)
}

/// Create the demo bulk orders when the business has none.
async fn seed_bulk_orders(
    pool: &PgPool,
    config: &ServerConfig,
    business: &BusinessId,
    admin: &CurrentUser,
) -> Result<usize, CliError> {
    let existing = BulkOrderRepository::new(pool)
        .list(business, BulkOrderFilter::default())
        .await?;
    if !existing.is_empty() {
        tracing::info!(count = existing.len(), "Bulk orders already exist, skipping");
        return Ok(0);
    }

    let today = config.calendar.today();
    let orders = [
        BulkOrderFields {
            customer_name: "Ramesh Wedding Hall".to_owned(),
            phone: "9876512345".to_owned(),
            address: "12 Palace Road, Bangalore".to_owned(),
            event_type: EventType::Wedding,
            delivery_dates: vec![today + Duration::days(5)],
            quantity: 100,
            bottle_type: BottleType::L20,
            price_per_bottle: Decimal::from(45),
            paid_amount: Decimal::from(2250),
            notes: Some("Deliver before 8 AM".to_owned()),
        },
        BulkOrderFields {
            customer_name: "Tech Corp Annual Meet".to_owned(),
            phone: "9876512346".to_owned(),
            address: "Tech Park, Electronic City, Bangalore".to_owned(),
            event_type: EventType::Corporate,
            delivery_dates: vec![today + Duration::days(10), today + Duration::days(11)],
            quantity: 50,
            bottle_type: BottleType::L20,
            price_per_bottle: Decimal::from(45),
            paid_amount: Decimal::from(2250),
            notes: None,
        },
        BulkOrderFields {
            customer_name: "Birthday Party - Sharma Residence".to_owned(),
            phone: "9876512347".to_owned(),
            address: "88 HSR Layout, Bangalore".to_owned(),
            event_type: EventType::Party,
            delivery_dates: vec![today + Duration::days(3)],
            quantity: 20,
            bottle_type: BottleType::L20,
            price_per_bottle: Decimal::from(50),
            paid_amount: Decimal::ZERO,
            notes: None,
        },
    ];

    let ledger = LedgerService::new(pool, config.calendar);
    let count = orders.len();
    for fields in orders {
        let order = ledger.create_bulk_order(admin, fields).await?;
        tracing::info!(order = %order.id, status = %order.payment_status, "Bulk order created");
    }

    Ok(count)
}
