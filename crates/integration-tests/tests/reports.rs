//! Integration tests for the monthly matrix, reports and CSV export.
//!
//! These tests require a `PostgreSQL` database (`AQUALEDGER_DATABASE_URL`).

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;

use aqualedger_core::YearMonth;
use aqualedger_integration_tests::TestContext;
use aqualedger_server::services::ledger::MarkDelivery;
use aqualedger_server::services::reports::{DateRange, ReportKind};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_leap_february_matrix() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Rajesh Kumar", 50).await;

    for (date, delivered) in [(day(2024, 2, 1), true), (day(2024, 2, 29), true), (day(2024, 2, 10), false)] {
        ctx.ledger()
            .mark_delivery(
                &ctx.user,
                MarkDelivery {
                    customer_id: customer.id,
                    delivered,
                    quantity: None,
                    date: Some(date),
                },
            )
            .await
            .unwrap();
    }

    let rows = ctx
        .reports()
        .monthly_matrix(&ctx.business, YearMonth::new(2024, 2).unwrap(), None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let cells = &rows[0].daily_status;
    assert_eq!(cells.len(), 29);
    assert_eq!(cells[0].delivered, Some(true));
    assert_eq!(cells[0].amount, Decimal::from(50));
    assert_eq!(cells[9].delivered, Some(false));
    assert_eq!(cells[28].delivered, Some(true));
    assert_eq!(cells[14].delivered, None);
    assert_eq!(cells[14].quantity, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_customer_payment_totals_balance() {
    let ctx = TestContext::new().await;
    let first = ctx.customer("Priya Sharma", 50).await;
    let second = ctx.customer("Amit Patel", 30).await;

    for (customer, quantity) in [(&first, 2), (&second, 3)] {
        ctx.ledger()
            .mark_delivery(
                &ctx.user,
                MarkDelivery {
                    customer_id: customer.id,
                    delivered: true,
                    quantity: Some(quantity),
                    date: Some(day(2024, 4, 1)),
                },
            )
            .await
            .unwrap();
    }

    let report = ctx
        .reports()
        .customer_payments(&ctx.business, DateRange::default())
        .await
        .unwrap();

    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.totals.total_billed, Decimal::from(190));
    assert_eq!(
        report.totals.total_pending,
        report.totals.total_billed - report.totals.total_paid
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_delivery_summary_respects_range() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Sneha Reddy", 50).await;

    for date in [day(2024, 5, 1), day(2024, 5, 2), day(2024, 5, 3)] {
        ctx.ledger()
            .mark_delivery(
                &ctx.user,
                MarkDelivery {
                    customer_id: customer.id,
                    delivered: true,
                    quantity: None,
                    date: Some(date),
                },
            )
            .await
            .unwrap();
    }

    let report = ctx
        .reports()
        .delivery_summary(
            &ctx.business,
            DateRange {
                start: Some(day(2024, 5, 2)),
                end: Some(day(2024, 5, 3)),
            },
        )
        .await
        .unwrap();

    assert_eq!(report.totals.total_deliveries, 2);
    assert_eq!(report.totals.total_billed, Decimal::from(100));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_customers_export_lists_everyone() {
    let ctx = TestContext::new().await;
    ctx.customer("Vikram Singh", 50).await;
    ctx.customer("Anita \"Annie\" Rao", 40).await;

    let export = ctx
        .reports()
        .export_csv(&ctx.business, ReportKind::Customers, DateRange::default())
        .await
        .unwrap();

    let mut lines = export.body.lines();
    assert!(lines.next().unwrap().starts_with("Name,Phone,Address"));
    assert_eq!(lines.count(), 2);
    assert!(export.body.contains("\"Anita \"\"Annie\"\" Rao\""));
    assert!(export.filename.starts_with("customers_"));
    assert!(export.filename.ends_with(".csv"));
}
