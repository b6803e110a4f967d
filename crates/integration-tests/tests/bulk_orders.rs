//! Integration tests for bulk event orders.
//!
//! These tests require a `PostgreSQL` database (`AQUALEDGER_DATABASE_URL`).

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;

use aqualedger_core::{BottleType, EventType, PaymentStatus};
use aqualedger_integration_tests::TestContext;
use aqualedger_server::db::bulk_orders::BulkOrderFields;
use aqualedger_server::services::ServiceError;
use aqualedger_server::services::ledger::BulkOrderPatch;

fn wedding_order(paid: i64) -> BulkOrderFields {
    BulkOrderFields {
        customer_name: "Ramesh Wedding Hall".to_string(),
        phone: "9876512345".to_string(),
        address: "12 Palace Road".to_string(),
        event_type: EventType::Wedding,
        delivery_dates: vec![NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()],
        quantity: 100,
        bottle_type: BottleType::L20,
        price_per_bottle: Decimal::from(45),
        paid_amount: Decimal::from(paid),
        notes: None,
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_partial_payment_derives_amounts() {
    let ctx = TestContext::new().await;

    let order = ctx
        .ledger()
        .create_bulk_order(&ctx.user, wedding_order(2250))
        .await
        .unwrap();

    assert_eq!(order.total_amount, Decimal::from(4500));
    assert_eq!(order.pending_amount, Decimal::from(2250));
    assert_eq!(order.payment_status, PaymentStatus::Partial);
    assert_eq!(order.created_by, Some(ctx.user.id));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_payment_replaces_paid_amount() {
    let ctx = TestContext::new().await;
    let order = ctx
        .ledger()
        .create_bulk_order(&ctx.user, wedding_order(0))
        .await
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);

    let order = ctx
        .ledger()
        .record_bulk_order_payment(&ctx.user, order.id, Decimal::from(4500))
        .await
        .unwrap();

    assert_eq!(order.paid_amount, Decimal::from(4500));
    assert_eq!(order.pending_amount, Decimal::ZERO);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_overpayment_is_paid_with_credit() {
    let ctx = TestContext::new().await;
    let order = ctx
        .ledger()
        .create_bulk_order(&ctx.user, wedding_order(1000))
        .await
        .unwrap();

    let order = ctx
        .ledger()
        .record_bulk_order_payment(&ctx.user, order.id, Decimal::from(5000))
        .await
        .unwrap();

    assert_eq!(order.paid_amount, Decimal::from(5000));
    assert_eq!(order.pending_amount, Decimal::from(-500));
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_reduce_quantity_after_full_payment() {
    let ctx = TestContext::new().await;
    let order = ctx
        .ledger()
        .create_bulk_order(&ctx.user, wedding_order(4500))
        .await
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);

    let order = ctx
        .ledger()
        .update_bulk_order(
            &ctx.user,
            order.id,
            BulkOrderPatch {
                quantity: Some(90),
                ..BulkOrderPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(order.total_amount, Decimal::from(4050));
    assert_eq!(order.paid_amount, Decimal::from(4500));
    assert_eq!(order.pending_amount, Decimal::from(-450));
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_oversized_order_is_a_validation_error() {
    let ctx = TestContext::new().await;
    let mut fields = wedding_order(0);
    fields.quantity = i32::MAX;
    fields.price_per_bottle = Decimal::from(1000);

    let err = ctx
        .ledger()
        .create_bulk_order(&ctx.user, fields)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Validation(ref m) if m == "Amount is too large"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_quantity_change_rederives_status() {
    let ctx = TestContext::new().await;
    let order = ctx
        .ledger()
        .create_bulk_order(&ctx.user, wedding_order(2250))
        .await
        .unwrap();

    let order = ctx
        .ledger()
        .update_bulk_order(
            &ctx.user,
            order.id,
            BulkOrderPatch {
                quantity: Some(50),
                ..BulkOrderPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(order.total_amount, Decimal::from(2250));
    assert_eq!(order.pending_amount, Decimal::ZERO);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_order_without_dates_is_rejected() {
    let ctx = TestContext::new().await;
    let mut fields = wedding_order(0);
    fields.delivery_dates.clear();

    let err = ctx
        .ledger()
        .create_bulk_order(&ctx.user, fields)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Validation(_)));
}
