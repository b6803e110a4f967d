//! Integration tests for daily deliveries and customer totals.
//!
//! These tests require a `PostgreSQL` database (`AQUALEDGER_DATABASE_URL`).

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;

use aqualedger_core::CustomerId;

use aqualedger_integration_tests::{TestContext, fresh_business};
use aqualedger_server::models::CurrentUser;
use aqualedger_server::services::ServiceError;
use aqualedger_server::services::ledger::{DeliveryPatch, MarkDelivery, NewDelivery};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn mark(customer_id: CustomerId, delivered: bool, quantity: Option<i32>, date: NaiveDate) -> MarkDelivery {
    MarkDelivery {
        customer_id,
        delivered,
        quantity,
        date: Some(date),
    }
}

// =============================================================================
// Marking
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_repeated_mark_bills_once() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Rajesh Kumar", 50).await;
    let date = day(2024, 3, 4);

    for _ in 0..3 {
        let marked = ctx
            .ledger()
            .mark_delivery(&ctx.user, mark(customer.id, true, Some(2), date))
            .await
            .unwrap();
        assert_eq!(marked.amount_billed, Decimal::from(100));
    }

    let customer = ctx.reload(&customer).await;
    assert_eq!(customer.total_billed, Decimal::from(100));
    assert_eq!(customer.pending_balance, Decimal::from(100));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_unmark_restores_totals() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Priya Sharma", 50).await;
    let date = day(2024, 3, 5);

    ctx.ledger()
        .mark_delivery(&ctx.user, mark(customer.id, true, None, date))
        .await
        .unwrap();
    let unmarked = ctx
        .ledger()
        .mark_delivery(&ctx.user, mark(customer.id, false, None, date))
        .await
        .unwrap();

    assert!(!unmarked.delivered);
    assert_eq!(unmarked.quantity_delivered, 0);
    assert_eq!(unmarked.amount_billed, Decimal::ZERO);

    let customer = ctx.reload(&customer).await;
    assert_eq!(customer.total_billed, Decimal::ZERO);
    assert_eq!(customer.pending_balance, Decimal::ZERO);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_mark_with_zero_quantity_bills_one_bottle() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Sneha Reddy", 50).await;

    let marked = ctx
        .ledger()
        .mark_delivery(&ctx.user, mark(customer.id, true, Some(0), day(2024, 3, 12)))
        .await
        .unwrap();

    assert_eq!(marked.quantity_delivered, 1);
    assert_eq!(marked.amount_billed, Decimal::from(50));
    assert_eq!(ctx.reload(&customer).await.total_billed, Decimal::from(50));

    let err = ctx
        .ledger()
        .mark_delivery(&ctx.user, mark(customer.id, true, Some(-1), day(2024, 3, 13)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_mark_other_business_customer_is_not_found() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Amit Patel", 30).await;

    let outsider = CurrentUser {
        business_id: fresh_business(),
        ..ctx.user.clone()
    };
    let err = ctx
        .ledger()
        .mark_delivery(&outsider, mark(customer.id, true, None, day(2024, 3, 6)))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::NotFound("Customer")));
}

// =============================================================================
// Recording
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_second_delivery_same_day_conflicts() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Sneha Reddy", 50).await;
    let new = || NewDelivery {
        customer_id: customer.id,
        quantity: 1,
        delivery_date: Some(day(2024, 3, 7)),
        notes: None,
        is_paid: false,
        paid_amount: None,
    };

    ctx.ledger().record_delivery(&ctx.user, new()).await.unwrap();
    let err = ctx.ledger().record_delivery(&ctx.user, new()).await.unwrap_err();

    assert!(matches!(err, ServiceError::Conflict(_)));
    let customer = ctx.reload(&customer).await;
    assert_eq!(customer.total_billed, Decimal::from(50));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_concurrent_same_day_records_keep_one_row() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Amit Patel", 30).await;
    let new = || NewDelivery {
        customer_id: customer.id,
        quantity: 1,
        delivery_date: Some(day(2024, 3, 11)),
        notes: None,
        is_paid: false,
        paid_amount: None,
    };

    let (a, b) = (ctx.ledger(), ctx.ledger());
    let (first, second) = tokio::join!(
        a.record_delivery(&ctx.user, new()),
        b.record_delivery(&ctx.user, new()),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(ServiceError::Conflict(_))))
    );

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM aqua.daily_delivery WHERE customer_id = $1")
        .bind(customer.id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(ctx.reload(&customer).await.total_billed, Decimal::from(30));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_partial_then_full_payment() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Vikram Singh", 50).await;

    let delivery = ctx
        .ledger()
        .record_delivery(
            &ctx.user,
            NewDelivery {
                customer_id: customer.id,
                quantity: 2,
                delivery_date: Some(day(2024, 3, 8)),
                notes: None,
                is_paid: false,
                paid_amount: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(delivery.amount_billed, Decimal::from(100));

    let partial = ctx
        .ledger()
        .record_delivery_payment(&ctx.user, delivery.id, Decimal::from(60))
        .await
        .unwrap();
    assert!(!partial.is_paid);
    let reloaded = ctx.reload(&customer).await;
    assert_eq!(reloaded.total_paid, Decimal::from(60));
    assert_eq!(reloaded.pending_balance, Decimal::from(40));

    let full = ctx
        .ledger()
        .record_delivery_payment(&ctx.user, delivery.id, Decimal::from(100))
        .await
        .unwrap();
    assert!(full.is_paid);
    let reloaded = ctx.reload(&customer).await;
    assert_eq!(reloaded.total_paid, Decimal::from(100));
    assert_eq!(reloaded.pending_balance, Decimal::ZERO);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_update_quantity_rebills_at_current_price() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Rajesh Kumar", 50).await;

    let delivery = ctx
        .ledger()
        .record_delivery(
            &ctx.user,
            NewDelivery {
                customer_id: customer.id,
                quantity: 1,
                delivery_date: Some(day(2024, 3, 9)),
                notes: None,
                is_paid: false,
                paid_amount: None,
            },
        )
        .await
        .unwrap();

    let updated = ctx
        .ledger()
        .update_delivery(
            &ctx.user,
            delivery.id,
            DeliveryPatch {
                quantity: Some(3),
                ..DeliveryPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.amount_billed, Decimal::from(150));
    assert_eq!(ctx.reload(&customer).await.total_billed, Decimal::from(150));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_oversized_delivery_is_a_validation_error() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Vikram Singh", 1000).await;

    let err = ctx
        .ledger()
        .record_delivery(
            &ctx.user,
            NewDelivery {
                customer_id: customer.id,
                quantity: 2_000_000_000,
                delivery_date: Some(day(2024, 3, 14)),
                notes: None,
                is_paid: false,
                paid_amount: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Validation(ref m) if m == "Amount is too large"));
    assert_eq!(ctx.reload(&customer).await.total_billed, Decimal::ZERO);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_totals_overflow_is_a_validation_error() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Rajesh Kumar", 600_000_000).await;
    let new = |d| NewDelivery {
        customer_id: customer.id,
        quantity: 1000,
        delivery_date: Some(day(2024, 3, d)),
        notes: None,
        is_paid: false,
        paid_amount: None,
    };

    ctx.ledger().record_delivery(&ctx.user, new(15)).await.unwrap();
    let err = ctx
        .ledger()
        .record_delivery(&ctx.user, new(16))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Validation(ref m) if m == "Amount is too large"));
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM aqua.daily_delivery WHERE customer_id = $1")
        .bind(customer.id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

// =============================================================================
// Reconciliation
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_reconcile_repairs_drifted_totals() {
    let ctx = TestContext::new().await;
    let customer = ctx.customer("Priya Sharma", 50).await;
    ctx.ledger()
        .mark_delivery(&ctx.user, mark(customer.id, true, Some(2), day(2024, 3, 10)))
        .await
        .unwrap();

    sqlx::query("UPDATE aqua.daily_customer SET total_billed = 999, pending_balance = 999 - total_paid WHERE id = $1")
        .bind(customer.id)
        .execute(&ctx.pool)
        .await
        .unwrap();

    let dry = ctx.ledger().reconcile(&ctx.business, true).await.unwrap();
    assert_eq!(dry.len(), 1);
    assert_eq!(dry[0].recomputed.total_billed, Decimal::from(100));
    assert_eq!(ctx.reload(&customer).await.total_billed, Decimal::from(999));

    let repaired = ctx.ledger().reconcile(&ctx.business, false).await.unwrap();
    assert_eq!(repaired.len(), 1);
    let customer = ctx.reload(&customer).await;
    assert_eq!(customer.total_billed, Decimal::from(100));
    assert_eq!(customer.pending_balance, Decimal::from(100));

    assert!(ctx.ledger().reconcile(&ctx.business, true).await.unwrap().is_empty());
}
