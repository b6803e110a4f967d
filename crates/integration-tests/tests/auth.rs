//! Integration tests for one-time code sign-in.
//!
//! These tests require a `PostgreSQL` database (`AQUALEDGER_DATABASE_URL`).
//! No mailer is configured, so issued codes come back from `send_otp`.

#![allow(clippy::unwrap_used)]

use aqualedger_core::UserRole;
use aqualedger_integration_tests::{fresh_business, test_pool, unique_email};
use aqualedger_server::db::UserRepository;
use aqualedger_server::services::{AuthError, AuthService};

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_first_user_of_business_is_admin() {
    let pool = test_pool().await;
    let business = fresh_business();
    let auth = AuthService::new(&pool, None, 10, &business);

    let first = unique_email("owner");
    let issued = auth.send_otp(&first).await.unwrap();
    let owner = auth
        .verify_otp(&first, &issued.code, Some("Owner"), None)
        .await
        .unwrap();
    assert_eq!(owner.role, UserRole::Admin);
    assert_eq!(owner.business_id, business);
    assert_eq!(owner.name, "Owner");

    let second = unique_email("worker");
    let issued = auth.send_otp(&second).await.unwrap();
    let worker = auth.verify_otp(&second, &issued.code, None, None).await.unwrap();
    assert_eq!(worker.role, UserRole::Worker);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_code_is_single_use() {
    let pool = test_pool().await;
    let business = fresh_business();
    let auth = AuthService::new(&pool, None, 10, &business);
    let email = unique_email("once");

    let issued = auth.send_otp(&email).await.unwrap();
    auth.verify_otp(&email, &issued.code, None, None).await.unwrap();

    let err = auth
        .verify_otp(&email, &issued.code, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::OtpNotFound));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_new_code_replaces_old() {
    let pool = test_pool().await;
    let business = fresh_business();
    let auth = AuthService::new(&pool, None, 10, &business);
    let email = unique_email("resend");

    let old = auth.send_otp(&email).await.unwrap();
    let new = auth.send_otp(&email).await.unwrap();

    if old.code != new.code {
        let err = auth.verify_otp(&email, &old.code, None, None).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidOtp));
    }
    auth.verify_otp(&email, &new.code, None, None).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_expired_code_is_rejected() {
    let pool = test_pool().await;
    let business = fresh_business();
    let auth = AuthService::new(&pool, None, 0, &business);
    let email = unique_email("late");

    let issued = auth.send_otp(&email).await.unwrap();
    let err = auth
        .verify_otp(&email, &issued.code, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::OtpExpired));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_deactivated_user_cannot_sign_in() {
    let pool = test_pool().await;
    let business = fresh_business();
    let auth = AuthService::new(&pool, None, 10, &business);
    let email = unique_email("blocked");

    let issued = auth.send_otp(&email).await.unwrap();
    let user = auth.verify_otp(&email, &issued.code, None, None).await.unwrap();
    UserRepository::new(&pool).set_active(user.id, false).await.unwrap();

    let issued = auth.send_otp(&email).await.unwrap();
    let err = auth
        .verify_otp(&email, &issued.code, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountDisabled));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (AQUALEDGER_DATABASE_URL)"]
async fn test_malformed_input_is_rejected_before_lookup() {
    let pool = test_pool().await;
    let business = fresh_business();
    let auth = AuthService::new(&pool, None, 10, &business);

    assert!(matches!(
        auth.send_otp("not-an-email").await.unwrap_err(),
        AuthError::InvalidEmail
    ));
    assert!(matches!(
        auth.verify_otp(&unique_email("x"), "12ab", None, None)
            .await
            .unwrap_err(),
        AuthError::InvalidCodeFormat
    ));
}
