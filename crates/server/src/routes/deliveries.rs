//! Daily delivery route handlers.
//!
//! Deliveries are keyed by business-local calendar day (`YYYY-MM-DD`).
//! Every write goes through the ledger service so the customer's totals
//! move in the same transaction.

use std::str::FromStr;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use aqualedger_core::{CustomerId, DeliveryId, LedgerError, YearMonth};

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse};
use crate::db::DeliveryRepository;
use crate::db::deliveries::DeliveryFilter;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CustomerDayStatus, Delivery, DeliveryWithCustomer, MarkedDelivery};
use crate::services::ledger::{DeliveryPatch, MarkDelivery, NewDelivery};
use crate::services::reports::MatrixRow;
use crate::state::AppState;

const MONTH_REQUIRED: &str = "Month parameter is required (format: YYYY-MM)";

/// Build the deliveries router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/today", get(today))
        .route("/today/customers", get(today_customers))
        .route("/monthly", get(monthly))
        .route("/mark", post(mark))
        .route("/{id}", put(update))
        .route("/{id}/payment", post(record_payment))
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub customer_id: Option<CustomerId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyQuery {
    pub month: Option<String>,
    pub customer_id: Option<CustomerId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliveryRequest {
    pub customer_id: Option<CustomerId>,
    pub quantity_delivered: Option<i32>,
    pub delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    pub paid_amount: Option<Decimal>,
}

impl CreateDeliveryRequest {
    fn into_new(self) -> Result<NewDelivery> {
        let customer_id = self
            .customer_id
            .ok_or_else(|| AppError::Validation("Customer ID is required".to_string()))?;
        let quantity = self
            .quantity_delivered
            .ok_or_else(|| AppError::Validation(LedgerError::QuantityTooSmall.to_string()))?;

        Ok(NewDelivery {
            customer_id,
            quantity,
            delivery_date: self.delivery_date,
            notes: super::trimmed(self.notes),
            is_paid: self.is_paid,
            paid_amount: self.paid_amount,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeliveryRequest {
    pub quantity_delivered: Option<i32>,
    pub delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub paid_amount: Option<Decimal>,
}

impl PaymentRequest {
    pub(super) fn amount(&self) -> Result<Decimal> {
        self.paid_amount
            .ok_or_else(|| AppError::Validation(LedgerError::NegativePayment.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub customer_id: Option<CustomerId>,
    pub delivered: Option<bool>,
    pub quantity: Option<i32>,
    pub delivery_date: Option<NaiveDate>,
}

impl MarkRequest {
    fn into_mark(self) -> Result<MarkDelivery> {
        let customer_id = self
            .customer_id
            .ok_or_else(|| AppError::Validation("Customer ID is required".to_string()))?;
        let delivered = self
            .delivered
            .ok_or_else(|| AppError::Validation("Delivered must be a boolean".to_string()))?;

        Ok(MarkDelivery {
            customer_id,
            delivered,
            quantity: self.quantity,
            date: self.delivery_date,
        })
    }
}

/// Parse `?month=YYYY-MM`.
fn parse_month(month: Option<&str>) -> Result<YearMonth> {
    month
        .and_then(|m| YearMonth::from_str(m.trim()).ok())
        .ok_or_else(|| AppError::Validation(MONTH_REQUIRED.to_string()))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/deliveries
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<ApiResponse<Vec<DeliveryWithCustomer>>> {
    let deliveries = DeliveryRepository::new(state.pool())
        .list(
            &user.business_id,
            DeliveryFilter {
                start: query.start_date,
                end: query.end_date,
                customer_id: query.customer_id,
            },
        )
        .await?;

    Ok(ApiResponse::list(deliveries))
}

/// GET /api/deliveries/today
async fn today(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<DeliveryWithCustomer>>> {
    let deliveries = DeliveryRepository::new(state.pool())
        .on_date(&user.business_id, state.calendar().today())
        .await?;

    let total_amount: Decimal = deliveries.iter().map(|d| d.delivery.amount_billed).sum();
    let total_quantity: i64 = deliveries
        .iter()
        .map(|d| i64::from(d.delivery.quantity_delivered))
        .sum();

    Ok(ApiResponse::list(deliveries)
        .with("totalAmount", total_amount)
        .with("totalQuantity", total_quantity))
}

/// GET /api/deliveries/today/customers
async fn today_customers(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<CustomerDayStatus>>> {
    let customers = DeliveryRepository::new(state.pool())
        .day_status(&user.business_id, state.calendar().today())
        .await?;

    Ok(ApiResponse::list(customers))
}

/// GET /api/deliveries/monthly?month=YYYY-MM
async fn monthly(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<MonthlyQuery>,
) -> Result<ApiResponse<Vec<MatrixRow>>> {
    let month = parse_month(query.month.as_deref())?;

    let rows = state
        .reports()
        .monthly_matrix(&user.business_id, month, query.customer_id)
        .await?;

    Ok(ApiResponse::list(rows).with("month", month.to_string()))
}

/// POST /api/deliveries
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<CreateDeliveryRequest>,
) -> Result<(StatusCode, ApiResponse<Delivery>)> {
    let delivery = state.ledger().record_delivery(&user, request.into_new()?).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::data(delivery).with_message("Delivery recorded successfully"),
    ))
}

/// POST /api/deliveries/mark
///
/// Idempotent: marking a day twice leaves one row and bills it once.
async fn mark(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<MarkRequest>,
) -> Result<ApiResponse<MarkedDelivery>> {
    let mark = request.into_mark()?;
    let marked = state.ledger().mark_delivery(&user, mark).await?;

    let message = if marked.delivered {
        "Delivery marked successfully"
    } else {
        "Delivery unmarked successfully"
    };
    Ok(ApiResponse::data(marked).with_message(message))
}

/// PUT /api/deliveries/{id}
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<DeliveryId>,
    ApiJson(request): ApiJson<UpdateDeliveryRequest>,
) -> Result<ApiResponse<Delivery>> {
    let patch = DeliveryPatch {
        quantity: request.quantity_delivered,
        delivery_date: request.delivery_date,
        notes: request.notes,
    };
    let delivery = state.ledger().update_delivery(&user, id, patch).await?;

    Ok(ApiResponse::data(delivery).with_message("Delivery updated successfully"))
}

/// POST /api/deliveries/{id}/payment
async fn record_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<DeliveryId>,
    ApiJson(request): ApiJson<PaymentRequest>,
) -> Result<ApiResponse<Delivery>> {
    let delivery = state
        .ledger()
        .record_delivery_payment(&user, id, request.amount()?)
        .await?;

    Ok(ApiResponse::data(delivery).with_message("Payment recorded successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_month_is_required_and_validated() {
        assert_eq!(
            parse_month(None).unwrap_err().to_string(),
            MONTH_REQUIRED
        );
        assert!(parse_month(Some("2024-13")).is_err());
        let month = parse_month(Some("2024-02")).unwrap();
        assert_eq!(month.days_in_month(), 29);
    }

    #[test]
    fn test_mark_requires_delivered_flag() {
        let request: MarkRequest = serde_json::from_str(r#"{"customerId": 4}"#).unwrap();
        assert_eq!(
            request.into_mark().unwrap_err().to_string(),
            "Delivered must be a boolean"
        );

        let request: MarkRequest =
            serde_json::from_str(r#"{"customerId": 4, "delivered": false}"#).unwrap();
        let mark = request.into_mark().unwrap();
        assert!(!mark.delivered);
        assert!(mark.date.is_none());
    }

    #[test]
    fn test_create_requires_customer_and_quantity() {
        let request: CreateDeliveryRequest =
            serde_json::from_str(r#"{"quantityDelivered": 2}"#).unwrap();
        assert_eq!(
            request.into_new().unwrap_err().to_string(),
            "Customer ID is required"
        );

        let request: CreateDeliveryRequest = serde_json::from_str(
            r#"{"customerId": 1, "quantityDelivered": 2, "deliveryDate": "2024-02-10", "isPaid": true, "paidAmount": 100}"#,
        )
        .unwrap();
        let new = request.into_new().unwrap();
        assert_eq!(new.quantity, 2);
        assert!(new.is_paid);
        assert_eq!(new.paid_amount, Some(Decimal::from(100)));
    }
}
