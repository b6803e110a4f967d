//! Bulk order route handlers.
//!
//! Totals, pending amount and payment status are never taken from the
//! request; the ledger service derives them on every write.

use std::str::FromStr;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use aqualedger_core::{BottleType, BulkOrderId, EventType, LedgerError, PaymentStatus};

use super::deliveries::PaymentRequest;
use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, required, trimmed};
use crate::db::{BulkOrderRepository, RepositoryError};
use crate::db::bulk_orders::BulkOrderFields;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::BulkOrder;
use crate::services::ledger::BulkOrderPatch;
use crate::services::reports::DateRange;
use crate::state::AppState;

const ORDER_NOT_FOUND: &str = "Order not found";

/// Build the bulk orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route("/{id}/payment", post(record_payment))
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub payment_status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOrderRequest {
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub event_type: Option<String>,
    pub delivery_dates: Option<Vec<NaiveDate>>,
    pub quantity: Option<i32>,
    pub bottle_type: Option<String>,
    pub price_per_bottle: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
    pub notes: Option<String>,
}

fn parse_event_type(value: &str) -> Result<EventType> {
    EventType::from_str(value).map_err(|_| AppError::Validation("Invalid event type".to_string()))
}

fn parse_bottle_type(value: &str) -> Result<BottleType> {
    BottleType::from_str(value).map_err(|_| AppError::Validation("Invalid bottle type".to_string()))
}

pub(super) fn parse_payment_status(value: Option<String>) -> Result<Option<PaymentStatus>> {
    trimmed(value)
        .map(|v| {
            PaymentStatus::from_str(&v)
                .map_err(|_| AppError::Validation("Invalid payment status".to_string()))
        })
        .transpose()
}

impl BulkOrderRequest {
    /// Validate a create request, reporting the first violated rule.
    ///
    /// Quantity, price, dates and the paid amount are checked again when the
    /// amounts are derived.
    fn into_fields(self) -> Result<BulkOrderFields> {
        let customer_name = required(self.customer_name, "Customer name is required")?;
        let phone = required(self.phone, "Phone is required")?;
        let address = required(self.address, "Address is required")?;
        let event_type = parse_event_type(self.event_type.as_deref().unwrap_or_default())?;
        let quantity = self
            .quantity
            .ok_or_else(|| AppError::Validation(LedgerError::QuantityTooSmall.to_string()))?;
        let price_per_bottle = self
            .price_per_bottle
            .ok_or_else(|| AppError::Validation(LedgerError::NegativePrice.to_string()))?;
        let bottle_type = self
            .bottle_type
            .as_deref()
            .map(parse_bottle_type)
            .transpose()?
            .unwrap_or_default();

        Ok(BulkOrderFields {
            customer_name,
            phone,
            address,
            event_type,
            delivery_dates: self.delivery_dates.unwrap_or_default(),
            quantity,
            bottle_type,
            price_per_bottle,
            paid_amount: self.paid_amount.unwrap_or(Decimal::ZERO),
            notes: trimmed(self.notes),
        })
    }

    /// Validate an update request. The paid amount only moves through the
    /// payment endpoint.
    fn into_patch(self) -> Result<BulkOrderPatch> {
        Ok(BulkOrderPatch {
            customer_name: trimmed(self.customer_name),
            phone: trimmed(self.phone),
            address: trimmed(self.address),
            event_type: self
                .event_type
                .as_deref()
                .map(parse_event_type)
                .transpose()?,
            delivery_dates: self.delivery_dates,
            quantity: self.quantity,
            bottle_type: self
                .bottle_type
                .as_deref()
                .map(parse_bottle_type)
                .transpose()?,
            price_per_bottle: self.price_per_bottle,
            notes: self.notes,
        })
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/bulk-orders
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<ApiResponse<Vec<BulkOrder>>> {
    let payment_status = parse_payment_status(query.payment_status)?;

    let orders = state
        .reports()
        .bulk_order_rows(
            &user.business_id,
            DateRange {
                start: query.start_date,
                end: query.end_date,
            },
            payment_status,
        )
        .await?;

    Ok(ApiResponse::list(orders))
}

/// GET /api/bulk-orders/{id}
async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<BulkOrderId>,
) -> Result<ApiResponse<BulkOrder>> {
    let order = BulkOrderRepository::new(state.pool())
        .get(&user.business_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(ORDER_NOT_FOUND.to_string()))?;

    Ok(ApiResponse::data(order))
}

/// POST /api/bulk-orders
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<BulkOrderRequest>,
) -> Result<(StatusCode, ApiResponse<BulkOrder>)> {
    let order = state
        .ledger()
        .create_bulk_order(&user, request.into_fields()?)
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::data(order).with_message("Bulk order created successfully"),
    ))
}

/// PUT /api/bulk-orders/{id}
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<BulkOrderId>,
    ApiJson(request): ApiJson<BulkOrderRequest>,
) -> Result<ApiResponse<BulkOrder>> {
    let order = state
        .ledger()
        .update_bulk_order(&user, id, request.into_patch()?)
        .await?;

    Ok(ApiResponse::data(order).with_message("Order updated successfully"))
}

/// DELETE /api/bulk-orders/{id}
async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<BulkOrderId>,
) -> Result<ApiResponse<()>> {
    BulkOrderRepository::new(state.pool())
        .delete(&user.business_id, id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(ORDER_NOT_FOUND.to_string()),
            other => other.into(),
        })?;

    tracing::info!(order = %id, "Bulk order deleted");
    Ok(ApiResponse::message("Order deleted successfully"))
}

/// POST /api/bulk-orders/{id}/payment
///
/// Sets the paid amount; it is not added to the previous one.
async fn record_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<BulkOrderId>,
    ApiJson(request): ApiJson<PaymentRequest>,
) -> Result<ApiResponse<BulkOrder>> {
    let order = state
        .ledger()
        .record_bulk_order_payment(&user, id, request.amount()?)
        .await?;

    Ok(ApiResponse::data(order).with_message("Payment recorded successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(json: &str) -> BulkOrderRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_create_reports_missing_fields_in_order() {
        let err = request(r#"{"phone": "98", "address": "Hall 2"}"#)
            .into_fields()
            .unwrap_err();
        assert_eq!(err.to_string(), "Customer name is required");

        let err = request(r#"{"customerName": "Mehta", "phone": "98", "address": "Hall 2", "eventType": "gala"}"#)
            .into_fields()
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid event type");
    }

    #[test]
    fn test_create_defaults_bottle_and_payment() {
        let fields = request(
            r#"{"customerName": "Mehta", "phone": "98", "address": "Hall 2",
                "eventType": "wedding", "deliveryDates": ["2024-03-01", "2024-03-02"],
                "quantity": 100, "pricePerBottle": 45}"#,
        )
        .into_fields()
        .unwrap();
        assert_eq!(fields.bottle_type, BottleType::L20);
        assert_eq!(fields.paid_amount, Decimal::ZERO);
        assert_eq!(fields.delivery_dates.len(), 2);
        assert_eq!(fields.event_type, EventType::Wedding);
    }

    #[test]
    fn test_payment_status_filter() {
        assert_eq!(
            parse_payment_status(Some("partial".into())).unwrap(),
            Some(PaymentStatus::Partial)
        );
        assert_eq!(parse_payment_status(Some(String::new())).unwrap(), None);
        assert!(parse_payment_status(Some("owed".into())).is_err());
    }
}
