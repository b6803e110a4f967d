//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness
//! GET  /health/ready                            - Database readiness
//!
//! # Auth (public except /me and /logout)
//! POST /api/auth/send-otp                       - Email a login code
//! POST /api/auth/verify-otp                     - Exchange a code for a session
//! GET  /api/auth/me                             - Signed-in user
//! POST /api/auth/logout                         - End the session
//!
//! # Daily customers (writes are admin only)
//! GET    /api/daily-customers                   - List (?isActive, ?search)
//! POST   /api/daily-customers                   - Create
//! GET    /api/daily-customers/{id}              - Show
//! PUT    /api/daily-customers/{id}              - Update
//! DELETE /api/daily-customers/{id}              - Delete
//! GET    /api/daily-customers/{id}/balance      - Ledger snapshot
//!
//! # Deliveries
//! GET  /api/deliveries                          - List (?startDate, ?endDate, ?customerId)
//! POST /api/deliveries                          - Record a delivery
//! GET  /api/deliveries/today                    - Today's deliveries with totals
//! GET  /api/deliveries/today/customers          - Active customers with today's status
//! GET  /api/deliveries/monthly                  - Month matrix (?month, ?customerId)
//! POST /api/deliveries/mark                     - Mark or unmark a day
//! PUT  /api/deliveries/{id}                     - Update quantity, date or notes
//! POST /api/deliveries/{id}/payment             - Record a payment
//!
//! # Bulk orders
//! GET    /api/bulk-orders                       - List (?paymentStatus, ?startDate, ?endDate)
//! POST   /api/bulk-orders                       - Create
//! GET    /api/bulk-orders/{id}                  - Show
//! PUT    /api/bulk-orders/{id}                  - Update
//! DELETE /api/bulk-orders/{id}                  - Delete
//! POST   /api/bulk-orders/{id}/payment          - Record a payment
//!
//! # Dashboard
//! GET /api/dashboard/kpis                       - Headline figures
//! GET /api/dashboard/revenue-trend              - Daily revenue (?days)
//! GET /api/dashboard/monthly-comparison         - Last six months
//!
//! # Reports
//! GET /api/reports/customer-payments            - Customers with totals
//! GET /api/reports/bulk-orders                  - Bulk orders with totals
//! GET /api/reports/delivery-summary             - Deliveries with totals
//! GET /api/reports/export                       - CSV download (?type)
//! ```
//!
//! Every JSON response uses the [`ApiResponse`] envelope.

mod auth;
mod bulk_orders;
mod customers;
mod dashboard;
mod deliveries;
mod reports;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::AppError;
use crate::services::reports::DateRange;
use crate::state::AppState;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth::router())
        .nest("/api/daily-customers", customers::router())
        .nest("/api/deliveries", deliveries::router())
        .nest("/api/bulk-orders", bulk_orders::router())
        .nest("/api/dashboard", dashboard::router())
        .nest("/api/reports", reports::router())
        .fallback(not_found)
}

// =============================================================================
// Envelope
// =============================================================================

/// Success envelope: `{success, message?, count?, data?, ...extra}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            count: None,
            data: Some(data),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Add a top-level field next to `data`.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.extra.insert(key.to_string(), value);
        self
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// A list response; `count` is the number of rows.
    pub fn list(rows: Vec<T>) -> Self {
        let count = rows.len();
        Self::data(rows).with_count(count)
    }
}

impl ApiResponse<()> {
    /// A response with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            count: None,
            data: None,
            extra: Map::new(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// JSON body whose rejection uses the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejection uses the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters whose rejection uses the error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// `?startDate&endDate`, both inclusive `YYYY-MM-DD`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<&DateRangeQuery> for DateRange {
    fn from(query: &DateRangeQuery) -> Self {
        Self {
            start: query.start_date,
            end: query.end_date,
        }
    }
}

/// Trim a required text field, rejecting it when blank.
fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(message.to_string()))
}

/// Trim an optional text field; blank becomes `None`.
fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Health and fallback
// =============================================================================

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}

/// Readiness probe. Checks database connectivity.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    sqlx::query("SELECT 1")
        .execute(state.pool())
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok("ok")
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_envelope_counts_rows() {
        let body = serde_json::to_value(ApiResponse::list(vec![1, 2, 3])).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 3);
        assert_eq!(body["data"], json!([1, 2, 3]));
        assert!(body.get("message").is_none());
    }

    #[test]
    fn test_extra_fields_sit_beside_data() {
        let body = serde_json::to_value(
            ApiResponse::list(vec!["a"])
                .with("totalAmount", 150)
                .with_message("done"),
        )
        .unwrap();
        assert_eq!(body["totalAmount"], 150);
        assert_eq!(body["message"], "done");
    }

    #[test]
    fn test_message_only_envelope_has_no_data() {
        let body = serde_json::to_value(ApiResponse::message("Customer deleted successfully"))
            .unwrap();
        assert_eq!(body, json!({"success": true, "message": "Customer deleted successfully"}));
    }

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(
            required(Some("  Asha ".into()), "Name is required").unwrap(),
            "Asha"
        );
        let err = required(Some("   ".into()), "Name is required").unwrap_err();
        assert_eq!(err.to_string(), "Name is required");
        assert!(required(None, "Phone is required").is_err());
    }
}
