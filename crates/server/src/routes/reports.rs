//! Report route handlers.
//!
//! The three reports return rows with their totals; `export` renders the
//! same data as a CSV download.

use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{BulkOrder, Customer, DeliveryWithCustomer};
use crate::services::reports::{DateRange, ReportKind};
use crate::state::AppState;

use super::bulk_orders::parse_payment_status;
use super::{ApiQuery, ApiResponse, DateRangeQuery, trimmed};

const TYPE_REQUIRED: &str = "Report type is required (customers, bulk-orders, deliveries)";

/// Build the reports router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customer-payments", get(customer_payments))
        .route("/bulk-orders", get(bulk_orders))
        .route("/delivery-summary", get(delivery_summary))
        .route("/export", get(export))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOrderReportQuery {
    pub payment_status: Option<String>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}

/// Parse `?type=`; absence and unknown values are reported differently.
fn parse_kind(kind: Option<String>) -> Result<ReportKind> {
    let kind = trimmed(kind).ok_or_else(|| AppError::Validation(TYPE_REQUIRED.to_string()))?;
    Ok(kind.parse::<ReportKind>()?)
}

/// GET /api/reports/customer-payments
///
/// Customers created within the range, by name.
async fn customer_payments(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<ApiResponse<Vec<Customer>>> {
    let report = state
        .reports()
        .customer_payments(&user.business_id, DateRange::from(&query))
        .await?;

    Ok(ApiResponse::list(report.rows).with("totals", report.totals))
}

/// GET /api/reports/bulk-orders
///
/// Orders created within the range, newest first. `?paymentStatus`
/// narrows the rows and the totals together.
async fn bulk_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<BulkOrderReportQuery>,
) -> Result<ApiResponse<Vec<BulkOrder>>> {
    let payment_status = parse_payment_status(query.payment_status)?;
    let range = DateRange {
        start: query.start_date,
        end: query.end_date,
    };

    let report = state
        .reports()
        .bulk_orders(&user.business_id, range, payment_status)
        .await?;

    Ok(ApiResponse::list(report.rows).with("totals", report.totals))
}

/// GET /api/reports/delivery-summary
///
/// Deliveries dated within the range, newest first.
async fn delivery_summary(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> Result<ApiResponse<Vec<DeliveryWithCustomer>>> {
    let report = state
        .reports()
        .delivery_summary(&user.business_id, DateRange::from(&query))
        .await?;

    Ok(ApiResponse::list(report.rows).with("totals", report.totals))
}

/// GET /api/reports/export?type=customers|bulk-orders|deliveries
async fn export(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> Result<Response> {
    let kind = parse_kind(query.kind)?;
    let range = DateRange {
        start: query.start_date,
        end: query.end_date,
    };

    let csv = state
        .reports()
        .export_csv(&user.business_id, kind, range)
        .await?;

    tracing::info!(file = %csv.filename, "Report exported");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", csv.filename),
            ),
        ],
        csv.body,
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_export_type_is_required() {
        assert_eq!(parse_kind(None).unwrap_err().to_string(), TYPE_REQUIRED);
        assert_eq!(
            parse_kind(Some(" ".into())).unwrap_err().to_string(),
            TYPE_REQUIRED
        );
    }

    #[test]
    fn test_export_type_must_be_known() {
        assert_eq!(
            parse_kind(Some("invoices".into())).unwrap_err().to_string(),
            "Invalid report type"
        );
        assert_eq!(
            parse_kind(Some("bulk-orders".into())).unwrap(),
            ReportKind::BulkOrders
        );
    }
}
