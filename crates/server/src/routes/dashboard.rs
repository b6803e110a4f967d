//! Dashboard route handlers.

use axum::{Router, extract::State, routing::get};
use serde::Deserialize;

use crate::db::reports::TrendPoint;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::reports::{DEFAULT_TREND_DAYS, DashboardStats, MonthlyComparison};
use crate::state::AppState;

use super::{ApiQuery, ApiResponse};

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/kpis", get(kpis))
        .route("/revenue-trend", get(revenue_trend))
        .route("/monthly-comparison", get(monthly_comparison))
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub days: Option<i64>,
}

/// GET /api/dashboard/kpis
async fn kpis(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<DashboardStats>> {
    let stats = state.reports().dashboard(&user.business_id).await?;
    Ok(ApiResponse::data(stats))
}

/// GET /api/dashboard/revenue-trend?days=N
async fn revenue_trend(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<TrendQuery>,
) -> Result<ApiResponse<Vec<TrendPoint>>> {
    let days = query.days.unwrap_or(DEFAULT_TREND_DAYS);
    let trend = state
        .reports()
        .revenue_trend(&user.business_id, days)
        .await?;
    Ok(ApiResponse::data(trend))
}

/// GET /api/dashboard/monthly-comparison
async fn monthly_comparison(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<MonthlyComparison>>> {
    let months = state
        .reports()
        .monthly_comparison(&user.business_id)
        .await?;
    Ok(ApiResponse::data(months))
}
