//! Daily customer route handlers.
//!
//! Any signed-in user may read customers; creating, editing and deleting
//! them is admin only.

use std::str::FromStr;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use aqualedger_core::{BottleType, CustomerId, LedgerError, ensure_price};

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, required, trimmed};
use crate::db::{CustomerRepository, RepositoryError};
use crate::db::customers::{CustomerFilter, CustomerPatch, NewCustomer};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::Customer;
use crate::models::customer::CustomerBalance;
use crate::state::AppState;

const CUSTOMER_NOT_FOUND: &str = "Customer not found";

/// Build the customers router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(destroy))
        .route("/{id}/balance", get(balance))
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// `true` for active customers, any other value for inactive ones.
    pub is_active: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub bottle_type: Option<String>,
    pub price_per_bottle: Option<Decimal>,
    pub is_active: Option<bool>,
}

fn parse_bottle_type(value: &str) -> Result<BottleType> {
    BottleType::from_str(value).map_err(|_| AppError::Validation("Invalid bottle type".to_string()))
}

fn parse_price(value: Option<Decimal>) -> Result<Decimal> {
    value
        .ok_or(LedgerError::NegativePrice)
        .and_then(ensure_price)
        .map_err(|e| AppError::Validation(e.to_string()))
}

impl CustomerRequest {
    /// Validate a create request, reporting the first missing field.
    fn into_new(self) -> Result<NewCustomer> {
        let name = required(self.name, "Name is required")?;
        let address = required(self.address, "Address is required")?;
        let phone = required(self.phone, "Phone is required")?;
        let bottle_type = parse_bottle_type(self.bottle_type.as_deref().unwrap_or_default())?;
        let price_per_bottle = parse_price(self.price_per_bottle)?;

        Ok(NewCustomer {
            name,
            address,
            phone,
            bottle_type,
            price_per_bottle,
            is_active: self.is_active.unwrap_or(true),
        })
    }

    /// Validate an update request. Absent fields are left unchanged.
    fn into_patch(self) -> Result<CustomerPatch> {
        let bottle_type = self
            .bottle_type
            .as_deref()
            .map(parse_bottle_type)
            .transpose()?;
        let price_per_bottle = self
            .price_per_bottle
            .map(|p| parse_price(Some(p)))
            .transpose()?;

        Ok(CustomerPatch {
            name: trimmed(self.name),
            address: trimmed(self.address),
            phone: trimmed(self.phone),
            bottle_type,
            price_per_bottle,
            is_active: self.is_active,
        })
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/daily-customers
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<ApiResponse<Vec<Customer>>> {
    let filter = CustomerFilter {
        is_active: query.is_active.map(|v| v == "true"),
        search: trimmed(query.search),
    };

    let customers = CustomerRepository::new(state.pool())
        .list(&user.business_id, &filter)
        .await?;

    Ok(ApiResponse::list(customers))
}

/// GET /api/daily-customers/{id}
async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<CustomerId>,
) -> Result<ApiResponse<Customer>> {
    let customer = CustomerRepository::new(state.pool())
        .get(&user.business_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(CUSTOMER_NOT_FOUND.to_string()))?;

    Ok(ApiResponse::data(customer))
}

/// POST /api/daily-customers
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(request): ApiJson<CustomerRequest>,
) -> Result<(StatusCode, ApiResponse<Customer>)> {
    let new = request.into_new()?;

    let customer = CustomerRepository::new(state.pool())
        .create(&admin.business_id, &new, Some(admin.id))
        .await?;

    tracing::info!(customer = %customer.id, "Customer created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::data(customer).with_message("Customer created successfully"),
    ))
}

/// PUT /api/daily-customers/{id}
///
/// A new price applies to deliveries recorded from now on; existing rows
/// keep the amount they were billed at.
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<CustomerId>,
    ApiJson(request): ApiJson<CustomerRequest>,
) -> Result<ApiResponse<Customer>> {
    let patch = request.into_patch()?;

    let customer = CustomerRepository::new(state.pool())
        .update(&admin.business_id, id, &patch)
        .await
        .map_err(not_found_as_customer)?;

    Ok(ApiResponse::data(customer).with_message("Customer updated successfully"))
}

/// DELETE /api/daily-customers/{id}
///
/// The customer's deliveries go with them.
async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<CustomerId>,
) -> Result<ApiResponse<()>> {
    CustomerRepository::new(state.pool())
        .delete(&admin.business_id, id)
        .await
        .map_err(not_found_as_customer)?;

    tracing::info!(customer = %id, "Customer deleted");
    Ok(ApiResponse::message("Customer deleted successfully"))
}

/// GET /api/daily-customers/{id}/balance
async fn balance(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<CustomerId>,
) -> Result<ApiResponse<CustomerBalance>> {
    let customer = CustomerRepository::new(state.pool())
        .get(&user.business_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(CUSTOMER_NOT_FOUND.to_string()))?;

    Ok(ApiResponse::data(CustomerBalance::from(&customer)))
}

fn not_found_as_customer(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound(CUSTOMER_NOT_FOUND.to_string()),
        other => other.into(),
    }
}
