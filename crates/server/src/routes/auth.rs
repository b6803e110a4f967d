//! Sign-in route handlers.
//!
//! A login code is requested with `send-otp` and exchanged for a session
//! with `verify-otp`. The session cookie is what authenticates every other
//! `/api` route.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;

use super::{ApiJson, ApiResponse};
use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/auth/send-otp
///
/// The code is echoed back in development so the UI can be driven without
/// a mailbox.
async fn send_otp(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendOtpRequest>,
) -> Result<ApiResponse<()>> {
    let issued = state.auth().send_otp(&request.email).await?;

    let response = ApiResponse::message("OTP sent to your email");
    if state.config().environment.is_development() {
        return Ok(response.with("otp", issued.code));
    }
    Ok(response)
}

/// POST /api/auth/verify-otp
async fn verify_otp(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<VerifyOtpRequest>,
) -> Result<ApiResponse<()>> {
    let user = state
        .auth()
        .verify_otp(
            &request.email,
            &request.otp,
            request.name.as_deref(),
            request.phone.as_deref(),
        )
        .await?;

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    tracing::info!(user = %user.id, business = %user.business_id, "User signed in");

    Ok(ApiResponse::message("Login successful").with("user", user))
}

/// GET /api/auth/me
///
/// Reads the user fresh so a deactivated account loses access immediately.
async fn me(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
) -> Result<ApiResponse<()>> {
    let user: Option<User> = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?;

    match user {
        Some(user) if user.is_active => Ok(ApiResponse::message("OK").with("user", user)),
        _ => {
            clear_current_user(&session).await?;
            Err(AppError::Unauthorized("Account is disabled".to_string()))
        }
    }
}

/// POST /api/auth/logout
async fn logout(session: Session) -> Result<ApiResponse<()>> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(ApiResponse::message("Logged out"))
}
