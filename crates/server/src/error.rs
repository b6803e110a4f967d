//! Unified error handling for the HTTP layer.
//!
//! Every failure becomes a single JSON envelope, `{"success": false,
//! "message": "..."}`, with a status code chosen by error kind.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use aqualedger_core::LedgerError;

use crate::db::RepositoryError;
use crate::models::CurrentUser;
use crate::services::ServiceError;
use crate::services::auth::AuthError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing input. Carries the first violated field's message.
    #[error("{0}")]
    Validation(String),

    /// Resource not found (or owned by another business).
    #[error("{0}")]
    NotFound(String),

    /// Duplicate resource, e.g. a second delivery for the same day.
    #[error("{0}")]
    Conflict(String),

    /// Missing, invalid or expired session or login code.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Resource not found".to_string()),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other if other.is_numeric_overflow() => {
                Self::Validation(LedgerError::AmountTooLarge.to_string())
            }
            other => Self::Database(other),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => Self::Validation(message),
            ServiceError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            ServiceError::Conflict(message) => Self::Conflict(message),
            ServiceError::Repository(e) => e.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidEmail | AuthError::InvalidCodeFormat => {
                Self::Validation(err.to_string())
            }
            AuthError::OtpNotFound
            | AuthError::OtpExpired
            | AuthError::InvalidOtp
            | AuthError::AccountDisabled => Self::Unauthorized(err.to_string()),
            AuthError::Repository(e) => e.into(),
            AuthError::Email(_) | AuthError::Hashing(_) | AuthError::Session(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(err: QueryRejection) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(err: PathRejection) -> Self {
        Self::Validation(err.body_text())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Server Error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

/// Set the Sentry user context from an authenticated user.
pub fn set_sentry_user(user: &CurrentUser) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: Some(user.email.to_string()),
            ..Default::default()
        }));
        scope.set_tag("business", user.business_id.as_str());
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Unauthorized("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_client_errors_carry_their_message() {
        let (status, body) = body_json(AppError::Validation("Name is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Name is required");
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let (status, body) =
            body_json(AppError::Internal("connection reset by peer".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Server Error");
    }

    #[test]
    fn test_repository_conflict_maps_to_409() {
        let err: AppError = RepositoryError::Conflict("duplicate".into()).into();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "duplicate"));
        let err: AppError = RepositoryError::NotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_service_not_found_names_the_entity() {
        let err: AppError = ServiceError::NotFound("Customer").into();
        assert_eq!(err.to_string(), "Customer not found");
    }

    #[test]
    fn test_auth_errors_split_between_400_and_401() {
        let err: AppError = AuthError::InvalidCodeFormat.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err: AppError = AuthError::OtpExpired.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "OTP has expired");
    }
}
