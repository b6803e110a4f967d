//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Email one-time-code sign-in
//! - `email` - Email delivery via SMTP
//! - `ledger` - Every write that moves money, each in one transaction
//! - `reports` - Dashboard windows, month matrices and CSV export

pub mod auth;
pub mod email;
pub mod ledger;
pub mod reports;

use thiserror::Error;

use aqualedger_core::LedgerError;

use crate::db::RepositoryError;

pub use auth::{AuthError, AuthService, spawn_otp_sweeper};
pub use email::{EmailError, EmailService};
pub use ledger::{LedgerService, ReconcileOutcome};
pub use reports::ReportService;

/// Errors from the ledger and report services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected before touching the database.
    #[error("{0}")]
    Validation(String),

    /// The named entity does not exist in the caller's business.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness rule was violated.
    #[error("{0}")]
    Conflict(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            err if err.is_numeric_overflow() => LedgerError::AmountTooLarge.into(),
            other => Self::Repository(other),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Database(err).into()
    }
}
