//! Sign-in error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::email::EmailError;

/// Errors that can occur while issuing or checking a login code.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The email address did not parse.
    #[error("Please provide a valid email")]
    InvalidEmail,

    /// The submitted code is not six ASCII digits.
    #[error("OTP must be 6 digits")]
    InvalidCodeFormat,

    /// No code is outstanding for this email.
    #[error("OTP not found or expired")]
    OtpNotFound,

    /// The code's lifetime has passed.
    #[error("OTP has expired")]
    OtpExpired,

    /// The code does not match.
    #[error("Invalid OTP")]
    InvalidOtp,

    /// The user exists but may not sign in.
    #[error("Account is disabled")]
    AccountDisabled,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// The code could not be emailed.
    #[error("email error: {0}")]
    Email(#[from] EmailError),

    /// Hashing or verifying the code failed.
    #[error("hashing error: {0}")]
    Hashing(String),

    /// The session could not be written.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}
