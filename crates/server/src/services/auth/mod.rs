//! Authentication service.
//!
//! Sign-in is by a six-digit code sent to the user's email. Codes are stored
//! only as argon2 hashes, expire after a configured number of minutes and
//! are single use. The first user to sign in to a business becomes its
//! admin; everyone after is a worker.

mod error;

pub use error::AuthError;

use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::instrument;

use aqualedger_core::{BusinessId, Email};

use crate::db::OtpRepository;
use crate::db::users::{NewUser, UserRepository};
use crate::models::User;
use crate::services::email::EmailService;

/// How often expired codes are swept from the table.
const OTP_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A code that was just issued.
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub email: Email,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    mailer: Option<&'a EmailService>,
    otp_ttl_minutes: i64,
    default_business: &'a BusinessId,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    ///
    /// Without a mailer, issued codes are written to the log instead.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        mailer: Option<&'a EmailService>,
        otp_ttl_minutes: i64,
        default_business: &'a BusinessId,
    ) -> Self {
        Self {
            pool,
            mailer,
            otp_ttl_minutes,
            default_business,
        }
    }

    /// Issue a fresh code for `email`, replacing any outstanding one.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidEmail` if the address does not parse
    /// - `AuthError::Email` if the code cannot be delivered
    #[instrument(skip(self, email))]
    pub async fn send_otp(&self, email: &str) -> Result<IssuedOtp, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidEmail)?;

        let code = generate_otp_code();
        let otp_hash = hash_code(code.clone()).await?;
        let expires_at = Utc::now() + chrono::Duration::minutes(self.otp_ttl_minutes);

        OtpRepository::new(self.pool)
            .replace(&email, &otp_hash, expires_at)
            .await?;

        match self.mailer {
            Some(mailer) => {
                mailer
                    .send_otp_code(email.as_str(), &code, self.otp_ttl_minutes)
                    .await?;
            }
            None => {
                tracing::warn!(email = %email, code = %code, "SMTP not configured, login code logged");
            }
        }

        Ok(IssuedOtp {
            email,
            code,
            expires_at,
        })
    }

    /// Check a code and return the signed-in user, creating them on first
    /// sign-in.
    ///
    /// The code is consumed on success and deleted when found expired.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidEmail` / `AuthError::InvalidCodeFormat` for bad input
    /// - `AuthError::OtpNotFound`, `AuthError::OtpExpired` or
    ///   `AuthError::InvalidOtp` when the code does not check out
    /// - `AuthError::AccountDisabled` if the user has been deactivated
    #[instrument(skip(self, email, code, name, phone))]
    pub async fn verify_otp(
        &self,
        email: &str,
        code: &str,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidEmail)?;
        if !is_otp_format(code) {
            return Err(AuthError::InvalidCodeFormat);
        }

        let otps = OtpRepository::new(self.pool);
        let record = otps.latest(&email).await?.ok_or(AuthError::OtpNotFound)?;

        if record.is_expired_at(Utc::now()) {
            otps.delete(record.id).await?;
            return Err(AuthError::OtpExpired);
        }

        if !verify_code(code.to_string(), record.otp_hash.clone()).await? {
            return Err(AuthError::InvalidOtp);
        }
        otps.delete(record.id).await?;

        let users = UserRepository::new(self.pool);
        let user = match users.get_by_email(&email).await? {
            Some(user) => user,
            None => {
                let name = name
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| email.local_part());
                let phone = phone.map(str::trim).filter(|p| !p.is_empty());
                let user = users
                    .create_with_first_admin(&NewUser {
                        email: &email,
                        name,
                        phone,
                        business_id: self.default_business,
                    })
                    .await?;
                tracing::info!(user = %user.id, role = %user.role, "User created on first sign-in");
                user
            }
        };

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(user)
    }
}

/// Generate a 6-digit login code.
#[must_use]
pub fn generate_otp_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// Whether `code` is exactly six ASCII digits.
#[must_use]
pub fn is_otp_format(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Delete expired codes every minute until the runtime shuts down.
pub fn spawn_otp_sweeper(pool: PgPool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(OTP_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            match OtpRepository::new(&pool).purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Expired login codes removed"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired login codes"),
            }
        }
    })
}

/// Hash a code with Argon2id off the async runtime.
async fn hash_code(code: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(code.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))?
}

/// Check a code against its stored hash off the async runtime.
async fn verify_code(code: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(code.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_otp_code_format() {
        for _ in 0..100 {
            let code = generate_otp_code();
            assert!(is_otp_format(&code));
            let n: u32 = code.parse().unwrap();
            assert!((100_000..1_000_000).contains(&n));
        }
    }

    #[test]
    fn test_otp_format_rejects_non_digits() {
        assert!(is_otp_format("012345"));
        assert!(!is_otp_format("12345"));
        assert!(!is_otp_format("1234567"));
        assert!(!is_otp_format("12a456"));
        assert!(!is_otp_format("١٢٣٤٥٦"));
    }

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_code("482913".to_string()).await.unwrap();
        assert_ne!(hash, "482913");
        assert!(verify_code("482913".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_code("482914".to_string(), hash).await.unwrap());
    }
}
