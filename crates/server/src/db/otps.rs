//! One-time login code storage.
//!
//! Only argon2 hashes are stored. A newly issued code replaces any earlier
//! ones for the same email.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use aqualedger_core::{Email, OtpId};

use super::RepositoryError;

/// A stored login code.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpRecord {
    pub id: OtpId,
    pub email: String,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    /// Whether the code's lifetime has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Repository for login codes.
pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    /// Create a new OTP repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new code for `email`, deleting any previous ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, otp_hash), fields(email = %email))]
    pub async fn replace(
        &self,
        email: &Email,
        otp_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM aqua.otp WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        let id: OtpId = sqlx::query_scalar(
            "INSERT INTO aqua.otp (email, otp_hash, expires_at) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(email)
        .bind(otp_hash)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Most recent code issued for `email`, expired or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn latest(&self, email: &Email) -> Result<Option<OtpRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, OtpRecord>(
            r"
            SELECT id, email, otp_hash, expires_at
            FROM aqua.otp
            WHERE email = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Delete a single code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: OtpId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM aqua.otp WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete every code whose lifetime has passed. Returns how many.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM aqua.otp WHERE expires_at <= NOW()")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let now = Utc::now();
        let record = OtpRecord {
            id: OtpId::new(1),
            email: "a@b.co".to_string(),
            otp_hash: String::new(),
            expires_at: now,
        };
        assert!(record.is_expired_at(now));
        assert!(!record.is_expired_at(now - Duration::seconds(1)));
    }
}
