//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use aqualedger_core::{BusinessId, Email, UserId, UserRole};

use super::RepositoryError;
use crate::models::User;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    name: String,
    phone: Option<String>,
    role: UserRole,
    business_id: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            name: row.name,
            phone: row.phone,
            role: row.role,
            business_id: BusinessId::new(row.business_id),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, email, name, phone, role, business_id, is_active, created_at, updated_at";

/// Fields for a new user.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a Email,
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub business_id: &'a BusinessId,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM aqua.app_user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM aqua.app_user WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List the users of a business, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn list(&self, business: &BusinessId) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM aqua.app_user WHERE business_id = $1 ORDER BY created_at"
        ))
        .bind(business)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Create a user whose role depends on whether the business has any.
    ///
    /// The first user of a business becomes `admin`, everyone after is a
    /// `worker`. A transaction-scoped advisory lock on the business keeps two
    /// simultaneous first sign-ins from both becoming admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken.
    #[instrument(skip(self, new), fields(email = %new.email, business = %new.business_id))]
    pub async fn create_with_first_admin(&self, new: &NewUser<'_>) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(new.business_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO aqua.app_user (email, name, phone, business_id, role)
            VALUES (
                $1, $2, $3, $4,
                CASE WHEN EXISTS (SELECT 1 FROM aqua.app_user WHERE business_id = $4)
                     THEN 'worker'::aqua.user_role
                     ELSE 'admin'::aqua.user_role
                END
            )
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(new.email)
        .bind(new.name)
        .bind(new.phone)
        .bind(new.business_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            RepositoryError::conflict_on_unique(e, "A user with this email already exists")
        })?;

        tx.commit().await?;

        row.try_into()
    }

    /// Create a user with an explicit role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken.
    #[instrument(skip(self, new), fields(email = %new.email, role = %role))]
    pub async fn create_with_role(
        &self,
        new: &NewUser<'_>,
        role: UserRole,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO aqua.app_user (email, name, phone, business_id, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(new.email)
        .bind(new.name)
        .bind(new.phone)
        .bind(new.business_id)
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            RepositoryError::conflict_on_unique(e, "A user with this email already exists")
        })?;

        row.try_into()
    }

    /// Enable or disable a user's sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    #[instrument(skip(self))]
    pub async fn set_active(&self, id: UserId, is_active: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE aqua.app_user SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(is_active)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
