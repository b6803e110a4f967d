//! User model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use aqualedger_core::{BusinessId, Email, UserId, UserRole};

/// A person who operates the system.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub business_id: BusinessId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
