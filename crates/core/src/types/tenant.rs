//! Tenant identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of the business that owns a record.
///
/// Every row carries one, and every query filters by the caller's. A
/// deployment serves a single configured business today, so the value
/// normally comes from configuration via the request context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(transparent)]
pub struct BusinessId(String);

impl BusinessId {
    /// Tenant used when nothing else is configured.
    pub const DEFAULT: &'static str = "default-business";

    /// Create a business identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BusinessId {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BusinessId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
