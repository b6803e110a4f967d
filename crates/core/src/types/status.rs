//! Status and classification enums.
//!
//! Each enum maps to a PostgreSQL enum in the `aqua` schema (with the
//! `postgres` feature) and to the lowercase wire names used by the API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error returned when parsing one of the enums in this module fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "aqua.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Manages customers and users.
    Admin,
    /// Records deliveries, payments and bulk orders.
    #[default]
    Worker,
}

impl UserRole {
    /// Whether this role may perform administrative actions.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Worker => write!(f, "worker"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "worker" => Ok(Self::Worker),
            _ => Err(ParseEnumError::new("user role", s)),
        }
    }
}

/// Bottle size a customer or order is billed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "aqua.bottle_type"))]
pub enum BottleType {
    #[default]
    #[serde(rename = "20L")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "20L"))]
    L20,
    #[serde(rename = "10L")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "10L"))]
    L10,
    #[serde(rename = "5L")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "5L"))]
    L5,
    #[serde(rename = "2L")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "2L"))]
    L2,
    #[serde(rename = "1L")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "1L"))]
    L1,
}

impl BottleType {
    /// Wire and storage name, e.g. `"20L"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L20 => "20L",
            Self::L10 => "10L",
            Self::L5 => "5L",
            Self::L2 => "2L",
            Self::L1 => "1L",
        }
    }
}

impl std::fmt::Display for BottleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BottleType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "20L" => Ok(Self::L20),
            "10L" => Ok(Self::L10),
            "5L" => Ok(Self::L5),
            "2L" => Ok(Self::L2),
            "1L" => Ok(Self::L1),
            _ => Err(ParseEnumError::new("bottle type", s)),
        }
    }
}

/// Occasion a bulk order is placed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "aqua.event_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Wedding,
    Festival,
    Corporate,
    Party,
    #[default]
    Other,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wedding => write!(f, "wedding"),
            Self::Festival => write!(f, "festival"),
            Self::Corporate => write!(f, "corporate"),
            Self::Party => write!(f, "party"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wedding" => Ok(Self::Wedding),
            "festival" => Ok(Self::Festival),
            "corporate" => Ok(Self::Corporate),
            "party" => Ok(Self::Party),
            "other" => Ok(Self::Other),
            _ => Err(ParseEnumError::new("event type", s)),
        }
    }
}

/// Settlement state of a bulk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "aqua.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Classify a payment against the amount owed.
    ///
    /// Nothing paid is `Pending`, paying the full amount (or more) is `Paid`,
    /// anything in between is `Partial`. A zero-value order with nothing paid
    /// stays `Pending`.
    #[must_use]
    pub fn from_amounts(paid: Decimal, total: Decimal) -> Self {
        if paid.is_zero() {
            Self::Pending
        } else if paid >= total {
            Self::Paid
        } else {
            Self::Partial
        }
    }

    /// Whether money is still owed in this state.
    #[must_use]
    pub const fn is_outstanding(self) -> bool {
        matches!(self, Self::Pending | Self::Partial)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Partial => write!(f, "partial"),
            Self::Paid => write!(f, "paid"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            _ => Err(ParseEnumError::new("payment status", s)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_three_way_rule() {
        let total = Decimal::from(4500);
        assert_eq!(
            PaymentStatus::from_amounts(Decimal::ZERO, total),
            PaymentStatus::Pending
        );
        assert_eq!(
            PaymentStatus::from_amounts(Decimal::from(2250), total),
            PaymentStatus::Partial
        );
        assert_eq!(
            PaymentStatus::from_amounts(total, total),
            PaymentStatus::Paid
        );
        assert_eq!(
            PaymentStatus::from_amounts(Decimal::from(5000), total),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn test_bottle_type_wire_names() {
        assert_eq!(serde_json::to_string(&BottleType::L20).unwrap(), "\"20L\"");
        let parsed: BottleType = serde_json::from_str("\"5L\"").unwrap();
        assert_eq!(parsed, BottleType::L5);
        assert_eq!("1L".parse::<BottleType>().unwrap(), BottleType::L1);
        assert!("3L".parse::<BottleType>().is_err());
    }

    #[test]
    fn test_role_display_matches_from_str() {
        for role in [UserRole::Admin, UserRole::Worker] {
            assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Worker.is_admin());
    }

    #[test]
    fn test_event_type_rejects_unknown() {
        assert_eq!("wedding".parse::<EventType>().unwrap(), EventType::Wedding);
        let err = "birthday".parse::<EventType>().unwrap_err();
        assert_eq!(err.to_string(), "invalid event type: birthday");
    }

    #[test]
    fn test_outstanding_states() {
        assert!(PaymentStatus::Pending.is_outstanding());
        assert!(PaymentStatus::Partial.is_outstanding());
        assert!(!PaymentStatus::Paid.is_outstanding());
    }
}
