//! Bulk order model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use aqualedger_core::{BottleType, BulkOrderId, BusinessId, EventType, PaymentStatus, UserId};

/// A one-off order for an event, delivered on one or more dates.
///
/// `total_amount`, `pending_amount` and `payment_status` are derived with
/// [`aqualedger_core::BulkOrderAmounts::derive`] on every write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOrder {
    pub id: BulkOrderId,
    pub business_id: BusinessId,
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub event_type: EventType,
    pub delivery_dates: Vec<NaiveDate>,
    pub quantity: i32,
    pub bottle_type: BottleType,
    pub price_per_bottle: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub pending_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
