//! Daily delivery models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use aqualedger_core::{BottleType, BusinessId, CustomerId, DeliveryId, UserId};

/// One customer's delivery on one calendar day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: DeliveryId,
    pub business_id: BusinessId,
    pub customer_id: CustomerId,
    pub delivery_date: NaiveDate,
    pub delivered: bool,
    pub quantity_delivered: i32,
    pub amount_billed: Decimal,
    pub is_paid: bool,
    pub paid_amount: Decimal,
    pub delivered_by: Option<UserId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A delivery joined with the customer fields list views display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryWithCustomer {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_address: String,
}

/// Result of a mark/unmark toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedDelivery {
    pub delivery_id: DeliveryId,
    pub customer_id: CustomerId,
    pub delivered: bool,
    pub quantity_delivered: i32,
    pub amount_billed: Decimal,
    pub delivery_date: NaiveDate,
}

impl From<&Delivery> for MarkedDelivery {
    fn from(delivery: &Delivery) -> Self {
        Self {
            delivery_id: delivery.id,
            customer_id: delivery.customer_id,
            delivered: delivery.delivered,
            quantity_delivered: delivery.quantity_delivered,
            amount_billed: delivery.amount_billed,
            delivery_date: delivery.delivery_date,
        }
    }
}

/// An active customer together with their delivery state on one day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDayStatus {
    pub id: CustomerId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub bottle_type: BottleType,
    pub price_per_bottle: Decimal,
    pub delivered_today: bool,
    pub delivery_id: Option<DeliveryId>,
    pub quantity_delivered: i32,
    pub amount_billed: Decimal,
}
