//! Daily customer model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use aqualedger_core::{BottleType, BusinessId, CustomerId, CustomerTotals};

/// A recurring subscriber billed per delivered bottle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub business_id: BusinessId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub bottle_type: BottleType,
    pub price_per_bottle: Decimal,
    pub is_active: bool,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    pub pending_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Running totals as stored on the row.
    #[must_use]
    pub const fn totals(&self) -> CustomerTotals {
        CustomerTotals::new(self.total_billed, self.total_paid)
    }
}

/// Ledger snapshot returned by the balance endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerBalance {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    pub pending_balance: Decimal,
}

impl From<&Customer> for CustomerBalance {
    fn from(customer: &Customer) -> Self {
        Self {
            customer_id: customer.id,
            customer_name: customer.name.clone(),
            total_billed: customer.total_billed,
            total_paid: customer.total_paid,
            pending_balance: customer.pending_balance,
        }
    }
}
