//! Ledger service.
//!
//! Every operation that changes what a customer owes runs in a single
//! transaction that:
//!
//! 1. locks the customer row (`FOR UPDATE`),
//! 2. writes the delivery,
//! 3. re-sums the customer's deliveries and stores the totals together with
//!    the derived `pending_balance`.
//!
//! Writers on the same customer are serialized by step 1, and the stored
//! totals always equal the sum of the rows they summarize. Bulk orders have
//! no customer ledger; their derived amounts are recomputed on every write.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use aqualedger_core::{
    BulkOrderAmounts, BulkOrderId, BusinessId, CustomerId, CustomerTotals, DeliveryId,
    EventType, BottleType, checked_amount_billed, delivery_payment, ensure_payment, ensure_quantity,
    mark_outcome,
};

use super::ServiceError;
use crate::config::BusinessCalendar;
use crate::db::bulk_orders::{self, BulkOrderFields};
use crate::db::deliveries::{self, DeliveryInsert, DeliveryMark};
use crate::db::{BulkOrderRepository, CustomerRepository, customers};
use crate::models::{BulkOrder, CurrentUser, Customer, Delivery, MarkedDelivery};

/// A delivery recorded directly, outside the calendar toggle.
#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub customer_id: CustomerId,
    pub quantity: i32,
    pub delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub is_paid: bool,
    pub paid_amount: Option<Decimal>,
}

/// Editable delivery fields. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct DeliveryPatch {
    pub quantity: Option<i32>,
    pub delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// A calendar mark or unmark.
#[derive(Debug, Clone, Copy)]
pub struct MarkDelivery {
    pub customer_id: CustomerId,
    pub delivered: bool,
    pub quantity: Option<i32>,
    pub date: Option<NaiveDate>,
}

/// Editable bulk order fields. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct BulkOrderPatch {
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub event_type: Option<EventType>,
    pub delivery_dates: Option<Vec<NaiveDate>>,
    pub quantity: Option<i32>,
    pub bottle_type: Option<BottleType>,
    pub price_per_bottle: Option<Decimal>,
    pub notes: Option<String>,
}

impl BulkOrderPatch {
    fn apply(self, fields: &mut BulkOrderFields) {
        if let Some(v) = self.customer_name {
            fields.customer_name = v;
        }
        if let Some(v) = self.phone {
            fields.phone = v;
        }
        if let Some(v) = self.address {
            fields.address = v;
        }
        if let Some(v) = self.event_type {
            fields.event_type = v;
        }
        if let Some(v) = self.delivery_dates {
            fields.delivery_dates = v;
        }
        if let Some(v) = self.quantity {
            fields.quantity = v;
        }
        if let Some(v) = self.bottle_type {
            fields.bottle_type = v;
        }
        if let Some(v) = self.price_per_bottle {
            fields.price_per_bottle = v;
        }
        if let Some(v) = self.notes {
            fields.notes = Some(v);
        }
    }
}

/// A customer whose stored totals were compared against their deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub stored: CustomerTotals,
    pub recomputed: CustomerTotals,
}

impl ReconcileOutcome {
    /// Whether the stored totals disagreed with the deliveries.
    #[must_use]
    pub fn drifted(&self) -> bool {
        self.stored != self.recomputed
    }
}

/// Ledger service over a connection pool.
pub struct LedgerService<'a> {
    pool: &'a PgPool,
    calendar: BusinessCalendar,
}

impl<'a> LedgerService<'a> {
    /// Create a new ledger service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, calendar: BusinessCalendar) -> Self {
        Self { pool, calendar }
    }

    // =========================================================================
    // Daily deliveries
    // =========================================================================

    /// Record a delivery of `quantity` bottles and bill it.
    ///
    /// The paid amount is kept only when `is_paid` is set.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` for a quantity below one, a negative payment or an oversized amount
    /// - `ServiceError::NotFound` if the customer is not in the caller's business
    /// - `ServiceError::Conflict` if the customer already has a delivery that day
    #[instrument(skip(self, actor, new), fields(user = %actor.id, customer = %new.customer_id))]
    pub async fn record_delivery(
        &self,
        actor: &CurrentUser,
        new: NewDelivery,
    ) -> Result<Delivery, ServiceError> {
        let quantity = ensure_quantity(new.quantity)?;
        let paid_amount = if new.is_paid {
            ensure_payment(new.paid_amount.unwrap_or(Decimal::ZERO))?
        } else {
            Decimal::ZERO
        };
        let delivery_date = new.delivery_date.unwrap_or_else(|| self.calendar.today());

        let mut tx = self.pool.begin().await?;

        let customer = customers::lock(&mut tx, &actor.business_id, new.customer_id)
            .await?
            .ok_or(ServiceError::NotFound("Customer"))?;

        let delivery = deliveries::insert(
            &mut tx,
            &DeliveryInsert {
                business_id: &actor.business_id,
                customer_id: customer.id,
                delivery_date,
                quantity_delivered: quantity,
                amount_billed: checked_amount_billed(customer.price_per_bottle, quantity)?,
                is_paid: new.is_paid,
                paid_amount,
                delivered_by: actor.id,
                notes: new.notes.as_deref(),
            },
        )
        .await?;

        refresh_totals(&mut tx, customer.id).await?;
        tx.commit().await?;

        tracing::info!(delivery = %delivery.id, amount = %delivery.amount_billed, "Delivery recorded");
        Ok(delivery)
    }

    /// Change a delivery's quantity, date or notes.
    ///
    /// A new quantity is re-billed at the customer's current price.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` for a quantity below one
    /// - `ServiceError::NotFound` if the delivery is not in the caller's business
    /// - `ServiceError::Conflict` if the new date is already taken
    #[instrument(skip(self, actor, patch), fields(user = %actor.id, delivery = %id))]
    pub async fn update_delivery(
        &self,
        actor: &CurrentUser,
        id: DeliveryId,
        patch: DeliveryPatch,
    ) -> Result<Delivery, ServiceError> {
        if let Some(quantity) = patch.quantity {
            ensure_quantity(quantity)?;
        }

        let mut tx = self.pool.begin().await?;
        let (customer, mut delivery) = lock_delivery(&mut tx, &actor.business_id, id).await?;

        if let Some(quantity) = patch.quantity {
            delivery.quantity_delivered = quantity;
            delivery.amount_billed = checked_amount_billed(customer.price_per_bottle, quantity)?;
        }
        if let Some(date) = patch.delivery_date {
            delivery.delivery_date = date;
        }
        if let Some(notes) = patch.notes {
            delivery.notes = Some(notes);
        }

        let delivery = deliveries::store_fields(&mut tx, &delivery).await?;
        refresh_totals(&mut tx, customer.id).await?;
        tx.commit().await?;

        Ok(delivery)
    }

    /// Replace the amount paid against one delivery.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` for a negative amount
    /// - `ServiceError::NotFound` if the delivery is not in the caller's business
    #[instrument(skip(self, actor), fields(user = %actor.id, delivery = %id))]
    pub async fn record_delivery_payment(
        &self,
        actor: &CurrentUser,
        id: DeliveryId,
        paid_amount: Decimal,
    ) -> Result<Delivery, ServiceError> {
        ensure_payment(paid_amount)?;

        let mut tx = self.pool.begin().await?;
        let (customer, delivery) = lock_delivery(&mut tx, &actor.business_id, id).await?;

        let (paid_amount, is_paid) = delivery_payment(delivery.amount_billed, paid_amount)?;
        let delivery = deliveries::store_payment(&mut tx, delivery.id, paid_amount, is_paid).await?;

        refresh_totals(&mut tx, customer.id).await?;
        tx.commit().await?;

        tracing::info!(delivery = %delivery.id, paid = %paid_amount, is_paid, "Delivery payment recorded");
        Ok(delivery)
    }

    /// Toggle a customer's delivery for one day.
    ///
    /// Marking bills `quantity` bottles (missing or zero counts as 1); unmarking zeroes the
    /// day. Either way the customer's totals move by exactly the difference
    /// from the day's previous amount, so repeating a mark changes nothing.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` for a negative quantity or an oversized amount
    /// - `ServiceError::NotFound` if the customer is not in the caller's business
    #[instrument(skip(self, actor), fields(user = %actor.id, customer = %mark.customer_id))]
    pub async fn mark_delivery(
        &self,
        actor: &CurrentUser,
        mark: MarkDelivery,
    ) -> Result<MarkedDelivery, ServiceError> {
        let delivery_date = mark.date.unwrap_or_else(|| self.calendar.today());

        let mut tx = self.pool.begin().await?;

        let customer = customers::lock(&mut tx, &actor.business_id, mark.customer_id)
            .await?
            .ok_or(ServiceError::NotFound("Customer"))?;

        let (quantity_delivered, amount) =
            mark_outcome(mark.delivered, mark.quantity, customer.price_per_bottle)?;

        let delivery = deliveries::upsert_mark(
            &mut tx,
            &DeliveryMark {
                business_id: &actor.business_id,
                customer_id: customer.id,
                delivery_date,
                delivered: mark.delivered,
                quantity_delivered,
                amount_billed: amount,
                delivered_by: actor.id,
            },
        )
        .await?;

        refresh_totals(&mut tx, customer.id).await?;
        tx.commit().await?;

        tracing::info!(
            delivery = %delivery.id,
            date = %delivery_date,
            delivered = mark.delivered,
            "Delivery marked"
        );
        Ok(MarkedDelivery::from(&delivery))
    }

    // =========================================================================
    // Bulk orders
    // =========================================================================

    /// Create a bulk order with its derived amounts.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` when the order has no delivery
    /// dates or its quantity, price or payment are invalid.
    #[instrument(skip(self, actor, fields), fields(user = %actor.id))]
    pub async fn create_bulk_order(
        &self,
        actor: &CurrentUser,
        fields: BulkOrderFields,
    ) -> Result<BulkOrder, ServiceError> {
        let amounts = derive_bulk_amounts(&fields)?;
        let order = BulkOrderRepository::new(self.pool)
            .create(&actor.business_id, &fields, &amounts, Some(actor.id))
            .await?;

        tracing::info!(order = %order.id, total = %order.total_amount, "Bulk order created");
        Ok(order)
    }

    /// Patch a bulk order and re-derive its amounts.
    ///
    /// # Errors
    ///
    /// - `ServiceError::NotFound` if the order is not in the caller's business
    /// - `ServiceError::Validation` if the patched order is invalid
    #[instrument(skip(self, actor, patch), fields(user = %actor.id, order = %id))]
    pub async fn update_bulk_order(
        &self,
        actor: &CurrentUser,
        id: BulkOrderId,
        patch: BulkOrderPatch,
    ) -> Result<BulkOrder, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let order = bulk_orders::lock(&mut tx, &actor.business_id, id)
            .await?
            .ok_or(ServiceError::NotFound("Order"))?;

        let mut fields = BulkOrderFields::from(&order);
        patch.apply(&mut fields);
        let amounts = derive_bulk_amounts(&fields)?;

        let order = bulk_orders::store(&mut tx, id, &fields, &amounts).await?;
        tx.commit().await?;

        Ok(order)
    }

    /// Replace the amount paid against a bulk order.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` for a negative or oversized amount
    /// - `ServiceError::NotFound` if the order is not in the caller's business
    #[instrument(skip(self, actor), fields(user = %actor.id, order = %id))]
    pub async fn record_bulk_order_payment(
        &self,
        actor: &CurrentUser,
        id: BulkOrderId,
        paid_amount: Decimal,
    ) -> Result<BulkOrder, ServiceError> {
        ensure_payment(paid_amount)?;

        let mut tx = self.pool.begin().await?;

        let order = bulk_orders::lock(&mut tx, &actor.business_id, id)
            .await?
            .ok_or(ServiceError::NotFound("Order"))?;

        let mut fields = BulkOrderFields::from(&order);
        fields.paid_amount = paid_amount;
        let amounts = derive_bulk_amounts(&fields)?;

        let order = bulk_orders::store(&mut tx, id, &fields, &amounts).await?;
        tx.commit().await?;

        tracing::info!(order = %order.id, status = %order.payment_status, "Bulk order payment recorded");
        Ok(order)
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Recompute every customer's totals from their deliveries.
    ///
    /// Returns the customers whose stored totals disagreed. With `dry_run`
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn reconcile(
        &self,
        business: &BusinessId,
        dry_run: bool,
    ) -> Result<Vec<ReconcileOutcome>, ServiceError> {
        let ids = CustomerRepository::new(self.pool).ids(business).await?;
        let mut drifted = Vec::new();

        for id in ids {
            let mut tx = self.pool.begin().await?;

            // Deleted since the ID scan.
            let Some(customer) = customers::lock(&mut tx, business, id).await? else {
                continue;
            };

            let outcome = ReconcileOutcome {
                customer_id: customer.id,
                customer_name: customer.name.clone(),
                stored: customer.totals(),
                recomputed: customers::delivery_totals(&mut tx, customer.id).await?,
            };

            if outcome.drifted() {
                tracing::warn!(
                    customer = %customer.id,
                    stored_billed = %outcome.stored.total_billed,
                    actual_billed = %outcome.recomputed.total_billed,
                    stored_paid = %outcome.stored.total_paid,
                    actual_paid = %outcome.recomputed.total_paid,
                    "Customer totals drifted"
                );
                if !dry_run {
                    customers::store_totals(&mut tx, customer.id, &outcome.recomputed).await?;
                }
                drifted.push(outcome);
            }

            tx.commit().await?;
        }

        Ok(drifted)
    }
}

/// Lock a delivery and its customer, customer first.
async fn lock_delivery(
    conn: &mut PgConnection,
    business: &BusinessId,
    id: DeliveryId,
) -> Result<(Customer, Delivery), ServiceError> {
    let owner = deliveries::owner_of(conn, business, id)
        .await?
        .ok_or(ServiceError::NotFound("Delivery"))?;
    let customer = customers::lock(conn, business, owner)
        .await?
        .ok_or(ServiceError::NotFound("Delivery"))?;
    let delivery = deliveries::lock(conn, business, id)
        .await?
        .ok_or(ServiceError::NotFound("Delivery"))?;
    Ok((customer, delivery))
}

/// Re-sum a locked customer's deliveries into their stored totals.
async fn refresh_totals(
    conn: &mut PgConnection,
    customer: CustomerId,
) -> Result<Customer, ServiceError> {
    let totals = customers::delivery_totals(conn, customer).await?;
    Ok(customers::store_totals(conn, customer, &totals).await?)
}

fn derive_bulk_amounts(fields: &BulkOrderFields) -> Result<BulkOrderAmounts, ServiceError> {
    if fields.delivery_dates.is_empty() {
        return Err(ServiceError::Validation(
            "At least one delivery date is required".to_string(),
        ));
    }
    Ok(BulkOrderAmounts::derive(
        fields.quantity,
        fields.price_per_bottle,
        fields.paid_amount,
    )?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aqualedger_core::PaymentStatus;

    use super::*;

    fn fields() -> BulkOrderFields {
        BulkOrderFields {
            customer_name: "Sharma Wedding".to_string(),
            phone: "9876500000".to_string(),
            address: "Community Hall".to_string(),
            event_type: EventType::Wedding,
            delivery_dates: vec![NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()],
            quantity: 100,
            bottle_type: BottleType::L20,
            price_per_bottle: Decimal::from(45),
            paid_amount: Decimal::from(2000),
            notes: None,
        }
    }

    #[test]
    fn test_bulk_amounts_follow_inputs() {
        let amounts = derive_bulk_amounts(&fields()).unwrap();
        assert_eq!(amounts.total_amount, Decimal::from(4500));
        assert_eq!(amounts.pending_amount, Decimal::from(2500));
    }

    #[test]
    fn test_bulk_order_needs_a_delivery_date() {
        let mut f = fields();
        f.delivery_dates.clear();
        let err = derive_bulk_amounts(&f).unwrap_err();
        assert_eq!(err.to_string(), "At least one delivery date is required");
    }

    #[test]
    fn test_bulk_overpayment_is_paid() {
        let mut f = fields();
        f.paid_amount = Decimal::from(5000);
        let amounts = derive_bulk_amounts(&f).unwrap();
        assert_eq!(amounts.pending_amount, Decimal::from(-500));
        assert_eq!(amounts.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_oversized_bulk_order_is_a_validation_error() {
        let mut f = fields();
        f.quantity = i32::MAX;
        f.price_per_bottle = Decimal::from(1000);
        assert_eq!(
            derive_bulk_amounts(&f).unwrap_err().to_string(),
            "Amount is too large"
        );
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let mut f = fields();
        BulkOrderPatch {
            quantity: Some(120),
            notes: Some("Deliver by 8am".to_string()),
            ..Default::default()
        }
        .apply(&mut f);
        assert_eq!(f.quantity, 120);
        assert_eq!(f.customer_name, "Sharma Wedding");
        assert_eq!(f.notes.as_deref(), Some("Deliver by 8am"));
    }

    #[test]
    fn test_reconcile_outcome_detects_drift() {
        let outcome = ReconcileOutcome {
            customer_id: CustomerId::new(1),
            customer_name: "Rajesh Kumar".to_string(),
            stored: CustomerTotals::new(Decimal::from(150), Decimal::ZERO),
            recomputed: CustomerTotals::new(Decimal::from(100), Decimal::ZERO),
        };
        assert!(outcome.drifted());
    }
}
