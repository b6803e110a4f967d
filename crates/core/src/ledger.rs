//! Pure ledger derivations.
//!
//! Every figure that is stored alongside the facts it summarizes is computed
//! here, and the persistence layer applies it as an explicit step before
//! writing a row:
//!
//! - a customer's `pending_balance` from billed and paid totals,
//! - a delivery's `amount_billed` from price and quantity,
//! - a bulk order's `total_amount`, `pending_amount` and `payment_status`.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::PaymentStatus;

/// Errors raised when ledger inputs violate an invariant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Quantity must be at least 1")]
    QuantityTooSmall,
    #[error("Price must be a positive number")]
    NegativePrice,
    #[error("Paid amount must be a positive number")]
    NegativePayment,
    #[error("Amount is too large")]
    AmountTooLarge,
}

/// Largest amount a money column holds (`NUMERIC(14, 2)`).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Amount billed for `quantity` bottles at `price` each.
///
/// # Errors
///
/// Returns [`LedgerError::AmountTooLarge`] above [`MAX_AMOUNT`].
pub fn checked_amount_billed(price: Decimal, quantity: i32) -> Result<Decimal, LedgerError> {
    price
        .checked_mul(Decimal::from(quantity))
        .filter(|amount| *amount <= MAX_AMOUNT)
        .ok_or(LedgerError::AmountTooLarge)
}

/// Reject quantities below one bottle.
///
/// # Errors
///
/// Returns [`LedgerError::QuantityTooSmall`] when `quantity < 1`.
pub const fn ensure_quantity(quantity: i32) -> Result<i32, LedgerError> {
    if quantity < 1 {
        Err(LedgerError::QuantityTooSmall)
    } else {
        Ok(quantity)
    }
}

/// Reject negative or oversized payment amounts.
///
/// # Errors
///
/// Returns [`LedgerError::NegativePayment`] when `paid` is below zero and
/// [`LedgerError::AmountTooLarge`] above [`MAX_AMOUNT`].
pub fn ensure_payment(paid: Decimal) -> Result<Decimal, LedgerError> {
    if paid < Decimal::ZERO {
        Err(LedgerError::NegativePayment)
    } else if paid > MAX_AMOUNT {
        Err(LedgerError::AmountTooLarge)
    } else {
        Ok(paid)
    }
}

/// Reject negative prices.
///
/// # Errors
///
/// Returns [`LedgerError::NegativePrice`] when `price` is below zero.
pub fn ensure_price(price: Decimal) -> Result<Decimal, LedgerError> {
    if price < Decimal::ZERO {
        Err(LedgerError::NegativePrice)
    } else {
        Ok(price)
    }
}

/// A customer's running totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerTotals {
    pub total_billed: Decimal,
    pub total_paid: Decimal,
}

impl CustomerTotals {
    #[must_use]
    pub const fn new(total_billed: Decimal, total_paid: Decimal) -> Self {
        Self {
            total_billed,
            total_paid,
        }
    }

    /// Sum `(amount_billed, paid_amount)` pairs of a customer's deliveries.
    pub fn from_deliveries<I>(deliveries: I) -> Self
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        deliveries
            .into_iter()
            .fold(Self::default(), |acc, (billed, paid)| Self {
                total_billed: acc.total_billed + billed,
                total_paid: acc.total_paid + paid,
            })
    }

    /// Outstanding balance. Negative when the customer has paid ahead.
    #[must_use]
    pub fn pending_balance(&self) -> Decimal {
        self.total_billed - self.total_paid
    }

    /// The adjustment that turns `self` into `after`.
    #[must_use]
    pub fn delta_to(&self, after: &Self) -> Self {
        Self {
            total_billed: after.total_billed - self.total_billed,
            total_paid: after.total_paid - self.total_paid,
        }
    }
}

/// Quantity and amount written by a mark/unmark toggle.
///
/// Marking delivered bills `quantity` bottles at `price`, where a missing or
/// zero quantity counts as one. Unmarking zeroes both so the day contributes
/// nothing to the ledger.
///
/// # Errors
///
/// Returns [`LedgerError::QuantityTooSmall`] for a negative quantity and
/// [`LedgerError::AmountTooLarge`] if the billed amount does not fit.
pub fn mark_outcome(
    delivered: bool,
    quantity: Option<i32>,
    price: Decimal,
) -> Result<(i32, Decimal), LedgerError> {
    if quantity.is_some_and(|q| q < 0) {
        return Err(LedgerError::QuantityTooSmall);
    }
    if !delivered {
        return Ok((0, Decimal::ZERO));
    }
    let quantity = quantity.filter(|q| *q > 0).unwrap_or(1);
    Ok((quantity, checked_amount_billed(price, quantity)?))
}

/// Payment state of a single delivery after recording `paid`.
///
/// Returns the stored paid amount and whether the delivery is settled.
///
/// # Errors
///
/// Returns [`LedgerError::NegativePayment`] for amounts below zero.
pub fn delivery_payment(amount_billed: Decimal, paid: Decimal) -> Result<(Decimal, bool), LedgerError> {
    let paid = ensure_payment(paid)?;
    Ok((paid, paid >= amount_billed))
}

/// Derived amounts of a bulk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOrderAmounts {
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub pending_amount: Decimal,
    pub payment_status: PaymentStatus,
}

impl BulkOrderAmounts {
    /// Recompute everything derived from quantity, price and payment.
    ///
    /// Must run on every write that touches any of the three inputs.
    ///
    /// # Errors
    ///
    /// Returns a [`LedgerError`] if the quantity is below one, the price or
    /// payment is negative, or an amount does not fit. Overpayment is
    /// accepted: the order is paid and the pending amount goes negative.
    pub fn derive(quantity: i32, price: Decimal, paid: Decimal) -> Result<Self, LedgerError> {
        let quantity = ensure_quantity(quantity)?;
        let price = ensure_price(price)?;
        let paid_amount = ensure_payment(paid)?;
        let total_amount = checked_amount_billed(price, quantity)?;
        Ok(Self {
            total_amount,
            paid_amount,
            pending_amount: total_amount - paid_amount,
            payment_status: PaymentStatus::from_amounts(paid_amount, total_amount),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_amount_billed() {
        assert_eq!(checked_amount_billed(dec(50), 2).unwrap(), dec(100));
        assert_eq!(
            checked_amount_billed(Decimal::new(2550, 2), 4).unwrap(),
            Decimal::new(10200, 2)
        );
        assert_eq!(checked_amount_billed(dec(50), 0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_pending_balance_identity() {
        let totals = CustomerTotals::new(dec(300), dec(120));
        assert_eq!(totals.pending_balance(), dec(180));

        let credit = CustomerTotals::new(dec(100), dec(150));
        assert_eq!(credit.pending_balance(), dec(-50));
    }

    #[test]
    fn test_totals_from_deliveries() {
        let totals =
            CustomerTotals::from_deliveries([(dec(100), dec(100)), (dec(50), dec(0)), (dec(0), dec(0))]);
        assert_eq!(totals.total_billed, dec(150));
        assert_eq!(totals.total_paid, dec(100));
        assert_eq!(totals.pending_balance(), dec(50));
        assert_eq!(CustomerTotals::from_deliveries([]), CustomerTotals::default());
    }

    #[test]
    fn test_delta_to() {
        let before = CustomerTotals::new(dec(100), dec(0));
        let after = CustomerTotals::new(dec(150), dec(100));
        let delta = before.delta_to(&after);
        assert_eq!(delta.total_billed, dec(50));
        assert_eq!(delta.total_paid, dec(100));
    }

    #[test]
    fn test_mark_outcome_delivered_defaults_to_one() {
        assert_eq!(mark_outcome(true, None, dec(50)).unwrap(), (1, dec(50)));
        assert_eq!(mark_outcome(true, Some(3), dec(30)).unwrap(), (3, dec(90)));
    }

    #[test]
    fn test_mark_outcome_unmarked_zeroes_day() {
        assert_eq!(
            mark_outcome(false, Some(5), dec(50)).unwrap(),
            (0, Decimal::ZERO)
        );
    }

    #[test]
    fn test_mark_outcome_zero_quantity_counts_as_one() {
        assert_eq!(mark_outcome(true, Some(0), dec(50)).unwrap(), (1, dec(50)));
        assert_eq!(mark_outcome(false, Some(0), dec(50)).unwrap(), (0, Decimal::ZERO));
    }

    #[test]
    fn test_mark_outcome_rejects_negative_quantity() {
        assert_eq!(
            mark_outcome(true, Some(-1), dec(50)),
            Err(LedgerError::QuantityTooSmall)
        );
        assert_eq!(
            mark_outcome(false, Some(-1), dec(50)),
            Err(LedgerError::QuantityTooSmall)
        );
    }

    #[test]
    fn test_checked_amount_billed_bounds() {
        assert_eq!(checked_amount_billed(dec(45), 100).unwrap(), dec(4500));
        assert_eq!(
            checked_amount_billed(MAX_AMOUNT, 1).unwrap(),
            Decimal::new(99_999_999_999_999, 2)
        );
        assert_eq!(
            checked_amount_billed(dec(1000), 2_000_000_000),
            Err(LedgerError::AmountTooLarge)
        );
        assert_eq!(
            mark_outcome(true, Some(i32::MAX), dec(1000)),
            Err(LedgerError::AmountTooLarge)
        );
    }

    #[test]
    fn test_delivery_payment_settles_at_billed_amount() {
        assert_eq!(delivery_payment(dec(100), dec(100)).unwrap(), (dec(100), true));
        assert_eq!(delivery_payment(dec(100), dec(40)).unwrap(), (dec(40), false));
        assert_eq!(delivery_payment(dec(100), dec(0)).unwrap(), (dec(0), false));
        assert_eq!(
            delivery_payment(dec(100), dec(-1)),
            Err(LedgerError::NegativePayment)
        );
    }

    #[test]
    fn test_bulk_order_partial_payment() {
        let amounts = BulkOrderAmounts::derive(100, dec(45), dec(2250)).unwrap();
        assert_eq!(amounts.total_amount, dec(4500));
        assert_eq!(amounts.pending_amount, dec(2250));
        assert_eq!(amounts.payment_status, PaymentStatus::Partial);
    }

    #[test]
    fn test_bulk_order_status_boundaries() {
        let unpaid = BulkOrderAmounts::derive(10, dec(30), dec(0)).unwrap();
        assert_eq!(unpaid.payment_status, PaymentStatus::Pending);
        assert_eq!(unpaid.pending_amount, dec(300));

        let paid = BulkOrderAmounts::derive(10, dec(30), dec(300)).unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.pending_amount, Decimal::ZERO);
    }

    #[test]
    fn test_bulk_order_rejects_invalid_inputs() {
        assert_eq!(
            BulkOrderAmounts::derive(0, dec(30), dec(0)),
            Err(LedgerError::QuantityTooSmall)
        );
        assert_eq!(
            BulkOrderAmounts::derive(1, dec(-1), dec(0)),
            Err(LedgerError::NegativePrice)
        );
        assert_eq!(
            BulkOrderAmounts::derive(1, dec(30), dec(-5)),
            Err(LedgerError::NegativePayment)
        );
        assert_eq!(
            BulkOrderAmounts::derive(i32::MAX, dec(1000), dec(0)),
            Err(LedgerError::AmountTooLarge)
        );
        assert_eq!(
            BulkOrderAmounts::derive(1, dec(30), MAX_AMOUNT + dec(1)),
            Err(LedgerError::AmountTooLarge)
        );
    }

    #[test]
    fn test_bulk_order_overpayment_is_paid_with_credit() {
        let amounts = BulkOrderAmounts::derive(2, dec(30), dec(61)).unwrap();
        assert_eq!(amounts.total_amount, dec(60));
        assert_eq!(amounts.pending_amount, dec(-1));
        assert_eq!(amounts.payment_status, PaymentStatus::Paid);

        let reduced = BulkOrderAmounts::derive(90, dec(45), dec(4500)).unwrap();
        assert_eq!(reduced.total_amount, dec(4050));
        assert_eq!(reduced.pending_amount, dec(-450));
        assert_eq!(reduced.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_free_order_is_pending_until_paid() {
        let amounts = BulkOrderAmounts::derive(5, Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(amounts.total_amount, Decimal::ZERO);
        assert_eq!(amounts.payment_status, PaymentStatus::Pending);
    }
}
