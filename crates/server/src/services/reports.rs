//! Dashboard figures, the monthly delivery matrix, and tabular reports.
//!
//! Read-only: nothing here writes to the database.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use aqualedger_core::{BottleType, BusinessId, CustomerId, PaymentStatus, YearMonth};

use super::ServiceError;
use crate::config::BusinessCalendar;
use crate::db::bulk_orders::BulkOrderFilter;
use crate::db::deliveries::DeliveryFilter;
use crate::db::reports::TrendPoint;
use crate::db::{BulkOrderRepository, CustomerRepository, DeliveryRepository, ReportRepository};
use crate::models::{BulkOrder, Customer, Delivery, DeliveryWithCustomer};

/// Default span of the revenue trend, in days.
pub const DEFAULT_TREND_DAYS: i64 = 30;

/// Longest revenue trend a caller may ask for.
pub const MAX_TREND_DAYS: i64 = 366;

/// Number of months in the monthly comparison, current month included.
const COMPARISON_MONTHS: i32 = 6;

// =============================================================================
// Windows
// =============================================================================

/// Day boundaries of the dashboard's reporting windows.
///
/// `today` and `month` are closed windows; the multi-month and yearly
/// windows are open-ended and run to the present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingWindows {
    pub today: NaiveDate,
    pub tomorrow: NaiveDate,
    pub month_start: NaiveDate,
    pub next_month_start: NaiveDate,
    pub three_months_start: NaiveDate,
    pub six_months_start: NaiveDate,
    pub year_start: NaiveDate,
}

impl ReportingWindows {
    /// Windows as seen on `today`.
    #[must_use]
    pub fn at(today: NaiveDate) -> Self {
        let month = YearMonth::of(today);
        Self {
            today,
            tomorrow: today + Days::new(1),
            month_start: month.first_day(),
            next_month_start: month.next().first_day(),
            three_months_start: month.shift(-2).first_day(),
            six_months_start: month.shift(-5).first_day(),
            year_start: today.with_ordinal(1).unwrap_or(today),
        }
    }
}

/// Key performance indicators on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub today_total: Decimal,
    pub today_quantity: i64,
    pub monthly_income: Decimal,
    pub three_month_income: Decimal,
    pub six_month_income: Decimal,
    pub yearly_income: Decimal,
    pub pending_payments: Decimal,
    pub active_customers: i64,
    pub total_customers: i64,
}

/// Delivery and bulk order revenue for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyComparison {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub deliveries: Decimal,
    pub bulk_orders: Decimal,
    pub total: Decimal,
}

/// One day of a customer's month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub day: u32,
    pub date: NaiveDate,
    /// `None` when no delivery row exists for the day.
    pub delivered: Option<bool>,
    pub quantity: i32,
    pub amount: Decimal,
}

/// One customer's row of the monthly delivery matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixRow {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub bottle_type: BottleType,
    pub price_per_bottle: Decimal,
    pub daily_status: Vec<DayCell>,
}

/// Inclusive range of whole calendar days. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// The range as `[from, before)` instants in the business's timezone.
    #[must_use]
    pub fn instants(
        &self,
        calendar: &BusinessCalendar,
    ) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (
            self.start.map(|d| calendar.start_of(d)),
            self.end
                .and_then(|d| d.checked_add_days(Days::new(1)))
                .map(|d| calendar.start_of(d)),
        )
    }
}

/// Totals under the customer payments report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPaymentTotals {
    pub total_billed: Decimal,
    pub total_paid: Decimal,
    pub total_pending: Decimal,
}

/// Totals under the bulk order report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOrderTotals {
    pub total_orders: usize,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub total_pending: Decimal,
}

/// Totals under the delivery summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryTotals {
    pub total_deliveries: usize,
    pub total_quantity: i64,
    pub total_billed: Decimal,
    pub total_paid: Decimal,
}

/// Rows of a report with the totals over them.
#[derive(Debug, Clone)]
pub struct Report<R, T> {
    pub rows: Vec<R>,
    pub totals: T,
}

/// Which table a CSV export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Customers,
    BulkOrders,
    Deliveries,
}

impl ReportKind {
    const fn file_stem(self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::BulkOrders => "bulk_orders",
            Self::Deliveries => "deliveries",
        }
    }
}

impl FromStr for ReportKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customers" => Ok(Self::Customers),
            "bulk-orders" => Ok(Self::BulkOrders),
            "deliveries" => Ok(Self::Deliveries),
            _ => Err(ServiceError::Validation("Invalid report type".to_string())),
        }
    }
}

/// A rendered CSV attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

// =============================================================================
// Service
// =============================================================================

/// Report service over a connection pool.
pub struct ReportService<'a> {
    pool: &'a PgPool,
    calendar: BusinessCalendar,
}

impl<'a> ReportService<'a> {
    /// Create a new report service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, calendar: BusinessCalendar) -> Self {
        Self { pool, calendar }
    }

    /// Dashboard KPIs as of today.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn dashboard(&self, business: &BusinessId) -> Result<DashboardStats, ServiceError> {
        let w = ReportingWindows::at(self.calendar.today());
        let reports = ReportRepository::new(self.pool);
        let at = |d: NaiveDate| self.calendar.start_of(d);

        let today = reports.delivery_sums(business, w.today, Some(w.tomorrow)).await?;
        let month = reports
            .delivery_sums(business, w.month_start, Some(w.next_month_start))
            .await?;
        let three = reports.delivery_sums(business, w.three_months_start, None).await?;
        let six = reports.delivery_sums(business, w.six_months_start, None).await?;
        let year = reports.delivery_sums(business, w.year_start, None).await?;

        let month_bulk = reports
            .bulk_order_total(business, at(w.month_start), Some(at(w.next_month_start)))
            .await?;
        let three_bulk = reports
            .bulk_order_total(business, at(w.three_months_start), None)
            .await?;
        let six_bulk = reports
            .bulk_order_total(business, at(w.six_months_start), None)
            .await?;
        let year_bulk = reports
            .bulk_order_total(business, at(w.year_start), None)
            .await?;

        let pending = reports.pending_sums(business).await?;
        let counts = reports.customer_counts(business).await?;

        Ok(DashboardStats {
            today_total: today.amount,
            today_quantity: today.quantity,
            monthly_income: month.amount + month_bulk,
            three_month_income: three.amount + three_bulk,
            six_month_income: six.amount + six_bulk,
            yearly_income: year.amount + year_bulk,
            pending_payments: pending.customers + pending.bulk_orders,
            active_customers: counts.active,
            total_customers: counts.total,
        })
    }

    /// Daily delivery revenue over the last `days` days, today included.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if `days` is outside
    /// `1..=MAX_TREND_DAYS`.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn revenue_trend(
        &self,
        business: &BusinessId,
        days: i64,
    ) -> Result<Vec<TrendPoint>, ServiceError> {
        let span = trend_span(days)?;
        let today = self.calendar.today();
        let from = today - Days::new(span);

        Ok(ReportRepository::new(self.pool)
            .daily_trend(business, from, today)
            .await?)
    }

    /// Revenue for the last six months, oldest first, zero-filled.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn monthly_comparison(
        &self,
        business: &BusinessId,
    ) -> Result<Vec<MonthlyComparison>, ServiceError> {
        let current = YearMonth::of(self.calendar.today());
        let first = current.shift(1 - COMPARISON_MONTHS);
        let reports = ReportRepository::new(self.pool);

        let deliveries = reports.monthly_delivery_totals(business, first).await?;
        let bulk = reports
            .monthly_bulk_order_totals(
                business,
                self.calendar.start_of(first.first_day()),
                self.calendar.offset().local_minus_utc(),
            )
            .await?;

        Ok(merge_months(first, COMPARISON_MONTHS, &deliveries, &bulk))
    }

    /// Per-customer, per-day delivery grid for `month`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self), fields(business = %business, month = %month))]
    pub async fn monthly_matrix(
        &self,
        business: &BusinessId,
        month: YearMonth,
        customer: Option<CustomerId>,
    ) -> Result<Vec<MatrixRow>, ServiceError> {
        let customers = CustomerRepository::new(self.pool)
            .list_active_by_name(business, customer)
            .await?;
        let last = month.next().first_day() - Days::new(1);
        let deliveries = DeliveryRepository::new(self.pool)
            .between(business, month.first_day(), last)
            .await?;

        Ok(build_matrix(month, &customers, &deliveries))
    }

    /// Customers created in `range`, by name, with their ledger totals.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn customer_payments(
        &self,
        business: &BusinessId,
        range: DateRange,
    ) -> Result<Report<Customer, CustomerPaymentTotals>, ServiceError> {
        let (from, before) = range.instants(&self.calendar);
        let rows = CustomerRepository::new(self.pool)
            .list_created_between(business, from, before)
            .await?;

        let totals = rows.iter().fold(CustomerPaymentTotals::default(), |t, c| {
            CustomerPaymentTotals {
                total_billed: t.total_billed + c.total_billed,
                total_paid: t.total_paid + c.total_paid,
                total_pending: t.total_pending + c.pending_balance,
            }
        });
        Ok(Report { rows, totals })
    }

    /// Bulk orders created in `range`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn bulk_orders(
        &self,
        business: &BusinessId,
        range: DateRange,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Report<BulkOrder, BulkOrderTotals>, ServiceError> {
        let rows = self.bulk_order_rows(business, range, payment_status).await?;

        let totals = rows.iter().fold(
            BulkOrderTotals {
                total_orders: rows.len(),
                ..Default::default()
            },
            |t, o| BulkOrderTotals {
                total_amount: t.total_amount + o.total_amount,
                total_paid: t.total_paid + o.paid_amount,
                total_pending: t.total_pending + o.pending_amount,
                ..t
            },
        );
        Ok(Report { rows, totals })
    }

    /// Deliveries in `range`, most recent day first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn delivery_summary(
        &self,
        business: &BusinessId,
        range: DateRange,
    ) -> Result<Report<DeliveryWithCustomer, DeliveryTotals>, ServiceError> {
        let rows = DeliveryRepository::new(self.pool)
            .list(
                business,
                DeliveryFilter {
                    start: range.start,
                    end: range.end,
                    customer_id: None,
                },
            )
            .await?;

        let totals = rows.iter().fold(
            DeliveryTotals {
                total_deliveries: rows.len(),
                ..Default::default()
            },
            |t, d| DeliveryTotals {
                total_quantity: t.total_quantity + i64::from(d.delivery.quantity_delivered),
                total_billed: t.total_billed + d.delivery.amount_billed,
                total_paid: t.total_paid + d.delivery.paid_amount,
                ..t
            },
        );
        Ok(Report { rows, totals })
    }

    /// Render one table as a CSV attachment.
    ///
    /// The customers export ignores `range` and lists everyone.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn export_csv(
        &self,
        business: &BusinessId,
        kind: ReportKind,
        range: DateRange,
    ) -> Result<CsvExport, ServiceError> {
        let body = match kind {
            ReportKind::Customers => {
                let rows = CustomerRepository::new(self.pool)
                    .list_created_between(business, None, None)
                    .await?;
                customers_csv(&rows)
            }
            ReportKind::BulkOrders => {
                let rows = self.bulk_order_rows(business, range, None).await?;
                bulk_orders_csv(&rows, &self.calendar)
            }
            ReportKind::Deliveries => {
                self.delivery_summary(business, range)
                    .await
                    .map(|report| deliveries_csv(&report.rows))?
            }
        };

        Ok(CsvExport {
            filename: format!("{}_{}.csv", kind.file_stem(), Utc::now().timestamp_millis()),
            body,
        })
    }

    /// Bulk orders created within `range`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    #[instrument(skip(self), fields(business = %business))]
    pub async fn bulk_order_rows(
        &self,
        business: &BusinessId,
        range: DateRange,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Vec<BulkOrder>, ServiceError> {
        let (created_from, created_before) = range.instants(&self.calendar);
        Ok(BulkOrderRepository::new(self.pool)
            .list(
                business,
                BulkOrderFilter {
                    payment_status,
                    created_from,
                    created_before,
                },
            )
            .await?)
    }
}

// =============================================================================
// Pure builders
// =============================================================================

/// Check a requested trend length.
///
/// # Errors
///
/// Returns `ServiceError::Validation` outside `1..=MAX_TREND_DAYS`.
pub fn trend_span(days: i64) -> Result<u64, ServiceError> {
    if (1..=MAX_TREND_DAYS).contains(&days) {
        Ok(days.unsigned_abs())
    } else {
        Err(ServiceError::Validation(format!(
            "Days must be between 1 and {MAX_TREND_DAYS}"
        )))
    }
}

/// Lay `count` consecutive months from `first` over the per-month sums,
/// filling months without data with zero.
#[must_use]
pub fn merge_months(
    first: YearMonth,
    count: i32,
    deliveries: &[(YearMonth, Decimal)],
    bulk_orders: &[(YearMonth, Decimal)],
) -> Vec<MonthlyComparison> {
    let lookup = |sums: &[(YearMonth, Decimal)], month: YearMonth| {
        sums.iter()
            .find(|(m, _)| *m == month)
            .map_or(Decimal::ZERO, |(_, amount)| *amount)
    };

    (0..count)
        .map(|i| {
            let month = first.shift(i);
            let deliveries = lookup(deliveries, month);
            let bulk_orders = lookup(bulk_orders, month);
            MonthlyComparison {
                year: month.year(),
                month: month.month(),
                label: month.label(),
                deliveries,
                bulk_orders,
                total: deliveries + bulk_orders,
            }
        })
        .collect()
}

/// Build the month grid: one row per customer, one cell per day.
#[must_use]
pub fn build_matrix(
    month: YearMonth,
    customers: &[Customer],
    deliveries: &[Delivery],
) -> Vec<MatrixRow> {
    customers
        .iter()
        .map(|customer| {
            let daily_status = month
                .days()
                .map(|date| {
                    let delivery = deliveries
                        .iter()
                        .find(|d| d.customer_id == customer.id && d.delivery_date == date);
                    DayCell {
                        day: date.day(),
                        date,
                        delivered: delivery.map(|d| d.delivered),
                        quantity: delivery.map_or(0, |d| d.quantity_delivered),
                        amount: delivery.map_or(Decimal::ZERO, |d| d.amount_billed),
                    }
                })
                .collect();

            MatrixRow {
                customer_id: customer.id,
                customer_name: customer.name.clone(),
                bottle_type: customer.bottle_type,
                price_per_bottle: customer.price_per_bottle,
                daily_status,
            }
        })
        .collect()
}

const CUSTOMERS_HEADER: &str = "Name,Phone,Address,Bottle Type,Price Per Bottle,Total Billed,Total Paid,Pending Balance,Status";
const BULK_ORDERS_HEADER: &str = "Customer Name,Phone,Event Type,Quantity,Bottle Type,Price Per Bottle,Total Amount,Paid Amount,Pending Amount,Payment Status,Created Date";
const DELIVERIES_HEADER: &str =
    "Customer Name,Phone,Delivery Date,Quantity,Amount Billed,Paid Amount,Payment Status";

/// Quote a text field, doubling embedded quotes.
fn quoted(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Money without trailing zeros, e.g. `50` or `12.5`.
fn money(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// CSV of customers and their ledger totals.
#[must_use]
pub fn customers_csv(customers: &[Customer]) -> String {
    let mut out = String::from(CUSTOMERS_HEADER);
    out.push('\n');
    for c in customers {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            quoted(&c.name),
            quoted(&c.phone),
            quoted(&c.address),
            quoted(c.bottle_type.as_str()),
            money(c.price_per_bottle),
            money(c.total_billed),
            money(c.total_paid),
            money(c.pending_balance),
            quoted(if c.is_active { "Active" } else { "Inactive" }),
        );
    }
    out
}

/// CSV of bulk orders. Created dates are business-local.
#[must_use]
pub fn bulk_orders_csv(orders: &[BulkOrder], calendar: &BusinessCalendar) -> String {
    let mut out = String::from(BULK_ORDERS_HEADER);
    out.push('\n');
    for o in orders {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{}",
            quoted(&o.customer_name),
            quoted(&o.phone),
            quoted(&o.event_type.to_string()),
            o.quantity,
            quoted(o.bottle_type.as_str()),
            money(o.price_per_bottle),
            money(o.total_amount),
            money(o.paid_amount),
            money(o.pending_amount),
            quoted(&o.payment_status.to_string()),
            quoted(&calendar.date_of(o.created_at).to_string()),
        );
    }
    out
}

/// CSV of deliveries with their customer.
#[must_use]
pub fn deliveries_csv(deliveries: &[DeliveryWithCustomer]) -> String {
    let mut out = String::from(DELIVERIES_HEADER);
    out.push('\n');
    for row in deliveries {
        let d = &row.delivery;
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{}",
            quoted(&row.customer_name),
            quoted(&row.customer_phone),
            quoted(&d.delivery_date.to_string()),
            d.quantity_delivered,
            money(d.amount_billed),
            money(d.paid_amount),
            quoted(if d.is_paid { "Paid" } else { "Pending" }),
        );
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use aqualedger_core::{DeliveryId, EventType, UserId};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    fn customer(id: i32, name: &str) -> Customer {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        Customer {
            id: CustomerId::new(id),
            business_id: BusinessId::default(),
            name: name.to_string(),
            address: "12 MG Road".to_string(),
            phone: "9876543210".to_string(),
            bottle_type: BottleType::L20,
            price_per_bottle: Decimal::from(50),
            is_active: true,
            total_billed: Decimal::from(100),
            total_paid: Decimal::from(50),
            pending_balance: Decimal::from(50),
            created_at: now,
            updated_at: now,
        }
    }

    fn delivery(customer: i32, on: NaiveDate, delivered: bool, qty: i32) -> Delivery {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
        Delivery {
            id: DeliveryId::new(customer * 100 + i32::try_from(on.day()).unwrap()),
            business_id: BusinessId::default(),
            customer_id: CustomerId::new(customer),
            delivery_date: on,
            delivered,
            quantity_delivered: qty,
            amount_billed: Decimal::from(50 * qty),
            is_paid: false,
            paid_amount: Decimal::ZERO,
            delivered_by: Some(UserId::new(1)),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_windows_mid_year() {
        let w = ReportingWindows::at(date(2024, 5, 15));
        assert_eq!(w.tomorrow, date(2024, 5, 16));
        assert_eq!(w.month_start, date(2024, 5, 1));
        assert_eq!(w.next_month_start, date(2024, 6, 1));
        assert_eq!(w.three_months_start, date(2024, 3, 1));
        assert_eq!(w.six_months_start, date(2023, 12, 1));
        assert_eq!(w.year_start, date(2024, 1, 1));
    }

    #[test]
    fn test_windows_cross_year_boundary() {
        let w = ReportingWindows::at(date(2024, 1, 31));
        assert_eq!(w.tomorrow, date(2024, 2, 1));
        assert_eq!(w.three_months_start, date(2023, 11, 1));
        assert_eq!(w.six_months_start, date(2023, 8, 1));
        assert_eq!(w.year_start, date(2024, 1, 1));

        let w = ReportingWindows::at(date(2024, 12, 31));
        assert_eq!(w.tomorrow, date(2025, 1, 1));
        assert_eq!(w.next_month_start, date(2025, 1, 1));
    }

    #[test]
    fn test_trend_span_bounds() {
        assert_eq!(trend_span(30).unwrap(), 30);
        assert_eq!(trend_span(1).unwrap(), 1);
        assert_eq!(trend_span(MAX_TREND_DAYS).unwrap(), 366);
        assert!(trend_span(0).is_err());
        assert!(trend_span(-5).is_err());
        assert!(trend_span(367).is_err());
    }

    #[test]
    fn test_merge_months_zero_fills_and_labels() {
        let first = ym(2023, 10);
        let deliveries = vec![(ym(2023, 11), Decimal::from(1500)), (ym(2024, 3), Decimal::from(200))];
        let bulk = vec![(ym(2024, 3), Decimal::from(4500))];

        let months = merge_months(first, 6, &deliveries, &bulk);

        assert_eq!(months.len(), 6);
        assert_eq!(months[0].label, "Oct 2023");
        assert_eq!(months[0].total, Decimal::ZERO);
        assert_eq!(months[1].deliveries, Decimal::from(1500));
        assert_eq!(months[3].label, "Jan 2024");
        assert_eq!(months[5].year, 2024);
        assert_eq!(months[5].month, 3);
        assert_eq!(months[5].bulk_orders, Decimal::from(4500));
        assert_eq!(months[5].total, Decimal::from(4700));
    }

    #[test]
    fn test_matrix_has_one_cell_per_day_of_leap_february() {
        let customers = vec![customer(1, "Amit Patel"), customer(2, "Priya Sharma")];
        let deliveries = vec![
            delivery(1, date(2024, 2, 3), true, 2),
            delivery(1, date(2024, 2, 29), false, 0),
            delivery(2, date(2024, 2, 10), true, 1),
        ];

        let rows = build_matrix(ym(2024, 2), &customers, &deliveries);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.daily_status.len() == 29));

        let amit = &rows[0].daily_status;
        assert_eq!(amit[0].delivered, None);
        assert_eq!(amit[2].day, 3);
        assert_eq!(amit[2].delivered, Some(true));
        assert_eq!(amit[2].quantity, 2);
        assert_eq!(amit[2].amount, Decimal::from(100));
        assert_eq!(amit[28].date, date(2024, 2, 29));
        assert_eq!(amit[28].delivered, Some(false));

        let priya = &rows[1].daily_status;
        assert_eq!(priya[2].delivered, None);
        assert_eq!(priya[9].delivered, Some(true));
    }

    #[test]
    fn test_matrix_cell_serializes_null_for_missing_day() {
        let rows = build_matrix(ym(2024, 4), &[customer(1, "Amit Patel")], &[]);
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["dailyStatus"].as_array().unwrap().len(), 30);
        assert!(json["dailyStatus"][0]["delivered"].is_null());
        assert_eq!(json["dailyStatus"][0]["date"], "2024-04-01");
        assert_eq!(json["customerName"], "Amit Patel");
    }

    #[test]
    fn test_report_kind_parsing() {
        assert_eq!("customers".parse::<ReportKind>().unwrap(), ReportKind::Customers);
        assert_eq!("bulk-orders".parse::<ReportKind>().unwrap(), ReportKind::BulkOrders);
        assert_eq!("deliveries".parse::<ReportKind>().unwrap(), ReportKind::Deliveries);
        let err = "invoices".parse::<ReportKind>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid report type");
    }

    #[test]
    fn test_customers_csv_quotes_text() {
        let mut c = customer(1, "Kumar, \"Raj\"");
        c.is_active = false;
        let csv = customers_csv(&[c]);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CUSTOMERS_HEADER);
        assert_eq!(
            lines.next().unwrap(),
            "\"Kumar, \"\"Raj\"\"\",\"9876543210\",\"12 MG Road\",\"20L\",50,100,50,50,\"Inactive\""
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_bulk_orders_csv_uses_local_created_date() {
        let created = Utc.with_ymd_and_hms(2024, 3, 31, 20, 0, 0).unwrap();
        let order = BulkOrder {
            id: aqualedger_core::BulkOrderId::new(1),
            business_id: BusinessId::default(),
            customer_name: "Sharma Wedding".to_string(),
            phone: "9876500000".to_string(),
            address: "Community Hall".to_string(),
            event_type: EventType::Wedding,
            delivery_dates: vec![date(2024, 4, 5)],
            quantity: 100,
            bottle_type: BottleType::L20,
            price_per_bottle: Decimal::from(45),
            total_amount: Decimal::from(4500),
            paid_amount: Decimal::from(2000),
            pending_amount: Decimal::from(2500),
            payment_status: PaymentStatus::Partial,
            notes: None,
            created_by: None,
            created_at: created,
            updated_at: created,
        };
        let ist = BusinessCalendar::new(BusinessCalendar::parse_offset("+05:30").unwrap());

        let csv = bulk_orders_csv(&[order], &ist);
        let row = csv.lines().nth(1).unwrap();

        assert_eq!(
            row,
            "\"Sharma Wedding\",\"9876500000\",\"wedding\",100,\"20L\",45,4500,2000,2500,\"partial\",\"2024-04-01\""
        );
    }

    #[test]
    fn test_deliveries_csv_payment_status() {
        let mut paid = delivery(1, date(2024, 3, 1), true, 2);
        paid.is_paid = true;
        paid.paid_amount = Decimal::from(100);
        let rows = vec![DeliveryWithCustomer {
            delivery: paid,
            customer_name: "Rajesh Kumar".to_string(),
            customer_phone: "9876543210".to_string(),
            customer_address: "12 MG Road".to_string(),
        }];

        let csv = deliveries_csv(&rows);

        assert_eq!(
            csv.lines().nth(1).unwrap(),
            "\"Rajesh Kumar\",\"9876543210\",\"2024-03-01\",2,100,100,\"Paid\""
        );
    }

    #[test]
    fn test_date_range_is_whole_days() {
        let utc = BusinessCalendar::utc();
        let range = DateRange {
            start: Some(date(2024, 3, 1)),
            end: Some(date(2024, 3, 31)),
        };
        let (from, before) = range.instants(&utc);
        assert_eq!(from.unwrap(), Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(before.unwrap(), Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(DateRange::default().instants(&utc), (None, None));
    }
}
