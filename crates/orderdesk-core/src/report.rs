//! # Dashboard Report
//!
//! Figures shown on the reporting dashboard, and the parts of them that are
//! computed in memory rather than in SQL.
//!
//! ## Figures
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  month filter (optional, "YYYY-MM")                                     │
//! │       │                                                                 │
//! │       ├──► order count, revenue (Σ net)                                 │
//! │       ├──► cheapest order (lowest net) and its month                    │
//! │       ├──► top customer (highest Σ net)                                 │
//! │       ├──► product sales, tallied from the order snapshots              │
//! │       └──► revenue per payment method                                   │
//! │                                                                         │
//! │  revenue per month always covers every order                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::snapshot::OrderSnapshot;

/// How many products the best-seller list shows.
pub const TOP_PRODUCTS: usize = 5;

// =============================================================================
// Report Month
// =============================================================================

/// A calendar month used to narrow the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, TS)]
#[ts(export)]
pub struct ReportMonth {
    year: i32,
    month: u32,
}

impl ReportMonth {
    /// Builds a month, or `None` when `month` is not 1-12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(ReportMonth { year, month })
    }

    /// Parses the `?mes=YYYY-MM` query value.
    ///
    /// Anything malformed yields `None`, which shows the unfiltered dashboard.
    ///
    /// ## Example
    /// ```rust
    /// use orderdesk_core::report::ReportMonth;
    ///
    /// let month = ReportMonth::parse("2026-03").unwrap();
    /// assert_eq!(month.to_string(), "2026-03");
    /// assert!(ReportMonth::parse("2026-13").is_none());
    /// assert!(ReportMonth::parse("março").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let (year, month) = text.trim().split_once('-')?;
        ReportMonth::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// `[first instant of the month, first instant of the next month)`.
    ///
    /// `None` only at the very end of chrono's calendar.
    pub fn bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let (next_year, next_month) = if self.month == 12 {
            (self.year.checked_add(1)?, 1)
        } else {
            (self.year, self.month + 1)
        };

        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1)?.and_hms_opt(0, 0, 0)?;
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.and_hms_opt(0, 0, 0)?;

        Some((Utc.from_utc_datetime(&start), Utc.from_utc_datetime(&end)))
    }
}

impl fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// =============================================================================
// Summary Types
// =============================================================================

/// The lowest-value order in the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct CheapestOrder {
    pub net: Money,
    /// `YYYY-MM` of the order.
    pub month: String,
}

/// The customer with the highest spend in the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct TopCustomer {
    pub customer_id: String,
    pub orders: i64,
    pub net: Money,
}

/// Units sold and revenue for one product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ProductSales {
    pub name: String,
    pub quantity: i64,
    /// Σ line subtotals, before order-level discounts.
    pub revenue: Money,
}

/// Revenue for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: Money,
}

/// Revenue for one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PaymentRevenue {
    pub payment_method: String,
    pub revenue: Money,
}

/// Everything the dashboard page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    /// The month filter that was applied, if any.
    pub month: Option<ReportMonth>,
    pub order_count: i64,
    /// Σ net over the period.
    pub revenue: Money,
    pub cheapest_order: Option<CheapestOrder>,
    pub top_customer: Option<TopCustomer>,
    /// Best sellers by quantity, at most [`TOP_PRODUCTS`].
    pub top_products: Vec<ProductSales>,
    /// Every product sold in the period, by revenue.
    pub product_revenue: Vec<ProductSales>,
    /// Oldest month first; ignores the month filter.
    pub revenue_by_month: Vec<MonthlyRevenue>,
    pub revenue_by_payment: Vec<PaymentRevenue>,
}

// =============================================================================
// Product Tally
// =============================================================================

/// Sums quantity and revenue per product name across order snapshots.
///
/// Lines are grouped by their frozen name, so a renamed product shows up
/// under each name it was sold as. The result is sorted by quantity
/// (highest first), then name.
pub fn tally_products<'a, I>(snapshots: I) -> Vec<ProductSales>
where
    I: IntoIterator<Item = &'a OrderSnapshot>,
{
    let mut totals: HashMap<&str, (i64, Money)> = HashMap::new();

    for snapshot in snapshots {
        for line in snapshot.lines() {
            let entry = totals.entry(line.name.as_str()).or_insert((0, Money::zero()));
            entry.0 = entry.0.saturating_add(line.quantity);
            entry.1 = Money::from_cents(entry.1.cents().saturating_add(line.subtotal.cents()));
        }
    }

    let mut products: Vec<ProductSales> = totals
        .into_iter()
        .map(|(name, (quantity, revenue))| ProductSales {
            name: name.to_string(),
            quantity,
            revenue,
        })
        .collect();

    products.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.name.cmp(&b.name)));
    products
}

/// The first [`TOP_PRODUCTS`] entries of a tally.
pub fn top_products(tally: &[ProductSales]) -> Vec<ProductSales> {
    tally.iter().take(TOP_PRODUCTS).cloned().collect()
}

/// Re-sorts a tally by revenue (highest first), then name.
pub fn by_revenue(mut tally: Vec<ProductSales>) -> Vec<ProductSales> {
    tally.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
    tally
}

// =============================================================================
// Unit Tests
// =============================================================================
