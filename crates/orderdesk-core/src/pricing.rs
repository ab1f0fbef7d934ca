//! # Order Pricing Engine
//!
//! Turns a pre-filtered list of line items plus a discount into the three
//! numbers every order carries: gross, discount and net.
//!
//! ## Calculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    compute_totals(items, discount)                      │
//! │                                                                         │
//! │  items ──► Σ quantity × unit_price ──► gross                           │
//! │                                          │                              │
//! │  DiscountSpec                            ▼                              │
//! │  ├── Percentage(p)  ──► gross × p / 100 ──┐                            │
//! │  ├── FixedAmount(v) ──► v ────────────────┼──► clamp to [0, gross]     │
//! │  └── None           ──► 0 ────────────────┘          │                  │
//! │                                                      ▼                  │
//! │                                        net = gross − discount           │
//! │                                                      │                  │
//! │                              round each field to cents (ONLY here)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! Internally amounts are exact [`Decimal`] currency units, so a percentage
//! discount keeps every digit until the output boundary. Each field is then
//! rounded to cents on its own (half away from zero). A consequence kept from the
//! legacy screens: `net` is rounded from the unrounded difference, so
//! `net == gross - discount` can be off by one cent.
//!
//! ## Example
//! ```rust
//! use orderdesk_core::money::Money;
//! use orderdesk_core::pricing::{compute_totals, DiscountSpec, LineItem, Percentage};
//!
//! let items = vec![
//!     LineItem::new("Widget", 3, Money::from_cents(1000)).unwrap(),
//!     LineItem::new("Gadget", 1, Money::from_cents(2500)).unwrap(),
//! ];
//! let discount = DiscountSpec::Percentage(Percentage::from_bps(1000).unwrap());
//!
//! let totals = compute_totals(&items, &discount);
//! assert_eq!(totals.gross.cents(), 5500);
//! assert_eq!(totals.discount.cents(), 550);
//! assert_eq!(totals.net.cents(), 4950);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{parse_decimal, Money};
use crate::validation::{validate_item_name, validate_quantity, validate_unit_price, ValidationResult};

/// Basis points in 100 %.
pub const FULL_PERCENT_BPS: u32 = 10_000;

// =============================================================================
// Percentage
// =============================================================================

/// A discount percentage in basis points (1 bp = 0.01 %).
///
/// Always within `0..=10000`; there is no way to build one outside that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Percentage(u32);

impl Percentage {
    /// Creates a percentage from basis points.
    ///
    /// ## Example
    /// ```rust
    /// use orderdesk_core::pricing::Percentage;
    ///
    /// assert_eq!(Percentage::from_bps(1250).unwrap().bps(), 1250); // 12.5 %
    /// assert!(Percentage::from_bps(10_001).is_err());
    /// ```
    pub fn from_bps(bps: u32) -> ValidationResult<Self> {
        if bps > FULL_PERCENT_BPS {
            return Err(ValidationError::OutOfRange {
                field: "discount percentage".to_string(),
                min: 0,
                max: 100,
            });
        }
        Ok(Percentage(bps))
    }

    /// Parses percent text such as `"10"`, `"12.5"` or `"12,50"`.
    pub fn parse(text: &str) -> ValidationResult<Self> {
        let percent = parse_decimal(text).map_err(|reason| ValidationError::InvalidFormat {
            field: "discount percentage".to_string(),
            reason,
        })?;

        let bps = percent
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|bps| bps.to_u32())
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "discount percentage".to_string(),
                min: 0,
                max: 100,
            })?;

        Percentage::from_bps(bps)
    }

    /// The share as a fraction of one (`1250` bps → `0.125`).
    #[inline]
    pub fn fraction(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 4)
    }

    /// Returns the value in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }
}

impl TryFrom<u32> for Percentage {
    type Error = ValidationError;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Percentage::from_bps(bps)
    }
}

impl From<Percentage> for u32 {
    fn from(p: Percentage) -> Self {
        p.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Flat Amount
// =============================================================================

/// A fixed discount amount. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Money", into = "Money")]
pub struct FlatAmount(Money);

impl FlatAmount {
    /// Creates a flat discount, rejecting negative amounts.
    pub fn new(amount: Money) -> ValidationResult<Self> {
        if amount.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "discount amount".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        Ok(FlatAmount(amount))
    }

    /// Returns the discount as Money.
    #[inline]
    pub const fn amount(&self) -> Money {
        self.0
    }
}

impl TryFrom<Money> for FlatAmount {
    type Error = ValidationError;

    fn try_from(amount: Money) -> Result<Self, Self::Error> {
        FlatAmount::new(amount)
    }
}

impl From<FlatAmount> for Money {
    fn from(flat: FlatAmount) -> Self {
        flat.0
    }
}

// =============================================================================
// Discount Specification
// =============================================================================

/// How much to take off an order.
///
/// A closed set: the payload types reject out-of-range values at
/// construction, so every `DiscountSpec` that exists is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DiscountSpec {
    /// A share of the gross total.
    Percentage(Percentage),
    /// A fixed amount, clamped to the gross total.
    FixedAmount(FlatAmount),
    /// No discount.
    #[default]
    None,
}

impl DiscountSpec {
    /// Discount amount in currency units, before clamping.
    fn raw_amount(&self, gross: Decimal) -> Decimal {
        match self {
            DiscountSpec::Percentage(p) => gross.saturating_mul(p.fraction()),
            DiscountSpec::FixedAmount(v) => v.amount().to_decimal(),
            DiscountSpec::None => Decimal::ZERO,
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One order line: a product name, how many, and the price of one.
///
/// Immutable once built. Use [`LineItem::new`], which checks the quantity is
/// within `1..=MAX_QUANTITY` and the price within `0..=MAX_UNIT_PRICE_CENTS`,
/// so a subtotal always fits in `Money`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    name: String,
    quantity: i64,
    unit_price: Money,
}

impl LineItem {
    /// Creates a validated line item. The name is trimmed.
    ///
    /// ## Example
    /// ```rust
    /// use orderdesk_core::money::Money;
    /// use orderdesk_core::pricing::LineItem;
    ///
    /// let item = LineItem::new(" Widget ", 3, Money::from_cents(1000)).unwrap();
    /// assert_eq!(item.name(), "Widget");
    /// assert_eq!(item.subtotal().cents(), 3000);
    ///
    /// assert!(LineItem::new("Widget", 0, Money::from_cents(1000)).is_err());
    /// ```
    pub fn new(name: impl Into<String>, quantity: i64, unit_price: Money) -> ValidationResult<Self> {
        let name = name.into();
        validate_item_name(&name)?;
        validate_quantity(quantity)?;
        validate_unit_price(unit_price)?;

        Ok(LineItem {
            name: name.trim().to_string(),
            quantity,
            unit_price,
        })
    }

    /// Item name as shown on the order.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quantity ordered.
    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Price of one unit.
    #[inline]
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// quantity × unit_price
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    fn exact_subtotal(&self) -> Decimal {
        self.unit_price
            .to_decimal()
            .saturating_mul(Decimal::from(self.quantity))
    }
}

// =============================================================================
// Order Totals
// =============================================================================

/// The three numbers stored with every order.
///
/// ## Invariants
/// - `0 <= discount <= gross`
/// - `net >= 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    /// Sum of line subtotals.
    pub gross: Money,
    /// Amount taken off.
    pub discount: Money,
    /// What the customer pays.
    pub net: Money,
}

// =============================================================================
// Engine
// =============================================================================

/// Computes gross, discount and net for an order.
///
/// ## Precondition
/// The caller has already dropped lines with a non-positive quantity or
/// price (see [`crate::forms::collect_line_items`]). The engine does not
/// re-check them.
///
/// ## Guarantees
/// - Pure and total: same input, same output, never fails
/// - Empty `items` gives all zeros whatever the discount
/// - The discount never exceeds gross, so net is never negative
/// - Sums too large for `Money` saturate at `i64::MAX` cents
pub fn compute_totals(items: &[LineItem], discount: &DiscountSpec) -> OrderTotals {
    let gross = items
        .iter()
        .map(LineItem::exact_subtotal)
        .fold(Decimal::ZERO, Decimal::saturating_add)
        .max(Decimal::ZERO);

    let discount_amount = discount.raw_amount(gross).clamp(Decimal::ZERO, gross);
    let net = gross - discount_amount;

    let totals = OrderTotals {
        gross: Money::from_decimal_rounded(gross),
        discount: Money::from_decimal_rounded(discount_amount),
        net: Money::from_decimal_rounded(net),
    };

    trace!(
        lines = items.len(),
        gross = %totals.gross,
        discount = %totals.discount,
        net = %totals.net,
        "Order totals computed"
    );

    totals
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, qty: i64, cents: i64) -> LineItem {
        LineItem::new(name, qty, Money::from_cents(cents)).unwrap()
    }

    fn pct(bps: u32) -> DiscountSpec {
        DiscountSpec::Percentage(Percentage::from_bps(bps).unwrap())
    }

    fn flat(cents: i64) -> DiscountSpec {
        DiscountSpec::FixedAmount(FlatAmount::new(Money::from_cents(cents)).unwrap())
    }

    fn widget_and_gadget() -> Vec<LineItem> {
        vec![item("Widget", 3, 1000), item("Gadget", 1, 2500)]
    }

    #[test]
    fn test_percentage_example_order() {
        let totals = compute_totals(&widget_and_gadget(), &pct(1000));

        assert_eq!(totals.gross, Money::from_cents(5500));
        assert_eq!(totals.discount, Money::from_cents(550));
        assert_eq!(totals.net, Money::from_cents(4950));
    }

    #[test]
    fn test_empty_items_are_zero_for_every_discount() {
        for discount in [DiscountSpec::None, pct(5000), pct(10_000), flat(1500)] {
            assert_eq!(compute_totals(&[], &discount), OrderTotals::default());
        }
    }

    #[test]
    fn test_no_discount() {
        let totals = compute_totals(&widget_and_gadget(), &DiscountSpec::None);
        assert_eq!(totals.discount, Money::zero());
        assert_eq!(totals.net, totals.gross);
    }

    #[test]
    fn test_fixed_amount_below_gross() {
        let totals = compute_totals(&widget_and_gadget(), &flat(1234));
        assert_eq!(totals.discount.cents(), 1234);
        assert_eq!(totals.net.cents(), 5500 - 1234);
    }

    #[test]
    fn test_fixed_amount_above_gross_clamps() {
        let totals = compute_totals(&widget_and_gadget(), &flat(10_000));
        assert_eq!(totals.discount, totals.gross);
        assert_eq!(totals.net, Money::zero());
    }

    #[test]
    fn test_full_percentage_zeroes_net() {
        let totals = compute_totals(&widget_and_gadget(), &pct(10_000));
        assert_eq!(totals.discount.cents(), 5500);
        assert_eq!(totals.net.cents(), 0);
    }

    #[test]
    fn test_percentage_matches_rounded_share() {
        // 33.33 % of 10.00 = 3.333 → 3.33
        let items = vec![item("Caderno", 1, 1000)];
        let totals = compute_totals(&items, &pct(3333));
        assert_eq!(totals.discount.cents(), 333);

        // 12.5 % of 0.99 = 0.12375 → 0.12
        let items = vec![item("Bala", 1, 99)];
        let totals = compute_totals(&items, &pct(1250));
        assert_eq!(totals.discount.cents(), 12);
    }

    #[test]
    fn test_free_item_keeps_totals_nonnegative() {
        let items = vec![item("Brinde", 2, 0)];
        let totals = compute_totals(&items, &flat(500));
        assert_eq!(totals, OrderTotals::default());
    }

    #[test]
    fn test_invariants_hold_across_inputs() {
        let baskets = vec![
            vec![item("A", 1, 1)],
            vec![item("A", 7, 333), item("B", 3, 1999)],
            vec![item("A", 1000, 12_345)],
        ];
        let discounts = [
            DiscountSpec::None,
            pct(1),
            pct(4999),
            pct(10_000),
            flat(0),
            flat(50),
            flat(1_000_000_000),
        ];

        for items in &baskets {
            for discount in &discounts {
                let totals = compute_totals(items, discount);
                assert!(totals.gross >= Money::zero());
                assert!(totals.discount >= Money::zero());
                assert!(totals.discount <= totals.gross);
                assert!(totals.net >= Money::zero());
                assert!(totals.net <= totals.gross);
            }
        }
    }

    /// Documents the legacy rounding: net is rounded from the exact
    /// difference, not derived from the rounded discount.
    #[test]
    fn test_independent_rounding_can_differ_by_a_cent() {
        // 50 % of 10.01 = 5.005 → discount 5.01, net 5.005 → 5.01
        let items = vec![item("Fita", 1, 1001)];
        let totals = compute_totals(&items, &pct(5000));

        assert_eq!(totals.gross.cents(), 1001);
        assert_eq!(totals.discount.cents(), 501);
        assert_eq!(totals.net.cents(), 501);
        assert_ne!(totals.net, totals.gross - totals.discount);
    }

    #[test]
    fn test_largest_lines_do_not_overflow() {
        let biggest = item("Lote", crate::MAX_QUANTITY, crate::MAX_UNIT_PRICE_CENTS);
        assert_eq!(
            biggest.subtotal().cents(),
            crate::MAX_QUANTITY * crate::MAX_UNIT_PRICE_CENTS
        );

        // 100 maximal lines sum past i64::MAX cents; gross saturates.
        let items = vec![biggest; 100];
        let totals = compute_totals(&items, &pct(5000));
        assert_eq!(totals.gross.cents(), i64::MAX);
        assert!(totals.discount <= totals.gross);
        assert!(totals.net >= Money::zero());

        let totals = compute_totals(&items[..2], &DiscountSpec::None);
        assert_eq!(totals.gross.cents(), 2 * crate::MAX_QUANTITY * crate::MAX_UNIT_PRICE_CENTS);
    }

    #[test]
    fn test_line_item_rejects_values_past_limits() {
        let max_price = Money::from_cents(crate::MAX_UNIT_PRICE_CENTS);
        assert!(LineItem::new("X", crate::MAX_QUANTITY + 1, max_price).is_err());
        assert!(LineItem::new("X", 1, Money::from_cents(crate::MAX_UNIT_PRICE_CENTS + 1)).is_err());
        assert!(LineItem::new("X", 10_000_000_000, Money::from_cents(9_999_999_999_900)).is_err());
    }

    #[test]
    fn test_percentage_bounds_and_parse() {
        assert!(Percentage::from_bps(0).is_ok());
        assert!(Percentage::from_bps(10_000).is_ok());
        assert!(Percentage::from_bps(10_001).is_err());

        assert_eq!(Percentage::parse("10").unwrap().bps(), 1000);
        assert_eq!(Percentage::parse("12,5").unwrap().bps(), 1250);
        assert_eq!(Percentage::parse("0.01").unwrap().bps(), 1);
        assert!(Percentage::parse("10.999").is_err());
        assert_eq!(Percentage::from_bps(1250).unwrap().fraction(), Decimal::new(125, 3));
        assert!(Percentage::parse("100.01").is_err());
        assert!(Percentage::parse("-5").is_err());
        assert!(Percentage::parse("dez").is_err());

        assert_eq!(Percentage::from_bps(1250).unwrap().to_string(), "12.50%");
    }

    #[test]
    fn test_flat_amount_rejects_negative() {
        assert!(FlatAmount::new(Money::from_cents(-1)).is_err());
        assert_eq!(FlatAmount::new(Money::zero()).unwrap().amount(), Money::zero());
    }

    #[test]
    fn test_discount_spec_serde_validates_payload() {
        let json = serde_json::to_string(&pct(1000)).unwrap();
        assert_eq!(json, r#"{"kind":"percentage","value":1000}"#);
        assert_eq!(serde_json::from_str::<DiscountSpec>(&json).unwrap(), pct(1000));

        let too_big = r#"{"kind":"percentage","value":20000}"#;
        assert!(serde_json::from_str::<DiscountSpec>(too_big).is_err());

        let negative = r#"{"kind":"fixed_amount","value":-5}"#;
        assert!(serde_json::from_str::<DiscountSpec>(negative).is_err());

        let none = r#"{"kind":"none"}"#;
        assert_eq!(serde_json::from_str::<DiscountSpec>(none).unwrap(), DiscountSpec::None);
    }

    #[test]
    fn test_line_item_validation() {
        assert!(LineItem::new("", 1, Money::from_cents(100)).is_err());
        assert!(LineItem::new("X", -2, Money::from_cents(100)).is_err());
        assert!(LineItem::new("X", 1, Money::from_cents(-100)).is_err());

        let it = item("  Cabo USB ", 2, 1590);
        assert_eq!(it.name(), "Cabo USB");
        assert_eq!(it.quantity(), 2);
        assert_eq!(it.unit_price().cents(), 1590);
        assert_eq!(it.subtotal().cents(), 3180);
    }
}
