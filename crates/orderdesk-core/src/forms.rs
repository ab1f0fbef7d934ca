//! # Order Form Boundary
//!
//! Converts raw order-entry form fields into pricing inputs.
//!
//! ## Filter-then-Compute
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /pedidos/novo                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LineItemForm rows (text) ──► collect_line_items ──► Vec<LineItem>     │
//! │       │   drops: blank name, qty <= 0, price <= 0, unparsable text,    │
//! │       │          values past MAX_QUANTITY / MAX_UNIT_PRICE_CENTS,      │
//! │       │          prices with more than two decimal places              │
//! │       │                                                                 │
//! │  DiscountForm (kind, value) ──► into_spec ──► DiscountSpec              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pricing::compute_totals(items, discount)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The legacy forms post the discount kind as `"percentual"` or `"valor"`.
//! Those strings stop here; everything downstream sees [`DiscountSpec`].

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use crate::money::Money;
use crate::pricing::{DiscountSpec, FlatAmount, LineItem, Percentage};
use crate::validation::ValidationResult;

/// Discount kind value for a percentage discount.
pub const KIND_PERCENTAGE: &str = "percentual";

/// Discount kind value for a fixed amount discount.
pub const KIND_FIXED: &str = "valor";

/// Parses a non-negative amount such as `"10,50"`.
///
/// ## Example
/// ```rust
/// use orderdesk_core::forms::parse_amount;
///
/// assert_eq!(parse_amount("10,50").unwrap().cents(), 1050);
/// assert!(parse_amount("-1").is_none());
/// assert!(parse_amount("dez").is_none());
/// ```
pub fn parse_amount(text: &str) -> Option<Money> {
    text.parse::<Money>().ok().filter(|m| !m.is_negative())
}

/// Parses a whole-number quantity.
pub fn parse_quantity(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

// =============================================================================
// Line Items
// =============================================================================

/// One posted order row, still as text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineItemForm {
    /// Catalog product id; absent for free-form lines.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit_price: String,
}

impl LineItemForm {
    /// Turns the row into a line item, or `None` when it should be skipped.
    pub fn to_line_item(&self) -> Option<LineItem> {
        let quantity = parse_quantity(&self.quantity)?;
        let unit_price = parse_amount(&self.unit_price)?;

        if quantity <= 0 || !unit_price.is_positive() {
            return None;
        }

        LineItem::new(self.name.as_str(), quantity, unit_price).ok()
    }
}

/// Keeps the rows that make a valid, priced line and drops the rest.
///
/// The returned ids travel with their items into the order snapshot.
pub fn collect_line_items<'a, I>(rows: I) -> Vec<(Option<String>, LineItem)>
where
    I: IntoIterator<Item = &'a LineItemForm>,
{
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.as_deref().map(str::trim).filter(|id| !id.is_empty());
            row.to_line_item().map(|item| (id.map(str::to_string), item))
        })
        .collect()
}

// =============================================================================
// Discount
// =============================================================================

/// The posted discount fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscountForm {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl DiscountForm {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        DiscountForm {
            kind: Some(kind.into()),
            value: Some(value.into()),
        }
    }

    /// Builds the discount specification.
    ///
    /// ## Rules
    /// - `"percentual"` → [`DiscountSpec::Percentage`]
    /// - `"valor"` → [`DiscountSpec::FixedAmount`]
    /// - missing or unknown kind → [`DiscountSpec::None`]
    /// - missing, blank or non-numeric value → zero
    /// - a percentage above 100, a negative value, or a value with more
    ///   than two decimal places → error
    pub fn into_spec(&self) -> ValidationResult<DiscountSpec> {
        let kind = self
            .kind
            .as_deref()
            .map(|k| k.trim().to_lowercase())
            .unwrap_or_default();
        let value = self.value.as_deref().unwrap_or_default().trim();

        match kind.as_str() {
            KIND_PERCENTAGE => {
                if value_is_blank_or_garbage(value) {
                    return Ok(DiscountSpec::Percentage(Percentage::zero()));
                }
                Ok(DiscountSpec::Percentage(Percentage::parse(value)?))
            }
            KIND_FIXED => {
                if value_is_blank_or_garbage(value) {
                    return Ok(DiscountSpec::FixedAmount(FlatAmount::new(Money::zero())?));
                }
                let amount = value.parse::<Money>()?;
                Ok(DiscountSpec::FixedAmount(FlatAmount::new(amount)?))
            }
            _ => Ok(DiscountSpec::None),
        }
    }
}

/// Legacy forms treated anything non-numeric as 0. Numbers that are
/// negative or too precise are numeric and get rejected downstream.
fn value_is_blank_or_garbage(value: &str) -> bool {
    value.is_empty() || Decimal::from_str(&value.replace(',', ".")).is_err()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: Option<&str>, name: &str, qty: &str, price: &str) -> LineItemForm {
        LineItemForm {
            id: id.map(str::to_string),
            name: name.to_string(),
            quantity: qty.to_string(),
            unit_price: price.to_string(),
        }
    }

    #[test]
    fn test_collect_drops_unusable_rows() {
        let rows = vec![
            row(Some("p-1"), "Widget", "3", "10,00"),
            row(None, "", "1", "5.00"),
            row(None, "Zero qty", "0", "5.00"),
            row(None, "Negative qty", "-2", "5.00"),
            row(None, "Free", "1", "0"),
            row(None, "Garbage price", "1", "abc"),
            row(None, "Garbage qty", "x", "1.00"),
            row(Some("  "), "Gadget", " 1 ", "25"),
        ];

        let items = collect_line_items(&rows);
        assert_eq!(items.len(), 2);

        let (id, widget) = &items[0];
        assert_eq!(id.as_deref(), Some("p-1"));
        assert_eq!(widget.name(), "Widget");
        assert_eq!(widget.subtotal().cents(), 3000);

        let (id, gadget) = &items[1];
        assert_eq!(id, &None);
        assert_eq!(gadget.unit_price().cents(), 2500);
    }

    #[test]
    fn test_percentage_discount_form() {
        let spec = DiscountForm::new("percentual", "10,5").into_spec().unwrap();
        assert_eq!(spec, DiscountSpec::Percentage(Percentage::from_bps(1050).unwrap()));

        let spec = DiscountForm::new(" Percentual ", "").into_spec().unwrap();
        assert_eq!(spec, DiscountSpec::Percentage(Percentage::zero()));

        assert!(DiscountForm::new("percentual", "150").into_spec().is_err());
        assert!(DiscountForm::new("percentual", "-5").into_spec().is_err());
    }

    #[test]
    fn test_fixed_discount_form() {
        let spec = DiscountForm::new("valor", "7.25").into_spec().unwrap();
        assert_eq!(
            spec,
            DiscountSpec::FixedAmount(FlatAmount::new(Money::from_cents(725)).unwrap())
        );

        let spec = DiscountForm::new("valor", "sete").into_spec().unwrap();
        assert_eq!(
            spec,
            DiscountSpec::FixedAmount(FlatAmount::new(Money::zero()).unwrap())
        );

        assert!(DiscountForm::new("valor", "-1,00").into_spec().is_err());
    }

    #[test]
    fn test_over_precise_discount_is_rejected() {
        assert!(DiscountForm::new("valor", "10.999").into_spec().is_err());
        assert!(DiscountForm::new("percentual", "10,999").into_spec().is_err());

        // trailing zeros are not extra precision
        let spec = DiscountForm::new("valor", "10.990").into_spec().unwrap();
        assert_eq!(
            spec,
            DiscountSpec::FixedAmount(FlatAmount::new(Money::from_cents(1099)).unwrap())
        );
    }

    #[test]
    fn test_rows_past_limits_or_precision_are_dropped() {
        let max_price = Money::from_cents(crate::MAX_UNIT_PRICE_CENTS).to_decimal_string();
        let max_qty = crate::MAX_QUANTITY.to_string();

        let rows = vec![
            row(None, "Huge", "10000000000", "99999999999"),
            row(None, "Too many", &(crate::MAX_QUANTITY + 1).to_string(), "1.00"),
            row(None, "Too dear", "1", "1000000000.01"),
            row(None, "Sub-cent", "1", "10.999"),
            row(None, "Largest", &max_qty, &max_price),
        ];

        let items = collect_line_items(&rows);
        assert_eq!(items.len(), 1);

        let (_, largest) = &items[0];
        assert_eq!(largest.name(), "Largest");
        assert_eq!(largest.quantity(), crate::MAX_QUANTITY);
        assert_eq!(largest.unit_price().cents(), crate::MAX_UNIT_PRICE_CENTS);

        let lines: Vec<LineItem> = items.into_iter().map(|(_, item)| item).collect();
        let totals = crate::pricing::compute_totals(&lines, &DiscountSpec::None);
        assert_eq!(
            totals.gross.cents(),
            crate::MAX_QUANTITY * crate::MAX_UNIT_PRICE_CENTS
        );
    }

    #[test]
    fn test_unknown_or_missing_kind_means_no_discount() {
        assert_eq!(DiscountForm::new("cupom", "10").into_spec().unwrap(), DiscountSpec::None);
        assert_eq!(DiscountForm::default().into_spec().unwrap(), DiscountSpec::None);
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_amount(" 0,99 ").unwrap().cents(), 99);
        assert_eq!(parse_amount("0").unwrap(), Money::zero());
        assert!(parse_amount("").is_none());
        assert_eq!(parse_quantity(" 12 "), Some(12));
        assert_eq!(parse_quantity("1.5"), None);
    }
}
