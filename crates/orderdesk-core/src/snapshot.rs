//! # Order Snapshot
//!
//! Frozen copy of an order's lines, stored as JSON text next to the totals.
//!
//! ## Snapshot Pattern
//! Product names and prices are copied into the order when it is saved.
//! Renaming or repricing a catalog product later does not rewrite history.
//!
//! ## Format
//! ```text
//! [
//!   {"id": "p-1", "name": "Widget", "quantity": 3, "unit_price": 1000, "subtotal": 3000},
//!   {"id": null,  "name": "Frete",  "quantity": 1, "unit_price": 1500, "subtotal": 1500}
//! ]
//! ```
//! Money values are integer cents. Line order is preserved.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::LineItem;

/// One frozen order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLine {
    /// Catalog product id, `None` for free-form lines.
    pub id: Option<String>,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Ordered list of frozen lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderSnapshot {
    lines: Vec<SnapshotLine>,
}

impl OrderSnapshot {
    /// Freezes priced line items, keeping their order.
    pub fn from_items(items: &[(Option<String>, LineItem)]) -> Self {
        let lines = items
            .iter()
            .map(|(id, item)| SnapshotLine {
                id: id.clone(),
                name: item.name().to_string(),
                quantity: item.quantity(),
                unit_price: item.unit_price(),
                subtotal: item.subtotal(),
            })
            .collect();

        OrderSnapshot { lines }
    }

    pub fn lines(&self) -> &[SnapshotLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Rebuilds line items for re-pricing an edited order.
    ///
    /// Fails if a stored line no longer validates.
    pub fn line_items(&self) -> CoreResult<Vec<(Option<String>, LineItem)>> {
        self.lines
            .iter()
            .map(|line| {
                LineItem::new(line.name.as_str(), line.quantity, line.unit_price)
                    .map(|item| (line.id.clone(), item))
                    .map_err(|e| CoreError::SnapshotFormat {
                        reason: format!("line '{}': {}", line.name, e),
                    })
            })
            .collect()
    }

    /// Encodes as JSON text for the `items` column.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes the `items` column.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OrderSnapshot {
        OrderSnapshot::from_items(&[
            (
                Some("p-1".to_string()),
                LineItem::new("Widget", 3, Money::from_cents(1000)).unwrap(),
            ),
            (None, LineItem::new("Frete", 1, Money::from_cents(1500)).unwrap()),
        ])
    }

    #[test]
    fn test_json_layout() {
        let json = sample().to_json().unwrap();
        assert_eq!(
            json,
            r#"[{"id":"p-1","name":"Widget","quantity":3,"unit_price":1000,"subtotal":3000},{"id":null,"name":"Frete","quantity":1,"unit_price":1500,"subtotal":1500}]"#
        );
    }

    #[test]
    fn test_decode_keeps_order_and_values() {
        let snapshot = sample();
        let decoded = OrderSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.lines()[0].name, "Widget");
        assert_eq!(decoded.lines()[1].id, None);
    }

    #[test]
    fn test_line_items_rebuild() {
        let items = sample().line_items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].1.subtotal().cents(), 3000);
        assert_eq!(items[1].0, None);
    }

    #[test]
    fn test_tampered_line_is_rejected() {
        let json = r#"[{"id":null,"name":"X","quantity":0,"unit_price":100,"subtotal":0}]"#;
        let snapshot = OrderSnapshot::from_json(json).unwrap();
        assert!(matches!(
            snapshot.line_items(),
            Err(CoreError::SnapshotFormat { .. })
        ));

        assert!(OrderSnapshot::from_json("{not json").is_err());
    }

    #[test]
    fn test_empty_snapshot() {
        let empty = OrderSnapshot::default();
        assert!(empty.is_empty());
        assert_eq!(empty.to_json().unwrap(), "[]");
    }
}
