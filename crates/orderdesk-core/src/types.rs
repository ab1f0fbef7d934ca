//! # Domain Types
//!
//! Persisted entities shared by the database layer and the web layer.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderStatus   │   │      User       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  Paid           │   │  id (UUID)      │       │
//! │  │  items (JSON)   │   │  Pending        │   │  email          │       │
//! │  │  gross_cents    │   │  Cancelled      │   │  password_hash  │       │
//! │  │  discount_cents │   └─────────────────┘   │  profile_id     │       │
//! │  │  net_cents      │                         │  active         │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::access::Role;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::OrderTotals;
use crate::snapshot::OrderSnapshot;

// =============================================================================
// Order Status
// =============================================================================

/// Where an order stands.
///
/// New orders are recorded as paid at the counter, which is what the legacy
/// screens did (`"PAGO"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Paid,
    Pending,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Paid => "paid",
            OrderStatus::Pending => "pending",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the stored spelling and the legacy Portuguese labels.
impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paid" | "pago" => Ok(OrderStatus::Paid),
            "pending" | "pendente" => Ok(OrderStatus::Pending),
            "cancelled" | "cancelado" => Ok(OrderStatus::Cancelled),
            _ => Err(CoreError::UnknownOrderStatus(s.to_string())),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A saved order with its frozen lines and totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub customer_id: Option<String>,
    /// Free text from the payment select (e.g. "pix", "cartao").
    pub payment_method: String,
    pub status: OrderStatus,
    /// Snapshot JSON, see [`OrderSnapshot`].
    pub items: String,
    pub gross_cents: i64,
    pub discount_cents: i64,
    pub net_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Stored totals as money.
    pub fn totals(&self) -> OrderTotals {
        OrderTotals {
            gross: Money::from_cents(self.gross_cents),
            discount: Money::from_cents(self.discount_cents),
            net: Money::from_cents(self.net_cents),
        }
    }

    /// Decodes the stored lines.
    pub fn snapshot(&self) -> CoreResult<OrderSnapshot> {
        OrderSnapshot::from_json(&self.items)
    }
}

// =============================================================================
// User
// =============================================================================

/// A login account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Raw stored profile id; see [`Role::from_profile_id`].
    pub profile_id: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Role for the stored profile id.
    pub fn role(&self) -> Option<Role> {
        Role::from_profile_id(self.profile_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_default_is_paid() {
        assert_eq!(OrderStatus::default(), OrderStatus::Paid);
    }

    #[test]
    fn test_order_status_parses_legacy_labels() {
        assert_eq!("PAGO".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert_eq!("pending".parse::<OrderStatus>().unwrap(), OrderStatus::Pending);
        assert_eq!("Cancelado".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!("enviado".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_totals_from_columns() {
        let now = Utc::now();
        let order = Order {
            id: "o-1".to_string(),
            customer_id: None,
            payment_method: "pix".to_string(),
            status: OrderStatus::Paid,
            items: "[]".to_string(),
            gross_cents: 5500,
            discount_cents: 550,
            net_cents: 4950,
            created_at: now,
            updated_at: now,
        };

        let totals = order.totals();
        assert_eq!(totals.net.cents(), 4950);
        assert!(order.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_user_hash_is_not_serialized() {
        let user = User {
            id: "u-1".to_string(),
            name: "Ana".to_string(),
            email: "ana@loja.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            profile_id: 3,
            active: true,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(user.role(), Some(Role::Advanced));
    }
}
