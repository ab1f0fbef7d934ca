//! # orderdesk-core: Pure Business Logic for OrderDesk
//!
//! The two pieces of the order-management back end that carry real rules:
//! order pricing and screen access control. Everything here is a pure
//! function of its arguments; no database, no network, no session globals.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        OrderDesk Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web layer (out of tree)                      │   │
//! │  │   route protection ──► order entry/edit ──► dashboard, users    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ orderdesk-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │ pricing  │ │  access  │ │  forms   │ │ snapshot, types, │  │   │
//! │  │   │ totals   │ │  gate    │ │ boundary │ │ credentials      │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                orderdesk-db (Database Layer)                    │   │
//! │  │          SQLite, migrations, order and user repositories        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`pricing`] - Line items, discounts, `compute_totals`
//! - [`access`] - Roles, resources, `authorize`, session context
//! - [`forms`] - Raw form fields to pricing inputs
//! - [`snapshot`] - Frozen order lines as JSON
//! - [`report`] - Dashboard figures and the product tally
//! - [`credentials`] - Password policy and hashing
//! - [`money`] - Integer-cent money type
//! - [`types`] - Persisted entities (Order, User)
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use orderdesk_core::access::{authorize, Resource, Role};
//! use orderdesk_core::forms::{collect_line_items, DiscountForm, LineItemForm};
//! use orderdesk_core::pricing::compute_totals;
//!
//! let gate = authorize(Some(Role::Standard), &Resource::new("Pedidos"), true);
//! assert!(gate.is_allowed());
//!
//! let rows = vec![LineItemForm {
//!     id: None,
//!     name: "Widget".to_string(),
//!     quantity: "3".to_string(),
//!     unit_price: "10,00".to_string(),
//! }];
//! let lines = collect_line_items(&rows);
//! let items: Vec<_> = lines.into_iter().map(|(_, item)| item).collect();
//! let discount = DiscountForm::new("valor", "5").into_spec().unwrap();
//!
//! let totals = compute_totals(&items, &discount);
//! assert_eq!(totals.net.cents(), 2500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod credentials;
pub mod error;
pub mod forms;
pub mod money;
pub mod pricing;
pub mod report;
pub mod snapshot;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{authorize, Decision, DenyReason, Resource, Role, SessionContext};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{compute_totals, DiscountSpec, FlatAmount, LineItem, OrderTotals, Percentage};
pub use report::{DashboardSummary, ReportMonth};
pub use snapshot::{OrderSnapshot, SnapshotLine};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum length for a user password.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum length for item and user names.
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum length for a login e-mail.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Largest quantity accepted on one order line.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Largest unit price accepted on one order line, in cents (R$ 1 bilhão).
///
/// With [`MAX_QUANTITY`] this keeps every line subtotal inside `Money`.
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000_000;
