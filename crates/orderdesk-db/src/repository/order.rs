//! # Order Repository
//!
//! Database operations for orders.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create(NewOrder) → compute_totals + snapshot → Order { Paid }  │
//! │                                                                         │
//! │  2. (OPTIONAL) EDIT                                                    │
//! │     └── update_items() → re-priced, new snapshot, updated_at bumped    │
//! │                                                                         │
//! │  3. (OPTIONAL) CHANGE STATUS                                           │
//! │     └── set_status(Pending | Paid | Cancelled)                         │
//! │     └── cancelled orders are frozen: update_items() refuses them       │
//! │                                                                         │
//! │  4. (OPTIONAL) DELETE                                                  │
//! │     └── delete() removes the row for good                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stored totals are always the output of [`compute_totals`]; nothing in this
//! module does arithmetic on money.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use orderdesk_core::report::{
    self, CheapestOrder, DashboardSummary, MonthlyRevenue, PaymentRevenue, ReportMonth,
    TopCustomer,
};
use orderdesk_core::{
    compute_totals, DiscountSpec, LineItem, Money, Order, OrderSnapshot, OrderStatus,
};

const ORDER_COLUMNS: &str = r#"
    id,
    customer_id,
    payment_method,
    status,
    items,
    gross_cents,
    discount_cents,
    net_cents,
    created_at,
    updated_at
"#;

/// Default page size for [`OrderRepository::list`].
pub const DEFAULT_LIST_LIMIT: u32 = 200;

// =============================================================================
// Inputs
// =============================================================================

/// A new order as posted by the order entry screen.
///
/// Items are already validated and filtered (see
/// `orderdesk_core::forms::collect_line_items`).
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Option<String>,
    pub payment_method: String,
    /// Lines in entry order, each with its catalog product id if any.
    pub items: Vec<(Option<String>, LineItem)>,
    pub discount: DiscountSpec,
}

/// Filters for the order list and its filtered total.
///
/// Every field is optional; an empty filter matches every order.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<String>,
    pub payment_method: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_until: Option<DateTime<Utc>>,
    /// Row cap for `list`; ignored by `filtered_net_total`.
    pub limit: Option<u32>,
}

impl OrderFilter {
    /// Appends `AND ...` clauses for every set field.
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(customer_id) = &self.customer_id {
            qb.push(" AND customer_id = ").push_bind(customer_id.clone());
        }
        if let Some(payment_method) = &self.payment_method {
            qb.push(" AND payment_method = ")
                .push_bind(payment_method.clone());
        }
        if let Some(from) = self.created_from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(until) = self.created_until {
            qb.push(" AND created_at < ").push_bind(until);
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Prices and stores a new order.
    ///
    /// ## What This Does
    /// 1. Runs the pricing engine over the items and discount
    /// 2. Freezes the lines into a snapshot
    /// 3. Inserts the row with status `Paid`
    pub async fn create(&self, new_order: NewOrder) -> DbResult<Order> {
        let priced = price(&new_order.items, &new_order.discount)?;
        let now = Utc::now();

        let order = Order {
            id: Uuid::new_v4().to_string(),
            customer_id: new_order.customer_id,
            payment_method: new_order.payment_method.trim().to_string(),
            status: OrderStatus::Paid,
            items: priced.items,
            gross_cents: priced.gross_cents,
            discount_cents: priced.discount_cents,
            net_cents: priced.net_cents,
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %order.id,
            lines = new_order.items.len(),
            net_cents = order.net_cents,
            "Creating order"
        );

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, payment_method, status, items,
                gross_cents, discount_cents, net_cents,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10
            )
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(&order.payment_method)
        .bind(order.status)
        .bind(&order.items)
        .bind(order.gross_cents)
        .bind(order.discount_cents)
        .bind(order.net_cents)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");

        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Replaces an order's lines and discount, re-pricing it.
    ///
    /// ## Errors
    /// - `NotFound` if the order does not exist or is cancelled
    pub async fn update_items(
        &self,
        id: &str,
        items: &[(Option<String>, LineItem)],
        discount: &DiscountSpec,
    ) -> DbResult<Order> {
        let priced = price(items, discount)?;
        let now = Utc::now();

        debug!(id = %id, lines = items.len(), net_cents = priced.net_cents, "Re-pricing order");

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                items = ?2,
                gross_cents = ?3,
                discount_cents = ?4,
                net_cents = ?5,
                updated_at = ?6
            WHERE id = ?1 AND status != 'cancelled'
            "#,
        )
        .bind(id)
        .bind(&priced.items)
        .bind(priced.gross_cents)
        .bind(priced.discount_cents)
        .bind(priced.net_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (editable)", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Moves an order to another status.
    pub async fn set_status(&self, id: &str, status: OrderStatus) -> DbResult<()> {
        debug!(id = %id, status = %status, "Setting order status");

        let result = sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// Lists orders matching `filter`, newest first.
    pub async fn list(&self, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT);

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1 = 1"));
        filter.push_conditions(&mut qb);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(limit));

        let orders = qb.build_query_as::<Order>().fetch_all(&self.pool).await?;

        debug!(count = orders.len(), "Listed orders");
        Ok(orders)
    }

    /// Sum of `net_cents` over every order matching `filter`.
    ///
    /// The limit is not applied: this is the figure shown under the list.
    pub async fn filtered_net_total(&self, filter: &OrderFilter) -> DbResult<Money> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COALESCE(SUM(net_cents), 0) FROM orders WHERE 1 = 1");
        filter.push_conditions(&mut qb);

        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(Money::from_cents(total))
    }

    /// Deletes an order.
    ///
    /// ## Errors
    /// - `NotFound` if no order has this id
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting order");

        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// Builds the reporting dashboard, optionally narrowed to one month.
    ///
    /// Orders of every status are counted. Revenue per month always spans
    /// the whole table. A stored snapshot that no longer decodes is skipped
    /// in the product figures and logged.
    pub async fn dashboard_summary(&self, month: Option<ReportMonth>) -> DbResult<DashboardSummary> {
        let period = match month.and_then(|m| m.bounds()) {
            Some((from, until)) => OrderFilter {
                created_from: Some(from),
                created_until: Some(until),
                ..Default::default()
            },
            None => OrderFilter::default(),
        };

        // Count and revenue
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT COUNT(*), COALESCE(SUM(net_cents), 0) FROM orders WHERE 1 = 1",
        );
        period.push_conditions(&mut qb);
        let (order_count, revenue): (i64, i64) =
            qb.build_query_as().fetch_one(&self.pool).await?;

        // Cheapest order
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT net_cents, created_at FROM orders WHERE 1 = 1");
        period.push_conditions(&mut qb);
        qb.push(" ORDER BY net_cents ASC, created_at ASC LIMIT 1");
        let cheapest_order = qb
            .build_query_as::<(i64, DateTime<Utc>)>()
            .fetch_optional(&self.pool)
            .await?
            .map(|(net, created_at)| CheapestOrder {
                net: Money::from_cents(net),
                month: created_at.format("%Y-%m").to_string(),
            });

        // Top customer
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT customer_id, COUNT(*), SUM(net_cents) FROM orders WHERE customer_id IS NOT NULL",
        );
        period.push_conditions(&mut qb);
        qb.push(" GROUP BY customer_id ORDER BY SUM(net_cents) DESC, customer_id ASC LIMIT 1");
        let top_customer = qb
            .build_query_as::<(String, i64, i64)>()
            .fetch_optional(&self.pool)
            .await?
            .map(|(customer_id, orders, net)| TopCustomer {
                customer_id,
                orders,
                net: Money::from_cents(net),
            });

        // Products, from the snapshots
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id, items FROM orders WHERE 1 = 1");
        period.push_conditions(&mut qb);
        let rows: Vec<(String, String)> = qb.build_query_as().fetch_all(&self.pool).await?;

        let snapshots: Vec<OrderSnapshot> = rows
            .iter()
            .filter_map(|(id, items)| match OrderSnapshot::from_json(items) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(id = %id, error = %e, "Skipping unreadable order snapshot");
                    None
                }
            })
            .collect();
        let tally = report::tally_products(&snapshots);
        let top_products = report::top_products(&tally);
        let product_revenue = report::by_revenue(tally);

        // Revenue per month (unfiltered); created_at is RFC 3339 text
        let revenue_by_month = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT substr(created_at, 1, 7) AS month, SUM(net_cents)
            FROM orders
            GROUP BY month
            ORDER BY month ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(month, revenue)| MonthlyRevenue {
            month,
            revenue: Money::from_cents(revenue),
        })
        .collect();

        // Revenue per payment method
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT payment_method, SUM(net_cents) FROM orders WHERE 1 = 1");
        period.push_conditions(&mut qb);
        qb.push(" GROUP BY payment_method ORDER BY payment_method ASC");
        let revenue_by_payment = qb
            .build_query_as::<(String, i64)>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|(payment_method, revenue)| PaymentRevenue {
                payment_method,
                revenue: Money::from_cents(revenue),
            })
            .collect();

        debug!(
            month = ?month.map(|m| m.to_string()),
            order_count,
            revenue,
            "Dashboard summary built"
        );

        Ok(DashboardSummary {
            month,
            order_count,
            revenue: Money::from_cents(revenue),
            cheapest_order,
            top_customer,
            top_products,
            product_revenue,
            revenue_by_month,
            revenue_by_payment,
        })
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Column values for a priced order.
struct PricedColumns {
    items: String,
    gross_cents: i64,
    discount_cents: i64,
    net_cents: i64,
}

fn price(items: &[(Option<String>, LineItem)], discount: &DiscountSpec) -> DbResult<PricedColumns> {
    let lines: Vec<LineItem> = items.iter().map(|(_, item)| item.clone()).collect();
    let totals = compute_totals(&lines, discount);
    let snapshot = OrderSnapshot::from_items(items).to_json()?;

    Ok(PricedColumns {
        items: snapshot,
        gross_cents: totals.gross.cents(),
        discount_cents: totals.discount.cents(),
        net_cents: totals.net.cents(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;
    use orderdesk_core::{FlatAmount, Percentage};

    async fn repo() -> OrderRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.orders()
    }

    fn item(name: &str, qty: i64, cents: i64) -> (Option<String>, LineItem) {
        (None, LineItem::new(name, qty, Money::from_cents(cents)).unwrap())
    }

    fn new_order(payment: &str, discount: DiscountSpec) -> NewOrder {
        NewOrder {
            customer_id: Some("c-1".to_string()),
            payment_method: payment.to_string(),
            items: vec![item("A", 2, 1000), item("B", 1, 3500)],
            discount,
        }
    }

    #[tokio::test]
    async fn test_create_stores_engine_totals() {
        let repo = repo().await;
        let discount = DiscountSpec::Percentage(Percentage::from_bps(1000).unwrap());

        let created = repo.create(new_order("pix", discount)).await.unwrap();
        assert_eq!(created.gross_cents, 5500);
        assert_eq!(created.discount_cents, 550);
        assert_eq!(created.net_cents, 4950);
        assert_eq!(created.status, OrderStatus::Paid);

        let stored = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(stored.totals(), created.totals());
        assert_eq!(stored.snapshot().unwrap().lines().len(), 2);
        assert_eq!(stored.customer_id.as_deref(), Some("c-1"));
    }

    #[tokio::test]
    async fn test_get_missing_order() {
        let repo = repo().await;
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_items_reprices() {
        let repo = repo().await;
        let created = repo
            .create(new_order("pix", DiscountSpec::None))
            .await
            .unwrap();

        let flat = DiscountSpec::FixedAmount(FlatAmount::new(Money::from_cents(99_999)).unwrap());
        let updated = repo
            .update_items(&created.id, &[item("C", 3, 700)], &flat)
            .await
            .unwrap();

        assert_eq!(updated.gross_cents, 2100);
        assert_eq!(updated.discount_cents, 2100);
        assert_eq!(updated.net_cents, 0);
        assert_eq!(updated.snapshot().unwrap().lines()[0].name, "C");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_cancelled_order_is_not_editable() {
        let repo = repo().await;
        let created = repo
            .create(new_order("pix", DiscountSpec::None))
            .await
            .unwrap();

        repo.set_status(&created.id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let err = repo
            .update_items(&created.id, &[item("C", 1, 100)], &DiscountSpec::None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = repo
            .set_status("missing", OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_and_filtered_total() {
        let repo = repo().await;
        repo.create(new_order("pix", DiscountSpec::None)).await.unwrap();
        repo.create(new_order("pix", DiscountSpec::None)).await.unwrap();
        let card = repo
            .create(new_order("cartao", DiscountSpec::None))
            .await
            .unwrap();
        repo.set_status(&card.id, OrderStatus::Pending).await.unwrap();

        let all = repo.list(&OrderFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let pix = OrderFilter {
            payment_method: Some("pix".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.list(&pix).await.unwrap().len(), 2);
        assert_eq!(repo.filtered_net_total(&pix).await.unwrap().cents(), 11_000);

        let pending = OrderFilter {
            status: Some(OrderStatus::Pending),
            ..Default::default()
        };
        let rows = repo.list(&pending).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, card.id);

        let capped = OrderFilter {
            limit: Some(1),
            ..Default::default()
        };
        assert_eq!(repo.list(&capped).await.unwrap().len(), 1);
        assert_eq!(
            repo.filtered_net_total(&capped).await.unwrap().cents(),
            16_500
        );
    }

    async fn backdate(repo: &OrderRepository, id: &str, year: i32, month: u32, day: u32) {
        let at = Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap();
        sqlx::query("UPDATE orders SET created_at = ?1 WHERE id = ?2")
            .bind(at)
            .bind(id)
            .execute(&repo.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_order() {
        let repo = repo().await;
        let created = repo
            .create(new_order("pix", DiscountSpec::None))
            .await
            .unwrap();

        repo.delete(&created.id).await.unwrap();
        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());

        let err = repo.delete(&created.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_dashboard_summary() {
        let repo = repo().await;
        let ten_percent = DiscountSpec::Percentage(Percentage::from_bps(1000).unwrap());

        let january = repo.create(new_order("pix", DiscountSpec::None)).await.unwrap();
        let small = repo
            .create(NewOrder {
                customer_id: Some("c-2".to_string()),
                payment_method: "cartao".to_string(),
                items: vec![item("C", 1, 800)],
                discount: DiscountSpec::None,
            })
            .await
            .unwrap();
        let february = repo.create(new_order("pix", ten_percent)).await.unwrap();

        backdate(&repo, &january.id, 2026, 1, 15).await;
        backdate(&repo, &small.id, 2026, 2, 10).await;
        backdate(&repo, &february.id, 2026, 2, 20).await;

        let all = repo.dashboard_summary(None).await.unwrap();
        assert_eq!(all.order_count, 3);
        assert_eq!(all.revenue.cents(), 5500 + 800 + 4950);
        assert_eq!(
            all.cheapest_order,
            Some(CheapestOrder {
                net: Money::from_cents(800),
                month: "2026-02".to_string(),
            })
        );

        let top = all.top_customer.unwrap();
        assert_eq!(top.customer_id, "c-1");
        assert_eq!(top.orders, 2);
        assert_eq!(top.net.cents(), 10_450);

        let by_quantity: Vec<_> = all.top_products.iter().map(|p| (p.name.as_str(), p.quantity)).collect();
        assert_eq!(by_quantity, [("A", 4), ("B", 2), ("C", 1)]);
        let by_revenue: Vec<_> = all.product_revenue.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(by_revenue, ["B", "A", "C"]);

        let months: Vec<_> = all
            .revenue_by_month
            .iter()
            .map(|m| (m.month.as_str(), m.revenue.cents()))
            .collect();
        assert_eq!(months, [("2026-01", 5500), ("2026-02", 5750)]);

        let payments: Vec<_> = all
            .revenue_by_payment
            .iter()
            .map(|p| (p.payment_method.as_str(), p.revenue.cents()))
            .collect();
        assert_eq!(payments, [("cartao", 800), ("pix", 10_450)]);

        let feb = repo
            .dashboard_summary(ReportMonth::new(2026, 2))
            .await
            .unwrap();
        assert_eq!(feb.month, ReportMonth::new(2026, 2));
        assert_eq!(feb.order_count, 2);
        assert_eq!(feb.revenue.cents(), 5750);
        assert_eq!(feb.top_customer.unwrap().orders, 1);
        assert_eq!(feb.top_products.len(), 3);
        assert_eq!(feb.revenue_by_month.len(), 2);

        let empty = repo
            .dashboard_summary(ReportMonth::new(2025, 12))
            .await
            .unwrap();
        assert_eq!(empty.order_count, 0);
        assert!(empty.revenue.is_zero());
        assert!(empty.cheapest_order.is_none());
        assert!(empty.top_customer.is_none());
        assert!(empty.top_products.is_empty());
        assert!(empty.revenue_by_payment.is_empty());
    }

    #[tokio::test]
    async fn test_dashboard_skips_unreadable_snapshot() {
        let repo = repo().await;
        let good = repo.create(new_order("pix", DiscountSpec::None)).await.unwrap();
        let broken = repo.create(new_order("pix", DiscountSpec::None)).await.unwrap();

        sqlx::query("UPDATE orders SET items = 'not json' WHERE id = ?1")
            .bind(&broken.id)
            .execute(&repo.pool)
            .await
            .unwrap();

        let summary = repo.dashboard_summary(None).await.unwrap();
        assert_eq!(summary.order_count, 2);
        assert_eq!(summary.revenue.cents(), 2 * good.net_cents);
        assert_eq!(summary.top_products[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_date_range_filter() {
        let repo = repo().await;
        let created = repo
            .create(new_order("pix", DiscountSpec::None))
            .await
            .unwrap();

        let before = OrderFilter {
            created_until: Some(created.created_at - chrono::Duration::seconds(1)),
            ..Default::default()
        };
        assert!(repo.list(&before).await.unwrap().is_empty());
        assert!(repo.filtered_net_total(&before).await.unwrap().is_zero());

        let since = OrderFilter {
            created_from: Some(created.created_at - chrono::Duration::seconds(1)),
            ..Default::default()
        };
        assert_eq!(repo.list(&since).await.unwrap().len(), 1);
    }
}
