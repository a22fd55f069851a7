//! Order repository: the submission write path and the admin board reads.
//!
//! Submission is the three dependent inserts of the checkout flow
//! (customer, then order, then one row per cart line), executed inside a
//! single transaction so a failure at any step leaves no orphaned rows.
//! The order number and the initial `pending` status are assigned by the
//! database.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use charret_core::{CustomerId, Modality, OrderId, OrderItemId, OrderStatus, PaymentMethod};

use super::RepositoryError;
use crate::checkout::OrderDraft;

/// Identifier pair returned by a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub id: OrderId,
    /// Sequential human-readable number shown to the customer.
    pub order_number: i32,
}

/// An order as shown on the admin board, joined with its customer.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: i32,
    pub status: OrderStatus,
    pub modality: Modality,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
}

/// A historical order line (snapshot, decoupled from the live menu).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: OrderItemId,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// Aggregates for the admin dashboard.
#[derive(Debug, Clone, Default)]
pub struct DashboardStats {
    pub today_orders: i64,
    pub today_revenue: Decimal,
    pub pending_orders: i64,
    pub weekly_orders: i64,
}

/// Raw joined row; enum columns are text and parsed in [`OrderSummary::try_from`].
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: i32,
    status: String,
    modality: String,
    payment_method: String,
    subtotal: Decimal,
    delivery_fee: Decimal,
    total: Decimal,
    delivery_address: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    customer_name: String,
    customer_phone: String,
    customer_email: Option<String>,
}

impl TryFrom<OrderRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
        })?;
        let modality = row.modality.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid modality in database: {e}"))
        })?;
        let payment_method = row.payment_method.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid payment method in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            order_number: row.order_number,
            status,
            modality,
            payment_method,
            subtotal: row.subtotal,
            delivery_fee: row.delivery_fee,
            total: row.total,
            delivery_address: row.delivery_address,
            notes: row.notes,
            created_at: row.created_at,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_email: row.customer_email,
        })
    }
}

fn is_duplicate_submission(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err)
        if db_err.is_unique_violation()
            && db_err.constraint() == Some("orders_submission_key_idx"))
}

const ORDER_SELECT: &str = r"
    SELECT o.id, o.order_number, o.status, o.modality, o.payment_method,
           o.subtotal, o.delivery_fee, o.total, o.delivery_address, o.notes,
           o.created_at,
           c.name AS customer_name, c.phone AS customer_phone,
           c.email AS customer_email
    FROM orders o
    JOIN customers c ON c.id = o.customer_id
";

/// Repository for order writes and board reads.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a confirmed order: customer insert, then order insert, then
    /// one `order_items` insert per line, strictly in that sequence (each
    /// step needs the id its predecessor returned).
    ///
    /// All three steps share one transaction, so the caller sees either a
    /// complete order or nothing; retrying after a failure cannot leave an
    /// orphaned customer or an order with no items.
    ///
    /// Submission is idempotent on the draft's submission key: if an order
    /// with the same key already exists (a confirm posted twice), the
    /// duplicate transaction rolls back and the existing confirmation is
    /// returned instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any step fails. No partial
    /// state survives.
    pub async fn submit(&self, draft: &OrderDraft) -> Result<OrderConfirmation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let customer_id = sqlx::query_scalar::<_, CustomerId>(
            r"
            INSERT INTO customers (name, phone, email, address, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&draft.customer.name)
        .bind(&draft.customer.phone)
        .bind(draft.customer.email.as_deref())
        .bind(draft.customer.address.as_deref())
        .bind(draft.customer.notes.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let inserted = sqlx::query_as::<_, (OrderId, i32)>(
            r"
            INSERT INTO orders (customer_id, modality, payment_method,
                                subtotal, delivery_fee, total,
                                delivery_address, notes, submission_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, order_number
            ",
        )
        .bind(customer_id)
        .bind(draft.modality.to_string())
        .bind(draft.payment_method.to_string())
        .bind(draft.subtotal)
        .bind(draft.delivery_fee)
        .bind(draft.total)
        .bind(draft.delivery_address.as_deref())
        .bind(draft.notes.as_deref())
        .bind(&draft.submission_key)
        .fetch_one(&mut *tx)
        .await;

        let (order_id, order_number) = match inserted {
            Ok(pair) => pair,
            Err(e) if is_duplicate_submission(&e) => {
                // A racing confirm with the same key won; our customer
                // insert rolls back with the transaction.
                drop(tx);
                return self
                    .find_by_submission_key(&draft.submission_key)
                    .await?
                    .ok_or_else(|| {
                        RepositoryError::Conflict("order already submitted".to_owned())
                    });
            }
            Err(e) => return Err(e.into()),
        };

        for item in &draft.items {
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, menu_item_id, name,
                                         price, quantity, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order_id)
            .bind(item.menu_item_id)
            .bind(&item.name)
            .bind(item.price)
            .bind(i64::from(item.quantity))
            .bind(item.subtotal)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(OrderConfirmation {
            id: order_id,
            order_number,
        })
    }

    /// Look up the confirmation for an already-submitted checkout.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_submission_key(
        &self,
        key: &str,
    ) -> Result<Option<OrderConfirmation>, RepositoryError> {
        let row = sqlx::query_as::<_, (OrderId, i32)>(
            r"
            SELECT id, order_number FROM orders WHERE submission_key = $1
            ",
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, order_number)| OrderConfirmation { id, order_number }))
    }

    /// Orders for the board, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `DataCorruption` if a stored enum value doesn't parse.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    "{ORDER_SELECT} WHERE o.status = $1 ORDER BY o.created_at DESC"
                ))
                .bind(status.to_string())
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, OrderRow>(&format!(
                    "{ORDER_SELECT} ORDER BY o.created_at DESC"
                ))
                .fetch_all(self.pool)
                .await?
            }
        };

        rows.into_iter().map(OrderSummary::try_from).collect()
    }

    /// A single order by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `DataCorruption` if a stored enum value doesn't parse.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderSummary>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(OrderSummary::try_from).transpose()
    }

    /// Line items for one order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for(&self, order_id: OrderId) -> Result<Vec<OrderItemRow>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, name, price, quantity, subtotal
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Move an order to a new status, enforcing the transition graph
    /// (one step forward at a time, cancel from any non-terminal state).
    ///
    /// The current row is locked while checking so two admins racing on the
    /// same card cannot both win.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist,
    /// `RepositoryError::Conflict` if the transition is not allowed, or
    /// `RepositoryError::Database` for other failures.
    pub async fn update_status(
        &self,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, String>(
            r"
            SELECT status FROM orders WHERE id = $1 FOR UPDATE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let current: OrderStatus = current.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
        })?;

        if !current.can_transition_to(target) {
            return Err(RepositoryError::Conflict(format!(
                "cannot move order from {current} to {target}"
            )));
        }

        sqlx::query(
            r"
            UPDATE orders SET status = $1 WHERE id = $2
            ",
        )
        .bind(target.to_string())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Dashboard aggregates: today's order count and revenue, open orders
    /// (pending or preparing), and the trailing seven days' count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, RepositoryError> {
        let now = Utc::now();
        let today_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        let week_start = today_start - Duration::days(7);

        let (today_orders, today_revenue) = sqlx::query_as::<_, (i64, Option<Decimal>)>(
            r"
            SELECT COUNT(*), SUM(total)
            FROM orders
            WHERE created_at >= $1 AND status <> 'cancelled'
            ",
        )
        .bind(today_start)
        .fetch_one(self.pool)
        .await?;

        let pending_orders = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM orders WHERE status IN ('pending', 'preparing')
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let weekly_orders = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM orders WHERE created_at >= $1
            ",
        )
        .bind(week_start)
        .fetch_one(self.pool)
        .await?;

        Ok(DashboardStats {
            today_orders,
            today_revenue: today_revenue.unwrap_or_default(),
            pending_orders,
            weekly_orders,
        })
    }

    /// The most recent orders for the dashboard list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `DataCorruption` if a stored enum value doesn't parse.
    pub async fn recent(&self, limit: i64) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} ORDER BY o.created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderSummary::try_from).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(status: &str, modality: &str, payment: &str) -> OrderRow {
        OrderRow {
            id: OrderId::new(1),
            order_number: 42,
            status: status.to_owned(),
            modality: modality.to_owned(),
            payment_method: payment.to_owned(),
            subtotal: Decimal::from(2_000),
            delivery_fee: Decimal::ZERO,
            total: Decimal::from(2_000),
            delivery_address: None,
            notes: None,
            created_at: Utc::now(),
            customer_name: "Ana".to_owned(),
            customer_phone: "123".to_owned(),
            customer_email: None,
        }
    }

    #[test]
    fn test_order_row_conversion() {
        let summary = OrderSummary::try_from(row("pending", "pickup", "cash")).unwrap();
        assert_eq!(summary.status, OrderStatus::Pending);
        assert_eq!(summary.modality, Modality::Pickup);
        assert_eq!(summary.payment_method, PaymentMethod::Cash);
        assert_eq!(summary.order_number, 42);
    }

    #[test]
    fn test_order_row_conversion_rejects_bad_enum() {
        let err = OrderSummary::try_from(row("shipped", "pickup", "cash")).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));

        let err = OrderSummary::try_from(row("pending", "teleport", "cash")).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }
}
