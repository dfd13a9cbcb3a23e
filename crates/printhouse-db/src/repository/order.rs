//! # Order Repository
//!
//! Database operations for orders and order lines.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. INSERT                                                             │
//! │     └── insert() → Order { pending, unpaid, items snapshot }           │
//! │                                                                         │
//! │  2. LINES                                                              │
//! │     └── insert_lines() → one OrderLine per cart entry (all or none)    │
//! │                                                                         │
//! │  3a. PAID                                                              │
//! │     └── mark_paid() → Order { processing, paid, reference }            │
//! │                                                                         │
//! │  3b. CANCELLED (line write failed)                                     │
//! │     └── cancel() → Order { cancelled }                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use printhouse_core::{
    LineItem, Money, Order, OrderLine, OrderStatus, PaymentMethod, PaymentStatus, Specifications,
};

const ORDER_COLUMNS: &str = "id, order_number, customer_id, customer_name, customer_phone, \
     customer_email, items, subtotal_cents, tax_cents, discount_cents, total_cents, status, \
     payment_status, payment_method, payment_reference, whatsapp_sent, notes, created_at, \
     updated_at";

const LINE_COLUMNS: &str = "id, order_id, product_id, product_name, product_category, \
     variant_label, quantity, unit_price_cents, total_price_cents, specifications, created_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: String,
    customer_id: Option<String>,
    customer_name: Option<String>,
    customer_phone: String,
    customer_email: Option<String>,
    items: String,
    subtotal_cents: i64,
    tax_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    status: OrderStatus,
    payment_status: PaymentStatus,
    payment_method: Option<PaymentMethod>,
    payment_reference: Option<String>,
    whatsapp_sent: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let items: Vec<LineItem> = serde_json::from_str(&row.items)?;

        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            customer_email: row.customer_email,
            items,
            subtotal: Money::from_cents(row.subtotal_cents),
            tax: Money::from_cents(row.tax_cents),
            discount: Money::from_cents(row.discount_cents),
            total: Money::from_cents(row.total_cents),
            status: row.status,
            payment_status: row.payment_status,
            payment_method: row.payment_method,
            payment_reference: row.payment_reference,
            whatsapp_sent: row.whatsapp_sent,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: String,
    order_id: String,
    product_id: String,
    product_name: String,
    product_category: String,
    variant_label: Option<String>,
    quantity: i64,
    unit_price_cents: i64,
    total_price_cents: i64,
    specifications: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = DbError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let specifications: Specifications = serde_json::from_str(&row.specifications)?;

        Ok(OrderLine {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            product_category: row.product_category,
            variant_label: row.variant_label,
            quantity: row.quantity,
            unit_price: Money::from_cents(row.unit_price_cents),
            total_price: Money::from_cents(row.total_price_cents),
            specifications,
            created_at: row.created_at,
        })
    }
}

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

    /// Inserts an order with its items snapshot.
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, order_number = %order.order_number, "Inserting order");

        let items = serde_json::to_string(&order.items)?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, customer_id, customer_name, customer_phone, customer_email,
                items, subtotal_cents, tax_cents, discount_cents, total_cents,
                status, payment_status, payment_method, payment_reference,
                whatsapp_sent, notes, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15,
                ?16, ?17, ?18, ?19
            )
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.customer_id)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.customer_email)
        .bind(items)
        .bind(order.subtotal.cents())
        .bind(order.tax.cents())
        .bind(order.discount.cents())
        .bind(order.total.cents())
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.payment_method)
        .bind(&order.payment_reference)
        .bind(order.whatsapp_sent)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts order lines in a single transaction.
    ///
    /// Either every line is written or none is.
    pub async fn insert_lines(&self, lines: &[OrderLine]) -> DbResult<()> {
        debug!(count = lines.len(), "Inserting order lines");

        let mut tx = self.pool.begin().await?;

        for line in lines {
            let specifications = serde_json::to_string(&line.specifications)?;

            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    id, order_id, product_id, product_name, product_category,
                    variant_label, quantity, unit_price_cents, total_price_cents,
                    specifications, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&line.id)
            .bind(&line.order_id)
            .bind(&line.product_id)
            .bind(&line.product_name)
            .bind(&line.product_category)
            .bind(&line.variant_label)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .bind(line.total_price.cents())
            .bind(specifications)
            .bind(line.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Gets an order by its customer-facing number.
    pub async fn get_by_number(&self, order_number: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?1");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Lists the most recent orders, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT ?1");
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Gets the lines of an order, in insertion order.
    pub async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = ?1 ORDER BY rowid"
        );
        let rows: Vec<OrderLineRow> = sqlx::query_as(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(OrderLine::try_from).collect()
    }

    /// Marks an order paid and hands it to production.
    ///
    /// Sets `processing` / `paid` and records the payment method and
    /// gateway reference.
    pub async fn mark_paid(
        &self,
        order_id: &str,
        method: PaymentMethod,
        reference: &str,
    ) -> DbResult<()> {
        debug!(id = %order_id, method = %method, "Marking order paid");

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?2,
                payment_status = ?3,
                payment_method = ?4,
                payment_reference = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(order_id)
        .bind(OrderStatus::Processing)
        .bind(PaymentStatus::Paid)
        .bind(method)
        .bind(reference)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }

    /// Cancels an order.
    pub async fn cancel(&self, order_id: &str) -> DbResult<()> {
        debug!(id = %order_id, "Cancelling order");

        let result = sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(order_id)
            .bind(OrderStatus::Cancelled)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use printhouse_core::Product;
    use uuid::Uuid;

    fn mug_item() -> LineItem {
        let now = Utc::now();
        let mut specifications = Specifications::new();
        specifications.insert("print".to_string(), "wrap-around".to_string());

        LineItem {
            id: "mugs-default-1".to_string(),
            product: Product {
                id: "mugs".to_string(),
                category: "mugs".to_string(),
                name: "Mugs".to_string(),
                description: None,
                base_price: Money::from_major(500),
                image_url: None,
                variants: vec![],
                pricing_rules: serde_json::Value::Null,
                is_active: true,
                sort_order: 5,
                created_at: now,
                updated_at: now,
            },
            variant: None,
            quantity: 12,
            specifications,
            total: Money::from_major(6000),
        }
    }

    fn order(number: &str) -> Order {
        let now = Utc::now();
        let items = vec![mug_item()];
        Order {
            id: Uuid::new_v4().to_string(),
            order_number: number.to_string(),
            customer_id: None,
            customer_name: Some("Amina".to_string()),
            customer_phone: "254712345678".to_string(),
            customer_email: None,
            items,
            subtotal: Money::from_major(6000),
            tax: Money::from_major(960),
            discount: Money::zero(),
            total: Money::from_major(6960),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_method: Some(PaymentMethod::Mpesa),
            payment_reference: None,
            whatsapp_sent: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_order_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = order("PH-000001");

        db.orders().insert(&order).await.unwrap();

        let fetched = db.orders().get_by_number("PH-000001").await.unwrap().unwrap();
        assert_eq!(fetched.id, order.id);
        assert_eq!(fetched.items, order.items);
        assert_eq!(fetched.total, Money::from_major(6960));
        assert_eq!(fetched.status, OrderStatus::Pending);
        assert_eq!(fetched.payment_method, Some(PaymentMethod::Mpesa));
    }

    #[tokio::test]
    async fn test_duplicate_order_number_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.orders().insert(&order("PH-000002")).await.unwrap();
        let err = db.orders().insert(&order("PH-000002")).await.unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_lines_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = order("PH-000003");
        db.orders().insert(&order).await.unwrap();

        let line = OrderLine::from_line_item(
            Uuid::new_v4().to_string(),
            &order.id,
            &order.items[0],
            Utc::now(),
        );
        db.orders().insert_lines(&[line.clone()]).await.unwrap();

        let lines = db.orders().get_lines(&order.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_name, "Mugs");
        assert_eq!(lines[0].unit_price, Money::from_major(500));
        assert_eq!(lines[0].specifications, line.specifications);
    }

    #[tokio::test]
    async fn test_lines_are_all_or_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order = order("PH-000004");
        db.orders().insert(&order).await.unwrap();

        let good = OrderLine::from_line_item(
            Uuid::new_v4().to_string(),
            &order.id,
            &order.items[0],
            Utc::now(),
        );
        let mut orphan = good.clone();
        orphan.id = Uuid::new_v4().to_string();
        orphan.order_id = "no-such-order".to_string();

        let err = db.orders().insert_lines(&[good, orphan]).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(db.orders().get_lines(&order.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_paid_and_cancel() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();
        let paid = order("PH-000005");
        let cancelled = order("PH-000006");
        repo.insert(&paid).await.unwrap();
        repo.insert(&cancelled).await.unwrap();

        repo.mark_paid(&paid.id, PaymentMethod::Card, "card-ref-1")
            .await
            .unwrap();
        repo.cancel(&cancelled.id).await.unwrap();

        let paid = repo.get_by_id(&paid.id).await.unwrap().unwrap();
        assert_eq!(paid.status, OrderStatus::Processing);
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.payment_method, Some(PaymentMethod::Card));
        assert_eq!(paid.payment_reference.as_deref(), Some("card-ref-1"));

        let cancelled = repo.get_by_id(&cancelled.id).await.unwrap().unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Unpaid);

        assert!(matches!(
            repo.cancel("missing").await,
            Err(DbError::NotFound { .. })
        ));
        assert_eq!(repo.list_recent(10).await.unwrap().len(), 2);
    }
}
