//! # Checkout
//!
//! Turns the cart and a contact/delivery form into an order.
//!
//! ## Submission Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Submission                                  │
//! │                                                                         │
//! │  1. empty cart? ─── yes ──► EmptyCart                                  │
//! │  2. validate form ───────► Validation                                  │
//! │  3. in-flight guard ─────► InProgress (second concurrent submit)       │
//! │  4. upsert customer (by phone) ─────────────► Customer                 │
//! │  5. insert order (pending / unpaid) ────────► OrderWrite               │
//! │  6. insert order lines ─────────────────────► LineWrite                │
//! │        └── on failure: cancel order (best effort)                       │
//! │  7. initiate payment ───────────────────────► Payment                  │
//! │  8. mark order processing / paid ───────────► PaymentRecord            │
//! │  9. clear cart, return receipt                                          │
//! │                                                                         │
//! │  Any failure in 4-8 leaves the cart untouched.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use printhouse_core::validation::validate_checkout_form;
use printhouse_core::{
    CheckoutForm, Customer, CustomerUpsert, Money, Order, OrderLine, OrderStatus,
    PaymentMethod, PaymentStatus, TaxRate, ValidationError,
};
use printhouse_db::{Database, DbError, DbResult};

use crate::payments::{self, PaymentAck, PaymentError, PaymentGateway};
use crate::state::{CartStore, StorefrontConfig};

// =============================================================================
// Order Store
// =============================================================================

/// The data store writes a checkout needs.
pub trait OrderStore: Send + Sync {
    fn upsert_customer(
        &self,
        details: &CustomerUpsert,
    ) -> impl Future<Output = DbResult<Customer>> + Send;

    fn insert_order(&self, order: &Order) -> impl Future<Output = DbResult<()>> + Send;

    fn insert_order_lines(&self, lines: &[OrderLine]) -> impl Future<Output = DbResult<()>> + Send;

    fn update_order_payment(
        &self,
        order_id: &str,
        method: PaymentMethod,
        reference: &str,
    ) -> impl Future<Output = DbResult<()>> + Send;

    fn cancel_order(&self, order_id: &str) -> impl Future<Output = DbResult<()>> + Send;
}

impl OrderStore for Database {
    async fn upsert_customer(&self, details: &CustomerUpsert) -> DbResult<Customer> {
        self.customers().upsert(details).await
    }

    async fn insert_order(&self, order: &Order) -> DbResult<()> {
        self.orders().insert(order).await
    }

    async fn insert_order_lines(&self, lines: &[OrderLine]) -> DbResult<()> {
        self.orders().insert_lines(lines).await
    }

    async fn update_order_payment(
        &self,
        order_id: &str,
        method: PaymentMethod,
        reference: &str,
    ) -> DbResult<()> {
        self.orders().mark_paid(order_id, method, reference).await
    }

    async fn cancel_order(&self, order_id: &str) -> DbResult<()> {
        self.orders().cancel(order_id).await
    }
}

// =============================================================================
// Request / Receipt
// =============================================================================

/// Checkout form plus the chosen payment method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub form: CheckoutForm,
    pub payment_method: PaymentMethod,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    /// The order as stored, now `processing` / `paid`.
    pub order: Order,
    pub line_count: usize,
    pub payment: PaymentAck,
}

/// Why a submission was aborted.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("A checkout is already being processed")]
    InProgress,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to save customer details: {0}")]
    Customer(#[source] DbError),

    #[error("Failed to create order: {0}")]
    OrderWrite(#[source] DbError),

    #[error("Failed to save items for order {order_number}: {source}")]
    LineWrite {
        order_number: String,
        #[source]
        source: DbError,
    },

    #[error("Payment failed for order {order_number}: {source}")]
    Payment {
        order_number: String,
        #[source]
        source: PaymentError,
    },

    #[error("Failed to record payment for order {order_number}: {source}")]
    PaymentRecord {
        order_number: String,
        #[source]
        source: DbError,
    },
}

impl CheckoutError {
    /// Whether resubmitting the same cart may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CheckoutError::EmptyCart | CheckoutError::Validation(_) => false,
            CheckoutError::InProgress => true,
            CheckoutError::Customer(_)
            | CheckoutError::OrderWrite(_)
            | CheckoutError::LineWrite { .. }
            | CheckoutError::PaymentRecord { .. } => true,
            CheckoutError::Payment { source, .. } => {
                !matches!(source, PaymentError::InvalidAmount(_))
            }
        }
    }
}

/// `{prefix}-{last 6 digits of the epoch millis}`, e.g. `TPH-482913`.
pub fn generate_order_number(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{:06}", prefix, now.timestamp_millis().rem_euclid(1_000_000))
}

// =============================================================================
// Submitter
// =============================================================================

/// Checkout settings taken from [`StorefrontConfig`].
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub tax_rate: TaxRate,
    pub order_prefix: String,
    pub paypal_currency: String,
}

impl From<&StorefrontConfig> for CheckoutSettings {
    fn from(config: &StorefrontConfig) -> Self {
        CheckoutSettings {
            tax_rate: config.tax_rate(),
            order_prefix: config.order_prefix.clone(),
            paypal_currency: config.paypal_currency.clone(),
        }
    }
}

/// Runs checkouts one at a time.
pub struct CheckoutSubmitter<S, G> {
    store: S,
    gateway: G,
    settings: CheckoutSettings,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a submission ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: OrderStore, G: PaymentGateway> CheckoutSubmitter<S, G> {
    pub fn new(store: S, gateway: G, settings: CheckoutSettings) -> Self {
        CheckoutSubmitter {
            store,
            gateway,
            settings,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a submission is currently running.
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submits the cart as an order and initiates payment.
    ///
    /// The cart is cleared only after the order is marked paid.
    pub async fn submit(
        &self,
        cart: &CartStore,
        request: &CheckoutRequest,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        debug!(method = %request.payment_method, "checkout submit");

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let form = validate_checkout_form(&request.form)?;

        let _guard = self.begin()?;

        // Snapshot after taking the guard; later cart edits don't leak in
        let items = cart.get_all();
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let subtotal: Money = items.iter().map(|i| i.total).sum();
        let tax = subtotal.calculate_tax(self.settings.tax_rate);
        let total = subtotal + tax;

        // Customer
        let customer = self
            .store
            .upsert_customer(&CustomerUpsert {
                phone: form.phone.clone(),
                name: Some(form.full_name.clone()),
                email: Some(form.email.clone()),
                address: Some(format!("{}, {}", form.address, form.city)),
                notes: form.notes.clone(),
            })
            .await
            .map_err(|e| {
                error!(error = %e, "Checkout aborted: customer upsert failed");
                CheckoutError::Customer(e)
            })?;

        // Order
        let now = Utc::now();
        let mut order = Order {
            id: Uuid::new_v4().to_string(),
            order_number: generate_order_number(&self.settings.order_prefix, now),
            customer_id: Some(customer.id.clone()),
            customer_name: Some(form.full_name.clone()),
            customer_phone: form.phone.clone(),
            customer_email: Some(form.email.clone()),
            items,
            subtotal,
            tax,
            discount: Money::zero(),
            total,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_method: Some(request.payment_method),
            payment_reference: None,
            whatsapp_sent: false,
            notes: form.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        self.store.insert_order(&order).await.map_err(|e| {
            error!(error = %e, "Checkout aborted: order insert failed");
            CheckoutError::OrderWrite(e)
        })?;

        info!(order_number = %order.order_number, total = total.cents(), "Order created");

        // Lines
        let lines: Vec<OrderLine> = order
            .items
            .iter()
            .map(|item| OrderLine::from_line_item(Uuid::new_v4().to_string(), &order.id, item, now))
            .collect();

        if let Err(e) = self.store.insert_order_lines(&lines).await {
            error!(order_number = %order.order_number, error = %e, "Checkout aborted: line insert failed");
            if let Err(cancel_err) = self.store.cancel_order(&order.id).await {
                warn!(order_number = %order.order_number, error = %cancel_err, "Failed to cancel order");
            }
            return Err(CheckoutError::LineWrite {
                order_number: order.order_number,
                source: e,
            });
        }

        // Payment
        let ack = payments::initiate(
            &self.gateway,
            request.payment_method,
            &form.phone,
            total,
            &order.order_number,
            &self.settings.paypal_currency,
        )
        .await
        .map_err(|e| {
            error!(order_number = %order.order_number, error = %e, "Checkout aborted: payment failed");
            CheckoutError::Payment {
                order_number: order.order_number.clone(),
                source: e,
            }
        })?;

        self.store
            .update_order_payment(&order.id, request.payment_method, &ack.reference)
            .await
            .map_err(|e| {
                error!(order_number = %order.order_number, error = %e, "Checkout aborted: payment not recorded");
                CheckoutError::PaymentRecord {
                    order_number: order.order_number.clone(),
                    source: e,
                }
            })?;

        order.status = OrderStatus::Processing;
        order.payment_status = PaymentStatus::Paid;
        order.payment_reference = Some(ack.reference.clone());

        cart.clear();

        info!(
            order_number = %order.order_number,
            method = %request.payment_method,
            reference = %ack.reference,
            "Checkout complete"
        );

        Ok(CheckoutReceipt {
            line_count: lines.len(),
            order,
            payment: ack,
        })
    }

    fn begin(&self) -> Result<InFlight<'_>, CheckoutError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(&self.in_flight))
            .map_err(|_| CheckoutError::InProgress)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::PlaceholderGateway;
    use printhouse_core::{Product, Specifications, Variant};
    use printhouse_db::DbConfig;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // -------------------------------------------------------------------------
    // Doubles
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum FailAt {
        Nowhere,
        Customer,
        Order,
        Lines,
        PaymentRecord,
    }

    #[derive(Default)]
    struct Recorded {
        orders: Vec<Order>,
        lines: Vec<OrderLine>,
        paid: Vec<(String, String)>,
        cancelled: Vec<String>,
    }

    struct MemoryStore {
        fail_at: FailAt,
        recorded: Mutex<Recorded>,
    }

    impl MemoryStore {
        fn new(fail_at: FailAt) -> Self {
            MemoryStore {
                fail_at,
                recorded: Mutex::new(Recorded::default()),
            }
        }

        fn fail(&self, at: FailAt) -> DbResult<()> {
            if self.fail_at == at {
                Err(DbError::ConnectionFailed("network down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl OrderStore for MemoryStore {
        async fn upsert_customer(&self, details: &CustomerUpsert) -> DbResult<Customer> {
            self.fail(FailAt::Customer)?;
            Ok(Customer {
                id: "cust-1".to_string(),
                phone: details.phone.clone(),
                name: details.name.clone(),
                email: details.email.clone(),
                address: details.address.clone(),
                notes: details.notes.clone(),
                total_orders: 0,
                total_spent: Money::zero(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
        }

        async fn insert_order(&self, order: &Order) -> DbResult<()> {
            self.fail(FailAt::Order)?;
            self.recorded.lock().unwrap().orders.push(order.clone());
            Ok(())
        }

        async fn insert_order_lines(&self, lines: &[OrderLine]) -> DbResult<()> {
            self.fail(FailAt::Lines)?;
            self.recorded.lock().unwrap().lines.extend_from_slice(lines);
            Ok(())
        }

        async fn update_order_payment(
            &self,
            order_id: &str,
            _method: PaymentMethod,
            reference: &str,
        ) -> DbResult<()> {
            self.fail(FailAt::PaymentRecord)?;
            self.recorded
                .lock()
                .unwrap()
                .paid
                .push((order_id.to_string(), reference.to_string()));
            Ok(())
        }

        async fn cancel_order(&self, order_id: &str) -> DbResult<()> {
            self.recorded.lock().unwrap().cancelled.push(order_id.to_string());
            Ok(())
        }
    }

    /// Gateway that is always unreachable.
    struct DownGateway;

    impl PaymentGateway for DownGateway {
        async fn mpesa_stk_push(&self, _: &str, _: Money, _: &str) -> Result<PaymentAck, PaymentError> {
            Err(PaymentError::Unavailable("timeout".to_string()))
        }

        async fn card_charge(&self, _: Money, _: &str) -> Result<PaymentAck, PaymentError> {
            Err(PaymentError::Unavailable("timeout".to_string()))
        }

        async fn paypal_payment(&self, _: Money, _: &str) -> Result<PaymentAck, PaymentError> {
            Err(PaymentError::Unavailable("timeout".to_string()))
        }
    }

    // -------------------------------------------------------------------------
    // Fixtures
    // -------------------------------------------------------------------------

    fn settings() -> CheckoutSettings {
        CheckoutSettings::from(&StorefrontConfig::default())
    }

    fn submitter(fail_at: FailAt) -> CheckoutSubmitter<MemoryStore, PlaceholderGateway> {
        CheckoutSubmitter::new(MemoryStore::new(fail_at), PlaceholderGateway::instant(), settings())
    }

    fn product(id: &str, base: i64, variants: Vec<Variant>) -> Product {
        Product {
            id: id.to_string(),
            category: id.to_string(),
            name: id.to_string(),
            description: None,
            base_price: Money::from_major(base),
            image_url: None,
            variants,
            pricing_rules: serde_json::Value::Null,
            is_active: true,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn filled_cart() -> CartStore {
        let cards = product(
            "cards",
            14,
            vec![Variant {
                variant_type: "spotuv".to_string(),
                label: "Spot UV".to_string(),
                price: Money::from_major(24),
                image: None,
            }],
        );
        let banners = product("banners", 6000, vec![]);

        let cart = CartStore::in_memory();
        cart.add(&cards, cards.variant("spotuv"), 100, Specifications::new())
            .unwrap();
        cart.add(&banners, None, 1, Specifications::new()).unwrap();
        cart
    }

    fn request(method: PaymentMethod) -> CheckoutRequest {
        CheckoutRequest {
            form: CheckoutForm {
                full_name: "Amina Ekai".to_string(),
                email: "amina@example.co.ke".to_string(),
                phone: "0712 345 678".to_string(),
                address: "Kanamkemer Road".to_string(),
                city: "Lodwar".to_string(),
                notes: None,
            },
            payment_method: method,
        }
    }

    // -------------------------------------------------------------------------
    // Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_order_number_format() {
        let now = DateTime::from_timestamp_millis(1_700_000_482_913).unwrap();
        assert_eq!(generate_order_number("TPH", now), "TPH-482913");

        let padded = DateTime::from_timestamp_millis(1_700_000_000_042).unwrap();
        assert_eq!(generate_order_number("TPH", padded), "TPH-000042");
    }

    #[tokio::test]
    async fn test_successful_checkout_clears_cart() {
        let submitter = submitter(FailAt::Nowhere);
        let cart = filled_cart();

        let receipt = submitter.submit(&cart, &request(PaymentMethod::Mpesa)).await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(receipt.order.subtotal, Money::from_major(8400));
        assert_eq!(receipt.order.tax, Money::from_major(1344));
        assert_eq!(receipt.order.total, Money::from_major(9744));
        assert_eq!(receipt.order.customer_phone, "254712345678");
        assert_eq!(receipt.order.status, OrderStatus::Processing);
        assert_eq!(receipt.order.payment_status, PaymentStatus::Paid);
        assert_eq!(receipt.line_count, 2);
        assert!(receipt.order.order_number.starts_with("TPH-"));

        let recorded = submitter.store().recorded.lock().unwrap();
        assert_eq!(recorded.orders.len(), 1);
        assert_eq!(recorded.orders[0].status, OrderStatus::Pending);
        assert_eq!(recorded.lines.len(), 2);
        assert_eq!(recorded.paid, vec![(receipt.order.id.clone(), "456".to_string())]);
        assert!(!submitter.is_processing());
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let submitter = submitter(FailAt::Nowhere);

        let err = submitter
            .submit(&CartStore::in_memory(), &request(PaymentMethod::Card))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_form_rejected_before_writes() {
        let submitter = submitter(FailAt::Nowhere);
        let cart = filled_cart();
        let mut bad = request(PaymentMethod::Card);
        bad.form.email = "not-an-email".to_string();

        let err = submitter.submit(&cart, &bad).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(_)));
        assert_eq!(cart.count(), 2);
        assert!(submitter.store().recorded.lock().unwrap().orders.is_empty());
    }

    #[tokio::test]
    async fn test_line_failure_cancels_order_and_keeps_cart() {
        let submitter = submitter(FailAt::Lines);
        let cart = filled_cart();
        let before = cart.get_all();

        let err = submitter.submit(&cart, &request(PaymentMethod::Mpesa)).await.unwrap_err();

        assert!(matches!(err, CheckoutError::LineWrite { .. }));
        assert!(err.is_retryable());
        assert_eq!(cart.get_all(), before);

        let recorded = submitter.store().recorded.lock().unwrap();
        assert_eq!(recorded.cancelled, vec![recorded.orders[0].id.clone()]);
        assert!(recorded.paid.is_empty());
    }

    #[tokio::test]
    async fn test_store_failures_keep_cart() {
        for fail_at in [FailAt::Customer, FailAt::Order, FailAt::PaymentRecord] {
            let submitter = submitter(fail_at);
            let cart = filled_cart();

            let err = submitter.submit(&cart, &request(PaymentMethod::Card)).await.unwrap_err();

            assert!(err.is_retryable(), "{:?} should be retryable", fail_at);
            assert_eq!(cart.count(), 2);
            assert!(!submitter.is_processing());
        }
    }

    #[tokio::test]
    async fn test_payment_failure_leaves_order_unpaid() {
        let submitter = CheckoutSubmitter::new(MemoryStore::new(FailAt::Nowhere), DownGateway, settings());
        let cart = filled_cart();

        let err = submitter.submit(&cart, &request(PaymentMethod::Paypal)).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Payment { .. }));
        assert_eq!(cart.count(), 2);

        let recorded = submitter.store().recorded.lock().unwrap();
        assert_eq!(recorded.orders.len(), 1);
        assert!(recorded.paid.is_empty());
        assert!(recorded.cancelled.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submission_rejected() {
        let submitter = Arc::new(CheckoutSubmitter::new(
            MemoryStore::new(FailAt::Nowhere),
            PlaceholderGateway::new(Duration::from_millis(2000)),
            settings(),
        ));
        let cart = Arc::new(filled_cart());

        let first = {
            let submitter = submitter.clone();
            let cart = cart.clone();
            tokio::spawn(async move { submitter.submit(&cart, &request(PaymentMethod::Card)).await })
        };
        // Let the first submission reach the gateway delay
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(submitter.is_processing());

        let second = submitter.submit(&cart, &request(PaymentMethod::Card)).await;
        assert!(matches!(second, Err(CheckoutError::InProgress)));

        assert!(first.await.unwrap().is_ok());
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_against_sqlite() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let submitter = CheckoutSubmitter::new(db.clone(), PlaceholderGateway::instant(), settings());
        let cart = filled_cart();

        let receipt = submitter.submit(&cart, &request(PaymentMethod::Card)).await.unwrap();

        let stored = db
            .orders()
            .get_by_number(&receipt.order.order_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Processing);
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(
            stored.payment_reference.as_deref(),
            Some(format!("card-{}", receipt.order.order_number).as_str())
        );
        assert_eq!(stored.items.len(), 2);

        let lines = db.orders().get_lines(&stored.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].variant_label.as_deref(), Some("Spot UV"));
        assert_eq!(lines[0].total_price, Money::from_major(2400));

        let customer = db.customers().get_by_phone("254712345678").await.unwrap().unwrap();
        assert_eq!(stored.customer_id, Some(customer.id));
        assert!(cart.is_empty());
    }
}
