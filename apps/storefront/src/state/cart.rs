//! # Cart Store
//!
//! The persisted shopping cart.
//!
//! ## Thread Safety
//! The line items sit behind a `Mutex`. Every mutation takes the lock,
//! changes the list, writes it to storage, and releases the lock before
//! observers run, so an observer may read the cart again without
//! deadlocking.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Store Operations                                │
//! │                                                                         │
//! │  Customer Action         CartStore                State Change          │
//! │  ───────────────         ─────────                ────────────          │
//! │                                                                         │
//! │  Add to cart ──────────► add() ─────────────────► items.push(item)     │
//! │                                                                         │
//! │  Change quantity ──────► update_quantity() ─────► qty = n, total = …   │
//! │                          (n out of range ignored)                       │
//! │                                                                         │
//! │  Remove ───────────────► remove() ──────────────► first match dropped  │
//! │                                                                         │
//! │  Checkout succeeded ───► clear() ───────────────► items.clear()        │
//! │                                                                         │
//! │  Each write ──► storage.write("printhouse_cart", json) ──► observers   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures are logged and swallowed: the in-memory cart stays
//! authoritative for this session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use printhouse_core::validation::validate_quantity;
use printhouse_core::{
    pricing, CoreError, CoreResult, LineItem, Money, Product, Specifications, TaxRate, Variant,
    CART_STORAGE_KEY, DEFAULT_VARIANT_TAG, MAX_ITEM_QUANTITY,
};

use super::storage::{CartStorage, MemoryStorage};

type Observer = Arc<dyn Fn(&[LineItem]) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: Vec<(u64, Observer)>,
}

/// Cart totals summary for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    /// Number of line items (not units).
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// Handle returned by [`CartStore::subscribe`].
///
/// The observer stays attached until this handle is dropped or
/// [`Subscription::unsubscribe`] is called.
#[must_use = "dropping a Subscription detaches the observer immediately"]
pub struct Subscription {
    id: u64,
    observers: Weak<Mutex<Observers>>,
}

impl Subscription {
    /// Detaches the observer.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            let mut observers = observers.lock().unwrap_or_else(PoisonError::into_inner);
            observers.entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Ordered, persisted list of line items.
pub struct CartStore {
    storage: Arc<dyn CartStorage>,
    items: Mutex<Vec<LineItem>>,
    observers: Arc<Mutex<Observers>>,
}

impl CartStore {
    /// Opens the cart persisted in `storage`.
    ///
    /// Missing or unreadable data yields an empty cart.
    pub fn new(storage: Arc<dyn CartStorage>) -> Self {
        let items = load_items(storage.as_ref());
        debug!(count = items.len(), "Cart loaded");

        CartStore {
            storage,
            items: Mutex::new(items),
            observers: Arc::new(Mutex::new(Observers::default())),
        }
    }

    /// A cart backed by [`MemoryStorage`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current line items, in insertion order.
    pub fn get_all(&self) -> Vec<LineItem> {
        self.lock().clone()
    }

    /// Looks up one line item.
    pub fn get(&self, item_id: &str) -> Option<LineItem> {
        self.lock().iter().find(|i| i.id == item_id).cloned()
    }

    /// Sum of line totals; zero for an empty cart.
    pub fn total(&self) -> Money {
        self.lock().iter().map(|i| i.total).sum()
    }

    /// Number of line items (not units).
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Number of units across all line items.
    pub fn total_quantity(&self) -> i64 {
        self.lock().iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Summary with VAT at `tax_rate` on the subtotal.
    pub fn totals(&self, tax_rate: TaxRate) -> CartTotals {
        let items = self.lock();
        let subtotal: Money = items.iter().map(|i| i.total).sum();
        let tax = subtotal.calculate_tax(tax_rate);

        CartTotals {
            item_count: items.len(),
            total_quantity: items.iter().map(|i| i.quantity).sum(),
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Appends a new line item and returns it.
    ///
    /// The same product and variant added twice yields two entries.
    pub fn add(
        &self,
        product: &Product,
        variant: Option<&Variant>,
        quantity: i64,
        specifications: Specifications,
    ) -> CoreResult<LineItem> {
        validate_quantity(quantity)?;
        let total = pricing::line_total(product, variant, quantity).ok_or(
            CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            },
        )?;

        let mut items = self.lock();
        let item = LineItem {
            id: next_item_id(&items, product, variant),
            product: product.clone(),
            variant: variant.cloned(),
            quantity,
            specifications,
            total,
        };

        debug!(item_id = %item.id, quantity, total = item.total.cents(), "Adding line item");
        items.push(item.clone());
        self.commit(items);

        Ok(item)
    }

    /// Removes the first entry with `item_id`. Returns whether one was
    /// found; storage is rewritten and observers notified either way.
    pub fn remove(&self, item_id: &str) -> bool {
        let mut items = self.lock();
        let removed = match items.iter().position(|i| i.id == item_id) {
            Some(index) => {
                items.remove(index);
                true
            }
            None => false,
        };

        debug!(item_id, removed, "Removing line item");
        self.commit(items);
        removed
    }

    /// Sets a new quantity and recomputes the line total.
    ///
    /// Quantities below 1 or above [`MAX_ITEM_QUANTITY`], totals that would
    /// overflow, and unknown ids are ignored. Returns whether the cart
    /// changed.
    pub fn update_quantity(&self, item_id: &str, quantity: i64) -> bool {
        if !(1..=MAX_ITEM_QUANTITY).contains(&quantity) {
            debug!(item_id, quantity, "Ignoring out-of-range quantity");
            return false;
        }

        let mut items = self.lock();
        let Some(item) = items.iter_mut().find(|i| i.id == item_id) else {
            return false;
        };

        if !item.set_quantity(quantity) {
            warn!(item_id, quantity, "Line total overflows, quantity unchanged");
            return false;
        }
        debug!(item_id, quantity, total = item.total.cents(), "Quantity updated");
        self.commit(items);
        true
    }

    /// Empties the cart.
    pub fn clear(&self) {
        let mut items = self.lock();
        items.clear();
        debug!("Cart cleared");
        self.commit(items);
    }

    /// Re-reads storage, replacing the in-memory list.
    ///
    /// Picks up writes made by another process; observers are notified.
    pub fn reload(&self) {
        let mut items = self.lock();
        *items = load_items(self.storage.as_ref());
        let snapshot = items.clone();
        drop(items);
        self.notify(&snapshot);
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Registers an observer, called synchronously after each mutation
    /// with the updated list.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&[LineItem]) + Send + Sync + 'static,
    {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        observers.next_id += 1;
        let id = observers.next_id;
        observers.entries.push((id, Arc::new(observer)));

        Subscription {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, Vec<LineItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persists the guarded list, releases the lock, then notifies.
    fn commit(&self, items: MutexGuard<'_, Vec<LineItem>>) {
        let snapshot = items.clone();
        self.persist(&snapshot);
        drop(items);
        self.notify(&snapshot);
    }

    fn persist(&self, items: &[LineItem]) {
        let json = match serde_json::to_string(items) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to encode cart");
                return;
            }
        };

        if let Err(e) = self.storage.write(CART_STORAGE_KEY, &json) {
            warn!(error = %e, "Failed to persist cart");
        }
    }

    fn notify(&self, items: &[LineItem]) {
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer(items);
        }
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.count())
            .finish_non_exhaustive()
    }
}

/// Reads and decodes the persisted cart; empty on any failure.
fn load_items(storage: &dyn CartStorage) -> Vec<LineItem> {
    let raw = match storage.read(CART_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "Failed to read persisted cart");
            return Vec::new();
        }
    };

    let items: Vec<LineItem> = serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "Persisted cart is corrupt, starting empty");
        Vec::new()
    });

    items.into_iter().filter_map(restore_item).collect()
}

/// Re-derives a decoded entry's total from its quantity. Entries with a
/// quantity out of range or an overflowing total are dropped.
fn restore_item(mut item: LineItem) -> Option<LineItem> {
    let quantity = item.quantity;
    if !(1..=MAX_ITEM_QUANTITY).contains(&quantity) || !item.set_quantity(quantity) {
        warn!(item_id = %item.id, quantity, "Dropping invalid persisted line item");
        return None;
    }
    Some(item)
}

/// `{product_id}-{variant_type|default}-{millis}`, suffixed with `-N` if
/// that id is already in the cart.
fn next_item_id(items: &[LineItem], product: &Product, variant: Option<&Variant>) -> String {
    let tag = variant
        .map(|v| v.variant_type.as_str())
        .unwrap_or(DEFAULT_VARIANT_TAG);
    let base = format!("{}-{}-{}", product.id, tag, Utc::now().timestamp_millis());

    let taken = |id: &str| items.iter().any(|i| i.id == id);
    if !taken(&base) {
        return base;
    }

    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|id| !taken(id))
        .unwrap_or(base)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::storage::StorageError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn business_cards() -> Product {
        Product {
            id: "cards".to_string(),
            category: "cards".to_string(),
            name: "Business Cards".to_string(),
            description: None,
            base_price: Money::from_major(14),
            image_url: None,
            variants: vec![Variant {
                variant_type: "spotuv".to_string(),
                label: "Spot UV".to_string(),
                price: Money::from_major(24),
                image: None,
            }],
            pricing_rules: serde_json::Value::Null,
            is_active: true,
            sort_order: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn banners() -> Product {
        Product {
            id: "banners".to_string(),
            category: "banners".to_string(),
            name: "Banners".to_string(),
            description: None,
            base_price: Money::from_major(6000),
            image_url: None,
            variants: vec![],
            pricing_rules: serde_json::Value::Null,
            is_active: true,
            sort_order: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Storage whose writes always fail.
    struct BrokenStorage;

    impl CartStorage for BrokenStorage {
        fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disk unplugged".to_string()))
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disk unplugged".to_string()))
        }
    }

    fn add_spot_uv(cart: &CartStore, quantity: i64) -> LineItem {
        let product = business_cards();
        let variant = product.variant("spotuv").cloned();
        cart.add(&product, variant.as_ref(), quantity, Specifications::new())
            .unwrap()
    }

    #[test]
    fn test_add_prices_with_variant() {
        let cart = CartStore::in_memory();

        let item = add_spot_uv(&cart, 100);

        assert_eq!(item.total, Money::from_major(2400));
        assert!(item.id.starts_with("cards-spotuv-"));
        assert_eq!(cart.count(), 1);
        assert_eq!(cart.total(), Money::from_major(2400));
    }

    #[test]
    fn test_two_products_total_and_count() {
        let cart = CartStore::in_memory();

        add_spot_uv(&cart, 100);
        let banner = cart
            .add(&banners(), None, 1, Specifications::new())
            .unwrap();

        assert!(banner.id.starts_with("banners-default-"));
        assert_eq!(cart.total(), Money::from_major(8400));
        assert_eq!(cart.count(), 2);
        assert_eq!(cart.total_quantity(), 101);
    }

    #[test]
    fn test_update_quantity_recomputes_total() {
        let cart = CartStore::in_memory();
        let item = add_spot_uv(&cart, 100);

        assert!(!cart.update_quantity(&item.id, 0));
        assert!(!cart.update_quantity(&item.id, -3));
        let unchanged = cart.get(&item.id).unwrap();
        assert_eq!(unchanged.quantity, 100);
        assert_eq!(unchanged.total, Money::from_major(2400));

        assert!(cart.update_quantity(&item.id, 50));
        assert_eq!(cart.get(&item.id).unwrap().total, Money::from_major(1200));

        assert!(!cart.update_quantity("missing", 5));
    }

    #[test]
    fn test_update_quantity_rejects_oversized_quantity() {
        let cart = CartStore::in_memory();
        let item = cart
            .add(&business_cards(), None, 1, Specifications::new())
            .unwrap();

        assert!(!cart.update_quantity(&item.id, MAX_ITEM_QUANTITY + 1));
        assert!(!cart.update_quantity(&item.id, i64::MAX / 10));

        let unchanged = cart.get(&item.id).unwrap();
        assert_eq!(unchanged.quantity, 1);
        assert_eq!(unchanged.total, Money::from_major(14));

        assert!(cart.update_quantity(&item.id, MAX_ITEM_QUANTITY));
        assert_eq!(
            cart.get(&item.id).unwrap().total,
            Money::from_major(14 * MAX_ITEM_QUANTITY)
        );
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let cart = CartStore::in_memory();
        let product = business_cards();

        assert!(cart.add(&product, None, 0, Specifications::new()).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_identical_entries_coexist() {
        let cart = CartStore::in_memory();

        let first = add_spot_uv(&cart, 100);
        let second = add_spot_uv(&cart, 100);

        assert_ne!(first.id, second.id);
        assert_eq!(cart.count(), 2);

        assert!(cart.remove(&first.id));
        assert_eq!(cart.get_all(), vec![second]);
    }

    #[test]
    fn test_add_then_remove_restores_prior_list() {
        let cart = CartStore::in_memory();
        add_spot_uv(&cart, 10);
        let before = cart.get_all();

        let added = cart.add(&banners(), None, 2, Specifications::new()).unwrap();
        assert!(cart.remove(&added.id));

        assert_eq!(cart.get_all(), before);
        assert!(!cart.remove("missing"));
    }

    #[test]
    fn test_clear() {
        let cart = CartStore::in_memory();
        add_spot_uv(&cart, 100);

        cart.clear();

        assert_eq!(cart.count(), 0);
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn test_totals_with_vat() {
        let cart = CartStore::in_memory();
        add_spot_uv(&cart, 100);
        cart.add(&banners(), None, 1, Specifications::new()).unwrap();

        let totals = cart.totals(TaxRate::from_bps(1600));

        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.subtotal, Money::from_major(8400));
        assert_eq!(totals.tax, Money::from_major(1344));
        assert_eq!(totals.total, Money::from_major(9744));
    }

    #[test]
    fn test_persist_and_reload_preserves_order() {
        let storage = Arc::new(MemoryStorage::new());
        let cart = CartStore::new(storage.clone());

        let mut specs = Specifications::new();
        specs.insert("sides".to_string(), "double".to_string());
        add_spot_uv(&cart, 100);
        cart.add(&banners(), None, 1, specs).unwrap();

        let reopened = CartStore::new(storage);
        assert_eq!(reopened.get_all(), cart.get_all());
    }

    #[test]
    fn test_reload_picks_up_external_writes() {
        let storage = Arc::new(MemoryStorage::new());
        let ours = CartStore::new(storage.clone());
        let theirs = CartStore::new(storage);

        add_spot_uv(&theirs, 5);
        assert!(ours.is_empty());

        ours.reload();
        assert_eq!(ours.count(), 1);
    }

    #[test]
    fn test_corrupt_storage_yields_empty_cart() {
        let storage = Arc::new(MemoryStorage::with_value(CART_STORAGE_KEY, "{not json"));
        let cart = CartStore::new(storage);

        assert!(cart.is_empty());
        add_spot_uv(&cart, 1);
        assert_eq!(cart.count(), 1);
    }

    #[test]
    fn test_load_recomputes_drifted_totals() {
        let source = CartStore::in_memory();
        let mut cards = add_spot_uv(&source, 100);
        let mut banner = source
            .add(&banners(), None, 1, Specifications::new())
            .unwrap();
        cards.total = Money::from_major(1);
        banner.quantity = 0;

        let json = serde_json::to_string(&vec![cards.clone(), banner]).unwrap();
        let storage = Arc::new(MemoryStorage::new());
        storage.write(CART_STORAGE_KEY, &json).unwrap();
        let cart = CartStore::new(storage);

        assert_eq!(cart.count(), 1);
        let restored = cart.get(&cards.id).unwrap();
        assert_eq!(restored.quantity, 100);
        assert_eq!(restored.total, Money::from_major(2400));
    }

    #[test]
    fn test_storage_failure_keeps_in_memory_state() {
        let cart = CartStore::new(Arc::new(BrokenStorage));
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        let _sub = cart.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let item = add_spot_uv(&cart, 100);
        assert!(cart.update_quantity(&item.id, 50));

        assert_eq!(cart.total(), Money::from_major(1200));
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_observers_see_updated_list_until_unsubscribed() {
        let cart = Arc::new(CartStore::in_memory());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let reader = cart.clone();
        let subscription = cart.subscribe(move |items| {
            // Reading the cart from inside an observer must not deadlock
            assert_eq!(reader.count(), items.len());
            sink.lock().unwrap().push(items.len());
        });

        let item = add_spot_uv(&cart, 1);
        cart.update_quantity(&item.id, 0);
        cart.update_quantity(&item.id, 2);
        cart.remove(&item.id);

        subscription.unsubscribe();
        add_spot_uv(&cart, 1);

        assert_eq!(*seen.lock().unwrap(), vec![1, 1, 0]);
    }

    #[test]
    fn test_dropping_subscription_detaches() {
        let cart = CartStore::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));

        {
            let calls = calls.clone();
            let _sub = cart.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
            cart.clear();
        }
        cart.clear();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_next_item_id_suffixes_collisions() {
        let product = banners();
        let mut items = Vec::new();
        let first = next_item_id(&items, &product, None);
        items.push(LineItem {
            id: first.clone(),
            product: product.clone(),
            variant: None,
            quantity: 1,
            specifications: Specifications::new(),
            total: product.base_price,
        });

        let clash = items[0].clone();
        let mut second = clash.clone();
        second.id = format!("{}-2", first);
        items.push(second);

        // Same millisecond: the base id and "-2" are both taken
        let third = next_item_id(&items, &product, None);
        assert_ne!(third, first);
        assert_ne!(third, format!("{}-2", first));
    }
}
