//! # Cart Commands
//!
//! Cart manipulation on behalf of the customer.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Checkout │────►│  Order   │       │
//! │  │  Cart    │     │          │     │   Form   │     │  placed  │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                                  │             │
//! │                   add_to_cart                        cart cleared      │
//! │                   update_cart_item                                      │
//! │                   remove_from_cart                                      │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   clear_cart ──────────────────────► (back to empty)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use printhouse_core::{CoreError, LineItem, Specifications, MAX_ITEM_QUANTITY};
use printhouse_db::Database;

use crate::error::ApiError;
use crate::state::{CartStore, CartTotals, StorefrontConfig};

/// Cart response including items and totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<LineItem>,
    pub totals: CartTotals,
    /// `totals.total` formatted for display, e.g. `KES 9,744.00`
    pub formatted_total: String,
}

impl CartResponse {
    pub fn build(cart: &CartStore, config: &StorefrontConfig) -> Self {
        let totals = cart.totals(config.tax_rate());
        CartResponse {
            items: cart.get_all(),
            formatted_total: config.format_price(totals.total),
            totals,
        }
    }
}

/// What the product page submits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: String,
    /// Variant type tag; unknown tags are priced at the base price.
    #[serde(default)]
    pub variant_type: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub specifications: Specifications,
}

/// Gets the current cart contents.
pub fn get_cart(cart: &CartStore, config: &StorefrontConfig) -> CartResponse {
    debug!("get_cart command");
    CartResponse::build(cart, config)
}

/// Adds a product to the cart.
///
/// ## Behavior
/// - Always appends a new line item, even for a product already in the cart
/// - Price is frozen on the line item at the time of adding
/// - Unlisted products are rejected
pub async fn add_to_cart(
    db: &Database,
    cart: &CartStore,
    config: &StorefrontConfig,
    request: AddToCartRequest,
) -> Result<CartResponse, ApiError> {
    debug!(
        product_id = %request.product_id,
        variant = ?request.variant_type,
        quantity = request.quantity,
        "add_to_cart command"
    );

    let product = db
        .products()
        .get_active(&request.product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(request.product_id.clone()))?;

    let variant = match request.variant_type.as_deref() {
        Some(tag) => {
            let found = product.variant(tag);
            if found.is_none() {
                debug!(product_id = %product.id, tag, "Unknown variant, using base price");
            }
            found
        }
        None => None,
    };

    cart.add(&product, variant, request.quantity, request.specifications)?;

    Ok(CartResponse::build(cart, config))
}

/// Changes a line item's quantity.
///
/// Quantities below 1 leave the cart unchanged.
pub fn update_cart_item(
    cart: &CartStore,
    config: &StorefrontConfig,
    item_id: &str,
    quantity: i64,
) -> Result<CartResponse, ApiError> {
    debug!(item_id, quantity, "update_cart_item command");

    if cart.get(item_id).is_none() {
        return Err(ApiError::not_found("Cart item", item_id));
    }

    if quantity > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: quantity,
            max: MAX_ITEM_QUANTITY,
        }
        .into());
    }

    cart.update_quantity(item_id, quantity);

    Ok(CartResponse::build(cart, config))
}

/// Removes a line item. Unknown ids are ignored.
pub fn remove_from_cart(cart: &CartStore, config: &StorefrontConfig, item_id: &str) -> CartResponse {
    debug!(item_id, "remove_from_cart command");
    cart.remove(item_id);
    CartResponse::build(cart, config)
}

/// Empties the cart.
pub fn clear_cart(cart: &CartStore, config: &StorefrontConfig) -> CartResponse {
    debug!("clear_cart command");
    cart.clear();
    CartResponse::build(cart, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::Utc;
    use printhouse_core::{Money, Product, Variant};
    use printhouse_db::DbConfig;

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = Product {
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
        };
        db.products().insert(&product).await.unwrap();
        db
    }

    fn add_request(variant: Option<&str>, quantity: i64) -> AddToCartRequest {
        AddToCartRequest {
            product_id: "cards".to_string(),
            variant_type: variant.map(str::to_string),
            quantity,
            specifications: Specifications::new(),
        }
    }

    #[tokio::test]
    async fn test_add_to_cart_prices_variant() {
        let db = seeded_db().await;
        let cart = CartStore::in_memory();
        let config = StorefrontConfig::default();

        let response = add_to_cart(&db, &cart, &config, add_request(Some("spotuv"), 100))
            .await
            .unwrap();

        assert_eq!(response.items.len(), 1);
        assert_eq!(response.totals.subtotal, Money::from_major(2400));
        assert_eq!(response.totals.tax, Money::from_major(384));
        assert_eq!(response.formatted_total, "KES 2,784.00");
    }

    #[tokio::test]
    async fn test_unknown_variant_uses_base_price() {
        let db = seeded_db().await;
        let cart = CartStore::in_memory();

        let response = add_to_cart(
            &db,
            &cart,
            &StorefrontConfig::default(),
            add_request(Some("holographic"), 10),
        )
        .await
        .unwrap();

        assert_eq!(response.items[0].total, Money::from_major(140));
        assert!(response.items[0].variant.is_none());
    }

    #[tokio::test]
    async fn test_add_rejects_unknown_product_and_bad_quantity() {
        let db = seeded_db().await;
        let cart = CartStore::in_memory();
        let config = StorefrontConfig::default();

        let mut missing = add_request(None, 1);
        missing.product_id = "mugs".to_string();
        let err = add_to_cart(&db, &cart, &config, missing).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = add_to_cart(&db, &cart, &config, add_request(None, 0))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_update_remove_clear() {
        let db = seeded_db().await;
        let cart = CartStore::in_memory();
        let config = StorefrontConfig::default();
        let added = add_to_cart(&db, &cart, &config, add_request(Some("spotuv"), 100))
            .await
            .unwrap();
        let id = added.items[0].id.clone();

        let same = update_cart_item(&cart, &config, &id, 0).unwrap();
        assert_eq!(same.items[0].quantity, 100);

        let updated = update_cart_item(&cart, &config, &id, 50).unwrap();
        assert_eq!(updated.totals.subtotal, Money::from_major(1200));

        assert!(update_cart_item(&cart, &config, &id, MAX_ITEM_QUANTITY + 1).is_err());
        assert!(update_cart_item(&cart, &config, "missing", 5).is_err());

        let removed = remove_from_cart(&cart, &config, &id);
        assert!(removed.items.is_empty());

        add_to_cart(&db, &cart, &config, add_request(None, 1)).await.unwrap();
        let cleared = clear_cart(&cart, &config);
        assert_eq!(cleared.totals.total, Money::zero());
        assert_eq!(get_cart(&cart, &config).totals.item_count, 0);
    }
}
