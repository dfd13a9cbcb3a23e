//! # WhatsApp Commands
//!
//! The alternate checkout channel: instead of submitting an order, the
//! customer sends the cart to the shop on WhatsApp and a person takes it
//! from there. Nothing is written to the data store and the cart is kept.

use serde::{Deserialize, Serialize};
use tracing::debug;

use printhouse_core::message::{inquiry_message, order_message, whatsapp_link};
use printhouse_core::validation::validate_quantity;
use printhouse_core::CoreError;
use printhouse_db::Database;

use crate::error::ApiError;
use crate::state::{CartStore, StorefrontConfig};

/// A pre-filled `wa.me` link and the text it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppLink {
    pub url: String,
    pub message: String,
}

/// Builds the WhatsApp link for the whole cart.
pub fn whatsapp_checkout(
    cart: &CartStore,
    config: &StorefrontConfig,
) -> Result<WhatsAppLink, ApiError> {
    debug!("whatsapp_checkout command");

    let items = cart.get_all();
    if items.is_empty() {
        return Err(CoreError::EmptyCart.into());
    }

    let message = order_message(&items, &config.currency_symbol);
    let url = whatsapp_link(&config.whatsapp_number, &message)?;

    Ok(WhatsAppLink {
        url: url.into(),
        message,
    })
}

/// Builds the "I'm interested in ordering" link from a product page.
pub async fn whatsapp_inquiry(
    db: &Database,
    config: &StorefrontConfig,
    product_id: &str,
    variant_type: Option<&str>,
    quantity: i64,
) -> Result<WhatsAppLink, ApiError> {
    debug!(product_id, ?variant_type, quantity, "whatsapp_inquiry command");

    validate_quantity(quantity)?;

    let product = db
        .products()
        .get_active(product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
    let variant = variant_type.and_then(|tag| product.variant(tag));

    let message = inquiry_message(&product, variant, quantity);
    let url = whatsapp_link(&config.whatsapp_number, &message)?;

    Ok(WhatsAppLink {
        url: url.into(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use chrono::Utc;
    use printhouse_core::{Money, Product, Specifications};
    use printhouse_db::DbConfig;

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
            sort_order: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_whatsapp_checkout_keeps_cart() {
        let cart = CartStore::in_memory();
        cart.add(&banners(), None, 1, Specifications::new()).unwrap();

        let link = whatsapp_checkout(&cart, &StorefrontConfig::default()).unwrap();

        assert!(link.url.starts_with("https://wa.me/254769752124?text="));
        assert!(link.message.contains("*1. Banners*"));
        assert!(link.message.ends_with("*Grand Total: KES 6,000.00*"));
        assert_eq!(cart.count(), 1);
    }

    #[test]
    fn test_whatsapp_checkout_empty_cart() {
        let err = whatsapp_checkout(&CartStore::in_memory(), &StorefrontConfig::default())
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::EmptyCart);
    }

    #[tokio::test]
    async fn test_whatsapp_inquiry() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&banners()).await.unwrap();
        let config = StorefrontConfig::default();

        let link = whatsapp_inquiry(&db, &config, "banners", None, 2).await.unwrap();
        assert_eq!(link.message, "I'm interested in ordering 2x Banners (Standard)");

        let err = whatsapp_inquiry(&db, &config, "mugs", None, 2).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
