//! # Order Message
//!
//! Builds the itemised WhatsApp order summary and its `wa.me` deep link,
//! the alternate checkout channel that hands the order to a human.
//!
//! ## Message Layout
//! ```text
//! *New Order Request*
//! ------------------
//!
//! *1. Business Cards*
//!    - Type: Spot UV
//!    - Quantity: 100
//!    - sides: double
//!    - Price: KES 2,400.00
//!
//! ------------------
//! *Grand Total: KES 2,400.00*
//! ```

use url::Url;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{LineItem, Product, Variant};
use crate::validation::ValidationResult;

/// Host of the WhatsApp click-to-chat service.
pub const WHATSAPP_BASE_URL: &str = "https://wa.me/";

const RULE: &str = "------------------\n";

/// Renders the order summary for a cart.
///
/// Specifications are listed in key order. Prices use `symbol`
/// (`KES` in production).
pub fn order_message(items: &[LineItem], symbol: &str) -> String {
    let mut message = String::from("*New Order Request*\n");
    message.push_str(RULE);
    message.push('\n');

    for (index, item) in items.iter().enumerate() {
        message.push_str(&format!("*{}. {}*\n", index + 1, item.product.name));
        message.push_str(&format!("   - Type: {}\n", item.variant_label()));
        message.push_str(&format!("   - Quantity: {}\n", item.quantity));

        for (key, value) in &item.specifications {
            message.push_str(&format!("   - {}: {}\n", key, value));
        }

        message.push_str(&format!(
            "   - Price: {}\n\n",
            item.total.format_with_symbol(symbol)
        ));
    }

    let grand_total: Money = items.iter().map(|item| item.total).sum();
    message.push_str(RULE);
    message.push_str(&format!(
        "*Grand Total: {}*",
        grand_total.format_with_symbol(symbol)
    ));

    message
}

/// One-line inquiry sent from a product page, before anything is in the
/// cart: `I'm interested in ordering 100x Business Cards (Spot UV)`.
pub fn inquiry_message(product: &Product, variant: Option<&Variant>, quantity: i64) -> String {
    let label = variant.map(|v| v.label.as_str()).unwrap_or("Standard");
    format!(
        "I'm interested in ordering {}x {} ({})",
        quantity, product.name, label
    )
}

/// Builds `https://wa.me/<number>?text=<message>`.
///
/// `number` must be in international form without `+` (e.g.
/// `254769752124`). The message is percent-encoded in full.
pub fn whatsapp_link(number: &str, message: &str) -> ValidationResult<Url> {
    let number = number.trim();

    if number.is_empty() {
        return Err(ValidationError::Required {
            field: "whatsapp number".to_string(),
        });
    }
    if !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "whatsapp number".to_string(),
            reason: "must be digits only, in international form".to_string(),
        });
    }

    let mut url = Url::parse(WHATSAPP_BASE_URL)
        .and_then(|base| base.join(number))
        .map_err(|e| ValidationError::InvalidFormat {
            field: "whatsapp number".to_string(),
            reason: e.to_string(),
        })?;
    url.set_query(Some(&format!("text={}", urlencoding::encode(message))));

    Ok(url)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Specifications;
    use chrono::Utc;

    fn product(name: &str, base: i64) -> Product {
        Product {
            id: name.to_lowercase(),
            category: name.to_lowercase(),
            name: name.to_string(),
            description: None,
            base_price: Money::from_major(base),
            image_url: None,
            variants: vec![],
            pricing_rules: serde_json::Value::Null,
            is_active: true,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cart() -> Vec<LineItem> {
        let mut specs = Specifications::new();
        specs.insert("sides".to_string(), "double".to_string());
        specs.insert("corners".to_string(), "rounded".to_string());

        vec![
            LineItem {
                id: "cards-spotuv-1".to_string(),
                product: product("Business Cards", 14),
                variant: Some(Variant {
                    variant_type: "spotuv".to_string(),
                    label: "Spot UV".to_string(),
                    price: Money::from_major(24),
                    image: None,
                }),
                quantity: 100,
                specifications: specs,
                total: Money::from_major(2400),
            },
            LineItem {
                id: "banners-default-2".to_string(),
                product: product("Banners", 6000),
                variant: None,
                quantity: 1,
                specifications: Specifications::new(),
                total: Money::from_major(6000),
            },
        ]
    }

    #[test]
    fn test_order_message_layout() {
        let message = order_message(&cart(), "KES");
        let expected = "*New Order Request*\n\
            ------------------\n\
            \n\
            *1. Business Cards*\n   \
            - Type: Spot UV\n   \
            - Quantity: 100\n   \
            - corners: rounded\n   \
            - sides: double\n   \
            - Price: KES 2,400.00\n\
            \n\
            *2. Banners*\n   \
            - Type: Standard\n   \
            - Quantity: 1\n   \
            - Price: KES 6,000.00\n\
            \n\
            ------------------\n\
            *Grand Total: KES 8,400.00*";
        assert_eq!(message, expected);
    }

    #[test]
    fn test_order_message_empty_cart() {
        let message = order_message(&[], "KES");
        assert!(message.ends_with("*Grand Total: KES 0.00*"));
    }

    #[test]
    fn test_whatsapp_link_encodes_message() {
        let url = whatsapp_link("254769752124", "*Hi* & 1/2").unwrap();
        assert_eq!(
            url.as_str(),
            "https://wa.me/254769752124?text=%2AHi%2A%20%26%201%2F2"
        );
    }

    #[test]
    fn test_whatsapp_link_rejects_bad_number() {
        assert!(whatsapp_link("", "hi").is_err());
        assert!(whatsapp_link("+254 769", "hi").is_err());
    }

    #[test]
    fn test_inquiry_message() {
        let cards = product("Business Cards", 14);
        let spot_uv = Variant {
            variant_type: "spotuv".to_string(),
            label: "Spot UV".to_string(),
            price: Money::from_major(24),
            image: None,
        };

        assert_eq!(
            inquiry_message(&cards, Some(&spot_uv), 100),
            "I'm interested in ordering 100x Business Cards (Spot UV)"
        );
        assert_eq!(
            inquiry_message(&cards, None, 1),
            "I'm interested in ordering 1x Business Cards (Standard)"
        );
    }
}
