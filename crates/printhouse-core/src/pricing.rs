//! # Price Calculator
//!
//! Maps (product, optional variant, quantity) to a line total.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  calculate_price(product, Some("spotuv"), 100)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  variant "spotuv" offered? ── yes ──► unit = variant.price (24.00)     │
//! │       │                                                                 │
//! │       no                                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  unit = product.base_price                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  total = unit × quantity  ──►  KES 2,400.00                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An unknown variant tag falls back to the base price without error.
//! Quantity is not bounds-checked here; the cart validates it. A total
//! that does not fit in `i64` cents comes back as `None`.

use crate::money::Money;
use crate::types::{Product, Variant};

/// Finds a product variant by its type tag.
pub fn find_variant<'a>(product: &'a Product, variant_type: &str) -> Option<&'a Variant> {
    product
        .variants
        .iter()
        .find(|v| v.variant_type == variant_type)
}

/// Unit price for a product with an optional selected variant.
#[inline]
pub fn unit_price(product: &Product, variant: Option<&Variant>) -> Money {
    variant.map(|v| v.price).unwrap_or(product.base_price)
}

/// Unit price × quantity, or `None` on overflow.
#[inline]
pub fn line_total(product: &Product, variant: Option<&Variant>, quantity: i64) -> Option<Money> {
    unit_price(product, variant).multiply_quantity(quantity)
}

/// Total for a product given a variant tag and a quantity.
///
/// ```rust
/// use printhouse_core::pricing::calculate_price;
/// # use printhouse_core::{Money, Product, Variant};
/// # let product = Product {
/// #     id: "cards".into(), category: "cards".into(), name: "Business Cards".into(),
/// #     description: None, base_price: Money::from_major(14), image_url: None,
/// #     variants: vec![Variant { variant_type: "spotuv".into(), label: "Spot UV".into(),
/// #         price: Money::from_major(24), image: None }],
/// #     pricing_rules: serde_json::Value::Null, is_active: true, sort_order: 1,
/// #     created_at: chrono::Utc::now(), updated_at: chrono::Utc::now(),
/// # };
/// assert_eq!(calculate_price(&product, Some("spotuv"), 100), Some(Money::from_major(2400)));
/// assert_eq!(calculate_price(&product, None, 100), Some(Money::from_major(1400)));
/// assert_eq!(calculate_price(&product, Some("gold"), 100), Some(Money::from_major(1400)));
/// ```
pub fn calculate_price(
    product: &Product,
    variant_type: Option<&str>,
    quantity: i64,
) -> Option<Money> {
    let variant = variant_type.and_then(|t| find_variant(product, t));
    line_total(product, variant, quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn banner() -> Product {
        Product {
            id: "banners".to_string(),
            category: "banners".to_string(),
            name: "Banners".to_string(),
            description: Some("Roll-up and backdrop banners".to_string()),
            base_price: Money::from_major(6000),
            image_url: None,
            variants: vec![
                Variant {
                    variant_type: "rollup".to_string(),
                    label: "Roll-up Banner".to_string(),
                    price: Money::from_major(6000),
                    image: None,
                },
                Variant {
                    variant_type: "backdrop".to_string(),
                    label: "Backdrop".to_string(),
                    price: Money::from_major(27000),
                    image: None,
                },
            ],
            pricing_rules: serde_json::Value::Null,
            is_active: true,
            sort_order: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_variant_price_overrides_base() {
        let product = banner();
        assert_eq!(
            calculate_price(&product, Some("backdrop"), 2),
            Some(Money::from_major(54000))
        );
    }

    #[test]
    fn test_no_variant_uses_base_price() {
        let product = banner();
        assert_eq!(
            calculate_price(&product, None, 1),
            Some(Money::from_major(6000))
        );
    }

    #[test]
    fn test_unknown_variant_falls_back_silently() {
        let product = banner();
        assert_eq!(
            calculate_price(&product, Some("teardrop"), 3),
            Some(Money::from_major(18000))
        );
    }

    #[test]
    fn test_quantity_is_not_bounds_checked() {
        let product = banner();
        assert_eq!(calculate_price(&product, None, 0), Some(Money::zero()));
        assert_eq!(
            calculate_price(&product, None, -1),
            Some(Money::from_major(-6000))
        );
    }

    #[test]
    fn test_overflowing_total_is_none() {
        let product = banner();
        assert_eq!(calculate_price(&product, Some("backdrop"), i64::MAX / 10), None);
    }

    #[test]
    fn test_find_variant() {
        let product = banner();
        assert_eq!(
            find_variant(&product, "rollup").map(|v| v.label.as_str()),
            Some("Roll-up Banner")
        );
        assert!(find_variant(&product, "ROLLUP").is_none());
    }
}
