//! # Domain Types
//!
//! Core domain types used throughout the storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    LineItem     │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  product        │──►│  items snapshot │       │
//! │  │  base_price     │   │  variant?       │   │  order_number   │       │
//! │  │  variants[]     │   │  quantity ≥ 1   │   │  status         │       │
//! │  └─────────────────┘   │  total          │   │  payment_status │       │
//! │                        └─────────────────┘   └────────┬────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐            │                │
//! │  │    Variant      │   │    Customer     │   ┌────────▼────────┐       │
//! │  │  type / label   │   │  keyed by phone │   │   OrderLine     │       │
//! │  │  price          │   │  (upsert)       │   │  denormalised   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so Kenyan VAT of 16% is 1600 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Product & Variant
// =============================================================================

/// A purchasable configuration of a product (finish, size, material).
///
/// When selected, `price` replaces the product's base price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Variant {
    /// Machine tag, e.g. `spotuv`, `a5`, `hoodie`.
    #[serde(rename = "type")]
    pub variant_type: String,

    /// Label shown to the customer, e.g. `Spot UV`.
    pub label: String,

    /// Unit price for this configuration.
    pub price: Money,

    /// Image to show instead of the product image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Catalog section, e.g. `cards`, `banners`, `apparel`.
    pub category: String,

    pub name: String,

    pub description: Option<String>,

    /// Unit price when no variant is selected.
    pub base_price: Money,

    pub image_url: Option<String>,

    /// Purchasable configurations, in display order.
    #[serde(default)]
    pub variants: Vec<Variant>,

    /// Tiered-pricing metadata. Stored and carried, never evaluated.
    #[serde(default)]
    #[ts(type = "unknown")]
    pub pricing_rules: serde_json::Value,

    /// Whether the product is listed (soft delete).
    pub is_active: bool,

    /// Position in catalog listings, ascending.
    pub sort_order: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Looks up a variant by its type tag.
    pub fn variant(&self, variant_type: &str) -> Option<&Variant> {
        pricing::find_variant(self, variant_type)
    }

    /// Returns true if the product offers any variants.
    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// Free-form per-item customisation choices (`"sides" → "double"`).
///
/// A `BTreeMap` keeps the keys sorted so summaries print deterministically.
pub type Specifications = BTreeMap<String, String>;

/// One entry in the cart.
///
/// ## Invariant
/// `total == unit_price() × quantity`, where the unit price is the selected
/// variant's price or the product's base price. Every quantity change goes
/// through [`LineItem::set_quantity`], which recomputes the total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    /// Opaque id: `{product_id}-{variant_type|default}-{millis}`.
    pub id: String,

    /// Full product record at the time of adding.
    pub product: Product,

    /// Selected variant, if any.
    #[serde(default)]
    pub variant: Option<Variant>,

    /// Always ≥ 1.
    pub quantity: i64,

    #[serde(default)]
    pub specifications: Specifications,

    /// Unit price × quantity.
    pub total: Money,
}

impl LineItem {
    /// Unit price in effect for this entry.
    pub fn unit_price(&self) -> Money {
        pricing::unit_price(&self.product, self.variant.as_ref())
    }

    /// Sets a new quantity and recomputes the total.
    ///
    /// Returns `false` and leaves the entry untouched if the new total
    /// would overflow.
    pub fn set_quantity(&mut self, quantity: i64) -> bool {
        match pricing::line_total(&self.product, self.variant.as_ref(), quantity) {
            Some(total) => {
                self.quantity = quantity;
                self.total = total;
                true
            }
            None => false,
        }
    }

    /// Label for summaries: the variant label, or `Standard`.
    pub fn variant_label(&self) -> &str {
        self.variant
            .as_ref()
            .map(|v| v.label.as_str())
            .unwrap_or("Standard")
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order recorded, payment not yet confirmed.
    #[default]
    Pending,
    /// Payment initiated successfully; the print job can start.
    Processing,
    /// Delivered or picked up.
    Completed,
    /// Abandoned after a failed checkout step.
    Cancelled,
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer chose to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// M-Pesa Express (STK push to the customer's phone).
    Mpesa,
    /// Credit / debit card.
    Card,
    /// PayPal wallet.
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Card => "card",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mpesa" | "m-pesa" => Ok(PaymentMethod::Mpesa),
            "card" | "credit" | "debit" => Ok(PaymentMethod::Card),
            "paypal" => Ok(PaymentMethod::Paypal),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: vec!["mpesa".into(), "card".into(), "paypal".into()],
            }),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer, identified by phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    /// Normalised phone number (`2547XXXXXXXX`); unique.
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub total_orders: i64,
    pub total_spent: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Contact details written on upsert. Existing counters are left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerUpsert {
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Order
// =============================================================================

/// An order placed at checkout.
///
/// `items` is a frozen copy of the cart at submission time; later product
/// edits do not change what was ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    /// Gateway reference from payment initiation.
    pub payment_reference: Option<String>,
    pub whatsapp_sent: bool,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// One row per cart entry, denormalised for fulfilment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_category: String,
    pub variant_label: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
    pub specifications: Specifications,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    /// Snapshots a cart entry as an order line.
    pub fn from_line_item(
        id: String,
        order_id: &str,
        item: &LineItem,
        created_at: DateTime<Utc>,
    ) -> Self {
        OrderLine {
            id,
            order_id: order_id.to_string(),
            product_id: item.product.id.clone(),
            product_name: item.product.name.clone(),
            product_category: item.product.category.clone(),
            variant_label: item.variant.as_ref().map(|v| v.label.clone()),
            quantity: item.quantity,
            unit_price: item.unit_price(),
            total_price: item.total,
            specifications: item.specifications.clone(),
            created_at,
        }
    }
}

// =============================================================================
// Checkout Form
// =============================================================================

/// Contact and delivery details entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutForm {
    pub full_name: String,
    pub email: String,
    /// Phone number; also the M-Pesa number for STK push.
    pub phone: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
