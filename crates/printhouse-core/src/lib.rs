//! # printhouse-core: Pure Business Logic for the Printhouse Storefront
//!
//! This crate contains the storefront's business rules as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Printhouse Storefront Architecture                  │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront (apps/storefront)                 │   │
//! │  │    Catalog ──► Cart Store ──► Checkout ──► Payment placeholders │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ printhouse-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ unit price│  │   rules   │  │   │
//! │  │   │  LineItem │  │  TaxRate  │  │ line total│  │   checks  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 printhouse-db (Data Store Layer)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Variant, LineItem, Order, Customer)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - The price calculator
//! - [`message`] - WhatsApp order summary and deep link
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use printhouse_core::money::Money;
//! use printhouse_core::types::TaxRate;
//!
//! // KES 24.00 per card, 100 cards
//! let line = Money::from_major(24) * 100_i64;
//! assert_eq!(line, Money::from_major(2400));
//!
//! // 16% VAT
//! let vat = line.calculate_tax(TaxRate::from_bps(1600));
//! assert_eq!(vat, Money::from_major(384));
//! ```

pub mod error;
pub mod message;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

/// Storage key the cart is persisted under.
pub const CART_STORAGE_KEY: &str = "printhouse_cart";

/// Variant tag used in line item ids when no variant is selected.
pub const DEFAULT_VARIANT_TAG: &str = "default";

/// Maximum quantity of a single line item.
///
/// Print runs are ordered in the hundreds or thousands; anything above
/// this is almost certainly a typo.
pub const MAX_ITEM_QUANTITY: i64 = 100_000;

/// Default VAT rate applied at checkout (16%).
pub const DEFAULT_VAT_BPS: u32 = 1600;
