//! # Commands Module
//!
//! Storefront operations, one function per customer action.
//!
//! ## Command Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  catalog.rs                                                             │
//! │  ├── list_products()         All active products                       │
//! │  ├── get_product()           One product                               │
//! │  ├── products_by_category()  One category                              │
//! │  ├── categories()            Distinct categories                       │
//! │  └── search_products()       Name / description / category search     │
//! │                                                                         │
//! │  cart.rs                                                                │
//! │  ├── get_cart()              Items + totals                            │
//! │  ├── add_to_cart()           Append a line item                        │
//! │  ├── update_cart_item()      Change quantity                           │
//! │  ├── remove_from_cart()      Drop a line item                          │
//! │  └── clear_cart()            Empty the cart                            │
//! │                                                                         │
//! │  checkout.rs                                                            │
//! │  └── CheckoutSubmitter::submit()  Order + payment                      │
//! │                                                                         │
//! │  message.rs                                                             │
//! │  ├── whatsapp_checkout()     Cart as a WhatsApp message                │
//! │  └── whatsapp_inquiry()      Product page inquiry                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command returns `Result<T, ApiError>` (or a plain value when it
//! cannot fail).

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod message;

pub use cart::*;
pub use catalog::*;
pub use checkout::{
    generate_order_number, CheckoutError, CheckoutReceipt, CheckoutRequest, CheckoutSettings,
    CheckoutSubmitter, OrderStore,
};
pub use message::*;
