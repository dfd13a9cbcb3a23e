//! # Repository Module
//!
//! Data store repositories for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront command                                                     │
//! │       │                                                                 │
//! │       │  db.products().search("mug", 20)                               │
//! │       ▼                                                                 │
//! │  ProductRepository   list_active / get_active / search / categories    │
//! │  CustomerRepository  upsert by phone                                   │
//! │  OrderRepository     insert / insert_lines / mark_paid / cancel        │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod customer;
pub mod order;
pub mod product;
