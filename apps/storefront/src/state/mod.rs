//! # State Module
//!
//! Long-lived storefront state, created once at startup.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐          │
//! │  │   Database   │  │    CartStore     │  │ StorefrontConfig │          │
//! │  │  (SQLite     │  │  Mutex<Vec<..>>  │  │  toml + env      │          │
//! │  │   pool)      │  │  + CartStorage   │  │                  │          │
//! │  └──────────────┘  └──────────────────┘  └──────────────────┘          │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Database: internal connection pool                                  │
//! │  • CartStore: internal mutex, observers run outside it                 │
//! │  • StorefrontConfig: read-only after initialization                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands take exactly the pieces they need, so each can be built and
//! tested on its own.

mod cart;
mod config;
mod storage;

pub use cart::{CartStore, CartTotals, Subscription};
pub use config::{ConfigError, StorefrontConfig};
pub use storage::{CartStorage, FileStorage, MemoryStorage, StorageError};
