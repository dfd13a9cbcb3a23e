//! # Storefront Entry Point
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load `storefront.toml` + `PRINTHOUSE_*` overrides
//! 3. Connect to database & run migrations
//! 4. Open the persisted cart
//! 5. Run the requested command

#[tokio::main]
async fn main() {
    // The actual setup is in lib.rs for testability
    if let Err(e) = printhouse_storefront::run().await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
