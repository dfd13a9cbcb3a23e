//! # Printhouse Storefront Library
//!
//! Catalog, cart and checkout for Turkana Printing House.
//!
//! ## Module Organization
//! ```text
//! printhouse_storefront/
//! ├── lib.rs          ◄─── You are here (startup & CLI dispatch)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── cart.rs     ◄─── Persisted cart store + observers
//! │   ├── storage.rs  ◄─── Cart storage backends (file, memory)
//! │   └── config.rs   ◄─── StorefrontConfig (toml + env)
//! ├── commands/
//! │   ├── catalog.rs  ◄─── Product listing/search
//! │   ├── cart.rs     ◄─── Cart manipulation
//! │   ├── checkout.rs ◄─── CheckoutSubmitter + OrderStore
//! │   └── message.rs  ◄─── WhatsApp links
//! ├── payments.rs     ◄─── Payment gateway placeholders
//! └── error.rs        ◄─── ApiError / StartupError
//! ```

pub mod commands;
pub mod error;
pub mod payments;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use printhouse_core::{CheckoutForm, PaymentMethod, Specifications};
use printhouse_db::{Database, DbConfig};

use commands::{AddToCartRequest, CheckoutRequest, CheckoutSettings, CheckoutSubmitter};
use error::{ApiError, StartupError};
use payments::PlaceholderGateway;
use state::{CartStore, FileStorage, StorefrontConfig};

const USAGE: &str = "\
Usage: storefront [--config <path>] <command> [args]

Commands:
  catalog [query]                 List or search products
  categories                      List product categories
  product <id>                    Show one product
  cart                            Show the cart
  add <product> [variant] [qty] [key=value ...]
                                  Add a product to the cart
  update <item> <qty>             Change a line item's quantity
  remove <item>                   Remove a line item
  clear                           Empty the cart
  whatsapp                        WhatsApp link for the cart
  inquire <product> [variant] [qty]
                                  WhatsApp inquiry link for a product
  checkout <mpesa|card|paypal> <name> <email> <phone> <address> [city] [notes]
                                  Place the order and pay
  orders [limit]                  Recent orders";

/// Everything a storefront session needs, opened once at startup.
pub struct Storefront {
    pub config: StorefrontConfig,
    pub db: Database,
    pub cart: CartStore,
    pub checkout: CheckoutSubmitter<Database, PlaceholderGateway>,
}

impl Storefront {
    /// Connects the database (running migrations) and opens the cart file.
    ///
    /// ## Startup Sequence
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────────┐
    /// │  1. Database ──► config.database_path(), WAL, migrations               │
    /// │  2. Cart ──────► FileStorage(config.cart_dir())/printhouse_cart.json   │
    /// │  3. Checkout ──► PlaceholderGateway(payment_latency_ms)                │
    /// └─────────────────────────────────────────────────────────────────────────┘
    /// ```
    pub async fn open(config: StorefrontConfig) -> Result<Self, StartupError> {
        let db_path = config.database_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(state::StorageError::from)?;
        }
        info!(?db_path, "Database path determined");

        let db = Database::new(DbConfig::new(db_path)).await?;
        info!("Database connected and migrations applied");

        let storage = FileStorage::new(config.cart_dir())?;
        let cart = CartStore::new(Arc::new(storage));

        let gateway = PlaceholderGateway::new(Duration::from_millis(config.payment_latency_ms));
        let checkout = CheckoutSubmitter::new(db.clone(), gateway, CheckoutSettings::from(&config));

        info!(items = cart.count(), "State initialized");

        Ok(Storefront {
            config,
            db,
            cart,
            checkout,
        })
    }
}

/// Runs the storefront CLI with the process arguments.
pub async fn run() -> Result<(), StartupError> {
    init_tracing();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let config_path = take_flag(&mut args, "--config")?;
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = StorefrontConfig::load(config_path)?;
    info!(store = %config.store_name, "Starting storefront");

    let storefront = Storefront::open(config).await?;
    let _cart_log = storefront
        .cart
        .subscribe(|items| debug!(items = items.len(), "Cart changed"));

    let command = args.remove(0);
    dispatch(&storefront, &command, &args).await
}

async fn dispatch(sf: &Storefront, command: &str, args: &[String]) -> Result<(), StartupError> {
    let arg = |i: usize| args.get(i).map(String::as_str);
    let required = |i: usize, name: &str| {
        arg(i).ok_or_else(|| StartupError::Usage(format!("missing <{}>\n\n{}", name, USAGE)))
    };

    match command {
        "catalog" => {
            let products = commands::search_products(&sf.db, &sf.config, arg(0).unwrap_or("")).await?;
            print_json(&products)
        }
        "categories" => print_json(&commands::categories(&sf.db).await?),
        "product" => {
            let product = commands::get_product(&sf.db, &sf.config, required(0, "id")?).await?;
            print_json(&product)
        }
        "cart" => print_json(&commands::get_cart(&sf.cart, &sf.config)),
        "add" => {
            let request = AddToCartRequest {
                product_id: required(0, "product")?.to_string(),
                variant_type: arg(1).filter(|v| *v != "-").map(str::to_string),
                quantity: parse_quantity(arg(2).unwrap_or("1"))?,
                specifications: parse_specifications(args.get(3..).unwrap_or_default())?,
            };
            print_json(&commands::add_to_cart(&sf.db, &sf.cart, &sf.config, request).await?)
        }
        "update" => {
            let quantity = parse_quantity(required(1, "qty")?)?;
            let response =
                commands::update_cart_item(&sf.cart, &sf.config, required(0, "item")?, quantity)?;
            print_json(&response)
        }
        "remove" => print_json(&commands::remove_from_cart(
            &sf.cart,
            &sf.config,
            required(0, "item")?,
        )),
        "clear" => print_json(&commands::clear_cart(&sf.cart, &sf.config)),
        "whatsapp" => print_json(&commands::whatsapp_checkout(&sf.cart, &sf.config)?),
        "inquire" => {
            let link = commands::whatsapp_inquiry(
                &sf.db,
                &sf.config,
                required(0, "product")?,
                arg(1).filter(|v| *v != "-"),
                parse_quantity(arg(2).unwrap_or("1"))?,
            )
            .await?;
            print_json(&link)
        }
        "checkout" => {
            let payment_method: PaymentMethod =
                required(0, "method")?.parse().map_err(ApiError::from)?;
            let request = CheckoutRequest {
                form: CheckoutForm {
                    full_name: required(1, "name")?.to_string(),
                    email: required(2, "email")?.to_string(),
                    phone: required(3, "phone")?.to_string(),
                    address: required(4, "address")?.to_string(),
                    city: arg(5).unwrap_or(&sf.config.default_city).to_string(),
                    notes: arg(6).map(str::to_string),
                },
                payment_method,
            };
            let receipt = sf
                .checkout
                .submit(&sf.cart, &request)
                .await
                .map_err(ApiError::from)?;
            print_json(&receipt)
        }
        "orders" => {
            let limit = match arg(0) {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| StartupError::Usage(format!("invalid limit: {}", raw)))?,
                None => 20,
            };
            print_json(&sf.db.orders().list_recent(limit).await?)
        }
        other => Err(StartupError::Usage(format!("unknown command: {}\n\n{}", other, USAGE))),
    }
}

/// Removes `flag <value>` from `args`, returning the value.
fn take_flag(args: &mut Vec<String>, flag: &str) -> Result<Option<PathBuf>, StartupError> {
    let Some(index) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        return Err(StartupError::Usage(format!("{} requires a value", flag)));
    }
    let value = args.remove(index + 1);
    args.remove(index);
    Ok(Some(PathBuf::from(value)))
}

fn parse_quantity(raw: &str) -> Result<i64, StartupError> {
    raw.parse()
        .map_err(|_| StartupError::Usage(format!("invalid quantity: {}", raw)))
}

/// Parses `key=value` pairs.
fn parse_specifications(pairs: &[String]) -> Result<Specifications, StartupError> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| StartupError::Usage(format!("expected key=value, got: {}", pair)))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), StartupError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::internal(format!("Failed to encode output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=printhouse=trace` - Show trace for printhouse crates only
/// - Default: `info,printhouse=debug,sqlx=warn`
///
/// Logs go to stderr so command output stays pipeable.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    log_subscriber(filter).init();
}

const DEFAULT_LOG_FILTER: &str = "info,printhouse=debug,sqlx=warn";

/// Formatting subscriber writing to stderr, gated by `filter` alone.
fn log_subscriber(filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}
