//! # Catalog Seeder
//!
//! Populates the database with the print shop's catalog.
//!
//! ## Usage
//! ```bash
//! # Seed ./printhouse_dev.db
//! cargo run -p printhouse-db --bin seed
//!
//! # Specify database path
//! cargo run -p printhouse-db --bin seed -- --db ./data/printhouse.db
//! ```
//!
//! Prices are per unit in KES. Seeding is skipped if the catalog already
//! has products.

use chrono::Utc;
use printhouse_core::{Money, Product, Variant};
use printhouse_db::{generate_product_id, Database, DbConfig};
use std::env;

/// (category, name, description, base price, image, variants)
type CatalogEntry = (
    &'static str,
    &'static str,
    &'static str,
    i64,
    &'static str,
    &'static [(&'static str, &'static str, i64, Option<&'static str>)],
);

const CATALOG: &[CatalogEntry] = &[
    (
        "cards",
        "Business Cards",
        "Premium 350gsm business cards, single or double sided.",
        14,
        "/images/cards.jpg",
        &[
            ("standard", "Standard Matte", 14, None),
            ("spotuv", "Spot UV", 24, Some("/images/cards-spotuv.jpg")),
            ("folded", "Folded", 20, Some("/images/cards-folded.jpg")),
        ],
    ),
    (
        "flyers",
        "Flyers",
        "Full colour flyers on 130gsm gloss.",
        35,
        "/images/flyers.jpg",
        &[("a4", "A4", 35, None), ("a5", "A5", 15, None), ("a6", "A6", 10, None)],
    ),
    (
        "banners",
        "Banners",
        "Roll-up, X-banner, door frame, backdrop and teardrop banners with stands.",
        6000,
        "/images/banners.jpg",
        &[
            ("rollup", "Roll-up Banner", 6000, None),
            ("xbanner", "X-Banner", 5800, None),
            ("doorframe", "Door Frame Banner", 7500, None),
            ("backdrop", "Backdrop", 27000, None),
            ("teardrop", "Teardrop Banner", 15400, None),
        ],
    ),
    (
        "stickers",
        "Stickers",
        "Vinyl, reflective and magnetic stickers, priced per square metre.",
        1380,
        "/images/stickers.jpg",
        &[
            ("vinyl", "Vinyl", 1380, None),
            ("reflective", "Reflective", 1800, None),
            ("magnet", "Magnetic", 1150, None),
        ],
    ),
    (
        "mugs",
        "Mugs & Bottles",
        "Personalised mugs and bottles with wrap-around printing.",
        500,
        "/images/mugs-white.jpg",
        &[
            ("standard", "Standard White Mug", 500, Some("/images/mugs-white.jpg")),
            ("magic", "Magic Mug", 800, Some("/images/mugs-magic.jpg")),
            ("travel", "Travel Mug", 1050, Some("/images/mugs-travel.jpg")),
            ("bottle", "Water Bottle", 750, Some("/images/mugs-bottle.jpg")),
        ],
    ),
    (
        "apparel",
        "Apparel",
        "Branded T-shirts, hoodies and polo shirts.",
        580,
        "/images/apparel.jpg",
        &[
            ("tshirt", "T-Shirt", 580, Some("/images/apparel.jpg")),
            ("hoodie", "Hoodie", 1500, Some("/images/apparel-hoodie.jpg")),
            ("polo", "Polo Shirt", 800, Some("/images/apparel-polo.jpg")),
        ],
    ),
    (
        "stationery",
        "Office Stationery",
        "Receipt books, calendars and invoice books.",
        500,
        "/images/stationery.jpg",
        &[
            ("receipt", "Receipt Book", 500, None),
            ("calendar", "Calendar", 90, None),
            ("invoice", "Invoice Book", 500, None),
        ],
    ),
    (
        "stamps",
        "Stamps & Seals",
        "Company stamps, self-inking stamps, daters and embossing seals.",
        1500,
        "/images/stamp-rubber.jpg",
        &[
            ("rubber", "Rubber Stamp", 1500, Some("/images/stamp-rubber.jpg")),
            ("self", "Self-Inking Stamp", 2500, Some("/images/stamp-self.jpg")),
            ("dater", "Dater Stamp", 3500, Some("/images/stamp-dater.jpg")),
            ("seal", "Embossing Seal", 5500, Some("/images/stamp-seal.jpg")),
        ],
    ),
    (
        "branding",
        "Vehicle Branding",
        "Full and partial vehicle wraps and window tinting.",
        25000,
        "/images/car-partial.jpg",
        &[
            ("full", "Full Wrap", 45000, Some("/images/car-full.jpg")),
            ("partial", "Partial Wrap", 25000, Some("/images/car-partial.jpg")),
            ("tint", "Window Tint", 8000, Some("/images/car-tint.jpg")),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./printhouse_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Printhouse Catalog Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./printhouse_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Printhouse Catalog Seeder");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut inserted = 0;
    for (index, entry) in CATALOG.iter().enumerate() {
        let product = build_product(entry, index as i64 + 1);

        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
            continue;
        }

        println!(
            "  + {:<20} from {} ({} variants)",
            product.name,
            product.base_price,
            product.variants.len()
        );
        inserted += 1;
    }

    println!();
    println!("✓ Seeded {} products", inserted);
    println!("  Categories: {}", db.products().categories().await?.join(", "));

    Ok(())
}

/// Builds a catalog product from a seed entry.
fn build_product(entry: &CatalogEntry, sort_order: i64) -> Product {
    let (category, name, description, base, image, variants) = *entry;
    let now = Utc::now();

    Product {
        id: generate_product_id(),
        category: category.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        base_price: Money::from_major(base),
        image_url: Some(image.to_string()),
        variants: variants
            .iter()
            .map(|(tag, label, price, image)| Variant {
                variant_type: tag.to_string(),
                label: label.to_string(),
                price: Money::from_major(*price),
                image: image.map(str::to_string),
            })
            .collect(),
        pricing_rules: serde_json::Value::Null,
        is_active: true,
        sort_order,
        created_at: now,
        updated_at: now,
    }
}
