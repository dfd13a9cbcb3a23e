//! # Catalog Commands
//!
//! Read-only product listing and search.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  list_products ──────────► active products, sort_order then name       │
//! │  products_by_category ───► same, one category                          │
//! │  categories ─────────────► distinct categories, in catalog order       │
//! │  search_products ────────► name / description / category substring    │
//! │  get_product ────────────► one active product                          │
//! │                                                                         │
//! │  Each product is returned with its resolved image URL and a            │
//! │  formatted base price.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use printhouse_core::validation::validate_search_query;
use printhouse_core::{CoreError, Product};
use printhouse_db::Database;

use crate::error::ApiError;
use crate::state::StorefrontConfig;

/// Shown when a product has no image.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-product.jpg";

/// Public path of the product image bucket under the image host.
const IMAGE_BUCKET_PATH: &str = "storage/v1/object/public/product-images";

/// Maximum search results returned.
pub const SEARCH_LIMIT: u32 = 50;

/// A product as shown in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    #[serde(flatten)]
    pub product: Product,
    /// Resolved image URL.
    pub image: String,
    /// Formatted base price, e.g. `KES 6,000.00`
    pub price_label: String,
}

impl CatalogProduct {
    pub fn new(product: Product, config: &StorefrontConfig) -> Self {
        CatalogProduct {
            image: product_image_url(
                product.image_url.as_deref(),
                config.image_base_url.as_deref(),
            ),
            price_label: config.format_price(product.base_price),
            product,
        }
    }
}

fn to_catalog(products: Vec<Product>, config: &StorefrontConfig) -> Vec<CatalogProduct> {
    products
        .into_iter()
        .map(|p| CatalogProduct::new(p, config))
        .collect()
}

/// Resolves a stored image reference to a URL.
///
/// - nothing stored → [`PLACEHOLDER_IMAGE`]
/// - absolute `http(s)` URL → unchanged
/// - `/images/foo.jpg` or `foo.jpg` → `{base}/storage/v1/object/public/product-images/foo.jpg`
///   when an image host is configured, else the path as given
pub fn product_image_url(image_path: Option<&str>, base_url: Option<&str>) -> String {
    let path = match image_path.map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => return PLACEHOLDER_IMAGE.to_string(),
    };

    if path.starts_with("http") {
        return path.to_string();
    }

    match base_url {
        Some(base) => {
            let filename = path.replacen("/images/", "", 1);
            format!(
                "{}/{}/{}",
                base.trim_end_matches('/'),
                IMAGE_BUCKET_PATH,
                filename.trim_start_matches('/')
            )
        }
        None => path.to_string(),
    }
}

/// Lists all active products.
pub async fn list_products(
    db: &Database,
    config: &StorefrontConfig,
) -> Result<Vec<CatalogProduct>, ApiError> {
    debug!("list_products command");
    let products = db.products().list_active().await?;
    Ok(to_catalog(products, config))
}

/// Gets one active product.
pub async fn get_product(
    db: &Database,
    config: &StorefrontConfig,
    id: &str,
) -> Result<CatalogProduct, ApiError> {
    debug!(id, "get_product command");

    let product = db
        .products()
        .get_active(id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

    Ok(CatalogProduct::new(product, config))
}

/// Lists active products in one category.
pub async fn products_by_category(
    db: &Database,
    config: &StorefrontConfig,
    category: &str,
) -> Result<Vec<CatalogProduct>, ApiError> {
    debug!(category, "products_by_category command");
    let products = db.products().list_by_category(category).await?;
    Ok(to_catalog(products, config))
}

/// Lists distinct categories of active products.
pub async fn categories(db: &Database) -> Result<Vec<String>, ApiError> {
    debug!("categories command");
    Ok(db.products().categories().await?)
}

/// Searches active products.
///
/// An empty query lists the catalog.
pub async fn search_products(
    db: &Database,
    config: &StorefrontConfig,
    query: &str,
) -> Result<Vec<CatalogProduct>, ApiError> {
    debug!(query, "search_products command");

    let query = validate_search_query(query)?;
    let products = db.products().search(&query, SEARCH_LIMIT).await?;

    Ok(to_catalog(products, config))
}
