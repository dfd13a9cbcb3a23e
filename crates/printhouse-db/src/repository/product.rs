//! # Product Repository
//!
//! Catalog reads and writes.
//!
//! ## Listing Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products (is_active = 1)                                               │
//! │                                                                         │
//! │  sort_order │ category   │ name                                         │
//! │  ───────────┼────────────┼──────────────────                            │
//! │       1     │ cards      │ Business Cards      ◄── first on the page   │
//! │       2     │ flyers     │ Flyers                                       │
//! │       3     │ banners    │ Banners                                      │
//! │      ...    │ ...        │ ...                                          │
//! │                                                                         │
//! │  Inactive rows are never listed, fetched for the cart, or searched.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Variants and pricing rules live in JSON text columns and are decoded
//! through [`ProductRow`].

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use printhouse_core::{Money, Product, Variant};

const PRODUCT_COLUMNS: &str = "id, category, name, description, base_price_cents, image_url, \
     variants, pricing_rules, is_active, sort_order, created_at, updated_at";

/// Raw `products` row.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    category: String,
    name: String,
    description: Option<String>,
    base_price_cents: i64,
    image_url: Option<String>,
    variants: String,
    pricing_rules: String,
    is_active: bool,
    sort_order: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let variants: Vec<Variant> = serde_json::from_str(&row.variants)?;
        let pricing_rules = serde_json::from_str(&row.pricing_rules)?;

        Ok(Product {
            id: row.id,
            category: row.category,
            name: row.name,
            description: row.description,
            base_price: Money::from_cents(row.base_price_cents),
            image_url: row.image_url,
            variants,
            pricing_rules,
            is_active: row.is_active,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> DbResult<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products in catalog order.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 ORDER BY sort_order, name"
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        debug!(count = rows.len(), "Listed active products");
        into_products(rows)
    }

    /// Gets an active product by ID.
    ///
    /// Returns `None` for unknown or deactivated products; this is the
    /// lookup the cart uses.
    pub async fn get_active(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND is_active = 1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Gets a product by ID regardless of its active flag.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Lists active products in one category, in catalog order.
    pub async fn list_by_category(&self, category: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE category = ?1 AND is_active = 1 ORDER BY sort_order, name"
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        into_products(rows)
    }

    /// Distinct categories of active products, ordered by where they first
    /// appear in the catalog.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT category FROM products
            WHERE is_active = 1
            GROUP BY category
            ORDER BY MIN(sort_order), category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Case-insensitive substring search over name, description and
    /// category.
    ///
    /// An empty query lists the whole active catalog.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            let mut products = self.list_active().await?;
            products.truncate(limit as usize);
            return Ok(products);
        }

        let sql = format!(
            r#"SELECT {PRODUCT_COLUMNS} FROM products
            WHERE is_active = 1
            AND (
                name LIKE ?1 ESCAPE '\'
                OR description LIKE ?1 ESCAPE '\'
                OR category LIKE ?1 ESCAPE '\'
            )
            ORDER BY sort_order, name
            LIMIT ?2"#
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(like_pattern(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Search returned products");
        into_products(rows)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - ID already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        let variants = serde_json::to_string(&product.variants)?;
        let pricing_rules = serde_json::to_string(&product.pricing_rules)?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, category, name, description, base_price_cents, image_url,
                variants, pricing_rules, is_active, sort_order, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.category)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.base_price.cents())
        .bind(&product.image_url)
        .bind(variants)
        .bind(pricing_rules)
        .bind(product.is_active)
        .bind(product.sort_order)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates an existing product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let variants = serde_json::to_string(&product.variants)?;
        let pricing_rules = serde_json::to_string(&product.pricing_rules)?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                category = ?2,
                name = ?3,
                description = ?4,
                base_price_cents = ?5,
                image_url = ?6,
                variants = ?7,
                pricing_rules = ?8,
                is_active = ?9,
                sort_order = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.category)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.base_price.cents())
        .bind(&product.image_url)
        .bind(variants)
        .bind(pricing_rules)
        .bind(product.is_active)
        .bind(product.sort_order)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Old orders keep their snapshot of the product.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
