//! # Customer Repository
//!
//! Customers are keyed by normalised phone number. Checkout upserts the
//! contact details it was given; lifetime counters are left to back-office
//! tooling.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use printhouse_core::{Customer, CustomerUpsert, Money};

const CUSTOMER_COLUMNS: &str = "id, phone, name, email, address, notes, total_orders, \
     total_spent_cents, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    phone: String,
    name: Option<String>,
    email: Option<String>,
    address: Option<String>,
    notes: Option<String>,
    total_orders: i64,
    total_spent_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            phone: row.phone,
            name: row.name,
            email: row.email,
            address: row.address,
            notes: row.notes,
            total_orders: row.total_orders,
            total_spent: Money::from_cents(row.total_spent_cents),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a customer, or refreshes the contact details of the one
    /// already holding this phone number.
    ///
    /// ```text
    /// INSERT ... ON CONFLICT(phone) DO UPDATE
    ///   name/email/address/notes ← new value, or keep the old one if NULL
    ///   total_orders/total_spent ← untouched
    /// ```
    pub async fn upsert(&self, details: &CustomerUpsert) -> DbResult<Customer> {
        debug!(phone = %details.phone, "Upserting customer");

        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO customers (
                id, phone, name, email, address, notes,
                total_orders, total_spent_cents, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, ?7, ?7)
            ON CONFLICT (phone) DO UPDATE SET
                name = COALESCE(excluded.name, customers.name),
                email = COALESCE(excluded.email, customers.email),
                address = COALESCE(excluded.address, customers.address),
                notes = COALESCE(excluded.notes, customers.notes),
                updated_at = excluded.updated_at
            RETURNING {CUSTOMER_COLUMNS}
            "#
        );

        let row: CustomerRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(&details.phone)
            .bind(&details.name)
            .bind(&details.email)
            .bind(&details.address)
            .bind(&details.notes)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    /// Gets a customer by phone number (already normalised).
    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1");
        let row: Option<CustomerRow> = sqlx::query_as(&sql)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Customer::from))
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        let row: Option<CustomerRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Customer::from))
    }

    /// Counts customers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
