//! # API Error Type
//!
//! Unified error type for storefront commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Storefront                         │
//! │                                                                         │
//! │  Command Function  Result<T, ApiError>                                  │
//! │         │                                                               │
//! │         ├── DbError ─────────────┐                                     │
//! │         ├── CoreError ───────────┤                                     │
//! │         ├── ValidationError ─────┼──► ApiError { code, message,       │
//! │         ├── PaymentError ────────┤                 retryable }        │
//! │         └── CheckoutError ───────┘                                     │
//! │                                                                         │
//! │  The caller shows `message` and offers a retry when `retryable`.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cart persistence failures never reach this type; the cart store logs
//! them and keeps going.

use serde::Serialize;
use thiserror::Error;

use printhouse_core::{CoreError, ValidationError};
use printhouse_db::DbError;

use crate::commands::checkout::CheckoutError;
use crate::payments::PaymentError;
use crate::state::{ConfigError, StorageError};

/// API error returned from storefront commands.
///
/// ```json
/// {
///   "code": "EMPTY_CART",
///   "message": "Your cart is empty",
///   "retryable": false
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Whether the same request may succeed if tried again
    pub retryable: bool,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Database operation failed (500)
    DatabaseError,

    /// Checkout attempted with an empty cart
    EmptyCart,

    /// A checkout is already running
    CheckoutInProgress,

    /// Payment initiation failed
    PaymentError,

    /// Internal server error (500)
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            retryable: false,
        }
    }

    /// Marks the error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        let transient = err.is_transient();
        let api = match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::validation(format!(
                "{} '{}' already exists",
                field, value
            )),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::ConstraintViolation(message) => {
                tracing::error!("Constraint violation: {}", message);
                ApiError::validation("Invalid data")
            }
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Could not reach the order database")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Serialization(e) | DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        };

        if transient {
            api.retryable()
        } else {
            api
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::EmptyCart => ApiError::new(ErrorCode::EmptyCart, err.to_string()),
            CoreError::QuantityTooLarge { .. } => ApiError::validation(err.to_string()),
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        let retryable = !matches!(err, PaymentError::InvalidAmount(_));
        let api = ApiError::new(ErrorCode::PaymentError, err.to_string());
        if retryable {
            api.retryable()
        } else {
            api
        }
    }
}

/// Converts checkout aborts to API errors.
///
/// Data store details are logged at the abort site; the customer sees a
/// plain message naming what to do next.
impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        let retryable = err.is_retryable();
        let api = match err {
            CheckoutError::EmptyCart => ApiError::new(ErrorCode::EmptyCart, "Your cart is empty"),
            CheckoutError::InProgress => ApiError::new(
                ErrorCode::CheckoutInProgress,
                "Your order is already being processed",
            ),
            CheckoutError::Validation(e) => ApiError::from(e),
            CheckoutError::Customer(_) | CheckoutError::OrderWrite(_) => ApiError::new(
                ErrorCode::DatabaseError,
                "We couldn't place your order. Please try again.",
            ),
            CheckoutError::LineWrite { order_number, .. } => ApiError::new(
                ErrorCode::DatabaseError,
                format!(
                    "We couldn't save the items for order {}. Please try again.",
                    order_number
                ),
            ),
            CheckoutError::Payment { order_number, source } => ApiError::new(
                ErrorCode::PaymentError,
                format!("Payment for order {} failed: {}", order_number, source),
            ),
            CheckoutError::PaymentRecord { order_number, .. } => ApiError::new(
                ErrorCode::DatabaseError,
                format!(
                    "Payment for order {} was sent but could not be recorded. Please contact us.",
                    order_number
                ),
            ),
        };

        ApiError { retryable, ..api }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Startup Error
// =============================================================================

/// Failures while booting the storefront binary.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Cart storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Api(#[from] ApiError),
}
