//! # Validation Module
//!
//! Input validation for cart operations and the checkout form.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser form                                                 │
//! │  └── required / type="email" / type="tel"                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Storefront command (Rust)                                    │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: quantities, phone numbers, contact details           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE customer phone, UNIQUE order number                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use printhouse_core::validation::{normalize_phone, validate_quantity};
//!
//! validate_quantity(100).unwrap();
//! assert_eq!(normalize_phone("0712 345 678").unwrap(), "254712345678");
//! ```

use crate::error::ValidationError;
use crate::types::CheckoutForm;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Kenyan country calling code.
const COUNTRY_CODE: &str = "254";

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line item quantity.
///
/// ## Rules
/// - Must be positive (≥ 1)
/// - Must not exceed [`MAX_ITEM_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Trims a required text field and checks its length.
fn required_text(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }
    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates a customer's full name. Returns it trimmed.
pub fn validate_full_name(name: &str) -> ValidationResult<String> {
    required_text("full name", name, 2, 120)
}

/// Validates a delivery address. Returns it trimmed.
pub fn validate_address(address: &str) -> ValidationResult<String> {
    required_text("address", address, 3, 300)
}

/// Validates a delivery city. Returns it trimmed.
pub fn validate_city(city: &str) -> ValidationResult<String> {
    required_text("city", city, 2, 80)
}

/// Validates an email address. Returns it trimmed and lowercased.
///
/// Deliberately loose: one `@`, a non-empty local part, a dotted domain
/// and no whitespace.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = required_text("email", email, 3, 254)?.to_lowercase();

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing '@'"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must look like name@example.com"));
    }

    let dotted = domain
        .split('.')
        .filter(|part| !part.is_empty())
        .count()
        >= 2;
    if !dotted || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must look like example.com"));
    }

    Ok(email)
}

/// Normalises a Kenyan phone number to the `2547XXXXXXXX` form M-Pesa
/// expects.
///
/// Accepts `0712345678`, `712345678`, `+254 712 345 678` and
/// `254-712-345-678`.
pub fn normalize_phone(phone: &str) -> ValidationResult<String> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '+'))
        .collect();

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    let normalized = match digits.len() {
        12 if digits.starts_with(COUNTRY_CODE) => digits,
        10 if digits.starts_with('0') => format!("{}{}", COUNTRY_CODE, &digits[1..]),
        9 if digits.starts_with('7') || digits.starts_with('1') => {
            format!("{}{}", COUNTRY_CODE, digits)
        }
        _ => {
            return Err(ValidationError::InvalidFormat {
                field: "phone".to_string(),
                reason: "must be a Kenyan number like 0712 345 678".to_string(),
            })
        }
    };

    Ok(normalized)
}

/// Validates optional free-text order notes. Blank notes become `None`.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    match notes.map(str::trim) {
        None | Some("") => Ok(None),
        Some(n) if n.chars().count() > 1000 => Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: 1000,
        }),
        Some(n) => Ok(Some(n.to_string())),
    }
}

/// Validates a catalog search query.
///
/// Empty is allowed (matches everything). Returns the trimmed query.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Checkout Form
// =============================================================================

/// Validates the whole checkout form.
///
/// Returns a cleaned copy: fields trimmed, email lowercased, phone
/// normalised, blank notes dropped. Stops at the first invalid field.
pub fn validate_checkout_form(form: &CheckoutForm) -> ValidationResult<CheckoutForm> {
    Ok(CheckoutForm {
        full_name: validate_full_name(&form.full_name)?,
        email: validate_email(&form.email)?,
        phone: normalize_phone(&form.phone)?,
        address: validate_address(&form.address)?,
        city: validate_city(&form.city)?,
        notes: validate_notes(form.notes.as_deref())?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
