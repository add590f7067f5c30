//! # Validation Module
//!
//! Field validators for everything that arrives through a form.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (axum Form)                                    │
//! │  └── Shape only: every field arrives as an optional string              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Trimming, required/length checks                                   │
//! │  └── Number and money parsing, sign checks                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── UNIQUE (ref_no, username, invoice_number)                          │
//! │  ├── CHECK (quantity >= 0)                                              │
//! │  └── Foreign key constraints                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockroom_core::validation::{parse_price, required_text};
//!
//! assert_eq!(required_text("brand", "  Casio ", 100).unwrap(), "Casio");
//! assert_eq!(parse_price("selling_price", "").unwrap().cents(), 0);
//! ```

use crate::error::ValidationError;
use crate::money::{Money, ParseMoneyError};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Column widths shared with the schema.
pub const MAX_REF_NO_LEN: usize = 50;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_LINE_REMARK_LEN: usize = 255;
pub const MAX_SEARCH_LEN: usize = 100;

/// Upper bound for stock on hand and for a single sale line.
pub const MAX_QUANTITY: i64 = 1_000_000;
/// Upper bound for a unit price: 1,000,000,000.00.
pub const MAX_PRICE: Money = Money::from_cents(100_000_000_000);

// =============================================================================
// String Validators
// =============================================================================

/// Trims `value` and requires it to be non-empty and at most `max` chars.
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::required_text;
///
/// assert!(required_text("brand", "", 100).is_err());
/// assert!(required_text("brand", &"x".repeat(101), 100).is_err());
/// ```
pub fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    check_len(field, value, max)?;
    Ok(value.to_string())
}

/// Trims `value`; blank becomes `None`.
pub fn optional_text(field: &str, value: &str, max: usize) -> ValidationResult<Option<String>> {
    let value = value.trim();

    if value.is_empty() {
        return Ok(None);
    }

    check_len(field, value, max)?;
    Ok(Some(value.to_string()))
}

fn check_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a product reference number.
///
/// ## Rules
/// - Required, at most 50 characters
/// - No whitespace inside (it is typed into search boxes and printed on tags)
pub fn validate_ref_no(ref_no: &str) -> ValidationResult<String> {
    let ref_no = required_text("ref_no", ref_no, MAX_REF_NO_LEN)?;

    if ref_no.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "ref_no".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(ref_no)
}

/// Validates a username.
///
/// ## Rules
/// - Required, at most 150 characters
/// - Letters, digits and `@ . + - _` only
pub fn validate_username(username: &str) -> ValidationResult<String> {
    let username = required_text("username", username, MAX_USERNAME_LEN)?;

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "may contain only letters, numbers, and @/./+/-/_".to_string(),
        });
    }

    Ok(username)
}

/// Validates a new password and its confirmation.
///
/// Passwords are not trimmed.
pub fn validate_new_password(password: &str, confirm: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password != confirm {
        return Err(ValidationError::Mismatch {
            field: "confirm_password".to_string(),
            other: "password".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query string. Empty means "no filter".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    check_len("q", query, MAX_SEARCH_LEN)?;
    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Parses a price field. Blank means zero; negatives are rejected.
pub fn parse_price(field: &str, raw: &str) -> ValidationResult<Money> {
    if raw.trim().is_empty() {
        return Ok(Money::zero());
    }

    let money = Money::parse(raw).map_err(|e| money_error(field, e))?;

    if money.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if money > MAX_PRICE {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max: MAX_PRICE.to_string(),
        });
    }

    Ok(money)
}

fn money_error(field: &str, err: ParseMoneyError) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: err.to_string(),
    }
}

/// Parses a stock count. Blank means zero; negatives are rejected.
pub fn parse_stock_quantity(field: &str, raw: &str) -> ValidationResult<i64> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Ok(0);
    }

    let qty = parse_integer(field, raw)?;

    if qty < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if qty > MAX_QUANTITY {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max: MAX_QUANTITY.to_string(),
        });
    }

    Ok(qty)
}

/// Validates a quantity being sold.
///
/// ## Rules
/// - Must be positive (> 0)
/// - At most [`MAX_QUANTITY`]
pub fn validate_sale_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_QUANTITY {
        return Err(ValidationError::TooLarge {
            field: "quantity".to_string(),
            max: MAX_QUANTITY.to_string(),
        });
    }

    Ok(())
}

/// Parses a whole number, naming `field` on failure.
pub fn parse_integer(field: &str, raw: &str) -> ValidationResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a whole number".to_string(),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
