//! # Errors
//!
//! ```text
//!   ValidationError   one bad field ("quantity cannot be negative")
//!         │ From
//!         ▼
//!   CoreError         a rule about products or sales
//!         │ DbError::Domain
//!         ▼
//!   AppError          redirect with notice, 404 or 500 (server)
//! ```
//!
//! Messages reach shop staff verbatim, so they name the product or field
//! involved.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    /// `requested` sums every line naming the product, so A1 x 8 plus
    /// A1 x 4 against 10 on hand fails as 12 of 10.
    #[error("Not enough stock for {ref_no}: requested {requested}, available {available}")]
    InsufficientStock {
        ref_no: String,
        requested: i64,
        available: i64,
    },

    /// An item line of the sale form is unusable. `line` is 1-based.
    #[error("Item line {line}: {reason}")]
    InvalidLine { line: usize, reason: String },

    #[error("A sale cannot have more than {max} item lines")]
    TooManyLines { max: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for errors caused by what the user typed, which the server
    /// answers by sending them back to the form.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            CoreError::InsufficientStock { .. }
                | CoreError::InvalidLine { .. }
                | CoreError::TooManyLines { .. }
                | CoreError::Validation(_)
        )
    }
}

/// A single form field was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} cannot be negative")]
    Negative { field: String },

    #[error("{field} must be at most {max}")]
    TooLarge { field: String, max: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Reference number or username already taken.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Two fields that must agree do not.
    #[error("{field} does not match {other}")]
    Mismatch { field: String, other: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
