//! # stockroom-core: Pure Business Logic for Stockroom
//!
//! Domain types and rules for a small shop's back office. Everything here is
//! a pure function over plain data; the database and HTTP layers call in.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 stockroom-server (axum)                         │   │
//! │  │    dashboard, add/edit/delete stock, record sale, accounts      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockroom-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌──────────┐  ┌──────────────────┐ │   │
//! │  │   │  types  │  │  money  │  │   sale   │  │ access/validation│ │   │
//! │  │   │ Product │  │  Money  │  │ SalePlan │  │ policy, checks   │ │   │
//! │  │   └─────────┘  └─────────┘  └──────────┘  └──────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockroom-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleItem, User, Profile)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//! - [`catalog`] - Product form decoding
//! - [`sale`] - Sale form decoding and stock planning
//! - [`access`] - Role-based access policy
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::money::Money;
//!
//! let price = Money::parse("100").unwrap();
//! let subtotal = price * 3_i64;
//! assert_eq!(subtotal.to_string(), "300.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod catalog;
pub mod error;
pub mod money;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{authorize, Access, Operation, Requirement};
pub use catalog::{ProductDraft, ProductFields};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, ParseMoneyError};
pub use sale::{
    invoice_number, LineRequest, PlannedLine, SalePlan, SaleRequest, StockDemand, FORMSET_PREFIX,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Quantity at or below which a product is flagged as low stock.
///
/// Single source for the dashboard alert and the per-product flag.
/// The server can override it through configuration.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Blank item lines offered by the record-sale form.
pub const SALE_FORM_EXTRA_LINES: usize = 3;

/// Upper bound on item lines accepted in one sale submission.
pub const MAX_SALE_LINES: usize = 100;

/// How many recent sales the dashboard lists.
pub const RECENT_SALES_LIMIT: u32 = 10;
