//! # Domain Types
//!
//! Core domain types used throughout Stockroom.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (integer)   │◄──┼── via items ────┼───│  product_id     │       │
//! │  │  ref_no (uniq)  │   │  invoice_number │   │  sale_id (FK)   │       │
//! │  │  quantity ≥ 0   │   │  payment_method │   │  quantity > 0   │       │
//! │  │  selling_price  │   │  total_amount   │   │  unit_price     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │    Profile      │   │   Principal     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  username       │──►│  role           │──►│  user + role    │       │
//! │  │  password_hash  │1:1│  manager|staff  │   │  (per request)  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every row has a surrogate integer `id` used in URLs. Products also carry a
//! human-facing unique reference number (`ref_no`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Condition
// =============================================================================

/// Physical condition of a stocked item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    New,
    Used,
}

impl Condition {
    /// Stored/wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Used => "used",
        }
    }

    /// Reads a form value, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" => Some(Condition::New),
            "used" => Some(Condition::Used),
            _ => None,
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::New
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog entry with its quantity on hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Surrogate id (used in URLs).
    pub id: i64,

    /// Reference number - unique business identifier.
    pub ref_no: String,

    pub brand: String,

    pub model_name: String,

    pub category: Option<String>,

    pub supplier: Option<String>,

    /// What the shop paid, in cents. Optional.
    pub purchase_price_cents: Option<i64>,

    /// Price charged at the counter, in cents.
    pub selling_price_cents: i64,

    /// Quantity on hand. Never negative.
    pub quantity: i64,

    pub condition: Condition,

    pub remark: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Returns the purchase price as Money, if recorded.
    #[inline]
    pub fn purchase_price(&self) -> Option<Money> {
        self.purchase_price_cents.map(Money::from_cents)
    }

    /// True when the quantity is at or below `threshold`.
    #[inline]
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.quantity <= threshold
    }

    /// `"Brand - Model"`, as shown in pickers and notices.
    pub fn label(&self) -> String {
        format!("{} - {}", self.brand, self.model_name)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer settled a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    /// Card terminal.
    Pos,
    Credit,
}

impl PaymentMethod {
    /// Every method, in the order offered by the sale form.
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Transfer,
        PaymentMethod::Pos,
        PaymentMethod::Credit,
    ];

    /// Stored/wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Pos => "pos",
            PaymentMethod::Credit => "credit",
        }
    }

    /// Human label for receipts and select boxes.
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Transfer => "Transfer",
            PaymentMethod::Pos => "POS",
            PaymentMethod::Credit => "Credit",
        }
    }

    /// Reads a form value. Accepts the stored value or the label, any case.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A recorded sale. Immutable once the recorder commits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: i64,

    /// `INV-YYYYMMDD-NNNNNN`, assigned right after insert.
    pub invoice_number: Option<String>,

    pub customer_name: Option<String>,

    pub payment_method: PaymentMethod,

    /// Recording user; NULL once that account is deleted.
    pub user_id: Option<i64>,

    pub total_amount_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line of a sale.
/// The unit price is a snapshot of the product's selling price at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub remark: Option<String>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// quantity × unit price.
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price() * self.quantity
    }
}

// =============================================================================
// Users & Roles
// =============================================================================

/// The single authorization axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Staff,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Staff => "staff",
        }
    }

    /// Reads a form value, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "manager" => Some(Role::Manager),
            "staff" => Some(Role::Staff),
            _ => None,
        }
    }

    /// Role given to a fresh profile.
    pub const fn default_for(is_superuser: bool) -> Self {
        if is_superuser {
            Role::Manager
        } else {
            Role::Staff
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A login account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    /// PHC string. Never serialized into views.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// Per-user settings. Exactly one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The authenticated actor behind a request.
///
/// Built fresh per request from the user and profile rows, so it always
/// carries a role. "Anonymous" is `Option::<Principal>::None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user: &User, profile: &Profile) -> Self {
        Principal {
            user_id: user.id,
            username: user.username.clone(),
            role: profile.role,
        }
    }

    #[inline]
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(quantity: i64) -> Product {
        Product {
            id: 1,
            ref_no: "A1".to_string(),
            brand: "Casio".to_string(),
            model_name: "F-91W".to_string(),
            category: None,
            supplier: None,
            purchase_price_cents: None,
            selling_price_cents: 10000,
            quantity,
            condition: Condition::New,
            remark: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_stock_is_inclusive() {
        assert!(product(5).is_low_stock(5));
        assert!(product(0).is_low_stock(5));
        assert!(!product(6).is_low_stock(5));
    }

    #[test]
    fn test_product_label() {
        assert_eq!(product(1).label(), "Casio - F-91W");
        assert_eq!(product(1).selling_price().to_string(), "100.00");
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(PaymentMethod::parse("Cash"), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::parse("POS"), Some(PaymentMethod::Pos));
        assert_eq!(PaymentMethod::parse(" credit "), Some(PaymentMethod::Credit));
        assert_eq!(PaymentMethod::parse("cheque"), None);
        assert_eq!(PaymentMethod::Pos.to_string(), "POS");
    }

    #[test]
    fn test_role_defaults() {
        assert_eq!(Role::default_for(true), Role::Manager);
        assert_eq!(Role::default_for(false), Role::Staff);
        assert_eq!(Role::parse("Manager"), Some(Role::Manager));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_sale_item_subtotal() {
        let item = SaleItem {
            id: 1,
            sale_id: 1,
            product_id: 1,
            quantity: 3,
            unit_price_cents: 10000,
            remark: None,
        };
        assert_eq!(item.subtotal().cents(), 30000);
    }

    #[test]
    fn test_user_hash_not_serialized() {
        let user = User {
            id: 1,
            username: "ada".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
    }
}
