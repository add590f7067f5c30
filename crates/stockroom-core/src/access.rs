//! # Access Policy
//!
//! Who may do what. A pure function over an explicit, optional principal.
//!
//! ```text
//! ┌──────────────────────────────┬─────────┬───────┬───────────┐
//! │ Operation                    │ manager │ staff │ anonymous │
//! ├──────────────────────────────┼─────────┼───────┼───────────┤
//! │ dashboard / search / receipt │    ✓    │   ✓   │   login   │
//! │ record sale                  │    ✓    │   ✓   │   login   │
//! │ add / edit / delete stock    │    ✓    │ deny  │   login   │
//! │ register user                │    ✓    │ deny  │   login   │
//! │ logout                       │    ✓    │   ✓   │   login   │
//! │ login page                   │    ✓    │   ✓   │     ✓     │
//! └──────────────────────────────┴─────────┴───────┴───────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{Principal, Role};

/// Every gated operation the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ViewDashboard,
    SearchDashboard,
    ViewSale,
    RecordSale,
    AddStock,
    EditStock,
    DeleteStock,
    RegisterUser,
    Logout,
    Login,
}

/// What an operation asks of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Anyone,
    SignedIn,
    Role(Role),
}

impl Operation {
    pub const fn requirement(&self) -> Requirement {
        match self {
            Operation::Login => Requirement::Anyone,
            Operation::ViewDashboard
            | Operation::SearchDashboard
            | Operation::ViewSale
            | Operation::RecordSale
            | Operation::Logout => Requirement::SignedIn,
            Operation::AddStock
            | Operation::EditStock
            | Operation::DeleteStock
            | Operation::RegisterUser => Requirement::Role(Role::Manager),
        }
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    /// No principal; the caller should be sent to the login page.
    LoginRequired,
    /// Signed in, but the role is not enough.
    Denied,
}

impl Access {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allowed)
    }
}

/// Decides whether `principal` may perform `operation`.
///
/// ## Example
/// ```rust
/// use stockroom_core::{authorize, Access, Operation, Principal, Role};
///
/// let staff = Principal { user_id: 2, username: "sam".into(), role: Role::Staff };
///
/// assert_eq!(authorize(Some(&staff), Operation::RecordSale), Access::Allowed);
/// assert_eq!(authorize(Some(&staff), Operation::AddStock), Access::Denied);
/// assert_eq!(authorize(None, Operation::RecordSale), Access::LoginRequired);
/// ```
pub fn authorize(principal: Option<&Principal>, operation: Operation) -> Access {
    match (operation.requirement(), principal) {
        (Requirement::Anyone, _) => Access::Allowed,
        (_, None) => Access::LoginRequired,
        (Requirement::SignedIn, Some(_)) => Access::Allowed,
        (Requirement::Role(role), Some(p)) if p.role == role => Access::Allowed,
        (Requirement::Role(_), Some(_)) => Access::Denied,
    }
}
