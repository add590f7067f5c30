//! Request handlers, one module per area of the back office.
//!
//! Every handler starts with `viewer.require(Operation::..)`, so the access
//! policy in `stockroom_core::access` is the only place roles are checked.

pub mod account;
pub mod dashboard;
pub mod health;
pub mod sale;
pub mod stock;
