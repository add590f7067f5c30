//! # Repository Module
//!
//! Database repository implementations for Stockroom.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  db.products().search("casio")                                  │
//! │       ▼                                                                 │
//! │  ProductRepository / SaleRepository / UserRepository                    │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog CRUD, search, low stock
//! - [`SaleRepository`](sale::SaleRepository) - Transactional recording, receipts, recent sales
//! - [`UserRepository`](user::UserRepository) - Accounts and profiles

pub mod product;
pub mod sale;
pub mod user;

/// Builds a `LIKE` pattern matching `query` anywhere, escaping wildcards.
///
/// Use with `ESCAPE '\'`. SQLite `LIKE` is case-insensitive for ASCII.
pub(crate) fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::contains_pattern;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("casio"), "%casio%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }
}
