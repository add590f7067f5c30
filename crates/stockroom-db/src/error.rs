//! Database errors.
//!
//! ```text
//!   sqlx::Error ──┐
//!                 ├──► DbError ──► AppError (server): notice, 404 or 500
//!   CoreError ────┘    (Domain)
//! ```
//!
//! Business rules checked inside a transaction (stock on hand, unknown
//! product on a sale line) come back as [`DbError::Domain`] so callers can
//! tell them apart from storage failures.

use stockroom_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// Lookup or update by id hit no row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// SQLite only names the column; repositories that know the value
    /// rewrite this into a `ValidationError::Duplicate`.
    #[error("Duplicate value for {field}")]
    UniqueViolation { field: String },

    /// FOREIGN KEY or CHECK constraint.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// No connection became free in time.
    #[error("Database busy")]
    Busy,

    #[error("Query failed: {0}")]
    Query(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

/// Column named in "UNIQUE constraint failed: products.ref_no".
fn unique_column(message: &str) -> Option<&str> {
    let columns = message.strip_prefix("UNIQUE constraint failed: ")?;
    let first = columns.split(',').next()?.trim();
    first.rsplit('.').next()
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::PoolTimedOut => DbError::Busy,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                if let Some(field) = unique_column(message) {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                    }
                } else if message.contains("FOREIGN KEY constraint failed")
                    || message.contains("CHECK constraint failed")
                {
                    DbError::Constraint(message.to_string())
                } else {
                    DbError::Query(message.to_string())
                }
            }
            other => DbError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_column() {
        assert_eq!(
            unique_column("UNIQUE constraint failed: products.ref_no"),
            Some("ref_no")
        );
        assert_eq!(
            unique_column("UNIQUE constraint failed: auth_user.username, auth_user.id"),
            Some("username")
        );
        assert_eq!(unique_column("CHECK constraint failed: quantity >= 0"), None);
    }

    #[test]
    fn test_domain_error_is_transparent() {
        let err: DbError = CoreError::SaleNotFound(9).into();
        assert_eq!(err.to_string(), "Sale not found: 9");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
