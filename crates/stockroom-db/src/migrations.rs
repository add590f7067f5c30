//! Schema migrations, embedded from `migrations/sqlite` at compile time.
//!
//! ```text
//!   001_initial_schema.sql
//!     users ─1:1─ profiles
//!     products ─1:N─ sale_items ─N:1─ sales ─N:1─ users (nullable)
//! ```
//!
//! New schema changes go in a new `NNN_description.sql` file; applied files
//! are never edited, sqlx checksums them.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// How far the open database is behind the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub embedded: usize,
    pub applied: usize,
}

impl MigrationStatus {
    pub fn pending(&self) -> usize {
        self.embedded.saturating_sub(self.applied)
    }

    pub fn is_current(&self) -> bool {
        self.pending() == 0
    }
}

/// Applies whatever is pending. Safe to call on every start.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let before = migration_status(pool).await.ok();
    MIGRATOR.run(pool).await?;

    match before {
        Some(status) if status.is_current() => debug!("Schema up to date"),
        Some(status) => info!(applied = status.pending(), "Applied migrations"),
        None => info!(applied = MIGRATOR.migrations.len(), "Created schema"),
    }
    Ok(())
}

/// Fails on a database that has never been migrated (no `_sqlx_migrations`).
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: usize::try_from(applied).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_never_negative() {
        let status = MigrationStatus { embedded: 1, applied: 3 };
        assert_eq!(status.pending(), 0);
        assert!(status.is_current());

        let status = MigrationStatus { embedded: 2, applied: 1 };
        assert_eq!(status.pending(), 1);
        assert!(!status.is_current());
    }
}
