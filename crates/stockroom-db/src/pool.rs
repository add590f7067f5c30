//! # Database Handle
//!
//! Opens the shop's SQLite file and hands out repositories.
//!
//! ```text
//!   DbConfig::new("./stockroom.db")          DbConfig::in_memory()
//!            │                                        │
//!            ▼                                        ▼
//!   file, WAL journal, up to N conns        one private connection,
//!   busy_timeout for queued writers         never recycled (tests, seed)
//!            │                                        │
//!            └──────────────┬─────────────────────────┘
//!                           ▼
//!                 Database { SqlitePool }  ── migrations on open
//!                           │
//!          products() ──────┼────── sales() ────── users()
//! ```
//!
//! Foreign keys are switched on for every connection: sale lines cascade
//! with their product and a deleted user leaves `sales.user_id` NULL.
//!
//! Only one writer runs at a time. A sale recording holds the write lock
//! for its whole transaction; other writers wait up to `busy_timeout`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations::{self, MigrationStatus};
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::user::UserRepository;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    /// Private to the pool's single connection; gone when it closes.
    Memory,
}

impl DbLocation {
    /// `:memory:` maps to [`DbLocation::Memory`], anything else is a file.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.as_os_str() == ":memory:" {
            DbLocation::Memory
        } else {
            DbLocation::File(path.to_path_buf())
        }
    }
}

impl std::fmt::Display for DbLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbLocation::File(path) => write!(f, "{}", path.display()),
            DbLocation::Memory => f.write_str(":memory:"),
        }
    }
}

/// Database configuration.
///
/// ## Example
/// ```rust
/// use stockroom_db::DbConfig;
///
/// let config = DbConfig::new("./stockroom.db").max_connections(8);
/// assert_eq!(config.max_connections, 8);
/// assert!(!config.is_in_memory());
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: DbLocation,

    /// Pool size for file databases. Default: 5
    pub max_connections: u32,

    /// How long a connection waits for the write lock. Default: 5 seconds
    pub busy_timeout: Duration,

    /// How long `acquire` waits for a free connection. Default: 30 seconds
    pub acquire_timeout: Duration,

    /// Apply pending migrations when opening. Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// A file database at `path`, created if missing. `":memory:"` is
    /// accepted too.
    pub fn new(path: impl AsRef<Path>) -> Self {
        DbConfig {
            location: DbLocation::from_path(path),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// A throwaway in-memory database (tests).
    pub fn in_memory() -> Self {
        DbConfig {
            location: DbLocation::Memory,
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.location == DbLocation::Memory
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match &self.location {
            DbLocation::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            // WAL needs a file.
            DbLocation::Memory => SqliteConnectOptions::new()
                .in_memory(true)
                .journal_mode(SqliteJournalMode::Memory),
        };

        options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
    }

    fn pool_options(&self) -> SqlitePoolOptions {
        let options = SqlitePoolOptions::new().acquire_timeout(self.acquire_timeout);

        if self.is_in_memory() {
            // Every connection to :memory: is its own database, so keep
            // exactly one and never let the pool retire it.
            options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options
                .max_connections(self.max_connections.max(1))
                .idle_timeout(Some(Duration::from_secs(600)))
        }
    }
}

/// Handle to the shop database.
///
/// Cheap to clone; the server keeps one in its shared state and builds
/// repositories per request:
///
/// ```rust,ignore
/// let products = state.db.products().search(&query).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database and, unless disabled, applies migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(location = %config.location, "Opening database");

        let pool = config
            .pool_options()
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            in_memory = config.is_in_memory(),
            "Database pool ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub async fn migration_status(&self) -> DbResult<MigrationStatus> {
        migrations::migration_status(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    /// True if a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);

        let status = db.migration_status().await.unwrap();
        assert!(status.is_current());
        assert!(status.applied >= 1);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let on: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(on, 1);
    }

    #[tokio::test]
    async fn test_closed_database_is_unhealthy() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[test]
    fn test_location_from_path() {
        assert_eq!(DbLocation::from_path(":memory:"), DbLocation::Memory);
        assert_eq!(
            DbLocation::from_path("./shop.db"),
            DbLocation::File(PathBuf::from("./shop.db"))
        );
        assert!(DbConfig::new(":memory:").is_in_memory());
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .busy_timeout(Duration::from_millis(250))
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
