//! # Stockroom Server
//!
//! HTTP back office for a single shop: catalog, sale recording, accounts.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Stockroom Server                                │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐ │
//! │  │  Dashboard     │  │  Stock         │  │  Sales                     │ │
//! │  │                │  │                │  │                            │ │
//! │  │ • GET /        │  │ • add-stock    │  │ • record-sale (formset)    │ │
//! │  │ • search       │  │ • edit-stock   │  │ • sale/{id} receipt        │ │
//! │  │                │  │ • delete-stock │  │                            │ │
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘ │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐                                 │
//! │  │  Accounts      │  │  Health        │                                 │
//! │  │ • login/logout │  │ • GET /health  │                                 │
//! │  │ • register     │  │                │                                 │
//! │  └────────────────┘  └────────────────┘                                 │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │                      Infrastructure                              │   │
//! │  │  SQLite (stockroom-db)   Session JWT + argon2   Flash cookies    │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`] for the `STOCKROOM_*` environment variables.

pub mod auth;
pub mod config;
pub mod cookie;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod routes;
pub mod views;

use std::sync::Arc;

use stockroom_db::Database;

// Re-exports
pub use config::{ConfigError, ServerConfig};
pub use error::{AppError, AppResult};
pub use routes::build_router;

use crate::auth::SessionKeys;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
    pub sessions: Arc<SessionKeys>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let sessions = SessionKeys::new(&config.session_secret, config.session_lifetime_secs);
        AppState {
            db,
            config: Arc::new(config),
            sessions: Arc::new(sessions),
        }
    }
}
