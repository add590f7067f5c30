//! # Stockroom Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Server                                 │
//! │                                                                         │
//! │  Browser ───► HTTP (8000) ───► Handlers ───► SQLite (WAL)               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Create the first manager account with the `seed` binary.

use anyhow::Context;
use stockroom_db::{Database, DbConfig};
use stockroom_server::{build_router, AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Stockroom server...");

    // Load configuration
    let config = ServerConfig::load()?;
    info!(
        addr = %config.bind_addr,
        db_path = %config.database_path.display(),
        low_stock_threshold = config.low_stock_threshold,
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("STOCKROOM_SESSION_SECRET is not set; using the development secret");
    }

    // Connect to database (runs migrations)
    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .context("failed to open database")?;
    info!("Database ready");

    let addr = config.bind_addr;
    let app = build_router(AppState::new(db.clone(), config));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockroom=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
