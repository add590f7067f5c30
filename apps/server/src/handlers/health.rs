//! Liveness check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use tracing::warn;

use crate::views::HealthView;
use crate::AppState;

/// `GET /health`: 200 when the database answers with an up-to-date schema,
/// 503 otherwise.
pub async fn check(State(state): State<AppState>) -> (StatusCode, Json<HealthView>) {
    let database = state.db.health_check().await;
    let migrations = match state.db.migration_status().await {
        Ok(status) => Some(status),
        Err(e) => {
            warn!(error = %e, "Could not read migration status");
            None
        }
    };

    let healthy = database && migrations.is_some_and(|m| m.is_current());
    let (status, label) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthView {
            status: label,
            database,
            migrations,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
