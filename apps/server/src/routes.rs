//! Route table.

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{account, dashboard, health, sale, stock};
use crate::AppState;

/// Builds the application router.
///
/// ```text
/// GET       /                      dashboard (?q=)
/// GET       /search-dashboard/     dashboard tables (?q=)
/// GET|POST  /add-stock/            manager
/// GET|POST  /edit-stock/{id}/      manager
/// GET|POST  /delete-stock/{id}/    manager (GET = confirmation)
/// GET|POST  /record-sale/          staff, manager
/// GET       /sale/{id}/            receipt
/// GET|POST  /login/                anyone
/// GET       /logout/
/// GET|POST  /register/             manager
/// GET       /health                anyone
/// ```
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/search-dashboard/", get(dashboard::search))
        .route("/add-stock/", get(stock::add_form).post(stock::add))
        .route("/edit-stock/{id}/", get(stock::edit_form).post(stock::edit))
        .route(
            "/delete-stock/{id}/",
            get(stock::delete_confirm).post(stock::delete),
        )
        .route("/record-sale/", get(sale::record_form).post(sale::record))
        .route("/sale/{id}/", get(sale::receipt))
        .route("/login/", get(account::login_form).post(account::login))
        .route("/logout/", get(account::logout))
        .route(
            "/register/",
            get(account::register_form).post(account::register),
        )
        .route("/health", get(health::check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
