//! Dashboard and its live search.

use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;
use stockroom_core::validation::validate_search_query;
use stockroom_core::{Operation, Principal, RECENT_SALES_LIMIT};
use tracing::debug;

use crate::auth::Viewer;
use crate::error::{AppError, AppResult};
use crate::flash::{Flash, Page};
use crate::views::{DashboardTables, DashboardView, ProductRow, SaleRow, SummaryView, ViewerView};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// `GET /`
pub async fn index(
    State(state): State<AppState>,
    viewer: Viewer,
    mut flash: Flash,
    Query(params): Query<SearchParams>,
) -> AppResult<Page<DashboardView>> {
    let principal = viewer.require(Operation::ViewDashboard)?;
    let query = validate_search_query(&params.q).map_err(|e| AppError::from(e).back_to("/"))?;

    let (products, recent_sales) = tables(&state, principal, &query).await?;

    let low_stock = state
        .db
        .products()
        .low_stock(&query, state.config.low_stock_threshold)
        .await?
        .iter()
        .map(|p| ProductRow::new(p, &state.config, principal.is_manager()))
        .collect();

    let summary = SummaryView::new(
        state.db.products().summary().await?,
        state.db.sales().count().await?,
    );

    let view = DashboardView {
        viewer: ViewerView::from(principal),
        query,
        products,
        recent_sales,
        low_stock,
        low_stock_threshold: state.config.low_stock_threshold,
        summary,
        notices: flash.take(),
    };

    Ok(Page::new(view, &flash))
}

/// `GET /search-dashboard/`: just the product and sales tables.
pub async fn search(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<DashboardTables>> {
    let principal = viewer.require(Operation::SearchDashboard)?;
    let query = validate_search_query(&params.q)?;

    let (products, recent_sales) = tables(&state, principal, &query).await?;
    debug!(query = %query, products = products.len(), sales = recent_sales.len(), "Dashboard search");

    Ok(Json(DashboardTables {
        query,
        role: principal.role,
        products,
        recent_sales,
    }))
}

async fn tables(
    state: &AppState,
    principal: &Principal,
    query: &str,
) -> AppResult<(Vec<ProductRow>, Vec<SaleRow>)> {
    let products = state
        .db
        .products()
        .search(query)
        .await?
        .iter()
        .map(|p| ProductRow::new(p, &state.config, principal.is_manager()))
        .collect();

    let sales = state
        .db
        .sales()
        .recent(query, RECENT_SALES_LIMIT)
        .await?
        .iter()
        .map(|s| SaleRow::new(s, &state.config))
        .collect();

    Ok((products, sales))
}
