//! Sale recording and receipts.

use std::collections::HashMap;

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, State};
use stockroom_core::{Operation, SaleRequest};
use tracing::info;

use crate::auth::Viewer;
use crate::error::{AppError, AppResult};
use crate::flash::{Flash, Notice, Page, SeeOther};
use crate::views::{payment_choices, FormsetView, ProductOption, ReceiptView, SaleFormView};
use crate::AppState;

const RECORD_PATH: &str = "/record-sale/";

/// `GET /record-sale/`: product options, payment methods, blank item lines.
pub async fn record_form(
    State(state): State<AppState>,
    viewer: Viewer,
    mut flash: Flash,
) -> AppResult<Page<SaleFormView>> {
    viewer.require(Operation::RecordSale)?;

    let products = state
        .db
        .products()
        .search("")
        .await?
        .iter()
        .map(|p| ProductOption::new(p, &state.config))
        .collect();

    let view = SaleFormView {
        action: RECORD_PATH,
        products,
        payment_methods: payment_choices(),
        formset: FormsetView::default(),
        notices: flash.take(),
    };
    Ok(Page::new(view, &flash))
}

/// `POST /record-sale/`
///
/// Takes the sale header plus the `items-*` formset. Any failure, including
/// insufficient stock on any line, leaves the catalog untouched and sends the
/// user back to the form.
pub async fn record(
    State(state): State<AppState>,
    viewer: Viewer,
    form: Result<Form<HashMap<String, String>>, FormRejection>,
) -> AppResult<SeeOther> {
    let principal = viewer.require(Operation::RecordSale)?;
    let Form(form) = form.map_err(|e| AppError::from(e).back_to(RECORD_PATH))?;

    let request = SaleRequest::from_form(&form).map_err(|e| AppError::from(e).back_to(RECORD_PATH))?;

    let recorded = state
        .db
        .sales()
        .record(&request, Some(principal.user_id))
        .await
        .map_err(|e| AppError::from(e).back_to(RECORD_PATH))?;

    info!(
        sale_id = recorded.sale.id,
        items = recorded.items.len(),
        total_cents = recorded.sale.total_amount_cents,
        by = %principal.username,
        "Sale recorded via form"
    );

    Ok(SeeOther::to("/").notice(Notice::success("Sale recorded successfully!")))
}

/// `GET /sale/{id}/`
pub async fn receipt(
    State(state): State<AppState>,
    viewer: Viewer,
    mut flash: Flash,
    Path(id): Path<i64>,
) -> AppResult<Page<ReceiptView>> {
    viewer.require(Operation::ViewSale)?;

    let receipt = state.db.sales().receipt(id).await?;

    let view = ReceiptView::new(&receipt, &state.config, flash.take());
    Ok(Page::new(view, &flash))
}
