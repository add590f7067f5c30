//! Manager-only catalog forms.
//!
//! ```text
//! GET  /add-stock/            empty form
//! POST /add-stock/            ProductFields ─► ProductDraft ─► insert ─► 303 /
//! GET  /edit-stock/{id}/      form prefilled from the product
//! POST /edit-stock/{id}/      ProductFields ─► ProductDraft ─► update ─► 303 /
//! GET  /delete-stock/{id}/    confirmation view
//! POST /delete-stock/{id}/    delete (cascades to sale lines) ─► 303 /
//! ```
//!
//! Validation failures and duplicate reference numbers go back to the form
//! with an error notice.

use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, State};
use stockroom_core::{CoreError, Operation, Product, ProductFields};
use tracing::info;

use crate::auth::Viewer;
use crate::error::{AppError, AppResult};
use crate::flash::{Flash, Notice, Page, SeeOther};
use crate::views::{condition_choices, DeleteConfirmView, ProductFormView, ProductRow, DELETE_WARNING};
use crate::AppState;

const ADD_PATH: &str = "/add-stock/";

fn edit_path(id: i64) -> String {
    format!("/edit-stock/{id}/")
}

fn delete_path(id: i64) -> String {
    format!("/delete-stock/{id}/")
}

async fn load_product(state: &AppState, id: i64) -> AppResult<Product> {
    state
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(id).into())
}

// =============================================================================
// Add
// =============================================================================

/// `GET /add-stock/`
pub async fn add_form(viewer: Viewer, mut flash: Flash) -> AppResult<Page<ProductFormView>> {
    viewer.require(Operation::AddStock)?;

    let view = ProductFormView {
        action: ADD_PATH.to_string(),
        product_id: None,
        fields: ProductFields::default(),
        conditions: condition_choices(),
        notices: flash.take(),
    };
    Ok(Page::new(view, &flash))
}

/// `POST /add-stock/`
pub async fn add(
    State(state): State<AppState>,
    viewer: Viewer,
    form: Result<Form<ProductFields>, FormRejection>,
) -> AppResult<SeeOther> {
    let principal = viewer.require(Operation::AddStock)?;
    let Form(fields) = form.map_err(|e| AppError::from(e).back_to(ADD_PATH))?;

    let draft = fields
        .validate()
        .map_err(|e| AppError::from(e).back_to(ADD_PATH))?;

    let product = state
        .db
        .products()
        .insert(&draft)
        .await
        .map_err(|e| AppError::from(e).back_to(ADD_PATH))?;

    info!(
        product_id = product.id,
        ref_no = %product.ref_no,
        quantity = product.quantity,
        by = %principal.username,
        "Stock added"
    );

    Ok(SeeOther::to("/").notice(Notice::success(format!(
        "Stock added successfully for {}.",
        product.label()
    ))))
}

// =============================================================================
// Edit
// =============================================================================

/// `GET /edit-stock/{id}/`
pub async fn edit_form(
    State(state): State<AppState>,
    viewer: Viewer,
    mut flash: Flash,
    Path(id): Path<i64>,
) -> AppResult<Page<ProductFormView>> {
    viewer.require(Operation::EditStock)?;
    let product = load_product(&state, id).await?;

    let view = ProductFormView {
        action: edit_path(id),
        product_id: Some(id),
        fields: ProductFields::from_product(&product),
        conditions: condition_choices(),
        notices: flash.take(),
    };
    Ok(Page::new(view, &flash))
}

/// `POST /edit-stock/{id}/`
pub async fn edit(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    form: Result<Form<ProductFields>, FormRejection>,
) -> AppResult<SeeOther> {
    let principal = viewer.require(Operation::EditStock)?;
    let Form(fields) = form.map_err(|e| AppError::from(e).back_to(edit_path(id)))?;

    let draft = fields
        .validate()
        .map_err(|e| AppError::from(e).back_to(edit_path(id)))?;

    let product = state
        .db
        .products()
        .update(id, &draft)
        .await
        .map_err(|e| AppError::from(e).back_to(edit_path(id)))?;

    info!(
        product_id = product.id,
        ref_no = %product.ref_no,
        quantity = product.quantity,
        by = %principal.username,
        "Stock updated"
    );

    Ok(SeeOther::to("/").notice(Notice::success("Stock updated successfully.")))
}

// =============================================================================
// Delete
// =============================================================================

/// `GET /delete-stock/{id}/`
pub async fn delete_confirm(
    State(state): State<AppState>,
    viewer: Viewer,
    mut flash: Flash,
    Path(id): Path<i64>,
) -> AppResult<Page<DeleteConfirmView>> {
    viewer.require(Operation::DeleteStock)?;
    let product = load_product(&state, id).await?;

    let view = DeleteConfirmView {
        action: delete_path(id),
        product: ProductRow::new(&product, &state.config, true),
        warning: DELETE_WARNING,
        notices: flash.take(),
    };
    Ok(Page::new(view, &flash))
}

/// `POST /delete-stock/{id}/`
pub async fn delete(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<SeeOther> {
    let principal = viewer.require(Operation::DeleteStock)?;

    let product = state.db.products().delete(id).await?;

    info!(
        product_id = product.id,
        ref_no = %product.ref_no,
        by = %principal.username,
        "Stock deleted"
    );

    Ok(SeeOther::to("/").notice(Notice::success(format!(
        "{} deleted successfully.",
        product.label()
    ))))
}
