//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - Substring search across brand, model, reference, supplier, category
//! - Low-stock listing (quantity at or below a threshold)
//! - CRUD from a validated [`ProductDraft`]
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User types: "cas"                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pattern "%cas%" matched with LIKE (case-insensitive) against:          │
//! │  brand │ model_name │ ref_no │ supplier │ category                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Casio F-91W (A1)  ← brand matches                                      │
//! │  Seiko 5 (CAS-7)   ← ref_no matches                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::contains_pattern;
use stockroom_core::{CoreError, Product, ProductDraft, ValidationError};

const PRODUCT_COLUMNS: &str = r#"
    id, ref_no, brand, model_name, category, supplier,
    purchase_price_cents, selling_price_cents, quantity, condition, remark,
    created_at, updated_at
"#;

const SEARCH_FILTER: &str = r#"
    (?1 = '' OR brand LIKE ?2 ESCAPE '\' OR model_name LIKE ?2 ESCAPE '\'
        OR ref_no LIKE ?2 ESCAPE '\' OR supplier LIKE ?2 ESCAPE '\'
        OR category LIKE ?2 ESCAPE '\')
"#;

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CatalogSummary {
    pub products: i64,
    pub units_in_stock: i64,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let results = repo.search("casio").await?;
/// let product = repo.get_by_id(7).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products matching `query` (all products when blank),
    /// ordered by brand then model.
    pub async fn search(&self, query: &str) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, "Searching products");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {SEARCH_FILTER} \
             ORDER BY brand COLLATE NOCASE, model_name COLLATE NOCASE, id"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(query)
            .bind(contains_pattern(query))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Products at or below `threshold` units, within the same filter as
    /// [`search`](Self::search). Emptiest first.
    pub async fn low_stock(&self, query: &str, threshold: i64) -> DbResult<Vec<Product>> {
        let query = query.trim();

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {SEARCH_FILTER} AND quantity <= ?3 \
             ORDER BY quantity, brand COLLATE NOCASE, model_name COLLATE NOCASE"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(query)
            .bind(contains_pattern(query))
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;

        debug!(threshold, count = products.len(), "Low stock products");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut *conn, id).await
    }

    /// Gets a product by its reference number.
    pub async fn get_by_ref_no(&self, ref_no: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE ref_no = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(ref_no)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// A duplicate reference number is reported as a validation error.
    pub async fn insert(&self, draft: &ProductDraft) -> DbResult<Product> {
        let now = Utc::now();

        debug!(ref_no = %draft.ref_no, "Inserting product");

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                ref_no, brand, model_name, category, supplier,
                purchase_price_cents, selling_price_cents, quantity, condition, remark,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            "#,
        )
        .bind(&draft.ref_no)
        .bind(&draft.brand)
        .bind(&draft.model_name)
        .bind(&draft.category)
        .bind(&draft.supplier)
        .bind(draft.purchase_price.cents())
        .bind(draft.selling_price.cents())
        .bind(draft.quantity)
        .bind(draft.condition)
        .bind(&draft.remark)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_ref_no(e.into(), &draft.ref_no))?;

        let id = result.last_insert_rowid();
        info!(id, ref_no = %draft.ref_no, "Product added");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Overwrites every editable field of product `id`.
    pub async fn update(&self, id: i64, draft: &ProductDraft) -> DbResult<Product> {
        let now = Utc::now();

        debug!(id, ref_no = %draft.ref_no, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                ref_no = ?2,
                brand = ?3,
                model_name = ?4,
                category = ?5,
                supplier = ?6,
                purchase_price_cents = ?7,
                selling_price_cents = ?8,
                quantity = ?9,
                condition = ?10,
                remark = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&draft.ref_no)
        .bind(&draft.brand)
        .bind(&draft.model_name)
        .bind(&draft.category)
        .bind(&draft.supplier)
        .bind(draft.purchase_price.cents())
        .bind(draft.selling_price.cents())
        .bind(draft.quantity)
        .bind(draft.condition)
        .bind(&draft.remark)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_ref_no(e.into(), &draft.ref_no))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id).into());
        }

        info!(id, ref_no = %draft.ref_no, "Product updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id).into())
    }

    /// Deletes product `id` and returns the row as it was.
    ///
    /// Sale lines referencing the product are removed with it (cascade).
    pub async fn delete(&self, id: i64) -> DbResult<Product> {
        let mut tx = self.pool.begin().await?;

        let product = fetch_by_id(&mut *tx, id)
            .await?
            .ok_or(CoreError::ProductNotFound(id))?;

        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id, ref_no = %product.ref_no, "Product deleted");
        Ok(product)
    }

    /// Product count and total units on hand.
    pub async fn summary(&self) -> DbResult<CatalogSummary> {
        let summary = sqlx::query_as::<_, CatalogSummary>(
            "SELECT COUNT(*) AS products, COALESCE(SUM(quantity), 0) AS units_in_stock FROM products",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }
}

/// Reads one product on an existing connection or transaction.
pub(crate) async fn fetch_by_id(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(product)
}

fn duplicate_ref_no(err: DbError, ref_no: &str) -> DbError {
    match err {
        DbError::UniqueViolation { .. } => CoreError::from(ValidationError::Duplicate {
            field: "ref_no".to_string(),
            value: ref_no.to_string(),
        })
        .into(),
        other => other,
    }
}

// =============================================================================
// Tests
// =============================================================================
