//! # Sale Repository
//!
//! Records sales and reads them back for receipts and the dashboard.
//!
//! ## Recording
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  record() - ONE TRANSACTION                             │
//! │                                                                         │
//! │  1. INSERT    sales row (total 0, no invoice yet); this takes the       │
//! │               SQLite write lock, so the reads below are current         │
//! │  2. READ      every product the request names                           │
//! │  3. PLAN      SalePlan::build: price lines, sum demand per product,     │
//! │               reject if demand > quantity on hand                       │
//! │  4. INSERT    one sale_items row per accepted line                      │
//! │  5. DECREMENT per product:                                              │
//! │                 UPDATE products SET quantity = quantity - n             │
//! │                 WHERE id = ? AND quantity >= n                          │
//! │               0 rows → someone sold it first → InsufficientStock        │
//! │  6. FINALIZE  invoice number + total on the sales row                   │
//! │  7. COMMIT                                                              │
//! │                                                                         │
//! │  Any error before 7 drops the transaction: nothing is written.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::contains_pattern;
use crate::repository::product::fetch_by_id;
use stockroom_core::{
    invoice_number, CoreError, Money, PaymentMethod, Sale, SaleItem, SalePlan, SaleRequest,
};

const SALE_COLUMNS: &str = r#"
    id, invoice_number, customer_name, payment_method, user_id, total_amount_cents, created_at
"#;

// =============================================================================
// Read Models
// =============================================================================

/// A committed sale with the rows written for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedSale {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

/// One row of the dashboard's recent-sales table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SaleSummary {
    pub id: i64,
    pub invoice_number: Option<String>,
    pub customer_name: Option<String>,
    pub payment_method: PaymentMethod,
    pub total_amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub username: Option<String>,
    pub item_count: i64,
}

impl SaleSummary {
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

/// A sale line joined with the product it sold.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ReceiptLine {
    pub id: i64,
    pub product_id: i64,
    pub ref_no: String,
    pub brand: String,
    pub model_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub remark: Option<String>,
}

impl ReceiptLine {
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    pub fn subtotal(&self) -> Money {
        self.unit_price() * self.quantity
    }
}

/// Everything a receipt shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    /// Recording user, if the account still exists.
    pub username: Option<String>,
    pub lines: Vec<ReceiptLine>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale, all or nothing.
    ///
    /// ## Errors
    /// - `DbError::Domain(CoreError::InsufficientStock)` when any product's
    ///   summed demand exceeds its quantity
    /// - `DbError::Domain(CoreError::InvalidLine)` for an unknown product
    ///
    /// On any error the catalog and the sales tables are unchanged.
    pub async fn record(
        &self,
        request: &SaleRequest,
        user_id: Option<i64>,
    ) -> DbResult<RecordedSale> {
        debug!(
            lines = request.lines.len(),
            method = request.payment_method.as_str(),
            "Recording sale"
        );

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let sale_id = sqlx::query(
            r#"
            INSERT INTO sales (customer_name, payment_method, user_id, total_amount_cents, created_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
        )
        .bind(&request.customer_name)
        .bind(request.payment_method)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let mut products = Vec::with_capacity(request.lines.len());
        for id in request.product_ids() {
            if let Some(product) = fetch_by_id(&mut *tx, id).await? {
                products.push(product);
            }
        }

        let plan = SalePlan::build(request, &products)?;

        let mut items = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            let item_id = sqlx::query(
                r#"
                INSERT INTO sale_items (sale_id, product_id, quantity, unit_price_cents, remark)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(sale_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .bind(&line.remark)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            items.push(SaleItem {
                id: item_id,
                sale_id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                remark: line.remark.clone(),
            });
        }

        for demand in &plan.demand {
            let taken = decrement_stock(&mut *tx, demand.product_id, demand.quantity).await?;
            if !taken {
                let available = fetch_by_id(&mut *tx, demand.product_id)
                    .await?
                    .map(|p| p.quantity)
                    .unwrap_or(0);
                warn!(
                    ref_no = %demand.ref_no,
                    requested = demand.quantity,
                    available,
                    "Stock changed while recording sale"
                );
                return Err(CoreError::InsufficientStock {
                    ref_no: demand.ref_no.clone(),
                    requested: demand.quantity,
                    available,
                }
                .into());
            }
        }

        let invoice = invoice_number(sale_id, now);
        sqlx::query(
            "UPDATE sales SET invoice_number = ?2, total_amount_cents = ?3 WHERE id = ?1",
        )
        .bind(sale_id)
        .bind(&invoice)
        .bind(plan.total.cents())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            sale_id,
            invoice = %invoice,
            items = items.len(),
            total = %plan.total,
            "Sale recorded"
        );

        Ok(RecordedSale {
            sale: Sale {
                id: sale_id,
                invoice_number: Some(invoice),
                customer_name: request.customer_name.clone(),
                payment_method: request.payment_method,
                user_id,
                total_amount_cents: plan.total.cents(),
                created_at: now,
            },
            items,
        })
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets all items for a sale, in entry order.
    pub async fn items(&self, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price_cents, remark
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Loads a sale with its lines and recording user for the receipt page.
    pub async fn receipt(&self, id: i64) -> DbResult<SaleReceipt> {
        let sale = self
            .get_by_id(id)
            .await?
            .ok_or(CoreError::SaleNotFound(id))?;

        let username: Option<String> = match sale.user_id {
            Some(user_id) => {
                sqlx::query_scalar("SELECT username FROM users WHERE id = ?1")
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        let lines = sqlx::query_as::<_, ReceiptLine>(
            r#"
            SELECT si.id, si.product_id, p.ref_no, p.brand, p.model_name,
                   si.quantity, si.unit_price_cents, si.remark
            FROM sale_items si
            INNER JOIN products p ON p.id = si.product_id
            WHERE si.sale_id = ?1
            ORDER BY si.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(SaleReceipt {
            sale,
            username,
            lines,
        })
    }

    /// Most recent sales first, optionally only those with a line whose
    /// product brand contains `brand_query`.
    pub async fn recent(&self, brand_query: &str, limit: u32) -> DbResult<Vec<SaleSummary>> {
        let brand_query = brand_query.trim();

        debug!(brand = %brand_query, limit, "Listing recent sales");

        let sales = sqlx::query_as::<_, SaleSummary>(
            r#"
            SELECT s.id, s.invoice_number, s.customer_name, s.payment_method,
                   s.total_amount_cents, s.created_at, u.username,
                   (SELECT COUNT(*) FROM sale_items si WHERE si.sale_id = s.id) AS item_count
            FROM sales s
            LEFT JOIN users u ON u.id = s.user_id
            WHERE ?1 = ''
               OR EXISTS (
                    SELECT 1 FROM sale_items si
                    INNER JOIN products p ON p.id = si.product_id
                    WHERE si.sale_id = s.id AND p.brand LIKE ?2 ESCAPE '\'
               )
            ORDER BY s.created_at DESC, s.id DESC
            LIMIT ?3
            "#,
        )
        .bind(brand_query)
        .bind(contains_pattern(brand_query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Number of recorded sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Guarded decrement. Returns `false` when fewer than `quantity` units remain.
async fn decrement_stock(conn: &mut SqliteConnection, product_id: i64, quantity: i64) -> DbResult<bool> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity - ?2, updated_at = ?3
        WHERE id = ?1 AND quantity >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError, NewUser};
    use stockroom_core::{Condition, Product, ProductDraft, Role};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn stock(db: &Database, ref_no: &str, brand: &str, quantity: i64, price_cents: i64) -> Product {
        db.products()
            .insert(&ProductDraft {
                brand: brand.to_string(),
                model_name: format!("{brand} {ref_no}"),
                ref_no: ref_no.to_string(),
                category: None,
                supplier: None,
                purchase_price: Money::zero(),
                selling_price: Money::from_cents(price_cents),
                quantity,
                condition: Condition::New,
                remark: None,
            })
            .await
            .unwrap()
    }

    async fn quantity_of(db: &Database, id: i64) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().quantity
    }

    async fn row_count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_record_deducts_stock_and_totals() {
        let db = db().await;
        let a1 = stock(&db, "A1", "Casio", 10, 10000).await;

        let request = SaleRequest::new(PaymentMethod::Cash).line(a1.id, 3);
        let recorded = db.sales().record(&request, None).await.unwrap();

        assert_eq!(quantity_of(&db, a1.id).await, 7);
        assert_eq!(recorded.items.len(), 1);
        assert_eq!(recorded.items[0].unit_price_cents, 10000);
        assert_eq!(recorded.sale.total_amount_cents, 30000);

        let stored = db.sales().get_by_id(recorded.sale.id).await.unwrap().unwrap();
        assert_eq!(stored.total_amount_cents, 30000);
        assert_eq!(stored.payment_method, PaymentMethod::Cash);
        assert_eq!(stored.invoice_number, recorded.sale.invoice_number);
        assert!(stored
            .invoice_number
            .as_deref()
            .unwrap()
            .ends_with(&format!("-{:06}", recorded.sale.id)));
    }

    #[tokio::test]
    async fn test_total_is_sum_of_subtotals() {
        let db = db().await;
        let a1 = stock(&db, "A1", "Casio", 10, 10000).await;
        let b2 = stock(&db, "B2", "Seiko", 5, 2550).await;

        let request = SaleRequest::new(PaymentMethod::Transfer)
            .line(a1.id, 2)
            .line(b2.id, 3)
            .line(a1.id, 1);
        let recorded = db.sales().record(&request, None).await.unwrap();

        let items = db.sales().items(recorded.sale.id).await.unwrap();
        assert_eq!(items.len(), 3);
        let sum: Money = items.iter().map(SaleItem::subtotal).sum();
        assert_eq!(sum.cents(), recorded.sale.total_amount_cents);
        assert_eq!(sum.cents(), 3 * 10000 + 3 * 2550);

        assert_eq!(quantity_of(&db, a1.id).await, 7);
        assert_eq!(quantity_of(&db, b2.id).await, 2);
    }

    #[tokio::test]
    async fn test_over_stock_writes_nothing() {
        let db = db().await;
        let a1 = stock(&db, "A1", "Casio", 10, 10000).await;
        let b2 = stock(&db, "B2", "Seiko", 5, 2550).await;

        // B2 is fine on its own; the A1 lines together ask for 12.
        let request = SaleRequest::new(PaymentMethod::Cash)
            .line(b2.id, 1)
            .line(a1.id, 8)
            .line(a1.id, 4);
        let err = db.sales().record(&request, None).await.unwrap_err();

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                ref_no,
                requested,
                available,
            }) => {
                assert_eq!(ref_no, "A1");
                assert_eq!(requested, 12);
                assert_eq!(available, 10);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(quantity_of(&db, a1.id).await, 10);
        assert_eq!(quantity_of(&db, b2.id).await, 5);
        assert_eq!(row_count(&db, "sales").await, 0);
        assert_eq!(row_count(&db, "sale_items").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_product_is_invalid_line() {
        let db = db().await;
        let a1 = stock(&db, "A1", "Casio", 10, 10000).await;

        let request = SaleRequest::new(PaymentMethod::Cash).line(a1.id, 1).line(999, 1);
        let err = db.sales().record(&request, None).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidLine { line: 2, .. })
        ));
        assert_eq!(quantity_of(&db, a1.id).await, 10);
        assert_eq!(row_count(&db, "sales").await, 0);
    }

    #[tokio::test]
    async fn test_empty_sale_is_saved_with_zero_total() {
        let db = db().await;

        let recorded = db
            .sales()
            .record(&SaleRequest::new(PaymentMethod::Credit).customer("Ada"), None)
            .await
            .unwrap();

        assert!(recorded.items.is_empty());
        assert_eq!(recorded.sale.total_amount_cents, 0);
        assert_eq!(db.sales().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exact_stock_sells_out() {
        let db = db().await;
        let a1 = stock(&db, "A1", "Casio", 4, 500).await;

        let request = SaleRequest::new(PaymentMethod::Pos).line(a1.id, 4);
        db.sales().record(&request, None).await.unwrap();
        assert_eq!(quantity_of(&db, a1.id).await, 0);

        let again = SaleRequest::new(PaymentMethod::Pos).line(a1.id, 1);
        assert!(db.sales().record(&again, None).await.is_err());
    }

    #[tokio::test]
    async fn test_guarded_decrement_refuses_overdraw() {
        let db = db().await;
        let a1 = stock(&db, "A1", "Casio", 2, 500).await;

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(!decrement_stock(&mut *conn, a1.id, 3).await.unwrap());
        assert!(decrement_stock(&mut *conn, a1.id, 2).await.unwrap());
        drop(conn);

        assert_eq!(quantity_of(&db, a1.id).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sales_cannot_oversell() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("shop.db")).max_connections(4))
            .await
            .unwrap();
        let a1 = stock(&db, "A1", "Casio", 5, 1000).await;

        let first = SaleRequest::new(PaymentMethod::Cash).line(a1.id, 5);
        let second = SaleRequest::new(PaymentMethod::Pos).line(a1.id, 5);
        let (sales_a, sales_b) = (db.sales(), db.sales());

        let (a, b) = tokio::join!(sales_a.record(&first, None), sales_b.record(&second, None));

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = outcomes.into_iter().find_map(Result::err).unwrap();
        assert!(matches!(
            loser,
            DbError::Domain(CoreError::InsufficientStock { requested: 5, available: 0, .. })
        ));

        assert_eq!(quantity_of(&db, a1.id).await, 0);
        assert_eq!(row_count(&db, "sales").await, 1);
        assert_eq!(row_count(&db, "sale_items").await, 1);

        db.close().await;
    }

    #[tokio::test]
    async fn test_record_rejects_amount_overflow() {
        let db = db().await;
        let a1 = stock(&db, "A1", "Casio", 10, 92_233_720_368_547_758).await;

        let request = SaleRequest::new(PaymentMethod::Cash).line(a1.id, 2);
        let err = db.sales().record(&request, None).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidLine { line: 1, .. })
        ));
        assert_eq!(quantity_of(&db, a1.id).await, 10);
        assert_eq!(row_count(&db, "sales").await, 0);
    }

    #[tokio::test]
    async fn test_deleting_product_removes_its_sale_lines() {
        let db = db().await;
        let a1 = stock(&db, "A1", "Casio", 10, 10000).await;
        let b2 = stock(&db, "B2", "Seiko", 10, 2000).await;

        let request = SaleRequest::new(PaymentMethod::Cash).line(a1.id, 1).line(b2.id, 1);
        let recorded = db.sales().record(&request, None).await.unwrap();

        db.products().delete(a1.id).await.unwrap();

        let items = db.sales().items(recorded.sale.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, b2.id);

        let orphans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sale_items WHERE product_id NOT IN (SELECT id FROM products)",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_receipt_and_recent() {
        let db = db().await;
        let (user, _) = db
            .users()
            .create(&NewUser::new("sam", "hash").role(Role::Staff))
            .await
            .unwrap();
        let a1 = stock(&db, "A1", "Casio", 10, 10000).await;
        let b2 = stock(&db, "B2", "Seiko", 10, 2000).await;

        let first = db
            .sales()
            .record(&SaleRequest::new(PaymentMethod::Cash).line(a1.id, 2), Some(user.id))
            .await
            .unwrap();
        let second = db
            .sales()
            .record(&SaleRequest::new(PaymentMethod::Cash).line(b2.id, 1), None)
            .await
            .unwrap();

        let receipt = db.sales().receipt(first.sale.id).await.unwrap();
        assert_eq!(receipt.username.as_deref(), Some("sam"));
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.lines[0].ref_no, "A1");
        assert_eq!(receipt.lines[0].subtotal().cents(), 20000);

        let recent = db.sales().recent("", 10).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second.sale.id, first.sale.id]);
        assert_eq!(recent[1].item_count, 1);
        assert_eq!(recent[1].username.as_deref(), Some("sam"));

        let casio = db.sales().recent("casio", 10).await.unwrap();
        assert_eq!(casio.len(), 1);
        assert_eq!(casio[0].id, first.sale.id);

        assert_eq!(db.sales().recent("", 1).await.unwrap().len(), 1);

        let err = db.sales().receipt(999).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SaleNotFound(999))));
    }

    #[tokio::test]
    async fn test_deleting_user_keeps_sale() {
        let db = db().await;
        let (user, _) = db.users().create(&NewUser::new("sam", "hash")).await.unwrap();
        let a1 = stock(&db, "A1", "Casio", 10, 10000).await;

        let recorded = db
            .sales()
            .record(&SaleRequest::new(PaymentMethod::Cash).line(a1.id, 1), Some(user.id))
            .await
            .unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(user.id)
            .execute(db.pool())
            .await
            .unwrap();

        let sale = db.sales().get_by_id(recorded.sale.id).await.unwrap().unwrap();
        assert_eq!(sale.user_id, None);
        assert_eq!(db.sales().receipt(sale.id).await.unwrap().username, None);
    }
}
