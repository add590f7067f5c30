//! # Sale Planning
//!
//! Decodes the record-sale form and checks it against current stock.
//!
//! ## Recording Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Record Sale                                     │
//! │                                                                         │
//! │  POST /record-sale/                                                     │
//! │     │  customer_name, payment_method,                                   │
//! │     │  items-TOTAL_FORMS, items-N-product, items-N-quantity, ...        │
//! │     ▼                                                                   │
//! │  SaleRequest::from_form()      ← THIS MODULE (skips blank/DELETE lines) │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  ┌──────────────── one SQLite transaction (stockroom-db) ────────────┐  │
//! │  │  read referenced products                                         │  │
//! │  │       │                                                           │  │
//! │  │       ▼                                                           │  │
//! │  │  SalePlan::build()     ← THIS MODULE (aggregate demand, prices)   │  │
//! │  │       │                                                           │  │
//! │  │       ▼                                                           │  │
//! │  │  insert sale, insert items, guarded decrements, set total         │  │
//! │  └───────────────────────────────────────────────────────────────────┘  │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  commit, or drop = rollback                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, Product};
use crate::validation::{
    optional_text, validate_sale_quantity, MAX_LINE_REMARK_LEN, MAX_NAME_LEN,
};
use crate::MAX_SALE_LINES;

/// Prefix of the item-line formset fields.
pub const FORMSET_PREFIX: &str = "items";

// =============================================================================
// Request
// =============================================================================

/// One accepted item line of a sale submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    /// 1-based position on the form, for error messages.
    pub line: usize,
    pub product_id: i64,
    pub quantity: i64,
    pub remark: Option<String>,
}

/// A decoded sale submission. Lines are in form order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub customer_name: Option<String>,
    pub payment_method: PaymentMethod,
    pub lines: Vec<LineRequest>,
}

impl SaleRequest {
    /// Starts an empty request.
    pub fn new(payment_method: PaymentMethod) -> Self {
        SaleRequest {
            customer_name: None,
            payment_method,
            lines: Vec::new(),
        }
    }

    /// Sets the customer name.
    pub fn customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    /// Appends a line.
    pub fn line(mut self, product_id: i64, quantity: i64) -> Self {
        let line = self.lines.len() + 1;
        self.lines.push(LineRequest {
            line,
            product_id,
            quantity,
            remark: None,
        });
        self
    }

    /// Decodes the posted record-sale form.
    ///
    /// ## Line Rules
    /// - `items-N-DELETE` set: line skipped
    /// - product and quantity both blank: line skipped (unused extra line)
    /// - otherwise product must be an id and quantity a positive integer
    ///
    /// ## Example
    /// ```rust
    /// use std::collections::HashMap;
    /// use stockroom_core::{PaymentMethod, SaleRequest};
    ///
    /// let form: HashMap<String, String> = [
    ///     ("payment_method", "Cash"),
    ///     ("items-TOTAL_FORMS", "3"),
    ///     ("items-0-product", "7"),
    ///     ("items-0-quantity", "2"),
    ///     ("items-1-product", ""),
    ///     ("items-1-quantity", ""),
    ///     ("items-2-product", "8"),
    ///     ("items-2-quantity", "1"),
    ///     ("items-2-DELETE", "on"),
    /// ]
    /// .into_iter()
    /// .map(|(k, v)| (k.to_string(), v.to_string()))
    /// .collect();
    ///
    /// let request = SaleRequest::from_form(&form).unwrap();
    /// assert_eq!(request.payment_method, PaymentMethod::Cash);
    /// assert_eq!(request.lines.len(), 1);
    /// assert_eq!(request.lines[0].product_id, 7);
    /// ```
    pub fn from_form(form: &HashMap<String, String>) -> CoreResult<SaleRequest> {
        let field = |name: &str| form_value(form, name);

        let customer_name = optional_text("customer_name", field("customer_name"), MAX_NAME_LEN)?;

        let method_raw = field("payment_method");
        if method_raw.is_empty() {
            return Err(ValidationError::Required {
                field: "payment_method".to_string(),
            }
            .into());
        }
        let payment_method =
            PaymentMethod::parse(method_raw).ok_or_else(|| ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.label().to_string())
                    .collect(),
            })?;

        let total_key = format!("{FORMSET_PREFIX}-TOTAL_FORMS");
        let total_raw = field(&total_key);
        if total_raw.is_empty() {
            return Err(ValidationError::Required { field: total_key }.into());
        }
        let total: usize = total_raw
            .parse()
            .map_err(|_| ValidationError::InvalidFormat {
                field: total_key.clone(),
                reason: "must be a whole number".to_string(),
            })?;
        if total > MAX_SALE_LINES {
            return Err(CoreError::TooManyLines {
                max: MAX_SALE_LINES,
            });
        }

        let mut lines = Vec::new();
        for index in 0..total {
            let key = |name: &str| format!("{FORMSET_PREFIX}-{index}-{name}");
            let line = index + 1;

            if is_checked(field(&key("DELETE"))) {
                continue;
            }

            let product_raw = field(&key("product"));
            let quantity_raw = field(&key("quantity"));
            if product_raw.is_empty() && quantity_raw.is_empty() {
                continue;
            }

            let invalid = |reason: &str| CoreError::InvalidLine {
                line,
                reason: reason.to_string(),
            };

            if product_raw.is_empty() {
                return Err(invalid("select a product"));
            }
            let product_id: i64 = product_raw
                .parse()
                .map_err(|_| invalid("unknown product"))?;

            if quantity_raw.is_empty() {
                return Err(invalid("quantity is required"));
            }
            let quantity: i64 = quantity_raw
                .parse()
                .map_err(|_| invalid("quantity must be a whole number"))?;
            validate_sale_quantity(quantity).map_err(|e| invalid(&e.to_string()))?;

            let remark = optional_text("remark", field(&key("remark")), MAX_LINE_REMARK_LEN)
                .map_err(|e| invalid(&e.to_string()))?;

            lines.push(LineRequest {
                line,
                product_id,
                quantity,
                remark,
            });
        }

        Ok(SaleRequest {
            customer_name,
            payment_method,
            lines,
        })
    }

    /// Distinct product ids named by the lines, in first-seen order.
    pub fn product_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            if !ids.contains(&line.product_id) {
                ids.push(line.product_id);
            }
        }
        ids
    }
}

fn form_value<'a>(form: &'a HashMap<String, String>, name: &str) -> &'a str {
    form.get(name).map(|v| v.trim()).unwrap_or("")
}

fn is_checked(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

// =============================================================================
// Plan
// =============================================================================

/// A line with its price captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedLine {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub remark: Option<String>,
}

impl PlannedLine {
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Total units leaving one product, with what was on hand when planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDemand {
    pub product_id: i64,
    pub ref_no: String,
    pub quantity: i64,
    pub available: i64,
}

/// Everything the recorder writes for one sale.
///
/// Built only when every product has enough stock for the summed demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalePlan {
    pub lines: Vec<PlannedLine>,
    pub demand: Vec<StockDemand>,
    pub total: Money,
}

impl SalePlan {
    /// Prices every line and checks aggregated demand against `products`.
    ///
    /// `products` must hold current rows for the request's product ids;
    /// an id with no row is an invalid line.
    ///
    /// ## Example
    /// ```rust
    /// # use chrono::Utc;
    /// use stockroom_core::{Condition, CoreError, PaymentMethod, Product, SalePlan, SaleRequest};
    ///
    /// let a1 = Product {
    ///     id: 1, ref_no: "A1".into(), brand: "Casio".into(), model_name: "F-91W".into(),
    ///     category: None, supplier: None, purchase_price_cents: None,
    ///     selling_price_cents: 10000, quantity: 10, condition: Condition::New,
    ///     remark: None, created_at: Utc::now(), updated_at: Utc::now(),
    /// };
    ///
    /// let ok = SaleRequest::new(PaymentMethod::Cash).line(1, 3);
    /// assert_eq!(SalePlan::build(&ok, &[a1.clone()]).unwrap().total.cents(), 30000);
    ///
    /// let over = SaleRequest::new(PaymentMethod::Cash).line(1, 8).line(1, 4);
    /// assert!(matches!(
    ///     SalePlan::build(&over, &[a1]),
    ///     Err(CoreError::InsufficientStock { requested: 12, available: 10, .. })
    /// ));
    /// ```
    pub fn build(request: &SaleRequest, products: &[Product]) -> CoreResult<SalePlan> {
        let by_id: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();

        let mut lines = Vec::with_capacity(request.lines.len());
        let mut demand: Vec<StockDemand> = Vec::new();
        let mut total = Money::ZERO;

        for line in &request.lines {
            let invalid = |reason: &str| CoreError::InvalidLine {
                line: line.line,
                reason: reason.to_string(),
            };

            let product = by_id
                .get(&line.product_id)
                .ok_or_else(|| invalid("unknown product"))?;

            validate_sale_quantity(line.quantity).map_err(|e| invalid(&e.to_string()))?;

            match demand.iter_mut().find(|d| d.product_id == product.id) {
                Some(entry) => {
                    entry.quantity = entry
                        .quantity
                        .checked_add(line.quantity)
                        .ok_or_else(|| invalid("quantity is too large"))?;
                }
                None => demand.push(StockDemand {
                    product_id: product.id,
                    ref_no: product.ref_no.clone(),
                    quantity: line.quantity,
                    available: product.quantity,
                }),
            }

            let unit_price = product.selling_price();
            total = unit_price
                .checked_mul(line.quantity)
                .and_then(|subtotal| total.checked_add(subtotal))
                .ok_or_else(|| invalid("amount is too large"))?;

            lines.push(PlannedLine {
                product_id: product.id,
                quantity: line.quantity,
                unit_price,
                remark: line.remark.clone(),
            });
        }

        if let Some(short) = demand.iter().find(|d| d.quantity > d.available) {
            return Err(CoreError::InsufficientStock {
                ref_no: short.ref_no.clone(),
                requested: short.quantity,
                available: short.available,
            });
        }

        Ok(SalePlan {
            lines,
            demand,
            total,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Invoice number for a committed sale: `INV-YYYYMMDD-NNNNNN`.
pub fn invoice_number(sale_id: i64, at: DateTime<Utc>) -> String {
    format!("INV-{}-{:06}", at.format("%Y%m%d"), sale_id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Condition;
    use chrono::TimeZone;

    fn product(id: i64, ref_no: &str, quantity: i64, price_cents: i64) -> Product {
        Product {
            id,
            ref_no: ref_no.to_string(),
            brand: "Casio".to_string(),
            model_name: format!("Model {id}"),
            category: None,
            supplier: None,
            purchase_price_cents: None,
            selling_price_cents: price_cents,
            quantity,
            condition: Condition::New,
            remark: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_form_reads_header_and_lines() {
        let request = SaleRequest::from_form(&form(&[
            ("customer_name", " Ada "),
            ("payment_method", "POS"),
            ("items-TOTAL_FORMS", "2"),
            ("items-0-product", "1"),
            ("items-0-quantity", "3"),
            ("items-0-remark", "gift wrap"),
            ("items-1-product", "2"),
            ("items-1-quantity", "1"),
        ]))
        .unwrap();

        assert_eq!(request.customer_name.as_deref(), Some("Ada"));
        assert_eq!(request.payment_method, PaymentMethod::Pos);
        assert_eq!(request.lines.len(), 2);
        assert_eq!(request.lines[0].remark.as_deref(), Some("gift wrap"));
        assert_eq!(request.lines[1].line, 2);
    }

    #[test]
    fn test_from_form_skips_blank_and_deleted() {
        let request = SaleRequest::from_form(&form(&[
            ("payment_method", "cash"),
            ("items-TOTAL_FORMS", "3"),
            ("items-0-product", ""),
            ("items-0-quantity", ""),
            ("items-1-product", "4"),
            ("items-1-quantity", "99"),
            ("items-1-DELETE", "on"),
        ]))
        .unwrap();

        assert!(request.lines.is_empty());
    }

    #[test]
    fn test_from_form_requires_payment_method() {
        let err = SaleRequest::from_form(&form(&[("items-TOTAL_FORMS", "0")])).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { .. })
        ));

        let err = SaleRequest::from_form(&form(&[
            ("payment_method", "IOU"),
            ("items-TOTAL_FORMS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_from_form_rejects_bad_lines() {
        let cases = [
            (("", "2"), "select a product"),
            (("x", "2"), "unknown product"),
            (("1", ""), "quantity is required"),
            (("1", "two"), "quantity must be a whole number"),
            (("1", "0"), "quantity must be positive"),
            (("1", "-4"), "quantity must be positive"),
            (("1", "9223372036854775807"), "quantity must be at most 1000000"),
        ];

        for ((product, quantity), reason) in cases {
            let err = SaleRequest::from_form(&form(&[
                ("payment_method", "Cash"),
                ("items-TOTAL_FORMS", "1"),
                ("items-0-product", product),
                ("items-0-quantity", quantity),
            ]))
            .unwrap_err();

            match err {
                CoreError::InvalidLine { line, reason: got } => {
                    assert_eq!(line, 1);
                    assert_eq!(got, reason);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_from_form_limits_lines() {
        let err = SaleRequest::from_form(&form(&[
            ("payment_method", "Cash"),
            ("items-TOTAL_FORMS", "1000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CoreError::TooManyLines { .. }));

        let err = SaleRequest::from_form(&form(&[("payment_method", "Cash")])).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_plan_prices_and_totals() {
        let products = [product(1, "A1", 10, 10000), product(2, "B2", 5, 250)];
        let request = SaleRequest::new(PaymentMethod::Cash).line(1, 3).line(2, 2);

        let plan = SalePlan::build(&request, &products).unwrap();

        assert_eq!(plan.lines[0].unit_price.cents(), 10000);
        assert_eq!(plan.lines[1].subtotal().cents(), 500);
        assert_eq!(plan.total.cents(), 30500);
        assert_eq!(plan.demand.len(), 2);
    }

    #[test]
    fn test_plan_aggregates_demand_per_product() {
        let products = [product(1, "A1", 10, 10000)];
        let request = SaleRequest::new(PaymentMethod::Cash).line(1, 8).line(1, 4);

        match SalePlan::build(&request, &products) {
            Err(CoreError::InsufficientStock {
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

        let exact = SaleRequest::new(PaymentMethod::Cash).line(1, 6).line(1, 4);
        let plan = SalePlan::build(&exact, &products).unwrap();
        assert_eq!(plan.demand[0].quantity, 10);
        assert_eq!(plan.lines.len(), 2);
    }

    #[test]
    fn test_plan_rejects_huge_quantities_without_overflow() {
        let products = [product(1, "A1", 10, 10000)];
        let request = SaleRequest::new(PaymentMethod::Cash)
            .line(1, i64::MAX)
            .line(1, 2);

        match SalePlan::build(&request, &products) {
            Err(CoreError::InvalidLine { line, reason }) => {
                assert_eq!(line, 1);
                assert_eq!(reason, "quantity must be at most 1000000");
            }
            other => panic!("expected InvalidLine, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_rejects_total_overflow() {
        let products = [product(1, "A1", 10, 92_233_720_368_547_758)];
        let request = SaleRequest::new(PaymentMethod::Cash).line(1, 2);

        match SalePlan::build(&request, &products) {
            Err(CoreError::InvalidLine { line, reason }) => {
                assert_eq!(line, 1);
                assert_eq!(reason, "amount is too large");
            }
            other => panic!("expected InvalidLine, got {other:?}"),
        }

        let products = [
            product(1, "A1", 10, i64::MAX / 2),
            product(2, "B2", 10, i64::MAX / 2),
        ];
        let request = SaleRequest::new(PaymentMethod::Cash).line(1, 1).line(2, 1).line(1, 1);
        assert!(matches!(
            SalePlan::build(&request, &products),
            Err(CoreError::InvalidLine { line: 3, .. })
        ));
    }

    #[test]
    fn test_plan_unknown_product() {
        let request = SaleRequest::new(PaymentMethod::Cash).line(42, 1);
        assert!(matches!(
            SalePlan::build(&request, &[]),
            Err(CoreError::InvalidLine { line: 1, .. })
        ));
    }

    #[test]
    fn test_empty_plan() {
        let plan = SalePlan::build(&SaleRequest::new(PaymentMethod::Credit), &[]).unwrap();
        assert!(plan.is_empty());
        assert!(plan.total.is_zero());
    }

    #[test]
    fn test_product_ids_are_distinct() {
        let request = SaleRequest::new(PaymentMethod::Cash)
            .line(3, 1)
            .line(1, 1)
            .line(3, 2);
        assert_eq!(request.product_ids(), vec![3, 1]);
    }

    #[test]
    fn test_invoice_number() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(invoice_number(42, at), "INV-20240309-000042");
    }
}
