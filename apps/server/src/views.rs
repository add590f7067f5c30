//! JSON view models.
//!
//! Every page the back office shows, as plain serializable structs. Amounts
//! carry both the raw cents and a display string in the configured currency.

use chrono::{DateTime, Utc};
use serde::Serialize;
use stockroom_core::{
    Condition, PaymentMethod, Principal, Product, ProductFields, Role, Sale, FORMSET_PREFIX,
    SALE_FORM_EXTRA_LINES,
};
use stockroom_db::{CatalogSummary, MigrationStatus, SaleReceipt, SaleSummary};

use crate::config::ServerConfig;
use crate::flash::Notice;

// =============================================================================
// Shared rows
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ViewerView {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub is_manager: bool,
}

impl From<&Principal> for ViewerView {
    fn from(principal: &Principal) -> Self {
        ViewerView {
            user_id: principal.user_id,
            username: principal.username.clone(),
            role: principal.role,
            is_manager: principal.is_manager(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductRow {
    pub id: i64,
    pub ref_no: String,
    pub brand: String,
    pub model_name: String,
    pub label: String,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub condition: Condition,
    pub quantity: i64,
    pub selling_price_cents: i64,
    pub selling_price: String,
    /// Only filled in for managers.
    pub purchase_price: Option<String>,
    pub remark: Option<String>,
    pub low_stock: bool,
}

impl ProductRow {
    pub fn new(product: &Product, config: &ServerConfig, show_cost: bool) -> Self {
        ProductRow {
            id: product.id,
            ref_no: product.ref_no.clone(),
            brand: product.brand.clone(),
            model_name: product.model_name.clone(),
            label: product.label(),
            category: product.category.clone(),
            supplier: product.supplier.clone(),
            condition: product.condition,
            quantity: product.quantity,
            selling_price_cents: product.selling_price_cents,
            selling_price: config.format_currency(product.selling_price()),
            purchase_price: product
                .purchase_price()
                .filter(|_| show_cost)
                .map(|p| config.format_currency(p)),
            remark: product.remark.clone(),
            low_stock: product.is_low_stock(config.low_stock_threshold),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleRow {
    pub id: i64,
    pub invoice_number: Option<String>,
    pub customer_name: Option<String>,
    pub payment_method: String,
    pub total_cents: i64,
    pub total: String,
    pub item_count: i64,
    pub recorded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SaleRow {
    pub fn new(sale: &SaleSummary, config: &ServerConfig) -> Self {
        SaleRow {
            id: sale.id,
            invoice_number: sale.invoice_number.clone(),
            customer_name: sale.customer_name.clone(),
            payment_method: sale.payment_method.label().to_string(),
            total_cents: sale.total_amount_cents,
            total: config.format_currency(sale.total_amount()),
            item_count: sale.item_count,
            recorded_by: sale.username.clone(),
            created_at: sale.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Choice {
    pub value: &'static str,
    pub label: &'static str,
}

pub fn payment_choices() -> Vec<Choice> {
    PaymentMethod::ALL
        .iter()
        .map(|m| Choice {
            value: m.as_str(),
            label: m.label(),
        })
        .collect()
}

pub fn condition_choices() -> Vec<Choice> {
    vec![
        Choice {
            value: Condition::New.as_str(),
            label: "New",
        },
        Choice {
            value: Condition::Used.as_str(),
            label: "Used",
        },
    ]
}

pub fn role_choices() -> Vec<Choice> {
    vec![
        Choice {
            value: Role::Staff.as_str(),
            label: "Staff",
        },
        Choice {
            value: Role::Manager.as_str(),
            label: "Manager",
        },
    ]
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    pub products: i64,
    pub units_in_stock: i64,
    pub sales_recorded: i64,
}

impl SummaryView {
    pub fn new(catalog: CatalogSummary, sales_recorded: i64) -> Self {
        SummaryView {
            products: catalog.products,
            units_in_stock: catalog.units_in_stock,
            sales_recorded,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub viewer: ViewerView,
    pub query: String,
    pub products: Vec<ProductRow>,
    pub recent_sales: Vec<SaleRow>,
    pub low_stock: Vec<ProductRow>,
    pub low_stock_threshold: i64,
    pub summary: SummaryView,
    pub notices: Vec<Notice>,
}

/// The two tables the search box refreshes.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardTables {
    pub query: String,
    pub role: Role,
    pub products: Vec<ProductRow>,
    pub recent_sales: Vec<SaleRow>,
}

// =============================================================================
// Stock forms
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProductFormView {
    /// Where the form posts.
    pub action: String,
    pub product_id: Option<i64>,
    pub fields: ProductFields,
    pub conditions: Vec<Choice>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteConfirmView {
    pub action: String,
    pub product: ProductRow,
    pub warning: &'static str,
    pub notices: Vec<Notice>,
}

pub const DELETE_WARNING: &str =
    "Deleting this product also removes its lines from recorded sales.";

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProductOption {
    pub id: i64,
    pub label: String,
    pub ref_no: String,
    pub quantity: i64,
    pub selling_price: String,
}

impl ProductOption {
    pub fn new(product: &Product, config: &ServerConfig) -> Self {
        ProductOption {
            id: product.id,
            label: format!("{} ({})", product.label(), product.ref_no),
            ref_no: product.ref_no.clone(),
            quantity: product.quantity,
            selling_price: config.format_currency(product.selling_price()),
        }
    }
}

/// Describes the item formset the client must post back.
#[derive(Debug, Clone, Serialize)]
pub struct FormsetView {
    pub prefix: &'static str,
    pub total_forms: usize,
    pub line_fields: [&'static str; 4],
}

impl Default for FormsetView {
    fn default() -> Self {
        FormsetView {
            prefix: FORMSET_PREFIX,
            total_forms: SALE_FORM_EXTRA_LINES,
            line_fields: ["product", "quantity", "remark", "DELETE"],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleFormView {
    pub action: &'static str,
    pub products: Vec<ProductOption>,
    pub payment_methods: Vec<Choice>,
    pub formset: FormsetView,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptLineView {
    pub product_id: i64,
    pub ref_no: String,
    pub product: String,
    pub quantity: i64,
    pub unit_price: String,
    pub subtotal_cents: i64,
    pub subtotal: String,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptView {
    pub id: i64,
    pub invoice_number: Option<String>,
    pub customer_name: Option<String>,
    pub payment_method: String,
    pub recorded_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<ReceiptLineView>,
    pub total_cents: i64,
    pub total: String,
    pub notices: Vec<Notice>,
}

impl ReceiptView {
    pub fn new(receipt: &SaleReceipt, config: &ServerConfig, notices: Vec<Notice>) -> Self {
        let sale: &Sale = &receipt.sale;
        ReceiptView {
            id: sale.id,
            invoice_number: sale.invoice_number.clone(),
            customer_name: sale.customer_name.clone(),
            payment_method: sale.payment_method.label().to_string(),
            recorded_by: receipt.username.clone(),
            created_at: sale.created_at,
            lines: receipt
                .lines
                .iter()
                .map(|line| ReceiptLineView {
                    product_id: line.product_id,
                    ref_no: line.ref_no.clone(),
                    product: format!("{} - {}", line.brand, line.model_name),
                    quantity: line.quantity,
                    unit_price: config.format_currency(line.unit_price()),
                    subtotal_cents: line.subtotal().cents(),
                    subtotal: config.format_currency(line.subtotal()),
                    remark: line.remark.clone(),
                })
                .collect(),
            total_cents: sale.total_amount_cents,
            total: config.format_currency(sale.total_amount()),
            notices,
        }
    }
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginView {
    pub action: &'static str,
    pub next: Option<String>,
    pub signed_in_as: Option<String>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterView {
    pub action: &'static str,
    pub roles: Vec<Choice>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthView {
    pub status: &'static str,
    pub database: bool,
    pub migrations: Option<MigrationStatus>,
    pub version: &'static str,
}
