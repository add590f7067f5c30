//! # Catalog Forms
//!
//! Turns the flat add/edit-stock form into a validated [`ProductDraft`].
//!
//! ```text
//! ┌──────────────────┐   validate()   ┌──────────────────┐   insert/update   ┌─────────┐
//! │  ProductFields   │ ─────────────► │   ProductDraft   │ ────────────────► │ Product │
//! │  (raw strings)   │                │  (typed, clean)  │    stockroom-db   │  (row)  │
//! └──────────────────┘                └──────────────────┘                   └─────────┘
//! ```
//!
//! Blank numeric fields read as zero, matching how the counter staff use the
//! form: leaving "purchase price" empty means "not tracked".

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Condition, Product};
use crate::validation::{
    optional_text, parse_price, parse_stock_quantity, required_text, validate_ref_no,
    ValidationResult, MAX_NAME_LEN,
};

const MAX_REMARK_LEN: usize = 2000;

/// Raw add/edit-stock form fields, exactly as posted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductFields {
    pub brand: String,
    pub model_name: String,
    pub ref_no: String,
    pub category: String,
    pub supplier: String,
    pub purchase_price: String,
    pub selling_price: String,
    pub quantity: String,
    pub condition: String,
    pub remark: String,
}

impl ProductFields {
    /// Validates every field, reporting the first problem found.
    pub fn validate(&self) -> ValidationResult<ProductDraft> {
        let condition = if self.condition.trim().is_empty() {
            Condition::default()
        } else {
            Condition::parse(&self.condition).ok_or_else(|| ValidationError::NotAllowed {
                field: "condition".to_string(),
                allowed: vec![
                    Condition::New.as_str().to_string(),
                    Condition::Used.as_str().to_string(),
                ],
            })?
        };

        Ok(ProductDraft {
            brand: required_text("brand", &self.brand, MAX_NAME_LEN)?,
            model_name: required_text("model_name", &self.model_name, MAX_NAME_LEN)?,
            ref_no: validate_ref_no(&self.ref_no)?,
            category: optional_text("category", &self.category, MAX_NAME_LEN)?,
            supplier: optional_text("supplier", &self.supplier, MAX_NAME_LEN)?,
            purchase_price: parse_price("purchase_price", &self.purchase_price)?,
            selling_price: parse_price("selling_price", &self.selling_price)?,
            quantity: parse_stock_quantity("quantity", &self.quantity)?,
            condition,
            remark: optional_text("remark", &self.remark, MAX_REMARK_LEN)?,
        })
    }

    /// Pre-fills the edit form from a stored product.
    pub fn from_product(product: &Product) -> Self {
        ProductFields {
            brand: product.brand.clone(),
            model_name: product.model_name.clone(),
            ref_no: product.ref_no.clone(),
            category: product.category.clone().unwrap_or_default(),
            supplier: product.supplier.clone().unwrap_or_default(),
            purchase_price: product
                .purchase_price()
                .map(|m| m.to_string())
                .unwrap_or_default(),
            selling_price: product.selling_price().to_string(),
            quantity: product.quantity.to_string(),
            condition: product.condition.as_str().to_string(),
            remark: product.remark.clone().unwrap_or_default(),
        }
    }
}

/// A validated product, ready to insert or to overwrite an existing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub brand: String,
    pub model_name: String,
    pub ref_no: String,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub purchase_price: Money,
    pub selling_price: Money,
    pub quantity: i64,
    pub condition: Condition,
    pub remark: Option<String>,
}

impl ProductDraft {
    /// `"Brand - Model"`, as used in notices.
    pub fn label(&self) -> String {
        format!("{} - {}", self.brand, self.model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ProductFields {
        ProductFields {
            brand: " Casio ".to_string(),
            model_name: "F-91W".to_string(),
            ref_no: "A1".to_string(),
            selling_price: "100".to_string(),
            quantity: "10".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_form() {
        let draft = fields().validate().unwrap();
        assert_eq!(draft.brand, "Casio");
        assert_eq!(draft.selling_price.cents(), 10000);
        assert_eq!(draft.purchase_price, Money::zero());
        assert_eq!(draft.quantity, 10);
        assert_eq!(draft.condition, Condition::New);
        assert_eq!(draft.category, None);
        assert_eq!(draft.label(), "Casio - F-91W");
    }

    #[test]
    fn test_blank_numbers_default_to_zero() {
        let mut f = fields();
        f.selling_price.clear();
        f.quantity.clear();
        let draft = f.validate().unwrap();
        assert!(draft.selling_price.is_zero());
        assert_eq!(draft.quantity, 0);
    }

    #[test]
    fn test_required_fields() {
        let mut f = fields();
        f.ref_no = "  ".to_string();
        assert_eq!(
            f.validate(),
            Err(ValidationError::Required {
                field: "ref_no".to_string()
            })
        );

        let mut f = fields();
        f.brand.clear();
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_negative_values_rejected() {
        let mut f = fields();
        f.quantity = "-2".to_string();
        assert!(matches!(
            f.validate(),
            Err(ValidationError::Negative { .. })
        ));

        let mut f = fields();
        f.selling_price = "-0.01".to_string();
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_condition() {
        let mut f = fields();
        f.condition = "Used".to_string();
        assert_eq!(f.validate().unwrap().condition, Condition::Used);

        f.condition = "broken".to_string();
        assert!(matches!(
            f.validate(),
            Err(ValidationError::NotAllowed { .. })
        ));
    }
}
