//! Row-level record types flowing through the pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One sales transaction, decoded from a daily columnar file.
///
/// `sold_at` is a UTC wall-clock timestamp at microsecond precision; the
/// daily file naming and the reference calendar share the same timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub product_id: String,
    pub price: f64,
    pub quantity: i64,
    pub sold_at: NaiveDateTime,
    pub order_id: String,
}

/// One row of the product reference table. `product_id` is the join key and
/// is unique after deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub brand: String,
    pub condition: String,
}

/// A sale enriched with its product's attributes (inner-join output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRecord {
    pub product_id: String,
    pub price: f64,
    pub quantity: i64,
    pub sold_at: NaiveDateTime,
    pub order_id: String,
    pub product_name: String,
    pub category: String,
    pub brand: String,
    pub condition: String,
}

impl JoinedRecord {
    pub fn from_parts(sale: SaleRecord, product: &ProductRecord) -> JoinedRecord {
        JoinedRecord {
            product_id: sale.product_id,
            price: sale.price,
            quantity: sale.quantity,
            sold_at: sale.sold_at,
            order_id: sale.order_id,
            product_name: product.product_name.clone(),
            category: product.category.clone(),
            brand: product.brand.clone(),
            condition: product.condition.clone(),
        }
    }
}

/// Optional post-join allow-list filters. An empty list means "no
/// restriction"; non-empty lists are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub brands: Vec<String>,
    pub product_ids: Vec<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.brands.is_empty() && self.product_ids.is_empty()
    }

    /// Whether a joined record passes both allow-lists.
    pub fn matches(&self, record: &JoinedRecord) -> bool {
        let brand_ok = self.brands.is_empty() || self.brands.iter().any(|b| *b == record.brand);
        let product_ok = self.product_ids.is_empty()
            || self.product_ids.iter().any(|p| *p == record.product_id);
        brand_ok && product_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn joined(brand: &str, product_id: &str) -> JoinedRecord {
        JoinedRecord {
            product_id: product_id.to_string(),
            price: 10.0,
            quantity: 1,
            sold_at: NaiveDate::from_ymd_opt(2025, 11, 17)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            order_id: "o-1".to_string(),
            product_name: "Shoe".to_string(),
            category: "footwear".to_string(),
            brand: brand.to_string(),
            condition: "new".to_string(),
        }
    }

    #[test]
    fn empty_criteria_matches_everything() {
        let criteria = FilterCriteria::default();
        assert!(criteria.is_empty());
        assert!(criteria.matches(&joined("Nike", "p-1")));
    }

    #[test]
    fn brand_filter_is_an_allow_list() {
        let criteria = FilterCriteria {
            brands: vec!["Nike".to_string()],
            product_ids: vec![],
        };
        assert!(criteria.matches(&joined("Nike", "p-1")));
        assert!(!criteria.matches(&joined("Adidas", "p-1")));
    }

    #[test]
    fn filters_combine_as_conjunction() {
        let criteria = FilterCriteria {
            brands: vec!["Nike".to_string()],
            product_ids: vec!["p-2".to_string()],
        };
        assert!(!criteria.matches(&joined("Nike", "p-1")));
        assert!(!criteria.matches(&joined("Adidas", "p-2")));
        assert!(criteria.matches(&joined("Nike", "p-2")));
    }
}
