//! Products reader: fetch, structural validation, and key deduplication.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::codec;
use crate::domain::ProductRecord;
use crate::error::PipelineError;
use crate::schema::{missing_columns, REQUIRED_PRODUCT_COLUMNS};
use crate::warehouse::Warehouse;

/// Load the product reference table and prepare it for joining.
///
/// Validation order matters: the column check runs before any row is read,
/// so a malformed table fails as DataQuality before a join is attempted.
/// Duplicate `product_id` values are a data-quality signal; they are logged
/// and deduplicated keeping the first occurrence, so the join stays
/// many-to-one instead of fanning out.
pub fn load_products(warehouse: &dyn Warehouse) -> Result<Vec<ProductRecord>, PipelineError> {
    let df = warehouse.fetch_products()?;

    let missing = missing_columns(&df, &REQUIRED_PRODUCT_COLUMNS);
    if !missing.is_empty() {
        return Err(PipelineError::DataQuality(format!(
            "products table is missing required columns: {}",
            missing.join(", ")
        )));
    }

    let (records, null_product_ids) = codec::products_from_frame(&df)
        .map_err(|e| PipelineError::DataLoad(format!("failed to read product rows: {e}")))?;

    if null_product_ids > 0 {
        warn!(
            dropped = null_product_ids,
            "dropped product rows with null product_id before joining"
        );
    }

    let deduped = dedup_keep_first(records);
    info!(rows = deduped.len(), "products load complete");
    Ok(deduped)
}

/// Keep the first row per product_id, logging a sample of the duplicates.
fn dedup_keep_first(records: Vec<ProductRecord>) -> Vec<ProductRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut duplicates: Vec<String> = Vec::new();
    let mut kept = Vec::with_capacity(records.len());

    for record in records {
        if seen.insert(record.product_id.clone()) {
            kept.push(record);
        } else {
            duplicates.push(record.product_id);
        }
    }

    if !duplicates.is_empty() {
        duplicates.dedup();
        let sample: Vec<&str> = duplicates.iter().take(5).map(|s| s.as_str()).collect();
        warn!(
            duplicates = duplicates.len(),
            sample = ?sample,
            "non-unique product_id values in products table, keeping first occurrence"
        );
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::WarehouseError;
    use polars::prelude::*;

    struct FakeWarehouse {
        df: DataFrame,
    }

    impl Warehouse for FakeWarehouse {
        fn fetch_products(&self) -> Result<DataFrame, WarehouseError> {
            Ok(self.df.clone())
        }
    }

    struct FailingWarehouse;

    impl Warehouse for FailingWarehouse {
        fn fetch_products(&self) -> Result<DataFrame, WarehouseError> {
            Err(WarehouseError::Transport {
                table: "proj.ds.products".into(),
                reason: "permission denied".into(),
            })
        }
    }

    fn products_frame(rows: &[(&str, &str, &str, &str, &str)]) -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                "product_id".into(),
                rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            ),
            Column::new(
                "product_name".into(),
                rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            ),
            Column::new(
                "category".into(),
                rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            ),
            Column::new(
                "brand".into(),
                rows.iter().map(|r| r.3).collect::<Vec<_>>(),
            ),
            Column::new(
                "condition".into(),
                rows.iter().map(|r| r.4).collect::<Vec<_>>(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn loads_well_formed_table() {
        let wh = FakeWarehouse {
            df: products_frame(&[
                ("p-1", "Shoe", "footwear", "Nike", "new"),
                ("p-2", "Shirt", "apparel", "Adidas", "used"),
            ]),
        };

        let products = load_products(&wh).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product_id, "p-1");
        assert_eq!(products[1].brand, "Adidas");
    }

    #[test]
    fn missing_column_is_data_quality() {
        // No brand column
        let df = DataFrame::new(vec![
            Column::new("product_id".into(), vec!["p-1"]),
            Column::new("product_name".into(), vec!["Shoe"]),
            Column::new("category".into(), vec!["footwear"]),
            Column::new("condition".into(), vec!["new"]),
        ])
        .unwrap();
        let wh = FakeWarehouse { df };

        let err = load_products(&wh).unwrap_err();
        match err {
            PipelineError::DataQuality(msg) => assert!(msg.contains("brand"), "{msg}"),
            other => panic!("expected DataQuality, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_product_id_keeps_first_occurrence() {
        let wh = FakeWarehouse {
            df: products_frame(&[
                ("p-1", "Shoe v1", "footwear", "Nike", "new"),
                ("p-1", "Shoe v2", "footwear", "Nike", "used"),
                ("p-2", "Shirt", "apparel", "Adidas", "new"),
            ]),
        };

        let products = load_products(&wh).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product_name, "Shoe v1");
    }

    #[test]
    fn null_product_id_rows_are_dropped() {
        let df = DataFrame::new(vec![
            Column::new("product_id".into(), vec![Some("p-1"), None]),
            Column::new("product_name".into(), vec![Some("Shoe"), Some("Ghost")]),
            Column::new("category".into(), vec![Some("footwear"), Some("misc")]),
            Column::new("brand".into(), vec![Some("Nike"), Some("None")]),
            Column::new("condition".into(), vec![Some("new"), Some("new")]),
        ])
        .unwrap();
        let wh = FakeWarehouse { df };

        let products = load_products(&wh).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_id, "p-1");
    }

    #[test]
    fn warehouse_failure_surfaces_as_data_load() {
        let err = load_products(&FailingWarehouse).unwrap_err();
        match err {
            PipelineError::DataLoad(msg) => assert!(msg.contains("permission denied"), "{msg}"),
            other => panic!("expected DataLoad, got {other:?}"),
        }
    }
}
