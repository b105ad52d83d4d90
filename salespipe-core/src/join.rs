//! Hash join of sales against products, plus post-join allow-list filters.

use std::collections::HashMap;

use tracing::info;

use crate::domain::{FilterCriteria, JoinedRecord, ProductRecord, SaleRecord};

/// Join output with the unmatched-sale count kept observable: a high drop
/// rate indicates reference-data drift, not a healthy run.
#[derive(Debug)]
pub struct JoinOutcome {
    pub records: Vec<JoinedRecord>,
    pub unmatched_dropped: usize,
}

/// Inner-join sales to products on `product_id`, then apply `criteria`.
///
/// O(n+m): the product map is built once and probed per sale. Sales with no
/// matching product are dropped (the exported schema must be fully
/// populated). Original sales order is preserved.
pub fn join_sales_products(
    sales: Vec<SaleRecord>,
    products: &[ProductRecord],
    criteria: &FilterCriteria,
) -> JoinOutcome {
    let by_id: HashMap<&str, &ProductRecord> = products
        .iter()
        .map(|p| (p.product_id.as_str(), p))
        .collect();

    let total = sales.len();
    let mut unmatched_dropped = 0usize;
    let mut records: Vec<JoinedRecord> = Vec::with_capacity(total);

    for sale in sales {
        match by_id.get(sale.product_id.as_str()) {
            Some(product) => records.push(JoinedRecord::from_parts(sale, product)),
            None => unmatched_dropped += 1,
        }
    }

    if !criteria.is_empty() {
        info!(
            brands = criteria.brands.len(),
            product_ids = criteria.product_ids.len(),
            "applying post-join filters"
        );
        records.retain(|r| criteria.matches(r));
    }

    info!(
        joined = records.len(),
        unmatched_dropped, total, "join complete"
    );

    JoinOutcome {
        records,
        unmatched_dropped,
    }
}
