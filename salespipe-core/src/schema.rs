//! Required column sets and the structural schema check.
//!
//! The check is deliberately shallow: column presence only. Row-level
//! content (nulls, value ranges) is handled downstream where it matters.

use polars::prelude::DataFrame;

/// Columns every products table must provide.
pub const REQUIRED_PRODUCT_COLUMNS: [&str; 5] =
    ["product_id", "product_name", "category", "brand", "condition"];

/// Columns every daily sales file must provide.
pub const REQUIRED_SALES_COLUMNS: [&str; 5] =
    ["product_id", "price", "quantity", "sold_at", "order_id"];

/// Names from `required` that are absent from the frame, sorted for stable
/// error messages.
pub fn missing_columns(df: &DataFrame, required: &[&str]) -> Vec<String> {
    let mut missing: Vec<String> = required
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();
    missing.sort();
    missing
}
