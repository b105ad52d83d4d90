//! Warehouse seam: trait and error types for the product reference table.

pub mod bigquery;

use polars::prelude::DataFrame;
use thiserror::Error;

pub use bigquery::BigQueryWarehouse;

/// Errors from the warehouse collaborator.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("warehouse request failed for {table}: {reason}")]
    Transport { table: String, reason: String },

    #[error("warehouse response format changed: {0}")]
    ResponseFormat(String),
}

/// Fetches the products reference table as a named-column frame.
///
/// Row-level content is not validated here; the products reader performs the
/// structural column check on the returned frame.
pub trait Warehouse: Send + Sync {
    fn fetch_products(&self) -> Result<DataFrame, WarehouseError>;
}
