//! Object-storage seam: trait, error types, and sales object naming.
//!
//! The `ObjectStore` trait abstracts over the bucket holding per-day sales
//! files so the pipeline can run against the real GCS client or an in-memory
//! fake in tests.

pub mod gcs;

use chrono::NaiveDate;
use thiserror::Error;

pub use gcs::GcsStore;

/// Prefix shared by every daily sales object in the bucket.
pub const SALES_KEY_PREFIX: &str = "sales_";

/// Object key for one day of sales: `sales_YYYY-MM-DD.parquet`.
pub fn sales_object_key(date: NaiveDate) -> String {
    format!("{SALES_KEY_PREFIX}{date}.parquet")
}

/// Errors from the object-storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("storage request failed for {key}: {reason}")]
    Transport { key: String, reason: String },

    #[error("storage listing failed: {0}")]
    List(String),

    #[error("storage client error: {0}")]
    Client(String),
}

/// Fetches and lists objects in a single bucket.
pub trait ObjectStore: Send + Sync {
    /// Download the full contents of one object.
    fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// List object keys under a prefix.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
