//! salespipe core — dated, filtered, joined sales + product exports.
//!
//! The pipeline reads per-day sales parquet files from object storage and
//! the product reference table from the warehouse, joins them, applies
//! optional brand / product-id allow-lists, and writes one deterministic
//! artifact per run:
//! - `domain` — granularity, date ranges, record shapes
//! - `enumerate` — daily file enumeration with the max-files guard
//! - `loader` — parallel fetch + decode + defensive timestamp re-filter
//! - `products` — reference table fetch, column check, dedup
//! - `join` — hash join plus post-join filters
//! - `export` — canonical filenames, atomic parquet/CSV writes
//! - `pipeline` — the orchestrator tying it all together

pub mod codec;
pub mod domain;
pub mod enumerate;
pub mod error;
pub mod export;
pub mod join;
pub mod loader;
pub mod pipeline;
pub mod products;
pub mod schema;
pub mod storage;
pub mod warehouse;

pub use domain::{DateRange, FilterCriteria, Granularity, JoinedRecord, ProductRecord, SaleRecord};
pub use error::PipelineError;
pub use export::{ExportArtifact, ExportFormat};
pub use pipeline::{run_pipeline, PipelineConfig, RunSummary, DEFAULT_MAX_SALES_FILES};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the pipeline shares across rayon
    /// tasks must be Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<SaleRecord>();
        require_sync::<SaleRecord>();
        require_send::<ProductRecord>();
        require_sync::<ProductRecord>();
        require_send::<JoinedRecord>();
        require_sync::<JoinedRecord>();
        require_send::<PipelineConfig>();
        require_sync::<PipelineConfig>();
        require_send::<PipelineError>();
        require_sync::<PipelineError>();
    }
}
