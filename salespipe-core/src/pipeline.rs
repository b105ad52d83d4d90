//! Pipeline orchestration: resolve → enumerate → load → join → export.
//!
//! The pipeline is a pure function of its config plus collaborator
//! responses; it holds no state between invocations. Sales files and the
//! products table have no data dependency, so they load concurrently; the
//! join waits on both. Any failure aborts the run before an artifact is
//! finalized.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::domain::{DateRange, FilterCriteria, Granularity};
use crate::enumerate::enumerate_day_objects;
use crate::error::PipelineError;
use crate::export::{export_records, ExportArtifact, ExportFormat};
use crate::join::join_sales_products;
use crate::loader::load_sales;
use crate::products::load_products;
use crate::storage::ObjectStore;
use crate::warehouse::Warehouse;

/// Default ceiling on daily files fetched per run.
pub const DEFAULT_MAX_SALES_FILES: usize = 500;

/// Everything one run needs besides the collaborators.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub reference_date: chrono::NaiveDate,
    pub granularity: Granularity,
    pub criteria: FilterCriteria,
    pub output_dir: PathBuf,
    pub output_format: ExportFormat,
    pub max_sales_files: usize,
}

impl PipelineConfig {
    /// Config with the standard defaults: day granularity, no filters,
    /// parquet into `data/export`, 500-file ceiling.
    pub fn new(reference_date: chrono::NaiveDate) -> PipelineConfig {
        PipelineConfig {
            reference_date,
            granularity: Granularity::Day,
            criteria: FilterCriteria::default(),
            output_dir: PathBuf::from("data/export"),
            output_format: ExportFormat::Parquet,
            max_sales_files: DEFAULT_MAX_SALES_FILES,
        }
    }
}

/// Success result of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub row_count: usize,
    pub output_path: PathBuf,
    /// Sales dropped because their product_id had no reference row.
    pub unmatched_dropped: usize,
}

/// Run the full export pipeline once.
pub fn run_pipeline(
    config: &PipelineConfig,
    store: &dyn ObjectStore,
    warehouse: &dyn Warehouse,
) -> Result<RunSummary, PipelineError> {
    let range = DateRange::resolve(config.reference_date, config.granularity);
    info!(
        reference = %config.reference_date,
        granularity = %config.granularity,
        start = %range.start,
        end = %range.end,
        "starting export run"
    );

    // Guard runs before any collaborator call.
    let objects = enumerate_day_objects(&range, config.max_sales_files)?;

    // Independent fetches; the join needs both.
    let (sales_result, products_result) = rayon::join(
        || load_sales(store, &objects, &range),
        || load_products(warehouse),
    );
    let products = products_result?;
    let sales = sales_result?;

    let (records, unmatched_dropped) = if sales.is_empty() {
        warn!(
            start = %range.start,
            end = %range.end,
            "no sales rows in window, exporting an empty dataset"
        );
        (Vec::new(), 0)
    } else {
        let outcome = join_sales_products(sales, &products, &config.criteria);
        if outcome.unmatched_dropped > 0 {
            warn!(
                dropped = outcome.unmatched_dropped,
                "sales without a matching product were dropped"
            );
        }
        (outcome.records, outcome.unmatched_dropped)
    };

    let artifact: ExportArtifact = export_records(
        records,
        config.reference_date,
        config.granularity,
        &config.output_dir,
        config.output_format,
    )?;

    info!(
        path = %artifact.path.display(),
        rows = artifact.row_count,
        "export run finished"
    );

    Ok(RunSummary {
        row_count: artifact.row_count,
        output_path: artifact.path,
        unmatched_dropped,
    })
}
