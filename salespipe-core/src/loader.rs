//! Sales loading: parallel per-day fetches, decode, and the defensive
//! timestamp re-filter.
//!
//! Every enumerated file must load; a missing or unreadable day aborts the
//! whole run rather than producing a silently-incomplete export. The
//! re-filter is independent of the per-day file naming and protects finer
//! exports from stray timestamps inside a day file (backfills, clock skew).

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::codec;
use crate::domain::{DateRange, SaleRecord};
use crate::enumerate::DayObject;
use crate::error::PipelineError;
use crate::schema::{missing_columns, REQUIRED_SALES_COLUMNS};
use crate::storage::{ObjectStore, StoreError, SALES_KEY_PREFIX};

/// Fetch, decode, and concatenate all enumerated daily files, then keep only
/// records whose `sold_at` date lies inside `range`.
///
/// Fetches run in parallel; record order follows the ascending file order,
/// and original row order within each file, so output is reproducible.
pub fn load_sales(
    store: &dyn ObjectStore,
    objects: &[DayObject],
    range: &DateRange,
) -> Result<Vec<SaleRecord>, PipelineError> {
    info!(
        files = objects.len(),
        start = %range.start,
        end = %range.end,
        "loading daily sales files"
    );

    let per_day: Vec<Vec<SaleRecord>> = objects
        .par_iter()
        .map(|obj| load_day(store, obj))
        .collect::<Result<_, _>>()?;

    let mut records: Vec<SaleRecord> = per_day.into_iter().flatten().collect();
    let loaded = records.len();

    records.retain(|r| range.contains(r.sold_at.date()));
    let out_of_window = loaded - records.len();
    if out_of_window > 0 {
        warn!(
            dropped = out_of_window,
            "dropped records with sold_at outside the requested window"
        );
    }

    info!(rows = records.len(), "sales load complete");
    Ok(records)
}

/// Fetch and decode one daily file.
fn load_day(store: &dyn ObjectStore, obj: &DayObject) -> Result<Vec<SaleRecord>, PipelineError> {
    debug!(key = %obj.key, "fetching sales file");

    let bytes = match store.fetch(&obj.key) {
        Ok(bytes) => bytes,
        Err(StoreError::NotFound { key }) => {
            log_available_sales_files(store);
            return Err(PipelineError::DataLoad(format!(
                "sales file not found for {}: {key}",
                obj.date
            )));
        }
        Err(err) => {
            return Err(PipelineError::DataLoad(format!(
                "failed to download {}: {err}",
                obj.key
            )));
        }
    };

    let df = codec::decode_sales_frame(&bytes).map_err(|e| {
        PipelineError::DataLoad(format!("failed to decode parquet from {}: {e}", obj.key))
    })?;

    let missing = missing_columns(&df, &REQUIRED_SALES_COLUMNS);
    if !missing.is_empty() {
        return Err(PipelineError::DataQuality(format!(
            "sales file {} is missing required columns: {}",
            obj.key,
            missing.join(", ")
        )));
    }

    let (records, null_product_ids) = codec::sales_from_frame(&df).map_err(|e| {
        PipelineError::DataLoad(format!("failed to read sales rows from {}: {e}", obj.key))
    })?;

    if null_product_ids > 0 {
        warn!(
            key = %obj.key,
            dropped = null_product_ids,
            "dropped sales rows with null product_id"
        );
    }

    Ok(records)
}

/// Diagnostic on a missing day file: log which sales objects the bucket does
/// hold (latest-first, capped) before the load fails.
fn log_available_sales_files(store: &dyn ObjectStore) {
    const MAX_LISTED: usize = 10;

    match store.list(SALES_KEY_PREFIX) {
        Ok(mut names) => {
            if names.is_empty() {
                info!(prefix = SALES_KEY_PREFIX, "bucket holds no sales files");
                return;
            }
            names.sort_by(|a, b| b.cmp(a));
            names.truncate(MAX_LISTED);
            info!(
                available = ?names,
                "sales files present in bucket (latest first, capped)"
            );
        }
        Err(err) => warn!(%err, "failed to list sales files for diagnostics"),
    }
}
