//! Pipeline error taxonomy.
//!
//! Every failure aborts the run and surfaces one of these typed conditions;
//! there is no best-effort partial export. The CLI maps the variants to exit
//! codes (1 for load/quality, 2 for too-many-files, 99 otherwise).

use thiserror::Error;

use crate::warehouse::WarehouseError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading from the warehouse or object storage failed (network,
    /// permission, missing file or table). Never retried by the core.
    #[error("data load failed: {0}")]
    DataLoad(String),

    /// Structural validation failure, e.g. missing required product columns.
    #[error("data quality check failed: {0}")]
    DataQuality(String),

    /// The requested range resolves to more daily files than the ceiling.
    /// Raised before any fetch occurs.
    #[error(
        "requested date range spans {requested} daily files which exceeds \
         the max-files ceiling of {limit}"
    )]
    TooManyFiles { requested: usize, limit: usize },

    /// Anything not covered by the taxonomy above (export I/O, unexpected
    /// collaborator responses). Mapped to the generic failure exit code.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<WarehouseError> for PipelineError {
    fn from(err: WarehouseError) -> Self {
        PipelineError::DataLoad(format!("warehouse: {err}"))
    }
}
