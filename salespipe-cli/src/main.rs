//! salespipe CLI — join products (warehouse) and sales (object storage)
//! filtered by date, and export as parquet/csv.
//!
//! Exit codes: 0 success, 1 data load/quality failure, 2 too-many-files
//! guard, 99 anything unanticipated.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use salespipe_core::domain::{FilterCriteria, Granularity};
use salespipe_core::export::ExportFormat;
use salespipe_core::pipeline::{run_pipeline, PipelineConfig, DEFAULT_MAX_SALES_FILES};
use salespipe_core::storage::GcsStore;
use salespipe_core::warehouse::BigQueryWarehouse;
use salespipe_core::PipelineError;

const EXIT_DATA: u8 = 1;
const EXIT_TOO_MANY_FILES: u8 = 2;
const EXIT_UNANTICIPATED: u8 = 99;

#[derive(Parser)]
#[command(
    name = "salespipe",
    about = "Export a dated sales + products extract from object storage and the warehouse"
)]
struct Cli {
    /// Reference date in YYYY-MM-DD format.
    #[arg(long, value_parser = parse_date)]
    date: NaiveDate,

    /// Time granularity: day, month, quarter, year.
    #[arg(long, default_value = "day")]
    granularity: Granularity,

    /// Filter on one or more brands (repeatable, AND-combined with other filters).
    #[arg(long = "brand")]
    brands: Vec<String>,

    /// Filter on one or more product_id values (repeatable).
    #[arg(long = "product-id")]
    product_ids: Vec<String>,

    /// GCP project for the warehouse query.
    #[arg(long, default_value = "bot-sandbox-interviews-eb7b")]
    project_id: String,

    /// Warehouse dataset containing the products table.
    #[arg(long, default_value = "bm_mock_data")]
    dataset: String,

    /// Products table name.
    #[arg(long, default_value = "products")]
    table: String,

    /// Bucket containing the daily sales files.
    #[arg(long, default_value = "bm_mock_sales")]
    bucket: String,

    /// Output directory for exports.
    #[arg(long, default_value = "data/export")]
    output_dir: PathBuf,

    /// Export file format: parquet or csv.
    #[arg(long, default_value = "parquet")]
    output_format: ExportFormat,

    /// Maximum number of daily sales files to read before failing.
    #[arg(long, default_value_t = DEFAULT_MAX_SALES_FILES)]
    max_sales_files: usize,

    /// Logging level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{value}', expected YYYY-MM-DD"))
}

fn main() -> ExitCode {
    // Load .env if present, then flags.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    let (store, warehouse) = match build_collaborators(&cli) {
        Ok(pair) => pair,
        Err(err) => {
            eprintln!("[ERROR] {err:#}");
            return ExitCode::from(EXIT_DATA);
        }
    };

    let config = PipelineConfig {
        reference_date: cli.date,
        granularity: cli.granularity,
        criteria: FilterCriteria {
            brands: cli.brands,
            product_ids: cli.product_ids,
        },
        output_dir: cli.output_dir,
        output_format: cli.output_format,
        max_sales_files: cli.max_sales_files,
    };

    match run_pipeline(&config, &store, &warehouse) {
        Ok(summary) => {
            println!(
                "Export written to: {} ({} rows)",
                summary.output_path.display(),
                summary.row_count
            );
            if summary.unmatched_dropped > 0 {
                println!(
                    "Note: {} sales had no matching product and were dropped",
                    summary.unmatched_dropped
                );
            }
            ExitCode::SUCCESS
        }
        Err(err @ PipelineError::TooManyFiles { .. }) => {
            eprintln!("[ERROR] {err}");
            ExitCode::from(EXIT_TOO_MANY_FILES)
        }
        Err(err @ (PipelineError::DataLoad(_) | PipelineError::DataQuality(_))) => {
            eprintln!("[ERROR] {err}");
            ExitCode::from(EXIT_DATA)
        }
        Err(err) => {
            eprintln!("[ERROR] unexpected failure: {err}");
            ExitCode::from(EXIT_UNANTICIPATED)
        }
    }
}

/// Build the real collaborators from flags and environment.
///
/// `BIGQUERY_ACCESS_TOKEN` is required; `GCS_ACCESS_TOKEN` is optional so
/// public sales buckets keep working without credentials.
fn build_collaborators(cli: &Cli) -> Result<(GcsStore, BigQueryWarehouse)> {
    let bq_token = match std::env::var("BIGQUERY_ACCESS_TOKEN") {
        Ok(token) if !token.is_empty() => token,
        _ => bail!(
            "environment variable BIGQUERY_ACCESS_TOKEN is not set; \
             it must hold an OAuth access token for the warehouse"
        ),
    };
    let gcs_token = std::env::var("GCS_ACCESS_TOKEN").ok().filter(|t| !t.is_empty());
    if gcs_token.is_none() {
        tracing::warn!("GCS_ACCESS_TOKEN not set, bucket access will be anonymous");
    }

    let store =
        GcsStore::new(cli.bucket.clone(), gcs_token).context("failed to build storage client")?;
    let warehouse = BigQueryWarehouse::new(
        cli.project_id.clone(),
        cli.dataset.clone(),
        cli.table.clone(),
        bq_token,
    )
    .context("failed to build warehouse client")?;

    Ok((store, warehouse))
}
