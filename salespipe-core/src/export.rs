//! Artifact export: canonical filenames and atomic parquet/CSV writes.
//!
//! Filename derivation is a pure function of the reference date and
//! granularity, kept separate from `DateRange::resolve` so a change to range
//! semantics can never silently change filenames. Writes go to a `.tmp`
//! sibling first and are renamed into place, so a failed write never leaves
//! a truncated artifact claiming success.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::codec;
use crate::domain::{quarter_of_month, Granularity, JoinedRecord};
use crate::error::PipelineError;

/// Supported artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Parquet,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Parquet => "parquet",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Error)]
#[error("unsupported output format '{0}' (expected parquet or csv)")]
pub struct ParseFormatError(String);

impl FromStr for ExportFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parquet" => Ok(ExportFormat::Parquet),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(ParseFormatError(other.to_string())),
        }
    }
}

/// The finished export: where it landed and how many rows it holds.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub row_count: usize,
}

/// Date component of the filename, derived from the reference date alone.
pub fn export_suffix(reference: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => reference.format("%Y-%m-%d").to_string(),
        Granularity::Month => reference.format("%Y-%m").to_string(),
        Granularity::Quarter => {
            format!("{}-Q{}", reference.year(), quarter_of_month(reference.month()))
        }
        Granularity::Year => reference.year().to_string(),
    }
}

/// Full artifact filename: `sales_products_{granularity}_{suffix}.{ext}`.
pub fn export_filename(
    reference: NaiveDate,
    granularity: Granularity,
    format: ExportFormat,
) -> String {
    format!(
        "sales_products_{granularity}_{}.{}",
        export_suffix(reference, granularity),
        format.extension()
    )
}

/// Serialize the final record set to `{output_dir}/{derived_filename}`.
///
/// Records are sorted by (sale date, order_id) so identical inputs always
/// produce byte-identical row order. The output directory is created if
/// absent.
pub fn export_records(
    mut records: Vec<JoinedRecord>,
    reference: NaiveDate,
    granularity: Granularity,
    output_dir: &Path,
    format: ExportFormat,
) -> Result<ExportArtifact, PipelineError> {
    records.sort_by(|a, b| {
        (a.sold_at.date(), a.order_id.as_str()).cmp(&(b.sold_at.date(), b.order_id.as_str()))
    });

    fs::create_dir_all(output_dir).map_err(|e| {
        PipelineError::Internal(format!(
            "failed to create output directory {}: {e}",
            output_dir.display()
        ))
    })?;

    let path = output_dir.join(export_filename(reference, granularity, format));
    let tmp_path = path.with_extension(format!("{}.tmp", format.extension()));
    let processed_at = Utc::now().naive_utc();

    match format {
        ExportFormat::Parquet => write_parquet(&records, processed_at, &tmp_path)?,
        ExportFormat::Csv => write_csv(&records, processed_at, &tmp_path)?,
    }

    fs::rename(&tmp_path, &path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        PipelineError::Internal(format!("atomic rename to {} failed: {e}", path.display()))
    })?;

    info!(path = %path.display(), rows = records.len(), "artifact written");

    Ok(ExportArtifact {
        path,
        format,
        row_count: records.len(),
    })
}

fn write_parquet(
    records: &[JoinedRecord],
    processed_at: chrono::NaiveDateTime,
    path: &Path,
) -> Result<(), PipelineError> {
    let mut df = codec::joined_to_frame(records, processed_at)
        .map_err(|e| PipelineError::Internal(format!("export frame construction: {e}")))?;

    let file = fs::File::create(path)
        .map_err(|e| PipelineError::Internal(format!("create {}: {e}", path.display())))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| PipelineError::Internal(format!("write parquet {}: {e}", path.display())))?;
    Ok(())
}

/// CSV is an accepted lossy boundary: timestamps are stringified
/// (microsecond ISO-8601) and numeric columns lose their native typing.
fn write_csv(
    records: &[JoinedRecord],
    processed_at: chrono::NaiveDateTime,
    path: &Path,
) -> Result<(), PipelineError> {
    let io_err =
        |e: csv::Error| PipelineError::Internal(format!("write csv {}: {e}", path.display()));

    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| PipelineError::Internal(format!("create {}: {e}", path.display())))?;

    wtr.write_record([
        "product_id",
        "price",
        "quantity",
        "sold_at",
        "order_id",
        "product_name",
        "category",
        "brand",
        "condition",
        "sale_date",
        "year",
        "month",
        "quarter",
        "processed_at",
    ])
    .map_err(io_err)?;

    let processed = processed_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();

    for r in records {
        wtr.write_record([
            r.product_id.as_str(),
            &r.price.to_string(),
            &r.quantity.to_string(),
            &r.sold_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            r.order_id.as_str(),
            r.product_name.as_str(),
            r.category.as_str(),
            r.brand.as_str(),
            r.condition.as_str(),
            &r.sold_at.date().to_string(),
            &r.sold_at.year().to_string(),
            &r.sold_at.month().to_string(),
            &format!("Q{}", quarter_of_month(r.sold_at.month())),
            &processed,
        ])
        .map_err(io_err)?;
    }

    wtr.flush()
        .map_err(|e| PipelineError::Internal(format!("flush csv {}: {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        ymd(y, m, d).and_hms_opt(h, 0, 0).unwrap()
    }

    fn joined(order_id: &str, sold_at: NaiveDateTime) -> JoinedRecord {
        JoinedRecord {
            product_id: "p-1".into(),
            price: 59.9,
            quantity: 2,
            sold_at,
            order_id: order_id.into(),
            product_name: "Shoe".into(),
            category: "footwear".into(),
            brand: "Nike".into(),
            condition: "new".into(),
        }
    }

    #[test]
    fn filename_follows_granularity_table() {
        let d = ymd(2025, 11, 17);
        assert_eq!(
            export_filename(d, Granularity::Day, ExportFormat::Parquet),
            "sales_products_day_2025-11-17.parquet"
        );
        assert_eq!(
            export_filename(ymd(2025, 3, 9), Granularity::Month, ExportFormat::Csv),
            "sales_products_month_2025-03.csv"
        );
        assert_eq!(
            export_filename(ymd(2025, 4, 15), Granularity::Quarter, ExportFormat::Parquet),
            "sales_products_quarter_2025-Q2.parquet"
        );
        assert_eq!(
            export_filename(ymd(2025, 1, 1), Granularity::Year, ExportFormat::Parquet),
            "sales_products_year_2025.parquet"
        );
    }

    #[test]
    fn suffix_uses_reference_date_not_range() {
        // Mid-quarter reference: suffix names the quarter of the reference,
        // independent of any resolved range bounds.
        assert_eq!(export_suffix(ymd(2025, 5, 20), Granularity::Quarter), "2025-Q2");
        assert_eq!(export_suffix(ymd(2025, 12, 31), Granularity::Quarter), "2025-Q4");
    }

    #[test]
    fn parquet_export_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![joined("o-2", ts(2025, 11, 17, 15)), joined("o-1", ts(2025, 11, 17, 9))];

        let artifact = export_records(
            records.clone(),
            ymd(2025, 11, 17),
            Granularity::Day,
            dir.path(),
            ExportFormat::Parquet,
        )
        .unwrap();

        assert_eq!(artifact.row_count, 2);
        assert!(artifact.path.exists());
        // No temp file left behind
        assert!(!artifact.path.with_extension("parquet.tmp").exists());

        let file = fs::File::open(&artifact.path).unwrap();
        let df = ParquetReader::new(file).finish().unwrap();
        let back = codec::joined_from_frame(&df).unwrap();

        // Sorted by (sale_date, order_id)
        assert_eq!(back[0].order_id, "o-1");
        assert_eq!(back[1].order_id, "o-2");
        assert_eq!(back.len(), records.len());
        assert!(records.iter().all(|r| back.contains(r)));
    }

    #[test]
    fn csv_export_roundtrips_modulo_typing() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![joined("o-1", ts(2025, 11, 17, 9))];

        let artifact = export_records(
            records.clone(),
            ymd(2025, 11, 17),
            Granularity::Day,
            dir.path(),
            ExportFormat::Csv,
        )
        .unwrap();

        let mut rdr = csv::Reader::from_path(&artifact.path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "product_id");
        assert_eq!(&headers[13], "processed_at");

        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "p-1");
        assert_eq!(row[1].parse::<f64>().unwrap(), 59.9);
        assert_eq!(row[2].parse::<i64>().unwrap(), 2);
        let sold_at =
            NaiveDateTime::parse_from_str(&row[3], "%Y-%m-%dT%H:%M:%S%.f").unwrap();
        assert_eq!(sold_at, records[0].sold_at);
        assert_eq!(&row[12], "Q4");
    }

    #[test]
    fn empty_export_still_writes_full_schema() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = export_records(
            Vec::new(),
            ymd(2025, 11, 17),
            Granularity::Day,
            dir.path(),
            ExportFormat::Parquet,
        )
        .unwrap();

        assert_eq!(artifact.row_count, 0);
        let file = fs::File::open(&artifact.path).unwrap();
        let df = ParquetReader::new(file).finish().unwrap();
        assert_eq!(df.height(), 0);
        assert!(df.column("brand").is_ok());
        assert!(df.column("processed_at").is_ok());
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("export");

        let artifact = export_records(
            Vec::new(),
            ymd(2025, 1, 1),
            Granularity::Year,
            &nested,
            ExportFormat::Csv,
        )
        .unwrap();

        assert!(artifact.path.starts_with(&nested));
        assert!(artifact.path.exists());
    }
}
