//! Columnar codec: polars frames ⇄ record structs.
//!
//! Daily sales files and parquet artifacts go through polars; the exporter's
//! CSV path lives in `export` and uses the csv crate directly. Timestamps
//! are carried as UTC microseconds.

use chrono::{DateTime, Datelike, NaiveDateTime};
use polars::prelude::*;
use std::io::Cursor;

use crate::domain::{quarter_of_month, JoinedRecord, ProductRecord, SaleRecord};

const TIMESTAMP_RANGE_ERR: &str = "timestamp out of representable range";

/// Decode one daily sales file from raw parquet bytes.
pub fn decode_sales_frame(bytes: &[u8]) -> PolarsResult<DataFrame> {
    ParquetReader::new(Cursor::new(bytes)).finish()
}

/// Encode sale records as parquet bytes (used to seed fixtures and fakes).
pub fn encode_sales(records: &[SaleRecord]) -> PolarsResult<Vec<u8>> {
    let mut df = sales_to_frame(records)?;
    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf).finish(&mut df)?;
    Ok(buf)
}

/// Convert sale records to a frame with the daily-file schema.
pub fn sales_to_frame(records: &[SaleRecord]) -> PolarsResult<DataFrame> {
    let product_ids: Vec<&str> = records.iter().map(|r| r.product_id.as_str()).collect();
    let prices: Vec<f64> = records.iter().map(|r| r.price).collect();
    let quantities: Vec<i64> = records.iter().map(|r| r.quantity).collect();
    let sold_ats: Vec<i64> = records.iter().map(|r| timestamp_micros(r.sold_at)).collect();
    let order_ids: Vec<&str> = records.iter().map(|r| r.order_id.as_str()).collect();

    DataFrame::new(vec![
        Column::new("product_id".into(), product_ids),
        Column::new("price".into(), prices),
        Column::new("quantity".into(), quantities),
        Column::new("sold_at".into(), sold_ats)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?,
        Column::new("order_id".into(), order_ids),
    ])
}

/// Convert a decoded daily frame into sale records.
///
/// Rows with a null `product_id` cannot join and are dropped here; the
/// returned count lets the caller log them. Numeric columns are cast to the
/// canonical width so files written with narrower types still decode.
pub fn sales_from_frame(df: &DataFrame) -> PolarsResult<(Vec<SaleRecord>, usize)> {
    let product_ids = df.column("product_id")?.cast(&DataType::String)?;
    let product_ids = product_ids.str()?;
    let prices = df.column("price")?.cast(&DataType::Float64)?;
    let prices = prices.f64()?;
    let quantities = df.column("quantity")?.cast(&DataType::Int64)?;
    let quantities = quantities.i64()?;
    let sold_ats = df
        .column("sold_at")?
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    let sold_ats = sold_ats.datetime()?;
    let order_ids = df.column("order_id")?.cast(&DataType::String)?;
    let order_ids = order_ids.str()?;

    let mut records = Vec::with_capacity(df.height());
    let mut null_product_ids = 0usize;

    for i in 0..df.height() {
        let product_id = match product_ids.get(i) {
            Some(id) => id.to_string(),
            None => {
                null_product_ids += 1;
                continue;
            }
        };
        let micros = sold_ats
            .get(i)
            .ok_or_else(|| polars_err!(ComputeError: "null sold_at at row {}", i))?;

        records.push(SaleRecord {
            product_id,
            price: prices.get(i).unwrap_or(f64::NAN),
            quantity: quantities.get(i).unwrap_or(0),
            sold_at: naive_from_micros(micros)?,
            order_id: order_ids.get(i).unwrap_or_default().to_string(),
        });
    }

    Ok((records, null_product_ids))
}

/// Convert the warehouse frame into product records.
///
/// Rows with a null `product_id` are dropped and counted; other null
/// attributes become empty strings (row-level content is not validated).
pub fn products_from_frame(df: &DataFrame) -> PolarsResult<(Vec<ProductRecord>, usize)> {
    let product_ids = df.column("product_id")?.cast(&DataType::String)?;
    let product_ids = product_ids.str()?;
    let names = df.column("product_name")?.cast(&DataType::String)?;
    let names = names.str()?;
    let categories = df.column("category")?.cast(&DataType::String)?;
    let categories = categories.str()?;
    let brands = df.column("brand")?.cast(&DataType::String)?;
    let brands = brands.str()?;
    let conditions = df.column("condition")?.cast(&DataType::String)?;
    let conditions = conditions.str()?;

    let mut records = Vec::with_capacity(df.height());
    let mut null_product_ids = 0usize;

    for i in 0..df.height() {
        let product_id = match product_ids.get(i) {
            Some(id) => id.to_string(),
            None => {
                null_product_ids += 1;
                continue;
            }
        };

        records.push(ProductRecord {
            product_id,
            product_name: names.get(i).unwrap_or_default().to_string(),
            category: categories.get(i).unwrap_or_default().to_string(),
            brand: brands.get(i).unwrap_or_default().to_string(),
            condition: conditions.get(i).unwrap_or_default().to_string(),
        });
    }

    Ok((records, null_product_ids))
}

/// Build the export frame: joined fields plus the reporting columns
/// (`sale_date`, `year`, `month`, `quarter`, `processed_at`).
pub fn joined_to_frame(
    records: &[JoinedRecord],
    processed_at: NaiveDateTime,
) -> PolarsResult<DataFrame> {
    let product_ids: Vec<&str> = records.iter().map(|r| r.product_id.as_str()).collect();
    let prices: Vec<f64> = records.iter().map(|r| r.price).collect();
    let quantities: Vec<i64> = records.iter().map(|r| r.quantity).collect();
    let sold_ats: Vec<i64> = records.iter().map(|r| timestamp_micros(r.sold_at)).collect();
    let order_ids: Vec<&str> = records.iter().map(|r| r.order_id.as_str()).collect();
    let names: Vec<&str> = records.iter().map(|r| r.product_name.as_str()).collect();
    let categories: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
    let brands: Vec<&str> = records.iter().map(|r| r.brand.as_str()).collect();
    let conditions: Vec<&str> = records.iter().map(|r| r.condition.as_str()).collect();

    let sale_dates: Vec<i32> = records
        .iter()
        .map(|r| epoch_days(r.sold_at))
        .collect();
    let years: Vec<i32> = records.iter().map(|r| r.sold_at.year()).collect();
    let months: Vec<i32> = records.iter().map(|r| r.sold_at.month() as i32).collect();
    let quarters: Vec<String> = records
        .iter()
        .map(|r| format!("Q{}", quarter_of_month(r.sold_at.month())))
        .collect();
    let processed: Vec<i64> = vec![timestamp_micros(processed_at); records.len()];

    DataFrame::new(vec![
        Column::new("product_id".into(), product_ids),
        Column::new("price".into(), prices),
        Column::new("quantity".into(), quantities),
        Column::new("sold_at".into(), sold_ats)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?,
        Column::new("order_id".into(), order_ids),
        Column::new("product_name".into(), names),
        Column::new("category".into(), categories),
        Column::new("brand".into(), brands),
        Column::new("condition".into(), conditions),
        Column::new("sale_date".into(), sale_dates).cast(&DataType::Date)?,
        Column::new("year".into(), years),
        Column::new("month".into(), months),
        Column::new("quarter".into(), quarters),
        Column::new("processed_at".into(), processed)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?,
    ])
}

/// Read joined records back from an export frame, ignoring the reporting
/// columns. Used to verify artifacts round-trip.
pub fn joined_from_frame(df: &DataFrame) -> PolarsResult<Vec<JoinedRecord>> {
    let product_ids = df.column("product_id")?.cast(&DataType::String)?;
    let product_ids = product_ids.str()?;
    let prices = df.column("price")?.cast(&DataType::Float64)?;
    let prices = prices.f64()?;
    let quantities = df.column("quantity")?.cast(&DataType::Int64)?;
    let quantities = quantities.i64()?;
    let sold_ats = df
        .column("sold_at")?
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    let sold_ats = sold_ats.datetime()?;
    let order_ids = df.column("order_id")?.cast(&DataType::String)?;
    let order_ids = order_ids.str()?;
    let names = df.column("product_name")?.cast(&DataType::String)?;
    let names = names.str()?;
    let categories = df.column("category")?.cast(&DataType::String)?;
    let categories = categories.str()?;
    let brands = df.column("brand")?.cast(&DataType::String)?;
    let brands = brands.str()?;
    let conditions = df.column("condition")?.cast(&DataType::String)?;
    let conditions = conditions.str()?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let micros = sold_ats
            .get(i)
            .ok_or_else(|| polars_err!(ComputeError: "null sold_at at row {}", i))?;
        records.push(JoinedRecord {
            product_id: product_ids.get(i).unwrap_or_default().to_string(),
            price: prices.get(i).unwrap_or(f64::NAN),
            quantity: quantities.get(i).unwrap_or(0),
            sold_at: naive_from_micros(micros)?,
            order_id: order_ids.get(i).unwrap_or_default().to_string(),
            product_name: names.get(i).unwrap_or_default().to_string(),
            category: categories.get(i).unwrap_or_default().to_string(),
            brand: brands.get(i).unwrap_or_default().to_string(),
            condition: conditions.get(i).unwrap_or_default().to_string(),
        });
    }

    Ok(records)
}

fn timestamp_micros(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}

fn naive_from_micros(micros: i64) -> PolarsResult<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| polars_err!(ComputeError: "{}", TIMESTAMP_RANGE_ERR))
}

fn epoch_days(ts: NaiveDateTime) -> i32 {
    let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    (ts.date() - epoch).num_days() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn sample_sales() -> Vec<SaleRecord> {
        vec![
            SaleRecord {
                product_id: "p-1".into(),
                price: 59.9,
                quantity: 2,
                sold_at: ts(2025, 11, 17, 9, 30, 0),
                order_id: "o-1".into(),
            },
            SaleRecord {
                product_id: "p-2".into(),
                price: 120.0,
                quantity: 1,
                sold_at: ts(2025, 11, 17, 18, 45, 12),
                order_id: "o-2".into(),
            },
        ]
    }

    #[test]
    fn sales_roundtrip_through_parquet_bytes() {
        let sales = sample_sales();
        let bytes = encode_sales(&sales).unwrap();
        let df = decode_sales_frame(&bytes).unwrap();
        let (decoded, dropped) = sales_from_frame(&df).unwrap();

        assert_eq!(dropped, 0);
        assert_eq!(decoded, sales);
    }

    #[test]
    fn null_product_id_rows_are_dropped_and_counted() {
        let df = DataFrame::new(vec![
            Column::new("product_id".into(), vec![Some("p-1"), None]),
            Column::new("price".into(), vec![10.0, 20.0]),
            Column::new("quantity".into(), vec![1i64, 2]),
            Column::new("sold_at".into(), vec![1_700_000_000_000_000i64; 2])
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
                .unwrap(),
            Column::new("order_id".into(), vec!["o-1", "o-2"]),
        ])
        .unwrap();

        let (records, dropped) = sales_from_frame(&df).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(dropped, 1);
        assert_eq!(records[0].product_id, "p-1");
    }

    #[test]
    fn joined_frame_carries_reporting_columns() {
        let joined = vec![JoinedRecord {
            product_id: "p-1".into(),
            price: 59.9,
            quantity: 2,
            sold_at: ts(2025, 4, 15, 9, 30, 0),
            order_id: "o-1".into(),
            product_name: "Shoe".into(),
            category: "footwear".into(),
            brand: "Nike".into(),
            condition: "new".into(),
        }];
        let processed_at = ts(2025, 11, 17, 0, 0, 0);

        let df = joined_to_frame(&joined, processed_at).unwrap();
        assert_eq!(df.height(), 1);
        for col in [
            "sale_date",
            "year",
            "month",
            "quarter",
            "processed_at",
        ] {
            assert!(df.column(col).is_ok(), "missing reporting column {col}");
        }

        let quarters = df.column("quarter").unwrap().str().unwrap();
        assert_eq!(quarters.get(0), Some("Q2"));

        let back = joined_from_frame(&df).unwrap();
        assert_eq!(back, joined);
    }

    #[test]
    fn empty_joined_frame_keeps_full_schema() {
        let df = joined_to_frame(&[], ts(2025, 1, 1, 0, 0, 0)).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 14);
        assert!(df.column("brand").is_ok());
        assert!(df.column("processed_at").is_ok());
    }
}
