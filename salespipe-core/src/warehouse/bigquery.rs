//! BigQuery warehouse client over the REST v2 query endpoint.
//!
//! Issues a single synchronous `jobs.query` call selecting the product
//! reference columns and converts the JSON row payload into a polars frame
//! of string columns. Requires an OAuth bearer token.

use super::{Warehouse, WarehouseError};
use crate::schema::REQUIRED_PRODUCT_COLUMNS;
use polars::prelude::*;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// jobs.query response, reduced to the parts we consume.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    schema: Option<ResponseSchema>,
    #[serde(default)]
    rows: Vec<ResponseRow>,
    #[serde(rename = "jobComplete")]
    job_complete: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ResponseSchema {
    fields: Vec<ResponseField>,
}

#[derive(Debug, Deserialize)]
struct ResponseField {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResponseRow {
    f: Vec<ResponseCell>,
}

#[derive(Debug, Deserialize)]
struct ResponseCell {
    v: Option<String>,
}

/// BigQuery-backed warehouse for one products table.
pub struct BigQueryWarehouse {
    client: reqwest::blocking::Client,
    project: String,
    dataset: String,
    table: String,
    token: String,
}

impl BigQueryWarehouse {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<BigQueryWarehouse, WarehouseError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| WarehouseError::ResponseFormat(format!("HTTP client build: {e}")))?;

        Ok(BigQueryWarehouse {
            client,
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
            token: token.into(),
        })
    }

    /// Fully-qualified `project.dataset.table` name.
    pub fn table_ref(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.table)
    }

    fn products_query(&self) -> String {
        format!(
            "SELECT {} FROM `{}`",
            REQUIRED_PRODUCT_COLUMNS.join(", "),
            self.table_ref()
        )
    }

    fn transport_err(&self, reason: String) -> WarehouseError {
        WarehouseError::Transport {
            table: self.table_ref(),
            reason,
        }
    }
}

impl Warehouse for BigQueryWarehouse {
    fn fetch_products(&self) -> Result<DataFrame, WarehouseError> {
        let url = format!("{API_BASE}/projects/{}/queries", self.project);
        let body = json!({
            "query": self.products_query(),
            "useLegacySql": false,
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(|e| self.transport_err(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(self.transport_err(format!("HTTP {}", resp.status())));
        }

        let payload: QueryResponse = resp
            .json()
            .map_err(|e| WarehouseError::ResponseFormat(format!("response parse: {e}")))?;

        if payload.job_complete == Some(false) {
            return Err(self.transport_err("query did not complete synchronously".into()));
        }

        let schema = payload
            .schema
            .ok_or_else(|| WarehouseError::ResponseFormat("response has no schema".into()))?;

        response_to_frame(&schema.fields, &payload.rows)
    }
}

/// Convert the cell grid into one string column per returned field.
fn response_to_frame(
    fields: &[ResponseField],
    rows: &[ResponseRow],
) -> Result<DataFrame, WarehouseError> {
    let mut columns: Vec<Column> = Vec::with_capacity(fields.len());

    for (idx, field) in fields.iter().enumerate() {
        let values: Vec<Option<String>> = rows
            .iter()
            .map(|row| row.f.get(idx).and_then(|cell| cell.v.clone()))
            .collect();
        columns.push(Column::new(field.name.as_str().into(), values));
    }

    DataFrame::new(columns)
        .map_err(|e| WarehouseError::ResponseFormat(format!("frame construction: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_grid_becomes_named_columns() {
        let fields = vec![
            ResponseField {
                name: "product_id".into(),
            },
            ResponseField {
                name: "brand".into(),
            },
        ];
        let rows = vec![
            ResponseRow {
                f: vec![
                    ResponseCell {
                        v: Some("p-1".into()),
                    },
                    ResponseCell {
                        v: Some("Nike".into()),
                    },
                ],
            },
            ResponseRow {
                f: vec![ResponseCell { v: None }, ResponseCell { v: None }],
            },
        ];

        let df = response_to_frame(&fields, &rows).unwrap();
        assert_eq!(df.height(), 2);
        assert!(df.column("product_id").is_ok());
        assert!(df.column("brand").is_ok());
    }

    #[test]
    fn query_selects_all_required_columns() {
        let wh = BigQueryWarehouse::new("proj", "ds", "products", "token").unwrap();
        let q = wh.products_query();
        for col in REQUIRED_PRODUCT_COLUMNS {
            assert!(q.contains(col), "query missing column {col}: {q}");
        }
        assert!(q.contains("`proj.ds.products`"));
    }
}
