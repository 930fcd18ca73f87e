// src/warehouse/bigquery.rs
use async_trait::async_trait;
use metrics::histogram;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::auth::TokenSource;
use super::WarehouseSink;
use crate::config::TableRef;
use crate::error::{PipelineError, Result};
use crate::ingest::types::WarehouseRow;

/// Streaming-insert writer. One `insertAll` request per batch, no retries,
/// no splitting. `skipInvalidRows=false` makes a single bad row reject the call.
pub struct BigQueryWriter {
    client: Client,
    base_url: String,
    table: TableRef,
    token: TokenSource,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllRequest<'a> {
    kind: &'static str,
    skip_invalid_rows: bool,
    ignore_unknown_values: bool,
    rows: Vec<InsertRow<'a>>,
}

#[derive(Serialize)]
struct InsertRow<'a> {
    json: &'a WarehouseRow,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertError>,
}

#[derive(Debug, Deserialize)]
struct InsertError {
    #[serde(default)]
    index: u64,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl BigQueryWriter {
    pub fn new(client: Client, base_url: impl Into<String>, table: TableRef, token: TokenSource) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            table,
            token,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            self.base_url, self.table.project, self.table.dataset, self.table.table
        )
    }
}

/// Flatten per-row insert errors into one diagnostic line.
fn describe_insert_errors(errors: &[InsertError]) -> String {
    let shown: Vec<String> = errors
        .iter()
        .take(5)
        .map(|ie| {
            let reasons: Vec<String> = ie
                .errors
                .iter()
                .map(|e| {
                    let mut s = e.reason.clone().unwrap_or_else(|| "unknown".into());
                    if let Some(loc) = e.location.as_deref().filter(|l| !l.is_empty()) {
                        s.push_str(&format!(" at {loc}"));
                    }
                    if let Some(msg) = e.message.as_deref().filter(|m| !m.is_empty()) {
                        s.push_str(&format!(" ({msg})"));
                    }
                    s
                })
                .collect();
            format!("row {}: {}", ie.index, reasons.join("; "))
        })
        .collect();
    let more = errors.len().saturating_sub(shown.len());
    let mut out = format!("{} row(s) rejected: {}", errors.len(), shown.join(" | "));
    if more > 0 {
        out.push_str(&format!(" | ... {more} more"));
    }
    out
}

#[async_trait]
impl WarehouseSink for BigQueryWriter {
    async fn append(&self, rows: &[WarehouseRow]) -> Result<usize> {
        let t0 = std::time::Instant::now();
        let token = self.token.token().await?;

        let payload = InsertAllRequest {
            kind: "bigquery#tableDataInsertAllRequest",
            skip_invalid_rows: false,
            ignore_unknown_values: false,
            rows: rows.iter().map(|r| InsertRow { json: r }).collect(),
        };

        let rsp = self
            .client
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::WriteFailed(format!("insertAll request failed: {e}")))?;

        let status = rsp.status();
        let body = rsp
            .text()
            .await
            .map_err(|e| PipelineError::WriteFailed(format!("insertAll body read failed: {e}")))?;
        histogram!("pipeline_write_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if !status.is_success() {
            let detail: String = body.trim().chars().take(300).collect();
            return Err(PipelineError::WriteFailed(format!(
                "insertAll HTTP {}: {detail}",
                status.as_u16()
            )));
        }

        // An empty body is a clean insert.
        let parsed: InsertAllResponse = if body.trim().is_empty() {
            InsertAllResponse::default()
        } else {
            serde_json::from_str(&body).map_err(|e| {
                PipelineError::WriteFailed(format!("insertAll response undecodable: {e}"))
            })?
        };

        if !parsed.insert_errors.is_empty() {
            return Err(PipelineError::WriteFailed(describe_insert_errors(
                &parsed.insert_errors,
            )));
        }

        tracing::debug!(target: "pipeline", table = %self.table, rows = rows.len(), "rows appended");
        Ok(rows.len())
    }
}
