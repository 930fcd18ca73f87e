// src/warehouse/mod.rs
pub mod auth;
pub mod bigquery;

use crate::error::Result;
use crate::ingest::types::WarehouseRow;

pub use bigquery::BigQueryWriter;

#[async_trait::async_trait]
pub trait WarehouseSink: Send + Sync {
    /// Append all rows in one call. Either the call succeeds for the whole
    /// batch or it returns `WriteFailed`. Existing rows are never touched.
    async fn append(&self, rows: &[WarehouseRow]) -> Result<usize>;
}

// --- Test helper ---
/// Records every append call; optionally fails them all.
pub struct MockSink {
    pub calls: std::sync::Mutex<Vec<Vec<WarehouseRow>>>,
    pub fail_with: Option<String>,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(vec![]),
            fail_with: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            calls: std::sync::Mutex::new(vec![]),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WarehouseSink for MockSink {
    async fn append(&self, rows: &[WarehouseRow]) -> Result<usize> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(rows.to_vec());
        }
        match &self.fail_with {
            Some(reason) => Err(crate::error::PipelineError::WriteFailed(reason.clone())),
            None => Ok(rows.len()),
        }
    }
}
