// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One article summary as the provider returned it (nothing validated yet).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeadlineRecord {
    pub title: Option<String>,
    pub source: Option<String>, // e.g. "Reuters"
    pub url: Option<String>,
    pub published_at: Option<String>, // raw provider timestamp, may be malformed
}

/// A record that survived the drop check, paired with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHeadline {
    pub record: HeadlineRecord,
    pub headline: String,
    pub sentiment_score: f64,
}

/// Persisted row. Field names are the warehouse column names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarehouseRow {
    pub headline: String,
    pub source: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub sentiment_score: f64,
    pub ingested_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait HeadlineSource: Send + Sync {
    /// Current headlines in provider order. Empty is a valid answer.
    async fn fetch_latest(&self) -> Result<Vec<HeadlineRecord>>;
    fn name(&self) -> &'static str;
}
