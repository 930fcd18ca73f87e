// src/pipeline.rs
//! Orchestrator for one invocation: Fetching -> Scoring -> Writing -> Done,
//! with `Failed` reachable from each of the first three states.
//!
//! Nothing here is shared between invocations. Configuration, HTTP client and
//! components are built per call, and the ingestion timestamp is captured once
//! by the caller and injected.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineFailure, Stage};
use crate::ingest::providers::NewsApiProvider;
use crate::ingest::types::{HeadlineRecord, HeadlineSource, ScoredHeadline, WarehouseRow};
use crate::ingest::{build_row, prepare_headline};
use crate::metrics::ensure_metrics_described;
use crate::sentiment::{Scorer, SentimentAnalyzer};
use crate::warehouse::auth::TokenSource;
use crate::warehouse::{BigQueryWriter, WarehouseSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Fetching,
    Scoring,
    Writing,
    Done,
    Failed,
}

/// Successful invocation summary. `rows_written == 0` is still a success.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub rows_written: usize,
    pub fetched: usize,
    pub dropped: usize,
    pub ingested_at: DateTime<Utc>,
}

pub type Outcome = std::result::Result<RunReport, PipelineFailure>;

pub struct Pipeline<'a> {
    source: &'a dyn HeadlineSource,
    scorer: &'a dyn Scorer,
    sink: &'a dyn WarehouseSink,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn HeadlineSource,
        scorer: &'a dyn Scorer,
        sink: &'a dyn WarehouseSink,
    ) -> Self {
        Self {
            source,
            scorer,
            sink,
        }
    }

    /// Run the state machine once. `ingested_at` is stamped on every row.
    pub async fn run(&self, ingested_at: DateTime<Utc>) -> Outcome {
        let mut state = PipelineState::Fetching;
        tracing::debug!(target: "pipeline", source = self.source.name(), "fetching");

        let records = self
            .source
            .fetch_latest()
            .await
            .map_err(|e| fail(&mut state, Stage::Fetching, e))?;
        let fetched = records.len();

        transition(&mut state, PipelineState::Scoring);
        let rows = self
            .score_all(records, ingested_at)
            .map_err(|e| fail(&mut state, Stage::Scoring, e))?;
        let dropped = fetched - rows.len();

        transition(&mut state, PipelineState::Writing);
        let rows_written = if rows.is_empty() {
            0
        } else {
            self.sink
                .append(&rows)
                .await
                .map_err(|e| fail(&mut state, Stage::Writing, e))?
        };

        transition(&mut state, PipelineState::Done);
        Ok(RunReport {
            rows_written,
            fetched,
            dropped,
            ingested_at,
        })
    }

    /// Drop check, score, build row. Any scoring error aborts the whole batch.
    fn score_all(
        &self,
        records: Vec<HeadlineRecord>,
        ingested_at: DateTime<Utc>,
    ) -> crate::error::Result<Vec<WarehouseRow>> {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let Some(headline) = prepare_headline(&record) else {
                continue;
            };
            let sentiment_score = self.scorer.score(&headline).map_err(|e| {
                PipelineError::ContractViolation(format!("scoring {headline:?}: {e}"))
            })?;
            if !sentiment_score.is_finite() {
                return Err(PipelineError::ContractViolation(format!(
                    "non-finite score for {headline:?}"
                )));
            }
            let scored = ScoredHeadline {
                record,
                headline,
                sentiment_score,
            };
            rows.push(build_row(&scored, ingested_at));
        }
        Ok(rows)
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    tracing::debug!(target: "pipeline", from = ?*state, to = ?next, "state");
    *state = next;
}

fn fail(state: &mut PipelineState, stage: Stage, error: PipelineError) -> PipelineFailure {
    transition(state, PipelineState::Failed);
    PipelineFailure::new(stage, error)
}

/// Full invocation from an environment-like lookup: validate config, build
/// components, run the pipeline, record metrics.
pub async fn invoke<F>(lookup: F, started_at: DateTime<Utc>) -> Outcome
where
    F: Fn(&str) -> Option<String>,
{
    ensure_metrics_described();

    let outcome = match PipelineConfig::from_lookup(lookup) {
        Ok(cfg) => run_with_config(&cfg, started_at).await,
        Err(e) => Err(PipelineFailure::new(Stage::Configuration, e)),
    };

    record_outcome(&outcome);
    outcome
}

pub async fn run_with_config(cfg: &PipelineConfig, started_at: DateTime<Utc>) -> Outcome {
    let client = reqwest::Client::builder()
        .timeout(cfg.http_timeout)
        .build()
        .map_err(|e| {
            PipelineFailure::new(
                Stage::Configuration,
                PipelineError::ContractViolation(format!("http client: {e}")),
            )
        })?;

    let source = NewsApiProvider::new(client.clone(), &cfg.news_api_base_url, &cfg.news_api_key);
    let token = TokenSource::from_config(
        client.clone(),
        cfg.warehouse_access_token.clone(),
        &cfg.metadata_host,
    );
    let sink = BigQueryWriter::new(client, &cfg.warehouse_api_base_url, cfg.table.clone(), token);
    let scorer = SentimentAnalyzer::new();

    Pipeline::new(&source, &scorer, &sink).run(started_at).await
}

fn record_outcome(outcome: &Outcome) {
    match outcome {
        Ok(r) => {
            counter!("pipeline_runs_total", "outcome" => "success").increment(1);
            counter!("pipeline_rows_written_total").increment(r.rows_written as u64);
            counter!("pipeline_rows_dropped_total").increment(r.dropped as u64);
            gauge!("pipeline_last_success_ts").set(r.ingested_at.timestamp() as f64);
            info!(
                target: "pipeline",
                rows_written = r.rows_written,
                fetched = r.fetched,
                dropped = r.dropped,
                ingested_at = %r.ingested_at,
                "invocation done"
            );
        }
        Err(f) => {
            counter!("pipeline_runs_total", "outcome" => "failure").increment(1);
            counter!("pipeline_failures_total", "cause" => f.error.cause()).increment(1);
            warn!(
                target: "pipeline",
                stage = ?f.stage,
                cause = f.error.cause(),
                error = %f.error,
                "invocation failed"
            );
        }
    }
}

/// Structured payload returned to the trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InvocationResponse {
    Ok {
        state: PipelineState,
        rows_written: usize,
        fetched: usize,
        dropped: usize,
        ingested_at: DateTime<Utc>,
    },
    Error {
        state: PipelineState,
        stage: Stage,
        cause: &'static str,
        transient: bool,
        message: String,
    },
}

impl From<&Outcome> for InvocationResponse {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Ok(r) => InvocationResponse::Ok {
                state: PipelineState::Done,
                rows_written: r.rows_written,
                fetched: r.fetched,
                dropped: r.dropped,
                ingested_at: r.ingested_at,
            },
            Err(f) => InvocationResponse::Error {
                state: PipelineState::Failed,
                stage: f.stage,
                cause: f.error.cause(),
                transient: f.error.is_transient(),
                message: f.error.to_string(),
            },
        }
    }
}
