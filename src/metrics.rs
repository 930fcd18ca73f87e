// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_all);
}

fn describe_all() {
    describe_counter!(
        "pipeline_runs_total",
        "Pipeline invocations, labelled by outcome."
    );
    describe_counter!(
        "pipeline_failures_total",
        "Failed invocations, labelled by cause."
    );
    describe_counter!(
        "pipeline_headlines_fetched_total",
        "Headline records returned by the provider."
    );
    describe_counter!(
        "pipeline_rows_written_total",
        "Rows appended to the warehouse table."
    );
    describe_counter!(
        "pipeline_rows_dropped_total",
        "Records dropped before normalization (missing, blank or removed titles)."
    );
    describe_histogram!("pipeline_fetch_ms", "Provider fetch time in milliseconds.");
    describe_histogram!("pipeline_write_ms", "Warehouse append time in milliseconds.");
    describe_gauge!(
        "pipeline_last_success_ts",
        "Unix ts of the last successful invocation."
    );
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Call once per process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
