//! Headline sentiment service — binary entrypoint.
//! Boots the Axum HTTP server; each request to `/` or `/run` runs the pipeline once.

use headline_sentiment_pipeline::{api, metrics::Metrics, AppState};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    headline_sentiment_pipeline::init_tracing();

    // Configuration is read per invocation, not here: a bad deploy still
    // answers triggers with a ConfigurationInvalid payload.
    let state = AppState::from_env();
    let mut router = api::router(state);

    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = %e, "prometheus recorder not installed"),
    }

    Ok(router.into())
}
