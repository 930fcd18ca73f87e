// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod sentiment;
pub mod warehouse;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::PipelineConfig;
pub use crate::error::{PipelineError, PipelineFailure, Stage};
pub use crate::pipeline::{invoke, InvocationResponse, Pipeline, PipelineState, RunReport};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter; `LOG_FORMAT=json` switches to JSON lines for log collectors.
/// Safe to call when a subscriber is already installed (it is then a no-op).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("headline_sentiment_pipeline=info,pipeline=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
