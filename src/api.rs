// src/api.rs
//! HTTP trigger surface. Every hit on `/` or `/run` is one pipeline
//! invocation; request body and query are ignored.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use tower_http::trace::TraceLayer;

use crate::error::PipelineError;
use crate::pipeline::{self, InvocationResponse};

/// Key lookup used to build the per-invocation configuration.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub env: EnvLookup,
}

impl AppState {
    /// Reads the process environment on every invocation.
    pub fn from_env() -> Self {
        Self {
            env: Arc::new(|k| std::env::var(k).ok()),
        }
    }

    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            env: Arc::new(lookup),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/", get(trigger).post(trigger))
        .route("/run", get(trigger).post(trigger))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 4xx only when the deployment itself is misconfigured; outages are 5xx.
pub fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::ConfigurationInvalid(_) => StatusCode::BAD_REQUEST,
        PipelineError::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::SourceRejected { .. } | PipelineError::WriteFailed(_) => {
            StatusCode::BAD_GATEWAY
        }
        PipelineError::ContractViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn trigger(State(state): State<AppState>) -> (StatusCode, Json<InvocationResponse>) {
    // Captured once; every row of this run carries it.
    let started_at = Utc::now();
    let env = state.env.clone();
    let outcome = pipeline::invoke(move |k| env(k), started_at).await;

    let status = match &outcome {
        Ok(_) => StatusCode::OK,
        Err(f) => status_for(&f.error),
    };
    (status, Json(InvocationResponse::from(&outcome)))
}
