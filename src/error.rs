// src/error.rs
//! Failure taxonomy for one pipeline invocation.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// Missing or malformed configuration. Fatal until redeployed.
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// The provider could not be reached (timeout, connection, body read).
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The provider answered with a non-success status or an error payload.
    #[error("source rejected (status {status}{}): {message}", code_suffix(.code))]
    SourceRejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The warehouse append call errored or reported rejected rows.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Upstream contract broken inside the pipeline (a bug, not an outage).
    #[error("internal contract violation: {0}")]
    ContractViolation(String),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(", code {c}"))
        .unwrap_or_default()
}

impl PipelineError {
    /// Stable cause string used in responses, logs and metric labels.
    pub fn cause(&self) -> &'static str {
        match self {
            PipelineError::ConfigurationInvalid(_) => "ConfigurationInvalid",
            PipelineError::SourceUnavailable(_) => "SourceUnavailable",
            PipelineError::SourceRejected { .. } => "SourceRejected",
            PipelineError::WriteFailed(_) => "WriteFailed",
            PipelineError::ContractViolation(_) => "ContractViolation",
        }
    }

    /// Transient causes are retried by the external scheduler on its next tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable(_)
                | PipelineError::SourceRejected { .. }
                | PipelineError::WriteFailed(_)
        )
    }
}

/// Stage of the invocation in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Configuration,
    Fetching,
    Scoring,
    Writing,
}

/// Terminal failure of an invocation: where it failed and why.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{stage:?} failed: {error}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

impl PipelineFailure {
    pub fn new(stage: Stage, error: PipelineError) -> Self {
        Self { stage, error }
    }
}
