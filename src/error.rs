//! Error types for tasksearch.
//!
//! Only validation, configuration, corpus-loading, and cancellation errors
//! ever reach a caller. Failures of the semantic backend are carried as
//! [`SemanticError`] and absorbed by the search orchestrator.

use thiserror::Error;

/// Failure modes of a semantic escalation backend.
///
/// The orchestrator treats every variant the same way: log, then fall back
/// to the fuzzy-only result set.
#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("semantic backend timed out after {0} ms")]
    Timeout(u64),

    #[error("semantic backend unavailable: {0}")]
    Unavailable(String),

    #[error("semantic backend rejected credentials: {0}")]
    Auth(String),

    #[error("semantic backend rate limit exceeded")]
    RateLimited,

    #[error("semantic backend transport error: {0}")]
    Transport(String),

    #[error("semantic backend returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum TaskSearchError {
    /// Caller input rejected before the pipeline runs.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("corpus error: {0}")]
    Corpus(String),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error("search cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl TaskSearchError {
    /// Whether the error is the caller's fault (maps to a 400-class status).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, TaskSearchError>;
