//! Semantic escalation backends.
//!
//! The orchestrator calls a backend only when the fuzzy pass looks weak or
//! the caller forces it. Every failure is a [`SemanticError`]; the
//! orchestrator handles all of them the same way.
//!
//! Backends:
//! - [`HttpSemanticBackend`]: POSTs the query and corpus to a remote service.
//! - `EmbeddingSemanticBackend` (feature `embedding`): local MiniLM
//!   embeddings via fastembed, cosine similarity against task text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::{SemanticBackendKind, SemanticConfig};
use crate::error::{Result, SemanticError, TaskSearchError};
use crate::observability::redact_secrets;
use crate::types::Task;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One scored task returned by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticHit {
    pub task_id: String,
    pub score: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// An AI or embedding service that can rank a corpus against a query.
#[async_trait]
pub trait SemanticBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Rank `corpus` against `query`, returning at most `limit` hits.
    ///
    /// Implementations must not block the async runtime; the caller bounds
    /// the call with a timeout and drops the future on cancellation.
    async fn semantic_search(
        &self,
        query: &str,
        corpus: &[Task],
        limit: usize,
    ) -> std::result::Result<Vec<SemanticHit>, SemanticError>;
}

/// Build the backend selected in `config`, or `None` when escalation has no
/// backend. `timeout` is also applied at the HTTP client level.
pub fn build_backend(
    config: &SemanticConfig,
    timeout: Duration,
) -> Result<Option<Arc<dyn SemanticBackend>>> {
    match config.backend {
        SemanticBackendKind::None => Ok(None),
        SemanticBackendKind::Http => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                TaskSearchError::Config("semantic.endpoint is required for the http backend".into())
            })?;
            let api_key = config
                .api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|k| !k.trim().is_empty());
            let backend = HttpSemanticBackend::new(endpoint, api_key, timeout)?;
            Ok(Some(Arc::new(backend)))
        }
        SemanticBackendKind::Embedding => build_embedding_backend(config),
    }
}

#[cfg(feature = "embedding")]
fn build_embedding_backend(config: &SemanticConfig) -> Result<Option<Arc<dyn SemanticBackend>>> {
    let backend = EmbeddingSemanticBackend::try_new(config.model.as_deref())?;
    Ok(Some(Arc::new(backend)))
}

#[cfg(not(feature = "embedding"))]
fn build_embedding_backend(_config: &SemanticConfig) -> Result<Option<Arc<dyn SemanticBackend>>> {
    Err(TaskSearchError::Config(
        "the embedding backend requires building with the `embedding` feature".into(),
    ))
}

// ---------------------------------------------------------------------------
// HTTP backend
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SemanticRequest<'a> {
    query: &'a str,
    limit: usize,
    tasks: Vec<TaskPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct TaskPayload<'a> {
    id: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    labels: &'a [String],
}

impl<'a> From<&'a Task> for TaskPayload<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            id: &task.id,
            content: &task.content,
            description: task.description.as_deref(),
            category: task.category.as_deref(),
            labels: &task.labels,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SemanticResponse {
    #[serde(default)]
    results: Vec<SemanticHit>,
}

/// Remote semantic search over HTTP.
///
/// Request: `{"query", "limit", "tasks": [{"id", "content", ...}]}`.
/// Response: `{"results": [{"taskId", "score", "reasoning"}]}`.
#[derive(Debug, Clone)]
pub struct HttpSemanticBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl HttpSemanticBackend {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tasksearch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TaskSearchError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SemanticBackend for HttpSemanticBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn semantic_search(
        &self,
        query: &str,
        corpus: &[Task],
        limit: usize,
    ) -> std::result::Result<Vec<SemanticHit>, SemanticError> {
        let body = SemanticRequest {
            query,
            limit,
            tasks: corpus.iter().map(TaskPayload::from).collect(),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(status_error(status, &detail));
        }

        let parsed: SemanticResponse = response
            .json()
            .await
            .map_err(|e| SemanticError::InvalidResponse(e.to_string()))?;
        Ok(parsed.results)
    }
}

/// Map a non-success HTTP status to the matching error variant.
fn status_error(status: StatusCode, detail: &str) -> SemanticError {
    let detail = detail.trim();
    let message = if detail.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {}", redact_secrets(truncate(detail, 200)))
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SemanticError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => SemanticError::RateLimited,
        _ => SemanticError::Unavailable(message),
    }
}

fn transport_error(e: reqwest::Error, timeout_ms: u64) -> SemanticError {
    if e.is_timeout() {
        SemanticError::Timeout(timeout_ms)
    } else {
        SemanticError::Transport(e.to_string())
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Embedding backend
// ---------------------------------------------------------------------------

#[cfg(feature = "embedding")]
pub use embedding::EmbeddingSemanticBackend;

#[cfg(feature = "embedding")]
mod embedding {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    use super::{SemanticBackend, SemanticHit};
    use crate::error::{Result, SemanticError, TaskSearchError};
    use crate::types::Task;

    /// Local semantic search with a fastembed sentence model.
    ///
    /// Downloads the model on first use; later runs load it from the
    /// fastembed cache directory.
    pub struct EmbeddingSemanticBackend {
        model: Arc<Mutex<TextEmbedding>>,
        model_name: String,
    }

    impl EmbeddingSemanticBackend {
        /// `model` is a fastembed model code; defaults to all-MiniLM-L6-v2.
        pub fn try_new(model: Option<&str>) -> Result<Self> {
            let kind = match model {
                None => EmbeddingModel::AllMiniLML6V2,
                Some(code) => TextEmbedding::list_supported_models()
                    .into_iter()
                    .find(|m| m.model_code.eq_ignore_ascii_case(code))
                    .map(|m| m.model)
                    .ok_or_else(|| {
                        TaskSearchError::Config(format!("unknown embedding model '{code}'"))
                    })?,
            };
            let model_name = format!("{kind:?}");
            let options = InitOptions::new(kind).with_show_download_progress(false);
            let model = TextEmbedding::try_new(options).map_err(|e| {
                TaskSearchError::Config(format!("failed to initialize embedding model: {e}"))
            })?;
            Ok(Self {
                model: Arc::new(Mutex::new(model)),
                model_name,
            })
        }

        pub fn model_name(&self) -> &str {
            &self.model_name
        }
    }

    fn task_text(task: &Task) -> String {
        let mut text = task.content.clone();
        if let Some(description) = &task.description {
            text.push_str(". ");
            text.push_str(description);
        }
        text
    }

    fn cosine(a: &[f32], b: &[f32]) -> f64 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na <= f32::EPSILON || nb <= f32::EPSILON {
            return 0.0;
        }
        f64::from(dot / (na * nb))
    }

    #[async_trait]
    impl SemanticBackend for EmbeddingSemanticBackend {
        fn name(&self) -> &str {
            "embedding"
        }

        async fn semantic_search(
            &self,
            query: &str,
            corpus: &[Task],
            limit: usize,
        ) -> std::result::Result<Vec<SemanticHit>, SemanticError> {
            if corpus.is_empty() || limit == 0 {
                return Ok(Vec::new());
            }

            let mut texts = Vec::with_capacity(corpus.len() + 1);
            texts.push(query.to_string());
            texts.extend(corpus.iter().map(task_text));
            let ids: Vec<String> = corpus.iter().map(|t| t.id.clone()).collect();
            let model = Arc::clone(&self.model);

            // Inference is CPU-bound; keep it off the async workers.
            let embeddings = tokio::task::spawn_blocking(move || {
                let mut model = model
                    .lock()
                    .map_err(|_| SemanticError::Unavailable("embedding model lock poisoned".into()))?;
                model
                    .embed(texts, None)
                    .map_err(|e| SemanticError::Unavailable(format!("embedding failed: {e}")))
            })
            .await
            .map_err(|e| SemanticError::Unavailable(format!("embedding task failed: {e}")))??;

            let Some((query_vec, task_vecs)) = embeddings.split_first() else {
                return Err(SemanticError::InvalidResponse("no embeddings returned".into()));
            };

            let mut hits: Vec<SemanticHit> = ids
                .into_iter()
                .zip(task_vecs)
                .map(|(task_id, vec)| {
                    let score = cosine(query_vec, vec).clamp(0.0, 1.0);
                    SemanticHit {
                        task_id,
                        score,
                        reasoning: Some(format!("embedding similarity {score:.2}")),
                    }
                })
                .collect();
            hits.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            hits.truncate(limit);
            Ok(hits)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
