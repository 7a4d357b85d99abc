//! MCP tool handler implementations.
//!
//! Handlers return JSON text. Caller mistakes come back as an error object
//! with `"code": 400`; anything else that fails outside the search core
//! (loading the corpus) uses `"code": 500`.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::corpus::{TaskFilter, TaskSource};
use crate::error::TaskSearchError;
use crate::observability::SearchMetrics;
use crate::search::{ExpansionResponse, SearchRequest, SearchResponse, SearchService};

pub(crate) fn json_text<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

pub(crate) fn error_text(err: &TaskSearchError) -> String {
    let code = if err.is_client_error() { 400 } else { 500 };
    json_text(&serde_json::json!({ "error": err.to_string(), "code": code }))
}

// task_search
pub async fn handle_search(
    service: &SearchService,
    source: &dyn TaskSource,
    filter: &TaskFilter,
    metrics: &Arc<Mutex<SearchMetrics>>,
    request: &SearchRequest,
) -> String {
    let options = match request.validate(&service.config().limits) {
        Ok(options) => options,
        Err(e) => return error_text(&e),
    };
    let corpus = match source.get_tasks(filter) {
        Ok(tasks) => tasks,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load task corpus");
            return error_text(&e);
        }
    };

    let result = service.search(&request.query, &corpus, &options).await;
    metrics
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .record(&result);

    let mut response =
        SearchResponse::from_result(&result, service.config().limits.variation_preview);
    response.skipped_tasks += source.skipped();
    json_text(&response)
}

// task_expand_query
pub fn handle_expand(
    service: &SearchService,
    source: &dyn TaskSource,
    filter: &TaskFilter,
    query: &str,
) -> String {
    if query.trim().is_empty() {
        return error_text(&TaskSearchError::Validation("query must not be empty".into()));
    }
    // Corpus words only sharpen typo correction; expand without them if the
    // source is unavailable.
    let corpus = source.get_tasks(filter).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "expanding without corpus vocabulary");
        Vec::new()
    });
    let (nq, variants) = service.expand(query, &corpus);
    json_text(&ExpansionResponse::new(&nq, variants))
}

// task_search_stats
pub fn handle_stats(service: &SearchService, metrics: &Arc<Mutex<SearchMetrics>>) -> String {
    let metrics = metrics.lock().unwrap_or_else(|e| e.into_inner());
    let mut stats = metrics.to_json();
    stats["semantic_backend"] = serde_json::json!(service.has_semantic_backend());
    stats["lexicon_words"] = serde_json::json!(service.lexicon().len());
    json_text(&stats)
}
