//! Caller-facing request and response shapes.
//!
//! These are what the MCP tools and the CLI's `--json` mode exchange. Field
//! names are camelCase on the wire.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::LimitsConfig;
use crate::error::{Result, TaskSearchError};
use crate::types::{Entity, NormalizedQuery, QueryVariant, SearchMethod, SearchOptions, SearchResult};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[schemars(description = "Natural-language search query, e.g. 'dentist appt' or 'fix sink'")]
    pub query: String,
    #[schemars(description = "Maximum number of matches to return (default 10)")]
    #[serde(default)]
    pub limit: Option<usize>,
    #[schemars(description = "Minimum match score between 0 and 1 (default 0.25)")]
    #[serde(default)]
    pub min_score: Option<f64>,
    #[schemars(description = "Always run the semantic pass, even when fuzzy matches look good")]
    #[serde(default)]
    pub force_semantic: Option<bool>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Check the request against `limits` and turn it into search options.
    pub fn validate(&self, limits: &LimitsConfig) -> Result<SearchOptions> {
        if self.query.trim().is_empty() {
            return Err(TaskSearchError::Validation("query must not be empty".into()));
        }
        if let Some(limit) = self.limit {
            if limit == 0 || limit > limits.max_limit {
                return Err(TaskSearchError::Validation(format!(
                    "limit must be between 1 and {}, got {limit}",
                    limits.max_limit
                )));
            }
        }
        if let Some(min_score) = self.min_score {
            if !min_score.is_finite() || !(0.0..=1.0).contains(&min_score) {
                return Err(TaskSearchError::Validation(format!(
                    "minScore must be between 0 and 1, got {min_score}"
                )));
            }
        }
        Ok(SearchOptions {
            limit: Some(self.limit.unwrap_or(limits.default_limit)),
            min_score: self.min_score,
            force_semantic: self.force_semantic.unwrap_or(false),
        })
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub match_count: usize,
    pub search_method: SearchMethod,
    pub search_time_ms: u64,
    pub query_expansion: QueryExpansion,
    pub matches: Vec<MatchView>,
    #[serde(skip_serializing_if = "is_zero")]
    pub skipped_tasks: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExpansion {
    pub original: String,
    pub normalized: String,
    pub variations: Vec<String>,
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub id: String,
    pub content: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: u8,
    /// Percentage, 0 to 100.
    pub score: u8,
    pub matched_on: String,
    pub reasoning: Option<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Convert a `[0, 1]` score to a whole percentage.
pub fn score_percent(score: f64) -> u8 {
    if !score.is_finite() {
        return 0;
    }
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}

impl SearchResponse {
    /// Build the wire response. `variation_preview` caps the number of
    /// variant strings listed.
    pub fn from_result(result: &SearchResult, variation_preview: usize) -> Self {
        Self {
            match_count: result.match_count(),
            search_method: result.method,
            search_time_ms: u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX),
            query_expansion: QueryExpansion {
                original: result.query.original.clone(),
                normalized: result.query.normalized(),
                variations: result
                    .variants
                    .iter()
                    .take(variation_preview)
                    .map(|v| v.text.clone())
                    .collect(),
                entities: result.query.entities.clone(),
            },
            matches: result
                .matches
                .iter()
                .map(|m| MatchView {
                    id: m.task.id.clone(),
                    content: m.task.content.clone(),
                    description: m.task.description.clone(),
                    category: m.task.category.clone(),
                    priority: m.task.priority,
                    score: score_percent(m.candidate.score),
                    matched_on: m.candidate.matched_on_label(),
                    reasoning: m.candidate.reasoning.clone(),
                })
                .collect(),
            skipped_tasks: result.diagnostics.skipped_tasks,
            degraded: result.diagnostics.degraded,
        }
    }
}

/// Output of query expansion on its own, for inspecting how a query will be
/// interpreted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionResponse {
    pub original: String,
    pub normalized: String,
    pub tokens: Vec<String>,
    pub entities: Vec<Entity>,
    pub variants: Vec<QueryVariant>,
}

impl ExpansionResponse {
    pub fn new(query: &NormalizedQuery, variants: Vec<QueryVariant>) -> Self {
        Self {
            original: query.original.clone(),
            normalized: query.normalized(),
            tokens: query.tokens.clone(),
            entities: query.entities.clone(),
            variants,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
