//! Configuration data structures for tasksearch.
//!
//! Every threshold the search pipeline uses lives here so callers can tune
//! it per deployment and tests can pin it. All fields have serde defaults,
//! so a partial YAML file is always valid.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskSearchError};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the search engine.
///
/// Loaded from YAML files and environment variables by
/// [`crate::config::loader::load_config`], then passed explicitly into
/// [`crate::search::SearchService::new`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub fuzzy: FuzzyConfig,

    #[serde(default)]
    pub expansion: ExpansionConfig,

    #[serde(default)]
    pub escalation: EscalationConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub parallel: ParallelConfig,

    #[serde(default)]
    pub semantic: SemanticConfig,
}

impl SearchConfig {
    /// Reject values that would break pipeline invariants.
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| {
            if v.is_finite() && (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(TaskSearchError::Config(format!(
                    "{name} must be within [0, 1], got {v}"
                )))
            }
        };
        unit("fuzzy.min_score", self.fuzzy.min_score)?;
        unit("fuzzy.similarity_threshold", self.fuzzy.similarity_threshold)?;
        unit("fuzzy.category_bonus", self.fuzzy.category_bonus)?;
        unit("fuzzy.fuzzy_token_credit", self.fuzzy.fuzzy_token_credit)?;
        unit("escalation.min_top_score", self.escalation.min_top_score)?;

        if self.expansion.max_variants == 0 {
            return Err(TaskSearchError::Config(
                "expansion.max_variants must be at least 1".into(),
            ));
        }
        if self.limits.default_limit == 0 || self.limits.max_limit == 0 {
            return Err(TaskSearchError::Config("limits must be at least 1".into()));
        }
        if self.limits.default_limit > self.limits.max_limit {
            return Err(TaskSearchError::Config(format!(
                "limits.default_limit ({}) exceeds limits.max_limit ({})",
                self.limits.default_limit, self.limits.max_limit
            )));
        }
        if self.escalation.timeout_ms == 0 {
            return Err(TaskSearchError::Config(
                "escalation.timeout_ms must be positive".into(),
            ));
        }
        if self.semantic.backend == SemanticBackendKind::Http && self.semantic.endpoint.is_none() {
            return Err(TaskSearchError::Config(
                "semantic.endpoint is required for the http backend".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Fuzzy matcher thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyConfig {
    /// Candidates scoring below this are dropped.
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    /// Edit similarity needed for a whole-content fuzzy match.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Flat bonus when the task category matches a token or entity.
    #[serde(default = "default_category_bonus")]
    pub category_bonus: f64,

    /// Credit for a token matched within one edit instead of exactly.
    #[serde(default = "default_fuzzy_token_credit")]
    pub fuzzy_token_credit: f64,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            similarity_threshold: default_similarity_threshold(),
            category_bonus: default_category_bonus(),
            fuzzy_token_credit: default_fuzzy_token_credit(),
        }
    }
}

/// Query expansion limits and lexicon extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionConfig {
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,

    #[serde(default = "default_max_synonym_variants")]
    pub max_synonym_variants: usize,

    /// Upper bound on typo-correction edit distance for long tokens.
    #[serde(default = "default_max_edit_distance")]
    pub max_edit_distance: usize,

    /// Words added to the built-in vocabulary.
    #[serde(default)]
    pub extra_vocabulary: Vec<String>,

    /// Synonym groups added to the built-in table.
    #[serde(default)]
    pub extra_synonyms: Vec<Vec<String>>,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_variants: default_max_variants(),
            max_synonym_variants: default_max_synonym_variants(),
            max_edit_distance: default_max_edit_distance(),
            extra_vocabulary: Vec::new(),
            extra_synonyms: Vec::new(),
        }
    }
}

/// When the orchestrator escalates to the semantic backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Automatic escalation on weak fuzzy results. A forced request escalates
    /// regardless.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Escalate when fewer fuzzy candidates than this survive.
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,

    /// Escalate when the best fuzzy score is below this.
    #[serde(default = "default_min_top_score")]
    pub min_top_score: f64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_candidates: default_min_candidates(),
            min_top_score: default_min_top_score(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Result-size limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// How many variant strings the response previews.
    #[serde(default = "default_variation_preview")]
    pub variation_preview: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            variation_preview: default_variation_preview(),
        }
    }
}

/// Parallel scoring knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Task x variant pairs at which scoring moves to the worker pool.
    #[serde(default = "default_parallel_threshold")]
    pub threshold: usize,

    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            threshold: default_parallel_threshold(),
            max_workers: default_max_workers(),
        }
    }
}

// ---------------------------------------------------------------------------
// Semantic backend selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticBackendKind {
    #[default]
    None,
    Http,
    Embedding,
}

impl SemanticBackendKind {
    /// Parse from a loose string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" | "" => Some(Self::None),
            "http" | "remote" => Some(Self::Http),
            "embedding" | "local" => Some(Self::Embedding),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Http => "http",
            Self::Embedding => "embedding",
        }
    }
}

impl std::fmt::Display for SemanticBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticConfig {
    #[serde(default)]
    pub backend: SemanticBackendKind,

    /// URL the http backend POSTs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Name of the environment variable holding the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Model name forwarded to the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_min_score() -> f64 {
    0.25
}

fn default_similarity_threshold() -> f64 {
    0.8
}

fn default_category_bonus() -> f64 {
    0.1
}

fn default_fuzzy_token_credit() -> f64 {
    0.8
}

fn default_max_variants() -> usize {
    8
}

fn default_max_synonym_variants() -> usize {
    3
}

fn default_max_edit_distance() -> usize {
    2
}

fn default_min_candidates() -> usize {
    3
}

fn default_min_top_score() -> f64 {
    0.5
}

fn default_timeout_ms() -> u64 {
    4_000
}

fn default_limit() -> usize {
    10
}

fn default_max_limit() -> usize {
    50
}

fn default_variation_preview() -> usize {
    5
}

fn default_parallel_threshold() -> usize {
    2_048
}

fn default_max_workers() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
