//! Core domain types for tasksearch.
//!
//! Tasks are read-only input. Everything else here is created fresh for a
//! single search call and dropped afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A task as supplied by the task provider.
///
/// The search engine never mutates tasks; it only reads a corpus snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Provider priority, 1 (normal) through 4 (urgent).
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Due date as the provider reports it (usually `YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub completed: bool,
}

fn default_priority() -> u8 {
    1
}

impl Task {
    /// Minimal task with only an id and content.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            description: None,
            labels: Vec::new(),
            priority: default_priority(),
            category: None,
            due: None,
            completed: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// A task with blank content or id cannot be matched and is skipped.
    pub fn is_searchable(&self) -> bool {
        !self.id.trim().is_empty() && !self.content.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Kind of an entity extracted from the raw query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Capitalized multi-word run, e.g. "John Smith".
    Name,
    /// ISO date or relative date word ("today", "friday").
    Date,
    /// Quoted substring, kept verbatim.
    Phrase,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Date => "date",
            Self::Phrase => "phrase",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub text: String,
}

impl Entity {
    pub fn new(kind: EntityKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized query and variants
// ---------------------------------------------------------------------------

/// The query after lower-casing, tokenization, stop-word removal, and
/// entity extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedQuery {
    /// The raw query exactly as received.
    pub original: String,
    /// Lower-cased, trimmed, whitespace-collapsed form of `original`.
    pub text: String,
    pub tokens: Vec<String>,
    pub entities: Vec<Entity>,
}

impl NormalizedQuery {
    /// Nothing to search for: no tokens and no entities.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.entities.is_empty()
    }

    /// Tokens joined by single spaces.
    pub fn normalized(&self) -> String {
        self.tokens.join(" ")
    }
}

/// How a query variant was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariantSource {
    Identity,
    TypoCorrected,
    Synonym,
    EntityOnly,
}

impl VariantSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::TypoCorrected => "typo-corrected",
            Self::Synonym => "synonym",
            Self::EntityOnly => "entity-only",
        }
    }
}

/// One rewrite of the normalized query.
///
/// Variants are ordered by decreasing estimated relevance; `rank` is the
/// position in that order and is used as a tie-breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryVariant {
    pub rank: usize,
    pub source: VariantSource,
    pub text: String,
    pub tokens: Vec<String>,
}

impl QueryVariant {
    pub fn new(source: VariantSource, tokens: Vec<String>) -> Self {
        Self {
            rank: 0,
            source,
            text: tokens.join(" "),
            tokens,
        }
    }
}

// ---------------------------------------------------------------------------
// Match candidates
// ---------------------------------------------------------------------------

/// Which strategy produced a candidate's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchedOn {
    Exact,
    FuzzyContent,
    FuzzyDescription,
    TokenOverlap,
    Category,
    Semantic,
}

impl MatchedOn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::FuzzyContent => "fuzzy-content",
            Self::FuzzyDescription => "fuzzy-description",
            Self::TokenOverlap => "token-overlap",
            Self::Category => "category",
            Self::Semantic => "semantic",
        }
    }
}

impl std::fmt::Display for MatchedOn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored pairing of one corpus task with one query variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    /// Position of the task in the supplied corpus.
    pub task_index: usize,
    /// Rank of the variant that produced this score; `None` for semantic hits.
    pub variant_rank: Option<usize>,
    /// Always within `[0, 1]`.
    pub score: f64,
    pub matched_on: MatchedOn,
    /// A category bonus was applied on top of `matched_on`.
    pub category_bonus: bool,
    /// The variant text equals the whole (normalized) task content.
    pub full_content: bool,
    pub reasoning: Option<String>,
}

impl MatchCandidate {
    /// Display label, e.g. `fuzzy-content+category`.
    pub fn matched_on_label(&self) -> String {
        if self.category_bonus && self.matched_on != MatchedOn::Category {
            format!("{}+category", self.matched_on)
        } else {
            self.matched_on.to_string()
        }
    }

    /// Whether `self` should replace `other` as the best candidate for a task.
    ///
    /// Higher score wins; on a tie the candidate from the lower-ranked
    /// (more relevant) variant wins, and semantic hits rank after all
    /// variants.
    pub fn beats(&self, other: &MatchCandidate) -> bool {
        if self.score != other.score {
            return self.score > other.score;
        }
        let mine = self.variant_rank.unwrap_or(usize::MAX);
        let theirs = other.variant_rank.unwrap_or(usize::MAX);
        mine < theirs
    }
}

// ---------------------------------------------------------------------------
// Search options and results
// ---------------------------------------------------------------------------

/// Per-call search options. `None` fields fall back to the service config.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub min_score: Option<f64>,
    pub force_semantic: bool,
}

/// Which pipeline produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SearchMethod {
    /// Nothing to search for; the pipeline short-circuited.
    #[serde(rename = "none")]
    None,
    #[serde(rename = "fuzzy")]
    Fuzzy,
    #[serde(rename = "fuzzy+semantic")]
    FuzzySemantic,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Fuzzy => "fuzzy",
            Self::FuzzySemantic => "fuzzy+semantic",
        }
    }
}

impl std::fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A result entry: the task plus the candidate that ranked it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMatch {
    pub task: Task,
    pub candidate: MatchCandidate,
}

/// Counters describing what happened during one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchDiagnostics {
    /// Corpus entries skipped for missing id or content.
    pub skipped_tasks: usize,
    /// Candidates that survived the fuzzy pass, after per-task dedup.
    pub fuzzy_candidates: usize,
    /// Whether escalation was attempted.
    pub escalation_attempted: bool,
    /// Failure message when escalation was attempted and failed.
    pub escalation_error: Option<String>,
    /// Set when an internal invariant violation forced an empty result.
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub matches: Vec<RankedMatch>,
    pub method: SearchMethod,
    pub elapsed: Duration,
    pub query: NormalizedQuery,
    pub variants: Vec<QueryVariant>,
    pub diagnostics: SearchDiagnostics,
}

impl SearchResult {
    /// An empty result for `query`.
    pub fn empty(query: NormalizedQuery, method: SearchMethod) -> Self {
        Self {
            matches: Vec::new(),
            method,
            elapsed: Duration::ZERO,
            query,
            variants: Vec::new(),
            diagnostics: SearchDiagnostics::default(),
        }
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
