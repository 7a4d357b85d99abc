//! Logging setup, search metrics, and redaction of secrets in
//! backend-supplied text.
//!
//! - [`init_logging`]: one-time `tracing` subscriber setup with `RUST_LOG`
//! - [`SearchMetrics`]: counters over completed searches
//! - [`redact_secrets`]: scrub tokens out of remote error bodies before they
//!   are logged or returned

use std::sync::LazyLock;

use regex::Regex;
use tracing_subscriber::EnvFilter;

use crate::types::{SearchMethod, SearchResult};

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// Defaults to `tasksearch=info`. Output goes to stderr so the MCP stdio
/// transport keeps stdout to itself. Later calls are ignored.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tasksearch=info"));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

// ---------------------------------------------------------------------------
// Redaction
// ---------------------------------------------------------------------------

static SECRET_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r#"(?i)(api[_-]?key|apikey)\s*[:=]\s*['"]?([a-zA-Z0-9_\-]{20,})['"]?"#,
            "$1=***REDACTED***",
        ),
        (
            r#"(?i)(secret|token)\s*[:=]\s*['"]?([a-zA-Z0-9_\-]{20,})['"]?"#,
            "$1=***REDACTED***",
        ),
        (r"(?i)Bearer\s+[a-zA-Z0-9_\-\.]{20,}", "Bearer ***REDACTED***"),
        (r"\bsk-[a-zA-Z0-9_\-]{20,}", "***REDACTED***"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Replace things that look like API keys or bearer tokens with
/// `***REDACTED***`.
pub fn redact_secrets(text: &str) -> String {
    let mut result = text.to_string();
    for (re, replacement) in SECRET_PATTERNS.iter() {
        result = re.replace_all(&result, *replacement).into_owned();
    }
    result
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters over the searches a process has served.
///
/// Serializable to JSON via [`SearchMetrics::to_json`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchMetrics {
    pub searches: u64,
    pub empty_queries: u64,
    pub escalations_attempted: u64,
    pub escalation_failures: u64,
    pub semantic_searches: u64,
    pub degraded_results: u64,
    pub skipped_tasks: u64,
    pub matches_returned: u64,
    pub total_search_ms: u64,
}

impl SearchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one finished search into the counters.
    pub fn record(&mut self, result: &SearchResult) {
        self.searches += 1;
        let diagnostics = &result.diagnostics;
        if result.method == SearchMethod::None && !diagnostics.degraded {
            self.empty_queries += 1;
        }
        if diagnostics.escalation_attempted {
            self.escalations_attempted += 1;
        }
        if diagnostics.escalation_error.is_some() {
            self.escalation_failures += 1;
        }
        if result.method == SearchMethod::FuzzySemantic {
            self.semantic_searches += 1;
        }
        if diagnostics.degraded {
            self.degraded_results += 1;
        }
        self.skipped_tasks += diagnostics.skipped_tasks as u64;
        self.matches_returned += result.match_count() as u64;
        self.total_search_ms += u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX);
    }

    pub fn average_search_ms(&self) -> f64 {
        if self.searches == 0 {
            return 0.0;
        }
        self.total_search_ms as f64 / self.searches as f64
    }

    /// Share of attempted escalations that failed and fell back to fuzzy.
    pub fn escalation_failure_rate(&self) -> f64 {
        if self.escalations_attempted == 0 {
            return 0.0;
        }
        self.escalation_failures as f64 / self.escalations_attempted as f64
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "searches": self.searches,
            "empty_queries": self.empty_queries,
            "escalations_attempted": self.escalations_attempted,
            "escalation_failures": self.escalation_failures,
            "escalation_failure_rate": self.escalation_failure_rate(),
            "semantic_searches": self.semantic_searches,
            "degraded_results": self.degraded_results,
            "skipped_tasks": self.skipped_tasks,
            "matches_returned": self.matches_returned,
            "average_search_ms": self.average_search_ms(),
        })
    }
}
