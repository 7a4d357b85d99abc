//! End-to-end search scenarios against the public `SearchService` API.
//!
//! Escalation is either disabled or driven by in-process mock backends, so
//! every assertion here is deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq as pa_eq;
use test_case::test_case;
use tokio_util::sync::CancellationToken;

use tasksearch::config::SearchConfig;
use tasksearch::error::{SemanticError, TaskSearchError};
use tasksearch::search::{SearchResponse, SemanticBackend, SemanticHit, SearchService};
use tasksearch::types::{MatchedOn, SearchMethod, SearchOptions, SearchResult, Task};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn household() -> Vec<Task> {
    vec![
        Task::new("t1", "Fix the kitchen sink").with_category("Home"),
        Task::new("t2", "Buy groceries").with_labels(["errands"]),
        Task::new("t3", "Call dentist for appointment").with_category("Health"),
        Task::new("t4", "Email Sarah about the tax forms")
            .with_description("She needs the W-2 by Friday"),
        Task::new("t5", "Book flight to Denver").with_priority(1),
    ]
}

fn opts() -> SearchOptions {
    SearchOptions::default()
}

fn forced() -> SearchOptions {
    SearchOptions {
        force_semantic: true,
        ..Default::default()
    }
}

fn ids(result: &SearchResult) -> Vec<&str> {
    result.matches.iter().map(|m| m.task.id.as_str()).collect()
}

/// Backend that fails every call and counts how often it was asked.
struct FailingBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl SemanticBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn semantic_search(
        &self,
        _query: &str,
        _corpus: &[Task],
        _limit: usize,
    ) -> Result<Vec<SemanticHit>, SemanticError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SemanticError::Unavailable("503 service unavailable".into()))
    }
}

/// Backend that never answers within any reasonable timeout.
struct SlowBackend;

#[async_trait]
impl SemanticBackend for SlowBackend {
    fn name(&self) -> &str {
        "slow"
    }

    async fn semantic_search(
        &self,
        _query: &str,
        corpus: &[Task],
        _limit: usize,
    ) -> Result<Vec<SemanticHit>, SemanticError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(corpus
            .iter()
            .map(|t| SemanticHit {
                task_id: t.id.clone(),
                score: 0.9,
                reasoning: None,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dentist_appt_finds_the_appointment() {
    let corpus = vec![
        Task::new("t1", "Call dentist for appointment"),
        Task::new("t2", "Buy groceries"),
    ];
    let service = SearchService::new(SearchConfig::default());
    let result = service.search("dentist appt", &corpus, &opts()).await;

    pa_eq!(ids(&result), vec!["t1"]);
    let response = SearchResponse::from_result(&result, 5);
    pa_eq!(response.match_count, 1);
    assert!(response.matches[0].score >= 25);
}

#[test_case("fix sink" ; "missing word")]
#[test_case("fx sink" ; "typo")]
#[test_case("Fix the kitchn sink" ; "misspelled content")]
#[tokio::test]
async fn typo_tolerance_surfaces_sink_task(query: &str) {
    let service = SearchService::new(SearchConfig::default());
    let result = service.search(query, &household(), &opts()).await;

    let hit = result
        .matches
        .iter()
        .find(|m| m.task.id == "t1")
        .unwrap_or_else(|| panic!("t1 missing for {query:?}: {:?}", ids(&result)));
    assert!(
        hit.candidate.matched_on_label().contains("fuzzy")
            || hit.candidate.matched_on == MatchedOn::Exact,
        "matched on {}",
        hit.candidate.matched_on_label()
    );
    assert!(hit.candidate.score >= 0.25);
}

#[tokio::test]
async fn exact_content_ranks_first_with_full_score() {
    let corpus = vec![
        Task::new("a", "Buy milk and eggs"),
        Task::new("b", "Buy milk"),
        Task::new("c", "Buy almond milk"),
    ];
    let service = SearchService::new(SearchConfig::default());
    let result = service.search("Buy milk", &corpus, &opts()).await;

    pa_eq!(result.matches[0].task.id, "b");
    let response = SearchResponse::from_result(&result, 5);
    pa_eq!(response.matches[0].score, 100);
    pa_eq!(response.matches[0].matched_on, "exact");
}

#[test_case("" ; "empty")]
#[test_case("   \t " ; "whitespace")]
#[tokio::test]
async fn empty_query_returns_none_without_escalating(query: &str) {
    let backend = Arc::new(FailingBackend {
        calls: AtomicUsize::new(0),
    });
    let service = SearchService::new(SearchConfig::default()).with_semantic_backend(backend.clone());
    let result = service.search(query, &household(), &forced()).await;

    pa_eq!(result.method, SearchMethod::None);
    assert!(result.matches.is_empty());
    pa_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_backend_falls_back_to_fuzzy() {
    let backend = Arc::new(FailingBackend {
        calls: AtomicUsize::new(0),
    });
    let service = SearchService::new(SearchConfig::default()).with_semantic_backend(backend.clone());
    let result = service.search("obscure phrase", &household(), &forced()).await;

    pa_eq!(result.method, SearchMethod::Fuzzy);
    pa_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert!(result.diagnostics.escalation_attempted);
    assert!(result.diagnostics.escalation_error.is_some());
    assert!(!result.diagnostics.degraded);
}

#[tokio::test]
async fn slow_backend_times_out_and_keeps_fuzzy_results() {
    let mut config = SearchConfig::default();
    config.escalation.timeout_ms = 50;
    let service = SearchService::new(config).with_semantic_backend(Arc::new(SlowBackend));

    let started = std::time::Instant::now();
    let result = service.search("fx sink", &household(), &forced()).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    pa_eq!(result.method, SearchMethod::Fuzzy);
    pa_eq!(ids(&result)[0], "t1");
    let error = result.diagnostics.escalation_error.unwrap_or_default();
    assert!(error.contains("timed out"), "unexpected error: {error}");
}

#[tokio::test]
async fn cancellation_aborts_pending_escalation() {
    let service = SearchService::new(SearchConfig::default()).with_semantic_backend(Arc::new(SlowBackend));
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let outcome = service
        .search_with_cancel("fx sink", &household(), &forced(), &token)
        .await;

    assert!(matches!(outcome, Err(TaskSearchError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn uncancelled_token_behaves_like_plain_search() {
    let service = SearchService::new(SearchConfig::default());
    let token = CancellationToken::new();
    let with_token = service
        .search_with_cancel("buy groceries", &household(), &opts(), &token)
        .await
        .unwrap();
    let plain = service.search("buy groceries", &household(), &opts()).await;
    pa_eq!(ids(&with_token), ids(&plain));
}

#[test_case(1)]
#[test_case(2)]
#[test_case(50)]
#[tokio::test]
async fn limit_respected_and_ids_unique(limit: usize) {
    let mut corpus = household();
    corpus.extend(household());
    corpus.push(Task::new("t6", "Buy birthday gift"));
    let service = SearchService::new(SearchConfig::default());
    let options = SearchOptions {
        limit: Some(limit),
        min_score: Some(0.0),
        ..Default::default()
    };
    let result = service.search("buy", &corpus, &options).await;

    assert!(result.matches.len() <= limit);
    let mut seen = std::collections::HashSet::new();
    for id in ids(&result) {
        assert!(seen.insert(id), "duplicate id {id}");
    }
}

#[tokio::test]
async fn repeated_searches_are_identical() {
    let service = SearchService::new(SearchConfig::default());
    let corpus = household();
    let first = service.search("email sarah tax", &corpus, &opts()).await;
    let second = service.search("email sarah tax", &corpus, &opts()).await;

    let a = serde_json::to_value(SearchResponse::from_result(&first, 5)).unwrap();
    let b = serde_json::to_value(SearchResponse::from_result(&second, 5)).unwrap();
    // Timing is the only field allowed to differ.
    pa_eq!(a["matches"], b["matches"]);
    pa_eq!(a["queryExpansion"], b["queryExpansion"]);
}

#[tokio::test]
async fn no_matches_is_not_an_error() {
    let service = SearchService::new(SearchConfig::default());
    let result = service.search("quantum chromodynamics", &household(), &opts()).await;
    pa_eq!(result.method, SearchMethod::Fuzzy);
    assert!(result.matches.is_empty());
}

#[tokio::test]
async fn malformed_tasks_are_skipped_not_fatal() {
    let mut corpus = household();
    corpus.push(Task::new("", "orphan content"));
    corpus.push(Task::new("t9", "   "));
    let service = SearchService::new(SearchConfig::default());
    let result = service.search("orphan content", &corpus, &opts()).await;

    pa_eq!(result.diagnostics.skipped_tasks, 2);
    assert!(ids(&result).iter().all(|id| !id.is_empty()));
}
