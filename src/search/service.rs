//! Search orchestrator.
//!
//! Pipeline per call: normalize → expand → fuzzy-match corpus × variants →
//! dedup per task → optional semantic escalation → rank → truncate.
//! Each call is stateless; the only shared state is the read-only lexicon
//! snapshot and the worker pool.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::config::SearchConfig;
use crate::error::{Result, SemanticError, TaskSearchError};
use crate::search::expansion::QueryExpander;
use crate::search::fuzzy::{score_prepared, PreparedTask};
use crate::search::lexicon::{corpus_vocabulary, Lexicon, SharedLexicon};
use crate::search::normalize::normalize;
use crate::search::semantic::{SemanticBackend, SemanticHit};
use crate::types::{
    Entity, MatchCandidate, MatchedOn, NormalizedQuery, QueryVariant, RankedMatch,
    SearchDiagnostics, SearchMethod, SearchOptions, SearchResult, Task,
};

/// Natural-language task search over a caller-supplied corpus.
///
/// Cheap to share behind an `Arc`; concurrent calls never contend on
/// anything but the lexicon `Arc` clone.
pub struct SearchService {
    config: SearchConfig,
    lexicon: SharedLexicon,
    backend: Option<Arc<dyn SemanticBackend>>,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService")
            .field("config", &self.config)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("workers", &self.pool.as_ref().map(|p| p.current_num_threads()))
            .finish_non_exhaustive()
    }
}

impl SearchService {
    /// Build a service without a semantic backend. Escalation decisions are
    /// still made, but nothing is called.
    pub fn new(config: SearchConfig) -> Self {
        let lexicon = SharedLexicon::new(Lexicon::from_config(&config.expansion));
        let pool = build_pool(config.parallel.max_workers);
        Self {
            config,
            lexicon,
            backend: None,
            pool,
        }
    }

    pub fn with_semantic_backend(mut self, backend: Arc<dyn SemanticBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_optional_backend(mut self, backend: Option<Arc<dyn SemanticBackend>>) -> Self {
        self.backend = backend;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn has_semantic_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Current lexicon snapshot.
    pub fn lexicon(&self) -> Arc<Lexicon> {
        self.lexicon.snapshot()
    }

    /// Rebuild the cached lexicon from config plus `corpus` vocabulary and
    /// swap it in as a whole. In-flight searches keep their old snapshot.
    pub fn rebuild_lexicon(&self, corpus: &[Task]) {
        let next = Lexicon::from_config(&self.config.expansion).extended(corpus_vocabulary(corpus));
        let words = next.len();
        self.lexicon.replace(next);
        tracing::debug!(words, "lexicon rebuilt");
    }

    /// Normalize and expand `query` the same way a search would.
    pub fn expand(&self, query: &str, corpus: &[Task]) -> (NormalizedQuery, Vec<QueryVariant>) {
        let nq = normalize(query);
        if nq.is_empty() {
            return (nq, Vec::new());
        }
        let lexicon = self.lexicon.snapshot();
        let words = corpus_vocabulary(corpus);
        let variants = QueryExpander::new(&lexicon, &self.config.expansion)
            .with_corpus_words(&words)
            .expand(&nq);
        (nq, variants)
    }

    /// Run a search. Never fails: escalation problems fall back to the
    /// fuzzy result set and internal faults yield an empty degraded result.
    pub async fn search(&self, query: &str, corpus: &[Task], options: &SearchOptions) -> SearchResult {
        let started = Instant::now();
        match self.run(query, corpus, options, None, started).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "search failed unexpectedly");
                degraded(normalize(query), started.elapsed())
            }
        }
    }

    /// Like [`search`](Self::search), but aborts when `cancel` fires.
    ///
    /// Cancellation drops any in-flight semantic request and returns
    /// [`TaskSearchError::Cancelled`].
    pub async fn search_with_cancel(
        &self,
        query: &str,
        corpus: &[Task],
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<SearchResult> {
        self.run(query, corpus, options, Some(cancel), Instant::now())
            .await
    }

    async fn run(
        &self,
        query: &str,
        corpus: &[Task],
        options: &SearchOptions,
        cancel: Option<&CancellationToken>,
        started: Instant,
    ) -> Result<SearchResult> {
        let nq = normalize(query);
        if nq.is_empty() {
            tracing::debug!("empty query, nothing to search");
            let mut result = SearchResult::empty(nq, SearchMethod::None);
            result.elapsed = started.elapsed();
            return Ok(result);
        }

        let limit = options.limit.unwrap_or(self.config.limits.default_limit);
        let min_score = options
            .min_score
            .filter(|s| s.is_finite())
            .unwrap_or(self.config.fuzzy.min_score)
            .clamp(0.0, 1.0);

        let searchable: Vec<usize> = corpus
            .iter()
            .enumerate()
            .filter_map(|(i, task)| {
                if task.is_searchable() {
                    Some(i)
                } else {
                    tracing::debug!(index = i, id = %task.id, "skipping task without id or content");
                    None
                }
            })
            .collect();

        let mut diagnostics = SearchDiagnostics {
            skipped_tasks: corpus.len() - searchable.len(),
            ..Default::default()
        };

        // Everything CPU-bound runs inside catch_unwind so a broken
        // invariant in the matcher degrades this call instead of the caller.
        let lexicon = self.lexicon.snapshot();
        let fuzzy = panic::catch_unwind(AssertUnwindSafe(|| {
            let words = corpus_vocabulary(corpus);
            let variants = QueryExpander::new(&lexicon, &self.config.expansion)
                .with_corpus_words(&words)
                .expand(&nq);
            let best = self.fuzzy_pass(corpus, &searchable, &variants, &nq.entities, min_score, cancel);
            best.map(|best| (variants, best))
        }));
        let (variants, best) = match fuzzy {
            Ok(outcome) => outcome?,
            Err(payload) => {
                tracing::error!(
                    query = %nq.original,
                    panic = panic_message(payload.as_ref()),
                    "internal error during fuzzy pass, returning empty result"
                );
                return Ok(degraded(nq, started.elapsed()));
            }
        };

        let mut candidates = CandidateSet::new(corpus);
        for candidate in best {
            candidates.offer(candidate);
        }
        diagnostics.fuzzy_candidates = candidates.len();

        let mut method = SearchMethod::Fuzzy;
        if self.should_escalate(&candidates, options) {
            if let Some(backend) = &self.backend {
                diagnostics.escalation_attempted = true;
                let tasks: Vec<Task> = searchable.iter().map(|&i| corpus[i].clone()).collect();
                match self.escalate(backend.as_ref(), &nq.original, &tasks, limit, cancel).await? {
                    Ok(hits) => {
                        let merged = candidates.merge_semantic(hits, min_score);
                        tracing::debug!(backend = backend.name(), merged, "semantic escalation merged");
                        method = SearchMethod::FuzzySemantic;
                    }
                    Err(e) => {
                        tracing::warn!(
                            backend = backend.name(),
                            error = %e,
                            "semantic escalation failed, using fuzzy results"
                        );
                        diagnostics.escalation_error = Some(e.to_string());
                    }
                }
            } else {
                tracing::debug!("escalation wanted but no semantic backend configured");
            }
        }

        let mut ranked = candidates.into_ranked();
        ranked.truncate(limit);
        let matches: Vec<RankedMatch> = ranked
            .into_iter()
            .map(|candidate| RankedMatch {
                task: corpus[candidate.task_index].clone(),
                candidate,
            })
            .collect();

        let elapsed = started.elapsed();
        tracing::debug!(
            query = %nq.original,
            variants = variants.len(),
            candidates = diagnostics.fuzzy_candidates,
            matches = matches.len(),
            method = %method,
            elapsed_ms = elapsed.as_millis() as u64,
            "search complete"
        );

        Ok(SearchResult {
            matches,
            method,
            elapsed,
            query: nq,
            variants,
            diagnostics,
        })
    }

    /// Best candidate per searchable task, in corpus order.
    fn fuzzy_pass(
        &self,
        corpus: &[Task],
        searchable: &[usize],
        variants: &[QueryVariant],
        entities: &[Entity],
        floor: f64,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<MatchCandidate>> {
        let fuzzy = &self.config.fuzzy;
        let best_for = |&index: &usize| -> Result<Option<MatchCandidate>> {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(TaskSearchError::Cancelled);
            }
            let prepared = PreparedTask::new(&corpus[index]);
            let mut best: Option<MatchCandidate> = None;
            for variant in variants {
                if let Some(c) = score_prepared(&prepared, index, variant, entities, floor, fuzzy) {
                    if best.as_ref().map_or(true, |b| c.beats(b)) {
                        best = Some(c);
                    }
                }
            }
            Ok(best)
        };

        let pairs = searchable.len().saturating_mul(variants.len());
        let per_task: Vec<Option<MatchCandidate>> = match &self.pool {
            Some(pool) if pairs >= self.config.parallel.threshold => {
                pool.install(|| searchable.par_iter().map(best_for).collect::<Result<_>>())?
            }
            _ => searchable.iter().map(best_for).collect::<Result<_>>()?,
        };
        Ok(per_task.into_iter().flatten().collect())
    }

    fn should_escalate(&self, candidates: &CandidateSet<'_>, options: &SearchOptions) -> bool {
        if options.force_semantic {
            return true;
        }
        let esc = &self.config.escalation;
        esc.enabled
            && (candidates.len() < esc.min_candidates || candidates.top_score() < esc.min_top_score)
    }

    /// One bounded backend call. The outer `Result` carries cancellation;
    /// the inner one the backend outcome.
    async fn escalate(
        &self,
        backend: &dyn SemanticBackend,
        query: &str,
        tasks: &[Task],
        limit: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<std::result::Result<Vec<SemanticHit>, SemanticError>> {
        let timeout_ms = self.config.escalation.timeout_ms;
        let call = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            backend.semantic_search(query, tasks, limit),
        );

        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(backend = backend.name(), "search cancelled during escalation");
                    return Err(TaskSearchError::Cancelled);
                }
                outcome = call => outcome,
            },
            None => call.await,
        };

        Ok(outcome.unwrap_or(Err(SemanticError::Timeout(timeout_ms))))
    }
}

fn build_pool(max_workers: usize) -> Option<rayon::ThreadPool> {
    if max_workers <= 1 {
        return None;
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .thread_name(|i| format!("tasksearch-{i}"))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!(error = %e, "failed to start worker pool, scoring sequentially");
            None
        }
    }
}

fn degraded(query: NormalizedQuery, elapsed: Duration) -> SearchResult {
    let mut result = SearchResult::empty(query, SearchMethod::None);
    result.elapsed = elapsed;
    result.diagnostics.degraded = true;
    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

// ---------------------------------------------------------------------------
// CandidateSet
// ---------------------------------------------------------------------------

/// Best candidate per task identifier.
struct CandidateSet<'a> {
    corpus: &'a [Task],
    by_id: HashMap<&'a str, MatchCandidate>,
}

impl<'a> CandidateSet<'a> {
    fn new(corpus: &'a [Task]) -> Self {
        Self {
            corpus,
            by_id: HashMap::new(),
        }
    }

    fn len(&self) -> usize {
        self.by_id.len()
    }

    fn top_score(&self) -> f64 {
        self.by_id.values().map(|c| c.score).fold(0.0, f64::max)
    }

    /// Keep `candidate` if it beats what is stored for its task id. Equal
    /// candidates keep the earlier corpus entry.
    fn offer(&mut self, candidate: MatchCandidate) {
        let id = self.corpus[candidate.task_index].id.as_str();
        match self.by_id.get_mut(id) {
            Some(existing) => {
                let earlier_tie = !existing.beats(&candidate)
                    && !candidate.beats(existing)
                    && candidate.task_index < existing.task_index;
                if candidate.beats(existing) || earlier_tie {
                    *existing = candidate;
                }
            }
            None => {
                self.by_id.insert(id, candidate);
            }
        }
    }

    /// Fold semantic hits into the set. Unknown ids, non-finite scores, and
    /// scores below `min_score` are ignored. Returns how many hits were
    /// offered.
    fn merge_semantic(&mut self, hits: Vec<SemanticHit>, min_score: f64) -> usize {
        let mut index_of: HashMap<&str, usize> = HashMap::new();
        for (i, task) in self.corpus.iter().enumerate() {
            if task.is_searchable() {
                index_of.entry(task.id.as_str()).or_insert(i);
            }
        }

        let mut offered = 0;
        for hit in hits {
            let Some(&task_index) = index_of.get(hit.task_id.as_str()) else {
                tracing::debug!(task_id = %hit.task_id, "semantic hit for unknown task ignored");
                continue;
            };
            if !hit.score.is_finite() {
                continue;
            }
            let score = hit.score.clamp(0.0, 1.0);
            if score < min_score {
                continue;
            }
            let reasoning = hit
                .reasoning
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| format!("semantic match (score {score:.2})"));
            self.offer(MatchCandidate {
                task_index,
                variant_rank: None,
                score,
                matched_on: MatchedOn::Semantic,
                category_bonus: false,
                full_content: false,
                reasoning: Some(reasoning),
            });
            offered += 1;
        }
        offered
    }

    /// Score descending; ties go to whole-content matches, then exact
    /// matches, then corpus order.
    fn into_ranked(self) -> Vec<MatchCandidate> {
        let mut ranked: Vec<MatchCandidate> = self.by_id.into_values().collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.full_content.cmp(&a.full_content))
                .then_with(|| {
                    (b.matched_on == MatchedOn::Exact).cmp(&(a.matched_on == MatchedOn::Exact))
                })
                .then_with(|| a.task_index.cmp(&b.task_index))
        });
        ranked
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct FixedBackend {
        hits: Vec<SemanticHit>,
        calls: AtomicUsize,
    }

    impl FixedBackend {
        fn new(hits: Vec<SemanticHit>) -> Arc<Self> {
            Arc::new(Self {
                hits,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SemanticBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn semantic_search(
            &self,
            _query: &str,
            _corpus: &[Task],
            _limit: usize,
        ) -> std::result::Result<Vec<SemanticHit>, SemanticError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hits.clone())
        }
    }

    fn hit(id: &str, score: f64) -> SemanticHit {
        SemanticHit {
            task_id: id.into(),
            score,
            reasoning: None,
        }
    }

    fn corpus() -> Vec<Task> {
        vec![
            Task::new("t1", "Call dentist for appointment"),
            Task::new("t2", "Buy groceries"),
            Task::new("t3", "Fix the kitchen sink"),
        ]
    }

    fn ids(result: &SearchResult) -> Vec<&str> {
        result.matches.iter().map(|m| m.task.id.as_str()).collect()
    }

    #[tokio::test]
    async fn empty_query_short_circuits() {
        let backend = FixedBackend::new(vec![hit("t1", 0.9)]);
        let service = SearchService::new(SearchConfig::default()).with_semantic_backend(backend.clone());
        let result = service.search("   ", &corpus(), &SearchOptions::default()).await;
        assert_eq!(result.method, SearchMethod::None);
        assert!(result.matches.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn weak_fuzzy_result_escalates_and_merges() {
        let backend = FixedBackend::new(vec![hit("t2", 0.7), hit("missing", 0.9), hit("t3", f64::NAN)]);
        let service = SearchService::new(SearchConfig::default()).with_semantic_backend(backend.clone());
        let result = service
            .search("dentist appt", &corpus(), &SearchOptions::default())
            .await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.method, SearchMethod::FuzzySemantic);
        assert_eq!(ids(&result), vec!["t1", "t2"]);
        assert_eq!(result.matches[1].candidate.matched_on, MatchedOn::Semantic);
        assert_eq!(result.matches[1].candidate.variant_rank, None);
    }

    #[tokio::test]
    async fn strong_fuzzy_result_does_not_escalate() {
        let backend = FixedBackend::new(Vec::new());
        let service = SearchService::new(SearchConfig::default()).with_semantic_backend(backend.clone());
        let tasks = vec![
            Task::new("a", "Pay rent"),
            Task::new("b", "Pay rent online"),
            Task::new("c", "Pay rent to landlord"),
        ];
        let result = service.search("pay rent", &tasks, &SearchOptions::default()).await;
        assert_eq!(result.method, SearchMethod::Fuzzy);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ids(&result), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn semantic_hit_does_not_displace_higher_fuzzy_score() {
        let backend = FixedBackend::new(vec![hit("t1", 0.3)]);
        let service = SearchService::new(SearchConfig::default()).with_semantic_backend(backend);
        let options = SearchOptions {
            force_semantic: true,
            ..Default::default()
        };
        let result = service.search("dentist appt", &corpus(), &options).await;
        assert_eq!(result.matches[0].candidate.score, 1.0);
        assert_ne!(result.matches[0].candidate.matched_on, MatchedOn::Semantic);
    }

    #[tokio::test]
    async fn duplicate_ids_are_collapsed() {
        let service = SearchService::new(SearchConfig::default());
        let tasks = vec![
            Task::new("dup", "Water the plants"),
            Task::new("dup", "Water plants"),
        ];
        let result = service.search("water plants", &tasks, &SearchOptions::default()).await;
        assert_eq!(result.match_count(), 1);
        // Both are whole-content hits; the earlier entry keeps the id.
        assert_eq!(result.matches[0].candidate.task_index, 0);
    }

    #[tokio::test]
    async fn skipped_tasks_are_counted() {
        let service = SearchService::new(SearchConfig::default());
        let tasks = vec![Task::new("t1", ""), Task::new("", "Buy milk"), Task::new("t3", "Buy milk")];
        let result = service.search("buy milk", &tasks, &SearchOptions::default()).await;
        assert_eq!(result.diagnostics.skipped_tasks, 2);
        assert_eq!(ids(&result), vec!["t3"]);
    }

    #[tokio::test]
    async fn parallel_and_sequential_agree() {
        let tasks: Vec<Task> = (0..300)
            .map(|i| Task::new(format!("t{i}"), format!("Task number {i} fix sink item {}", i % 7)))
            .collect();
        let sequential = SearchService::new(SearchConfig {
            parallel: crate::config::ParallelConfig {
                threshold: usize::MAX,
                max_workers: 4,
            },
            ..Default::default()
        });
        let parallel = SearchService::new(SearchConfig {
            parallel: crate::config::ParallelConfig {
                threshold: 1,
                max_workers: 4,
            },
            ..Default::default()
        });
        let options = SearchOptions {
            limit: Some(50),
            ..Default::default()
        };
        let a = sequential.search("fx sink item 3", &tasks, &options).await;
        let b = parallel.search("fx sink item 3", &tasks, &options).await;
        assert_eq!(a.matches, b.matches);
    }

    #[tokio::test]
    async fn rebuild_lexicon_swaps_table() {
        let service = SearchService::new(SearchConfig::default());
        let before = service.lexicon();
        service.rebuild_lexicon(&[Task::new("t1", "Feed the axolotl")]);
        assert!(!before.contains("axolotl"));
        assert!(service.lexicon().contains("axolotl"));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_fuzzy_pass() {
        let service = SearchService::new(SearchConfig::default());
        let token = CancellationToken::new();
        token.cancel();
        let err = service
            .search_with_cancel("fix sink", &corpus(), &SearchOptions::default(), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskSearchError::Cancelled));
    }

    /// A negative category bonus drives a category-only hit below zero and
    /// trips the matcher's score-bound assertion.
    async fn search_with_broken_bonus(parallel_threshold: usize) -> SearchResult {
        let mut config = SearchConfig::default();
        config.fuzzy.category_bonus = -0.5;
        config.parallel.threshold = parallel_threshold;
        let backend = FixedBackend::new(vec![hit("t1", 0.9)]);
        let service = SearchService::new(config).with_semantic_backend(backend.clone());
        let tasks = vec![
            Task::new("t1", "Quarterly review").with_category("Work"),
            Task::new("t2", "Buy groceries").with_category("Home"),
        ];
        let result = service.search("work", &tasks, &SearchOptions::default()).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        result
    }

    #[tokio::test]
    async fn score_invariant_violation_degrades_sequential() {
        let result = search_with_broken_bonus(usize::MAX).await;
        assert!(result.diagnostics.degraded);
        assert_eq!(result.method, SearchMethod::None);
        assert!(result.matches.is_empty());
    }

    #[tokio::test]
    async fn score_invariant_violation_degrades_on_worker_pool() {
        let result = search_with_broken_bonus(1).await;
        assert!(result.diagnostics.degraded);
        assert_eq!(result.method, SearchMethod::None);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn candidate_set_keeps_best_per_id() {
        let tasks = corpus();
        let mut set = CandidateSet::new(&tasks);
        let base = MatchCandidate {
            task_index: 0,
            variant_rank: Some(1),
            score: 0.5,
            matched_on: MatchedOn::FuzzyContent,
            category_bonus: false,
            full_content: false,
            reasoning: None,
        };
        set.offer(base.clone());
        set.offer(MatchCandidate {
            score: 0.4,
            ..base.clone()
        });
        set.offer(MatchCandidate {
            variant_rank: Some(0),
            ..base.clone()
        });
        assert_eq!(set.len(), 1);
        let ranked = set.into_ranked();
        assert_eq!(ranked[0].score, 0.5);
        assert_eq!(ranked[0].variant_rank, Some(0));
    }

    #[test]
    fn ranking_ties_prefer_whole_content_then_exact_then_corpus_order() {
        let tasks = corpus();
        let mut set = CandidateSet::new(&tasks);
        let base = MatchCandidate {
            task_index: 0,
            variant_rank: Some(0),
            score: 1.0,
            matched_on: MatchedOn::FuzzyContent,
            category_bonus: false,
            full_content: false,
            reasoning: None,
        };
        set.offer(base.clone());
        set.offer(MatchCandidate {
            task_index: 1,
            matched_on: MatchedOn::Exact,
            ..base.clone()
        });
        set.offer(MatchCandidate {
            task_index: 2,
            matched_on: MatchedOn::Exact,
            full_content: true,
            ..base.clone()
        });
        let order: Vec<usize> = set.into_ranked().iter().map(|c| c.task_index).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn forced_request_escalates_when_automatic_escalation_disabled() {
        let mut config = SearchConfig::default();
        config.escalation.enabled = false;
        let backend = FixedBackend::new(vec![hit("t2", 0.7)]);
        let service = SearchService::new(config).with_semantic_backend(backend.clone());

        let automatic = service
            .search("dentist appt", &corpus(), &SearchOptions::default())
            .await;
        assert_eq!(automatic.method, SearchMethod::Fuzzy);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

        let forced = SearchOptions {
            force_semantic: true,
            ..Default::default()
        };
        let result = service.search("dentist appt", &corpus(), &forced).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.method, SearchMethod::FuzzySemantic);
    }
}
