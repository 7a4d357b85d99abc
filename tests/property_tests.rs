//! Property-based tests for tasksearch using proptest.
//!
//! These tests verify invariants that must hold for all queries and
//! corpora, independent of the specific wording.

use std::collections::HashSet;

use proptest::prelude::*;

use tasksearch::config::{ExpansionConfig, FuzzyConfig, SearchConfig};
use tasksearch::search::fuzzy::{score, token_overlap};
use tasksearch::search::{expand_query, normalize, Lexicon, SearchService};
use tasksearch::types::{SearchOptions, Task};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

const WORDS: &[&str] = &[
    "call", "phone", "dentist", "appt", "appointment", "buy", "groceries", "fix", "fx", "sink",
    "kitchen", "the", "for", "email", "sarah", "tax", "forms", "meeting", "mtg", "tomorrow",
    "book", "flight", "denver", "pay", "bill", "clean", "garage", "dr", "review", "report",
];

/// A short phrase drawn from a task-ish vocabulary, sometimes misspelled.
fn arb_phrase() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => prop::sample::select(WORDS).prop_map(str::to_string),
            1 => "[a-z]{1,9}",
        ],
        0..6,
    )
    .prop_map(|words| words.join(" "))
}

/// Arbitrary printable input, including punctuation and quotes.
fn arb_query() -> impl Strategy<Value = String> {
    prop_oneof![arb_phrase(), "[ -~]{0,40}", "\"[a-z ]{0,12}\" [a-z]{0,8}"]
}

fn arb_corpus() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec((0u8..12, arb_phrase()), 0..20).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (id, content))| Task::new(format!("t{id}"), content).with_priority((i % 4) as u8 + 1))
            .collect()
    })
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(future)
}

// ---------------------------------------------------------------------------
// Normalization and expansion
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn normalize_never_panics_and_is_lowercase(q in arb_query()) {
        let nq = normalize(&q);
        for token in &nq.tokens {
            prop_assert!(!token.is_empty());
            prop_assert_eq!(token.clone(), token.to_lowercase());
        }
    }

    #[test]
    fn nonblank_alphabetic_input_keeps_tokens(q in "[a-z]{1,8}( [a-z]{1,8}){0,4}") {
        prop_assert!(!normalize(&q).tokens.is_empty(), "no tokens for {:?}", q);
    }

    #[test]
    fn expansion_respects_cap_and_is_unique(q in arb_query()) {
        let nq = normalize(&q);
        let variants = expand_query(&nq, &Lexicon::builtin(), &ExpansionConfig::default());
        prop_assert!(variants.len() <= 8);

        let texts: HashSet<&str> = variants.iter().map(|v| v.text.as_str()).collect();
        prop_assert_eq!(texts.len(), variants.len());
        for (i, v) in variants.iter().enumerate() {
            prop_assert_eq!(v.rank, i);
        }
    }

    #[test]
    fn expansion_cap_is_configurable(q in arb_phrase(), cap in 1usize..8) {
        let config = ExpansionConfig { max_variants: cap, ..Default::default() };
        let variants = expand_query(&normalize(&q), &Lexicon::builtin(), &config);
        prop_assert!(variants.len() <= cap);
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn candidate_scores_stay_in_unit_range(q in arb_phrase(), content in arb_phrase()) {
        let task = Task::new("t", content).with_category("home");
        let config = FuzzyConfig::default();
        for variant in expand_query(&normalize(&q), &Lexicon::builtin(), &ExpansionConfig::default()) {
            if let Some(c) = score(&task, &variant, &config) {
                prop_assert!((0.0..=1.0).contains(&c.score), "score {} out of range", c.score);
            }
        }
    }

    #[test]
    fn token_overlap_in_unit_range(
        a in prop::collection::vec("[a-z]{1,7}", 0..6),
        b in prop::collection::vec("[a-z]{1,7}", 0..6),
    ) {
        let overlap = token_overlap(&a, &b, 0.8);
        prop_assert!((0.0..=1.0).contains(&overlap));
    }
}

// ---------------------------------------------------------------------------
// Full search
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn search_results_are_bounded_unique_and_deterministic(
        q in arb_query(),
        corpus in arb_corpus(),
        limit in 1usize..15,
    ) {
        let service = SearchService::new(SearchConfig::default());
        let options = SearchOptions { limit: Some(limit), ..Default::default() };
        let (first, second) = block_on(async {
            (
                service.search(&q, &corpus, &options).await,
                service.search(&q, &corpus, &options).await,
            )
        });

        prop_assert!(first.matches.len() <= limit);
        let mut seen = HashSet::new();
        for m in &first.matches {
            prop_assert!(seen.insert(m.task.id.clone()), "duplicate id {}", m.task.id);
            prop_assert!((0.0..=1.0).contains(&m.candidate.score));
        }
        for pair in first.matches.windows(2) {
            prop_assert!(pair[0].candidate.score >= pair[1].candidate.score);
        }

        let a: Vec<(&str, f64)> = first.matches.iter().map(|m| (m.task.id.as_str(), m.candidate.score)).collect();
        let b: Vec<(&str, f64)> = second.matches.iter().map(|m| (m.task.id.as_str(), m.candidate.score)).collect();
        prop_assert_eq!(a, b);
        prop_assert_eq!(first.method, second.method);
    }
}
