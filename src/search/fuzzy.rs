//! Fuzzy matcher: scores one task against one query variant.
//!
//! Strategies, strongest first: exact substring, whole-string edit
//! similarity, then token overlap against content, description, and labels.
//! A category mention adds a flat bonus. Anything that ends below the floor
//! is dropped instead of being returned with a near-zero score.

use crate::config::FuzzyConfig;
use crate::search::normalize::{collapse_whitespace, content_tokens, tokenize};
use crate::types::{Entity, MatchCandidate, MatchedOn, QueryVariant, Task};

/// Minimum token length for approximate (edit distance 1) token credit.
const FUZZY_TOKEN_MIN_LEN: usize = 4;

// ---------------------------------------------------------------------------
// PreparedTask
// ---------------------------------------------------------------------------

/// A task with its text fields lower-cased and tokenized once, so the
/// task × variant loop does not redo that work per variant.
#[derive(Debug, Clone)]
pub struct PreparedTask<'a> {
    pub task: &'a Task,
    content: String,
    content_normalized: String,
    content_tokens: Vec<String>,
    description_tokens: Vec<String>,
    label_tokens: Vec<String>,
    category: Option<String>,
    category_tokens: Vec<String>,
}

impl<'a> PreparedTask<'a> {
    pub fn new(task: &'a Task) -> Self {
        let content = collapse_whitespace(&task.content.to_lowercase());
        let tokens = content_tokens(&content);
        let category = task
            .category
            .as_deref()
            .map(|c| collapse_whitespace(&c.to_lowercase()))
            .filter(|c| !c.is_empty());
        Self {
            task,
            content_normalized: tokens.join(" "),
            content,
            content_tokens: tokens,
            description_tokens: task
                .description
                .as_deref()
                .map(content_tokens)
                .unwrap_or_default(),
            label_tokens: task.labels.iter().flat_map(|l| tokenize(l)).collect(),
            category_tokens: category.as_deref().map(tokenize).unwrap_or_default(),
            category,
        }
    }

    /// Whether the query names this task's category, either as one token,
    /// as an entity, or with every category word present.
    fn category_mentioned(&self, variant: &QueryVariant, entities: &[Entity]) -> bool {
        let Some(category) = self.category.as_deref() else {
            return false;
        };
        variant.tokens.iter().any(|t| t == category)
            || entities.iter().any(|e| e.text.to_lowercase() == category)
            || (!self.category_tokens.is_empty()
                && self
                    .category_tokens
                    .iter()
                    .all(|c| variant.tokens.contains(c)))
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score `task` against `variant` with the config floor and no entities.
pub fn score(task: &Task, variant: &QueryVariant, config: &FuzzyConfig) -> Option<MatchCandidate> {
    score_prepared(
        &PreparedTask::new(task),
        0,
        variant,
        &[],
        config.min_score,
        config,
    )
}

/// Score a prepared task against one variant.
///
/// Returns `None` when the final score is below `floor`. The returned score
/// is always within `[0, 1]`.
pub fn score_prepared(
    task: &PreparedTask<'_>,
    task_index: usize,
    variant: &QueryVariant,
    entities: &[Entity],
    floor: f64,
    config: &FuzzyConfig,
) -> Option<MatchCandidate> {
    if variant.tokens.is_empty() {
        return None;
    }
    let text = variant.text.as_str();

    let mut full_content = false;
    let (base, matched_on, reasoning) =
        if task.content.contains(text) || task.content_normalized.contains(text) {
            full_content = task.content == text || task.content_normalized == text;
            (
                1.0,
                MatchedOn::Exact,
                format!("matched '{text}' exactly in task content"),
            )
        } else {
            let similarity = strsim::normalized_levenshtein(text, &task.content)
                .max(strsim::normalized_levenshtein(text, &task.content_normalized));
            if similarity >= config.similarity_threshold {
                (
                    similarity,
                    MatchedOn::FuzzyContent,
                    format!("matched '{text}' against task content (similarity {similarity:.2})"),
                )
            } else {
                best_overlap(task, variant, config.fuzzy_token_credit)
            }
        };

    let category_hit = task.category_mentioned(variant, entities);
    let (score, matched_on, category_bonus, reasoning) = match (base > 0.0, category_hit) {
        (true, true) => (
            (base + config.category_bonus).min(1.0),
            matched_on,
            true,
            format!(
                "{reasoning}; category '{}' +{:.2}",
                task.category.as_deref().unwrap_or_default(),
                config.category_bonus
            ),
        ),
        (false, true) => (
            config.category_bonus.min(1.0),
            MatchedOn::Category,
            true,
            format!(
                "task category '{}' mentioned in '{text}'",
                task.category.as_deref().unwrap_or_default()
            ),
        ),
        (_, false) => (base, matched_on, false, reasoning),
    };

    assert!(
        score.is_finite() && (0.0..=1.0).contains(&score),
        "match score {score} out of bounds for task {}",
        task.task.id
    );

    if score <= 0.0 || score < floor {
        return None;
    }

    Some(MatchCandidate {
        task_index,
        variant_rank: Some(variant.rank),
        score,
        matched_on,
        category_bonus,
        full_content,
        reasoning: Some(reasoning),
    })
}

/// Token overlap against content, description, and labels; the best field
/// wins, content first on ties.
fn best_overlap(task: &PreparedTask<'_>, variant: &QueryVariant, credit: f64) -> (f64, MatchedOn, String) {
    let fields = [
        (&task.content_tokens, MatchedOn::FuzzyContent, "content"),
        (&task.description_tokens, MatchedOn::FuzzyDescription, "description"),
        (&task.label_tokens, MatchedOn::TokenOverlap, "labels"),
    ];

    let mut best = (0.0, MatchedOn::FuzzyContent, "content");
    for (tokens, matched_on, field) in fields {
        let ratio = token_overlap(&variant.tokens, tokens, credit);
        if ratio > best.0 {
            best = (ratio, matched_on, field);
        }
    }

    let (ratio, matched_on, field) = best;
    (
        ratio,
        matched_on,
        format!(
            "matched '{}' against task {field} (token overlap {ratio:.2})",
            variant.text
        ),
    )
}

/// Share of `query` tokens found in `field`, in `[0, 1]`.
///
/// An equal token earns full credit; a token of four or more characters
/// within one edit of a field token earns `credit`. Empty `query` gives 0.
pub fn token_overlap(query: &[String], field: &[String], credit: f64) -> f64 {
    if query.is_empty() || field.is_empty() {
        return 0.0;
    }
    let credit = credit.clamp(0.0, 1.0);
    let earned: f64 = query
        .iter()
        .map(|q| {
            if field.iter().any(|f| f == q) {
                1.0
            } else if q.chars().count() >= FUZZY_TOKEN_MIN_LEN
                && field.iter().any(|f| {
                    f.chars().count() >= FUZZY_TOKEN_MIN_LEN && strsim::levenshtein(q, f) <= 1
                })
            {
                credit
            } else {
                0.0
            }
        })
        .sum();
    (earned / query.len() as f64).min(1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityKind, VariantSource};
    use test_case::test_case;

    fn variant(text: &str) -> QueryVariant {
        QueryVariant::new(
            VariantSource::Identity,
            text.split_whitespace().map(str::to_string).collect(),
        )
    }

    fn cfg() -> FuzzyConfig {
        FuzzyConfig::default()
    }

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    // -- exact ---------------------------------------------------------------

    #[test]
    fn exact_substring_scores_one() {
        let task = Task::new("t1", "Buy milk and eggs");
        let c = score(&task, &variant("milk"), &cfg()).unwrap();
        assert_eq!(c.score, 1.0);
        assert_eq!(c.matched_on, MatchedOn::Exact);
        assert!(!c.full_content);
    }

    #[test]
    fn exact_whole_content_sets_full_content() {
        let task = Task::new("t1", "Buy Milk");
        let c = score(&task, &variant("buy milk"), &cfg()).unwrap();
        assert_eq!(c.matched_on, MatchedOn::Exact);
        assert!(c.full_content);
    }

    #[test]
    fn exact_against_normalized_content_ignores_stop_words() {
        let task = Task::new("t1", "Fix the kitchen sink");
        let c = score(&task, &variant("kitchen sink"), &cfg()).unwrap();
        assert_eq!(c.matched_on, MatchedOn::Exact);
        let c = score(&task, &variant("fix kitchen sink"), &cfg()).unwrap();
        assert_eq!(c.matched_on, MatchedOn::Exact);
        assert!(c.full_content);
    }

    // -- similarity ----------------------------------------------------------

    #[test]
    fn near_identical_content_is_fuzzy_content() {
        let task = Task::new("t1", "Renew passport");
        let c = score(&task, &variant("renew pasport"), &cfg()).unwrap();
        assert_eq!(c.matched_on, MatchedOn::FuzzyContent);
        assert!(c.score >= 0.8 && c.score < 1.0);
        assert!(c.reasoning.unwrap().contains("similarity"));
    }

    // -- token overlap -------------------------------------------------------

    #[test]
    fn missing_word_still_overlaps_fully() {
        let task = Task::new("t1", "Fix the kitchen sink");
        let c = score(&task, &variant("fix sink"), &cfg()).unwrap();
        assert_eq!(c.matched_on, MatchedOn::FuzzyContent);
        assert_eq!(c.score, 1.0);
    }

    #[test]
    fn partial_overlap_scores_ratio() {
        let task = Task::new("t1", "Fix the kitchen sink");
        let c = score(&task, &variant("fx sink"), &cfg()).unwrap();
        assert_eq!(c.matched_on, MatchedOn::FuzzyContent);
        assert_eq!(c.score, 0.5);
        assert_eq!(
            c.reasoning.as_deref(),
            Some("matched 'fx sink' against task content (token overlap 0.50)")
        );
    }

    #[test]
    fn description_wins_when_it_overlaps_more() {
        let task = Task::new("t1", "Weekend chores").with_description("clean gutters and garage");
        let c = score(&task, &variant("gutters garage"), &cfg()).unwrap();
        assert_eq!(c.matched_on, MatchedOn::FuzzyDescription);
        assert_eq!(c.score, 1.0);
    }

    #[test]
    fn label_overlap_is_token_overlap() {
        let task = Task::new("t1", "Quarterly filing").with_labels(["taxes", "urgent"]);
        let c = score(&task, &variant("taxes urgent"), &cfg()).unwrap();
        assert_eq!(c.matched_on, MatchedOn::TokenOverlap);
    }

    #[test]
    fn below_floor_is_dropped() {
        let task = Task::new("t1", "Buy groceries");
        assert!(score(&task, &variant("dentist appt"), &cfg()).is_none());
        // 1 of 4 tokens = 0.25 clears the default floor, 1 of 5 does not.
        assert!(score(&task, &variant("buy alpha beta gamma"), &cfg()).is_some());
        assert!(score(&task, &variant("buy alpha beta gamma delta"), &cfg()).is_none());
    }

    #[test]
    fn custom_floor_applies() {
        let task = Task::new("t1", "Fix the kitchen sink");
        let prepared = PreparedTask::new(&task);
        assert!(score_prepared(&prepared, 0, &variant("fx sink"), &[], 0.6, &cfg()).is_none());
    }

    #[test_case(&["sink"], &["sink"], 1.0 ; "exact token")]
    #[test_case(&["groceris"], &["groceries"], 0.8 ; "one edit earns partial credit")]
    #[test_case(&["fx"], &["fix"], 0.0 ; "short tokens need exact match")]
    #[test_case(&["fix", "sink"], &["sink"], 0.5 ; "half the tokens")]
    #[test_case(&[], &["sink"], 0.0 ; "empty query")]
    fn token_overlap_cases(query: &[&str], field: &[&str], expected: f64) {
        let got = token_overlap(&toks(query), &toks(field), 0.8);
        assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");
    }

    // -- category ------------------------------------------------------------

    #[test]
    fn category_bonus_is_added_and_capped() {
        let task = Task::new("t1", "Submit expense report").with_category("Work");
        let c = score(&task, &variant("work expense"), &cfg()).unwrap();
        assert!(c.category_bonus);
        assert_eq!(c.matched_on_label(), "fuzzy-content+category");
        assert!((c.score - 0.6).abs() < 1e-9);

        let c = score(&task, &variant("expense work"), &cfg()).unwrap();
        assert!(c.score <= 1.0);
    }

    #[test]
    fn category_alone_uses_category_label() {
        let task = Task::new("t1", "Submit expense report").with_category("Work");
        let prepared = PreparedTask::new(&task);
        let c = score_prepared(&prepared, 3, &variant("work"), &[], 0.05, &cfg()).unwrap();
        assert_eq!(c.matched_on, MatchedOn::Category);
        assert_eq!(c.task_index, 3);
        assert!((c.score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn category_matches_entity() {
        let task = Task::new("t1", "Plan offsite agenda").with_category("Big Project");
        let prepared = PreparedTask::new(&task);
        let entities = vec![Entity::new(EntityKind::Name, "Big Project")];
        let c = score_prepared(&prepared, 0, &variant("offsite"), &entities, 0.25, &cfg()).unwrap();
        assert!(c.category_bonus);
    }

    // -- bounds and determinism ----------------------------------------------

    #[test]
    fn empty_variant_never_matches() {
        let task = Task::new("t1", "Anything");
        assert!(score(&task, &variant(""), &cfg()).is_none());
    }

    #[test]
    fn reasoning_is_deterministic() {
        let task = Task::new("t1", "Call dentist for appointment");
        let a = score(&task, &variant("dentist appt"), &cfg());
        let b = score(&task, &variant("dentist appt"), &cfg());
        assert_eq!(a, b);
    }
}
