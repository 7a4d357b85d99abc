//! Query normalization: lower-casing, tokenization, stop-word removal, and
//! lightweight entity extraction.
//!
//! Pure functions only. The same tokenizer is applied to task text by the
//! fuzzy matcher, so query tokens and content tokens always line up.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::types::{Entity, EntityKind, NormalizedQuery};

// ---------------------------------------------------------------------------
// Word lists
// ---------------------------------------------------------------------------

/// Words dropped from the token stream. Kept if dropping them would leave
/// nothing.
const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "at", "be", "by", "do", "does", "find", "for",
    "from", "i", "in", "is", "it", "its", "me", "my", "need", "of", "on", "or", "please", "search",
    "show", "some", "task", "tasks", "that", "the", "these", "this", "those", "to", "want", "with",
];

/// Relative date words recognised as date entities.
const RELATIVE_DATE_WORDS: &[&str] = &[
    "today",
    "tonight",
    "tomorrow",
    "yesterday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|“([^”]*)”"#).expect("quoted-phrase pattern is valid")
});

static CAPITALIZED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\p{Lu}[\p{L}'’]*(?:[ \t]+\p{Lu}[\p{L}'’]*)+")
        .expect("capitalized-run pattern is valid")
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("iso-date pattern is valid"));

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\p{L}+\b").expect("word pattern is valid"));

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Whether `word` (already lower-cased) is a stop word.
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.binary_search(&word).is_ok()
}

/// Whether `word` (already lower-cased) is a relative date word.
pub fn is_relative_date(word: &str) -> bool {
    RELATIVE_DATE_WORDS.contains(&word)
}

/// Lower-case, trim, and collapse runs of whitespace to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into lower-cased word tokens.
///
/// Splits on whitespace and punctuation. Hyphens and apostrophes inside a
/// word are kept (`e-mail`, `don't`, `2024-05-01`); tokens made only of
/// punctuation are discarded. Stop words are kept.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '-' | '\'' | '’')))
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokenize and remove stop words, falling back to the full token list when
/// every token is a stop word.
pub fn content_tokens(text: &str) -> Vec<String> {
    let all = tokenize(text);
    let kept: Vec<String> = all.iter().filter(|t| !is_stop_word(t)).cloned().collect();
    if kept.is_empty() {
        all
    } else {
        kept
    }
}

/// Normalize a raw query.
///
/// Empty or whitespace-only input yields a query with no tokens and no
/// entities; that is a valid result, not an error.
pub fn normalize(query: &str) -> NormalizedQuery {
    let text = collapse_whitespace(&query.to_lowercase());

    let (masked, mut spans) = extract_phrases(query);
    spans.extend(extract_names(&masked));
    spans.extend(extract_dates(&masked));
    spans.sort_by_key(|(offset, _)| *offset);

    let mut entities: Vec<Entity> = Vec::with_capacity(spans.len());
    for (_, entity) in spans {
        if !entities.contains(&entity) {
            entities.push(entity);
        }
    }

    NormalizedQuery {
        original: query.to_string(),
        text,
        tokens: content_tokens(&masked),
        entities,
    }
}

// ---------------------------------------------------------------------------
// Entity extraction
// ---------------------------------------------------------------------------

/// Pull quoted phrases out of `query`.
///
/// Returns the query with each quoted segment blanked out (same byte
/// length, so offsets stay valid) and the phrase entities with their offsets.
fn extract_phrases(query: &str) -> (String, Vec<(usize, Entity)>) {
    let mut masked = query.to_string();
    let mut spans = Vec::new();

    for caps in QUOTED.captures_iter(query) {
        let Some(whole) = caps.get(0) else { continue };
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        let phrase = collapse_whitespace(inner);
        if !phrase.is_empty() {
            spans.push((whole.start(), Entity::new(EntityKind::Phrase, phrase)));
        }
        masked.replace_range(whole.range(), &" ".repeat(whole.len()));
    }

    (masked, spans)
}

/// Capitalized multi-word runs, e.g. "John Smith", "Acme Corp".
fn extract_names(text: &str) -> Vec<(usize, Entity)> {
    CAPITALIZED_RUN
        .find_iter(text)
        .filter_map(|m| {
            let words: Vec<&str> = m.as_str().split_whitespace().collect();
            let all_stop = words.iter().all(|w| is_stop_word(&w.to_lowercase()));
            if all_stop {
                return None;
            }
            Some((m.start(), Entity::new(EntityKind::Name, words.join(" "))))
        })
        .collect()
}

/// ISO dates (validated) and relative date words.
fn extract_dates(text: &str) -> Vec<(usize, Entity)> {
    let mut out: Vec<(usize, Entity)> = ISO_DATE
        .find_iter(text)
        .filter(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").is_ok())
        .map(|m| (m.start(), Entity::new(EntityKind::Date, m.as_str())))
        .collect();

    for m in WORD.find_iter(text) {
        let lower = m.as_str().to_lowercase();
        if is_relative_date(&lower) {
            out.push((m.start(), Entity::new(EntityKind::Date, lower)));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
