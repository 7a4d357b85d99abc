//! Vocabulary and synonym tables used by query expansion.
//!
//! A [`Lexicon`] is immutable once built. [`SharedLexicon`] keeps one behind
//! an `Arc` so concurrent searches read a stable snapshot while a rebuild
//! swaps in a whole new table.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use crate::config::ExpansionConfig;
use crate::search::normalize::{content_tokens, is_stop_word};
use crate::types::Task;

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

/// Common words in personal task lists. Typo correction targets these plus
/// whatever the current corpus contains.
const BUILTIN_VOCABULARY: &[&str] = &[
    "account", "address", "agenda", "apartment", "application", "appointment", "bank", "bill",
    "bills", "birthday", "book", "budget", "buy", "cake", "calendar", "call", "car", "card",
    "check", "class", "clean", "clinic", "coffee", "conference", "contract", "cook", "dentist",
    "deploy", "design", "dinner", "doctor", "document", "documents", "draft", "email", "error",
    "event", "exercise", "expense", "family", "file", "finish", "fix", "flight", "follow",
    "friend", "garden", "gift", "grocery", "groceries", "gym", "haircut", "health", "holiday",
    "homework", "hotel", "house", "insurance", "interview", "invoice", "kitchen", "laundry",
    "lawyer", "letter", "lunch", "mail", "meeting", "message", "milk", "money", "mortgage",
    "morning", "move", "movie", "office", "order", "organize", "package", "paint", "party",
    "passport", "pay", "payment", "pharmacy", "phone", "pick", "plan", "plumber", "prepare",
    "prescription", "presentation", "project", "purchase", "receipt", "refund", "register",
    "renew", "rent", "repair", "report", "reservation", "review", "school", "schedule", "send",
    "ship", "shopping", "sink", "submit", "subscription", "taxes", "team", "ticket", "trash",
    "travel", "trip", "update", "vacation", "visa", "visit", "walk", "wash", "website", "week",
    "weekend", "work", "write",
];

/// Groups of interchangeable words. Any member may stand in for any other.
const SYNONYM_GROUPS: &[&[&str]] = &[
    &["call", "phone", "ring"],
    &["buy", "purchase", "order"],
    &["fix", "repair", "mend"],
    &["email", "mail", "message"],
    &["meeting", "meet", "sync"],
    &["doctor", "physician", "gp"],
    &["groceries", "grocery", "food"],
    &["pay", "payment", "settle"],
    &["clean", "tidy", "wash"],
    &["book", "reserve", "schedule"],
    &["finish", "complete", "wrap"],
    &["check", "review", "verify"],
    &["send", "submit", "deliver"],
    &["write", "draft", "compose"],
    &["trip", "travel", "journey"],
    &["car", "vehicle", "auto"],
];

/// `(abbreviation, full_word)` pairs. Lookups go both ways.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("appt", "appointment"),
    ("mtg", "meeting"),
    ("dr", "doctor"),
    ("bday", "birthday"),
    ("doc", "document"),
    ("docs", "documents"),
    ("pres", "presentation"),
    ("rx", "prescription"),
    ("hw", "homework"),
    ("inv", "invoice"),
    ("msg", "message"),
    ("info", "information"),
    ("admin", "administration"),
    ("dept", "department"),
    ("mgr", "manager"),
    ("asap", "urgent"),
];

// ---------------------------------------------------------------------------
// SynonymTable
// ---------------------------------------------------------------------------

/// Static synonym groups plus bidirectional abbreviation pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymTable {
    groups: Vec<Vec<String>>,
    abbreviations: Vec<(String, String)>,
}

impl SynonymTable {
    /// The built-in table.
    pub fn builtin() -> Self {
        Self {
            groups: SYNONYM_GROUPS
                .iter()
                .map(|g| g.iter().map(|w| w.to_string()).collect())
                .collect(),
            abbreviations: ABBREVIATIONS
                .iter()
                .map(|(a, f)| (a.to_string(), f.to_string()))
                .collect(),
        }
    }

    /// Add groups after the built-in ones. Words are lower-cased; groups
    /// with fewer than two distinct words are ignored.
    pub fn with_groups(mut self, extra: &[Vec<String>]) -> Self {
        for group in extra {
            let mut words: Vec<String> = Vec::new();
            for w in group {
                let w = w.trim().to_lowercase();
                if !w.is_empty() && !words.contains(&w) {
                    words.push(w);
                }
            }
            if words.len() >= 2 {
                self.groups.push(words);
            }
        }
        self
    }

    /// Whether the table knows `word` at all.
    pub fn contains(&self, word: &str) -> bool {
        self.abbreviations.iter().any(|(a, f)| a == word || f == word)
            || self.groups.iter().any(|g| g.iter().any(|w| w == word))
    }

    /// Replacement candidates for `word`, abbreviation expansions first and
    /// then group members in table order. Never contains `word` itself.
    pub fn alternatives(&self, word: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |candidate: &str| {
            if candidate != word && !out.iter().any(|o| o == candidate) {
                out.push(candidate.to_string());
            }
        };

        for (abbr, full) in &self.abbreviations {
            if abbr == word {
                push(full.as_str());
            } else if full == word {
                push(abbr.as_str());
            }
        }
        for group in &self.groups {
            if group.iter().any(|w| w == word) {
                for w in group {
                    push(w.as_str());
                }
            }
        }
        out
    }

    /// Every word the table mentions.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.abbreviations
            .iter()
            .flat_map(|(a, f)| [a.as_str(), f.as_str()])
            .chain(self.groups.iter().flatten().map(String::as_str))
    }
}

// ---------------------------------------------------------------------------
// Lexicon
// ---------------------------------------------------------------------------

/// Known vocabulary plus the synonym table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexicon {
    words: BTreeSet<String>,
    synonyms: SynonymTable,
}

impl Lexicon {
    /// Built-in vocabulary and synonyms only.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_VOCABULARY.iter().map(|w| w.to_string()),
            SynonymTable::builtin(),
        )
    }

    /// Built-in tables extended with the config's extra words and groups.
    pub fn from_config(config: &ExpansionConfig) -> Self {
        Self::new(
            BUILTIN_VOCABULARY
                .iter()
                .map(|w| w.to_string())
                .chain(config.extra_vocabulary.iter().cloned()),
            SynonymTable::builtin().with_groups(&config.extra_synonyms),
        )
    }

    /// Build from arbitrary words. Synonym-table words are always part of
    /// the vocabulary.
    pub fn new<I>(words: I, synonyms: SynonymTable) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut set: BTreeSet<String> = words
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| is_vocabulary_word(w))
            .collect();
        set.extend(synonyms.words().map(str::to_string));
        Self {
            words: set,
            synonyms,
        }
    }

    /// A new lexicon with `extra` words added.
    pub fn extended<I>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self::new(
            self.words.iter().cloned().chain(extra),
            self.synonyms.clone(),
        )
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn words(&self) -> &BTreeSet<String> {
        &self.words
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

fn is_vocabulary_word(word: &str) -> bool {
    word.chars().count() >= 2
        && word.chars().any(char::is_alphabetic)
        && !is_stop_word(word)
}

/// Words drawn from a corpus: content, description, labels, and category.
pub fn corpus_vocabulary(tasks: &[Task]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for task in tasks {
        let fields = std::iter::once(task.content.as_str())
            .chain(task.description.as_deref())
            .chain(task.category.as_deref())
            .chain(task.labels.iter().map(String::as_str));
        for field in fields {
            out.extend(content_tokens(field).into_iter().filter(|t| is_vocabulary_word(t)));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// SharedLexicon
// ---------------------------------------------------------------------------

/// Process-wide lexicon cache.
///
/// Readers clone the inner `Arc`; a rebuild replaces the whole table at once
/// and never mutates a lexicon a reader may hold.
#[derive(Debug)]
pub struct SharedLexicon {
    inner: RwLock<Arc<Lexicon>>,
}

impl SharedLexicon {
    pub fn new(lexicon: Lexicon) -> Self {
        Self {
            inner: RwLock::new(Arc::new(lexicon)),
        }
    }

    /// The current table. Later swaps do not affect the returned snapshot.
    pub fn snapshot(&self) -> Arc<Lexicon> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in `lexicon`, returning the previous table.
    pub fn replace(&self, lexicon: Lexicon) -> Arc<Lexicon> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(lexicon))
    }

    /// Build a new table from the current one plus `words`, then swap it in.
    pub fn extend_with<I>(&self, words: I) -> Arc<Lexicon>
    where
        I: IntoIterator<Item = String>,
    {
        let next = self.snapshot().extended(words);
        self.replace(next);
        self.snapshot()
    }
}

impl Default for SharedLexicon {
    fn default() -> Self {
        Self::new(Lexicon::builtin())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
