//! Rules-based query expansion for task search.
//!
//! Turns a normalized query into a short, ordered list of rewrites: the
//! query itself, a typo-corrected form, synonym and abbreviation
//! substitutions, and an entity-only form. All rules are static tables
//! plus the words of the current corpus, so expansion is deterministic and
//! makes no network calls.

use std::collections::{BTreeSet, HashSet};

use crate::config::ExpansionConfig;
use crate::search::lexicon::Lexicon;
use crate::search::normalize::{is_relative_date, tokenize};
use crate::types::{EntityKind, NormalizedQuery, QueryVariant, VariantSource};

// ---------------------------------------------------------------------------
// Expander
// ---------------------------------------------------------------------------

/// Generates [`QueryVariant`]s for a normalized query.
///
/// Borrowed views only; build one per search call.
#[derive(Debug, Clone, Copy)]
pub struct QueryExpander<'a> {
    lexicon: &'a Lexicon,
    corpus_words: Option<&'a BTreeSet<String>>,
    config: &'a ExpansionConfig,
}

impl<'a> QueryExpander<'a> {
    pub fn new(lexicon: &'a Lexicon, config: &'a ExpansionConfig) -> Self {
        Self {
            lexicon,
            corpus_words: None,
            config,
        }
    }

    /// Also correct typos towards words from the current corpus. Corpus
    /// words win ties against built-in vocabulary.
    pub fn with_corpus_words(mut self, words: &'a BTreeSet<String>) -> Self {
        self.corpus_words = Some(words);
        self
    }

    /// Expand `nq` into variants ordered by decreasing estimated relevance.
    ///
    /// The identity variant is always first and always present, so the
    /// result is never empty. Length never exceeds `max_variants`.
    pub fn expand(&self, nq: &NormalizedQuery) -> Vec<QueryVariant> {
        let cap = self.config.max_variants.max(1);
        let mut out = VariantList::default();

        // Identity: the normalized tokens, or the entity text when every
        // word was inside a quoted phrase.
        let identity = if nq.tokens.is_empty() {
            entity_tokens(nq)
        } else {
            nq.tokens.clone()
        };
        out.push_always(VariantSource::Identity, identity.clone());

        // Typo correction: one variant with every correctable token fixed.
        // Words inside quoted phrases are taken verbatim.
        let protected: HashSet<String> = nq
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Phrase)
            .flat_map(|e| tokenize(&e.text))
            .collect();
        let corrected: Vec<String> = identity
            .iter()
            .map(|t| {
                if protected.contains(t) {
                    return t.clone();
                }
                self.correct_token(t).unwrap_or_else(|| t.clone())
            })
            .collect();
        let synonym_base = if corrected != identity {
            out.push(VariantSource::TypoCorrected, corrected.clone());
            corrected
        } else {
            identity
        };

        // Synonyms: one variant per single-token substitution.
        let synonyms = self.lexicon.synonyms();
        let mut synonym_count = 0;
        'tokens: for (i, token) in synonym_base.iter().enumerate() {
            for alt in synonyms.alternatives(token) {
                if synonym_count >= self.config.max_synonym_variants {
                    break 'tokens;
                }
                let mut tokens = synonym_base.clone();
                tokens[i] = alt;
                if out.push(VariantSource::Synonym, tokens) {
                    synonym_count += 1;
                }
            }
        }

        // Entity-only.
        if !nq.entities.is_empty() {
            out.push(VariantSource::EntityOnly, entity_tokens(nq));
        }

        let mut variants = out.into_inner();
        variants.truncate(cap);
        for (rank, v) in variants.iter_mut().enumerate() {
            v.rank = rank;
        }
        variants
    }

    /// Nearest known word for a misspelled `token`, if one is close enough.
    ///
    /// Tokens that are already known, numeric, or a single character are
    /// left alone. Length 2..=4 allows one edit; longer tokens allow
    /// `max_edit_distance`. Ties prefer corpus words, then lexicographic
    /// order.
    pub fn correct_token(&self, token: &str) -> Option<String> {
        let len = token.chars().count();
        if len < 2
            || token.chars().any(|c| c.is_ascii_digit())
            || is_relative_date(token)
            || self.is_known(token)
            || self.lexicon.synonyms().contains(token)
        {
            return None;
        }

        let max_distance = if len <= 4 {
            1
        } else {
            self.config.max_edit_distance
        };
        if max_distance == 0 {
            return None;
        }

        let corpus = self.corpus_words.into_iter().flatten().map(|w| (0u8, w));
        let builtin = self.lexicon.words().iter().map(|w| (1u8, w));

        corpus
            .chain(builtin)
            .filter(|(_, w)| w.chars().count().abs_diff(len) <= max_distance)
            .map(|(source, w)| (strsim::levenshtein(token, w), source, w))
            .filter(|(d, _, _)| *d <= max_distance)
            .min()
            .map(|(_, _, w)| w.clone())
    }

    fn is_known(&self, token: &str) -> bool {
        self.lexicon.contains(token) || self.corpus_words.is_some_and(|c| c.contains(token))
    }
}

/// Expand with the built-in lexicon view only (no corpus words).
pub fn expand_query(
    nq: &NormalizedQuery,
    lexicon: &Lexicon,
    config: &ExpansionConfig,
) -> Vec<QueryVariant> {
    QueryExpander::new(lexicon, config).expand(nq)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn entity_tokens(nq: &NormalizedQuery) -> Vec<String> {
    nq.entities.iter().flat_map(|e| tokenize(&e.text)).collect()
}

/// Ordered variant list that drops empty and duplicate rewrites.
#[derive(Default)]
struct VariantList {
    seen: HashSet<String>,
    variants: Vec<QueryVariant>,
}

impl VariantList {
    fn push_always(&mut self, source: VariantSource, tokens: Vec<String>) {
        let variant = QueryVariant::new(source, tokens);
        self.seen.insert(variant.text.clone());
        self.variants.push(variant);
    }

    /// Returns whether the variant was new and got added.
    fn push(&mut self, source: VariantSource, tokens: Vec<String>) -> bool {
        if tokens.is_empty() {
            return false;
        }
        let variant = QueryVariant::new(source, tokens);
        if !self.seen.insert(variant.text.clone()) {
            return false;
        }
        self.variants.push(variant);
        true
    }

    fn into_inner(self) -> Vec<QueryVariant> {
        self.variants
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
