//! Keyword matcher: ranks registry categories against one free-text utterance.
//!
//! Two passes run over the registry. The exact-name pass looks for a
//! category's canonical name in the utterance; the keyword pass counts how many
//! of a category's keywords appear. Exact matches always outrank keyword
//! matches, and a category found by both passes keeps only its exact candidate.

use crate::registry::{CategoryDefinition, CategoryRegistry};
use serde::Serialize;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

/// Score given to exact-name candidates; no keyword count can reach it.
pub const EXACT_MATCH_SCORE: u32 = 1_000_000;

/// Keywords at or below this many characters must match as whole words.
/// Zero keeps plain substring matching for every keyword.
pub const DEFAULT_SHORT_KEYWORD_LEN: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ExactName,
    Keyword,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub category: Arc<CategoryDefinition>,
    pub match_kind: MatchKind,
    pub score: u32,
    /// Declaration index in the registry, used for tie-breaking and numbering.
    pub index: usize,
}

impl MatchCandidate {
    pub fn name(&self) -> &str {
        &self.category.name
    }

    pub fn is_exact(&self) -> bool {
        self.match_kind == MatchKind::ExactName
    }
}

/// Matching knobs that come from survey configuration.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    pub short_keyword_len: usize,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            short_keyword_len: DEFAULT_SHORT_KEYWORD_LEN,
        }
    }
}

impl Matcher {
    pub fn new(short_keyword_len: usize) -> Self {
        Self { short_keyword_len }
    }

    /// Rank categories for `utterance`, highest score first, ties in declaration order.
    pub fn rank(&self, utterance: &str, registry: &CategoryRegistry) -> Vec<MatchCandidate> {
        let text = normalize(utterance);
        if text.is_empty() {
            return Vec::new();
        }

        let mut candidates: Vec<MatchCandidate> = Vec::new();
        for (index, category) in registry.all().iter().enumerate() {
            let name = normalize(&category.name);
            if text == name || contains_phrase(&text, &name) {
                candidates.push(MatchCandidate {
                    category: category.clone(),
                    match_kind: MatchKind::ExactName,
                    score: EXACT_MATCH_SCORE,
                    index,
                });
                continue;
            }

            let hits = category
                .keywords
                .iter()
                .filter(|kw| self.keyword_present(&text, kw))
                .count() as u32;
            if hits > 0 {
                candidates.push(MatchCandidate {
                    category: category.clone(),
                    match_kind: MatchKind::Keyword,
                    score: hits,
                    index,
                });
            }
        }

        // Stable sort keeps declaration order among equal scores.
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        tracing::debug!(
            registry = registry.kind(),
            candidates = candidates.len(),
            "ranked utterance"
        );
        candidates
    }

    pub(crate) fn keyword_present(&self, text: &str, keyword: &str) -> bool {
        let kw = normalize(keyword);
        if kw.is_empty() {
            return false;
        }
        if kw.chars().count() <= self.short_keyword_len {
            contains_phrase(text, &kw)
        } else {
            text.contains(&kw)
        }
    }
}

/// Rank with default settings.
pub fn match_utterance(utterance: &str, registry: &CategoryRegistry) -> Vec<MatchCandidate> {
    Matcher::default().rank(utterance, registry)
}

/// NFKC, lowercase, trimmed, single-spaced.
pub fn normalize(content: &str) -> String {
    content
        .nfkc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when `needle` occurs in `haystack` bounded by non-alphanumerics or the ends.
pub fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        before.is_none_or(|c| !c.is_alphanumeric()) && after.is_none_or(|c| !c.is_alphanumeric())
    })
}
