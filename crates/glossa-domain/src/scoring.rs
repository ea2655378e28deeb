//! Deterministic scoring used by every resolver
//!
//! Implements the text-similarity function shared by the fuzzy glossary and
//! concept matchers, and the candidate weight formula:
//!
//! ```text
//! weight = confidence × term_similarity × term_weight + usage_bonus
//! usage_bonus = min(0.3 × (1 + log10(usage_count)), 0.6)   when usage_count > 0
//! ```

use std::collections::HashSet;

/// Similarity of two identical strings
pub const EXACT_SIMILARITY: f64 = 1.0;

/// Similarity when the query text contains the term
pub const CONTAINS_TERM_SIMILARITY: f64 = 0.9;

/// Similarity when the term contains the query text
pub const CONTAINED_IN_TERM_SIMILARITY: f64 = 0.8;

/// Base multiplier of the usage bonus
pub const USAGE_BONUS_BASE: f64 = 0.3;

/// Upper bound of the usage bonus
pub const USAGE_BONUS_CAP: f64 = 0.6;

/// Similarity between a piece of query text and a glossary term name
///
/// Both sides are lowercased and trimmed. Returns 1.0 on equality, 0.9 when `text`
/// contains `term`, 0.8 when `term` contains `text`, and otherwise the Jaccard
/// similarity of the two word sets.
///
/// # Examples
///
/// ```
/// use glossa_domain::scoring::text_similarity;
///
/// assert_eq!(text_similarity("Customer", "customer"), 1.0);
/// assert_eq!(text_similarity("active customers", "customer"), 0.9);
/// assert_eq!(text_similarity("revenue", "net revenue"), 0.8);
/// assert_eq!(text_similarity("order total", "total amount"), 1.0 / 3.0);
/// ```
pub fn text_similarity(text: &str, term: &str) -> f64 {
    let text = text.trim().to_lowercase();
    let term = term.trim().to_lowercase();

    if text.is_empty() || term.is_empty() {
        return 0.0;
    }
    if text == term {
        return EXACT_SIMILARITY;
    }
    if text.contains(&term) {
        return CONTAINS_TERM_SIMILARITY;
    }
    if term.contains(&text) {
        return CONTAINED_IN_TERM_SIMILARITY;
    }

    jaccard_similarity(&text, &term)
}

/// Jaccard similarity of the whitespace/punctuation separated word sets
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let words_a = word_set(a);
    let words_b = word_set(b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count() as f64;
    let union = words_a.union(&words_b).count() as f64;
    intersection / union
}

fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether two strings share at least one word or one contains the other
pub fn textually_overlaps(a: &str, b: &str) -> bool {
    let a_lower = a.trim().to_lowercase();
    let b_lower = b.trim().to_lowercase();
    if a_lower.is_empty() || b_lower.is_empty() {
        return false;
    }
    if a_lower.contains(&b_lower) || b_lower.contains(&a_lower) {
        return true;
    }
    !word_set(&a_lower).is_disjoint(&word_set(&b_lower))
}

/// Bonus for glossary terms that have been used successfully before
pub fn usage_bonus(usage_count: u64) -> f64 {
    if usage_count == 0 {
        return 0.0;
    }
    (USAGE_BONUS_BASE * (1.0 + (usage_count as f64).log10())).min(USAGE_BONUS_CAP)
}

/// Weight of a resolution candidate
pub fn candidate_weight(
    confidence: f64,
    term_similarity: f64,
    term_weight: f64,
    usage_count: u64,
) -> f64 {
    confidence * term_similarity * term_weight + usage_bonus(usage_count)
}

/// Clip a confidence value into `[0, 1]`, mapping NaN to 0
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
