// 🎯 Fuzzy Matcher - Weighted similarity search over the reference index
// Three measures: full ratio, partial ratio, token-sort ratio

use crate::reference::ReferenceIndex;
use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

/// Rendered in the result table when no reference record clears the cutoff
pub const NOT_FOUND_LABEL: &str = "Not Found";

// Weighting of the secondary measures relative to the full ratio
const TOKEN_SORT_WEIGHT: f64 = 0.95;
const PARTIAL_WEIGHT: f64 = 0.90;

// Partial alignment only kicks in when one string is clearly longer;
// below this the full ratio already covers the comparison
const PARTIAL_LENGTH_RATIO: f64 = 1.5;

// ============================================================================
// MATCH RESULT
// ============================================================================

/// Outcome of matching one query against the index.
/// `score` is a 0-100 similarity measure, not a probability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// UAI of the winning record, `None` when nothing cleared the cutoff
    pub uai: Option<String>,

    /// Best similarity score, 0 when no match was accepted
    pub score: u8,
}

impl MatchResult {
    pub fn not_found() -> Self {
        MatchResult { uai: None, score: 0 }
    }

    /// UAI or the literal `"Not Found"`, as exported
    pub fn uai_label(&self) -> &str {
        self.uai.as_deref().unwrap_or(NOT_FOUND_LABEL)
    }

    pub fn is_found(&self) -> bool {
        self.uai.is_some()
    }
}

// ============================================================================
// FUZZY MATCHER
// ============================================================================

/// Finds the best-scoring reference record for a free-text query.
///
/// Pure function of (query, index): no mutation, no I/O. Cost is one full
/// index scan per query, O(referenceSize × avgStringLength²) worst case from
/// the windowed partial alignment; blocking or pre-filtering would be a pure
/// optimization on top of this contract.
pub struct FuzzyMatcher {
    /// Minimum score (0-100) for a match to be accepted (default: 70)
    pub score_cutoff: u8,
}

impl FuzzyMatcher {
    /// Create matcher with the default cutoff
    pub fn new() -> Self {
        FuzzyMatcher { score_cutoff: 70 }
    }

    pub fn with_cutoff(score_cutoff: u8) -> Self {
        FuzzyMatcher { score_cutoff }
    }

    /// Match a query string against every composite string in the index.
    ///
    /// Blank queries and empty indexes return `not_found` without any
    /// comparison. Ties on the maximal score resolve to the lowest index
    /// entry, so repeated calls with identical arguments return identical
    /// results.
    pub fn best_match(&self, query: &str, reference: &ReferenceIndex) -> MatchResult {
        if query.trim().is_empty() || reference.index().is_empty() {
            return MatchResult::not_found();
        }

        let mut best_score = 0u8;
        let mut best_index: Option<usize> = None;

        for entry in reference.index().entries() {
            let score = weighted_ratio(query, &entry.search_string);
            if best_index.is_none() || score > best_score {
                best_score = score;
                best_index = Some(entry.record_index);
            }
        }

        if best_score < self.score_cutoff {
            return MatchResult::not_found();
        }

        match best_index.and_then(|i| reference.record(i)) {
            Some(record) => MatchResult {
                uai: Some(record.uai.clone()),
                score: best_score,
            },
            None => MatchResult::not_found(),
        }
    }
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SCORING PRIMITIVES
// ============================================================================

/// Weighted similarity between two strings, 0-100.
///
/// Both inputs are case-folded and stripped to alphanumeric tokens first.
/// The result is the best of:
/// - the full-string ratio,
/// - 0.95 × the token-sort ratio (tokens sorted before comparison, so word
///   reordering degrades gracefully),
/// - 0.90 × the partial ratio when one string is at least 1.5× longer than
///   the other (so a short-but-exact substring inside a longer string still
///   scores highly).
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let a = full_process(a);
    let b = full_process(b);

    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let full = ratio(&a, &b);
    let token_sort = token_sort_ratio(&a, &b) * TOKEN_SORT_WEIGHT;

    let len_a = a.chars().count() as f64;
    let len_b = b.chars().count() as f64;
    let length_ratio = len_a.max(len_b) / len_a.min(len_b);

    let mut best = full.max(token_sort);
    if length_ratio >= PARTIAL_LENGTH_RATIO {
        best = best.max(partial_ratio(&a, &b) * PARTIAL_WEIGHT);
    }

    best.round().clamp(0.0, 100.0) as u8
}

/// Full-string similarity ratio, 0-100 (normalized Levenshtein)
fn ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b) * 100.0
}

/// Best alignment of the shorter string against every window of the longer
/// string, 0-100.
///
/// Example: partial_ratio("ecole pasteur", "ecole pasteur annexe nord")
/// scores ~100 because the shorter string appears verbatim in the longer.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    let window = shorter.chars().count();
    if window == 0 {
        return 0.0;
    }

    let longer_chars: Vec<char> = longer.chars().collect();
    if window >= longer_chars.len() {
        return ratio(shorter, longer);
    }

    let mut best = 0.0f64;
    for start in 0..=(longer_chars.len() - window) {
        let slice: String = longer_chars[start..start + window].iter().collect();
        best = best.max(ratio(shorter, &slice));
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Similarity after sorting the whitespace tokens of both strings, 0-100
fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Case-fold and keep only alphanumeric characters, collapsing every run of
/// anything else into a single space
fn full_process(s: &str) -> String {
    let folded: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(|c| c.to_lowercase())
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// TESTS
// ============================================================================
