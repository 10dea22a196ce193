//! Answer similarity checking
//!
//! Typed dictation answers are compared to the target word by
//! character-level edit distance. Correctness is exact match after
//! normalization; the similarity score feeds hint copy and statistics.

use serde::Serialize;

/// Result of checking a submitted answer against the target word
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCheck {
    /// Exact match after trimming and lowercasing
    pub correct: bool,
    /// 1.0 - distance / longest length, in [0, 1]
    pub similarity: f64,
    /// Levenshtein distance between the normalized strings
    pub distance: usize,
}

/// Normalize an answer for comparison: trim surrounding whitespace and
/// lowercase
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Character-level Levenshtein distance (two-row dynamic programming)
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Check a submitted answer against the target word
pub fn check_answer(target: &str, submitted: &str) -> AnswerCheck {
    let target = normalize(target);
    let submitted = normalize(submitted);

    let distance = levenshtein(&target, &submitted);
    let longest = target.chars().count().max(submitted.chars().count()).max(1);
    let similarity = (1.0 - distance as f64 / longest as f64).clamp(0.0, 1.0);

    AnswerCheck {
        correct: !target.is_empty() && target == submitted,
        similarity,
        distance,
    }
}
