//! Response scoring.
//!
//! [`SimilarityScorer`] normalizes both texts with [`normalize`] and then
//! either compares them exactly (case-insensitive) or combines three
//! similarity metrics into a composite percentage:
//!
//! ```text
//! composite = max(lev, jac, lcs) * 0.5 + mean(lev, jac, lcs) * 0.5
//! ```
//!
//! The composite always lies between the smallest and largest metric.

mod normalize;
mod similarity;

pub use normalize::normalize;
pub use similarity::{
    jaccard_similarity, lcs_length, lcs_similarity, levenshtein_distance, levenshtein_similarity,
    tokenize,
};

use serde::{Deserialize, Serialize};

use crate::dataset::MatchMode;

/// Per-metric scores, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricScores {
    pub levenshtein: f64,
    pub jaccard: f64,
    pub lcs: f64,
}

impl MetricScores {
    fn uniform(score: f64) -> Self {
        Self {
            levenshtein: score,
            jaccard: score,
            lcs: score,
        }
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.levenshtein.max(self.jaccard).max(self.lcs)
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.levenshtein.min(self.jaccard).min(self.lcs)
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        (self.levenshtein + self.jaccard + self.lcs) / 3.0
    }

    /// Weight the best-agreeing metric at one half, the mean at the other.
    #[must_use]
    pub fn composite(&self) -> f64 {
        self.max() * 0.5 + self.mean() * 0.5
    }
}

/// Outcome of scoring one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub is_pass: bool,
    /// Composite match percentage, 0-100.
    pub match_percentage: f64,
    pub match_mode: MatchMode,
    pub metrics: MetricScores,
    /// Human-readable summary.
    pub details: String,
}

/// Scores a model response against the expected response.
pub trait ResponseScorer: Send + Sync {
    fn score(&self, expected: &str, actual: &str, mode: MatchMode, threshold: f64) -> ScoringResult;
}

/// Default scorer combining Levenshtein, Jaccard and LCS similarity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer;

impl ResponseScorer for SimilarityScorer {
    fn score(&self, expected: &str, actual: &str, mode: MatchMode, threshold: f64) -> ScoringResult {
        let expected = normalize(expected);
        let actual = normalize(actual);

        match mode {
            MatchMode::Exact => {
                let matched = expected.to_lowercase() == actual.to_lowercase();
                let score = if matched { 100.0 } else { 0.0 };
                ScoringResult {
                    is_pass: matched,
                    match_percentage: score,
                    match_mode: MatchMode::Exact,
                    metrics: MetricScores::uniform(score),
                    details: if matched { "Exact match" } else { "No exact match" }.to_string(),
                }
            }
            MatchMode::Similarity => {
                let metrics = MetricScores {
                    levenshtein: levenshtein_similarity(&expected, &actual),
                    jaccard: jaccard_similarity(&expected, &actual),
                    lcs: lcs_similarity(&expected, &actual),
                };
                let composite = metrics.composite();
                ScoringResult {
                    is_pass: composite >= threshold,
                    match_percentage: composite,
                    match_mode: MatchMode::Similarity,
                    metrics,
                    details: format!(
                        "Lev={:.1}% Jac={:.1}% LCS={:.1}% => {:.1}%",
                        metrics.levenshtein, metrics.jaccard, metrics.lcs, composite
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(expected: &str, actual: &str, mode: MatchMode, threshold: f64) -> ScoringResult {
        SimilarityScorer.score(expected, actual, mode, threshold)
    }

    #[test]
    fn both_empty_scores_full_marks_on_every_metric() {
        let result = score("", "", MatchMode::Similarity, 50.0);

        assert_eq!(result.metrics, MetricScores::uniform(100.0));
        assert_eq!(result.match_percentage, 100.0);
        assert!(result.is_pass);
    }

    #[test]
    fn one_side_empty_scores_zero_on_every_metric() {
        for (expected, actual) in [("", "x"), ("x", "")] {
            let result = score(expected, actual, MatchMode::Similarity, 0.1);

            assert_eq!(result.metrics, MetricScores::uniform(0.0));
            assert_eq!(result.match_percentage, 0.0);
            assert!(!result.is_pass);
        }
    }

    #[test]
    fn exact_mode_ignores_case() {
        let result = score("Hello World", "hello world", MatchMode::Exact, 100.0);

        assert!(result.is_pass);
        assert_eq!(result.match_percentage, 100.0);
        assert_eq!(result.details, "Exact match");
    }

    #[test]
    fn exact_mode_compares_normalized_text() {
        let result = score("fn main() {}", "```rust\nfn main() {}\n```", MatchMode::Exact, 0.0);
        assert!(result.is_pass);
    }

    #[test]
    fn exact_mode_mismatch_is_zero_regardless_of_threshold() {
        let result = score("4", "four", MatchMode::Exact, 0.0);

        assert!(!result.is_pass);
        assert_eq!(result.match_percentage, 0.0);
        assert_eq!(result.details, "No exact match");
    }

    #[test]
    fn identical_responses_score_100() {
        let result = score("4", "4", MatchMode::Similarity, 80.0);

        assert_eq!(result.match_percentage, 100.0);
        assert!(result.is_pass);
    }

    #[test]
    fn pass_is_inclusive_of_threshold() {
        let result = score("abcd", "abcd", MatchMode::Similarity, 100.0);
        assert!(result.is_pass);
    }

    #[test]
    fn composite_lies_between_min_and_max_metric() {
        let pairs = [
            ("the quick brown fox", "the slow brown dog"),
            ("TCP is reliable", "UDP is unreliable and fast"),
            ("a b c d", "d c b a"),
            ("hello", "world"),
            ("def f(n): return n", "def f(n):\n    return n * 2"),
        ];
        for (expected, actual) in pairs {
            let result = score(expected, actual, MatchMode::Similarity, 0.0);
            let m = result.metrics;
            assert!(
                m.min() <= result.match_percentage && result.match_percentage <= m.max(),
                "{expected:?} vs {actual:?}: {m:?} => {}",
                result.match_percentage
            );
        }
    }

    #[test]
    fn composite_weights_best_metric() {
        // reordered tokens: Jaccard is perfect, the character metrics are not
        let result = score("a b c d", "d c b a", MatchMode::Similarity, 0.0);

        assert_eq!(result.metrics.jaccard, 100.0);
        let expected = 100.0 * 0.5 + result.metrics.mean() * 0.5;
        assert!((result.match_percentage - expected).abs() < 1e-9);
    }

    #[test]
    fn similarity_details_lists_each_metric() {
        let result = score("4", "4", MatchMode::Similarity, 80.0);
        assert_eq!(result.details, "Lev=100.0% Jac=100.0% LCS=100.0% => 100.0%");
    }

    #[test]
    fn scoring_is_deterministic() {
        let a = score("alpha beta", "beta gamma", MatchMode::Similarity, 50.0);
        let b = score("alpha beta", "beta gamma", MatchMode::Similarity, 50.0);
        assert_eq!(a, b);
    }
}
