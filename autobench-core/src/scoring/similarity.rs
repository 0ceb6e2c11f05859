//! String similarity metrics, each returning a percentage in 0..=100.
//!
//! All metrics treat two empty inputs as identical (100) and exactly one
//! empty input as completely different (0).

use std::collections::HashSet;

/// Separators used by [`tokenize`] in addition to whitespace.
const TOKEN_PUNCTUATION: &[char] = &[',', '.', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}'];

/// Case-insensitive Levenshtein similarity.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if let Some(edge) = empty_edge(a.len(), b.len()) {
        return edge;
    }

    let distance = levenshtein_distance(&a, &b);
    let max_len = a.len().max(b.len());
    (1.0 - distance as f64 / max_len as f64) * 100.0
}

/// Edit distance with a two-row rolling buffer sized by the shorter input.
pub fn levenshtein_distance(a: &[char], b: &[char]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let cost = usize::from(lc != sc);
            curr[j + 1] = (curr[j] + 1).min(prev[j + 1] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

/// Jaccard similarity of the lower-cased token sets.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if let Some(edge) = empty_edge(tokens_a.len(), tokens_b.len()) {
        return edge;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64 * 100.0
}

/// Case-insensitive longest-common-subsequence similarity.
pub fn lcs_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if let Some(edge) = empty_edge(a.len(), b.len()) {
        return edge;
    }

    let max_len = a.len().max(b.len());
    lcs_length(&a, &b) as f64 / max_len as f64 * 100.0
}

/// Length of the longest common subsequence.
pub fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ac in a {
        for (j, bc) in b.iter().enumerate() {
            curr[j + 1] = if ac == bc {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
        curr.fill(0);
    }
    prev[b.len()]
}

/// Split on whitespace and [`TOKEN_PUNCTUATION`], lower-case, dedupe.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || TOKEN_PUNCTUATION.contains(&c))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn empty_edge(len_a: usize, len_b: usize) -> Option<f64> {
    match (len_a, len_b) {
        (0, 0) => Some(100.0),
        (0, _) | (_, 0) => Some(0.0),
        _ => None,
    }
}
