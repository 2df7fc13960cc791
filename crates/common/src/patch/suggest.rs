// "Did you mean" hints for search text that matched nothing.
//
// Purely a UX aid: nothing here decides whether a block applies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SUGGESTION_THRESHOLD: f64 = 0.7;

/// A region of the content that looks like what the search meant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// 1-based line where the suggested region starts.
    pub line: usize,
    pub text: String,
    /// Similarity score in `[0, 1]`.
    pub similarity: f64,
}

/// Finds a near miss for a search string that was not found verbatim.
pub trait Suggester: Send + Sync {
    fn suggest(&self, content: &str, search: &str) -> Option<Suggestion>;
}

/// Scores line windows of the search's height by bigram Dice similarity of
/// their anchor line against the search's first non-blank line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiceSuggester {
    pub threshold: f64,
}

impl Default for DiceSuggester {
    fn default() -> Self {
        Self { threshold: DEFAULT_SUGGESTION_THRESHOLD }
    }
}

impl DiceSuggester {
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold: threshold.clamp(0.0, 1.0) }
    }
}

impl Suggester for DiceSuggester {
    fn suggest(&self, content: &str, search: &str) -> Option<Suggestion> {
        let search_lines: Vec<&str> = search.lines().collect();
        let (anchor_offset, anchor) = search_lines
            .iter()
            .enumerate()
            .find(|(_, line)| !line.trim().is_empty())
            .map(|(offset, line)| (offset, line.trim()))?;

        let content_lines: Vec<&str> = content.lines().collect();
        if content_lines.is_empty() {
            return None;
        }
        let height = search_lines.len().min(content_lines.len()).max(1);

        let mut best: Option<(usize, f64)> = None;
        for start in 0..=content_lines.len() - height {
            let Some(candidate) = content_lines.get(start + anchor_offset) else {
                continue;
            };
            let score = dice_coefficient(candidate.trim(), anchor);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((start, score));
            }
        }

        let (start, similarity) = best?;
        if similarity < self.threshold {
            return None;
        }
        Some(Suggestion {
            line: start + 1,
            text: content_lines[start..start + height].join("\n"),
            similarity,
        })
    }
}

/// Sørensen–Dice coefficient over character bigrams (multiset).
pub fn dice_coefficient(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a_bigrams = bigrams(a);
    let b_bigrams = bigrams(b);
    let total = a_bigrams.values().sum::<usize>() + b_bigrams.values().sum::<usize>();
    if total == 0 {
        return 0.0;
    }

    let shared: usize = a_bigrams
        .iter()
        .map(|(pair, count)| b_bigrams.get(pair).map_or(0, |other| (*count).min(*other)))
        .sum();
    (2 * shared) as f64 / total as f64
}

fn bigrams(value: &str) -> HashMap<(char, char), usize> {
    let chars: Vec<char> = value.chars().collect();
    let mut counts = HashMap::new();
    for pair in chars.windows(2) {
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}
