//! Fuzzy scoring behind a small interface so the algorithm can be swapped
//! without touching the ranking contract.

use smallvec::SmallVec;
use std::collections::HashMap;

/// Scores how well `pattern` matches `text`, from 0.0 (nothing) to 1.0
/// (perfect). `None` means no match at all.
pub trait FuzzyScorer: Send + Sync {
    fn score(&self, pattern: &str, text: &str) -> Option<f64>;
}

/// A searchable field of an item and its weight.
#[derive(Debug, Clone, Copy)]
pub struct WeightedKey<'a> {
    pub text: &'a str,
    pub weight: f64,
}

impl<'a> WeightedKey<'a> {
    pub fn new(text: &'a str, weight: f64) -> Self {
        Self { text, weight }
    }
}

pub type Keys<'a> = SmallVec<[WeightedKey<'a>; 2]>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    pub index: usize,
    pub score: f64,
}

/// Score every item over its weighted keys.
///
/// An item matches when at least one key reaches `threshold`; its score is the
/// weighted sum of the qualifying keys over the total weight. Results come back
/// best first, in input order among equal scores.
pub fn search_weighted<'a, T, F>(
    scorer: &dyn FuzzyScorer,
    pattern: &str,
    items: &'a [T],
    threshold: f64,
    keys: F,
) -> Vec<FuzzyMatch>
where
    F: Fn(&'a T) -> Keys<'a>,
{
    let mut matches: Vec<FuzzyMatch> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let keys = keys(item);
            let total_weight: f64 = keys.iter().map(|k| k.weight).sum();
            if total_weight <= 0.0 {
                return None;
            }

            let qualifying: f64 = keys
                .iter()
                .filter_map(|key| {
                    scorer
                        .score(pattern, key.text)
                        .filter(|s| *s >= threshold)
                        .map(|s| s * key.weight)
                })
                .sum();

            (qualifying > 0.0).then_some(FuzzyMatch {
                index,
                score: qualifying / total_weight,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches
}

/// Location-independent subsequence matcher with a bigram fallback for typos.
///
/// A subsequence match scores by compactness (pattern length over the span it
/// covers), with a small bonus when the span starts at a word boundary. Text
/// that is not a subsequence falls back to Sørensen–Dice bigram similarity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubsequenceScorer;

const BOUNDARY_BONUS: f64 = 0.1;

impl FuzzyScorer for SubsequenceScorer {
    fn score(&self, pattern: &str, text: &str) -> Option<f64> {
        let pattern: Vec<char> = pattern
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let text: Vec<char> = text.to_lowercase().chars().collect();

        if pattern.is_empty() || text.is_empty() {
            return None;
        }

        let subsequence = tightest_span(&pattern, &text).map(|(start, span)| {
            let compactness = pattern.len() as f64 / span as f64;
            let at_boundary = start == 0 || !text[start - 1].is_alphanumeric();
            let bonus = if at_boundary { BOUNDARY_BONUS } else { 0.0 };
            (compactness + bonus).min(1.0)
        });

        let similarity = bigram_similarity(&pattern, &text);

        match subsequence {
            Some(score) => Some(score.max(similarity)),
            None if similarity > 0.0 => Some(similarity),
            None => None,
        }
    }
}

/// Start and length of the shortest window of `text` containing `pattern`
/// as a subsequence.
fn tightest_span(pattern: &[char], text: &[char]) -> Option<(usize, usize)> {
    let first = *pattern.first()?;
    let mut best: Option<(usize, usize)> = None;

    for start in (0..text.len()).filter(|&i| text[i] == first) {
        let mut next = 1;
        let mut end = start;

        for (offset, ch) in text[start + 1..].iter().enumerate() {
            if next == pattern.len() {
                break;
            }
            if *ch == pattern[next] {
                next += 1;
                end = start + 1 + offset;
            }
        }

        if next < pattern.len() {
            // Дальше по тексту совпадений тоже не будет
            break;
        }

        let span = end - start + 1;
        if best.map_or(true, |(_, b)| span < b) {
            best = Some((start, span));
        }
    }

    best
}

fn bigrams(chars: &[char]) -> HashMap<(char, char), usize> {
    let mut counts = HashMap::new();
    for pair in chars.windows(2) {
        if pair.iter().any(|c| c.is_whitespace()) {
            continue;
        }
        *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

fn bigram_similarity(pattern: &[char], text: &[char]) -> f64 {
    let a = bigrams(pattern);
    let b = bigrams(text);
    let total: usize = a.values().sum::<usize>() + b.values().sum::<usize>();
    if total == 0 {
        return 0.0;
    }

    let shared: usize = a
        .iter()
        .map(|(pair, count)| (*count).min(b.get(pair).copied().unwrap_or(0)))
        .sum();

    (2 * shared) as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn exact_and_prefix_score_high() {
        let scorer = SubsequenceScorer;
        assert_eq!(scorer.score("code", "Code"), Some(1.0));
        assert_eq!(scorer.score("term", "Terminal"), Some(1.0));
    }

    #[test]
    fn scattered_letters_score_lower_than_compact_ones() {
        let scorer = SubsequenceScorer;
        let compact = scorer.score("chrme", "Google Chrome").unwrap();
        let scattered = scorer.score("gce", "Google Chrome").unwrap();
        assert!(compact > 0.8, "{compact}");
        assert!(scattered < compact);
    }

    #[test]
    fn location_does_not_matter() {
        let scorer = SubsequenceScorer;
        let early = scorer.score("inbox", "Inbox - Mail").unwrap();
        let late = scorer.score("inbox", "Mail - Personal - Inbox").unwrap();
        assert_eq!(early, late);
    }

    #[test]
    fn whitespace_in_pattern_is_ignored() {
        assert!(SubsequenceScorer.score("vs code", "VS Code Insiders").unwrap() > 0.8);
    }

    #[test]
    fn typo_falls_back_to_bigrams() {
        let scorer = SubsequenceScorer;
        // "fierfox" не подпоследовательность "firefox"
        let typo = scorer.score("fierfox", "firefox").unwrap();
        assert!(typo > 0.3 && typo < 1.0, "{typo}");
        assert_eq!(scorer.score("xyz", "Terminal"), None);
        assert_eq!(scorer.score("", "Terminal"), None);
    }

    #[test]
    fn tightest_span_prefers_shortest_window() {
        let text: Vec<char> = "a_b___ab".chars().collect();
        let pattern: Vec<char> = "ab".chars().collect();
        assert_eq!(tightest_span(&pattern, &text), Some((6, 2)));
    }

    #[test]
    fn weighted_search_ranks_primary_key_higher() {
        let items = [("Mail", "Chrome notes"), ("Chrome", "Mail")];
        let matches = search_weighted(&SubsequenceScorer, "chrome", &items, 0.6, |(owner, title)| {
            smallvec![WeightedKey::new(owner, 3.0), WeightedKey::new(title, 1.0)]
        });

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].index, 1);
        assert_eq!(matches[0].score, 0.75);
        assert_eq!(matches[1].index, 0);
    }

    #[test]
    fn weighted_search_applies_threshold() {
        let items = [("Google Chrome", ""), ("Finder", "")];
        let strict = search_weighted(&SubsequenceScorer, "gce", &items, 0.9, |(owner, title)| {
            smallvec![WeightedKey::new(owner, 3.0), WeightedKey::new(title, 1.0)]
        });
        assert!(strict.is_empty());
    }
}
