use super::filter;
use super::fuzzy::{search_weighted, FuzzyScorer, SubsequenceScorer, WeightedKey};
use crate::model::WindowEntity;
use crate::services::recency::RecencyMap;
use crate::trace_if_enabled;
use smallvec::smallvec;
use std::cmp::Reverse;

const PRIMARY_WEIGHT: f64 = 3.0;
const SECONDARY_WEIGHT: f64 = 1.0;

/// Which branch of the text search produced the candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBranch {
    NoQuery,
    Exact,
    Fuzzy,
}

/// Filter, search and order windows for the picker.
pub struct Ranker {
    scorer: Box<dyn FuzzyScorer>,
    threshold: f64,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl Ranker {
    pub fn new(threshold: f64) -> Self {
        Self {
            scorer: Box::new(SubsequenceScorer),
            threshold,
        }
    }

    pub fn with_scorer(mut self, scorer: Box<dyn FuzzyScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// Never fails; no match is an empty list.
    ///
    /// The focused window always comes first, the rest by merged recency,
    /// newest first. Among equal recency the search order is kept.
    pub fn rank(
        &self,
        entities: &[WindowEntity],
        raw_query: &str,
        recency: &RecencyMap,
        focused_id: Option<u64>,
    ) -> Vec<WindowEntity> {
        let parsed = filter::parse(raw_query);

        let working: Vec<&WindowEntity> = match parsed.display_number {
            Some(display) if parsed.matched => entities
                .iter()
                .filter(|e| e.display_index == Some(display))
                .collect(),
            _ => entities.iter().collect(),
        };

        if working.is_empty() {
            return Vec::new();
        }

        let (mut candidates, branch) = self.search(&working, &parsed.remainder);
        trace_if_enabled!(
            "Поиск '{}': ветка {:?}, кандидатов {}",
            raw_query,
            branch,
            candidates.len()
        );

        candidates.sort_by_key(|e| {
            (
                Some(e.id) != focused_id,
                Reverse(recency.get(&e.id).copied().unwrap_or(0)),
            )
        });

        candidates.into_iter().cloned().collect()
    }

    fn search<'a>(
        &self,
        working: &[&'a WindowEntity],
        query: &str,
    ) -> (Vec<&'a WindowEntity>, SearchBranch) {
        let query = query.trim();
        if query.is_empty() {
            return (working.to_vec(), SearchBranch::NoQuery);
        }

        let exact = exact_search(working, query);
        if !exact.is_empty() {
            return (exact, SearchBranch::Exact);
        }

        (self.fuzzy_search(working, query), SearchBranch::Fuzzy)
    }

    fn fuzzy_search<'a>(&self, working: &[&'a WindowEntity], query: &str) -> Vec<&'a WindowEntity> {
        let mut matches = search_weighted(self.scorer.as_ref(), query, working, self.threshold, |e| {
            smallvec![
                WeightedKey::new(&e.owner, PRIMARY_WEIGHT),
                WeightedKey::new(&e.title, SECONDARY_WEIGHT),
            ]
        });

        // Равные оценки: короче имя приложения, выше
        matches.sort_by(|a, b| {
            b.score.total_cmp(&a.score).then_with(|| {
                working[a.index]
                    .owner
                    .chars()
                    .count()
                    .cmp(&working[b.index].owner.chars().count())
            })
        });

        matches.into_iter().map(|m| working[m.index]).collect()
    }
}

/// Case-insensitive substring search: owner matches first (exact name before
/// partial, then shorter names), then title-only matches by title length.
fn exact_search<'a>(working: &[&'a WindowEntity], query: &str) -> Vec<&'a WindowEntity> {
    let needle = query.to_lowercase();

    let mut primary: Vec<(bool, usize, &'a WindowEntity)> = Vec::new();
    let mut secondary: Vec<(usize, &'a WindowEntity)> = Vec::new();

    for entity in working.iter().copied() {
        let owner = entity.owner.to_lowercase();
        if owner.contains(&needle) {
            primary.push((owner != needle, owner.chars().count(), entity));
        } else if entity.title.to_lowercase().contains(&needle) {
            secondary.push((entity.title.chars().count(), entity));
        }
    }

    primary.sort_by_key(|(partial, len, _)| (*partial, *len));
    secondary.sort_by_key(|(len, _)| *len);

    primary
        .into_iter()
        .map(|(_, _, e)| e)
        .chain(secondary.into_iter().map(|(_, e)| e))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ids(windows: &[WindowEntity]) -> Vec<u64> {
        windows.iter().map(|w| w.id).collect()
    }

    fn no_recency() -> RecencyMap {
        HashMap::new()
    }

    #[test]
    fn display_filter_restricts_to_that_display() {
        let windows = vec![
            WindowEntity::new(1, "Chrome").with_display(1),
            WindowEntity::new(2, "Chrome").with_display(2),
        ];

        let ranked = Ranker::default().rank(&windows, "#2", &no_recency(), None);
        assert_eq!(ids(&ranked), vec![2]);
    }

    #[test]
    fn empty_display_filter_has_no_fallback() {
        let windows = vec![
            WindowEntity::new(1, "Chrome").with_display(1),
            WindowEntity::new(2, "Code"),
        ];

        assert!(Ranker::default().rank(&windows, "#3", &no_recency(), None).is_empty());
        assert!(Ranker::default().rank(&windows, "#3 chrome", &no_recency(), None).is_empty());
    }

    #[test]
    fn display_filter_combines_with_text() {
        let windows = vec![
            WindowEntity::new(1, "Chrome").with_display(1),
            WindowEntity::new(2, "Chrome").with_display(2),
            WindowEntity::new(3, "Code").with_display(2),
        ];

        let ranked = Ranker::default().rank(&windows, "#2 chr", &no_recency(), None);
        assert_eq!(ids(&ranked), vec![2]);
    }

    #[test]
    fn unanchored_hash_is_search_text() {
        let windows = vec![
            WindowEntity::new(1, "Chrome").with_display(1).with_title("Issue #2"),
            WindowEntity::new(2, "Chrome").with_display(2),
        ];

        let ranked = Ranker::default().rank(&windows, "issue #2", &no_recency(), None);
        assert_eq!(ids(&ranked), vec![1]);
    }

    #[test]
    fn shorter_owner_wins_exact_path() {
        let windows = vec![
            WindowEntity::new(1, "VS Code Insiders"),
            WindowEntity::new(2, "Code"),
        ];

        let ranked = Ranker::default().rank(&windows, "code", &no_recency(), None);
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn exact_owner_match_before_shorter_partial() {
        let working = [
            WindowEntity::new(1, "Mail"),
            WindowEntity::new(2, "ail"),
            WindowEntity::new(3, "Gmail"),
        ];
        let refs: Vec<&WindowEntity> = working.iter().collect();

        assert_eq!(
            exact_search(&refs, "AIL").iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![2, 1, 3]
        );
    }

    #[test]
    fn owner_matches_come_before_title_matches() {
        let windows = vec![
            WindowEntity::new(1, "Finder").with_title("notes about terminal setup"),
            WindowEntity::new(2, "Terminal").with_title("terminal"),
            WindowEntity::new(3, "Safari").with_title("Terminal"),
        ];

        let ranked = Ranker::default().rank(&windows, "terminal", &no_recency(), None);
        // Окно 2 совпало по приложению и не повторяется среди заголовков
        assert_eq!(ids(&ranked), vec![2, 3, 1]);
    }

    #[test]
    fn fuzzy_fallback_when_nothing_exact() {
        let windows = vec![
            WindowEntity::new(1, "Google Chrome").with_title("Inbox"),
            WindowEntity::new(2, "Terminal").with_title("zsh"),
        ];

        let ranked = Ranker::default().rank(&windows, "chrme", &no_recency(), None);
        assert_eq!(ids(&ranked), vec![1]);

        assert!(Ranker::default().rank(&windows, "qqqq", &no_recency(), None).is_empty());
    }

    #[test]
    fn fuzzy_ties_prefer_shorter_owner() {
        let windows = vec![
            WindowEntity::new(1, "Xcode Beta"),
            WindowEntity::new(2, "Xcode"),
        ];
        let refs: Vec<&WindowEntity> = windows.iter().collect();

        let ranked = Ranker::default().fuzzy_search(&refs, "xcde");
        assert_eq!(ranked.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn focused_first_regardless_of_recency() {
        let windows = vec![
            WindowEntity::new(1, "A"),
            WindowEntity::new(2, "B").focused(),
        ];
        let recency: RecencyMap = [(1, 5000), (2, 1000)].into_iter().collect();

        let ranked = Ranker::default().rank(&windows, "", &recency, Some(2));
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn recency_orders_the_rest() {
        let windows = vec![
            WindowEntity::new(1, "Code"),
            WindowEntity::new(2, "VS Code Insiders"),
            WindowEntity::new(3, "Code - OSS"),
            WindowEntity::new(4, "Terminal"),
        ];
        let recency: RecencyMap = [(2, 9000), (3, 4000), (4, 1)].into_iter().collect();

        let ranked = Ranker::default().rank(&windows, "code", &recency, Some(4));
        // Сфокусированное окно не совпало с запросом и не добавляется
        assert_eq!(ids(&ranked), vec![2, 3, 1]);

        let all = Ranker::default().rank(&windows, "  ", &recency, None);
        assert_eq!(ids(&all), vec![2, 3, 4, 1]);
    }

    #[test]
    fn custom_scorer_is_used_for_fuzzy_branch() {
        struct Everything;
        impl FuzzyScorer for Everything {
            fn score(&self, _pattern: &str, _text: &str) -> Option<f64> {
                Some(1.0)
            }
        }

        let windows = vec![WindowEntity::new(1, "Finder"), WindowEntity::new(2, "Mail")];
        let ranker = Ranker::new(0.9).with_scorer(Box::new(Everything));

        let ranked = ranker.rank(&windows, "zzz", &no_recency(), None);
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(Ranker::default().rank(&[], "code", &no_recency(), None).is_empty());
        assert!(Ranker::default().rank(&[], "", &no_recency(), Some(1)).is_empty());
    }
}
