use crate::config::RankingConfig;
use crate::query::QueryProfile;
use crate::result::Candidate;
use log::debug;
use std::collections::{HashMap, HashSet};

/// Selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Walk in score order with a fixed per-source cap
    Standard,
    /// Partition by source and give every source a quota
    Comparative,
}

impl SelectionMode {
    /// Comparative selection only applies when the query is comparative and
    /// more than one target source was requested.
    pub fn for_request(profile: QueryProfile, target_count: usize) -> Self {
        if profile.is_comparative && target_count > 1 {
            SelectionMode::Comparative
        } else {
            SelectionMode::Standard
        }
    }
}

/// Outcome of a selection pass
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub candidates: Vec<Candidate>,
    /// How many candidates the backfill pass admitted
    pub backfilled: usize,
}

/// Rations how many chunks one source document may contribute
#[derive(Debug, Clone)]
pub struct DiversitySelector {
    per_source_cap: usize,
    comparative_min_per_source: usize,
}

impl DiversitySelector {
    pub fn new(config: &RankingConfig) -> Self {
        Self {
            per_source_cap: config.standard_per_source_cap,
            comparative_min_per_source: config.comparative_min_per_source,
        }
    }

    /// Select at most `k` candidates from `ranked`, which must already be
    /// sorted by boosted score, highest first.
    pub fn select(&self, ranked: &[Candidate], k: usize, mode: SelectionMode) -> Selection {
        let mut selected = match mode {
            SelectionMode::Standard => self.select_standard(ranked, k),
            SelectionMode::Comparative => self.select_comparative(ranked, k),
        };

        let before_backfill = selected.len();
        if selected.len() < k {
            backfill(ranked, k, &mut selected);
        }
        let backfilled = selected.len() - before_backfill;

        debug!(
            "{mode:?} selection kept {} of {} candidates ({backfilled} backfilled)",
            selected.len(),
            ranked.len()
        );

        Selection {
            candidates: selected,
            backfilled,
        }
    }

    fn select_standard(&self, ranked: &[Candidate], k: usize) -> Vec<Candidate> {
        let mut per_source: HashMap<&str, usize> = HashMap::new();
        let mut selected = Vec::with_capacity(k);

        for candidate in ranked {
            if selected.len() >= k {
                break;
            }
            let count = per_source.entry(candidate.source_id.as_str()).or_insert(0);
            if *count < self.per_source_cap {
                *count += 1;
                selected.push(candidate.clone());
            }
        }

        selected
    }

    fn select_comparative(&self, ranked: &[Candidate], k: usize) -> Vec<Candidate> {
        // Groups in order of first appearance; each keeps descending score order.
        let mut group_index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Vec<&Candidate>> = Vec::new();
        for candidate in ranked {
            let idx = *group_index
                .entry(candidate.source_id.as_str())
                .or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
            groups[idx].push(candidate);
        }

        if groups.is_empty() {
            return Vec::new();
        }

        let max_per_source = self.comparative_min_per_source.max(k / groups.len());
        debug!(
            "Comparative selection over {} sources, {max_per_source} per source",
            groups.len()
        );

        groups
            .iter()
            .flat_map(|group| group.iter().take(max_per_source))
            .take(k)
            .map(|candidate| (*candidate).clone())
            .collect()
    }
}

/// Admit unselected candidates in score order until `k` is reached,
/// ignoring per-source caps. Candidates are matched by exact text.
fn backfill(ranked: &[Candidate], k: usize, selected: &mut Vec<Candidate>) {
    let mut seen: HashSet<String> = selected.iter().map(|c| c.text.clone()).collect();
    for candidate in ranked {
        if selected.len() >= k {
            break;
        }
        if seen.insert(candidate.text.clone()) {
            selected.push(candidate.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::tests::candidate;
    use pretty_assertions::assert_eq;

    fn selector() -> DiversitySelector {
        DiversitySelector::new(&RankingConfig::default())
    }

    /// `count` candidates from `source`, scores descending from `top`
    fn run(source: &str, count: usize, top: f32) -> Vec<Candidate> {
        (0..count)
            .map(|i| candidate(&format!("{source}-{i}"), source, top - i as f32 * 0.01))
            .collect()
    }

    fn sorted(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| b.boosted_score.total_cmp(&a.boosted_score));
        candidates
    }

    fn count_source(selection: &Selection, source: &str) -> usize {
        selection
            .candidates
            .iter()
            .filter(|c| c.source_id == source)
            .count()
    }

    #[test]
    fn test_mode_for_request() {
        let comparative = QueryProfile {
            is_comparative: true,
        };
        let standard = QueryProfile {
            is_comparative: false,
        };
        assert_eq!(
            SelectionMode::for_request(comparative, 2),
            SelectionMode::Comparative
        );
        assert_eq!(
            SelectionMode::for_request(comparative, 1),
            SelectionMode::Standard
        );
        assert_eq!(
            SelectionMode::for_request(standard, 3),
            SelectionMode::Standard
        );
    }

    #[test]
    fn test_standard_caps_three_per_source() {
        let ranked = sorted([run("a", 6, 0.99), run("b", 2, 0.5), run("c", 2, 0.4)].concat());
        let selection = selector().select(&ranked, 6, SelectionMode::Standard);

        assert_eq!(selection.candidates.len(), 6);
        assert_eq!(selection.backfilled, 0);
        assert_eq!(count_source(&selection, "a"), 3);
        assert_eq!(count_source(&selection, "b"), 2);
        assert_eq!(count_source(&selection, "c"), 1);
    }

    #[test]
    fn test_standard_backfills_past_cap_to_reach_k() {
        let ranked = sorted([run("a", 6, 0.99), run("b", 1, 0.5)].concat());
        let selection = selector().select(&ranked, 5, SelectionMode::Standard);

        assert_eq!(selection.candidates.len(), 5);
        assert_eq!(selection.backfilled, 1);
        assert_eq!(count_source(&selection, "a"), 4);
        // Backfill appends after the capped pass.
        assert_eq!(selection.candidates[4].text, "a-3");
    }

    #[test]
    fn test_never_more_than_k() {
        let ranked = sorted([run("a", 10, 0.9), run("b", 10, 0.8)].concat());
        for k in 0..25 {
            for mode in [SelectionMode::Standard, SelectionMode::Comparative] {
                let selection = selector().select(&ranked, k, mode);
                assert!(selection.candidates.len() <= k);
                assert_eq!(selection.candidates.len(), k.min(ranked.len()));
            }
        }
    }

    #[test]
    fn test_comparative_guarantees_small_source() {
        let ranked = sorted([run("A", 10, 0.95), run("B", 1, 0.3)].concat());
        let selection = selector().select(&ranked, 6, SelectionMode::Comparative);

        assert_eq!(selection.candidates.len(), 6);
        assert_eq!(count_source(&selection, "B"), 1);
        assert_eq!(count_source(&selection, "A"), 5);
        assert_eq!(selection.backfilled, 2);
    }

    #[test]
    fn test_comparative_allocates_quota_per_source() {
        let ranked = sorted([run("A", 8, 0.95), run("B", 8, 0.6), run("C", 8, 0.4)].concat());
        let selection = selector().select(&ranked, 6, SelectionMode::Comparative);

        // max(2, 6 / 3) = 2 from each source, in group order.
        assert_eq!(count_source(&selection, "A"), 2);
        assert_eq!(count_source(&selection, "B"), 2);
        assert_eq!(count_source(&selection, "C"), 2);
        let sources: Vec<&str> = selection
            .candidates
            .iter()
            .map(|c| c.source_id.as_str())
            .collect();
        assert_eq!(sources, vec!["A", "A", "B", "B", "C", "C"]);
    }

    #[test]
    fn test_comparative_quota_scales_with_k() {
        let ranked = sorted([run("A", 10, 0.95), run("B", 10, 0.6)].concat());
        let selection = selector().select(&ranked, 8, SelectionMode::Comparative);
        assert_eq!(count_source(&selection, "A"), 4);
        assert_eq!(count_source(&selection, "B"), 4);
    }

    #[test]
    fn test_comparative_group_order_follows_first_appearance() {
        let ranked = sorted(vec![
            candidate("b-top", "B", 0.9),
            candidate("a-top", "A", 0.8),
            candidate("b-2", "B", 0.7),
            candidate("a-2", "A", 0.6),
            candidate("b-3", "B", 0.5),
        ]);
        let selection = selector().select(&ranked, 4, SelectionMode::Comparative);
        let texts: Vec<&str> = selection.candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["b-top", "b-2", "a-top", "a-2"]);
    }

    #[test]
    fn test_backfill_skips_duplicate_text() {
        let ranked = vec![
            candidate("same", "a", 0.9),
            candidate("same", "b", 0.8),
            candidate("other", "c", 0.7),
        ];
        let selected = vec![ranked[0].clone()];
        let mut filled = selected;
        backfill(&ranked, 3, &mut filled);
        let texts: Vec<&str> = filled.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["same", "other"]);
    }

    #[test]
    fn test_empty_input() {
        for mode in [SelectionMode::Standard, SelectionMode::Comparative] {
            let selection = selector().select(&[], 5, mode);
            assert!(selection.candidates.is_empty());
            assert_eq!(selection.backfilled, 0);
        }
    }
}
