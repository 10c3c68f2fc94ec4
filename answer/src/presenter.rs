use crate::config::AnswerConfig;
use docqa_retrieval::Candidate;
use serde::{Deserialize, Serialize};

/// Marker appended to previews cut away from a sentence end
const ELLIPSIS: &str = "...";

/// A candidate shown to the user as a citation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentedSource {
    pub source_id: String,

    /// Chunk id from the index, or `chunk_{rank}` when it recorded none
    pub chunk_id: String,

    pub relevance_score: f32,

    pub content_preview: String,

    pub page: Option<u32>,
}

/// Chooses which ranked candidates are shown as sources, and builds their
/// previews
#[derive(Debug, Clone)]
pub struct SourcePresenter {
    display_threshold: f32,
    max_sources: usize,
    preview_chars: usize,
    boundary_window: usize,
    precision_floor: f32,
    precision_top_ratio: f32,
}

impl SourcePresenter {
    pub fn new(config: &AnswerConfig) -> Self {
        Self {
            display_threshold: config.display_threshold,
            max_sources: config.max_sources,
            preview_chars: config.preview_chars,
            boundary_window: config.preview_boundary_window,
            precision_floor: config.precision_floor,
            precision_top_ratio: config.precision_top_ratio,
        }
    }

    /// Shorten `text` to the preview length, preferring to end on a period
    /// or a word boundary near the end of the window.
    pub fn preview(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.preview_chars {
            return text.to_string();
        }

        let window = &chars[..self.preview_chars];
        let cutoff = self.preview_chars.saturating_sub(self.boundary_window);
        let last_period = window.iter().rposition(|&c| c == '.');
        let last_space = window.iter().rposition(|&c| c == ' ');

        match (last_period, last_space) {
            (Some(period), _) if period > cutoff => window[..=period].iter().collect(),
            (_, Some(space)) if space > cutoff => {
                let mut preview: String = window[..space].iter().collect();
                preview.push_str(ELLIPSIS);
                preview
            }
            _ => {
                let mut preview: String = window.iter().collect();
                preview.push_str(ELLIPSIS);
                preview
            }
        }
    }

    /// Sources to display for an answer, in rank order.
    ///
    /// Nothing is shown for an answer that states the context lacks the
    /// requested information.
    pub fn present(
        &self,
        candidates: &[Candidate],
        asserts_no_reference: bool,
    ) -> Vec<PresentedSource> {
        if asserts_no_reference {
            return Vec::new();
        }

        candidates
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.boosted_score >= self.display_threshold)
            .take(self.max_sources)
            .map(|(rank, candidate)| PresentedSource {
                source_id: candidate.source_id.clone(),
                chunk_id: candidate
                    .chunk_id
                    .clone()
                    .unwrap_or_else(|| format!("chunk_{rank}")),
                relevance_score: candidate.boosted_score,
                content_preview: self.preview(&candidate.text),
                page: candidate.page,
            })
            .collect()
    }

    /// Share of shown sources scoring at least
    /// `max(precision_floor, top_score * precision_top_ratio)`; 0.0 when
    /// nothing is shown.
    pub fn precision_at_k(&self, sources: &[PresentedSource]) -> f32 {
        let Some(top_score) = sources
            .iter()
            .map(|source| source.relevance_score)
            .max_by(f32::total_cmp)
        else {
            return 0.0;
        };

        let threshold = self.precision_floor.max(top_score * self.precision_top_ratio);
        let relevant = sources
            .iter()
            .filter(|source| source.relevance_score >= threshold)
            .count();

        relevant as f32 / sources.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn presenter() -> SourcePresenter {
        SourcePresenter::new(&AnswerConfig::default())
    }

    fn candidate(text: &str, source: &str, score: f32) -> Candidate {
        Candidate {
            text: text.to_string(),
            source_id: source.to_string(),
            chunk_id: None,
            page: None,
            raw_distance: 0.0,
            similarity: score,
            boosted_score: score,
        }
    }

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(presenter().preview("Deposits rose."), "Deposits rose.");
        let exact = "x".repeat(200);
        assert_eq!(presenter().preview(&exact), exact);
    }

    #[test]
    fn test_preview_cuts_at_period() {
        let text = format!("{}. {}", "a".repeat(179), "b".repeat(100));
        let preview = presenter().preview(&text);
        assert_eq!(preview, format!("{}.", "a".repeat(179)));
    }

    #[test]
    fn test_preview_cuts_at_space() {
        let text = format!("{} {}", "a".repeat(170), "b".repeat(100));
        let preview = presenter().preview(&text);
        assert_eq!(preview, format!("{}...", "a".repeat(170)));
    }

    #[test]
    fn test_preview_hard_cut() {
        let text = "a".repeat(300);
        assert_eq!(presenter().preview(&text), format!("{}...", "a".repeat(200)));
    }

    #[test]
    fn test_boundary_outside_window_ignored() {
        // Period at index 100 is too far from the end of the window.
        let text = format!("{}.{}", "a".repeat(100), "b".repeat(200));
        assert_eq!(presenter().preview(&text).chars().count(), 203);
    }

    #[test]
    fn test_preview_is_char_based() {
        let text = "é".repeat(250);
        let preview = presenter().preview(&text);
        assert_eq!(preview.chars().count(), 203);
    }

    #[test]
    fn test_present_filters_and_caps() {
        let candidates = vec![
            candidate("one", "a.pdf", 0.9),
            candidate("two", "b.pdf", 0.4),
            candidate("three", "c.pdf", 0.8),
            candidate("four", "d.pdf", 0.7),
            candidate("five", "e.pdf", 0.6),
        ];

        let sources = presenter().present(&candidates, false);
        let ids: Vec<&str> = sources.iter().map(|s| s.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a.pdf", "c.pdf", "d.pdf"]);
        assert_eq!(sources[1].chunk_id, "chunk_2");
    }

    #[test]
    fn test_present_keeps_chunk_id_and_page() {
        let mut c = candidate("text", "a.pdf", 0.9);
        c.chunk_id = Some("17".to_string());
        c.page = Some(4);

        let sources = presenter().present(&[c], false);
        assert_eq!(sources[0].chunk_id, "17");
        assert_eq!(sources[0].page, Some(4));
    }

    #[test]
    fn test_no_reference_suppresses_sources() {
        let candidates = vec![candidate("one", "a.pdf", 0.95)];
        assert!(presenter().present(&candidates, true).is_empty());
    }

    #[test]
    fn test_precision_adaptive_threshold() {
        let presenter = presenter();
        let sources = presenter.present(
            &[
                candidate("a", "a.pdf", 0.9),
                candidate("b", "b.pdf", 0.7),
                candidate("c", "c.pdf", 0.55),
            ],
            false,
        );
        // threshold = max(0.35, 0.63): two of three qualify
        assert!((presenter.precision_at_k(&sources) - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(presenter.precision_at_k(&[]), 0.0);
    }

    #[test]
    fn test_presented_sources_bounded() {
        let mut rng = StdRng::seed_from_u64(3);
        let presenter = presenter();
        for _ in 0..200 {
            let candidates: Vec<Candidate> = (0..rng.random_range(0..12))
                .map(|i| {
                    let len = rng.random_range(0..400);
                    let text: String = (0..len)
                        .map(|_| if rng.random_bool(0.15) { ' ' } else { 'w' })
                        .collect();
                    candidate(&text, &format!("{i}.pdf"), rng.random_range(0.0..1.0))
                })
                .collect();

            let sources = presenter.present(&candidates, false);
            assert!(sources.len() <= 3);
            assert!(
                sources
                    .iter()
                    .all(|s| s.content_preview.chars().count() <= 203)
            );
            assert!(sources.iter().all(|s| s.relevance_score >= 0.5));
        }
    }
}
