use crate::config::RankingConfig;
use docqa_passage_store::SimilarityHit;
use log::debug;

/// Drops short boilerplate passages (tables of contents, copyright notices)
/// before they reach scoring.
///
/// A passage is boilerplate when its lowercased text contains a marker *and*
/// it has fewer than `boilerplate_max_words` words. Longer passages that merely
/// mention a marker are real content and pass.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    markers: Vec<String>,
    max_words: usize,
}

impl ContentFilter {
    pub fn new(config: &RankingConfig) -> Self {
        Self {
            markers: config
                .boilerplate_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            max_words: config.boilerplate_max_words,
        }
    }

    pub fn is_boilerplate(&self, text: &str) -> bool {
        let text_lower = text.to_lowercase();
        if !self.markers.iter().any(|m| text_lower.contains(m.as_str())) {
            return false;
        }
        text.split_whitespace().count() < self.max_words
    }

    /// Keep the informative hits, preserving order. Returns the kept hits and
    /// how many were dropped.
    pub fn retain_informative(&self, hits: Vec<SimilarityHit>) -> (Vec<SimilarityHit>, usize) {
        let before = hits.len();
        let kept: Vec<SimilarityHit> = hits
            .into_iter()
            .filter(|hit| !self.is_boilerplate(&hit.passage.text))
            .collect();
        let dropped = before - kept.len();
        if dropped > 0 {
            debug!("Content filter dropped {dropped} boilerplate passages");
        }
        (kept, dropped)
    }
}
