use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Source name used when a passage carries no `source` metadata
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// A scored passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Passage text
    pub text: String,

    /// Source document the passage came from
    pub source_id: String,

    /// Chunk identifier, when the index recorded one
    pub chunk_id: Option<String>,

    /// PDF page number, when known
    pub page: Option<u32>,

    /// Distance reported by the similarity source (clamped to >= 0)
    pub raw_distance: f32,

    /// `exp(-distance)`, in (0, 1]
    pub similarity: f32,

    /// Similarity after content-signal boosting, in (0, 1]
    pub boosted_score: f32,
}

/// Per-request pipeline statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankStats {
    /// Hits returned by the similarity source
    pub fetched: usize,

    /// Hits discarded because their source was outside the target set
    pub off_target: usize,

    /// Hits dropped as boilerplate
    pub boilerplate: usize,

    /// Candidates admitted by the backfill pass
    pub backfilled: usize,

    /// Whether the query was classified as comparative
    pub comparative: bool,

    /// Served from the result cache
    pub cache_hit: bool,

    /// Total ranking time in milliseconds
    pub total_time_ms: u64,
}

/// Ranked candidates plus the aggregate retrieval confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Selected candidates, in selection order
    pub candidates: Vec<Candidate>,

    /// Mean boosted score of `candidates`; 0.0 when empty
    pub retrieval_confidence: f32,

    /// Pipeline statistics
    #[serde(default)]
    pub stats: RankStats,
}

/// Descriptive statistics over the selected candidates' boosted scores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub num_retrieved: usize,
    pub avg_score: f32,
    pub min_score: f32,
    pub max_score: f32,
    pub score_std: f32,
    pub sources: Vec<String>,
    pub unique_sources: usize,
}

impl RetrievalResult {
    /// The "no relevant documents" result
    pub fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            retrieval_confidence: 0.0,
            stats: RankStats::default(),
        }
    }

    /// Build a result from the selected candidates, deriving the confidence
    pub fn from_selected(candidates: Vec<Candidate>) -> Self {
        let retrieval_confidence = if candidates.is_empty() {
            0.0
        } else {
            let total: f32 = candidates.iter().map(|c| c.boosted_score).sum();
            (total / candidates.len() as f32).clamp(0.0, 1.0)
        };

        Self {
            candidates,
            retrieval_confidence,
            stats: RankStats::default(),
        }
    }

    /// Set stats
    pub fn with_stats(mut self, stats: RankStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Render the candidates as a prompt context block.
    ///
    /// Each candidate becomes `[Source i: source, Chunk id]` followed by its
    /// trimmed text; blocks are separated by a `---` rule.
    pub fn format_context(&self) -> String {
        self.candidates
            .iter()
            .enumerate()
            .map(|(i, candidate)| {
                let chunk_id = candidate.chunk_id.as_deref().unwrap_or("?");
                format!(
                    "[Source {}: {}, Chunk {chunk_id}]\n{}",
                    i + 1,
                    candidate.source_id,
                    candidate.text.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }

    /// Score statistics for diagnostics
    pub fn summary(&self) -> ScoreSummary {
        if self.candidates.is_empty() {
            return ScoreSummary::default();
        }

        let scores: Vec<f32> = self.candidates.iter().map(|c| c.boosted_score).collect();
        let n = scores.len() as f32;
        let mean = scores.iter().sum::<f32>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n;
        let sources: Vec<String> = self
            .candidates
            .iter()
            .map(|c| c.source_id.clone())
            .collect();
        let unique_sources = sources.iter().collect::<HashSet<_>>().len();

        ScoreSummary {
            num_retrieved: scores.len(),
            avg_score: self.retrieval_confidence,
            min_score: scores.iter().copied().fold(f32::INFINITY, f32::min),
            max_score: scores.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            score_std: variance.sqrt(),
            sources,
            unique_sources,
        }
    }
}
