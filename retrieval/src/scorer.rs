use crate::config::{BoostWeights, RankingConfig};
use crate::result::{Candidate, UNKNOWN_SOURCE};
use docqa_passage_store::SimilarityHit;

/// Convert a non-negative distance to a similarity in (0, 1].
///
/// Negative and NaN distances are treated as 0. Distances large enough for
/// `exp` to underflow (including infinity) map to `f32::MIN_POSITIVE`.
pub fn similarity_from_distance(distance: f32) -> f32 {
    (-distance.max(0.0)).exp().max(f32::MIN_POSITIVE)
}

/// Content-type signals detected on a passage's raw text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentSignals {
    pub has_digits: bool,
    pub has_percentage: bool,
    pub has_currency: bool,
    pub has_table: bool,
    /// Only ever set for comparative queries
    pub has_temporal: bool,
}

impl ContentSignals {
    pub fn detect(text: &str, is_comparative: bool, temporal_words: &[String]) -> Self {
        Self {
            has_digits: text.chars().any(char::is_numeric),
            has_percentage: text.contains('%'),
            has_currency: text.contains('$'),
            has_table: text.to_uppercase().contains("TABLE") || text.contains('|'),
            has_temporal: is_comparative
                && temporal_words.iter().any(|word| text.contains(word.as_str())),
        }
    }
}

/// Turns similarity hits into boosted candidates
#[derive(Debug, Clone)]
pub struct CandidateScorer {
    boosts: BoostWeights,
    temporal_words: Vec<String>,
}

impl CandidateScorer {
    pub fn new(config: &RankingConfig) -> Self {
        Self {
            boosts: config.boosts.clone(),
            temporal_words: config.temporal_words.clone(),
        }
    }

    /// Boost factor for a set of signals: 1.0 plus each active boost
    pub fn boost_for(&self, signals: &ContentSignals) -> f32 {
        let mut boost = 1.0;
        if signals.has_digits {
            boost += self.boosts.digits;
        }
        if signals.has_percentage {
            boost += self.boosts.percentage;
        }
        if signals.has_currency {
            boost += self.boosts.currency;
        }
        if signals.has_table {
            boost += self.boosts.table;
        }
        if signals.has_temporal {
            boost += self.boosts.temporal;
        }
        boost
    }

    /// Score one hit. Pure; identical inputs give identical output.
    pub fn score(&self, hit: &SimilarityHit, is_comparative: bool) -> Candidate {
        let passage = &hit.passage;
        let raw_distance = hit.distance.max(0.0);
        let similarity = similarity_from_distance(raw_distance);
        let signals = ContentSignals::detect(&passage.text, is_comparative, &self.temporal_words);
        let boosted_score = (similarity * self.boost_for(&signals)).min(1.0);

        Candidate {
            text: passage.text.clone(),
            source_id: passage
                .metadata
                .source
                .clone()
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
            chunk_id: passage.metadata.chunk_id.clone(),
            page: passage.metadata.page,
            raw_distance,
            similarity,
            boosted_score,
        }
    }

    /// Score every hit and order by boosted score, highest first.
    ///
    /// The sort is stable, so equal scores keep the similarity source's order.
    pub fn score_all(&self, hits: &[SimilarityHit], is_comparative: bool) -> Vec<Candidate> {
        let mut scored: Vec<Candidate> = hits
            .iter()
            .map(|hit| self.score(hit, is_comparative))
            .collect();
        scored.sort_by(|a, b| b.boosted_score.total_cmp(&a.boosted_score));
        scored
    }
}
