use crate::config::AnswerConfig;
use crate::generation::GenerationOutcome;
use log::debug;
use serde::{Deserialize, Serialize};

/// Fused answer confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedConfidence {
    /// Weighted blend of retrieval and self-reported confidence, in [0, 1]
    pub final_confidence: f32,

    /// Self-reported confidence after the correct-negative floor (1-10)
    pub self_reported_confidence: f32,

    /// The answer states the context lacks the requested information
    pub asserts_no_reference: bool,
}

/// Blends retrieval confidence with the model's own confidence.
///
/// An answer that declines because the documents lack the information is a
/// correct negative: its confidences are raised to configured floors.
#[derive(Debug, Clone)]
pub struct ConfidenceFusion {
    retrieval_weight: f32,
    self_reported_weight: f32,
    confidence_floor: f32,
    self_reported_floor: f32,
    default_self_reported: f32,
    phrases: Vec<String>,
}

impl ConfidenceFusion {
    pub fn new(config: &AnswerConfig) -> Self {
        Self {
            retrieval_weight: config.retrieval_weight,
            self_reported_weight: config.self_reported_weight,
            confidence_floor: config.negative_confidence_floor,
            self_reported_floor: config.negative_self_reported_floor,
            default_self_reported: config.default_self_reported,
            phrases: config
                .no_reference_phrases
                .iter()
                .map(|phrase| phrase.to_lowercase())
                .collect(),
        }
    }

    /// Whether `answer_text` contains any no-reference phrase (case-insensitive)
    pub fn asserts_no_reference(&self, answer_text: &str) -> bool {
        let lowered = answer_text.to_lowercase();
        self.phrases.iter().any(|phrase| lowered.contains(phrase))
    }

    pub fn fuse(&self, retrieval_confidence: f32, outcome: &GenerationOutcome) -> FusedConfidence {
        let retrieval = if retrieval_confidence.is_finite() {
            retrieval_confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut self_reported = if outcome.self_reported_confidence.is_finite() {
            outcome.self_reported_confidence
        } else {
            self.default_self_reported
        }
        .clamp(1.0, 10.0);

        let mut final_confidence = (self.retrieval_weight * retrieval
            + self.self_reported_weight * (self_reported / 10.0))
            .clamp(0.0, 1.0);

        let asserts_no_reference = self.asserts_no_reference(&outcome.answer_text);
        if asserts_no_reference {
            debug!(
                "Answer declines for lack of context, raising confidence {final_confidence:.2} to floor"
            );
            final_confidence = final_confidence.max(self.confidence_floor);
            self_reported = self_reported.max(self.self_reported_floor);
        }

        FusedConfidence {
            final_confidence,
            self_reported_confidence: self_reported,
            asserts_no_reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn outcome(text: &str, self_reported: f32) -> GenerationOutcome {
        GenerationOutcome {
            answer_text: text.to_string(),
            self_reported_confidence: self_reported,
        }
    }

    fn fusion() -> ConfidenceFusion {
        ConfidenceFusion::new(&AnswerConfig::default())
    }

    #[test]
    fn test_weighted_blend() {
        let fused = fusion().fuse(0.8, &outcome("Deposits rose 4%.", 7.0));
        assert!((fused.final_confidence - (0.6 * 0.8 + 0.4 * 0.7)).abs() < 1e-6);
        assert_eq!(fused.self_reported_confidence, 7.0);
        assert!(!fused.asserts_no_reference);
    }

    #[test]
    fn test_correct_negative_floor() {
        let fused = fusion().fuse(
            0.1,
            &outcome("The documents do not contain information on revenue.", 3.0),
        );
        assert!(fused.asserts_no_reference);
        assert!(fused.final_confidence >= 0.85);
        assert_eq!(fused.self_reported_confidence, 9.0);
    }

    #[test]
    fn test_no_reference_is_case_insensitive() {
        assert!(fusion().asserts_no_reference("There is NO INFORMATION about that."));
        assert!(!fusion().asserts_no_reference("Revenue was $4 million."));
    }

    #[test]
    fn test_floor_never_lowers() {
        let fused = fusion().fuse(1.0, &outcome("Context is insufficient.", 10.0));
        assert_eq!(fused.final_confidence, 1.0);
        assert_eq!(fused.self_reported_confidence, 10.0);
    }

    #[test]
    fn test_non_finite_self_reported_uses_default() {
        let fused = fusion().fuse(0.8, &outcome("Deposits rose.", f32::NAN));
        assert_eq!(fused.self_reported_confidence, 5.0);
        assert!((fused.final_confidence - (0.6 * 0.8 + 0.4 * 0.5)).abs() < 1e-6);

        let fused = fusion().fuse(0.8, &outcome("Deposits rose.", f32::INFINITY));
        assert_eq!(fused.self_reported_confidence, 5.0);
    }

    #[test]
    fn test_final_confidence_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        let fusion = fusion();
        for _ in 0..500 {
            let retrieval = rng.random_range(-2.0..3.0);
            let self_reported = match rng.random_range(0..8) {
                0 => f32::NAN,
                1 => f32::NEG_INFINITY,
                _ => rng.random_range(-5.0..20.0),
            };
            let text = if rng.random_bool(0.3) {
                "I have no information on that"
            } else {
                "The answer is 12"
            };
            let fused = fusion.fuse(retrieval, &outcome(text, self_reported));
            assert!((0.0..=1.0).contains(&fused.final_confidence));
            if fused.asserts_no_reference {
                assert!(fused.final_confidence >= 0.85);
            }
        }
    }
}
