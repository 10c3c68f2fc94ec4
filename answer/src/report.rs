use crate::config::AnswerConfig;
use crate::fusion::{ConfidenceFusion, FusedConfidence};
use crate::generation::GenerationOutcome;
use crate::presenter::{PresentedSource, SourcePresenter};
use docqa_retrieval::RetrievalResult;
use serde::{Deserialize, Serialize};

/// Answer quality metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Share of shown sources above the adaptive relevance threshold
    pub precision_at_k: f32,

    /// Equal to the fused confidence
    pub grounding_accuracy: f32,
}

/// Fused confidence together with the sources to display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionReport {
    pub fused: FusedConfidence,
    pub sources: Vec<PresentedSource>,
    pub metrics: EvaluationMetrics,
}

/// Combine a retrieval result with a generation outcome: fuse the
/// confidences, pick the sources to show and compute the metrics.
pub fn fuse(
    result: &RetrievalResult,
    outcome: &GenerationOutcome,
    config: &AnswerConfig,
) -> FusionReport {
    let fused = ConfidenceFusion::new(config).fuse(result.retrieval_confidence, outcome);
    let presenter = SourcePresenter::new(config);
    let sources = presenter.present(&result.candidates, fused.asserts_no_reference);

    let metrics = EvaluationMetrics {
        precision_at_k: presenter.precision_at_k(&sources),
        grounding_accuracy: fused.final_confidence,
    };

    FusionReport {
        fused,
        sources,
        metrics,
    }
}
