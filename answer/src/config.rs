use serde::{Deserialize, Serialize};

/// Configuration for confidence fusion, source presentation and the answer
/// pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerConfig {
    /// Weight of retrieval confidence in the fused score
    #[serde(default = "default_retrieval_weight")]
    pub retrieval_weight: f32,

    /// Weight of the (normalized) self-reported confidence in the fused score
    #[serde(default = "default_self_reported_weight")]
    pub self_reported_weight: f32,

    /// Fused confidence floor for answers that decline for lack of context
    #[serde(default = "default_negative_confidence_floor")]
    pub negative_confidence_floor: f32,

    /// Self-reported confidence floor (1-10 scale) for the same answers
    #[serde(default = "default_negative_self_reported_floor")]
    pub negative_self_reported_floor: f32,

    /// Self-reported confidence used when the model gives none
    #[serde(default = "default_self_reported")]
    pub default_self_reported: f32,

    /// Phrases (matched case-insensitively) that mark an answer as stating
    /// the context lacks the requested information
    #[serde(default = "default_no_reference_phrases")]
    pub no_reference_phrases: Vec<String>,

    /// Candidates scoring below this are not shown as sources
    #[serde(default = "default_display_threshold")]
    pub display_threshold: f32,

    /// Maximum sources shown per answer
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    /// Preview length in characters
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    /// A sentence or word boundary is only used if it falls this close to
    /// the end of the preview window
    #[serde(default = "default_preview_boundary_window")]
    pub preview_boundary_window: usize,

    /// Lower bound of the adaptive precision threshold
    #[serde(default = "default_precision_floor")]
    pub precision_floor: f32,

    /// Fraction of the top source score used as the adaptive threshold
    #[serde(default = "default_precision_top_ratio")]
    pub precision_top_ratio: f32,

    /// Retrieval always asks for at least this many candidates
    #[serde(default = "default_min_retrieval_k")]
    pub min_retrieval_k: usize,

    /// Largest `k` a request may ask for
    #[serde(default = "default_max_request_k")]
    pub max_request_k: usize,

    /// Fused confidence below this is reported as insufficient
    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f32,

    /// Prior turns handed to the generation step as conversation context
    #[serde(default = "default_conversation_context_turns")]
    pub conversation_context_turns: usize,
}

fn default_retrieval_weight() -> f32 {
    0.6
}

fn default_self_reported_weight() -> f32 {
    0.4
}

fn default_negative_confidence_floor() -> f32 {
    0.85
}

fn default_negative_self_reported_floor() -> f32 {
    9.0
}

fn default_self_reported() -> f32 {
    5.0
}

fn default_no_reference_phrases() -> Vec<String> {
    [
        "do not mention",
        "does not mention",
        "don't mention",
        "doesn't mention",
        "not mentioned",
        "no information",
        "no relevant information",
        "insufficient",
        "cannot answer",
        "don't have",
        "do not have",
        "not available",
        "not found in",
        "do not contain",
        "does not contain",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_display_threshold() -> f32 {
    0.5
}

fn default_max_sources() -> usize {
    3
}

fn default_preview_chars() -> usize {
    200
}

fn default_preview_boundary_window() -> usize {
    50
}

fn default_precision_floor() -> f32 {
    0.35
}

fn default_precision_top_ratio() -> f32 {
    0.7
}

fn default_min_retrieval_k() -> usize {
    5
}

fn default_max_request_k() -> usize {
    10
}

fn default_low_confidence_threshold() -> f32 {
    0.3
}

fn default_conversation_context_turns() -> usize {
    3
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            retrieval_weight: default_retrieval_weight(),
            self_reported_weight: default_self_reported_weight(),
            negative_confidence_floor: default_negative_confidence_floor(),
            negative_self_reported_floor: default_negative_self_reported_floor(),
            default_self_reported: default_self_reported(),
            no_reference_phrases: default_no_reference_phrases(),
            display_threshold: default_display_threshold(),
            max_sources: default_max_sources(),
            preview_chars: default_preview_chars(),
            preview_boundary_window: default_preview_boundary_window(),
            precision_floor: default_precision_floor(),
            precision_top_ratio: default_precision_top_ratio(),
            min_retrieval_k: default_min_retrieval_k(),
            max_request_k: default_max_request_k(),
            low_confidence_threshold: default_low_confidence_threshold(),
            conversation_context_turns: default_conversation_context_turns(),
        }
    }
}

fn check_unit(name: &str, value: f32) -> Result<(), String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{name} must be between 0.0 and 1.0, got {value}"));
    }
    Ok(())
}

impl AnswerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        check_unit("retrieval_weight", self.retrieval_weight)?;
        check_unit("self_reported_weight", self.self_reported_weight)?;

        let total = self.retrieval_weight + self.self_reported_weight;
        if (total - 1.0).abs() > 0.01 {
            return Err(format!(
                "retrieval_weight + self_reported_weight must sum to 1.0, got {total}"
            ));
        }

        check_unit("negative_confidence_floor", self.negative_confidence_floor)?;
        check_unit("display_threshold", self.display_threshold)?;
        check_unit("precision_floor", self.precision_floor)?;
        check_unit("precision_top_ratio", self.precision_top_ratio)?;
        check_unit("low_confidence_threshold", self.low_confidence_threshold)?;

        for (name, value) in [
            ("negative_self_reported_floor", self.negative_self_reported_floor),
            ("default_self_reported", self.default_self_reported),
        ] {
            if !(1.0..=10.0).contains(&value) {
                return Err(format!("{name} must be between 1 and 10, got {value}"));
            }
        }

        if self.preview_chars == 0 {
            return Err("preview_chars must be > 0".to_string());
        }

        if self.preview_boundary_window > self.preview_chars {
            return Err("preview_boundary_window cannot exceed preview_chars".to_string());
        }

        if self.max_request_k == 0 {
            return Err("max_request_k must be > 0".to_string());
        }

        Ok(())
    }
}
