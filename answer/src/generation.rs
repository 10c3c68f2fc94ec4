use crate::confidence::{clean_answer, parse_self_reported_confidence};
use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Answer used when the model produced no output at all
pub const EMPTY_OUTPUT_ANSWER: &str = "Unable to generate response. Please try again.";

/// Input handed to a generation step
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest<'a> {
    pub query: &'a str,

    /// Formatted retrieval context
    pub context: &'a str,

    /// Confidence of the retrieval that produced `context`
    pub retrieval_confidence: f32,

    /// Prior turns of the conversation, rendered as `Q: ...\nA: ...`
    pub conversation_context: Option<&'a str>,
}

/// Answer text as produced by a generation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    pub answer_text: String,

    /// 1-10 confidence stated by the model, if any
    pub self_reported_confidence: Option<f32>,
}

impl GeneratedAnswer {
    pub fn new(answer_text: impl Into<String>, self_reported_confidence: Option<f32>) -> Self {
        Self {
            answer_text: answer_text.into(),
            self_reported_confidence,
        }
    }

    /// Parse raw model output: extract the stated confidence and strip the
    /// confidence line from the answer.
    pub fn from_model_output(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::new(EMPTY_OUTPUT_ANSWER, Some(1.0));
        }

        Self::new(clean_answer(raw), parse_self_reported_confidence(raw))
    }
}

/// Generation output with the self-reported confidence resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub answer_text: String,

    /// 1-10 scale
    pub self_reported_confidence: f32,
}

impl GenerationOutcome {
    /// Resolve a generated answer. A missing confidence becomes `default`;
    /// values outside `[1, 10]` are clamped.
    pub fn new(answer: GeneratedAnswer, default: f32) -> Self {
        let self_reported_confidence = match answer.self_reported_confidence {
            Some(value) if value.is_finite() => value.clamp(1.0, 10.0),
            Some(value) => {
                warn!("Unusable self-reported confidence {value}, defaulting to {default}");
                default
            }
            None => {
                warn!("No self-reported confidence in model output, defaulting to {default}");
                default
            }
        };

        Self {
            answer_text: answer.answer_text,
            self_reported_confidence,
        }
    }
}

/// Produces an answer from a query and its retrieval context
#[async_trait]
pub trait GenerationStep: Send + Sync {
    async fn generate(&self, request: &GenerationRequest<'_>) -> anyhow::Result<GeneratedAnswer>;
}

/// A request as seen by [`RecordedGeneration`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub query: String,
    pub context: String,
    pub retrieval_confidence: f32,
    pub conversation_context: Option<String>,
}

/// Generation step that replays a fixed model output and records every
/// request it receives
pub struct RecordedGeneration {
    output: String,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl RecordedGeneration {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl GenerationStep for RecordedGeneration {
    async fn generate(&self, request: &GenerationRequest<'_>) -> anyhow::Result<GeneratedAnswer> {
        self.requests.lock().await.push(RecordedRequest {
            query: request.query.to_string(),
            context: request.context.to_string(),
            retrieval_confidence: request.retrieval_confidence,
            conversation_context: request.conversation_context.map(str::to_string),
        });

        Ok(GeneratedAnswer::from_model_output(&self.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_model_output() {
        let answer = GeneratedAnswer::from_model_output("Deposits grew.\nCONFIDENCE: 8/10");
        assert_eq!(answer, GeneratedAnswer::new("Deposits grew.", Some(8.0)));
    }

    #[test]
    fn test_blank_output() {
        let answer = GeneratedAnswer::from_model_output("   \n ");
        assert_eq!(answer.answer_text, EMPTY_OUTPUT_ANSWER);
        assert_eq!(answer.self_reported_confidence, Some(1.0));
    }

    #[test]
    fn test_outcome_defaults_missing_confidence() {
        let outcome = GenerationOutcome::new(GeneratedAnswer::new("text", None), 5.0);
        assert_eq!(outcome.self_reported_confidence, 5.0);

        let outcome = GenerationOutcome::new(GeneratedAnswer::new("text", Some(f32::NAN)), 5.0);
        assert_eq!(outcome.self_reported_confidence, 5.0);
    }

    #[test]
    fn test_outcome_clamps() {
        let low = GenerationOutcome::new(GeneratedAnswer::new("a", Some(-3.0)), 5.0);
        let high = GenerationOutcome::new(GeneratedAnswer::new("b", Some(14.0)), 5.0);
        assert_eq!(low.self_reported_confidence, 1.0);
        assert_eq!(high.self_reported_confidence, 10.0);
    }

    #[tokio::test]
    async fn test_recorded_generation_records_requests() {
        let generation = RecordedGeneration::new("Answer.\nCONFIDENCE: 6/10");
        let request = GenerationRequest {
            query: "q",
            context: "ctx",
            retrieval_confidence: 0.5,
            conversation_context: None,
        };

        let answer = generation.generate(&request).await.unwrap();
        assert_eq!(answer.self_reported_confidence, Some(6.0));

        let requests = generation.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].context, "ctx");
    }
}
