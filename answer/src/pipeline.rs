use crate::config::AnswerConfig;
use crate::conversation::{
    ConversationEntry, ConversationLog, RequestContext, SourceRef, render_turns,
};
use crate::error::{AnswerError, Result};
use crate::generation::{GenerationOutcome, GenerationRequest, GenerationStep};
use crate::presenter::PresentedSource;
use crate::report::{EvaluationMetrics, fuse};
use docqa_retrieval::Ranker;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Answer given when retrieval finds nothing to ground an answer in
pub const NO_CONTEXT_ANSWER: &str = "I don't have any relevant context to answer this question. \
Please upload relevant documents first.";

/// `k` used when a request does not set one
pub const DEFAULT_REQUEST_K: usize = 3;

/// A question to answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub question: String,

    /// Number of candidates the caller asks for
    #[serde(default = "default_request_k")]
    pub k: usize,

    /// Restrict retrieval to these sources; empty means all
    #[serde(default)]
    pub target_sources: Vec<String>,

    /// Hand prior turns of the conversation to the generation step
    #[serde(default = "default_use_conversation_context")]
    pub use_conversation_context: bool,
}

fn default_request_k() -> usize {
    DEFAULT_REQUEST_K
}

fn default_use_conversation_context() -> bool {
    true
}

impl AnswerRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            k: DEFAULT_REQUEST_K,
            target_sources: Vec::new(),
            use_conversation_context: true,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.target_sources = targets;
        self
    }
}

/// Everything known about one answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerReport {
    pub question: String,
    pub answer: String,
    pub conversation_id: String,

    /// Fused confidence, in [0, 1]
    pub confidence_score: f32,

    pub retrieval_confidence: f32,

    /// 1-10 scale; 0.0 when no generation took place
    pub self_reported_confidence: f32,

    pub sources: Vec<PresentedSource>,
    pub evaluation_metrics: EvaluationMetrics,

    /// Retrieval found at least one candidate
    pub context_available: bool,

    /// Fused confidence reached the low-confidence threshold
    pub sufficient_confidence: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Retrieval, generation, fusion and presentation for one question at a time
pub struct AnswerPipeline {
    config: AnswerConfig,
    ranker: Arc<Ranker>,
    generation: Arc<dyn GenerationStep>,
    conversations: Arc<dyn ConversationLog>,
}

impl AnswerPipeline {
    pub fn new(
        config: AnswerConfig,
        ranker: Arc<Ranker>,
        generation: Arc<dyn GenerationStep>,
        conversations: Arc<dyn ConversationLog>,
    ) -> Result<Self> {
        config.validate().map_err(AnswerError::InvalidConfig)?;

        Ok(Self {
            config,
            ranker,
            generation,
            conversations,
        })
    }

    pub fn config(&self) -> &AnswerConfig {
        &self.config
    }

    fn validate_request(&self, request: &AnswerRequest) -> Result<()> {
        if request.question.trim().is_empty() {
            return Err(AnswerError::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }

        if request.k == 0 || request.k > self.config.max_request_k {
            return Err(AnswerError::InvalidRequest(format!(
                "k must be between 1 and {}, got {}",
                self.config.max_request_k, request.k
            )));
        }

        Ok(())
    }

    async fn conversation_context(
        &self,
        ctx: &RequestContext,
        conversation_id: &str,
    ) -> Option<String> {
        match self
            .conversations
            .history(&ctx.client_id, conversation_id)
            .await
        {
            Ok(history) => render_turns(&history, self.config.conversation_context_turns),
            Err(e) => {
                warn!("Failed to load conversation {conversation_id}: {e}");
                None
            }
        }
    }

    /// Answer `request` on behalf of `ctx`.
    ///
    /// Retrieval or generation failures fail the request. Failing to record
    /// the answer in the conversation log does not.
    pub async fn ask(&self, ctx: &RequestContext, request: &AnswerRequest) -> Result<AnswerReport> {
        let start = Instant::now();
        self.validate_request(request)?;

        let conversation_id = ctx
            .conversation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let retrieval_k = request.k.max(self.config.min_retrieval_k);
        let targets = (!request.target_sources.is_empty())
            .then_some(request.target_sources.as_slice());
        let result = self
            .ranker
            .rank(&request.question, retrieval_k, targets)
            .await?;

        if result.is_empty() {
            debug!("No context retrieved for question, skipping generation");
            return Ok(AnswerReport {
                question: request.question.clone(),
                answer: NO_CONTEXT_ANSWER.to_string(),
                conversation_id,
                confidence_score: 0.0,
                retrieval_confidence: 0.0,
                self_reported_confidence: 0.0,
                sources: Vec::new(),
                evaluation_metrics: EvaluationMetrics::default(),
                context_available: false,
                sufficient_confidence: false,
                warning: None,
            });
        }

        let conversation_context = if request.use_conversation_context {
            self.conversation_context(ctx, &conversation_id).await
        } else {
            None
        };

        let context = result.format_context();
        let generation_request = GenerationRequest {
            query: &request.question,
            context: &context,
            retrieval_confidence: result.retrieval_confidence,
            conversation_context: conversation_context.as_deref(),
        };
        let generated = self
            .generation
            .generate(&generation_request)
            .await
            .map_err(|e| AnswerError::Generation(format!("{e:#}")))?;
        let outcome = GenerationOutcome::new(generated, self.config.default_self_reported);

        let report = fuse(&result, &outcome, &self.config);
        let confidence = report.fused.final_confidence;
        let sufficient_confidence = confidence >= self.config.low_confidence_threshold;
        let warning = (!sufficient_confidence).then(|| {
            format!(
                "Low confidence ({confidence:.2}). The answer may not be well-supported by the available context."
            )
        });

        let entry = ConversationEntry::new(
            request.question.clone(),
            outcome.answer_text.clone(),
            confidence,
            report
                .sources
                .iter()
                .map(|source| SourceRef {
                    source: source.source_id.clone(),
                    page: source.page,
                    relevance_score: source.relevance_score,
                })
                .collect(),
        );
        if let Err(e) = self
            .conversations
            .append(&ctx.client_id, &conversation_id, entry)
            .await
        {
            warn!("Failed to record answer in conversation {conversation_id}: {e}");
        }

        info!(
            "Answered question with confidence {confidence:.2} ({} sources) in {}ms",
            report.sources.len(),
            start.elapsed().as_millis()
        );

        Ok(AnswerReport {
            question: request.question.clone(),
            answer: outcome.answer_text,
            conversation_id,
            confidence_score: confidence,
            retrieval_confidence: result.retrieval_confidence,
            self_reported_confidence: report.fused.self_reported_confidence,
            sources: report.sources,
            evaluation_metrics: report.metrics,
            context_available: true,
            sufficient_confidence,
            warning,
        })
    }
}
