/*!
# Answer

Turns ranked retrieval results into an answer report:

- **Generation step**: pluggable model call, with self-reported confidence
  parsed from the model output
- **Confidence fusion**: weighted blend of retrieval and self-reported
  confidence; answers that decline for lack of context are treated as
  correct negatives and raised to a floor
- **Source presentation**: at most three sources above the display
  threshold, with boundary-aware previews
- **Evaluation metrics**: adaptive precision and grounding accuracy
- **Conversation log**: per-client history, passed explicitly through
  [`RequestContext`]

## Architecture

```text
Question
  └─> Ranker (max(k, 5) candidates)
        ├─> empty: "no relevant context" answer
        └─> Generation Step (context + prior turns)
              └─> Confidence Fusion
                    └─> Source Presenter
                          └─> AnswerReport (+ conversation log entry)
```

## Example

```rust,no_run
use docqa_answer::{
    AnswerConfig, AnswerPipeline, AnswerRequest, InMemoryConversationLog, RecordedGeneration,
    RequestContext,
};
use docqa_passage_store::RecordedSource;
use docqa_retrieval::{Ranker, RankingConfig};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let source = RecordedSource::from_json_file(Path::new("hits.json")).await?;
    let ranker = Ranker::new(RankingConfig::default(), Arc::new(source))?;
    let pipeline = AnswerPipeline::new(
        AnswerConfig::default(),
        Arc::new(ranker),
        Arc::new(RecordedGeneration::new("Deposits rose 4%.\nCONFIDENCE: 8/10")),
        Arc::new(InMemoryConversationLog::new()),
    )?;

    let report = pipeline
        .ask(&RequestContext::new("demo"), &AnswerRequest::new("How did deposits change?"))
        .await?;
    println!("{} ({:.2})", report.answer, report.confidence_score);

    Ok(())
}
```
*/

mod confidence;
mod config;
mod conversation;
mod error;
mod fusion;
mod generation;
mod pipeline;
mod presenter;
mod report;

pub use confidence::{clean_answer, parse_self_reported_confidence};
pub use config::AnswerConfig;
pub use conversation::{
    ConversationEntry, ConversationLog, ConversationSummary, InMemoryConversationLog,
    JsonFileConversationLog, RequestContext, SourceRef, render_turns,
};
pub use error::{AnswerError, Result};
pub use fusion::{ConfidenceFusion, FusedConfidence};
pub use generation::{
    EMPTY_OUTPUT_ANSWER, GeneratedAnswer, GenerationOutcome, GenerationRequest, GenerationStep,
    RecordedGeneration, RecordedRequest,
};
pub use pipeline::{
    AnswerPipeline, AnswerReport, AnswerRequest, DEFAULT_REQUEST_K, NO_CONTEXT_ANSWER,
};
pub use presenter::{PresentedSource, SourcePresenter};
pub use report::{EvaluationMetrics, FusionReport, fuse};
