/*!
# Retrieval

Re-ranking layer that sits between a similarity index and answer generation:

- **Content filter**: drops short boilerplate (tables of contents, copyright lines)
- **Candidate scoring**: `exp(-distance)` boosted by content signals
  (numbers, percentages, currency, tables, temporal words)
- **Diversity selection**: per-source quotas, with a dedicated policy for
  comparative questions spanning several documents
- **Retrieval confidence**: mean boosted score of the selected candidates
- **LRU caching**: keyed by query, k and target-source set

## Architecture

```text
Query
  ├─> Classification (comparative?)
  ├─> Similarity Source (over-fetch k*3 / k*4)
  │     └─> Target-source filter
  └─> Content Filter
        └─> Candidate Scorer (sorted by boosted score)
              └─> Diversity Selector (+ backfill)
                    └─> RetrievalResult
```

## Example

```rust,no_run
use docqa_passage_store::RecordedSource;
use docqa_retrieval::{Ranker, RankingConfig};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let source = RecordedSource::from_json_file(Path::new("hits.json")).await?;
    let ranker = Ranker::new(RankingConfig::default(), Arc::new(source))?;

    let result = ranker.rank("How did deposits change in Q2?", 5, None).await?;
    for (i, candidate) in result.candidates.iter().enumerate() {
        println!("{}. {} ({:.2})", i + 1, candidate.source_id, candidate.boosted_score);
    }
    println!("retrieval confidence: {:.2}", result.retrieval_confidence);

    Ok(())
}
```
*/

mod config;
mod diversity;
mod error;
mod filter;
mod query;
mod result;
mod retrieval;
mod scorer;

pub use config::{BoostWeights, RankingConfig};
pub use diversity::{DiversitySelector, Selection, SelectionMode};
pub use error::{Result, RetrievalError};
pub use filter::ContentFilter;
pub use query::{FetchPlan, QueryProfile, overfetch_width};
pub use result::{Candidate, RankStats, RetrievalResult, ScoreSummary, UNKNOWN_SOURCE};
pub use retrieval::{CacheStats, Ranker};
pub use scorer::{CandidateScorer, ContentSignals, similarity_from_distance};
