use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Similarity source error: {0}")]
    Source(#[from] docqa_passage_store::SourceError),

    #[error("Similarity search timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Invalid ranking configuration: {0}")]
    InvalidConfig(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
