use thiserror::Error;

/// Errors raised by a similarity source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backing index could not be opened or loaded
    #[error("Failed to open similarity source: {0}")]
    Initialization(String),

    /// The search call itself failed
    #[error("Failed to search: {0}")]
    SearchFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;
