use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnswerError {
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] docqa_retrieval::RetrievalError),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid answer configuration: {0}")]
    InvalidConfig(String),

    #[error("Conversation log error: {0}")]
    ConversationLog(String),
}

pub type Result<T> = std::result::Result<T, AnswerError>;
