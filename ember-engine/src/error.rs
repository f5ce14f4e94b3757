use ember_model::StoryId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("item no longer exists: {0}")]
    ItemGone(StoryId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether a later retry of the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::TransientNetwork(_) | EngineError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
