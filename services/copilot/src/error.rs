//! Copilot errors and their HTTP mapping

use common::error::{ApiError, DatabaseError};
use thiserror::Error;

/// Failure of a copilot operation. Provider failures never show up here;
/// they are turned into fallback replies.
#[derive(Debug, Error)]
pub enum CopilotError {
    #[error("{0}")]
    Validation(String),

    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("Conversation was updated concurrently, please retry")]
    ConcurrentUpdate,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<CopilotError> for ApiError {
    fn from(err: CopilotError) -> Self {
        match err {
            CopilotError::Validation(msg) => ApiError::BadRequest(msg),
            CopilotError::ConversationNotFound => ApiError::NotFound(err.to_string()),
            CopilotError::ConcurrentUpdate => ApiError::Conflict(err.to_string()),
            CopilotError::Database(e) => ApiError::Database(e),
        }
    }
}
