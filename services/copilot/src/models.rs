//! Copilot models for request and response payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod conversation;

pub use conversation::{
    AppendOutcome, ChatMessage, Conversation, ConversationSummary, MessageRole, NewConversation,
    ProfileContext,
};

/// Request for a chat turn
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<Uuid>,
}

/// Response for a chat turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub conversation_id: Uuid,
    pub message: ChatMessage,
    pub disclaimer: &'static str,
}

/// Query parameters for conversation history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Number of conversations per page
    pub limit: Option<i64>,
}

/// Normalized page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 100;

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl From<&HistoryQuery> for Page {
    fn from(query: &HistoryQuery) -> Self {
        Self {
            page: query.page.unwrap_or(1).max(1),
            limit: query
                .limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }
}
