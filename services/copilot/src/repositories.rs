//! Conversation store and profile lookups

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{
    AppendOutcome, ChatMessage, Conversation, ConversationSummary, NewConversation, Page,
    ProfileContext,
};

pub mod conversation;
pub mod profile;

#[cfg(test)]
pub mod memory;

pub use conversation::PgConversationRepository;
pub use profile::PgProfileRepository;

/// Persistence of per-user AI conversations
///
/// Every lookup is scoped by owner: a conversation belonging to another user
/// is indistinguishable from one that does not exist.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find_owned(&self, user_id: Uuid, id: Uuid) -> DatabaseResult<Option<Conversation>>;

    async fn create(&self, new_conversation: &NewConversation) -> DatabaseResult<Conversation>;

    /// Append messages if the stored version still equals `expected_version`
    async fn append_messages(
        &self,
        user_id: Uuid,
        id: Uuid,
        expected_version: i64,
        messages: &[ChatMessage],
        updated_at: DateTime<Utc>,
    ) -> DatabaseResult<AppendOutcome>;

    /// Most recently updated first
    async fn list_for_user(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> DatabaseResult<Vec<ConversationSummary>>;

    async fn delete_owned(&self, user_id: Uuid, id: Uuid) -> DatabaseResult<bool>;

    async fn health_check(&self) -> DatabaseResult<bool>;
}

/// Read access to user profiles
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_context(&self, user_id: Uuid) -> DatabaseResult<Option<ProfileContext>>;
}
