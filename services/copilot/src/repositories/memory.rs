//! In-memory conversation and profile stores used by the service and route tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ConversationStore, ProfileStore};
use crate::models::{
    AppendOutcome, ChatMessage, Conversation, ConversationSummary, NewConversation, Page,
    ProfileContext,
};

#[derive(Clone, Default)]
pub struct MemoryConversationStore {
    conversations: Arc<Mutex<HashMap<Uuid, Conversation>>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<Conversation> {
        self.conversations.lock().await.get(&id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.conversations.lock().await.len()
    }

    /// Move a conversation's clock so ordering tests do not depend on timing
    pub async fn set_updated_at(&self, id: Uuid, at: DateTime<Utc>) {
        if let Some(conversation) = self.conversations.lock().await.get_mut(&id) {
            conversation.updated_at = at;
        }
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn find_owned(&self, user_id: Uuid, id: Uuid) -> DatabaseResult<Option<Conversation>> {
        let conversations = self.conversations.lock().await;
        Ok(conversations
            .get(&id)
            .filter(|c| c.user_id == user_id)
            .cloned())
    }

    async fn create(&self, new_conversation: &NewConversation) -> DatabaseResult<Conversation> {
        let created_at = new_conversation
            .messages
            .last()
            .map(|m| m.timestamp)
            .unwrap_or_else(Utc::now);

        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id: new_conversation.user_id,
            title: new_conversation.title.clone(),
            messages: new_conversation.messages.clone(),
            version: 1,
            created_at,
            updated_at: created_at,
        };

        self.conversations
            .lock()
            .await
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn append_messages(
        &self,
        user_id: Uuid,
        id: Uuid,
        expected_version: i64,
        messages: &[ChatMessage],
        updated_at: DateTime<Utc>,
    ) -> DatabaseResult<AppendOutcome> {
        let mut conversations = self.conversations.lock().await;
        let Some(conversation) = conversations
            .get_mut(&id)
            .filter(|c| c.user_id == user_id && c.version == expected_version)
        else {
            return Ok(AppendOutcome::Stale);
        };

        conversation.messages.extend_from_slice(messages);
        conversation.version += 1;
        conversation.updated_at = updated_at;
        Ok(AppendOutcome::Appended)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> DatabaseResult<Vec<ConversationSummary>> {
        let conversations = self.conversations.lock().await;
        let mut owned: Vec<&Conversation> = conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(owned
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .map(|c| ConversationSummary {
                id: c.id,
                title: c.title.clone(),
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect())
    }

    async fn delete_owned(&self, user_id: Uuid, id: Uuid) -> DatabaseResult<bool> {
        let mut conversations = self.conversations.lock().await;
        match conversations.get(&id) {
            Some(c) if c.user_id == user_id => {
                conversations.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(true)
    }
}

#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<Mutex<HashMap<Uuid, ProfileContext>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: Uuid, profile: ProfileContext) {
        self.profiles.lock().await.insert(user_id, profile);
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_context(&self, user_id: Uuid) -> DatabaseResult<Option<ProfileContext>> {
        Ok(self.profiles.lock().await.get(&user_id).cloned())
    }
}
