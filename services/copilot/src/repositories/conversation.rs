//! Conversation repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use tracing::debug;
use uuid::Uuid;

use super::ConversationStore;
use crate::models::{
    AppendOutcome, ChatMessage, Conversation, ConversationSummary, NewConversation, Page,
};

/// Conversation repository
#[derive(Clone)]
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    /// Create a new conversation repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn conversation_from_row(row: &PgRow) -> DatabaseResult<Conversation> {
    let Json(messages): Json<Vec<ChatMessage>> = row
        .try_get("messages")
        .map_err(|e| DatabaseError::InvalidRow(format!("messages: {}", e)))?;

    Ok(Conversation {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        messages,
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl ConversationStore for PgConversationRepository {
    async fn find_owned(&self, user_id: Uuid, id: Uuid) -> DatabaseResult<Option<Conversation>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, messages, version, created_at, updated_at
            FROM ai_conversations
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn create(&self, new_conversation: &NewConversation) -> DatabaseResult<Conversation> {
        let created_at = new_conversation
            .messages
            .last()
            .map(|m| m.timestamp)
            .unwrap_or_else(Utc::now);

        let row = sqlx::query(
            r#"
            INSERT INTO ai_conversations (id, user_id, title, messages, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, user_id, title, messages, version, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_conversation.user_id)
        .bind(&new_conversation.title)
        .bind(Json(&new_conversation.messages))
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        conversation_from_row(&row)
    }

    async fn append_messages(
        &self,
        user_id: Uuid,
        id: Uuid,
        expected_version: i64,
        messages: &[ChatMessage],
        updated_at: DateTime<Utc>,
    ) -> DatabaseResult<AppendOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE ai_conversations
            SET messages = messages || $4,
                version = version + 1,
                updated_at = $5
            WHERE id = $1 AND user_id = $2 AND version = $3
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(expected_version)
        .bind(Json(messages))
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        if result.rows_affected() == 1 {
            Ok(AppendOutcome::Appended)
        } else {
            debug!(conversation_id = %id, expected_version, "Conversation append lost a race");
            Ok(AppendOutcome::Stale)
        }
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> DatabaseResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, created_at, updated_at
            FROM ai_conversations
            WHERE user_id = $1
            ORDER BY updated_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        let conversations = rows
            .into_iter()
            .map(|row| ConversationSummary {
                id: row.get("id"),
                title: row.get("title"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect();

        Ok(conversations)
    }

    async fn delete_owned(&self, user_id: Uuid, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM ai_conversations
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        common::database::health_check(&self.pool).await
    }
}
