//! Audit trail for sensitive actions
//!
//! Audit writes are best-effort: `record` logs a warning when the sink fails
//! and never propagates the failure into the operation being audited.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};

/// Audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Register,
    Login,
    Logout,
    AiChat,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Register => "register",
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
            AuditAction::AiChat => "ai_chat",
        }
    }
}

/// Entity an audited action touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEntity {
    AiConversation(Uuid),
}

impl AuditEntity {
    pub fn entity_type(&self) -> &'static str {
        match self {
            AuditEntity::AiConversation(_) => "ai_conversation",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            AuditEntity::AiConversation(id) => *id,
        }
    }
}

/// Audit log entry
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub user_id: Uuid,
    pub action: AuditAction,
    pub entity: Option<AuditEntity>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(user_id: Uuid, action: AuditAction) -> Self {
        Self {
            user_id,
            action,
            entity: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_entity(mut self, entity: AuditEntity) -> Self {
        self.entity = Some(entity);
        self
    }
}

/// Destination for audit records
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> DatabaseResult<()>;
}

/// Write an audit record, downgrading failures to a warning
pub async fn record(log: &dyn AuditLog, record: AuditRecord) {
    if let Err(e) = log.append(&record).await {
        warn!(
            user_id = %record.user_id,
            action = record.action.as_str(),
            "Failed to write audit record: {}",
            e
        );
    }
}

/// PostgreSQL-backed audit log
#[derive(Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn append(&self, record: &AuditRecord) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, entity_type, entity_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.user_id)
        .bind(record.action.as_str())
        .bind(record.entity.map(|e| e.entity_type()))
        .bind(record.entity.map(|e| e.id()))
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(())
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod memory {
    //! In-memory audit log for tests

    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    pub struct MemoryAuditLog {
        records: Arc<Mutex<Vec<AuditRecord>>>,
        failing: bool,
    }

    impl MemoryAuditLog {
        pub fn new() -> Self {
            Self::default()
        }

        /// A log whose every write fails
        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        pub async fn records(&self) -> Vec<AuditRecord> {
            self.records.lock().await.clone()
        }

        pub async fn actions(&self) -> Vec<AuditAction> {
            self.records.lock().await.iter().map(|r| r.action).collect()
        }
    }

    #[async_trait]
    impl AuditLog for MemoryAuditLog {
        async fn append(&self, record: &AuditRecord) -> DatabaseResult<()> {
            if self.failing {
                return Err(DatabaseError::Configuration(
                    "audit sink unavailable".to_string(),
                ));
            }
            self.records.lock().await.push(record.clone());
            Ok(())
        }
    }
}
