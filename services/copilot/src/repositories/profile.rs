//! Profile lookups for chat context

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::ProfileStore;
use crate::models::ProfileContext;

/// Profile repository
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileRepository {
    async fn find_context(&self, user_id: Uuid) -> DatabaseResult<Option<ProfileContext>> {
        let row = sqlx::query(
            r#"
            SELECT c.name AS condition_name, p.condition_stage
            FROM user_profiles p
            LEFT JOIN conditions c ON c.id = p.condition_id
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(row.map(|row| ProfileContext {
            condition_name: row.get("condition_name"),
            condition_stage: row.get("condition_stage"),
        }))
    }
}
