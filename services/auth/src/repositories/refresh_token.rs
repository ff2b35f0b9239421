//! Refresh token repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::RefreshTokenStore;
use crate::models::{NewRefreshToken, RefreshTokenOwner};

/// Refresh token repository
#[derive(Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenRepository {
    async fn insert(&self, token: &NewRefreshToken) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, token, user_id, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(())
    }

    async fn take(&self, token: &str) -> DatabaseResult<Option<RefreshTokenOwner>> {
        let row = sqlx::query(
            r#"
            DELETE FROM refresh_tokens rt
            USING users u
            WHERE rt.token = $1 AND u.id = rt.user_id
            RETURNING rt.user_id, rt.expires_at, u.email, u.role
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let role: String = row.get("role");
        Ok(Some(RefreshTokenOwner {
            user_id: row.get("user_id"),
            email: row.get("email"),
            role: role.parse().map_err(DatabaseError::InvalidRow)?,
            expires_at: row.get("expires_at"),
        }))
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected())
    }
}
