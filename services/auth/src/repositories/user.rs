//! User repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::UserStore;
use crate::models::{NewUser, Profile, User};

/// User repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> DatabaseResult<User> {
    let role: String = row.get("role");
    let role = role.parse().map_err(DatabaseError::InvalidRow)?;

    let display_name: Option<String> = row.get("display_name");
    let profile = display_name.map(|display_name| Profile {
        display_name,
        avatar_url: row.get("avatar_url"),
        is_survivor: row.get::<Option<bool>, _>("is_survivor").unwrap_or(false),
        condition_id: row.get("condition_id"),
    });

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        two_factor_enabled: row.get("is_2fa_enabled"),
        last_login_at: row.get("last_login_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        profile,
    })
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.email, u.password_hash, u.role, u.is_2fa_enabled,
                   u.last_login_at, u.created_at, u.updated_at,
                   p.display_name, p.avatar_url, p.is_survivor, p.condition_id
            FROM users u
            LEFT JOIN user_profiles p ON p.user_id = u.id
            WHERE u.email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_with_profile(&self, new_user: &NewUser) -> DatabaseResult<User> {
        info!("Creating new user with profile");

        let mut tx = self.pool.begin().await.map_err(DatabaseError::Query)?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, role, is_2fa_enabled,
                      last_login_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from_query)?;

        let user_id: Uuid = row.get("id");
        let role: String = row.get("role");

        let profile_row = sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, display_name, condition_id)
            VALUES ($1, $2, $3)
            RETURNING display_name, avatar_url, is_survivor, condition_id
            "#,
        )
        .bind(user_id)
        .bind(&new_user.display_name)
        .bind(new_user.primary_condition_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from_query)?;

        tx.commit().await.map_err(DatabaseError::Query)?;

        Ok(User {
            id: user_id,
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            role: role.parse().map_err(DatabaseError::InvalidRow)?,
            two_factor_enabled: row.get("is_2fa_enabled"),
            last_login_at: row.get("last_login_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            profile: Some(Profile {
                display_name: profile_row.get("display_name"),
                avatar_url: profile_row.get("avatar_url"),
                is_survivor: profile_row.get("is_survivor"),
                condition_id: profile_row.get("condition_id"),
            }),
        })
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        common::database::health_check(&self.pool).await
    }
}
