//! In-memory credential store used by the service and route tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{RefreshTokenStore, UserStore};
use crate::models::{NewRefreshToken, NewUser, Profile, RefreshTokenOwner, User};

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
    fail_login_stamps: Arc<AtomicBool>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: Uuid) -> Option<User> {
        self.users.lock().await.get(&user_id).cloned()
    }

    pub async fn enable_two_factor(&self, email: &str) {
        let mut users = self.users.lock().await;
        if let Some(user) = users.values_mut().find(|u| u.email == email) {
            user.two_factor_enabled = true;
        }
    }

    /// Make every later `record_login` call fail
    pub fn fail_login_stamps(&self) {
        self.fail_login_stamps.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn create_with_profile(&self, new_user: &NewUser) -> DatabaseResult<User> {
        let mut users = self.users.lock().await;
        if users.values().any(|u| u.email == new_user.email) {
            return Err(DatabaseError::Duplicate("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            role: Default::default(),
            two_factor_enabled: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            profile: Some(Profile {
                display_name: new_user.display_name.clone(),
                avatar_url: None,
                is_survivor: false,
                condition_id: new_user.primary_condition_id,
            }),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()> {
        if self.fail_login_stamps.load(Ordering::SeqCst) {
            return Err(DatabaseError::Migration("users table unavailable".to_string()));
        }
        if let Some(user) = self.users.lock().await.get_mut(&user_id) {
            user.last_login_at = Some(at);
            user.updated_at = at;
        }
        Ok(())
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(true)
    }
}

/// Refresh tokens keyed by token string; joins against the user store like
/// the SQL implementation does
#[derive(Clone)]
pub struct MemoryRefreshTokenStore {
    users: MemoryUserStore,
    tokens: Arc<Mutex<HashMap<String, (Uuid, DateTime<Utc>)>>>,
}

impl MemoryRefreshTokenStore {
    pub fn new(users: MemoryUserStore) -> Self {
        Self {
            users,
            tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn count_for_user(&self, user_id: Uuid) -> usize {
        self.tokens
            .lock()
            .await
            .values()
            .filter(|(owner, _)| *owner == user_id)
            .count()
    }

    pub async fn contains(&self, token: &str) -> bool {
        self.tokens.lock().await.contains_key(token)
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn insert(&self, token: &NewRefreshToken) -> DatabaseResult<()> {
        let mut tokens = self.tokens.lock().await;
        if tokens.contains_key(&token.token) {
            return Err(DatabaseError::Duplicate("refresh_tokens_token_key".to_string()));
        }
        tokens.insert(token.token.clone(), (token.user_id, token.expires_at));
        Ok(())
    }

    async fn take(&self, token: &str) -> DatabaseResult<Option<RefreshTokenOwner>> {
        let removed = self.tokens.lock().await.remove(token);
        let Some((user_id, expires_at)) = removed else {
            return Ok(None);
        };

        Ok(self.users.get(user_id).await.map(|user| RefreshTokenOwner {
            user_id,
            email: user.email,
            role: user.role,
            expires_at,
        }))
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> DatabaseResult<u64> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, (owner, _)| *owner != user_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}
