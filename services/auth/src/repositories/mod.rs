//! Credential store: users, profiles and refresh tokens

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{NewRefreshToken, NewUser, RefreshTokenOwner, User};

pub mod refresh_token;
pub mod user;

#[cfg(test)]
pub mod memory;

pub use refresh_token::PgRefreshTokenRepository;
pub use user::PgUserRepository;

/// Persistence of user accounts and their profiles
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user, with profile, by exact email
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    /// Create a user and its profile atomically
    async fn create_with_profile(&self, new_user: &NewUser) -> DatabaseResult<User>;

    /// Stamp the last successful login
    async fn record_login(&self, user_id: Uuid, at: DateTime<Utc>) -> DatabaseResult<()>;

    async fn health_check(&self) -> DatabaseResult<bool>;
}

/// Server-side record of issued refresh tokens
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, token: &NewRefreshToken) -> DatabaseResult<()>;

    /// Remove a token and return its owner; `None` when no row matched.
    /// Removal and lookup happen in one step so concurrent callers cannot
    /// both receive the same row.
    async fn take(&self, token: &str) -> DatabaseResult<Option<RefreshTokenOwner>>;

    /// Remove every token of a user, returning how many were removed
    async fn delete_all_for_user(&self, user_id: Uuid) -> DatabaseResult<u64>;

    /// Remove tokens whose expiry is at or before `now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> DatabaseResult<u64>;
}
