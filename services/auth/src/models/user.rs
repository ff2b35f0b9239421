//! User model and related functionality

use chrono::{DateTime, Utc};
use common::role::Role;
use serde::Serialize;
use uuid::Uuid;

/// User entity, never serialized directly because it holds the password hash
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub two_factor_enabled: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub profile: Option<Profile>,
}

/// Profile created alongside the user
#[derive(Debug, Clone)]
pub struct Profile {
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_survivor: bool,
    pub condition_id: Option<Uuid>,
}

/// New user creation payload
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub primary_condition_id: Option<Uuid>,
}

/// Public view of a user returned by register and login
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub profile: Option<ProfileSummary>,
}

/// Public view of a profile
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_survivor: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            profile: user.profile.as_ref().map(|profile| ProfileSummary {
                display_name: profile.display_name.clone(),
                avatar_url: profile.avatar_url.clone(),
                is_survivor: profile.is_survivor,
            }),
        }
    }
}
