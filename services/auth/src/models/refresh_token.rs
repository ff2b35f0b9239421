//! Refresh token records

use chrono::{DateTime, Utc};
use common::role::Role;
use uuid::Uuid;

/// Refresh token to persist
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A refresh token removed from the store, with what is needed to reissue
#[derive(Debug, Clone)]
pub struct RefreshTokenOwner {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenOwner {
    /// Expiry is inclusive: a token is dead at its expiry instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_boundary_is_dead() {
        let now = Utc::now();
        let owner = RefreshTokenOwner {
            user_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            role: Role::Patient,
            expires_at: now,
        };

        assert!(owner.is_expired_at(now));
        assert!(!owner.is_expired_at(now - Duration::seconds(1)));
    }
}
