//! Session token issuance, rotation and revocation
//!
//! Refresh tokens are tracked server-side. Rotation removes the presented
//! token before minting a new pair, so a refresh token works exactly once
//! and a replayed one finds nothing to remove.

use chrono::{Duration, Utc};
use common::{jwt::JwtService, role::Role};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::NewRefreshToken,
    repositories::RefreshTokenStore,
};

/// Freshly issued session credentials
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Token service
#[derive(Clone)]
pub struct TokenService {
    jwt_service: JwtService,
    store: Arc<dyn RefreshTokenStore>,
}

impl TokenService {
    pub fn new(jwt_service: JwtService, store: Arc<dyn RefreshTokenStore>) -> Self {
        Self { jwt_service, store }
    }

    /// Mint an access/refresh pair and persist the refresh token
    pub async fn issue(&self, user_id: Uuid, email: &str, role: Role) -> Result<TokenPair, AuthError> {
        let access_token = self
            .jwt_service
            .generate_access_token(user_id, email, role)
            .map_err(|e| AuthError::Internal(format!("Failed to generate access token: {}", e)))?;

        let refresh_token = self
            .jwt_service
            .generate_refresh_token(user_id, email, role)
            .map_err(|e| AuthError::Internal(format!("Failed to generate refresh token: {}", e)))?;

        let expires_at =
            Utc::now() + Duration::seconds(self.jwt_service.refresh_token_expiry() as i64);

        self.store
            .insert(&NewRefreshToken {
                token: refresh_token.clone(),
                user_id,
                expires_at,
            })
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.jwt_service.access_token_expiry(),
        })
    }

    /// Exchange a refresh token for a new pair. The presented token is
    /// consumed whether or not it turns out to be expired.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let owner = self
            .store
            .take(refresh_token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if owner.is_expired_at(Utc::now()) {
            warn!(user_id = %owner.user_id, "Expired refresh token presented");
            return Err(AuthError::InvalidRefreshToken);
        }

        info!(user_id = %owner.user_id, "Rotating refresh token");
        self.issue(owner.user_id, &owner.email, owner.role).await
    }

    /// Delete every refresh token of a user
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let revoked = self.store.delete_all_for_user(user_id).await?;
        info!(user_id = %user_id, revoked, "Revoked refresh tokens");
        Ok(revoked)
    }

    /// Remove refresh tokens that can no longer be honored
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        Ok(self.store.delete_expired(Utc::now()).await?)
    }

    /// Temporary token for a login that still needs a second factor
    pub fn issue_two_factor(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.jwt_service
            .generate_two_factor_token(user_id)
            .map_err(|e| AuthError::Internal(format!("Failed to generate 2FA token: {}", e)))
    }

    /// Validate a temporary two-factor token, returning its subject
    pub fn verify_two_factor(&self, token: &str) -> Result<Uuid, AuthError> {
        self.jwt_service
            .validate_two_factor_token(token)
            .map(|claims| claims.sub)
            .map_err(|_| AuthError::InvalidTwoFactorToken)
    }
}

#[cfg(test)]
pub(crate) fn test_jwt_service() -> JwtService {
    JwtService::new(common::jwt::JwtConfig {
        secret: "auth-service-test-secret".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        two_factor_token_expiry: 300,
    })
    .unwrap()
}
