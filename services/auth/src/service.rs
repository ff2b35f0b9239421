//! Authentication flow: register, login, refresh, logout
//!
//! Session state per user moves Anonymous -> Authenticated on register or
//! login and back on logout. A login against an account with two-factor
//! enabled stops in PendingTwoFactor and receives only a temporary token.

use chrono::Utc;
use common::{
    audit::{self, AuditAction, AuditLog, AuditRecord},
    error::{DatabaseError, DatabaseResult},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::{NewUser, UserSummary},
    password::PasswordService,
    repositories::UserStore,
    tokens::{TokenPair, TokenService},
    validation,
};

/// Registration input
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub primary_condition_id: Option<Uuid>,
}

/// Authenticated session returned by register and login
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: UserSummary,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Login result while a second factor is outstanding
#[derive(Debug, Clone, Serialize)]
pub struct TwoFactorChallenge {
    #[serde(rename = "requires2FA")]
    pub requires_two_factor: bool,
    #[serde(rename = "tempToken")]
    pub temp_token: String,
}

/// Outcome of a successful credential check
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LoginOutcome {
    Authenticated(AuthSession),
    TwoFactorRequired(TwoFactorChallenge),
}

/// Auth flow orchestration over the credential store and token service
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
    passwords: PasswordService,
    audit_log: Arc<dyn AuditLog>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: TokenService,
        passwords: PasswordService,
        audit_log: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            users,
            tokens,
            passwords,
            audit_log,
        }
    }

    /// Create an account and open its first session
    pub async fn register(&self, registration: Registration) -> Result<AuthSession, AuthError> {
        validation::validate_email(&registration.email).map_err(AuthError::Validation)?;
        validation::validate_password(&registration.password).map_err(AuthError::Validation)?;
        let display_name = validation::validate_display_name(&registration.display_name)
            .map_err(AuthError::Validation)?;

        if self.users.find_by_email(&registration.email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self
            .passwords
            .hash(&registration.password)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let user = self
            .users
            .create_with_profile(&NewUser {
                email: registration.email,
                password_hash,
                display_name,
                primary_condition_id: registration.primary_condition_id,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Duplicate(_) => AuthError::EmailTaken,
                DatabaseError::MissingReference(_) => AuthError::UnknownCondition,
                other => AuthError::Database(other),
            })?;

        info!(user_id = %user.id, "User registered");

        let tokens = self.tokens.issue(user.id, &user.email, user.role).await?;
        audit::record(
            self.audit_log.as_ref(),
            AuditRecord::new(user.id, AuditAction::Register),
        )
        .await;

        Ok(AuthSession {
            user: UserSummary::from(&user),
            tokens,
        })
    }

    /// Check credentials and open a session, or start two-factor
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            self.passwords.verify_dummy(password).await;
            return Err(AuthError::InvalidCredentials);
        };

        let valid = self
            .passwords
            .verify(password, &user.password_hash)
            .await
            .unwrap_or_else(|e| {
                error!(user_id = %user.id, "Stored password hash is unusable: {}", e);
                false
            });

        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        if user.two_factor_enabled {
            info!(user_id = %user.id, "Login pending two-factor verification");
            return Ok(LoginOutcome::TwoFactorRequired(TwoFactorChallenge {
                requires_two_factor: true,
                temp_token: self.tokens.issue_two_factor(user.id)?,
            }));
        }

        // A failed stamp must not leave a live refresh token behind
        self.users.record_login(user.id, Utc::now()).await?;
        let tokens = self.tokens.issue(user.id, &user.email, user.role).await?;
        audit::record(
            self.audit_log.as_ref(),
            AuditRecord::new(user.id, AuditAction::Login),
        )
        .await;

        info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome::Authenticated(AuthSession {
            user: UserSummary::from(&user),
            tokens,
        }))
    }

    /// Rotate a refresh token into a new pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.tokens.rotate(refresh_token).await
    }

    /// End every session of a user
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.tokens.revoke_all(user_id).await?;
        audit::record(
            self.audit_log.as_ref(),
            AuditRecord::new(user_id, AuditAction::Logout),
        )
        .await;
        Ok(())
    }

    /// Second step of a two-factor login. No TOTP secrets are stored yet, so
    /// after checking its inputs this always reports the flow as unavailable.
    pub async fn verify_two_factor(&self, temp_token: &str, code: &str) -> Result<(), AuthError> {
        let user_id = self.tokens.verify_two_factor(temp_token)?;
        validation::validate_two_factor_code(code).map_err(AuthError::Validation)?;

        info!(user_id = %user_id, "Two-factor verification attempted");
        Err(AuthError::TwoFactorUnavailable)
    }

    /// Drop refresh tokens past their expiry
    pub async fn purge_expired_tokens(&self) -> Result<u64, AuthError> {
        self.tokens.purge_expired().await
    }

    pub async fn health_check(&self) -> DatabaseResult<bool> {
        self.users.health_check().await
    }
}
