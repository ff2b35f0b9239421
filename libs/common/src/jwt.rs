//! JWT service for token generation and validation
//!
//! Tokens are signed with HS256 using a shared secret so that every service
//! holding the secret can verify bearer tokens minted by the auth service.
//! Each token carries a `type` tag; access, refresh and two-factor tokens
//! are never accepted in place of one another.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{role::Role, settings};

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret for signing and verifying tokens
    pub secret: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
    /// Two-factor pending token expiration time in seconds (default: 5 minutes)
    pub two_factor_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Secret used to sign tokens (required)
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    /// - `JWT_TWO_FACTOR_TOKEN_EXPIRY`: Two-factor token expiry in seconds (default: 300)
    pub fn from_env() -> Result<Self> {
        let settings = settings::load(&[
            ("jwt_access_token_expiry", "900"),
            ("jwt_refresh_token_expiry", "604800"),
            ("jwt_two_factor_token_expiry", "300"),
        ])?;

        let secret = settings::optional_string(&settings, "jwt_secret")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        Ok(JwtConfig {
            secret,
            access_token_expiry: settings.get("jwt_access_token_expiry")?,
            refresh_token_expiry: settings.get("jwt_refresh_token_expiry")?,
            two_factor_token_expiry: settings.get("jwt_two_factor_token_expiry")?,
        })
    }
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Access token
    #[serde(rename = "access")]
    Access,
    /// Refresh token
    #[serde(rename = "refresh")]
    Refresh,
    /// Short-lived token issued while two-factor verification is pending
    #[serde(rename = "2fa")]
    TwoFactor,
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// User role
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Unique token id
    pub jti: Uuid,
    /// Token type (access or refresh)
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// Claims of a two-factor pending token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorClaims {
    pub sub: Uuid,
    pub iat: u64,
    pub exp: u64,
    pub jti: Uuid,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        if config.secret.is_empty() {
            anyhow::bail!("JWT secret must not be empty");
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Ok(JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user_id: Uuid, email: &str, role: Role) -> Result<String> {
        self.session_token(
            user_id,
            email,
            role,
            TokenType::Access,
            self.config.access_token_expiry,
        )
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user_id: Uuid, email: &str, role: Role) -> Result<String> {
        self.session_token(
            user_id,
            email,
            role,
            TokenType::Refresh,
            self.config.refresh_token_expiry,
        )
    }

    /// Generate the temporary token returned while two-factor is pending
    pub fn generate_two_factor_token(&self, user_id: Uuid) -> Result<String> {
        let now = now_secs()?;
        let claims = TwoFactorClaims {
            sub: user_id,
            iat: now,
            exp: now + self.config.two_factor_token_expiry,
            jti: Uuid::new_v4(),
            token_type: TokenType::TwoFactor,
        };
        self.sign(&claims)
    }

    /// Validate an access token and return the claims
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        let claims: Claims = self.verify(token)?;
        if claims.token_type != TokenType::Access {
            anyhow::bail!("Token is not an access token");
        }
        Ok(claims)
    }

    /// Validate a two-factor pending token and return the claims
    pub fn validate_two_factor_token(&self, token: &str) -> Result<TwoFactorClaims> {
        let claims: TwoFactorClaims = self.verify(token)?;
        if claims.token_type != TokenType::TwoFactor {
            anyhow::bail!("Token is not a two-factor token");
        }
        Ok(claims)
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }

    fn session_token(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
        token_type: TokenType,
        lifetime: u64,
    ) -> Result<String> {
        let now = now_secs()?;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now,
            exp: now + lifetime,
            jti: Uuid::new_v4(),
            token_type,
        };
        self.sign(&claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?;
        Ok(token)
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T> {
        let token_data = decode::<T>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

fn now_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs())
}
