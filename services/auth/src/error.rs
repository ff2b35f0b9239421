//! Authentication errors and their HTTP mapping

use common::error::{ApiError, DatabaseError};
use thiserror::Error;
use tracing::error;

/// Failure of an auth flow operation
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Unknown condition")]
    UnknownCondition,

    /// Unknown email and wrong password share this variant on purpose
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    #[error("Invalid or expired verification token")]
    InvalidTwoFactorToken,

    #[error("Two-factor verification is not available yet")]
    TwoFactorUnavailable,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => ApiError::BadRequest(msg),
            AuthError::UnknownCondition => ApiError::BadRequest(err.to_string()),
            AuthError::EmailTaken => ApiError::Conflict(err.to_string()),
            AuthError::InvalidCredentials
            | AuthError::InvalidRefreshToken
            | AuthError::InvalidTwoFactorToken => ApiError::Unauthorized(err.to_string()),
            AuthError::TwoFactorUnavailable => ApiError::NotImplemented(err.to_string()),
            AuthError::Database(e) => ApiError::Database(e),
            AuthError::Internal(msg) => {
                error!("Auth internal error: {}", msg);
                ApiError::InternalServerError
            }
        }
    }
}
