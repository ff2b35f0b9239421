//! Authentication service models

pub mod refresh_token;
pub mod user;

// Re-export for convenience
pub use refresh_token::{NewRefreshToken, RefreshTokenOwner};
pub use user::{NewUser, Profile, User, UserSummary};
