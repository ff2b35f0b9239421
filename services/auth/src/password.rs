//! Password hashing with Argon2id
//!
//! Hashing and verification are CPU-bound by design, so both run on the
//! blocking thread pool.

use anyhow::Result;
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use std::sync::Arc;

/// Argon2 cost configuration
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
}

impl PasswordConfig {
    /// Create a new PasswordConfig from environment variables
    ///
    /// # Environment Variables
    /// - `PASSWORD_HASH_MEMORY_KIB`: Argon2 memory cost (default: 19456)
    /// - `PASSWORD_HASH_ITERATIONS`: Argon2 time cost (default: 4)
    pub fn from_env() -> Result<Self> {
        let settings = common::settings::load(&[
            ("password_hash_memory_kib", "19456"),
            ("password_hash_iterations", "4"),
        ])?;

        Ok(Self {
            memory_kib: settings.get("password_hash_memory_kib")?,
            iterations: settings.get("password_hash_iterations")?,
        })
    }
}

/// Salted one-way password hashing
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    /// Verified against when the account does not exist, so that unknown
    /// emails cost as much as wrong passwords
    dummy_hash: Arc<str>,
}

impl PasswordService {
    pub fn new(config: &PasswordConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, 1, None)
            .map_err(|e| anyhow::anyhow!("Invalid Argon2 parameters: {}", e))?;
        let dummy_hash = hash_with(&params, "healbridge-timing-equalizer")?;

        Ok(Self {
            params,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// Hash a plaintext password into a PHC string
    pub async fn hash(&self, password: &str) -> Result<String> {
        let params = self.params.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_with(&params, &password)).await?
    }

    /// Check a plaintext password against a stored PHC string
    pub async fn verify(&self, password: &str, password_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        tokio::task::spawn_blocking(move || verify_with(&password, &password_hash)).await?
    }

    /// Burn one verification for a login whose account does not exist
    pub async fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash).await;
    }
}

fn hash_with(params: &Params, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(password_hash)
}

fn verify_with(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    // Cost parameters come from the PHC string itself
    let result = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    Ok(result.is_ok())
}

#[cfg(test)]
pub(crate) fn fast_for_tests() -> PasswordService {
    PasswordService::new(&PasswordConfig {
        memory_kib: 8,
        iterations: 1,
    })
    .unwrap()
}
