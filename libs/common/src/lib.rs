//! Common library for the HealBridge services
//!
//! This crate provides functionality shared by the auth and copilot
//! services: database connectivity and migrations, environment
//! configuration, error handling and request extractors, token signing
//! and verification, the bearer-token middleware and the audit trail.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     println!("Database health check: {}", health_check(&pool).await?);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod database;
pub mod error;
pub mod extract;
pub mod jwt;
pub mod middleware;
pub mod role;
pub mod settings;
