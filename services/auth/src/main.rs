use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod error;
mod models;
mod password;
mod repositories;
mod routes;
mod service;
mod tokens;
mod validation;

use common::{
    audit::PgAuditLog,
    database::{self, DatabaseConfig},
    jwt::{JwtConfig, JwtService},
};

use crate::{
    password::{PasswordConfig, PasswordService},
    repositories::{PgRefreshTokenRepository, PgUserRepository},
    service::AuthService,
    tokens::TokenService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub jwt_service: JwtService,
}

/// Process-level settings for the auth service
struct ServerConfig {
    bind_address: String,
    purge_interval: Duration,
}

impl ServerConfig {
    /// # Environment Variables
    /// - `AUTH_BIND_ADDRESS`: listen address (default: 0.0.0.0:3000)
    /// - `REFRESH_TOKEN_PURGE_INTERVAL`: seconds between expired-token sweeps (default: 3600)
    fn from_env() -> Result<Self> {
        let settings = common::settings::load(&[
            ("auth_bind_address", "0.0.0.0:3000"),
            ("refresh_token_purge_interval", "3600"),
        ])?;

        Ok(Self {
            bind_address: settings.get("auth_bind_address")?,
            purge_interval: Duration::from_secs(
                settings.get::<u64>("refresh_token_purge_interval")?.max(1),
            ),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting authentication service");

    let server_config = ServerConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    database::run_migrations(&pool).await?;

    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;
    let password_service = PasswordService::new(&PasswordConfig::from_env()?)?;

    let token_service = TokenService::new(
        jwt_service.clone(),
        Arc::new(PgRefreshTokenRepository::new(pool.clone())),
    );
    let auth_service = AuthService::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        token_service,
        password_service,
        Arc::new(PgAuditLog::new(pool)),
    );

    spawn_token_purge(auth_service.clone(), server_config.purge_interval);

    let app_state = AppState {
        auth_service,
        jwt_service,
    };

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_address).await?;
    info!(
        "Authentication service listening on {}",
        server_config.bind_address
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically delete refresh tokens past their expiry
fn spawn_token_purge(auth_service: AuthService, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match auth_service.purge_expired_tokens().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "Purged expired refresh tokens"),
                Err(e) => warn!("Refresh token purge failed: {}", e),
            }
        }
    });
}
