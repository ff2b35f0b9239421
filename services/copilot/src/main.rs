use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod error;
mod models;
mod provider;
mod repositories;
mod routes;
mod service;
mod state;

use common::{
    audit::PgAuditLog,
    database::{self, DatabaseConfig},
    jwt::{JwtConfig, JwtService},
};

use crate::{
    provider::{GeminiClient, ProviderConfig},
    repositories::{PgConversationRepository, PgProfileRepository},
    service::CopilotService,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting copilot service");

    let settings = common::settings::load(&[("copilot_bind_address", "0.0.0.0:3001")])?;
    let bind_address: String = settings.get("copilot_bind_address")?;

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

    let provider_config = ProviderConfig::from_env()?;
    if provider_config.usable_api_key().is_none() {
        info!("GOOGLE_AI_API_KEY not set; chat replies will ask for configuration");
    }
    let provider_timeout = provider_config.timeout;
    let model = GeminiClient::new(provider_config)?;

    let copilot_service = CopilotService::new(
        Arc::new(PgConversationRepository::new(pool.clone())),
        Arc::new(PgProfileRepository::new(pool.clone())),
        Arc::new(model),
        Arc::new(PgAuditLog::new(pool)),
        provider_timeout,
    );

    let app_state = AppState {
        copilot_service,
        jwt_service,
    };

    info!("Copilot service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Copilot service listening on {}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
