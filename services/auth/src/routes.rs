//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use common::{error::ApiResult, extract::ApiJson, middleware::AuthUser};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AppState, service::Registration};

/// Request for account registration
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub primary_condition_id: Option<Uuid>,
}

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request for token refresh
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Request for the second login step
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorRequest {
    pub temp_token: String,
    pub code: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(
            state.jwt_service.clone(),
            common::middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", post(refresh_token))
        .route("/auth/2fa/verify", post(verify_two_factor))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.auth_service.health_check().await {
        Ok(true) => "ok",
        Ok(false) => "unavailable",
        Err(e) => {
            warn!("Database health check failed: {}", e);
            "unavailable"
        }
    };

    Json(serde_json::json!({
        "status": "ok",
        "service": "auth-service",
        "database": database
    }))
}

/// Account registration endpoint
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Registration attempt");

    let session = state
        .auth_service
        .register(Registration {
            email: payload.email,
            password: payload.password,
            display_name: payload.display_name,
            primary_condition_id: payload.primary_condition_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    Ok((StatusCode::OK, Json(outcome)))
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let tokens = state.auth_service.refresh(&payload.refresh_token).await?;
    Ok((StatusCode::OK, Json(tokens)))
}

/// Logout endpoint; ends every session of the caller
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<StatusCode> {
    state.auth_service.logout(user.id).await?;
    info!(user_id = %user.id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Two-factor verification endpoint
pub async fn verify_two_factor(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TwoFactorRequest>,
) -> ApiResult<StatusCode> {
    state
        .auth_service
        .verify_two_factor(&payload.temp_token, &payload.code)
        .await?;
    Ok(StatusCode::OK)
}
