//! Copilot service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use common::{
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::AuthUser,
};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::{
    models::{ChatRequest, HistoryQuery, Page},
    state::AppState,
};

/// Create the router for the copilot service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/copilot/chat", post(chat))
        .route("/copilot/history", get(get_history))
        .route(
            "/copilot/history/:id",
            get(get_conversation).delete(delete_conversation),
        )
        .route_layer(middleware::from_fn_with_state(
            state.jwt_service.clone(),
            common::middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.copilot_service.health_check().await {
        Ok(true) => "ok",
        Ok(false) => "unavailable",
        Err(e) => {
            warn!("Database health check failed: {}", e);
            "unavailable"
        }
    };

    Json(json!({
        "status": "ok",
        "service": "copilot-service",
        "database": database
    }))
}

/// Run one chat turn
pub async fn chat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<ChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = state
        .copilot_service
        .chat(user.id, &payload.message, payload.conversation_id)
        .await?;

    Ok(Json(response))
}

/// List the caller's conversations
pub async fn get_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<impl IntoResponse> {
    let conversations = state
        .copilot_service
        .history(user.id, Page::from(&query))
        .await?;

    Ok(Json(conversations))
}

/// Get one of the caller's conversations
pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let conversation = state.copilot_service.conversation(user.id, id).await?;
    Ok(Json(conversation))
}

/// Delete one of the caller's conversations
pub async fn delete_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state
        .copilot_service
        .delete_conversation(user.id, id)
        .await?;

    Ok(Json(json!({"message": "Conversation deleted"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        provider::{GeminiClient, LanguageModel, ProviderConfig},
        service::{DISCLAIMER, test_support},
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use common::{
        jwt::{JwtConfig, JwtService},
        role::Role,
    };
    use serde_json::Value;
    use std::{sync::Arc, time::Duration};
    use tower::ServiceExt;

    fn jwt() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "copilot-test-secret".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            two_factor_token_expiry: 300,
        })
        .unwrap()
    }

    fn app_with(model: Arc<dyn LanguageModel>) -> Router {
        let harness = test_support::harness(model);
        create_router(AppState {
            copilot_service: harness.service,
            jwt_service: jwt(),
        })
    }

    /// No API key configured, so every reply is the configuration reminder
    fn app() -> Router {
        let client = GeminiClient::new(ProviderConfig {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        app_with(Arc::new(client))
    }

    fn bearer(user_id: Uuid) -> String {
        let token = jwt()
            .generate_access_token(user_id, "alice@example.com", Role::Patient)
            .unwrap();
        format!("Bearer {}", token)
    }

    fn request(method: &str, uri: &str, user_id: Uuid, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, bearer(user_id));

        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_chat_without_api_key_returns_reminder() {
        let app = app();
        let user_id = Uuid::new_v4();

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/copilot/chat",
                user_id,
                Some(json!({"message": "What is Lyme disease?"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["conversationId"].is_string());
        assert_eq!(body["disclaimer"], DISCLAIMER);
        assert_eq!(body["message"]["role"], "assistant");
        assert_eq!(body["message"]["sources"], json!([]));
        let content = body["message"]["content"].as_str().unwrap();
        assert!(content.contains("Please configure the GOOGLE_AI_API_KEY environment variable"));
        assert!(content.contains(DISCLAIMER));
    }

    #[tokio::test]
    async fn test_history_and_conversation_lifecycle() {
        let app = app_with(Arc::new(test_support::ScriptedModel::replying("Hello!")));
        let user_id = Uuid::new_v4();

        let (_, created) = send(
            &app,
            request(
                "POST",
                "/copilot/chat",
                user_id,
                Some(json!({"message": "Hello"})),
            ),
        )
        .await;
        let id = created["conversationId"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/copilot/chat",
                user_id,
                Some(json!({"message": "More", "conversationId": id})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["conversationId"], id.as_str());

        let (status, history) = send(
            &app,
            request("GET", "/copilot/history?page=1&limit=10", user_id, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["title"], "Hello");
        assert!(history[0].get("messages").is_none());
        assert!(history[0]["updatedAt"].is_string());

        let (status, conversation) = send(
            &app,
            request("GET", &format!("/copilot/history/{}", id), user_id, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(conversation["messages"].as_array().unwrap().len(), 4);

        let (status, deleted) = send(
            &app,
            request("DELETE", &format!("/copilot/history/{}", id), user_id, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["message"], "Conversation deleted");

        let (status, body) = send(
            &app,
            request("GET", &format!("/copilot/history/{}", id), user_id, None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Conversation not found");
    }

    #[tokio::test]
    async fn test_other_users_conversation_is_not_found() {
        let app = app();
        let owner = Uuid::new_v4();
        let (_, created) = send(
            &app,
            request(
                "POST",
                "/copilot/chat",
                owner,
                Some(json!({"message": "Hello"})),
            ),
        )
        .await;
        let uri = format!(
            "/copilot/history/{}",
            created["conversationId"].as_str().unwrap()
        );

        let (status, _) = send(&app, request("GET", &uri, Uuid::new_v4(), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            request(
                "POST",
                "/copilot/chat",
                Uuid::new_v4(),
                Some(json!({"message": "Hi", "conversationId": created["conversationId"]})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_message_is_bad_request() {
        let app = app();
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/copilot/chat",
                Uuid::new_v4(),
                Some(json!({"message": "   "})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is required");
    }

    #[tokio::test]
    async fn test_malformed_requests_get_json_errors() {
        let app = app();
        let user_id = Uuid::new_v4();

        let (status, body) = send(
            &app,
            request("POST", "/copilot/chat", user_id, Some(json!({"msg": "hi"}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("missing field `message`"));

        let (status, body) = send(
            &app,
            request("GET", "/copilot/history/not-a-uuid", user_id, None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(
            &app,
            request("DELETE", "/copilot/history/not-a-uuid", user_id, None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(
            &app,
            request("GET", "/copilot/history?limit=abc", user_id, None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_routes_require_access_token() {
        let app = app();

        let anonymous = Request::builder()
            .uri("/copilot/history")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, anonymous).await.0, StatusCode::UNAUTHORIZED);

        let refresh = jwt()
            .generate_refresh_token(Uuid::new_v4(), "alice@example.com", Role::Patient)
            .unwrap();
        let with_refresh = Request::builder()
            .uri("/copilot/history")
            .header(header::AUTHORIZATION, format!("Bearer {}", refresh))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, with_refresh).await.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "copilot-service");
    }
}
