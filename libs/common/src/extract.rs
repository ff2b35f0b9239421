//! Request extractors whose rejections use the `{"error": ...}` body
//!
//! axum's own `Json`, `Path` and `Query` reject with plain text. These
//! wrappers run the same extraction and turn a rejection into
//! `ApiError::BadRequest`.

use axum::{
    Json, async_trait,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
};
use tracing::debug;

use crate::error::ApiError;

/// JSON request body
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

/// Typed path parameters
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

/// Typed query string
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!("Rejected path: {}", rejection.body_text());
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        debug!("Rejected query string: {}", rejection.body_text());
        ApiError::BadRequest(rejection.body_text())
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{self, StatusCode},
        routing::{get, post},
    };
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[derive(Deserialize)]
    struct Greeting {
        name: String,
    }

    #[derive(Deserialize)]
    struct Paging {
        limit: Option<i64>,
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/greet",
                post(|ApiJson(body): ApiJson<Greeting>| async move { body.name }),
            )
            .route(
                "/items/:id",
                get(|ApiPath(id): ApiPath<Uuid>| async move { id.to_string() }),
            )
            .route(
                "/items",
                get(|ApiQuery(q): ApiQuery<Paging>| async move {
                    q.limit.unwrap_or_default().to_string()
                }),
            )
    }

    async fn send(req: http::Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn error_of(bytes: &[u8]) -> String {
        let body: Value = serde_json::from_slice(bytes).unwrap();
        body["error"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_valid_requests_pass_through() {
        let req = http::Request::post("/greet")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"alice"}"#))
            .unwrap();
        assert_eq!(send(req).await, (StatusCode::OK, b"alice".to_vec()));

        let req = http::Request::get("/items?limit=5").body(Body::empty()).unwrap();
        assert_eq!(send(req).await, (StatusCode::OK, b"5".to_vec()));
    }

    #[tokio::test]
    async fn test_missing_field_is_json_bad_request() {
        let req = http::Request::post("/greet")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"nom":"alice"}"#))
            .unwrap();
        let (status, bytes) = send(req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error_of(&bytes).contains("missing field `name`"));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_json_bad_request() {
        let req = http::Request::post("/greet")
            .body(Body::from(r#"{"name":"alice"}"#))
            .unwrap();
        let (status, bytes) = send(req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!error_of(&bytes).is_empty());
    }

    #[tokio::test]
    async fn test_bad_path_and_query_are_json_bad_requests() {
        let req = http::Request::get("/items/not-a-uuid")
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!error_of(&bytes).is_empty());

        let req = http::Request::get("/items?limit=abc")
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!error_of(&bytes).is_empty());
    }
}
