//! Middleware for JWT token validation and authentication

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;
use uuid::Uuid;

use crate::{error::ApiError, jwt::JwtService, role::Role};

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Validate the bearer access token and expose the caller as an `AuthUser`
/// request extension
pub async fn auth_middleware(
    State(jwt_service): State<JwtService>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(ApiError::unauthorized)?;

    let claims = jwt_service
        .validate_access_token(bearer.token())
        .map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            ApiError::unauthorized()
        })?;

    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::JwtConfig;
    use axum::{
        Extension, Router,
        http::{StatusCode, header},
        middleware,
        routing::get,
    };
    use tower::ServiceExt;

    fn jwt() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "middleware-test-secret".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            two_factor_token_expiry: 300,
        })
        .unwrap()
    }

    fn app(jwt: JwtService) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|Extension(user): Extension<AuthUser>| async move { user.email }),
            )
            .route_layer(middleware::from_fn_with_state(jwt, auth_middleware))
    }

    async fn call(app: Router, authorization: Option<String>) -> (StatusCode, String) {
        let mut request = Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_access_token_passes() {
        let jwt = jwt();
        let token = jwt
            .generate_access_token(Uuid::new_v4(), "alice@example.com", Role::Patient)
            .unwrap();

        let (status, body) = call(app(jwt), Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice@example.com");
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let (status, body) = call(app(jwt()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_unauthorized() {
        let (status, _) = call(app(jwt()), Some("Basic YWxpY2U6c2VjcmV0".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_a_bearer_credential() {
        let jwt = jwt();
        let token = jwt
            .generate_refresh_token(Uuid::new_v4(), "alice@example.com", Role::Patient)
            .unwrap();

        let (status, _) = call(app(jwt), Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
