/**
 * Authentication Routes
 * Session-cookie auth derived from an identity-provider bearer token
 */
use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

// ============================================================================
// Configuration
// ============================================================================

lazy_static::lazy_static! {
    /// Secret used to verify identity tokens (hardened variant: the raw
    /// token stored in the session cookie is a signed JWT).
    pub static ref SESSION_JWT_SECRET: String = std::env::var("SESSION_JWT_SECRET")
        .unwrap_or_else(|_| "default-session-secret-change-in-production".to_string());
}

/// Session cookie name.
pub const SESSION_COOKIE: &str = "session";

/// Session lifetime: 5 days.
const SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 5;

// ============================================================================
// Types
// ============================================================================

/// Claims carried by an identity token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // User ID
    pub exp: i64,    // Expiry timestamp
    pub iat: i64,    // Issued at timestamp
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Verify and decode an identity token.
pub fn verify_identity_token(token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(SESSION_JWT_SECRET.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::InvalidAuth)
}

/// Extract bearer token from the Authorization header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Extract the session cookie value from the Cookie header.
pub fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Session gate shared by every admin handler: a session cookie must be
/// present and its token must verify.
pub fn require_session(headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = session_from_headers(headers).ok_or(ApiError::MissingAuth)?;
    verify_identity_token(&token)
}

fn is_production() -> bool {
    std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
}

fn session_cookie(token: &str, max_age: i64) -> HeaderValue {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token, max_age
    );
    if is_production() {
        cookie.push_str("; Secure");
    }
    // Token is base64url JWT material, always a valid header value.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
/// Accepts `Authorization: Bearer <identity-token>`; on successful
/// verification stores the raw token as the session cookie.
pub async fn login(headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let token = extract_bearer_token(&headers).ok_or(ApiError::MissingAuth)?;
    let claims = verify_identity_token(&token)?;

    tracing::info!("session opened for uid {}", claims.sub);

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        session_cookie(&token, SESSION_MAX_AGE_SECS),
    );

    Ok((
        StatusCode::OK,
        response_headers,
        Json(AuthResponse {
            success: true,
            uid: Some(claims.sub),
        }),
    ))
}

/// POST /api/auth/verify
/// The bearer token must match the session cookie and verify.
pub async fn verify(headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let token = extract_bearer_token(&headers).ok_or(ApiError::MissingAuth)?;
    let session = session_from_headers(&headers).ok_or(ApiError::MissingAuth)?;

    if token != session {
        return Err(ApiError::InvalidAuth);
    }

    let claims = verify_identity_token(&token)?;
    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            success: true,
            uid: Some(claims.sub),
        }),
    ))
}

/// POST /api/auth/logout
/// Clears the session cookie; idempotent.
pub async fn logout() -> impl IntoResponse {
    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, session_cookie("", 0));

    (
        StatusCode::OK,
        response_headers,
        Json(AuthResponse {
            success: true,
            uid: None,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    use crate::routes::testutil::test_token;

    fn auth_router() -> Router {
        Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/verify", post(verify))
            .route("/api/auth/logout", post(logout))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, axum::body::Bytes) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, bytes)
    }

    #[test]
    fn test_session_from_headers_parses_cookie_list() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc123; other=1"),
        );
        assert_eq!(session_from_headers(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_require_session_rejects_missing_cookie() {
        let headers = HeaderMap::new();
        assert!(matches!(
            require_session(&headers),
            Err(ApiError::MissingAuth)
        ));
    }

    #[test]
    fn test_require_session_rejects_garbage_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("session=not.a.jwt"),
        );
        assert!(matches!(
            require_session(&headers),
            Err(ApiError::InvalidAuth)
        ));
    }

    #[test]
    fn test_require_session_accepts_valid_token() {
        let mut headers = HeaderMap::new();
        let cookie = format!("session={}", test_token("user-1"));
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        let claims = require_session(&headers).unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[tokio::test]
    async fn test_login_without_bearer_returns_unauthorized() {
        let req = Request::post("/api/auth/login").body(Body::empty()).unwrap();
        let (status, _, _) = send(auth_router(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_with_invalid_token_returns_unauthorized() {
        let req = Request::post("/api/auth/login")
            .header("authorization", "Bearer garbage")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(auth_router(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_sets_session_cookie() {
        let token = test_token("user-42");
        let req = Request::post("/api/auth/login")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, headers, bytes) = send(auth_router(), req).await;
        assert_eq!(status, StatusCode::OK);

        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("session={}", token)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=432000"));
        assert!(cookie.contains("Path=/"));

        let body: AuthResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.success);
        assert_eq!(body.uid.as_deref(), Some("user-42"));
    }

    #[tokio::test]
    async fn test_verify_requires_matching_cookie() {
        let token = test_token("user-1");
        let req = Request::post("/api/auth/verify")
            .header("authorization", format!("Bearer {}", token))
            .header(header::COOKIE, "session=some-other-token")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(auth_router(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_verify_with_matching_session_succeeds() {
        let token = test_token("user-1");
        let req = Request::post("/api/auth/verify")
            .header("authorization", format!("Bearer {}", token))
            .header(header::COOKIE, format!("session={}", token))
            .body(Body::empty())
            .unwrap();
        let (status, _, bytes) = send(auth_router(), req).await;
        assert_eq!(status, StatusCode::OK);
        let body: AuthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.uid.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let req = Request::post("/api/auth/logout").body(Body::empty()).unwrap();
        let (status, headers, _) = send(auth_router(), req).await;
        assert_eq!(status, StatusCode::OK);
        let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
