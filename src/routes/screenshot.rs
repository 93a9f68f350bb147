/**
 * Screenshot Routes
 * Capture a live page screenshot and import it as an owned asset
 */
use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::auth::require_session;
use crate::screenshot::{self, ScreenshotConfig};
use crate::storage::ASSET_STORE;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub url: String,
    /// Path or URL of a previously stored screenshot to replace.
    #[serde(default)]
    pub previous: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub url: String,
    pub path: String,
}

/// POST /api/screenshot - Capture a screenshot of the given URL (session
/// required). Replaces `previous` when provided.
pub async fn capture_screenshot(
    headers: HeaderMap,
    Json(payload): Json<CaptureRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&headers)?;

    if payload.url.trim().is_empty() {
        return Err(ApiError::Validation("url is required".to_string()));
    }

    let config = ScreenshotConfig::from_env();
    let asset = screenshot::capture(
        &config,
        &ASSET_STORE,
        &payload.url,
        payload.previous.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CaptureResponse {
            url: asset.url,
            path: asset.path,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn screenshot_router() -> Router {
        Router::new().route("/api/screenshot", post(capture_screenshot))
    }

    #[tokio::test]
    async fn test_capture_requires_session() {
        let body = serde_json::to_vec(&CaptureRequest {
            url: "https://example.com".into(),
            previous: None,
        })
        .unwrap();
        let req = Request::post("/api/screenshot")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = screenshot_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_capture_rejects_empty_url() {
        let body = serde_json::to_vec(&CaptureRequest {
            url: "   ".into(),
            previous: None,
        })
        .unwrap();
        let req = Request::post("/api/screenshot")
            .header("content-type", "application/json")
            .header("cookie", crate::routes::testutil::session_cookie_header())
            .body(Body::from(body))
            .unwrap();
        let res = screenshot_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_capture_rejects_malformed_url() {
        let body = serde_json::to_vec(&CaptureRequest {
            url: "not a url".into(),
            previous: None,
        })
        .unwrap();
        let req = Request::post("/api/screenshot")
            .header("content-type", "application/json")
            .header("cookie", crate::routes::testutil::session_cookie_header())
            .body(Body::from(body))
            .unwrap();
        let res = screenshot_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
