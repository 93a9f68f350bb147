//! Screenshot ingestion pipeline.
//!
//! Given a project URL, the external rendering API captures a 1920x1080
//! JPEG and hands back a result URL; the bytes are fetched and re-uploaded
//! into the owned asset store so entity records never reference the
//! provider's ephemeral URLs. The caller keeps the returned asset as
//! draft state; no document write happens here.

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{ApiError, UpstreamKind};
use crate::storage::{sanitize_segment, AssetStore, StoredAsset};

const DEFAULT_API_URL: &str = "https://api.screenshotone.com/take";

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

#[derive(Debug, Clone)]
pub struct ScreenshotConfig {
    pub api_url: String,
    pub access_key: String,
}

impl ScreenshotConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: std::env::var("SCREENSHOT_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            access_key: std::env::var("SCREENSHOT_API_KEY").unwrap_or_default(),
        }
    }
}

/// Provider success body: `{"url": "<image-location>"}`.
#[derive(Debug, Deserialize)]
struct RenderResponse {
    url: String,
}

/// Object key for a captured screenshot, keyed by timestamp plus the
/// sanitized target so neighbouring captures stay distinguishable.
fn screenshot_hint(target: &reqwest::Url) -> String {
    let mut name = target.host_str().unwrap_or("site").to_string();
    let path = target.path().trim_matches('/');
    if !path.is_empty() {
        name.push('-');
        name.push_str(path);
    }
    format!("screenshots/{}.jpg", sanitize_segment(&name))
}

/// Capture `target_url` and persist the image through `store`.
///
/// `previous` is the asset reference being replaced, if any; it is
/// cleaned up best-effort before the new capture so a quota-constrained
/// store is not holding two copies. Every failure is terminal for this
/// attempt — the caller's prior draft state stays untouched.
pub async fn capture(
    config: &ScreenshotConfig,
    store: &AssetStore,
    target_url: &str,
    previous: Option<&str>,
) -> Result<StoredAsset, ApiError> {
    // Fail fast before any network call.
    let target = reqwest::Url::parse(target_url)
        .map_err(|_| ApiError::InvalidUrl(target_url.to_string()))?;

    if let Some(prev) = previous {
        store.cleanup(prev).await;
    }

    let response = HTTP_CLIENT
        .get(&config.api_url)
        .query(&[
            ("access_key", config.access_key.as_str()),
            ("url", target.as_str()),
            ("format", "jpeg"),
            ("quality", "100"),
            ("width", "1920"),
            ("height", "1080"),
            ("block_ads", "true"),
            ("block_trackers", "true"),
            ("fresh", "true"),
            ("response_type", "json"),
        ])
        .send()
        .await
        .map_err(|e| ApiError::UpstreamUnreachable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        // Distinct reportable categories, never retried; on 401 zero
        // image bytes have been transferred.
        return Err(ApiError::Upstream {
            provider: "screenshot api",
            status: status.as_u16(),
            kind: UpstreamKind::from_status(status.as_u16()),
        });
    }

    let render: RenderResponse = response
        .json()
        .await
        .map_err(|e| ApiError::UpstreamUnreachable(e.to_string()))?;

    let image = HTTP_CLIENT
        .get(&render.url)
        .send()
        .await
        .map_err(|e| ApiError::Download(e.to_string()))?;

    if !image.status().is_success() {
        return Err(ApiError::Download(format!(
            "image fetch returned status {}",
            image.status()
        )));
    }

    let bytes = image
        .bytes()
        .await
        .map_err(|e| ApiError::Download(e.to_string()))?;

    if bytes.is_empty() {
        return Err(ApiError::Download("image payload was empty".to_string()));
    }

    let asset = store.upload(&screenshot_hint(&target), &bytes).await?;
    tracing::info!(
        target = %target,
        path = %asset.path,
        size = bytes.len(),
        "screenshot captured"
    );

    Ok(asset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unparseable_url_fails_before_any_network_call() {
        let config = ScreenshotConfig {
            api_url: "http://127.0.0.1:1/take".into(),
            access_key: "k".into(),
        };
        let store = AssetStore::new("uploads", "/uploads");
        match capture(&config, &store, "not a url", None).await {
            Err(ApiError::InvalidUrl(u)) => assert_eq!(u, "not a url"),
            other => panic!("expected InvalidUrl, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_screenshot_hint_keys_by_host_and_path() {
        let url = reqwest::Url::parse("https://example.com/my/app/").unwrap();
        assert_eq!(screenshot_hint(&url), "screenshots/example.com-my-app.jpg");

        let bare = reqwest::Url::parse("https://example.com").unwrap();
        assert_eq!(screenshot_hint(&bare), "screenshots/example.com.jpg");
    }

    #[test]
    fn test_provider_status_categories() {
        assert_eq!(UpstreamKind::from_status(401), UpstreamKind::AuthInvalid);
        assert_eq!(UpstreamKind::from_status(402), UpstreamKind::QuotaExceeded);
        assert_eq!(UpstreamKind::from_status(422), UpstreamKind::BadParameters);
        assert_eq!(UpstreamKind::from_status(503), UpstreamKind::Other);
    }

    async fn spawn_provider(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn stored_object_count(root: &std::path::Path) -> usize {
        let mut count = 0;
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    count += 1;
                }
            }
        }
        count
    }

    #[tokio::test]
    async fn test_provider_401_maps_to_auth_invalid_with_no_bytes_stored() {
        let app = axum::Router::new().route(
            "/take",
            axum::routing::get(|| async { axum::http::StatusCode::UNAUTHORIZED }),
        );
        let base = spawn_provider(app).await;

        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), "/uploads");
        let config = ScreenshotConfig {
            api_url: format!("{}/take", base),
            access_key: "bad-key".into(),
        };

        match capture(&config, &store, "https://example.com", None).await {
            Err(ApiError::Upstream { status, kind, .. }) => {
                assert_eq!(status, 401);
                assert_eq!(kind, UpstreamKind::AuthInvalid);
            }
            other => panic!("expected Upstream, got {:?}", other.map(|_| ())),
        }
        assert_eq!(stored_object_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_empty_image_body_is_download_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let image_url = format!("http://{}/image", addr);

        let app = axum::Router::new()
            .route(
                "/take",
                axum::routing::get(move || {
                    let url = image_url.clone();
                    async move { axum::Json(serde_json::json!({ "url": url })) }
                }),
            )
            .route("/image", axum::routing::get(|| async { "" }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), "/uploads");
        let config = ScreenshotConfig {
            api_url: format!("http://{}/take", addr),
            access_key: "k".into(),
        };

        match capture(&config, &store, "https://example.com", None).await {
            Err(ApiError::Download(msg)) => assert!(msg.contains("empty")),
            other => panic!("expected Download, got {:?}", other.map(|_| ())),
        }
        assert_eq!(stored_object_count(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_successful_capture_stores_the_fetched_bytes() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let image_url = format!("http://{}/image", addr);

        let app = axum::Router::new()
            .route(
                "/take",
                axum::routing::get(move || {
                    let url = image_url.clone();
                    async move { axum::Json(serde_json::json!({ "url": url })) }
                }),
            )
            .route("/image", axum::routing::get(|| async { "jpeg-bytes" }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path(), "/uploads");
        let config = ScreenshotConfig {
            api_url: format!("http://{}/take", addr),
            access_key: "k".into(),
        };

        let asset = capture(&config, &store, "https://example.com/app", None)
            .await
            .unwrap();
        assert!(asset.path.starts_with("screenshots/"));
        assert!(asset.path.ends_with("-example.com-app.jpg"));
        assert_eq!(stored_object_count(dir.path()), 1);
    }
}
