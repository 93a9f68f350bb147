//! Portfolio Admin Backend - library for app logic and testing

pub mod db;
pub mod error;
pub mod extract;
pub mod genai;
pub mod logging;
pub mod routes;
pub mod screenshot;
pub mod storage;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
/// Falls back to allowing the local dev frontend.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                "http://localhost:3000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app() -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/verify", post(routes::auth::verify))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route(
            "/api/profile",
            get(routes::profile::get_profile).put(routes::profile::upsert_profile),
        )
        .route(
            "/api/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/api/projects/{id}",
            axum::routing::patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/api/blog",
            get(routes::blog::list_posts).post(routes::blog::create_post),
        )
        // GET addresses posts by slug; PATCH/DELETE address them by id.
        .route(
            "/api/blog/{slug_or_id}",
            get(routes::blog::get_post)
                .patch(routes::blog::update_post)
                .delete(routes::blog::delete_post),
        )
        .route(
            "/api/assets",
            post(routes::assets::upload_asset).delete(routes::assets::delete_asset),
        )
        .route(
            "/api/screenshot",
            post(routes::screenshot::capture_screenshot),
        )
        .route("/api/generate/blog", post(routes::generate::generate_blog))
        .route("/api/generate/bio", post(routes::generate::generate_bio))
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/storage", get(routes::health::health_storage))
        .route("/health/ready", get(routes::health::health_ready))
        .nest_service("/uploads", ServeDir::new(storage::ASSET_STORE.root()))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        // Global 8 MB request body cap; image uploads are re-checked
        // against their own 5 MB limit after multipart decoding
        .layer(RequestBodyLimitLayer::new(8 * 1024 * 1024))
        .layer(cors)
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Held until shutdown so the non-blocking log writers keep flushing.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    // Refuse to start in production with the insecure default session secret.
    let environment = std::env::var("ENVIRONMENT").unwrap_or_default();
    if environment == "production" {
        let secret = std::env::var("SESSION_JWT_SECRET").unwrap_or_default();
        if secret.is_empty() || secret == "default-session-secret-change-in-production" {
            panic!(
                "FATAL: SESSION_JWT_SECRET must be set to a secure, unique value in production. \
                 Refusing to start with the default secret."
            );
        }

        if std::env::var("SCREENSHOT_API_KEY").is_err() {
            tracing::warn!(
                "SCREENSHOT_API_KEY is not set. Screenshot capture requests will be \
                 rejected by the provider."
            );
        }
        if std::env::var("GENAI_API_KEY").is_err() {
            tracing::warn!(
                "GENAI_API_KEY is not set. Content generation requests will be \
                 rejected by the provider."
            );
        }
    }

    // The asset root must exist before ServeDir and uploads touch it.
    if let Err(e) = tokio::fs::create_dir_all(storage::ASSET_STORE.root()).await {
        tracing::error!("Failed to create asset directory: {}", e);
    }

    if std::env::var("DATABASE_URL").is_ok() {
        match db::init_pool(None).await {
            Ok(pool) => {
                if let Err(e) = db::run_migrations(&pool).await {
                    tracing::error!("Failed to run database migrations: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize database pool: {}. Continuing without database.",
                    e
                );
            }
        }
    } else {
        tracing::info!("DATABASE_URL not set. Running without database connection.");
    }

    let app = create_app();

    // Bind address is configurable via HOST / PORT env vars, defaulting to
    // 127.0.0.1:3001 so existing dev setups keep working unchanged.
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3001);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid HOST/PORT configuration");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_create_app_returns_router() {
        let _app = create_app();
    }

    #[tokio::test]
    async fn test_health_route_is_wired() {
        let app = create_app();
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_routes_reject_anonymous_requests() {
        for (method, uri, body) in [
            ("POST", "/api/screenshot", r#"{"url":"https://example.com"}"#),
            ("POST", "/api/generate/bio", r#"{"currentBio":"hi"}"#),
            ("PUT", "/api/profile", r#"{"name":"A","title":"B"}"#),
        ] {
            let app = create_app();
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap();
            let res = app.oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        }
    }
}
