/**
 * Profile Routes
 * Public profile read plus the session-gated upsert editor endpoint
 */
use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use std::collections::HashSet;

use crate::db::{
    self,
    models::{Profile, SocialLink},
};
use crate::error::ApiError;
use crate::routes::auth::require_session;
use crate::storage::ASSET_STORE;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for PUT /api/profile (upsert)
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProfileRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub avatar_path: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub social_links: Vec<SocialLink>,
}

const PROFILE_COLUMNS: &str = "user_id, name, title, bio, avatar_url, avatar_path, \
     skills, social_links, updated_at";

/// Social link ids must be unique within the list.
fn validate_social_links(links: &[SocialLink]) -> Result<(), ApiError> {
    let mut seen = HashSet::new();
    for link in links {
        if link.id.trim().is_empty() {
            return Err(ApiError::Validation(
                "social link id is required".to_string(),
            ));
        }
        if !seen.insert(link.id.as_str()) {
            return Err(ApiError::Validation(format!(
                "duplicate social link id '{}'",
                link.id
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/profile - The site owner's profile (public). Single-owner
/// deployment: the most recently updated row is the profile.
pub async fn get_profile() -> Result<impl IntoResponse, ApiError> {
    let pool = db::get_pool().ok_or(ApiError::DbUnavailable)?;

    let profile = sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profile ORDER BY updated_at DESC LIMIT 1"
    ))
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok((StatusCode::OK, Json(profile)))
}

/// PUT /api/profile - Upsert the profile owned by the session uid
/// (session required). Never hard-deletes.
pub async fn upsert_profile(
    headers: HeaderMap,
    Json(payload): Json<UpsertProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = require_session(&headers)?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    validate_social_links(&payload.social_links)?;

    let pool = db::get_pool().ok_or(ApiError::DbUnavailable)?;

    // A replaced avatar leaves its old object behind; clean it up
    // best-effort before writing the new reference.
    let previous: Option<(String,)> =
        sqlx::query_as("SELECT avatar_path FROM profile WHERE user_id = $1")
            .bind(&claims.sub)
            .fetch_optional(pool.as_ref())
            .await?;
    if let Some((old_path,)) = previous {
        if !old_path.is_empty() && old_path != payload.avatar_path {
            ASSET_STORE.cleanup(&old_path).await;
        }
    }

    let profile = sqlx::query_as::<_, Profile>(&format!(
        r#"
        INSERT INTO profile
            (user_id, name, title, bio, avatar_url, avatar_path, skills,
             social_links, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
        ON CONFLICT (user_id) DO UPDATE SET
            name = EXCLUDED.name,
            title = EXCLUDED.title,
            bio = EXCLUDED.bio,
            avatar_url = EXCLUDED.avatar_url,
            avatar_path = EXCLUDED.avatar_path,
            skills = EXCLUDED.skills,
            social_links = EXCLUDED.social_links,
            updated_at = now()
        RETURNING {PROFILE_COLUMNS}
        "#
    ))
    .bind(&claims.sub)
    .bind(payload.name.trim())
    .bind(payload.title.trim())
    .bind(payload.bio.trim())
    .bind(&payload.avatar_url)
    .bind(&payload.avatar_path)
    .bind(SqlJson(&payload.skills))
    .bind(SqlJson(&payload.social_links))
    .fetch_one(pool.as_ref())
    .await?;

    Ok((StatusCode::OK, Json(profile)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn profile_router() -> Router {
        Router::new().route("/api/profile", get(get_profile).put(upsert_profile))
    }

    fn link(id: &str) -> SocialLink {
        SocialLink {
            id: id.to_string(),
            platform: "GitHub".to_string(),
            url: "https://github.com/me".to_string(),
            icon: String::new(),
        }
    }

    #[test]
    fn test_social_link_ids_must_be_unique() {
        assert!(validate_social_links(&[link("a"), link("b")]).is_ok());
        assert!(matches!(
            validate_social_links(&[link("a"), link("a")]),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validate_social_links(&[link("")]),
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_upsert_profile_requires_session() {
        let body = serde_json::to_vec(&UpsertProfileRequest {
            name: "Dev".into(),
            ..Default::default()
        })
        .unwrap();
        let req = Request::put("/api/profile")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = profile_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_upsert_profile_missing_name_returns_bad_request() {
        let req = Request::put("/api/profile")
            .header("content-type", "application/json")
            .header("cookie", crate::routes::testutil::session_cookie_header())
            .body(Body::from(
                serde_json::to_vec(&UpsertProfileRequest::default()).unwrap(),
            ))
            .unwrap();
        let res = profile_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upsert_profile_duplicate_link_ids_rejected() {
        let body = serde_json::to_vec(&UpsertProfileRequest {
            name: "Dev".into(),
            social_links: vec![link("gh"), link("gh")],
            ..Default::default()
        })
        .unwrap();
        let req = Request::put("/api/profile")
            .header("content-type", "application/json")
            .header("cookie", crate::routes::testutil::session_cookie_header())
            .body(Body::from(body))
            .unwrap();
        let res = profile_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_profile_without_db_returns_service_unavailable() {
        let req = Request::get("/api/profile").body(Body::empty()).unwrap();
        let res = profile_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
