/**
 * Project Routes
 * CRUD API endpoints for showcase projects
 */
use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::Project};
use crate::error::ApiError;
use crate::routes::auth::require_session;
use crate::routes::SuccessResponse;
use crate::storage::ASSET_STORE;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for POST /api/projects (create)
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub is_new_release: bool,
    #[serde(default)]
    pub is_update: bool,
}

/// Request body for PATCH /api/projects/:id (update)
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub image_path: Option<String>,
    pub link: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub is_new_release: Option<bool>,
    pub is_update: Option<bool>,
}

// ============================================================================
// Derived fields
// ============================================================================

/// `is_new_release` and `is_update` are mutually exclusive: whichever
/// flag this patch sets wins and clears the other. With no patched flag
/// the existing pair is kept (it is already exclusive).
pub fn apply_release_flags(
    existing: (bool, bool),
    new_release: Option<bool>,
    update: Option<bool>,
) -> (bool, bool) {
    let (mut is_new_release, mut is_update) = existing;
    if let Some(v) = new_release {
        is_new_release = v;
        if v {
            is_update = false;
        }
    }
    if let Some(v) = update {
        is_update = v;
        if v {
            is_new_release = false;
        }
    }
    (is_new_release, is_update)
}

const PROJECT_COLUMNS: &str = "id, title, description, image_url, image_path, link, \
     technologies, featured, is_new_release, is_update, created_at";

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/projects - List projects, newest first
pub async fn list_projects() -> Result<impl IntoResponse, ApiError> {
    let pool = db::get_pool().ok_or(ApiError::DbUnavailable)?;

    let projects = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC"
    ))
    .fetch_all(pool.as_ref())
    .await?;

    Ok((StatusCode::OK, Json(projects)))
}

/// POST /api/projects - Create new project (session required)
pub async fn create_project(
    headers: HeaderMap,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&headers)?;

    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }
    if payload.description.trim().is_empty() {
        return Err(ApiError::Validation("description is required".to_string()));
    }

    let (is_new_release, is_update) = apply_release_flags(
        (false, false),
        Some(payload.is_new_release),
        Some(payload.is_update),
    );

    let pool = db::get_pool().ok_or(ApiError::DbUnavailable)?;

    let project = sqlx::query_as::<_, Project>(&format!(
        r#"
        INSERT INTO projects
            (title, description, image_url, image_path, link, technologies,
             featured, is_new_release, is_update, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        RETURNING {PROJECT_COLUMNS}
        "#
    ))
    .bind(payload.title.trim())
    .bind(payload.description.trim())
    .bind(&payload.image_url)
    .bind(&payload.image_path)
    .bind(&payload.link)
    .bind(&payload.technologies)
    .bind(payload.featured)
    .bind(is_new_release)
    .bind(is_update)
    .fetch_one(pool.as_ref())
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// PATCH /api/projects/:id - Update project (session required)
pub async fn update_project(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&headers)?;

    let pool = db::get_pool().ok_or(ApiError::DbUnavailable)?;

    let existing = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or(ApiError::NotFound)?;

    let title = payload.title.unwrap_or(existing.title);
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }
    let description = payload.description.unwrap_or(existing.description);

    let (is_new_release, is_update) = apply_release_flags(
        (existing.is_new_release, existing.is_update),
        payload.is_new_release,
        payload.is_update,
    );

    let image_url = payload.image_url.unwrap_or(existing.image_url.clone());
    let image_path = payload.image_path.unwrap_or(existing.image_path.clone());
    let link = payload.link.unwrap_or(existing.link);
    let technologies = payload.technologies.unwrap_or(existing.technologies);
    let featured = payload.featured.unwrap_or(existing.featured);

    // Replaced project image: clean up the old object, best-effort.
    if image_path != existing.image_path && !existing.image_path.is_empty() {
        ASSET_STORE.cleanup(&existing.image_path).await;
    }

    let project = sqlx::query_as::<_, Project>(&format!(
        r#"
        UPDATE projects
        SET title = $1, description = $2, image_url = $3, image_path = $4,
            link = $5, technologies = $6, featured = $7,
            is_new_release = $8, is_update = $9
        WHERE id = $10
        RETURNING {PROJECT_COLUMNS}
        "#
    ))
    .bind(title.trim())
    .bind(description.trim())
    .bind(&image_url)
    .bind(&image_path)
    .bind(&link)
    .bind(&technologies)
    .bind(featured)
    .bind(is_new_release)
    .bind(is_update)
    .bind(id)
    .fetch_one(pool.as_ref())
    .await?;

    Ok((StatusCode::OK, Json(project)))
}

/// DELETE /api/projects/:id - Delete project and its stored image
/// (session required)
pub async fn delete_project(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&headers)?;

    let pool = db::get_pool().ok_or(ApiError::DbUnavailable)?;

    let image_path: Option<(String,)> =
        sqlx::query_as("SELECT image_path FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(pool.as_ref())
            .await?;
    let image_path = image_path.ok_or(ApiError::NotFound)?.0;

    // Best-effort asset cleanup; the document delete proceeds regardless
    // of its outcome.
    if !image_path.is_empty() {
        ASSET_STORE.cleanup(&image_path).await;
    }

    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}
