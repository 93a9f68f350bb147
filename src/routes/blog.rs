/**
 * Blog Routes
 * CRUD API endpoints for blog posts
 */
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::BlogPost};
use crate::error::ApiError;
use crate::routes::auth::require_session;
use crate::routes::SuccessResponse;
use crate::storage::ASSET_STORE;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /api/blog (list)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    pub published: Option<bool>,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

/// Response for GET /api/blog (list)
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogListResponse {
    pub items: Vec<BlogPost>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

/// Request body for POST /api/blog (create)
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub image_path: String,
}

/// Request body for PATCH /api/blog/:id (update)
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub slug: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
    pub image_url: Option<String>,
    pub image_path: Option<String>,
}

// ============================================================================
// Derived fields
// ============================================================================

lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
    static ref NON_ALNUM_RUN: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

/// Derive a URL-safe slug from a title: lowercase, runs of
/// non-alphanumerics collapsed to a single hyphen, no leading or
/// trailing hyphen.
pub fn generate_slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    NON_ALNUM_RUN
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Derive an excerpt from content: first 150 characters plus an ellipsis.
pub fn derive_excerpt(content: &str) -> String {
    let head: String = content.chars().take(150).collect();
    format!("{}...", head)
}

/// Sanitize rich HTML content before it is persisted.
fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}

/// Row offset for a 1-based page. Saturates instead of overflowing so an
/// absurd page number reads an empty page rather than producing a
/// negative OFFSET.
fn list_offset(page: i64, page_size: i64) -> i64 {
    (page - 1).saturating_mul(page_size)
}

fn is_duplicate_slug(e: &sqlx::Error) -> bool {
    let msg = e.to_string();
    msg.contains("duplicate key") || msg.contains("unique constraint")
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/blog - List blog posts with pagination
pub async fn list_posts(
    Query(query): Query<BlogListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = db::get_pool().ok_or(ApiError::DbUnavailable)?;

    // Clamp page_size to max 100
    let page_size = query.page_size.clamp(1, 100);
    let page = query.page.max(1);
    let offset = list_offset(page, page_size);

    let (items, total): (Vec<BlogPost>, i64) = if let Some(published) = query.published {
        let items = sqlx::query_as::<_, BlogPost>(
            r#"
            SELECT id, title, slug, content, excerpt, tags, published,
                   image_url, image_path, created_at, updated_at
            FROM blog_posts
            WHERE published = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(published)
        .bind(page_size)
        .bind(offset)
        .fetch_all(pool.as_ref())
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_posts WHERE published = $1")
            .bind(published)
            .fetch_one(pool.as_ref())
            .await?;

        (items, total.0)
    } else {
        let items = sqlx::query_as::<_, BlogPost>(
            r#"
            SELECT id, title, slug, content, excerpt, tags, published,
                   image_url, image_path, created_at, updated_at
            FROM blog_posts
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page_size)
        .bind(offset)
        .fetch_all(pool.as_ref())
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_posts")
            .fetch_one(pool.as_ref())
            .await?;

        (items, total.0)
    };

    Ok((
        StatusCode::OK,
        Json(BlogListResponse {
            items,
            page,
            page_size,
            total,
        }),
    ))
}

/// GET /api/blog/:slug - Get single blog post by slug
pub async fn get_post(Path(slug): Path<String>) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_slug(&slug) {
        return Err(ApiError::Validation(
            "slug must contain only lowercase letters, numbers, and hyphens".to_string(),
        ));
    }

    let pool = db::get_pool().ok_or(ApiError::DbUnavailable)?;

    let post = sqlx::query_as::<_, BlogPost>(
        r#"
        SELECT id, title, slug, content, excerpt, tags, published,
               image_url, image_path, created_at, updated_at
        FROM blog_posts
        WHERE slug = $1
        "#,
    )
    .bind(&slug)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok((StatusCode::OK, Json(post)))
}

/// POST /api/blog - Create new blog post (session required)
pub async fn create_post(
    headers: HeaderMap,
    Json(payload): Json<CreateBlogRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&headers)?;

    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }
    if payload.content.trim().is_empty() {
        return Err(ApiError::Validation("content is required".to_string()));
    }

    // Derived fields only fill gaps; explicit values are kept verbatim.
    let slug = if payload.slug.trim().is_empty() {
        generate_slug(&payload.title)
    } else {
        payload.slug.trim().to_string()
    };
    if !is_valid_slug(&slug) {
        return Err(ApiError::Validation(
            "slug must contain only lowercase letters, numbers, and hyphens".to_string(),
        ));
    }

    let excerpt = if payload.excerpt.trim().is_empty() {
        derive_excerpt(&payload.content)
    } else {
        payload.excerpt.trim().to_string()
    };

    let content = sanitize_html(&payload.content);

    let pool = db::get_pool().ok_or(ApiError::DbUnavailable)?;

    let post = sqlx::query_as::<_, BlogPost>(
        r#"
        INSERT INTO blog_posts
            (title, slug, content, excerpt, tags, published, image_url, image_path,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
        RETURNING id, title, slug, content, excerpt, tags, published,
                  image_url, image_path, created_at, updated_at
        "#,
    )
    .bind(payload.title.trim())
    .bind(&slug)
    .bind(&content)
    .bind(&excerpt)
    .bind(&payload.tags)
    .bind(payload.published)
    .bind(&payload.image_url)
    .bind(&payload.image_path)
    .fetch_one(pool.as_ref())
    .await
    .map_err(|e| {
        if is_duplicate_slug(&e) {
            ApiError::Conflict("slug already exists".to_string())
        } else {
            ApiError::Db(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// The write endpoints share their route literal with the slug-addressed
/// GET but accept ids only.
fn parse_post_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::Validation("posts are updated and deleted by id, not slug".to_string())
    })
}

/// PATCH /api/blog/:id - Update blog post by id (session required)
pub async fn update_post(
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<UpdateBlogRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&headers)?;
    let id = parse_post_id(&id)?;

    let pool = db::get_pool().ok_or(ApiError::DbUnavailable)?;

    let existing = sqlx::query_as::<_, BlogPost>(
        r#"
        SELECT id, title, slug, content, excerpt, tags, published,
               image_url, image_path, created_at, updated_at
        FROM blog_posts
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await?
    .ok_or(ApiError::NotFound)?;

    let title = payload.title.unwrap_or(existing.title);
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".to_string()));
    }

    let content = payload
        .content
        .map(|c| sanitize_html(&c))
        .unwrap_or(existing.content);

    // An explicitly cleared slug falls back to the derived one.
    let slug = match payload.slug {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        Some(_) => generate_slug(&title),
        None if existing.slug.is_empty() => generate_slug(&title),
        None => existing.slug,
    };
    if !is_valid_slug(&slug) {
        return Err(ApiError::Validation(
            "slug must contain only lowercase letters, numbers, and hyphens".to_string(),
        ));
    }

    let excerpt = match payload.excerpt {
        Some(e) if !e.trim().is_empty() => e.trim().to_string(),
        Some(_) => derive_excerpt(&content),
        None => existing.excerpt,
    };

    let tags = payload.tags.unwrap_or(existing.tags);
    let published = payload.published.unwrap_or(existing.published);
    let image_url = payload.image_url.unwrap_or(existing.image_url.clone());
    let image_path = payload.image_path.unwrap_or(existing.image_path.clone());

    // Replaced cover image: clean up the old object, best-effort.
    if image_path != existing.image_path && !existing.image_path.is_empty() {
        ASSET_STORE.cleanup(&existing.image_path).await;
    }

    let post = sqlx::query_as::<_, BlogPost>(
        r#"
        UPDATE blog_posts
        SET title = $1, slug = $2, content = $3, excerpt = $4, tags = $5,
            published = $6, image_url = $7, image_path = $8, updated_at = now()
        WHERE id = $9
        RETURNING id, title, slug, content, excerpt, tags, published,
                  image_url, image_path, created_at, updated_at
        "#,
    )
    .bind(title.trim())
    .bind(&slug)
    .bind(&content)
    .bind(&excerpt)
    .bind(&tags)
    .bind(published)
    .bind(&image_url)
    .bind(&image_path)
    .bind(id)
    .fetch_one(pool.as_ref())
    .await
    .map_err(|e| {
        if is_duplicate_slug(&e) {
            ApiError::Conflict("slug already exists".to_string())
        } else {
            ApiError::Db(e)
        }
    })?;

    Ok((StatusCode::OK, Json(post)))
}

/// DELETE /api/blog/:id - Delete blog post by id (session required)
pub async fn delete_post(
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&headers)?;
    let id = parse_post_id(&id)?;

    let pool = db::get_pool().ok_or(ApiError::DbUnavailable)?;

    let image_path: Option<(String,)> =
        sqlx::query_as("SELECT image_path FROM blog_posts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool.as_ref())
            .await?;
    let image_path = image_path.ok_or(ApiError::NotFound)?.0;

    // Asset cleanup first, but the document delete proceeds regardless of
    // its outcome.
    if !image_path.is_empty() {
        ASSET_STORE.cleanup(&image_path).await;
    }

    let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
        .bind(id)
        .execute(pool.as_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}
