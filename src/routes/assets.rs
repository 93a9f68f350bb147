/**
 * Asset Routes
 * Image upload and deletion through the asset store
 */
use axum::{
    extract::{Multipart, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::auth::require_session;
use crate::routes::SuccessResponse;
use crate::storage::ASSET_STORE;

const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
const ALLOWED_PURPOSES: &[&str] = &["avatars", "projects", "blog"];

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default = "default_purpose")]
    pub purpose: String,
}

fn default_purpose() -> String {
    "blog".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub path: String,
    pub size: usize,
    pub mime_type: String,
}

/// Request body for DELETE /api/assets
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAssetRequest {
    pub path_or_url: String,
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

/// POST /api/assets?purpose=... - Upload an image (session required)
pub async fn upload_asset(
    headers: HeaderMap,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&headers)?;

    if !ALLOWED_PURPOSES.contains(&query.purpose.as_str()) {
        return Err(ApiError::Validation(format!(
            "invalid purpose, allowed: {:?}",
            ALLOWED_PURPOSES
        )));
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid multipart data: {}", e)))?
        .ok_or_else(|| ApiError::Validation("no file provided".to_string()))?;

    let original_name = field.file_name().unwrap_or("unknown").to_string();
    let original_ext = original_name
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase();

    if !ALLOWED_EXTENSIONS.contains(&original_ext.as_str()) {
        return Err(ApiError::Validation(
            "unsupported file type, allowed: JPEG, PNG, WebP, GIF".to_string(),
        ));
    }

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::Validation(format!("failed to read file data: {}", e)))?;

    if bytes.is_empty() {
        return Err(ApiError::Validation("empty file".to_string()));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(ApiError::Validation(
            "file too large, maximum size is 5MB".to_string(),
        ));
    }

    let mime_type = validate_image_magic_bytes(&bytes).ok_or_else(|| {
        ApiError::Validation("file content does not match an allowed image type".to_string())
    })?;

    let hint = format!("{}/{}", query.purpose, original_name);
    let asset = ASSET_STORE.upload(&hint, &bytes).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: asset.url,
            path: asset.path,
            size: bytes.len(),
            mime_type: mime_type.to_string(),
        }),
    ))
}

/// DELETE /api/assets - Delete a stored object by path or URL (session
/// required). References the store does not own are a no-op success.
pub async fn delete_asset(
    headers: HeaderMap,
    Json(payload): Json<DeleteAssetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&headers)?;

    if payload.path_or_url.trim().is_empty() {
        return Err(ApiError::Validation("pathOrUrl is required".to_string()));
    }

    ASSET_STORE.delete(&payload.path_or_url).await?;

    Ok((StatusCode::OK, Json(SuccessResponse { success: true })))
}
