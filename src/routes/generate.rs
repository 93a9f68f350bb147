/**
 * Content Generation Routes
 * Draft blog posts and bios with the generative-text provider
 */
use axum::{http::HeaderMap, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::{extract_content, GeneratedContent};
use crate::genai::{self, BlogPromptInput, GenAiConfig};
use crate::routes::auth::require_session;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BioRequest {
    #[serde(default)]
    pub current_bio: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BioResponse {
    pub generated_bio: String,
}

/// POST /api/generate/blog - Draft a blog post from project source
/// material (session required). The model reply is run through the
/// structured-content extractor, so fenced or chatty output still parses.
pub async fn generate_blog(
    headers: HeaderMap,
    Json(payload): Json<BlogPromptInput>,
) -> Result<Json<GeneratedContent>, ApiError> {
    require_session(&headers)?;

    if payload.is_empty() {
        return Err(ApiError::Validation(
            "at least one of title, description, content or technologies is required".to_string(),
        ));
    }

    let config = GenAiConfig::from_env();
    let raw = genai::generate_text(&config, &genai::blog_prompt(&payload)).await?;
    let content = extract_content(&raw)?;

    tracing::info!(title = %content.title, "blog draft generated");
    Ok(Json(content))
}

/// POST /api/generate/bio - Improve a profile bio (session required).
/// The reply is plain text and used verbatim.
pub async fn generate_bio(
    headers: HeaderMap,
    Json(payload): Json<BioRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_session(&headers)?;

    if payload.current_bio.trim().is_empty() {
        return Err(ApiError::Validation("currentBio is required".to_string()));
    }

    let config = GenAiConfig::from_env();
    let text = genai::generate_text(&config, &genai::bio_prompt(&payload.current_bio)).await?;

    Ok(Json(BioResponse {
        generated_bio: text.trim().to_string(),
    }))
}
