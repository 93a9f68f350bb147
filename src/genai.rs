//! Client for the generative-text provider (Gemini-style
//! `models/{model}:generateContent` API) plus the prompt templates used
//! by the admin drafting endpoints.

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{ApiError, UpstreamKind};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

#[derive(Debug, Clone)]
pub struct GenAiConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

impl GenAiConfig {
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("GENAI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            api_key: std::env::var("GENAI_API_KEY").unwrap_or_default(),
            model: std::env::var("GENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// The reply text of the first candidate. Long generations arrive split
/// across several parts; the reply is their concatenation, not just the
/// first chunk.
fn response_text(parsed: GenerateResponse) -> String {
    parsed
        .candidates
        .into_iter()
        .next()
        .map(|c| {
            c.content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Send one prompt and return the raw model text. One attempt, no retry;
/// every failure is terminal for the triggering admin action.
pub async fn generate_text(config: &GenAiConfig, prompt: &str) -> Result<String, ApiError> {
    let url = format!(
        "{}/models/{}:generateContent",
        config.api_base.trim_end_matches('/'),
        config.model
    );

    let body = serde_json::json!({
        "contents": [{ "parts": [{ "text": prompt }] }]
    });

    let response = HTTP_CLIENT
        .post(&url)
        .query(&[("key", config.api_key.as_str())])
        .json(&body)
        .send()
        .await
        .map_err(|e| ApiError::UpstreamUnreachable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Upstream {
            provider: "generative-text api",
            status: status.as_u16(),
            kind: UpstreamKind::from_status(status.as_u16()),
        });
    }

    let parsed: GenerateResponse = response
        .json()
        .await
        .map_err(|e| ApiError::UpstreamUnreachable(e.to_string()))?;

    let text = response_text(parsed);

    if text.is_empty() {
        return Err(ApiError::Upstream {
            provider: "generative-text api",
            status: status.as_u16(),
            kind: UpstreamKind::Other,
        });
    }

    Ok(text)
}

/// Source material for a blog-post draft, usually copied off a project.
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPromptInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub technologies: Vec<String>,
}

impl BlogPromptInput {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.content.is_empty()
            && self.technologies.is_empty()
    }
}

/// Prompt for a full blog-post draft. The model is told to answer with a
/// bare JSON object only; the extractor tolerates violations anyway.
pub fn blog_prompt(input: &BlogPromptInput) -> String {
    let mut source = String::new();
    if !input.title.is_empty() {
        source.push_str(&format!("Title: {}\n", input.title));
    }
    if !input.description.is_empty() {
        source.push_str(&format!("Description: {}\n", input.description));
    }
    if !input.content.is_empty() {
        source.push_str(&format!("Notes: {}\n", input.content));
    }
    if !input.technologies.is_empty() {
        source.push_str(&format!("Technologies: {}\n", input.technologies.join(", ")));
    }

    format!(
        "You are a professional technical content writer. Write an engaging, \
informative blog article based on the following source material:\n\n{source}\n\
The article must include an attention-grabbing introduction, an informative \
body with relevant technical detail, and a memorable conclusion.\n\n\
VERY IMPORTANT: respond with ONLY a valid JSON object in exactly this shape:\n\n\
{{\n  \"title\": \"catchy, SEO-friendly article title\",\n  \
\"content\": \"article body as simple HTML using only <p> and <h2> tags\",\n  \
\"excerpt\": \"short summary (150 characters max)\",\n  \
\"suggestedTags\": [\"tag1\", \"tag2\", \"tag3\"]\n}}\n\n\
DO NOT add anything besides the JSON object above. DO NOT use markdown or code blocks."
    )
}

/// Prompt for improving an existing profile bio. The answer is used
/// verbatim, so the model is told to return plain text only.
pub fn bio_prompt(current_bio: &str) -> String {
    format!(
        "Please improve the following profile bio:\n\"{current_bio}\"\n\n\
Keep the key information and main keywords, fix grammar and sentence \
structure, and make it more engaging and professional while staying \
authentic and personal. Keep the same language the bio is written in. \
Maximum 500 characters.\n\n\
Return only the improved bio text, with no commentary or explanation."
    )
}
