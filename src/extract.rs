//! Structured-content extraction from free-form model output.
//!
//! Generative models are instructed to answer with a bare JSON object but
//! routinely wrap it in code fences or surround it with commentary. This
//! module turns that raw text into a validated [`GeneratedContent`]
//! record. Pure functions only — callers decide what to do with failures.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A validated draft produced from one generation request. Consumed
/// immediately by the admin UI as a blog-post draft; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    #[serde(default)]
    pub suggested_tags: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("model response is not valid JSON")]
    MalformedResponse { snippet: String },

    #[error("model response is missing required content")]
    IncompleteContent { field: &'static str },
}

impl ExtractError {
    /// Diagnostic detail safe to surface to the admin UI.
    pub fn detail(&self) -> Option<String> {
        match self {
            ExtractError::MalformedResponse { snippet } => {
                Some(format!("could not parse: {}", truncate(snippet, 120)))
            }
            ExtractError::IncompleteContent { field } => {
                Some(format!("field '{}' is missing or empty", field))
            }
        }
    }
}

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"```(?:json)?\s*|\s*```").unwrap();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").into_owned()
}

fn strip_control_chars(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control() && !('\u{7f}'..='\u{9f}').contains(c))
        .collect()
}

/// Greedy first-`{`-to-last-`}` span, the JSON candidate.
fn brace_span(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&s[start..=end])
}

/// Non-empty trimmed string field of a JSON object, or the
/// `IncompleteContent` failure naming it.
fn required_field(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &'static str,
) -> Result<String, ExtractError> {
    match obj.get(field).and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ExtractError::IncompleteContent { field }),
    }
}

/// Extract a validated [`GeneratedContent`] from raw model output.
///
/// Tolerates code fences, stray commentary before/after the object, and
/// non-printable control characters. Fails with [`ExtractError`] rather
/// than returning a partial record.
pub fn extract_content(raw: &str) -> Result<GeneratedContent, ExtractError> {
    let cleaned = strip_code_fences(raw);
    let cleaned = strip_control_chars(&cleaned);
    let cleaned = cleaned.trim();

    let candidate = brace_span(cleaned).ok_or_else(|| ExtractError::MalformedResponse {
        snippet: cleaned.to_string(),
    })?;

    if !candidate.starts_with('{') || !candidate.ends_with('}') {
        return Err(ExtractError::MalformedResponse {
            snippet: candidate.to_string(),
        });
    }

    let value: serde_json::Value =
        serde_json::from_str(candidate).map_err(|_| ExtractError::MalformedResponse {
            snippet: candidate.to_string(),
        })?;

    let obj = value
        .as_object()
        .ok_or_else(|| ExtractError::MalformedResponse {
            snippet: candidate.to_string(),
        })?;

    let title = required_field(obj, "title")?;
    let content = required_field(obj, "content")?;
    let excerpt = required_field(obj, "excerpt")?;

    // Models sometimes double-escape inside the content field; unescape
    // literal \n and \" sequences that survived JSON parsing.
    let content = content
        .replace("\\n", "\n")
        .replace("\\\"", "\"")
        .trim()
        .to_string();

    let suggested_tags = obj
        .get("suggestedTags")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(GeneratedContent {
        title,
        content,
        excerpt,
        suggested_tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{"title":"Shipping a Portfolio","content":"<p>Intro</p><h2>Details</h2>","excerpt":"A short summary","suggestedTags":["rust","web"]}"#;

    fn expected() -> GeneratedContent {
        GeneratedContent {
            title: "Shipping a Portfolio".into(),
            content: "<p>Intro</p><h2>Details</h2>".into(),
            excerpt: "A short summary".into(),
            suggested_tags: vec!["rust".into(), "web".into()],
        }
    }

    #[test]
    fn test_bare_json_object() {
        assert_eq!(extract_content(WELL_FORMED).unwrap(), expected());
    }

    #[test]
    fn test_json_code_fence_matches_bare_parse() {
        let fenced = format!("```json\n{}\n```", WELL_FORMED);
        assert_eq!(extract_content(&fenced).unwrap(), expected());
    }

    #[test]
    fn test_plain_code_fence() {
        let fenced = format!("```\n{}\n```", WELL_FORMED);
        assert_eq!(extract_content(&fenced).unwrap(), expected());
    }

    #[test]
    fn test_surrounding_commentary_is_ignored() {
        let wrapped = format!("Sure! Here is the article you asked for: {} Hope it helps.", WELL_FORMED);
        assert_eq!(extract_content(&wrapped).unwrap(), expected());
    }

    #[test]
    fn test_control_characters_are_stripped() {
        let dirty = format!("\u{0}\u{1}{}\u{7f}", WELL_FORMED);
        assert_eq!(extract_content(&dirty).unwrap(), expected());
    }

    #[test]
    fn test_fields_are_trimmed() {
        let raw = r#"{"title":"  Padded  ","content":" <p>x</p> ","excerpt":" e "}"#;
        let got = extract_content(raw).unwrap();
        assert_eq!(got.title, "Padded");
        assert_eq!(got.content, "<p>x</p>");
        assert_eq!(got.excerpt, "e");
    }

    #[test]
    fn test_missing_suggested_tags_defaults_empty() {
        let raw = r#"{"title":"t","content":"c","excerpt":"e"}"#;
        assert!(extract_content(raw).unwrap().suggested_tags.is_empty());
    }

    #[test]
    fn test_literal_escapes_in_content_are_unescaped() {
        let raw = r#"{"title":"t","content":"line one\\nline \\\"two\\\"","excerpt":"e"}"#;
        let got = extract_content(raw).unwrap();
        assert_eq!(got.content, "line one\nline \"two\"");
    }

    #[test]
    fn test_missing_title_is_incomplete() {
        let raw = r#"{"content":"c","excerpt":"e"}"#;
        match extract_content(raw) {
            Err(ExtractError::IncompleteContent { field }) => assert_eq!(field, "title"),
            other => panic!("expected IncompleteContent, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_excerpt_is_incomplete() {
        let raw = r#"{"title":"t","content":"c","excerpt":"   "}"#;
        match extract_content(raw) {
            Err(ExtractError::IncompleteContent { field }) => assert_eq!(field, "excerpt"),
            other => panic!("expected IncompleteContent, got {:?}", other),
        }
    }

    #[test]
    fn test_non_string_content_is_incomplete() {
        let raw = r#"{"title":"t","content":42,"excerpt":"e"}"#;
        assert!(matches!(
            extract_content(raw),
            Err(ExtractError::IncompleteContent { field: "content" })
        ));
    }

    #[test]
    fn test_no_braces_is_malformed() {
        match extract_content("the model refused to answer") {
            Err(ExtractError::MalformedResponse { snippet }) => {
                assert!(snippet.contains("refused"))
            }
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_unbalanced_json_is_malformed() {
        let raw = r#"{"title":"t","content":"c","#;
        assert!(matches!(
            extract_content(raw),
            Err(ExtractError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_json_array_is_malformed() {
        // An array has no `{`..`}` span worth extracting; the record must
        // be a single object.
        assert!(matches!(
            extract_content(r#"["title","content"]"#),
            Err(ExtractError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_non_string_tags_are_dropped() {
        let raw = r#"{"title":"t","content":"c","excerpt":"e","suggestedTags":["a",1,null," b "]}"#;
        let got = extract_content(raw).unwrap();
        assert_eq!(got.suggested_tags, vec!["a".to_string(), "b".to_string()]);
    }
}
