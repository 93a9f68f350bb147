//! Central error taxonomy shared by all route handlers.
//!
//! Every failure a handler can produce is converted here into the
//! `{error, message}` JSON body the frontend expects. Cleanup failures
//! (old-asset deletion) never travel through this type — they are logged
//! and swallowed at the call site so they cannot block a primary write.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::extract::ExtractError;
use crate::storage::StorageError;

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Category of an upstream (screenshot / generative-text) API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    AuthInvalid,
    QuotaExceeded,
    BadParameters,
    Other,
}

impl UpstreamKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => UpstreamKind::AuthInvalid,
            402 => UpstreamKind::QuotaExceeded,
            422 => UpstreamKind::BadParameters,
            _ => UpstreamKind::Other,
        }
    }

    fn describe(&self, provider: &str, status: u16) -> String {
        match self {
            UpstreamKind::AuthInvalid => format!("{provider} rejected the API key"),
            UpstreamKind::QuotaExceeded => format!("{provider} quota exceeded"),
            UpstreamKind::BadParameters => format!("{provider} rejected the request parameters"),
            UpstreamKind::Other => format!("{provider} returned status {status}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authorization required")]
    MissingAuth,

    #[error("invalid or expired token")]
    InvalidAuth,

    #[error("{0}")]
    Validation(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to download image: {0}")]
    Download(String),

    #[error("upstream api error")]
    Upstream {
        provider: &'static str,
        status: u16,
        kind: UpstreamKind,
    },

    #[error("upstream request failed: {0}")]
    UpstreamUnreachable(String),

    #[error("database not available")]
    DbUnavailable,

    #[error("database error")]
    Db(#[from] sqlx::Error),

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingAuth | ApiError::InvalidAuth => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) | ApiError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ApiError::Extract(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(_) | ApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Download(_) | ApiError::Upstream { .. } | ApiError::UpstreamUnreachable(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::DbUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn message(&self) -> Option<String> {
        match self {
            ApiError::Upstream {
                provider,
                status,
                kind,
            } => Some(kind.describe(provider, *status)),
            ApiError::Extract(e) => e.detail(),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        // Internal detail stays in the logs; the body carries the stable
        // user-facing wording only.
        match &self {
            ApiError::Db(e) => tracing::error!("database error: {}", e),
            ApiError::Storage(e) => tracing::error!("storage error: {}", e),
            ApiError::Upstream {
                provider,
                status,
                kind,
            } => tracing::warn!(provider, status, ?kind, "upstream api error"),
            ApiError::UpstreamUnreachable(e) => tracing::error!("upstream unreachable: {}", e),
            _ => {}
        }

        let body = ErrorResponse {
            error: self.to_string(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}
