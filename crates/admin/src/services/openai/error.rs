//! Error types for the `OpenAI` API client.

use thiserror::Error;

/// Shown to the operator when no key resolved from settings or env.
pub const KEY_NOT_CONFIGURED: &str =
    "OpenAI API key not configured. Please add OPENAI_API_KEY in Admin API Settings.";

/// Errors that can occur when calling the `OpenAI` API.
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// No API key in settings or environment.
    #[error("{KEY_NOT_CONFIGURED}")]
    NotConfigured,

    /// The key contains characters that cannot go in a header.
    #[error("API key is not a valid header value")]
    InvalidApiKey,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// `OpenAI` returned an error body.
    #[error("API error ({error_type}): {message}")]
    Api { error_type: String, message: String },

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Key rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Error envelope returned by the API.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}
