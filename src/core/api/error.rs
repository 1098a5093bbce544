//! Error types for the collection and catalog APIs.

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Generic retry-suggesting text for transport failures.
pub const RETRY_HINT: &str = "Please try again.";

/// Errors that can occur when talking to the collection or catalog APIs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The record already exists in the library (HTTP 409).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The server rejected the request with a structured `error` message.
    #[error("API error ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the response's `error` field.
        message: String,
    },

    /// Non-2xx response without a structured error body.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Network/HTTP errors.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configured base URL could not be joined with an endpoint path.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Create a rejection error.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        ApiError::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }

    /// Whether the request failed before any HTTP response arrived.
    pub fn is_transport(&self) -> bool {
        match self {
            ApiError::Network(e) => e.status().is_none(),
            ApiError::Json(_) | ApiError::InvalidUrl(_) => true,
            _ => false,
        }
    }

    /// Get the HTTP status code if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Conflict(_) => Some(409),
            ApiError::Rejected { status, .. } | ApiError::Status(status) => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Text to show the user: the server's own message when it sent one,
    /// otherwise `fallback` followed by a retry hint.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Conflict(message) | ApiError::Rejected { message, .. }
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            _ => format!("{fallback}. {RETRY_HINT}"),
        }
    }
}
