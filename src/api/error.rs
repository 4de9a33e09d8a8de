//! API error types for the Diffy client.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when interacting with the Diffy API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller-supplied parameters failed validation. Raised before any
    /// request is sent.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Exchanging the API key for a bearer token failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The API answered with a non-success status.
    #[error("Request failed with HTTP {status}: {body}")]
    Request {
        /// The HTTP status returned by the API.
        status: StatusCode,
        /// The raw response body, possibly empty.
        body: String,
    },

    /// Network or HTTP transport error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body could not be decoded.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// A field read from resource data is not present.
    #[error("Missing field in resource data: {0}")]
    MissingField(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Shorthand for an `InvalidArguments` error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidArguments(msg.into())
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Request { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }
}
