//! Centralized error types for the Diffy SDK.
//!
//! Most calls return [`ApiError`] directly. This type joins it with
//! configuration errors for callers that load settings and connect in one go.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),
}

impl Error {
    /// Get a short message suitable for showing to end users.
    pub fn user_message(&self) -> String {
        match self {
            Error::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check the file exists and is readable.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
            },
            Error::Api(e) => match e {
                ApiError::InvalidArguments(msg) => msg.clone(),
                ApiError::Authentication(_) => {
                    "Authentication failed. Please check your Diffy API key.".to_string()
                }
                ApiError::Request { status, .. } => {
                    format!("Diffy API request failed with HTTP {}.", status.as_u16())
                }
                ApiError::Network(_) => {
                    "Connection failed. Please check your internet connection.".to_string()
                }
                ApiError::InvalidResponse(_) => {
                    "Unexpected response from Diffy. Please try again.".to_string()
                }
                ApiError::MissingField(field) => {
                    format!("Diffy did not report '{}' for this resource.", field)
                }
            },
        }
    }

    /// Whether the error comes from caller input rather than the server.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::Config(ConfigError::ValidationError(_))
                | Error::Config(ConfigError::ParseError(_))
                | Error::Api(ApiError::InvalidArguments(_))
        )
    }
}

/// Result type for operations spanning configuration and API calls.
pub type Result<T> = std::result::Result<T, Error>;
