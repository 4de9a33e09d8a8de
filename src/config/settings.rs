//! Client settings.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{default_config_path, ConfigError, Result};
use crate::api::DEFAULT_BASE_URL;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "DIFFY_API_KEY";
/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "DIFFY_BASE_URL";
/// Environment variable setting the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "DIFFY_TIMEOUT_SECS";

/// Settings used to build a [`crate::Diffy`] client.
///
/// The API key is never written anywhere by this crate.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// The API key exchanged for a bearer token.
    pub api_key: Option<String>,
    /// Base URL of the API. Override for self-hosted deployments.
    pub base_url: String,
    /// Request timeout in seconds. `None` keeps the transport default.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Configuration for the hosted API with the given key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration");
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the default configuration file, then apply environment overrides.
    ///
    /// A missing file yields the defaults.
    pub fn load_default() -> Result<Self> {
        let path = default_config_path()?;
        let config = if path.exists() {
            Self::load(&path)?
        } else {
            debug!(path = %path.display(), "No configuration file, using defaults");
            Self::default()
        };
        config.with_env_overrides()
    }

    /// Apply `DIFFY_API_KEY`, `DIFFY_BASE_URL` and `DIFFY_TIMEOUT_SECS`.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(key) = std::env::var(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_TIMEOUT_SECS, raw
                ))
            })?;
            self.timeout_secs = Some(secs);
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate this configuration.
    ///
    /// Checks that:
    /// - The base URL is an http(s) URL
    /// - The API key, when present, is non-empty
    /// - The timeout, when present, is non-zero
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "base URL '{}' must start with http:// or https://",
                self.base_url
            )));
        }

        if matches!(self.api_key.as_deref(), Some(key) if key.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "API key cannot be empty".to_string(),
            ));
        }

        if self.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
