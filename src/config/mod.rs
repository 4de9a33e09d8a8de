//! Configuration management for the Diffy client.
//!
//! This module handles loading client settings (API key, base URL, timeout)
//! from a TOML file and from `DIFFY_*` environment variables.

mod settings;

use std::path::PathBuf;

use thiserror::Error;

pub use settings::{Config, ENV_API_KEY, ENV_BASE_URL, ENV_TIMEOUT_SECS};

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform configuration directory could not be determined.
    #[error("could not determine configuration directory")]
    NoConfigDir,

    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`Config`].
    #[error("failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A configuration value is invalid.
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Path of the default configuration file.
///
/// - Linux: `~/.config/diffy/config.toml`
/// - macOS: `~/Library/Application Support/diffy/config.toml`
/// - Windows: `C:\Users\<User>\AppData\Roaming\diffy\config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("diffy").join("config.toml"))
}
