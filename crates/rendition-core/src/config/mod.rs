//! Configuration management for Rendition.
//!
//! Configuration is layered: built-in defaults, then `config.toml` from the
//! platform config directory, then a per-request [`ProcessorOverlay`]. The
//! merged result is validated once, before a job is built from it.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Rendition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Processing settings
    pub processor: ProcessorConfig,

    /// Blob store settings
    pub store: StoreConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.rendition.rendition/config.toml
    /// - Linux: ~/.config/rendition/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\rendition\config\config.toml
    ///
    /// Falls back to ~/.rendition/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "rendition", "rendition")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".rendition").join("config.toml")
            })
    }

    /// Get the resolved blob store directory (with ~ expansion).
    pub fn store_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.store.path);
        PathBuf::from(expanded.into_owned())
    }

    /// Return a copy with the request overlay applied on top, validated.
    pub fn with_overlay(&self, overlay: &ProcessorOverlay) -> Result<Self, ConfigError> {
        let mut merged = self.clone();
        overlay.apply(&mut merged.processor);
        merged.validate()?;
        Ok(merged)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
