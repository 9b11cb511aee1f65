//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    ///
    /// Size descriptors are not checked here: a malformed size is a
    /// `ProcessingError` raised when the job is built.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let processor = &self.processor;
        if processor.quality > 100 {
            return Err(ConfigError::ValidationError(
                "processor.quality must be between 0 and 100".into(),
            ));
        }
        if processor.max_width == 0 {
            return Err(ConfigError::ValidationError(
                "processor.max_width must be > 0".into(),
            ));
        }
        if processor.max_height == 0 {
            return Err(ConfigError::ValidationError(
                "processor.max_height must be > 0".into(),
            ));
        }
        if processor.persists_blobs() && processor.ttl == 0 {
            return Err(ConfigError::ValidationError(
                "processor.ttl must be > 0 when save_blob is enabled".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }
}
