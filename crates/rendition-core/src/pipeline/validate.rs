//! Format and dimension policy.

use crate::config::ProcessorConfig;
use crate::error::BadImage;

/// Enforces the configured format whitelist and size limits.
#[derive(Debug, Clone)]
pub struct Validator {
    formats: Vec<String>,
    max_width: u32,
    max_height: u32,
}

impl Validator {
    /// Create a validator from processor settings.
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            formats: config.formats.iter().map(|f| f.to_ascii_uppercase()).collect(),
            max_width: config.max_width,
            max_height: config.max_height,
        }
    }

    /// Check a detected format name and stored dimensions.
    ///
    /// Checks run in order: format known, format allowed, dimensions in range.
    pub fn check(&self, format: &str, width: u32, height: u32) -> Result<(), BadImage> {
        if format.is_empty() {
            return Err(BadImage::UnknownFormat);
        }
        let upper = format.to_ascii_uppercase();
        if !self.formats.contains(&upper) {
            return Err(BadImage::InvalidFormat(format.to_string()));
        }
        if width > self.max_width || height > self.max_height {
            return Err(BadImage::TooLarge { width, height });
        }
        Ok(())
    }
}
