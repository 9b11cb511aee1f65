//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Processing settings for a rendition job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Accepted input formats (compared case-insensitively)
    pub formats: Vec<String>,

    /// Maximum accepted source width in pixels
    pub max_width: u32,

    /// Maximum accepted source height in pixels
    pub max_height: u32,

    /// Transform worker count; 0 runs every task inline
    pub pool_size: usize,

    /// JPEG output quality (0-100)
    pub quality: u8,

    /// Persist results at all
    pub save: bool,

    /// Upload results to the blob store (requires `save`)
    pub save_blob: bool,

    /// Ordered size descriptors, `<width>x<height><flags>`
    pub sizes: Vec<String>,

    /// Blob time-to-live in seconds
    pub ttl: u64,

    /// Original filename, recorded in the image info when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            formats: ["TIFF", "BMP", "JPEG", "GIF", "PNG"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_width: 7000,
            max_height: 7000,
            pool_size: 8,
            quality: 70,
            save: true,
            save_blob: true,
            sizes: ["50x50c", "300x300", "600x450"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ttl: 7_776_000, // 90 days
            filename: None,
        }
    }
}

impl ProcessorConfig {
    /// Whether a finished job should upload to the blob store.
    pub fn persists_blobs(&self) -> bool {
        self.save && self.save_blob
    }
}

/// Per-request overrides layered on top of the file configuration.
///
/// Every field is optional; `None` leaves the underlying value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorOverlay {
    pub filename: Option<String>,
    pub quality: Option<u8>,
    pub ttl: Option<u64>,
    pub save: Option<bool>,
    pub save_blob: Option<bool>,
    pub sizes: Option<Vec<String>>,
    pub pool_size: Option<usize>,
}

impl ProcessorOverlay {
    /// Apply every set field onto `config`.
    pub fn apply(&self, config: &mut ProcessorConfig) {
        if let Some(filename) = &self.filename {
            config.filename = Some(filename.clone());
        }
        if let Some(quality) = self.quality {
            config.quality = quality;
        }
        if let Some(ttl) = self.ttl {
            config.ttl = ttl;
        }
        if let Some(save) = self.save {
            config.save = save;
        }
        if let Some(save_blob) = self.save_blob {
            config.save_blob = save_blob;
        }
        if let Some(sizes) = &self.sizes {
            config.sizes = sizes.clone();
        }
        if let Some(pool_size) = self.pool_size {
            config.pool_size = pool_size;
        }
    }
}

/// Blob store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory of the filesystem blob store
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "~/.rendition/blobs".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: pretty or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
