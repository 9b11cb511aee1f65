//! Error types for the Rendition pipeline.
//!
//! Errors are split by who is at fault: the configuration (`ProcessingError`),
//! the image bytes (`BadImage`), or the collaborators the pipeline runs on
//! (`StoreError`, `PoolError`). Storage and scheduler errors are passed through
//! unchanged so callers can tell them apart from image problems.

use thiserror::Error;

/// Top-level error type for Rendition operations.
#[derive(Error, Debug)]
pub enum RenditionError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed job setup (bad size spec, missing collaborator)
    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    /// The image bytes could not be decoded or were rejected
    #[error("Bad image: {0}")]
    BadImage(#[from] BadImage),

    /// A rendition could not be encoded after a successful decode
    #[error("Encode failed for size {size}: {source}")]
    Encode {
        size: String,
        #[source]
        source: image::ImageError,
    },

    /// Blob store failures, propagated as-is
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Worker pool failures (task panicked or was cancelled)
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] PoolError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Job setup errors. Not retryable; the caller has to fix its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    /// A size descriptor did not match `<width>x<height><flags>`
    #[error("Invalid size parameter: {0}")]
    InvalidSize(String),

    /// Blob persistence is enabled but no store was supplied
    #[error("save_blob is enabled but no blob store is configured")]
    NoBlobStore,
}

/// Failures tied to the image bytes themselves. Not retryable with the same bytes.
#[derive(Error, Debug)]
pub enum BadImage {
    /// The initial open/probe failed and recovery could not help
    #[error("Cannot open image: {0}")]
    Open(#[source] CodecError),

    /// The full decode during load failed and recovery could not help
    #[error("Cannot load image: {0}")]
    Load(#[source] CodecError),

    /// A per-size re-decode failed
    #[error("Cannot load image for size {size}: {source}")]
    LoadForSize {
        size: String,
        #[source]
        source: CodecError,
    },

    /// The fallback codec was already used for this job
    #[error("Already converted with the fallback codec")]
    AlreadyRecovered,

    /// The fallback codec failed to re-encode the bytes
    #[error("Fallback conversion failed: {0}")]
    Recode(#[source] CodecError),

    /// No format could be determined
    #[error("Unknown image format")]
    UnknownFormat,

    /// The format is not in the configured whitelist
    #[error("Invalid image format: {0}")]
    InvalidFormat(String),

    /// Dimensions exceed the configured maxima
    #[error("Image too large: {width}x{height}")]
    TooLarge { width: u32, height: u32 },
}

/// Codec-level failures, wrapped into `BadImage` by the pipeline.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Error from the `image` crate
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Error from the scaled JPEG decoder
    #[error("JPEG decode failed: {0}")]
    Jpeg(#[from] jpeg_decoder::Error),

    /// Error from the row-level PNG decoder
    #[error("PNG decode failed: {0}")]
    Png(#[from] png::DecodingError),

    /// Bytes are structurally incomplete or inconsistent
    #[error("{0}")]
    Corrupt(String),

    /// No codec recognizes the bytes
    #[error("unrecognized image data")]
    UnknownFormat,
}

/// Blob store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Worker pool errors.
#[derive(Error, Debug)]
pub enum PoolError {
    /// A task panicked while running
    #[error("task panicked: {0}")]
    Panicked(String),

    /// A task was cancelled before completing (runtime shutting down)
    #[error("task cancelled")]
    Cancelled,

    /// The pool's semaphore was closed
    #[error("worker pool closed")]
    Closed,
}

impl From<tokio::task::JoinError> for PoolError {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_cancelled() {
            PoolError::Cancelled
        } else {
            PoolError::Panicked(e.to_string())
        }
    }
}

/// Convenience type alias for Rendition results.
pub type Result<T> = std::result::Result<T, RenditionError>;

/// Result type for blob store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
