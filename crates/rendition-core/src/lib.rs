//! Rendition Core - embeddable image rendition library.
//!
//! Rendition takes a raw image and produces EXIF-corrected, resized or
//! cropped JPEG renditions for a configured set of sizes, plus a sanitized
//! info mapping. Results can be stored in a content-addressed blob store
//! keyed by a checksum of the original bytes.
//!
//! # Architecture
//!
//! ```text
//! Bytes → Probe/Info/Validate → Aspect-fit → Decode (first size) ┐
//!                                                                 ├→ per-size transforms → Results → Blob store
//!                                       Re-decode (other sizes) ┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use rendition_core::{Config, MemoryBlobStore, Processor};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> rendition_core::Result<()> {
//!     let config = Config::load()?;
//!     let processor = Processor::new(config.processor)
//!         .with_store(Arc::new(MemoryBlobStore::new()));
//!
//!     let processed = processor.process(std::fs::read("./image.jpg")?).await?;
//!     for (size, bytes) in &processed.results {
//!         println!("{size}: {} bytes", bytes.len());
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod types;

use std::sync::Arc;

// Re-exports for convenient access
pub use config::{Config, ProcessorConfig, ProcessorOverlay};
pub use error::{
    BadImage, CodecError, ConfigError, PoolError, ProcessingError, RenditionError, Result,
    StoreError,
};
pub use pipeline::{Checksum, Codecs, Processor, SizeSpec, WorkerPool};
pub use store::{BlobStore, FilesystemBlobStore, MemoryBlobStore};
pub use types::{ImageInfo, Processed, ProcessingStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Process one image with a throwaway processor.
///
/// `store` is required when `config.save` and `config.save_blob` are both set.
pub async fn process(
    config: ProcessorConfig,
    raw: Vec<u8>,
    store: Option<Arc<dyn BlobStore>>,
) -> Result<Processed> {
    let mut processor = Processor::new(config);
    if let Some(store) = store {
        processor = processor.with_store(store);
    }
    processor.process(raw).await
}
