//! Image processing pipeline components.
//!
//! This module contains all the stages of the rendition pipeline:
//! - **size**: Parse size descriptors
//! - **orientation**: Resolve EXIF orientation to geometric operations
//! - **decode**: Strict and tolerant codecs
//! - **attributes**: Container attributes outside EXIF
//! - **metadata**: Extract image info and EXIF tags
//! - **validate**: Format whitelist and size limits
//! - **hash**: Content checksum and storage keys
//! - **fit**: Aspect-fit and decode hints
//! - **transform**: Per-size crop, resize, orient and encode
//! - **job**: Per-image state and the decode fallback chain
//! - **pool**: Bounded worker pool
//! - **persist**: Content-addressed upload
//! - **processor**: Orchestrates the full pipeline

pub mod attributes;
pub mod decode;
pub mod fit;
pub mod hash;
pub mod job;
pub mod metadata;
pub mod orientation;
pub mod persist;
pub mod pool;
pub mod processor;
pub mod size;
pub mod transform;
pub mod validate;

// Re-exports for convenient access
pub use decode::{DecodeHint, ImageCodec, Probe, RecoveryCodec, StrictCodec, TolerantCodec};
pub use hash::Checksum;
pub use job::{Codecs, Job, Recovery};
pub use metadata::MetadataExtractor;
pub use orientation::{Orientation, Transform};
pub use pool::{Batch, WorkerPool};
pub use processor::{JobState, Processor};
pub use size::SizeSpec;
pub use transform::{Rendition, TransformTask};
pub use validate::Validator;
