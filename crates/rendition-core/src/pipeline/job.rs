//! A single image job: the raw bytes, what has been learned about them, and
//! the decode fallback chain.

use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;

use super::decode::{format_to_string, ImageCodec, RecoveryCodec, StrictCodec, TolerantCodec};
use super::fit::{decode_hint, fit_sizes};
use super::hash::Checksum;
use super::metadata::MetadataExtractor;
use super::orientation::Orientation;
use super::size::SizeSpec;
use super::transform::{ImageSource, TransformTask};
use super::validate::Validator;
use crate::config::ProcessorConfig;
use crate::error::{BadImage, CodecError, ProcessingError};
use crate::types::ImageInfo;

/// Whether the fallback codec has rewritten the job's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Recovery {
    #[default]
    NotRecovered,
    Recovered,
}

/// The primary and fallback codecs a job decodes with.
#[derive(Clone)]
pub struct Codecs {
    pub primary: Arc<dyn ImageCodec>,
    pub fallback: Arc<dyn RecoveryCodec>,
}

impl Default for Codecs {
    fn default() -> Self {
        Self {
            primary: Arc::new(StrictCodec),
            fallback: Arc::new(TolerantCodec),
        }
    }
}

/// Per-image state for one `process` call.
pub struct Job {
    original: Arc<[u8]>,
    raw: Arc<[u8]>,
    checksum: Checksum,
    recovery: Recovery,
    orientation: Orientation,
    sizes: Vec<SizeSpec>,
    info: ImageInfo,
    codecs: Codecs,
    validator: Validator,
    quality: u8,
    filename: Option<String>,
}

impl Job {
    /// Set up a job. Fails only on malformed size descriptors.
    pub fn new(
        config: &ProcessorConfig,
        raw: Vec<u8>,
        codecs: Codecs,
    ) -> Result<Self, ProcessingError> {
        let sizes = SizeSpec::parse_all(&config.sizes)?;

        let start = Instant::now();
        let checksum = Checksum::of(&raw);
        tracing::trace!("  Checksum: {:?}", start.elapsed());

        let raw: Arc<[u8]> = raw.into();
        Ok(Self {
            original: raw.clone(),
            raw,
            checksum,
            recovery: Recovery::NotRecovered,
            orientation: Orientation::NORMAL,
            sizes,
            info: ImageInfo::new(),
            codecs,
            validator: Validator::new(config),
            quality: config.quality,
            filename: config.filename.clone(),
        })
    }

    /// Current bytes: the input, or the fallback codec's re-encoding of it.
    pub fn raw(&self) -> &Arc<[u8]> {
        &self.raw
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub fn recovery(&self) -> Recovery {
        self.recovery
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Size targets, fitted once `load` has run.
    pub fn sizes(&self) -> &[SizeSpec] {
        &self.sizes
    }

    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    pub fn into_info(self) -> ImageInfo {
        self.info
    }

    /// Replace the bytes with the fallback codec's re-encoding. Allowed once.
    ///
    /// The fallback codec's header read is validated first so a disallowed
    /// or oversized image is refused before the expensive decode.
    pub fn recover(&mut self) -> Result<(), BadImage> {
        if self.recovery == Recovery::Recovered {
            return Err(BadImage::AlreadyRecovered);
        }
        self.recovery = Recovery::Recovered;

        let start = Instant::now();
        let probe = self
            .codecs
            .fallback
            .probe(&self.raw)
            .map_err(BadImage::Recode)?;
        self.validator
            .check(&format_to_string(probe.format), probe.width, probe.height)?;

        let recoded = self
            .codecs
            .fallback
            .recode(&self.raw, self.quality)
            .map_err(BadImage::Recode)?;
        tracing::debug!(
            "Fallback codec re-encoded {} -> {} bytes in {:?}",
            self.raw.len(),
            recoded.len(),
            start.elapsed()
        );
        self.raw = recoded.into();
        Ok(())
    }

    /// Run `op` against the primary codec, recovering once on failure.
    ///
    /// Once recovery is spent, the failure is reported through `wrap` with
    /// the underlying codec error.
    fn with_recovery<T>(
        &mut self,
        op: impl Fn(&dyn ImageCodec, &[u8]) -> Result<T, CodecError>,
        wrap: fn(CodecError) -> BadImage,
    ) -> Result<T, BadImage> {
        let error = match op(self.codecs.primary.as_ref(), &self.raw) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        match self.recover() {
            Ok(()) => {
                tracing::warn!("Primary codec failed ({error}), retrying with re-encoded bytes");
            }
            Err(BadImage::AlreadyRecovered) => return Err(wrap(error)),
            Err(e) => return Err(e),
        }
        op(self.codecs.primary.as_ref(), &self.raw).map_err(wrap)
    }

    /// Probe, extract info, validate, fit the sizes, and decode once for
    /// the first size. Returns `None` when no sizes are configured.
    pub fn load(&mut self) -> Result<Option<DynamicImage>, BadImage> {
        let start = Instant::now();
        let probe = self.with_recovery(|codec, raw| codec.probe(raw), BadImage::Open)?;
        tracing::trace!("  Open: {:?}", start.elapsed());

        let start = Instant::now();
        self.orientation = MetadataExtractor::extract(
            &self.original,
            &probe,
            self.filename.as_deref(),
            &mut self.info,
        );
        self.info.insert("checksum", self.checksum.as_hex());
        tracing::trace!("  Info: {:?}", start.elapsed());

        self.validator.check(
            &format_to_string(probe.format),
            probe.width,
            probe.height,
        )?;

        if self.sizes.is_empty() {
            return Ok(None);
        }

        fit_sizes(&mut self.sizes, (probe.width, probe.height), self.orientation);

        let start = Instant::now();
        let hint = decode_hint(&self.sizes[0], self.orientation);
        let image = self.with_recovery(|codec, raw| codec.decode(raw, Some(hint)), BadImage::Load)?;
        tracing::trace!("  Load: {:?}", start.elapsed());

        Ok(Some(image))
    }

    /// One transform task per size, in order. The first task takes the
    /// shared image; every other task decodes the raw bytes itself.
    pub fn transform_tasks(&self, shared: Option<DynamicImage>) -> Vec<TransformTask> {
        let mut shared = shared;
        self.sizes
            .iter()
            .map(|size| {
                let source = match shared.take() {
                    Some(image) => ImageSource::Decoded(image),
                    None => ImageSource::Raw {
                        raw: self.raw.clone(),
                        codec: self.codecs.primary.clone(),
                    },
                };
                TransformTask {
                    size: size.clone(),
                    orientation: self.orientation,
                    quality: self.quality,
                    source,
                }
            })
            .collect()
    }
}
