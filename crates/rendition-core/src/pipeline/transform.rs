//! Per-size transform: crop, resize, orient, normalize color, encode.

use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageResult};
use mozjpeg::{ColorSpace, Compress};
use std::sync::Arc;
use std::time::Instant;

use super::decode::ImageCodec;
use super::fit::decode_hint;
use super::orientation::Orientation;
use super::size::SizeSpec;
use crate::error::{BadImage, RenditionError};
use crate::types::RenditionTimings;

/// Encode an image as JPEG through mozjpeg, with optimized Huffman tables.
pub fn encode_jpeg(image: DynamicImage, quality: u8) -> ImageResult<Vec<u8>> {
    let image = normalize_color(image);
    let (width, height) = image.dimensions();
    let (color_space, pixels) = match image {
        DynamicImage::ImageLuma8(buffer) => (ColorSpace::JCS_GRAYSCALE, buffer.into_raw()),
        other => (ColorSpace::JCS_RGB, other.into_rgb8().into_raw()),
    };

    let mut compress = Compress::new(color_space);
    compress.set_size(width as usize, height as usize);
    compress.set_quality(f32::from(quality.clamp(1, 100)));
    compress.set_optimize_coding(true);

    let mut started = compress.start_compress(Vec::new())?;
    started.write_scanlines(&pixels)?;
    Ok(started.finish()?)
}

/// Convert to a color type the JPEG encoder accepts: 8-bit gray or RGB.
pub fn normalize_color(image: DynamicImage) -> DynamicImage {
    match image.color() {
        ColorType::L8 | ColorType::Rgb8 => image,
        ColorType::L16 => DynamicImage::ImageLuma8(image.to_luma8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

/// Centered crop box with the target's aspect ratio, as `(x, y, width, height)`
/// in stored-buffer coordinates.
///
/// `stored` is the buffer size and `target` the requested size in displayed
/// space; the box is computed in displayed space and swapped back.
pub fn crop_box(
    stored: (u32, u32),
    target: (u32, u32),
    orientation: Orientation,
) -> (u32, u32, u32, u32) {
    let (width, height) = orientation.swap_dims(stored);
    let (target_w, target_h) = (f64::from(target.0), f64::from(target.1));
    let factor = (f64::from(width) / target_w).min(f64::from(height) / target_h);

    let crop_w = ((target_w * factor) as u32).clamp(1, width);
    let crop_h = ((target_h * factor) as u32).clamp(1, height);
    let left = (width - crop_w) / 2;
    let top = (height - crop_h) / 2;

    if orientation.is_transposed() {
        (top, left, crop_h, crop_w)
    } else {
        (left, top, crop_w, crop_h)
    }
}

/// Where a transform task gets its pixels from.
pub enum ImageSource {
    /// The job's already decoded image, handed over by value
    Decoded(DynamicImage),
    /// Decode the job's raw bytes independently
    Raw {
        raw: Arc<[u8]>,
        codec: Arc<dyn ImageCodec>,
    },
}

/// One encoded output.
#[derive(Debug, Clone)]
pub struct Rendition {
    pub name: String,
    pub bytes: Vec<u8>,
    pub timings: RenditionTimings,
}

/// Everything needed to produce one rendition, owned so it can move onto a
/// worker.
pub struct TransformTask {
    pub size: SizeSpec,
    pub orientation: Orientation,
    pub quality: u8,
    pub source: ImageSource,
}

impl TransformTask {
    /// Run the transform to completion.
    pub fn run(self) -> Result<Rendition, RenditionError> {
        let TransformTask {
            size,
            orientation,
            quality,
            source,
        } = self;
        let mut timings = RenditionTimings::default();

        let mut image = match source {
            ImageSource::Decoded(image) => image,
            ImageSource::Raw { raw, codec } => {
                let start = Instant::now();
                let image = codec
                    .decode(&raw, Some(decode_hint(&size, orientation)))
                    .map_err(|source| BadImage::LoadForSize {
                        size: size.name.clone(),
                        source,
                    })?;
                timings.decode = Some(start.elapsed());
                image
            }
        };

        if size.is_cropped() {
            let start = Instant::now();
            let (x, y, w, h) = crop_box(image.dimensions(), (size.width, size.height), orientation);
            image = image.crop_imm(x, y, w, h);
            timings.crop = start.elapsed();
            tracing::trace!("  {}:crop: {:?}", size.name, timings.crop);
        }

        let start = Instant::now();
        let (width, height) = orientation.swap_dims((size.width, size.height));
        image = image.resize_exact(width, height, FilterType::Lanczos3);
        timings.resize = start.elapsed();
        tracing::trace!("  {}:resize: {:?}", size.name, timings.resize);

        if orientation != Orientation::NORMAL {
            let start = Instant::now();
            image = orientation.apply(image);
            timings.transpose = start.elapsed();
            tracing::trace!("  {}:transpose: {:?}", size.name, timings.transpose);
        }

        let start = Instant::now();
        image = normalize_color(image);
        timings.convert = start.elapsed();

        let start = Instant::now();
        let bytes = encode_jpeg(image, quality).map_err(|source| RenditionError::Encode {
            size: size.name.clone(),
            source,
        })?;
        timings.encode = start.elapsed();
        tracing::trace!(
            "  {}:save: {:?} ({} bytes)",
            size.name,
            timings.encode,
            bytes.len()
        );

        Ok(Rendition {
            name: size.name,
            bytes,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::decode::StrictCodec;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    fn task(descriptor: &str, code: u32, source: ImageSource) -> TransformTask {
        TransformTask {
            size: SizeSpec::parse(descriptor).unwrap(),
            orientation: Orientation::from_code(code),
            quality: 70,
            source,
        }
    }

    fn decoded_dims(bytes: &[u8]) -> (u32, u32) {
        image::load_from_memory(bytes).unwrap().dimensions()
    }

    #[test]
    fn test_crop_box_landscape() {
        assert_eq!(
            crop_box((1000, 750), (50, 50), Orientation::NORMAL),
            (125, 0, 750, 750)
        );
    }

    #[test]
    fn test_crop_box_transposed_swaps_back() {
        // Stored 1000x750, displayed 750x1000; a 3:2 target in displayed
        // space is 750x500, centered vertically (top 250).
        assert_eq!(
            crop_box((1000, 750), (300, 200), Orientation::from_code(6)),
            (250, 0, 500, 750)
        );
    }

    #[test]
    fn test_crop_box_stays_inside() {
        let (x, y, w, h) = crop_box((7, 3), (5, 5), Orientation::NORMAL);
        assert!(x + w <= 7 && y + h <= 3);
        assert_eq!((w, h), (3, 3));
    }

    #[test]
    fn test_cropped_output_is_exact() {
        let rendition = task("50x50c", 1, ImageSource::Decoded(gradient(1000, 750)))
            .run()
            .unwrap();
        assert_eq!(rendition.name, "50x50c");
        assert_eq!(decoded_dims(&rendition.bytes), (50, 50));
        assert!(rendition.timings.decode.is_none());
    }

    #[test]
    fn test_cropped_output_is_exact_when_transposed() {
        let rendition = task("80x40c", 6, ImageSource::Decoded(gradient(300, 200)))
            .run()
            .unwrap();
        assert_eq!(decoded_dims(&rendition.bytes), (80, 40));
    }

    #[test]
    fn test_fitted_output_with_orientation() {
        // Fitted sizes are in displayed space: 750x1000 fits 300x300 as 225x300
        let mut spec = task("300x300", 6, ImageSource::Decoded(gradient(1000, 750)));
        spec.size.width = 225;
        spec.size.height = 300;
        let rendition = spec.run().unwrap();
        assert_eq!(decoded_dims(&rendition.bytes), (225, 300));
    }

    #[test]
    fn test_raw_source_decodes_independently() {
        let raw: Arc<[u8]> = encode_jpeg(gradient(400, 300), 90).unwrap().into();
        let rendition = task(
            "40x40c",
            1,
            ImageSource::Raw {
                raw,
                codec: Arc::new(StrictCodec),
            },
        )
        .run()
        .unwrap();
        assert_eq!(decoded_dims(&rendition.bytes), (40, 40));
        assert!(rendition.timings.decode.is_some());
    }

    #[test]
    fn test_raw_source_failure_is_bad_image() {
        let err = task(
            "40x40",
            1,
            ImageSource::Raw {
                raw: Arc::from(&b"bad"[..]),
                codec: Arc::new(StrictCodec),
            },
        )
        .run()
        .unwrap_err();
        assert!(matches!(
            err,
            RenditionError::BadImage(BadImage::LoadForSize { ref size, .. }) if size == "40x40"
        ));
    }

    #[test]
    fn test_gray_alpha_is_converted() {
        let image = DynamicImage::new_luma_a8(10, 10);
        assert_eq!(normalize_color(image).color(), ColorType::Rgb8);
        let gray = DynamicImage::new_luma8(10, 10);
        assert_eq!(normalize_color(gray).color(), ColorType::L8);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let a = encode_jpeg(gradient(64, 48), 70).unwrap();
        let b = encode_jpeg(gradient(64, 48), 70).unwrap();
        assert_eq!(a, b);
        assert_eq!(image::guess_format(&a).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn test_encode_keeps_gray_single_channel() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_fn(32, 16, |x, _| {
            image::Luma([(x * 8) as u8])
        }));
        let bytes = encode_jpeg(gray, 80).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (32, 16));
        assert_eq!(decoded.color(), ColorType::L8);
    }
}
