//! Image codecs: a fast, strict primary decoder and a slow, forgiving
//! fallback that re-encodes damaged input into something the primary accepts.
//!
//! Both sit behind traits so a job can be driven with test doubles.

use image::codecs::gif::GifDecoder;
use image::{
    AnimationDecoder, ColorType, DynamicImage, GrayImage, ImageBuffer, ImageDecoder, ImageFormat,
    ImageReader, Luma, LumaA, RgbImage, RgbaImage,
};
use std::io::Cursor;

use crate::error::CodecError;

/// Header-level facts about an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// Detected container format
    pub format: ImageFormat,
    /// Stored pixel width
    pub width: u32,
    /// Stored pixel height
    pub height: u32,
    /// Pixel layout the decoder will produce
    pub color: ColorType,
}

/// Request for a reduced-resolution decode no smaller than the given bound.
///
/// Dimensions are in stored-buffer space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeHint {
    pub width: u32,
    pub height: u32,
}

/// The primary codec.
pub trait ImageCodec: Send + Sync {
    /// Read format and dimensions without decoding pixels.
    fn probe(&self, raw: &[u8]) -> Result<Probe, CodecError>;

    /// Decode pixels, optionally at reduced resolution.
    fn decode(&self, raw: &[u8], hint: Option<DecodeHint>) -> Result<DynamicImage, CodecError>;
}

/// The fallback codec, invoked at most once per job.
pub trait RecoveryCodec: Send + Sync {
    /// Read format and dimensions, tolerating damage.
    fn probe(&self, raw: &[u8]) -> Result<Probe, CodecError>;

    /// Decode tolerantly and re-encode in the same format.
    fn recode(&self, raw: &[u8], quality: u8) -> Result<Vec<u8>, CodecError>;
}

/// Primary codec. JPEG goes through `jpeg-decoder` so the decode hint can use
/// IDCT scaling; a JPEG without its EOI marker is rejected as truncated.
/// Every other format is decoded by the `image` crate at full size.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictCodec;

impl ImageCodec for StrictCodec {
    fn probe(&self, raw: &[u8]) -> Result<Probe, CodecError> {
        probe_bytes(raw)
    }

    fn decode(&self, raw: &[u8], hint: Option<DecodeHint>) -> Result<DynamicImage, CodecError> {
        match image::guess_format(raw) {
            Ok(ImageFormat::Jpeg) => {
                if !has_eoi_marker(raw) {
                    return Err(CodecError::Corrupt("missing JPEG EOI marker".into()));
                }
                decode_jpeg_scaled(raw, hint)
            }
            Ok(format) => Ok(image::load_from_memory_with_format(raw, format)?),
            Err(_) => Err(CodecError::UnknownFormat),
        }
    }
}

/// Upper bound on GIF frames tried when the first one is damaged.
const MAX_GIF_FRAMES: usize = 64;

/// Fallback codec. Re-encodes damaged input in its source format:
/// - JPEG: the `image` crate, which pads truncated scans, then `jpeg-decoder`
///   without the EOI check
/// - PNG: rows are read until the damage and the rest is zero-filled
/// - GIF: the first frame that decodes
/// - anything else: the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct TolerantCodec;

impl RecoveryCodec for TolerantCodec {
    fn probe(&self, raw: &[u8]) -> Result<Probe, CodecError> {
        probe_bytes(raw)
    }

    fn recode(&self, raw: &[u8], quality: u8) -> Result<Vec<u8>, CodecError> {
        let format = image::guess_format(raw).map_err(|_| CodecError::UnknownFormat)?;
        let image = match format {
            ImageFormat::Jpeg => image::load_from_memory_with_format(raw, format).or_else(|e| {
                tracing::debug!("image crate rejected damaged JPEG ({e}), trying jpeg-decoder");
                decode_jpeg_scaled(raw, None)
            })?,
            ImageFormat::Png => image::load_from_memory_with_format(raw, format).or_else(|e| {
                tracing::debug!("image crate rejected damaged PNG ({e}), reading rows until the damage");
                decode_png_partial(raw)
            })?,
            ImageFormat::Gif => image::load_from_memory_with_format(raw, format).or_else(|e| {
                tracing::debug!("image crate rejected damaged GIF ({e}), trying later frames");
                first_gif_frame(raw)
            })?,
            _ => image::load_from_memory_with_format(raw, format)?,
        };

        match format {
            ImageFormat::Jpeg => Ok(super::transform::encode_jpeg(image, quality)?),
            _ => {
                let mut buffer = Cursor::new(Vec::new());
                image.write_to(&mut buffer, format)?;
                Ok(buffer.into_inner())
            }
        }
    }
}

/// Read the header through the `image` crate's format sniffing.
fn probe_bytes(raw: &[u8]) -> Result<Probe, CodecError> {
    let reader = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(image::ImageError::from)?;
    let format = reader.format().ok_or(CodecError::UnknownFormat)?;
    let decoder = reader.into_decoder()?;
    let (width, height) = decoder.dimensions();
    Ok(Probe {
        format,
        width,
        height,
        color: decoder.color_type(),
    })
}

/// Whether the data ends in EOI, ignoring trailing zero padding. An EOI
/// further in (an embedded thumbnail's) does not count.
fn has_eoi_marker(raw: &[u8]) -> bool {
    let end = raw.iter().rposition(|&b| b != 0x00).map_or(0, |i| i + 1);
    raw[..end].ends_with(&[0xFF, 0xD9])
}

/// Decode a damaged PNG row by row, keeping every row read before the damage
/// and zero-filling the rest.
fn decode_png_partial(raw: &[u8]) -> Result<DynamicImage, CodecError> {
    let mut decoder = png::Decoder::new(Cursor::new(raw));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let (width, height) = (reader.info().width, reader.info().height);
    if reader.info().interlaced {
        return Err(CodecError::Corrupt("cannot recover an interlaced PNG".into()));
    }

    let (color, _) = reader.output_color_type();
    let stride = reader.output_line_size(width);
    if stride == 0 {
        return Err(CodecError::Corrupt("empty PNG rows".into()));
    }
    let mut pixels = vec![0u8; stride * height as usize];
    let mut rows = 0u32;
    for line in pixels.chunks_exact_mut(stride) {
        match reader.next_row() {
            Ok(Some(row)) => {
                let data = row.data();
                let n = data.len().min(stride);
                line[..n].copy_from_slice(&data[..n]);
                rows += 1;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("PNG data ends after {rows} of {height} rows: {e}");
                break;
            }
        }
    }
    if rows == 0 {
        return Err(CodecError::Corrupt("no PNG rows could be read".into()));
    }

    let image = match color {
        png::ColorType::Grayscale => {
            GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        png::ColorType::GrayscaleAlpha => {
            ImageBuffer::<LumaA<u8>, _>::from_raw(width, height, pixels)
                .map(DynamicImage::ImageLumaA8)
        }
        png::ColorType::Rgb => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        png::ColorType::Rgba => {
            RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
        }
        png::ColorType::Indexed => None,
    };
    image.ok_or_else(|| {
        CodecError::Corrupt(format!("PNG rows do not fill {width}x{height} as {color:?}"))
    })
}

/// The first GIF frame that decodes, as RGBA.
fn first_gif_frame(raw: &[u8]) -> Result<DynamicImage, CodecError> {
    let decoder = GifDecoder::new(Cursor::new(raw))?;
    decoder
        .into_frames()
        .take(MAX_GIF_FRAMES)
        .find_map(|frame| frame.ok())
        .map(|frame| DynamicImage::ImageRgba8(frame.into_buffer()))
        .ok_or_else(|| CodecError::Corrupt("no GIF frame could be decoded".into()))
}

/// Decode a JPEG, letting the decoder pick the smallest IDCT scale
/// (1/8, 1/4, 1/2, 1) whose output still covers the hint.
fn decode_jpeg_scaled(raw: &[u8], hint: Option<DecodeHint>) -> Result<DynamicImage, CodecError> {
    let mut decoder = jpeg_decoder::Decoder::new(raw);
    decoder.read_info()?;
    let info = decoder
        .info()
        .ok_or_else(|| CodecError::Corrupt("missing JPEG frame header".into()))?;

    let (width, height) = match hint {
        Some(hint) => {
            let (w, h) = decoder.scale(clamp_u16(hint.width), clamp_u16(hint.height))?;
            (u32::from(w), u32::from(h))
        }
        None => (u32::from(info.width), u32::from(info.height)),
    };

    let pixels = decoder.decode()?;
    let image = match info.pixel_format {
        jpeg_decoder::PixelFormat::L8 => {
            GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        jpeg_decoder::PixelFormat::L16 => {
            let samples: Vec<u16> = pixels
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            ImageBuffer::<Luma<u16>, _>::from_raw(width, height, samples)
                .map(DynamicImage::ImageLuma16)
        }
        jpeg_decoder::PixelFormat::RGB24 => {
            RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        jpeg_decoder::PixelFormat::CMYK32 => {
            RgbImage::from_raw(width, height, cmyk_to_rgb(&pixels)).map(DynamicImage::ImageRgb8)
        }
        #[allow(unreachable_patterns)]
        _ => None,
    };
    image.ok_or_else(|| {
        CodecError::Corrupt(format!(
            "decoded JPEG buffer does not match {width}x{height}"
        ))
    })
}

fn clamp_u16(value: u32) -> u16 {
    value.clamp(1, u32::from(u16::MAX)) as u16
}

fn cmyk_to_rgb(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() / 4 * 3);
    for pixel in input.chunks_exact(4) {
        let k = 255 - u16::from(pixel[3]);
        for &channel in &pixel[..3] {
            let c = 255 - u16::from(channel);
            output.push((k * c / 255) as u8);
        }
    }
    output
}

/// Convert an ImageFormat to its conventional upper-case name.
///
/// These are the names matched against the configured format whitelist.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::Tiff => "TIFF".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        ImageFormat::Ico => "ICO".to_string(),
        ImageFormat::Pnm => "PPM".to_string(),
        ImageFormat::Avif => "AVIF".to_string(),
        ImageFormat::Tga => "TGA".to_string(),
        ImageFormat::Qoi => "QOI".to_string(),
        _ => String::new(),
    }
}
