//! Image info and EXIF extraction.

use exif::{Field, In, Reader, Tag, Value};
use image::ColorType;
use std::io::Cursor;

use super::attributes;
use super::decode::{format_to_string, Probe};
use super::orientation::Orientation;
use crate::types::ImageInfo;

/// Prefix for every EXIF-derived info key, GPS tags included.
pub const EXIF_PREFIX: &str = "exif_";

/// Fills an [`ImageInfo`] from the encoded bytes and header facts.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Record container attributes, EXIF tags, the optional filename, and the
    /// probed format, dimensions and mode. Returns the image's orientation.
    ///
    /// Tags that are not valid UTF-8 or are too long are logged and skipped.
    pub fn extract(
        raw: &[u8],
        probe: &Probe,
        filename: Option<&str>,
        info: &mut ImageInfo,
    ) -> Orientation {
        for (key, value) in attributes::read(raw, probe.format) {
            set(info, &key, &value);
        }

        let orientation = match Reader::new().read_from_container(&mut Cursor::new(raw)) {
            Ok(exif) => {
                for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
                    Self::set_field(info, field);
                }
                exif.get_field(Tag::Orientation, In::PRIMARY)
                    .and_then(|f| f.value.get_uint(0))
                    .map(Orientation::from_code)
                    .unwrap_or_default()
            }
            Err(e) => {
                tracing::trace!("No EXIF data: {e}");
                Orientation::NORMAL
            }
        };

        if let Some(filename) = filename {
            set(info, "filename", filename.as_bytes());
        }
        info.insert("width", probe.width.to_string());
        info.insert("height", probe.height.to_string());
        info.insert("format", format_to_string(probe.format));
        info.insert("mode", color_mode(probe.color));
        orientation
    }

    fn set_field(info: &mut ImageInfo, field: &Field) {
        let key = format!("{EXIF_PREFIX}{}", tag_name(field.tag));
        match &field.value {
            Value::Ascii(strings) => set(info, &key, &strings.join(&b' ')),
            Value::Undefined(bytes, _) => set(info, &key, bytes),
            value => {
                if let Some(text) = stringify(value) {
                    set(info, &key, text.as_bytes());
                }
            }
        }
    }
}

/// Conventional mode name for a decoded color type.
pub fn color_mode(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "I;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "RGBF",
        ColorType::Rgba32F => "RGBAF",
        _ => "",
    }
}

fn set(info: &mut ImageInfo, key: &str, value: &[u8]) {
    if std::str::from_utf8(value).is_err() {
        tracing::debug!("Value not UTF-8 safe for info key: {key}");
    } else if !info.insert_bytes(key, value) {
        tracing::debug!("Value too large for info key: {key} ({})", value.len());
    }
}

/// Known tags by name; unknown ones by number.
fn tag_name(tag: Tag) -> String {
    if tag.description().is_some() {
        tag.to_string()
    } else {
        tag.number().to_string()
    }
}

/// Numeric values as a bare number, or a parenthesized tuple when there
/// are several.
fn stringify(value: &Value) -> Option<String> {
    let parts: Vec<String> = match value {
        Value::Byte(v) => v.iter().map(|x| x.to_string()).collect(),
        Value::Short(v) => v.iter().map(|x| x.to_string()).collect(),
        Value::Long(v) => v.iter().map(|x| x.to_string()).collect(),
        Value::SByte(v) => v.iter().map(|x| x.to_string()).collect(),
        Value::SShort(v) => v.iter().map(|x| x.to_string()).collect(),
        Value::SLong(v) => v.iter().map(|x| x.to_string()).collect(),
        Value::Rational(v) => v.iter().map(|r| format!("{}/{}", r.num, r.denom)).collect(),
        Value::SRational(v) => v.iter().map(|r| format!("{}/{}", r.num, r.denom)).collect(),
        Value::Float(v) => v.iter().map(|x| x.to_string()).collect(),
        Value::Double(v) => v.iter().map(|x| x.to_string()).collect(),
        _ => return None,
    };
    match parts.as_slice() {
        [] => None,
        [single] => Some(single.clone()),
        _ => Some(format!("({})", parts.join(", "))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::ImageFormat;

    /// Splice an APP1 segment carrying a single orientation tag into a JPEG.
    pub(crate) fn with_orientation(jpeg: &[u8], code: u8) -> Vec<u8> {
        let app1: [u8; 36] = [
            0xFF, 0xE1, 0x00, 0x22, b'E', b'x', b'i', b'f', 0x00, 0x00, // APP1 header
            0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00, // TIFF header, little-endian
            0x01, 0x00, // one entry
            0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, code, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, // no next IFD
        ];
        let mut out = Vec::with_capacity(jpeg.len() + app1.len());
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&app1);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        crate::pipeline::transform::encode_jpeg(image::DynamicImage::new_rgb8(width, height), 80)
            .unwrap()
    }

    fn probe(width: u32, height: u32) -> Probe {
        Probe {
            format: ImageFormat::Jpeg,
            width,
            height,
            color: ColorType::Rgb8,
        }
    }

    #[test]
    fn test_basic_info_without_exif() {
        let mut info = ImageInfo::new();
        let orientation =
            MetadataExtractor::extract(&jpeg(40, 30), &probe(40, 30), None, &mut info);
        assert_eq!(orientation, Orientation::NORMAL);
        assert_eq!(info.get("format"), Some("JPEG"));
        assert_eq!(info.get("width"), Some("40"));
        assert_eq!(info.get("height"), Some("30"));
        assert_eq!(info.get("mode"), Some("RGB"));
        assert!(!info.contains_key("filename"));
    }

    #[test]
    fn test_orientation_tag_is_read() {
        let raw = with_orientation(&jpeg(40, 30), 6);
        let mut info = ImageInfo::new();
        let orientation = MetadataExtractor::extract(&raw, &probe(40, 30), None, &mut info);
        assert_eq!(orientation.code(), 6);
        assert_eq!(info.get("exif_orientation"), Some("6"));
    }

    #[test]
    fn test_out_of_range_orientation_is_normal() {
        let raw = with_orientation(&jpeg(40, 30), 9);
        let mut info = ImageInfo::new();
        let orientation = MetadataExtractor::extract(&raw, &probe(40, 30), None, &mut info);
        assert_eq!(orientation, Orientation::NORMAL);
    }

    #[test]
    fn test_filename_is_recorded() {
        let mut info = ImageInfo::new();
        MetadataExtractor::extract(&jpeg(4, 4), &probe(4, 4), Some("cat.jpg"), &mut info);
        assert_eq!(info.get("filename"), Some("cat.jpg"));
    }

    #[test]
    fn test_png_text_is_recorded_without_prefix() {
        let raw = crate::pipeline::attributes::tests::png_with_text("Title", "Beach at dusk");
        let probe = Probe {
            format: ImageFormat::Png,
            width: 4,
            height: 3,
            color: ColorType::Rgb8,
        };
        let mut info = ImageInfo::new();
        MetadataExtractor::extract(&raw, &probe, None, &mut info);
        assert_eq!(info.get("title"), Some("Beach at dusk"));
        assert!(!info.contains_key("exif_title"));
        assert_eq!(info.get("format"), Some("PNG"));
    }

    #[test]
    fn test_jfif_header_is_recorded() {
        let mut info = ImageInfo::new();
        MetadataExtractor::extract(&jpeg(4, 4), &probe(4, 4), None, &mut info);
        assert!(info.contains_key("jfif"));
        assert!(info.contains_key("jfif_density"));
    }

    #[test]
    fn test_stringify_tuples() {
        assert_eq!(stringify(&Value::Byte(vec![2, 2, 0, 0])).unwrap(), "(2, 2, 0, 0)");
        assert_eq!(stringify(&Value::Short(vec![6])).unwrap(), "6");
        assert!(stringify(&Value::Short(vec![])).is_none());
    }

    #[test]
    fn test_color_mode_names() {
        assert_eq!(color_mode(ColorType::L8), "L");
        assert_eq!(color_mode(ColorType::La8), "LA");
        assert_eq!(color_mode(ColorType::Rgb8), "RGB");
        assert_eq!(color_mode(ColorType::Rgba16), "RGBA;16");
    }
}
