//! Container attributes that live outside EXIF.
//!
//! - PNG: text chunks (`tEXt`, `zTXt`, `iTXt`) by keyword, `dpi` from `pHYs`,
//!   `gamma` from `gAMA`
//! - JPEG: the JFIF header, `comment` segments, Adobe APP14, and a
//!   `progressive` flag for progressive frames
//! - GIF: `version`, `background`, and the first frame's extension blocks
//!
//! Keys carry no prefix. Values are raw bytes; the caller decides what is
//! UTF-8 safe enough to keep.

use image::ImageFormat;
use std::io::Cursor;

/// One container attribute.
pub type Attribute = (String, Vec<u8>);

/// Attributes found in the container, in file order.
pub fn read(raw: &[u8], format: ImageFormat) -> Vec<Attribute> {
    let mut out = Vec::new();
    match format {
        ImageFormat::Png => png_attributes(raw, &mut out),
        ImageFormat::Jpeg => jpeg_attributes(raw, &mut out),
        ImageFormat::Gif => gif_attributes(raw, &mut out),
        _ => {}
    }
    out
}

fn push(out: &mut Vec<Attribute>, key: &str, value: impl Into<Vec<u8>>) {
    out.push((key.to_string(), value.into()));
}

fn pair(a: impl std::fmt::Display, b: impl std::fmt::Display) -> String {
    format!("({a}, {b})")
}

// ── PNG ─────────────────────────────────────────────────────────────────────

fn png_attributes(raw: &[u8], out: &mut Vec<Attribute>) {
    let reader = match png::Decoder::new(Cursor::new(raw)).read_info() {
        Ok(reader) => reader,
        Err(e) => {
            tracing::trace!("No PNG attributes: {e}");
            return;
        }
    };
    let info = reader.info();

    for chunk in &info.uncompressed_latin1_text {
        push(out, &chunk.keyword, chunk.text.as_bytes());
    }
    for chunk in &info.compressed_latin1_text {
        match chunk.get_text() {
            Ok(text) => push(out, &chunk.keyword, text),
            Err(e) => tracing::debug!("Unreadable zTXt chunk {}: {e}", chunk.keyword),
        }
    }
    for chunk in &info.utf8_text {
        match chunk.get_text() {
            Ok(text) => push(out, &chunk.keyword, text),
            Err(e) => tracing::debug!("Unreadable iTXt chunk {}: {e}", chunk.keyword),
        }
    }

    if let Some(dims) = &info.pixel_dims {
        if let png::Unit::Meter = dims.unit {
            let dpi = |ppm: u32| (f64::from(ppm) * 0.0254).round() as u32;
            push(out, "dpi", pair(dpi(dims.xppu), dpi(dims.yppu)));
        }
    }
    if let Some(gamma) = info.gama_chunk {
        push(out, "gamma", gamma.into_value().to_string());
    }
}

// ── JPEG ────────────────────────────────────────────────────────────────────

/// Walk marker segments up to the first scan.
fn jpeg_attributes(raw: &[u8], out: &mut Vec<Attribute>) {
    if !raw.starts_with(&[0xFF, 0xD8]) {
        return;
    }
    let mut pos = 2;
    while pos + 4 <= raw.len() {
        if raw[pos] != 0xFF {
            tracing::trace!("JPEG marker walk lost sync at byte {pos}");
            break;
        }
        let marker = raw[pos + 1];
        match marker {
            // Fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // Standalone markers
            0x01 | 0xD0..=0xD8 => {
                pos += 2;
                continue;
            }
            // Start of scan or end of image
            0xDA | 0xD9 => break,
            _ => {}
        }

        let len = usize::from(u16::from_be_bytes([raw[pos + 2], raw[pos + 3]]));
        if len < 2 || pos + 2 + len > raw.len() {
            break;
        }
        let data = &raw[pos + 4..pos + 2 + len];
        match marker {
            0xE0 if data.len() >= 12 && data.starts_with(b"JFIF\0") => jfif(data, out),
            0xEE if data.len() >= 12 && data.starts_with(b"Adobe") => {
                push(out, "adobe", u16::from_be_bytes([data[5], data[6]]).to_string());
                push(out, "adobe_transform", data[11].to_string());
            }
            0xFE => push(out, "comment", data),
            0xC2 | 0xC6 | 0xCA | 0xCE => {
                push(out, "progressive", "1");
                push(out, "progression", "1");
            }
            _ => {}
        }
        pos += 2 + len;
    }
}

fn jfif(data: &[u8], out: &mut Vec<Attribute>) {
    let (major, minor) = (data[5], data[6]);
    let unit = data[7];
    let x = u16::from_be_bytes([data[8], data[9]]);
    let y = u16::from_be_bytes([data[10], data[11]]);

    push(out, "jfif", u16::from_be_bytes([major, minor]).to_string());
    push(out, "jfif_version", pair(major, minor));
    push(out, "jfif_unit", unit.to_string());
    push(out, "jfif_density", pair(x, y));
    match unit {
        1 => push(out, "dpi", pair(x, y)),
        // Dots per centimetre
        2 => {
            let dpi = |d: u16| (f64::from(d) * 2.54).round() as u32;
            push(out, "dpi", pair(dpi(x), dpi(y)));
        }
        _ => {}
    }
}

// ── GIF ─────────────────────────────────────────────────────────────────────

/// Header fields, then extension blocks up to the first image descriptor.
fn gif_attributes(raw: &[u8], out: &mut Vec<Attribute>) {
    if raw.len() < 13 || !raw.starts_with(b"GIF") {
        return;
    }
    push(out, "version", &raw[..6]);
    let packed = raw[10];
    push(out, "background", raw[11].to_string());

    let mut pos = 13;
    if packed & 0x80 != 0 {
        pos += 3 << ((packed & 0x07) + 1);
    }

    while pos + 1 < raw.len() && raw[pos] == 0x21 {
        let label = raw[pos + 1];
        let (blocks, next) = sub_blocks(raw, pos + 2);
        match label {
            // Graphic control
            0xF9 => {
                if let Some(block) = blocks.first().filter(|b| b.len() >= 4) {
                    let delay = u32::from(u16::from_le_bytes([block[1], block[2]]));
                    push(out, "duration", (delay * 10).to_string());
                    if block[0] & 0x01 != 0 {
                        push(out, "transparency", block[3].to_string());
                    }
                }
            }
            0xFE => push(out, "comment", blocks.concat()),
            // Application
            0xFF => {
                let looping = blocks.first().is_some_and(|b| *b == b"NETSCAPE2.0");
                if let Some(block) = blocks.get(1).filter(|b| looping && b.len() >= 3) {
                    let count = u16::from_le_bytes([block[1], block[2]]);
                    push(out, "loop", count.to_string());
                }
            }
            _ => {}
        }
        pos = next;
    }
}

/// Data sub-blocks starting at `pos`, and the offset after the terminator.
fn sub_blocks(raw: &[u8], mut pos: usize) -> (Vec<&[u8]>, usize) {
    let mut blocks = Vec::new();
    while pos < raw.len() {
        let len = usize::from(raw[pos]);
        pos += 1;
        if len == 0 {
            break;
        }
        let end = (pos + len).min(raw.len());
        blocks.push(&raw[pos..end]);
        pos = end;
    }
    (blocks, pos)
}
