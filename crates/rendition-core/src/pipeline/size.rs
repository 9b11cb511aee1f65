//! Size descriptor parsing.
//!
//! A size is written `<width>x<height><flags>`, e.g. `300x300` or `50x50c`.
//! The descriptor string doubles as the size's name in results and blob keys.

use crate::error::ProcessingError;

/// Flag character selecting center-crop-then-fill behavior.
pub const CROP_FLAG: char = 'c';

/// A single requested output size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeSpec {
    /// The descriptor as configured, used as the rendition name
    pub name: String,
    /// Target width; overwritten by aspect-fit for non-cropped sizes
    pub width: u32,
    /// Target height; overwritten by aspect-fit for non-cropped sizes
    pub height: u32,
    /// Everything after the dimensions
    pub flags: String,
}

impl SizeSpec {
    /// Parse one descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, ProcessingError> {
        let invalid = || ProcessingError::InvalidSize(descriptor.to_string());

        let (width, rest) = split_digits(descriptor).ok_or_else(invalid)?;
        let rest = rest.strip_prefix('x').ok_or_else(invalid)?;
        let (height, flags) = split_digits(rest).ok_or_else(invalid)?;

        let width: u32 = width.parse().map_err(|_| invalid())?;
        let height: u32 = height.parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }

        Ok(Self {
            name: descriptor.to_string(),
            width,
            height,
            flags: flags.to_string(),
        })
    }

    /// Parse an ordered list of descriptors, failing on the first bad one.
    pub fn parse_all<S: AsRef<str>>(descriptors: &[S]) -> Result<Vec<Self>, ProcessingError> {
        descriptors.iter().map(|d| Self::parse(d.as_ref())).collect()
    }

    /// Whether this size is center-cropped to its exact dimensions.
    pub fn is_cropped(&self) -> bool {
        self.flags.contains(CROP_FLAG)
    }
}

/// Split a leading run of ASCII digits off `s`. `None` if there is none.
fn split_digits(s: &str) -> Option<(&str, &str)> {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    if end == 0 {
        None
    } else {
        Some(s.split_at(end))
    }
}
