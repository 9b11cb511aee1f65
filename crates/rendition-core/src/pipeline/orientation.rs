//! EXIF orientation handling.
//!
//! Maps an EXIF orientation code to the geometric operations that turn the
//! stored pixel buffer into the displayed picture.

use image::DynamicImage;

/// A single geometric operation. Rotations are counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    FlipHorizontal,
    FlipVertical,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Transform {
    /// Apply this operation to an image.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        // `image` rotates clockwise.
        match self {
            Transform::FlipHorizontal => image.fliph(),
            Transform::FlipVertical => image.flipv(),
            Transform::Rotate90 => image.rotate270(),
            Transform::Rotate180 => image.rotate180(),
            Transform::Rotate270 => image.rotate90(),
        }
    }
}

/// A resolved EXIF orientation code (1-8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation(u8);

impl Default for Orientation {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl Orientation {
    /// No-op orientation.
    pub const NORMAL: Orientation = Orientation(1);

    /// Resolve a raw tag value; anything outside 1-8 is treated as normal.
    pub fn from_code(code: u32) -> Self {
        match code {
            1..=8 => Orientation(code as u8),
            _ => Self::NORMAL,
        }
    }

    /// The orientation code.
    pub fn code(self) -> u8 {
        self.0
    }

    /// Whether the stored buffer is transposed relative to the displayed
    /// picture, so width and height swap.
    pub fn is_transposed(self) -> bool {
        self.0 > 4
    }

    /// Swap a `(width, height)` pair when the orientation is transposed.
    ///
    /// Converts between displayed and stored space in either direction.
    pub fn swap_dims(self, dims: (u32, u32)) -> (u32, u32) {
        if self.is_transposed() {
            (dims.1, dims.0)
        } else {
            dims
        }
    }

    /// The ordered operations for this orientation.
    pub fn transforms(self) -> &'static [Transform] {
        use Transform::*;
        match self.0 {
            2 => &[FlipHorizontal],
            3 => &[Rotate180],
            4 => &[FlipVertical],
            5 => &[FlipVertical, Rotate270],
            6 => &[Rotate270],
            7 => &[FlipHorizontal, Rotate270],
            8 => &[Rotate90],
            _ => &[],
        }
    }

    /// Apply every operation in order.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        self.transforms()
            .iter()
            .fold(image, |image, op| op.apply(image))
    }
}
