//! Aspect-preserving fit and the decode hint derived from it.

use super::decode::DecodeHint;
use super::orientation::Orientation;
use super::size::SizeSpec;

/// Shrink `(width, height)` to fit within `(max_width, max_height)` keeping the
/// aspect ratio. Never upscales; each side is at least 1.
pub fn fit_within(dims: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (max_w, max_h) = (u64::from(bounds.0), u64::from(bounds.1));
    let (mut w, mut h) = (u64::from(dims.0), u64::from(dims.1));

    // The height step works on the already width-fitted size.
    if w > max_w {
        h = (h * max_w / w).max(1);
        w = max_w;
    }
    if h > max_h {
        w = (w * max_h / h).max(1);
        h = max_h;
    }
    (w as u32, h as u32)
}

/// Overwrite each non-cropped size with its fitted dimensions.
///
/// `stored` is the decoded buffer size; it is turned into displayed space
/// with the orientation before fitting. Cropped sizes keep their requested
/// dimensions.
pub fn fit_sizes(sizes: &mut [SizeSpec], stored: (u32, u32), orientation: Orientation) {
    let displayed = orientation.swap_dims(stored);
    for size in sizes.iter_mut().filter(|s| !s.is_cropped()) {
        let (w, h) = fit_within(displayed, (size.width, size.height));
        size.width = w;
        size.height = h;
    }
}

/// Decode hint for a size, in stored-buffer space.
pub fn decode_hint(size: &SizeSpec, orientation: Orientation) -> DecodeHint {
    let (width, height) = orientation.swap_dims((size.width, size.height));
    DecodeHint { width, height }
}
