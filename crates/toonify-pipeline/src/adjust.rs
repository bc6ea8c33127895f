//! Color-space adjustments: grayscale, inversion, saturation.
//!
//! All three use BT.601 luma (`0.299 R + 0.587 G + 0.114 B`) where a
//! luminance is needed and leave alpha untouched.

use crate::buffer::{PixelBuffer, luma, to_channel};

/// Replace R, G and B with the pixel's BT.601 luma.
#[must_use = "returns the grayscale buffer"]
pub fn to_grayscale(buffer: &PixelBuffer) -> PixelBuffer {
    buffer.map_pixels(|px| {
        let l = to_channel(luma(px));
        [l, l, l, px[3]]
    })
}

/// Invert R, G and B (`255 - c`).
///
/// Inverting twice returns the original buffer.
#[must_use = "returns the inverted buffer"]
pub fn invert(buffer: &PixelBuffer) -> PixelBuffer {
    buffer.map_pixels(|[r, g, b, a]| [!r, !g, !b, a])
}

/// Scale each channel's distance from the pixel's luma by `factor`.
///
/// `0` yields grayscale, `1` is the identity and values above one push
/// colors further from gray. Results are clamped to `[0, 255]`.
/// Negative factors are treated as zero.
#[must_use = "returns the adjusted buffer"]
pub fn adjust_saturation(buffer: &PixelBuffer, factor: f32) -> PixelBuffer {
    let factor = factor.max(0.0);
    buffer.map_pixels(|px| {
        let l = luma(px);
        let scale = |c: u8| to_channel((f32::from(c) - l).mul_add(factor, l));
        [scale(px[0]), scale(px[1]), scale(px[2]), px[3]]
    })
}
