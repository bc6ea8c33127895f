//! Layer blending.
//!
//! [`composite`] stamps a black/white edge mask onto a color layer with
//! a multiply blend. [`color_dodge`] brightens a base layer by a
//! secondary layer and is what turns a grayscale photo plus its blurred
//! negative into a pencil sketch.
//!
//! Both produce fully opaque output.

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::types::PipelineError;

/// How two layers are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    /// `base * layer / 255`.
    Multiply,
    /// `min(255, base * 256 / (256 - layer))`.
    ColorDodge,
}

impl BlendMode {
    /// Blend a single channel value.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply(self, base: u8, layer: u8) -> u8 {
        let (base, layer) = (u32::from(base), u32::from(layer));
        let value = match self {
            Self::Multiply => (base * layer + 127) / 255,
            // The denominator is at least 1, so a full-white layer
            // saturates instead of dividing by zero.
            Self::ColorDodge => (base * 256 / (256 - layer)).min(255),
        };
        value as u8
    }
}

/// Blend `layer` onto `base` channel by channel. Alpha is set to 255.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] if the layers differ in size.
pub fn blend(
    base: &PixelBuffer,
    layer: &PixelBuffer,
    mode: BlendMode,
) -> Result<PixelBuffer, PipelineError> {
    base.zip_map(layer, |b, l| {
        [
            mode.apply(b[0], l[0]),
            mode.apply(b[1], l[1]),
            mode.apply(b[2], l[2]),
            255,
        ]
    })
}

/// Multiply an edge mask onto a color layer.
///
/// White mask pixels leave the color unchanged; black mask pixels force
/// black, so edges render as dark strokes.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] if the layers differ in size.
pub fn composite(color: &PixelBuffer, mask: &PixelBuffer) -> Result<PixelBuffer, PipelineError> {
    blend(color, mask, BlendMode::Multiply)
}

/// Color-dodge `layer` onto `base`.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] if the layers differ in size.
pub fn color_dodge(base: &PixelBuffer, layer: &PixelBuffer) -> Result<PixelBuffer, PipelineError> {
    blend(base, layer, BlendMode::ColorDodge)
}
