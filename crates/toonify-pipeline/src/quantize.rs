//! Channel-wise posterization.

use crate::buffer::{PixelBuffer, to_channel};
use crate::types::StyleSettings;

/// Posterize each of R, G, B to at most `levels` evenly spaced values.
///
/// `levels` is clamped to at least 2. With `step = 255 / (levels - 1)`
/// every channel maps to `round(round(v / step) * step)`. Alpha is
/// unchanged. `levels = 256` (or more) leaves every value as it was.
#[must_use = "returns the posterized buffer"]
pub fn quantize(buffer: &PixelBuffer, levels: u32) -> PixelBuffer {
    let levels = levels.max(StyleSettings::MIN_COLOR_LEVELS);
    #[allow(clippy::cast_precision_loss)]
    let step = 255.0 / (levels - 1) as f32;
    let snap = |v: u8| to_channel((f32::from(v) / step).round() * step);
    buffer.map_pixels(|[r, g, b, a]| [snap(r), snap(g), snap(b), a])
}
