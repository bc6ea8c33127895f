//! Shared types for the toonify stylization pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can build and inspect
/// buffers without depending on `image` directly.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// The visual style a run produces.
///
/// Parsing never fails: names are matched case-insensitively and
/// anything unrecognized falls back to [`Style::Comic`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Style {
    /// Smoothed, posterized colors with bold black outlines.
    #[default]
    Comic,
    /// Heavier smoothing, fewer colors, stronger edges and saturation.
    Anime,
    /// Grayscale color-dodge sketch.
    Pencil,
}

impl Style {
    /// All styles, in display order.
    pub const ALL: [Self; 3] = [Self::Comic, Self::Anime, Self::Pencil];

    /// Resolve a style name, falling back to [`Style::Comic`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "anime" => Self::Anime,
            "pencil" => Self::Pencil,
            _ => Self::Comic,
        }
    }

    /// Lowercase name, as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comic => "comic",
            Self::Anime => "anime",
            Self::Pencil => "pencil",
        }
    }
}

impl From<String> for Style {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<&str> for Style {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serde support for color levels that saturates instead of rejecting.
mod color_levels_serde {
    use serde::{Deserialize, Deserializer};

    use super::StyleSettings;

    /// Deserialize any JSON number as a level count. Fractions are
    /// truncated, values below the minimum are raised to it and values
    /// past `u32::MAX` saturate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let levels = f64::deserialize(deserializer)?;
        Ok(levels.clamp(
            f64::from(StyleSettings::MIN_COLOR_LEVELS),
            f64::from(u32::MAX),
        ) as u32)
    }
}

/// Per-call settings for the stylization pipeline.
///
/// Every field has a documented default and a safe minimum. Values
/// below the minimum are clamped by [`normalized`](Self::normalized)
/// at pipeline entry, never rejected.
///
/// Field names serialize as camelCase. The upload form's
/// `colorSimplification` and `smoothingLevel` names are accepted as
/// aliases, and any field may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleSettings {
    /// Which style to render.
    pub style: Style,

    /// Edge sensitivity. 50 leaves the Sobel magnitude unscaled.
    pub edge_strength: f32,

    /// Distinct values per color channel after posterization.
    #[serde(
        alias = "colorSimplification",
        deserialize_with = "color_levels_serde::deserialize"
    )]
    pub color_levels: u32,

    /// Smoothing radius. Zero disables smoothing.
    #[serde(alias = "smoothingLevel")]
    pub smoothing_radius: f32,

    /// Outline thickness (comic only). Controls how far bold edges are
    /// dilated.
    pub line_thickness: f32,

    /// Saturation multiplier applied last (comic only). 1.0 is neutral.
    pub saturation: f32,

    /// Whether outlines are dilated (comic only).
    pub bold_edges: bool,
}

impl StyleSettings {
    /// Default edge strength.
    pub const DEFAULT_EDGE_STRENGTH: f32 = 50.0;
    /// Default number of color levels per channel.
    pub const DEFAULT_COLOR_LEVELS: u32 = 8;
    /// Default smoothing radius.
    pub const DEFAULT_SMOOTHING_RADIUS: f32 = 7.0;
    /// Default comic line thickness.
    pub const DEFAULT_LINE_THICKNESS: f32 = 5.0;
    /// Default comic saturation multiplier.
    pub const DEFAULT_SATURATION: f32 = 1.0;
    /// Default for comic bold edges.
    pub const DEFAULT_BOLD_EDGES: bool = true;

    /// Smallest usable number of color levels. One level would divide
    /// by zero in the quantizer.
    pub const MIN_COLOR_LEVELS: u32 = 2;

    /// Default settings for the given style.
    #[must_use]
    pub fn for_style(style: Style) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    /// Return a copy with every numeric field clamped to its minimum.
    ///
    /// Negative and NaN values become zero; `color_levels` below
    /// [`MIN_COLOR_LEVELS`](Self::MIN_COLOR_LEVELS) is raised to it.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            style: self.style,
            edge_strength: self.edge_strength.max(0.0),
            color_levels: self.color_levels.max(Self::MIN_COLOR_LEVELS),
            smoothing_radius: self.smoothing_radius.max(0.0),
            line_thickness: self.line_thickness.max(0.0),
            saturation: self.saturation.max(0.0),
            bold_edges: self.bold_edges,
        }
    }
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            style: Style::default(),
            edge_strength: Self::DEFAULT_EDGE_STRENGTH,
            color_levels: Self::DEFAULT_COLOR_LEVELS,
            smoothing_radius: Self::DEFAULT_SMOOTHING_RADIUS,
            line_thickness: Self::DEFAULT_LINE_THICKNESS,
            saturation: Self::DEFAULT_SATURATION,
            bold_edges: Self::DEFAULT_BOLD_EDGES,
        }
    }
}

/// Why a pixel buffer was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum BufferError {
    /// Width or height is zero.
    #[error("buffer dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension {
        /// Supplied width.
        width: u32,
        /// Supplied height.
        height: u32,
    },

    /// Pixel array length does not equal `width * height * 4`.
    #[error("pixel data length {actual} does not match expected {expected}")]
    LengthMismatch {
        /// `width * height * 4`.
        expected: u64,
        /// Length actually supplied.
        actual: u64,
    },

    /// Two layers being blended have different sizes.
    #[error("layer dimensions differ: {left:?} vs {right:?}")]
    DimensionMismatch {
        /// Dimensions of the base layer.
        left: Dimensions,
        /// Dimensions of the blended layer.
        right: Dimensions,
    },
}

/// Errors that can occur while stylizing.
///
/// The pipeline clamps every setting, so the only failure is a
/// malformed buffer. A failed call produces no partial output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// The buffer is malformed.
    #[error("invalid pixel buffer: {0}")]
    InvalidBuffer(#[from] BufferError),
}
