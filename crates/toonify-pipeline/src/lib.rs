//! toonify-pipeline: Pure raster stylization pipeline (sans-IO).
//!
//! Turns an RGBA photo into a cartoon rendering in one of three styles:
//!
//! - **comic**: edge-aware smoothing -> posterization -> Sobel outlines
//!   multiplied onto the colors -> optional saturation.
//! - **anime**: the comic sequence with stronger smoothing, fewer
//!   colors, stronger edges and a fixed saturation boost.
//! - **pencil**: grayscale -> invert -> smooth -> color dodge.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! [`PixelBuffer`]s. Decoding, encoding and upload validation live in
//! `toonify-io`.

pub mod adjust;
pub mod buffer;
pub mod composite;
pub mod diagnostics;
pub mod edge;
pub mod quantize;
pub mod smooth;
pub mod style;
pub mod types;

pub use buffer::PixelBuffer;
pub use composite::BlendMode;
pub use diagnostics::{Clock, StageDiagnostics, StageMetrics, StyleDiagnostics, StyleSummary};
pub use style::{
    CelParams, SketchParams, StagedResult, StylePlan, stylize, stylize_pixels, stylize_staged,
    stylize_with_diagnostics,
};
pub use types::{BufferError, Dimensions, PipelineError, RgbaImage, Style, StyleSettings};
