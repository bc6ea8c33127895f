//! toonify-io: Upload validation, decoding and PNG encoding.
//!
//! Wraps the sans-IO `toonify-pipeline` with the byte-level concerns of
//! a filter request: refuse bad uploads, decode to a [`PixelBuffer`],
//! stylize, and hand back PNG bytes in a [`FilterResult`].

pub mod codec;
pub mod error;
pub mod generation;
pub mod upload;

use toonify_pipeline::{Clock, Dimensions, PixelBuffer, Style, StyleDiagnostics, StyleSettings};
use tracing::{info, instrument};

pub use codec::{decode, encode_png};
pub use error::{ErrorResponse, ProcessError};
pub use generation::{Generation, RequestTracker};
pub use upload::{MAX_UPLOAD_BYTES, UploadError, validate_upload};

/// The outcome of one successful filter request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    /// The rendered image, PNG-encoded.
    pub png: Vec<u8>,
    /// Size of the rendered image.
    pub dimensions: Dimensions,
    /// The style that was applied.
    pub style: Style,
}

impl FilterResult {
    fn encode(output: &PixelBuffer, style: Style) -> Result<Self, ProcessError> {
        Ok(Self {
            png: encode_png(output)?,
            dimensions: output.dimensions(),
            style,
        })
    }
}

/// Validate, decode, stylize and PNG-encode an upload.
///
/// `mime` is the content type declared by the sender, if known.
///
/// # Errors
///
/// Returns [`ProcessError::Upload`] for refused uploads,
/// [`ProcessError::Decode`] for undecodable bytes,
/// [`ProcessError::Pipeline`] if stylization fails and
/// [`ProcessError::Encode`] if the result cannot be written as PNG.
#[instrument(skip_all, fields(bytes = bytes.len(), style = %settings.style))]
pub fn process(
    bytes: &[u8],
    mime: Option<&str>,
    settings: &StyleSettings,
) -> Result<FilterResult, ProcessError> {
    let format = validate_upload(bytes, mime)?;
    let input = decode(bytes)?;
    info!(
        ?format,
        width = input.width(),
        height = input.height(),
        "decoded upload"
    );
    let output = toonify_pipeline::stylize(&input, settings)?;
    let result = FilterResult::encode(&output, settings.style)?;
    info!(png_bytes = result.png.len(), "stylized image encoded");
    Ok(result)
}

/// Like [`process`], also returning per-stage diagnostics timed against
/// `clock`.
///
/// # Errors
///
/// See [`process`].
#[instrument(skip_all, fields(bytes = bytes.len(), style = %settings.style))]
pub fn process_with_diagnostics<C: Clock>(
    bytes: &[u8],
    mime: Option<&str>,
    settings: &StyleSettings,
    clock: &C,
) -> Result<(FilterResult, StyleDiagnostics), ProcessError> {
    let format = validate_upload(bytes, mime)?;
    let input = decode(bytes)?;
    info!(
        ?format,
        width = input.width(),
        height = input.height(),
        "decoded upload"
    );
    let (staged, diagnostics) =
        toonify_pipeline::stylize_with_diagnostics(&input, settings, clock)?;
    let result = FilterResult::encode(&staged.output, staged.style)?;
    info!(
        png_bytes = result.png.len(),
        total_ms = diagnostics.total_duration.as_secs_f64() * 1000.0,
        "stylized image encoded"
    );
    Ok((result, diagnostics))
}
