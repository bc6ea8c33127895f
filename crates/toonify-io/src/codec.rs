//! Decoding uploads into pixel buffers and encoding results as PNG.

use image::ImageEncoder;
use toonify_pipeline::PixelBuffer;

use crate::error::ProcessError;

/// Decode any supported image format into an RGBA buffer.
///
/// # Errors
///
/// Returns [`ProcessError::Decode`] if the bytes cannot be decoded and
/// [`ProcessError::Pipeline`] if the decoded image is empty.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, ProcessError> {
    let img = image::load_from_memory(bytes).map_err(ProcessError::Decode)?;
    Ok(PixelBuffer::from_image(img.to_rgba8())?)
}

/// Encode a buffer as an RGBA PNG.
///
/// # Errors
///
/// Returns [`ProcessError::Encode`] if PNG encoding fails.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, ProcessError> {
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(
            buffer.as_raw(),
            buffer.width(),
            buffer.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(ProcessError::Encode)?;
    Ok(png_bytes)
}
