//! The RGBA raster container every stage consumes and produces.
//!
//! A [`PixelBuffer`] is a validated [`RgbaImage`]: both dimensions are
//! non-zero and the pixel array holds exactly `width * height * 4`
//! bytes. Stages take `&PixelBuffer` and return a fresh buffer, so an
//! input is never modified in place.

use image::{Rgba, RgbaImage};

use crate::types::{BufferError, Dimensions, PipelineError};

/// RGBA pixel data, row-major, top-to-bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer(RgbaImage);

impl PixelBuffer {
    /// Build a buffer from raw RGBA bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBuffer`] if either dimension is
    /// zero or `pixels.len() != width * height * 4`.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, PipelineError> {
        check_dimensions(width, height)?;
        let expected = u64::from(width) * u64::from(height) * 4;
        let actual = u64::try_from(pixels.len()).unwrap_or(u64::MAX);
        if expected != actual {
            return Err(BufferError::LengthMismatch { expected, actual }.into());
        }
        RgbaImage::from_raw(width, height, pixels)
            .map(Self)
            .ok_or_else(|| BufferError::LengthMismatch { expected, actual }.into())
    }

    /// Wrap an already-decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBuffer`] if the image is empty.
    pub fn from_image(image: RgbaImage) -> Result<Self, PipelineError> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self(image))
    }

    /// A buffer where every pixel is `rgba`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBuffer`] if either dimension is zero.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, PipelineError> {
        check_dimensions(width, height)?;
        Ok(Self(RgbaImage::from_pixel(width, height, Rgba(rgba))))
    }

    /// Build a buffer of the given (already valid) size pixel by pixel.
    pub(crate) fn from_fn(dimensions: Dimensions, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        Self(RgbaImage::from_fn(
            dimensions.width,
            dimensions.height,
            |x, y| Rgba(f(x, y)),
        ))
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Width and height together.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.0.width(),
            height: self.0.height(),
        }
    }

    /// The RGBA pixel at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.0.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Raw RGBA bytes.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.0.as_raw()
    }

    /// Borrow the underlying image.
    #[must_use]
    pub const fn as_image(&self) -> &RgbaImage {
        &self.0
    }

    /// Apply `f` to every pixel independently, producing a new buffer.
    pub(crate) fn map_pixels(&self, f: impl Fn([u8; 4]) -> [u8; 4]) -> Self {
        let mut out = self.0.clone();
        for px in out.pixels_mut() {
            px.0 = f(px.0);
        }
        Self(out)
    }

    /// Combine two same-sized buffers pixel by pixel.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::DimensionMismatch`] if the sizes differ.
    pub(crate) fn zip_map(
        &self,
        other: &Self,
        f: impl Fn([u8; 4], [u8; 4]) -> [u8; 4],
    ) -> Result<Self, PipelineError> {
        if self.dimensions() != other.dimensions() {
            return Err(BufferError::DimensionMismatch {
                left: self.dimensions(),
                right: other.dimensions(),
            }
            .into());
        }
        let mut out = self.0.clone();
        for (px, layer) in out.pixels_mut().zip(other.0.pixels()) {
            px.0 = f(px.0, layer.0);
        }
        Ok(Self(out))
    }
}

const fn check_dimensions(width: u32, height: u32) -> Result<(), PipelineError> {
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidBuffer(BufferError::ZeroDimension {
            width,
            height,
        }));
    }
    Ok(())
}

/// Round a working value to the nearest channel value, saturating at
/// the ends of the range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Box-average intensity `(R + G + B) / 3`.
pub(crate) fn box_intensity(px: [u8; 4]) -> f32 {
    (f32::from(px[0]) + f32::from(px[1]) + f32::from(px[2])) / 3.0
}

/// BT.601 luma `0.299 R + 0.587 G + 0.114 B`.
pub(crate) fn luma(px: [u8; 4]) -> f32 {
    0.114f32.mul_add(
        f32::from(px[2]),
        0.299f32.mul_add(f32::from(px[0]), 0.587 * f32::from(px[1])),
    )
}
