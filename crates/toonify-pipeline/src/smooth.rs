//! Edge-preserving smoothing.
//!
//! [`gaussian_blur`] is a plain separable Gaussian over the R/G/B
//! channels. [`smooth`] blends that blur back toward the source pixel
//! wherever the blur moved the local intensity a long way, which
//! approximates a bilateral filter: flat regions get the full blur,
//! strong contrast survives.

use image::{ImageBuffer, Rgb, Rgb32FImage};
use imageproc::filter::separable_filter_equal;

use crate::buffer::{PixelBuffer, box_intensity, to_channel};

/// Ratio between the smoothing radius and the Gaussian sigma.
pub const SIGMA_PER_RADIUS: f32 = 0.3;

/// Ratio between the Gaussian sigma and the intensity-difference sigma
/// used to weight the blend.
pub const COLOR_SIGMA_PER_SIGMA: f32 = 0.1;

/// Kernel half-width in standard deviations.
const KERNEL_SIGMAS: f32 = 3.0;

/// Edge-preserving smoothing with the given radius.
///
/// With `sigma = radius * 0.3` and `sigma_color = sigma * 0.1`, each
/// output channel is `original * (1 - w) + blurred * w` where
/// `w = exp(-diff² / (2 sigma_color²))` and `diff` is the normalized
/// difference between the box-average intensity of the source pixel and
/// of the blurred pixel. Alpha is copied from the source.
///
/// Non-positive (or NaN) radii return the buffer unchanged, as do radii
/// so small that `2 sigma_color²` underflows.
#[must_use = "returns the smoothed buffer"]
pub fn smooth(buffer: &PixelBuffer, radius: f32) -> PixelBuffer {
    if radius.is_nan() || radius <= 0.0 {
        return buffer.clone();
    }

    let sigma = radius * SIGMA_PER_RADIUS;
    let sigma_color = sigma * COLOR_SIGMA_PER_SIGMA;
    let two_sigma_color_sq = 2.0 * sigma_color * sigma_color;
    if two_sigma_color_sq < f32::MIN_POSITIVE {
        return buffer.clone();
    }

    let blurred = gaussian_blur(buffer, sigma);
    let source = buffer.as_image();

    PixelBuffer::from_fn(buffer.dimensions(), |x, y| {
        let src = source.get_pixel(x, y).0;
        let blur = blurred.as_image().get_pixel(x, y).0;
        let diff = (box_intensity(src) - box_intensity(blur)).abs() / 255.0;
        let weight = (-(diff * diff) / two_sigma_color_sq).exp();
        let mix =
            |o: u8, b: u8| to_channel(f32::from(o).mul_add(1.0 - weight, f32::from(b) * weight));
        [
            mix(src[0], blur[0]),
            mix(src[1], blur[1]),
            mix(src[2], blur[2]),
            src[3],
        ]
    })
}

/// Separable Gaussian blur of the R/G/B channels.
///
/// The kernel spans `ceil(3 * sigma)` pixels either side of the centre
/// (at least one, at most the larger image dimension) and is normalized
/// to sum to one. Samples outside the image repeat the nearest edge
/// pixel. Both passes run on an `f32` plane and round once at the end.
/// Alpha is copied from the source.
///
/// Non-positive (or NaN) sigma values return the buffer unchanged, as do
/// values so small that `2 sigma²` underflows.
#[must_use = "returns the blurred buffer"]
pub fn gaussian_blur(buffer: &PixelBuffer, sigma: f32) -> PixelBuffer {
    if sigma.is_nan() || sigma <= 0.0 || 2.0 * sigma * sigma < f32::MIN_POSITIVE {
        return buffer.clone();
    }

    let dims = buffer.dimensions();
    let max_radius = (dims.width.max(dims.height) as usize).saturating_sub(1);
    let kernel = gaussian_kernel(sigma, max_radius);
    tracing::trace!(sigma, radius = kernel.radius, "gaussian kernel");
    let source = buffer.as_image();

    let plane: Rgb32FImage = ImageBuffer::from_fn(dims.width, dims.height, |x, y| {
        let [r, g, b, _] = source.get_pixel(x, y).0;
        Rgb([f32::from(r), f32::from(g), f32::from(b)])
    });
    let blurred = separable_filter_equal(&plane, &kernel.taps);

    PixelBuffer::from_fn(dims, |x, y| {
        let [r, g, b] = blurred.get_pixel(x, y).0;
        [
            to_channel(r),
            to_channel(g),
            to_channel(b),
            source.get_pixel(x, y)[3],
        ]
    })
}

/// A normalized 1-D Gaussian kernel of `2 * radius + 1` taps.
struct Kernel {
    radius: usize,
    taps: Vec<f32>,
}

/// Build the blur kernel for `sigma`, at most `max_radius` taps either
/// side of the centre.
///
/// Beyond `max_radius` every tap samples the same clamped edge pixel, so
/// the weight of the cut-off taps is added to the two outermost taps.
/// The kernel is computed in `f64` so that `2 sigma²` neither overflows
/// nor underflows for any finite `f32` sigma.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn gaussian_kernel(sigma: f32, max_radius: usize) -> Kernel {
    let sigma = f64::from(sigma.min(f32::MAX));
    let two_sigma_sq = 2.0 * sigma * sigma;
    let gaussian = |d: f64| (-(d * d) / two_sigma_sq).exp();

    let full_radius = (f64::from(KERNEL_SIGMAS) * sigma).ceil().max(1.0);
    let max_radius = max_radius.max(1);
    let radius = if full_radius >= max_radius as f64 {
        max_radius
    } else {
        full_radius as usize
    };

    let len = radius.saturating_mul(2).saturating_add(1);
    let mut taps: Vec<f64> = (0..len)
        .map(|i| gaussian(i as f64 - radius as f64))
        .collect();
    let tail = tail_weight(radius as f64 + 1.0, full_radius, &gaussian);
    if let Some(first) = taps.first_mut() {
        *first += tail;
    }
    if let Some(last) = taps.last_mut() {
        *last += tail;
    }

    let sum: f64 = taps.iter().sum();
    Kernel {
        radius,
        taps: taps.into_iter().map(|t| (t / sum) as f32).collect(),
    }
}

/// Number of samples used to integrate a kernel tail too long to sum.
const TAIL_SAMPLES: u32 = 4096;

/// Total weight of the integer offsets `from..=to` on one side.
///
/// Short tails are summed tap by tap. Longer ones use a midpoint sum over
/// [`TAIL_SAMPLES`] equal slices of `[from - 0.5, to + 0.5]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn tail_weight(from: f64, to: f64, gaussian: impl Fn(f64) -> f64) -> f64 {
    let count = to - from + 1.0;
    if count <= 0.0 {
        return 0.0;
    }
    let samples = f64::from(TAIL_SAMPLES);
    if count <= samples {
        return (0..count as u32)
            .map(|i| gaussian(from + f64::from(i)))
            .sum();
    }
    let step = count / samples;
    (0..TAIL_SAMPLES)
        .map(|i| gaussian((f64::from(i) + 0.5).mul_add(step, from - 0.5)))
        .sum::<f64>()
        * step
}
