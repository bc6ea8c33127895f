//! Sobel edge detection producing a black-on-white outline mask.
//!
//! The mask is meant to be multiplied onto a color layer (see
//! [`crate::composite::composite`]): edge pixels are pure black
//! `(0, 0, 0, 255)` and everything else is pure white
//! `(255, 255, 255, 255)`.
//!
//! Intensity is the box average `(R + G + B) / 3`, not BT.601 luma.

use image::GrayImage;
use imageproc::distance_transform::Norm;

use crate::buffer::{PixelBuffer, box_intensity};

/// Gradient magnitude above which a pixel is an edge.
pub const EDGE_THRESHOLD: f32 = 20.0;

/// Edge strength that leaves the Sobel magnitude unscaled.
pub const NEUTRAL_STRENGTH: f32 = 50.0;

/// Mask value for edge pixels.
pub const EDGE: [u8; 4] = [0, 0, 0, 255];

/// Mask value for non-edge pixels.
pub const NO_EDGE: [u8; 4] = [255, 255, 255, 255];

/// Detect edges and return a binary black/white mask.
///
/// For every interior pixel the 3x3 Sobel pair is applied to the
/// box-average intensity and the magnitude `sqrt(gx² + gy²)` is scaled
/// by `strength / 50`. Pixels whose scaled magnitude exceeds
/// `threshold` are edges. The one-pixel border ring is never an edge,
/// so buffers narrower or shorter than three pixels produce an
/// all-white mask.
///
/// When `dilation > 0`, edges are then grown by that many pixels over
/// 4-neighbours (see [`dilate_edges`]).
///
/// Negative `strength` is treated as zero.
#[must_use = "returns the edge mask"]
pub fn detect_edges(
    buffer: &PixelBuffer,
    strength: f32,
    threshold: f32,
    dilation: u32,
) -> PixelBuffer {
    let edges = edge_map(buffer, strength, threshold);
    let edges = if dilation > 0 {
        dilate_edges(&edges, dilation)
    } else {
        edges
    };
    mask_from_edge_map(&edges)
}

/// Binary edge map: 255 for edges, 0 for background.
#[must_use = "returns the binary edge map"]
pub fn edge_map(buffer: &PixelBuffer, strength: f32, threshold: f32) -> GrayImage {
    let (w, h) = (buffer.width(), buffer.height());
    let mut edges = GrayImage::new(w, h);
    if w < 3 || h < 3 {
        return edges;
    }

    let factor = strength.max(0.0) / NEUTRAL_STRENGTH;
    let intensity: Vec<f32> = buffer
        .as_raw()
        .chunks_exact(4)
        .map(|p| box_intensity([p[0], p[1], p[2], p[3]]))
        .collect();
    let wu = w as usize;
    let at = |x: u32, y: u32| intensity[y as usize * wu + x as usize];

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1)
                - at(x + 1, y - 1)
                - 2.0 * at(x + 1, y)
                - at(x + 1, y + 1);
            let gy = at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1)
                - at(x - 1, y + 1)
                - 2.0 * at(x, y + 1)
                - at(x + 1, y + 1);
            let magnitude = gx.hypot(gy) * factor;
            if magnitude > threshold {
                edges.put_pixel(x, y, image::Luma([255]));
            }
        }
    }
    edges
}

/// Grow every edge pixel by `radius` pixels under the L1 (4-neighbour)
/// norm. Radii above 255 are clamped.
#[must_use = "returns the dilated edge map"]
pub fn dilate_edges(edges: &GrayImage, radius: u32) -> GrayImage {
    let k = u8::try_from(radius).unwrap_or(u8::MAX);
    imageproc::morphology::dilate(edges, Norm::L1, k)
}

/// Dilation radius for a comic line thickness.
///
/// A square structuring element of `max(1, floor(t / 2))` pixels widens
/// strokes by one pixel less than its size, so the radius is
/// `max(1, floor(t / 2) - 1)`. The default thickness of 5 gives a
/// radius of 1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn dilation_for_thickness(line_thickness: f32) -> u32 {
    let kernel = (line_thickness.max(0.0) / 2.0).floor() as u32;
    kernel.saturating_sub(1).max(1)
}

/// Convert a 255-is-edge map into the black-on-white RGBA mask.
#[must_use = "returns the edge mask"]
pub fn mask_from_edge_map(edges: &GrayImage) -> PixelBuffer {
    PixelBuffer::from_fn(
        crate::Dimensions {
            width: edges.width(),
            height: edges.height(),
        },
        |x, y| {
            if edges.get_pixel(x, y).0[0] > 0 {
                EDGE
            } else {
                NO_EDGE
            }
        },
    )
}

/// Count edge (black) pixels in a mask.
#[must_use]
pub fn count_edge_pixels(mask: &PixelBuffer) -> u64 {
    mask.as_raw()
        .chunks_exact(4)
        .map(|p| u64::from(p[0] == 0))
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// 4x4 buffer made of four 2x2 blocks: black, white / white, black.
    fn block_checkerboard() -> PixelBuffer {
        PixelBuffer::from_fn(
            crate::Dimensions {
                width: 4,
                height: 4,
            },
            |x, y| {
                if (x < 2) == (y < 2) {
                    [0, 0, 0, 255]
                } else {
                    [255, 255, 255, 255]
                }
            },
        )
    }

    /// 20x20 buffer with a sharp vertical boundary at x = 10.
    fn sharp_edge_buffer() -> PixelBuffer {
        PixelBuffer::from_fn(
            crate::Dimensions {
                width: 20,
                height: 20,
            },
            |x, _y| {
                if x < 10 {
                    [0, 0, 0, 255]
                } else {
                    [255, 255, 255, 255]
                }
            },
        )
    }

    fn is_edge(mask: &PixelBuffer, x: u32, y: u32) -> bool {
        mask.pixel(x, y).unwrap() == EDGE
    }

    #[test]
    fn mask_is_pure_black_or_white() {
        let mask = detect_edges(&sharp_edge_buffer(), 50.0, EDGE_THRESHOLD, 1);
        assert!(
            mask.as_raw()
                .chunks_exact(4)
                .all(|p| p == EDGE.as_slice() || p == NO_EDGE.as_slice())
        );
    }

    #[test]
    fn uniform_buffer_has_no_edges() {
        let buf = PixelBuffer::filled(20, 20, [90, 120, 150, 255]).unwrap();
        let mask = detect_edges(&buf, 100.0, EDGE_THRESHOLD, 2);
        assert_eq!(count_edge_pixels(&mask), 0);
    }

    #[test]
    fn block_checkerboard_marks_interior_only() {
        let mask = detect_edges(&block_checkerboard(), 50.0, EDGE_THRESHOLD, 0);
        for y in 0..4 {
            for x in 0..4 {
                let interior = (1..3).contains(&x) && (1..3).contains(&y);
                assert_eq!(is_edge(&mask, x, y), interior, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn dilation_spreads_to_four_neighbours() {
        let mask = detect_edges(&block_checkerboard(), 50.0, EDGE_THRESHOLD, 1);
        // The 2x2 interior grows onto the border ring except the corners,
        // which are two steps away under the L1 norm.
        assert_eq!(count_edge_pixels(&mask), 12);
        for (x, y) in [(0, 0), (3, 0), (0, 3), (3, 3)] {
            assert!(!is_edge(&mask, x, y), "corner ({x},{y}) should stay white");
        }
    }

    #[test]
    fn border_ring_is_never_an_edge() {
        let mask = detect_edges(&sharp_edge_buffer(), 50.0, EDGE_THRESHOLD, 0);
        for i in 0..20 {
            assert!(!is_edge(&mask, i, 0));
            assert!(!is_edge(&mask, i, 19));
            assert!(!is_edge(&mask, 0, i));
            assert!(!is_edge(&mask, 19, i));
        }
        assert!(is_edge(&mask, 9, 10));
        assert!(is_edge(&mask, 10, 10));
        assert!(!is_edge(&mask, 5, 10));
    }

    #[test]
    fn tiny_buffers_are_all_white() {
        for (w, h) in [(1, 1), (2, 2), (2, 7), (7, 2)] {
            let buf = PixelBuffer::from_fn(
                crate::Dimensions {
                    width: w,
                    height: h,
                },
                |x, _| if x % 2 == 0 { [0, 0, 0, 255] } else { [255; 4] },
            );
            let mask = detect_edges(&buf, 100.0, EDGE_THRESHOLD, 1);
            assert_eq!(count_edge_pixels(&mask), 0, "{w}x{h}");
        }
    }

    #[test]
    fn zero_strength_finds_nothing() {
        let mask = detect_edges(&sharp_edge_buffer(), 0.0, EDGE_THRESHOLD, 0);
        assert_eq!(count_edge_pixels(&mask), 0);
        let mask = detect_edges(&sharp_edge_buffer(), -20.0, EDGE_THRESHOLD, 0);
        assert_eq!(count_edge_pixels(&mask), 0);
    }

    #[test]
    fn strength_scales_magnitude() {
        // A gentle ramp of 3 intensity units per column has a Sobel
        // magnitude of 24: an edge at strength 50, not at strength 40
        // (24 * 0.8 = 19.2).
        let buf = PixelBuffer::from_fn(
            crate::Dimensions {
                width: 5,
                height: 5,
            },
            |x, _| {
                let v = u8::try_from(x * 3).unwrap();
                [v, v, v, 255]
            },
        );
        let strong = detect_edges(&buf, 50.0, EDGE_THRESHOLD, 0);
        let weak = detect_edges(&buf, 40.0, EDGE_THRESHOLD, 0);
        assert_eq!(count_edge_pixels(&strong), 9);
        assert_eq!(count_edge_pixels(&weak), 0);
    }

    #[test]
    fn output_dimensions_match_input() {
        let buf = PixelBuffer::filled(17, 31, [0; 4]).unwrap();
        let mask = detect_edges(&buf, 50.0, EDGE_THRESHOLD, 0);
        assert_eq!(mask.dimensions(), buf.dimensions());
    }

    #[test]
    fn thickness_maps_to_dilation_radius() {
        assert_eq!(dilation_for_thickness(0.0), 1);
        assert_eq!(dilation_for_thickness(1.0), 1);
        assert_eq!(dilation_for_thickness(5.0), 1);
        assert_eq!(dilation_for_thickness(6.0), 2);
        assert_eq!(dilation_for_thickness(10.0), 4);
        assert_eq!(dilation_for_thickness(-3.0), 1);
    }
}
