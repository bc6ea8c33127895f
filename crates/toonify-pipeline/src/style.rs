//! Style orchestration: turn [`StyleSettings`] into a concrete plan and
//! run the filter sequence for that style.
//!
//! | Style  | Sequence |
//! |--------|----------|
//! | comic  | smooth → quantize → detect edges → multiply → saturation |
//! | anime  | smooth ×1.5 → quantize ÷2 → detect edges ×1.2 → multiply → saturation 1.4 |
//! | pencil | grayscale → invert → smooth ÷4 → color dodge |
//!
//! Comic and anime share one "cel" routine and differ only in the
//! parameters [`StylePlan::from_settings`] derives. Every buffer in a
//! run is local to the call.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::adjust::{adjust_saturation, invert, to_grayscale};
use crate::buffer::PixelBuffer;
use crate::composite::{BlendMode, color_dodge, composite};
use crate::diagnostics::{
    Clock, Recorder, StageMetrics, StyleDiagnostics, StyleSummary, Timed, Untimed,
};
use crate::edge::{EDGE_THRESHOLD, count_edge_pixels, detect_edges, dilation_for_thickness};
use crate::quantize::quantize;
use crate::smooth::{SIGMA_PER_RADIUS, smooth};
use crate::types::{Dimensions, PipelineError, Style, StyleSettings};

/// Anime smoothing radius multiplier.
pub const ANIME_SMOOTHING_SCALE: f32 = 1.5;
/// Anime color levels divisor (integer division).
pub const ANIME_LEVEL_DIVISOR: u32 = 2;
/// Anime edge strength multiplier.
pub const ANIME_STRENGTH_SCALE: f32 = 1.2;
/// Fixed anime saturation multiplier.
pub const ANIME_SATURATION: f32 = 1.4;
/// Anime outlines are always dilated by this radius.
pub const ANIME_DILATION: u32 = 1;
/// Pencil smoothing radius divisor.
pub const PENCIL_SMOOTHING_DIVISOR: f32 = 4.0;

/// Parameters for the comic and anime sequences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CelParams {
    /// Radius passed to [`smooth`].
    pub smoothing_radius: f32,
    /// Levels passed to [`quantize`].
    pub color_levels: u32,
    /// Strength passed to [`detect_edges`].
    pub edge_strength: f32,
    /// Edge dilation radius (0 = thin edges).
    pub edge_dilation: u32,
    /// Final saturation multiplier.
    pub saturation: f32,
}

/// Parameters for the pencil sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SketchParams {
    /// Radius used to soften the inverted layer.
    pub smoothing_radius: f32,
}

/// The concrete working parameters for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StylePlan {
    /// Comic book rendering.
    Comic(CelParams),
    /// Anime rendering.
    Anime(CelParams),
    /// Pencil sketch rendering.
    Pencil(SketchParams),
}

impl StylePlan {
    /// Derive the plan for `settings`, normalizing them first.
    #[must_use]
    pub fn from_settings(settings: &StyleSettings) -> Self {
        let s = settings.normalized();
        match s.style {
            Style::Comic => Self::Comic(CelParams {
                smoothing_radius: s.smoothing_radius,
                color_levels: s.color_levels,
                edge_strength: s.edge_strength,
                edge_dilation: if s.bold_edges {
                    dilation_for_thickness(s.line_thickness)
                } else {
                    0
                },
                saturation: s.saturation,
            }),
            Style::Anime => Self::Anime(CelParams {
                smoothing_radius: s.smoothing_radius * ANIME_SMOOTHING_SCALE,
                color_levels: (s.color_levels / ANIME_LEVEL_DIVISOR)
                    .max(StyleSettings::MIN_COLOR_LEVELS),
                edge_strength: s.edge_strength * ANIME_STRENGTH_SCALE,
                edge_dilation: ANIME_DILATION,
                saturation: ANIME_SATURATION,
            }),
            Style::Pencil => Self::Pencil(SketchParams {
                smoothing_radius: s.smoothing_radius / PENCIL_SMOOTHING_DIVISOR,
            }),
        }
    }

    /// The style this plan renders.
    #[must_use]
    pub const fn style(&self) -> Style {
        match self {
            Self::Comic(_) => Style::Comic,
            Self::Anime(_) => Style::Anime,
            Self::Pencil(_) => Style::Pencil,
        }
    }
}

/// Every layer produced by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedResult {
    /// The style that was rendered.
    pub style: Style,
    /// Base color layer: smoothed and posterized for comic/anime, the
    /// grayscale photo for pencil.
    pub color: PixelBuffer,
    /// Layer blended onto `color`: the black/white edge mask for
    /// comic/anime, the smoothed negative for pencil.
    pub overlay: PixelBuffer,
    /// Final rendering.
    pub output: PixelBuffer,
}

impl StagedResult {
    /// Dimensions shared by every layer.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.output.dimensions()
    }
}

/// Stylize a buffer and return the final rendering.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] if an intermediate layer is
/// malformed; no partial output is produced.
pub fn stylize(
    buffer: &PixelBuffer,
    settings: &StyleSettings,
) -> Result<PixelBuffer, PipelineError> {
    stylize_staged(buffer, settings).map(|staged| staged.output)
}

/// Validate raw RGBA bytes and stylize them.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidBuffer`] if either dimension is zero
/// or `pixels.len() != width * height * 4`.
pub fn stylize_pixels(
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    settings: &StyleSettings,
) -> Result<PixelBuffer, PipelineError> {
    let buffer = PixelBuffer::from_raw(width, height, pixels)?;
    stylize(&buffer, settings)
}

/// Stylize a buffer, keeping the intermediate layers.
///
/// # Errors
///
/// See [`stylize`].
#[instrument(skip_all, fields(style = %settings.style, width = buffer.width(), height = buffer.height()))]
pub fn stylize_staged(
    buffer: &PixelBuffer,
    settings: &StyleSettings,
) -> Result<StagedResult, PipelineError> {
    let plan = StylePlan::from_settings(settings);
    debug!(?plan, "style plan derived");
    run(buffer, &plan, &mut Untimed)
}

/// Stylize a buffer while timing every stage against `clock`.
///
/// # Errors
///
/// See [`stylize`].
#[instrument(skip_all, fields(style = %settings.style, width = buffer.width(), height = buffer.height()))]
pub fn stylize_with_diagnostics<C: Clock>(
    buffer: &PixelBuffer,
    settings: &StyleSettings,
    clock: &C,
) -> Result<(StagedResult, StyleDiagnostics), PipelineError> {
    let plan = StylePlan::from_settings(settings);
    debug!(?plan, "style plan derived");

    let start = clock.now();
    let mut recorder = Timed::new(clock);
    let staged = run(buffer, &plan, &mut recorder)?;
    let total_duration = clock.elapsed(&start);

    let edge_pixel_count = match plan {
        StylePlan::Comic(_) | StylePlan::Anime(_) => Some(count_edge_pixels(&staged.overlay)),
        StylePlan::Pencil(_) => None,
    };
    let diagnostics = StyleDiagnostics {
        style: plan.style(),
        stages: recorder.stages,
        total_duration,
        summary: StyleSummary::new(staged.dimensions(), edge_pixel_count),
    };
    Ok((staged, diagnostics))
}

fn run(
    buffer: &PixelBuffer,
    plan: &StylePlan,
    recorder: &mut impl Recorder,
) -> Result<StagedResult, PipelineError> {
    match plan {
        StylePlan::Comic(params) => run_cel(buffer, Style::Comic, params, recorder),
        StylePlan::Anime(params) => run_cel(buffer, Style::Anime, params, recorder),
        StylePlan::Pencil(params) => run_sketch(buffer, params, recorder),
    }
}

fn run_cel(
    buffer: &PixelBuffer,
    style: Style,
    params: &CelParams,
    recorder: &mut impl Recorder,
) -> Result<StagedResult, PipelineError> {
    let radius = params.smoothing_radius;
    let smoothed = recorder.stage(
        || smooth(buffer, radius),
        |_| StageMetrics::Smooth {
            radius,
            sigma: radius * SIGMA_PER_RADIUS,
        },
    );

    let levels = params.color_levels;
    let color = recorder.stage(
        || quantize(&smoothed, levels),
        |_| StageMetrics::Quantize { levels },
    );

    let mask = recorder.stage(
        || detect_edges(&color, params.edge_strength, EDGE_THRESHOLD, params.edge_dilation),
        |mask| StageMetrics::EdgeDetection {
            strength: params.edge_strength,
            threshold: EDGE_THRESHOLD,
            dilation: params.edge_dilation,
            edge_pixel_count: count_edge_pixels(mask),
            total_pixel_count: mask.dimensions().pixel_count(),
        },
    );

    let outlined = recorder.stage(
        || composite(&color, &mask),
        |_| StageMetrics::Blend {
            mode: BlendMode::Multiply,
        },
    )?;

    let factor = params.saturation;
    let output = if (factor - 1.0).abs() > f32::EPSILON {
        recorder.stage(
            || adjust_saturation(&outlined, factor),
            |_| StageMetrics::Saturation { factor },
        )
    } else {
        outlined
    };

    Ok(StagedResult {
        style,
        color,
        overlay: mask,
        output,
    })
}

fn run_sketch(
    buffer: &PixelBuffer,
    params: &SketchParams,
    recorder: &mut impl Recorder,
) -> Result<StagedResult, PipelineError> {
    let gray = recorder.stage(|| to_grayscale(buffer), |_| StageMetrics::Grayscale);
    let negative = recorder.stage(|| invert(&gray), |_| StageMetrics::Invert);

    let radius = params.smoothing_radius;
    let softened = recorder.stage(
        || smooth(&negative, radius),
        |_| StageMetrics::Smooth {
            radius,
            sigma: radius * SIGMA_PER_RADIUS,
        },
    );

    let output = recorder.stage(
        || color_dodge(&gray, &softened),
        |_| StageMetrics::Blend {
            mode: BlendMode::ColorDodge,
        },
    )?;

    Ok(StagedResult {
        style: Style::Pencil,
        color: gray,
        overlay: softened,
        output,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::edge::{EDGE, NO_EDGE};

    /// 4x4 buffer made of four 2x2 blocks: black, white / white, black.
    fn block_checkerboard() -> PixelBuffer {
        PixelBuffer::from_fn(
            Dimensions {
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

    #[allow(clippy::cast_possible_truncation)]
    fn photo_like() -> PixelBuffer {
        PixelBuffer::from_fn(
            Dimensions {
                width: 24,
                height: 16,
            },
            |x, y| {
                if x < 12 {
                    [(200 - y * 3) as u8, 90, 40, 255]
                } else {
                    [30, (100 + x * 4) as u8, 180, 255]
                }
            },
        )
    }

    struct ZeroClock;

    impl Clock for ZeroClock {
        type Instant = ();

        fn now(&self) {}

        fn elapsed(&self, _since: &()) -> Duration {
            Duration::ZERO
        }
    }

    #[test]
    fn comic_plan_uses_settings_directly() {
        let plan = StylePlan::from_settings(&StyleSettings::default());
        assert_eq!(
            plan,
            StylePlan::Comic(CelParams {
                smoothing_radius: 7.0,
                color_levels: 8,
                edge_strength: 50.0,
                edge_dilation: 1,
                saturation: 1.0,
            })
        );
    }

    #[test]
    fn comic_plan_without_bold_edges_has_no_dilation() {
        let settings = StyleSettings {
            bold_edges: false,
            line_thickness: 10.0,
            ..StyleSettings::default()
        };
        let StylePlan::Comic(params) = StylePlan::from_settings(&settings) else {
            unreachable!("comic settings must produce a comic plan");
        };
        assert_eq!(params.edge_dilation, 0);
    }

    #[test]
    fn comic_plan_thick_lines_dilate_further() {
        let settings = StyleSettings {
            line_thickness: 10.0,
            ..StyleSettings::default()
        };
        let StylePlan::Comic(params) = StylePlan::from_settings(&settings) else {
            unreachable!("comic settings must produce a comic plan");
        };
        assert_eq!(params.edge_dilation, 4);
    }

    #[test]
    fn anime_plan_scales_settings() {
        let settings = StyleSettings {
            saturation: 0.2,
            bold_edges: false,
            ..StyleSettings::for_style(Style::Anime)
        };
        let StylePlan::Anime(params) = StylePlan::from_settings(&settings) else {
            unreachable!("anime settings must produce an anime plan");
        };
        assert!((params.smoothing_radius - 10.5).abs() < 1e-5);
        assert_eq!(params.color_levels, 4);
        assert!((params.edge_strength - 60.0).abs() < 1e-4);
        // Bold edges and saturation are fixed for anime.
        assert_eq!(params.edge_dilation, 1);
        assert!((params.saturation - 1.4).abs() < f32::EPSILON);
    }

    #[test]
    fn anime_levels_never_drop_below_two() {
        for levels in [0, 2, 3, 5] {
            let settings = StyleSettings {
                color_levels: levels,
                ..StyleSettings::for_style(Style::Anime)
            };
            let StylePlan::Anime(params) = StylePlan::from_settings(&settings) else {
                unreachable!("anime settings must produce an anime plan");
            };
            assert!(params.color_levels >= 2, "levels={levels}");
        }
    }

    #[test]
    fn pencil_plan_quarters_radius() {
        let plan = StylePlan::from_settings(&StyleSettings::for_style(Style::Pencil));
        assert_eq!(
            plan,
            StylePlan::Pencil(SketchParams {
                smoothing_radius: 1.75
            })
        );
    }

    #[test]
    fn plan_normalizes_settings() {
        let settings = StyleSettings {
            smoothing_radius: -5.0,
            color_levels: 0,
            edge_strength: -1.0,
            ..StyleSettings::default()
        };
        let StylePlan::Comic(params) = StylePlan::from_settings(&settings) else {
            unreachable!("comic settings must produce a comic plan");
        };
        assert!(params.smoothing_radius.abs() < f32::EPSILON);
        assert_eq!(params.color_levels, 2);
        assert!(params.edge_strength.abs() < f32::EPSILON);
    }

    #[test]
    fn uniform_gray_comic_is_posterized_gray() {
        // 2x2 uniform gray: smoothing is a no-op, posterization maps 128
        // to 146, the mask is all white and saturation 1.0 is neutral.
        let buf = PixelBuffer::filled(2, 2, [128, 128, 128, 255]).unwrap();
        let staged = stylize_staged(&buf, &StyleSettings::default()).unwrap();

        assert!(
            staged
                .overlay
                .as_raw()
                .chunks_exact(4)
                .all(|p| p == NO_EDGE.as_slice())
        );
        assert_eq!(staged.output, quantize(&smooth(&buf, 7.0), 8));
        assert_eq!(staged.output.pixel(0, 0), Some([146, 146, 146, 255]));
    }

    #[test]
    fn checkerboard_comic_mask_marks_interior() {
        let settings = StyleSettings {
            bold_edges: false,
            ..StyleSettings::default()
        };
        let staged = stylize_staged(&block_checkerboard(), &settings).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let interior = (1..3).contains(&x) && (1..3).contains(&y);
                let expected = if interior { EDGE } else { NO_EDGE };
                assert_eq!(staged.overlay.pixel(x, y), Some(expected), "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn checkerboard_comic_survives_smoothing() {
        // Edge-aware smoothing keeps the hard block boundaries, so the
        // posterized color layer is the original checkerboard.
        let staged = stylize_staged(&block_checkerboard(), &StyleSettings::default()).unwrap();
        assert_eq!(staged.color, block_checkerboard());
    }

    #[test]
    fn comic_bold_edges_darken_border_ring() {
        let staged = stylize_staged(&block_checkerboard(), &StyleSettings::default()).unwrap();
        assert_eq!(count_edge_pixels(&staged.overlay), 12);
        // Only the two white corners survive the outline.
        assert_eq!(staged.output.pixel(3, 0), Some([255, 255, 255, 255]));
        assert_eq!(staged.output.pixel(0, 3), Some([255, 255, 255, 255]));
        assert_eq!(staged.output.pixel(1, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn comic_output_is_opaque_and_sized() {
        let buf = photo_like();
        let out = stylize(&buf, &StyleSettings::default()).unwrap();
        assert_eq!(out.dimensions(), buf.dimensions());
        assert!(out.as_raw().chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn anime_uses_fewer_colors_than_comic() {
        let buf = photo_like();
        let comic = stylize_staged(&buf, &StyleSettings::default()).unwrap();
        let anime = stylize_staged(&buf, &StyleSettings::for_style(Style::Anime)).unwrap();
        let distinct = |b: &PixelBuffer| {
            b.as_raw()
                .chunks_exact(4)
                .map(|p| p[0])
                .collect::<std::collections::BTreeSet<_>>()
                .len()
        };
        assert!(distinct(&anime.color) <= 4);
        assert!(distinct(&anime.color) <= distinct(&comic.color));
    }

    #[test]
    fn pencil_output_is_gray() {
        let out = stylize(&photo_like(), &StyleSettings::for_style(Style::Pencil)).unwrap();
        for p in out.as_raw().chunks_exact(4) {
            assert_eq!(p[0], p[1]);
            assert_eq!(p[1], p[2]);
            assert_eq!(p[3], 255);
        }
    }

    #[test]
    fn pencil_flat_regions_are_near_white() {
        // On a flat image the smoothed negative equals the exact negative,
        // so each pixel dodges to g * 256 / (g + 1). Luma here is 75.
        let buf = PixelBuffer::filled(6, 6, [120, 60, 30, 255]).unwrap();
        let out = stylize(&buf, &StyleSettings::for_style(Style::Pencil)).unwrap();
        assert!(out.as_raw().chunks_exact(4).all(|p| p == [252, 252, 252, 255]));
    }

    #[test]
    fn pencil_chain_double_invert_restores_grayscale() {
        let staged = stylize_staged(&photo_like(), &StyleSettings::for_style(Style::Pencil)).unwrap();
        let gray = &staged.color;
        assert_eq!(to_grayscale(&invert(&invert(gray))), *gray);
        assert_eq!(*gray, to_grayscale(&photo_like()));
    }

    #[test]
    fn stylize_does_not_mutate_input() {
        let buf = photo_like();
        let copy = buf.clone();
        for style in Style::ALL {
            let _ = stylize(&buf, &StyleSettings::for_style(style)).unwrap();
        }
        assert_eq!(buf, copy);
    }

    #[test]
    fn stylize_is_deterministic() {
        let buf = photo_like();
        for style in Style::ALL {
            let settings = StyleSettings::for_style(style);
            assert_eq!(
                stylize(&buf, &settings).unwrap(),
                stylize(&buf, &settings).unwrap()
            );
        }
    }

    #[test]
    fn stylize_pixels_rejects_bad_length() {
        let result = stylize_pixels(3, 3, vec![0; 35], &StyleSettings::default());
        assert!(matches!(result, Err(PipelineError::InvalidBuffer(_))));
    }

    #[test]
    fn stylize_pixels_accepts_valid_buffer() {
        let out = stylize_pixels(2, 2, vec![128; 16], &StyleSettings::default()).unwrap();
        assert_eq!(out.dimensions().pixel_count(), 4);
    }

    #[test]
    fn diagnostics_record_comic_stages() {
        let (staged, diag) =
            stylize_with_diagnostics(&photo_like(), &StyleSettings::default(), &ZeroClock).unwrap();
        let names: Vec<_> = diag.stages.iter().map(|s| s.metrics.name()).collect();
        // Saturation 1.0 is skipped.
        assert_eq!(names, ["Smooth", "Quantize", "Edge Detection", "Blend"]);
        assert_eq!(diag.style, Style::Comic);
        assert_eq!(
            diag.summary.edge_pixel_count,
            Some(count_edge_pixels(&staged.overlay))
        );
    }

    #[test]
    fn diagnostics_record_anime_saturation() {
        let (_, diag) = stylize_with_diagnostics(
            &photo_like(),
            &StyleSettings::for_style(Style::Anime),
            &ZeroClock,
        )
        .unwrap();
        assert_eq!(diag.stages.len(), 5);
        assert!(diag.stage("Saturation").is_some());
    }

    #[test]
    fn diagnostics_record_pencil_stages() {
        let (_, diag) = stylize_with_diagnostics(
            &photo_like(),
            &StyleSettings::for_style(Style::Pencil),
            &ZeroClock,
        )
        .unwrap();
        let names: Vec<_> = diag.stages.iter().map(|s| s.metrics.name()).collect();
        assert_eq!(names, ["Grayscale", "Invert", "Smooth", "Blend"]);
        assert_eq!(diag.summary.edge_pixel_count, None);
    }

    #[test]
    fn diagnostics_match_plain_run() {
        let buf = photo_like();
        let settings = StyleSettings::for_style(Style::Anime);
        let (staged, _) = stylize_with_diagnostics(&buf, &settings, &ZeroClock).unwrap();
        assert_eq!(staged, stylize_staged(&buf, &settings).unwrap());
    }
}
