//! Pipeline diagnostics: timing and metrics for each stage of a run.
//!
//! The pipeline stays free of platform time APIs: callers pass a
//! [`Clock`] to [`stylize_with_diagnostics`](crate::stylize_with_diagnostics)
//! and every stage is measured against it.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::composite::BlendMode;
use crate::types::{Dimensions, Style};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// A monotonic time source supplied by the caller.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single stylization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleDiagnostics {
    /// The style that was rendered.
    pub style: Style,
    /// Every stage that ran, in execution order.
    pub stages: Vec<StageDiagnostics>,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts for the run.
    pub summary: StyleSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Edge-aware smoothing.
    Smooth {
        /// Smoothing radius after style scaling.
        radius: f32,
        /// Gaussian sigma derived from the radius.
        sigma: f32,
    },
    /// Posterization.
    Quantize {
        /// Levels per channel after clamping.
        levels: u32,
    },
    /// Sobel edge detection.
    EdgeDetection {
        /// Edge strength after style scaling.
        strength: f32,
        /// Magnitude threshold.
        threshold: f32,
        /// Dilation radius in pixels (0 = none).
        dilation: u32,
        /// Number of edge pixels in the mask.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Layer blending.
    Blend {
        /// Which blend was applied.
        mode: BlendMode,
    },
    /// Saturation adjustment.
    Saturation {
        /// Saturation multiplier.
        factor: f32,
    },
    /// BT.601 grayscale conversion.
    Grayscale,
    /// Channel inversion.
    Invert,
}

impl StageMetrics {
    /// Human-readable stage name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Smooth { .. } => "Smooth",
            Self::Quantize { .. } => "Quantize",
            Self::EdgeDetection { .. } => "Edge Detection",
            Self::Blend { .. } => "Blend",
            Self::Saturation { .. } => "Saturation",
            Self::Grayscale => "Grayscale",
            Self::Invert => "Invert",
        }
    }
}

/// High-level summary counts for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSummary {
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Edge pixels in the outline mask (`None` for styles without one).
    pub edge_pixel_count: Option<u64>,
}

impl StyleSummary {
    pub(crate) fn new(dimensions: Dimensions, edge_pixel_count: Option<u64>) -> Self {
        Self {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            edge_pixel_count,
        }
    }
}

impl StyleDiagnostics {
    /// Look up the first stage with the given name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageDiagnostics> {
        self.stages.iter().find(|s| s.metrics.name() == name)
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Stylize Diagnostics Report ({})\n{}",
            self.style,
            "=".repeat(60)
        ));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for stage in &self.stages {
            let ms = duration_ms(stage.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let name = stage.metrics.name();
            let details = format_metrics(&stage.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        if let Some(edges) = self.summary.edge_pixel_count {
            lines.push(String::new());
            lines.push(format!("Edge pixels: {edges}"));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Smooth { radius, sigma } => format!("radius={radius:.2} sigma={sigma:.2}"),
        StageMetrics::Quantize { levels } => format!("levels={levels}"),
        StageMetrics::EdgeDetection {
            strength,
            threshold,
            dilation,
            edge_pixel_count,
            total_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixel_count > 0 {
                *edge_pixel_count as f64 / *total_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "strength={strength:.1} threshold={threshold:.1} dilation={dilation} edges={edge_pixel_count} ({density:.1}%)",
            )
        }
        StageMetrics::Blend { mode } => format!("{mode:?}"),
        StageMetrics::Saturation { factor } => format!("factor={factor:.2}"),
        StageMetrics::Grayscale => "BT.601".to_string(),
        StageMetrics::Invert => String::new(),
    }
}

/// Runs stages, optionally timing them.
pub(crate) trait Recorder {
    /// Run one stage, describing it with `metrics` once it has finished.
    fn stage<T>(
        &mut self,
        run: impl FnOnce() -> T,
        metrics: impl FnOnce(&T) -> StageMetrics,
    ) -> T;
}

/// Runs stages without measuring them.
pub(crate) struct Untimed;

impl Recorder for Untimed {
    fn stage<T>(
        &mut self,
        run: impl FnOnce() -> T,
        _metrics: impl FnOnce(&T) -> StageMetrics,
    ) -> T {
        run()
    }
}

/// Times each stage against a caller-supplied clock.
pub(crate) struct Timed<'c, C: Clock> {
    clock: &'c C,
    pub(crate) stages: Vec<StageDiagnostics>,
}

impl<'c, C: Clock> Timed<'c, C> {
    pub(crate) const fn new(clock: &'c C) -> Self {
        Self {
            clock,
            stages: Vec::new(),
        }
    }
}

impl<C: Clock> Recorder for Timed<'_, C> {
    fn stage<T>(
        &mut self,
        run: impl FnOnce() -> T,
        metrics: impl FnOnce(&T) -> StageMetrics,
    ) -> T {
        let start = self.clock.now();
        let out = run();
        let duration = self.clock.elapsed(&start);
        let metrics = metrics(&out);
        tracing::debug!(
            stage = metrics.name(),
            duration_ms = duration_ms(duration),
            "stage complete"
        );
        self.stages.push(StageDiagnostics { duration, metrics });
        out
    }
}
