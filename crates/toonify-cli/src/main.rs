//! toonify: turn photos into comic, anime or pencil renderings.
//!
//! Reads one or more image files, stylizes each, and writes the result
//! as PNG. Per-stage diagnostics can be printed as a table or as JSON.
//!
//! # Usage
//!
//! ```text
//! toonify [OPTIONS] <INPUTS>...
//! toonify --style anime --color-levels 6 photo.jpg -o photo-anime.png
//! RUST_LOG=debug toonify --report *.png --out-dir out/
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use serde::Serialize;
use toonify_pipeline::{Clock, StyleDiagnostics, StyleSettings};

/// Turn photos into comic, anime or pencil renderings.
///
/// Each input is written as `<stem>-<style>.png`, next to the input
/// unless `--output` or `--out-dir` says otherwise.
#[derive(Parser)]
#[command(name = "toonify", version)]
struct Cli {
    /// Input images (PNG, JPEG, BMP, WebP, GIF).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (single input only).
    #[arg(short, long, conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Directory for output files.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Rendering style.
    #[arg(long, value_enum, default_value_t = StyleArg::Comic)]
    style: StyleArg,

    /// Edge strength (50 = neutral).
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = StyleSettings::DEFAULT_EDGE_STRENGTH
    )]
    edge_strength: f32,

    /// Posterization levels per channel (values below 2 are raised to 2).
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = i64::from(StyleSettings::DEFAULT_COLOR_LEVELS)
    )]
    color_levels: i64,

    /// Edge-aware smoothing radius (0 disables smoothing).
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = StyleSettings::DEFAULT_SMOOTHING_RADIUS
    )]
    smoothing_radius: f32,

    /// Outline thickness for the comic style.
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = StyleSettings::DEFAULT_LINE_THICKNESS
    )]
    line_thickness: f32,

    /// Saturation multiplier for the comic style.
    #[arg(
        long,
        allow_negative_numbers = true,
        default_value_t = StyleSettings::DEFAULT_SATURATION
    )]
    saturation: f32,

    /// Keep comic outlines one pixel wide.
    #[arg(long)]
    no_bold_edges: bool,

    /// Full style settings as a JSON string.
    ///
    /// When provided, all other style flags are ignored. Missing fields
    /// take their defaults.
    #[arg(long)]
    settings_json: Option<String>,

    /// Print a per-stage diagnostics table for each input.
    #[arg(long, conflicts_with = "json")]
    report: bool,

    /// Print per-input diagnostics as JSON on stdout.
    #[arg(long)]
    json: bool,
}

/// Style selection.
#[derive(Clone, Copy, ValueEnum)]
enum StyleArg {
    /// Smoothed, posterized colors with black outlines.
    Comic,
    /// Flatter colors, stronger outlines, boosted saturation.
    Anime,
    /// Grayscale pencil sketch.
    Pencil,
}

impl From<StyleArg> for toonify_pipeline::Style {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Comic => Self::Comic,
            StyleArg::Anime => Self::Anime,
            StyleArg::Pencil => Self::Pencil,
        }
    }
}

/// Build [`StyleSettings`] from CLI arguments.
///
/// If `--settings-json` is provided, the JSON is parsed directly and the
/// individual style flags are ignored.
fn settings_from_cli(cli: &Cli) -> Result<StyleSettings, String> {
    if let Some(ref json) = cli.settings_json {
        return serde_json::from_str(json)
            .map_err(|e| format!("Error parsing --settings-json: {e}"));
    }

    Ok(StyleSettings {
        style: cli.style.into(),
        edge_strength: cli.edge_strength,
        color_levels: saturating_color_levels(cli.color_levels),
        smoothing_radius: cli.smoothing_radius,
        line_thickness: cli.line_thickness,
        saturation: cli.saturation,
        bold_edges: !cli.no_bold_edges,
    })
}

/// Clamp a signed level count into the range the pipeline accepts.
fn saturating_color_levels(levels: i64) -> u32 {
    u32::try_from(levels.max(i64::from(StyleSettings::MIN_COLOR_LEVELS))).unwrap_or(u32::MAX)
}

/// Where the rendering of `input` is written.
fn output_path(cli: &Cli, input: &Path, settings: &StyleSettings) -> PathBuf {
    if let Some(ref output) = cli.output {
        return output.clone();
    }
    let stem = input
        .file_stem()
        .map_or_else(|| "image".into(), |s| s.to_string_lossy());
    let name = format!("{stem}-{}.png", settings.style);
    cli.out_dir
        .as_ref()
        .map_or_else(|| input.with_file_name(&name), |dir| dir.join(&name))
}

/// Diagnostics for one input, as printed by `--json`.
#[derive(Serialize)]
struct RunRecord {
    input: PathBuf,
    output: PathBuf,
    diagnostics: StyleDiagnostics,
}

/// Read, stylize and write a single input.
fn run_one(input: &Path, output: PathBuf, settings: &StyleSettings) -> Result<RunRecord, String> {
    let bytes =
        std::fs::read(input).map_err(|e| format!("Error reading {}: {e}", input.display()))?;
    let mime = image::ImageFormat::from_path(input)
        .ok()
        .map(|format| format.to_mime_type());

    let (result, diagnostics) =
        toonify_io::process_with_diagnostics(&bytes, mime, settings, &StdClock)
            .map_err(|e| format!("Error processing {}: {e}", input.display()))?;

    std::fs::write(&output, &result.png)
        .map_err(|e| format!("Error writing {}: {e}", output.display()))?;
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        width = result.dimensions.width,
        height = result.dimensions.height,
        "wrote rendering"
    );

    Ok(RunRecord {
        input: input.to_path_buf(),
        output,
        diagnostics,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.output.is_some() && cli.inputs.len() > 1 {
        eprintln!("--output accepts a single input; use --out-dir for several");
        return ExitCode::FAILURE;
    }

    let settings = match settings_from_cli(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?settings, inputs = cli.inputs.len(), "starting");

    if let Some(ref dir) = cli.out_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("Error creating {}: {e}", dir.display());
        return ExitCode::FAILURE;
    }

    // One thread per input.
    let outcomes: Vec<Result<RunRecord, String>> = std::thread::scope(|scope| {
        let handles: Vec<_> = cli
            .inputs
            .iter()
            .map(|input| {
                let output = output_path(&cli, input, &settings);
                let settings = &settings;
                scope.spawn(move || run_one(input, output, settings))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err("worker thread panicked".to_string()))
            })
            .collect()
    });

    let mut failed = false;
    let mut records = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(record) => {
                if cli.report {
                    println!("{}: {}", record.input.display(), record.output.display());
                    println!("{}\n", record.diagnostics.report());
                }
                records.push(record);
            }
            Err(msg) => {
                eprintln!("{msg}");
                failed = true;
            }
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&records) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
