//! # Detail Canvas CLI
//!
//! Headless host for Detail Canvas documents.
//!
//! ## Usage
//!
//! ```bash
//! detailcanvas info page.json
//! detailcanvas render page.json preview.png --scale 0.5
//! detailcanvas export page.json out/ --platform jd
//! detailcanvas export page.json out/ --all-platforms
//! detailcanvas platforms
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `CliConfig` - Resolved configuration handed to [`run`]
//! - Exports run on the `detailcanvas-export` background worker

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use detailcanvas_core::{Canvas, Editor, EditorConfig};
use detailcanvas_export::encode::write_image;
use detailcanvas_export::{spawn_export, ExportRequest, Exporter, OutputFormat, DEFAULT_PLATFORM};

/// Command-line arguments for detailcanvas.
#[derive(Debug, Clone, Parser)]
#[command(name = "detailcanvas")]
#[command(about = "Inspect, preview and export e-commerce detail pages")]
#[command(version)]
pub struct CliArgs {
    /// Extra font file to register; may be repeated
    #[arg(long = "font", global = true)]
    pub fonts: Vec<PathBuf>,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Print document size, screens and layers
    Info {
        /// Document file
        document: PathBuf,
    },
    /// Render the whole document to a PNG preview
    Render {
        /// Document file
        document: PathBuf,
        /// Output PNG path
        output: PathBuf,
        /// Render scale
        #[arg(long, default_value = "1.0")]
        scale: f32,
    },
    /// Export screens (or the whole page) for a marketplace
    Export {
        /// Document file
        document: PathBuf,
        /// Output directory, or file path with --full
        output: PathBuf,
        /// Platform key (see `platforms`)
        #[arg(long, env = "DETAILCANVAS_PLATFORM", default_value = DEFAULT_PLATFORM)]
        platform: String,
        /// JPEG quality, 1-100; defaults to the platform's
        #[arg(long, env = "DETAILCANVAS_QUALITY", value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
        /// Export one image of the whole page
        #[arg(long, conflicts_with = "all_platforms")]
        full: bool,
        /// Export screens for every platform, one subdirectory each
        #[arg(long)]
        all_platforms: bool,
    },
    /// List known platforms
    Platforms {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Editor configuration used to open documents.
    pub editor: EditorConfig,
    /// Command to run.
    pub command: Command,
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            editor: EditorConfig {
                font_files: args.fonts,
                ..EditorConfig::default()
            },
            command: args.command,
        }
    }
}

/// Run a command and return the text to print.
///
/// # Errors
///
/// Returns an error if the document cannot be opened, or if rendering or any
/// export fails.
pub fn run(config: &CliConfig) -> anyhow::Result<String> {
    match &config.command {
        Command::Info { document } => Ok(describe(&open(document, &config.editor)?)),
        Command::Render {
            document,
            output,
            scale,
        } => {
            let mut canvas = open(document, &config.editor)?;
            let image = canvas.render(*scale).context("Failed to render document")?;
            write_image(&image, output, OutputFormat::Png, 100)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!("Rendered {}x{} preview", image.width(), image.height());
            Ok(format!("{}\n", output.display()))
        }
        Command::Export {
            document,
            output,
            platform,
            quality,
            full,
            all_platforms,
        } => {
            let canvas = open(document, &config.editor)?;
            let request = if *all_platforms {
                ExportRequest::Platforms {
                    output_dir: output.clone(),
                    platforms: None,
                    quality: *quality,
                }
            } else if *full {
                ExportRequest::Full {
                    output_path: output.clone(),
                    platform: platform.clone(),
                    quality: *quality,
                }
            } else {
                ExportRequest::Screens {
                    output_dir: output.clone(),
                    platform: platform.clone(),
                    quality: *quality,
                }
            };
            export(canvas, request)
        }
        Command::Platforms { json } => platforms(*json),
    }
}

fn open(path: &Path, config: &EditorConfig) -> anyhow::Result<Canvas> {
    let editor = Editor::open(path, config)
        .with_context(|| format!("Failed to open document {}", path.display()))?;
    Ok(editor.into_canvas())
}

fn export(canvas: Canvas, request: ExportRequest) -> anyhow::Result<String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .context("Failed to start export runtime")?;
    let results = runtime.block_on(spawn_export(canvas, request).wait());

    let mut report = String::new();
    let mut failures = Vec::new();
    for entry in &results {
        let _ = writeln!(report, "[{}] {}", entry.platform, entry.result.message);
        for file in &entry.result.files {
            let _ = writeln!(report, "  {}", file.display());
        }
        if !entry.result.success {
            failures.push(format!("{}: {}", entry.platform, entry.result.message));
        }
    }

    if failures.is_empty() {
        Ok(report)
    } else {
        anyhow::bail!("{}", failures.join("; "))
    }
}

fn platforms(json: bool) -> anyhow::Result<String> {
    if json {
        let platforms: Vec<_> = Exporter::available_platforms()
            .into_iter()
            .filter_map(|(key, _)| Exporter::platform_info(key))
            .collect();
        return Ok(serde_json::to_string_pretty(&platforms)? + "\n");
    }

    let mut out = String::new();
    for (key, name) in Exporter::available_platforms() {
        if let Some(platform) = Exporter::platform_info(key) {
            let _ = writeln!(
                out,
                "{key:<8} {name}  max {}x{}  {} q{}",
                platform.max_width,
                platform.max_height,
                platform.format.extension(),
                platform.quality
            );
        }
    }
    Ok(out)
}

/// Human-readable summary of a document: size, screens with offsets, and
/// layers top first.
#[must_use]
pub fn describe(canvas: &Canvas) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Canvas {}x{}  background {}",
        canvas.width(),
        canvas.height(),
        canvas.background_color
    );

    let _ = writeln!(out, "Screens ({}):", canvas.screens().len());
    for screen in canvas.screens() {
        let offset = canvas.screen_y_offset(&screen.id).unwrap_or_default();
        let blank = if screen.is_blank { "  [blank]" } else { "" };
        let _ = writeln!(
            out,
            "  y={offset:<6} h={:<5} {}{blank}",
            screen.height(),
            screen.name
        );
    }

    let _ = writeln!(out, "Layers ({}):", canvas.layers().len());
    for layer in canvas.layers().iter().rev() {
        let mut flags = String::new();
        if !layer.visible {
            flags.push_str("  [hidden]");
        }
        if layer.locked {
            flags.push_str("  [locked]");
        }
        let _ = writeln!(
            out,
            "  {:<6} {:<24} at ({}, {}) {}x{}{flags}",
            layer.layer_type(),
            layer.name,
            layer.x,
            layer.y,
            layer.width(),
            layer.height()
        );
    }
    out
}
