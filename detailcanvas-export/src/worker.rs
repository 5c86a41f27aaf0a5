//! Background export.
//!
//! Rendering and encoding are CPU bound and can take seconds for a long
//! page, so interactive hosts hand an owned copy of the canvas to a blocking
//! task and await the results. There is no cancellation: a started export
//! runs to completion.

use std::path::PathBuf;

use detailcanvas_core::Canvas;
use tokio::task::JoinHandle;

use crate::exporter::{ExportResult, Exporter, PlatformExport};
use crate::platform;

/// What a background export should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportRequest {
    /// Every non-blank screen for one platform.
    Screens {
        /// Output directory.
        output_dir: PathBuf,
        /// Platform key.
        platform: String,
        /// JPEG quality; `None` uses the platform default.
        quality: Option<u8>,
    },
    /// The whole canvas as one image.
    Full {
        /// Output file path.
        output_path: PathBuf,
        /// Platform key.
        platform: String,
        /// JPEG quality; `None` uses the platform default.
        quality: Option<u8>,
    },
    /// Screens for several platforms, one subdirectory each.
    Platforms {
        /// Output directory.
        output_dir: PathBuf,
        /// Platform keys; `None` means every known platform.
        platforms: Option<Vec<String>>,
        /// JPEG quality; `None` uses each platform's default.
        quality: Option<u8>,
    },
}

/// Handle to an export running on the blocking thread pool.
#[derive(Debug)]
pub struct ExportJob {
    handle: JoinHandle<Vec<PlatformExport>>,
}

impl ExportJob {
    /// Wait for the export to finish.
    ///
    /// A panicked export is reported as a single failed result.
    pub async fn wait(self) -> Vec<PlatformExport> {
        match self.handle.await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Export task failed: {e}");
                vec![PlatformExport {
                    platform: String::new(),
                    result: ExportResult {
                        success: false,
                        files: Vec::new(),
                        message: format!("导出失败: {e}"),
                    },
                }]
            }
        }
    }

    /// Whether the export has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Run an export on the Tokio blocking pool.
///
/// Must be called from within a Tokio runtime.
#[must_use]
pub fn spawn_export(mut canvas: Canvas, request: ExportRequest) -> ExportJob {
    let handle = tokio::task::spawn_blocking(move || run_export(&mut canvas, &request));
    ExportJob { handle }
}

/// Run an export synchronously. Results are keyed by the platform whose
/// constraints were applied.
pub fn run_export(canvas: &mut Canvas, request: &ExportRequest) -> Vec<PlatformExport> {
    let mut exporter = Exporter::new(canvas);
    match request {
        ExportRequest::Screens {
            output_dir,
            platform,
            quality,
        } => vec![PlatformExport {
            platform: platform::resolve(platform).key.to_string(),
            result: exporter.export_screens(output_dir, platform, *quality),
        }],
        ExportRequest::Full {
            output_path,
            platform,
            quality,
        } => vec![PlatformExport {
            platform: platform::resolve(platform).key.to_string(),
            result: exporter.export_full(output_path, platform, *quality),
        }],
        ExportRequest::Platforms {
            output_dir,
            platforms,
            quality,
        } => {
            let keys: Option<Vec<&str>> =
                platforms.as_ref().map(|keys| keys.iter().map(String::as_str).collect());
            exporter.export_for_platforms(output_dir, keys.as_deref(), *quality)
        }
    }
}
