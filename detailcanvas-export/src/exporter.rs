//! Platform-aware export of a canvas to image files.

use std::fs;
use std::path::{Path, PathBuf};

use detailcanvas_core::{Canvas, ScreenId};
use serde::Serialize;

use crate::encode::{cap_width, screen_file_name, write_image};
use crate::error::ExportError;
use crate::platform::{self, Platform, PLATFORMS};

/// Outcome of one export operation.
///
/// A failure carries no files even if some were written before the error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportResult {
    /// Whether the whole operation succeeded.
    pub success: bool,
    /// Written files, in order.
    pub files: Vec<PathBuf>,
    /// Human-readable summary.
    pub message: String,
}

impl ExportResult {
    fn succeeded(files: Vec<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            files,
            message: message.into(),
        }
    }

    fn failed(error: &ExportError) -> Self {
        Self {
            success: false,
            files: Vec::new(),
            message: format!("导出失败: {error}"),
        }
    }
}

/// Result of exporting for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformExport {
    /// Platform key.
    pub platform: String,
    /// Outcome.
    pub result: ExportResult,
}

/// Exports a canvas, screen by screen or as a whole.
///
/// Rendering goes through the layers' render caches, hence the mutable
/// borrow; the document itself is not modified.
pub struct Exporter<'a> {
    canvas: &'a mut Canvas,
}

impl<'a> Exporter<'a> {
    /// Create an exporter for a canvas.
    pub fn new(canvas: &'a mut Canvas) -> Self {
        Self { canvas }
    }

    /// Export every non-blank screen of the canvas into `output_dir`.
    ///
    /// Files are named `{sequence:02}_{screen name}.{ext}` where the sequence
    /// counts non-blank screens only. `quality` defaults to the platform's.
    pub fn export_screens(
        &mut self,
        output_dir: impl AsRef<Path>,
        platform_key: &str,
        quality: Option<u8>,
    ) -> ExportResult {
        let platform = platform::resolve(platform_key);
        let quality = quality.unwrap_or(platform.quality);
        match self.try_export_screens(output_dir.as_ref(), platform, quality) {
            Ok(files) => {
                tracing::info!("Exported {} screens for {}", files.len(), platform.key);
                let message = format!("成功导出 {} 张图片", files.len());
                ExportResult::succeeded(files, message)
            }
            Err(e) => {
                tracing::warn!("Screen export for {} failed: {e}", platform.key);
                ExportResult::failed(&e)
            }
        }
    }

    fn try_export_screens(
        &mut self,
        output_dir: &Path,
        platform: &Platform,
        quality: u8,
    ) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(output_dir)?;

        let screens: Vec<(ScreenId, String)> = self
            .canvas
            .screens()
            .iter()
            .filter(|screen| !screen.is_blank)
            .map(|screen| (screen.id.clone(), screen.name.clone()))
            .collect();

        let mut files = Vec::with_capacity(screens.len());
        for (sequence, (id, name)) in screens.iter().enumerate() {
            let image = cap_width(self.canvas.render_screen(id, 1.0)?, platform.max_width);
            let path = output_dir.join(screen_file_name(sequence + 1, name, platform.format));
            write_image(&image, &path, platform.format, quality)?;
            files.push(path);
        }
        Ok(files)
    }

    /// Export the whole canvas as one image.
    ///
    /// The platform's extension is appended to `output_path` when missing, and
    /// parent directories are created.
    pub fn export_full(
        &mut self,
        output_path: impl AsRef<Path>,
        platform_key: &str,
        quality: Option<u8>,
    ) -> ExportResult {
        let platform = platform::resolve(platform_key);
        let quality = quality.unwrap_or(platform.quality);
        match self.try_export_full(output_path.as_ref(), platform, quality) {
            Ok(path) => {
                tracing::info!("Exported full canvas to {}", path.display());
                ExportResult::succeeded(vec![path], "导出成功")
            }
            Err(e) => {
                tracing::warn!("Full export for {} failed: {e}", platform.key);
                ExportResult::failed(&e)
            }
        }
    }

    fn try_export_full(
        &mut self,
        output_path: &Path,
        platform: &Platform,
        quality: u8,
    ) -> Result<PathBuf, ExportError> {
        let image = cap_width(self.canvas.render(1.0)?, platform.max_width);
        let path = with_extension(output_path, platform.format.extension());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        write_image(&image, &path, platform.format, quality)?;
        Ok(path)
    }

    /// Export screens once per platform, each into `output_dir/{platform key}`.
    ///
    /// `None` exports for every known platform.
    pub fn export_for_platforms(
        &mut self,
        output_dir: impl AsRef<Path>,
        platforms: Option<&[&str]>,
        quality: Option<u8>,
    ) -> Vec<PlatformExport> {
        let output_dir = output_dir.as_ref();
        let keys: Vec<&str> = platforms.map_or_else(
            || PLATFORMS.iter().map(|p| p.key).collect(),
            <[&str]>::to_vec,
        );
        keys.into_iter()
            .map(|key| PlatformExport {
                platform: key.to_string(),
                result: self.export_screens(output_dir.join(key), key, quality),
            })
            .collect()
    }

    /// Constraints of a platform, if it exists.
    #[must_use]
    pub fn platform_info(key: &str) -> Option<&'static Platform> {
        platform::find(key)
    }

    /// `(key, display name)` of every known platform.
    #[must_use]
    pub fn available_platforms() -> Vec<(&'static str, &'static str)> {
        PLATFORMS.iter().map(|p| (p.key, p.name)).collect()
    }
}

/// Append `.{extension}` unless the path already ends with it (case-insensitive).
fn with_extension(path: &Path, extension: &str) -> PathBuf {
    let suffix = format!(".{extension}");
    if path.to_string_lossy().to_lowercase().ends_with(&suffix) {
        path.to_path_buf()
    } else {
        let mut raw = path.as_os_str().to_os_string();
        raw.push(&suffix);
        PathBuf::from(raw)
    }
}
