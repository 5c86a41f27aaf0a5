//! Export error types.

use thiserror::Error;

/// Errors that can occur while exporting.
///
/// These never escape the public export operations: each operation catches
/// them at its boundary and reports a failed [`ExportResult`](crate::ExportResult).
#[derive(Debug, Error)]
pub enum ExportError {
    /// Creating a directory or writing a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the output image failed.
    #[error("Encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// The canvas could not be rendered.
    #[error("Render failed: {0}")]
    Render(#[from] detailcanvas_core::CanvasError),
}
