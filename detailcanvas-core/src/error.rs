//! Error types for canvas operations.

use thiserror::Error;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
///
/// Most canvas operations never surface these: per-layer render failures are
/// logged and skipped, and invariant-guarding operations return `false`.
/// Errors appear at the load/save boundary and in the raster helpers.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Layer not found on the canvas.
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    /// Screen not found on the canvas.
    #[error("Screen not found: {0}")]
    ScreenNotFound(String),

    /// The document is not a JSON object or is otherwise unusable.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing a document failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding failed.
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    /// Rendering error.
    #[error("Rendering error: {0}")]
    Render(String),
}
