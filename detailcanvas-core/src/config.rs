//! Document defaults and editor configuration.

use std::path::PathBuf;

/// Standard detail-page width in pixels.
pub const DEFAULT_CANVAS_WIDTH: u32 = 750;

/// Height given to a screen when none is requested.
pub const DEFAULT_SCREEN_HEIGHT: u32 = 300;

/// Screens can never be resized below this height.
pub const MIN_SCREEN_HEIGHT: u32 = 50;

/// Tallest a single screen can be. Larger heights, including ones read from
/// a document, are capped.
pub const MAX_SCREEN_HEIGHT: u32 = 100_000;

/// Largest bitmap, in pixels, the canvas or a layer will allocate.
pub const MAX_RENDER_PIXELS: u64 = 1 << 26;

/// Imported bitmaps wider than this are downscaled on load.
pub const MAX_IMPORT_WIDTH: u32 = 600;

/// Imported bitmaps taller than this are downscaled on load.
pub const MAX_IMPORT_HEIGHT: u32 = 800;

/// Offset applied to both axes of a duplicated layer.
pub const DUPLICATE_OFFSET: i32 = 20;

/// Padding added to measured text bounds in each dimension.
pub const TEXT_PADDING: u32 = 10;

/// Default undo depth.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Default background color of a new canvas.
pub const DEFAULT_BACKGROUND: &str = "#FFFFFF";

/// Prefix of auto-generated screen names ("第N屏").
pub const SCREEN_NAME_PREFIX: &str = "第";

/// Suffix of auto-generated screen names ("第N屏").
pub const SCREEN_NAME_SUFFIX: &str = "屏";

/// Name given to auto-named blank screens.
pub const BLANK_SCREEN_NAME: &str = "留白";

/// Marker appended to the names of duplicated layers and screens.
pub const COPY_MARKER: &str = "副本";

/// Separator between a screen number and a user-supplied caption.
pub const SCREEN_CAPTION_SEPARATOR: &str = " - ";

/// Configuration for an [`Editor`](crate::Editor).
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Maximum number of retained history snapshots.
    pub max_history: usize,
    /// Width of newly created documents.
    pub canvas_width: u32,
    /// Extra font files registered with the font book at startup.
    pub font_files: Vec<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            font_files: Vec::new(),
        }
    }
}
