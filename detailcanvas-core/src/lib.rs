//! # Detail Canvas Core
//!
//! Document model and rendering engine for multi-screen e-commerce detail
//! pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   Editor                    │
//! │   mutations -> history snapshot -> events   │
//! ├─────────────────────────────────────────────┤
//! │  Canvas          │  CanvasHistory           │
//! │  - Layers        │  - Bounded snapshots     │
//! │  - Screens       │  - Undo / redo cursor    │
//! │  - Composite     │  - Pause while restoring │
//! ├─────────────────────────────────────────────┤
//! │  Layer render    │  Raster stack            │
//! │  - Image / text  │  - image (resize, blend) │
//! │  - Shape         │  - tiny-skia (vectors)   │
//! │  - Render cache  │  - resvg (text)          │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod canvas;
pub mod config;
pub mod editor;
pub mod error;
pub mod event;
pub mod fonts;
pub mod history;
pub mod layer;
pub mod raster;
pub mod render_cache;
pub mod schema;
pub mod screen;
pub mod shape;
pub mod text;
pub mod tools;

pub use canvas::Canvas;
pub use config::EditorConfig;
pub use editor::Editor;
pub use error::{CanvasError, CanvasResult};
pub use event::{CanvasEvent, LayerOrder};
pub use fonts::FontBook;
pub use history::{CanvasHistory, HistoryManager, HistoryState};
pub use layer::{
    FontWeight, ImageContent, Layer, LayerId, LayerKind, ShapeContent, ShapeKind, TextAlign,
    TextContent,
};
pub use render_cache::{CacheStats, RenderCache};
pub use schema::{CanvasDocument, LayerDocument, ScreenDocument};
pub use screen::{Screen, ScreenId};
pub use tools::{FnTool, ImageTool};

/// Detail canvas core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
