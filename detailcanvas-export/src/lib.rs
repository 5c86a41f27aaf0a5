//! # Detail Canvas Export
//!
//! Turns a [`Canvas`](detailcanvas_core::Canvas) into marketplace-ready image
//! files.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            Exporter / spawn_export          │
//! ├──────────────┬──────────────┬───────────────┤
//! │ Render       │ Cap width    │ Encode        │
//! │ per screen   │ per platform │ JPEG / PNG    │
//! └──────────────┴──────────────┴───────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod encode;
pub mod error;
pub mod exporter;
pub mod platform;
pub mod worker;

pub use error::ExportError;
pub use exporter::{ExportResult, Exporter, PlatformExport};
pub use platform::{OutputFormat, Platform, DEFAULT_PLATFORM, PLATFORMS};
pub use worker::{run_export, spawn_export, ExportJob, ExportRequest};
