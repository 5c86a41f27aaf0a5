//! Image tools: opaque bitmap transforms applied to image layers.
//!
//! Background removal, upscaling and enhancement live outside this crate.
//! They plug in through [`ImageTool`]; a tool that fails returns `None` and
//! the layer keeps its original content.

use image::RgbaImage;

/// A bitmap-to-bitmap transform.
pub trait ImageTool {
    /// Short name, used as the history label.
    fn name(&self) -> &str;

    /// Transform `input`, or return `None` on failure.
    fn apply(&self, input: &RgbaImage) -> Option<RgbaImage>;
}

/// An [`ImageTool`] backed by a closure.
pub struct FnTool<F> {
    name: String,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(&RgbaImage) -> Option<RgbaImage>,
{
    /// Wrap a closure as a named tool.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> ImageTool for FnTool<F>
where
    F: Fn(&RgbaImage) -> Option<RgbaImage>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, input: &RgbaImage) -> Option<RgbaImage> {
        (self.func)(input)
    }
}

impl<F> std::fmt::Debug for FnTool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool").field("name", &self.name).finish_non_exhaustive()
    }
}
