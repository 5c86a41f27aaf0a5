//! Text rasterization and measurement.
//!
//! Text goes through an SVG intermediate: the content is laid out as one
//! `<tspan>` per line, parsed by usvg against the [`FontBook`] database and
//! rasterized by resvg.

use std::fmt::Write;

use image::{Rgba, RgbaImage};
use tiny_skia::{Pixmap, Transform};

use crate::error::{CanvasError, CanvasResult};
use crate::fonts::FontBook;
use crate::layer::FontWeight;
use crate::raster::pixmap_to_image;

/// Resolved text styling for a single render.
#[derive(Debug, Clone)]
pub struct TextStyle<'a> {
    /// Requested font family.
    pub font_family: &'a str,
    /// Font size in pixels.
    pub font_size: u32,
    /// Fill color.
    pub color: Rgba<u8>,
    /// Font weight.
    pub weight: FontWeight,
    /// Line pitch as a multiple of the font size.
    pub line_height: f32,
}

impl TextStyle<'_> {
    #[allow(clippy::cast_precision_loss)]
    fn line_pitch(&self) -> f32 {
        self.font_size.max(1) as f32 * self.line_height.max(0.0)
    }
}

/// Render `text` onto a transparent `width` x `height` bitmap, top-left aligned.
///
/// Glyphs that overflow the box are cut off by the bitmap edge.
///
/// # Errors
///
/// Returns [`CanvasError::Render`] if the intermediate SVG cannot be parsed or
/// the target bitmap cannot be allocated.
pub fn render_text(
    text: &str,
    style: &TextStyle<'_>,
    width: u32,
    height: u32,
    fonts: &FontBook,
) -> CanvasResult<RgbaImage> {
    let svg = build_svg(text, style, width, height, fonts);
    rasterize_svg(&svg, width, height, fonts)
}

/// Measure the ink bounds of `text`, in whole pixels.
///
/// Returns `None` when nothing could be laid out, typically because no font
/// face is available.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn measure_text(text: &str, style: &TextStyle<'_>, fonts: &FontBook) -> Option<(u32, u32)> {
    if text.trim().is_empty() || fonts.is_empty() {
        return None;
    }

    // Generous layout box; measurement does not depend on it.
    let chars = text.lines().map(|l| l.chars().count()).max().unwrap_or(1).max(1);
    let lines = text.lines().count().max(1);
    let box_width = (chars as f32 * style.font_size.max(1) as f32 * 2.0).ceil() as u32 + 64;
    let box_height = (lines as f32 * style.line_pitch().max(1.0) * 2.0).ceil() as u32 + 64;

    let svg = build_svg(text, style, box_width, box_height, fonts);
    let tree = parse_svg(&svg, fonts).ok()?;
    if !tree.root().has_children() {
        return None;
    }

    let bounds = tree.root().abs_bounding_box();
    let (w, h) = (bounds.width().ceil(), bounds.height().ceil());
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some((w as u32, h as u32))
}

/// Build the SVG document for a text block.
#[allow(clippy::cast_precision_loss)]
fn build_svg(text: &str, style: &TextStyle<'_>, width: u32, height: u32, fonts: &FontBook) -> String {
    let family = fonts.resolve_family(style.font_family);
    let [r, g, b, a] = style.color.0;
    let alpha = f32::from(a) / 255.0;

    let mut svg = String::with_capacity(256 + text.len());
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    );
    let _ = write!(
        svg,
        "<text font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" fill=\"rgb({r},{g},{b})\" fill-opacity=\"{alpha}\" dominant-baseline=\"text-before-edge\" xml:space=\"preserve\">",
        escape_xml(&family),
        style.font_size.max(1),
        style.weight.svg_value(),
    );
    for (index, line) in text.split('\n').enumerate() {
        if line.is_empty() {
            continue;
        }
        let y = index as f32 * style.line_pitch();
        let _ = write!(svg, "<tspan x=\"0\" y=\"{y}\">{}</tspan>", escape_xml(line));
    }
    svg.push_str("</text></svg>");
    svg
}

fn parse_svg(svg: &str, fonts: &FontBook) -> CanvasResult<usvg::Tree> {
    let options = usvg::Options {
        fontdb: fonts.database(),
        ..usvg::Options::default()
    };
    usvg::Tree::from_str(svg, &options)
        .map_err(|e| CanvasError::Render(format!("SVG parsing failed: {e}")))
}

fn rasterize_svg(svg: &str, width: u32, height: u32, fonts: &FontBook) -> CanvasResult<RgbaImage> {
    let tree = parse_svg(svg, fonts)?;
    let mut pixmap = Pixmap::new(width.max(1), height.max(1))
        .ok_or_else(|| CanvasError::Render("Failed to create pixmap".to_string()))?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());
    Ok(pixmap_to_image(&pixmap))
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
