//! Canvas layers - the visual elements composited into a detail page.
//!
//! A [`Layer`] carries the geometry and appearance shared by every element
//! and a [`LayerKind`] with the variant data. Rendering dispatches on the
//! kind; every variant produces a bitmap at the layer's unscaled size, then
//! applies rotation and opacity, and memoizes the result in the layer's
//! [`RenderCache`].

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{MAX_IMPORT_HEIGHT, MAX_IMPORT_WIDTH, TEXT_PADDING};
use crate::error::{CanvasError, CanvasResult};
use crate::fonts::FontBook;
use crate::raster::{self, finish_layer_bitmap, parse_hex_color, resize_exact};
use crate::render_cache::{CacheStats, RenderCache};
use crate::shape::draw_shape;
use crate::text::{measure_text, render_text, TextStyle};

/// Unique identifier for a layer.
///
/// New layers get a UUID v4; identifiers read from documents are kept
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Create a new unique layer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier string.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Geometric primitive drawn by a shape layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Filled, outlined rectangle.
    #[default]
    Rectangle,
    /// Filled, outlined ellipse inscribed in the layer box.
    Ellipse,
    /// Horizontal line through the vertical center.
    Line,
}

impl ShapeKind {
    /// Persisted name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Ellipse => "ellipse",
            Self::Line => "line",
        }
    }

    /// Parse a persisted name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "rectangle" => Some(Self::Rectangle),
            "ellipse" => Some(Self::Ellipse),
            "line" => Some(Self::Line),
            _ => None,
        }
    }

    /// Display name used in default layer names.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Rectangle => "矩形",
            Self::Ellipse => "椭圆",
            Self::Line => "线条",
        }
    }
}

/// Font weight of a text layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FontWeight {
    /// Regular weight.
    #[default]
    Normal,
    /// Bold weight.
    Bold,
}

impl FontWeight {
    /// Persisted name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bold => "bold",
        }
    }

    /// Parse a persisted name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "normal" => Some(Self::Normal),
            "bold" => Some(Self::Bold),
            _ => None,
        }
    }

    /// Value of the SVG `font-weight` attribute.
    #[must_use]
    pub const fn svg_value(self) -> &'static str {
        self.as_str()
    }
}

/// Horizontal alignment of a text layer.
///
/// Stored with the document; text is currently always drawn from the left
/// edge of the layer box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextAlign {
    /// Left aligned.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Right aligned.
    Right,
}

impl TextAlign {
    /// Persisted name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }

    /// Parse a persisted name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Image layer source.
///
/// The decoded bitmap is loaded lazily and never persisted.
#[derive(Debug, Clone, Default)]
pub struct ImageContent {
    path: String,
    bitmap: Option<Arc<RgbaImage>>,
}

impl ImageContent {
    /// Source file path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The decoded bitmap, if loaded.
    #[must_use]
    pub fn bitmap(&self) -> Option<&Arc<RgbaImage>> {
        self.bitmap.as_ref()
    }
}

/// Text layer content and styling.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    /// The string to draw. `\n` starts a new line.
    pub text: String,
    /// Requested font family.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: u32,
    /// Color as `#RRGGBB` or `#RRGGBBAA`.
    pub font_color: String,
    /// Font weight.
    pub font_weight: FontWeight,
    /// Horizontal alignment.
    pub text_align: TextAlign,
    /// Line pitch as a multiple of the font size.
    pub line_height: f32,
}

impl TextContent {
    /// Content with default styling.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn style(&self) -> TextStyle<'_> {
        TextStyle {
            font_family: &self.font_family,
            font_size: self.font_size,
            color: parse_hex_color(&self.font_color),
            weight: self.font_weight,
            line_height: self.line_height,
        }
    }
}

impl Default for TextContent {
    fn default() -> Self {
        Self {
            text: "文本".to_string(),
            font_family: "Arial".to_string(),
            font_size: 24,
            font_color: "#000000".to_string(),
            font_weight: FontWeight::Normal,
            text_align: TextAlign::Left,
            line_height: 1.5,
        }
    }
}

/// Shape layer content and styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeContent {
    /// Primitive to draw.
    pub kind: ShapeKind,
    /// Fill color as hex.
    pub fill_color: String,
    /// Stroke color as hex.
    pub stroke_color: String,
    /// Stroke width in pixels; zero disables the outline.
    pub stroke_width: u32,
}

impl ShapeContent {
    /// Content with default styling.
    #[must_use]
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }
}

impl Default for ShapeContent {
    fn default() -> Self {
        Self {
            kind: ShapeKind::Rectangle,
            fill_color: "#cccccc".to_string(),
            stroke_color: "#000000".to_string(),
            stroke_width: 1,
        }
    }
}

/// Variant data of a layer.
#[derive(Debug, Clone)]
pub enum LayerKind {
    /// Plain layer with no visual content. Renders nothing.
    Base,
    /// Raster image loaded from a file.
    Image(ImageContent),
    /// Text block.
    Text(TextContent),
    /// Vector shape.
    Shape(ShapeContent),
}

impl LayerKind {
    /// Persisted discriminant.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Image(_) => "image",
            Self::Text(_) => "text",
            Self::Shape(_) => "shape",
        }
    }
}

/// The attributes that affect a layer's pixels.
///
/// Rotation and opacity are compared by bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GeometryKey {
    width: u32,
    height: u32,
    rotation: u32,
    opacity: u32,
}

/// Render cache key, one shape per variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RenderKey {
    Image {
        geometry: GeometryKey,
    },
    Text {
        geometry: GeometryKey,
        text: String,
        font_family: String,
        font_size: u32,
        font_color: String,
        font_weight: FontWeight,
        line_height: u32,
    },
    Shape {
        geometry: GeometryKey,
        kind: ShapeKind,
        fill_color: String,
        stroke_color: String,
        stroke_width: u32,
    },
}

fn image_key(geometry: GeometryKey) -> RenderKey {
    RenderKey::Image { geometry }
}

fn text_key(geometry: GeometryKey, content: &TextContent) -> RenderKey {
    RenderKey::Text {
        geometry,
        text: content.text.clone(),
        font_family: content.font_family.clone(),
        font_size: content.font_size,
        font_color: content.font_color.clone(),
        font_weight: content.font_weight,
        line_height: content.line_height.to_bits(),
    }
}

fn shape_key(geometry: GeometryKey, content: &ShapeContent) -> RenderKey {
    RenderKey::Shape {
        geometry,
        kind: content.kind,
        fill_color: content.fill_color.clone(),
        stroke_color: content.stroke_color.clone(),
        stroke_width: content.stroke_width,
    }
}

/// A positioned, sized visual element.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Unique identifier.
    pub id: LayerId,
    /// Human-readable name.
    pub name: String,
    /// Left edge in canvas pixels.
    pub x: i32,
    /// Top edge in canvas pixels.
    pub y: i32,
    width: u32,
    height: u32,
    /// Clockwise rotation in degrees.
    pub rotation: f32,
    /// Opacity in `[0.0, 1.0]`.
    pub opacity: f32,
    /// Hidden layers are neither drawn nor hit-tested.
    pub visible: bool,
    /// Locked layers are drawn but not hit-tested or edited interactively.
    pub locked: bool,
    kind: LayerKind,
    cache: RenderCache<RenderKey>,
}

impl Layer {
    /// Create a 100x100 layer of the given kind with a default name.
    #[must_use]
    pub fn new(kind: LayerKind) -> Self {
        let name = default_name(&kind);
        Self {
            id: LayerId::new(),
            name,
            x: 0,
            y: 0,
            width: 100,
            height: 100,
            rotation: 0.0,
            opacity: 1.0,
            visible: true,
            locked: false,
            kind,
            cache: RenderCache::new(),
        }
    }

    /// Create an image layer for a file. The image is not loaded yet.
    #[must_use]
    pub fn image(path: impl Into<String>) -> Self {
        Self::new(LayerKind::Image(ImageContent {
            path: path.into(),
            bitmap: None,
        }))
    }

    /// Create a text layer with default styling.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(LayerKind::Text(TextContent::new(text)))
    }

    /// Create a shape layer with default styling.
    #[must_use]
    pub fn shape(kind: ShapeKind) -> Self {
        Self::new(LayerKind::Shape(ShapeContent::new(kind)))
    }

    /// Set the position.
    #[must_use]
    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Set the size (clamped to at least 1x1).
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.set_size(width, height);
        self
    }

    /// Set the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Width in pixels, always at least 1.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels, always at least 1.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Set the size, clamping each dimension to at least 1.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    /// Resize from possibly negative drag results, clamping to at least 1x1.
    pub fn resize(&mut self, width: i64, height: i64) {
        let clamp = |v: i64| u32::try_from(v.max(1)).unwrap_or(u32::MAX);
        self.set_size(clamp(width), clamp(height));
    }

    /// Move by an offset.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.x = self.x.saturating_add(dx);
        self.y = self.y.saturating_add(dy);
    }

    /// Axis-aligned bounds as `(left, top, right, bottom)`, ignoring rotation.
    #[must_use]
    pub fn bounds(&self) -> (i64, i64, i64, i64) {
        let (x, y) = (i64::from(self.x), i64::from(self.y));
        (x, y, x + i64::from(self.width), y + i64::from(self.height))
    }

    /// Whether the point lies inside the unrotated bounds (edges inclusive).
    #[must_use]
    pub fn contains_point(&self, px: i32, py: i32) -> bool {
        let (left, top, right, bottom) = self.bounds();
        let (px, py) = (i64::from(px), i64::from(py));
        left <= px && px <= right && top <= py && py <= bottom
    }

    /// Variant data.
    #[must_use]
    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    /// Persisted discriminant.
    #[must_use]
    pub fn layer_type(&self) -> &'static str {
        self.kind.tag()
    }

    /// Text content, if this is a text layer.
    #[must_use]
    pub fn text_content(&self) -> Option<&TextContent> {
        match &self.kind {
            LayerKind::Text(content) => Some(content),
            _ => None,
        }
    }

    /// Shape content, if this is a shape layer.
    #[must_use]
    pub fn shape_content(&self) -> Option<&ShapeContent> {
        match &self.kind {
            LayerKind::Shape(content) => Some(content),
            _ => None,
        }
    }

    /// Mutable text content, if this is a text layer.
    pub fn text_mut(&mut self) -> Option<&mut TextContent> {
        match &mut self.kind {
            LayerKind::Text(content) => Some(content),
            _ => None,
        }
    }

    /// Mutable shape content, if this is a shape layer.
    pub fn shape_mut(&mut self) -> Option<&mut ShapeContent> {
        match &mut self.kind {
            LayerKind::Shape(content) => Some(content),
            _ => None,
        }
    }

    /// Image content, if this is an image layer.
    #[must_use]
    pub fn image_content(&self) -> Option<&ImageContent> {
        match &self.kind {
            LayerKind::Image(content) => Some(content),
            _ => None,
        }
    }

    /// Render cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Point an image layer at a new file, dropping the loaded bitmap.
    ///
    /// Returns `false` for non-image layers.
    pub fn set_image_path(&mut self, path: impl Into<String>) -> bool {
        let LayerKind::Image(content) = &mut self.kind else {
            return false;
        };
        content.path = path.into();
        content.bitmap = None;
        self.cache.invalidate();
        true
    }

    /// Decode the image file and adopt its size as the layer size.
    ///
    /// With `auto_resize`, bitmaps larger than the import caps are downscaled
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error if this is not an image layer or the file cannot be
    /// decoded.
    pub fn load_image(&mut self, auto_resize: bool) -> CanvasResult<()> {
        let LayerKind::Image(content) = &self.kind else {
            return Err(CanvasError::Render(format!(
                "Layer {} is not an image layer",
                self.id
            )));
        };
        let bitmap = decode_image(Path::new(&content.path))?;
        self.adopt_bitmap(bitmap, auto_resize);
        Ok(())
    }

    /// Replace an image layer's bitmap and adopt its size as the layer size.
    ///
    /// With `auto_resize`, bitmaps larger than the import caps are downscaled
    /// first. Returns `false` for non-image layers.
    pub fn set_image(&mut self, bitmap: RgbaImage, auto_resize: bool) -> bool {
        if !matches!(self.kind, LayerKind::Image(_)) {
            return false;
        }
        self.adopt_bitmap(bitmap, auto_resize);
        true
    }

    /// The decoded bitmap of an image layer, loading it from disk if needed.
    pub fn loaded_image(&mut self) -> Option<Arc<RgbaImage>> {
        self.ensure_image_loaded();
        self.image_content()
            .and_then(ImageContent::bitmap)
            .map(Arc::clone)
    }

    /// Share another image layer's decoded bitmap without reloading it.
    pub(crate) fn share_bitmap_from(&mut self, other: &Layer) {
        if let (LayerKind::Image(target), LayerKind::Image(source)) = (&mut self.kind, &other.kind) {
            if target.path == source.path {
                target.bitmap.clone_from(&source.bitmap);
            }
        }
    }

    fn adopt_bitmap(&mut self, bitmap: RgbaImage, auto_resize: bool) {
        let bitmap = if auto_resize {
            raster::fit_within(bitmap, MAX_IMPORT_WIDTH, MAX_IMPORT_HEIGHT)
        } else {
            bitmap
        };
        self.set_size(bitmap.width(), bitmap.height());
        if let LayerKind::Image(content) = &mut self.kind {
            content.bitmap = Some(Arc::new(bitmap));
        }
        self.cache.invalidate();
    }

    /// Recompute a text layer's size from its glyph bounds plus padding,
    /// using the process-wide font book.
    pub fn fit_to_text(&mut self) {
        self.fit_to_text_with(&FontBook::global());
    }

    /// Recompute a text layer's size from its glyph bounds plus padding.
    ///
    /// When no font can lay the text out, falls back to
    /// `chars * font_size` by `font_size * line_height`. No-op for other kinds.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn fit_to_text_with(&mut self, fonts: &FontBook) {
        let LayerKind::Text(content) = &self.kind else {
            return;
        };
        let (width, height) = match measure_text(&content.text, &content.style(), fonts) {
            Some((w, h)) => (w + TEXT_PADDING, h + TEXT_PADDING),
            None => {
                let chars = u32::try_from(content.text.chars().count()).unwrap_or(u32::MAX);
                (
                    chars.saturating_mul(content.font_size),
                    (content.font_size as f32 * content.line_height) as u32,
                )
            }
        };
        self.set_size(width, height);
    }

    fn geometry_key(&self) -> GeometryKey {
        GeometryKey {
            width: self.width,
            height: self.height,
            rotation: self.rotation.to_bits(),
            opacity: self.opacity.to_bits(),
        }
    }

    fn render_key(&self) -> Option<RenderKey> {
        let geometry = self.geometry_key();
        match &self.kind {
            LayerKind::Base => None,
            LayerKind::Image(_) => Some(image_key(geometry)),
            LayerKind::Text(content) => Some(text_key(geometry, content)),
            LayerKind::Shape(content) => Some(shape_key(geometry, content)),
        }
    }

    /// Render the layer at its unscaled size, rotated and faded.
    ///
    /// The result is cached; the cache key is recomputed on every call and
    /// the bitmap is re-rendered only when it differs. Returns `None` for base
    /// layers, for image layers whose file cannot be loaded, and for layers
    /// too large to allocate.
    pub fn render(&mut self) -> Option<Arc<RgbaImage>> {
        if let Err(e) = raster::check_bitmap_size(self.width, self.height) {
            tracing::warn!("Layer {} not rendered: {e}", self.id);
            return None;
        }
        self.ensure_image_loaded();
        let key = self.render_key()?;

        let (width, height) = (self.width, self.height);
        let (rotation, opacity) = (self.rotation, self.opacity);
        let kind = &self.kind;
        let id = &self.id;

        self.cache.get_or_render(key, || {
            let bitmap = match kind {
                LayerKind::Base => return None,
                LayerKind::Image(content) => {
                    let source = content.bitmap.as_ref()?;
                    if source.dimensions() == (width, height) {
                        RgbaImage::clone(source)
                    } else {
                        resize_exact(source, width, height)
                    }
                }
                LayerKind::Text(content) => {
                    match render_text(&content.text, &content.style(), width, height, &FontBook::global()) {
                        Ok(bitmap) => bitmap,
                        Err(e) => {
                            tracing::warn!("Failed to render text layer {id}: {e}");
                            return None;
                        }
                    }
                }
                LayerKind::Shape(content) => {
                    let stroke = Some(parse_hex_color(&content.stroke_color));
                    draw_shape(
                        content.kind,
                        width,
                        height,
                        parse_hex_color(&content.fill_color),
                        stroke,
                        content.stroke_width,
                    )?
                }
            };
            Some(finish_layer_bitmap(bitmap, rotation, opacity))
        })
    }

    /// Lazily decode an image layer's file without touching its size.
    fn ensure_image_loaded(&mut self) {
        let LayerKind::Image(content) = &mut self.kind else {
            return;
        };
        if content.bitmap.is_some() || content.path.is_empty() {
            return;
        }
        match decode_image(Path::new(&content.path)) {
            Ok(bitmap) => {
                let bitmap = raster::fit_within(bitmap, MAX_IMPORT_WIDTH, MAX_IMPORT_HEIGHT);
                content.bitmap = Some(Arc::new(bitmap));
                self.cache.invalidate();
            }
            Err(e) => {
                tracing::warn!("Failed to load image {} for layer {}: {e}", content.path, self.id);
            }
        }
    }
}

fn default_name(kind: &LayerKind) -> String {
    match kind {
        LayerKind::Base => "图层".to_string(),
        LayerKind::Image(_) => "图片图层".to_string(),
        LayerKind::Text(content) => text_layer_name(&content.text),
        LayerKind::Shape(content) => format!("形状: {}", content.kind.display_name()),
    }
}

/// Name given to text layers: the first ten characters of their content.
#[must_use]
pub fn text_layer_name(text: &str) -> String {
    let preview: String = text.chars().take(10).collect();
    format!("文字: {preview}")
}

/// Build image layer content from a persisted path.
pub(crate) fn image_content(path: String) -> ImageContent {
    ImageContent { path, bitmap: None }
}

fn decode_image(path: &Path) -> CanvasResult<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_default_names() {
        assert_eq!(Layer::new(LayerKind::Base).name, "图层");
        assert_eq!(Layer::image("a.png").name, "图片图层");
        assert_eq!(Layer::text("一二三四五六七八九十十一").name, "文字: 一二三四五六七八九十");
        assert_eq!(Layer::shape(ShapeKind::Ellipse).name, "形状: 椭圆");
    }

    #[test]
    fn test_resize_clamps_to_one() {
        let mut layer = Layer::new(LayerKind::Base);
        layer.resize(-20, 0);
        assert_eq!((layer.width(), layer.height()), (1, 1));
        layer.resize(30, 40);
        assert_eq!((layer.width(), layer.height()), (30, 40));
    }

    #[test]
    fn test_contains_point_is_inclusive() {
        let layer = Layer::new(LayerKind::Base).with_position(10, 10).with_size(20, 20);
        assert!(layer.contains_point(10, 10));
        assert!(layer.contains_point(30, 30));
        assert!(!layer.contains_point(31, 30));
        assert!(!layer.contains_point(9, 15));
    }

    #[test]
    fn test_base_layer_renders_nothing() {
        let mut layer = Layer::new(LayerKind::Base);
        assert!(layer.render().is_none());
    }

    #[test]
    fn test_shape_render_is_cached() {
        let mut layer = Layer::shape(ShapeKind::Rectangle).with_size(40, 20);
        let first = layer.render().expect("bitmap");
        let second = layer.render().expect("bitmap");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(layer.cache_stats().renders, 1);
        assert_eq!(layer.cache_stats().hits, 1);
    }

    #[test]
    fn test_key_attribute_change_rerenders() {
        let mut layer = Layer::shape(ShapeKind::Rectangle).with_size(40, 20);
        layer.render();

        layer.shape_mut().expect("shape").fill_color = "#ff0000".to_string();
        let bitmap = layer.render().expect("bitmap");
        assert_eq!(*bitmap.get_pixel(20, 10), Rgba([255, 0, 0, 255]));

        layer.set_size(50, 20);
        assert_eq!(layer.render().expect("bitmap").width(), 50);
        assert_eq!(layer.cache_stats().renders, 3);
    }

    #[test]
    fn test_non_key_attribute_change_reuses_cache() {
        let mut layer = Layer::shape(ShapeKind::Ellipse).with_size(40, 20);
        layer.render();
        layer.name = "renamed".to_string();
        layer.translate(5, 5);
        layer.locked = true;
        layer.render();

        assert_eq!(layer.cache_stats().renders, 1);
        assert_eq!(layer.cache_stats().hits, 1);
    }

    #[test]
    fn test_text_content_change_rerenders() {
        let mut layer = Layer::text("hello").with_size(60, 30);
        layer.render();
        layer.render();
        layer.text_mut().expect("text").text = "world".to_string();
        layer.render();

        assert_eq!(layer.cache_stats().renders, 2);
        assert_eq!(layer.cache_stats().hits, 1);
    }

    #[test]
    fn test_text_renders_at_layer_size() {
        let mut layer = Layer::text("hello").with_size(60, 30);
        let bitmap = layer.render().expect("bitmap");
        assert_eq!(bitmap.dimensions(), (60, 30));
    }

    #[test]
    fn test_rotation_expands_rendered_bitmap() {
        let mut layer = Layer::shape(ShapeKind::Rectangle).with_size(40, 20);
        layer.rotation = 90.0;
        let bitmap = layer.render().expect("bitmap");
        assert_eq!(bitmap.dimensions(), (20, 40));
    }

    #[test]
    fn test_rotation_is_clockwise() {
        // Right quarter red, rest white: a clockwise quarter turn moves the
        // red band to the bottom.
        let mut source = RgbaImage::from_pixel(40, 20, Rgba([255, 255, 255, 255]));
        for x in 30..40 {
            for y in 0..20 {
                source.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let mut layer = Layer::image("");
        assert!(layer.set_image(source, true));
        layer.rotation = 90.0;

        let bitmap = layer.render().expect("bitmap");
        assert_eq!(bitmap.dimensions(), (20, 40));
        let bottom = bitmap.get_pixel(10, 36);
        let top = bitmap.get_pixel(10, 4);
        assert!(bottom.0[0] > 200 && bottom.0[1] < 60, "bottom was {bottom:?}");
        assert!(top.0[1] > 200, "top was {top:?}");
    }

    #[test]
    fn test_text_draws_glyphs_when_fonts_available() {
        let fonts = FontBook::global();
        if fonts.is_empty() {
            return;
        }
        let mut layer = Layer::text("Hello");
        layer.fit_to_text_with(&fonts);
        let (width, height) = (layer.width(), layer.height());
        assert!(width > TEXT_PADDING && height > TEXT_PADDING);
        assert_ne!((width, height), (5 * 24, 36));

        let bitmap = layer.render().expect("bitmap");
        let inked: Vec<_> = bitmap.pixels().filter(|p| p.0[3] > 0).collect();
        assert!(!inked.is_empty());
        assert!(inked.iter().any(|p| p.0[3] > 128 && p.0[0] < 100));
    }

    #[test]
    fn test_oversized_layer_is_not_rendered() {
        let mut layer = Layer::shape(ShapeKind::Rectangle).with_size(100_000, 100_000);
        assert!(layer.render().is_none());
    }

    #[test]
    fn test_opacity_scales_alpha() {
        let mut layer = Layer::shape(ShapeKind::Rectangle).with_size(10, 10);
        layer.shape_mut().expect("shape").stroke_width = 0;
        layer.opacity = 0.5;
        let bitmap = layer.render().expect("bitmap");
        assert_eq!(bitmap.get_pixel(5, 5).0[3], 127);
    }

    #[test]
    fn test_set_image_adopts_size_and_caps_import() {
        let mut layer = Layer::image("");
        assert!(layer.set_image(RgbaImage::new(1200, 800), true));
        assert_eq!((layer.width(), layer.height()), (600, 400));

        assert!(layer.set_image(RgbaImage::new(1200, 800), false));
        assert_eq!((layer.width(), layer.height()), (1200, 800));
    }

    #[test]
    fn test_set_image_invalidates_cache() {
        let mut layer = Layer::image("");
        layer.set_image(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])), true);
        layer.render();
        layer.set_image(RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255])), true);
        let bitmap = layer.render().expect("bitmap");

        assert_eq!(*bitmap.get_pixel(0, 0), Rgba([0, 255, 0, 255]));
        assert_eq!(layer.cache_stats().renders, 2);
    }

    #[test]
    fn test_image_resized_to_layer_box() {
        let mut layer = Layer::image("");
        layer.set_image(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255])), true);
        layer.set_size(30, 20);
        assert_eq!(layer.render().expect("bitmap").dimensions(), (30, 20));
    }

    #[test]
    fn test_missing_image_renders_none() {
        let mut layer = Layer::image("/no/such/file.png");
        assert!(layer.render().is_none());
        assert!(layer.load_image(true).is_err());
    }

    #[test]
    fn test_load_image_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("big.png");
        RgbaImage::from_pixel(1200, 300, Rgba([1, 2, 3, 255]))
            .save(&path)
            .expect("save");

        let mut layer = Layer::image(path.to_string_lossy());
        layer.load_image(true).expect("load");
        assert_eq!((layer.width(), layer.height()), (600, 150));
    }

    #[test]
    fn test_set_image_on_text_layer_is_rejected() {
        let mut layer = Layer::text("x");
        assert!(!layer.set_image(RgbaImage::new(2, 2), true));
        assert!(!layer.set_image_path("a.png"));
    }

    #[test]
    fn test_fit_to_text_fallback_metrics() {
        let mut layer = Layer::text("abc");
        layer.fit_to_text_with(&FontBook::empty());
        assert_eq!((layer.width(), layer.height()), (72, 36));
    }
}
