//! The canvas: aggregate root of a detail-page document.
//!
//! A [`Canvas`] owns an ordered layer list (index 0 is bottommost) and an
//! ordered screen list (top to bottom). The canvas height is always the sum
//! of the screen heights.

use std::fs;
use std::path::Path;

use image::imageops;
use image::RgbaImage;
use serde_json::Value;

use crate::config::{
    DEFAULT_BACKGROUND, DEFAULT_CANVAS_WIDTH, DEFAULT_SCREEN_HEIGHT, DUPLICATE_OFFSET,
    MIN_SCREEN_HEIGHT,
};
use crate::error::{CanvasError, CanvasResult};
use crate::layer::{text_layer_name, Layer, LayerId, ShapeKind};
use crate::raster::{check_bitmap_size, parse_hex_color, resize_exact};
use crate::schema::{self, CanvasDocument, Fields, LayerDocument};
use crate::screen::{self, Screen, ScreenId};

/// A multi-screen detail-page document.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    /// Background color as hex.
    pub background_color: String,
    layers: Vec<Layer>,
    screens: Vec<Screen>,
    selected_layer_id: Option<LayerId>,
    selected_screen_id: Option<ScreenId>,
}

impl Canvas {
    /// Create a canvas of the given width with the three default screens.
    #[must_use]
    pub fn new(width: u32) -> Self {
        Self {
            width: width.max(1),
            background_color: DEFAULT_BACKGROUND.to_string(),
            layers: Vec::new(),
            screens: screen::default_screens(),
            selected_layer_id: None,
            selected_screen_id: None,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels: the sum of all screen heights, saturating at
    /// `u32::MAX`.
    #[must_use]
    pub fn height(&self) -> u32 {
        sum_heights(&self.screens)
    }

    // ========== Layers ==========

    /// Layers, bottom first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Add a layer on top, or at `index` (clamped to the layer count).
    pub fn add_layer(&mut self, layer: Layer, index: Option<usize>) -> &mut Layer {
        let index = index.map_or(self.layers.len(), |i| i.min(self.layers.len()));
        self.layers.insert(index, layer);
        &mut self.layers[index]
    }

    /// Remove a layer. Clears the selection if it was selected.
    pub fn remove_layer(&mut self, id: &LayerId) -> bool {
        let Some(index) = self.layer_index(id) else {
            return false;
        };
        self.layers.remove(index);
        if self.selected_layer_id.as_ref() == Some(id) {
            self.selected_layer_id = None;
        }
        true
    }

    /// Look up a layer.
    #[must_use]
    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| &layer.id == id)
    }

    /// Look up a layer mutably.
    pub fn layer_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| &layer.id == id)
    }

    /// Z-order index of a layer.
    #[must_use]
    pub fn layer_index(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| &layer.id == id)
    }

    /// Move a layer to `new_index`, clamped into `[0, len - 1]`.
    pub fn move_layer(&mut self, id: &LayerId, new_index: usize) -> bool {
        let Some(index) = self.layer_index(id) else {
            return false;
        };
        let layer = self.layers.remove(index);
        let new_index = new_index.min(self.layers.len());
        self.layers.insert(new_index, layer);
        true
    }

    /// Move a layer one step towards the top.
    pub fn move_layer_up(&mut self, id: &LayerId) -> bool {
        match self.layer_index(id) {
            Some(index) if index + 1 < self.layers.len() => self.move_layer(id, index + 1),
            _ => false,
        }
    }

    /// Move a layer one step towards the bottom.
    pub fn move_layer_down(&mut self, id: &LayerId) -> bool {
        match self.layer_index(id) {
            Some(index) if index > 0 => self.move_layer(id, index - 1),
            _ => false,
        }
    }

    /// Move a layer to the top of the stack.
    pub fn move_layer_to_top(&mut self, id: &LayerId) -> bool {
        self.move_layer(id, self.layers.len())
    }

    /// Move a layer to the bottom of the stack.
    pub fn move_layer_to_bottom(&mut self, id: &LayerId) -> bool {
        self.move_layer(id, 0)
    }

    /// Copy a layer through its serialized form with a fresh id, a "副本"
    /// name suffix and a (+20, +20) offset, and insert it directly above the
    /// original.
    pub fn duplicate_layer(&mut self, id: &LayerId) -> Option<LayerId> {
        let index = self.layer_index(id)?;
        let original = &self.layers[index];

        let mut document = LayerDocument::from(original);
        document.id = LayerId::new().to_string();
        document.name = format!("{} {}", original.name, crate::config::COPY_MARKER);
        document.x = document.x.saturating_add(DUPLICATE_OFFSET);
        document.y = document.y.saturating_add(DUPLICATE_OFFSET);

        let value = match serde_json::to_value(&document) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to serialize layer {id} for duplication: {e}");
                return None;
            }
        };
        let mut copy = schema::layer_from_value(&value);
        copy.share_bitmap_from(original);

        let copy_id = copy.id.clone();
        self.layers.insert(index + 1, copy);
        Some(copy_id)
    }

    /// Select a layer, or clear the selection with `None`.
    ///
    /// Returns `false` (and leaves the selection alone) for unknown ids.
    pub fn select_layer(&mut self, id: Option<&LayerId>) -> bool {
        match id {
            Some(id) if self.layer_index(id).is_none() => false,
            _ => {
                self.selected_layer_id = id.cloned();
                true
            }
        }
    }

    /// Id of the selected layer.
    #[must_use]
    pub fn selected_layer_id(&self) -> Option<&LayerId> {
        self.selected_layer_id.as_ref()
    }

    /// The selected layer.
    #[must_use]
    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selected_layer_id.as_ref().and_then(|id| self.layer(id))
    }

    /// Topmost visible, unlocked layer whose unrotated bounds contain the point.
    #[must_use]
    pub fn hit_test(&self, x: i32, y: i32) -> Option<&Layer> {
        self.layers
            .iter()
            .rev()
            .find(|layer| layer.visible && !layer.locked && layer.contains_point(x, y))
    }

    // ========== Screens ==========

    /// Screens, top first.
    #[must_use]
    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    /// Look up a screen.
    #[must_use]
    pub fn screen(&self, id: &ScreenId) -> Option<&Screen> {
        self.screens.iter().find(|screen| &screen.id == id)
    }

    /// Look up a screen mutably.
    ///
    /// Heights can only be changed through [`Canvas::resize_screen`].
    pub fn screen_mut(&mut self, id: &ScreenId) -> Option<&mut Screen> {
        self.screens.iter_mut().find(|screen| &screen.id == id)
    }

    /// Position of a screen, top first.
    #[must_use]
    pub fn screen_index(&self, id: &ScreenId) -> Option<usize> {
        self.screens.iter().position(|screen| &screen.id == id)
    }

    /// Add a screen at `index` (clamped) or at the bottom, then renumber.
    ///
    /// Without a name, non-blank screens are named "第N屏" where N counts the
    /// existing non-blank screens, and blank screens are named "留白".
    pub fn add_screen(
        &mut self,
        name: Option<&str>,
        height: u32,
        index: Option<usize>,
        is_blank: bool,
    ) -> ScreenId {
        let name = name.map_or_else(
            || {
                let non_blank = self.screens.iter().filter(|s| !s.is_blank).count();
                screen::auto_name(non_blank, is_blank)
            },
            str::to_string,
        );
        let new_screen = Screen::new(name, height, is_blank);
        let id = new_screen.id.clone();

        let index = index.map_or(self.screens.len(), |i| i.min(self.screens.len()));
        self.screens.insert(index, new_screen);
        screen::renumber(&mut self.screens);
        id
    }

    /// Remove a screen and renumber. The last remaining screen cannot be removed.
    pub fn remove_screen(&mut self, id: &ScreenId) -> bool {
        if self.screens.len() <= 1 {
            return false;
        }
        let Some(index) = self.screen_index(id) else {
            return false;
        };
        self.screens.remove(index);
        if self.selected_screen_id.as_ref() == Some(id) {
            self.selected_screen_id = None;
        }
        screen::renumber(&mut self.screens);
        true
    }

    /// Set a screen's height, clamped to the minimum. Does not renumber.
    pub fn resize_screen(&mut self, id: &ScreenId, new_height: u32) -> bool {
        let Some(screen) = self.screen_mut(id) else {
            return false;
        };
        screen.set_height(new_height.max(MIN_SCREEN_HEIGHT));
        true
    }

    /// Insert a default-height screen directly above `id`.
    pub fn insert_screen_above(&mut self, id: &ScreenId, is_blank: bool) -> Option<ScreenId> {
        let index = self.screen_index(id)?;
        Some(self.add_screen(None, DEFAULT_SCREEN_HEIGHT, Some(index), is_blank))
    }

    /// Insert a default-height screen directly below `id`.
    pub fn insert_screen_below(&mut self, id: &ScreenId, is_blank: bool) -> Option<ScreenId> {
        let index = self.screen_index(id)?;
        Some(self.add_screen(None, DEFAULT_SCREEN_HEIGHT, Some(index + 1), is_blank))
    }

    /// Copy a screen (name suffixed "副本") directly below the original.
    pub fn duplicate_screen(&mut self, id: &ScreenId) -> Option<ScreenId> {
        let index = self.screen_index(id)?;
        let source = &self.screens[index];
        let copy = Screen::new(
            format!("{} {}", source.name, crate::config::COPY_MARKER),
            source.height(),
            source.is_blank,
        );
        let copy_id = copy.id.clone();
        self.screens.insert(index + 1, copy);
        screen::renumber(&mut self.screens);
        Some(copy_id)
    }

    /// Rename a screen. The new name is kept verbatim.
    pub fn rename_screen(&mut self, id: &ScreenId, name: impl Into<String>) -> bool {
        let Some(screen) = self.screen_mut(id) else {
            return false;
        };
        screen.name = name.into();
        true
    }

    /// Mark a screen blank or not, then renumber.
    pub fn set_screen_blank(&mut self, id: &ScreenId, is_blank: bool) -> bool {
        let Some(screen) = self.screen_mut(id) else {
            return false;
        };
        screen.is_blank = is_blank;
        screen::renumber(&mut self.screens);
        true
    }

    /// Select a screen, or clear the selection with `None`.
    pub fn select_screen(&mut self, id: Option<&ScreenId>) -> bool {
        match id {
            Some(id) if self.screen_index(id).is_none() => false,
            _ => {
                self.selected_screen_id = id.cloned();
                true
            }
        }
    }

    /// The selected screen.
    #[must_use]
    pub fn selected_screen(&self) -> Option<&Screen> {
        self.selected_screen_id.as_ref().and_then(|id| self.screen(id))
    }

    /// Sum of the heights of all screens above `id`.
    #[must_use]
    pub fn screen_y_offset(&self, id: &ScreenId) -> Option<u32> {
        let index = self.screen_index(id)?;
        Some(sum_heights(&self.screens[..index]))
    }

    /// The screen whose `[offset, offset + height)` range contains `y`.
    #[must_use]
    pub fn screen_at_y(&self, y: i64) -> Option<&Screen> {
        let mut offset = 0_i64;
        for screen in &self.screens {
            let bottom = offset + i64::from(screen.height());
            if (offset..bottom).contains(&y) {
                return Some(screen);
            }
            offset = bottom;
        }
        None
    }

    // ========== Rendering ==========

    /// Composite every visible layer over the background at `scale`.
    ///
    /// Layers that fail to render are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Render`] if the scaled canvas exceeds
    /// [`MAX_RENDER_PIXELS`](crate::config::MAX_RENDER_PIXELS).
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn render(&mut self, scale: f32) -> CanvasResult<RgbaImage> {
        let scale = normalized_scale(scale);
        let scaled = |v: u32| ((v as f32 * scale) as u32).max(1);
        let (width, height) = (scaled(self.width), scaled(self.height()));
        check_bitmap_size(width, height)?;
        let mut target =
            RgbaImage::from_pixel(width, height, parse_hex_color(&self.background_color));

        for layer in self.layers.iter_mut().filter(|layer| layer.visible) {
            let Some(bitmap) = layer.render() else {
                tracing::debug!("Layer {} produced no bitmap, skipping", layer.id);
                continue;
            };
            let x = (layer.x as f32 * scale) as i64;
            let y = (layer.y as f32 * scale) as i64;

            if (scale - 1.0).abs() < f32::EPSILON {
                imageops::overlay(&mut target, &*bitmap, x, y);
            } else {
                let w = (bitmap.width() as f32 * scale) as u32;
                let h = (bitmap.height() as f32 * scale) as u32;
                if w == 0 || h == 0 {
                    tracing::debug!("Layer {} vanishes at scale {scale}, skipping", layer.id);
                    continue;
                }
                imageops::overlay(&mut target, &resize_exact(&bitmap, w, h), x, y);
            }
        }

        Ok(target)
    }

    /// Render the canvas and crop out one screen.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::ScreenNotFound`] for an unknown id, or the
    /// error of [`render`](Self::render).
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn render_screen(&mut self, id: &ScreenId, scale: f32) -> CanvasResult<RgbaImage> {
        let not_found = || CanvasError::ScreenNotFound(id.to_string());
        let offset = self.screen_y_offset(id).ok_or_else(not_found)?;
        let height = self.screen(id).ok_or_else(not_found)?.height();

        let full = self.render(scale)?;
        let scale = normalized_scale(scale);
        let top = ((offset as f32 * scale) as u32).min(full.height().saturating_sub(1));
        let bottom =
            ((offset.saturating_add(height) as f32 * scale) as u32).min(full.height());
        let crop_height = bottom.saturating_sub(top).max(1);

        Ok(imageops::crop_imm(&full, 0, top, full.width(), crop_height).to_image())
    }

    // ========== Serialization ==========

    /// The persisted document record.
    #[must_use]
    pub fn to_document(&self) -> CanvasDocument {
        CanvasDocument::from(self)
    }

    /// Serialize to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_value(&self) -> CanvasResult<Value> {
        Ok(serde_json::to_value(self.to_document())?)
    }

    /// Rebuild a canvas from a JSON value.
    ///
    /// Missing or malformed fields take their defaults; a document without
    /// screens gets the three default screens.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidDocument`] if the value is not an object.
    pub fn from_value(value: &Value) -> CanvasResult<Self> {
        let fields = Fields::new(value);
        if !fields.is_object() {
            return Err(CanvasError::InvalidDocument(
                "document root must be a JSON object".to_string(),
            ));
        }

        let mut canvas = Self::new(schema::canvas_width(&fields));
        canvas.background_color = fields.string_or("background_color", DEFAULT_BACKGROUND);
        canvas.layers = fields
            .array("layers")
            .iter()
            .map(schema::layer_from_value)
            .collect();

        let screens: Vec<Screen> = fields
            .array("screens")
            .iter()
            .map(schema::screen_from_value)
            .collect();
        if screens.is_empty() {
            tracing::info!("Document has no screens, initializing defaults");
        } else {
            canvas.screens = screens;
        }

        canvas.selected_layer_id = fields.string("selected_layer_id").map(LayerId::from_string);
        Ok(canvas)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or not an object.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Write the document to a file as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> CanvasResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        tracing::info!("Saved document to {}", path.display());
        Ok(())
    }

    /// Read a document from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> CanvasResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let canvas = Self::from_json(&json)?;
        tracing::info!(
            "Loaded document {} ({} layers, {} screens)",
            path.display(),
            canvas.layers.len(),
            canvas.screens.len()
        );
        Ok(canvas)
    }

    /// Replace the whole document state with a snapshot, keeping the screen
    /// selection when that screen still exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is not a document object.
    pub(crate) fn restore(&mut self, snapshot: &Value) -> CanvasResult<()> {
        let mut restored = Self::from_value(snapshot)?;
        if let Some(id) = self.selected_screen_id.take() {
            if restored.screen_index(&id).is_some() {
                restored.selected_screen_id = Some(id);
            }
        }
        *self = restored;
        Ok(())
    }

    // ========== Helpers ==========

    /// Add an image layer for a file, named after the file.
    ///
    /// A file that cannot be decoded still produces a layer; it renders
    /// nothing until the path is fixed.
    pub fn add_image_layer(&mut self, path: impl AsRef<Path>, x: i32, y: i32) -> LayerId {
        let path = path.as_ref();
        let mut layer = Layer::image(path.to_string_lossy()).with_position(x, y);
        if let Err(e) = layer.load_image(true) {
            tracing::warn!("Failed to load image {}: {e}", path.display());
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        layer.name = format!("图片: {file_name}");
        self.add_layer(layer, None).id.clone()
    }

    /// Add a text layer sized to its content.
    pub fn add_text_layer(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
        font_size: u32,
        color: &str,
    ) -> LayerId {
        let mut layer = Layer::text(text).with_position(x, y);
        if let Some(content) = layer.text_mut() {
            content.font_size = font_size.max(1);
            content.font_color = color.to_string();
        }
        layer.fit_to_text();
        layer.name = text_layer_name(text);
        self.add_layer(layer, None).id.clone()
    }

    /// Add a shape layer.
    pub fn add_shape_layer(&mut self, kind: ShapeKind, x: i32, y: i32, width: u32, height: u32) -> LayerId {
        let layer = Layer::shape(kind)
            .with_position(x, y)
            .with_size(width, height);
        self.add_layer(layer, None).id.clone()
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_WIDTH)
    }
}

fn sum_heights(screens: &[Screen]) -> u32 {
    screens
        .iter()
        .fold(0_u32, |total, screen| total.saturating_add(screen.height()))
}

fn normalized_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}
