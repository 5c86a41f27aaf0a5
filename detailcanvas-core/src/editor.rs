//! Document controller.
//!
//! The [`Editor`] is the only mutation surface a host needs: it owns the
//! [`Canvas`] and its [`CanvasHistory`], applies each edit, records a
//! labelled snapshot, and reports what changed as a [`CanvasEvent`]. Edits
//! that are rejected (unknown id, locked layer, invariant guard) return
//! `None` and record nothing. Image tools, which hosts drive with ids from
//! outside the document, report an unknown layer as
//! [`CanvasError::LayerNotFound`].

use std::path::Path;

use image::RgbaImage;

use crate::config::EditorConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::event::{CanvasEvent, LayerOrder};
use crate::fonts::FontBook;
use crate::history::CanvasHistory;
use crate::layer::{Layer, LayerId, ShapeKind};
use crate::screen::ScreenId;
use crate::tools::ImageTool;
use crate::Canvas;

/// Owns a document and its undo history.
#[derive(Debug)]
pub struct Editor {
    canvas: Canvas,
    history: CanvasHistory,
}

impl Editor {
    /// Start a new document.
    ///
    /// Font files listed in the config are registered with the process-wide
    /// font book; files that fail to load are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial snapshot cannot be recorded.
    pub fn new(config: &EditorConfig) -> CanvasResult<Self> {
        Self::with_canvas(Canvas::new(config.canvas_width), config)
    }

    /// Edit an existing canvas.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial snapshot cannot be recorded.
    pub fn with_canvas(canvas: Canvas, config: &EditorConfig) -> CanvasResult<Self> {
        for path in &config.font_files {
            if let Err(e) = FontBook::register_global_font(path) {
                tracing::warn!("Failed to register font {}: {e}", path.display());
            }
        }
        let history = CanvasHistory::new(&canvas, config.max_history)?;
        Ok(Self { canvas, history })
    }

    /// Open a document file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>, config: &EditorConfig) -> CanvasResult<Self> {
        Self::with_canvas(Canvas::load(path)?, config)
    }

    /// Save the document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> CanvasResult<()> {
        self.canvas.save(path)
    }

    /// The document.
    #[must_use]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Give up the editor and keep the document.
    #[must_use]
    pub fn into_canvas(self) -> Canvas {
        self.canvas
    }

    /// The undo history.
    #[must_use]
    pub fn history(&self) -> &CanvasHistory {
        &self.history
    }

    /// Render the whole document for preview.
    ///
    /// # Errors
    ///
    /// See [`Canvas::render`].
    pub fn render(&mut self, scale: f32) -> CanvasResult<RgbaImage> {
        self.canvas.render(scale)
    }

    /// Render a single screen for preview.
    ///
    /// # Errors
    ///
    /// See [`Canvas::render_screen`].
    pub fn render_screen(&mut self, id: &ScreenId, scale: f32) -> CanvasResult<RgbaImage> {
        self.canvas.render_screen(id, scale)
    }

    fn record(&mut self, label: &str) {
        if let Err(e) = self.history.save_state(&self.canvas, label) {
            tracing::warn!("Failed to record {label:?}: {e}");
        }
    }

    fn commit(&mut self, label: &str, event: CanvasEvent) -> CanvasEvent {
        self.record(label);
        tracing::debug!("{label}: {event:?}");
        event
    }

    // ========== Layers ==========

    /// Add a layer on top.
    pub fn add_layer(&mut self, layer: Layer) -> CanvasEvent {
        let id = self.canvas.add_layer(layer, None).id.clone();
        self.commit("添加图层", CanvasEvent::LayerAdded { id })
    }

    /// Add an image layer for a file.
    pub fn add_image_layer(&mut self, path: impl AsRef<Path>, x: i32, y: i32) -> CanvasEvent {
        let id = self.canvas.add_image_layer(path, x, y);
        self.commit("添加图片", CanvasEvent::LayerAdded { id })
    }

    /// Add a text layer sized to its content.
    pub fn add_text_layer(&mut self, text: &str, x: i32, y: i32, font_size: u32, color: &str) -> CanvasEvent {
        let id = self.canvas.add_text_layer(text, x, y, font_size, color);
        self.commit("添加文字", CanvasEvent::LayerAdded { id })
    }

    /// Add a shape layer.
    pub fn add_shape_layer(&mut self, kind: ShapeKind, x: i32, y: i32, width: u32, height: u32) -> CanvasEvent {
        let id = self.canvas.add_shape_layer(kind, x, y, width, height);
        self.commit("添加形状", CanvasEvent::LayerAdded { id })
    }

    /// Remove a layer.
    pub fn remove_layer(&mut self, id: &LayerId) -> Option<CanvasEvent> {
        if !self.canvas.remove_layer(id) {
            return None;
        }
        Some(self.commit("删除图层", CanvasEvent::LayerRemoved { id: id.clone() }))
    }

    /// Duplicate a layer directly above itself.
    pub fn duplicate_layer(&mut self, id: &LayerId) -> Option<CanvasEvent> {
        let copy = self.canvas.duplicate_layer(id)?;
        Some(self.commit("复制图层", CanvasEvent::LayerAdded { id: copy }))
    }

    /// Move a layer in the z-order.
    pub fn reorder_layer(&mut self, id: &LayerId, order: LayerOrder) -> Option<CanvasEvent> {
        let from = self.canvas.layer_index(id)?;
        let moved = match order {
            LayerOrder::Up => self.canvas.move_layer_up(id),
            LayerOrder::Down => self.canvas.move_layer_down(id),
            LayerOrder::Top => self.canvas.move_layer_to_top(id),
            LayerOrder::Bottom => self.canvas.move_layer_to_bottom(id),
        };
        let to = self.canvas.layer_index(id)?;
        if !moved || from == to {
            return None;
        }
        Some(self.commit(
            "调整图层顺序",
            CanvasEvent::LayerReordered {
                id: id.clone(),
                from,
                to,
            },
        ))
    }

    /// Apply an arbitrary edit to an unlocked layer.
    pub fn edit_layer<F>(&mut self, id: &LayerId, label: &str, edit: F) -> Option<CanvasEvent>
    where
        F: FnOnce(&mut Layer),
    {
        let layer = self.canvas.layer_mut(id)?;
        if layer.locked {
            tracing::debug!("Layer {id} is locked, ignoring {label:?}");
            return None;
        }
        edit(layer);
        Some(self.commit(label, CanvasEvent::LayerChanged { id: id.clone() }))
    }

    /// Move an unlocked layer by an offset.
    pub fn translate_layer(&mut self, id: &LayerId, dx: i32, dy: i32) -> Option<CanvasEvent> {
        self.edit_layer(id, "移动/调整图层", |layer| layer.translate(dx, dy))
    }

    /// Resize an unlocked layer (clamped to at least 1x1).
    pub fn resize_layer(&mut self, id: &LayerId, width: i64, height: i64) -> Option<CanvasEvent> {
        self.edit_layer(id, "移动/调整图层", |layer| layer.resize(width, height))
    }

    /// Set the rotation of an unlocked layer.
    pub fn set_layer_rotation(&mut self, id: &LayerId, degrees: f32) -> Option<CanvasEvent> {
        self.edit_layer(id, "旋转图层", |layer| layer.rotation = degrees)
    }

    /// Set the opacity of an unlocked layer (clamped to `[0, 1]`).
    pub fn set_layer_opacity(&mut self, id: &LayerId, opacity: f32) -> Option<CanvasEvent> {
        self.edit_layer(id, "调整透明度", |layer| layer.opacity = opacity.clamp(0.0, 1.0))
    }

    /// Replace the content of an unlocked text layer and refit its size.
    pub fn set_layer_text(&mut self, id: &LayerId, text: &str) -> Option<CanvasEvent> {
        if self.canvas.layer(id)?.text_content().is_none() {
            return None;
        }
        self.edit_layer(id, "编辑文字", |layer| {
            if let Some(content) = layer.text_mut() {
                content.text = text.to_string();
            }
            layer.fit_to_text();
        })
    }

    /// Show or hide a layer. Allowed on locked layers.
    pub fn set_layer_visible(&mut self, id: &LayerId, visible: bool) -> Option<CanvasEvent> {
        let layer = self.canvas.layer_mut(id)?;
        if layer.visible == visible {
            return None;
        }
        layer.visible = visible;
        Some(self.commit("显示/隐藏图层", CanvasEvent::LayerChanged { id: id.clone() }))
    }

    /// Lock or unlock a layer.
    pub fn set_layer_locked(&mut self, id: &LayerId, locked: bool) -> Option<CanvasEvent> {
        let layer = self.canvas.layer_mut(id)?;
        if layer.locked == locked {
            return None;
        }
        layer.locked = locked;
        Some(self.commit("锁定/解锁图层", CanvasEvent::LayerChanged { id: id.clone() }))
    }

    /// Change the layer selection. Selection is not recorded in history.
    pub fn select_layer(&mut self, id: Option<&LayerId>) -> Option<CanvasEvent> {
        if !self.canvas.select_layer(id) {
            return None;
        }
        Some(CanvasEvent::SelectionChanged { id: id.cloned() })
    }

    /// Select the topmost hittable layer under a point, or clear the
    /// selection when there is none.
    pub fn select_at(&mut self, x: i32, y: i32) -> CanvasEvent {
        let id = self.canvas.hit_test(x, y).map(|layer| layer.id.clone());
        self.canvas.select_layer(id.as_ref());
        CanvasEvent::SelectionChanged { id }
    }

    /// Run an image tool on an unlocked image layer.
    ///
    /// The layer keeps its box; the tool output is scaled into it on render.
    /// Locked layers, layers without a bitmap and tool failures leave the
    /// layer untouched, record nothing and yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::LayerNotFound`] if no layer has this id.
    pub fn apply_image_tool(
        &mut self,
        id: &LayerId,
        tool: &dyn ImageTool,
    ) -> CanvasResult<Option<CanvasEvent>> {
        let layer = self
            .canvas
            .layer_mut(id)
            .ok_or_else(|| CanvasError::LayerNotFound(id.to_string()))?;
        if layer.locked {
            return Ok(None);
        }
        let Some(source) = layer.loaded_image() else {
            return Ok(None);
        };
        let Some(output) = tool.apply(&source) else {
            tracing::warn!("Image tool {:?} failed on layer {id}", tool.name());
            return Ok(None);
        };

        let (width, height) = (layer.width(), layer.height());
        layer.set_image(output, false);
        layer.set_size(width, height);
        let label = tool.name().to_string();
        Ok(Some(self.commit(&label, CanvasEvent::LayerChanged { id: id.clone() })))
    }

    // ========== Screens ==========

    /// Append an auto-named screen.
    pub fn add_screen(&mut self, height: u32, is_blank: bool) -> CanvasEvent {
        let id = self.canvas.add_screen(None, height, None, is_blank);
        self.commit("添加分屏", CanvasEvent::ScreenAdded { id })
    }

    /// Insert a screen directly above another.
    pub fn insert_screen_above(&mut self, id: &ScreenId, is_blank: bool) -> Option<CanvasEvent> {
        let new_id = self.canvas.insert_screen_above(id, is_blank)?;
        Some(self.commit("插入分屏", CanvasEvent::ScreenAdded { id: new_id }))
    }

    /// Insert a screen directly below another.
    pub fn insert_screen_below(&mut self, id: &ScreenId, is_blank: bool) -> Option<CanvasEvent> {
        let new_id = self.canvas.insert_screen_below(id, is_blank)?;
        Some(self.commit("插入分屏", CanvasEvent::ScreenAdded { id: new_id }))
    }

    /// Duplicate a screen directly below itself.
    pub fn duplicate_screen(&mut self, id: &ScreenId) -> Option<CanvasEvent> {
        let new_id = self.canvas.duplicate_screen(id)?;
        Some(self.commit("复制分屏", CanvasEvent::ScreenAdded { id: new_id }))
    }

    /// Remove a screen. The last screen cannot be removed.
    pub fn remove_screen(&mut self, id: &ScreenId) -> Option<CanvasEvent> {
        if !self.canvas.remove_screen(id) {
            return None;
        }
        Some(self.commit("删除分屏", CanvasEvent::ScreenRemoved { id: id.clone() }))
    }

    /// Resize a screen (clamped to the minimum height).
    pub fn resize_screen(&mut self, id: &ScreenId, height: u32) -> Option<CanvasEvent> {
        if !self.canvas.resize_screen(id, height) {
            return None;
        }
        Some(self.commit("调整分屏高度", CanvasEvent::ScreenChanged { id: id.clone() }))
    }

    /// Rename a screen.
    pub fn rename_screen(&mut self, id: &ScreenId, name: &str) -> Option<CanvasEvent> {
        if !self.canvas.rename_screen(id, name) {
            return None;
        }
        Some(self.commit("重命名分屏", CanvasEvent::ScreenChanged { id: id.clone() }))
    }

    /// Mark a screen blank or not.
    pub fn set_screen_blank(&mut self, id: &ScreenId, is_blank: bool) -> Option<CanvasEvent> {
        if !self.canvas.set_screen_blank(id, is_blank) {
            return None;
        }
        Some(self.commit("设置留白", CanvasEvent::ScreenChanged { id: id.clone() }))
    }

    /// Select a screen. Not recorded in history.
    pub fn select_screen(&mut self, id: Option<&ScreenId>) -> bool {
        self.canvas.select_screen(id)
    }

    /// Change the background color.
    pub fn set_background(&mut self, color: &str) -> CanvasEvent {
        self.canvas.background_color = color.to_string();
        self.commit(
            "背景颜色",
            CanvasEvent::BackgroundChanged {
                color: color.to_string(),
            },
        )
    }

    // ========== History ==========

    /// Revert the last recorded action.
    pub fn undo(&mut self) -> Option<CanvasEvent> {
        let label = self.history.undo_label()?.to_string();
        self.history
            .undo(&mut self.canvas)
            .then_some(CanvasEvent::Restored { label })
    }

    /// Reapply the last undone action.
    pub fn redo(&mut self) -> Option<CanvasEvent> {
        let label = self.history.redo_label()?.to_string();
        self.history
            .redo(&mut self.canvas)
            .then_some(CanvasEvent::Restored { label })
    }

    /// Whether an undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether a redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FnTool;
    use image::Rgba;

    fn editor() -> Editor {
        Editor::new(&EditorConfig::default()).expect("editor")
    }

    fn added_id(event: &CanvasEvent) -> LayerId {
        event.layer_id().cloned().expect("layer id")
    }

    #[test]
    fn test_mutations_are_recorded() {
        let mut editor = editor();
        assert!(!editor.can_undo());

        let id = added_id(&editor.add_shape_layer(ShapeKind::Rectangle, 0, 0, 10, 10));
        editor.translate_layer(&id, 5, 5).expect("moved");

        assert_eq!(editor.history().undo_label(), Some("移动/调整图层"));
        assert_eq!(
            editor.undo(),
            Some(CanvasEvent::Restored {
                label: "移动/调整图层".to_string()
            })
        );
        assert_eq!(editor.canvas().layer(&id).map(|l| l.x), Some(0));
        assert_eq!(editor.history().redo_label(), Some("移动/调整图层"));
    }

    #[test]
    fn test_locked_layer_rejects_edits() {
        let mut editor = editor();
        let id = added_id(&editor.add_shape_layer(ShapeKind::Rectangle, 0, 0, 10, 10));
        editor.set_layer_locked(&id, true).expect("locked");
        let recorded = editor.history().manager().len();

        assert!(editor.translate_layer(&id, 1, 1).is_none());
        assert!(editor.resize_layer(&id, 50, 50).is_none());
        assert!(editor.set_layer_opacity(&id, 0.5).is_none());
        assert_eq!(editor.history().manager().len(), recorded);

        assert!(editor.set_layer_visible(&id, false).is_some());
    }

    #[test]
    fn test_rejected_operations_record_nothing() {
        let mut editor = editor();
        let unknown = LayerId::new();
        assert!(editor.remove_layer(&unknown).is_none());
        assert!(editor.duplicate_layer(&unknown).is_none());

        let only = editor.canvas().screens()[0].id.clone();
        let others: Vec<ScreenId> = editor.canvas().screens()[1..].iter().map(|s| s.id.clone()).collect();
        for id in &others {
            editor.remove_screen(id).expect("removed");
        }
        assert!(editor.remove_screen(&only).is_none());
        assert_eq!(editor.history().manager().len(), 3);
    }

    #[test]
    fn test_reorder_reports_indices() {
        let mut editor = editor();
        let a = added_id(&editor.add_shape_layer(ShapeKind::Rectangle, 0, 0, 10, 10));
        editor.add_shape_layer(ShapeKind::Ellipse, 0, 0, 10, 10);

        assert_eq!(
            editor.reorder_layer(&a, LayerOrder::Top),
            Some(CanvasEvent::LayerReordered {
                id: a.clone(),
                from: 0,
                to: 1
            })
        );
        assert!(editor.reorder_layer(&a, LayerOrder::Up).is_none());
    }

    #[test]
    fn test_select_at() {
        let mut editor = editor();
        let id = added_id(&editor.add_shape_layer(ShapeKind::Rectangle, 0, 0, 10, 10));
        assert_eq!(editor.select_at(5, 5), CanvasEvent::SelectionChanged { id: Some(id.clone()) });
        assert_eq!(editor.canvas().selected_layer_id(), Some(&id));
        assert_eq!(editor.select_at(500, 5), CanvasEvent::SelectionChanged { id: None });
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_apply_image_tool() {
        let mut editor = editor();
        let mut layer = Layer::image("");
        layer.set_image(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])), true);
        let id = added_id(&editor.add_layer(layer));

        let to_blue = FnTool::new("图片增强", |input: &RgbaImage| {
            Some(RgbaImage::from_pixel(input.width() * 2, input.height() * 2, Rgba([0, 0, 255, 255])))
        });
        editor
            .apply_image_tool(&id, &to_blue)
            .expect("known layer")
            .expect("applied");
        assert_eq!(editor.history().undo_label(), Some("图片增强"));

        let layer = editor.canvas().layer(&id).expect("layer");
        assert_eq!((layer.width(), layer.height()), (4, 4));
        let bitmap = layer.image_content().and_then(|c| c.bitmap()).expect("bitmap");
        assert_eq!(bitmap.dimensions(), (8, 8));
    }

    #[test]
    fn test_failed_image_tool_is_a_no_op() {
        let mut editor = editor();
        let mut layer = Layer::image("");
        layer.set_image(RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])), true);
        let id = added_id(&editor.add_layer(layer));
        let recorded = editor.history().manager().len();

        let failing = FnTool::new("智能抠图", |_: &RgbaImage| None);
        assert!(editor.apply_image_tool(&id, &failing).expect("known layer").is_none());
        assert_eq!(editor.history().manager().len(), recorded);

        let bitmap = editor
            .canvas()
            .layer(&id)
            .and_then(Layer::image_content)
            .and_then(|c| c.bitmap())
            .expect("bitmap");
        assert_eq!(*bitmap.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_image_tool_rejects_non_image_layers() {
        let mut editor = editor();
        let id = added_id(&editor.add_shape_layer(ShapeKind::Rectangle, 0, 0, 10, 10));
        let identity = FnTool::new("noop", |input: &RgbaImage| Some(input.clone()));
        assert!(editor.apply_image_tool(&id, &identity).expect("known layer").is_none());
    }

    #[test]
    fn test_image_tool_reports_unknown_layer() {
        let mut editor = editor();
        let identity = FnTool::new("noop", |input: &RgbaImage| Some(input.clone()));
        let missing = LayerId::new();
        assert!(matches!(
            editor.apply_image_tool(&missing, &identity),
            Err(CanvasError::LayerNotFound(id)) if id == missing.to_string()
        ));
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_screen_operations() {
        let mut editor = editor();
        let first = editor.canvas().screens()[0].id.clone();

        let added = editor.add_screen(200, false);
        let added_id = added.screen_id().cloned().expect("screen id");
        assert_eq!(editor.canvas().height(), 1300);
        assert_eq!(editor.canvas().screen(&added_id).map(|s| s.name.as_str()), Some("第4屏"));

        editor.resize_screen(&first, 10).expect("resized");
        assert_eq!(editor.canvas().height(), 950);
        editor.undo().expect("undo");
        assert_eq!(editor.canvas().height(), 1300);
    }

    #[test]
    fn test_set_background() {
        let mut editor = editor();
        editor.set_background("#000000");
        assert_eq!(editor.canvas().background_color, "#000000");
        editor.undo();
        assert_eq!(editor.canvas().background_color, "#FFFFFF");
    }
}
