//! Persisted document format.
//!
//! Writing goes through the `*Document` record structs so the JSON shape is
//! fixed in one place. Reading is lenient: every field is looked up
//! individually in a [`serde_json::Value`] and replaced by its default when it
//! is missing or has the wrong type, so a partially damaged document still
//! loads.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::DEFAULT_CANVAS_WIDTH;
use crate::layer::{
    image_content, FontWeight, Layer, LayerId, LayerKind, ShapeContent, ShapeKind, TextAlign,
    TextContent,
};
use crate::screen::{Screen, ScreenId};
use crate::Canvas;

/// Variant fields of a layer record, flattened into the layer object.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LayerVariantDocument {
    /// No variant fields.
    Base {},
    /// Image layer fields.
    Image {
        /// Source file path.
        image_path: String,
    },
    /// Text layer fields.
    Text {
        /// Text content.
        text: String,
        /// Font family.
        font_family: String,
        /// Font size in pixels.
        font_size: u32,
        /// Hex color.
        font_color: String,
        /// "normal" or "bold".
        font_weight: &'static str,
        /// "left", "center" or "right".
        text_align: &'static str,
        /// Line pitch multiplier.
        line_height: f32,
    },
    /// Shape layer fields.
    Shape {
        /// "rectangle", "ellipse" or "line".
        shape_type: &'static str,
        /// Fill hex color.
        fill_color: String,
        /// Stroke hex color.
        stroke_color: String,
        /// Stroke width in pixels.
        stroke_width: u32,
    },
}

/// Serialized layer.
#[derive(Debug, Clone, Serialize)]
pub struct LayerDocument {
    /// Layer identifier.
    pub id: String,
    /// Layer name.
    pub name: String,
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Clockwise rotation in degrees.
    pub rotation: f32,
    /// Opacity.
    pub opacity: f32,
    /// Visibility flag.
    pub visible: bool,
    /// Lock flag.
    pub locked: bool,
    /// Variant discriminant.
    pub layer_type: &'static str,
    /// Variant fields.
    #[serde(flatten)]
    pub variant: LayerVariantDocument,
}

impl From<&Layer> for LayerDocument {
    fn from(layer: &Layer) -> Self {
        let variant = match layer.kind() {
            LayerKind::Base => LayerVariantDocument::Base {},
            LayerKind::Image(content) => LayerVariantDocument::Image {
                image_path: content.path().to_string(),
            },
            LayerKind::Text(content) => LayerVariantDocument::Text {
                text: content.text.clone(),
                font_family: content.font_family.clone(),
                font_size: content.font_size,
                font_color: content.font_color.clone(),
                font_weight: content.font_weight.as_str(),
                text_align: content.text_align.as_str(),
                line_height: content.line_height,
            },
            LayerKind::Shape(content) => LayerVariantDocument::Shape {
                shape_type: content.kind.as_str(),
                fill_color: content.fill_color.clone(),
                stroke_color: content.stroke_color.clone(),
                stroke_width: content.stroke_width,
            },
        };
        Self {
            id: layer.id.to_string(),
            name: layer.name.clone(),
            x: layer.x,
            y: layer.y,
            width: layer.width(),
            height: layer.height(),
            rotation: layer.rotation,
            opacity: layer.opacity,
            visible: layer.visible,
            locked: layer.locked,
            layer_type: layer.layer_type(),
            variant,
        }
    }
}

/// Serialized screen.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenDocument {
    /// Screen identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Height in pixels.
    pub height: u32,
    /// Blank spacer flag.
    pub is_blank: bool,
}

impl From<&Screen> for ScreenDocument {
    fn from(screen: &Screen) -> Self {
        Self {
            id: screen.id.to_string(),
            name: screen.name.clone(),
            height: screen.height(),
            is_blank: screen.is_blank,
        }
    }
}

/// Serialized canvas.
#[derive(Debug, Clone, Serialize)]
pub struct CanvasDocument {
    /// Canvas width.
    pub width: u32,
    /// Canvas height (sum of screen heights).
    pub height: u32,
    /// Background hex color.
    pub background_color: String,
    /// Layers, bottom first.
    pub layers: Vec<LayerDocument>,
    /// Screens, top first.
    pub screens: Vec<ScreenDocument>,
    /// Selected layer, if any.
    pub selected_layer_id: Option<String>,
}

impl From<&Canvas> for CanvasDocument {
    fn from(canvas: &Canvas) -> Self {
        Self {
            width: canvas.width(),
            height: canvas.height(),
            background_color: canvas.background_color.clone(),
            layers: canvas.layers().iter().map(LayerDocument::from).collect(),
            screens: canvas.screens().iter().map(ScreenDocument::from).collect(),
            selected_layer_id: canvas.selected_layer_id().map(ToString::to_string),
        }
    }
}

/// Lenient field access on a JSON object.
pub(crate) struct Fields<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(value: &'a Value) -> Self {
        Self {
            map: value.as_object(),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|map| map.get(key))
    }

    pub(crate) fn string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_str).map(str::to_string)
    }

    pub(crate) fn string_or(&self, key: &str, default: &str) -> String {
        self.string(key).unwrap_or_else(|| default.to_string())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn integer(&self, key: &str) -> Option<i64> {
        let value = self.get(key)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
    }

    pub(crate) fn i32_or(&self, key: &str, default: i32) -> i32 {
        self.integer(key)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(default)
    }

    pub(crate) fn u32_or(&self, key: &str, default: u32) -> u32 {
        self.integer(key)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn f32_or(&self, key: &str, default: f32) -> f32 {
        self.get(key)
            .and_then(Value::as_f64)
            .map_or(default, |v| v as f32)
    }

    pub(crate) fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub(crate) fn array(&self, key: &str) -> &'a [Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    pub(crate) fn is_object(&self) -> bool {
        self.map.is_some()
    }
}

/// Build a layer from its serialized form, dispatching on `layer_type`.
///
/// Unknown discriminants produce a base layer. Image bitmaps are not loaded.
#[must_use]
pub fn layer_from_value(value: &Value) -> Layer {
    let fields = Fields::new(value);
    let layer_type = fields.string_or("layer_type", "base");

    let (kind, default_name, default_height) = match layer_type.as_str() {
        "image" => (
            LayerKind::Image(image_content(fields.string_or("image_path", ""))),
            "图片图层",
            100,
        ),
        "text" => (LayerKind::Text(read_text(&fields)), "文字图层", 50),
        "shape" => (LayerKind::Shape(read_shape(&fields)), "形状图层", 100),
        "base" => (LayerKind::Base, "图层", 100),
        other => {
            tracing::warn!("Unknown layer type {other:?}, loading as base layer");
            (LayerKind::Base, "图层", 100)
        }
    };

    let mut layer = Layer::new(kind);
    if let Some(id) = fields.string("id") {
        layer.id = LayerId::from_string(id);
    }
    layer.name = fields.string_or("name", default_name);
    layer.x = fields.i32_or("x", 0);
    layer.y = fields.i32_or("y", 0);
    layer.set_size(
        fields.u32_or("width", 100),
        fields.u32_or("height", default_height),
    );
    layer.rotation = fields.f32_or("rotation", 0.0);
    layer.opacity = fields.f32_or("opacity", 1.0).clamp(0.0, 1.0);
    layer.visible = fields.bool_or("visible", true);
    layer.locked = fields.bool_or("locked", false);
    layer
}

fn read_text(fields: &Fields<'_>) -> TextContent {
    let defaults = TextContent::default();
    TextContent {
        text: fields.string_or("text", &defaults.text),
        font_family: fields.string_or("font_family", &defaults.font_family),
        font_size: fields.u32_or("font_size", defaults.font_size),
        font_color: fields.string_or("font_color", &defaults.font_color),
        font_weight: fields
            .string("font_weight")
            .and_then(|w| FontWeight::parse(&w))
            .unwrap_or(defaults.font_weight),
        text_align: fields
            .string("text_align")
            .and_then(|a| TextAlign::parse(&a))
            .unwrap_or(defaults.text_align),
        line_height: fields.f32_or("line_height", defaults.line_height),
    }
}

fn read_shape(fields: &Fields<'_>) -> ShapeContent {
    let defaults = ShapeContent::default();
    ShapeContent {
        kind: fields
            .string("shape_type")
            .and_then(|s| ShapeKind::parse(&s))
            .unwrap_or(defaults.kind),
        fill_color: fields.string_or("fill_color", &defaults.fill_color),
        stroke_color: fields.string_or("stroke_color", &defaults.stroke_color),
        stroke_width: fields.u32_or("stroke_width", defaults.stroke_width),
    }
}

/// Build a screen from its serialized form.
#[must_use]
pub fn screen_from_value(value: &Value) -> Screen {
    let fields = Fields::new(value);
    let mut screen = Screen::new(
        fields.string_or("name", "分屏"),
        fields.u32_or("height", 300),
        fields.bool_or("is_blank", false),
    );
    if let Some(id) = fields.string("id") {
        screen.id = ScreenId::from_string(id);
    }
    screen
}

/// Canvas width from a document, defaulting to the standard width.
pub(crate) fn canvas_width(fields: &Fields<'_>) -> u32 {
    fields.u32_or("width", DEFAULT_CANVAS_WIDTH).max(1)
}
