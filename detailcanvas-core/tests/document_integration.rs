//! Document Integration Tests
//!
//! Exercises the document model end to end:
//! - Screen layout and renumbering
//! - Layer duplication and z-order
//! - Editor history round trips
//! - Persisted document round trips
//! - Render cache behaviour through the canvas

use detailcanvas_core::{
    Canvas, CanvasEvent, Editor, EditorConfig, Layer, LayerKind, ShapeKind, ScreenId,
};
use image::Rgba;

/// Build a canvas holding one layer of every variant and a blank screen.
fn populated_canvas() -> Canvas {
    let mut canvas = Canvas::default();
    canvas.add_image_layer("/missing/hero.png", 0, 0);
    canvas.add_text_layer("限时特惠", 40, 40, 36, "#E02020");
    canvas.add_shape_layer(ShapeKind::Rectangle, 0, 400, 750, 350);
    canvas.add_layer(Layer::new(LayerKind::Base), None);
    let last = canvas.screens()[2].id.clone();
    canvas.insert_screen_below(&last, true);
    canvas
}

fn screen_ids(canvas: &Canvas) -> Vec<ScreenId> {
    canvas.screens().iter().map(|s| s.id.clone()).collect()
}

// ============================================================================
// Screens
// ============================================================================

#[test]
fn test_fourth_screen_scenario() {
    let mut canvas = Canvas::default();
    assert_eq!(canvas.width(), 750);
    assert_eq!(canvas.height(), 1100);

    canvas.add_screen(None, 200, None, false);

    let names: Vec<&str> = canvas.screens().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["第1屏 - 首屏", "第2屏 - 产品展示", "第3屏 - 卖点介绍", "第4屏"]
    );
    assert_eq!(canvas.height(), 1300);
}

#[test]
fn test_renamed_screen_is_not_renumbered() {
    let mut canvas = Canvas::default();
    let ids = screen_ids(&canvas);
    canvas.rename_screen(&ids[1], "品牌故事");
    canvas.insert_screen_above(&ids[0], false);

    let names: Vec<&str> = canvas.screens().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["第1屏", "第2屏 - 首屏", "品牌故事", "第3屏 - 卖点介绍"]);
}

#[test]
fn test_minimum_screen_count() {
    let mut canvas = Canvas::default();
    let ids = screen_ids(&canvas);
    canvas.remove_screen(&ids[0]);
    canvas.remove_screen(&ids[1]);

    let before = canvas.screens().to_vec();
    assert!(!canvas.remove_screen(&ids[2]));
    assert_eq!(canvas.screens(), before.as_slice());
}

// ============================================================================
// Layers
// ============================================================================

#[test]
fn test_duplicate_leaves_original_untouched() {
    let mut canvas = Canvas::default();
    let id = canvas.add_text_layer("原价", 100, 200, 24, "#000000");
    let before = canvas.layer(&id).map(|l| (l.name.clone(), l.x, l.y));

    let copy = canvas.duplicate_layer(&id).expect("copy");
    let after = canvas.layer(&id).map(|l| (l.name.clone(), l.x, l.y));
    assert_eq!(before, after);

    let duplicated = canvas.layer(&copy).expect("copy layer");
    assert_ne!(duplicated.id, id);
    assert!(duplicated.name.ends_with("副本"));
    assert_eq!((duplicated.x, duplicated.y), (120, 220));
}

#[test]
fn test_render_reuses_layer_caches() {
    let mut canvas = Canvas::new(200);
    let id = canvas.add_shape_layer(ShapeKind::Ellipse, 10, 10, 50, 50);

    canvas.render(1.0).expect("render");
    canvas.render(1.0).expect("render");
    let stats = canvas.layer(&id).expect("layer").cache_stats();
    assert_eq!(stats.renders, 1);
    assert_eq!(stats.hits, 1);

    canvas.layer_mut(&id).expect("layer").name = "圆形".to_string();
    canvas.render(0.5).expect("render");
    assert_eq!(canvas.layer(&id).expect("layer").cache_stats().renders, 1);

    canvas.layer_mut(&id).expect("layer").set_size(60, 60);
    canvas.render(1.0).expect("render");
    assert_eq!(canvas.layer(&id).expect("layer").cache_stats().renders, 2);
}

#[test]
fn test_image_layer_from_disk_composites() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("swatch.png");
    image::RgbaImage::from_pixel(20, 20, Rgba([0, 128, 255, 255]))
        .save(&path)
        .expect("save");

    let mut canvas = Canvas::new(100);
    let id = canvas.add_image_layer(&path, 30, 30);
    let layer = canvas.layer(&id).expect("layer");
    assert_eq!(layer.name, "图片: swatch.png");
    assert_eq!((layer.width(), layer.height()), (20, 20));

    let image = canvas.render(1.0).expect("render");
    assert_eq!(*image.get_pixel(40, 40), Rgba([0, 128, 255, 255]));
}

// ============================================================================
// History
// ============================================================================

#[test]
fn test_editor_undo_redo_restores_exact_document() {
    let mut editor = Editor::new(&EditorConfig::default()).expect("editor");
    let mut snapshots = vec![editor.canvas().to_value().expect("value")];

    let shape = editor
        .add_shape_layer(ShapeKind::Rectangle, 0, 0, 100, 100)
        .layer_id()
        .cloned()
        .expect("id");
    snapshots.push(editor.canvas().to_value().expect("value"));
    editor.set_layer_rotation(&shape, 30.0);
    snapshots.push(editor.canvas().to_value().expect("value"));
    editor.add_screen(200, true);
    snapshots.push(editor.canvas().to_value().expect("value"));
    editor.duplicate_layer(&shape);
    snapshots.push(editor.canvas().to_value().expect("value"));

    for expected in snapshots.iter().rev().skip(1) {
        assert!(matches!(editor.undo(), Some(CanvasEvent::Restored { .. })));
        assert_eq!(&editor.canvas().to_value().expect("value"), expected);
    }
    assert!(editor.undo().is_none());

    for expected in snapshots.iter().skip(1) {
        assert!(editor.redo().is_some());
        assert_eq!(&editor.canvas().to_value().expect("value"), expected);
    }
    assert!(editor.redo().is_none());
}

#[test]
fn test_history_depth_is_bounded() {
    let config = EditorConfig {
        max_history: 5,
        ..EditorConfig::default()
    };
    let mut editor = Editor::new(&config).expect("editor");
    for i in 0..8 {
        editor.add_shape_layer(ShapeKind::Line, i, 0, 10, 10);
    }
    assert_eq!(editor.history().manager().len(), 5);

    let mut undone = 0;
    while editor.undo().is_some() {
        undone += 1;
    }
    assert_eq!(undone, 4);
    assert_eq!(editor.canvas().layers().len(), 4);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_document_round_trip_is_idempotent() {
    let canvas = populated_canvas();
    let first = canvas.to_value().expect("value");
    let second = Canvas::from_value(&first)
        .expect("load")
        .to_value()
        .expect("value");
    assert_eq!(first, second);

    let layer_types: Vec<&str> = first["layers"]
        .as_array()
        .expect("layers")
        .iter()
        .filter_map(|l| l["layer_type"].as_str())
        .collect();
    assert_eq!(layer_types, vec!["image", "text", "shape", "base"]);
    assert_eq!(first["screens"][3]["is_blank"], true);
}

#[test]
fn test_lenient_document_load() {
    let json = r##"{
        "background_color": "#F5F5F5",
        "layers": [
            { "layer_type": "shape", "shape_type": "ellipse", "x": 10 },
            { "layer_type": "hologram", "name": "future" },
            { "layer_type": "text", "text": "你好", "font_weight": "heavy" }
        ],
        "screens": [ { "name": "第1屏", "height": 500 } ]
    }"##;
    let canvas = Canvas::from_json(json).expect("load");

    assert_eq!(canvas.width(), 750);
    assert_eq!(canvas.height(), 500);
    assert_eq!(canvas.layers().len(), 3);
    assert_eq!(canvas.layers()[1].layer_type(), "base");
    assert_eq!(canvas.layers()[1].name, "future");
    let text = canvas.layers()[2].text_content().expect("text");
    assert_eq!(text.text, "你好");
    assert_eq!(text.font_weight, detailcanvas_core::FontWeight::Normal);
}
