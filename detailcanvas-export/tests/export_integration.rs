//! Integration tests for platform export (detailcanvas-export).
//!
//! Exercises screen slicing, width capping, file naming, multi-platform
//! output and the background worker against real files on disk.

use detailcanvas_core::{Canvas, ShapeKind};
use detailcanvas_export::{spawn_export, ExportRequest, Exporter};

/// A canvas with one shape spanning the first two default screens.
fn sample_canvas(width: u32) -> Canvas {
    let mut canvas = Canvas::new(width);
    canvas.add_shape_layer(ShapeKind::Rectangle, 20, 300, 200, 200);
    canvas
}

fn dimensions(path: &std::path::Path) -> (u32, u32) {
    image::image_dimensions(path).expect("readable image")
}

#[test]
fn test_screens_are_capped_to_platform_width() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut canvas = sample_canvas(1000);

    let result = Exporter::new(&mut canvas).export_screens(dir.path(), "taobao", None);

    assert!(result.success, "{}", result.message);
    assert_eq!(result.files.len(), 3);
    assert_eq!(result.message, "成功导出 3 张图片");
    assert_eq!(dimensions(&result.files[0]), (790, 316));
    assert_eq!(dimensions(&result.files[1]).0, 790);
}

#[test]
fn test_narrow_canvas_is_not_upscaled() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut canvas = sample_canvas(750);

    let result = Exporter::new(&mut canvas).export_screens(dir.path(), "taobao", Some(80));

    assert!(result.success);
    assert_eq!(dimensions(&result.files[0]), (750, 400));
    assert_eq!(dimensions(&result.files[1]), (750, 350));
}

#[test]
fn test_blank_screens_are_skipped_and_not_counted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut canvas = sample_canvas(750);
    let middle = canvas.screens()[1].id.clone();
    assert!(canvas.set_screen_blank(&middle, true));

    let result = Exporter::new(&mut canvas).export_screens(dir.path(), "jd", None);

    assert!(result.success);
    assert_eq!(result.files.len(), 2);
    let names: Vec<String> = result
        .files
        .iter()
        .map(|p| p.file_name().expect("file name").to_string_lossy().into_owned())
        .collect();
    assert_eq!(names[0], "01_第1屏___首屏.jpg");
    assert!(names[1].starts_with("02_"));
    assert!(names[1].ends_with(".jpg"));
    // The exported second image is the third screen's 350px, not the blank's.
    assert_eq!(dimensions(&result.files[1]), (750, 350));
}

#[test]
fn test_export_creates_missing_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = dir.path().join("a").join("b");
    let mut canvas = sample_canvas(750);

    let result = Exporter::new(&mut canvas).export_screens(&nested, "pdd", None);

    assert!(result.success);
    assert!(nested.is_dir());
    assert!(result.files.iter().all(|f| f.starts_with(&nested) && f.exists()));
}

#[test]
fn test_export_full_appends_extension() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("out").join("detail");
    let mut canvas = sample_canvas(1000);

    let result = Exporter::new(&mut canvas).export_full(&target, "taobao", None);

    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "导出成功");
    assert_eq!(result.files, vec![dir.path().join("out").join("detail.jpg")]);
    assert_eq!(dimensions(&result.files[0]).0, 790);
}

#[test]
fn test_export_full_keeps_existing_extension() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("page.JPG");
    let mut canvas = sample_canvas(750);

    let result = Exporter::new(&mut canvas).export_full(&target, "jd", None);

    assert!(result.success);
    assert_eq!(result.files, vec![target]);
    assert_eq!(dimensions(&result.files[0]), (750, 1100));
}

#[test]
fn test_unwritable_destination_reports_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, b"not a directory").expect("write");
    let mut canvas = sample_canvas(750);

    let result = Exporter::new(&mut canvas).export_screens(&blocker, "taobao", None);

    assert!(!result.success);
    assert!(result.files.is_empty());
    assert!(result.message.starts_with("导出失败: "));
}

#[test]
fn test_oversized_document_reports_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut canvas = Canvas::from_json(
        r#"{"screens":[{"name":"a","height":3000000000},{"name":"b","height":3000000000}]}"#,
    )
    .expect("loads");

    let mut exporter = Exporter::new(&mut canvas);
    let screens = exporter.export_screens(dir.path().join("screens"), "taobao", None);
    let full = exporter.export_full(dir.path().join("full"), "taobao", None);

    for result in [screens, full] {
        assert!(!result.success);
        assert!(result.files.is_empty());
        assert!(result.message.starts_with("导出失败: Render failed"), "{}", result.message);
    }
    assert!(!dir.path().join("full.jpg").exists());
}

#[test]
fn test_export_for_platforms_uses_subdirectories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut canvas = sample_canvas(1000);

    let results =
        Exporter::new(&mut canvas).export_for_platforms(dir.path(), Some(&["taobao", "jd"]), None);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].platform, "taobao");
    assert_eq!(results[1].platform, "jd");
    assert!(results.iter().all(|r| r.result.success));
    assert!(results[0].result.files[0].starts_with(dir.path().join("taobao")));
    assert_eq!(dimensions(&results[1].result.files[0]).0, 750);
}

#[test]
fn test_export_for_all_platforms() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut canvas = sample_canvas(750);

    let results = Exporter::new(&mut canvas).export_for_platforms(dir.path(), None, None);

    let keys: Vec<&str> = results.iter().map(|r| r.platform.as_str()).collect();
    assert_eq!(keys, vec!["taobao", "jd", "pdd"]);
    assert!(dir.path().join("pdd").is_dir());
}

#[test]
fn test_unknown_platform_uses_default_constraints() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut canvas = sample_canvas(1000);

    let result = Exporter::new(&mut canvas).export_screens(dir.path(), "amazon", None);

    assert!(result.success);
    assert_eq!(dimensions(&result.files[0]).0, 790);
}

#[tokio::test]
async fn test_background_export() {
    let dir = tempfile::tempdir().expect("tempdir");
    let canvas = sample_canvas(750);

    let job = spawn_export(
        canvas,
        ExportRequest::Platforms {
            output_dir: dir.path().to_path_buf(),
            platforms: Some(vec!["pdd".to_string()]),
            quality: Some(70),
        },
    );
    while !job.is_finished() {
        tokio::task::yield_now().await;
    }
    let results = job.wait().await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].platform, "pdd");
    assert_eq!(results[0].result.files.len(), 3);
}

#[tokio::test]
async fn test_background_full_export_reports_resolved_platform() {
    let dir = tempfile::tempdir().expect("tempdir");

    let results = spawn_export(
        sample_canvas(750),
        ExportRequest::Full {
            output_path: dir.path().join("full"),
            platform: "unknown".to_string(),
            quality: None,
        },
    )
    .wait()
    .await;

    assert_eq!(results[0].platform, "taobao");
    assert!(results[0].result.success);
    assert!(dir.path().join("full.jpg").exists());
}
