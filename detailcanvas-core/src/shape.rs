//! Vector shape rasterization with tiny-skia.

use image::{Rgba, RgbaImage};
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform};

use crate::layer::ShapeKind;
use crate::raster::pixmap_to_image;

/// Stroke width used for lines whose stroke width is zero.
const DEFAULT_LINE_WIDTH: u32 = 2;

fn paint(color: Rgba<u8>) -> Paint<'static> {
    let [r, g, b, a] = color.0;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn outline(kind: ShapeKind, rect: Rect) -> Option<Path> {
    match kind {
        ShapeKind::Ellipse => PathBuilder::from_oval(rect),
        ShapeKind::Rectangle | ShapeKind::Line => Some(PathBuilder::from_rect(rect)),
    }
}

/// Draw a shape onto a transparent `width` x `height` bitmap.
///
/// Rectangles and ellipses are filled with `fill` and outlined with `stroke`
/// (when given and `stroke_width > 0`); the outline sits inside the box. Lines
/// run horizontally through the vertical center, using the stroke color and
/// width, or the fill color and a 2px width when there is no stroke.
///
/// Returns `None` if the pixmap cannot be allocated.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn draw_shape(
    kind: ShapeKind,
    width: u32,
    height: u32,
    fill: Rgba<u8>,
    stroke: Option<Rgba<u8>>,
    stroke_width: u32,
) -> Option<RgbaImage> {
    let mut pixmap = Pixmap::new(width.max(1), height.max(1))?;
    let (w, h) = (pixmap.width() as f32, pixmap.height() as f32);
    let stroke = stroke.filter(|_| stroke_width > 0);

    match kind {
        ShapeKind::Rectangle | ShapeKind::Ellipse => {
            let bounds = Rect::from_xywh(0.0, 0.0, w, h)?;
            if let Some(path) = outline(kind, bounds) {
                pixmap.fill_path(&path, &paint(fill), FillRule::Winding, Transform::identity(), None);
            }

            if let Some(stroke_color) = stroke {
                let sw = stroke_width as f32;
                let inset = Rect::from_xywh(sw / 2.0, sw / 2.0, w - sw, h - sw);
                match inset.and_then(|rect| outline(kind, rect)) {
                    Some(path) => {
                        let stroke_style = Stroke {
                            width: sw,
                            ..Stroke::default()
                        };
                        pixmap.stroke_path(
                            &path,
                            &paint(stroke_color),
                            &stroke_style,
                            Transform::identity(),
                            None,
                        );
                    }
                    // Stroke wider than the shape: the outline covers it all.
                    None => {
                        if let Some(path) = outline(kind, bounds) {
                            pixmap.fill_path(
                                &path,
                                &paint(stroke_color),
                                FillRule::Winding,
                                Transform::identity(),
                                None,
                            );
                        }
                    }
                }
            }
        }
        ShapeKind::Line => {
            let (color, line_width) = match stroke {
                Some(color) => (color, stroke_width),
                None => (fill, DEFAULT_LINE_WIDTH),
            };
            let y = (height / 2) as f32;
            let mut builder = PathBuilder::new();
            builder.move_to(0.0, y);
            builder.line_to(w, y);
            let path = builder.finish()?;
            let stroke_style = Stroke {
                width: line_width as f32,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &paint(color), &stroke_style, Transform::identity(), None);
        }
    }

    Some(pixmap_to_image(&pixmap))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn test_rectangle_fill_and_outline() {
        let image = draw_shape(ShapeKind::Rectangle, 20, 10, RED, Some(BLUE), 2).expect("shape");
        assert_eq!(image.dimensions(), (20, 10));
        assert_eq!(*image.get_pixel(10, 5), RED);
        assert_eq!(*image.get_pixel(0, 5), BLUE);
    }

    #[test]
    fn test_zero_stroke_has_no_outline() {
        let image = draw_shape(ShapeKind::Rectangle, 10, 10, RED, Some(BLUE), 0).expect("shape");
        assert_eq!(*image.get_pixel(0, 5), RED);
    }

    #[test]
    fn test_ellipse_leaves_corners_transparent() {
        let image = draw_shape(ShapeKind::Ellipse, 40, 40, RED, None, 0).expect("shape");
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(*image.get_pixel(20, 20), RED);
    }

    #[test]
    fn test_line_uses_fill_when_unstroked() {
        let image = draw_shape(ShapeKind::Line, 30, 10, RED, Some(BLUE), 0).expect("shape");
        assert_eq!(*image.get_pixel(15, 5), RED);
        assert_eq!(image.get_pixel(15, 0).0[3], 0);
    }

    #[test]
    fn test_line_uses_stroke_color() {
        let image = draw_shape(ShapeKind::Line, 30, 10, RED, Some(BLUE), 4).expect("shape");
        assert_eq!(*image.get_pixel(15, 5), BLUE);
    }
}
