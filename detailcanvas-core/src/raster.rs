//! Raster helpers shared by every layer variant.
//!
//! Bitmaps are straight-alpha [`RgbaImage`]s. tiny-skia works in
//! premultiplied alpha, so the conversions here are the only place the two
//! representations meet.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tiny_skia::{ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::config::MAX_RENDER_PIXELS;
use crate::error::{CanvasError, CanvasResult};

/// Opaque black, used when a color string cannot be parsed.
pub const FALLBACK_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Parse a `#RRGGBB` or `#RRGGBBAA` color string.
///
/// Returns `None` for any other length or for non-hex digits.
#[must_use]
pub fn try_parse_hex_color(hex: &str) -> Option<Rgba<u8>> {
    let digits = hex.trim().trim_start_matches('#');
    if !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| -> Option<u8> { u8::from_str_radix(digits.get(i..i + 2)?, 16).ok() };
    match digits.len() {
        6 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255])),
        8 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
        _ => None,
    }
}

/// Parse a hex color, falling back to opaque black.
#[must_use]
pub fn parse_hex_color(hex: &str) -> Rgba<u8> {
    try_parse_hex_color(hex).unwrap_or_else(|| {
        tracing::debug!("Unparseable color {hex:?}, using black");
        FALLBACK_COLOR
    })
}

/// Refuse bitmaps larger than [`MAX_RENDER_PIXELS`].
///
/// # Errors
///
/// Returns [`CanvasError::Render`] when `width * height` exceeds the limit.
pub fn check_bitmap_size(width: u32, height: u32) -> CanvasResult<()> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_RENDER_PIXELS {
        return Err(CanvasError::Render(format!(
            "{width}x{height} bitmap exceeds the {MAX_RENDER_PIXELS} pixel limit"
        )));
    }
    Ok(())
}

/// Resize to exactly `width` x `height` with Lanczos3 resampling.
#[must_use]
pub fn resize_exact(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    imageops::resize(image, width.max(1), height.max(1), FilterType::Lanczos3)
}

/// Downscale to fit within `max_width` x `max_height`, preserving aspect ratio.
///
/// Images already inside the bounds are returned unchanged.
#[must_use]
pub fn fit_within(image: RgbaImage, max_width: u32, max_height: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width <= max_width && height <= max_height {
        return image;
    }

    let ratio = (f64::from(max_width) / f64::from(width))
        .min(f64::from(max_height) / f64::from(height));

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_width = (f64::from(width) * ratio) as u32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let new_height = (f64::from(height) * ratio) as u32;

    resize_exact(&image, new_width, new_height)
}

/// Rotate clockwise by `degrees`, growing the bitmap so no corner is clipped.
///
/// Uses bicubic sampling. Uncovered areas of the expanded bitmap are
/// transparent.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn rotate_expand(image: &RgbaImage, degrees: f32) -> RgbaImage {
    if degrees % 360.0 == 0.0 {
        return image.clone();
    }

    let (width, height) = (image.width() as f32, image.height() as f32);
    let radians = degrees.to_radians();
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    // The epsilon keeps exact right angles from rounding up a pixel.
    let new_width = (width.mul_add(cos, height * sin) - 1e-3).ceil().max(1.0) as u32;
    let new_height = (width.mul_add(sin, height * cos) - 1e-3).ceil().max(1.0) as u32;

    let Some(source) = image_to_pixmap(image) else {
        return image.clone();
    };
    let Some(mut target) = Pixmap::new(new_width, new_height) else {
        tracing::warn!("Cannot allocate {new_width}x{new_height} rotation target");
        return image.clone();
    };

    let transform = Transform::from_translate(-width / 2.0, -height / 2.0)
        .post_rotate(degrees)
        .post_translate(new_width as f32 / 2.0, new_height as f32 / 2.0);
    let paint = PixmapPaint {
        quality: FilterQuality::Bicubic,
        ..PixmapPaint::default()
    };
    target.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);

    pixmap_to_image(&target)
}

/// Multiply every pixel's alpha by `opacity`. No-op at full opacity.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn apply_opacity(image: &mut RgbaImage, opacity: f32) {
    if opacity >= 1.0 {
        return;
    }
    let factor = opacity.clamp(0.0, 1.0);
    for pixel in image.pixels_mut() {
        pixel.0[3] = (f32::from(pixel.0[3]) * factor) as u8;
    }
}

/// Apply the rotation and opacity shared by all layer variants, in that order.
#[must_use]
pub fn finish_layer_bitmap(image: RgbaImage, rotation: f32, opacity: f32) -> RgbaImage {
    let mut image = if rotation == 0.0 {
        image
    } else {
        rotate_expand(&image, rotation)
    };
    apply_opacity(&mut image, opacity);
    image
}

/// Convert a premultiplied tiny-skia pixmap into a straight-alpha bitmap.
pub(crate) fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    image
}

/// Convert a straight-alpha bitmap into a premultiplied tiny-skia pixmap.
pub(crate) fn image_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}
