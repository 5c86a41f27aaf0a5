//! Output sizing and encoding.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::error::ExportError;
use crate::platform::OutputFormat;

/// Background JPEG output is flattened onto.
const FLATTEN_BACKGROUND: [u8; 3] = [255, 255, 255];

/// Downscale to `max_width`, preserving aspect ratio. Never upscales.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn cap_width(image: RgbaImage, max_width: u32) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width <= max_width || max_width == 0 {
        return image;
    }
    let ratio = f64::from(max_width) / f64::from(width);
    let new_height = ((f64::from(height) * ratio) as u32).max(1);
    imageops::resize(&image, max_width, new_height, FilterType::Lanczos3)
}

/// Output file name for a screen: `{sequence:02}_{name}.{ext}`, with spaces,
/// slashes and hyphens in the name replaced by underscores.
#[must_use]
pub fn screen_file_name(sequence: usize, screen_name: &str, format: OutputFormat) -> String {
    let safe_name: String = screen_name
        .chars()
        .map(|c| if matches!(c, ' ' | '/' | '-') { '_' } else { c })
        .collect();
    format!("{sequence:02}_{safe_name}.{}", format.extension())
}

/// Flatten straight alpha onto the white background, dropping the alpha
/// channel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn flatten_rgb(image: &RgbaImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(image.as_raw().len() / 4 * 3);
    for pixel in image.pixels() {
        let alpha = f32::from(pixel.0[3]) / 255.0;
        let inv = 1.0 - alpha;
        for (channel, background) in pixel.0[..3].iter().zip(FLATTEN_BACKGROUND) {
            rgb.push(f32::from(*channel).mul_add(alpha, f32::from(background) * inv).round() as u8);
        }
    }
    rgb
}

/// Encode `image` into `path` in the given format.
///
/// # Errors
///
/// Returns an error if the file cannot be created or encoding fails.
pub fn write_image(
    image: &RgbaImage,
    path: &Path,
    format: OutputFormat,
    quality: u8,
) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let (width, height) = image.dimensions();
    match format {
        OutputFormat::Jpeg => {
            let rgb = flatten_rgb(image);
            JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100)).write_image(
                &rgb,
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut writer).write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)?;
        }
    }
    writer.flush()?;
    tracing::debug!("Wrote {width}x{height} {} to {}", format.extension(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_cap_width_downscales() {
        let image = RgbaImage::new(1000, 400);
        let capped = cap_width(image, 790);
        assert_eq!(capped.dimensions(), (790, 316));
    }

    #[test]
    fn test_cap_width_never_upscales() {
        let image = RgbaImage::new(600, 400);
        assert_eq!(cap_width(image, 790).dimensions(), (600, 400));
    }

    #[test]
    fn test_screen_file_name() {
        assert_eq!(
            screen_file_name(1, "第1屏 - 首屏", OutputFormat::Jpeg),
            "01_第1屏___首屏.jpg"
        );
        assert_eq!(screen_file_name(12, "a/b", OutputFormat::Png), "12_a_b.png");
    }

    #[test]
    fn test_flatten_rgb() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([0, 0, 0, 0]));
        assert_eq!(flatten_rgb(&image), vec![255, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_write_png_and_jpeg() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 255]));

        let png = dir.path().join("out.png");
        write_image(&image, &png, OutputFormat::Png, 95).expect("png");
        assert_eq!(image::image_dimensions(&png).expect("dims"), (8, 4));

        let jpg = dir.path().join("out.jpg");
        write_image(&image, &jpg, OutputFormat::Jpeg, 90).expect("jpeg");
        let bytes = std::fs::read(&jpg).expect("read");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
