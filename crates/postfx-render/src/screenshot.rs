//! Saving captured frames to image files.

use std::path::Path;

use image::{ImageBuffer, Rgba};
use postfx_core::ComposerError;

/// Options for saving captured frames.
#[derive(Debug, Clone, Default)]
pub struct ScreenshotOptions {
    /// Keep the alpha channel of the frame (PNG only). Otherwise alpha is forced opaque.
    pub transparent_background: bool,
}

/// Saves tightly packed RGBA8 pixel data to an image file.
///
/// The format follows the extension: `.png`, `.jpg` or `.jpeg`.
///
/// # Errors
/// Returns an error if the file cannot be written or the format is unsupported.
pub fn save_image(
    path: impl AsRef<Path>,
    data: &[u8],
    width: u32,
    height: u32,
    options: &ScreenshotOptions,
) -> Result<(), ScreenshotError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img = to_image(data, width, height, options)?;

    match extension.as_str() {
        "png" => {
            img.save_with_format(path, image::ImageFormat::Png)?;
        }
        "jpg" | "jpeg" => {
            // JPEG has no alpha
            let rgb_img = image::DynamicImage::ImageRgba8(img).to_rgb8();
            rgb_img.save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => {
            return Err(ScreenshotError::UnsupportedFormat(extension));
        }
    }

    log::info!("saved {width}x{height} frame to {}", path.display());
    Ok(())
}

/// Encodes tightly packed RGBA8 pixel data as PNG in memory.
pub fn save_to_buffer(
    data: &[u8],
    width: u32,
    height: u32,
    options: &ScreenshotOptions,
) -> Result<Vec<u8>, ScreenshotError> {
    let img = to_image(data, width, height, options)?;
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

fn to_image(
    data: &[u8],
    width: u32,
    height: u32,
    options: &ScreenshotOptions,
) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>, ScreenshotError> {
    let mut rgba_data = data.to_vec();
    if !options.transparent_background {
        for chunk in rgba_data.chunks_exact_mut(4) {
            chunk[3] = u8::MAX;
        }
    }
    // wgpu uses a top-left origin, no vertical flip needed
    ImageBuffer::from_raw(width, height, rgba_data).ok_or(ScreenshotError::InvalidImageData)
}

/// Error type for screenshot operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to save image: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image data")]
    InvalidImageData,
}

impl From<ScreenshotError> for ComposerError {
    fn from(err: ScreenshotError) -> Self {
        ComposerError::Render(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| if i % 2 == 0 { [255, 0, 0, 0] } else { [0, 0, 255, 128] })
            .collect()
    }

    #[test]
    fn test_screenshot_options_default() {
        let opts = ScreenshotOptions::default();
        assert!(!opts.transparent_background);
    }

    #[test]
    fn test_save_to_buffer_is_png() {
        let png = save_to_buffer(&checker(4, 4), 4, 4, &ScreenshotOptions::default()).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_transparent_background_keeps_alpha() {
        let options = ScreenshotOptions {
            transparent_background: true,
        };
        let png = save_to_buffer(&checker(2, 1), 2, 1, &options).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 0, 255, 128]);
    }

    #[test]
    fn test_short_data_is_rejected() {
        let result = save_to_buffer(&[0; 8], 4, 4, &ScreenshotOptions::default());
        assert!(matches!(result, Err(ScreenshotError::InvalidImageData)));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = std::env::temp_dir().join("postfx_screenshot_test.bmpx");
        let result = save_image(&path, &checker(2, 2), 2, 2, &ScreenshotOptions::default());
        assert!(matches!(result, Err(ScreenshotError::UnsupportedFormat(ext)) if ext == "bmpx"));
    }

    #[test]
    fn test_save_png_file() {
        let path = std::env::temp_dir().join(format!("postfx_screenshot_{}.png", std::process::id()));
        save_image(&path, &checker(3, 2), 3, 2, &ScreenshotOptions::default()).unwrap();
        let loaded = image::open(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (3, 2));
        let _ = std::fs::remove_file(&path);
    }
}
