/// Client-side result resizing
///
/// When the backend signals a required resize it has not performed itself,
/// the output image is scaled to the exact target dimensions. The target is
/// authoritative: the original aspect ratio is not preserved.

use std::io::Cursor;

use image::imageops::FilterType;
use image::ImageFormat;

/// Resize encoded image bytes to exactly `width` × `height`, re-encoding
/// losslessly as PNG.
///
/// Returns `Ok(None)` when the image already has the target dimensions, so
/// the caller can keep the original encoding untouched.
pub fn resize_exact_png(bytes: &[u8], width: u32, height: u32) -> Result<Option<Vec<u8>>, String> {
    if width == 0 || height == 0 {
        return Err(format!("目标尺寸无效: {}x{}", width, height));
    }

    let img = image::load_from_memory(bytes).map_err(|e| format!("图片解码失败: {}", e))?;

    if img.width() == width && img.height() == height {
        log::info!("Image is already {}x{}, skipping resize", width, height);
        return Ok(None);
    }

    log::info!(
        "🖼️  Resizing image: {}x{} -> {}x{}",
        img.width(),
        img.height(),
        width,
        height
    );

    let resized = img.resize_exact(width, height, FilterType::Lanczos3);

    let mut out = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| format!("图片编码失败: {}", e))?;

    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::loader::dimensions_of;

    fn png_with_dims(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_resize_hits_exact_target() {
        let bytes = png_with_dims(8, 6);
        let resized = resize_exact_png(&bytes, 4, 3).unwrap().expect("resized");
        assert_eq!(dimensions_of(&resized), Ok((4, 3)));
    }

    #[test]
    fn test_resize_ignores_aspect_ratio() {
        // 8x6 squeezed into a square: target dimensions are authoritative
        let bytes = png_with_dims(8, 6);
        let resized = resize_exact_png(&bytes, 5, 5).unwrap().expect("resized");
        assert_eq!(dimensions_of(&resized), Ok((5, 5)));
    }

    #[test]
    fn test_matching_dimensions_skip_reencode() {
        let bytes = png_with_dims(8, 6);
        assert_eq!(resize_exact_png(&bytes, 8, 6).unwrap(), None);
    }

    #[test]
    fn test_resize_output_is_png() {
        let bytes = png_with_dims(8, 6);
        let resized = resize_exact_png(&bytes, 2, 2).unwrap().expect("resized");
        assert_eq!(image::guess_format(&resized).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_invalid_input_errors() {
        assert!(resize_exact_png(b"garbage", 4, 3).is_err());
        assert!(resize_exact_png(&png_with_dims(8, 6), 0, 3).is_err());
    }
}
