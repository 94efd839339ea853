/// `data:image/...;base64,` conversion
///
/// Upload-mode files are shipped to the backend as data URLs; result images
/// frequently come back the same way.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUrlError {
    /// The bytes are not a recognized image format
    #[error("不支持的文件类型")]
    UnsupportedFormat,
    /// The string is not a base64 image data URL
    #[error("图片格式转换失败")]
    Malformed,
}

/// Whether a string is a data URL (as opposed to a remote URL)
pub fn is_data_url(url: &str) -> bool {
    url.starts_with("data:")
}

/// Encode image bytes as a `data:image/...;base64,` URL.
/// The format is sniffed from the bytes, never trusted from a file name.
pub fn encode(bytes: &[u8]) -> Result<String, DataUrlError> {
    let format = image::guess_format(bytes).map_err(|_| DataUrlError::UnsupportedFormat)?;
    let encoded = STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", format.to_mime_type(), encoded))
}

/// Decode the payload of a base64 image data URL
pub fn decode(url: &str) -> Result<Vec<u8>, DataUrlError> {
    let rest = url.strip_prefix("data:").ok_or(DataUrlError::Malformed)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUrlError::Malformed)?;
    if !header.ends_with(";base64") {
        return Err(DataUrlError::Malformed);
    }
    STANDARD
        .decode(payload.as_bytes())
        .map_err(|_| DataUrlError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn test_encode_sniffs_png_mime() {
        let url = encode(&tiny_png()).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_encode_rejects_non_image_bytes() {
        assert_eq!(
            encode(b"definitely not an image"),
            Err(DataUrlError::UnsupportedFormat)
        );
    }

    #[test]
    fn test_decode_recovers_original_bytes() {
        let bytes = tiny_png();
        let url = encode(&bytes).unwrap();
        assert_eq!(decode(&url).unwrap(), bytes);
    }

    #[test]
    fn test_decode_rejects_malformed_urls() {
        assert_eq!(decode("https://example.com/a.png"), Err(DataUrlError::Malformed));
        assert_eq!(decode("data:image/png,plain"), Err(DataUrlError::Malformed));
        assert_eq!(
            decode("data:image/png;base64,###"),
            Err(DataUrlError::Malformed)
        );
    }

    #[test]
    fn test_is_data_url() {
        assert!(is_data_url("data:image/png;base64,AAAA"));
        assert!(!is_data_url("https://example.com/a.png"));
    }
}
