/// Image byte and dimension loading
///
/// Sources are local files, remote URLs or data URLs. Remote loads are
/// guarded by a fixed 10-second timeout.

use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;

use super::data_url;

/// Timeout for image loads that cross the network
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Where an image comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    File(PathBuf),
    Url(String),
}

/// Load the raw bytes of an image source
pub async fn load_bytes(source: ImageSource) -> Result<Vec<u8>, String> {
    match source {
        ImageSource::File(path) => tokio::fs::read(&path)
            .await
            .map_err(|e| format!("图片读取失败: {}", e)),
        ImageSource::Url(url) => load_image_url(&url).await,
    }
}

/// Load image bytes from a URL string, which may be a data URL or remote
pub async fn load_image_url(url: &str) -> Result<Vec<u8>, String> {
    if data_url::is_data_url(url) {
        return data_url::decode(url).map_err(|e| e.to_string());
    }
    fetch_remote(url).await
}

async fn fetch_remote(url: &str) -> Result<Vec<u8>, String> {
    let client = reqwest::Client::builder()
        .timeout(LOAD_TIMEOUT)
        .build()
        .map_err(|e| format!("图片加载失败: {}", e))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("图片加载失败: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("图片加载失败: HTTP {}", response.status()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| format!("图片加载失败: {}", e))?;

    Ok(bytes.to_vec())
}

/// Pixel dimensions of encoded image bytes.
/// Reads only the header, never decodes the full image.
pub fn dimensions_of(bytes: &[u8]) -> Result<(u32, u32), String> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| format!("图片格式识别失败: {}", e))?
        .into_dimensions()
        .map_err(|e| format!("图片尺寸解析失败: {}", e))
}

/// Probe the pixel dimensions of the first selected image
pub async fn probe_dimensions(source: ImageSource) -> Result<(u32, u32), String> {
    let bytes = load_bytes(source).await?;
    dimensions_of(&bytes)
}
