/// Image download manager
///
/// Two source types: embedded data URLs are decoded directly, remote URLs
/// are fetched over the network with one retry after a fixed delay. The
/// download button runs a small state machine with timed visual resets.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::media::data_url;
use crate::media::loader::LOAD_TIMEOUT;

/// Delay before the single retry of a failed network download
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// How long the "下载完成" state stays visible before reverting to idle
pub const SUCCESS_RESET_DELAY: Duration = Duration::from_millis(1500);

/// Download button state machine: idle → downloading → success → idle.
/// Failures revert straight to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadState {
    #[default]
    Idle,
    Downloading,
    Success,
}

/// Build the suggested save filename.
/// Dimensions are embedded only when resize metadata is available.
pub fn suggested_filename(
    prefix: &str,
    dimensions: Option<(u32, u32)>,
    stamp: DateTime<Local>,
) -> String {
    match dimensions {
        Some((width, height)) => {
            format!("{}-{}x{}-{}.png", prefix, width, height, timestamp_slug(stamp))
        }
        None => format!("{}-{}.png", prefix, timestamp_slug(stamp)),
    }
}

/// ISO-based timestamp with characters a filename can carry
pub fn timestamp_slug(stamp: DateTime<Local>) -> String {
    stamp.format("%Y-%m-%dT%H-%M-%S").to_string()
}

enum FetchFailure {
    /// The request never completed; worth one retry
    Network(String),
    /// The server answered with a non-success status
    Status(String),
}

/// Fetch the bytes behind an image URL. Data URLs decode locally; remote
/// URLs are fetched, with exactly one retry after a network error.
pub async fn fetch_image(url: String) -> Result<Vec<u8>, String> {
    if data_url::is_data_url(&url) {
        return data_url::decode(&url).map_err(|e| e.to_string());
    }

    match fetch_once(&url).await {
        Ok(bytes) => Ok(bytes),
        Err(FetchFailure::Status(message)) => Err(message),
        Err(FetchFailure::Network(message)) => {
            log::warn!("⚠️  Download failed ({}), retrying once...", message);
            tokio::time::sleep(RETRY_DELAY).await;
            match fetch_once(&url).await {
                Ok(bytes) => Ok(bytes),
                Err(FetchFailure::Network(message)) | Err(FetchFailure::Status(message)) => {
                    Err(message)
                }
            }
        }
    }
}

async fn fetch_once(url: &str) -> Result<Vec<u8>, FetchFailure> {
    let client = reqwest::Client::builder()
        .timeout(LOAD_TIMEOUT)
        .build()
        .map_err(|e| FetchFailure::Network(e.to_string()))?;

    let response = client
        .get(url)
        .header("Accept", "image/*")
        .send()
        .await
        .map_err(|e| FetchFailure::Network(e.to_string()))?;

    if !response.status().is_success() {
        return Err(FetchFailure::Status(format!(
            "图片下载失败: HTTP {}",
            response.status()
        )));
    }

    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|e| FetchFailure::Network(e.to_string()))
}

/// Fetch an image and write it to the chosen path
pub async fn save_image(url: String, path: PathBuf) -> Result<PathBuf, String> {
    let bytes = fetch_image(url).await?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| format!("文件保存失败: {}", e))?;
    log::info!("💾 Saved image to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 6, 14, 30, 5).unwrap()
    }

    #[test]
    fn test_filename_with_dimensions() {
        assert_eq!(
            suggested_filename("image", Some((2000, 1500)), stamp()),
            "image-2000x1500-2026-08-06T14-30-05.png"
        );
    }

    #[test]
    fn test_filename_without_dimensions() {
        assert_eq!(
            suggested_filename("photo", None, stamp()),
            "photo-2026-08-06T14-30-05.png"
        );
    }

    #[test]
    fn test_timestamp_slug_has_no_reserved_characters() {
        let slug = timestamp_slug(stamp());
        assert!(!slug.contains(':'));
        assert!(!slug.contains('.'));
    }

    #[tokio::test]
    async fn test_fetch_image_decodes_data_urls_without_network() {
        let url = "data:image/png;base64,aGVsbG8=".to_string();
        assert_eq!(fetch_image(url).await.unwrap(), b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_fetch_image_rejects_malformed_data_urls() {
        let url = "data:image/png;base64,###".to_string();
        assert!(fetch_image(url).await.is_err());
    }

    #[tokio::test]
    async fn test_save_image_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let url = "data:image/png;base64,aGVsbG8=".to_string();

        let saved = save_image(url, path.clone()).await.unwrap();
        assert_eq!(saved, path);
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }
}
