/// Edit request assembly and pre-submission validation
///
/// Validation runs before anything is serialized or sent; the first
/// violation produces a user-facing message and no request leaves the app.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::media::data_url;
use crate::state::input::{InputMode, InputSelection};

/// Per-file size cap for upload-mode images
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// JSON body of POST /edit-image
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    /// Data URLs (upload mode) or literal URL strings (URL mode)
    pub images: Vec<String>,
    pub prompt: String,
    pub original_width: u32,
    pub original_height: u32,
    pub apikey: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    pub model: String,
}

/// A submission blocked before any request was sent.
/// The Display text is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("请输入 API 密钥")]
    MissingApiKey,
    #[error("请选择至少一张图片")]
    NoFiles,
    #[error("请输入至少一个图片URL")]
    NoUrls,
    #[error("请输入修图指令")]
    MissingPrompt,
    #[error("无法获取图片尺寸信息，请重新选择图片")]
    MissingDimensions,
}

/// Validate a submission. Checks run in a fixed order and the first
/// violation wins: API key, image set, prompt, resolved dimensions.
pub fn validate(
    selection: &InputSelection,
    prompt: &str,
    api_key: &str,
) -> Result<(), ValidationError> {
    if api_key.trim().is_empty() {
        return Err(ValidationError::MissingApiKey);
    }
    if !selection.has_images() {
        return Err(match selection.mode {
            InputMode::Upload => ValidationError::NoFiles,
            InputMode::Url => ValidationError::NoUrls,
        });
    }
    if prompt.trim().is_empty() {
        return Err(ValidationError::MissingPrompt);
    }
    if selection.original_dimensions.is_none() {
        return Err(ValidationError::MissingDimensions);
    }
    Ok(())
}

/// Serialize the selected images for the request body.
///
/// Upload mode reads each file, re-validates it as a decodable image format,
/// enforces the 10MB cap and encodes a data URL. URL mode passes the trimmed
/// URL strings through verbatim.
pub async fn prepare_images(
    mode: InputMode,
    files: Vec<(String, PathBuf)>,
    urls: Vec<String>,
) -> Result<Vec<String>, String> {
    match mode {
        InputMode::Upload => {
            let mut images = Vec::with_capacity(files.len());
            for (name, path) in files {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| format!("图片读取失败 ({}): {}", name, e))?;
                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err(format!("图片文件过大，请选择小于10MB的图片 ({})", name));
                }
                let url =
                    data_url::encode(&bytes).map_err(|e| format!("{} ({})", e, name))?;
                images.push(url);
            }
            Ok(images)
        }
        InputMode::Url => Ok(urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn selection_with_file() -> InputSelection {
        let mut selection = InputSelection::new();
        selection.add_files(vec![PathBuf::from("a.png")]);
        selection.original_dimensions = Some((2000, 1500));
        selection
    }

    #[test]
    fn test_empty_api_key_blocks_first() {
        // Even with everything else missing, the key violation is reported
        let selection = InputSelection::new();
        assert_eq!(
            validate(&selection, "", ""),
            Err(ValidationError::MissingApiKey)
        );
    }

    #[test]
    fn test_missing_images_per_mode() {
        let mut selection = InputSelection::new();
        assert_eq!(
            validate(&selection, "p", "sk-x"),
            Err(ValidationError::NoFiles)
        );

        selection.switch_mode(InputMode::Url);
        assert_eq!(
            validate(&selection, "p", "sk-x"),
            Err(ValidationError::NoUrls)
        );
    }

    #[test]
    fn test_missing_prompt_and_dimensions() {
        let mut selection = selection_with_file();
        assert_eq!(
            validate(&selection, "  ", "sk-x"),
            Err(ValidationError::MissingPrompt)
        );

        selection.original_dimensions = None;
        assert_eq!(
            validate(&selection, "把天空换成晚霞", "sk-x"),
            Err(ValidationError::MissingDimensions)
        );
    }

    #[test]
    fn test_valid_submission_passes() {
        let selection = selection_with_file();
        assert_eq!(validate(&selection, "把天空换成晚霞", "sk-x"), Ok(()));
    }

    #[test]
    fn test_request_serializes_contract_field_names() {
        let request = EditRequest {
            images: vec!["data:image/png;base64,AAAA".to_string()],
            prompt: "p".to_string(),
            original_width: 2000,
            original_height: 1500,
            apikey: "sk-x".to_string(),
            api_base_url: Some("https://api.example/v1".to_string()),
            model: "m".to_string(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["originalWidth"], 2000);
        assert_eq!(json["originalHeight"], 1500);
        assert_eq!(json["apikey"], "sk-x");
        assert_eq!(json["apiBaseUrl"], "https://api.example/v1");
        assert_eq!(json["model"], "m");
        assert!(json["images"].is_array());
    }

    #[test]
    fn test_blank_api_base_url_is_omitted() {
        let request = EditRequest {
            images: vec![],
            prompt: "p".to_string(),
            original_width: 1,
            original_height: 1,
            apikey: "sk-x".to_string(),
            api_base_url: None,
            model: "m".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("apiBaseUrl").is_none());
    }

    #[tokio::test]
    async fn test_prepare_urls_trims_and_drops_blanks() {
        let images = prepare_images(
            InputMode::Url,
            vec![],
            vec![
                " https://a.example/1.png ".to_string(),
                "   ".to_string(),
            ],
        )
        .await
        .unwrap();
        assert_eq!(images, vec!["https://a.example/1.png".to_string()]);
    }

    #[tokio::test]
    async fn test_prepare_upload_encodes_data_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        let mut bytes = Vec::new();
        let img = image::RgbaImage::new(2, 2);
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        std::fs::write(&path, &bytes).unwrap();

        let images = prepare_images(
            InputMode::Upload,
            vec![("tiny.png".to_string(), path)],
            vec![],
        )
        .await
        .unwrap();
        assert_eq!(images.len(), 1);
        assert!(images[0].starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_prepare_upload_rejects_non_image_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, b"plain text").unwrap();

        let result = prepare_images(
            InputMode::Upload,
            vec![("fake.png".to_string(), path)],
            vec![],
        )
        .await;
        assert!(result.unwrap_err().contains("不支持的文件类型"));
    }
}
