/// HTTP client for the collaborator /edit-image endpoint
///
/// One POST per submission. Non-2xx statuses and `error` fields in the body
/// both map to a uniform failure; rate limiting is detected structurally
/// from HTTP 429, with a substring fallback for errors the backend tunnels
/// through the response body.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use super::request::EditRequest;

/// Overall request timeout; AI edits can take a while
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Target size carried in the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Response body of POST /edit-image
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub needs_resize: bool,
    #[serde(default)]
    pub target_dimensions: Option<Dimensions>,
    #[serde(default)]
    pub backend_resized: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// A successfully parsed edit result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub image_url: String,
    pub needs_resize: bool,
    pub target_dimensions: Option<Dimensions>,
    pub backend_resized: bool,
}

/// Transport and API failures, already mapped to user-facing text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// HTTP 429 or a rate-limit message tunnelled through the body
    #[error("{0}")]
    RateLimited(String),
    /// The backend reported an error or returned an unusable body
    #[error("{0}")]
    Api(String),
    /// The request never completed
    #[error("网络请求失败: {0}")]
    Network(String),
}

impl ApiError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited(_))
    }
}

/// Classify an error message from a response body. The backend tunnels
/// upstream failures through 200 bodies, so the original substring check is
/// kept as a fallback for that path only.
pub fn classify_body_error(message: String) -> ApiError {
    if message.contains("429") || message.contains("Rate limit exceeded") {
        ApiError::RateLimited(message)
    } else {
        ApiError::Api(message)
    }
}

/// POST the edit request and parse the response
pub async fn edit_image(endpoint: String, request: EditRequest) -> Result<EditOutcome, ApiError> {
    log::info!(
        "📤 Posting edit request: {} image(s), model {}",
        request.images.len(),
        request.model
    );

    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::Network(e.to_string()))?;

    let response = client
        .post(&endpoint)
        .json(&request)
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let body = response.text().await.unwrap_or_default();
        let message = extract_error(&body).unwrap_or_else(|| format!("HTTP 429: {}", body));
        return Err(ApiError::RateLimited(message));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = extract_error(&body).unwrap_or_else(|| format!("HTTP {}", status));
        return Err(classify_body_error(message));
    }

    let parsed: EditResponse = response
        .json()
        .await
        .map_err(|e| ApiError::Api(format!("响应解析失败: {}", e)))?;

    outcome_from(parsed)
}

/// Map a parsed body to an outcome, treating any `error` field as failure
pub fn outcome_from(response: EditResponse) -> Result<EditOutcome, ApiError> {
    if let Some(error) = response.error {
        return Err(classify_body_error(error));
    }

    let image_url = response
        .image_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::Api("响应缺少 imageUrl".to_string()))?;

    Ok(EditOutcome {
        image_url,
        needs_resize: response.needs_resize,
        target_dimensions: response.target_dimensions,
        backend_resized: response.backend_resized,
    })
}

/// Pull the `error` field out of a JSON body, if there is one
fn extract_error(body: &str) -> Option<String> {
    serde_json::from_str::<EditResponse>(body)
        .ok()
        .and_then(|response| response.error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_response_parses() {
        let response: EditResponse =
            serde_json::from_str(r#"{"imageUrl": "data:image/png;base64,AAAA"}"#).unwrap();
        assert!(!response.needs_resize);
        assert!(!response.backend_resized);
        assert_eq!(response.target_dimensions, None);

        let outcome = outcome_from(response).unwrap();
        assert_eq!(outcome.image_url, "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_full_response_parses() {
        let response: EditResponse = serde_json::from_str(
            r#"{
                "imageUrl": "https://cdn.example/out.png",
                "needsResize": true,
                "targetDimensions": {"width": 2000, "height": 1500},
                "backendResized": false
            }"#,
        )
        .unwrap();

        let outcome = outcome_from(response).unwrap();
        assert!(outcome.needs_resize);
        assert!(!outcome.backend_resized);
        assert_eq!(
            outcome.target_dimensions,
            Some(Dimensions {
                width: 2000,
                height: 1500
            })
        );
    }

    #[test]
    fn test_error_field_is_uniform_failure() {
        let response: EditResponse = serde_json::from_str(
            r#"{"imageUrl": "https://cdn.example/out.png", "error": "upstream exploded"}"#,
        )
        .unwrap();
        assert_eq!(
            outcome_from(response),
            Err(ApiError::Api("upstream exploded".to_string()))
        );
    }

    #[test]
    fn test_missing_image_url_is_failure() {
        let response: EditResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(outcome_from(response), Err(ApiError::Api(_))));
    }

    #[test]
    fn test_classify_rate_limit_fallbacks() {
        assert!(classify_body_error("HTTP 429 from upstream".to_string()).is_rate_limited());
        assert!(classify_body_error("Rate limit exceeded".to_string()).is_rate_limited());
        assert!(!classify_body_error("model not found".to_string()).is_rate_limited());
    }

    #[test]
    fn test_extract_error_from_json_body() {
        assert_eq!(
            extract_error(r#"{"error": "bad key"}"#),
            Some("bad key".to_string())
        );
        assert_eq!(extract_error("<html>502</html>"), None);
    }
}
