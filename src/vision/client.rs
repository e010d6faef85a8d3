use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{ChatMessage, ChatRequest, ChatResponse};
use super::VisionModel;
use crate::config::{RequestConfig, VisionConfig};
use crate::error::{VisionError, VisionResult};

/// Client for an OpenAI-compatible chat completions API with image input
#[derive(Clone)]
pub struct VisionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    request_config: RequestConfig,
}

impl VisionClient {
    /// Create a new vision client. Fails when no API key is configured.
    pub fn new(config: &VisionConfig, request_config: RequestConfig) -> VisionResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| VisionError::NotConfigured {
                message: "VISION_API_KEY is required".to_string(),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(VisionError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            request_config,
        })
    }

    /// Send a chat request, retrying with exponential backoff
    pub async fn chat(&self, request: &ChatRequest) -> VisionResult<ChatResponse> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    model = %self.model,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying vision request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, request).await {
                Ok(response) => {
                    info!(
                        model = %self.model,
                        latency_ms = start.elapsed().as_millis(),
                        "Vision call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    error!(
                        model = %self.model,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Vision call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(VisionError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        request: &ChatRequest,
    ) -> VisionResult<ChatResponse> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Calling vision model"
        );

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VisionError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    VisionError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(VisionError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| VisionError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl VisionModel for VisionClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        image: &[u8],
    ) -> VisionResult<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user_with_image(user_prompt, image_data_url(image)),
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self.chat(&request).await?;
        response
            .completion()
            .map(str::to_string)
            .ok_or_else(|| VisionError::InvalidResponse {
                message: "Response contained no completion".to_string(),
            })
    }
}

/// Encode image bytes as a data URL. PNG is detected by signature; anything
/// else is sent as JPEG.
pub fn image_data_url(image: &[u8]) -> String {
    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
    let mime = if image.starts_with(PNG_SIGNATURE) {
        "image/png"
    } else {
        "image/jpeg"
    };
    format!("data:{};base64,{}", mime, BASE64.encode(image))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_api_key() {
        let result = VisionClient::new(&VisionConfig::default(), RequestConfig::default());
        assert!(matches!(result, Err(VisionError::NotConfigured { .. })));
    }

    #[test]
    fn test_client_creation() {
        let config = VisionConfig {
            api_key: Some("test_key".to_string()),
            base_url: "https://api.openai.com/".to_string(),
            ..VisionConfig::default()
        };

        let client = VisionClient::new(&config, RequestConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://api.openai.com");
    }

    #[test]
    fn test_image_data_url() {
        assert_eq!(image_data_url(b"abc"), "data:image/jpeg;base64,YWJj");
        let png = b"\x89PNG\r\n\x1a\nrest";
        assert!(image_data_url(png).starts_with("data:image/png;base64,"));
    }
}
