//! Anthropic caption backend using the Messages API with base64 image blocks.

use super::backend::{CaptionBackend, CaptionRequest, CaptionResponse};
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub struct AnthropicBackend {
    api_key: String,
    model: String,
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(api_key: &str, model: &str, endpoint: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint: endpoint.to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseContent>,
    model: String,
}

#[derive(Deserialize)]
struct ResponseContent {
    text: Option<String>,
}

#[async_trait]
impl CaptionBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(&self, request: &CaptionRequest) -> Result<CaptionResponse, PipelineError> {
        let start = Instant::now();

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: Some(request.temperature),
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            media_type: request.image.media_type.clone(),
                            data: request.image.data.clone(),
                        },
                    },
                    ContentBlock::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                PipelineError::CaptionUnavailable(format!("Anthropic request failed: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::CaptionUnavailable(format!(
                "Anthropic HTTP {status}: {text}"
            )));
        }

        let messages_resp: MessagesResponse = resp.json().await.map_err(|e| {
                PipelineError::CaptionUnavailable(format!("Failed to parse Anthropic response: {e}"))
            })?;

        let text = messages_resp
            .content
            .into_iter()
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(PipelineError::CaptionUnavailable(
                "Anthropic returned an empty caption".to_string(),
            ));
        }

        Ok(CaptionResponse {
            text,
            model: messages_resp.model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::backend::ImageInput;
    use crate::caption::test_server;

    #[test]
    fn test_image_block_shape() {
        let block = ContentBlock::Image {
            source: ImageSource {
                source_type: "base64".into(),
                media_type: "image/jpeg".into(),
                data: "AAAA".into(),
            },
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["source"]["type"], "base64");
        assert_eq!(json["source"]["media_type"], "image/jpeg");
    }

    fn local(endpoint: &str) -> AnthropicBackend {
        AnthropicBackend {
            client: test_server::client(),
            ..AnthropicBackend::new("key", "claude-test", endpoint, Duration::from_secs(5))
        }
    }

    fn request() -> CaptionRequest {
        CaptionRequest::for_image(ImageInput::from_bytes(&[0xFF, 0xD8, 0xFF], "jpeg"))
    }

    #[tokio::test]
    async fn test_generate_joins_text_blocks() {
        let url = test_server::respond_once(
            200,
            r#"{"model":"claude-test-1","content":[{"type":"text","text":"A cat "},{"type":"text","text":"asleep. "}]}"#,
        )
        .await;
        let caption = local(&url).generate(&request()).await.unwrap();
        assert_eq!(caption.text, "A cat asleep.");
        assert_eq!(caption.model, "claude-test-1");
    }

    #[tokio::test]
    async fn test_generate_maps_server_error() {
        let url = test_server::respond_once(500, r#"{"type":"error"}"#).await;
        let err = local(&url).generate(&request()).await.unwrap_err();
        match err {
            PipelineError::CaptionUnavailable(message) => {
                assert!(message.contains("500"), "{message}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_content() {
        let url = test_server::respond_once(200, r#"{"model":"claude-test","content":[]}"#).await;
        let err = local(&url).generate(&request()).await.unwrap_err();
        match err {
            PipelineError::CaptionUnavailable(message) => {
                assert!(message.contains("empty caption"), "{message}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
