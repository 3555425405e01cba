//! Caption backend trait, request/response types, and the loader that turns
//! candidate names into backends.

use crate::config::CaptionConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

/// Base64-encoded image ready to send to a captioning API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and format string.
    ///
    /// The format is the image format identifier (e.g., "jpeg", "png").
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            other => {
                tracing::warn!("Unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A request to caption one image.
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    /// The image to describe
    pub image: ImageInput,
    /// Text prompt for the model
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl CaptionRequest {
    pub fn for_image(image: ImageInput) -> Self {
        Self {
            image,
            prompt: "Write one short sentence captioning this image. \
                     Describe only what is visible."
                .to_string(),
            max_tokens: 64,
            temperature: 0.2,
        }
    }
}

/// A generated caption.
#[derive(Debug, Clone)]
pub struct CaptionResponse {
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all caption backends implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the provider holds `Arc<dyn CaptionBackend>`).
#[async_trait]
pub trait CaptionBackend: Send + Sync {
    /// Backend name for logging (e.g., "ollama").
    fn name(&self) -> &str;

    /// Check whether the backend is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Generate a caption. Any failure is `PipelineError::CaptionUnavailable`.
    async fn generate(&self, request: &CaptionRequest) -> Result<CaptionResponse, PipelineError>;

    /// Per-request timeout for this backend.
    fn timeout(&self) -> Duration;
}

/// Builds a backend for a candidate name.
pub trait BackendLoader: Send + Sync {
    fn load(&self, candidate: &str) -> Result<Box<dyn CaptionBackend>, PipelineError>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Split `provider:model` at the first colon; the model may contain colons.
pub fn parse_candidate(candidate: &str) -> (&str, Option<&str>) {
    match candidate.split_once(':') {
        Some((provider, model)) if !model.is_empty() => (provider.trim(), Some(model.trim())),
        Some((provider, _)) => (provider.trim(), None),
        None => (candidate.trim(), None),
    }
}

/// Loader that builds backends from the `[caption]` config section.
pub struct ConfigBackendLoader {
    config: CaptionConfig,
    timeout: Duration,
}

impl ConfigBackendLoader {
    pub fn new(config: CaptionConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }
}

impl BackendLoader for ConfigBackendLoader {
    fn load(&self, candidate: &str) -> Result<Box<dyn CaptionBackend>, PipelineError> {
        let (provider, model_override) = parse_candidate(candidate);
        match provider {
            "ollama" => {
                let cfg = &self.config.ollama;
                let model = model_override.unwrap_or(&cfg.model);
                Ok(Box::new(super::ollama::OllamaBackend::new(
                    &cfg.endpoint,
                    model,
                    self.timeout,
                )))
            }
            "openai" => {
                let cfg = &self.config.openai;
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| {
                    unavailable("OpenAI API key not set. Set OPENAI_API_KEY env var.")
                })?;
                let model = model_override.unwrap_or(&cfg.model);
                Ok(Box::new(super::openai::OpenAiBackend::new(
                    &api_key,
                    model,
                    &cfg.endpoint,
                    self.timeout,
                )))
            }
            "anthropic" => {
                let cfg = &self.config.anthropic;
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| {
                    unavailable("Anthropic API key not set. Set ANTHROPIC_API_KEY env var.")
                })?;
                let model = model_override.unwrap_or(&cfg.model);
                Ok(Box::new(super::anthropic::AnthropicBackend::new(
                    &api_key,
                    model,
                    &cfg.endpoint,
                    self.timeout,
                )))
            }
            other => Err(unavailable(&format!("Unknown caption backend: {other}"))),
        }
    }
}

pub(crate) fn unavailable(message: &str) -> PipelineError {
    PipelineError::CaptionUnavailable(message.to_string())
}
