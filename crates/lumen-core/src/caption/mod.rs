//! Image captioning.
//!
//! A [`CaptionProvider`] wraps an optional external backend (Ollama, OpenAI,
//! Anthropic) chosen once from an ordered candidate list. Whenever no backend
//! is ready, or the active one fails, the caption is derived from image
//! brightness and dimensions instead. Captioning never fails.

pub(crate) mod anthropic;
pub(crate) mod backend;
pub(crate) mod fallback;
pub(crate) mod ollama;
pub(crate) mod openai;
#[cfg(test)]
mod test_server;

pub use backend::{
    BackendLoader, CaptionBackend, CaptionRequest, CaptionResponse, ConfigBackendLoader,
    ImageInput,
};
pub use fallback::fallback_text;

use crate::config::{CaptionConfig, LimitsConfig};
use crate::error::PipelineError;
use backend::unavailable;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

enum BackendState {
    Uninitialized,
    Unavailable,
    Ready(Arc<dyn CaptionBackend>),
}

/// Produces a caption for a stored image.
pub struct CaptionProvider {
    candidates: Vec<String>,
    loader: Box<dyn BackendLoader>,
    state: Mutex<BackendState>,
}

impl CaptionProvider {
    pub fn new(candidates: Vec<String>, loader: Box<dyn BackendLoader>) -> Self {
        Self {
            candidates,
            loader,
            state: Mutex::new(BackendState::Uninitialized),
        }
    }

    /// Build from config. A disabled section yields a fallback-only provider.
    pub fn from_config(caption: &CaptionConfig, limits: &LimitsConfig) -> Self {
        let candidates = if caption.enabled {
            caption.candidates.clone()
        } else {
            Vec::new()
        };
        let timeout = Duration::from_millis(limits.caption_timeout_ms);
        Self::new(
            candidates,
            Box::new(ConfigBackendLoader::new(caption.clone(), timeout)),
        )
    }

    /// Provider that always uses the brightness fallback.
    pub fn fallback_only() -> Self {
        Self {
            candidates: Vec::new(),
            loader: Box::new(NoBackends),
            state: Mutex::new(BackendState::Unavailable),
        }
    }

    /// Caption the image at `path`. `format` is the canonical format name
    /// ("jpeg", "png").
    pub async fn caption(&self, path: &Path, format: &str, width: u32, height: u32) -> String {
        if let Some(backend) = self.active_backend().await {
            match invoke(backend.as_ref(), path, format).await {
                Ok(text) => return text,
                Err(e) => tracing::warn!(
                    "Caption generation failed with backend '{}': {e}",
                    backend.name()
                ),
            }
        }
        fallback::fallback_caption(path, format, width, height).await
    }

    /// Name of the loaded backend, if initialization already selected one.
    pub async fn active_backend_name(&self) -> Option<String> {
        match &*self.state.lock().await {
            BackendState::Ready(backend) => Some(backend.name().to_string()),
            _ => None,
        }
    }

    async fn active_backend(&self) -> Option<Arc<dyn CaptionBackend>> {
        // Held across initialization so concurrent first callers load once.
        let mut state = self.state.lock().await;
        if matches!(*state, BackendState::Uninitialized) {
            *state = self.try_load().await;
        }
        match &*state {
            BackendState::Ready(backend) => Some(Arc::clone(backend)),
            _ => None,
        }
    }

    async fn try_load(&self) -> BackendState {
        for candidate in &self.candidates {
            let backend = match self.loader.load(candidate) {
                Ok(backend) => backend,
                Err(e) => {
                    tracing::warn!("Failed to load caption backend '{candidate}': {e}");
                    continue;
                }
            };
            if backend.is_available().await {
                tracing::info!("Caption backend loaded: {candidate}");
                return BackendState::Ready(Arc::from(backend));
            }
            tracing::warn!("Caption backend '{candidate}' is not available");
        }
        tracing::warn!("No caption backend loaded; fallback captions will be used");
        BackendState::Unavailable
    }
}

async fn invoke(
    backend: &dyn CaptionBackend,
    path: &Path,
    format: &str,
) -> Result<String, PipelineError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| unavailable(&format!("cannot read {}: {e}", path.display())))?;
    let request = CaptionRequest::for_image(ImageInput::from_bytes(&bytes, format));

    let timeout = backend.timeout();
    let response = tokio::time::timeout(timeout, backend.generate(&request))
        .await
        .map_err(|_| {
            unavailable(&format!(
                "{} timed out after {}ms",
                backend.name(),
                timeout.as_millis()
            ))
        })??;

    let text = response.text.trim();
    if text.is_empty() {
        return Err(unavailable("empty caption"));
    }
    tracing::debug!(
        "Caption from {} ({}) in {}ms",
        backend.name(),
        response.model,
        response.latency_ms
    );
    Ok(text.to_string())
}

struct NoBackends;

impl BackendLoader for NoBackends {
    fn load(&self, candidate: &str) -> Result<Box<dyn CaptionBackend>, PipelineError> {
        Err(unavailable(&format!("captioning disabled ({candidate})")))
    }
}
