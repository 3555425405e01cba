//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where originals, thumbnails and the record database live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for all stored files
    pub root: PathBuf,

    /// File name of the SQLite record database, relative to `root`
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("~/.lumen/storage"),
            database_file: "lumen.db".to_string(),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum upload size in megabytes
    pub max_upload_mb: u64,

    /// Per-request timeout for caption backends in milliseconds
    pub caption_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: 50,
            caption_timeout_ms: 60000,
        }
    }
}

impl LimitsConfig {
    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Bounding box edge for the small thumbnail
    pub small_size: u32,

    /// Bounding box edge for the medium thumbnail
    pub medium_size: u32,

    /// JPEG quality (1-100)
    pub quality: u8,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            small_size: 128,
            medium_size: 256,
            quality: 90,
        }
    }
}

/// Caption backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// When false, every caption comes from the luminance fallback
    pub enabled: bool,

    /// Backends to try in order, as `provider` or `provider:model`
    pub candidates: Vec<String>,

    /// Ollama (local) configuration
    pub ollama: OllamaConfig,

    /// OpenAI configuration
    pub openai: OpenAiConfig,

    /// Anthropic configuration
    pub anthropic: AnthropicConfig,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            candidates: vec!["ollama".to_string()],
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
            anthropic: AnthropicConfig::default(),
        }
    }
}

impl CaptionConfig {
    /// Parse a comma-separated candidate list, dropping blanks.
    pub fn parse_candidates(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llava".to_string(),
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Chat completions endpoint
    pub endpoint: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }
}

/// Anthropic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Messages API endpoint
    pub endpoint: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_candidates_trims_and_drops_blanks() {
        let parsed = CaptionConfig::parse_candidates(" ollama:llava:7b , ,openai ");
        assert_eq!(parsed, vec!["ollama:llava:7b", "openai"]);
    }

    #[test]
    fn test_thumbnail_defaults() {
        let config = ThumbnailConfig::default();
        assert_eq!(config.small_size, 128);
        assert_eq!(config.medium_size, 256);
        assert_eq!(config.quality, 90);
    }

    #[test]
    fn test_max_upload_bytes() {
        let limits = LimitsConfig {
            max_upload_mb: 2,
            ..LimitsConfig::default()
        };
        assert_eq!(limits.max_upload_bytes(), 2 * 1024 * 1024);
    }
}
