//! Error types for the Lumen image processing pipeline.
//!
//! Errors are split by concern: configuration, pipeline stages, and the record
//! store. `LumenError` ties them together for the service facade and adds the
//! query-side not-found signals.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Lumen operations.
#[derive(Error, Debug)]
pub enum LumenError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation and processing errors
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// Record store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No record exists for the identifier
    #[error("image not found: {0}")]
    ImageNotFound(String),

    /// The record exists but has no thumbnail of that size
    #[error("thumbnail not found: {id} ({size})")]
    ThumbnailNotFound { id: String, size: String },

    /// The worker has been shut down and no longer accepts jobs
    #[error("image service has been stopped")]
    ServiceStopped,

    /// Waiting for a record to reach a terminal status took too long
    #[error("timed out after {timeout_ms}ms waiting for {id}")]
    WaitTimeout { id: String, timeout_ms: u64 },

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LumenError {
    /// True for errors that a caller should report as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LumenError::ImageNotFound(_)
                | LumenError::ThumbnailNotFound { .. }
                | LumenError::Pipeline(PipelineError::FileNotFound(_))
        )
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline errors, from upload validation through the processing stages.
///
/// The `Display` form of a processing error is what ends up in a failed
/// record's `error` field.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Upload bytes are empty, too large, or not a readable image
    #[error("{0}")]
    InvalidInput(String),

    /// Recognised image container outside the accepted set
    #[error("invalid file format")]
    UnsupportedFormat { format: String },

    /// The stored original is missing
    #[error("original image file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Reading a stored file failed
    #[error("IO error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image decoding failed
    #[error("Decode error for {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    /// Rendering or writing a thumbnail failed
    #[error("Thumbnail generation failed for {}: {message}", path.display())]
    Thumbnail { path: PathBuf, message: String },

    /// The caption backend could not produce text
    #[error("caption unavailable: {0}")]
    CaptionUnavailable(String),
}

/// Record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// `create` was called with an identifier that already exists
    #[error("record already exists: {0}")]
    Duplicate(String),

    /// `update` was called for an identifier that does not exist
    #[error("record does not exist: {0}")]
    Missing(String),

    /// Creating the database directory failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite rejected a statement or could not open the database
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A JSON column could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored row holds a value the record model cannot represent
    #[error("corrupt record {id}: {message}")]
    Corrupt { id: String, message: String },

    /// The blocking database task panicked or was cancelled
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convenience type alias for Lumen results.
pub type Result<T> = std::result::Result<T, LumenError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
