//! Lumen Core - asynchronous image ingestion and processing.
//!
//! Uploads are validated synchronously, stored, and recorded as
//! `processing`; a single background worker then derives dimensions, EXIF
//! metadata, two JPEG thumbnails and a caption, and moves the record to
//! `success` or `failed` in one write.
//!
//! ```text
//! submit → validate → store original → record (processing) → queue
//!                                                              ↓
//!        record (success | failed) ← caption ← thumbnails ← decode + EXIF
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::{Config, ImageService};
//!
//! #[tokio::main]
//! async fn main() -> lumen_core::Result<()> {
//!     let service = ImageService::open(Config::load()?).await?;
//!     let record = service.submit("photo.jpg", &std::fs::read("photo.jpg")?).await?;
//!     println!("queued {}", record.id);
//!     service.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod caption;
pub mod config;
pub mod error;
pub mod jobs;
pub mod output;
pub mod pipeline;
pub mod service;
pub mod storage;
pub mod store;
pub mod types;

pub use caption::CaptionProvider;
pub use config::Config;
pub use error::{ConfigError, LumenError, PipelineError, PipelineResult, Result, StoreError};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{JobOutcome, SupportedFormat};
pub use service::ImageService;
pub use storage::FileStorage;
pub use store::{MemoryStore, RecordStore, SqliteStore};
pub use types::{
    DerivedFields, ExifData, ExifValue, ImageRecord, ImageResponse, ImageStatus,
    ProcessingStats, ThumbnailSize,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
