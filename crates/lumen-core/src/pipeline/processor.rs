//! Per-image processing: wires the stages together against a stored original.

use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::caption::CaptionProvider;
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::storage::FileStorage;
use crate::types::{DerivedFields, ImageRecord, ThumbnailSize};

use super::decode::ImageDecoder;
use super::metadata::MetadataExtractor;
use super::thumbnail::ThumbnailGenerator;

/// Runs decode, metadata, thumbnail and caption stages for one record.
pub struct ImageProcessor {
    decoder: ImageDecoder,
    thumbnail_gen: ThumbnailGenerator,
    storage: FileStorage,
    captioner: Arc<CaptionProvider>,
}

impl ImageProcessor {
    pub fn new(config: &Config, storage: FileStorage, captioner: Arc<CaptionProvider>) -> Self {
        Self {
            decoder: ImageDecoder::new(),
            thumbnail_gen: ThumbnailGenerator::new(config.thumbnail.clone()),
            storage,
            captioner,
        }
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// Derive every field of a successful record from its stored original.
    ///
    /// Any stage error aborts the run; the caller records it as the failure.
    pub async fn process(&self, record: &ImageRecord) -> PipelineResult<DerivedFields> {
        let start = Instant::now();
        let path = record.original_path.as_path();
        tracing::debug!("Processing {} ({:?})", record.id, path);

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(io_error(path, e)),
        };

        let stage = Instant::now();
        let exif = MetadataExtractor::extract_from_bytes(&bytes);
        tracing::trace!("  Metadata: {:?}", stage.elapsed());

        let stage = Instant::now();
        let decoded = self.decoder.decode_from_bytes(bytes, path).await?;
        tracing::trace!("  Decode: {:?}", stage.elapsed());

        let fs_meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_error(path, e))?;
        let size_bytes = fs_meta.len();
        let file_datetime: DateTime<Utc> = fs_meta
            .modified()
            .map_err(|e| io_error(path, e))?
            .into();

        let stage = Instant::now();
        let image = Arc::new(decoded.image);
        let small_thumbnail_path = self
            .write_thumbnail(&record.id, Arc::clone(&image), ThumbnailSize::Small)
            .await?;
        let medium_thumbnail_path = self
            .write_thumbnail(&record.id, image, ThumbnailSize::Medium)
            .await?;
        tracing::trace!("  Thumbnails: {:?}", stage.elapsed());

        let stage = Instant::now();
        let caption = self
            .captioner
            .caption(path, decoded.format.name(), decoded.width, decoded.height)
            .await;
        tracing::trace!("  Caption: {:?}", stage.elapsed());

        tracing::debug!(
            "Processed {} in {:?} ({}x{})",
            record.id,
            start.elapsed(),
            decoded.width,
            decoded.height
        );

        Ok(DerivedFields {
            width: decoded.width,
            height: decoded.height,
            format: decoded.format.extension().to_string(),
            size_bytes,
            file_datetime,
            caption,
            exif,
            small_thumbnail_path,
            medium_thumbnail_path,
        })
    }

    async fn write_thumbnail(
        &self,
        id: &str,
        image: Arc<DynamicImage>,
        size: ThumbnailSize,
    ) -> PipelineResult<std::path::PathBuf> {
        let destination = self.storage.thumbnail_path(id, size);
        let generator = self.thumbnail_gen.clone();

        let bytes = tokio::task::spawn_blocking(move || generator.generate_bytes(&image, size))
            .await
            .map_err(|e| thumbnail_error(&destination, format!("Task join error: {e}")))?
            .map_err(|e| thumbnail_error(&destination, e.to_string()))?;

        self.storage
            .write_derivative(&destination, &bytes)
            .await
            .map_err(|e| thumbnail_error(&destination, e.to_string()))?;
        Ok(destination)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn thumbnail_error(path: &Path, message: String) -> PipelineError {
    PipelineError::Thumbnail {
        path: path.to_path_buf(),
        message,
    }
}
