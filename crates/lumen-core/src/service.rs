//! `ImageService`: submission, querying, and the worker lifecycle.
//!
//! The service owns the job queue and the single worker. Submissions are
//! validated synchronously; everything else happens in the background.
//!
//! ```rust,ignore
//! let service = ImageService::open(Config::load()?).await?;
//! let record = service.submit("photo.jpg", &bytes).await?;
//! let done = service.wait_for(&record.id, Duration::from_secs(30)).await?;
//! service.shutdown().await;
//! ```

use chrono::Utc;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

use crate::caption::CaptionProvider;
use crate::config::Config;
use crate::error::{LumenError, Result};
use crate::jobs::{JobQueue, Worker};
use crate::pipeline::{ImageProcessor, ProcessingPipeline, Validator};
use crate::storage::FileStorage;
use crate::store::{RecordStore, SqliteStore};
use crate::types::{ImageRecord, ImageResponse, ProcessingStats, ThumbnailSize};

/// Name recorded when the caller supplies none.
pub const DEFAULT_UPLOAD_NAME: &str = "uploaded-image";

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

enum WorkerState {
    /// Jobs accumulate in the queue until `start`.
    Idle(mpsc::UnboundedReceiver<String>),
    Running(Worker),
    Stopped,
}

/// Facade over validation, storage, the record store and background processing.
pub struct ImageService {
    config: Config,
    store: Arc<dyn RecordStore>,
    storage: FileStorage,
    validator: Validator,
    pipeline: Arc<ProcessingPipeline>,
    queue: JobQueue,
    worker: Mutex<WorkerState>,
}

impl ImageService {
    /// Build a service without starting its worker.
    pub fn new(config: Config, store: Arc<dyn RecordStore>, captioner: CaptionProvider) -> Self {
        let storage = FileStorage::new(config.storage_root());
        let processor = ImageProcessor::new(&config, storage.clone(), Arc::new(captioner));
        let pipeline = ProcessingPipeline::new(Arc::clone(&store), Arc::new(processor));
        let (queue, rx) = JobQueue::new();

        Self {
            validator: Validator::new(config.limits.clone()),
            config,
            store,
            storage,
            pipeline: Arc::new(pipeline),
            queue,
            worker: Mutex::new(WorkerState::Idle(rx)),
        }
    }

    /// Open the durable store under the configured storage root and start
    /// the worker.
    pub async fn open(config: Config) -> Result<Self> {
        let service = Self::load(config).await?;
        service.start().await?;
        Ok(service)
    }

    /// Open the durable store without starting the worker, for read-only use.
    pub async fn load(config: Config) -> Result<Self> {
        let store = SqliteStore::open(config.database_path()).await?;
        let captioner = CaptionProvider::from_config(&config.caption, &config.limits);
        Ok(Self::new(config, Arc::new(store), captioner))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// Start the background worker. Calling it again while running is a no-op.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.worker.lock().await;
        match std::mem::replace(&mut *state, WorkerState::Stopped) {
            WorkerState::Idle(rx) => {
                let pipeline = Arc::clone(&self.pipeline);
                let worker = Worker::spawn(rx, move |id| {
                    let pipeline = Arc::clone(&pipeline);
                    async move { pipeline.run(&id).await }
                });
                *state = WorkerState::Running(worker);
                tracing::debug!("Image service worker started");
                Ok(())
            }
            running @ WorkerState::Running(_) => {
                *state = running;
                Ok(())
            }
            WorkerState::Stopped => Err(LumenError::ServiceStopped),
        }
    }

    /// Stop the worker and wait for it. The job in progress, if any, finishes;
    /// queued jobs are dropped and their records stay `processing`.
    pub async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.worker.lock().await, WorkerState::Stopped);
        if let WorkerState::Running(worker) = previous {
            worker.shutdown().await;
            tracing::debug!("Image service worker stopped");
        }
    }

    /// Validate and store an upload, create its `processing` record and
    /// queue it.
    ///
    /// Invalid uploads are rejected here; no record or file is created for them.
    pub async fn submit(&self, original_name: &str, bytes: &[u8]) -> Result<ImageRecord> {
        let validated = self.validator.validate(bytes)?;
        if matches!(*self.worker.lock().await, WorkerState::Stopped) {
            return Err(LumenError::ServiceStopped);
        }

        let id = self.unused_id().await?;
        let original_path = self
            .storage
            .write_original(&id, validated.format, bytes)
            .await?;

        let name = if original_name.is_empty() {
            DEFAULT_UPLOAD_NAME
        } else {
            original_name
        };
        let record = ImageRecord::new(&id, name, original_path.clone(), Utc::now());
        if let Err(e) = self.store.create(record.clone()).await {
            if let Err(remove_err) = tokio::fs::remove_file(&original_path).await {
                tracing::warn!(
                    "Failed to remove unrecorded original {:?}: {remove_err}",
                    original_path
                );
            }
            return Err(e.into());
        }

        if let Err(e) = self.queue.enqueue(&id) {
            let failed = record.into_failure(e.to_string(), Utc::now(), 0.0);
            self.store.update(failed).await?;
            return Err(e);
        }

        tracing::info!(
            "Accepted {name} as {id} ({}, {}x{})",
            validated.format.name(),
            validated.width,
            validated.height
        );
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<ImageRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| LumenError::ImageNotFound(id.to_string()))
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<ImageRecord>> {
        Ok(self.store.list().await?)
    }

    /// Client view of a record; thumbnail locations are file paths.
    pub async fn response(&self, id: &str) -> Result<ImageResponse> {
        let record = self.get(id).await?;
        Ok(ImageResponse::from_record(&record))
    }

    /// Path of an existing thumbnail file.
    pub async fn thumbnail(&self, id: &str, size: ThumbnailSize) -> Result<PathBuf> {
        let record = self.get(id).await?;
        let not_found = || LumenError::ThumbnailNotFound {
            id: id.to_string(),
            size: size.to_string(),
        };
        let path = record.thumbnail_path(size).ok_or_else(not_found)?;
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(not_found());
        }
        Ok(path.to_path_buf())
    }

    /// JPEG bytes of a thumbnail.
    pub async fn read_thumbnail(&self, id: &str, size: ThumbnailSize) -> Result<Vec<u8>> {
        let path = self.thumbnail(id, size).await?;
        Ok(tokio::fs::read(path).await?)
    }

    pub async fn stats(&self) -> Result<ProcessingStats> {
        let records = self.store.list().await?;
        Ok(ProcessingStats::from_records(&records))
    }

    /// Poll until the record reaches `success` or `failed`.
    pub async fn wait_for(&self, id: &str, timeout: Duration) -> Result<ImageRecord> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let record = self.get(id).await?;
            if record.is_terminal() {
                return Ok(record);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(LumenError::WaitTimeout {
                    id: id.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn unused_id(&self) -> Result<String> {
        loop {
            let id = new_image_id();
            if self.store.get(&id).await?.is_none() {
                return Ok(id);
            }
            tracing::debug!("Identifier {id} already taken; regenerating");
        }
    }
}

/// `img` followed by 10 random lowercase hex characters.
pub fn new_image_id() -> String {
    let bits: u64 = rand::thread_rng().gen_range(0..1u64 << 40);
    format!("img{bits:010x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    /// Store that refuses every new record.
    struct RejectingStore;

    #[async_trait]
    impl RecordStore for RejectingStore {
        async fn create(&self, _record: ImageRecord) -> std::result::Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }

        async fn get(&self, _id: &str) -> std::result::Result<Option<ImageRecord>, StoreError> {
            Ok(None)
        }

        async fn update(&self, record: ImageRecord) -> std::result::Result<(), StoreError> {
            Err(StoreError::Missing(record.id))
        }

        async fn list(&self) -> std::result::Result<Vec<ImageRecord>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_failed_create_removes_original() {
        let dir = tempfile::tempdir().unwrap();
        let service = ImageService::new(
            Config::with_storage_root(dir.path()),
            Arc::new(RejectingStore),
            CaptionProvider::fallback_only(),
        );

        let err = service.submit("a.png", &png(4, 4)).await.unwrap_err();
        assert!(matches!(err, LumenError::Store(_)));

        let originals = service.storage().originals_dir();
        let leftover = std::fs::read_dir(&originals)
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn test_original_name_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let service = ImageService::new(
            Config::with_storage_root(dir.path()),
            Arc::new(crate::store::MemoryStore::new()),
            CaptionProvider::fallback_only(),
        );

        let spaced = service.submit("  holiday .png ", &png(4, 4)).await.unwrap();
        assert_eq!(spaced.original_name, "  holiday .png ");
        let stored = service.get(&spaced.id).await.unwrap();
        assert_eq!(stored.original_name, "  holiday .png ");

        let unnamed = service.submit("", &png(4, 4)).await.unwrap();
        assert_eq!(unnamed.original_name, DEFAULT_UPLOAD_NAME);
    }

    #[test]
    fn test_image_id_shape() {
        for _ in 0..100 {
            let id = new_image_id();
            assert_eq!(id.len(), 13);
            assert!(id.starts_with("img"));
            assert!(id[3..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }
}
