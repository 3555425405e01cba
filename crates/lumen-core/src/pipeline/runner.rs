//! Job execution: moves one record from `processing` to a terminal status.

use chrono::Utc;
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::RecordStore;

use super::processor::ImageProcessor;

/// What happened to a job, for the worker's logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    /// The run failed; carries the message stored on the record.
    Failed(String),
    /// No record exists for the identifier.
    Missing,
    /// The record had already reached `success` or `failed`.
    AlreadyTerminal,
}

/// Owns the record state transitions around [`ImageProcessor`].
pub struct ProcessingPipeline {
    store: Arc<dyn RecordStore>,
    processor: Arc<ImageProcessor>,
}

impl ProcessingPipeline {
    pub fn new(store: Arc<dyn RecordStore>, processor: Arc<ImageProcessor>) -> Self {
        Self { store, processor }
    }

    /// Process the image with identifier `id`.
    ///
    /// Stage errors end up on the record as `failed`; only store errors are
    /// returned.
    pub async fn run(&self, id: &str) -> Result<JobOutcome, StoreError> {
        let Some(record) = self.store.get(id).await? else {
            tracing::warn!("No record for job {id}; abandoning");
            return Ok(JobOutcome::Missing);
        };
        if record.is_terminal() {
            tracing::warn!("Record {id} is already {}; skipping", record.status);
            return Ok(JobOutcome::AlreadyTerminal);
        }

        let started = Utc::now();
        let result = self.processor.process(&record).await;
        let finished = Utc::now();
        let duration = (finished - started)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        match result {
            Ok(derived) => {
                self.store
                    .update(record.into_success(derived, finished, duration))
                    .await?;
                tracing::info!("Processed {id} in {duration:.3}s");
                Ok(JobOutcome::Succeeded)
            }
            Err(e) => {
                let message = e.to_string();
                self.store
                    .update(record.into_failure(message.clone(), finished, duration))
                    .await?;
                tracing::warn!("Processing {id} failed: {message}");
                Ok(JobOutcome::Failed(message))
            }
        }
    }
}
