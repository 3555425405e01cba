//! Keyed record storage.
//!
//! The pipeline only needs `create`, `get` and whole-record `update`; every
//! state transition is a single `update`, so readers never observe a record
//! with some derived fields written and others missing.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::ImageRecord;

/// Storage for image records keyed by identifier.
///
/// Uses `async_trait` so the store can live behind `Arc<dyn RecordStore>`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record. Fails if the identifier is taken.
    async fn create(&self, record: ImageRecord) -> Result<(), StoreError>;

    /// Fetch a record by identifier.
    async fn get(&self, id: &str) -> Result<Option<ImageRecord>, StoreError>;

    /// Replace an existing record as a whole.
    async fn update(&self, record: ImageRecord) -> Result<(), StoreError>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<ImageRecord>, StoreError>;
}

/// Order records newest first, breaking ties by identifier.
///
/// `SqliteStore` applies the same order in SQL.
pub(crate) fn newest_first(mut records: Vec<ImageRecord>) -> Vec<ImageRecord> {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    records
}
