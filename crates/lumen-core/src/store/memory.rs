//! In-memory record store, for tests and short-lived embedding.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{newest_first, RecordStore};
use crate::error::StoreError;
use crate::types::ImageRecord;

/// In-process record store. Contents are lost with the process.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ImageRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, record: ImageRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ImageRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update(&self, record: ImageRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(StoreError::Missing(record.id)),
        }
    }

    async fn list(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let records = self.records.read().await.values().cloned().collect();
        Ok(newest_first(records))
    }
}
