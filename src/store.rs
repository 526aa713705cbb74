use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::models::Record;

/// Persistence capability used by the handlers
///
/// Implementations must make `put` an atomic per-key upsert; concurrent
/// writers to the same `id` resolve as last writer wins.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or overwrite the record keyed by `record.id`
    async fn put(&self, record: &Record) -> Result<()>;

    /// Return every stored record
    async fn scan(&self) -> Result<Vec<Record>>;

    /// Look up one record by id
    async fn get(&self, id: &str) -> Result<Option<Record>>;

    /// Verify the backing store is reachable
    async fn health_check(&self) -> Result<()>;
}

/// Ordered in-memory store for tests and offline runs
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<String, Record>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn put(&self, record: &Record) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<Record>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Record>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Store whose every operation fails, for exercising 500 paths
#[cfg(test)]
pub(crate) struct UnavailableRecordStore;

#[cfg(test)]
#[async_trait]
impl RecordStore for UnavailableRecordStore {
    async fn put(&self, _record: &Record) -> Result<()> {
        Err(anyhow::anyhow!("store unavailable"))
    }

    async fn scan(&self) -> Result<Vec<Record>> {
        Err(anyhow::anyhow!("store unavailable"))
    }

    async fn get(&self, _id: &str) -> Result<Option<Record>> {
        Err(anyhow::anyhow!("store unavailable"))
    }

    async fn health_check(&self) -> Result<()> {
        Err(anyhow::anyhow!("store unavailable"))
    }
}
