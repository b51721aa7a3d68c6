//! Monitor cache abstraction.
//!
//! The manager talks to an [`MonitorCache`] so that a persistent backend can
//! replace the in-memory map without touching the engine.

pub mod relay;

pub use relay::{MemoryRelayCache, RelayCache};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::monitor::MonitorRecord;

/// Keyed store of monitor records, keyed by identity
#[async_trait]
pub trait MonitorCache: Send + Sync {
    /// Insert or replace the record with the same identity
    async fn set(&self, record: Arc<MonitorRecord>) -> Result<()>;

    async fn get(&self, identity: &str) -> Result<Option<Arc<MonitorRecord>>>;

    /// Returns whether a record was removed
    async fn remove(&self, identity: &str) -> Result<bool>;

    /// Identities of every cached record
    async fn keys(&self) -> Result<HashSet<String>>;

    /// Bulk upsert; the last record wins when identities repeat
    async fn load(&self, records: Vec<Arc<MonitorRecord>>) -> Result<()>;

    /// Snapshot of every cached record, unordered
    async fn dump(&self) -> Result<Vec<Arc<MonitorRecord>>>;

    async fn reset(&self) -> Result<()>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.keys().await?.is_empty())
    }
}

/// In-memory monitor cache
#[derive(Debug, Default)]
pub struct MemoryMonitorCache {
    records: RwLock<HashMap<String, Arc<MonitorRecord>>>,
}

impl MemoryMonitorCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MonitorCache for MemoryMonitorCache {
    async fn set(&self, record: Arc<MonitorRecord>) -> Result<()> {
        self.records.write().await.insert(record.identity().to_owned(), record);
        Ok(())
    }

    async fn get(&self, identity: &str) -> Result<Option<Arc<MonitorRecord>>> {
        Ok(self.records.read().await.get(identity).cloned())
    }

    async fn remove(&self, identity: &str) -> Result<bool> {
        Ok(self.records.write().await.remove(identity).is_some())
    }

    async fn keys(&self) -> Result<HashSet<String>> {
        Ok(self.records.read().await.keys().cloned().collect())
    }

    async fn load(&self, records: Vec<Arc<MonitorRecord>>) -> Result<()> {
        let mut cache = self.records.write().await;
        for record in records {
            cache.insert(record.identity().to_owned(), record);
        }
        Ok(())
    }

    async fn dump(&self) -> Result<Vec<Arc<MonitorRecord>>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn reset(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.records.read().await.is_empty())
    }
}
