use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::record::Event;

/// Keyed store of endpoint records, keyed by their `d` tag
#[async_trait]
pub trait RelayCache: Send + Sync {
    /// Insert or replace; records without a `d` tag are ignored
    async fn set(&self, event: Event) -> Result<()>;

    async fn get(&self, relay: &str) -> Result<Option<Event>>;

    async fn remove(&self, relay: &str) -> Result<bool>;

    /// Endpoint identifiers of every cached record
    async fn keys(&self) -> Result<HashSet<String>>;

    async fn load(&self, events: Vec<Event>) -> Result<()>;

    async fn dump(&self) -> Result<Vec<Event>>;

    async fn reset(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryRelayCache {
    events: RwLock<HashMap<String, Event>>,
}

impl MemoryRelayCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(map: &mut HashMap<String, Event>, event: Event) {
        match event.d_tag() {
            Some(relay) => {
                map.insert(relay.to_owned(), event);
            }
            None => debug!(id = %event.id, "Skipping endpoint record without d tag"),
        }
    }
}

#[async_trait]
impl RelayCache for MemoryRelayCache {
    async fn set(&self, event: Event) -> Result<()> {
        Self::insert(&mut *self.events.write().await, event);
        Ok(())
    }

    async fn get(&self, relay: &str) -> Result<Option<Event>> {
        Ok(self.events.read().await.get(relay).cloned())
    }

    async fn remove(&self, relay: &str) -> Result<bool> {
        Ok(self.events.write().await.remove(relay).is_some())
    }

    async fn keys(&self) -> Result<HashSet<String>> {
        Ok(self.events.read().await.keys().cloned().collect())
    }

    async fn load(&self, events: Vec<Event>) -> Result<()> {
        let mut cache = self.events.write().await;
        for event in events {
            Self::insert(&mut cache, event);
        }
        Ok(())
    }

    async fn dump(&self) -> Result<Vec<Event>> {
        Ok(self.events.read().await.values().cloned().collect())
    }

    async fn reset(&self) -> Result<()> {
        self.events.write().await.clear();
        Ok(())
    }
}
