//! In-memory storage adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_core::storage::{Storage, StoredItem};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

/// Versioned key-value map held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, (Value, i64)>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<StoredItem>, EngineError> {
        let items = self.items.read().await;
        Ok(items.get(key).map(|(value, version)| StoredItem {
            key: key.to_owned(),
            value: value.clone(),
            version: *version,
        }))
    }

    async fn save(&self, items: &[StoredItem]) -> Result<(), EngineError> {
        let mut stored = self.items.write().await;

        for item in items {
            let actual = stored.get(&item.key).map_or(0, |(_, version)| *version);
            if actual != item.version {
                return Err(EngineError::ConcurrencyConflict {
                    key: item.key.clone(),
                    expected: item.version,
                    actual,
                });
            }
        }

        for item in items {
            stored.insert(item.key.clone(), (item.value.clone(), item.version + 1));
        }
        debug!(count = items.len(), "items saved");
        Ok(())
    }
}
