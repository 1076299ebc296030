//! Test storages — mock `Storage` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_core::storage::{Storage, StoredItem};

/// A versioned in-memory storage that records every `save` batch.
///
/// Honors the optimistic concurrency contract so that tests can provoke
/// conflicts by seeding an item at a newer version.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    items: Mutex<HashMap<String, (serde_json::Value, i64)>>,
    saved: Mutex<Vec<Vec<StoredItem>>>,
}

impl RecordingStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key` at `version` without recording a save.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, key: &str, value: serde_json::Value, version: i64) {
        self.items
            .lock()
            .unwrap()
            .insert(key.to_owned(), (value, version));
    }

    /// Returns a snapshot of all saved batches.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved_batches(&self) -> Vec<Vec<StoredItem>> {
        self.saved.lock().unwrap().clone()
    }

    /// Returns the current value and version stored under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn current(&self, key: &str) -> Option<(serde_json::Value, i64)> {
        self.items.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn load(&self, key: &str) -> Result<Option<StoredItem>, EngineError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(key)
            .map(|(value, version)| StoredItem {
                key: key.to_owned(),
                value: value.clone(),
                version: *version,
            }))
    }

    async fn save(&self, items: &[StoredItem]) -> Result<(), EngineError> {
        let mut stored = self.items.lock().unwrap();
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
        self.saved.lock().unwrap().push(items.to_vec());
        Ok(())
    }
}

/// A storage that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn load(&self, _key: &str) -> Result<Option<StoredItem>, EngineError> {
        Err(EngineError::Infrastructure("connection refused".into()))
    }

    async fn save(&self, _items: &[StoredItem]) -> Result<(), EngineError> {
        Err(EngineError::Infrastructure("connection refused".into()))
    }
}
