//! Storage port.
//!
//! The engine only needs a key-value load/save contract. Items carry a
//! version for optimistic concurrency so that two turns for the same
//! conversation cannot silently overwrite each other.

use async_trait::async_trait;

use crate::activity::Activity;
use crate::error::EngineError;

/// Stored representation of one persisted value.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    /// Storage key.
    pub key: String,
    /// Persisted value.
    pub value: serde_json::Value,
    /// Version the item had when it was loaded; `0` for new items.
    pub version: i64,
}

impl StoredItem {
    /// Creates an item that has never been saved.
    #[must_use]
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
            version: 0,
        }
    }
}

/// Key-value storage used to persist dialog stacks and state scopes.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Loads the item stored under `key`, or `None` if nothing was saved.
    async fn load(&self, key: &str) -> Result<Option<StoredItem>, EngineError>;

    /// Saves a batch of items with optimistic concurrency.
    ///
    /// Each item's `version` must equal the version currently stored
    /// (`0` when absent). Implementations check every item before writing
    /// any, and bump the stored version by one on success.
    async fn save(&self, items: &[StoredItem]) -> Result<(), EngineError>;
}

/// Storage keys for the state a single turn touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateKeys {
    /// Key of the persisted dialog stack.
    pub dialog_state: String,
    /// Key of the conversation scope.
    pub conversation: String,
    /// Key of the user scope.
    pub user: String,
}

impl StateKeys {
    /// Derives the keys from the activity's addressing fields.
    #[must_use]
    pub fn for_activity(activity: &Activity) -> Self {
        let conversation_root = format!(
            "{}/conversations/{}",
            activity.channel_id, activity.conversation_id
        );
        Self {
            dialog_state: format!("{conversation_root}/dialog-state"),
            conversation: format!("{conversation_root}/state"),
            user: format!("{}/users/{}/state", activity.channel_id, activity.from_id),
        }
    }
}
