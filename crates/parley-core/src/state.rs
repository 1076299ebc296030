//! Scoped key-value state.
//!
//! Three scopes exist per turn: the dialog scope (private to one stack
//! frame and stored inside it), the user scope and the conversation scope.
//! Each is an independent `StateMap` persisted under its own storage key.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EngineError;

/// Named lifetime of a state scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Private to the frame the cursor points at.
    Dialog,
    /// Keyed by user identity, survives across conversations.
    User,
    /// Keyed by conversation identity, survives across turns.
    Conversation,
}

/// Mapping contract over named values.
///
/// An absent key is distinct from a key holding `null` or `false`.
pub trait StateScope {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<&Value>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: Value);

    /// Removes `key`. Removing an absent key is a no-op.
    fn delete(&mut self, key: &str);

    /// Returns `true` if a value (including `null`) is stored under `key`.
    fn has(&self, key: &str) -> bool;
}

/// JSON-backed state scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMap(Map<String, Value>);

impl StateMap {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserializes the value under `key` into `T`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Serialization` if the stored value does not
    /// have the shape of `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, EngineError> {
        self.0
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(EngineError::from)
    }

    /// Serializes `value` and stores it under `key`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Serialization` if `value` cannot be
    /// represented as JSON.
    pub fn set_as<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), EngineError> {
        self.0.insert(key.to_owned(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the scope into a JSON object.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Builds a scope from a JSON value. Non-object values yield an empty
    /// scope.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

impl StateScope for StateMap {
    fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_owned(), value);
    }

    fn delete(&mut self, key: &str) {
        self.0.remove(key);
    }

    fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}
