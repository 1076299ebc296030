//! Engine error types.

use thiserror::Error;

/// Top-level error type for turn processing.
///
/// Structural violations and collaborator failures surface through this
/// type. Expected edge conditions (continuing an empty stack, a leaf dialog
/// being resumed unexpectedly) are not errors and never produce one.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A frame or a `begin_dialog` call referenced an id that is not
    /// registered at that level of the dialog tree.
    #[error("dialog not found: {0}")]
    UnresolvedDialogId(String),

    /// A dialog id was registered twice in the same dialog set.
    #[error("duplicate dialog id: {0}")]
    DuplicateDialogId(String),

    /// A prompt validator failed. Never retried by the engine.
    #[error("validator error: {0}")]
    Validator(String),

    /// A recognizer collaborator failed.
    #[error("recognizer error: {0}")]
    Recognizer(String),

    /// Optimistic concurrency conflict on a stored item.
    #[error("concurrency conflict on {key}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The storage key that had the conflict.
        key: String,
        /// The version the caller loaded.
        expected: i64,
        /// The version found in storage.
        actual: i64,
    },

    /// Frame or scope state could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A storage or output collaborator failed.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// A configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
