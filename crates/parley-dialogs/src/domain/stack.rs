//! Persisted dialog stack.
//!
//! Frames hold their dialog id and their private dialog scope. A component
//! stores its inner stack inside its own frame's scope under
//! [`NESTED_STACK_KEY`], so a stack of stacks serializes as a tree of plain
//! values with no cross references.

use parley_core::error::EngineError;
use parley_core::state::{StateMap, StateScope};
use serde::{Deserialize, Serialize};

/// Dialog-scope key under which a component keeps its inner stack.
pub const NESTED_STACK_KEY: &str = "dialogs";

/// One frame of the dialog stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogInstance {
    /// Id of the dialog, resolved against the registry of the stack's level.
    pub id: String,
    /// The frame's private dialog scope.
    #[serde(default)]
    pub state: StateMap,
}

impl DialogInstance {
    /// Creates a frame with an empty dialog scope.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: StateMap::new(),
        }
    }
}

/// The stack of active dialogs, top of stack last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogState {
    /// Active frames, most recently pushed last.
    #[serde(default)]
    pub dialog_stack: Vec<DialogInstance>,
}

impl DialogState {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.dialog_stack.len()
    }

    /// Returns `true` when no dialog is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dialog_stack.is_empty()
    }

    /// The top frame, if any.
    #[must_use]
    pub fn active(&self) -> Option<&DialogInstance> {
        self.dialog_stack.last()
    }

    /// Reads the nested stack a component stored in `instance`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Serialization` if the stored value is not a
    /// dialog stack.
    pub fn load_nested(instance: &DialogInstance) -> Result<Self, EngineError> {
        Ok(instance
            .state
            .get_as::<Self>(NESTED_STACK_KEY)?
            .unwrap_or_default())
    }

    /// Writes this stack into `instance` as its nested stack.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Serialization` if the stack cannot be encoded.
    pub fn store_nested(&self, instance: &mut DialogInstance) -> Result<(), EngineError> {
        instance.state.set_as(NESTED_STACK_KEY, self)
    }

    /// Returns `true` if `instance` carries a non-empty nested stack.
    #[must_use]
    pub fn has_nested(instance: &DialogInstance) -> bool {
        instance.state.has(NESTED_STACK_KEY)
            && Self::load_nested(instance).is_ok_and(|nested| !nested.is_empty())
    }
}
