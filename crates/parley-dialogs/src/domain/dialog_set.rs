//! Dialog registry for one level of the dialog tree.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parley_core::error::EngineError;

use super::dialog::Dialog;

/// Dialogs addressable by id. The first registered id is the default entry
/// point of a component.
#[derive(Clone, Default)]
pub struct DialogSet {
    dialogs: HashMap<String, Arc<dyn Dialog>>,
    order: Vec<String>,
}

impl DialogSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `dialog` under its own id.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DuplicateDialogId` if the id is taken.
    pub fn add(&mut self, dialog: impl Dialog + 'static) -> Result<(), EngineError> {
        self.add_shared(Arc::new(dialog))
    }

    /// Registers an already shared dialog.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DuplicateDialogId` if the id is taken.
    pub fn add_shared(&mut self, dialog: Arc<dyn Dialog>) -> Result<(), EngineError> {
        let id = dialog.id().to_owned();
        if self.dialogs.contains_key(&id) {
            return Err(EngineError::DuplicateDialogId(id));
        }
        self.order.push(id.clone());
        self.dialogs.insert(id, dialog);
        Ok(())
    }

    /// Looks up a dialog by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<Arc<dyn Dialog>> {
        self.dialogs.get(id).cloned()
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.dialogs.contains_key(id)
    }

    /// The first registered id.
    #[must_use]
    pub fn first_id(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of registered dialogs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl fmt::Debug for DialogSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.order).finish()
    }
}
