//! Runs one turn against a root dialog.

use parley_core::error::EngineError;
use tracing::info;

use super::config::EngineConfig;
use crate::domain::context::DialogContext;
use crate::domain::dialog::{Dialog, DialogTurnResult, DialogTurnStatus};
use crate::domain::dialog_set::DialogSet;
use crate::domain::stack::DialogState;
use crate::domain::turn::TurnContext;

/// Owns the top-level registry and starts the root dialog whenever the
/// stack is empty.
#[derive(Debug, Clone)]
pub struct DialogManager {
    root_dialog_id: String,
    dialogs: DialogSet,
    config: EngineConfig,
}

impl DialogManager {
    /// Creates a manager whose root is `root`.
    ///
    /// # Errors
    ///
    /// Never fails for a fresh registry; kept fallible so registration
    /// errors surface the same way as in [`Self::add_dialog`].
    pub fn new(root: impl Dialog + 'static) -> Result<Self, EngineError> {
        let root_dialog_id = root.id().to_owned();
        let mut dialogs = DialogSet::new();
        dialogs.add(root)?;
        Ok(Self {
            root_dialog_id,
            dialogs,
            config: EngineConfig::default(),
        })
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers another top-level dialog, for example one the root begins.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DuplicateDialogId` if the id is taken.
    pub fn add_dialog(mut self, dialog: impl Dialog + 'static) -> Result<Self, EngineError> {
        self.dialogs.add(dialog)?;
        Ok(self)
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn root_dialog_id(&self) -> &str {
        &self.root_dialog_id
    }

    /// The top-level registry.
    #[must_use]
    pub fn dialogs(&self) -> &DialogSet {
        &self.dialogs
    }

    fn context<'a>(
        &'a self,
        turn: &'a mut TurnContext,
        state: &'a mut DialogState,
    ) -> DialogContext<'a> {
        DialogContext::new(&self.dialogs, turn, state)
            .with_tie_break(self.config.should_process_tie_break)
    }

    /// Continues the active stack, or begins the root dialog if nothing is
    /// active.
    ///
    /// # Errors
    ///
    /// Propagates unresolved dialog ids and dialog failures.
    pub async fn run_turn(
        &self,
        turn: &mut TurnContext,
        state: &mut DialogState,
    ) -> Result<DialogTurnResult, EngineError> {
        let mut dc = self.context(turn, state);
        let result = dc.continue_dialog().await?;
        if result.status != DialogTurnStatus::Empty {
            return Ok(result);
        }
        info!(root = %self.root_dialog_id, "no active dialog; starting root");
        dc.begin_dialog(&self.root_dialog_id, None).await
    }

    /// Cancels every active dialog.
    ///
    /// # Errors
    ///
    /// Propagates cleanup failures.
    pub async fn cancel_all_dialogs(
        &self,
        turn: &mut TurnContext,
        state: &mut DialogState,
    ) -> Result<DialogTurnResult, EngineError> {
        self.context(turn, state).cancel_all_dialogs().await
    }
}
