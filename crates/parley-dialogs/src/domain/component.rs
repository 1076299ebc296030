//! Component dialogs: a private registry driven as an inner stack.
//!
//! The inner stack lives in the component frame's dialog scope and is
//! loaded into a nested context for the duration of each call, then
//! written back. Inner frames never appear on the outer stack.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parley_core::error::EngineError;
use serde_json::Value;
use tracing::{debug, warn};

use super::consultation::{Consultation, ConsultationProcessor};
use super::context::DialogContext;
use super::dialog::{Dialog, DialogReason, DialogTurnResult};
use super::dialog_set::DialogSet;
use super::stack::{DialogInstance, DialogState};
use super::turn::TurnContext;

/// Component-local cleanup and reprompt behavior.
#[async_trait]
pub trait ComponentHooks: Send + Sync {
    /// Runs after the inner stack has been cancelled or completed.
    async fn on_end(
        &self,
        _turn: &mut TurnContext,
        _instance: &mut DialogInstance,
        _reason: DialogReason,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    /// Runs after the inner top frame has reprompted.
    async fn on_reprompt(
        &self,
        _turn: &mut TurnContext,
        _instance: &mut DialogInstance,
    ) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ComponentHooks for NoHooks {}

/// A dialog composed of other dialogs.
#[derive(Clone)]
pub struct ComponentDialog {
    id: String,
    dialogs: Arc<DialogSet>,
    initial_dialog_id: Option<String>,
    hooks: Arc<dyn ComponentHooks>,
}

impl ComponentDialog {
    /// Creates an empty component.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dialogs: Arc::new(DialogSet::new()),
            initial_dialog_id: None,
            hooks: Arc::new(NoHooks),
        }
    }

    /// Registers a dialog in the component's private registry.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::DuplicateDialogId` if the id is taken inside
    /// this component.
    pub fn add_dialog(mut self, dialog: impl Dialog + 'static) -> Result<Self, EngineError> {
        Arc::make_mut(&mut self.dialogs).add(dialog)?;
        Ok(self)
    }

    /// Overrides the entry dialog, which defaults to the first registered.
    #[must_use]
    pub fn with_initial_dialog(mut self, id: impl Into<String>) -> Self {
        self.initial_dialog_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: impl ComponentHooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// The private registry.
    #[must_use]
    pub fn dialogs(&self) -> &DialogSet {
        &self.dialogs
    }

    fn entry_id(&self) -> Result<&str, EngineError> {
        self.initial_dialog_id
            .as_deref()
            .or_else(|| self.dialogs.first_id())
            .ok_or_else(|| EngineError::UnresolvedDialogId(format!("{}/<entry>", self.id)))
    }

    async fn settle(
        &self,
        dc: &mut DialogContext<'_>,
        inner: DialogTurnResult,
    ) -> Result<DialogTurnResult, EngineError> {
        if inner.is_waiting() {
            return Ok(inner);
        }
        debug!(component = %self.id, status = ?inner.status, "inner stack finished");
        end_component(dc, inner.result).await
    }
}

impl fmt::Debug for ComponentDialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDialog")
            .field("id", &self.id)
            .field("dialogs", &self.dialogs)
            .field("initial_dialog_id", &self.initial_dialog_id)
            .finish_non_exhaustive()
    }
}

/// Ends the component frame under the cursor and resumes its parent.
async fn end_component(
    dc: &mut DialogContext<'_>,
    result: Option<Value>,
) -> Result<DialogTurnResult, EngineError> {
    dc.end_dialog(result).await
}

fn load_inner(dc: &DialogContext<'_>) -> Result<DialogState, EngineError> {
    let frame = dc
        .frame_at_cursor()
        .ok_or_else(|| EngineError::Serialization("component has no active frame".into()))?;
    DialogState::load_nested(frame)
}

fn store_inner(dc: &mut DialogContext<'_>, inner: &DialogState) -> Result<(), EngineError> {
    let frame = dc
        .frame_at_cursor_mut()
        .ok_or_else(|| EngineError::Serialization("component has no active frame".into()))?;
    inner.store_nested(frame)
}

/// Replays an inner consultation winner inside the component's stack.
struct InnerStackProcessor {
    component_id: String,
    dialogs: Arc<DialogSet>,
    inner_frame: usize,
    inner: Consultation,
}

#[async_trait]
impl ConsultationProcessor for InnerStackProcessor {
    async fn process(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, EngineError> {
        let mut inner_state = load_inner(dc)?;
        let outcome = {
            let mut inner = dc.nested(&self.dialogs, &mut inner_state);
            inner.set_cursor(self.inner_frame);
            self.inner.processor.process(&mut inner).await?
        };
        store_inner(dc, &inner_state)?;

        if outcome.is_waiting() {
            return Ok(outcome);
        }
        if dc.cursor() + 1 != dc.stack_depth() {
            warn!(
                component = %self.component_id,
                "inner stack finished under a foreign dialog; cancelling it"
            );
        }
        end_component(dc, outcome.result).await
    }
}

#[async_trait]
impl Dialog for ComponentDialog {
    fn id(&self) -> &str {
        &self.id
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        let entry = self.entry_id()?.to_owned();
        let mut inner_state = DialogState::new();
        let outcome = {
            let mut inner = dc.nested(&self.dialogs, &mut inner_state);
            inner.begin_dialog(&entry, options).await?
        };
        store_inner(dc, &inner_state)?;
        self.settle(dc, outcome).await
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, EngineError> {
        let mut inner_state = load_inner(dc)?;
        let outcome = {
            let mut inner = dc.nested(&self.dialogs, &mut inner_state);
            inner.continue_dialog().await?
        };
        store_inner(dc, &inner_state)?;
        self.settle(dc, outcome).await
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        if load_inner(dc)?.is_empty() {
            return end_component(dc, result).await;
        }
        debug!(component = %self.id, ?reason, "resumed above inner stack; reprompting");
        dc.reprompt_dialog().await?;
        Ok(DialogTurnResult::waiting())
    }

    async fn reprompt_dialog(
        &self,
        turn: &mut TurnContext,
        instance: &mut DialogInstance,
    ) -> Result<(), EngineError> {
        let mut inner_state = DialogState::load_nested(instance)?;
        DialogContext::new(&self.dialogs, turn, &mut inner_state)
            .reprompt_dialog()
            .await?;
        inner_state.store_nested(instance)?;
        self.hooks.on_reprompt(turn, instance).await
    }

    async fn end_dialog(
        &self,
        turn: &mut TurnContext,
        instance: &mut DialogInstance,
        reason: DialogReason,
    ) -> Result<(), EngineError> {
        if reason == DialogReason::CancelCalled {
            let mut inner_state = DialogState::load_nested(instance)?;
            DialogContext::new(&self.dialogs, turn, &mut inner_state)
                .cancel_all_dialogs()
                .await?;
            inner_state.store_nested(instance)?;
        }
        self.hooks.on_end(turn, instance, reason).await
    }

    async fn consult_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<Option<Consultation>, EngineError> {
        let mut inner_state = load_inner(dc)?;
        let winner = {
            let mut inner = dc.nested(&self.dialogs, &mut inner_state);
            inner.consult().await?
        };
        Ok(winner.map(|(inner_frame, inner)| {
            Consultation::new(
                inner.desire,
                InnerStackProcessor {
                    component_id: self.id.clone(),
                    dialogs: Arc::clone(&self.dialogs),
                    inner_frame,
                    inner,
                },
            )
        }))
    }
}
