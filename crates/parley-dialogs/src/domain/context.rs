//! Dialog context: drives one stack for one turn.
//!
//! The context binds a registry, the turn and a stack, and owns a cursor
//! naming the frame whose dialog is currently being invoked. The dialog
//! scope exposed to a dialog is always the frame under the cursor, so a
//! dialog can only ever reach its own frame's state.

use std::sync::Arc;

use parley_core::error::EngineError;
use parley_core::state::{ScopeKind, StateMap};
use serde_json::Value;
use tracing::debug;

use super::consultation::{Consultation, ConsultationDesire, TieBreak, outranks};
use super::dialog::{Dialog, DialogReason, DialogTurnResult};
use super::dialog_set::DialogSet;
use super::stack::{DialogInstance, DialogState};
use super::turn::TurnContext;

/// Cursor-driven view over one dialog stack for the current turn.
#[derive(Debug)]
pub struct DialogContext<'a> {
    dialogs: &'a DialogSet,
    turn: &'a mut TurnContext,
    state: &'a mut DialogState,
    cursor: usize,
    tie_break: TieBreak,
}

impl<'a> DialogContext<'a> {
    /// Binds `dialogs`, `turn` and `state` with the cursor on the top frame.
    #[must_use]
    pub fn new(dialogs: &'a DialogSet, turn: &'a mut TurnContext, state: &'a mut DialogState) -> Self {
        let cursor = state.depth().saturating_sub(1);
        Self {
            dialogs,
            turn,
            state,
            cursor,
            tie_break: TieBreak::default(),
        }
    }

    /// Sets how equal `ShouldProcess` claims are settled.
    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Creates a context over a nested stack that shares this turn and
    /// arbitration policy. Used by components for their inner stack.
    pub fn nested<'b>(
        &'b mut self,
        dialogs: &'b DialogSet,
        state: &'b mut DialogState,
    ) -> DialogContext<'b> {
        let tie_break = self.tie_break;
        DialogContext::new(dialogs, &mut *self.turn, state).with_tie_break(tie_break)
    }

    /// The arbitration policy for equal `ShouldProcess` claims.
    #[must_use]
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// The current turn.
    #[must_use]
    pub fn turn(&self) -> &TurnContext {
        &*self.turn
    }

    /// The current turn, mutably (to send output or touch shared scopes).
    pub fn turn_mut(&mut self) -> &mut TurnContext {
        &mut *self.turn
    }

    /// Number of active frames.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.state.depth()
    }

    /// Active frames, top of stack last.
    #[must_use]
    pub fn frames(&self) -> &[DialogInstance] {
        &self.state.dialog_stack
    }

    /// The top frame, if any.
    #[must_use]
    pub fn active_dialog(&self) -> Option<&DialogInstance> {
        self.state.active()
    }

    /// Index of the frame under the cursor.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, index: usize) {
        self.cursor = index;
    }

    fn move_cursor_to_top(&mut self) {
        self.cursor = self.state.depth().saturating_sub(1);
    }

    /// Looks up a dialog in this level's registry.
    #[must_use]
    pub fn find_dialog(&self, id: &str) -> Option<Arc<dyn Dialog>> {
        self.dialogs.find(id)
    }

    /// The frame under the cursor.
    #[must_use]
    pub fn frame_at_cursor(&self) -> Option<&DialogInstance> {
        self.state.dialog_stack.get(self.cursor)
    }

    /// The frame under the cursor, mutably.
    pub fn frame_at_cursor_mut(&mut self) -> Option<&mut DialogInstance> {
        self.state.dialog_stack.get_mut(self.cursor)
    }

    /// Dialog scope of the frame under the cursor.
    #[must_use]
    pub fn dialog_scope(&self) -> Option<&StateMap> {
        self.frame_at_cursor().map(|frame| &frame.state)
    }

    /// Dialog scope of the frame under the cursor, mutably.
    pub fn dialog_scope_mut(&mut self) -> Option<&mut StateMap> {
        self.frame_at_cursor_mut().map(|frame| &mut frame.state)
    }

    /// Any of the three scopes. `Dialog` is `None` on an empty stack.
    pub fn scope_mut(&mut self, kind: ScopeKind) -> Option<&mut StateMap> {
        match kind {
            ScopeKind::Dialog => self.dialog_scope_mut(),
            ScopeKind::User => Some(&mut self.turn.user_state),
            ScopeKind::Conversation => Some(&mut self.turn.conversation_state),
        }
    }

    fn dialog_at(&self, index: usize) -> Result<Arc<dyn Dialog>, EngineError> {
        let frame = self
            .state
            .dialog_stack
            .get(index)
            .ok_or_else(|| EngineError::UnresolvedDialogId(format!("<no frame at {index}>")))?;
        self.find_dialog(&frame.id)
            .ok_or_else(|| EngineError::UnresolvedDialogId(frame.id.clone()))
    }

    pub(crate) fn dialog_at_cursor(&self) -> Result<Arc<dyn Dialog>, EngineError> {
        self.dialog_at(self.cursor)
    }

    /// Pushes a frame for `dialog_id` and begins it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnresolvedDialogId` if the id is not
    /// registered at this level, or whatever the dialog raises.
    pub async fn begin_dialog(
        &mut self,
        dialog_id: &str,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        let dialog = self
            .find_dialog(dialog_id)
            .ok_or_else(|| EngineError::UnresolvedDialogId(dialog_id.to_owned()))?;

        self.state.dialog_stack.push(DialogInstance::new(dialog_id));
        self.move_cursor_to_top();
        debug!(dialog_id, depth = self.stack_depth(), "frame pushed");

        dialog.begin_dialog(self, options).await
    }

    /// Routes the turn to whichever frame wins consultation, falling
    /// through to the top frame's `continue_dialog`. An empty stack yields
    /// an `Empty` outcome.
    ///
    /// # Errors
    ///
    /// Propagates unresolved frames and dialog failures.
    pub async fn continue_dialog(&mut self) -> Result<DialogTurnResult, EngineError> {
        if self.state.is_empty() {
            return Ok(DialogTurnResult::empty());
        }

        if let Some((frame, consultation)) = self.consult().await? {
            debug!(frame, desire = ?consultation.desire, "consultation won");
            self.cursor = frame;
            return consultation.processor.process(self).await;
        }

        self.move_cursor_to_top();
        let dialog = self.dialog_at_cursor()?;
        dialog.continue_dialog(self).await
    }

    /// Collects every frame's consultation, innermost first, and returns
    /// the winning frame index and claim. `None` when no frame is
    /// interested.
    ///
    /// # Errors
    ///
    /// Propagates unresolved frames and recognizer failures.
    pub async fn consult(&mut self) -> Result<Option<(usize, Consultation)>, EngineError> {
        let mut winner: Option<(usize, Consultation)> = None;

        for frame in (0..self.stack_depth()).rev() {
            let dialog = self.dialog_at(frame)?;
            self.cursor = frame;
            let Some(candidate) = dialog.consult_dialog(self).await? else {
                continue;
            };
            if candidate.desire == ConsultationDesire::NoInterest {
                continue;
            }
            let takes_over = winner.as_ref().is_none_or(|(_, incumbent)| {
                outranks(candidate.desire, incumbent.desire, self.tie_break)
            });
            if takes_over {
                winner = Some((frame, candidate));
            }
        }

        self.move_cursor_to_top();
        Ok(winner)
    }

    /// Pops the frame under the cursor and resumes its parent with
    /// `result`, or completes the stack if nothing is left. Frames above
    /// the cursor are cancelled first, top first.
    ///
    /// # Errors
    ///
    /// Propagates cleanup and parent failures.
    pub async fn end_dialog(&mut self, result: Option<Value>) -> Result<DialogTurnResult, EngineError> {
        self.cancel_frames_above_cursor().await?;
        self.end_active_dialog(DialogReason::EndCalled).await?;

        if self.state.is_empty() {
            return Ok(DialogTurnResult::complete(result));
        }

        let parent = self.dialog_at_cursor()?;
        parent
            .resume_dialog(self, DialogReason::EndCalled, result)
            .await
    }

    /// Ends the frame under the cursor and begins `dialog_id` in its place
    /// without resuming the parent. Frames above the cursor are cancelled
    /// first.
    ///
    /// # Errors
    ///
    /// Same as [`Self::begin_dialog`].
    pub async fn replace_dialog(
        &mut self,
        dialog_id: &str,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        self.cancel_frames_above_cursor().await?;
        self.end_active_dialog(DialogReason::ReplaceCalled).await?;
        self.begin_dialog(dialog_id, options).await
    }

    /// Pops every frame, top first, ending each with `CancelCalled`.
    ///
    /// # Errors
    ///
    /// Propagates cleanup failures.
    pub async fn cancel_all_dialogs(&mut self) -> Result<DialogTurnResult, EngineError> {
        if self.state.is_empty() {
            return Ok(DialogTurnResult::empty());
        }
        while !self.state.is_empty() {
            self.end_active_dialog(DialogReason::CancelCalled).await?;
        }
        Ok(DialogTurnResult::cancelled())
    }

    /// Asks the top frame to re-issue its last output.
    ///
    /// # Errors
    ///
    /// Propagates unresolved frames and output failures.
    pub async fn reprompt_dialog(&mut self) -> Result<(), EngineError> {
        let Some(top) = self.state.depth().checked_sub(1) else {
            return Ok(());
        };
        let dialog = self.dialog_at(top)?;
        let instance = &mut self.state.dialog_stack[top];
        dialog.reprompt_dialog(&mut *self.turn, instance).await
    }

    async fn cancel_frames_above_cursor(&mut self) -> Result<(), EngineError> {
        let keep = self.cursor + 1;
        while self.stack_depth() > keep {
            self.end_active_dialog(DialogReason::CancelCalled).await?;
        }
        Ok(())
    }

    async fn end_active_dialog(&mut self, reason: DialogReason) -> Result<(), EngineError> {
        let Some(mut instance) = self.state.dialog_stack.pop() else {
            return Ok(());
        };
        self.move_cursor_to_top();
        debug!(dialog_id = %instance.id, ?reason, depth = self.stack_depth(), "frame popped");

        let dialog = self
            .find_dialog(&instance.id)
            .ok_or_else(|| EngineError::UnresolvedDialogId(instance.id.clone()))?;
        dialog.end_dialog(&mut *self.turn, &mut instance, reason).await
    }
}
