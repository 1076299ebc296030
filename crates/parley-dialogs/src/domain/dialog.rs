//! The dialog lifecycle contract.

use async_trait::async_trait;
use parley_core::error::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::consultation::Consultation;
use super::context::DialogContext;
use super::stack::DialogInstance;
use super::turn::TurnContext;

/// Why a lifecycle operation is being invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogReason {
    /// The dialog was just started.
    BeginCalled,
    /// The dialog is being continued with foreign input.
    ContinueCalled,
    /// A frame ended normally.
    EndCalled,
    /// A frame was replaced by another dialog.
    ReplaceCalled,
    /// A frame was cancelled.
    CancelCalled,
}

/// Status of a turn outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogTurnStatus {
    /// No dialog was active.
    Empty,
    /// The active dialog needs more input; end the turn.
    Waiting,
    /// The stack emptied and produced a result.
    Complete,
    /// The stack was cancelled.
    Cancelled,
}

/// Outcome of a dialog or stack operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogTurnResult {
    /// Outcome status.
    pub status: DialogTurnStatus,
    /// Result value for `Complete` outcomes.
    pub result: Option<Value>,
}

impl DialogTurnResult {
    /// No dialog was active.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            status: DialogTurnStatus::Empty,
            result: None,
        }
    }

    /// More input is needed.
    #[must_use]
    pub fn waiting() -> Self {
        Self {
            status: DialogTurnStatus::Waiting,
            result: None,
        }
    }

    /// The stack completed with `result`.
    #[must_use]
    pub fn complete(result: Option<Value>) -> Self {
        Self {
            status: DialogTurnStatus::Complete,
            result,
        }
    }

    /// The stack was cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self {
            status: DialogTurnStatus::Cancelled,
            result: None,
        }
    }

    /// Returns `true` for `Waiting` outcomes.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.status == DialogTurnStatus::Waiting
    }
}

/// A unit of conversational behavior.
///
/// Dialogs are stateless objects; everything they remember between turns
/// lives in their frame's dialog scope, reached through the context
/// cursor. A dialog reports completion by calling
/// [`DialogContext::end_dialog`], which pops its frame and resumes the
/// parent.
///
/// Any operation may arrive out of the expected sequence when a foreign
/// dialog was pushed above this one. Implementations degrade to
/// re-prompting rather than failing.
#[async_trait]
pub trait Dialog: Send + Sync {
    /// Identifier under which the dialog is registered.
    fn id(&self) -> &str;

    /// Called when a frame for this dialog has just been pushed.
    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError>;

    /// Called on later turns while this dialog's frame is on top. Dialogs
    /// that never wait end immediately.
    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, EngineError> {
        dc.end_dialog(None).await
    }

    /// Called when a dialog this one pushed has ended and control returns
    /// to this frame. Defaults to ending with the child's result.
    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        dc.end_dialog(result).await
    }

    /// Re-issues the dialog's last output without evaluating input.
    async fn reprompt_dialog(
        &self,
        _turn: &mut TurnContext,
        _instance: &mut DialogInstance,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    /// Called after the frame was popped, for cleanup.
    async fn end_dialog(
        &self,
        _turn: &mut TurnContext,
        _instance: &mut DialogInstance,
        _reason: DialogReason,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    /// Declares interest in handling the current turn. `None` means no
    /// interest. Must not push or pop frames.
    async fn consult_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
    ) -> Result<Option<Consultation>, EngineError> {
        Ok(None)
    }
}
