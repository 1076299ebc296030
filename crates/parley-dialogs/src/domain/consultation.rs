//! Consultation protocol: how active dialogs claim the current turn.
//!
//! Every frame, innermost first, may return a [`Consultation`]. A higher
//! desire from an ancestor pre-empts a lower one from a descendant, which
//! is how a global "cancel" interrupts a prompt. Equal `CanProcess` claims
//! go to the innermost frame. Equal `ShouldProcess` claims are settled by
//! [`TieBreak`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use parley_core::error::EngineError;
use serde::{Deserialize, Serialize};

use super::context::DialogContext;
use super::dialog::DialogTurnResult;

/// How strongly a frame wants to handle the turn. Ordered by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationDesire {
    /// Ignored by arbitration.
    NoInterest,
    /// A legitimate fallback handler.
    CanProcess,
    /// The frame recognizes the input as something it must handle.
    ShouldProcess,
}

/// Winner among frames that all report `ShouldProcess`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The frame nearest the top wins, so a prompt can block an ancestor's
    /// interruption.
    #[default]
    Innermost,
    /// The frame nearest the root wins.
    Outermost,
}

impl FromStr for TieBreak {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "innermost" => Ok(Self::Innermost),
            "outermost" => Ok(Self::Outermost),
            other => Err(EngineError::Config(format!(
                "unknown tie-break {other:?}; expected innermost or outermost"
            ))),
        }
    }
}

/// Deferred action run when a consultation wins arbitration. The context
/// cursor points at the winning frame while it runs.
#[async_trait]
pub trait ConsultationProcessor: Send + Sync {
    /// Handles the turn.
    async fn process(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, EngineError>;
}

/// A frame's claim on the current turn.
#[derive(Clone)]
pub struct Consultation {
    /// Priority of the claim.
    pub desire: ConsultationDesire,
    /// What to run if the claim wins.
    pub processor: Arc<dyn ConsultationProcessor>,
}

impl Consultation {
    /// Creates a claim with a custom action.
    #[must_use]
    pub fn new(desire: ConsultationDesire, processor: impl ConsultationProcessor + 'static) -> Self {
        Self {
            desire,
            processor: Arc::new(processor),
        }
    }

    /// Creates a claim whose action is the claiming dialog's own
    /// `continue_dialog`.
    #[must_use]
    pub fn continue_dialog(desire: ConsultationDesire) -> Self {
        Self::new(desire, ContinueDialog)
    }
}

impl fmt::Debug for Consultation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consultation")
            .field("desire", &self.desire)
            .finish_non_exhaustive()
    }
}

/// Runs `continue_dialog` on the dialog under the cursor.
#[derive(Debug, Clone, Copy)]
pub struct ContinueDialog;

#[async_trait]
impl ConsultationProcessor for ContinueDialog {
    async fn process(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, EngineError> {
        let dialog = dc.dialog_at_cursor()?;
        dialog.continue_dialog(dc).await
    }
}

/// Returns `true` when `candidate`, reported by an ancestor of the frame
/// that reported `incumbent`, takes the turn away from it.
#[must_use]
pub fn outranks(
    candidate: ConsultationDesire,
    incumbent: ConsultationDesire,
    tie_break: TieBreak,
) -> bool {
    match candidate.cmp(&incumbent) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => {
            candidate == ConsultationDesire::ShouldProcess && tie_break == TieBreak::Outermost
        }
    }
}
