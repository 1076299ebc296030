//! Per-turn context passed explicitly to every dialog operation.

use std::fmt;
use std::sync::Arc;

use parley_core::activity::Activity;
use parley_core::error::EngineError;
use parley_core::output::{InputHint, Output, OutputSink};
use parley_core::state::StateMap;

/// Everything a dialog may touch during one turn besides its own frame:
/// the inbound activity, the output port and the user and conversation
/// scopes.
///
/// Scope mutations live here until the turn handler commits them, so a
/// failed turn leaves persisted state untouched.
pub struct TurnContext {
    activity: Activity,
    output: Arc<dyn OutputSink>,
    /// User scope, keyed by the sender's identity.
    pub user_state: StateMap,
    /// Conversation scope, keyed by the conversation's identity.
    pub conversation_state: StateMap,
    responded: bool,
}

impl TurnContext {
    /// Creates a turn with empty user and conversation scopes.
    #[must_use]
    pub fn new(activity: Activity, output: Arc<dyn OutputSink>) -> Self {
        Self::with_state(activity, output, StateMap::new(), StateMap::new())
    }

    /// Creates a turn over previously loaded scopes.
    #[must_use]
    pub fn with_state(
        activity: Activity,
        output: Arc<dyn OutputSink>,
        user_state: StateMap,
        conversation_state: StateMap,
    ) -> Self {
        Self {
            activity,
            output,
            user_state,
            conversation_state,
            responded: false,
        }
    }

    /// The inbound activity.
    #[must_use]
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Whether anything has been sent to the user this turn.
    #[must_use]
    pub fn responded(&self) -> bool {
        self.responded
    }

    /// Sends a message through the output port.
    ///
    /// # Errors
    ///
    /// Propagates the output collaborator's failure.
    pub async fn send_output(
        &mut self,
        text: &str,
        input_hint: InputHint,
    ) -> Result<(), EngineError> {
        self.output.send(Output::new(text, input_hint)).await?;
        self.responded = true;
        Ok(())
    }

    /// Consumes the turn, returning the user and conversation scopes.
    #[must_use]
    pub fn into_scopes(self) -> (StateMap, StateMap) {
        (self.user_state, self.conversation_state)
    }
}

impl fmt::Debug for TurnContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnContext")
            .field("activity", &self.activity)
            .field("user_state", &self.user_state)
            .field("conversation_state", &self.conversation_state)
            .field("responded", &self.responded)
            .finish_non_exhaustive()
    }
}
