//! Output port used by dialogs to talk back to the user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Tells the transport what kind of reply the bot expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputHint {
    /// The bot is waiting for an answer to a question.
    ExpectingInput,
    /// The bot is passively ready for input.
    AcceptingInput,
    /// Informational output; input is not expected.
    IgnoringInput,
}

/// A single outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// Message text.
    pub text: String,
    /// Expected-input hint for the transport.
    pub input_hint: InputHint,
}

impl Output {
    /// Creates a new output.
    #[must_use]
    pub fn new(text: impl Into<String>, input_hint: InputHint) -> Self {
        Self {
            text: text.into(),
            input_hint,
        }
    }
}

/// Delivers outbound messages to the user. Provided by the transport.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Sends one output.
    async fn send(&self, output: Output) -> Result<(), EngineError>;
}
