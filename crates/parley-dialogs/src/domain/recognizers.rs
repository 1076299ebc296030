//! Input recognition port and the built-in recognizers.

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_core::state::StateMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::prompt::PromptOptions;
use super::turn::TurnContext;

/// Result of recognizing the current activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recognized {
    /// Whether the input was understood.
    pub succeeded: bool,
    /// The recognized value, when `succeeded`.
    pub value: Option<Value>,
    /// Whether ancestors may still interrupt on this input. When `false`
    /// a successful recognition claims the turn with `ShouldProcess`.
    pub allow_interruption: bool,
}

impl Recognized {
    /// Input was not understood.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            succeeded: false,
            value: None,
            allow_interruption: true,
        }
    }

    /// Input was understood as `value`.
    #[must_use]
    pub fn value(value: Value, allow_interruption: bool) -> Self {
        Self {
            succeeded: true,
            value: Some(value),
            allow_interruption,
        }
    }
}

/// Interprets the turn's activity for a prompt.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognizes the current activity. `state` is the prompt's
    /// recognition-state blob.
    async fn recognize(
        &self,
        turn: &TurnContext,
        state: &StateMap,
        options: &PromptOptions,
    ) -> Result<Recognized, EngineError>;
}

/// Accepts any non-blank message text.
#[derive(Debug, Clone, Copy)]
pub struct TextRecognizer {
    allow_interruption: bool,
}

impl TextRecognizer {
    /// Free text is permissive, so ancestors may interrupt by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allow_interruption: true,
        }
    }

    #[must_use]
    pub fn with_allow_interruption(mut self, allow: bool) -> Self {
        self.allow_interruption = allow;
        self
    }
}

impl Default for TextRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recognizer for TextRecognizer {
    async fn recognize(
        &self,
        turn: &TurnContext,
        _state: &StateMap,
        _options: &PromptOptions,
    ) -> Result<Recognized, EngineError> {
        let activity = turn.activity();
        if !activity.is_message() {
            return Ok(Recognized::failed());
        }
        Ok(match activity.trimmed_text() {
            Some(text) if !text.is_empty() => {
                Recognized::value(Value::String(text.to_owned()), self.allow_interruption)
            }
            _ => Recognized::failed(),
        })
    }
}

/// Parses message text as a number. Integers stay integers.
#[derive(Debug, Clone, Copy)]
pub struct NumberRecognizer {
    allow_interruption: bool,
}

impl NumberRecognizer {
    /// A parsed number is unambiguous, so interruption is off by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allow_interruption: false,
        }
    }

    #[must_use]
    pub fn with_allow_interruption(mut self, allow: bool) -> Self {
        self.allow_interruption = allow;
        self
    }

    fn parse(text: &str) -> Option<Value> {
        if let Ok(int) = text.parse::<i64>() {
            return Some(Value::from(int));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
    }
}

impl Default for NumberRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recognizer for NumberRecognizer {
    async fn recognize(
        &self,
        turn: &TurnContext,
        _state: &StateMap,
        _options: &PromptOptions,
    ) -> Result<Recognized, EngineError> {
        let activity = turn.activity();
        if !activity.is_message() {
            return Ok(Recognized::failed());
        }
        Ok(activity
            .trimmed_text()
            .and_then(Self::parse)
            .map_or_else(Recognized::failed, |value| {
                Recognized::value(value, self.allow_interruption)
            }))
    }
}
