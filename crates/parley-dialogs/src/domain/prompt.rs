//! Prompts: leaf dialogs that ask, recognize, validate and retry.
//!
//! A prompt keeps three values in its dialog scope: the prompt options,
//! its recognition-state blob and, inside that blob, the number of
//! answers attempted so far. Everything else is recomputed each turn.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_core::output::InputHint;
use parley_core::state::StateMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::consultation::{Consultation, ConsultationDesire, ConsultationProcessor};
use super::context::DialogContext;
use super::dialog::{Dialog, DialogReason, DialogTurnResult};
use super::recognizers::{NumberRecognizer, Recognized, Recognizer, TextRecognizer};
use super::stack::DialogInstance;
use super::turn::TurnContext;

const OPTIONS_KEY: &str = "options";
const STATE_KEY: &str = "state";
const ATTEMPT_COUNT_KEY: &str = "attempt_count";

/// What a prompt says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptOptions {
    /// Initial question.
    pub prompt: String,
    /// Sent after a rejected answer. Falls back to `prompt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_prompt: Option<String>,
}

impl PromptOptions {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            retry_prompt: None,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry_prompt: impl Into<String>) -> Self {
        self.retry_prompt = Some(retry_prompt.into());
        self
    }

    fn retry_text(&self) -> &str {
        self.retry_prompt.as_deref().unwrap_or(&self.prompt)
    }
}

/// Everything a validator may inspect.
#[derive(Debug)]
pub struct PromptValidatorContext<'a> {
    pub turn: &'a TurnContext,
    pub recognized: &'a Recognized,
    /// The recognition-state blob.
    pub state: &'a StateMap,
    pub options: &'a PromptOptions,
    /// Answers attempted so far, including the current one.
    pub attempt_count: u32,
}

/// Decides whether a recognized answer is acceptable. Errors propagate
/// out of the turn.
pub type PromptValidator =
    Arc<dyn Fn(&PromptValidatorContext<'_>) -> Result<bool, EngineError> + Send + Sync>;

/// A prompt over a pluggable recognizer.
pub struct Prompt<R> {
    id: String,
    recognizer: R,
    validator: Option<PromptValidator>,
    default_options: Option<PromptOptions>,
}

/// Asks for free text.
pub type TextPrompt = Prompt<TextRecognizer>;

/// Asks for a number.
pub type NumberPrompt = Prompt<NumberRecognizer>;

impl<R: Recognizer> Prompt<R> {
    /// Creates a prompt that accepts any recognized answer.
    #[must_use]
    pub fn new(id: impl Into<String>, recognizer: R) -> Self {
        Self {
            id: id.into(),
            recognizer,
            validator: None,
            default_options: None,
        }
    }

    /// Replaces the default "accept iff recognized" rule.
    #[must_use]
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&PromptValidatorContext<'_>) -> Result<bool, EngineError> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Options used when the prompt is begun without any.
    #[must_use]
    pub fn with_options(mut self, options: PromptOptions) -> Self {
        self.default_options = Some(options);
        self
    }

    fn resolve_options(&self, options: Option<Value>) -> Result<PromptOptions, EngineError> {
        if let Some(value) = options {
            return Ok(serde_json::from_value(value)?);
        }
        self.default_options.clone().ok_or_else(|| {
            EngineError::Serialization(format!("prompt {} was begun without options", self.id))
        })
    }

    async fn recognize(&self, dc: &DialogContext<'_>) -> Result<Recognized, EngineError> {
        let (options, state) = read_scope(dc)?;
        self.recognizer.recognize(dc.turn(), &state, &options).await
    }

    fn answer(&self, recognized: Recognized) -> Answer {
        Answer {
            prompt_id: self.id.clone(),
            validator: self.validator.clone(),
            recognized,
        }
    }
}

impl TextPrompt {
    /// A free-text prompt.
    #[must_use]
    pub fn text(id: impl Into<String>) -> Self {
        Self::new(id, TextRecognizer::new())
    }
}

impl NumberPrompt {
    /// A numeric prompt.
    #[must_use]
    pub fn number(id: impl Into<String>) -> Self {
        Self::new(id, NumberRecognizer::new())
    }
}

impl<R> fmt::Debug for Prompt<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prompt")
            .field("id", &self.id)
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

fn read_scope(dc: &DialogContext<'_>) -> Result<(PromptOptions, StateMap), EngineError> {
    let scope = dc
        .dialog_scope()
        .ok_or_else(|| EngineError::Serialization("prompt has no active frame".into()))?;
    read_frame_scope(scope)
}

fn read_frame_scope(scope: &StateMap) -> Result<(PromptOptions, StateMap), EngineError> {
    let options = scope
        .get_as::<PromptOptions>(OPTIONS_KEY)?
        .ok_or_else(|| EngineError::Serialization("prompt options missing from frame".into()))?;
    let state = scope.get_as::<StateMap>(STATE_KEY)?.unwrap_or_default();
    Ok((options, state))
}

/// A recognized answer waiting to be validated. Built once per turn so the
/// recognizer is not called again when the prompt's claim wins.
struct Answer {
    prompt_id: String,
    validator: Option<PromptValidator>,
    recognized: Recognized,
}

impl Answer {
    fn validate(&self, cx: &PromptValidatorContext<'_>) -> Result<bool, EngineError> {
        match &self.validator {
            Some(validator) => validator(cx),
            None => Ok(cx.recognized.succeeded),
        }
    }

    /// Counts the attempt, validates, then either ends the prompt's frame
    /// with the value or sends the retry text.
    async fn settle(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, EngineError> {
        let (options, mut state) = read_scope(dc)?;

        let is_message = dc.turn().activity().is_message();
        let mut attempt_count = state.get_as::<u32>(ATTEMPT_COUNT_KEY)?.unwrap_or(0);
        if is_message {
            attempt_count += 1;
            state.set_as(ATTEMPT_COUNT_KEY, &attempt_count)?;
        }

        let accepted = self.validate(&PromptValidatorContext {
            turn: dc.turn(),
            recognized: &self.recognized,
            state: &state,
            options: &options,
            attempt_count,
        })?;

        if let Some(scope) = dc.dialog_scope_mut() {
            scope.set_as(STATE_KEY, &state)?;
        }

        if accepted {
            debug!(prompt = %self.prompt_id, attempt_count, "answer accepted");
            return dc.end_dialog(self.recognized.value.clone()).await;
        }

        if is_message && !dc.turn().responded() {
            dc.turn_mut()
                .send_output(options.retry_text(), InputHint::ExpectingInput)
                .await?;
        }
        Ok(DialogTurnResult::waiting())
    }
}

#[async_trait]
impl ConsultationProcessor for Answer {
    async fn process(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, EngineError> {
        self.settle(dc).await
    }
}

#[async_trait]
impl<R: Recognizer + 'static> Dialog for Prompt<R> {
    fn id(&self) -> &str {
        &self.id
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        let options = self.resolve_options(options)?;
        let scope = dc
            .dialog_scope_mut()
            .ok_or_else(|| EngineError::Serialization("prompt has no active frame".into()))?;
        scope.set_as(OPTIONS_KEY, &options)?;
        scope.set_as(STATE_KEY, &StateMap::new())?;

        dc.turn_mut()
            .send_output(&options.prompt, InputHint::ExpectingInput)
            .await?;
        Ok(DialogTurnResult::waiting())
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, EngineError> {
        let recognized = self.recognize(dc).await?;
        self.answer(recognized).settle(dc).await
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
        _result: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        warn!(prompt = %self.id, ?reason, "prompt resumed by a foreign dialog; reprompting");
        dc.reprompt_dialog().await?;
        Ok(DialogTurnResult::waiting())
    }

    async fn reprompt_dialog(
        &self,
        turn: &mut TurnContext,
        instance: &mut DialogInstance,
    ) -> Result<(), EngineError> {
        let (options, _) = read_frame_scope(&instance.state)?;
        turn.send_output(&options.prompt, InputHint::ExpectingInput)
            .await
    }

    async fn consult_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<Option<Consultation>, EngineError> {
        let recognized = self.recognize(dc).await?;
        let desire = if recognized.succeeded && !recognized.allow_interruption {
            ConsultationDesire::ShouldProcess
        } else {
            ConsultationDesire::CanProcess
        };
        Ok(Some(Consultation::new(desire, self.answer(recognized))))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parley_core::output::InputHint;
    use parley_test_support::event;
    use serde_json::json;

    use super::*;
    use crate::domain::dialog::DialogTurnStatus;
    use crate::domain::dialog_set::DialogSet;
    use crate::domain::stack::DialogState;
    use crate::domain::testing::{Journal, JournalDialog, turn_for, turn_with};

    fn registry(prompt: impl Dialog + 'static) -> DialogSet {
        let mut set = DialogSet::new();
        set.add(prompt).unwrap();
        set
    }

    fn name_options() -> Value {
        serde_json::to_value(PromptOptions::new("Name?").with_retry("Please answer.")).unwrap()
    }

    async fn begun(set: &DialogSet) -> DialogState {
        let (mut turn, _) = turn_with(event("start"));
        let mut state = DialogState::new();
        let mut dc = DialogContext::new(set, &mut turn, &mut state);
        dc.begin_dialog("ask", Some(name_options())).await.unwrap();
        state
    }

    #[tokio::test]
    async fn test_begin_sends_prompt_and_persists_options() {
        // Arrange
        let set = registry(TextPrompt::text("ask"));
        let (mut turn, output) = turn_with(event("start"));
        let mut state = DialogState::new();
        let mut dc = DialogContext::new(&set, &mut turn, &mut state);

        // Act
        let result = dc.begin_dialog("ask", Some(name_options())).await.unwrap();

        // Assert
        assert!(result.is_waiting());
        let sent = output.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Name?");
        assert_eq!(sent[0].input_hint, InputHint::ExpectingInput);
        let scope = &state.dialog_stack[0].state;
        assert_eq!(
            scope.get_as::<PromptOptions>(OPTIONS_KEY).unwrap().unwrap().prompt,
            "Name?"
        );
        assert!(scope.get_as::<StateMap>(STATE_KEY).unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_begin_without_options_uses_defaults_or_fails() {
        let with_defaults =
            registry(TextPrompt::text("ask").with_options(PromptOptions::new("Colour?")));
        let bare = registry(TextPrompt::text("ask"));
        let (mut turn, output) = turn_for("go");
        let mut state = DialogState::new();

        DialogContext::new(&with_defaults, &mut turn, &mut state)
            .begin_dialog("ask", None)
            .await
            .unwrap();
        let mut other = DialogState::new();
        let failed = DialogContext::new(&bare, &mut turn, &mut other)
            .begin_dialog("ask", None)
            .await;

        assert_eq!(output.texts(), ["Colour?"]);
        assert!(matches!(failed, Err(EngineError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_rejected_answer_retries_and_keeps_frame() {
        // Arrange
        let set = registry(NumberPrompt::number("ask"));
        let mut state = begun(&set).await;
        let before = state.dialog_stack[0].state.get_as::<PromptOptions>(OPTIONS_KEY).unwrap();
        let (mut turn, output) = turn_for("not a number");
        let mut dc = DialogContext::new(&set, &mut turn, &mut state);

        // Act
        let result = dc.continue_dialog().await.unwrap();

        // Assert
        assert!(result.is_waiting());
        assert_eq!(dc.stack_depth(), 1);
        assert_eq!(output.texts(), ["Please answer."]);
        let scope = &state.dialog_stack[0].state;
        assert_eq!(scope.get_as::<PromptOptions>(OPTIONS_KEY).unwrap(), before);
        let blob = scope.get_as::<StateMap>(STATE_KEY).unwrap().unwrap();
        assert_eq!(blob.get_as::<u32>(ATTEMPT_COUNT_KEY).unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_retry_falls_back_to_prompt_text() {
        let set = registry(TextPrompt::text("ask"));
        let mut state = DialogState::new();
        {
            let (mut turn, _) = turn_for("x");
            DialogContext::new(&set, &mut turn, &mut state)
                .begin_dialog("ask", Some(json!({"prompt": "Colour?"})))
                .await
                .unwrap();
        }
        let (mut turn, output) = turn_for("   ");

        DialogContext::new(&set, &mut turn, &mut state)
            .continue_dialog()
            .await
            .unwrap();

        assert_eq!(output.texts(), ["Colour?"]);
    }

    #[tokio::test]
    async fn test_non_message_rejection_sends_nothing() {
        let set = registry(TextPrompt::text("ask"));
        let mut state = begun(&set).await;
        let (mut turn, output) = turn_with(event("typing"));

        let result = DialogContext::new(&set, &mut turn, &mut state)
            .continue_dialog()
            .await
            .unwrap();

        assert!(result.is_waiting());
        assert!(output.sent().is_empty());
    }

    #[tokio::test]
    async fn test_accepted_answer_completes_with_value() {
        let set = registry(NumberPrompt::number("ask"));
        let mut state = begun(&set).await;
        let (mut turn, output) = turn_for(" 42 ");

        let result = DialogContext::new(&set, &mut turn, &mut state)
            .continue_dialog()
            .await
            .unwrap();

        assert_eq!(result, DialogTurnResult::complete(Some(json!(42))));
        assert!(state.is_empty());
        assert!(output.sent().is_empty());
    }

    #[tokio::test]
    async fn test_validator_sees_attempt_count_and_can_reject() {
        // Arrange
        let prompt = NumberPrompt::number("ask").with_validator(|cx| {
            let age = cx.recognized.value.as_ref().and_then(Value::as_i64);
            Ok(cx.attempt_count >= 2 && age.is_some_and(|age| age >= 18))
        });
        let set = registry(prompt);
        let mut state = begun(&set).await;

        // Act
        let (mut first, _) = turn_for("30");
        let first = DialogContext::new(&set, &mut first, &mut state)
            .continue_dialog()
            .await
            .unwrap();
        let (mut second, _) = turn_for("30");
        let second = DialogContext::new(&set, &mut second, &mut state)
            .continue_dialog()
            .await
            .unwrap();

        // Assert
        assert_eq!(first.status, DialogTurnStatus::Waiting);
        assert_eq!(second, DialogTurnResult::complete(Some(json!(30))));
    }

    #[tokio::test]
    async fn test_validator_error_propagates() {
        let prompt = TextPrompt::text("ask")
            .with_validator(|_| Err(EngineError::Validator("lookup failed".into())));
        let set = registry(prompt);
        let mut state = begun(&set).await;
        let (mut turn, _) = turn_for("Ada");

        let result = DialogContext::new(&set, &mut turn, &mut state)
            .continue_dialog()
            .await;

        match result {
            Err(EngineError::Validator(message)) => assert_eq!(message, "lookup failed"),
            other => panic!("expected Validator, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recognized_answer_without_interruption_claims_turn() {
        // Arrange
        let set = registry(NumberPrompt::number("ask"));
        let mut state = begun(&set).await;
        let (mut number, _) = turn_for("7");
        let (mut words, _) = turn_for("help");

        // Act
        let claimed = DialogContext::new(&set, &mut number, &mut state)
            .consult()
            .await
            .unwrap();
        let fallback = DialogContext::new(&set, &mut words, &mut state)
            .consult()
            .await
            .unwrap();

        // Assert
        assert_eq!(claimed.unwrap().1.desire, ConsultationDesire::ShouldProcess);
        assert_eq!(fallback.unwrap().1.desire, ConsultationDesire::CanProcess);
    }

    #[tokio::test]
    async fn test_resume_reprompts_and_keeps_waiting() {
        // Arrange
        let journal = Journal::default();
        let mut set = registry(TextPrompt::text("ask"));
        set.add(JournalDialog::new("aside", &journal)).unwrap();
        let mut state = begun(&set).await;
        let (mut turn, output) = turn_for("what?");
        let mut dc = DialogContext::new(&set, &mut turn, &mut state);
        dc.begin_dialog("aside", None).await.unwrap();

        // Act
        let result = dc.end_dialog(None).await.unwrap();

        // Assert
        assert!(result.is_waiting());
        assert_eq!(dc.stack_depth(), 1);
        assert_eq!(output.texts(), ["Name?"]);
    }

    #[tokio::test]
    async fn test_answer_under_foreign_dialog_ends_prompt_frame_with_value() {
        // Arrange
        let journal = Journal::default();
        let mut set = registry(TextPrompt::text("ask"));
        set.add(JournalDialog::new("aside", &journal)).unwrap();
        let mut state = begun(&set).await;
        {
            let (mut turn, _) = turn_with(event("start"));
            DialogContext::new(&set, &mut turn, &mut state)
                .begin_dialog("aside", None)
                .await
                .unwrap();
        }
        journal.clear();
        let (mut turn, output) = turn_for("Ada");

        // Act
        let result = DialogContext::new(&set, &mut turn, &mut state)
            .continue_dialog()
            .await
            .unwrap();

        // Assert
        assert_eq!(result, DialogTurnResult::complete(Some(json!("Ada"))));
        assert_eq!(journal.entries(), ["end:aside:cancel_called"]);
        assert!(state.is_empty());
        assert!(output.sent().is_empty());
    }

    #[derive(Clone, Default)]
    struct CountingRecognizer(Arc<AtomicUsize>);

    #[async_trait]
    impl Recognizer for CountingRecognizer {
        async fn recognize(
            &self,
            turn: &TurnContext,
            state: &StateMap,
            options: &PromptOptions,
        ) -> Result<Recognized, EngineError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            TextRecognizer::new().recognize(turn, state, options).await
        }
    }

    #[tokio::test]
    async fn test_winning_claim_reuses_consultation_recognition() {
        // Arrange
        let calls = CountingRecognizer::default();
        let set = registry(Prompt::new("ask", calls.clone()));
        let mut state = begun(&set).await;
        let (mut turn, _) = turn_for("Ada");

        // Act
        let result = DialogContext::new(&set, &mut turn, &mut state)
            .continue_dialog()
            .await
            .unwrap();

        // Assert
        assert_eq!(result, DialogTurnResult::complete(Some(json!("Ada"))));
        assert_eq!(calls.0.load(Ordering::SeqCst), 1);
    }

    struct BrokenRecognizer;

    #[async_trait]
    impl Recognizer for BrokenRecognizer {
        async fn recognize(
            &self,
            _turn: &TurnContext,
            _state: &StateMap,
            _options: &PromptOptions,
        ) -> Result<Recognized, EngineError> {
            Err(EngineError::Recognizer("model unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_recognizer_failure_propagates_from_consultation() {
        let set = registry(Prompt::new("ask", BrokenRecognizer));
        let mut state = DialogState {
            dialog_stack: vec![DialogInstance::new("ask")],
        };
        state.dialog_stack[0]
            .state
            .set_as(OPTIONS_KEY, &PromptOptions::new("Name?"))
            .unwrap();
        let (mut turn, _) = turn_for("Ada");

        let result = DialogContext::new(&set, &mut turn, &mut state)
            .continue_dialog()
            .await;

        assert!(matches!(result, Err(EngineError::Recognizer(_))));
    }
}
