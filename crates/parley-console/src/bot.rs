//! The sample dialog tree the console drives.
//!
//! ```text
//! main                       global "help" and "cancel"
//! └── onboarding (component)
//!     └── profile (waterfall)
//!         ├── askName (text prompt)
//!         └── askAge  (number prompt, 0..=130)
//! ```

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_core::output::InputHint;
use parley_core::state::ScopeKind;
use parley_dialogs::application::config::EngineConfig;
use parley_dialogs::application::dialog_manager::DialogManager;
use parley_dialogs::domain::component::ComponentDialog;
use parley_dialogs::domain::consultation::{
    Consultation, ConsultationDesire, ConsultationProcessor,
};
use parley_dialogs::domain::context::DialogContext;
use parley_dialogs::domain::dialog::{Dialog, DialogReason, DialogTurnResult};
use parley_dialogs::domain::prompt::{NumberPrompt, PromptOptions, TextPrompt};
use parley_dialogs::domain::waterfall::{
    BeginDialogStep, StepInfo, StepOutcome, StoreResultStep, WaterfallDialog, WaterfallStep,
};
use serde_json::{Value, json};
use tracing::info;

pub const MAIN_DIALOG: &str = "main";
pub const ONBOARDING_DIALOG: &str = "onboarding";

pub const WELCOME_TEXT: &str = "Welcome! Type 'help' or 'cancel' at any time.";
pub const HELP_TEXT: &str = "I'm collecting a short profile. Answer the question, or type 'cancel' to start over.";
pub const CANCELLED_TEXT: &str = "Cancelled. Say anything to start again.";
pub const NAME_PROMPT: &str = "What's your name?";
pub const NAME_RETRY: &str = "Please tell me your name.";
pub const AGE_PROMPT: &str = "How old are you?";
pub const AGE_RETRY: &str = "Please enter your age as a number between 0 and 130.";

const MAX_AGE: i64 = 130;

/// Builds the manager for the sample tree.
///
/// # Errors
///
/// Returns `EngineError::DuplicateDialogId` if the tree is mis-wired.
pub fn build_manager(config: EngineConfig) -> Result<DialogManager, EngineError> {
    Ok(DialogManager::new(MainDialog)?
        .add_dialog(onboarding()?)?
        .with_config(config))
}

fn onboarding() -> Result<ComponentDialog, EngineError> {
    let profile = WaterfallDialog::new("profile")
        .add_step(BeginDialogStep::new("askName"))
        .add_step(StoreResultStep::new(ScopeKind::User, "name"))
        .add_step(BeginDialogStep::new("askAge"))
        .add_step(StoreResultStep::new(ScopeKind::User, "age"))
        .add_step(Summarize);

    let ask_name = TextPrompt::text("askName")
        .with_options(PromptOptions::new(NAME_PROMPT).with_retry(NAME_RETRY));

    let ask_age = NumberPrompt::number("askAge")
        .with_options(PromptOptions::new(AGE_PROMPT).with_retry(AGE_RETRY))
        .with_validator(|cx| {
            Ok(cx
                .recognized
                .value
                .as_ref()
                .and_then(Value::as_i64)
                .is_some_and(|age| (0..=MAX_AGE).contains(&age)))
        });

    ComponentDialog::new(ONBOARDING_DIALOG)
        .add_dialog(profile)?
        .add_dialog(ask_name)?
        .add_dialog(ask_age)
}

/// Final waterfall step: collects the answers into one profile value.
struct Summarize;

#[async_trait]
impl WaterfallStep for Summarize {
    async fn run(
        &self,
        dc: &mut DialogContext<'_>,
        _step: &StepInfo,
    ) -> Result<StepOutcome, EngineError> {
        let user = &dc.turn().user_state;
        let profile = json!({
            "name": user.get_as::<String>("name")?,
            "age": user.get_as::<i64>("age")?,
        });
        Ok(StepOutcome::Next(Some(profile)))
    }
}

fn command(dc: &DialogContext<'_>) -> Option<String> {
    dc.turn()
        .activity()
        .trimmed_text()
        .map(str::to_ascii_lowercase)
}

struct Help;

#[async_trait]
impl ConsultationProcessor for Help {
    async fn process(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, EngineError> {
        dc.turn_mut()
            .send_output(HELP_TEXT, InputHint::AcceptingInput)
            .await?;
        dc.reprompt_dialog().await?;
        Ok(DialogTurnResult::waiting())
    }
}

struct Cancel;

#[async_trait]
impl ConsultationProcessor for Cancel {
    async fn process(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, EngineError> {
        info!(depth = dc.stack_depth(), "user cancelled");
        dc.turn_mut()
            .send_output(CANCELLED_TEXT, InputHint::AcceptingInput)
            .await?;
        dc.cancel_all_dialogs().await
    }
}

/// Root dialog: greets, runs onboarding, and handles global commands.
#[derive(Debug, Clone, Copy)]
pub struct MainDialog;

#[async_trait]
impl Dialog for MainDialog {
    fn id(&self) -> &str {
        MAIN_DIALOG
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _options: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        dc.turn_mut()
            .send_output(WELCOME_TEXT, InputHint::IgnoringInput)
            .await?;
        dc.begin_dialog(ONBOARDING_DIALOG, None).await
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, EngineError> {
        dc.begin_dialog(ONBOARDING_DIALOG, None).await
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        _reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        let name = result
            .as_ref()
            .and_then(|profile| profile.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("friend")
            .to_owned();
        let age = result
            .as_ref()
            .and_then(|profile| profile.get("age"))
            .and_then(Value::as_i64);
        let text = match age {
            Some(age) => format!("Thanks {name}, you're {age}."),
            None => format!("Thanks {name}."),
        };
        dc.turn_mut()
            .send_output(&text, InputHint::AcceptingInput)
            .await?;
        dc.end_dialog(result).await
    }

    async fn consult_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<Option<Consultation>, EngineError> {
        Ok(match command(dc).as_deref() {
            Some("help") => Some(Consultation::new(ConsultationDesire::ShouldProcess, Help)),
            Some("cancel") => Some(Consultation::new(ConsultationDesire::ShouldProcess, Cancel)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parley_dialogs::domain::stack::DialogState;
    use parley_dialogs::domain::turn::TurnContext;
    use parley_test_support::{RecordingOutput, message};

    use super::*;

    async fn say(
        manager: &DialogManager,
        state: &mut DialogState,
        text: &str,
    ) -> (DialogTurnResult, Vec<String>, TurnContext) {
        let output = Arc::new(RecordingOutput::new());
        let mut turn = TurnContext::new(message(text), output.clone());
        let result = manager.run_turn(&mut turn, state).await.unwrap();
        (result, output.texts(), turn)
    }

    #[tokio::test]
    async fn test_first_turn_greets_and_asks_name() {
        let manager = build_manager(EngineConfig::default()).unwrap();
        let mut state = DialogState::new();

        let (result, texts, _) = say(&manager, &mut state, "hi").await;

        assert!(result.is_waiting());
        assert_eq!(texts, [WELCOME_TEXT, NAME_PROMPT]);
        let ids: Vec<_> = state.dialog_stack.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, [MAIN_DIALOG, ONBOARDING_DIALOG]);
    }

    #[tokio::test]
    async fn test_help_interrupts_prompt_and_reprompts() {
        // Arrange
        let manager = build_manager(EngineConfig::default()).unwrap();
        let mut state = DialogState::new();
        say(&manager, &mut state, "hi").await;

        // Act
        let (result, texts, _) = say(&manager, &mut state, "help").await;

        // Assert
        assert!(result.is_waiting());
        assert_eq!(texts, [HELP_TEXT, NAME_PROMPT]);
        assert_eq!(state.depth(), 2);
    }

    #[tokio::test]
    async fn test_age_out_of_range_is_retried() {
        let manager = build_manager(EngineConfig::default()).unwrap();
        let mut state = DialogState::new();
        say(&manager, &mut state, "hi").await;
        say(&manager, &mut state, "Ada").await;

        let (result, texts, _) = say(&manager, &mut state, "200").await;

        assert!(result.is_waiting());
        assert_eq!(texts, [AGE_RETRY]);
    }

    #[tokio::test]
    async fn test_full_profile_completes_with_summary() {
        // Arrange
        let manager = build_manager(EngineConfig::default()).unwrap();
        let mut state = DialogState::new();
        say(&manager, &mut state, "hi").await;
        let (_, texts, mut carried) = say(&manager, &mut state, "Ada").await;
        assert_eq!(texts, [AGE_PROMPT]);

        // Act: user scope is carried by hand between turns here
        let output = Arc::new(RecordingOutput::new());
        let mut turn = TurnContext::with_state(
            message("36"),
            output.clone(),
            std::mem::take(&mut carried.user_state),
            std::mem::take(&mut carried.conversation_state),
        );
        let result = manager.run_turn(&mut turn, &mut state).await.unwrap();

        // Assert
        assert_eq!(
            result,
            DialogTurnResult::complete(Some(json!({"name": "Ada", "age": 36})))
        );
        assert_eq!(output.texts(), ["Thanks Ada, you're 36."]);
        assert!(state.is_empty());
    }
}
