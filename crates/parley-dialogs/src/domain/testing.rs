//! Dialog doubles shared by the domain tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parley_core::activity::Activity;
use parley_core::error::EngineError;
use parley_core::output::InputHint;
use parley_test_support::{RecordingOutput, message};
use serde_json::Value;

use super::consultation::{Consultation, ConsultationDesire, ConsultationProcessor};
use super::context::DialogContext;
use super::dialog::{Dialog, DialogReason, DialogTurnResult};
use super::stack::DialogInstance;
use super::turn::TurnContext;

/// Ordered log of lifecycle calls.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub(crate) fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

pub(crate) fn reason_name(reason: DialogReason) -> String {
    serde_json::to_value(reason)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default()
}

fn result_name(result: Option<&Value>) -> String {
    result.map_or_else(|| "none".to_owned(), Value::to_string)
}

/// Waits forever and journals every lifecycle call.
pub(crate) struct JournalDialog {
    id: String,
    journal: Journal,
}

impl JournalDialog {
    pub(crate) fn new(id: &str, journal: &Journal) -> Self {
        Self {
            id: id.to_owned(),
            journal: journal.clone(),
        }
    }
}

#[async_trait]
impl Dialog for JournalDialog {
    fn id(&self) -> &str {
        &self.id
    }

    async fn begin_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
        _options: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        self.journal.record(format!("begin:{}", self.id));
        Ok(DialogTurnResult::waiting())
    }

    async fn continue_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, EngineError> {
        self.journal.record(format!("continue:{}", self.id));
        Ok(DialogTurnResult::waiting())
    }

    async fn resume_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        self.journal.record(format!(
            "resume:{}:{}:{}",
            self.id,
            reason_name(reason),
            result_name(result.as_ref())
        ));
        Ok(DialogTurnResult::waiting())
    }

    async fn reprompt_dialog(
        &self,
        _turn: &mut TurnContext,
        _instance: &mut DialogInstance,
    ) -> Result<(), EngineError> {
        self.journal.record(format!("reprompt:{}", self.id));
        Ok(())
    }

    async fn end_dialog(
        &self,
        _turn: &mut TurnContext,
        _instance: &mut DialogInstance,
        reason: DialogReason,
    ) -> Result<(), EngineError> {
        self.journal
            .record(format!("end:{}:{}", self.id, reason_name(reason)));
        Ok(())
    }
}

/// Ends during `begin_dialog`, returning its options as the result.
pub(crate) struct EndsImmediately {
    id: String,
}

impl EndsImmediately {
    pub(crate) fn new(id: &str) -> Self {
        Self { id: id.to_owned() }
    }
}

#[async_trait]
impl Dialog for EndsImmediately {
    fn id(&self) -> &str {
        &self.id
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        dc.end_dialog(options).await
    }
}

/// A global handler: claims "cancel" as `ShouldProcess`, answers
/// "Cancelled." and clears the whole stack.
pub(crate) struct Interrupter {
    id: String,
    journal: Journal,
}

impl Interrupter {
    pub(crate) fn new(id: &str, journal: &Journal) -> Self {
        Self {
            id: id.to_owned(),
            journal: journal.clone(),
        }
    }
}

struct CancelEverything {
    id: String,
    journal: Journal,
}

#[async_trait]
impl ConsultationProcessor for CancelEverything {
    async fn process(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnResult, EngineError> {
        self.journal.record(format!("interrupt:{}", self.id));
        dc.turn_mut()
            .send_output("Cancelled.", InputHint::AcceptingInput)
            .await?;
        dc.cancel_all_dialogs().await
    }
}

#[async_trait]
impl Dialog for Interrupter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn begin_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
        _options: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        self.journal.record(format!("begin:{}", self.id));
        Ok(DialogTurnResult::waiting())
    }

    async fn continue_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, EngineError> {
        self.journal.record(format!("continue:{}", self.id));
        Ok(DialogTurnResult::waiting())
    }

    async fn resume_dialog(
        &self,
        _dc: &mut DialogContext<'_>,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        self.journal.record(format!(
            "resume:{}:{}:{}",
            self.id,
            reason_name(reason),
            result_name(result.as_ref())
        ));
        Ok(DialogTurnResult::waiting())
    }

    async fn end_dialog(
        &self,
        _turn: &mut TurnContext,
        _instance: &mut DialogInstance,
        reason: DialogReason,
    ) -> Result<(), EngineError> {
        self.journal
            .record(format!("end:{}:{}", self.id, reason_name(reason)));
        Ok(())
    }

    async fn consult_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<Option<Consultation>, EngineError> {
        let wants_cancel = dc
            .turn()
            .activity()
            .trimmed_text()
            .is_some_and(|text| text.eq_ignore_ascii_case("cancel"));
        Ok(wants_cancel.then(|| {
            Consultation::new(
                ConsultationDesire::ShouldProcess,
                CancelEverything {
                    id: self.id.clone(),
                    journal: self.journal.clone(),
                },
            )
        }))
    }
}

/// A turn over `activity` recording its output.
pub(crate) fn turn_with(activity: Activity) -> (TurnContext, Arc<RecordingOutput>) {
    let output = Arc::new(RecordingOutput::new());
    (TurnContext::new(activity, output.clone()), output)
}

/// A turn for a user message recording its output.
pub(crate) fn turn_for(text: &str) -> (TurnContext, Arc<RecordingOutput>) {
    turn_with(message(text))
}
