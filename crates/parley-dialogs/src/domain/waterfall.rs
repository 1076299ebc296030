//! Sequential multi-step dialogs.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_core::state::{ScopeKind, StateScope};
use serde_json::Value;
use tracing::debug;

use super::context::DialogContext;
use super::dialog::{Dialog, DialogReason, DialogTurnResult};

const STEP_INDEX_KEY: &str = "step_index";
const OPTIONS_KEY: &str = "options";

/// What a step sees when it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Zero-based position of the step.
    pub index: usize,
    /// Options the waterfall was begun with.
    pub options: Option<Value>,
    /// Result of the previous step or of the child it began.
    pub result: Option<Value>,
    pub reason: DialogReason,
}

/// What a step asks the waterfall to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Run the following step immediately with this result.
    Next(Option<Value>),
    /// Stop here and report this outcome. Steps that begin a child or end
    /// the waterfall return the context's outcome through this.
    Turn(DialogTurnResult),
}

/// One step of a waterfall.
#[async_trait]
pub trait WaterfallStep: Send + Sync {
    async fn run(
        &self,
        dc: &mut DialogContext<'_>,
        step: &StepInfo,
    ) -> Result<StepOutcome, EngineError>;
}

/// Begins a child dialog and waits for its result.
#[derive(Debug, Clone)]
pub struct BeginDialogStep {
    dialog_id: String,
    options: Option<Value>,
}

impl BeginDialogStep {
    #[must_use]
    pub fn new(dialog_id: impl Into<String>) -> Self {
        Self {
            dialog_id: dialog_id.into(),
            options: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }
}

#[async_trait]
impl WaterfallStep for BeginDialogStep {
    async fn run(
        &self,
        dc: &mut DialogContext<'_>,
        _step: &StepInfo,
    ) -> Result<StepOutcome, EngineError> {
        let outcome = dc
            .begin_dialog(&self.dialog_id, self.options.clone())
            .await?;
        Ok(StepOutcome::Turn(outcome))
    }
}

/// Copies the incoming result into a scope and passes it on.
#[derive(Debug, Clone)]
pub struct StoreResultStep {
    scope: ScopeKind,
    key: String,
}

impl StoreResultStep {
    #[must_use]
    pub fn new(scope: ScopeKind, key: impl Into<String>) -> Self {
        Self {
            scope,
            key: key.into(),
        }
    }
}

#[async_trait]
impl WaterfallStep for StoreResultStep {
    async fn run(
        &self,
        dc: &mut DialogContext<'_>,
        step: &StepInfo,
    ) -> Result<StepOutcome, EngineError> {
        if let (Some(value), Some(scope)) = (&step.result, dc.scope_mut(self.scope)) {
            scope.set(&self.key, value.clone());
        }
        Ok(StepOutcome::Next(step.result.clone()))
    }
}

/// Runs its steps in order, one child dialog at a time.
#[derive(Clone)]
pub struct WaterfallDialog {
    id: String,
    steps: Vec<Arc<dyn WaterfallStep>>,
}

impl WaterfallDialog {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn add_step(mut self, step: impl WaterfallStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn next_index(dc: &DialogContext<'_>) -> Result<usize, EngineError> {
        let stored = dc
            .dialog_scope()
            .map(|scope| scope.get_as::<usize>(STEP_INDEX_KEY))
            .transpose()?
            .flatten();
        Ok(stored.map_or(0, |index| index + 1))
    }

    async fn run_from(
        &self,
        dc: &mut DialogContext<'_>,
        mut index: usize,
        reason: DialogReason,
        mut result: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        let options = dc
            .dialog_scope()
            .and_then(|scope| scope.get(OPTIONS_KEY).cloned());

        while let Some(step) = self.steps.get(index) {
            if let Some(scope) = dc.dialog_scope_mut() {
                scope.set_as(STEP_INDEX_KEY, &index)?;
            }
            debug!(waterfall = %self.id, index, "running step");
            let info = StepInfo {
                index,
                options: options.clone(),
                result: result.take(),
                reason,
            };
            match step.run(dc, &info).await? {
                StepOutcome::Next(next) => {
                    result = next;
                    index += 1;
                }
                StepOutcome::Turn(outcome) => return Ok(outcome),
            }
        }

        dc.end_dialog(result).await
    }
}

impl fmt::Debug for WaterfallDialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaterfallDialog")
            .field("id", &self.id)
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[async_trait]
impl Dialog for WaterfallDialog {
    fn id(&self) -> &str {
        &self.id
    }

    async fn begin_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        if let (Some(scope), Some(options)) = (dc.dialog_scope_mut(), options) {
            scope.set(OPTIONS_KEY, options);
        }
        self.run_from(dc, 0, DialogReason::BeginCalled, None).await
    }

    async fn continue_dialog(
        &self,
        dc: &mut DialogContext<'_>,
    ) -> Result<DialogTurnResult, EngineError> {
        let index = Self::next_index(dc)?;
        self.run_from(dc, index, DialogReason::ContinueCalled, None)
            .await
    }

    async fn resume_dialog(
        &self,
        dc: &mut DialogContext<'_>,
        reason: DialogReason,
        result: Option<Value>,
    ) -> Result<DialogTurnResult, EngineError> {
        let index = Self::next_index(dc)?;
        self.run_from(dc, index, reason, result).await
    }
}
