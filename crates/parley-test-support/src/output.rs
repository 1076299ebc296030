//! Test output sinks.

use std::sync::Mutex;

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_core::output::{Output, OutputSink};

/// An output sink that records everything sent through it.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    sent: Mutex<Vec<Output>>,
}

impl RecordingOutput {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all outputs sent so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<Output> {
        self.sent.lock().unwrap().clone()
    }

    /// Returns the text of every output sent so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|output| output.text.clone())
            .collect()
    }

    /// Forgets everything recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl OutputSink for RecordingOutput {
    async fn send(&self, output: Output) -> Result<(), EngineError> {
        self.sent.lock().unwrap().push(output);
        Ok(())
    }
}

/// An output sink whose transport is always down.
#[derive(Debug)]
pub struct FailingOutput;

#[async_trait]
impl OutputSink for FailingOutput {
    async fn send(&self, _output: Output) -> Result<(), EngineError> {
        Err(EngineError::Infrastructure("transport unavailable".into()))
    }
}
