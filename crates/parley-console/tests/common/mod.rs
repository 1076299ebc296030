//! Shared test helpers for console integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use parley_console::bot::build_manager;
use parley_console::config::Identity;
use parley_console::session::Session;
use parley_core::clock::Clock;
use parley_core::storage::Storage;
use parley_dialogs::application::config::EngineConfig;
use parley_test_support::{FixedClock, RecordingOutput, fixed_now};

/// Fixed timestamp used across all integration tests.
pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(fixed_now()))
}

/// Builds a session over the sample tree with recorded output. Uses the
/// same wiring as `Session::from_config`.
pub fn build_session(
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
) -> (Session, Arc<RecordingOutput>) {
    let output = Arc::new(RecordingOutput::new());
    let manager = build_manager(config).unwrap();
    let session = Session::new(manager, storage, output.clone(), clock, Identity::default());
    (session, output)
}

/// Sends a line and returns what the bot said in reply.
pub async fn say(session: &Session, output: &RecordingOutput, text: &str) -> Vec<String> {
    output.clear();
    session.send_line(text).await.unwrap();
    output.texts()
}
