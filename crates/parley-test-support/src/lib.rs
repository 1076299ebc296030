//! Shared test doubles and builders for the Parley dialog engine.

mod activity;
mod clock;
mod output;
mod storage;

pub use activity::{conversation_update, event, message};
pub use clock::{FixedClock, fixed_now};
pub use output::{FailingOutput, RecordingOutput};
pub use storage::{FailingStorage, RecordingStorage};
