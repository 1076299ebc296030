//! Parley Core — shared abstractions for the dialog orchestration engine.
//!
//! This crate defines the turn input, the scoped state model and the ports
//! (storage, output, clock) that the engine talks to. It contains no
//! dialog logic and no infrastructure code.

pub mod activity;
pub mod clock;
pub mod error;
pub mod output;
pub mod state;
pub mod storage;
