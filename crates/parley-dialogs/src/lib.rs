//! Parley — dialog orchestration.
//!
//! Responsible for the dialog stack, the dialog lifecycle contract,
//! nested components, prompts, the consultation protocol that decides who
//! handles a turn, and the turn handler that loads and commits state.

pub mod application;
pub mod domain;
