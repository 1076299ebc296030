//! Parley console driver.
//!
//! Feeds lines from a reader into a sample dialog tree as message
//! activities, one turn per line, persisting state between turns.

pub mod bot;
pub mod config;
pub mod error;
pub mod output;
pub mod session;
