//! Turn-level application services.

pub mod config;
pub mod dialog_manager;
pub mod turn_handlers;
