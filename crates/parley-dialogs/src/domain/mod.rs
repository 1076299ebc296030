//! Dialog domain model.

pub mod component;
pub mod consultation;
pub mod context;
pub mod dialog;
pub mod dialog_set;
pub mod prompt;
pub mod recognizers;
pub mod stack;
pub mod turn;
pub mod waterfall;

#[cfg(test)]
pub(crate) mod testing;
