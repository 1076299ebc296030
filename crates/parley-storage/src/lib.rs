//! Parley — storage adapters.
//!
//! Implementations of the `Storage` port: a process-local map for tests
//! and single-process hosts, and a directory of YAML files that survives
//! restarts. Both enforce optimistic versioning on save.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;
