//! Adapters that live inside the domain crate for convenience.
//!
//! The in-memory repository backs unit tests and the `memory` storage mode of
//! the CLI. The SQLite adapter lives in its own crate.

pub mod memory_repo;
