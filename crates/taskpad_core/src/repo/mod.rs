//! Repository facade over the task store.
//!
//! # Responsibility
//! - Give the view-state coordinator one handle for every task read/write.
//! - Move blocking SQLite work off the caller's task.
//!
//! # Invariants
//! - No validation and no state of its own; the store is the only truth.

pub mod task_repo;
