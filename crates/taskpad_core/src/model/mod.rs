//! Domain model for the task list.
//!
//! # Responsibility
//! - Define the task record and its priority levels.
//! - Own the draft/validation rules shared by every editing surface.
//!
//! # Invariants
//! - Identifier `0` means "not yet persisted"; the store assigns positive ids.
//! - Priority names are the four uppercase spellings, nothing else parses.

pub mod task;
