//! View-state coordination for the task list.
//!
//! # Responsibility
//! - Hold every UI-visible field and publish it to presentation readers.
//! - Turn user intents (edits, actions, search, sort) into repository and
//!   preference operations.
//! - Decide which task list is on screen.
//!
//! # Invariants
//! - The coordinator is the only writer of every published field.
//! - Each read channel owns its own `RequestState`; channels never share one.
//! - A read channel that reports `Error` stays in `Error`; nothing retries.

pub mod action;
pub mod coordinator;
pub mod request_state;
pub mod selection;
