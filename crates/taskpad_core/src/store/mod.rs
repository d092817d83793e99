//! Durable stores with live (self-refreshing) queries.
//!
//! # Responsibility
//! - Own the task table and the preference slots.
//! - Broadcast a change signal after every successful mutation so open
//!   live queries re-run and deliver a fresh snapshot.
//!
//! # Invariants
//! - Each store is the single producer of its change signal.
//! - A failed mutation never bumps the change signal.

pub mod live;
pub mod preference_store;
pub mod task_store;
