// src/engine/mod.rs

//! Orchestration engine for pipedag.
//!
//! The pure per-run state machine lives in [`crate::dag::Scheduler`]; the
//! async shell that executes actions and runs coverage checks is
//! [`runtime::Runtime`].

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of an action (and of a task, which fails with its first failing
/// action).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(i32),
}

pub mod runtime;

pub use runtime::Runtime;
