// src/exec/backend.rs

//! Pluggable action executor.
//!
//! The runtime talks to an `ActionExecutor` instead of spawning processes
//! itself, so tests can swap in a fake executor that records invocations
//! and writes targets into an in-memory filesystem.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::engine::{TaskName, TaskOutcome};
use crate::errors::Result;
use crate::types::Verbosity;

use super::task_runner::run_action;

/// One action of one task, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionInvocation {
    pub task: TaskName,
    /// Position of the action within the task (0-based).
    pub index: usize,
    pub command: String,
    pub verbosity: Verbosity,
}

impl fmt::Display for ActionInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.task, self.index, self.command)
    }
}

/// Trait abstracting how actions are executed.
///
/// Production code uses [`ShellExecutor`]; tests provide their own
/// implementation that doesn't spawn real processes.
pub trait ActionExecutor: Send {
    /// Run a single action to completion.
    ///
    /// A non-zero exit is `Ok(TaskOutcome::Failed(code))`; `Err` is reserved
    /// for not being able to run the action at all.
    fn run_action(
        &mut self,
        invocation: ActionInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<TaskOutcome>> + Send + '_>>;
}

/// Runs each action through `sh -c` in the pipeline's root directory.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    working_dir: Option<PathBuf>,
}

impl ShellExecutor {
    /// Run actions with `dir` as the current directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }
}

impl ActionExecutor for ShellExecutor {
    fn run_action(
        &mut self,
        invocation: ActionInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<TaskOutcome>> + Send + '_>> {
        let working_dir = self.working_dir.clone();
        Box::pin(async move {
            let outcome = run_action(&invocation, working_dir.as_deref()).await?;
            Ok(outcome)
        })
    }
}
