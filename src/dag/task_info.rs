// src/dag/task_info.rs

//! Per-task execution records and scheduled task types.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::dag::staleness::StaleReason;
use crate::dag::task::{ActionDescriptor, Task};
use crate::engine::TaskName;
use crate::types::Verbosity;

/// Lifecycle of a task within one run.
///
/// `Pending` → `Running` → `Done` | `Failed`, or `Pending` → one of the
/// `Skipped*` states. Every terminal state is reached exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Running,
    /// Targets are fresh; no action executed.
    SkippedUpToDate,
    /// Governing gate is unavailable; treated as satisfied downstream.
    SkippedGatedOff,
    /// An upstream task failed (directly or transitively).
    SkippedFailedDependency,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }

    /// Whether dependents of a task in this state must be skipped.
    pub fn blocks_dependents(self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::SkippedFailedDependency)
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::SkippedUpToDate => "up-to-date",
            TaskStatus::SkippedGatedOff => "gated-off",
            TaskStatus::SkippedFailedDependency => "skipped (failed dependency)",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status plus timing for one task in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub status: TaskStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Exit code of the failing action, for `Failed` records.
    pub exit_code: Option<i32>,
}

impl ExecutionRecord {
    pub fn pending() -> Self {
        Self {
            status: TaskStatus::Pending,
            started_at: None,
            finished_at: None,
            exit_code: None,
        }
    }
}

impl Default for ExecutionRecord {
    fn default() -> Self {
        Self::pending()
    }
}

/// Description of a task that the scheduler wants executed now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub actions: Vec<ActionDescriptor>,
    pub verbosity: Verbosity,
    /// Why the task is being run.
    pub reason: StaleReason,
}

impl ScheduledTask {
    pub fn from_task(task: &Task, reason: StaleReason) -> Self {
        Self {
            name: task.name.clone(),
            actions: task.actions.clone(),
            verbosity: task.verbosity,
            reason,
        }
    }
}
