// src/dag/scheduler_step.rs

//! Result type of a single scheduler step.

use crate::dag::task_info::{ScheduledTask, TaskStatus};
use crate::engine::TaskName;

/// What the scheduler decided for the next task in order.
#[derive(Debug, Clone)]
pub enum SchedulerStep {
    /// Run the task's actions, then report back with `handle_completion`.
    Execute(ScheduledTask),
    /// The task was resolved without running anything.
    Skipped { task: TaskName, status: TaskStatus },
}
