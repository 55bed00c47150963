// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, warn};

use crate::dag::task_info::{ExecutionRecord, TaskStatus};
use crate::engine::TaskName;

/// Owns the execution records of one run and enforces legal transitions.
#[derive(Debug, Default)]
pub struct StateManager {
    records: HashMap<TaskName, ExecutionRecord>,
}

impl StateManager {
    /// Create a `Pending` record for every task in the run.
    pub fn new<'a>(tasks: impl IntoIterator<Item = &'a str>) -> Self {
        let records = tasks
            .into_iter()
            .map(|name| (name.to_string(), ExecutionRecord::pending()))
            .collect();
        Self { records }
    }

    pub fn record(&self, task: &str) -> Option<&ExecutionRecord> {
        self.records.get(task)
    }

    pub fn status(&self, task: &str) -> Option<TaskStatus> {
        self.records.get(task).map(|r| r.status)
    }

    /// `Pending` → `Running`.
    pub fn mark_running(&mut self, task: &str) -> bool {
        let Some(record) = self.pending_record(task, TaskStatus::Running) else {
            return false;
        };
        record.status = TaskStatus::Running;
        record.started_at = Some(Utc::now());
        debug!(task = %task, "marked Running");
        true
    }

    /// `Pending` → one of the skipped states.
    pub fn mark_skipped(&mut self, task: &str, status: TaskStatus) -> bool {
        debug_assert!(matches!(
            status,
            TaskStatus::SkippedUpToDate
                | TaskStatus::SkippedGatedOff
                | TaskStatus::SkippedFailedDependency
        ));
        let Some(record) = self.pending_record(task, status) else {
            return false;
        };
        let now = Utc::now();
        record.status = status;
        record.started_at = Some(now);
        record.finished_at = Some(now);
        debug!(task = %task, status = %status, "marked skipped");
        true
    }

    /// `Running` → `Done`.
    pub fn mark_done(&mut self, task: &str) -> bool {
        self.finish(task, TaskStatus::Done, None)
    }

    /// `Running` → `Failed`.
    pub fn mark_failed(&mut self, task: &str, exit_code: i32) -> bool {
        self.finish(task, TaskStatus::Failed, Some(exit_code))
    }

    fn finish(&mut self, task: &str, status: TaskStatus, exit_code: Option<i32>) -> bool {
        match self.records.get_mut(task) {
            Some(record) if record.status == TaskStatus::Running => {
                record.status = status;
                record.finished_at = Some(Utc::now());
                record.exit_code = exit_code;
                debug!(task = %task, status = %status, "task finished");
                true
            }
            Some(record) => {
                warn!(
                    task = %task,
                    current = %record.status,
                    requested = %status,
                    "ignoring completion for task that is not running"
                );
                false
            }
            None => {
                warn!(task = %task, "completion for task outside this run; ignoring");
                false
            }
        }
    }

    fn pending_record(&mut self, task: &str, to: TaskStatus) -> Option<&mut ExecutionRecord> {
        match self.records.get_mut(task) {
            Some(record) if record.status == TaskStatus::Pending => Some(record),
            Some(record) => {
                warn!(
                    task = %task,
                    current = %record.status,
                    requested = %to,
                    "illegal transition; task already left Pending"
                );
                None
            }
            None => {
                warn!(task = %task, "task is not part of this run");
                None
            }
        }
    }

    /// First dependency whose state forces `task` to be skipped.
    pub fn blocking_dependency<'a>(&self, deps: &[&'a str]) -> Option<&'a str> {
        deps.iter()
            .copied()
            .find(|d| self.status(d).is_some_and(TaskStatus::blocks_dependents))
    }

    /// Check if all tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        self.records.values().all(|r| r.status.is_terminal())
    }

    pub fn into_records(self) -> HashMap<TaskName, ExecutionRecord> {
        self.records
    }
}
