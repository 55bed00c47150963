// src/engine/runtime.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::coverage::{self, CoverageReport};
use crate::dag::{ScheduledTask, Scheduler, SchedulerStep};
use crate::errors::Result;
use crate::exec::{ActionExecutor, ActionInvocation};
use crate::fs::FileSystem;
use crate::report::RunReport;

use super::{TaskName, TaskOutcome};

/// Drives the scheduler to completion, one task at a time, and delegates
/// action execution to an `ActionExecutor`.
pub struct Runtime<E: ActionExecutor> {
    scheduler: Scheduler,
    executor: E,
    fs: Arc<dyn FileSystem>,
    coverage: BTreeMap<TaskName, Vec<CoverageReport>>,
}

impl<E: ActionExecutor> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl<E: ActionExecutor> Runtime<E> {
    pub fn new(scheduler: Scheduler, executor: E, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            scheduler,
            executor,
            fs,
            coverage: BTreeMap::new(),
        }
    }

    /// Walk the whole order and return the final report.
    ///
    /// Action failures end up in the report; `Err` means the run itself
    /// could not proceed.
    pub async fn run(mut self) -> Result<RunReport> {
        info!(tasks = self.scheduler.order().len(), "pipeline run started");

        while let Some(step) = self.scheduler.next_step(self.fs.as_ref())? {
            match step {
                SchedulerStep::Skipped { task, status } => {
                    debug!(task = %task, status = %status, "task resolved without running");
                }
                SchedulerStep::Execute(task) => {
                    info!(task = %task.name, reason = %task.reason, "running task");
                    let outcome = self.execute(&task).await;
                    self.scheduler.handle_completion(&task.name, outcome);
                    if outcome == TaskOutcome::Success {
                        self.check_coverage(&task.name);
                    }
                }
            }
        }

        info!("pipeline run finished");
        Ok(RunReport::new(self.scheduler.into_records(), self.coverage))
    }

    /// Run the task's actions in order, stopping at the first failure.
    async fn execute(&mut self, task: &ScheduledTask) -> TaskOutcome {
        for (index, action) in task.actions.iter().enumerate() {
            let invocation = ActionInvocation {
                task: task.name.clone(),
                index,
                command: action.command().to_string(),
                verbosity: task.verbosity,
            };

            match self.executor.run_action(invocation).await {
                Ok(TaskOutcome::Success) => {}
                Ok(failed @ TaskOutcome::Failed(code)) => {
                    warn!(
                        task = %task.name,
                        action = index,
                        exit_code = code,
                        "action failed; skipping remaining actions"
                    );
                    return failed;
                }
                Err(err) => {
                    error!(task = %task.name, action = index, error = %err, "action could not run");
                    return TaskOutcome::Failed(-1);
                }
            }
        }
        TaskOutcome::Success
    }

    fn check_coverage(&mut self, task: &str) {
        let Some(check) = self
            .scheduler
            .graph()
            .get(task)
            .and_then(|t| t.coverage.clone())
        else {
            return;
        };

        match check.run(self.fs.as_ref()) {
            Ok(reports) => {
                coverage::log_reports(task, &reports);
                self.coverage.insert(task.to_string(), reports);
            }
            Err(err) => {
                warn!(
                    task = %task,
                    panel = %check.panel.display(),
                    error = %err,
                    "coverage check could not read panel"
                );
            }
        }
    }
}
