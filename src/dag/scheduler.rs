use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::staleness::{self, StaleReason, Staleness};
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{ExecutionRecord, ScheduledTask, TaskStatus};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::{PipedagError, Result};
use crate::fs::FileSystem;
use crate::gate::{GateDecision, GateDecisions};

/// Scheduler holds the immutable graph plus the state of one run.
///
/// It walks the resolved topological order one task at a time. For each
/// task it decides, in this order:
/// 1. skip when an upstream task failed (or was skipped because of one);
/// 2. skip when the governing gate is unavailable;
/// 3. skip when the targets are up to date;
/// 4. otherwise hand the task out for execution.
///
/// Only one task may be in flight; the caller reports its outcome with
/// [`Scheduler::handle_completion`] before asking for the next step.
#[derive(Debug)]
pub struct Scheduler {
    graph: TaskGraph,
    order: Vec<TaskName>,
    cursor: usize,
    gates: GateDecisions,
    state: StateManager,
    in_flight: Option<TaskName>,
}

impl Scheduler {
    /// Resolve `requested` (empty = every task) into an execution order and
    /// create a `Pending` record for each task in it.
    pub fn new(graph: TaskGraph, requested: &[String], gates: GateDecisions) -> Result<Self> {
        let order: Vec<TaskName> = graph
            .execution_order(requested)?
            .into_iter()
            .map(|t| t.name.clone())
            .collect();

        let state = StateManager::new(order.iter().map(String::as_str));

        debug!(tasks = order.len(), "scheduler: run planned");

        Ok(Self {
            graph,
            order,
            cursor: 0,
            gates,
            state,
            in_flight: None,
        })
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Task names of this run, in execution order.
    pub fn order(&self) -> &[TaskName] {
        &self.order
    }

    pub fn status_of(&self, task: &str) -> Option<TaskStatus> {
        self.state.status(task)
    }

    /// True once every task of the run reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.in_flight.is_none() && self.cursor >= self.order.len()
    }

    /// Decide the next task in order.
    ///
    /// Returns `Ok(None)` once the order is exhausted. Fails if the previous
    /// [`SchedulerStep::Execute`] has not been completed yet.
    pub fn next_step(&mut self, fs: &dyn FileSystem) -> Result<Option<SchedulerStep>> {
        if let Some(task) = &self.in_flight {
            return Err(PipedagError::Other(anyhow::anyhow!(
                "scheduler asked for next step while task '{task}' is still running"
            )));
        }

        let Some(name) = self.order.get(self.cursor).cloned() else {
            return Ok(None);
        };
        self.cursor += 1;

        let task = self
            .graph
            .get(&name)
            .ok_or_else(|| PipedagError::TaskNotFound(name.clone()))?;

        let deps = self.graph.dependencies_of(&name);
        if let Some(failed) = self.state.blocking_dependency(&deps) {
            info!(task = %name, upstream = %failed, "skipping: upstream task failed");
            self.state
                .mark_skipped(&name, TaskStatus::SkippedFailedDependency);
            return Ok(Some(SchedulerStep::Skipped {
                task: name,
                status: TaskStatus::SkippedFailedDependency,
            }));
        }

        if let Some(gate) = &task.gate {
            match self.gates.decision(gate) {
                GateDecision::Unavailable => {
                    info!(task = %name, gate = %gate, "skipping: source unavailable");
                    self.state.mark_skipped(&name, TaskStatus::SkippedGatedOff);
                    return Ok(Some(SchedulerStep::Skipped {
                        task: name,
                        status: TaskStatus::SkippedGatedOff,
                    }));
                }
                GateDecision::Undecided => {
                    warn!(
                        task = %name,
                        gate = %gate,
                        "gate was never resolved; treating source as available"
                    );
                }
                GateDecision::Available => {}
            }
        }

        let reason = match staleness::evaluate(task, fs) {
            Ok(Staleness::UpToDate) => {
                info!(task = %name, "up to date");
                self.state.mark_skipped(&name, TaskStatus::SkippedUpToDate);
                return Ok(Some(SchedulerStep::Skipped {
                    task: name,
                    status: TaskStatus::SkippedUpToDate,
                }));
            }
            Ok(Staleness::Stale(reason)) => reason,
            Err(err) => {
                warn!(task = %name, error = %err, "could not evaluate staleness; running task");
                StaleReason::AlwaysRun
            }
        };

        let scheduled = ScheduledTask::from_task(task, reason);
        self.state.mark_running(&name);
        self.in_flight = Some(name);
        Ok(Some(SchedulerStep::Execute(scheduled)))
    }

    /// Record the outcome of the task handed out by the last step.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) {
        if self.in_flight.as_deref() != Some(task) {
            warn!(task = %task, "completion for task that is not in flight; ignoring");
            return;
        }
        self.in_flight = None;

        match outcome {
            TaskOutcome::Success => {
                self.state.mark_done(task);
            }
            TaskOutcome::Failed(code) => {
                warn!(task = %task, exit_code = code, "task failed; dependents will be skipped");
                self.state.mark_failed(task, code);
            }
        }
    }

    /// Execution records in run order. Consumes the scheduler.
    pub fn into_records(self) -> Vec<(TaskName, ExecutionRecord)> {
        let mut records = self.state.into_records();
        self.order
            .into_iter()
            .map(|name| {
                let record = records.remove(&name).unwrap_or_default();
                (name, record)
            })
            .collect()
    }
}
