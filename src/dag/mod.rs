// src/dag/mod.rs

//! Task graph and scheduling.
//!
//! - [`task`] defines concrete tasks and templated groups.
//! - [`graph`] expands templates, wires dependencies and orders the DAG.
//! - [`staleness`] decides from file timestamps whether a task must run.
//! - [`scheduler`] walks the order for one run and applies the skip rules.
//! - [`task_info`] and [`state_manager`] hold per-run execution records.
//! - [`clean`] removes declared targets.

pub mod clean;
pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod staleness;
pub mod state_manager;
pub mod task;
pub mod task_info;

pub use clean::clean;
pub use graph::TaskGraph;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use staleness::{StaleReason, Staleness};
pub use task::{ActionDescriptor, Task, TaskTemplate};
pub use task_info::{ExecutionRecord, ScheduledTask, TaskStatus};
