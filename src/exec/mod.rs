// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs the shell commands behind each task's actions with
//! `tokio::process::Command`.
//!
//! - [`backend`] provides the `ActionExecutor` trait and the production
//!   `ShellExecutor`; tests replace it with a fake implementation.
//! - [`task_runner`] spawns and awaits a single action process.

pub mod backend;
pub mod task_runner;

pub use backend::{ActionExecutor, ActionInvocation, ShellExecutor};
