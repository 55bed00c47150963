use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use pipedag::engine::TaskOutcome;
use pipedag::errors::Result;
use pipedag::exec::{ActionExecutor, ActionInvocation};
use pipedag::fs::mock::MockFileSystem;

/// A fake executor that:
/// - records every action it was asked to run, as `(task, command)`
/// - interprets a tiny command language against a [`MockFileSystem`]:
///   `touch a b` creates/bumps files, `false` fails with 1, `exit N` fails
///   with N (N = 0 succeeds), anything else succeeds
/// - fails every action of tasks registered with [`FakeExecutor::fail_task`].
///
/// Clones share the recorded history.
#[derive(Debug, Clone)]
pub struct FakeExecutor {
    fs: MockFileSystem,
    executed: Arc<Mutex<Vec<(String, String)>>>,
    failing_tasks: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(fs: MockFileSystem) -> Self {
        Self {
            fs,
            executed: Arc::new(Mutex::new(Vec::new())),
            failing_tasks: HashSet::new(),
        }
    }

    pub fn fail_task(mut self, task: &str) -> Self {
        self.failing_tasks.insert(task.to_string());
        self
    }

    /// Every `(task, command)` executed so far, in order.
    pub fn executed(&self) -> Vec<(String, String)> {
        self.executed.lock().unwrap().clone()
    }

    /// Distinct task names that ran at least one action, in first-run order.
    pub fn executed_tasks(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for (task, _) in self.executed() {
            if !seen.contains(&task) {
                seen.push(task);
            }
        }
        seen
    }

    pub fn clear(&self) {
        self.executed.lock().unwrap().clear();
    }

    fn interpret(&self, invocation: &ActionInvocation) -> TaskOutcome {
        if self.failing_tasks.contains(&invocation.task) {
            return TaskOutcome::Failed(1);
        }

        let mut words = invocation.command.split_whitespace();
        match words.next() {
            Some("touch") => {
                for path in words {
                    self.fs.touch(path);
                }
                TaskOutcome::Success
            }
            Some("false") => TaskOutcome::Failed(1),
            Some("exit") => match words.next().and_then(|c| c.parse::<i32>().ok()) {
                Some(0) => TaskOutcome::Success,
                Some(code) => TaskOutcome::Failed(code),
                None => TaskOutcome::Failed(1),
            },
            _ => TaskOutcome::Success,
        }
    }
}

impl ActionExecutor for FakeExecutor {
    fn run_action(
        &mut self,
        invocation: ActionInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<TaskOutcome>> + Send + '_>> {
        Box::pin(async move {
            self.executed
                .lock()
                .unwrap()
                .push((invocation.task.clone(), invocation.command.clone()));
            Ok(self.interpret(&invocation))
        })
    }
}
