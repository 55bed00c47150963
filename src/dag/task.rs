// src/dag/task.rs

//! Task declarations and templated task groups.

use std::fmt;
use std::path::PathBuf;

use crate::config::placeholders::{Placeholders, item_stem};
use crate::coverage::CoverageCheck;
use crate::engine::TaskName;
use crate::types::{StalenessPolicy, Verbosity};

/// Separator between a group name and an item stem in expanded task names.
pub const GROUP_SEPARATOR: char = ':';

/// An opaque unit of work. The core never looks inside; it only learns
/// whether running it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    command: String,
}

impl ActionDescriptor {
    /// A command line run through the platform shell.
    pub fn shell(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl fmt::Display for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)
    }
}

/// A concrete, named unit of work in the graph.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: TaskName,
    pub doc: Option<String>,
    pub actions: Vec<ActionDescriptor>,
    /// Declared dependencies, by task or group name.
    pub deps: Vec<TaskName>,
    pub file_deps: Vec<PathBuf>,
    pub targets: Vec<PathBuf>,
    pub policy: StalenessPolicy,
    /// Gate that can degrade this task to a no-op.
    pub gate: Option<String>,
    pub verbosity: Verbosity,
    pub coverage: Option<CoverageCheck>,
    /// Group this task was expanded from, if any.
    pub group: Option<String>,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, policy: StalenessPolicy) -> Self {
        Self {
            name: name.into(),
            doc: None,
            actions: Vec::new(),
            deps: Vec::new(),
            file_deps: Vec::new(),
            targets: Vec::new(),
            policy,
            gate: None,
            verbosity: Verbosity::default(),
            coverage: None,
            group: None,
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn action(mut self, command: impl Into<String>) -> Self {
        self.actions.push(ActionDescriptor::shell(command));
        self
    }

    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.deps.push(dep.into());
        self
    }

    pub fn file_dep(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_deps.push(path.into());
        self
    }

    pub fn target(mut self, path: impl Into<PathBuf>) -> Self {
        self.targets.push(path.into());
        self
    }

    pub fn gated_by(mut self, gate: impl Into<String>) -> Self {
        self.gate = Some(gate.into());
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn coverage(mut self, check: CoverageCheck) -> Self {
        self.coverage = Some(check);
        self
    }
}

/// A templated group: expands into one [`Task`] per item.
///
/// `actions`, `file_deps` and `targets` may contain `{item}` and `{stem}`.
#[derive(Debug, Clone)]
pub struct TaskTemplate {
    pub group: String,
    pub doc: Option<String>,
    pub items: Vec<String>,
    pub actions: Vec<String>,
    /// Upstream dependencies inherited by every expanded task.
    pub deps: Vec<TaskName>,
    pub file_deps: Vec<String>,
    pub targets: Vec<String>,
    pub policy: StalenessPolicy,
    pub gate: Option<String>,
    pub verbosity: Verbosity,
}

impl TaskTemplate {
    pub fn new(group: impl Into<String>, policy: StalenessPolicy) -> Self {
        Self {
            group: group.into(),
            doc: None,
            items: Vec::new(),
            actions: Vec::new(),
            deps: Vec::new(),
            file_deps: Vec::new(),
            targets: Vec::new(),
            policy,
            gate: None,
            verbosity: Verbosity::default(),
        }
    }

    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.items.push(item.into());
        self
    }

    pub fn action(mut self, command: impl Into<String>) -> Self {
        self.actions.push(command.into());
        self
    }

    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.deps.push(dep.into());
        self
    }

    pub fn file_dep(mut self, path: impl Into<String>) -> Self {
        self.file_deps.push(path.into());
        self
    }

    pub fn target(mut self, path: impl Into<String>) -> Self {
        self.targets.push(path.into());
        self
    }

    /// Name of the concrete task generated for `item`.
    pub fn task_name(&self, item: &str) -> TaskName {
        format!("{}{}{}", self.group, GROUP_SEPARATOR, item_stem(item))
    }

    /// Materialize one concrete task per item. Pure: no filesystem access.
    pub fn expand(&self) -> Vec<Task> {
        self.items
            .iter()
            .map(|item| {
                let values = Placeholders::for_item(item);
                let render = |s: &String| values.render_partial(s);

                Task {
                    name: self.task_name(item),
                    doc: self.doc.as_ref().map(|d| format!("{d} ({item})")),
                    actions: self
                        .actions
                        .iter()
                        .map(|a| ActionDescriptor::shell(render(a)))
                        .collect(),
                    deps: self.deps.clone(),
                    file_deps: self.file_deps.iter().map(|p| render(p).into()).collect(),
                    targets: self.targets.iter().map(|p| render(p).into()).collect(),
                    policy: self.policy,
                    gate: self.gate.clone(),
                    verbosity: self.verbosity,
                    coverage: None,
                    group: Some(self.group.clone()),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notebooks() -> TaskTemplate {
        TaskTemplate::new("run_notebooks", StalenessPolicy::TargetTracked)
            .item("src/summary_a.py")
            .item("src/summary_b.py")
            .item("src/summary_c.py")
            .after("calc")
            .action("ipynb-py-convert {item} build/{stem}.ipynb")
            .action("jupyter nbconvert --execute --inplace build/{stem}.ipynb")
            .file_dep("{item}")
            .target("build/{stem}.html")
    }

    #[test]
    fn expands_one_task_per_item() {
        let tasks = notebooks().expand();
        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["run_notebooks:summary_a", "run_notebooks:summary_b", "run_notebooks:summary_c"]
        );
    }

    #[test]
    fn expanded_tasks_inherit_group_dependencies_and_render_paths() {
        let tasks = notebooks().expand();
        let b = &tasks[1];
        assert_eq!(b.deps, vec!["calc".to_string()]);
        assert_eq!(b.file_deps, vec![PathBuf::from("src/summary_b.py")]);
        assert_eq!(b.targets, vec![PathBuf::from("build/summary_b.html")]);
        assert_eq!(
            b.actions[0].command(),
            "ipynb-py-convert src/summary_b.py build/summary_b.ipynb"
        );
        assert_eq!(b.group.as_deref(), Some("run_notebooks"));
    }
}
