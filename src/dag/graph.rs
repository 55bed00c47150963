use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::path::Path;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::model::ConfigFile;
use crate::dag::task::{Task, TaskTemplate};
use crate::engine::TaskName;
use crate::errors::{PipedagError, Result};

/// Immutable DAG of fully expanded tasks.
///
/// Tasks are stored in declaration order (plain tasks first, then each
/// group's expansion); that order breaks ties when scheduling.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<TaskName, usize>,
    /// Resolved direct dependencies per task (indices into `tasks`).
    deps: Vec<Vec<usize>>,
    /// Direct dependents per task.
    dependents: Vec<Vec<usize>>,
    /// Group name → expanded member indices.
    groups: BTreeMap<String, Vec<usize>>,
}

impl TaskGraph {
    /// Build the graph from a validated config.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let (declarations, templates) = crate::config::declarations(cfg)?;
        Self::build(declarations, templates)
    }

    /// Expand templates and wire every dependency.
    ///
    /// - A dependency naming a group resolves to all of its members.
    /// - A file dependency that is another task's target adds an edge from
    ///   that task.
    ///
    /// Fails on duplicate names, undeclared dependencies and cycles; no
    /// action runs before this succeeds.
    pub fn build(declarations: Vec<Task>, templates: Vec<TaskTemplate>) -> Result<Self> {
        let mut tasks = declarations;
        let mut group_members: Vec<(String, Vec<TaskName>)> = Vec::new();

        for template in &templates {
            let expanded = template.expand();
            group_members.push((
                template.group.clone(),
                expanded.iter().map(|t| t.name.clone()).collect(),
            ));
            tasks.extend(expanded);
        }

        let mut index = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.name.clone(), i).is_some() {
                return Err(PipedagError::DuplicateTask(task.name.clone()));
            }
        }

        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (group, members) in group_members {
            if index.contains_key(&group) || groups.contains_key(&group) {
                return Err(PipedagError::DuplicateTask(group));
            }
            let member_idx: Vec<usize> = members
                .iter()
                .filter_map(|m| index.get(m).copied())
                .collect();
            groups.insert(group, member_idx);
        }

        let mut producers: HashMap<&Path, usize> = HashMap::new();
        for (i, task) in tasks.iter().enumerate() {
            for target in &task.targets {
                producers.entry(target.as_path()).or_insert(i);
            }
        }

        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
        for (i, task) in tasks.iter().enumerate() {
            let mut resolved: Vec<usize> = Vec::new();

            for dep in &task.deps {
                if let Some(&d) = index.get(dep) {
                    resolved.push(d);
                } else if let Some(members) = groups.get(dep) {
                    resolved.extend(members.iter().copied());
                } else {
                    return Err(PipedagError::DanglingDependency {
                        task: task.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }

            for file in &task.file_deps {
                if let Some(&producer) = producers.get(file.as_path()) {
                    if producer != i {
                        debug!(
                            task = %task.name,
                            producer = %tasks[producer].name,
                            file = %file.display(),
                            "implicit dependency via file_dep"
                        );
                        resolved.push(producer);
                    }
                }
            }

            let mut seen = HashSet::new();
            resolved.retain(|d| seen.insert(*d));
            deps[i] = resolved;
        }

        ensure_acyclic(&tasks, &deps)?;

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
        for (i, ds) in deps.iter().enumerate() {
            for &d in ds {
                dependents[d].push(i);
            }
        }

        Ok(Self {
            tasks,
            index,
            deps,
            dependents,
            groups,
        })
    }

    /// All tasks, in declaration order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Expanded member names of a group, in item order.
    pub fn group_members(&self, group: &str) -> Option<Vec<&str>> {
        self.groups
            .get(group)
            .map(|ms| ms.iter().map(|&i| self.tasks[i].name.as_str()).collect())
    }

    /// Resolved direct dependencies (declared, group-expanded and implicit).
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&i| self.deps[i].iter().map(|&d| self.tasks[d].name.as_str()).collect())
            .unwrap_or_default()
    }

    /// Resolve requested names (task or group) into task indices.
    /// An empty request selects every task.
    fn resolve_roots(&self, requested: &[String]) -> Result<Vec<usize>> {
        if requested.is_empty() {
            return Ok((0..self.tasks.len()).collect());
        }

        let mut roots = Vec::new();
        for name in requested {
            if let Some(&i) = self.index.get(name) {
                roots.push(i);
            } else if let Some(members) = self.groups.get(name) {
                roots.extend(members.iter().copied());
            } else {
                return Err(PipedagError::TaskNotFound(name.clone()));
            }
        }
        Ok(roots)
    }

    /// The requested tasks plus everything they transitively depend on.
    fn closure(&self, roots: &[usize]) -> HashSet<usize> {
        let mut selected = HashSet::new();
        let mut stack: Vec<usize> = roots.to_vec();

        while let Some(i) = stack.pop() {
            if selected.insert(i) {
                stack.extend(self.deps[i].iter().copied());
            }
        }
        selected
    }

    /// Topological order of the closure of `requested`, ties broken by
    /// declaration order.
    pub fn execution_order(&self, requested: &[String]) -> Result<Vec<&Task>> {
        let roots = self.resolve_roots(requested)?;
        let selected = self.closure(&roots);

        let mut pending_deps: HashMap<usize, usize> = selected
            .iter()
            .map(|&i| (i, self.deps[i].len()))
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = pending_deps
            .iter()
            .filter(|&(_, &n)| n == 0)
            .map(|(&i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(selected.len());
        while let Some(Reverse(i)) = ready.pop() {
            order.push(&self.tasks[i]);
            for &dependent in &self.dependents[i] {
                if let Some(n) = pending_deps.get_mut(&dependent) {
                    *n -= 1;
                    if *n == 0 {
                        ready.push(Reverse(dependent));
                    }
                }
            }
        }

        Ok(order)
    }
}

fn ensure_acyclic(tasks: &[Task], deps: &[Vec<usize>]) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for i in 0..tasks.len() {
        graph.add_node(i);
    }
    for (i, ds) in deps.iter().enumerate() {
        for &d in ds {
            graph.add_edge(d, i, ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(PipedagError::DagCycle(format!(
            "cycle detected in task DAG involving task '{}'",
            tasks[cycle.node_id()].name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StalenessPolicy::{AlwaysRun, TargetTracked};

    fn names<'a>(tasks: &[&'a Task]) -> Vec<&'a str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn order_respects_dependencies_and_declaration_ties() {
        let graph = TaskGraph::build(
            vec![
                Task::new("config", AlwaysRun),
                Task::new("pull_b", AlwaysRun).after("config"),
                Task::new("pull_a", AlwaysRun).after("config"),
                Task::new("calc", AlwaysRun).after("pull_a").after("pull_b"),
            ],
            vec![],
        )
        .unwrap();

        let order = graph.execution_order(&[]).unwrap();
        assert_eq!(names(&order), vec!["config", "pull_b", "pull_a", "calc"]);
    }

    #[test]
    fn selecting_a_target_pulls_in_only_its_closure() {
        let graph = TaskGraph::build(
            vec![
                Task::new("config", AlwaysRun),
                Task::new("pull", AlwaysRun).after("config"),
                Task::new("other", AlwaysRun).after("config"),
            ],
            vec![],
        )
        .unwrap();

        let order = graph.execution_order(&["pull".to_string()]).unwrap();
        assert_eq!(names(&order), vec!["config", "pull"]);

        let err = graph.execution_order(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, PipedagError::TaskNotFound(n) if n == "nope"));
    }

    #[test]
    fn cycle_is_rejected() {
        let err = TaskGraph::build(
            vec![
                Task::new("a", AlwaysRun).after("b"),
                Task::new("b", AlwaysRun).after("a"),
            ],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, PipedagError::DagCycle(_)));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = TaskGraph::build(vec![Task::new("a", AlwaysRun).after("a")], vec![]).unwrap_err();
        assert!(matches!(err, PipedagError::DagCycle(_)));
    }

    #[test]
    fn dangling_dependency_is_rejected() {
        let err = TaskGraph::build(vec![Task::new("a", AlwaysRun).after("ghost")], vec![])
            .unwrap_err();
        match err {
            PipedagError::DanglingDependency { task, dependency } => {
                assert_eq!(task, "a");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("expected DanglingDependency, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = TaskGraph::build(
            vec![Task::new("a", AlwaysRun), Task::new("a", AlwaysRun)],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, PipedagError::DuplicateTask(n) if n == "a"));
    }

    #[test]
    fn group_dependency_resolves_to_every_member() {
        let notebooks = TaskTemplate::new("nb", TargetTracked)
            .item("a.py")
            .item("b.py")
            .after("calc")
            .target("out/{stem}.html");

        let graph = TaskGraph::build(
            vec![
                Task::new("calc", AlwaysRun),
                Task::new("site", AlwaysRun).after("nb"),
            ],
            vec![notebooks],
        )
        .unwrap();

        assert_eq!(graph.group_members("nb").unwrap(), vec!["nb:a", "nb:b"]);
        assert_eq!(graph.dependencies_of("site"), vec!["nb:a", "nb:b"]);
        assert_eq!(graph.dependencies_of("nb:b"), vec!["calc"]);

        let order = graph.execution_order(&["site".to_string()]).unwrap();
        assert_eq!(names(&order), vec!["calc", "nb:a", "nb:b", "site"]);
    }

    #[test]
    fn file_dep_on_another_target_orders_the_producer_first() {
        // `format` is declared before `pull` and only linked by a file.
        let graph = TaskGraph::build(
            vec![
                Task::new("format", TargetTracked)
                    .file_dep("_data/raw.csv")
                    .target("_data/wide.parquet"),
                Task::new("pull", TargetTracked).target("_data/raw.csv"),
            ],
            vec![],
        )
        .unwrap();

        assert_eq!(graph.dependencies_of("format"), vec!["pull"]);
        let order = graph.execution_order(&[]).unwrap();
        assert_eq!(names(&order), vec!["pull", "format"]);
    }
}
