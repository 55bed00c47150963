use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use pipedag::dag::{SchedulerStep, Scheduler, Task, TaskGraph, TaskStatus};
use pipedag::engine::TaskOutcome;
use pipedag::fs::mock::MockFileSystem;
use pipedag::gate::GateDecisions;
use pipedag::types::StalenessPolicy;

/// Random acyclic graph: task N may only depend on tasks 0..N-1, either by
/// name or by consuming the earlier task's target as a file dependency.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Task>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let edges = proptest::collection::vec(
            proptest::collection::vec((any::<usize>(), any::<bool>()), 0..num_tasks),
            num_tasks,
        );

        edges.prop_map(move |raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let mut task = Task::new(format!("task_{i}"), StalenessPolicy::TargetTracked)
                        .target(format!("out/{i}.parquet"));

                    let mut seen = HashSet::new();
                    for (dep, by_file) in potential {
                        if i == 0 {
                            break;
                        }
                        let dep = dep % i;
                        if !seen.insert(dep) {
                            continue;
                        }
                        task = if by_file {
                            task.file_dep(format!("out/{dep}.parquet"))
                        } else {
                            task.after(format!("task_{dep}"))
                        };
                    }
                    task
                })
                .collect()
        })
    })
}

proptest! {
    #[test]
    fn order_never_runs_a_task_before_its_dependencies(tasks in dag_strategy(12)) {
        let graph = TaskGraph::build(tasks, vec![]).unwrap();
        let order: Vec<&str> = graph
            .execution_order(&[])
            .unwrap()
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();

        prop_assert_eq!(order.len(), graph.len());

        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        for task in graph.tasks() {
            for dep in graph.dependencies_of(&task.name) {
                prop_assert!(position[dep] < position[task.name.as_str()]);
            }
        }
    }

    #[test]
    fn every_task_reaches_a_terminal_state_and_failures_propagate(
        tasks in dag_strategy(10),
        failing in proptest::collection::hash_set(0..10usize, 0..4),
    ) {
        let graph = TaskGraph::build(tasks, vec![]).unwrap();
        let failing: HashSet<String> = failing.into_iter().map(|i| format!("task_{i}")).collect();

        let fs = MockFileSystem::new();
        let mut scheduler = Scheduler::new(graph.clone(), &[], GateDecisions::default()).unwrap();

        while let Some(step) = scheduler.next_step(&fs).unwrap() {
            if let SchedulerStep::Execute(task) = step {
                let outcome = if failing.contains(&task.name) {
                    TaskOutcome::Failed(1)
                } else {
                    TaskOutcome::Success
                };
                scheduler.handle_completion(&task.name, outcome);
            }
        }
        prop_assert!(scheduler.is_finished());

        for task in graph.tasks() {
            let status = scheduler.status_of(&task.name).unwrap();
            prop_assert!(status.is_terminal());

            let upstream_blocked = graph
                .dependencies_of(&task.name)
                .into_iter()
                .any(|d| scheduler.status_of(d).unwrap().blocks_dependents());
            if upstream_blocked {
                prop_assert_eq!(status, TaskStatus::SkippedFailedDependency);
            } else if failing.contains(&task.name) {
                prop_assert_eq!(status, TaskStatus::Failed);
            } else {
                prop_assert_eq!(status, TaskStatus::Done);
            }
        }
    }
}
