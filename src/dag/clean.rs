//! `--clean`: remove every declared target without running anything.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::dag::graph::TaskGraph;
use crate::errors::Result;
use crate::fs::FileSystem;

/// Delete every target of every task. Missing targets are ignored.
///
/// Returns the paths that were actually removed.
pub fn clean(graph: &TaskGraph, fs: &dyn FileSystem) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for task in graph.tasks() {
        for target in &task.targets {
            if fs.remove_file(target)? {
                info!(task = %task.name, target = %target.display(), "removed target");
                removed.push(target.clone());
            } else {
                debug!(task = %task.name, target = %target.display(), "target already absent");
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::dag::task::Task;
    use crate::fs::mock::MockFileSystem;
    use crate::types::StalenessPolicy::{AlwaysRun, TargetTracked};

    #[test]
    fn removes_existing_targets_and_keeps_inputs() {
        let fs = MockFileSystem::new();
        fs.add_file("_data/raw.csv", "x");
        fs.add_file("_data/wide.parquet", "y");
        fs.add_file("notes.txt", "keep");

        let graph = TaskGraph::build(
            vec![
                Task::new("config", AlwaysRun),
                Task::new("format", TargetTracked)
                    .file_dep("_data/raw.csv")
                    .target("_data/wide.parquet")
                    .target("_data/long.parquet"),
            ],
            vec![],
        )
        .unwrap();

        let removed = clean(&graph, &fs).unwrap();
        assert_eq!(removed, vec![PathBuf::from("_data/wide.parquet")]);
        assert!(fs.exists(Path::new("_data/raw.csv")));
        assert!(fs.exists(Path::new("notes.txt")));
        assert!(!fs.exists(Path::new("_data/wide.parquet")));
    }
}
