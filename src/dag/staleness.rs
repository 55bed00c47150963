// src/dag/staleness.rs

//! Timestamp-based staleness.
//!
//! There is no fingerprint store: every run recomputes staleness from the
//! modification times of targets and file dependencies.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::Result;

use crate::dag::task::Task;
use crate::fs::FileSystem;
use crate::types::StalenessPolicy;

/// Why a task has to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// `AlwaysRun` tasks run on every invocation.
    AlwaysRun,
    MissingTarget(PathBuf),
    /// A file dependency does not exist (yet); the action decides what to do.
    MissingFileDep(PathBuf),
    /// A file dependency is newer than the oldest target.
    ChangedFileDep(PathBuf),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::AlwaysRun => f.write_str("always run"),
            StaleReason::MissingTarget(p) => write!(f, "target {} is missing", p.display()),
            StaleReason::MissingFileDep(p) => write!(f, "file dep {} is missing", p.display()),
            StaleReason::ChangedFileDep(p) => write!(f, "file dep {} changed", p.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    UpToDate,
    Stale(StaleReason),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Staleness::Stale(_))
    }
}

/// Decide whether `task` must run, per its policy.
pub fn evaluate(task: &Task, fs: &dyn FileSystem) -> Result<Staleness> {
    match task.policy {
        StalenessPolicy::AlwaysRun => Ok(Staleness::Stale(StaleReason::AlwaysRun)),
        StalenessPolicy::TargetTracked => evaluate_targets(task, fs),
    }
}

fn evaluate_targets(task: &Task, fs: &dyn FileSystem) -> Result<Staleness> {
    let mut oldest_target: Option<SystemTime> = None;

    for target in &task.targets {
        match fs.modified(target)? {
            Some(mtime) => {
                oldest_target = Some(oldest_target.map_or(mtime, |o| o.min(mtime)));
            }
            None => return Ok(Staleness::Stale(StaleReason::MissingTarget(target.clone()))),
        }
    }

    // Validation guarantees at least one target for TargetTracked.
    let Some(oldest_target) = oldest_target else {
        return Ok(Staleness::Stale(StaleReason::AlwaysRun));
    };

    for dep in &task.file_deps {
        match fs.modified(dep)? {
            Some(mtime) if mtime > oldest_target => {
                return Ok(Staleness::Stale(StaleReason::ChangedFileDep(dep.clone())));
            }
            Some(_) => {}
            None => return Ok(Staleness::Stale(StaleReason::MissingFileDep(dep.clone()))),
        }
    }

    Ok(Staleness::UpToDate)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn format_task() -> Task {
        Task::new("format", StalenessPolicy::TargetTracked)
            .file_dep("raw.csv")
            .target("wide.parquet")
            .target("long.parquet")
    }

    #[test]
    fn always_run_is_always_stale() {
        let fs = MockFileSystem::new();
        let task = Task::new("config", StalenessPolicy::AlwaysRun);
        assert_eq!(
            evaluate(&task, &fs).unwrap(),
            Staleness::Stale(StaleReason::AlwaysRun)
        );
    }

    #[test]
    fn missing_target_is_stale() {
        let fs = MockFileSystem::new();
        fs.add_file("raw.csv", "");
        fs.add_file("wide.parquet", "");

        assert_eq!(
            evaluate(&format_task(), &fs).unwrap(),
            Staleness::Stale(StaleReason::MissingTarget("long.parquet".into()))
        );
    }

    #[test]
    fn dep_newer_than_oldest_target_is_stale() {
        let fs = MockFileSystem::new();
        fs.add_file("raw.csv", "");
        fs.add_file("wide.parquet", "");
        fs.add_file("long.parquet", "");
        fs.set_modified("raw.csv", at(50));
        fs.set_modified("wide.parquet", at(40));
        fs.set_modified("long.parquet", at(100));

        assert_eq!(
            evaluate(&format_task(), &fs).unwrap(),
            Staleness::Stale(StaleReason::ChangedFileDep("raw.csv".into()))
        );
    }

    #[test]
    fn targets_newer_than_deps_are_up_to_date() {
        let fs = MockFileSystem::new();
        fs.add_file("raw.csv", "");
        fs.add_file("wide.parquet", "");
        fs.add_file("long.parquet", "");

        assert_eq!(evaluate(&format_task(), &fs).unwrap(), Staleness::UpToDate);
    }

    #[test]
    fn equal_timestamps_are_up_to_date() {
        let fs = MockFileSystem::new();
        for p in ["raw.csv", "wide.parquet", "long.parquet"] {
            fs.add_file(p, "");
            fs.set_modified(p, at(10));
        }
        assert_eq!(evaluate(&format_task(), &fs).unwrap(), Staleness::UpToDate);
    }

    #[test]
    fn missing_file_dep_is_stale() {
        let fs = MockFileSystem::new();
        fs.add_file("wide.parquet", "");
        fs.add_file("long.parquet", "");

        let staleness = evaluate(&format_task(), &fs).unwrap();
        assert_eq!(
            staleness,
            Staleness::Stale(StaleReason::MissingFileDep("raw.csv".into()))
        );
        assert!(!fs.exists(Path::new("raw.csv")));
    }
}
