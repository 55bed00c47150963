// src/report.rs

//! End-of-run summary.

use std::collections::BTreeMap;
use std::fmt;

use crate::coverage::CoverageReport;
use crate::dag::{ExecutionRecord, TaskStatus};
use crate::engine::TaskName;

/// Terminal state of one task, plus any coverage findings.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub name: TaskName,
    pub record: ExecutionRecord,
    pub coverage: Vec<CoverageReport>,
}

impl TaskReport {
    pub fn status(&self) -> TaskStatus {
        self.record.status
    }

    fn coverage_problems(&self) -> usize {
        self.coverage.iter().filter(|r| !r.is_ok()).count()
    }
}

/// Every task of a run in execution order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    entries: Vec<TaskReport>,
}

impl RunReport {
    pub fn new(
        records: Vec<(TaskName, ExecutionRecord)>,
        mut coverage: BTreeMap<TaskName, Vec<CoverageReport>>,
    ) -> Self {
        let entries = records
            .into_iter()
            .map(|(name, record)| {
                let coverage = coverage.remove(&name).unwrap_or_default();
                TaskReport {
                    name,
                    record,
                    coverage,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[TaskReport] {
        &self.entries
    }

    pub fn status_of(&self, task: &str) -> Option<TaskStatus> {
        self.entries
            .iter()
            .find(|e| e.name == task)
            .map(TaskReport::status)
    }

    pub fn coverage_of(&self, task: &str) -> &[CoverageReport] {
        self.entries
            .iter()
            .find(|e| e.name == task)
            .map(|e| e.coverage.as_slice())
            .unwrap_or_default()
    }

    /// Tasks whose actions actually ran (`Done` or `Failed`).
    pub fn executed_tasks(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status(), TaskStatus::Done | TaskStatus::Failed))
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn failed_tasks(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.status() == TaskStatus::Failed)
            .map(|e| e.name.as_str())
            .collect()
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.entries.iter().filter(|e| e.status() == status).count()
    }

    /// A run succeeds unless some task ended `Failed`. Gated-off and
    /// coverage findings do not count as failures.
    pub fn is_success(&self) -> bool {
        self.entries.iter().all(|e| e.status() != TaskStatus::Failed)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .entries
            .iter()
            .map(|e| e.name.len())
            .max()
            .unwrap_or(0);

        for entry in &self.entries {
            write!(f, "{:<width$}  {}", entry.name, entry.status())?;
            if let Some(code) = entry.record.exit_code {
                write!(f, " (exit {code})")?;
            }
            let problems = entry.coverage_problems();
            if problems > 0 {
                write!(f, "  [{problems} coverage warning(s)]")?;
            }
            writeln!(f)?;
        }

        write!(
            f,
            "{} task(s): {} done, {} up-to-date, {} gated-off, {} failed, {} skipped after failure",
            self.entries.len(),
            self.count(TaskStatus::Done),
            self.count(TaskStatus::SkippedUpToDate),
            self.count(TaskStatus::SkippedGatedOff),
            self.count(TaskStatus::Failed),
            self.count(TaskStatus::SkippedFailedDependency),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: TaskStatus, exit_code: Option<i32>) -> ExecutionRecord {
        ExecutionRecord {
            status,
            exit_code,
            ..ExecutionRecord::pending()
        }
    }

    #[test]
    fn gated_off_run_is_still_a_success() {
        let report = RunReport::new(
            vec![
                ("config".into(), record(TaskStatus::Done, None)),
                ("pull_bbg".into(), record(TaskStatus::SkippedGatedOff, None)),
                ("calc".into(), record(TaskStatus::SkippedUpToDate, None)),
            ],
            BTreeMap::new(),
        );
        assert!(report.is_success());
        assert_eq!(report.executed_tasks(), vec!["config"]);
    }

    #[test]
    fn failure_shows_in_summary() {
        let report = RunReport::new(
            vec![
                ("pull".into(), record(TaskStatus::Failed, Some(2))),
                ("calc".into(), record(TaskStatus::SkippedFailedDependency, None)),
            ],
            BTreeMap::new(),
        );
        assert!(!report.is_success());
        assert_eq!(report.failed_tasks(), vec!["pull"]);

        let text = report.to_string();
        assert!(text.contains("pull  FAILED (exit 2)"));
        assert!(text.contains("1 failed, 1 skipped after failure"));
    }
}
