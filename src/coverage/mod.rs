// src/coverage/mod.rs

//! Advisory data-quality audit of pulled panels.
//!
//! - [`panel`] holds the panel model and the pandas `split` JSON reader.
//! - [`validator`] judges every requested `(series, field)` pair.
//!
//! Nothing in here changes task status: reports are logged and attached to
//! the run report, and the panel is used as pulled.

pub mod panel;
pub mod validator;

use std::path::PathBuf;

use tracing::{info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;

pub use panel::{Cell, ColumnLabel, Panel, PanelLookup, SeriesField, pairs};
pub use validator::{CoverageReport, CoverageStatus, DateRange, validate};

/// Ratio below which a series is reported as `LowCoverage`.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// A coverage audit attached to a task, run after the task succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageCheck {
    pub panel: PathBuf,
    pub pairs: Vec<SeriesField>,
    pub range: DateRange,
    pub date_column: Option<String>,
    pub threshold: f64,
}

impl CoverageCheck {
    /// Read the panel through `fs` and validate it.
    pub fn run(&self, fs: &dyn FileSystem) -> Result<Vec<CoverageReport>> {
        let text = fs.read_to_string(&self.panel)?;
        let panel = Panel::from_split_json(&text, self.date_column.as_deref())?;
        Ok(validate(&panel, &self.pairs, &self.range, self.threshold))
    }
}

/// Log every report: `warn` for problems, one `info` summary line.
pub fn log_reports(task: &str, reports: &[CoverageReport]) {
    let mut problems = 0usize;
    for report in reports.iter().filter(|r| !r.is_ok()) {
        problems += 1;
        warn!(task = %task, status = ?report.status, "coverage: {report}");
    }
    info!(
        task = %task,
        checked = reports.len(),
        problems,
        "coverage check finished"
    );
}
