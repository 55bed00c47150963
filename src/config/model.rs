// src/config/model.rs

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::types::StalenessPolicy;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// data_dir = "_data"
/// output_dir = "_output"
/// default_targets = ["generate_site"]
///
/// [gate.bloomberg]
/// prompt = "Is the Bloomberg terminal open? [y/N/q]: "
/// skip_env = "PULL_BLOOMBERG_SKIP"
/// available_env = "BLOOMBERG_TERMINAL_OPEN"
///
/// [[task]]
/// name = "pull_hkm"
/// actions = ["python src/pull_he_kelly_manela.py"]
/// after = ["config"]
/// policy = "always_run"
///
/// [[group]]
/// name = "run_notebooks"
/// items = ["src/summary_commodities_ipynb.py"]
/// actions = ["ipynb-py-convert {item} {notebook_build_dir}/{stem}.ipynb"]
/// after = ["calc"]
/// policy = "target_tracked"
/// targets = ["{notebook_build_dir}/{stem}.html"]
/// ```
///
/// Tasks and groups are arrays of tables so that declaration order survives
/// deserialization; the scheduler uses it to break ties.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Source availability gates from `[gate.<name>]`.
    #[serde(default)]
    pub gate: BTreeMap<String, GateConfig>,

    /// Concrete tasks from `[[task]]`, in declaration order.
    #[serde(default)]
    pub task: Vec<TaskConfig>,

    /// Templated task groups from `[[group]]`, in declaration order.
    #[serde(default)]
    pub group: Vec<GroupConfig>,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see
/// `config::validate`) or [`ConfigFile::new_unchecked`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub gate: BTreeMap<String, GateConfig>,
    pub task: Vec<TaskConfig>,
    pub group: Vec<GroupConfig>,
}

impl ConfigFile {
    /// Build a config without running validation. Callers are responsible
    /// for upholding the invariants checked in `config::validate`.
    pub fn new_unchecked(
        config: ConfigSection,
        gate: BTreeMap<String, GateConfig>,
        task: Vec<TaskConfig>,
        group: Vec<GroupConfig>,
    ) -> Self {
        Self {
            config,
            gate,
            task,
            group,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory holding pulled and derived datasets (`{data_dir}`).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory holding generated report artifacts (`{output_dir}`).
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Tasks selected when no targets are given on the command line.
    ///
    /// Empty means "every task".
    #[serde(default)]
    pub default_targets: Vec<String>,

    /// Default action output verbosity (0..=2).
    #[serde(default = "default_verbosity")]
    pub verbosity: u8,
}

fn default_data_dir() -> String {
    "_data".to_string()
}

fn default_output_dir() -> String {
    "_output".to_string()
}

fn default_verbosity() -> u8 {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            default_targets: Vec::new(),
            verbosity: default_verbosity(),
        }
    }
}

impl ConfigSection {
    /// Subdirectory of the output dir used for intermediate notebook builds.
    pub fn notebook_build_dir(&self) -> String {
        format!("{}/_notebook_build", self.output_dir.trim_end_matches('/'))
    }
}

/// `[gate.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GateConfig {
    /// Text shown when the operator has to be asked.
    #[serde(default)]
    pub prompt: Option<String>,

    /// Environment variable that, when truthy, marks the source unavailable
    /// without prompting. Wins over `available_env`.
    #[serde(default)]
    pub skip_env: Option<String>,

    /// Environment variable that, when truthy, marks the source available
    /// without prompting.
    #[serde(default)]
    pub available_env: Option<String>,
}

/// `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub name: String,

    /// One-line description, shown by `--list`.
    #[serde(default)]
    pub doc: Option<String>,

    /// Shell commands, executed in order.
    #[serde(default)]
    pub actions: Vec<String>,

    /// Names of tasks (or groups) that must finish first.
    #[serde(default)]
    pub after: Vec<String>,

    /// Input files whose modification time can make this task stale.
    #[serde(default)]
    pub file_dep: Vec<String>,

    /// Output files evidencing completion.
    #[serde(default)]
    pub targets: Vec<String>,

    pub policy: StalenessPolicy,

    /// Name of the `[gate.<name>]` governing this task.
    #[serde(default)]
    pub gate: Option<String>,

    /// Per-task override of `[config].verbosity`.
    #[serde(default)]
    pub verbosity: Option<u8>,

    /// Advisory coverage check run on this task's output panel.
    #[serde(default)]
    pub coverage: Option<CoverageConfig>,
}

/// `[[group]]` entry: one concrete task per item.
///
/// Strings may use `{item}` (the item verbatim) and `{stem}` (the item's
/// file stem) in addition to the global placeholders.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    pub name: String,

    #[serde(default)]
    pub doc: Option<String>,

    pub items: Vec<String>,

    #[serde(default)]
    pub actions: Vec<String>,

    /// Upstream dependencies inherited by every expanded task.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub file_dep: Vec<String>,

    #[serde(default)]
    pub targets: Vec<String>,

    pub policy: StalenessPolicy,

    #[serde(default)]
    pub gate: Option<String>,

    #[serde(default)]
    pub verbosity: Option<u8>,
}

/// `[task.coverage]` table attached to a pull task.
#[derive(Debug, Clone, Deserialize)]
pub struct CoverageConfig {
    /// Panel file (pandas `orient="split"` JSON) written by the task.
    pub panel: String,

    pub series: Vec<String>,

    pub fields: Vec<String>,

    pub start: NaiveDate,

    /// Defaults to today when omitted.
    #[serde(default)]
    pub end: Option<NaiveDate>,

    /// Name of the date column for long panels; date-indexed panels leave
    /// this unset.
    #[serde(default)]
    pub date_column: Option<String>,

    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    crate::coverage::DEFAULT_THRESHOLD
}
