use std::fmt;

use serde::Deserialize;

/// How a task decides whether it has to run again.
///
/// - `AlwaysRun`: the task declares no targets and is attempted on every
///   invocation; any short-circuiting is left to the action itself.
/// - `TargetTracked`: the task is stale iff a target is missing, or a
///   file dependency is newer than the oldest target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalenessPolicy {
    AlwaysRun,
    TargetTracked,
}

impl fmt::Display for StalenessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StalenessPolicy::AlwaysRun => f.write_str("always_run"),
            StalenessPolicy::TargetTracked => f.write_str("target_tracked"),
        }
    }
}

/// How much of an action's own output is echoed while it runs.
///
/// - `0`: discard stdout and stderr.
/// - `1`: echo stderr only.
/// - `2`: echo stdout and stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(u8);

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::NORMAL
    }
}

impl Verbosity {
    pub const QUIET: Verbosity = Verbosity(0);
    pub const NORMAL: Verbosity = Verbosity(1);
    pub const FULL: Verbosity = Verbosity(2);

    pub fn new(level: u8) -> Option<Self> {
        (level <= 2).then_some(Verbosity(level))
    }

    pub fn echo_stdout(self) -> bool {
        self.0 >= 2
    }

    pub fn echo_stderr(self) -> bool {
        self.0 >= 1
    }
}
