// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::coverage::DEFAULT_THRESHOLD;

/// Command-line arguments for `pipedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipedag",
    version,
    about = "Run a data pipeline as a DAG of file-tracked tasks.",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Tasks or groups to bring up to date, with everything they depend on.
    ///
    /// Default: `[config].default_targets`, or every task if that is empty.
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Pipedag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Pipedag.toml")]
    pub config: String,

    /// Delete every declared target without running any action.
    #[arg(long)]
    pub clean: bool,

    /// Print the planned order with each task's staleness; run nothing.
    #[arg(long, conflicts_with = "clean")]
    pub dry_run: bool,

    /// List tasks and their descriptions.
    #[arg(long, conflicts_with_all = ["clean", "dry_run"])]
    pub list: bool,

    /// Action output: 0 = none, 1 = stderr, 2 = stdout and stderr.
    ///
    /// Overrides `[config].verbosity`; per-task settings still win.
    #[arg(short = 'v', long, value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(0..=2))]
    pub verbosity: Option<u8>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check a panel file for missing or sparse series.
    Coverage(CoverageArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CoverageArgs {
    /// Panel in pandas `orient="split"` JSON.
    #[arg(long, value_name = "FILE")]
    pub panel: PathBuf,

    /// Series identifiers (comma separated or repeated).
    #[arg(long, required = true, num_args = 1.., value_delimiter = ',')]
    pub series: Vec<String>,

    /// Field names (comma separated or repeated).
    #[arg(long, required = true, num_args = 1.., value_delimiter = ',')]
    pub fields: Vec<String>,

    /// First date of the range (YYYY-MM-DD).
    #[arg(long)]
    pub start: NaiveDate,

    /// Last date of the range, inclusive. Default: today.
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Minimum share of non-null values in range.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Date column of a long panel; omit for date-indexed panels.
    #[arg(long, value_name = "NAME")]
    pub date_column: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_and_flags() {
        let args = CliArgs::try_parse_from(["pipedag", "calc", "--dry-run", "-v", "2"]).unwrap();
        assert_eq!(args.targets, vec!["calc"]);
        assert!(args.dry_run);
        assert_eq!(args.verbosity, Some(2));
        assert_eq!(args.config, "Pipedag.toml");
        assert!(args.command.is_none());
    }

    #[test]
    fn verbosity_is_bounded() {
        assert!(CliArgs::try_parse_from(["pipedag", "-v", "3"]).is_err());
    }

    #[test]
    fn coverage_subcommand() {
        let args = CliArgs::try_parse_from([
            "pipedag",
            "coverage",
            "--panel",
            "basis.json",
            "--series",
            "CL1,NG1",
            "--fields",
            "PX_LAST",
            "--start",
            "2020-01-31",
        ])
        .unwrap();

        let Some(Command::Coverage(cov)) = args.command else {
            panic!("expected coverage subcommand");
        };
        assert_eq!(cov.series, vec!["CL1", "NG1"]);
        assert_eq!(cov.start, NaiveDate::from_ymd_opt(2020, 1, 31).unwrap());
        assert_eq!(cov.threshold, DEFAULT_THRESHOLD);
        assert!(cov.end.is_none());
    }
}
