// src/lib.rs

pub mod cli;
pub mod config;
pub mod coverage;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod gate;
pub mod logging;
pub mod report;
pub mod types;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command, CoverageArgs};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::coverage::{DateRange, Panel, pairs, validate};
use crate::dag::staleness::{self, Staleness};
use crate::dag::{Scheduler, TaskGraph};
use crate::engine::Runtime;
use crate::exec::{ActionExecutor, ShellExecutor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::gate::{GateDecisions, GateResolver, ProcessEnv, StdinPrompter};
use crate::report::RunReport;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - gate resolution (environment overrides, then the operator prompt)
/// - graph construction, scheduler and runtime
/// - the shell executor
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    if let Some(Command::Coverage(cov)) = &args.command {
        return run_coverage(cov);
    }

    let config_path = PathBuf::from(&args.config);
    let mut cfg = load_and_validate(&config_path)?;
    if let Some(level) = args.verbosity {
        cfg.config.verbosity = level;
    }

    let root_dir = config_root_dir(&config_path);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem::rooted(&root_dir));
    let requested = requested_targets(&args, &cfg);

    if args.list {
        print_list(&TaskGraph::from_config(&cfg)?);
        return Ok(ExitCode::SUCCESS);
    }

    if args.clean {
        let graph = TaskGraph::from_config(&cfg)?;
        let removed = dag::clean(&graph, fs.as_ref())?;
        println!("removed {} target(s)", removed.len());
        for path in removed {
            println!("  {}", path.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    if args.dry_run {
        print_dry_run(&TaskGraph::from_config(&cfg)?, &requested, fs.as_ref())?;
        return Ok(ExitCode::SUCCESS);
    }

    // Gates are settled before anything is built or executed.
    let gates = GateResolver::new(&ProcessEnv, &mut StdinPrompter).resolve_all(&cfg)?;
    if gates.is_empty() {
        debug!("no gated sources in this pipeline");
    }
    for (gate, decision) in gates.iter() {
        info!(gate = %gate, decision = %decision, "source gate");
    }

    let executor = ShellExecutor::in_dir(&root_dir);
    let report = run_pipeline(&cfg, &requested, gates, executor, fs).await?;

    println!("{report}");
    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(failed = ?report.failed_tasks(), "pipeline finished with failures");
        Ok(ExitCode::FAILURE)
    }
}

/// Build the graph for `cfg` and run `requested` (empty = every task) to
/// completion with already resolved gates.
pub async fn run_pipeline<E: ActionExecutor>(
    cfg: &ConfigFile,
    requested: &[String],
    gates: GateDecisions,
    executor: E,
    fs: Arc<dyn FileSystem>,
) -> Result<RunReport> {
    let graph = TaskGraph::from_config(cfg)?;
    let scheduler = Scheduler::new(graph, requested, gates)?;
    let runtime = Runtime::new(scheduler, executor, fs);
    Ok(runtime.run().await?)
}

/// CLI targets, else `[config].default_targets`, else everything.
fn requested_targets(args: &CliArgs, cfg: &ConfigFile) -> Vec<String> {
    if args.targets.is_empty() {
        cfg.config.default_targets.clone()
    } else {
        args.targets.clone()
    }
}

/// Directory that relative paths in the config (and actions) resolve from.
///
/// - If the config path has a non-empty parent (e.g. "pipeline/Pipedag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Pipedag.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_list(graph: &TaskGraph) {
    let width = graph.tasks().map(|t| t.name.len()).max().unwrap_or(0);
    for task in graph.tasks() {
        println!("{:<width$}  {}", task.name, task.doc.as_deref().unwrap_or(""));
    }
}

/// Print the planned order with policies and current staleness.
fn print_dry_run(graph: &TaskGraph, requested: &[String], fs: &dyn FileSystem) -> Result<()> {
    let order = graph.execution_order(requested)?;
    println!("pipedag dry-run ({} task(s))", order.len());

    for task in order {
        let verdict = match staleness::evaluate(task, fs) {
            Ok(Staleness::UpToDate) => "up to date".to_string(),
            Ok(Staleness::Stale(reason)) => format!("would run: {reason}"),
            Err(err) => format!("would run: staleness unknown ({err})"),
        };
        println!("  - {} [{}] {verdict}", task.name, task.policy);

        let deps = graph.dependencies_of(&task.name);
        if !deps.is_empty() {
            println!("      after: {}", deps.join(", "));
        }
        if let Some(gate) = &task.gate {
            println!("      gate: {gate}");
        }
        for action in &task.actions {
            println!("      $ {action}");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

/// `pipedag coverage`: validate a panel file and print one line per pair.
fn run_coverage(args: &CoverageArgs) -> Result<ExitCode> {
    let text = std::fs::read_to_string(&args.panel)
        .with_context(|| format!("reading panel {:?}", args.panel))?;
    let panel = Panel::from_split_json(&text, args.date_column.as_deref())?;

    let end = args.end.unwrap_or_else(|| Local::now().date_naive());
    let range = DateRange::new(args.start, end);
    let reports = validate(&panel, &pairs(&args.series, &args.fields), &range, args.threshold);

    let problems = reports.iter().filter(|r| !r.is_ok()).count();
    for report in &reports {
        println!("{report}");
    }
    info!(checked = reports.len(), problems, "coverage check finished");

    // Coverage findings are advisory.
    Ok(ExitCode::SUCCESS)
}
