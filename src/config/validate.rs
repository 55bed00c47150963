// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, CoverageConfig, RawConfigFile};
use crate::config::placeholders::{ITEM_KEYS, Placeholders, item_stem};
use crate::dag::TaskGraph;
use crate::errors::{PipedagError, Result};
use crate::types::{StalenessPolicy, Verbosity};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let cfg = ConfigFile::new_unchecked(raw.config, raw.gate, raw.task, raw.group);
        validate_dag(&cfg)?;
        Ok(cfg)
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_names(cfg)?;
    validate_tasks(cfg)?;
    validate_groups(cfg)?;
    validate_placeholders(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> PipedagError {
    PipedagError::ConfigError(msg.into())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() && cfg.group.is_empty() {
        return Err(config_error(
            "config must contain at least one [[task]] or [[group]] entry",
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if Verbosity::new(cfg.config.verbosity).is_none() {
        return Err(config_error(format!(
            "[config].verbosity must be between 0 and 2 (got {})",
            cfg.config.verbosity
        )));
    }
    if cfg.config.data_dir.trim().is_empty() || cfg.config.output_dir.trim().is_empty() {
        return Err(config_error("[config].data_dir and output_dir must not be empty"));
    }
    Ok(())
}

/// Names must be non-empty, must not use the `group:item` separator, and
/// must be unique across tasks and groups.
fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    let names = cfg
        .task
        .iter()
        .map(|t| t.name.as_str())
        .chain(cfg.group.iter().map(|g| g.name.as_str()));

    for name in names {
        if name.trim().is_empty() {
            return Err(config_error("task and group names must not be empty"));
        }
        if name.contains(':') {
            return Err(config_error(format!(
                "name '{name}' must not contain ':' (reserved for expanded group tasks)"
            )));
        }
        if !seen.insert(name) {
            return Err(PipedagError::DuplicateTask(name.to_string()));
        }
    }
    Ok(())
}

fn validate_policy(
    kind: &str,
    name: &str,
    policy: StalenessPolicy,
    targets: &[String],
) -> Result<()> {
    match policy {
        StalenessPolicy::AlwaysRun if !targets.is_empty() => Err(config_error(format!(
            "{kind} '{name}' has policy \"always_run\" but declares targets; \
             use \"target_tracked\" or drop the targets"
        ))),
        StalenessPolicy::TargetTracked if targets.is_empty() => Err(config_error(format!(
            "{kind} '{name}' has policy \"target_tracked\" but declares no targets"
        ))),
        _ => Ok(()),
    }
}

fn validate_gate_ref(cfg: &RawConfigFile, kind: &str, name: &str, gate: Option<&str>) -> Result<()> {
    if let Some(gate) = gate {
        if !cfg.gate.contains_key(gate) {
            return Err(config_error(format!(
                "{kind} '{name}' refers to unknown gate '{gate}'"
            )));
        }
    }
    Ok(())
}

fn validate_verbosity(kind: &str, name: &str, verbosity: Option<u8>) -> Result<()> {
    match verbosity {
        Some(v) if Verbosity::new(v).is_none() => Err(config_error(format!(
            "{kind} '{name}' has verbosity {v}; expected 0, 1 or 2"
        ))),
        _ => Ok(()),
    }
}

fn validate_coverage(name: &str, cov: &CoverageConfig) -> Result<()> {
    if !(0.0..=1.0).contains(&cov.threshold) {
        return Err(config_error(format!(
            "task '{name}': coverage.threshold must be within [0, 1] (got {})",
            cov.threshold
        )));
    }
    if cov.series.is_empty() || cov.fields.is_empty() {
        return Err(config_error(format!(
            "task '{name}': coverage.series and coverage.fields must not be empty"
        )));
    }
    if let Some(end) = cov.end {
        if end < cov.start {
            return Err(config_error(format!(
                "task '{name}': coverage.end ({end}) is before coverage.start ({})",
                cov.start
            )));
        }
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for task in &cfg.task {
        validate_policy("task", &task.name, task.policy, &task.targets)?;
        validate_gate_ref(cfg, "task", &task.name, task.gate.as_deref())?;
        validate_verbosity("task", &task.name, task.verbosity)?;
        if let Some(cov) = &task.coverage {
            validate_coverage(&task.name, cov)?;
        }
    }
    Ok(())
}

fn validate_groups(cfg: &RawConfigFile) -> Result<()> {
    for group in &cfg.group {
        validate_policy("group", &group.name, group.policy, &group.targets)?;
        validate_gate_ref(cfg, "group", &group.name, group.gate.as_deref())?;
        validate_verbosity("group", &group.name, group.verbosity)?;

        if group.items.is_empty() {
            return Err(config_error(format!(
                "group '{}' must list at least one item",
                group.name
            )));
        }

        let mut stems = HashSet::new();
        for item in &group.items {
            let stem = item_stem(item);
            if !stems.insert(stem.clone()) {
                return Err(PipedagError::DuplicateTask(format!("{}:{}", group.name, stem)));
            }
        }
    }
    Ok(())
}

fn validate_placeholders(cfg: &RawConfigFile) -> Result<()> {
    let globals = Placeholders::globals(&cfg.config);

    for task in &cfg.task {
        let strings = task
            .actions
            .iter()
            .chain(task.file_dep.iter())
            .chain(task.targets.iter())
            .chain(task.coverage.iter().map(|c| &c.panel));
        for s in strings {
            globals
                .render(s, &[])
                .map_err(|e| config_error(format!("task '{}': {e}", task.name)))?;
        }
    }

    for group in &cfg.group {
        let strings = group
            .actions
            .iter()
            .chain(group.file_dep.iter())
            .chain(group.targets.iter());
        for s in strings {
            globals
                .render(s, &ITEM_KEYS)
                .map_err(|e| config_error(format!("group '{}': {e}", group.name)))?;
        }
    }
    Ok(())
}

/// Build the task graph once to surface dangling dependencies and cycles
/// at load time, before anything is prompted or executed.
fn validate_dag(cfg: &ConfigFile) -> Result<()> {
    TaskGraph::from_config(cfg).map(|_| ())
}
