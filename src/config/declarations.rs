// src/config/declarations.rs

//! Turn a validated [`ConfigFile`] into task declarations and templates.
//!
//! Global placeholders are rendered here; `{item}` / `{stem}` in group
//! strings are left for template expansion.

use chrono::Local;

use crate::config::model::{ConfigFile, CoverageConfig, GroupConfig, TaskConfig};
use crate::config::placeholders::{ITEM_KEYS, Placeholders};
use crate::coverage::{CoverageCheck, DateRange, pairs};
use crate::dag::task::{ActionDescriptor, Task, TaskTemplate};
use crate::errors::{PipedagError, Result};
use crate::types::Verbosity;

/// Plain tasks in declaration order, plus one template per group.
pub fn declarations(cfg: &ConfigFile) -> Result<(Vec<Task>, Vec<TaskTemplate>)> {
    let globals = Placeholders::globals(&cfg.config);
    let default_verbosity = Verbosity::new(cfg.config.verbosity).unwrap_or_default();

    let tasks = cfg
        .task
        .iter()
        .map(|tc| task_from_config(tc, &globals, default_verbosity))
        .collect::<Result<Vec<_>>>()?;

    let templates = cfg
        .group
        .iter()
        .map(|gc| template_from_config(gc, &globals, default_verbosity))
        .collect::<Result<Vec<_>>>()?;

    Ok((tasks, templates))
}

fn task_from_config(
    tc: &TaskConfig,
    globals: &Placeholders,
    default_verbosity: Verbosity,
) -> Result<Task> {
    let render = |s: &String| render_strict(globals, s, &[]);

    Ok(Task {
        name: tc.name.clone(),
        doc: tc.doc.clone(),
        actions: tc
            .actions
            .iter()
            .map(|a| render(a).map(ActionDescriptor::shell))
            .collect::<Result<_>>()?,
        deps: tc.after.clone(),
        file_deps: tc
            .file_dep
            .iter()
            .map(|p| render(p).map(Into::into))
            .collect::<Result<_>>()?,
        targets: tc
            .targets
            .iter()
            .map(|p| render(p).map(Into::into))
            .collect::<Result<_>>()?,
        policy: tc.policy,
        gate: tc.gate.clone(),
        verbosity: task_verbosity(tc.verbosity, default_verbosity),
        coverage: tc
            .coverage
            .as_ref()
            .map(|c| coverage_check(c, globals))
            .transpose()?,
        group: None,
    })
}

fn template_from_config(
    gc: &GroupConfig,
    globals: &Placeholders,
    default_verbosity: Verbosity,
) -> Result<TaskTemplate> {
    let render_all = |values: &[String]| -> Result<Vec<String>> {
        values
            .iter()
            .map(|s| render_strict(globals, s, &ITEM_KEYS))
            .collect()
    };

    Ok(TaskTemplate {
        group: gc.name.clone(),
        doc: gc.doc.clone(),
        items: gc.items.clone(),
        actions: render_all(&gc.actions)?,
        deps: gc.after.clone(),
        file_deps: render_all(&gc.file_dep)?,
        targets: render_all(&gc.targets)?,
        policy: gc.policy,
        gate: gc.gate.clone(),
        verbosity: task_verbosity(gc.verbosity, default_verbosity),
    })
}

fn coverage_check(cc: &CoverageConfig, globals: &Placeholders) -> Result<CoverageCheck> {
    let end = cc.end.unwrap_or_else(|| Local::now().date_naive());
    Ok(CoverageCheck {
        panel: render_strict(globals, &cc.panel, &[])?.into(),
        pairs: pairs(&cc.series, &cc.fields),
        range: DateRange::new(cc.start, end),
        date_column: cc.date_column.clone(),
        threshold: cc.threshold,
    })
}

fn task_verbosity(level: Option<u8>, default: Verbosity) -> Verbosity {
    level.and_then(Verbosity::new).unwrap_or(default)
}

fn render_strict(globals: &Placeholders, input: &str, pending: &[&str]) -> Result<String> {
    globals
        .render(input, pending)
        .map_err(PipedagError::ConfigError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::load_from_str;
    use crate::config::model::ConfigFile;
    use std::path::PathBuf;

    fn parse(toml: &str) -> ConfigFile {
        ConfigFile::try_from(load_from_str(toml).unwrap()).unwrap()
    }

    #[test]
    fn globals_are_rendered_and_verbosity_inherited() {
        let cfg = parse(
            r#"
            [config]
            data_dir = "data"
            verbosity = 2

            [[task]]
            name = "pull"
            policy = "target_tracked"
            actions = ["python pull.py --out {data_dir}/raw.csv"]
            targets = ["{data_dir}/raw.csv"]

            [[task]]
            name = "calc"
            policy = "always_run"
            after = ["pull"]
            verbosity = 0
            "#,
        );

        let (tasks, templates) = declarations(&cfg).unwrap();
        assert!(templates.is_empty());
        assert_eq!(tasks[0].actions[0].command(), "python pull.py --out data/raw.csv");
        assert_eq!(tasks[0].targets, vec![PathBuf::from("data/raw.csv")]);
        assert_eq!(tasks[0].verbosity, Verbosity::FULL);
        assert_eq!(tasks[1].verbosity, Verbosity::QUIET);
    }

    #[test]
    fn group_strings_keep_item_placeholders() {
        let cfg = parse(
            r#"
            [[group]]
            name = "run_notebooks"
            policy = "target_tracked"
            items = ["src/summary.ipynb"]
            actions = ["jupyter nbconvert --execute {item} --output-dir {notebook_build_dir}"]
            targets = ["{notebook_build_dir}/{stem}.html"]
            "#,
        );

        let (_, templates) = declarations(&cfg).unwrap();
        assert_eq!(
            templates[0].targets,
            vec!["_output/_notebook_build/{stem}.html".to_string()]
        );
        assert!(templates[0].actions[0].contains("{item}"));
    }

    #[test]
    fn coverage_end_defaults_to_today() {
        let cfg = parse(
            r#"
            [[task]]
            name = "pull_basis"
            policy = "target_tracked"
            targets = ["{data_dir}/basis.json"]

            [task.coverage]
            panel = "{data_dir}/basis.json"
            series = ["CL1", "NG1"]
            fields = ["PX_LAST"]
            start = "2020-01-01"
            "#,
        );

        let (tasks, _) = declarations(&cfg).unwrap();
        let check = tasks[0].coverage.as_ref().unwrap();
        assert_eq!(check.panel, PathBuf::from("_data/basis.json"));
        assert_eq!(check.pairs.len(), 2);
        assert_eq!(check.range.end, Local::now().date_naive());
        assert_eq!(check.threshold, crate::coverage::DEFAULT_THRESHOLD);
    }
}
