// src/config/placeholders.rs

//! `{name}` substitution in task strings.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::model::ConfigSection;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex"));

/// Names only meaningful inside a `[[group]]`.
pub const ITEM_KEYS: [&str; 2] = ["item", "stem"];

/// A set of known placeholder values.
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    values: BTreeMap<String, String>,
}

impl Placeholders {
    /// Placeholders available to every task string.
    pub fn globals(cfg: &ConfigSection) -> Self {
        let mut values = BTreeMap::new();
        values.insert("data_dir".to_string(), cfg.data_dir.clone());
        values.insert("output_dir".to_string(), cfg.output_dir.clone());
        values.insert("notebook_build_dir".to_string(), cfg.notebook_build_dir());
        Self { values }
    }

    /// Values for a single group item: `{item}` and `{stem}`.
    pub fn for_item(item: &str) -> Self {
        let mut values = BTreeMap::new();
        values.insert("item".to_string(), item.to_string());
        values.insert("stem".to_string(), item_stem(item));
        Self { values }
    }

    /// Render `input`, leaving unknown placeholders untouched.
    pub fn render_partial(&self, input: &str) -> String {
        PLACEHOLDER
            .replace_all(input, |caps: &Captures| {
                self.values
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Render `input`, failing on the first placeholder that is not in
    /// `self` nor in `allowed_pending`.
    ///
    /// `allowed_pending` names are left untouched for a later pass (used for
    /// `{item}` / `{stem}` in group strings).
    pub fn render(&self, input: &str, allowed_pending: &[&str]) -> Result<String, String> {
        let mut unknown: Option<String> = None;
        let rendered = PLACEHOLDER.replace_all(input, |caps: &Captures| {
            let key = &caps[1];
            match self.values.get(key) {
                Some(v) => v.clone(),
                None => {
                    if !allowed_pending.contains(&key) && unknown.is_none() {
                        unknown = Some(key.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });

        match unknown {
            Some(key) => Err(format!("unknown placeholder '{{{key}}}' in \"{input}\"")),
            None => Ok(rendered.into_owned()),
        }
    }
}

/// File stem of a group item (`src/summary.py` → `summary`).
pub fn item_stem(item: &str) -> String {
    Path::new(item)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| item.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_globals() {
        let p = Placeholders::globals(&ConfigSection::default());
        assert_eq!(
            p.render("mkdir -p {notebook_build_dir}", &[]).unwrap(),
            "mkdir -p _output/_notebook_build"
        );
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let p = Placeholders::globals(&ConfigSection::default());
        let err = p.render("cp {data_dr}/x .", &[]).unwrap_err();
        assert!(err.contains("{data_dr}"));
    }

    #[test]
    fn pending_item_keys_survive_first_pass() {
        let p = Placeholders::globals(&ConfigSection::default());
        let s = p.render("{output_dir}/{stem}.html", &ITEM_KEYS).unwrap();
        assert_eq!(s, "_output/{stem}.html");
        assert_eq!(
            Placeholders::for_item("src/summary_ipynb.py").render_partial(&s),
            "_output/summary_ipynb.html"
        );
    }

    #[test]
    fn non_identifier_braces_are_left_alone() {
        let p = Placeholders::globals(&ConfigSection::default());
        assert_eq!(p.render("awk '{ print $1 }'", &[]).unwrap(), "awk '{ print $1 }'");
    }
}
