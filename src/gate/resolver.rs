// src/gate/resolver.rs

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::config::model::{ConfigFile, GateConfig};
use crate::errors::{PipedagError, Result};
use crate::gate::prompt::{PromptAnswer, Prompter, map_response};
use crate::gate::{GateDecision, GateDecisions};

/// Read-only view of environment variables.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// `true`, `1` and `yes`, case-insensitive.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Resolves gates from environment overrides, falling back to the prompter.
pub struct GateResolver<'a, E: EnvSource, P: Prompter> {
    env: &'a E,
    prompter: &'a mut P,
}

impl<'a, E: EnvSource, P: Prompter> GateResolver<'a, E, P> {
    pub fn new(env: &'a E, prompter: &'a mut P) -> Self {
        Self { env, prompter }
    }

    fn flag(&self, var: Option<&str>) -> bool {
        var.and_then(|v| self.env.var(v))
            .is_some_and(|value| is_truthy(&value))
    }

    /// Resolve a single gate.
    ///
    /// 1. force-skip variable truthy ⇒ `Unavailable`;
    /// 2. force-available variable truthy ⇒ `Available`;
    /// 3. otherwise ask the operator.
    ///
    /// A negative or quit answer is a [`PipedagError::GateAbort`].
    pub fn resolve(&mut self, name: &str, gate: &GateConfig) -> Result<GateDecision> {
        if self.flag(gate.skip_env.as_deref()) {
            info!(gate = %name, "source forced unavailable by environment");
            return Ok(GateDecision::Unavailable);
        }
        if self.flag(gate.available_env.as_deref()) {
            info!(gate = %name, "source forced available by environment");
            return Ok(GateDecision::Available);
        }

        let question = gate
            .prompt
            .clone()
            .unwrap_or_else(|| format!("Is source '{name}' available?"));
        let answer = self.prompter.ask(&question)?;

        match map_response(&answer) {
            PromptAnswer::Yes => Ok(GateDecision::Available),
            PromptAnswer::Abort => Err(PipedagError::GateAbort {
                gate: name.to_string(),
            }),
            PromptAnswer::Default => {
                info!(gate = %name, "source not confirmed; using data already on disk");
                Ok(GateDecision::Unavailable)
            }
        }
    }

    /// Resolve every gate that some task or group refers to, once each, in
    /// name order.
    pub fn resolve_all(&mut self, cfg: &ConfigFile) -> Result<GateDecisions> {
        let referenced: BTreeSet<&str> = cfg
            .task
            .iter()
            .filter_map(|t| t.gate.as_deref())
            .chain(cfg.group.iter().filter_map(|g| g.gate.as_deref()))
            .collect();

        let mut decisions = GateDecisions::default();
        for name in referenced {
            let gate = cfg.gate.get(name).ok_or_else(|| {
                PipedagError::ConfigError(format!("gate '{name}' is not declared"))
            })?;
            let decision = self.resolve(name, gate)?;
            debug!(gate = %name, decision = %decision, "gate resolved");
            decisions = decisions.with(name, decision);
        }
        Ok(decisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result as AnyResult;

    #[derive(Default)]
    struct Scripted {
        answers: Vec<&'static str>,
        asked: Vec<String>,
    }

    impl Prompter for Scripted {
        fn ask(&mut self, question: &str) -> AnyResult<String> {
            self.asked.push(question.to_string());
            Ok(self.answers.remove(0).to_string())
        }
    }

    fn bloomberg() -> GateConfig {
        GateConfig {
            prompt: Some("Is the terminal open?".into()),
            skip_env: Some("SKIP_BBG".into()),
            available_env: Some("BBG_OPEN".into()),
        }
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn skip_wins_over_available_without_prompting() {
        let env = env(&[("SKIP_BBG", "Yes"), ("BBG_OPEN", "1")]);
        let mut prompter = Scripted::default();
        let decision = GateResolver::new(&env, &mut prompter)
            .resolve("bbg", &bloomberg())
            .unwrap();

        assert_eq!(decision, GateDecision::Unavailable);
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn available_env_skips_the_prompt() {
        let env = env(&[("SKIP_BBG", "0"), ("BBG_OPEN", "TRUE")]);
        let mut prompter = Scripted::default();
        let decision = GateResolver::new(&env, &mut prompter)
            .resolve("bbg", &bloomberg())
            .unwrap();
        assert_eq!(decision, GateDecision::Available);
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn prompt_answers_map_to_decisions() {
        let env = HashMap::new();
        let mut prompter = Scripted {
            answers: vec!["y", "", "whatever", "quit"],
            ..Default::default()
        };
        let mut resolver = GateResolver::new(&env, &mut prompter);

        assert_eq!(resolver.resolve("bbg", &bloomberg()).unwrap(), GateDecision::Available);
        assert_eq!(resolver.resolve("bbg", &bloomberg()).unwrap(), GateDecision::Unavailable);
        assert_eq!(resolver.resolve("bbg", &bloomberg()).unwrap(), GateDecision::Unavailable);
        let err = resolver.resolve("bbg", &bloomberg()).unwrap_err();
        assert!(matches!(err, PipedagError::GateAbort { gate } if gate == "bbg"));
        assert_eq!(prompter.asked[0], "Is the terminal open?");
    }

    #[test]
    fn truthy_values() {
        for v in ["true", "TRUE", "1", "yes", " Yes "] {
            assert!(is_truthy(v), "{v}");
        }
        for v in ["", "0", "false", "no", "on"] {
            assert!(!is_truthy(v), "{v}");
        }
    }
}
