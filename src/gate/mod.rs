// src/gate/mod.rs

//! Source-availability gates.
//!
//! A gate decides, once per run and before the graph is built, whether
//! tasks that pull from an external source may run or must degrade to a
//! no-op. Decisions live in an explicit [`GateDecisions`] value handed to
//! the scheduler.

pub mod prompt;
pub mod resolver;

use std::collections::BTreeMap;
use std::fmt;

pub use prompt::{PromptAnswer, Prompter, StdinPrompter, map_response};
pub use resolver::{EnvSource, GateResolver, ProcessEnv, is_truthy};

/// Outcome of resolving a gate. `Abort` is not a decision: it surfaces as
/// [`crate::errors::PipedagError::GateAbort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateDecision {
    #[default]
    Undecided,
    Available,
    Unavailable,
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateDecision::Undecided => "undecided",
            GateDecision::Available => "available",
            GateDecision::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// Immutable set of gate decisions for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateDecisions {
    decisions: BTreeMap<String, GateDecision>,
}

impl GateDecisions {
    /// Decision for `gate`; gates never resolved are `Undecided`.
    pub fn decision(&self, gate: &str) -> GateDecision {
        self.decisions.get(gate).copied().unwrap_or_default()
    }

    pub fn with(mut self, gate: impl Into<String>, decision: GateDecision) -> Self {
        self.decisions.insert(gate.into(), decision);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, GateDecision)> {
        self.decisions.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}
