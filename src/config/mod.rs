// src/config/mod.rs

//! Configuration loading and validation for pipedag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like policy/target consistency and DAG
//!   correctness (`validate.rs`).
//! - Substitute `{placeholders}` in task strings (`placeholders.rs`).
//! - Turn a validated config into task declarations and templates
//!   (`declarations.rs`).

pub mod declarations;
pub mod loader;
pub mod model;
pub mod placeholders;
pub mod validate;

pub use declarations::declarations;
pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{
    ConfigFile, ConfigSection, CoverageConfig, GateConfig, GroupConfig, RawConfigFile, TaskConfig,
};
