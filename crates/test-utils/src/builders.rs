#![allow(dead_code)]

use std::collections::BTreeMap;

use pipedag::config::{
    ConfigFile, ConfigSection, CoverageConfig, GateConfig, GroupConfig, RawConfigFile, TaskConfig,
};
use pipedag::errors::Result;
use pipedag::types::StalenessPolicy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                gate: BTreeMap::new(),
                task: Vec::new(),
                group: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn with_group(mut self, group: GroupConfig) -> Self {
        self.config.group.push(group);
        self
    }

    /// Gate with a skip variable and an available variable.
    pub fn with_gate(mut self, name: &str, skip_env: &str, available_env: &str) -> Self {
        self.config.gate.insert(
            name.to_string(),
            GateConfig {
                prompt: None,
                skip_env: Some(skip_env.to_string()),
                available_env: Some(available_env.to_string()),
            },
        );
        self
    }

    pub fn data_dir(mut self, dir: &str) -> Self {
        self.config.config.data_dir = dir.to_string();
        self
    }

    pub fn default_target(mut self, name: &str) -> Self {
        self.config.config.default_targets.push(name.to_string());
        self
    }

    pub fn verbosity(mut self, level: u8) -> Self {
        self.config.config.verbosity = level;
        self
    }

    /// Validate, returning the error instead of panicking.
    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(name: &str, policy: StalenessPolicy) -> Self {
        Self {
            task: TaskConfig {
                name: name.to_string(),
                doc: None,
                actions: vec![],
                after: vec![],
                file_dep: vec![],
                targets: vec![],
                policy,
                gate: None,
                verbosity: None,
                coverage: None,
            },
        }
    }

    pub fn always_run(name: &str) -> Self {
        Self::new(name, StalenessPolicy::AlwaysRun)
    }

    pub fn target_tracked(name: &str) -> Self {
        Self::new(name, StalenessPolicy::TargetTracked)
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.task.doc = Some(doc.to_string());
        self
    }

    pub fn action(mut self, cmd: &str) -> Self {
        self.task.actions.push(cmd.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn file_dep(mut self, path: &str) -> Self {
        self.task.file_dep.push(path.to_string());
        self
    }

    pub fn target(mut self, path: &str) -> Self {
        self.task.targets.push(path.to_string());
        self
    }

    pub fn gate(mut self, gate: &str) -> Self {
        self.task.gate = Some(gate.to_string());
        self
    }

    pub fn verbosity(mut self, level: u8) -> Self {
        self.task.verbosity = Some(level);
        self
    }

    pub fn coverage(mut self, coverage: CoverageConfig) -> Self {
        self.task.coverage = Some(coverage);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for `GroupConfig`.
pub struct GroupConfigBuilder {
    group: GroupConfig,
}

impl GroupConfigBuilder {
    pub fn new(name: &str, policy: StalenessPolicy) -> Self {
        Self {
            group: GroupConfig {
                name: name.to_string(),
                doc: None,
                items: vec![],
                actions: vec![],
                after: vec![],
                file_dep: vec![],
                targets: vec![],
                policy,
                gate: None,
                verbosity: None,
            },
        }
    }

    pub fn item(mut self, item: &str) -> Self {
        self.group.items.push(item.to_string());
        self
    }

    pub fn action(mut self, cmd: &str) -> Self {
        self.group.actions.push(cmd.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.group.after.push(dep.to_string());
        self
    }

    pub fn file_dep(mut self, path: &str) -> Self {
        self.group.file_dep.push(path.to_string());
        self
    }

    pub fn target(mut self, path: &str) -> Self {
        self.group.targets.push(path.to_string());
        self
    }

    pub fn build(self) -> GroupConfig {
        self.group
    }
}
