use std::{collections::HashMap, path::PathBuf};

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::sync::FailurePolicy;

/// Settings read from `DEPSYNC_*` environment variables.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DepsyncConfig {
    pub dependency_file: Option<PathBuf>,
    pub failure_policy: Option<FailurePolicy>,
    pub build_command: Option<String>,
    pub strict: Option<bool>,
    pub submodules: Option<bool>,
}

impl DepsyncConfig {
    pub fn load() -> anyhow::Result<Self> {
        let raw_config = RawConfig::load(None)?;

        Ok(Self {
            dependency_file: raw_config.sync.file,
            failure_policy: raw_config.sync.policy,
            build_command: raw_config.build.command,
            strict: raw_config.build.strict,
            submodules: raw_config.git.submodules,
        })
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    sync: SyncConfig,
    #[serde(default)]
    build: BuildConfig,
    #[serde(default)]
    git: GitConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct SyncConfig {
    file: Option<PathBuf>,
    policy: Option<FailurePolicy>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct BuildConfig {
    command: Option<String>,
    strict: Option<bool>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct GitConfig {
    submodules: Option<bool>,
}

impl RawConfig {
    fn load(env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                Environment::with_prefix("DEPSYNC")
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
