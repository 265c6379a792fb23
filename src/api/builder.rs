use std::{env, path::PathBuf};

use anyhow::Context;

use crate::{
    command::ShellCommand,
    config::DepsyncConfig,
    git::Git2Backend,
    model::DependencySet,
    sync::{CommandPolicy, FailurePolicy, SyncOptions},
    DependencySync,
};

const DEFAULT_DEPENDENCY_FILE: &str = "dependencies.toml";

#[derive(Default)]
pub struct DependencySyncBuilder {
    // All other paths are relative to `working_directory`
    working_directory: Option<PathBuf>,
    dependency_file: Option<PathBuf>,
    root: Option<PathBuf>,
    failure_policy: Option<FailurePolicy>,
    strict: Option<bool>,
    build_command: Option<String>,
    submodules: Option<bool>,
}

impl DependencySyncBuilder {
    /// Directory the submodule update runs in and relative paths resolve against.
    ///
    /// Defaults to the current directory.
    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    /// TOML file listing the dependencies.
    ///
    /// Defaults to `dependencies.toml`, falling back to the embedded table when
    /// that file does not exist. A file set here must exist.
    pub fn dependency_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.dependency_file = Some(path.into());
        self
    }

    /// Overrides the directory dependencies are cloned into.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    /// Fail on a non-zero exit of the submodule update or the build command.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Command line run in each dependency after pulling.
    ///
    /// Defaults to `sbt publishLocal`.
    pub fn build_command(mut self, command: impl Into<String>) -> Self {
        self.build_command = Some(command.into());
        self
    }

    pub fn submodules(mut self, enabled: bool) -> Self {
        self.submodules = Some(enabled);
        self
    }

    pub fn try_build(self) -> anyhow::Result<DependencySync> {
        let environment = DepsyncConfig::load()?;
        self.build_with(environment)
    }

    fn build_with(self, environment: DepsyncConfig) -> anyhow::Result<DependencySync> {
        let Self {
            working_directory,
            dependency_file,
            root,
            failure_policy,
            strict,
            build_command,
            submodules,
        } = self;
        let working_directory = match working_directory {
            Some(path) => path,
            None => env::current_dir()?,
        };

        let mut dependencies = match dependency_file.or(environment.dependency_file) {
            Some(file) => {
                let file = working_directory.join(file);
                DependencySet::from_file(&file)
                    .with_context(|| format!("Could not load {}", file.display()))?
            }
            None => DependencySet::from_file_or_embedded(
                &working_directory.join(DEFAULT_DEPENDENCY_FILE),
            )?,
        };
        if let Some(root) = root {
            dependencies.root = root;
        }

        let build_command = match build_command.or(environment.build_command) {
            Some(line) => ShellCommand::parse(&line)
                .with_context(|| format!("Build command `{line}` is empty"))?,
            None => ShellCommand::publish_local(),
        };

        let command_policy = if strict.or(environment.strict).unwrap_or(false) {
            CommandPolicy::Strict
        } else {
            CommandPolicy::BestEffort
        };

        let options = SyncOptions {
            failure_policy: failure_policy
                .or(environment.failure_policy)
                .unwrap_or_default(),
            command_policy,
            build_command,
            submodules: submodules.or(environment.submodules).unwrap_or(true),
        };

        let git = Git2Backend::open_default()?;

        Ok(DependencySync {
            dependencies,
            options,
            working_directory,
            git,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_use_embedded_table() {
        let dir = tempfile::tempdir().unwrap();
        let sync = DependencySyncBuilder::default()
            .working_directory(dir.path())
            .build_with(DepsyncConfig::default())
            .unwrap();
        assert_eq!(sync.dependencies(), &DependencySet::embedded());
        assert_eq!(sync.options(), &SyncOptions::default());
    }

    #[test]
    fn builder_overrides_environment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("deps.toml"),
            r#"
                path = "libs"
                [libA]
                    url = "url-A"
            "#,
        )
        .unwrap();
        let environment = DepsyncConfig {
            dependency_file: Some("deps.toml".into()),
            failure_policy: Some(FailurePolicy::KeepGoing),
            build_command: Some("make install".to_owned()),
            strict: Some(true),
            submodules: Some(false),
        };
        let sync = DependencySyncBuilder::default()
            .working_directory(dir.path())
            .root("elsewhere")
            .strict(false)
            .build_command("sbt +publishLocal")
            .build_with(environment)
            .unwrap();

        assert_eq!(sync.dependencies().root, PathBuf::from("elsewhere"));
        assert_eq!(sync.dependencies().dependencies.len(), 1);
        assert_eq!(
            sync.options(),
            &SyncOptions {
                failure_policy: FailurePolicy::KeepGoing,
                command_policy: CommandPolicy::BestEffort,
                build_command: ShellCommand::new("sbt", ["+publishLocal"]),
                submodules: false,
            }
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DependencySyncBuilder::default()
            .working_directory(dir.path())
            .dependency_file("missing.toml")
            .build_with(DepsyncConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn blank_build_command_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DependencySyncBuilder::default()
            .working_directory(dir.path())
            .build_command("  ")
            .build_with(DepsyncConfig::default());
        assert!(result.is_err());
    }
}
