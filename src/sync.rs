//! Clone-or-update of every configured dependency followed by a local publish.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    command::{run_checked, CommandFailure, CommandResult, CommandRunner, ShellCommand},
    git::{GitBackend, GitError, LocalRepository, PullOutcome},
    model::{DependencyName, DependencySet, DependencySpec},
    ui::{Severity, StatusLine, StatusSink},
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const SLOW_STEP: &str = "(this might take a while)";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Submodule update failed: {0}")]
    SubmoduleUpdate(#[source] CommandFailure),
    #[error("Could not create dependency directory {path}: {source}")]
    RootDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to clone {name} from {url}: {source}")]
    Clone {
        name: DependencyName,
        url: String,
        #[source]
        source: GitError,
    },
    #[error("Branch {branch} was not found in {name}")]
    BranchNotFound {
        name: DependencyName,
        branch: String,
    },
    #[error("Failed to check out a branch in {name}: {source}")]
    Checkout {
        name: DependencyName,
        #[source]
        source: GitError,
    },
    #[error("Failed to open the repository of {name} at {path}: {source}")]
    Open {
        name: DependencyName,
        path: PathBuf,
        #[source]
        source: GitError,
    },
    #[error("Failed to pull {name}: {source}")]
    Pull {
        name: DependencyName,
        #[source]
        source: GitError,
    },
    #[error("Build of {name} failed: {source}")]
    BuildInvocation {
        name: DependencyName,
        #[source]
        source: CommandFailure,
    },
}

/// What happens to the remaining dependencies once one of them fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    #[default]
    FailFast,
    KeepGoing,
}

/// Whether a failing external command fails the dependency.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CommandPolicy {
    /// Failures are logged and otherwise ignored.
    #[default]
    BestEffort,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub failure_policy: FailurePolicy,
    pub command_policy: CommandPolicy,
    pub build_command: ShellCommand,
    pub submodules: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            failure_policy: FailurePolicy::default(),
            command_policy: CommandPolicy::default(),
            build_command: ShellCommand::publish_local(),
            submodules: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Cloned,
    Opened,
}

#[derive(Debug)]
pub struct EntryOutcome {
    pub name: DependencyName,
    pub path: PathBuf,
    pub action: SyncAction,
    /// Branch checked out after a fresh clone.
    pub checked_out: Option<String>,
    pub pull: PullOutcome,
    /// Result of the publish command. Under [`CommandPolicy::BestEffort`] a failure
    /// ends up here instead of failing the dependency.
    pub build: Result<CommandResult, CommandFailure>,
}

#[derive(Debug)]
pub struct EntryFailure {
    pub name: DependencyName,
    pub error: SyncError,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<EntryOutcome>,
    /// Only populated under [`FailurePolicy::KeepGoing`].
    pub failures: Vec<EntryFailure>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs one synchronisation over a [`DependencySet`].
///
/// Relative paths in the dependency set, as well as the submodule update, are
/// resolved against `working_directory`.
pub struct Syncer<'a, G: ?Sized, R: ?Sized, S: ?Sized> {
    set: &'a DependencySet,
    options: &'a SyncOptions,
    working_directory: &'a Path,
    git: &'a G,
    runner: &'a R,
    sink: &'a S,
}

impl<'a, G, R, S> Syncer<'a, G, R, S>
where
    G: GitBackend + ?Sized,
    R: CommandRunner + ?Sized,
    S: StatusSink + ?Sized,
{
    pub fn new(
        set: &'a DependencySet,
        options: &'a SyncOptions,
        working_directory: &'a Path,
        git: &'a G,
        runner: &'a R,
        sink: &'a S,
    ) -> Self {
        Syncer {
            set,
            options,
            working_directory,
            git,
            runner,
            sink,
        }
    }

    /// Updates submodules, prints the header, ensures the root directory and
    /// synchronises every dependency.
    pub fn initialize(&self) -> Result<SyncReport, SyncError> {
        if self.options.submodules {
            self.update_submodules()?;
        }

        self.sink.emit(StatusLine::new(
            Severity::Header,
            format!("[{}] Dependency Tool v{}", self.set.project, VERSION),
        ));

        self.ensure_root()?;
        self.sync_all()
    }

    /// Creates the dependency root if it is missing. Returns whether it was created.
    pub fn ensure_root(&self) -> Result<bool, SyncError> {
        let root = self.working_directory.join(&self.set.root);
        if root.exists() {
            debug!("Dependency directory {} already exists", root.display());
            return Ok(false);
        }

        self.sink.emit(
            StatusLine::new(Severity::Warning, "-- Creating dependency directory at:")
                .then(Severity::Target, self.set.root.display().to_string()),
        );
        std::fs::create_dir_all(&root).map_err(|source| SyncError::RootDirectory {
            path: root.clone(),
            source,
        })?;
        Ok(true)
    }

    /// Synchronises the dependencies in order, honouring the [`FailurePolicy`].
    pub fn sync_all(&self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        for dependency in &self.set.dependencies {
            match self.sync_one(dependency) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(error) => match self.options.failure_policy {
                    FailurePolicy::FailFast => return Err(error),
                    FailurePolicy::KeepGoing => {
                        warn!("Skipping {}: {}", dependency.name, error);
                        self.sink.emit(StatusLine::new(
                            Severity::Warning,
                            format!("-- {} failed: {}", dependency.name, error),
                        ));
                        report.failures.push(EntryFailure {
                            name: dependency.name.clone(),
                            error,
                        });
                    }
                },
            }
        }

        info!(
            "Synchronised {} of {} dependencies",
            report.outcomes.len(),
            self.set.dependencies.len()
        );
        Ok(report)
    }

    /// Clones or opens one dependency, pulls it and runs the publish command in it.
    ///
    /// The branch is only checked out right after a fresh clone. An existing
    /// working copy stays on whatever branch it is on.
    pub fn sync_one(&self, dependency: &DependencySpec) -> Result<EntryOutcome, SyncError> {
        let name = &dependency.name;
        self.sink.emit(StatusLine::new(Severity::Header, format!("-- {name}")));

        let display_path = self.set.local_path(dependency);
        let path = self.working_directory.join(&display_path);

        let (repo, action, checked_out) = if !path.exists() {
            self.sink.emit(
                StatusLine::new(Severity::Progress, format!("-- git clone {}", dependency.url))
                    .then(Severity::Target, display_path.display().to_string()),
            );
            self.sink.emit(StatusLine::new(Severity::Warning, SLOW_STEP));
            let repo = self
                .git
                .clone_into(&dependency.url, &path)
                .map_err(|source| SyncError::Clone {
                    name: name.clone(),
                    url: dependency.url.clone(),
                    source,
                })?;

            if let Some(branch) = &dependency.branch {
                self.sink.emit(
                    StatusLine::new(Severity::Progress, "-- checking out branch:")
                        .then(Severity::Target, branch.as_str()),
                );
                repo.checkout(branch).map_err(|source| match source {
                    GitError::BranchNotFound { branch } => SyncError::BranchNotFound {
                        name: name.clone(),
                        branch,
                    },
                    source => SyncError::Checkout {
                        name: name.clone(),
                        source,
                    },
                })?;
            }
            (repo, SyncAction::Cloned, dependency.branch.clone())
        } else {
            self.sink.emit(StatusLine::new(Severity::Progress, "-- repo already cloned"));
            let repo = self.git.open(&path).map_err(|source| SyncError::Open {
                name: name.clone(),
                path: path.clone(),
                source,
            })?;
            (repo, SyncAction::Opened, None)
        };

        self.sink.emit(StatusLine::new(Severity::Progress, "-- git pull"));
        let pull = repo.pull().map_err(|source| SyncError::Pull {
            name: name.clone(),
            source,
        })?;

        let build = self.publish(name, &path)?;

        Ok(EntryOutcome {
            name: name.clone(),
            path,
            action,
            checked_out,
            pull,
            build,
        })
    }

    fn publish(
        &self,
        name: &DependencyName,
        path: &Path,
    ) -> Result<Result<CommandResult, CommandFailure>, SyncError> {
        let command = &self.options.build_command;
        self.sink.emit(StatusLine::new(
            Severity::Progress,
            format!("-- running {command}"),
        ));
        self.sink.emit(StatusLine::new(Severity::Warning, SLOW_STEP));

        match (
            run_checked(self.runner, path, command),
            self.options.command_policy,
        ) {
            (Err(source), CommandPolicy::Strict) => Err(SyncError::BuildInvocation {
                name: name.clone(),
                source,
            }),
            (Err(failure), CommandPolicy::BestEffort) => {
                warn!("Ignoring failed build of {}: {}", name, failure);
                Ok(Err(failure))
            }
            (Ok(result), _) => Ok(Ok(result)),
        }
    }

    fn update_submodules(&self) -> Result<(), SyncError> {
        let command = ShellCommand::submodule_update();
        match run_checked(self.runner, self.working_directory, &command) {
            Ok(_) => Ok(()),
            Err(failure @ CommandFailure::Spawn { .. }) => Err(SyncError::SubmoduleUpdate(failure)),
            Err(failure) => match self.options.command_policy {
                CommandPolicy::Strict => Err(SyncError::SubmoduleUpdate(failure)),
                CommandPolicy::BestEffort => {
                    warn!("Ignoring failed submodule update: {}", failure);
                    Ok(())
                }
            },
        }
    }
}
