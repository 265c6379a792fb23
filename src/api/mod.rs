use std::path::PathBuf;

use crate::{
    command::SystemCommandRunner,
    git::Git2Backend,
    model::DependencySet,
    sync::{SyncOptions, SyncReport, Syncer},
    ui::TerminalSink,
};

mod builder;

pub use builder::DependencySyncBuilder;

pub struct DependencySync {
    dependencies: DependencySet,
    options: SyncOptions,
    working_directory: PathBuf,
    git: Git2Backend,
}

impl DependencySync {
    pub fn builder() -> DependencySyncBuilder {
        DependencySyncBuilder::default()
    }

    pub fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Updates submodules, then clones or pulls and publishes every dependency,
    /// printing colored status lines to the terminal.
    pub fn sync(&self) -> anyhow::Result<SyncReport> {
        let syncer = Syncer::new(
            &self.dependencies,
            &self.options,
            &self.working_directory,
            &self.git,
            &SystemCommandRunner,
            &TerminalSink,
        );
        Ok(syncer.initialize()?)
    }
}
