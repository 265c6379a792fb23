use std::path::Path;

use thiserror::Error;

pub mod backend;
pub mod repository;

pub use backend::Git2Backend;
pub use repository::Git2Repository;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    #[error("Branch {branch} was not found.")]
    BranchNotFound { branch: String },
    #[error("HEAD is detached, there is no branch to pull into.")]
    DetachedHead,
    #[error("Branch {branch} has no upstream branch configured.")]
    NoUpstream { branch: String },
    #[error("Local changes would be overwritten by the update.")]
    LocalChanges,
    #[error("Merging {upstream} into {branch} produced conflicts, resolve them and commit.")]
    MergeConflict { branch: String, upstream: String },
    #[error("Reference name is not valid UTF-8")]
    InvalidReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    UpToDate,
    FastForward,
    Merged,
}

/// Creates and opens local working copies.
pub trait GitBackend {
    type Repository<'a>: LocalRepository
    where
        Self: 'a;

    fn clone_into<'a>(&'a self, url: &str, path: &Path) -> Result<Self::Repository<'a>, GitError>;

    fn open<'a>(&'a self, path: &Path) -> Result<Self::Repository<'a>, GitError>;
}

/// A working copy with a checked-out branch.
pub trait LocalRepository {
    fn checkout(&self, branch: &str) -> Result<(), GitError>;

    /// Fetches the upstream of the current branch and merges it in.
    fn pull(&self) -> Result<PullOutcome, GitError>;
}
