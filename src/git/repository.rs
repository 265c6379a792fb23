use git2::{
    build::CheckoutBuilder, AnnotatedCommit, BranchType, ErrorCode, Repository, Signature,
};
use log::{debug, info};

use super::{backend::Git2Backend, GitError, LocalRepository, PullOutcome};

const DEFAULT_REMOTE: &str = "origin";

pub struct Git2Repository<'a> {
    backend: &'a Git2Backend,
    git_repo: Repository,
}

impl<'a> Git2Repository<'a> {
    pub fn new(backend: &'a Git2Backend, git_repo: Repository) -> Git2Repository<'a> {
        Git2Repository { backend, git_repo }
    }

    fn fast_forward(&self, refname: &str, target: &AnnotatedCommit) -> Result<(), GitError> {
        let object = self.git_repo.find_object(target.id(), None)?;
        // Check out first so that a dirty working tree aborts before the branch moves.
        self.git_repo
            .checkout_tree(&object, Some(CheckoutBuilder::new().safe()))
            .map_err(local_changes)?;
        match self.git_repo.find_reference(refname) {
            Ok(mut reference) => {
                reference.set_target(target.id(), "pull: fast-forward")?;
            }
            Err(error) if error.code() == ErrorCode::NotFound => {
                self.git_repo
                    .reference(refname, target.id(), false, "pull: initial")?;
            }
            Err(error) => return Err(error.into()),
        }
        self.git_repo.set_head(refname)?;
        Ok(())
    }

    fn merge(
        &self,
        branch: &str,
        upstream: &str,
        target: &AnnotatedCommit,
    ) -> Result<(), GitError> {
        let local_commit = self.git_repo.head()?.peel_to_commit()?;
        let remote_commit = self.git_repo.find_commit(target.id())?;

        self.git_repo
            .merge(&[target], None, Some(CheckoutBuilder::new().safe()))
            .map_err(local_changes)?;

        let mut index = self.git_repo.index()?;
        if index.has_conflicts() {
            // The merge state stays in place for the user to resolve, like `git pull`.
            return Err(GitError::MergeConflict {
                branch: branch.to_owned(),
                upstream: upstream.to_owned(),
            });
        }

        let tree = self.git_repo.find_tree(index.write_tree()?)?;
        let signature = self.signature()?;
        let message = format!("Merge remote-tracking branch '{upstream}' into {branch}");
        self.git_repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&local_commit, &remote_commit],
        )?;
        self.git_repo.cleanup_state()?;
        Ok(())
    }

    fn signature(&self) -> Result<Signature<'static>, GitError> {
        match self.git_repo.signature() {
            Ok(signature) => Ok(signature),
            Err(error) if error.code() == ErrorCode::NotFound => {
                Ok(Signature::now("depsync", "depsync@localhost")?)
            }
            Err(error) => Err(error.into()),
        }
    }
}

impl LocalRepository for Git2Repository<'_> {
    fn checkout(&self, branch: &str) -> Result<(), GitError> {
        let local = match self.git_repo.find_branch(branch, BranchType::Local) {
            Ok(local) => local,
            Err(error) if error.code() == ErrorCode::NotFound => {
                let remote_name = format!("{DEFAULT_REMOTE}/{branch}");
                let remote = self
                    .git_repo
                    .find_branch(&remote_name, BranchType::Remote)
                    .map_err(|error| match error.code() {
                        ErrorCode::NotFound | ErrorCode::InvalidSpec => GitError::BranchNotFound {
                            branch: branch.to_owned(),
                        },
                        _ => error.into(),
                    })?;
                let commit = remote.get().peel_to_commit()?;
                debug!("Creating local branch {} from {}", branch, remote_name);
                let mut local = self.git_repo.branch(branch, &commit, false)?;
                local.set_upstream(Some(remote_name.as_str()))?;
                local
            }
            Err(error) => return Err(error.into()),
        };

        let refname = local
            .get()
            .name()
            .ok_or(GitError::InvalidReference)?
            .to_owned();
        let object = local.get().peel(git2::ObjectType::Commit)?;
        self.git_repo
            .checkout_tree(&object, Some(CheckoutBuilder::new().safe()))
            .map_err(local_changes)?;
        self.git_repo.set_head(&refname)?;
        Ok(())
    }

    fn pull(&self) -> Result<PullOutcome, GitError> {
        let head = self.git_repo.head()?;
        if !head.is_branch() {
            return Err(GitError::DetachedHead);
        }
        let refname = head.name().ok_or(GitError::InvalidReference)?.to_owned();
        let branch = head.shorthand().ok_or(GitError::InvalidReference)?.to_owned();

        let upstream_refname = self
            .git_repo
            .branch_upstream_name(&refname)
            .map_err(|error| match error.code() {
                ErrorCode::NotFound => GitError::NoUpstream {
                    branch: branch.clone(),
                },
                _ => error.into(),
            })?;
        let upstream_refname = upstream_refname
            .as_str()
            .ok_or(GitError::InvalidReference)?
            .to_owned();
        let remote_name = self.git_repo.branch_upstream_remote(&refname)?;
        let remote_name = remote_name.as_str().ok_or(GitError::InvalidReference)?;

        debug!("Fetching {} for {}", remote_name, branch);
        let mut remote = self.git_repo.find_remote(remote_name)?;
        remote.fetch::<&str>(&[], Some(&mut self.backend.fetch_options()), None)?;

        let upstream = self.git_repo.find_reference(&upstream_refname)?;
        let upstream_short = upstream.shorthand().unwrap_or(&upstream_refname).to_owned();
        let target = self.git_repo.reference_to_annotated_commit(&upstream)?;
        let (analysis, _) = self.git_repo.merge_analysis(&[&target])?;

        if analysis.is_up_to_date() {
            debug!("{} is up to date with {}", branch, upstream_short);
            Ok(PullOutcome::UpToDate)
        } else if analysis.is_fast_forward() || analysis.is_unborn() {
            info!("Fast-forwarding {} to {}", branch, upstream_short);
            self.fast_forward(&refname, &target)?;
            Ok(PullOutcome::FastForward)
        } else {
            info!("Merging {} into {}", upstream_short, branch);
            self.merge(&branch, &upstream_short, &target)?;
            Ok(PullOutcome::Merged)
        }
    }
}

fn local_changes(error: git2::Error) -> GitError {
    match error.code() {
        ErrorCode::Conflict | ErrorCode::Uncommitted => GitError::LocalChanges,
        _ => error.into(),
    }
}
