#![allow(dead_code)]

use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
};

use depsync::{
    command::{CommandResult, CommandRunner, ShellCommand},
    ui::{StatusLine, StatusSink},
};
use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature};

/// Records every invocation. Programs listed in `failing` exit with status 1.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    invocations: RefCell<Vec<(PathBuf, ShellCommand)>>,
    failing: Vec<String>,
}

impl RecordingRunner {
    pub fn failing(programs: &[&str]) -> Self {
        RecordingRunner {
            invocations: Default::default(),
            failing: programs.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn invocations(&self) -> Vec<(PathBuf, ShellCommand)> {
        self.invocations.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, directory: &Path, command: &ShellCommand) -> std::io::Result<CommandResult> {
        self.invocations
            .borrow_mut()
            .push((directory.to_path_buf(), command.clone()));
        let code = if self.failing.contains(&command.program) {
            1
        } else {
            0
        };
        Ok(CommandResult { code: Some(code) })
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: RefCell<Vec<StatusLine>>,
}

impl RecordingSink {
    pub fn plain_lines(&self) -> Vec<String> {
        self.lines.borrow().iter().map(StatusLine::plain).collect()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.plain_lines().iter().position(|l| l.starts_with(prefix))
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.position(prefix).is_some()
    }
}

impl StatusSink for RecordingSink {
    fn emit(&self, line: StatusLine) {
        self.lines.borrow_mut().push(line);
    }
}

/// A non-bare repository on `main` with a single commit.
pub fn init_remote(dir: &Path) -> Repository {
    let mut options = RepositoryInitOptions::new();
    options.initial_head("main");
    let repo = Repository::init_opts(dir, &options).unwrap();
    commit_file(&repo, "README.md", "hello\n", "initial commit");
    repo
}

pub fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    fs::write(workdir.join(name), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature = Signature::now("Test", "test@example.com").unwrap();
    let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
    let parents: Vec<&Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .unwrap()
}

/// Creates `branch` with one extra commit, leaving HEAD on `main`.
pub fn create_branch_with_commit(repo: &Repository, branch: &str, file: &str) -> Oid {
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch(branch, &head, false).unwrap();
    repo.set_head(&format!("refs/heads/{branch}")).unwrap();
    let oid = commit_file(repo, file, "branch content\n", "branch commit");
    repo.set_head("refs/heads/main").unwrap();
    repo.checkout_head(Some(git2::build::CheckoutBuilder::new().force()))
        .unwrap();
    oid
}

pub fn head_branch(path: &Path) -> String {
    let repo = Repository::open(path).unwrap();
    let head = repo.head().unwrap();
    head.shorthand().unwrap().to_owned()
}

pub fn head_commit(path: &Path) -> Oid {
    let repo = Repository::open(path).unwrap();
    let id = repo.head().unwrap().peel_to_commit().unwrap().id();
    id
}
