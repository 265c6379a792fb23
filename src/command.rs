use std::{fmt::Display, path::Path, process::Command};

use log::debug;
use thiserror::Error;

/// An external program invocation: a program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ShellCommand {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits a command line on whitespace. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(ShellCommand::new(program, parts))
    }

    pub fn submodule_update() -> Self {
        ShellCommand::new("git", ["submodule", "update", "--recursive", "--init"])
    }

    pub fn publish_local() -> Self {
        ShellCommand::new("sbt", ["publishLocal"])
    }
}

impl Display for ShellCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How an external command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl Display for CommandResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

pub trait CommandRunner {
    /// Runs `command` with `directory` as its working directory.
    ///
    /// An `Err` means the command could not be started at all.
    fn run(&self, directory: &Path, command: &ShellCommand) -> std::io::Result<CommandResult>;
}

/// Spawns real processes. Output goes straight to the console.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, directory: &Path, command: &ShellCommand) -> std::io::Result<CommandResult> {
        debug!("Running `{}` in {}", command, directory.display());
        let status = Command::new(&command.program)
            .args(&command.args)
            .current_dir(directory)
            .status()?;
        Ok(CommandResult {
            code: status.code(),
        })
    }
}

#[derive(Error, Debug)]
pub enum CommandFailure {
    #[error("could not start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` finished with {result}")]
    Exit {
        command: String,
        result: CommandResult,
    },
}

/// Runs `command` and turns anything but a zero exit status into a [`CommandFailure`].
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    directory: &Path,
    command: &ShellCommand,
) -> Result<CommandResult, CommandFailure> {
    match runner.run(directory, command) {
        Ok(result) if result.success() => Ok(result),
        Ok(result) => Err(CommandFailure::Exit {
            command: command.to_string(),
            result,
        }),
        Err(source) => Err(CommandFailure::Spawn {
            command: command.to_string(),
            source,
        }),
    }
}
