use std::process::ExitCode;

use clap::Parser;
use depsync::{cli::args::CliArgs, sync::FailurePolicy, DependencySync};
use log::{error, warn};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<bool> {
    let cli_args: CliArgs = CliArgs::parse();

    let mut builder = DependencySync::builder();
    if let Some(file) = cli_args.file {
        builder = builder.dependency_file(file);
    }
    if let Some(root) = cli_args.root {
        builder = builder.root(root);
    }
    if let Some(command) = cli_args.build_command {
        builder = builder.build_command(command);
    }
    if cli_args.keep_going {
        builder = builder.failure_policy(FailurePolicy::KeepGoing);
    }
    if cli_args.strict {
        builder = builder.strict(true);
    }
    if cli_args.skip_submodules {
        builder = builder.submodules(false);
    }

    let report = builder.try_build()?.sync()?;
    for failure in &report.failures {
        warn!("{} was not synchronised: {}", failure.name, failure.error);
    }
    Ok(report.is_success())
}
