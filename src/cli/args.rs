use std::path::PathBuf;

use clap::Parser;

/// Clones or updates the project's source dependencies and publishes them locally.
///
/// Without any flag the dependency list comes from `dependencies.toml` when present
/// and from the built-in table otherwise.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    /// TOML file listing the dependencies
    #[clap(short, long)]
    pub file: Option<PathBuf>,
    /// Directory dependencies are cloned into, overriding the dependency file
    #[clap(short, long)]
    pub root: Option<PathBuf>,
    /// Continue with the remaining dependencies when one fails
    #[clap(short, long)]
    pub keep_going: bool,
    /// Fail when the submodule update or a build exits with a non-zero status
    #[clap(short, long)]
    pub strict: bool,
    /// Do not run `git submodule update --recursive --init` first
    #[clap(long)]
    pub skip_submodules: bool,
    /// Command run inside each dependency after pulling
    #[clap(short, long)]
    pub build_command: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn no_arguments() {
        let args = CliArgs::try_parse_from(["depsync"]).unwrap();
        assert!(args.file.is_none());
        assert!(!args.keep_going);
        assert!(!args.strict);
        assert!(!args.skip_submodules);
    }

    #[test]
    fn all_arguments() {
        let args = CliArgs::try_parse_from([
            "depsync",
            "--file",
            "deps.toml",
            "-r",
            "libs",
            "-k",
            "--strict",
            "--skip-submodules",
            "-b",
            "sbt +publishLocal",
        ])
        .unwrap();
        assert_eq!(args.file, Some(PathBuf::from("deps.toml")));
        assert_eq!(args.root, Some(PathBuf::from("libs")));
        assert!(args.keep_going && args.strict && args.skip_submodules);
        assert_eq!(args.build_command.as_deref(), Some("sbt +publishLocal"));
    }
}
