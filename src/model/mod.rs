use thiserror::Error;

pub mod dependency;

pub use dependency::{DependencyName, DependencySet, DependencySpec};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading dependency file: {0}")]
    IO(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Missing TOML key `{0}` while parsing")]
    MissingKey(String),
    #[error("Dependency name `{0}` must be a single path component")]
    InvalidName(String),
    #[error("Dependency `{0}` must be a table")]
    NotATable(String),
}
