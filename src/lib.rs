pub mod cli;
pub mod command;
pub mod config;
pub mod git;
pub mod model;
pub mod sync;
pub mod ui;

mod api;

pub use api::{DependencySync, DependencySyncBuilder};
