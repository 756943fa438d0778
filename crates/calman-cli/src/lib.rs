//! CLI, configuration, interactive menu
//!
//! This crate provides the `calman` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod menu;
pub mod ops;
pub mod prompt;

pub use cli::Cli;
pub use error::{CliError, CliResult};
