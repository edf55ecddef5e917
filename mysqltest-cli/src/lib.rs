//! Library exports for mysqltest-cli.
//!
//! Exposes the CLI structure so documentation tooling can introspect it.

pub mod cli;
pub mod commands;
pub mod error;
pub mod utils;

pub use cli::Cli;
