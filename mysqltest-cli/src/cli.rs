//! CLI structure and command definitions.
//!
//! This module defines the main CLI structure using clap's derive macros,
//! including global options and subcommands.

use crate::commands::{CompletionsCommand, DsnCommand, ShowConfigCommand, StartCommand};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line tool for running disposable mysqld instances.
#[derive(Parser)]
#[command(name = "mysqltest")]
#[command(version, about = "Run disposable mysqld instances for testing", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// YAML instance configuration file
    #[arg(long, value_name = "PATH", global = true, env = "MYSQLTEST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Command {
    /// Provision and start mysqld, then wait for stdin to close
    Start(StartCommand),

    /// Render a DSN string from options
    Dsn(DsnCommand),

    /// Print the resolved instance configuration
    ShowConfig(ShowConfigCommand),

    /// Generate shell completion scripts
    Completions(CompletionsCommand),
}
