//! Utility functions for CLI operations.
//!
//! Shared flag groups, configuration loading and output formatting.

use crate::error::CliError;
use clap::{Args, ValueEnum};
use mysqltest::{ConfigLoader, InstanceConfig, Timeouts};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Global CLI options shared across all commands.
#[derive(Debug, Clone)]
#[allow(dead_code)] // verbose/quiet are consumed by the logger in main.rs
pub struct GlobalOptions {
    /// Enable verbose output.
    pub verbose: bool,

    /// Suppress non-essential output.
    pub quiet: bool,

    /// YAML instance configuration file.
    pub config: Option<PathBuf>,
}

/// Output format for structured results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain `key: value` lines.
    Human,
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

/// Instance flags shared by `start` and `show-config`.
///
/// Flags override values from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct InstanceArgs {
    /// Instance root directory (a temporary directory when omitted)
    #[arg(long, value_name = "PATH")]
    pub base_dir: Option<PathBuf>,

    /// Enable TCP networking
    #[arg(long)]
    pub networking: bool,

    /// TCP port (implies --networking; 0 picks a free port)
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Seed the data directory from this tree
    #[arg(long, value_name = "PATH")]
    pub copy_data_from: Option<PathBuf>,

    /// Path or name of the mysqld executable
    #[arg(long, value_name = "PATH")]
    pub mysqld: Option<PathBuf>,

    /// Path or name of the mysql_install_db executable
    #[arg(long, value_name = "PATH")]
    pub mysql_install_db: Option<PathBuf>,

    /// Seconds to wait for the process to come up
    #[arg(long, value_name = "SECONDS")]
    pub launch_timeout: Option<u64>,

    /// Seconds to wait for the server to accept connections
    #[arg(long, value_name = "SECONDS")]
    pub connect_timeout: Option<u64>,
}

impl InstanceArgs {
    /// Overlay these flags on `config`.
    pub fn apply(self, mut config: InstanceConfig) -> Result<InstanceConfig, CliError> {
        if let Some(base_dir) = self.base_dir {
            config.base_dir = Some(base_dir);
        }
        if self.networking || self.port.is_some() {
            config.skip_networking = false;
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(path) = self.copy_data_from {
            if !path.is_dir() {
                return Err(CliError::InvalidArguments(format!(
                    "--copy-data-from {} is not a directory",
                    path.display()
                )));
            }
            config.copy_data_from = Some(path);
        }
        if let Some(mysqld) = self.mysqld {
            config.mysqld = Some(mysqld);
        }
        if let Some(tool) = self.mysql_install_db {
            config.mysql_install_db = Some(tool);
        }
        if self.launch_timeout.is_some() || self.connect_timeout.is_some() {
            let mut timeouts = config.timeouts.unwrap_or_default();
            if let Some(secs) = self.launch_timeout {
                timeouts = timeouts.with_launch(Duration::from_secs(secs));
            }
            if let Some(secs) = self.connect_timeout {
                timeouts = timeouts.with_connect(Duration::from_secs(secs));
            }
            config.timeouts = Some(timeouts);
        }
        Ok(config)
    }
}

/// Load the `--config` file, or defaults when none was given.
pub fn load_instance_config(global: &GlobalOptions) -> Result<InstanceConfig, CliError> {
    match &global.config {
        Some(path) => ConfigLoader::load_file(path).map_err(CliError::from),
        None => Ok(InstanceConfig::default()),
    }
}

/// Render `value` in `format`; `human` falls back to YAML, whose
/// `key: value` lines read well enough for nested data.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| CliError::Config(e.to_string()))
        }
        OutputFormat::Human | OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| CliError::Config(e.to_string()))
        }
    }
}

/// Timeouts in whole seconds, for messages.
pub fn describe_timeouts(timeouts: &Timeouts) -> String {
    format!(
        "launch {}s, connect {}s",
        timeouts.launch.as_secs(),
        timeouts.connect.as_secs()
    )
}
