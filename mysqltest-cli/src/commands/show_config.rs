//! Command to show the resolved instance configuration.

use crate::error::CliError;
use crate::utils::{load_instance_config, render, GlobalOptions, InstanceArgs, OutputFormat};
use clap::Args;
use mysqltest::{AutoStart, TestMysqld};

/// Resolve the configuration without provisioning anything and print it.
///
/// A temporary base directory created during resolution is removed before
/// the command exits.
#[derive(Args)]
pub struct ShowConfigCommand {
    #[command(flatten)]
    pub instance: InstanceArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "yaml")]
    pub format: OutputFormat,
}

impl ShowConfigCommand {
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let mut config = self.instance.apply(load_instance_config(global)?)?;
        config.auto_start = AutoStart::Manual;

        let mysqld = TestMysqld::new(config)?;
        let rendered = render(mysqld.config(), self.format)?;
        print!("{rendered}");
        if !rendered.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}
