//! Start a disposable instance and keep it running until told to stop.

use crate::error::CliError;
use crate::utils::{
    describe_timeouts, load_instance_config, render, GlobalOptions, InstanceArgs, OutputFormat,
};
use clap::Args;
use mysqltest::{AutoStart, TestMysqld};
use serde::Serialize;
use std::io::{self, BufRead};
use std::path::PathBuf;

/// Provision and start mysqld, print how to reach it, then wait.
///
/// The instance is stopped when a line is read from stdin or stdin closes.
#[derive(Args)]
pub struct StartCommand {
    #[command(flatten)]
    pub instance: InstanceArgs,

    /// Output format for the connection details
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

/// Connection details of a started instance.
#[derive(Debug, Serialize)]
struct Started {
    dsn: String,
    socket: PathBuf,
    port: Option<u16>,
    base_dir: PathBuf,
    log_file: PathBuf,
    pid: Option<u32>,
}

impl StartCommand {
    pub fn execute(self, global: &GlobalOptions) -> Result<(), CliError> {
        let mut config = self.instance.apply(load_instance_config(global)?)?;
        config.auto_start = AutoStart::Full;

        let mut mysqld = TestMysqld::new(config)?;
        let started = Started {
            dsn: mysqld.dsn([]),
            socket: mysqld.socket().to_path_buf(),
            port: mysqld.config().port().map(u16::from),
            base_dir: mysqld.base_dir().to_path_buf(),
            log_file: mysqld.log_file(),
            pid: mysqld.process_id(),
        };

        match self.format {
            OutputFormat::Human => {
                println!("dsn:      {}", started.dsn);
                println!("socket:   {}", started.socket.display());
                if let Some(port) = started.port {
                    println!("port:     {port}");
                }
                println!("base dir: {}", started.base_dir.display());
                println!("log:      {}", started.log_file.display());
            }
            format => println!("{}", render(&started, format)?),
        }

        if !global.quiet {
            eprintln!(
                "mysqld is running ({}). Press Enter or close stdin to stop.",
                describe_timeouts(&mysqld.config().timeouts)
            );
        }

        let mut line = String::new();
        let waited = io::stdin().lock().read_line(&mut line);
        mysqld.stop();
        waited?;
        Ok(())
    }
}
