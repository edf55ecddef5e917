//! Render a DSN without touching any instance.

use crate::error::CliError;
use crate::utils::GlobalOptions;
use clap::Args;
use mysqltest::{datasource, DatasourceOption, Protocol};
use std::path::PathBuf;

/// Build a `user:pass@address/db?params` string from flags.
#[derive(Args)]
pub struct DsnCommand {
    /// Connection protocol (unix or tcp)
    #[arg(long, value_name = "PROTOCOL")]
    pub protocol: Option<Protocol>,

    /// Socket path (unix protocol)
    #[arg(long, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Host name (tcp protocol)
    #[arg(long)]
    pub host: Option<String>,

    /// Port (tcp protocol)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database name
    #[arg(long)]
    pub dbname: Option<String>,

    /// User name
    #[arg(long)]
    pub user: Option<String>,

    /// Password
    #[arg(long)]
    pub password: Option<String>,

    /// Append parseTime=<BOOL>
    #[arg(long, value_name = "BOOL")]
    pub parse_time: Option<bool>,

    /// Append multiStatements=<BOOL>
    #[arg(long, value_name = "BOOL")]
    pub multi_statements: Option<bool>,
}

impl DsnCommand {
    fn options(self) -> Vec<DatasourceOption> {
        let mut options = Vec::new();
        options.extend(self.protocol.map(DatasourceOption::Protocol));
        options.extend(self.socket.map(DatasourceOption::Socket));
        options.extend(self.host.map(DatasourceOption::Host));
        options.extend(self.port.map(DatasourceOption::Port));
        options.extend(self.dbname.map(DatasourceOption::Dbname));
        options.extend(self.user.map(DatasourceOption::User));
        options.extend(self.password.map(DatasourceOption::Password));
        options.extend(self.parse_time.map(DatasourceOption::ParseTime));
        options.extend(self.multi_statements.map(DatasourceOption::MultiStatements));
        options
    }

    pub fn execute(self, _global: &GlobalOptions) -> Result<(), CliError> {
        let options = self.options();
        let unix_without_socket = options.iter().any(|o| *o == DatasourceOption::Protocol(Protocol::Unix))
            && !options.iter().any(|o| matches!(o, DatasourceOption::Socket(_)));
        if unix_without_socket {
            return Err(CliError::InvalidArguments(
                "--protocol unix requires --socket".to_string(),
            ));
        }
        println!("{}", datasource(options));
        Ok(())
    }
}
