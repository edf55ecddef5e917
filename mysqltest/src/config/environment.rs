//! Environment variable handling for configuration.
//!
//! Environment variables only fill in fields the caller left unset; a value
//! set programmatically or in a config file always wins.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::schema::{InstanceConfig, Timeouts};
use crate::error::{Error, Result};

/// Keep an auto-created temporary base directory after teardown.
pub const PRESERVE_ENV: &str = "TEST_MYSQLD_PRESERVE";
/// Path of the `mysqld` executable.
pub const MYSQLD_ENV: &str = "MYSQLTEST_MYSQLD";
/// Path of the `mysql_install_db` executable.
pub const MYSQL_INSTALL_DB_ENV: &str = "MYSQLTEST_MYSQL_INSTALL_DB";
/// Launch budget in seconds.
pub const LAUNCH_TIMEOUT_ENV: &str = "MYSQLTEST_LAUNCH_TIMEOUT";
/// Connect budget in seconds.
pub const CONNECT_TIMEOUT_ENV: &str = "MYSQLTEST_CONNECT_TIMEOUT";

/// Handles environment variable defaults for configuration.
///
/// # Examples
///
/// ```no_run
/// use mysqltest::config::{EnvironmentConfig, InstanceConfig};
///
/// let mut config = InstanceConfig::default();
/// EnvironmentConfig::fill_unset(&mut config).unwrap();
/// ```
pub struct EnvironmentConfig;

impl EnvironmentConfig {
    /// Fill unset fields of `config` from `MYSQLTEST_*` variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a timeout variable is not a
    /// non-negative integer number of seconds.
    pub fn fill_unset(config: &mut InstanceConfig) -> Result<()> {
        if config.mysqld.is_none() {
            config.mysqld = Self::var_os_path(MYSQLD_ENV);
        }

        if config.mysql_install_db.is_none() {
            config.mysql_install_db = Self::var_os_path(MYSQL_INSTALL_DB_ENV);
        }

        if config.timeouts.is_none() {
            let launch = Self::seconds(LAUNCH_TIMEOUT_ENV)?;
            let connect = Self::seconds(CONNECT_TIMEOUT_ENV)?;
            if launch.is_some() || connect.is_some() {
                let mut timeouts = Timeouts::default();
                if let Some(launch) = launch {
                    timeouts = timeouts.with_launch(launch);
                }
                if let Some(connect) = connect {
                    timeouts = timeouts.with_connect(connect);
                }
                config.timeouts = Some(timeouts);
            }
        }

        Ok(())
    }

    /// Whether `TEST_MYSQLD_PRESERVE` asks to keep temporary base directories.
    ///
    /// Missing or unparseable values mean `false`.
    #[must_use]
    pub fn preserve_temp_dir() -> bool {
        env::var(PRESERVE_ENV)
            .ok()
            .and_then(|val| Self::parse_bool(PRESERVE_ENV, &val).ok())
            .unwrap_or(false)
    }

    fn var_os_path(name: &str) -> Option<PathBuf> {
        env::var_os(name)
            .filter(|val| !val.is_empty())
            .map(PathBuf::from)
    }

    fn seconds(name: &str) -> Result<Option<Duration>> {
        match env::var(name) {
            Ok(val) => {
                let secs: u64 = val.trim().parse().map_err(|_| Error::Validation {
                    field: name.into(),
                    message: format!("Invalid number of seconds: '{val}'"),
                })?;
                Ok(Some(Duration::from_secs(secs)))
            }
            Err(_) => Ok(None),
        }
    }

    /// Parse a boolean value from a string.
    ///
    /// Accepts: true/1/yes/on for true, false/0/no/off for false (case-insensitive).
    pub(crate) fn parse_bool(field: &str, s: &str) -> Result<bool> {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "t" => Ok(true),
            "false" | "0" | "no" | "off" | "f" => Ok(false),
            _ => Err(Error::Validation {
                field: field.into(),
                message: format!(
                    "Invalid boolean value: '{s}' (expected true/false/1/0/yes/no/on/off)"
                ),
            }),
        }
    }
}
