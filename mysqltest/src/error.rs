//! Error types for the mysqltest library.
//!
//! This module provides the error hierarchy for every stage of an instance's
//! lifecycle, using `thiserror` for ergonomic error handling. Each variant
//! carries enough context (path, command line, or captured process output)
//! to diagnose a failure without re-running anything.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for operations that may fail with a mysqltest error.
///
/// # Examples
///
/// ```
/// use mysqltest::{Error, Result};
///
/// fn example_operation() -> Result<u16> {
///     Ok(3306)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the mysqltest library.
///
/// All variants are fatal to the operation that raised them. The only
/// retries in the library are the two readiness polling loops, which turn
/// exhaustion into [`Error::LaunchTimeout`] or [`Error::ConnectTimeout`].
#[derive(Debug, Error)]
pub enum Error {
    /// A path could not be normalized or resolved.
    #[error("invalid path {}: {reason}", path.display())]
    Path {
        /// The offending path.
        path: PathBuf,
        /// The reason the path is invalid.
        reason: String,
    },

    /// No ephemeral TCP port could be allocated.
    #[error("could not find a temporary port to bind to: {reason}")]
    PortAllocation {
        /// The reason allocation failed.
        reason: String,
    },

    /// A required executable could not be located.
    #[error("could not find {binary} (searched: {})", searched.join(", "))]
    BinaryNotFound {
        /// The executable name.
        binary: String,
        /// Every location that was searched.
        searched: Vec<String>,
    },

    /// The `--help --verbose` capability probe could not be run.
    #[error("failed to execute '{command}': {source}")]
    CapabilityProbe {
        /// The probe command line.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A pid file already exists for this configuration.
    #[error("mysqld is already running ({})", pid_file.display())]
    AlreadyRunning {
        /// The pid file that was found.
        pid_file: PathBuf,
    },

    /// The on-disk layout could not be created.
    #[error("failed to provision {}: {source}", path.display())]
    Provision {
        /// The path being created or written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Bootstrapping the data directory failed.
    #[error("*** [{command}] failed ***\n{output}")]
    Bootstrap {
        /// The bootstrap command line.
        command: String,
        /// Combined stdout and stderr of the bootstrap process.
        output: String,
    },

    /// The server process could not be launched, or exited before it was ready.
    #[error("failed to launch mysqld ({command}): {reason}")]
    Launch {
        /// The server command line.
        command: String,
        /// Why the launch failed.
        reason: String,
    },

    /// The server process was not observed alive within the launch budget.
    #[error("failed to launch mysqld (timeout after {timeout:?})")]
    LaunchTimeout {
        /// The launch budget that elapsed.
        timeout: Duration,
    },

    /// The server never accepted a connection within the connect budget.
    #[error("timeout reached after {timeout:?} before we could connect to database: {last_error}")]
    ConnectTimeout {
        /// The connect budget that elapsed.
        timeout: Duration,
        /// The most recent connection failure.
        last_error: String,
    },

    /// The default working schema could not be created.
    #[error("failed to create database '{schema}': {reason}")]
    SchemaCreate {
        /// The schema name.
        schema: String,
        /// Why creation failed.
        reason: String,
    },

    /// The instance log could not be read.
    #[error("failed to read log {}: {source}", path.display())]
    LogRead {
        /// The log file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Configuration(#[from] serde_yaml::Error),

    /// A configuration value failed validation.
    #[error("validation error for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// A description of the validation failure.
        message: String,
    },

    /// A lifecycle operation was invoked in a state that does not allow it.
    #[error("cannot {operation} an instance that is {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The current lifecycle state.
        state: crate::instance::InstanceState,
    },
}

impl Error {
    /// Check if the error is one of the two readiness timeouts.
    ///
    /// # Examples
    ///
    /// ```
    /// use mysqltest::Error;
    /// use std::time::Duration;
    ///
    /// let err = Error::LaunchTimeout { timeout: Duration::from_secs(20) };
    /// assert!(err.is_timeout());
    /// ```
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::LaunchTimeout { .. } | Self::ConnectTimeout { .. }
        )
    }

    /// Check if the error reports an instance already bound to the configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use mysqltest::Error;
    /// use std::path::PathBuf;
    ///
    /// let err = Error::AlreadyRunning { pid_file: PathBuf::from("/tmp/mysqld.pid") };
    /// assert!(err.is_already_running());
    /// ```
    #[must_use]
    pub fn is_already_running(&self) -> bool {
        matches!(self, Self::AlreadyRunning { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceState;

    #[test]
    fn test_path_error() {
        let err = Error::Path {
            path: PathBuf::from("/invalid/path"),
            reason: "escapes root".to_string(),
        };
        let display = format!("{err}");
        assert!(display.contains("invalid path"));
        let normalized = display.replace(std::path::MAIN_SEPARATOR, "/");
        assert!(normalized.contains("/invalid/path"));
        assert!(display.contains("escapes root"));
    }

    #[test]
    fn test_binary_not_found_lists_search_locations() {
        let err = Error::BinaryNotFound {
            binary: "mysqld".to_string(),
            searched: vec!["PATH".to_string(), "/usr/local/mysql/sbin".to_string()],
        };
        let display = format!("{err}");
        assert!(display.contains("could not find mysqld"));
        assert!(display.contains("PATH, /usr/local/mysql/sbin"));
    }

    #[test]
    fn test_bootstrap_error_carries_output() {
        let err = Error::Bootstrap {
            command: "mysqld --initialize-insecure".to_string(),
            output: "[ERROR] data directory has files in it".to_string(),
        };
        let display = format!("{err}");
        assert!(display.contains("[mysqld --initialize-insecure] failed"));
        assert!(display.contains("data directory has files in it"));
    }

    #[test]
    fn test_already_running_error() {
        let err = Error::AlreadyRunning {
            pid_file: PathBuf::from("/tmp/base/tmp/mysqld.pid"),
        };
        assert!(err.is_already_running());
        assert!(!err.is_timeout());
        assert!(format!("{err}").contains("already running"));
    }

    #[test]
    fn test_timeout_errors() {
        let launch = Error::LaunchTimeout {
            timeout: Duration::from_secs(20),
        };
        let connect = Error::ConnectTimeout {
            timeout: Duration::from_secs(30),
            last_error: "connection refused".to_string(),
        };
        assert!(launch.is_timeout());
        assert!(connect.is_timeout());
        assert!(format!("{connect}").contains("connection refused"));
    }

    #[test]
    fn test_invalid_state_error() {
        let err = Error::InvalidState {
            operation: "start",
            state: InstanceState::Stopped,
        };
        assert_eq!(format!("{err}"), "cannot start an instance that is stopped");
    }

    #[test]
    fn test_provision_error_source() {
        use std::error::Error as _;

        let err = Error::Provision {
            path: PathBuf::from("/root/etc"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert!(format!("{err}").contains("failed to provision"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<u16> {
            Err(Error::PortAllocation {
                reason: "test".to_string(),
            })
        }

        assert!(returns_result().is_err());
    }
}
