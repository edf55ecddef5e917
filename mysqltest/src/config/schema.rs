//! Configuration schema definitions.
//!
//! [`InstanceConfig`] is the caller-facing description of one instance. Every
//! field is optional; unset fields are filled in by
//! [`ConfigResolver`](crate::config::ConfigResolver). The same structure is
//! read from YAML by [`ConfigLoader`](crate::config::ConfigLoader).

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How much of the lifecycle runs automatically when an instance is created.
///
/// Serialized as its integer value (`0`, `1`, `2`).
///
/// # Examples
///
/// ```
/// use mysqltest::config::AutoStart;
///
/// assert_eq!(AutoStart::default(), AutoStart::Full);
/// assert_eq!(AutoStart::try_from(1).unwrap(), AutoStart::VerifyAndStart);
/// assert!(AutoStart::try_from(3).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AutoStart {
    /// Do nothing; the caller drives `setup` and `start`.
    Manual = 0,
    /// Check that no instance is running, then start (no provisioning).
    VerifyAndStart = 1,
    /// Check, provision, then start.
    #[default]
    Full = 2,
}

impl TryFrom<u8> for AutoStart {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Manual),
            1 => Ok(Self::VerifyAndStart),
            2 => Ok(Self::Full),
            _ => Err(format!("invalid auto_start value {value} (expected 0, 1 or 2)")),
        }
    }
}

impl From<AutoStart> for u8 {
    fn from(value: AutoStart) -> Self {
        value as Self
    }
}

impl fmt::Display for AutoStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::VerifyAndStart => write!(f, "verify-and-start"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Readiness timing.
///
/// In YAML the durations are written in milliseconds:
///
/// ```yaml
/// timeouts:
///   launch_ms: 20000
///   connect_ms: 30000
///   tick_ms: 1000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TimeoutsRepr", into = "TimeoutsRepr")]
pub struct Timeouts {
    /// Budget for the process to be observed alive.
    pub launch: Duration,
    /// Budget for the server to accept a connection.
    pub connect: Duration,
    /// Polling interval for both phases.
    pub tick: Duration,
}

impl Timeouts {
    /// Default launch budget.
    pub const DEFAULT_LAUNCH: Duration = Duration::from_secs(20);
    /// Default connect budget.
    pub const DEFAULT_CONNECT: Duration = Duration::from_secs(30);
    /// Default polling interval.
    pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

    /// Set the launch budget.
    #[must_use]
    pub const fn with_launch(mut self, launch: Duration) -> Self {
        self.launch = launch;
        self
    }

    /// Set the connect budget.
    #[must_use]
    pub const fn with_connect(mut self, connect: Duration) -> Self {
        self.connect = connect;
        self
    }

    /// Set the polling interval.
    #[must_use]
    pub const fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            launch: Self::DEFAULT_LAUNCH,
            connect: Self::DEFAULT_CONNECT,
            tick: Self::DEFAULT_TICK,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct TimeoutsRepr {
    launch_ms: u64,
    connect_ms: u64,
    tick_ms: u64,
}

impl Default for TimeoutsRepr {
    fn default() -> Self {
        Timeouts::default().into()
    }
}

impl From<TimeoutsRepr> for Timeouts {
    fn from(repr: TimeoutsRepr) -> Self {
        Self {
            launch: Duration::from_millis(repr.launch_ms),
            connect: Duration::from_millis(repr.connect_ms),
            tick: Duration::from_millis(repr.tick_ms),
        }
    }
}

impl From<Timeouts> for TimeoutsRepr {
    fn from(timeouts: Timeouts) -> Self {
        let millis = |d: Duration| u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        Self {
            launch_ms: millis(timeouts.launch),
            connect_ms: millis(timeouts.connect),
            tick_ms: millis(timeouts.tick),
        }
    }
}

/// Declarative description of one instance.
///
/// `InstanceConfig::default()` means "all defaults": a fresh temporary base
/// directory, unix-socket only, full auto-start.
///
/// # Examples
///
/// ```
/// use mysqltest::config::{AutoStart, InstanceConfig};
///
/// let config = InstanceConfig::default()
///     .with_skip_networking(false)
///     .with_port(13306)
///     .with_auto_start(AutoStart::Manual);
/// assert!(!config.skip_networking);
/// assert_eq!(config.port, Some(13306));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceConfig {
    /// Instance root; a unique temporary directory when unset.
    pub base_dir: Option<PathBuf>,
    /// Scratch directory; `<base>/tmp` when unset.
    pub tmp_dir: Option<PathBuf>,
    /// Data directory; `<base>/var` when unset.
    pub data_dir: Option<PathBuf>,
    /// Unix socket; `<tmp>/mysql.sock` when unset.
    pub socket: Option<PathBuf>,
    /// Pid file; `<tmp>/mysqld.pid` when unset.
    pub pid_file: Option<PathBuf>,
    /// TCP bind address; `127.0.0.1` when networking is enabled and unset.
    pub bind_address: Option<String>,
    /// TCP port; `None` or `0` allocates an ephemeral port.
    pub port: Option<u16>,
    /// Disable TCP networking (unix socket only).
    #[serde(default = "default_skip_networking")]
    pub skip_networking: bool,
    /// Directory tree to seed the data directory from.
    pub copy_data_from: Option<PathBuf>,
    /// Automatic lifecycle steps on creation.
    #[serde(default)]
    pub auto_start: AutoStart,
    /// Server executable; located on the search path when unset.
    pub mysqld: Option<PathBuf>,
    /// Legacy bootstrap tool; only located when `mysqld` lacks
    /// `--initialize-insecure`.
    pub mysql_install_db: Option<PathBuf>,
    /// Readiness timing; defaults when unset.
    pub timeouts: Option<Timeouts>,
}

const fn default_skip_networking() -> bool {
    true
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            tmp_dir: None,
            data_dir: None,
            socket: None,
            pid_file: None,
            bind_address: None,
            port: None,
            skip_networking: default_skip_networking(),
            copy_data_from: None,
            auto_start: AutoStart::default(),
            mysqld: None,
            mysql_install_db: None,
            timeouts: None,
        }
    }
}

impl InstanceConfig {
    /// Set the base directory.
    #[must_use]
    pub fn with_base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(path.into());
        self
    }

    /// Set the scratch directory.
    #[must_use]
    pub fn with_tmp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(path.into());
        self
    }

    /// Set the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Set the unix socket path.
    #[must_use]
    pub fn with_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket = Some(path.into());
        self
    }

    /// Set the pid file path.
    #[must_use]
    pub fn with_pid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pid_file = Some(path.into());
        self
    }

    /// Set the TCP bind address.
    #[must_use]
    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = Some(address.into());
        self
    }

    /// Set the TCP port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Enable or disable TCP networking.
    #[must_use]
    pub const fn with_skip_networking(mut self, skip: bool) -> Self {
        self.skip_networking = skip;
        self
    }

    /// Seed the data directory from an existing tree.
    #[must_use]
    pub fn with_copy_data_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.copy_data_from = Some(path.into());
        self
    }

    /// Set the auto-start level.
    #[must_use]
    pub const fn with_auto_start(mut self, auto_start: AutoStart) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Use a specific server executable.
    #[must_use]
    pub fn with_mysqld(mut self, path: impl Into<PathBuf>) -> Self {
        self.mysqld = Some(path.into());
        self
    }

    /// Use a specific `mysql_install_db`.
    #[must_use]
    pub fn with_mysql_install_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.mysql_install_db = Some(path.into());
        self
    }

    /// Override readiness timing.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }
}
