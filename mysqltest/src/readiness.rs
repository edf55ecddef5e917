//! Two-phase readiness detection.
//!
//! Phase one waits for the spawned process to be observed alive; phase two
//! polls a [`ConnectionProbe`] until the server answers `SELECT 1`. Each
//! phase has its own budget from [`Timeouts`], and both give up early if the
//! process exits.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder};

use crate::config::Timeouts;
use crate::dsn::{Datasource, Protocol};
use crate::error::{Error, Result};
use crate::process::LaunchState;

/// Error type returned by probes.
pub type ProbeError = Box<dyn std::error::Error + Send + Sync>;

/// Capability: attempt a trivial connection and query.
pub trait ConnectionProbe: Send + Sync {
    /// Connect and run `SELECT 1`, succeeding only if it returns 1.
    ///
    /// # Errors
    ///
    /// Returns the connection or query failure.
    fn ping(&self, datasource: &Datasource) -> std::result::Result<(), ProbeError>;

    /// Connect and execute a statement, discarding any result.
    ///
    /// # Errors
    ///
    /// Returns the connection or execution failure.
    fn execute(&self, datasource: &Datasource, statement: &str) -> std::result::Result<(), ProbeError>;
}

/// Waits for a launched server to become usable.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    timeouts: Timeouts,
    command: String,
}

impl ReadinessProbe {
    /// Create a probe with the given budgets.
    #[must_use]
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            timeouts,
            command: "mysqld".to_string(),
        }
    }

    /// Name the command in launch errors.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Phase one: poll until the process is [`LaunchState::Live`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Launch`] if the process exits and
    /// [`Error::LaunchTimeout`] if it is not seen alive within the budget.
    pub fn wait_for_launch(&self, mut poll: impl FnMut() -> LaunchState) -> Result<()> {
        let deadline = deadline_after(self.timeouts.launch);
        loop {
            match poll() {
                LaunchState::Live => return Ok(()),
                LaunchState::Exited(status) => {
                    return Err(self.launch_error(format!(
                        "process exited before becoming ready ({status})"
                    )))
                }
                LaunchState::Pending => {}
            }
            if expired(deadline) {
                return Err(Error::LaunchTimeout {
                    timeout: self.timeouts.launch,
                });
            }
            self.sleep_until(deadline);
        }
    }

    /// Phase two: ping until the server accepts a connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Launch`] if `exited` reports the process gone and
    /// [`Error::ConnectTimeout`], carrying the last probe failure, if no
    /// ping succeeds within the budget.
    pub fn wait_for_connection(
        &self,
        probe: &dyn ConnectionProbe,
        datasource: &Datasource,
        mut exited: impl FnMut() -> bool,
    ) -> Result<()> {
        let deadline = deadline_after(self.timeouts.connect);
        let mut attempts = 0u32;
        loop {
            if exited() {
                return Err(self.launch_error(
                    "process exited before accepting connections".to_string(),
                ));
            }

            attempts += 1;
            let last_error = match probe.ping(datasource) {
                Ok(()) => {
                    log::debug!("server accepted a connection after {attempts} attempt(s)");
                    return Ok(());
                }
                Err(e) => {
                    log::debug!("connection attempt {attempts} failed: {e}");
                    e.to_string()
                }
            };

            if expired(deadline) {
                return Err(Error::ConnectTimeout {
                    timeout: self.timeouts.connect,
                    last_error,
                });
            }
            self.sleep_until(deadline);
        }
    }

    fn sleep_until(&self, deadline: Option<Instant>) {
        let remaining = deadline.map_or(Duration::MAX, |d| {
            d.saturating_duration_since(Instant::now())
        });
        thread::sleep(self.timeouts.tick.min(remaining));
    }

    fn launch_error(&self, reason: String) -> Error {
        Error::Launch {
            command: self.command.clone(),
            reason,
        }
    }
}

/// A budget too large to represent as an `Instant` never expires.
fn deadline_after(budget: Duration) -> Option<Instant> {
    Instant::now().checked_add(budget)
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// [`ConnectionProbe`] backed by the `mysql` crate.
///
/// Each call opens a fresh connection; nothing is pooled.
#[derive(Debug, Clone, Copy)]
pub struct MysqlProbe {
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl Default for MysqlProbe {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            io_timeout: Duration::from_secs(5),
        }
    }
}

impl MysqlProbe {
    /// Set the TCP connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read/write timeout.
    #[must_use]
    pub const fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Connection options for `datasource`.
    #[must_use]
    pub fn opts(&self, datasource: &Datasource) -> OptsBuilder {
        let password = Some(datasource.password()).filter(|p| !p.is_empty());
        let builder = OptsBuilder::new()
            .user(Some(datasource.user()))
            .pass(password)
            .db_name(Some(datasource.dbname()))
            .read_timeout(Some(self.io_timeout))
            .write_timeout(Some(self.io_timeout));

        match datasource.protocol() {
            Protocol::Unix => builder.socket(
                datasource
                    .socket()
                    .map(|s| s.to_string_lossy().into_owned()),
            ),
            Protocol::Tcp => builder
                .ip_or_hostname(Some(datasource.host()))
                .tcp_port(datasource.port())
                .prefer_socket(false)
                .tcp_connect_timeout(Some(self.connect_timeout)),
        }
    }

    fn connect(&self, datasource: &Datasource) -> std::result::Result<Conn, ProbeError> {
        Conn::new(self.opts(datasource)).map_err(|e| ProbeError::from(e.to_string()))
    }
}

impl ConnectionProbe for MysqlProbe {
    fn ping(&self, datasource: &Datasource) -> std::result::Result<(), ProbeError> {
        let mut conn = self.connect(datasource)?;
        let one: Option<u8> = conn
            .query_first("SELECT 1")
            .map_err(|e| ProbeError::from(e.to_string()))?;
        match one {
            Some(1) => Ok(()),
            other => Err(format!("SELECT 1 returned {other:?}").into()),
        }
    }

    fn execute(&self, datasource: &Datasource, statement: &str) -> std::result::Result<(), ProbeError> {
        let mut conn = self.connect(datasource)?;
        conn.query_drop(statement)
            .map_err(|e| ProbeError::from(e.to_string()))
    }
}

#[derive(Debug, Default)]
struct MockState {
    /// Number of failed pings before success; `None` never succeeds.
    ready_after: Option<usize>,
    attempts: usize,
    execute_error: Option<String>,
    statements: Vec<String>,
    datasources: Vec<Datasource>,
}

/// Scriptable [`ConnectionProbe`] for tests.
///
/// Clones share state, so a test can keep one handle while the instance
/// owns another.
///
/// # Examples
///
/// ```
/// use mysqltest::dsn::Datasource;
/// use mysqltest::readiness::{ConnectionProbe, MockConnectionProbe};
///
/// let probe = MockConnectionProbe::ready_after(2);
/// let ds = Datasource::default();
/// assert!(probe.ping(&ds).is_err());
/// assert!(probe.ping(&ds).is_err());
/// assert!(probe.ping(&ds).is_ok());
/// assert_eq!(probe.attempts(), 3);
/// ```
#[derive(Clone)]
pub struct MockConnectionProbe {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockConnectionProbe {
    fn default() -> Self {
        Self::ready()
    }
}

impl fmt::Debug for MockConnectionProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockConnectionProbe")
            .field("attempts", &self.attempts())
            .finish_non_exhaustive()
    }
}

impl MockConnectionProbe {
    /// A server that answers the first ping.
    #[must_use]
    pub fn ready() -> Self {
        Self::ready_after(0)
    }

    /// A server that never answers.
    #[must_use]
    pub fn never_ready() -> Self {
        Self::with_state(MockState::default())
    }

    /// A server that refuses `failures` pings, then answers.
    #[must_use]
    pub fn ready_after(failures: usize) -> Self {
        Self::with_state(MockState {
            ready_after: Some(failures),
            ..MockState::default()
        })
    }

    /// Make every `execute` call fail with `message`.
    #[must_use]
    pub fn with_execute_error(self, message: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.execute_error = Some(message.into());
        }
        self
    }

    fn with_state(state: MockState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Number of pings so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.state.lock().map_or(0, |s| s.attempts)
    }

    /// Statements passed to `execute`, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.statements.clone())
            .unwrap_or_default()
    }

    /// Every datasource the probe was called with, in order.
    #[must_use]
    pub fn datasources(&self) -> Vec<Datasource> {
        self.state
            .lock()
            .map(|s| s.datasources.clone())
            .unwrap_or_default()
    }
}

impl ConnectionProbe for MockConnectionProbe {
    fn ping(&self, datasource: &Datasource) -> std::result::Result<(), ProbeError> {
        let mut state = self.state.lock().map_err(|_| "mock state poisoned")?;
        state.datasources.push(datasource.clone());
        let failures_so_far = state.attempts;
        state.attempts += 1;
        match state.ready_after {
            Some(n) if failures_so_far >= n => Ok(()),
            _ => Err("connection refused (mock)".into()),
        }
    }

    fn execute(&self, datasource: &Datasource, statement: &str) -> std::result::Result<(), ProbeError> {
        let mut state = self.state.lock().map_err(|_| "mock state poisoned")?;
        state.datasources.push(datasource.clone());
        if let Some(message) = &state.execute_error {
            return Err(message.clone().into());
        }
        state.statements.push(statement.to_string());
        Ok(())
    }
}
