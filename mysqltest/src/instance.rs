//! The [`TestMysqld`] lifecycle facade.
//!
//! A handle moves through `Created → Provisioned → Running → Stopped`.
//! `stop` is terminal: a stopped instance cannot be restarted, create a new
//! handle instead. Dropping a handle stops it.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{AutoStart, ConfigResolver, InstanceConfig, ResolvedConfig};
use crate::dsn::{Datasource, DatasourceOption, Protocol};
use crate::error::{Error, Result};
use crate::guard::GuardStack;
use crate::locate::Locator;
use crate::port::{PortAllocator, SystemPortAllocator};
use crate::process::{LaunchState, ServerProcess};
use crate::provision::Provisioner;
use crate::readiness::{ConnectionProbe, MysqlProbe, ReadinessProbe};

/// Schema created after startup unless the data directory was seeded.
pub const DEFAULT_SCHEMA: &str = "test";

/// How phase one observes the child.
type LaunchPoll = Box<dyn FnMut(&mut ServerProcess) -> LaunchState + Send + Sync>;

/// Lifecycle state of a [`TestMysqld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    /// Configuration resolved; nothing on disk yet.
    Created,
    /// Directories, defaults file and system tables are in place.
    Provisioned,
    /// The server is accepting connections.
    Running,
    /// Torn down. Terminal.
    Stopped,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Provisioned => write!(f, "provisioned"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// A disposable `mysqld` instance.
///
/// # Examples
///
/// ```no_run
/// use mysqltest::config::InstanceConfig;
/// use mysqltest::TestMysqld;
///
/// let mysqld = TestMysqld::new(InstanceConfig::default()).unwrap();
/// println!("connect with {}", mysqld.dsn([]));
/// // The server is killed and its temporary directory removed here.
/// drop(mysqld);
/// ```
pub struct TestMysqld {
    config: ResolvedConfig,
    state: InstanceState,
    process: Option<ServerProcess>,
    launched: bool,
    guards: GuardStack,
    probe: Box<dyn ConnectionProbe>,
    launch_poll: LaunchPoll,
}

impl fmt::Debug for TestMysqld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestMysqld")
            .field("base_dir", &self.config.base_dir)
            .field("state", &self.state)
            .field("process_id", &self.process_id())
            .field("guards", &self.guards)
            .finish_non_exhaustive()
    }
}

impl TestMysqld {
    /// Resolve `config` with the production collaborators and auto-start
    /// according to its [`AutoStart`] level.
    ///
    /// # Errors
    ///
    /// Any resolution, provisioning or startup error. Whatever was created
    /// before the failure is cleaned up before this returns.
    pub fn new(config: InstanceConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start building an instance with custom collaborators.
    #[must_use]
    pub fn builder(config: InstanceConfig) -> InstanceBuilder {
        InstanceBuilder::new(config)
    }

    /// Fail if a pid file already exists for this configuration.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyRunning`] if the pid file exists, [`Error::Provision`]
    /// if its presence cannot be determined.
    pub fn assert_not_running(&self) -> Result<()> {
        let pid_file = &self.config.pid_file;
        match fs::metadata(pid_file) {
            Ok(_) => Err(Error::AlreadyRunning {
                pid_file: pid_file.clone(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::Provision {
                path: pid_file.clone(),
                source,
            }),
        }
    }

    /// Create the on-disk layout, write the defaults file and bootstrap the
    /// data directory if needed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] unless the instance is freshly created, or
    /// any error from [`Provisioner::setup`].
    pub fn setup(&mut self) -> Result<()> {
        if self.state != InstanceState::Created {
            return Err(self.invalid_state("set up"));
        }
        let defaults_file = self.defaults_file();
        Provisioner::new(&self.config, &defaults_file).setup()?;
        self.state = InstanceState::Provisioned;
        log::info!("provisioned instance in {}", self.config.base_dir.display());
        Ok(())
    }

    /// Launch the server and block until it accepts connections.
    ///
    /// On a timeout the process is killed before the error is returned.
    /// Unless the data directory was seeded, the `test` schema is created
    /// once the server is up.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the instance is running or stopped.
    /// - [`Error::AlreadyRunning`] if a pid file exists.
    /// - [`Error::Launch`], [`Error::LaunchTimeout`] or
    ///   [`Error::ConnectTimeout`] if the server does not come up.
    /// - [`Error::SchemaCreate`] if the default schema cannot be created.
    pub fn start(&mut self) -> Result<()> {
        if matches!(self.state, InstanceState::Running | InstanceState::Stopped) {
            return Err(self.invalid_state("start"));
        }
        self.assert_not_running()?;

        let process =
            ServerProcess::spawn(&self.config.mysqld, &self.defaults_file(), &self.log_file())?;
        let readiness =
            ReadinessProbe::new(self.config.timeouts).with_command(process.command());
        self.process = Some(process);
        self.launched = true;

        if let Err(e) = self.wait_until_ready(&readiness) {
            self.kill_process();
            return Err(e);
        }

        self.state = InstanceState::Running;
        log::info!("mysqld is running (pid {:?})", self.process_id());
        Ok(())
    }

    fn wait_until_ready(&mut self, readiness: &ReadinessProbe) -> Result<()> {
        let datasource = self.readiness_datasource();
        let Some(process) = self.process.as_mut() else {
            return Err(Error::Launch {
                command: self.config.mysqld.display().to_string(),
                reason: "process handle missing".to_string(),
            });
        };

        let poll = &mut self.launch_poll;
        readiness.wait_for_launch(|| poll(&mut *process))?;
        readiness.wait_for_connection(self.probe.as_ref(), &datasource, || process.has_exited())?;

        if self.config.copy_data_from.is_none() {
            let statement = format!("CREATE DATABASE IF NOT EXISTS {DEFAULT_SCHEMA}");
            self.probe
                .execute(&datasource, &statement)
                .map_err(|e| Error::SchemaCreate {
                    schema: DEFAULT_SCHEMA.to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Kill the server if it is reachable and run every cleanup guard.
    ///
    /// Idempotent; failures are logged rather than returned. Callers must not
    /// invoke this while a `start` on the same handle is in flight, which the
    /// `&mut self` receivers already rule out.
    pub fn stop(&mut self) {
        if self.state == InstanceState::Stopped {
            return;
        }
        self.kill_process();
        let failures = self.guards.run_all();
        if failures > 0 {
            log::warn!("{failures} cleanup guard(s) failed");
        }
        self.state = InstanceState::Stopped;
        log::info!("stopped instance in {}", self.config.base_dir.display());
    }

    fn kill_process(&mut self) {
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill() {
                log::warn!("failed to kill mysqld (pid {}): {e}", process.id());
            }
        }
    }

    /// The full contents of the server log.
    ///
    /// # Errors
    ///
    /// [`Error::LogRead`] if the server was never started or the log cannot
    /// be read.
    pub fn read_log(&self) -> Result<Vec<u8>> {
        let path = self.log_file();
        if !self.launched {
            return Err(Error::LogRead {
                path,
                source: io::Error::new(io::ErrorKind::NotFound, "mysqld has not been started"),
            });
        }
        fs::read(&path).map_err(|source| Error::LogRead { path, source })
    }

    /// Instance-aware datasource.
    ///
    /// The protocol defaults to `unix` when networking is skipped and `tcp`
    /// otherwise. A unix datasource defaults to the instance socket; a tcp
    /// one to the instance bind address and port. `options` override these.
    #[must_use]
    pub fn datasource(&self, options: impl IntoIterator<Item = DatasourceOption>) -> Datasource {
        let options: Vec<DatasourceOption> = options.into_iter().collect();
        let protocol = options
            .iter()
            .rev()
            .find_map(|o| match o {
                DatasourceOption::Protocol(p) => Some(*p),
                _ => None,
            })
            .unwrap_or(if self.config.skip_networking() {
                Protocol::Unix
            } else {
                Protocol::Tcp
            });

        let mut defaults = vec![DatasourceOption::Protocol(protocol)];
        match protocol {
            Protocol::Unix => defaults.push(DatasourceOption::Socket(self.config.socket.clone())),
            Protocol::Tcp => {
                if let Some(address) = self.config.bind_address() {
                    defaults.push(DatasourceOption::Host(address.to_string()));
                }
                if let Some(port) = self.config.port() {
                    defaults.push(DatasourceOption::Port(port.value()));
                }
            }
        }
        Datasource::from_options(defaults.into_iter().chain(options))
    }

    /// Instance-aware DSN string; see [`TestMysqld::datasource`].
    #[must_use]
    pub fn dsn(&self, options: impl IntoIterator<Item = DatasourceOption>) -> String {
        self.datasource(options).to_string()
    }

    /// Just the address part of the DSN, e.g. `unix(/tmp/.../mysql.sock)`.
    ///
    /// `port` replaces the configured port for tcp instances.
    #[must_use]
    pub fn connect_string(&self, port: Option<u16>) -> String {
        self.datasource(port.map(DatasourceOption::Port)).address()
    }

    fn readiness_datasource(&self) -> Datasource {
        self.datasource([
            DatasourceOption::Dbname("mysql".to_string()),
            DatasourceOption::User("root".to_string()),
        ])
    }

    fn invalid_state(&self, operation: &'static str) -> Error {
        Error::InvalidState {
            operation,
            state: self.state,
        }
    }

    /// Root of the instance's on-disk layout.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.config.base_dir
    }

    /// Unix socket path.
    #[must_use]
    pub fn socket(&self) -> &Path {
        &self.config.socket
    }

    /// The resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// `<base_dir>/etc/my.cnf`.
    #[must_use]
    pub fn defaults_file(&self) -> PathBuf {
        self.config.defaults_file()
    }

    /// `<tmp_dir>/mysqld.log`.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.config.log_file()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> InstanceState {
        self.state
    }

    /// OS process id of the server, while one is supervised.
    #[must_use]
    pub fn process_id(&self) -> Option<u32> {
        self.process.as_ref().map(ServerProcess::id)
    }
}

impl Drop for TestMysqld {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for [`TestMysqld`] with replaceable collaborators.
///
/// # Examples
///
/// ```no_run
/// use mysqltest::config::{AutoStart, InstanceConfig};
/// use mysqltest::readiness::MockConnectionProbe;
/// use mysqltest::TestMysqld;
///
/// let mysqld = TestMysqld::builder(InstanceConfig::default().with_auto_start(AutoStart::Manual))
///     .probe(MockConnectionProbe::ready())
///     .preserve(false)
///     .build()
///     .unwrap();
/// assert_eq!(mysqld.state().to_string(), "created");
/// ```
pub struct InstanceBuilder {
    config: InstanceConfig,
    probe: Option<Box<dyn ConnectionProbe>>,
    allocator: Option<Box<dyn PortAllocator>>,
    locator: Option<Locator>,
    preserve: Option<bool>,
    use_env: bool,
    launch_poll: Option<LaunchPoll>,
}

impl fmt::Debug for InstanceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceBuilder")
            .field("config", &self.config)
            .field("locator", &self.locator)
            .field("preserve", &self.preserve)
            .field("use_env", &self.use_env)
            .finish_non_exhaustive()
    }
}

impl InstanceBuilder {
    /// Start from `config` with the production collaborators.
    #[must_use]
    pub fn new(config: InstanceConfig) -> Self {
        Self {
            config,
            probe: None,
            allocator: None,
            locator: None,
            preserve: None,
            use_env: true,
            launch_poll: None,
        }
    }

    /// Use `probe` for readiness checks and schema creation.
    #[must_use]
    pub fn probe(mut self, probe: impl ConnectionProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Allocate TCP ports from `allocator`.
    #[must_use]
    pub fn port_allocator(mut self, allocator: impl PortAllocator + 'static) -> Self {
        self.allocator = Some(Box::new(allocator));
        self
    }

    /// Locate executables with `locator`.
    #[must_use]
    pub fn locator(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Keep (or remove) the temporary base directory regardless of
    /// `TEST_MYSQLD_PRESERVE`.
    #[must_use]
    pub const fn preserve(mut self, preserve: bool) -> Self {
        self.preserve = Some(preserve);
        self
    }

    /// Ignore `MYSQLTEST_*` environment variables.
    #[must_use]
    pub const fn skip_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    #[cfg(test)]
    fn launch_poll(
        mut self,
        poll: impl FnMut(&mut ServerProcess) -> LaunchState + Send + Sync + 'static,
    ) -> Self {
        self.launch_poll = Some(Box::new(poll));
        self
    }

    /// Resolve the configuration and auto-start.
    ///
    /// # Errors
    ///
    /// See [`TestMysqld::new`].
    pub fn build(self) -> Result<TestMysqld> {
        let allocator = self
            .allocator
            .unwrap_or_else(|| Box::new(SystemPortAllocator));
        let mut resolver = ConfigResolver::new(allocator.as_ref())
            .with_locator(self.locator.unwrap_or_default());
        if !self.use_env {
            resolver = resolver.skip_env();
        }
        if let Some(preserve) = self.preserve {
            resolver = resolver.with_preserve(preserve);
        }

        let mut guards = GuardStack::new();
        let config = match resolver.resolve(self.config, &mut guards) {
            Ok(config) => config,
            Err(e) => {
                guards.run_all();
                return Err(e);
            }
        };

        let auto_start = config.auto_start;
        let mut instance = TestMysqld {
            config,
            state: InstanceState::Created,
            process: None,
            launched: false,
            guards,
            probe: self
                .probe
                .unwrap_or_else(|| Box::new(MysqlProbe::default())),
            launch_poll: self
                .launch_poll
                .unwrap_or_else(|| Box::new(ServerProcess::launch_state)),
        };

        // Errors below drop `instance`, which stops it.
        match auto_start {
            AutoStart::Manual => {}
            AutoStart::VerifyAndStart => {
                instance.assert_not_running()?;
                instance.start()?;
            }
            AutoStart::Full => {
                instance.assert_not_running()?;
                instance.setup()?;
                instance.start()?;
            }
        }
        Ok(instance)
    }
}
