//! Resolution of an [`InstanceConfig`] into a complete [`ResolvedConfig`].
//!
//! Resolution is the only step that touches the outside world before
//! provisioning: it may create a temporary directory, probe for a free
//! port, search for executables and run `mysqld --help --verbose` once.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::environment::EnvironmentConfig;
use crate::config::schema::{AutoStart, InstanceConfig, Timeouts};
use crate::error::{Error, Result};
use crate::guard::GuardStack;
use crate::locate::{self, Locator};
use crate::path::{absolutize, resolve_once};
use crate::port::{Port, PortAllocator};

/// Default TCP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// How the server is addressed. Exactly one mode applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Networking {
    /// Unix socket only (`skip-networking`).
    SkipNetworking,
    /// TCP on `bind_address:port`, in addition to the socket.
    Tcp {
        /// Address the server binds to.
        bind_address: String,
        /// Port the server listens on.
        port: Port,
    },
}

/// How a fresh data directory is initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mechanism", content = "path", rename_all = "snake_case")]
pub enum Bootstrap {
    /// `mysqld --initialize-insecure`.
    InitializeInsecure,
    /// The legacy `mysql_install_db` tool at the given path.
    InstallDb(PathBuf),
    /// Neither is available; provisioning a fresh data directory fails.
    Unavailable,
}

/// A fully resolved instance configuration.
///
/// All paths are absolute. Unless explicitly overridden, `tmp_dir`,
/// `data_dir`, `socket` and `pid_file` lie under `base_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    /// Instance root.
    pub base_dir: PathBuf,
    /// Scratch directory.
    pub tmp_dir: PathBuf,
    /// Data directory.
    pub data_dir: PathBuf,
    /// Unix socket path.
    pub socket: PathBuf,
    /// Pid file path.
    pub pid_file: PathBuf,
    /// Addressing mode.
    pub networking: Networking,
    /// Tree the data directory is seeded from.
    pub copy_data_from: Option<PathBuf>,
    /// Automatic lifecycle steps.
    pub auto_start: AutoStart,
    /// Readiness timing.
    pub timeouts: Timeouts,
    /// Server executable.
    pub mysqld: PathBuf,
    /// Data directory bootstrap mechanism.
    pub bootstrap: Bootstrap,
}

impl ResolvedConfig {
    /// Whether TCP networking is disabled.
    #[must_use]
    pub const fn skip_networking(&self) -> bool {
        matches!(self.networking, Networking::SkipNetworking)
    }

    /// The TCP bind address, if networking is enabled.
    #[must_use]
    pub fn bind_address(&self) -> Option<&str> {
        match &self.networking {
            Networking::Tcp { bind_address, .. } => Some(bind_address),
            Networking::SkipNetworking => None,
        }
    }

    /// The TCP port, if networking is enabled.
    #[must_use]
    pub const fn port(&self) -> Option<Port> {
        match self.networking {
            Networking::Tcp { port, .. } => Some(port),
            Networking::SkipNetworking => None,
        }
    }

    /// The generated server defaults file, `<base>/etc/my.cnf`.
    #[must_use]
    pub fn defaults_file(&self) -> PathBuf {
        self.base_dir.join("etc").join("my.cnf")
    }

    /// The server log file, `<tmp>/mysqld.log`.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.tmp_dir.join("mysqld.log")
    }
}

/// Resolves instance configurations.
///
/// # Examples
///
/// ```no_run
/// use mysqltest::config::{ConfigResolver, InstanceConfig};
/// use mysqltest::guard::GuardStack;
/// use mysqltest::port::SystemPortAllocator;
///
/// let mut guards = GuardStack::new();
/// let resolved = ConfigResolver::new(&SystemPortAllocator)
///     .resolve(InstanceConfig::default(), &mut guards)
///     .unwrap();
/// assert!(resolved.socket.starts_with(&resolved.base_dir));
/// ```
pub struct ConfigResolver<'a> {
    allocator: &'a dyn PortAllocator,
    locator: Locator,
    use_env: bool,
    preserve: Option<bool>,
}

impl<'a> ConfigResolver<'a> {
    /// Create a resolver drawing ports from `allocator`.
    #[must_use]
    pub fn new(allocator: &'a dyn PortAllocator) -> Self {
        Self {
            allocator,
            locator: Locator::default(),
            use_env: true,
            preserve: None,
        }
    }

    /// Use a custom executable locator.
    #[must_use]
    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }

    /// Do not fill unset fields from `MYSQLTEST_*` variables.
    #[must_use]
    pub const fn skip_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Decide temp-dir preservation instead of reading `TEST_MYSQLD_PRESERVE`.
    #[must_use]
    pub const fn with_preserve(mut self, preserve: bool) -> Self {
        self.preserve = Some(preserve);
        self
    }

    /// Resolve `config`.
    ///
    /// Cleanup for anything created here (the temporary base directory) is
    /// registered on `guards` immediately, so the caller can run the guards
    /// even when resolution fails part-way.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for invalid environment values or a zero
    ///   polling interval.
    /// - [`Error::Path`] if a path cannot be normalized or the temporary
    ///   directory cannot be created.
    /// - [`Error::PortAllocation`] if no port could be allocated.
    /// - [`Error::BinaryNotFound`] if `mysqld` cannot be found, or
    ///   `mysql_install_db` is needed for full auto-start and cannot be found.
    /// - [`Error::CapabilityProbe`] if `mysqld --help --verbose` fails.
    pub fn resolve(&self, mut config: InstanceConfig, guards: &mut GuardStack) -> Result<ResolvedConfig> {
        if self.use_env {
            EnvironmentConfig::fill_unset(&mut config)?;
        }

        let timeouts = config.timeouts.unwrap_or_default();
        if timeouts.tick.is_zero() {
            return Err(Error::Validation {
                field: "timeouts.tick_ms".into(),
                message: "polling interval must be greater than zero".into(),
            });
        }

        let base_dir = match &config.base_dir {
            Some(dir) => absolutize(dir)?,
            None => self.create_temp_base(guards)?,
        };
        let base_dir = resolve_once(&base_dir)?;

        let tmp_dir = Self::path_or(config.tmp_dir.as_deref(), || base_dir.join("tmp"))?;
        let socket = Self::path_or(config.socket.as_deref(), || tmp_dir.join("mysql.sock"))?;
        let data_dir = Self::path_or(config.data_dir.as_deref(), || base_dir.join("var"))?;
        let pid_file = Self::path_or(config.pid_file.as_deref(), || tmp_dir.join("mysqld.pid"))?;

        let networking = self.networking(&config)?;
        let copy_data_from = config
            .copy_data_from
            .as_deref()
            .map(absolutize)
            .transpose()?;

        let mysqld = match &config.mysqld {
            Some(path) => self.executable(path, "mysqld")?,
            None => self.locator.mysqld()?,
        };
        let bootstrap = self.bootstrap(&config, &mysqld)?;

        let resolved = ResolvedConfig {
            base_dir,
            tmp_dir,
            data_dir,
            socket,
            pid_file,
            networking,
            copy_data_from,
            auto_start: config.auto_start,
            timeouts,
            mysqld,
            bootstrap,
        };
        log::debug!("resolved instance configuration: {resolved:?}");
        Ok(resolved)
    }

    fn create_temp_base(&self, guards: &mut GuardStack) -> Result<PathBuf> {
        let temp = tempfile::Builder::new()
            .prefix("mysqltest")
            .tempdir()
            .map_err(|e| Error::Path {
                path: std::env::temp_dir(),
                reason: format!("failed to create temporary directory: {e}"),
            })?;
        let path = temp.keep();

        let preserve = self
            .preserve
            .unwrap_or_else(EnvironmentConfig::preserve_temp_dir);
        if preserve {
            log::info!("preserving temporary base directory {}", path.display());
        } else {
            guards.remove_dir_all(path.clone());
        }
        Ok(path)
    }

    fn path_or(explicit: Option<&Path>, derive: impl FnOnce() -> PathBuf) -> Result<PathBuf> {
        match explicit {
            Some(path) => absolutize(path),
            None => Ok(derive()),
        }
    }

    fn networking(&self, config: &InstanceConfig) -> Result<Networking> {
        if config.skip_networking {
            return Ok(Networking::SkipNetworking);
        }

        let bind_address = config
            .bind_address
            .clone()
            .filter(|addr| !addr.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let port = match config.port.map(Port::try_from) {
            Some(Ok(port)) => port,
            _ => self.allocator.allocate()?,
        };

        Ok(Networking::Tcp { bind_address, port })
    }

    /// Bare names are looked up on the search path; anything with a
    /// separator is taken as a path.
    fn executable(&self, path: &Path, binary: &str) -> Result<PathBuf> {
        if path.components().count() == 1 && !path.is_absolute() {
            return self.locator.find(path).ok_or_else(|| Error::BinaryNotFound {
                binary: binary.to_string(),
                searched: vec![format!("{} on PATH", path.display())],
            });
        }
        absolutize(path)
    }

    fn bootstrap(&self, config: &InstanceConfig, mysqld: &Path) -> Result<Bootstrap> {
        let initialize_insecure = locate::supports_initialize_insecure(mysqld)?;

        if let Some(tool) = &config.mysql_install_db {
            return Ok(Bootstrap::InstallDb(self.executable(tool, "mysql_install_db")?));
        }
        if initialize_insecure {
            return Ok(Bootstrap::InitializeInsecure);
        }

        match self.locator.mysql_install_db() {
            Ok(tool) => Ok(Bootstrap::InstallDb(tool)),
            Err(e) if config.auto_start == AutoStart::Full => Err(e),
            Err(_) => {
                log::debug!("no bootstrap mechanism available; provisioning will fail");
                Ok(Bootstrap::Unavailable)
            }
        }
    }
}
