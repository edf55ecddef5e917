//! Executable lookup for the server and its bootstrap tool.
//!
//! `mysqld` is often installed outside `PATH` (`/usr/sbin`, `libexec/`), so
//! when a direct lookup fails the install prefix is guessed from the `mysql`
//! client: `<prefix>/bin/mysql` implies `mysqld` under one of
//! `<prefix>/{bin,libexec,sbin}`.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// Well-known client location tried after `PATH`.
pub const DEFAULT_CLIENT_FALLBACK: &str = "/usr/local/mysql/bin/mysql";

/// Directories under the install prefix searched for `mysqld`.
pub const MYSQLD_SEARCH_DIRS: [&str; 3] = ["bin", "libexec", "sbin"];

/// Option advertised by servers that can bootstrap without `mysql_install_db`.
pub const INITIALIZE_INSECURE: &str = "--initialize-insecure";

/// Finds executables on a search path.
///
/// # Examples
///
/// ```no_run
/// use mysqltest::locate::Locator;
///
/// let mysqld = Locator::default().mysqld().unwrap();
/// println!("using {}", mysqld.display());
/// ```
#[derive(Debug, Clone)]
pub struct Locator {
    search_path: Option<OsString>,
    client_fallbacks: Vec<PathBuf>,
}

impl Default for Locator {
    fn default() -> Self {
        Self {
            search_path: None,
            client_fallbacks: vec![PathBuf::from(DEFAULT_CLIENT_FALLBACK)],
        }
    }
}

impl Locator {
    /// Search `path` (a `PATH`-style list) instead of the process `PATH`.
    #[must_use]
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Replace the client locations tried after the search path.
    #[must_use]
    pub fn with_client_fallbacks(mut self, fallbacks: Vec<PathBuf>) -> Self {
        self.client_fallbacks = fallbacks;
        self
    }

    /// Look up `name` on the search path.
    ///
    /// Absolute or relative paths containing a separator are checked
    /// directly.
    #[must_use]
    pub fn find(&self, name: impl AsRef<Path>) -> Option<PathBuf> {
        let name = name.as_ref();
        let found = match &self.search_path {
            Some(paths) => {
                let cwd = env::current_dir().ok()?;
                which::which_in(name, Some(paths), cwd)
            }
            None => which::which(name),
        };
        found.ok()
    }

    /// Locate `mysqld`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BinaryNotFound`] listing every searched location.
    pub fn mysqld(&self) -> Result<PathBuf> {
        let mut searched = vec!["mysqld on PATH".to_string()];
        if let Some(path) = self.find("mysqld") {
            log::debug!("found mysqld at {}", path.display());
            return Ok(path);
        }

        let mut client = None;
        searched.push("mysql on PATH".to_string());
        if let Some(path) = self.find("mysql") {
            client = Some(path);
        } else {
            for fallback in &self.client_fallbacks {
                searched.push(fallback.display().to_string());
                if let Some(path) = self.find(fallback) {
                    client = Some(path);
                    break;
                }
            }
        }

        let not_found = |searched: Vec<String>| Error::BinaryNotFound {
            binary: "mysqld".to_string(),
            searched,
        };

        let Some(client) = client else {
            return Err(not_found(searched));
        };
        let Some(prefix) = install_prefix(&client) else {
            searched.push(format!("{} (unsupported mysql path)", client.display()));
            return Err(not_found(searched));
        };

        for dir in MYSQLD_SEARCH_DIRS {
            let candidate = prefix.join(dir).join("mysqld");
            searched.push(candidate.display().to_string());
            if let Some(path) = self.find(&candidate) {
                log::debug!(
                    "found mysqld at {} via client {}",
                    path.display(),
                    client.display()
                );
                return Ok(path);
            }
        }

        Err(not_found(searched))
    }

    /// Locate `mysql_install_db`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BinaryNotFound`] if it is not on the search path.
    pub fn mysql_install_db(&self) -> Result<PathBuf> {
        self.find("mysql_install_db")
            .ok_or_else(|| Error::BinaryNotFound {
                binary: "mysql_install_db".to_string(),
                searched: vec!["mysql_install_db on PATH".to_string()],
            })
    }
}

/// Strip a trailing `bin/mysql` from a client path.
fn install_prefix(client: &Path) -> Option<PathBuf> {
    if !client.ends_with("bin/mysql") {
        return None;
    }
    client.parent()?.parent().map(Path::to_path_buf)
}

/// Run `mysqld --help --verbose` and report whether the server can bootstrap
/// itself with `--initialize-insecure`.
///
/// # Errors
///
/// Returns [`Error::CapabilityProbe`] if the command cannot be run or exits
/// unsuccessfully.
pub fn supports_initialize_insecure(mysqld: &Path) -> Result<bool> {
    let command = format!("{} --help --verbose", mysqld.display());
    let output = Command::new(mysqld)
        .args(["--help", "--verbose"])
        .output()
        .map_err(|source| Error::CapabilityProbe {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(Error::CapabilityProbe {
            command,
            source: io::Error::other(format!("exited with {}", output.status)),
        });
    }

    let supported = String::from_utf8_lossy(&output.stdout).contains(INITIALIZE_INSECURE);
    log::debug!("{} supports {INITIALIZE_INSECURE}: {supported}", mysqld.display());
    Ok(supported)
}
