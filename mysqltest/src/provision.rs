//! On-disk provisioning of an instance.
//!
//! [`Provisioner::setup`] lays out the base directory, writes the server
//! defaults file, seeds the data directory if requested and bootstraps the
//! system tables when the data directory has none.
//!
//! The seed copy runs before bootstrap when `mysql_install_db` is used, so a
//! seeded `mysql/` schema skips bootstrapping entirely. `mysqld
//! --initialize-insecure` refuses a non-empty data directory, so with that
//! mechanism the copy runs after bootstrap and overlays the fresh tables.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

use crate::config::{Bootstrap, Networking, ResolvedConfig};
use crate::error::{Error, Result};
use crate::path::resolve_once;

/// Subdirectories always created under the base directory.
pub const BASE_SUBDIRS: [&str; 3] = ["etc", "var", "tmp"];

/// Render the `[mysqld]` defaults file for `config`.
///
/// # Examples
///
/// ```no_run
/// use mysqltest::config::{ConfigResolver, InstanceConfig};
/// use mysqltest::guard::GuardStack;
/// use mysqltest::port::SystemPortAllocator;
/// use mysqltest::provision::render_defaults_file;
///
/// let mut guards = GuardStack::new();
/// let resolved = ConfigResolver::new(&SystemPortAllocator)
///     .resolve(InstanceConfig::default(), &mut guards)
///     .unwrap();
/// assert!(render_defaults_file(&resolved).contains("skip-networking\n"));
/// ```
#[must_use]
pub fn render_defaults_file(config: &ResolvedConfig) -> String {
    let mut out = String::from("[mysqld]\n");
    // Writing to a String cannot fail.
    let _ = writeln!(out, "datadir={}", config.data_dir.display());
    let _ = writeln!(out, "pid-file={}", config.pid_file.display());
    match &config.networking {
        Networking::SkipNetworking => out.push_str("skip-networking\n"),
        Networking::Tcp { port, .. } => {
            let _ = writeln!(out, "port={port}");
        }
    }
    let _ = writeln!(out, "socket={}", config.socket.display());
    let _ = writeln!(out, "tmpdir={}", config.tmp_dir.display());
    out
}

/// Recursively copy the tree at `from` into `to`.
///
/// Directories that already exist at the destination are reused; regular
/// files are copied with their permission bits.
///
/// # Errors
///
/// Returns the first I/O error encountered.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let dest = to.join(rel);

        if entry.file_type().is_dir() {
            match fs::create_dir(&dest) {
                Ok(()) => {
                    let perms = entry.metadata().map_err(io::Error::from)?.permissions();
                    fs::set_permissions(&dest, perms)?;
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

/// The `--basedir` argument for `mysql_install_db`: two levels above the
/// tool, after following at most one symlink.
///
/// # Errors
///
/// Returns [`Error::Path`] if the tool path cannot be inspected or has
/// fewer than two parent directories.
pub fn install_db_basedir(tool: &Path) -> Result<PathBuf> {
    let resolved = resolve_once(tool)?;
    resolved
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::Path {
            path: tool.to_path_buf(),
            reason: "cannot derive installation directory".to_string(),
        })
}

/// Creates the filesystem state an instance needs before it can start.
#[derive(Debug)]
pub struct Provisioner<'a> {
    config: &'a ResolvedConfig,
    defaults_file: &'a Path,
}

impl<'a> Provisioner<'a> {
    /// Create a provisioner writing the defaults file to `defaults_file`.
    #[must_use]
    pub const fn new(config: &'a ResolvedConfig, defaults_file: &'a Path) -> Self {
        Self {
            config,
            defaults_file,
        }
    }

    /// Provision the instance.
    ///
    /// # Errors
    ///
    /// - [`Error::Provision`] if a directory, the defaults file or the seed
    ///   copy fails.
    /// - [`Error::Bootstrap`] if the bootstrap command fails; the error
    ///   carries its combined output.
    /// - [`Error::BinaryNotFound`] if bootstrap is needed but no mechanism
    ///   is available.
    pub fn setup(&self) -> Result<()> {
        let config = self.config;
        create_dir_all(&config.base_dir)?;
        for sub in BASE_SUBDIRS {
            create_dir(&config.base_dir.join(sub))?;
        }
        create_dir_all(&config.tmp_dir)?;
        create_dir_all(&config.data_dir)?;

        let install_db = matches!(config.bootstrap, Bootstrap::InstallDb(_));
        if install_db {
            self.seed()?;
        }

        fs::write(self.defaults_file, render_defaults_file(config)).map_err(|source| {
            Error::Provision {
                path: self.defaults_file.to_path_buf(),
                source,
            }
        })?;
        log::debug!("wrote defaults file {}", self.defaults_file.display());

        if config.data_dir.join("mysql").exists() {
            log::debug!("system tables present; skipping bootstrap");
        } else {
            self.bootstrap()?;
        }

        if !install_db {
            self.seed()?;
        }
        Ok(())
    }

    fn seed(&self) -> Result<()> {
        let Some(from) = &self.config.copy_data_from else {
            return Ok(());
        };
        log::info!(
            "seeding {} from {}",
            self.config.data_dir.display(),
            from.display()
        );
        copy_tree(from, &self.config.data_dir).map_err(|source| Error::Provision {
            path: from.clone(),
            source,
        })
    }

    fn bootstrap(&self) -> Result<()> {
        let defaults = format!("--defaults-file={}", self.defaults_file.display());
        let (program, args) = match &self.config.bootstrap {
            Bootstrap::InstallDb(tool) => {
                let basedir = install_db_basedir(tool)?;
                (
                    tool.clone(),
                    vec![defaults, format!("--basedir={}", basedir.display())],
                )
            }
            Bootstrap::InitializeInsecure => (
                self.config.mysqld.clone(),
                vec![defaults, "--initialize-insecure".to_string()],
            ),
            Bootstrap::Unavailable => {
                return Err(Error::BinaryNotFound {
                    binary: "mysql_install_db".to_string(),
                    searched: vec!["mysql_install_db on PATH".to_string()],
                })
            }
        };

        let command = format!("{} {}", program.display(), args.join(" "));
        log::info!("bootstrapping data directory: {command}");

        let output = Command::new(&program)
            .args(&args)
            .output()
            .map_err(|e| Error::Bootstrap {
                command: command.clone(),
                output: e.to_string(),
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(Error::Bootstrap {
                command,
                output: combined,
            });
        }
        Ok(())
    }
}

fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| Error::Provision {
        path: path.to_path_buf(),
        source,
    })
}

fn create_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Err(e) if e.kind() != io::ErrorKind::AlreadyExists => Err(Error::Provision {
            path: path.to_path_buf(),
            source: e,
        }),
        _ => Ok(()),
    }
}
