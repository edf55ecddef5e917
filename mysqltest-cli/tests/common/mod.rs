//! Common test utilities for CLI integration tests.
//!
//! - Test environment setup with temporary directories
//! - A scripted stand-in for `mysqld`

use assert_cmd::Command;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAKE_MYSQLD: &str = r#"#!/bin/sh
case "$*" in
  *--help*) echo "  --initialize-insecure   Create the default database"; exit 0 ;;
  *--initialize-insecure*)
    datadir=$(sed -n 's/^datadir=//p' "${1#--defaults-file=}")
    mkdir -p "$datadir/mysql"; exit 0 ;;
esac
echo "mysqld: ready for connections"
exec sleep 600
"#;

/// Isolated test environment.
pub struct TestEnv {
    /// Temporary directory (kept alive for the duration of the test)
    #[allow(dead_code)]
    temp_dir: TempDir,
    /// Path to the temporary directory
    pub temp_path: PathBuf,
}

#[allow(dead_code)]
impl TestEnv {
    /// Create a new test environment.
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let temp_path = temp_dir.path().to_path_buf();
        Self {
            temp_dir,
            temp_path,
        }
    }

    /// A command builder for the binary with `MYSQLTEST_*` variables cleared.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("mysqltest").expect("Failed to find mysqltest binary");
        for var in [
            "MYSQLTEST_CONFIG",
            "MYSQLTEST_MYSQLD",
            "MYSQLTEST_MYSQL_INSTALL_DB",
            "MYSQLTEST_LAUNCH_TIMEOUT",
            "MYSQLTEST_CONNECT_TIMEOUT",
            "MYSQLTEST_LOG_MODE",
            "TEST_MYSQLD_PRESERVE",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Get the temp path.
    pub fn path(&self) -> &Path {
        &self.temp_path
    }

    /// Install the fake `mysqld` and return its path.
    pub fn fake_mysqld(&self) -> PathBuf {
        let path = self.temp_path.join("bin/mysqld");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, FAKE_MYSQLD).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Write a file under the temp directory.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_path.join(name);
        fs::write(&path, contents).unwrap();
        path
    }
}
