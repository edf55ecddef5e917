//! Common test utilities for integration tests.
//!
//! The lifecycle tests run against a scripted stand-in for `mysqld`: a POSIX
//! shell script that answers the capability probe, fakes
//! `--initialize-insecure` by creating `<datadir>/mysql`, and otherwise
//! prints a readiness line and sleeps. Readiness over the wire is supplied by
//! a `MockConnectionProbe`.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use mysqltest::{AutoStart, InstanceConfig, Timeouts};

/// How the fake server behaves once launched.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehavior {
    /// Print a readiness line and keep running.
    Serve,
    /// Exit with status 1 right away.
    Crash,
    /// Run without printing anything.
    Silent,
}

/// Builder for fake `mysqld` scripts.
#[allow(dead_code)]
pub struct FakeMysqld {
    behavior: FakeBehavior,
    initialize_insecure: bool,
}

#[allow(dead_code)]
impl FakeMysqld {
    /// A fake that supports `--initialize-insecure` and serves forever.
    pub fn new() -> Self {
        Self {
            behavior: FakeBehavior::Serve,
            initialize_insecure: true,
        }
    }

    /// Set the post-launch behavior.
    pub fn behavior(mut self, behavior: FakeBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Pretend to be a server too old for `--initialize-insecure`.
    pub fn legacy(mut self) -> Self {
        self.initialize_insecure = false;
        self
    }

    /// Write the script to `<dir>/mysqld` and return its path.
    pub fn install(&self, dir: &Path) -> PathBuf {
        let help = if self.initialize_insecure {
            "  --initialize-insecure   Create the default database"
        } else {
            "  --bootstrap             Used by mysql installation scripts"
        };
        let run = match self.behavior {
            FakeBehavior::Serve => {
                "echo \"$(date) [Note] mysqld: ready for connections.\"\nexec sleep 600"
            }
            FakeBehavior::Crash => "echo 'mysqld: fatal error' >&2\nexit 1",
            FakeBehavior::Silent => "exec sleep 600",
        };
        let script = format!(
            r#"#!/bin/sh
case "$*" in
  *--help*) echo "{help}"; exit 0 ;;
  *--initialize-insecure*)
    datadir=$(sed -n 's/^datadir=//p' "${{1#--defaults-file=}}")
    mkdir -p "$datadir/mysql"
    echo "initialized $datadir"
    exit 0 ;;
esac
{run}
"#
        );
        write_executable(&dir.join("mysqld"), &script)
    }
}

/// Write `body` to `path` and mark it executable.
#[allow(dead_code)]
pub fn write_executable(path: &Path, body: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

/// Short budgets so failure paths finish quickly.
#[allow(dead_code)]
pub fn fast_timeouts() -> Timeouts {
    Timeouts::default()
        .with_launch(Duration::from_secs(2))
        .with_connect(Duration::from_millis(300))
        .with_tick(Duration::from_millis(10))
}

/// A manual-start config rooted under `dir` using `mysqld`.
#[allow(dead_code)]
pub fn manual_config(dir: &Path, mysqld: &Path) -> InstanceConfig {
    InstanceConfig::default()
        .with_base_dir(dir.join("base"))
        .with_mysqld(mysqld)
        .with_auto_start(AutoStart::Manual)
        .with_timeouts(fast_timeouts())
}

/// Poll `path` until it contains `needle` or five seconds pass.
#[allow(dead_code)]
pub fn wait_for_file_contents(path: &Path, needle: &str) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let contents = fs::read_to_string(path).unwrap_or_default();
        if contents.contains(needle) || Instant::now() > deadline {
            return contents;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Whether `pid` still names a live process (Linux only; true elsewhere).
#[allow(dead_code)]
pub fn process_alive(pid: u32) -> bool {
    if cfg!(target_os = "linux") {
        Path::new(&format!("/proc/{pid}")).exists()
    } else {
        true
    }
}
