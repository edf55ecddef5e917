//! The supervised `mysqld` child process.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

#[cfg(unix)]
use std::os::unix::process::CommandExt;

use crate::error::{Error, Result};

/// What the supervisor currently knows about the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    /// The child's status could not be determined yet.
    Pending,
    /// The child is running.
    Live,
    /// The child has exited.
    Exited(ExitStatus),
}

/// A running `mysqld` whose output is copied into a log file.
///
/// The server runs in its own process group so that signals aimed at the
/// test runner's group do not reach it. Dropping the value kills the server.
#[derive(Debug)]
pub struct ServerProcess {
    child: Child,
    command: String,
    reaped: Option<ExitStatus>,
}

impl ServerProcess {
    /// Start `mysqld --defaults-file=<defaults_file> --user=root`, truncating
    /// `log_file` and copying both output streams into it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Launch`] if the log file cannot be created or the
    /// process or its output threads cannot be started.
    pub fn spawn(mysqld: &Path, defaults_file: &Path, log_file: &Path) -> Result<Self> {
        let args = [
            format!("--defaults-file={}", defaults_file.display()),
            "--user=root".to_string(),
        ];
        let command = format!("{} {}", mysqld.display(), args.join(" "));
        let launch_error = |reason: String| Error::Launch {
            command: command.clone(),
            reason,
        };

        let log = File::create(log_file)
            .map_err(|e| launch_error(format!("cannot create log {}: {e}", log_file.display())))?;

        let mut cmd = Command::new(mysqld);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| launch_error(e.to_string()))?;
        let mut process = Self {
            child,
            command: command.clone(),
            reaped: None,
        };
        log::info!("spawned mysqld (pid {}): {command}", process.id());

        let stdout = process.child.stdout.take();
        let stderr = process.child.stderr.take();
        let pumps = [
            ("mysqld-stdout", stdout.map(Pipe::Out)),
            ("mysqld-stderr", stderr.map(Pipe::Err)),
        ];
        for (name, pipe) in pumps {
            let Some(pipe) = pipe else { continue };
            let started = log
                .try_clone()
                .and_then(|sink| pump(name, pipe, sink));
            if let Err(e) = started {
                // Dropping `process` kills the child.
                return Err(launch_error(format!("cannot capture output: {e}")));
            }
        }

        Ok(process)
    }

    /// Poll the child without blocking.
    pub fn launch_state(&mut self) -> LaunchState {
        if let Some(status) = self.reaped {
            return LaunchState::Exited(status);
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.reaped = Some(status);
                LaunchState::Exited(status)
            }
            Ok(None) => LaunchState::Live,
            Err(e) => {
                log::debug!("cannot poll mysqld (pid {}): {e}", self.id());
                LaunchState::Pending
            }
        }
    }

    /// Whether the child has exited.
    pub fn has_exited(&mut self) -> bool {
        matches!(self.launch_state(), LaunchState::Exited(_))
    }

    /// OS process id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// The command line used to start the server.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Force-kill and reap the child. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the signal cannot be delivered or the child
    /// cannot be reaped.
    pub fn kill(&mut self) -> io::Result<()> {
        if self.has_exited() {
            return Ok(());
        }
        match self.child.kill() {
            Ok(()) => {}
            // Already exited but not yet reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e),
        }
        let status = self.child.wait()?;
        log::info!("mysqld (pid {}) stopped: {status}", self.id());
        self.reaped = Some(status);
        Ok(())
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if let Err(e) = self.kill() {
            log::warn!("failed to kill mysqld (pid {}): {e}", self.id());
        }
    }
}

enum Pipe {
    Out(std::process::ChildStdout),
    Err(std::process::ChildStderr),
}

impl Read for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Out(out) => out.read(buf),
            Self::Err(err) => err.read(buf),
        }
    }
}

/// Copy `pipe` into `sink` on a named background thread until EOF.
fn pump(name: &str, mut pipe: Pipe, mut sink: File) -> io::Result<()> {
    let label = name.to_string();
    thread::Builder::new().name(label.clone()).spawn(move || {
        if let Err(e) = io::copy(&mut pipe, &mut sink) {
            log::warn!("{label}: failed to copy output to log: {e}");
        }
    })?;
    Ok(())
}
