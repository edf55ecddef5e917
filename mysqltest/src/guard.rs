//! Ordered cleanup actions.
//!
//! Anything an instance creates that must not outlive it (the temporary base
//! directory, most importantly) registers a guard here. `stop` drains the
//! stack exactly once. Guards must be safe to run after a partial setup
//! failure, so each one tolerates its resource being absent.

use std::fmt;
use std::io;
use std::path::PathBuf;

type GuardAction = Box<dyn FnOnce() -> io::Result<()> + Send>;

struct Guard {
    label: String,
    action: GuardAction,
}

/// An ordered list of one-shot cleanup actions.
///
/// # Examples
///
/// ```
/// use mysqltest::guard::GuardStack;
///
/// let dir = tempfile::tempdir().unwrap().keep();
/// let mut guards = GuardStack::new();
/// guards.remove_dir_all(dir.clone());
/// assert_eq!(guards.len(), 1);
///
/// guards.run_all();
/// assert!(!dir.exists());
/// assert!(guards.is_empty());
/// ```
#[derive(Default)]
pub struct GuardStack {
    guards: Vec<Guard>,
}

impl GuardStack {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cleanup action.
    pub fn register<F>(&mut self, label: impl Into<String>, action: F)
    where
        F: FnOnce() -> io::Result<()> + Send + 'static,
    {
        let label = label.into();
        log::debug!("registered cleanup guard: {label}");
        self.guards.push(Guard {
            label,
            action: Box::new(action),
        });
    }

    /// Append a guard that recursively deletes `path`.
    ///
    /// A path that is already gone counts as success.
    pub fn remove_dir_all(&mut self, path: PathBuf) {
        let label = format!("remove {}", path.display());
        self.register(label, move || match std::fs::remove_dir_all(&path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        });
    }

    /// Run and remove every guard in registration order.
    ///
    /// A failing guard is logged and does not prevent later guards from
    /// running. Returns the number of guards that failed.
    pub fn run_all(&mut self) -> usize {
        let mut failures = 0;
        for guard in self.guards.drain(..) {
            match (guard.action)() {
                Ok(()) => log::debug!("cleanup guard done: {}", guard.label),
                Err(e) => {
                    failures += 1;
                    log::warn!("cleanup guard failed: {}: {e}", guard.label);
                }
            }
        }
        failures
    }

    /// Number of pending guards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Whether no guards are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl fmt::Debug for GuardStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.guards.iter().map(|g| &g.label))
            .finish()
    }
}
