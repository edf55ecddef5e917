//! TCP port types and the ephemeral port allocation capability.
//!
//! When networking is enabled and no port was configured, the resolver asks
//! a [`PortAllocator`] for a free ephemeral port. The production allocator
//! delegates to the `port-selector` crate; [`MockPortAllocator`] hands out a
//! scripted sequence for tests.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A valid network port number (1-65535).
///
/// Port 0 is rejected: in an instance configuration it means "unset", so it
/// can never be the resolved port of a running server.
///
/// # Examples
///
/// ```
/// use mysqltest::Port;
///
/// let port = Port::try_from(3306).unwrap();
/// assert_eq!(port.value(), 3306);
/// assert!(Port::try_from(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// The conventional MySQL port.
    pub const MYSQL_DEFAULT: Self = Self(3306);

    /// Returns the underlying port number.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Port {
    type Error = InvalidPortError;

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        if value == 0 {
            Err(InvalidPortError { value })
        } else {
            Ok(Self(value))
        }
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when converting 0 into a [`Port`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPortError {
    /// The rejected value.
    pub value: u16,
}

impl fmt::Display for InvalidPortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid port {}: port 0 is reserved", self.value)
    }
}

impl std::error::Error for InvalidPortError {}

/// Capability: return an available ephemeral TCP port.
///
/// The returned port is free at the moment of the call only. Another process
/// may take it before `mysqld` binds, in which case the launch fails and the
/// caller retries with a fresh instance.
pub trait PortAllocator: Send + Sync {
    /// Allocate a port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PortAllocation`] if no port is available.
    fn allocate(&self) -> Result<Port>;
}

/// Production allocator backed by `port-selector`.
///
/// # Examples
///
/// ```
/// use mysqltest::port::{PortAllocator, SystemPortAllocator};
///
/// let port = SystemPortAllocator.allocate().unwrap();
/// assert_ne!(port.value(), 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortAllocator;

impl PortAllocator for SystemPortAllocator {
    fn allocate(&self) -> Result<Port> {
        let raw = port_selector::random_free_tcp_port().ok_or_else(|| Error::PortAllocation {
            reason: "no free TCP port available".to_string(),
        })?;
        let port = Port::try_from(raw).map_err(|e| Error::PortAllocation {
            reason: e.to_string(),
        })?;
        log::debug!("allocated ephemeral port {port}");
        Ok(port)
    }
}

/// Mock allocator handing out a fixed sequence of ports.
///
/// Once the sequence is exhausted every further call fails, which lets tests
/// exercise the allocation error path. Clones share the same queue.
///
/// # Examples
///
/// ```
/// use mysqltest::port::{MockPortAllocator, PortAllocator};
///
/// let allocator = MockPortAllocator::new([40001, 40002]);
/// assert_eq!(allocator.allocate().unwrap().value(), 40001);
/// assert_eq!(allocator.allocate().unwrap().value(), 40002);
/// assert!(allocator.allocate().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPortAllocator {
    ports: Arc<Mutex<VecDeque<u16>>>,
}

impl MockPortAllocator {
    /// Create an allocator that returns `ports` in order.
    #[must_use]
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            ports: Arc::new(Mutex::new(ports.into_iter().collect())),
        }
    }

    /// Create an allocator that always fails.
    #[must_use]
    pub fn exhausted() -> Self {
        Self::default()
    }

    /// Number of ports left to hand out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.ports.lock().map_or(0, |ports| ports.len())
    }
}

impl PortAllocator for MockPortAllocator {
    fn allocate(&self) -> Result<Port> {
        let next = self
            .ports
            .lock()
            .map_err(|_| Error::PortAllocation {
                reason: "allocator state poisoned".to_string(),
            })?
            .pop_front();

        let raw = next.ok_or_else(|| Error::PortAllocation {
            reason: "mock allocator exhausted".to_string(),
        })?;
        Port::try_from(raw).map_err(|e| Error::PortAllocation {
            reason: e.to_string(),
        })
    }
}
