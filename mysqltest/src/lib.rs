#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # mysqltest
//!
//! Disposable `mysqld` instances for integration tests.
//!
//! A [`TestMysqld`] resolves a configuration, lays out a private directory
//! tree, bootstraps the system tables, launches `mysqld` in its own process
//! group and blocks until the server answers `SELECT 1`. Dropping the handle
//! kills the server and removes the temporary directory.
//!
//! ## Core Types
//!
//! - [`TestMysqld`] and [`InstanceBuilder`]: the lifecycle facade
//! - [`InstanceConfig`]: what to start, and how
//! - [`Datasource`] and [`DatasourceOption`]: DSN construction
//! - [`Error`] and [`Result`]: Error handling types
//! - [`Logger`] and [`LogLevel`]: Logging infrastructure
//!
//! ## Examples
//!
//! ```
//! use mysqltest::dsn::{datasource, DatasourceOption, Protocol};
//!
//! let dsn = datasource([
//!     DatasourceOption::Protocol(Protocol::Unix),
//!     DatasourceOption::Socket("/tmp/x.sock".into()),
//! ]);
//! assert_eq!(dsn, "root:@unix(/tmp/x.sock)/test");
//! ```
//!
//! Starting a server requires a local MySQL installation:
//!
//! ```no_run
//! use mysqltest::{InstanceConfig, TestMysqld};
//!
//! let mysqld = TestMysqld::new(InstanceConfig::default())?;
//! println!("{}", mysqld.dsn([]));
//! # Ok::<(), mysqltest::Error>(())
//! ```

pub mod config;
pub mod dsn;
pub mod error;
pub mod guard;
pub mod instance;
pub mod locate;
pub mod logging;
pub mod path;
pub mod port;
pub mod process;
pub mod provision;
pub mod readiness;

// Re-export key types at crate root for convenience
pub use config::{AutoStart, ConfigLoader, InstanceConfig, ResolvedConfig, Timeouts};
pub use dsn::{datasource, Datasource, DatasourceOption, Protocol};
pub use error::{Error, Result};
pub use instance::{InstanceBuilder, InstanceState, TestMysqld};
pub use logging::{init_logger, LogLevel, Logger};
pub use port::Port;
pub use readiness::{ConnectionProbe, MockConnectionProbe, MysqlProbe};
