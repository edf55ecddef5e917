//! Instance configuration.
//!
//! An instance is described by an [`InstanceConfig`], which may come from
//! code, from a YAML file via [`ConfigLoader`], or both. Before anything is
//! provisioned, [`ConfigResolver`] turns it into a [`ResolvedConfig`] in which
//! every path, the addressing mode and the bootstrap mechanism are fixed.
//!
//! # Precedence
//!
//! For each field (highest to lowest):
//!
//! 1. Values set programmatically or in a config file
//! 2. Environment variables (`MYSQLTEST_*`)
//! 3. Built-in defaults, derived from the base directory
//!
//! # Examples
//!
//! ```no_run
//! use mysqltest::config::{ConfigResolver, InstanceConfig};
//! use mysqltest::guard::GuardStack;
//! use mysqltest::port::SystemPortAllocator;
//!
//! let config = InstanceConfig::default().with_skip_networking(false);
//! let mut guards = GuardStack::new();
//! let resolved = ConfigResolver::new(&SystemPortAllocator)
//!     .resolve(config, &mut guards)
//!     .unwrap();
//!
//! println!("mysqld will listen on {:?}", resolved.port());
//! ```

pub mod environment;
pub mod loader;
pub mod resolver;
pub mod schema;

#[cfg(all(test, feature = "property-tests"))]
mod proptests;

pub use environment::EnvironmentConfig;
pub use loader::ConfigLoader;
pub use resolver::{Bootstrap, ConfigResolver, Networking, ResolvedConfig};
pub use schema::{AutoStart, InstanceConfig, Timeouts};
