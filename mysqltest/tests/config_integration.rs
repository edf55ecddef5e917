//! Integration tests for configuration loading and resolution.
//!
//! Tests that modify environment variables are marked with `#[serial]`;
//! environment variables are process-global, so concurrent access would
//! race. Only those tests run serially.

#![cfg(unix)]

mod common;

use std::env;
use std::fs;
use std::time::Duration;

use common::FakeMysqld;
use mysqltest::config::environment::{
    CONNECT_TIMEOUT_ENV, LAUNCH_TIMEOUT_ENV, MYSQLD_ENV, PRESERVE_ENV,
};
use mysqltest::config::{Bootstrap, ConfigLoader, ConfigResolver, Networking};
use mysqltest::guard::GuardStack;
use mysqltest::port::MockPortAllocator;
use mysqltest::{AutoStart, Error, InstanceConfig, MockConnectionProbe, TestMysqld};
use serial_test::serial;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Restores (or clears) an environment variable on drop.
struct EnvGuard {
    name: &'static str,
    previous: Option<String>,
}

impl EnvGuard {
    fn set(name: &'static str, value: &str) -> Self {
        let previous = env::var(name).ok();
        env::set_var(name, value);
        Self { name, previous }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(value) => env::set_var(self.name, value),
            None => env::remove_var(self.name),
        }
    }
}

// ============================================================================
// File loading
// ============================================================================

#[test]
fn test_yaml_file_drives_resolution() {
    let temp = TempDir::new().unwrap();
    let mysqld = FakeMysqld::new().install(temp.path());
    let path = temp.path().join("mysqltest.yaml");
    fs::write(
        &path,
        format!(
            "base_dir: {base}\nskip_networking: false\nport: 0\nauto_start: 0\nmysqld: {mysqld}\ntimeouts:\n  launch_ms: 1500\n  connect_ms: 2500\n  tick_ms: 50\n",
            base = temp.path().join("base").display(),
            mysqld = mysqld.display(),
        ),
    )
    .unwrap();

    let config = ConfigLoader::load_file(&path).unwrap();
    assert_eq!(config.auto_start, AutoStart::Manual);

    let allocator = MockPortAllocator::new([45678]);
    let mut guards = GuardStack::new();
    let resolved = ConfigResolver::new(&allocator)
        .skip_env()
        .resolve(config, &mut guards)
        .unwrap();

    assert_eq!(resolved.base_dir, temp.path().join("base"));
    assert_eq!(
        resolved.networking,
        Networking::Tcp {
            bind_address: "127.0.0.1".to_string(),
            port: mysqltest::Port::try_from(45678).unwrap(),
        }
    );
    assert_eq!(resolved.timeouts.launch, Duration::from_millis(1500));
    assert_eq!(resolved.timeouts.tick, Duration::from_millis(50));
    assert_eq!(resolved.bootstrap, Bootstrap::InitializeInsecure);
    assert!(guards.is_empty());
}

#[test]
fn test_unknown_field_rejected() {
    let err = ConfigLoader::load_str("base_dir: /tmp/x\nreplication: true\n").unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_invalid_auto_start_rejected() {
    assert!(ConfigLoader::load_str("auto_start: 7\n").is_err());
}

#[test]
fn test_missing_file() {
    let temp = TempDir::new().unwrap();
    let err = ConfigLoader::load_file(&temp.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, Error::Path { .. }));
}

// ============================================================================
// Environment
// ============================================================================

#[test]
#[serial]
fn test_mysqld_from_environment() {
    let temp = TempDir::new().unwrap();
    let mysqld = FakeMysqld::new().install(temp.path());
    let _guard = EnvGuard::set(MYSQLD_ENV, &mysqld.display().to_string());

    let config = InstanceConfig::default()
        .with_base_dir(temp.path().join("base"))
        .with_auto_start(AutoStart::Manual);
    let instance = TestMysqld::builder(config)
        .probe(MockConnectionProbe::ready())
        .build()
        .unwrap();
    assert_eq!(instance.config().mysqld, mysqld);
}

#[test]
#[serial]
fn test_explicit_mysqld_beats_environment() {
    let temp = TempDir::new().unwrap();
    let mysqld = FakeMysqld::new().install(temp.path());
    let _guard = EnvGuard::set(MYSQLD_ENV, "/nonexistent/mysqld");

    let config = common::manual_config(temp.path(), &mysqld);
    let instance = TestMysqld::builder(config)
        .probe(MockConnectionProbe::ready())
        .build()
        .unwrap();
    assert_eq!(instance.config().mysqld, mysqld);
}

#[test]
#[serial]
fn test_timeouts_from_environment() {
    let temp = TempDir::new().unwrap();
    let mysqld = FakeMysqld::new().install(temp.path());
    let _launch = EnvGuard::set(LAUNCH_TIMEOUT_ENV, "7");
    let _connect = EnvGuard::set(CONNECT_TIMEOUT_ENV, "9");

    let config = InstanceConfig::default()
        .with_base_dir(temp.path().join("base"))
        .with_mysqld(&mysqld)
        .with_auto_start(AutoStart::Manual);
    let instance = TestMysqld::builder(config)
        .probe(MockConnectionProbe::ready())
        .build()
        .unwrap();
    assert_eq!(instance.config().timeouts.launch, Duration::from_secs(7));
    assert_eq!(instance.config().timeouts.connect, Duration::from_secs(9));
}

#[test]
#[serial]
fn test_invalid_timeout_in_environment() {
    let temp = TempDir::new().unwrap();
    let mysqld = FakeMysqld::new().install(temp.path());
    let _launch = EnvGuard::set(LAUNCH_TIMEOUT_ENV, "soon");

    let config = InstanceConfig::default()
        .with_base_dir(temp.path().join("base"))
        .with_mysqld(&mysqld)
        .with_auto_start(AutoStart::Manual);
    let err = TestMysqld::builder(config)
        .probe(MockConnectionProbe::ready())
        .build()
        .unwrap_err();
    match err {
        Error::Validation { field, .. } => assert_eq!(field, LAUNCH_TIMEOUT_ENV),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
#[serial]
fn test_preserve_from_environment() {
    let temp = TempDir::new().unwrap();
    let mysqld = FakeMysqld::new().install(temp.path());
    let _guard = EnvGuard::set(PRESERVE_ENV, "1");

    let mut config = common::manual_config(temp.path(), &mysqld);
    config.base_dir = None;
    let mut instance = TestMysqld::builder(config)
        .probe(MockConnectionProbe::ready())
        .skip_env()
        .build()
        .unwrap();
    instance.setup().unwrap();
    let base = instance.base_dir().to_path_buf();

    drop(instance);
    assert!(base.is_dir());
    fs::remove_dir_all(&base).unwrap();
}

#[test]
#[serial]
fn test_unparseable_preserve_means_remove() {
    let temp = TempDir::new().unwrap();
    let mysqld = FakeMysqld::new().install(temp.path());
    let _guard = EnvGuard::set(PRESERVE_ENV, "perhaps");

    let mut config = common::manual_config(temp.path(), &mysqld);
    config.base_dir = None;
    let instance = TestMysqld::builder(config)
        .probe(MockConnectionProbe::ready())
        .skip_env()
        .build()
        .unwrap();
    let base = instance.base_dir().to_path_buf();

    drop(instance);
    assert!(!base.exists());
}
