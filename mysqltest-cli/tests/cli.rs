//! Integration tests for the mysqltest CLI.
//!
//! These tests verify argument parsing, help text, exit codes and the
//! output of each command.

#![cfg(unix)]

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;

// ============================================================================
// Global flags
// ============================================================================

#[test]
fn test_cli_no_arguments() {
    let env = TestEnv::new();
    env.command()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_version_flag() {
    let env = TestEnv::new();
    env.command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mysqltest"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_help_flag() {
    let env = TestEnv::new();
    env.command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Run disposable mysqld instances"))
        .stdout(predicate::str::contains("show-config"));
}

// ============================================================================
// dsn
// ============================================================================

#[test]
fn test_dsn_defaults() {
    let env = TestEnv::new();
    env.command()
        .arg("dsn")
        .assert()
        .success()
        .stdout("root:@tcp(localhost:3306)/test\n");
}

#[test]
fn test_dsn_unix_socket() {
    let env = TestEnv::new();
    env.command()
        .args(["dsn", "--protocol", "unix", "--socket", "/tmp/x.sock"])
        .assert()
        .success()
        .stdout("root:@unix(/tmp/x.sock)/test\n");
}

#[test]
fn test_dsn_query_parameters_sorted() {
    let env = TestEnv::new();
    env.command()
        .args([
            "dsn",
            "--host",
            "db.local",
            "--port",
            "13306",
            "--user",
            "app",
            "--password",
            "pw",
            "--dbname",
            "shop",
            "--parse-time",
            "true",
            "--multi-statements",
            "false",
        ])
        .assert()
        .success()
        .stdout("app:pw@tcp(db.local:13306)/shop?multiStatements=false&parseTime=true\n");
}

#[test]
fn test_dsn_unix_requires_socket() {
    let env = TestEnv::new();
    env.command()
        .args(["dsn", "--protocol", "unix"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("--socket"));
}

#[test]
fn test_dsn_rejects_unknown_protocol() {
    let env = TestEnv::new();
    env.command()
        .args(["dsn", "--protocol", "pipe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown protocol"));
}

// ============================================================================
// show-config
// ============================================================================

#[test]
fn test_show_config_yaml() {
    let env = TestEnv::new();
    let mysqld = env.fake_mysqld();
    let base = env.path().join("base");

    env.command()
        .arg("show-config")
        .arg("--mysqld")
        .arg(&mysqld)
        .arg("--base-dir")
        .arg(&base)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("base_dir: {}", base.display())))
        .stdout(predicate::str::contains("mode: skip_networking"))
        .stdout(predicate::str::contains("mechanism: initialize_insecure"));

    // Resolution alone creates nothing under an explicit base directory.
    assert!(!base.exists());
}

#[test]
fn test_show_config_json_with_networking() {
    let env = TestEnv::new();
    let mysqld = env.fake_mysqld();

    let output = env
        .command()
        .arg("show-config")
        .arg("--mysqld")
        .arg(&mysqld)
        .args(["--base-dir", "/srv/mysqltest-cli-test", "--port", "23306"])
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["networking"]["mode"], "tcp");
    assert_eq!(value["networking"]["bind_address"], "127.0.0.1");
    assert_eq!(value["networking"]["port"], 23306);
    assert_eq!(value["socket"], "/srv/mysqltest-cli-test/tmp/mysql.sock");
}

#[test]
fn test_show_config_from_file() {
    let env = TestEnv::new();
    let mysqld = env.fake_mysqld();
    let config = env.write(
        "mysqltest.yaml",
        &format!(
            "base_dir: /srv/from-file\nmysqld: {}\ntimeouts:\n  launch_ms: 4000\n",
            mysqld.display()
        ),
    );

    env.command()
        .arg("--config")
        .arg(&config)
        .args(["show-config", "--base-dir", "/srv/from-flag"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_dir: /srv/from-flag"))
        .stdout(predicate::str::contains("launch_ms: 4000"));
}

#[test]
fn test_show_config_bad_file() {
    let env = TestEnv::new();
    let config = env.write("broken.yaml", "replication: true\n");

    env.command()
        .arg("--config")
        .arg(&config)
        .arg("show-config")
        .assert()
        .code(7);
}

#[test]
fn test_show_config_missing_mysqld() {
    let env = TestEnv::new();
    env.command()
        .args(["show-config", "--mysqld", "no-such-mysqld-binary"])
        .args(["--base-dir", "/srv/unused"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("could not find mysqld"));
}

// ============================================================================
// start
// ============================================================================

#[test]
fn test_start_reports_connect_timeout() {
    let env = TestEnv::new();
    let mysqld = env.fake_mysqld();
    let base = env.path().join("base");

    // The fake server never opens its socket, so the real probe times out.
    env.command()
        .arg("start")
        .arg("--mysqld")
        .arg(&mysqld)
        .arg("--base-dir")
        .arg(&base)
        .args(["--connect-timeout", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("before we could connect"));

    assert!(base.join("etc/my.cnf").is_file());
    assert!(base.join("var/mysql").is_dir());
}

#[test]
fn test_start_refuses_existing_pid_file() {
    let env = TestEnv::new();
    let mysqld = env.fake_mysqld();
    let base = env.path().join("base");
    fs::create_dir_all(base.join("tmp")).unwrap();
    fs::write(base.join("tmp/mysqld.pid"), "4242\n").unwrap();

    env.command()
        .arg("start")
        .arg("--mysqld")
        .arg(&mysqld)
        .arg("--base-dir")
        .arg(&base)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already running"));
}

// ============================================================================
// completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let env = TestEnv::new();
    env.command()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mysqltest"))
        .stdout(predicate::str::contains("show-config"));
}
