//! Build script for mysqltest-cli.
//!
//! This script generates man pages at build time using clap_mangen.
//! The generated man page is placed in OUT_DIR for inclusion in release builds.
//!
//! Note: We build a minimal command structure here rather than importing from
//! the main crate, since build scripts cannot depend on the crate being built.

use clap::{Arg, Command};
use clap_mangen::Man;
use std::fs;
use std::path::PathBuf;

/// Build the CLI command structure for man page generation.
///
/// IMPORTANT: Keep this structure synchronized with src/cli.rs
/// When adding/removing/modifying commands, update both files.
fn build_cli() -> Command {
    Command::new("mysqltest")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run disposable mysqld instances for testing")
        .long_about(
            "Provision, start and tear down throwaway mysqld servers with private data directories",
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Enable verbose output")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .help("Suppress non-essential output")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("YAML instance configuration file")
                .value_name("PATH")
                .global(true)
                .env("MYSQLTEST_CONFIG"),
        )
        .subcommands(vec![
            Command::new("start")
                .about("Provision and start mysqld, then wait for stdin to close")
                .long_about(
                    "Start a disposable mysqld, print its DSN, socket and log path, and stop it \
                     when a line is read from stdin or stdin closes",
                ),
            Command::new("dsn")
                .about("Render a DSN string from options")
                .long_about("Build a user:pass@address/db DSN without starting anything"),
            Command::new("show-config")
                .about("Print the resolved instance configuration")
                .long_about("Resolve paths, networking and bootstrap mechanism and print them"),
            Command::new("completions")
                .about("Generate shell completion scripts")
                .long_about("Generate shell completion scripts for bash, zsh, fish, or PowerShell"),
        ])
}

fn main() {
    // Generate man pages at build time
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).unwrap();

    let app = build_cli();
    let man = Man::new(app);
    let mut buffer = Vec::new();
    man.render(&mut buffer).unwrap();

    fs::write(man_dir.join("mysqltest.1"), buffer).unwrap();

    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-changed=src/commands/");
}
