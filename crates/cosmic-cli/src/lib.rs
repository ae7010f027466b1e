//! cosmic - a package manager for command-line tools
#![allow(clippy::missing_errors_doc)]
//!
//! Installs prebuilt executables described by registry manifests into
//! `~/Packages`, after checking their SHA-256 and smoke-testing them.
//!
//! # Architecture
//!
//! - **Pipeline**: all of the work lives in `cosmic-core`; this crate parses
//!   arguments, initialises logging and renders progress.
//! - **Reporter**: [`ui::ConsoleReporter`] implements the core `Reporter`
//!   trait for the terminal.

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use cosmic_core::manifest::DEFAULT_REGISTRY;

/// Default limit on a single HTTP request, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default limit on a single smoke-test process, in seconds.
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 60;

/// Command-line interface.
#[derive(Debug, Parser)]
#[command(name = "cosmic")]
#[command(author, version, about = "cosmic - install command-line tools into ~/Packages")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download, verify and install a package
    Add {
        /// Package name, or a path to a local manifest (.toml)
        package: String,
        /// Replace an existing installation
        #[arg(long, short = 'f')]
        force: bool,
        /// Registry base URL or directory holding <name>.toml manifests
        #[arg(long, env = "COSMIC_REGISTRY", default_value = DEFAULT_REGISTRY)]
        registry: String,
        /// HTTP request timeout in seconds (0 disables it)
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
        /// Smoke-test timeout per executable in seconds (0 disables it)
        #[arg(long, default_value_t = DEFAULT_TEST_TIMEOUT_SECS)]
        test_timeout: u64,
    },
    /// Compute SHA256 hash of files (for manifest authoring)
    #[command(hide = true)]
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Log filter directive for a `-v` count, used when `RUST_LOG` is unset.
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}
