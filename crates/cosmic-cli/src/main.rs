//! cosmic - a package manager for command-line tools

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cosmic_cli::cmd;
use cosmic_cli::{Cli, Commands, log_level};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Add {
            package,
            force,
            registry,
            timeout,
            test_timeout,
        } => {
            let opts = cmd::add::AddOptions {
                force,
                registry,
                timeout,
                test_timeout,
                quiet: cli.quiet,
            };
            cmd::add::add(&package, &opts).await
        }
        Commands::Hash { files } => cmd::hash::hash(&files),
    }
}
