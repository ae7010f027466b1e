//! Add command

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};
use cosmic_core::{ConflictPolicy, Context, Layout, Options, Registry};

use crate::ui::ConsoleReporter;

/// Settings for a single `cosmic add`.
#[derive(Debug, Clone)]
pub struct AddOptions {
    /// Replace an existing installation.
    pub force: bool,
    /// Registry base URL or manifest directory.
    pub registry: String,
    /// HTTP timeout in seconds, 0 for none.
    pub timeout: u64,
    /// Smoke-test timeout in seconds, 0 for none.
    pub test_timeout: u64,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Locate, download, verify and install one package
///
/// Pipeline failures are rendered by the reporter and turned into a failing
/// exit code; setup errors are returned.
pub async fn add(package: &str, opts: &AddOptions) -> Result<ExitCode> {
    let registry = Registry::parse(&opts.registry).context("Invalid registry")?;
    let layout =
        Layout::from_env().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    let client =
        Context::build_client(seconds(opts.timeout)).context("Failed to build HTTP client")?;

    let options = Options {
        conflict: if opts.force {
            ConflictPolicy::Replace
        } else {
            ConflictPolicy::Refuse
        },
        test_timeout: seconds(opts.test_timeout),
    };
    let reporter = Arc::new(ConsoleReporter::new(opts.quiet));
    let ctx = Context::new(client, registry, layout, reporter, options);
    tracing::debug!(?ctx, "starting add");

    match cosmic_core::add(&ctx, package).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::debug!(error = ?err, "add failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then_some(Duration::from_secs(secs))
}
