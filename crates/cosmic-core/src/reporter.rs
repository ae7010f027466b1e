//! Reporter trait for dependency injection
//!
//! This trait allows the pipeline to report progress and status without
//! being coupled to a specific terminal implementation.

use std::fmt;
use std::path::PathBuf;

/// The six pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetching and parsing the manifest.
    Locate,
    /// Fetching the artifact.
    Download,
    /// Checking the artifact hash.
    Validate,
    /// Producing the unpack root.
    Unpack,
    /// Smoke-testing the executables.
    Execute,
    /// Moving artifacts into the packages directory.
    Install,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Locate => "Locating",
            Self::Download => "Downloading",
            Self::Validate => "Validating",
            Self::Unpack => "Unpacking",
            Self::Execute => "Testing",
            Self::Install => "Installing",
        };
        f.write_str(s)
    }
}

/// Sink for user-facing progress of one invocation.
pub trait Reporter: Send + Sync {
    /// A stage has started for `name`.
    fn stage(&self, name: &str, stage: Stage);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Marks the package as installed with its entry points.
    fn done(&self, name: &str, version: &str, entry_points: &[PathBuf]);

    /// Marks the package operation as failed with a specific reason.
    fn failed(&self, name: &str, reason: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn stage(&self, name: &str, stage: Stage) {
        (**self).stage(name, stage);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn done(&self, name: &str, version: &str, entry_points: &[PathBuf]) {
        (**self).done(name, version, entry_points);
    }
    fn failed(&self, name: &str, reason: &str) {
        (**self).failed(name, reason);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn stage(&self, _: &str, _: Stage) {}
    fn info(&self, _: &str) {}
    fn done(&self, _: &str, _: &str, _: &[PathBuf]) {}
    fn failed(&self, _: &str, _: &str) {}
}
