//! Domain-specific errors for the add pipeline
//!
//! Every stage fails with its own variant; nothing is retried and the first
//! error ends the invocation.

use std::path::PathBuf;

use thiserror::Error;

use crate::io::download::DownloadError;
use crate::io::extract::ExtractError;
use crate::manifest::ManifestError;

/// Error returned by any stage of the add pipeline.
#[derive(Error, Debug)]
pub enum AddError {
    /// The manifest could not be fetched or parsed into a descriptor.
    #[error("Package '{name}' not found: {source}")]
    PackageNotFound {
        /// Requested package name.
        name: String,
        /// Underlying lookup failure.
        source: ManifestError,
    },

    /// The artifact URL was malformed or the transfer did not succeed.
    #[error("Download failed for {url}: {source}")]
    DownloadFailed {
        /// Artifact URL from the descriptor.
        url: String,
        /// Underlying transfer failure.
        source: DownloadError,
    },

    /// Hash mismatch or a distribution type that cannot be unpacked.
    #[error("Invalid package '{name}': {reason}")]
    InvalidPackage {
        /// Package name from the descriptor.
        name: String,
        /// Why the package was rejected.
        reason: String,
    },

    /// Archive extraction failed.
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    /// A smoke-test executable failed to spawn or exited unsuccessfully.
    #[error("Smoke test of {} failed: {reason}", .path.display())]
    ExecuteProcessFailed {
        /// Executable that failed.
        path: PathBuf,
        /// Exit status or spawn error.
        reason: String,
    },

    /// An executable path entry was missing or had no usable basename.
    #[error("Missing executable path: {0}")]
    MissingExecutablePath(String),

    /// The install destination is already occupied.
    #[error("{} already exists (use --force to replace it)", .0.display())]
    DestinationExists(PathBuf),

    /// An installed entry point is missing or not executable.
    #[error("{} is not an installed executable", .0.display())]
    NotExecutable(PathBuf),

    /// Filesystem error outside of a more specific stage error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AddError {
    /// Shorthand for [`AddError::InvalidPackage`].
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPackage {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
