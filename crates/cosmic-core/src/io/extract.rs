//! Archive unpacking
//!
//! Produces a directory of usable files from a downloaded artifact. Raw
//! binaries are used in place; gzip-compressed tarballs are extracted with the
//! system `tar` into a directory scoped to the package name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::error::AddError;
use crate::package::{DistributionType, Package};
use crate::paths::Layout;

/// Errors that can occur while extracting an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The downloaded artifact is no longer on disk.
    #[error("File does not exist at {}", .0.display())]
    FileDoesNotExist(PathBuf),

    /// The unpack directory could not be prepared.
    #[error("Failed to create destination directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying filesystem error.
        source: io::Error,
    },

    /// The extraction tool ran and reported failure.
    #[error("Extraction failed: tar exited with {}", describe_status(*.status))]
    ExtractionFailed {
        /// Exit code of the tool, `None` if it was killed by a signal.
        status: Option<i32>,
    },

    /// The extraction tool could not be found or started.
    #[error("Failed to run extraction process: {0}")]
    ExtractionProcessFailed(String),
}

fn describe_status(status: Option<i32>) -> String {
    status.map_or_else(|| "a signal".to_string(), |code| format!("status {code}"))
}

/// Produce the unpack root for a validated artifact.
///
/// `Binary` artifacts are their own root. `Archive` artifacts are extracted
/// into [`Layout::unpack_dir`], dropping the single top-level directory of
/// bundle archives. `Zip` is rejected without touching the filesystem.
///
/// # Errors
///
/// Returns [`AddError::InvalidPackage`] for `Zip` and [`AddError::Extraction`]
/// when extraction fails.
pub fn unpack(package: &Package, artifact: &Path, layout: &Layout) -> Result<PathBuf, AddError> {
    debug!(distribution = %package.distribution, "unpacking package");
    let root = match package.distribution {
        DistributionType::Binary => artifact.to_path_buf(),
        DistributionType::Archive => unarchive(
            artifact,
            &layout.unpack_dir(&package.name),
            package.is_bundle,
        )?,
        DistributionType::Zip => {
            return Err(AddError::invalid(
                &package.name,
                "zip archives are not supported",
            ));
        }
    };
    debug!(root = %root.display(), "package unpacked");
    Ok(root)
}

/// Extract a `.tar.gz` into `dest`, optionally stripping the first path
/// component of every entry.
///
/// A stale `dest` left by an earlier invocation is removed first.
///
/// # Errors
///
/// See [`ExtractError`].
pub fn unarchive(source: &Path, dest: &Path, strip: bool) -> Result<PathBuf, ExtractError> {
    if !source.is_file() {
        return Err(ExtractError::FileDoesNotExist(source.to_path_buf()));
    }

    prepare_dir(dest).map_err(|source| ExtractError::DirectoryCreationFailed {
        path: dest.to_path_buf(),
        source,
    })?;

    let tar = which::which("tar")
        .map_err(|e| ExtractError::ExtractionProcessFailed(format!("tar not found: {e}")))?;

    let mut cmd = Command::new(tar);
    cmd.arg("-xzf").arg(source).arg("-C").arg(dest);
    if strip {
        cmd.arg("--strip-components=1");
    }

    debug!(?cmd, "running extraction");
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ExtractError::ExtractionProcessFailed(e.to_string()))?;

    if !output.status.success() {
        debug!(
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "tar reported failure"
        );
        return Err(ExtractError::ExtractionFailed {
            status: output.status.code(),
        });
    }

    Ok(dest.to_path_buf())
}

fn prepare_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}
