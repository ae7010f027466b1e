//! TOML package descriptor parsing
//!
//! A manifest describes exactly one package: where its artifact lives, the
//! SHA-256 it must hash to, how it is packaged and which files inside it are
//! the executables to smoke-test and install.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or parsing a package descriptor.
#[derive(Error, Debug)]
pub enum PackageError {
    /// An I/O error occurred while reading a manifest file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be deserialized into a descriptor.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The descriptor parsed but violates a field constraint.
    #[error("Invalid field `{field}`: {reason}")]
    Invalid {
        /// Name of the offending manifest field.
        field: &'static str,
        /// Human-readable explanation.
        reason: String,
    },
}

/// Declared packaging format of a downloadable artifact.
///
/// Selects the unpack strategy; every consumer matches on it exhaustively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DistributionType {
    /// The artifact is the executable itself.
    Binary,
    /// Gzip-compressed tar archive.
    Archive,
    /// Zip archive (declared but not installable).
    Zip,
}

impl fmt::Display for DistributionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Binary => "Binary",
            Self::Archive => "Archive",
            Self::Zip => "Zip",
        };
        f.write_str(s)
    }
}

/// The resolved descriptor of a single package.
///
/// Created once by the manifest locator and passed read-only through every
/// later stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Package identifier, used for unpack and install paths.
    pub name: String,
    /// Location of the distributable artifact.
    pub url: String,
    /// Package URL (`pkg:golang/...`) of the upstream project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
    /// Informational version string.
    pub version: String,
    /// Expected SHA-256 of the artifact, hex in either case.
    pub hash: String,
    /// Packaging format of the artifact.
    #[serde(rename = "type")]
    pub distribution: DistributionType,
    /// Executables relative to the unpack root, in smoke-test order.
    pub executable_paths: Vec<String>,
    /// Arguments passed to every executable during the smoke test.
    #[serde(default)]
    pub test_args: Vec<String>,
    /// Install as a directory with symlinked entry points.
    #[serde(default)]
    pub is_bundle: bool,
}

impl Package {
    /// Parse and validate a descriptor from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Parse`] for malformed TOML and
    /// [`PackageError::Invalid`] when a field constraint is violated.
    pub fn parse(content: &str) -> Result<Self, PackageError> {
        let package: Self = toml::from_str(content)?;
        package.validate()?;
        Ok(package)
    }

    /// Load and validate a descriptor from a local `.toml` file.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`Package::parse`].
    pub fn from_file(path: &Path) -> Result<Self, PackageError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Check the field constraints the rest of the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), PackageError> {
        if !is_valid_name(&self.name) {
            return Err(invalid("name", format!("'{}' is not a valid package name", self.name)));
        }
        if self.url.trim().is_empty() {
            return Err(invalid("url", "must not be empty"));
        }
        let hash = self.hash.trim();
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid(
                "hash",
                format!("expected 64 hex characters, got '{}'", self.hash),
            ));
        }
        if self.executable_paths.is_empty() {
            return Err(invalid("executablePaths", "must list at least one executable"));
        }
        Ok(())
    }

    /// Absolute location of `entry` once the artifact is unpacked at `root`.
    pub fn executable_location(&self, root: &Path, entry: &str) -> PathBuf {
        executable_location(root, self.distribution, entry)
    }
}

/// Resolve an executable path entry against an unpack root.
///
/// Leading slashes are ignored. An empty entry names the root itself, which
/// is how a raw binary refers to the downloaded file. Other entries of a
/// `Binary` package resolve next to the downloaded file.
pub fn executable_location(root: &Path, distribution: DistributionType, entry: &str) -> PathBuf {
    let relative = entry.trim_start_matches('/');
    if relative.is_empty() {
        return root.to_path_buf();
    }
    match distribution {
        DistributionType::Binary => root.parent().unwrap_or(root).join(relative),
        DistributionType::Archive | DistributionType::Zip => root.join(relative),
    }
}

/// The final path component of an executable entry, used as its link name.
pub fn entry_basename(entry: &str) -> Option<&str> {
    Path::new(entry.trim_start_matches('/'))
        .file_name()
        .and_then(std::ffi::OsStr::to_str)
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_whitespace)
}

fn invalid(field: &'static str, reason: impl Into<String>) -> PackageError {
    PackageError::Invalid {
        field,
        reason: reason.into(),
    }
}
