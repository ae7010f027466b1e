//! Filesystem layout: install directory and transient work directories.

use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Filesystem locations used by one invocation.
///
/// Constructed explicitly and passed down the pipeline so tests can point
/// every stage at a scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Where executables, bundles and entry-point symlinks are installed.
    pub packages_dir: PathBuf,
    /// Root for transient downloads and unpack directories.
    pub tmp_dir: PathBuf,
}

impl Layout {
    /// Build a layout from explicit directories.
    pub fn new(packages_dir: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
            tmp_dir: tmp_dir.into(),
        }
    }

    /// Resolve the layout from the environment, or None if the user's home
    /// cannot be resolved.
    ///
    /// `COSMIC_PACKAGES_DIR` overrides `~/Packages` and `COSMIC_TMPDIR`
    /// overrides `<system temp>/cosmic`.
    pub fn from_env() -> Option<Self> {
        let packages_dir = match std::env::var_os("COSMIC_PACKAGES_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => home_dir()?.join("Packages"),
        };
        let tmp_dir = std::env::var_os("COSMIC_TMPDIR")
            .map_or_else(|| std::env::temp_dir().join("cosmic"), PathBuf::from);
        Some(Self::new(packages_dir, tmp_dir))
    }

    /// Downloaded artifacts: `<tmp>/downloads`
    pub fn downloads_dir(&self) -> PathBuf {
        self.tmp_dir.join("downloads")
    }

    /// Unpack root for an archive, scoped by package name: `<tmp>/unpack/<name>`
    pub fn unpack_dir(&self, name: &str) -> PathBuf {
        self.tmp_dir.join("unpack").join(name)
    }

    /// Install target of a non-bundle package: `<packages>/<name>`
    pub fn executable_path(&self, name: &str) -> PathBuf {
        self.packages_dir.join(name)
    }

    /// Storage directory of a bundle: `<packages>/_<name>`
    pub fn bundle_dir(&self, name: &str) -> PathBuf {
        self.packages_dir.join(format!("_{name}"))
    }

    /// Top-level entry point for an executable basename: `<packages>/<basename>`
    pub fn entry_point(&self, basename: impl AsRef<Path>) -> PathBuf {
        self.packages_dir.join(basename)
    }
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}
