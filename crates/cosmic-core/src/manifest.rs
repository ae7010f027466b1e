//! Manifest locator
//!
//! Turns a package name into a [`Package`] by reading `<registry>/<name>.toml`
//! from either a remote registry or a local directory. A path to an existing
//! `.toml` file is loaded directly, which is how package authors try out a
//! manifest before publishing it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::debug;

use crate::error::AddError;
use crate::package::{Package, PackageError};

/// File extension of registry manifests.
pub const MANIFEST_EXTENSION: &str = "toml";

/// Registry consulted when none is configured.
pub const DEFAULT_REGISTRY: &str = "https://raw.githubusercontent.com/willswire/cosmic-pkgs/main";

/// Errors that can occur while locating a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest location could not be derived.
    #[error("Invalid manifest location: {0}")]
    InvalidLocation(String),

    /// Transport-level failure talking to the registry.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The registry answered with something other than 200 OK.
    #[error("Registry responded with {0}")]
    Status(StatusCode),

    /// No manifest exists in a directory registry.
    #[error("No manifest at {}", .0.display())]
    Missing(PathBuf),

    /// The manifest could not be read or parsed.
    #[error(transparent)]
    Package(#[from] PackageError),
}

/// Where manifests are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registry {
    /// An HTTP(S) base URL.
    Remote(Url),
    /// A local directory of manifests.
    Directory(PathBuf),
}

impl Registry {
    /// Parse a registry from a base URL or a directory path.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidLocation`] for an unparsable URL.
    pub fn parse(s: &str) -> Result<Self, ManifestError> {
        if s.starts_with("http://") || s.starts_with("https://") {
            let url =
                Url::parse(s).map_err(|e| ManifestError::InvalidLocation(format!("{s}: {e}")))?;
            Ok(Self::Remote(url))
        } else {
            Ok(Self::Directory(PathBuf::from(s)))
        }
    }

    /// Manifest URL for `name` in a remote registry.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidLocation`] if the registry is a
    /// directory or the joined URL does not parse.
    pub fn manifest_url(&self, name: &str) -> Result<Url, ManifestError> {
        match self {
            Self::Remote(base) => {
                let url = format!(
                    "{}/{name}.{MANIFEST_EXTENSION}",
                    base.as_str().trim_end_matches('/')
                );
                Url::parse(&url).map_err(|e| ManifestError::InvalidLocation(format!("{url}: {e}")))
            }
            Self::Directory(dir) => Err(ManifestError::InvalidLocation(format!(
                "{} is a directory registry",
                dir.display()
            ))),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Url::parse(DEFAULT_REGISTRY).map_or_else(
            |_| Self::Directory(PathBuf::from(DEFAULT_REGISTRY)),
            Self::Remote,
        )
    }
}

impl FromStr for Registry {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Resolve `name` to a validated package descriptor.
///
/// # Errors
///
/// Returns [`AddError::PackageNotFound`] if the manifest is absent, the
/// registry does not answer 200 OK, or the content is not a valid descriptor.
pub async fn locate(client: &Client, registry: &Registry, name: &str) -> Result<Package, AddError> {
    let not_found = |source: ManifestError| AddError::PackageNotFound {
        name: name.to_string(),
        source,
    };

    let local = Path::new(name);
    let package = if is_manifest_file(local) {
        debug!(path = %local.display(), "loading manifest from file");
        Package::from_file(local).map_err(|e| not_found(e.into()))?
    } else {
        check_name(name).map_err(not_found)?;
        match registry {
            Registry::Remote(_) => fetch_remote(client, registry, name).await,
            Registry::Directory(dir) => load_from_dir(dir, name),
        }
        .map_err(not_found)?
    };

    debug!(
        name = %package.name,
        version = %package.version,
        distribution = %package.distribution,
        "located package"
    );
    Ok(package)
}

async fn fetch_remote(
    client: &Client,
    registry: &Registry,
    name: &str,
) -> Result<Package, ManifestError> {
    let url = registry.manifest_url(name)?;
    debug!(%url, "fetching manifest");

    let response = client.get(url).send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        return Err(ManifestError::Status(status));
    }

    let body = response.text().await?;
    Ok(Package::parse(&body)?)
}

fn load_from_dir(dir: &Path, name: &str) -> Result<Package, ManifestError> {
    let path = dir.join(format!("{name}.{MANIFEST_EXTENSION}"));
    if !path.is_file() {
        return Err(ManifestError::Missing(path));
    }
    Ok(Package::from_file(&path)?)
}

fn is_manifest_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == MANIFEST_EXTENSION) && path.is_file()
}

fn check_name(name: &str) -> Result<(), ManifestError> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ManifestError::InvalidLocation(format!(
            "'{name}' is not a package name"
        )));
    }
    Ok(())
}
