//! Add Flow Typestate Pattern
//!
//! Models the add pipeline as a series of explicit state transitions:
//!
//! ```text
//! LocatedPackage --[download()]--> DownloadedPackage
//!   --[validate()]--> ValidatedPackage --[unpack()]--> UnpackedPackage
//!   --[verify()]--> VerifiedPackage --[install()]--> InstalledPackage
//! ```
//!
//! States can only be produced by the transition before them, so an artifact
//! cannot be unpacked before its hash is checked and nothing is installed
//! that has not passed its smoke test.
//!
//! # Usage
//!
//! ```ignore
//! let located = LocatedPackage::locate(&client, &registry, "k9s").await?;
//! let downloaded = located.download(&client, &layout).await?;
//! let validated = downloaded.validate()?;
//! let unpacked = validated.unpack(&layout)?;
//! let verified = unpacked.verify(Some(Duration::from_secs(60)))?;
//! let installed = verified.install(&layout, ConflictPolicy::Refuse)?;
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::error::AddError;
use crate::install::ConflictPolicy;
use crate::io::{download, extract};
use crate::manifest::Registry;
use crate::package::Package;
use crate::paths::Layout;
use crate::reporter::{Reporter, Stage};
use crate::{exec, hash, install, manifest};

/// Tunables of a single invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Behaviour when an install destination already exists.
    pub conflict: ConflictPolicy,
    /// Upper bound on each smoke-test process, `None` to wait indefinitely.
    pub test_timeout: Option<Duration>,
}

/// Groups the state shared by every stage of one invocation.
#[derive(Clone)]
pub struct Context {
    /// HTTP client used for both the manifest and the artifact.
    pub client: Client,
    /// Where manifests are looked up.
    pub registry: Registry,
    /// Install and work directories.
    pub layout: Layout,
    /// Sink for user-facing progress.
    pub reporter: Arc<dyn Reporter>,
    /// Invocation tunables.
    pub options: Options,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("registry", &self.registry)
            .field("layout", &self.layout)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Bundle the invocation state.
    pub fn new(
        client: Client,
        registry: Registry,
        layout: Layout,
        reporter: Arc<dyn Reporter>,
        options: Options,
    ) -> Self {
        Self {
            client,
            registry,
            layout,
            reporter,
            options,
        }
    }

    /// Build the HTTP client shared by the network stages.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn build_client(timeout: Option<Duration>) -> reqwest::Result<Client> {
        let mut builder = Client::builder().user_agent(crate::USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

/// State 1: a descriptor has been resolved from the registry.
///
/// # Transitions
///
/// - [`download()`](Self::download) -> [`DownloadedPackage`]
#[derive(Debug)]
pub struct LocatedPackage {
    package: Package,
}

/// State 2: the artifact is on disk but not yet trusted.
///
/// # Transitions
///
/// - [`validate()`](Self::validate) -> [`ValidatedPackage`]
#[derive(Debug)]
pub struct DownloadedPackage {
    package: Package,
    artifact: PathBuf,
}

/// State 3: the artifact hashes to the declared value.
///
/// # Transitions
///
/// - [`unpack()`](Self::unpack) -> [`UnpackedPackage`]
#[derive(Debug)]
pub struct ValidatedPackage {
    package: Package,
    artifact: PathBuf,
}

/// State 4: the unpack root holds the files to test and install.
///
/// # Transitions
///
/// - [`verify()`](Self::verify) -> [`VerifiedPackage`]
#[derive(Debug)]
pub struct UnpackedPackage {
    package: Package,
    root: PathBuf,
}

/// State 5: every executable passed its smoke test.
///
/// # Transitions
///
/// - [`install()`](Self::install) -> [`InstalledPackage`]
#[derive(Debug)]
pub struct VerifiedPackage {
    package: Package,
    root: PathBuf,
}

/// Final state: executables are in the packages directory.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    /// The installed descriptor.
    pub package: Package,
    /// Installed executables or entry-point symlinks, in declaration order.
    pub entry_points: Vec<PathBuf>,
}

impl LocatedPackage {
    /// Resolve `name` against `registry`.
    ///
    /// # Errors
    ///
    /// See [`manifest::locate`].
    pub async fn locate(
        client: &Client,
        registry: &Registry,
        name: &str,
    ) -> Result<Self, AddError> {
        let package = manifest::locate(client, registry, name).await?;
        Ok(Self { package })
    }

    /// The resolved descriptor.
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Fetch the artifact into the layout's downloads directory.
    ///
    /// # Errors
    ///
    /// See [`download::download`].
    pub async fn download(
        self,
        client: &Client,
        layout: &Layout,
    ) -> Result<DownloadedPackage, AddError> {
        let artifact = download::download(client, &self.package, &layout.downloads_dir()).await?;
        Ok(DownloadedPackage {
            package: self.package,
            artifact,
        })
    }
}

impl DownloadedPackage {
    /// Path of the downloaded artifact.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Check the artifact against the declared hash.
    ///
    /// # Errors
    ///
    /// See [`hash::validate`].
    pub fn validate(self) -> Result<ValidatedPackage, AddError> {
        hash::validate(&self.package, &self.artifact)?;
        Ok(ValidatedPackage {
            package: self.package,
            artifact: self.artifact,
        })
    }
}

impl ValidatedPackage {
    /// Produce the unpack root for the validated artifact.
    ///
    /// # Errors
    ///
    /// See [`extract::unpack`].
    pub fn unpack(self, layout: &Layout) -> Result<UnpackedPackage, AddError> {
        let root = extract::unpack(&self.package, &self.artifact, layout)?;
        Ok(UnpackedPackage {
            package: self.package,
            root,
        })
    }
}

impl UnpackedPackage {
    /// The unpack root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Smoke-test every declared executable.
    ///
    /// # Errors
    ///
    /// See [`exec::execute`].
    pub fn verify(self, timeout: Option<Duration>) -> Result<VerifiedPackage, AddError> {
        exec::execute(&self.package, &self.root, timeout)?;
        Ok(VerifiedPackage {
            package: self.package,
            root: self.root,
        })
    }
}

impl VerifiedPackage {
    /// Move the executables into place.
    ///
    /// # Errors
    ///
    /// See [`install::install`].
    pub fn install(
        self,
        layout: &Layout,
        policy: ConflictPolicy,
    ) -> Result<InstalledPackage, AddError> {
        let entry_points = install::install(&self.package, &self.root, layout, policy)?;
        Ok(InstalledPackage {
            package: self.package,
            entry_points,
        })
    }
}

/// Run the whole pipeline for `name`, stopping at the first failure.
///
/// Progress and the final outcome are reported through `ctx.reporter`.
///
/// # Errors
///
/// Returns the error of the first stage that failed.
pub async fn add(ctx: &Context, name: &str) -> Result<InstalledPackage, AddError> {
    match run(ctx, name).await {
        Ok(installed) => {
            ctx.reporter.done(
                &installed.package.name,
                &installed.package.version,
                &installed.entry_points,
            );
            Ok(installed)
        }
        Err(err) => {
            ctx.reporter.failed(name, &err.to_string());
            Err(err)
        }
    }
}

async fn run(ctx: &Context, name: &str) -> Result<InstalledPackage, AddError> {
    let reporter: &dyn Reporter = ctx.reporter.as_ref();

    enter(reporter, name, Stage::Locate);
    let located = LocatedPackage::locate(&ctx.client, &ctx.registry, name).await?;
    let name = located.package().name.clone();
    reporter.info(&format!("{name} {}", located.package().version));

    enter(reporter, &name, Stage::Download);
    let downloaded = located.download(&ctx.client, &ctx.layout).await?;

    enter(reporter, &name, Stage::Validate);
    let validated = blocking(move || downloaded.validate()).await?;

    enter(reporter, &name, Stage::Unpack);
    let layout = ctx.layout.clone();
    let unpacked = blocking(move || validated.unpack(&layout)).await?;

    enter(reporter, &name, Stage::Execute);
    let timeout = ctx.options.test_timeout;
    let verified = blocking(move || unpacked.verify(timeout)).await?;

    enter(reporter, &name, Stage::Install);
    let layout = ctx.layout.clone();
    let policy = ctx.options.conflict;
    blocking(move || verified.install(&layout, policy)).await
}

fn enter(reporter: &dyn Reporter, name: &str, stage: Stage) {
    info!(package = name, %stage, "stage started");
    reporter.stage(name, stage);
}

async fn blocking<T, F>(f: F) -> Result<T, AddError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AddError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AddError::Io(io::Error::other(e)))?
}
