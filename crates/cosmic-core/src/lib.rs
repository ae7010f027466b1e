//! cosmic-core - acquisition and installation pipeline for cosmic
//!
//! Turns a package name into installed executables in six strictly ordered
//! stages:
//!
//! ```text
//! locate -> download -> validate -> unpack -> execute -> install
//! ```
//!
//! Each stage lives in its own module and returns its own error kind, all
//! aggregated by [`AddError`]. The [`flow`] module chains them as typestate
//! transitions so an artifact cannot be unpacked before its hash is checked.
//!
//! # Directory Layout
//!
//! ```text
//! ~/Packages/
//! ├── k9s          # non-bundle: the executable itself
//! ├── _go/         # bundle storage (underscore-prefixed)
//! ├── go           # symlink -> _go/bin/go
//! └── gofmt        # symlink -> _go/bin/gofmt
//! ```

pub mod error;
pub mod exec;
pub mod flow;
pub mod hash;
pub mod install;
pub mod io;
pub mod manifest;
pub mod package;
pub mod paths;
pub mod reporter;

pub use error::AddError;
pub use flow::{Context, InstalledPackage, Options, add};
pub use install::ConflictPolicy;
pub use manifest::Registry;
pub use package::{DistributionType, Package};
pub use paths::Layout;
pub use reporter::{NullReporter, Reporter, Stage};

/// User Agent string for outbound requests
pub const USER_AGENT: &str = concat!("cosmic/", env!("CARGO_PKG_VERSION"));
