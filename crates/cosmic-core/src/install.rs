//! Installer
//!
//! Moves verified executables into the packages directory. Non-bundle
//! packages become a single file named after the package; bundles keep their
//! whole unpacked tree under `_<name>` and expose each executable through a
//! top-level symlink.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AddError;
use crate::exec::set_executable;
use crate::package::{Package, entry_basename};
use crate::paths::Layout;

/// What to do when an install destination is already occupied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Fail with [`AddError::DestinationExists`].
    #[default]
    Refuse,
    /// Remove whatever is there and install over it.
    Replace,
}

/// Install the package unpacked at `root`, returning its entry points.
///
/// # Errors
///
/// - [`AddError::MissingExecutablePath`] if there is no usable executable
///   entry (none at all, or a bundle entry without a basename).
/// - [`AddError::DestinationExists`] if a destination is occupied under
///   [`ConflictPolicy::Refuse`].
/// - [`AddError::NotExecutable`] if an entry point does not resolve to an
///   executable file afterwards.
pub fn install(
    package: &Package,
    root: &Path,
    layout: &Layout,
    policy: ConflictPolicy,
) -> Result<Vec<PathBuf>, AddError> {
    fs::create_dir_all(&layout.packages_dir)?;

    let entry_points = if package.is_bundle {
        install_bundle(package, root, layout, policy)?
    } else {
        vec![install_single(package, root, layout, policy)?]
    };

    for entry_point in &entry_points {
        verify_installed(entry_point)?;
    }
    debug!(name = %package.name, count = entry_points.len(), "package installed");
    Ok(entry_points)
}

fn install_single(
    package: &Package,
    root: &Path,
    layout: &Layout,
    policy: ConflictPolicy,
) -> Result<PathBuf, AddError> {
    let entry = package
        .executable_paths
        .first()
        .ok_or_else(|| AddError::MissingExecutablePath(package.name.clone()))?;

    let source = package.executable_location(root, entry);
    let dest = layout.executable_path(&package.name);
    claim(&dest, policy)?;

    debug!(from = %source.display(), to = %dest.display(), "moving executable");
    move_path(&source, &dest)?;
    set_executable(&dest)?;
    Ok(dest)
}

fn install_bundle(
    package: &Package,
    root: &Path,
    layout: &Layout,
    policy: ConflictPolicy,
) -> Result<Vec<PathBuf>, AddError> {
    let mut links = Vec::with_capacity(package.executable_paths.len());
    for entry in &package.executable_paths {
        let basename =
            entry_basename(entry).ok_or_else(|| AddError::MissingExecutablePath(entry.clone()))?;
        let link = layout.entry_point(basename);
        if links.iter().any(|(_, seen)| *seen == link) {
            return Err(AddError::DestinationExists(link));
        }
        links.push((entry.trim_start_matches('/'), link));
    }
    if links.is_empty() {
        return Err(AddError::MissingExecutablePath(package.name.clone()));
    }

    let bundle_dir = layout.bundle_dir(&package.name);
    claim(&bundle_dir, policy)?;
    for (_, link) in &links {
        claim(link, policy)?;
    }

    debug!(from = %root.display(), to = %bundle_dir.display(), "moving bundle");
    move_path(root, &bundle_dir)?;

    let mut entry_points = Vec::with_capacity(links.len());
    for (relative, link) in links {
        let target = bundle_dir.join(relative);
        if target.is_file() {
            set_executable(&target)?;
        }
        debug!(link = %link.display(), target = %target.display(), "linking entry point");
        symlink(&target, &link)?;
        entry_points.push(link);
    }
    Ok(entry_points)
}

/// Make `path` available as a destination according to `policy`.
fn claim(path: &Path, policy: ConflictPolicy) -> Result<(), AddError> {
    if !occupied(path) {
        return Ok(());
    }
    match policy {
        ConflictPolicy::Refuse => Err(AddError::DestinationExists(path.to_path_buf())),
        ConflictPolicy::Replace => {
            debug!(path = %path.display(), "replacing existing destination");
            remove_path(path)?;
            Ok(())
        }
    }
}

fn occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

fn remove_path(path: &Path) -> io::Result<()> {
    let meta = path.symlink_metadata()?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Rename `from` to `to`, copying and removing when they are on different
/// filesystems.
///
/// # Errors
///
/// Returns an I/O error if neither the rename nor the copy succeeds.
pub fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), "cross-device move, copying instead");
            copy_and_remove(from, to)
        }
        other => other,
    }
}

fn copy_and_remove(from: &Path, to: &Path) -> io::Result<()> {
    let result = if from.is_dir() {
        let options = fs_extra::dir::CopyOptions::new().copy_inside(true);
        fs_extra::dir::move_dir(from, to, &options).map(|_| ())
    } else {
        let options = fs_extra::file::CopyOptions::new();
        fs_extra::file::move_file(from, to, &options).map(|_| ())
    };
    result.map_err(|e| io::Error::other(e.to_string()))
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

/// Check that `path` resolves (through symlinks) to an executable file.
///
/// # Errors
///
/// Returns [`AddError::NotExecutable`] otherwise.
pub fn verify_installed(path: &Path) -> Result<(), AddError> {
    let not_executable = || AddError::NotExecutable(path.to_path_buf());
    let meta = fs::metadata(path).map_err(|_| not_executable())?;
    if !meta.is_file() {
        return Err(not_executable());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(not_executable());
        }
    }
    Ok(())
}
