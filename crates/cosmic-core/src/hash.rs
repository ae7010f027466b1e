//! Integrity validation of downloaded artifacts (SHA-256).

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::AddError;
use crate::package::Package;

/// Compute the lowercase hex SHA-256 of a file by streaming its contents.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Case-insensitive comparison of two hex digests.
pub fn hashes_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

/// Confirm that the artifact at `artifact` hashes to the declared value.
///
/// # Errors
///
/// Returns [`AddError::InvalidPackage`] on a mismatch and [`AddError::Io`] if
/// the artifact cannot be read.
pub fn validate(package: &Package, artifact: &Path) -> Result<(), AddError> {
    let actual = hash_file(artifact)?;
    debug!(expected = %package.hash, %actual, "validating artifact hash");

    if !hashes_match(&package.hash, &actual) {
        return Err(AddError::invalid(
            &package.name,
            format!("hash mismatch: expected {}, got {actual}", package.hash),
        ));
    }
    Ok(())
}
