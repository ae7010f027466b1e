//! Hash command

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::ExitCode;

/// Print the SHA256 of each file in `sha256sum` format
pub fn hash(files: &[PathBuf]) -> Result<ExitCode> {
    for file in files {
        let hash = cosmic_core::hash::hash_file(file)
            .with_context(|| format!("Failed to hash {}", file.display()))?;
        println!("{hash} {}", file.display());
    }
    Ok(ExitCode::SUCCESS)
}
