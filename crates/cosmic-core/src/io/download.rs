//! Artifact downloader.
//!
//! Streams the artifact named by a descriptor to a transient file. A single
//! failed transfer is final: there is no retry and no backoff.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::AddError;
use crate::package::Package;
use crate::paths::filename_from_url;

/// Errors that can occur while fetching an artifact.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The descriptor URL does not parse.
    #[error("Malformed URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something other than 200 OK.
    #[error("Server responded with {0}")]
    Status(StatusCode),

    /// Writing the transient file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Download the artifact of `package` into `dir`, returning the file path.
///
/// The file name is unique per call and prefixed with the package name. The
/// file is left in place for the later stages; nothing cleans it up.
///
/// # Errors
///
/// Returns [`AddError::DownloadFailed`] for a malformed URL, a non-200
/// response, or any transfer or write failure.
pub async fn download(client: &Client, package: &Package, dir: &Path) -> Result<PathBuf, AddError> {
    fetch_to_dir(client, &package.url, &package.name, dir)
        .await
        .map_err(|source| AddError::DownloadFailed {
            url: package.url.clone(),
            source,
        })
}

async fn fetch_to_dir(
    client: &Client,
    url: &str,
    name: &str,
    dir: &Path,
) -> Result<PathBuf, DownloadError> {
    let url = Url::parse(url).map_err(|e| DownloadError::InvalidUrl(format!("{url}: {e}")))?;
    debug!(%url, "downloading artifact");

    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(DownloadError::Status(status));
    }

    tokio::fs::create_dir_all(dir).await?;
    let (std_file, dest) = tempfile::Builder::new()
        .prefix(&format!("{name}-"))
        .suffix(&format!("-{}", filename_from_url(url.path())))
        .tempfile_in(dir)?
        .keep()
        .map_err(|e| e.error)?;

    let mut file = File::from_std(std_file);
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }
    file.flush().await?;

    debug!(path = %dest.display(), bytes = downloaded, "artifact downloaded");
    Ok(dest)
}
