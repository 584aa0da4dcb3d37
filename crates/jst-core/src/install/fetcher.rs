//! Archive download to scratch storage
//!
//! The response body is streamed chunk by chunk to disk. Every download gets its
//! own scratch directory and a unique file name, and both disappear when the
//! returned [`ArchiveHandle`] is dropped.

use crate::product::ProductConfig;
use crate::registry::REQUEST_TIMEOUT;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to download {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Download of {url} timed out after {seconds} seconds")]
    Timeout { url: String, seconds: u64 },

    #[error("Failed to download {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to write archive {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A downloaded archive that has not been extracted yet
///
/// Owns its scratch directory; dropping the handle deletes the archive.
#[derive(Debug)]
pub struct ArchiveHandle {
    path: PathBuf,
    size: u64,
    _scratch: TempDir,
}

impl ArchiveHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Streams remote archives to local scratch files
pub struct ArchiveFetcher {
    client: reqwest::Client,
    scratch_root: PathBuf,
}

impl ArchiveFetcher {
    /// Create a fetcher with a custom user agent, using the system temp directory
    pub fn new(user_agent: &str) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(REQUEST_TIMEOUT)
            .read_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| DownloadError::Client { source })?;
        Ok(Self {
            client,
            scratch_root: std::env::temp_dir(),
        })
    }

    pub fn from_config<C: ProductConfig>(config: &C) -> Result<Self, DownloadError> {
        Self::new(config.user_agent())
    }

    /// Place scratch directories below `root` instead of the system temp directory
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    /// Download `url` into a fresh scratch file
    pub async fn fetch(&self, url: &Url) -> Result<ArchiveHandle, DownloadError> {
        let scratch = tempfile::Builder::new()
            .prefix("jst-")
            .tempdir_in(&self.scratch_root)
            .map_err(|source| DownloadError::Io {
                path: self.scratch_root.clone(),
                source,
            })?;
        let path = scratch.path().join(format!("{}.zip", Uuid::new_v4()));

        match self.download_to(url, &path).await {
            Ok(size) => {
                info!(%url, size, "Downloaded archive");
                Ok(ArchiveHandle {
                    path,
                    size,
                    _scratch: scratch,
                })
            }
            Err(e) => {
                let _ = fs::remove_file(&path).await;
                Err(e)
            }
        }
    }

    async fn download_to(&self, url: &Url, path: &Path) -> Result<u64, DownloadError> {
        debug!(%url, path = %path.display(), "Downloading archive");
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        if !response.status().is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let io_error = |source| DownloadError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = fs::File::create(path).await.map_err(io_error)?;
        let mut written: u64 = 0;

        while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(url, e))? {
            file.write_all(&chunk).await.map_err(io_error)?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(io_error)?;
        Ok(written)
    }
}

fn transport_error(url: &Url, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::Timeout {
            url: url.to_string(),
            seconds: REQUEST_TIMEOUT.as_secs(),
        }
    } else {
        DownloadError::Transport {
            url: url.to_string(),
            source: error,
        }
    }
}
