use super::fetcher::DownloadError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure installing one module; the rest of the batch carries on
#[derive(Debug, Error)]
pub enum InstallError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Module already exists: {}", .path.display())]
    ModuleAlreadyExists { path: PathBuf },

    #[error("Failed to extract archive into {}: {reason}", .path.display())]
    Extraction { path: PathBuf, reason: String },

    #[error("Failed to rewrite {}: {reason}", .path.display())]
    PlaceholderRewrite { path: PathBuf, reason: String },
}
