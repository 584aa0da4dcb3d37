//! Registry error taxonomy

use thiserror::Error;

/// How many available versions a `VersionNotFound` error lists
pub const VERSION_SAMPLE_LIMIT: usize = 10;

/// Errors raised while talking to the release registry
///
/// Transport failures (`Timeout`, `Connect`, `Transport`) are kept apart from
/// HTTP status failures so callers can treat them as transient.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Request to {url} timed out after {seconds} seconds")]
    Timeout { url: String, seconds: u64 },

    #[error("Failed to connect to {url}. Check your internet connection.")]
    Connect { url: String },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },

    #[error("URL cannot have path segments: {url}")]
    InvalidUrl { url: String },

    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("API rate limit exceeded or access forbidden: {url}")]
    Forbidden { url: String },

    #[error("Registry server error: HTTP {status} from {url}")]
    Server { url: String, status: u16 },

    #[error("Registry request to {url} failed with HTTP {status}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid registry response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("No releases published for {repo}")]
    NoReleases { repo: String },

    #[error("Tag '{tag}' has no resolvable commit")]
    UnresolvedRef { tag: String },

    #[error("Version '{requested}' not found. {}", format_sample(.available, .truncated))]
    VersionNotFound {
        requested: String,
        available: Vec<String>,
        truncated: bool,
    },
}

impl RegistryError {
    /// Network level failure that may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistryError::Timeout { .. }
                | RegistryError::Connect { .. }
                | RegistryError::Transport { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }

    /// Build a `VersionNotFound` error carrying a capped sample of known versions
    pub fn version_not_found(requested: &str, versions: &[String]) -> Self {
        RegistryError::VersionNotFound {
            requested: requested.to_string(),
            available: versions.iter().take(VERSION_SAMPLE_LIMIT).cloned().collect(),
            truncated: versions.len() > VERSION_SAMPLE_LIMIT,
        }
    }
}

fn format_sample(available: &[String], truncated: &bool) -> String {
    if available.is_empty() {
        return "No versions are available.".to_string();
    }
    format!(
        "Available versions: {}{}",
        available.join(", "),
        if *truncated { "..." } else { "" }
    )
}
