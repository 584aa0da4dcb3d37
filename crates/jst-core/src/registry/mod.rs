//! Release registry client
//!
//! Talks to the forge's REST API for one repository:
//! - release listing, the "latest" pointer and per-tag release details
//! - version validation against the published tag list
//! - tag to commit resolution
//! - filtered branch listing
//!
//! Every request carries a fixed timeout. Timeouts and connection failures are
//! reported as their own error kinds, apart from HTTP status failures.

pub mod error;
pub mod types;

use crate::product::{ProductConfig, RegistryEndpoints};
use anyhow::Result;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub use error::{RegistryError, VERSION_SAMPLE_LIMIT};
pub use types::{Branch, BranchFilter, GitRefResponse, Release};

/// Timeout applied to every registry and archive request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Items requested per page from list endpoints
pub const PAGE_SIZE: usize = 100;

const MAX_PAGES: usize = 100;

const GITHUB_JSON: &str = "application/vnd.github+json";

/// Client for one repository of the release registry
pub struct RegistryClient {
    client: reqwest::Client,
    endpoints: RegistryEndpoints,
    owner: String,
    repo: String,
    timeout: Duration,
}

impl RegistryClient {
    /// Create a client with the default request timeout
    pub fn new(
        endpoints: RegistryEndpoints,
        owner: &str,
        repo: &str,
        user_agent: &str,
    ) -> Result<Self, RegistryError> {
        Self::with_timeout(endpoints, owner, repo, user_agent, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        endpoints: RegistryEndpoints,
        owner: &str,
        repo: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|source| RegistryError::Client { source })?;
        Ok(Self {
            client,
            endpoints,
            owner: owner.to_string(),
            repo: repo.to_string(),
            timeout,
        })
    }

    /// Create a client for one of the product's repositories
    pub fn from_config<C: ProductConfig>(config: &C, repo: &str) -> Result<Self> {
        let endpoints = RegistryEndpoints::from_config(config)?;
        Ok(Self::new(
            endpoints,
            config.registry_owner(),
            repo,
            config.user_agent(),
        )?)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Web URL of the repository on the archive host
    pub fn repository_url(&self) -> Result<Url, RegistryError> {
        build_url(&self.endpoints.archive, &[&self.owner, &self.repo])
    }

    /// Download URL of the zip archive for a tag
    pub fn archive_url(&self, version: &str) -> Result<Url, RegistryError> {
        let file = format!("{}.zip", version);
        build_url(
            &self.endpoints.archive,
            &[&self.owner, &self.repo, "archive", "refs", "tags", &file],
        )
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut all = vec!["repos", self.owner.as_str(), self.repo.as_str()];
        all.extend_from_slice(segments);
        build_url(&self.endpoints.api, &all)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RegistryError> {
        debug!(%url, "Registry request");
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await
            .map_err(|e| transport_error(&url, e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &url, body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&url, e, self.timeout))?;
        serde_json::from_str(&body).map_err(|e| RegistryError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Every item of a paginated list endpoint
    ///
    /// Pages are requested in order until one comes back shorter than
    /// [`PAGE_SIZE`]. A 404 after the first page ends the listing.
    async fn get_all_pages<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Vec<T>, RegistryError> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let mut url = self.api_url(segments)?;
            url.query_pairs_mut()
                .append_pair("per_page", &PAGE_SIZE.to_string())
                .append_pair("page", &page.to_string());

            let batch: Vec<T> = match self.get_json(url).await {
                Ok(batch) => batch,
                Err(e) if e.is_not_found() && page > 1 => return Ok(items),
                Err(e) => return Err(e),
            };
            let last = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if last {
                return Ok(items);
            }
            debug!(page, "Requesting next page");
        }
        warn!(repo = %self.repo, "Stopped listing after {} pages", MAX_PAGES);
        Ok(items)
    }

    /// All published release tags, in registry order, across every page
    ///
    /// A repository the registry does not know (HTTP 404) has no releases, so it
    /// yields an empty list like a repository with zero releases.
    pub async fn list_releases(&self) -> Result<Vec<String>, RegistryError> {
        info!(repo = %self.repo, "Fetching releases");

        match self.get_all_pages::<Release>(&["releases"]).await {
            Ok(releases) => {
                let versions: Vec<String> = releases
                    .iter()
                    .filter_map(Release::tag)
                    .map(str::to_string)
                    .collect();
                info!(count = versions.len(), "Found releases");
                Ok(versions)
            }
            Err(e) if e.is_not_found() => {
                warn!(repo = %self.repo, "Release list not found, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Tag of the release the registry designates as latest
    pub async fn latest_release(&self) -> Result<String, RegistryError> {
        info!(repo = %self.repo, "Fetching latest release");
        let url = self.api_url(&["releases", "latest"])?;
        let release: Release = self.get_json(url.clone()).await.map_err(|e| {
            if e.is_not_found() {
                RegistryError::NoReleases {
                    repo: self.repo.clone(),
                }
            } else {
                e
            }
        })?;

        let version = release
            .tag()
            .map(str::to_string)
            .ok_or_else(|| RegistryError::Decode {
                url: url.to_string(),
                message: "latest release has no tag".to_string(),
            })?;
        info!(%version, "Latest release");
        Ok(version)
    }

    /// Details of the release for a tag, `None` when no such release exists
    pub async fn release_by_tag(&self, tag: &str) -> Result<Option<Release>, RegistryError> {
        let url = self.api_url(&["releases", "tags", tag])?;
        match self.get_json::<Release>(url).await {
            Ok(release) => Ok(Some(release)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check that `version` is a published release tag
    pub async fn validate_version(&self, version: &str) -> Result<String, RegistryError> {
        let versions = self.list_releases().await?;
        check_version(version, &versions)?;
        info!(%version, "Version found");
        Ok(version.to_string())
    }

    /// The validated requested version, or the latest one when none was requested
    pub async fn resolve_version(&self, requested: Option<&str>) -> Result<String, RegistryError> {
        match requested {
            Some(version) => self.validate_version(version).await,
            None => self.latest_release().await,
        }
    }

    /// Commit hash the tag points at
    pub async fn resolve_commit(&self, tag: &str) -> Result<String, RegistryError> {
        debug!(%tag, "Resolving commit");
        let url = self.api_url(&["git", "refs", "tags", tag])?;
        let unresolved = || RegistryError::UnresolvedRef {
            tag: tag.to_string(),
        };

        let refs: GitRefResponse = match self.get_json(url).await {
            Ok(refs) => refs,
            Err(e) if e.is_not_found() => return Err(unresolved()),
            Err(e) => return Err(e),
        };
        let sha = refs.commit_for(tag).ok_or_else(unresolved)?;
        debug!(%tag, %sha, "Resolved commit");
        Ok(sha)
    }

    /// Branch names kept by `filter`, in reverse registry order
    pub async fn list_branches(&self, filter: &BranchFilter) -> Result<Vec<String>, RegistryError> {
        info!(repo = %self.repo, "Fetching branches");
        let branches: Vec<Branch> = self.get_all_pages(&["branches"]).await?;
        let filtered = filter.apply(branches.into_iter().map(|b| b.name));
        info!(count = filtered.len(), "Found relevant branches");
        Ok(filtered)
    }
}

/// Fail with `VersionNotFound` unless `version` is one of `versions`
pub fn check_version(version: &str, versions: &[String]) -> Result<(), RegistryError> {
    if versions.iter().any(|v| v == version) {
        Ok(())
    } else {
        warn!(%version, "Version not found");
        Err(RegistryError::version_not_found(version, versions))
    }
}

/// Build a URL by appending path segments, preserving query parameters
pub(crate) fn build_url(base: &Url, segments: &[&str]) -> Result<Url, RegistryError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| RegistryError::InvalidUrl {
            url: base.to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Map a non-success HTTP status to its error kind
pub(crate) fn status_error(status: StatusCode, url: &Url, body: String) -> RegistryError {
    let url = url.to_string();
    match status {
        StatusCode::NOT_FOUND => RegistryError::NotFound { url },
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => RegistryError::Forbidden { url },
        s if s.is_server_error() => RegistryError::Server {
            url,
            status: s.as_u16(),
        },
        s => RegistryError::Status {
            url,
            status: s.as_u16(),
            body,
        },
    }
}

fn transport_error(url: &Url, error: reqwest::Error, timeout: Duration) -> RegistryError {
    let url = url.to_string();
    if error.is_timeout() {
        RegistryError::Timeout {
            url,
            seconds: timeout.as_secs(),
        }
    } else if error.is_connect() {
        RegistryError::Connect { url }
    } else {
        RegistryError::Transport { url, source: error }
    }
}
