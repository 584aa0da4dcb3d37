//! Product configuration trait for CLI binaries
//!
//! This trait defines the interface that the `jst` binary implements to point the
//! scaffolding, installation and generation workflows at a release registry.

use anyhow::{Context, Result};
use url::Url;

/// Configuration trait for the CLI product
///
/// The binary implements this trait to define:
/// - Product identity (name, display name)
/// - Registry and archive hosts, with environment overrides
/// - The project template repository and installable module families
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for CLI command, env vars)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Account that owns the template and module repositories
    fn registry_owner(&self) -> &'static str;

    /// Default base URL of the registry REST API
    fn default_api_url(&self) -> &'static str;

    /// Environment variable name for overriding the API URL
    fn api_url_env(&self) -> &'static str;

    /// Default base URL that serves tag archives
    fn default_archive_url(&self) -> &'static str;

    /// Environment variable name for overriding the archive URL
    fn archive_url_env(&self) -> &'static str;

    /// Repository holding the project template
    fn project_template(&self) -> &'static str;

    /// Installable module families
    fn module_families(&self) -> &'static [&'static str];

    /// Repository name for a module family
    fn module_repo(&self, family: &str) -> String {
        format!("module-{}", family)
    }

    /// CLI description shown in help text
    fn cli_description(&self) -> &'static str;

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }
}

/// Base URLs of the registry API and of the archive host
#[derive(Debug, Clone)]
pub struct RegistryEndpoints {
    pub api: Url,
    pub archive: Url,
}

impl RegistryEndpoints {
    pub fn new(api: Url, archive: Url) -> Self {
        Self { api, archive }
    }

    /// Resolve endpoints from a product config, honouring its environment overrides
    pub fn from_config<C: ProductConfig>(config: &C) -> Result<Self> {
        let api = env_url(config.api_url_env(), config.default_api_url())?;
        let archive = env_url(config.archive_url_env(), config.default_archive_url())?;
        Ok(Self { api, archive })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url> {
    let url_str = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&url_str).with_context(|| format!("Invalid URL in {}: {}", var, url_str))
}
