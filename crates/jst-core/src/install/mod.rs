//! Module installation pipeline
//!
//! resolve version → fetch archive → extract and flatten → rewrite placeholder → report
//!
//! The version is resolved once for the whole batch and a failure there aborts
//! the call. Everything after that is per module: a failing module is recorded
//! and reported, and the next one is attempted.

pub mod error;
pub mod extract;
pub mod fetcher;
pub mod module_name;
pub mod reporter;

use crate::config::ProjectConfig;
use crate::registry::{RegistryClient, RegistryError};
use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;

pub use error::InstallError;
pub use extract::extract;
pub use fetcher::{ArchiveFetcher, ArchiveHandle, DownloadError};
pub use module_name::{ModuleName, ModuleNameError};
pub use reporter::{InstallReporter, LogReporter};

/// Token in the module's entry file replaced by its import path
pub const PLACEHOLDER: &str = "{{module_name}}";

/// The module's registration file holding the placeholder
pub const ENTRY_FILE: &str = "apps.py";

/// Where modules go and how they are imported
#[derive(Debug, Clone)]
pub struct InstallLayout {
    pub apps_root: PathBuf,
    pub import_prefix: String,
}

impl InstallLayout {
    pub fn new(apps_root: impl Into<PathBuf>, import_prefix: impl Into<String>) -> Self {
        Self {
            apps_root: apps_root.into(),
            import_prefix: import_prefix.into(),
        }
    }

    /// Layout for a project rooted at `project_dir`
    pub fn from_config(config: &ProjectConfig, project_dir: &Path) -> Self {
        Self::new(project_dir.join(config.apps_path()), config.import_path())
    }

    pub fn target_dir(&self, module: &ModuleName) -> PathBuf {
        self.apps_root.join(module.as_str())
    }

    /// Fully qualified import path of a module
    pub fn qualified_name(&self, module: &ModuleName) -> String {
        format!("{}{}", self.import_prefix, module)
    }
}

/// Result of installing one module
#[derive(Debug)]
pub enum InstallOutcome {
    Succeeded { module: ModuleName, path: PathBuf },
    Failed { module: ModuleName, error: InstallError },
}

impl InstallOutcome {
    pub fn module(&self) -> &ModuleName {
        match self {
            InstallOutcome::Succeeded { module, .. } | InstallOutcome::Failed { module, .. } => {
                module
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InstallOutcome::Succeeded { .. })
    }
}

/// Outcomes of one batch, in request order
#[derive(Debug)]
pub struct InstallReport {
    pub version: String,
    pub outcomes: Vec<InstallOutcome>,
}

impl InstallReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Installs modules of one family from its release registry
pub struct Installer<'a> {
    registry: &'a RegistryClient,
    fetcher: &'a ArchiveFetcher,
    layout: InstallLayout,
}

impl<'a> Installer<'a> {
    pub fn new(registry: &'a RegistryClient, fetcher: &'a ArchiveFetcher, layout: InstallLayout) -> Self {
        Self {
            registry,
            fetcher,
            layout,
        }
    }

    /// Install every module at `version`, or at the latest release when `None`
    ///
    /// Only version resolution can fail the call; per-module failures end up in
    /// the report.
    pub async fn install(
        &self,
        modules: &[ModuleName],
        version: Option<&str>,
        reporter: &dyn InstallReporter,
    ) -> Result<InstallReport, RegistryError> {
        let version = self.registry.resolve_version(version).await?;
        reporter.on_version(&version);
        let archive_url = self.registry.archive_url(&version)?;

        let mut outcomes = Vec::with_capacity(modules.len());
        for module in modules {
            reporter.on_start(module);
            let outcome = match self.install_one(module, &archive_url).await {
                Ok(path) => {
                    reporter.on_success(module);
                    InstallOutcome::Succeeded {
                        module: module.clone(),
                        path,
                    }
                }
                Err(error) => {
                    reporter.on_failure(module, &error);
                    InstallOutcome::Failed {
                        module: module.clone(),
                        error,
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(InstallReport { version, outcomes })
    }

    async fn install_one(&self, module: &ModuleName, archive_url: &Url) -> Result<PathBuf, InstallError> {
        let target = self.layout.target_dir(module);
        // Skip the download when the outcome is already known
        if fs::symlink_metadata(&target).await.is_ok() {
            return Err(InstallError::ModuleAlreadyExists { path: target });
        }

        let archive = self.fetcher.fetch(archive_url).await?;
        let path = extract(archive.path(), &target)?;
        drop(archive);

        let entry_file = path.join(ENTRY_FILE);
        if let Err(e) = rewrite_placeholder(&entry_file, &self.layout.qualified_name(module)).await {
            let _ = fs::remove_dir_all(&path).await;
            return Err(e);
        }

        Ok(path)
    }
}

/// Replace every [`PLACEHOLDER`] in `file` with `value`
pub async fn rewrite_placeholder(file: &Path, value: &str) -> Result<(), InstallError> {
    let rewrite_error = |reason: String| InstallError::PlaceholderRewrite {
        path: file.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(file)
        .await
        .map_err(|e| rewrite_error(format!("cannot read file: {}", e)))?;
    if !content.contains(PLACEHOLDER) {
        return Err(rewrite_error(format!("placeholder {} not found", PLACEHOLDER)));
    }

    fs::write(file, content.replace(PLACEHOLDER, value))
        .await
        .map_err(|e| rewrite_error(format!("cannot write file: {}", e)))
}
