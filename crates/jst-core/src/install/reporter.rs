//! Batch progress reporting

use super::error::InstallError;
use super::module_name::ModuleName;
use tracing::{info, warn};

/// Observer notified as each module of a batch changes state
///
/// Implementations are purely presentational and must not fail; a reporter
/// that cannot write its output swallows the error.
pub trait InstallReporter {
    /// The version every module of the batch will be installed at
    fn on_version(&self, _version: &str) {}

    fn on_start(&self, module: &ModuleName);

    fn on_success(&self, module: &ModuleName);

    fn on_failure(&self, module: &ModuleName, error: &InstallError);
}

/// Reports through `tracing` only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl InstallReporter for LogReporter {
    fn on_version(&self, version: &str) {
        info!(%version, "Installing modules");
    }

    fn on_start(&self, module: &ModuleName) {
        info!(%module, "Installing module");
    }

    fn on_success(&self, module: &ModuleName) {
        info!(%module, "Installed module");
    }

    fn on_failure(&self, module: &ModuleName, error: &InstallError) {
        warn!(%module, %error, "Module installation failed");
    }
}
