//! jst core - shared library behind the `jst` CLI
//!
//! Scaffolds Django projects from a tagged template release, installs prebuilt
//! modules into a project and generates components from stubs.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **Layer 1: Core Operations** - registry queries, archive download and extraction,
//!   stub rendering, project configuration
//! - **Layer 2: Workflow Orchestration** - `ProductConfig`, `Installer`, `ProjectCreator`
//!   and `Generator`, driven through the `Prompter` and `InstallReporter` seams
//! - **Layer 3: CLI/TUI Interface** - Optional cliclack-based flows (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based terminal flows
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use jst_core::install::{ArchiveFetcher, InstallLayout, Installer, LogReporter, ModuleName};
//! use jst_core::registry::RegistryClient;
//!
//! let registry = RegistryClient::from_config(&MyConfig, "module-default")?;
//! let fetcher = ArchiveFetcher::from_config(&MyConfig)?;
//! let installer = Installer::new(&registry, &fetcher, InstallLayout::new("./core/apps/", "core.apps."));
//! let report = installer
//!     .install(&ModuleName::parse_list("shop,blog")?, None, &LogReporter)
//!     .await?;
//! ```

pub mod config;
pub mod generate;
pub mod install;
pub mod product;
pub mod project;
pub mod prompt;
pub mod registry;
pub mod validate;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use config::ProjectConfig;
pub use install::{InstallOutcome, InstallReport, Installer, ModuleName};
pub use product::{ProductConfig, RegistryEndpoints};
pub use registry::{RegistryClient, RegistryError};
