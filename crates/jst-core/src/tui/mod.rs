//! Terminal front end using cliclack
//!
//! This module is optional and only available when the `tui` feature is enabled.

mod prompts;
mod terminal;

pub use prompts::{
    print_requirements, resolve_modules, run_create, run_generate, run_init, run_install,
    run_versions, CreateArgs, InstallArgs, VersionsArgs,
};
pub use terminal::{ClackPrompter, ClackReporter};
