//! jst CLI - Django project scaffolding, module installation and code generation

mod logging;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use jst_core::config::CONFIG_FILE_NAME;
use jst_core::tui::{CreateArgs, InstallArgs, VersionsArgs};
use jst_core::{ProductConfig, ProjectConfig};
use std::path::{Path, PathBuf};

/// jst product configuration
#[derive(Clone)]
pub struct JstProduct;

impl ProductConfig for JstProduct {
    fn name(&self) -> &'static str {
        "jst"
    }

    fn display_name(&self) -> &'static str {
        "jst-django"
    }

    fn registry_owner(&self) -> &'static str {
        "JscorpTech"
    }

    fn default_api_url(&self) -> &'static str {
        "https://api.github.com"
    }

    fn api_url_env(&self) -> &'static str {
        "JST_API_URL"
    }

    fn default_archive_url(&self) -> &'static str {
        "https://github.com"
    }

    fn archive_url_env(&self) -> &'static str {
        "JST_ARCHIVE_URL"
    }

    fn project_template(&self) -> &'static str {
        "django"
    }

    fn module_families(&self) -> &'static [&'static str] {
        &["default", "authbot", "websocket"]
    }

    fn cli_description(&self) -> &'static str {
        "CLI for scaffolding Django projects and installing modules"
    }

    fn user_agent(&self) -> &'static str {
        concat!("jst-django/", env!("CARGO_PKG_VERSION"))
    }
}

#[derive(Parser, Debug)]
#[command(name = "jst")]
#[command(about = "CLI for scaffolding Django projects and installing modules")]
#[command(version)]
pub struct Args {
    /// Increase log output (repeat for more)
    #[arg(long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Project configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new project
    Create {
        /// Template version (default: latest release)
        #[arg(short, long)]
        version: Option<String>,
    },
    /// Install modules into the project
    #[command(alias = "make:app")]
    Install {
        /// Module names, comma-separated (default: the family name)
        modules: Option<String>,

        /// Module version (default: latest release)
        #[arg(short, long)]
        version: Option<String>,

        /// Module family (asked for when missing)
        #[arg(short, long)]
        family: Option<String>,
    },
    /// Generate components in an app
    Generate,
    /// Create the jst.json config file
    Init,
    /// Print the recommended requirements
    Requirements,
    /// List releases of the project template or a module family
    Versions {
        /// Module family instead of the project template
        #[arg(short, long)]
        module: Option<String>,

        /// List release branches instead of releases
        #[arg(short, long)]
        branches: bool,

        /// Show one release
        #[arg(short, long, conflicts_with = "branches")]
        tag: Option<String>,
    },
}

fn load_project(path: &Path) -> Result<ProjectConfig> {
    tracing::debug!(path = %path.display(), "Loading project configuration");
    ProjectConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

async fn run<C: ProductConfig>(product: &C, args: Args) -> Result<()> {
    let Args { command, config, .. } = args;
    let project_dir = std::env::current_dir().context("Failed to read the current directory")?;

    match command.unwrap_or(Command::Create { version: None }) {
        Command::Create { version } => {
            let create_args = CreateArgs {
                version,
                output_dir: project_dir,
            };
            jst_core::tui::run_create(product, create_args).await
        }
        Command::Install {
            modules,
            version,
            family,
        } => {
            let project = load_project(&config)?;
            let install_args = InstallArgs {
                modules,
                version,
                family,
            };
            jst_core::tui::run_install(product, &project, &project_dir, install_args).await
        }
        Command::Generate => {
            let project = load_project(&config)?;
            jst_core::tui::run_generate(&project, &project_dir)
        }
        Command::Init => jst_core::tui::run_init(&config),
        Command::Requirements => {
            jst_core::tui::print_requirements();
            Ok(())
        }
        Command::Versions {
            module,
            branches,
            tag,
        } => {
            let versions_args = VersionsArgs {
                module,
                branches,
                tag,
            };
            jst_core::tui::run_versions(product, versions_args).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    logging::init_logging(args.verbose, args.quiet)?;

    let result = run(&JstProduct, args).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    result
}
