//! Interactive command flows using cliclack

use super::terminal::{ClackPrompter, ClackReporter};
use crate::config::{ProjectConfig, COMPONENT_KINDS};
use crate::generate::{GenerateRequest, Generator, REQUIREMENTS};
use crate::install::{ArchiveFetcher, InstallLayout, Installer, ModuleName, ModuleNameError};
use crate::product::ProductConfig;
use crate::project::{self, JinjaRenderer, ProjectCreator};
use crate::prompt::{ask_all, Answers, Prompted, Prompter, Question};
use crate::registry::{BranchFilter, RegistryClient};
use crate::validate::validate_not_empty;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Arguments of `jst install`
#[derive(Debug, Clone, Default)]
pub struct InstallArgs {
    /// Comma-separated module names
    pub modules: Option<String>,
    pub version: Option<String>,
    /// Module family; asked for when missing
    pub family: Option<String>,
}

/// Arguments of `jst create`
#[derive(Debug, Clone)]
pub struct CreateArgs {
    pub version: Option<String>,
    /// Directory the project folder is created in
    pub output_dir: PathBuf,
}

impl Default for CreateArgs {
    fn default() -> Self {
        Self {
            version: None,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Arguments of `jst versions`
#[derive(Debug, Clone, Default)]
pub struct VersionsArgs {
    /// Module family instead of the project template
    pub module: Option<String>,
    pub branches: bool,
    pub tag: Option<String>,
}

fn cancelled() -> Result<()> {
    cliclack::outro_cancel("Cancelled")?;
    Ok(())
}

/// Module names to install; the family name when none were given
pub fn resolve_modules(raw: Option<&str>, family: &str) -> Result<Vec<ModuleName>, ModuleNameError> {
    let modules = match raw {
        Some(raw) => ModuleName::parse_list(raw)?,
        None => Vec::new(),
    };
    if modules.is_empty() {
        return Ok(vec![ModuleName::parse(family)?]);
    }
    Ok(modules)
}

fn check_family<C: ProductConfig>(config: &C, family: &str) -> Result<()> {
    if !config.module_families().iter().any(|f| *f == family) {
        anyhow::bail!(
            "Unknown module family '{}'. Available families: {}",
            family,
            config.module_families().join(", ")
        );
    }
    Ok(())
}

fn select_family<C: ProductConfig>(
    config: &C,
    requested: Option<&str>,
    prompter: &mut dyn Prompter,
) -> Result<Prompted<String>> {
    if let Some(family) = requested {
        check_family(config, family)?;
        return Ok(Prompted::Value(family.to_string()));
    }
    let question = Question::select("family", "Select a module", config.module_families(), None)?;
    let answer = prompter.ask(&question)?;
    Ok(answer.map(|a| a.as_text().unwrap_or_default().to_string()))
}

/// `jst install`: install modules of one family into the project's apps directory
pub async fn run_install<C: ProductConfig>(
    config: &C,
    project: &ProjectConfig,
    project_dir: &Path,
    args: InstallArgs,
) -> Result<()> {
    cliclack::intro(format!("{} install", config.display_name()))?;

    let family = match select_family(config, args.family.as_deref(), &mut ClackPrompter)? {
        Prompted::Value(family) => family,
        Prompted::Cancelled => return cancelled(),
    };
    let modules = resolve_modules(args.modules.as_deref(), &family)?;

    let registry = RegistryClient::from_config(config, &config.module_repo(&family))?;
    let fetcher = ArchiveFetcher::from_config(config)?;
    let installer = Installer::new(&registry, &fetcher, InstallLayout::from_config(project, project_dir));

    let report = installer
        .install(&modules, args.version.as_deref(), &ClackReporter::new())
        .await
        .with_context(|| format!("Failed to resolve a version of module-{}", family))?;

    let summary = if report.failed() == 0 {
        format!("{} module(s) installed at {}", report.succeeded(), report.version)
            .green()
            .to_string()
    } else {
        format!(
            "{} installed, {} failed",
            report.succeeded(),
            report.failed().to_string().red()
        )
    };
    cliclack::outro(summary)?;
    Ok(())
}

/// `jst create`: scaffold a new project from the project template
pub async fn run_create<C: ProductConfig>(config: &C, args: CreateArgs) -> Result<()> {
    cliclack::intro(config.display_name())?;

    let registry = RegistryClient::from_config(config, config.project_template())?;
    let fetcher = ArchiveFetcher::from_config(config)?;
    let renderer = JinjaRenderer::new();
    let creator = ProjectCreator::new(&registry, &fetcher, &renderer, &args.output_dir);

    let spinner = cliclack::spinner();
    spinner.start("Fetching version...");
    let version = match creator.resolve_version(args.version.as_deref()).await {
        Ok(version) => {
            spinner.stop(format!("Using version: {}", version));
            version
        }
        Err(e) => {
            spinner.error("Failed to fetch version");
            return Err(e.into());
        }
    };

    let answers = match ask_all(&mut ClackPrompter, &project::questions()?)? {
        Prompted::Value(answers) => answers,
        Prompted::Cancelled => return cancelled(),
    };
    let context = project::prepare_context(&answers)?;

    let spinner = cliclack::spinner();
    spinner.start("Creating project...");
    let project_dir = match creator.create(&version, context).await {
        Ok(dir) => {
            spinner.stop("Project structure created");
            dir
        }
        Err(e) => {
            spinner.error("Failed to create project");
            return Err(e.into());
        }
    };

    println!();
    println!("  {} {}", "◆".blue().bold(), "Project created".bold());
    println!("  {} {}", "Location:".dimmed(), project_dir.display());
    cliclack::outro(format!("cd {}", project_dir.display()))?;
    Ok(())
}

fn generate_request(answers: &Answers) -> GenerateRequest {
    let text = |key: &str| {
        answers
            .get(key)
            .and_then(|a| a.as_text())
            .unwrap_or_default()
            .to_string()
    };
    GenerateRequest {
        file_name: text("file_name"),
        name: text("name"),
        app: text("app"),
        kinds: answers.get("kinds").map(|a| a.as_many().to_vec()).unwrap_or_default(),
    }
}

/// `jst generate`: add components to an existing app
pub fn run_generate(project: &ProjectConfig, project_dir: &Path) -> Result<()> {
    cliclack::intro("Generate components")?;

    let generator = Generator::new(project, project_dir);
    let apps = generator
        .list_apps()
        .with_context(|| format!("Failed to list apps in {}", generator.apps_root().display()))?;
    if apps.is_empty() {
        anyhow::bail!("No apps found in {}", generator.apps_root().display());
    }
    let app_choices: Vec<&str> = apps.iter().map(String::as_str).collect();

    let questions = vec![
        Question::text("file_name", "File name", None, Some(validate_not_empty))?,
        Question::text("name", "Name", None, Some(validate_not_empty))?,
        Question::select("app", "Select an app", &app_choices, None)?,
        Question::checklist("kinds", "Select components", COMPONENT_KINDS, &[])?,
    ];
    let answers = match ask_all(&mut ClackPrompter, &questions)? {
        Prompted::Value(answers) => answers,
        Prompted::Cancelled => return cancelled(),
    };

    let files = generator.generate(&generate_request(&answers))?;
    for file in &files {
        let action = if file.appended { "Updated" } else { "Created" };
        cliclack::log::success(format!("{} {} ({})", action, file.path.display(), file.kind))?;
    }
    cliclack::outro(format!("{} component(s) generated", files.len()))?;
    Ok(())
}

/// `jst init`: write the default project configuration
pub fn run_init(path: &Path) -> Result<()> {
    let config = ProjectConfig::init(path)?;
    println!("{} {}", "Config created:".green().bold(), config.path().display());
    Ok(())
}

/// `jst requirements`: print the bundled requirements list
pub fn print_requirements() {
    print!("{}", REQUIREMENTS);
}

/// `jst versions`: list releases, branches or one release of a repository
pub async fn run_versions<C: ProductConfig>(config: &C, args: VersionsArgs) -> Result<()> {
    let repo = match args.module.as_deref() {
        Some(family) => {
            check_family(config, family)?;
            config.module_repo(family)
        }
        None => config.project_template().to_string(),
    };
    let registry = RegistryClient::from_config(config, &repo)?;

    if let Some(tag) = args.tag.as_deref() {
        let release = registry
            .release_by_tag(tag)
            .await?
            .with_context(|| format!("Release '{}' not found in {}", tag, repo))?;
        println!("{} {}", "Tag:".bold(), release.tag().unwrap_or(tag).green());
        if let Some(name) = release.name.as_deref() {
            println!("{} {}", "Name:".bold(), name);
        }
        if let Some(published) = release.published_at.as_deref() {
            println!("{} {}", "Published:".bold(), published);
        }
        if let Some(url) = release.html_url.as_deref() {
            println!("{} {}", "URL:".bold(), url.dimmed());
        }
        return Ok(());
    }

    let (label, names) = if args.branches {
        ("branches", registry.list_branches(&BranchFilter::default()).await?)
    } else {
        ("releases", registry.list_releases().await?)
    };

    if names.is_empty() {
        println!("No {} found for {}", label, repo);
        return Ok(());
    }
    println!("{} {}", repo.cyan().bold(), format!("({} {})", names.len(), label).dimmed());
    for name in names {
        println!("  {} {}", "●".blue(), name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{Reply, ScriptedPrompter};

    #[derive(Clone)]
    struct TestProduct;

    impl ProductConfig for TestProduct {
        fn name(&self) -> &'static str {
            "jst"
        }
        fn display_name(&self) -> &'static str {
            "jst"
        }
        fn registry_owner(&self) -> &'static str {
            "JscorpTech"
        }
        fn default_api_url(&self) -> &'static str {
            "https://api.github.com"
        }
        fn api_url_env(&self) -> &'static str {
            "JST_TEST_API_URL"
        }
        fn default_archive_url(&self) -> &'static str {
            "https://github.com"
        }
        fn archive_url_env(&self) -> &'static str {
            "JST_TEST_ARCHIVE_URL"
        }
        fn project_template(&self) -> &'static str {
            "django"
        }
        fn module_families(&self) -> &'static [&'static str] {
            &["default", "authbot", "websocket"]
        }
        fn cli_description(&self) -> &'static str {
            "test"
        }
    }

    #[test]
    fn test_resolve_modules_falls_back_to_family() {
        let names = |modules: Vec<ModuleName>| -> Vec<String> { modules.iter().map(|m| m.to_string()).collect() };

        assert_eq!(names(resolve_modules(None, "authbot").unwrap()), vec!["authbot"]);
        assert_eq!(names(resolve_modules(Some(" , "), "authbot").unwrap()), vec!["authbot"]);
        assert_eq!(names(resolve_modules(Some("shop, blog"), "default").unwrap()), vec!["shop", "blog"]);
        assert!(resolve_modules(Some("shop,my blog"), "default").is_err());
    }

    #[test]
    fn test_select_family() {
        let mut prompter = ScriptedPrompter::new(vec![Reply::Text("websocket".to_string())]);
        assert_eq!(
            select_family(&TestProduct, None, &mut prompter).unwrap(),
            Prompted::Value("websocket".to_string())
        );

        let mut prompter = ScriptedPrompter::new(vec![Reply::Cancel]);
        assert_eq!(select_family(&TestProduct, None, &mut prompter).unwrap(), Prompted::Cancelled);

        let mut unused = ScriptedPrompter::new(Vec::new());
        assert_eq!(
            select_family(&TestProduct, Some("authbot"), &mut unused).unwrap(),
            Prompted::Value("authbot".to_string())
        );
        assert!(select_family(&TestProduct, Some("payments"), &mut unused).is_err());
        assert!(unused.asked().is_empty());
    }

    #[test]
    fn test_generate_request_from_answers() {
        use crate::prompt::Answer;

        let mut answers = Answers::new();
        answers.insert("file_name".to_string(), Answer::Text("product".to_string()));
        answers.insert("name".to_string(), Answer::Text("product".to_string()));
        answers.insert("app".to_string(), Answer::Text("shop".to_string()));
        answers.insert("kinds".to_string(), Answer::Many(vec!["model".to_string()]));

        let request = generate_request(&answers);
        assert_eq!(request.app, "shop");
        assert_eq!(request.kinds, vec!["model"]);
    }
}
