//! New project creation from the project template repository
//!
//! version → questions → context → download and render → `.cruft.json`

pub mod render;

use crate::install::{extract, ArchiveFetcher, DownloadError, InstallError};
use crate::prompt::{Answer, Answers, Question, QuestionError};
use crate::registry::{RegistryClient, RegistryError};
use crate::validate::{
    validate_password_strength, validate_phone_number, validate_port, validate_positive_number,
    validate_project_name,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub use render::{JinjaRenderer, ProjectRenderer};

pub const AVAILABLE_PACKAGES: &[&str] = &[
    "cacheops",
    "silk",
    "storage",
    "channels",
    "ckeditor",
    "modeltranslation",
    "parler",
    "rosetta",
];
pub const SETTINGS_MODULES: &[&str] = &["config.settings.local", "config.settings.production"];
pub const RUNNER_TYPES: &[&str] = &["wsgi", "asgi"];
pub const SCRIPT_FILES: &[&str] = &["entrypoint.sh", "entrypoint-server.sh"];

pub const DEFAULT_DJANGO_KEY: &str = "django-insecure-change-this-in-production";
pub const DEFAULT_PORT: &str = "8081";
pub const DEFAULT_ADMIN_PHONE: &str = "998000000000";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_LINE_LENGTH: &str = "120";

const TEMPLATE_DEFAULTS_FILE: &str = "cookiecutter.json";
const CRUFT_FILE: &str = ".cruft.json";

/// Template variables, keyed without the `cookiecutter.` prefix
pub type Context = Map<String, Value>;

#[derive(Debug, Error)]
pub enum CreateError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Extract(#[from] InstallError),

    #[error(transparent)]
    Question(#[from] QuestionError),

    #[error("Missing answer for '{0}'")]
    MissingAnswer(String),

    #[error("Failed to render {}: {source}", .path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },

    #[error("Unexpected template layout: {reason}")]
    TemplateLayout { reason: String },

    #[error("Directory already exists: {}", .path.display())]
    TargetExists { path: PathBuf },

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The questions asked before a project is created, in order
pub fn questions() -> Result<Vec<Question>, QuestionError> {
    Ok(vec![
        Question::text("project_name", "Project name", None, Some(validate_project_name))?,
        Question::select("settings_module", "Settings file", SETTINGS_MODULES, Some(SETTINGS_MODULES[0]))?,
        Question::checklist("packages", "Packages to install", AVAILABLE_PACKAGES, &[])?,
        Question::select("runner", "Runner", RUNNER_TYPES, Some(RUNNER_TYPES[0]))?,
        Question::select("script", "Script file", SCRIPT_FILES, Some(SCRIPT_FILES[0]))?,
        Question::text("key", "Django key (change in production!)", Some(DEFAULT_DJANGO_KEY), None)?,
        Question::text("port", "Port", Some(DEFAULT_PORT), Some(validate_port))?,
        Question::text(
            "phone",
            "Default admin phone",
            Some(DEFAULT_ADMIN_PHONE),
            Some(validate_phone_number),
        )?,
        Question::password(
            "password",
            "Admin password",
            Some(DEFAULT_ADMIN_PASSWORD),
            Some(validate_password_strength),
        )?,
        Question::text(
            "max_line_length",
            "Flake8 and black max line length",
            Some(DEFAULT_LINE_LENGTH),
            Some(validate_positive_number),
        )?,
    ])
}

/// Lower-cased name with spaces, dashes and dots turned into underscores
pub fn project_slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if matches!(c, ' ' | '-' | '.') { '_' } else { c })
        .collect()
}

/// Build the template context from collected answers
///
/// Every available package becomes a boolean; other answers are kept as strings.
pub fn prepare_context(answers: &Answers) -> Result<Context, CreateError> {
    let name = answers
        .get("project_name")
        .and_then(Answer::as_text)
        .ok_or_else(|| CreateError::MissingAnswer("project_name".to_string()))?;

    let selected = answers.get("packages").map(Answer::as_many).unwrap_or(&[]);
    let mut context: Context = AVAILABLE_PACKAGES
        .iter()
        .map(|package| {
            let enabled = selected.iter().any(|s| s == package);
            (package.to_string(), Value::Bool(enabled))
        })
        .collect();

    for (key, answer) in answers {
        if key == "packages" {
            continue;
        }
        let value = match answer {
            Answer::Text(text) => Value::String(text.clone()),
            Answer::Many(values) => Value::from(values.clone()),
        };
        context.insert(key.clone(), value);
    }
    context.insert("project_slug".to_string(), Value::String(project_slug(name)));

    debug!(slug = %project_slug(name), packages = ?selected, "Prepared project context");
    Ok(context)
}

/// Fill keys the answers did not set from the template's own defaults
///
/// Keys starting with `_` are template settings and are kept verbatim. A list
/// default is a choice and contributes its first entry. String defaults may
/// refer to other variables and are rendered against the context so far.
pub fn merge_template_defaults(
    context: &mut Context,
    defaults: &Map<String, Value>,
    renderer: &dyn ProjectRenderer,
) -> Result<(), CreateError> {
    for (key, default) in defaults {
        if context.contains_key(key) {
            continue;
        }
        let value = match default {
            _ if key.starts_with('_') => default.clone(),
            Value::Array(choices) => match choices.first() {
                Some(first) => first.clone(),
                None => continue,
            },
            Value::String(text) => {
                let name = format!("{}:{}", TEMPLATE_DEFAULTS_FILE, key);
                Value::String(renderer.render_str(&name, text, context)?)
            }
            other => other.clone(),
        };
        context.insert(key.clone(), value);
    }
    Ok(())
}

/// Link between a generated project and the template it came from
#[derive(Debug, Clone, Serialize)]
pub struct CruftConfig {
    pub template: String,
    pub commit: String,
    pub checkout: Option<String>,
    pub context: CruftContext,
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CruftContext {
    pub cookiecutter: Context,
}

impl CruftConfig {
    pub fn new(template: &str, commit: &str, context: Context) -> Self {
        Self {
            template: template.to_string(),
            commit: commit.to_string(),
            checkout: None,
            context: CruftContext {
                cookiecutter: context,
            },
            directory: None,
        }
    }

    pub fn write(&self, project_dir: &Path) -> Result<PathBuf, CreateError> {
        let path = project_dir.join(CRUFT_FILE);
        let io_error = |source| CreateError::Io {
            path: path.clone(),
            source,
        };
        let mut content = serde_json::to_string_pretty(self)
            .map_err(|e| io_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        content.push('\n');
        fs::write(&path, content).map_err(io_error)?;
        Ok(path)
    }
}

/// Creates projects from tagged releases of the project template
pub struct ProjectCreator<'a> {
    registry: &'a RegistryClient,
    fetcher: &'a ArchiveFetcher,
    renderer: &'a dyn ProjectRenderer,
    output_dir: PathBuf,
}

impl<'a> ProjectCreator<'a> {
    pub fn new(
        registry: &'a RegistryClient,
        fetcher: &'a ArchiveFetcher,
        renderer: &'a dyn ProjectRenderer,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            renderer,
            output_dir: output_dir.into(),
        }
    }

    /// The validated requested version, or the latest release
    pub async fn resolve_version(&self, requested: Option<&str>) -> Result<String, RegistryError> {
        self.registry.resolve_version(requested).await
    }

    /// Render the template at `version` into `<output_dir>/<project_slug>`
    pub async fn create(&self, version: &str, mut context: Context) -> Result<PathBuf, CreateError> {
        let slug = context
            .get("project_slug")
            .and_then(Value::as_str)
            .ok_or_else(|| CreateError::MissingAnswer("project_slug".to_string()))?
            .to_string();
        let target = self.output_dir.join(&slug);
        if target.exists() {
            return Err(CreateError::TargetExists { path: target });
        }

        let commit = self.registry.resolve_commit(version).await?;
        let archive = self.fetcher.fetch(&self.registry.archive_url(version)?).await?;

        let scratch = tempfile::Builder::new()
            .prefix("jst-template-")
            .tempdir()
            .map_err(|source| CreateError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        let template_repo = extract(archive.path(), &scratch.path().join("template"))?;
        drop(archive);

        let defaults = read_template_defaults(&template_repo)?;
        merge_template_defaults(&mut context, &defaults, self.renderer)?;

        let template_root = find_template_root(&template_repo)?;
        let project_dir = self.renderer.render(&template_root, &self.output_dir, &context)?;

        let cruft = CruftConfig::new(self.registry.repository_url()?.as_str(), &commit, context);
        if let Err(e) = cruft.write(&project_dir) {
            let _ = fs::remove_dir_all(&project_dir);
            return Err(e);
        }

        info!(project = %project_dir.display(), %version, "Project created");
        Ok(project_dir)
    }
}

fn read_template_defaults(template_repo: &Path) -> Result<Map<String, Value>, CreateError> {
    let path = template_repo.join(TEMPLATE_DEFAULTS_FILE);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => return Err(CreateError::Io { path, source }),
    };
    match serde_json::from_str(&raw) {
        Ok(Value::Object(defaults)) => Ok(defaults),
        Ok(_) => Err(CreateError::TemplateLayout {
            reason: format!("{} is not a JSON object", TEMPLATE_DEFAULTS_FILE),
        }),
        Err(e) => Err(CreateError::TemplateLayout {
            reason: format!("invalid {}: {}", TEMPLATE_DEFAULTS_FILE, e),
        }),
    }
}

/// The single directory whose name is a template expression
fn find_template_root(template_repo: &Path) -> Result<PathBuf, CreateError> {
    let io_error = |source| CreateError::Io {
        path: template_repo.to_path_buf(),
        source,
    };
    let mut roots = Vec::new();
    for entry in fs::read_dir(template_repo).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        if entry.file_type().map_err(io_error)?.is_dir() && entry.file_name().to_string_lossy().contains("{{") {
            roots.push(entry.path());
        }
    }

    match roots.len() {
        1 => Ok(roots.remove(0)),
        n => Err(CreateError::TemplateLayout {
            reason: format!("expected one templated project folder, found {}", n),
        }),
    }
}
