//! Component generation from stubs
//!
//! A stub is a Python snippet with `{class_name}` and `{file_name}` slots.
//! Lines starting with `##` are the file header (imports): they are written
//! when a component file is created and left out when another class is
//! appended to an existing file.

use crate::config::{ProjectConfig, COMPONENT_KINDS};
use crate::validate::{validate_not_empty, ValidationError};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const HEADER_MARKER: &str = "##";
const EXCLUDED_APPS: &[&str] = &["logs"];

/// Contents of the bundled requirements list
pub const REQUIREMENTS: &str = include_str!("../../stubs/requirements.txt.stub");

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Unknown component kind '{0}'")]
    UnknownKind(String),

    #[error("App '{0}' not found")]
    AppNotFound(String),

    #[error("Invalid file name '{0}'")]
    InvalidFileName(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> GenerateError + '_ {
    move |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Stub bundled with the binary for `name` (`init` or a component kind)
pub fn builtin_stub(name: &str) -> Option<&'static str> {
    let stub = match name {
        "init" => include_str!("../../stubs/__init__.stub"),
        "model" => include_str!("../../stubs/model.stub"),
        "serializer" => include_str!("../../stubs/serializer.stub"),
        "view" => include_str!("../../stubs/view.stub"),
        "permission" => include_str!("../../stubs/permission.stub"),
        "admin" => include_str!("../../stubs/admin.stub"),
        "test" => include_str!("../../stubs/test.stub"),
        "translation" => include_str!("../../stubs/translation.stub"),
        "validator" => include_str!("../../stubs/validator.stub"),
        "form" => include_str!("../../stubs/form.stub"),
        "filter" => include_str!("../../stubs/filter.stub"),
        "signal" => include_str!("../../stubs/signal.stub"),
        _ => return None,
    };
    Some(stub)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubMode {
    /// New file: header lines kept without their marker
    Full,
    /// Existing file: header lines dropped, leading newline added
    Append,
}

/// Fill a stub's slots and apply `mode` to its header lines
pub fn render_stub(stub: &str, mode: StubMode, class_name: &str, file_name: &str) -> String {
    let mut out = String::with_capacity(stub.len() + 1);
    if mode == StubMode::Append {
        out.push('\n');
    }
    for line in stub.split_inclusive('\n') {
        match (line.strip_prefix(HEADER_MARKER), mode) {
            (Some(_), StubMode::Append) => continue,
            (Some(header), StubMode::Full) => out.push_str(header),
            (None, _) => out.push_str(line),
        }
    }
    out.replace("{class_name}", class_name)
        .replace("{file_name}", file_name)
}

/// First character upper case, the rest lower case
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// `product` + `model` → `ProductModel`
pub fn class_name(name: &str, kind: &str) -> String {
    format!("{}{}", capitalize(name), capitalize(kind))
}

/// What to generate
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub file_name: String,
    pub name: String,
    pub app: String,
    pub kinds: Vec<String>,
}

/// One file touched by a generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub kind: String,
    pub path: PathBuf,
    pub appended: bool,
}

/// Writes components into the apps of one project
pub struct Generator<'a> {
    config: &'a ProjectConfig,
    project_dir: PathBuf,
}

impl<'a> Generator<'a> {
    pub fn new(config: &'a ProjectConfig, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            project_dir: project_dir.into(),
        }
    }

    pub fn apps_root(&self) -> PathBuf {
        self.project_dir.join(self.config.apps_path())
    }

    /// App directories, sorted, without `logs` and dunder entries
    pub fn list_apps(&self) -> Result<Vec<String>, GenerateError> {
        let root = self.apps_root();
        let mut apps = Vec::new();
        for entry in fs::read_dir(&root).map_err(io_error(&root))? {
            let entry = entry.map_err(io_error(&root))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("__") || EXCLUDED_APPS.contains(&name.as_str()) {
                continue;
            }
            if entry.file_type().map_err(io_error(&root))?.is_dir() {
                apps.push(name);
            }
        }
        apps.sort();
        Ok(apps)
    }

    /// The stub text for `name`, preferring a configured file on disk
    pub fn stub(&self, name: &str) -> Result<String, GenerateError> {
        let configured = self.project_dir.join(self.config.stub_file(name));
        if configured.is_file() {
            debug!(path = %configured.display(), "Using stub override");
            return fs::read_to_string(&configured).map_err(io_error(&configured));
        }
        builtin_stub(name)
            .map(str::to_string)
            .ok_or_else(|| GenerateError::UnknownKind(name.to_string()))
    }

    pub fn generate(&self, request: &GenerateRequest) -> Result<Vec<GeneratedFile>, GenerateError> {
        validate_not_empty(&request.file_name)?;
        validate_not_empty(&request.name)?;
        if request.file_name.contains(&['/', '\\', '.'][..]) {
            return Err(GenerateError::InvalidFileName(request.file_name.clone()));
        }
        if let Some(unknown) = request.kinds.iter().find(|k| !COMPONENT_KINDS.contains(&k.as_str())) {
            return Err(GenerateError::UnknownKind(unknown.clone()));
        }

        let app_dir = self.apps_root().join(&request.app);
        if request.app.is_empty() || !app_dir.is_dir() {
            return Err(GenerateError::AppNotFound(request.app.clone()));
        }

        request
            .kinds
            .iter()
            .map(|kind| self.generate_kind(&app_dir, kind, request))
            .collect()
    }

    fn generate_kind(
        &self,
        app_dir: &Path,
        kind: &str,
        request: &GenerateRequest,
    ) -> Result<GeneratedFile, GenerateError> {
        let module_dir = app_dir.join(self.config.component_dir(kind));
        fs::create_dir_all(&module_dir).map_err(io_error(&module_dir))?;

        let file = module_dir.join(format!("{}.py", request.file_name));
        let class = class_name(&request.name, kind);
        let appended = file.exists();

        if appended {
            let content = render_stub(&self.stub(kind)?, StubMode::Append, &class, &request.file_name);
            append(&file, &content)?;
        } else {
            let init = module_dir.join("__init__.py");
            let export = render_stub(&self.stub("init")?, StubMode::Full, &class, &request.file_name);
            append(&init, &export)?;

            let content = render_stub(&self.stub(kind)?, StubMode::Full, &class, &request.file_name);
            fs::write(&file, content).map_err(io_error(&file))?;
        }

        info!(kind, class = %class, path = %file.display(), appended, "Generated component");
        Ok(GeneratedFile {
            kind: kind.to_string(),
            path: file,
            appended,
        })
    }
}

/// Append `content`, starting on a fresh line
fn append(path: &Path, content: &str) -> Result<(), GenerateError> {
    let needs_newline = fs::read(path)
        .map(|existing| existing.last().is_some_and(|b| *b != b'\n'))
        .unwrap_or(false);

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error(path))?;
    if needs_newline {
        file.write_all(b"\n").map_err(io_error(path))?;
    }
    file.write_all(content.as_bytes()).map_err(io_error(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE_NAME;

    const STUB: &str = "##from django.db import models\n##\nclass {class_name}(models.Model):\n    pass\n";

    fn project() -> (tempfile::TempDir, ProjectConfig) {
        let tmp = tempfile::tempdir().unwrap();
        let config = ProjectConfig::defaults(tmp.path().join(CONFIG_FILE_NAME));
        fs::create_dir_all(tmp.path().join("core/apps/shop")).unwrap();
        (tmp, config)
    }

    fn request(kinds: &[&str]) -> GenerateRequest {
        GenerateRequest {
            file_name: "product".to_string(),
            name: "product".to_string(),
            app: "shop".to_string(),
            kinds: kinds.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn test_render_full_keeps_headers() {
        let out = render_stub(STUB, StubMode::Full, "ProductModel", "product");
        assert_eq!(
            out,
            "from django.db import models\n\nclass ProductModel(models.Model):\n    pass\n"
        );
    }

    #[test]
    fn test_render_append_drops_headers() {
        let out = render_stub(STUB, StubMode::Append, "ProductModel", "product");
        assert_eq!(out, "\nclass ProductModel(models.Model):\n    pass\n");
    }

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("product", "model"), "ProductModel");
        assert_eq!(class_name("orderItem", "serializer"), "OrderitemSerializer");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_builtin_stubs_cover_all_kinds() {
        for kind in COMPONENT_KINDS {
            let stub = builtin_stub(kind).unwrap();
            assert!(stub.contains("{class_name}"), "{}", kind);
        }
        assert!(builtin_stub("init").unwrap().contains("{file_name}"));
        assert!(builtin_stub("widget").is_none());
    }

    #[test]
    fn test_list_apps_skips_logs_and_dunders() {
        let (tmp, config) = project();
        let apps = tmp.path().join("core/apps");
        fs::create_dir(apps.join("logs")).unwrap();
        fs::create_dir(apps.join("__pycache__")).unwrap();
        fs::create_dir(apps.join("accounts")).unwrap();
        fs::write(apps.join("__init__.py"), "").unwrap();

        let generator = Generator::new(&config, tmp.path());
        assert_eq!(generator.list_apps().unwrap(), vec!["accounts", "shop"]);
    }

    #[test]
    fn test_generate_creates_file_and_export() {
        let (tmp, config) = project();
        let generator = Generator::new(&config, tmp.path());

        let files = generator.generate(&request(&["model", "admin"])).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.appended));
        let models = tmp.path().join("core/apps/shop/models");
        let model = fs::read_to_string(models.join("product.py")).unwrap();
        assert!(model.starts_with("from django.db import models"));
        assert!(model.contains("class ProductModel(models.Model):"));
        assert!(!model.contains("##"));
        assert_eq!(
            fs::read_to_string(models.join("__init__.py")).unwrap(),
            "from .product import *  # noqa\n"
        );
        assert!(tmp.path().join("core/apps/shop/admin/product.py").is_file());
    }

    #[test]
    fn test_generate_appends_to_existing_file() {
        let (tmp, config) = project();
        let generator = Generator::new(&config, tmp.path());
        generator.generate(&request(&["model"])).unwrap();

        let mut second = request(&["model"]);
        second.name = "category".to_string();
        let files = generator.generate(&second).unwrap();

        assert!(files[0].appended);
        let models = tmp.path().join("core/apps/shop/models");
        let model = fs::read_to_string(models.join("product.py")).unwrap();
        assert!(model.contains("class ProductModel"));
        assert!(model.contains("\n\nclass CategoryModel"));
        assert_eq!(model.matches("from django.db import models").count(), 1);
        let init = fs::read_to_string(models.join("__init__.py")).unwrap();
        assert_eq!(init.matches("from .product import *").count(), 1);
    }

    #[test]
    fn test_stub_override_on_disk() {
        let (tmp, config) = project();
        fs::write(tmp.path().join("form.stub"), "class {class_name}Custom:\n    pass\n").unwrap();
        let generator = Generator::new(&config, tmp.path());

        generator.generate(&request(&["form"])).unwrap();

        let form = fs::read_to_string(tmp.path().join("core/apps/shop/forms/product.py")).unwrap();
        assert_eq!(form, "class ProductFormCustom:\n    pass\n");
    }

    #[test]
    fn test_rejects_bad_requests() {
        let (tmp, config) = project();
        let generator = Generator::new(&config, tmp.path());

        let err = generator.generate(&request(&["widget"])).unwrap_err();
        assert!(matches!(err, GenerateError::UnknownKind(_)));

        let mut missing_app = request(&["model"]);
        missing_app.app = "billing".to_string();
        assert!(matches!(
            generator.generate(&missing_app).unwrap_err(),
            GenerateError::AppNotFound(_)
        ));

        let mut bad_file = request(&["model"]);
        bad_file.file_name = "../escape".to_string();
        assert!(matches!(
            generator.generate(&bad_file).unwrap_err(),
            GenerateError::InvalidFileName(_)
        ));
        assert!(!tmp.path().join("core/apps/shop/models").exists());
    }
}
