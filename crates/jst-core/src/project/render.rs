//! Template rendering
//!
//! Project templates are Jinja: `{{ cookiecutter.<key> }}` expressions,
//! `{% if %}` / `{% for %}` blocks and filters, in path components and in UTF-8
//! file contents. Files that are not valid UTF-8 are copied byte for byte.

use super::{Context, CreateError};
use minijinja::{AutoEscape, Environment, ErrorKind, Output, State, UndefinedBehavior, Value};
use minijinja::value::ValueKind;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Turns a template directory into a project directory
pub trait ProjectRenderer {
    /// Render one template string; `name` identifies it in error messages
    fn render_str(&self, name: &str, source: &str, context: &Context) -> Result<String, CreateError>;

    /// Render `template_root` (itself a templated directory name) into `output_dir`
    ///
    /// Returns the path of the rendered project root. A failure removes
    /// whatever was written.
    fn render(&self, template_root: &Path, output_dir: &Path, context: &Context) -> Result<PathBuf, CreateError> {
        let root_name = template_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CreateError::TemplateLayout {
                reason: format!("'{}' has no directory name", template_root.display()),
            })?;
        let root_name = rendered_component(self, &root_name, &root_name, context)?;

        let target = output_dir.join(&root_name);
        if target.exists() {
            return Err(CreateError::TargetExists { path: target });
        }

        if let Err(e) = render_tree(self, template_root, &target, context) {
            let _ = fs::remove_dir_all(&target);
            return Err(e);
        }
        Ok(target)
    }
}

/// Jinja renderer with the context exposed as `cookiecutter`
///
/// Undefined variables are errors, nothing is HTML-escaped, trailing newlines
/// are kept and booleans print as `True` / `False`.
pub struct JinjaRenderer {
    env: Environment<'static>,
}

impl JinjaRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_formatter(python_formatter);
        Self { env }
    }
}

impl Default for JinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectRenderer for JinjaRenderer {
    fn render_str(&self, name: &str, source: &str, context: &Context) -> Result<String, CreateError> {
        let ctx = minijinja::context! { cookiecutter => Value::from_serialize(context) };
        self.env
            .render_named_str(name, source, ctx)
            .map_err(|source| CreateError::Render {
                path: PathBuf::from(name),
                source,
            })
    }
}

fn python_formatter(out: &mut Output<'_>, state: &State<'_, '_>, value: &Value) -> Result<(), minijinja::Error> {
    let text = match value.kind() {
        ValueKind::Bool if value.is_true() => "True",
        ValueKind::Bool => "False",
        ValueKind::None => "None",
        _ => return minijinja::escape_formatter(out, state, value),
    };
    out.write_str(text)
        .map_err(|_| minijinja::Error::new(ErrorKind::WriteFailure, "failed to write output"))
}

/// Render one path component, which must stay a single non-empty name
fn rendered_component<R: ProjectRenderer + ?Sized>(
    renderer: &R,
    name: &str,
    component: &str,
    context: &Context,
) -> Result<String, CreateError> {
    if !component.contains("{{") && !component.contains("{%") {
        return Ok(component.to_string());
    }
    let rendered = renderer.render_str(name, component, context)?;
    let mut parts = Path::new(&rendered).components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(_)), None) => Ok(rendered),
        _ => Err(CreateError::TemplateLayout {
            reason: format!("'{}' renders to '{}'", component, rendered),
        }),
    }
}

fn render_tree<R: ProjectRenderer + ?Sized>(
    renderer: &R,
    template_root: &Path,
    target: &Path,
    context: &Context,
) -> Result<(), CreateError> {
    let mut files = 0usize;
    for entry in WalkDir::new(template_root).sort_by_file_name() {
        let entry = entry.map_err(|e| CreateError::Io {
            path: template_root.to_path_buf(),
            source: e.into(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(template_root)
            .map_err(|_| CreateError::TemplateLayout {
                reason: format!("unexpected path {}", entry.path().display()),
            })?;
        let name = relative.display().to_string();

        let mut out = target.to_path_buf();
        for component in relative.components() {
            out.push(rendered_component(
                renderer,
                &name,
                &component.as_os_str().to_string_lossy(),
                context,
            )?);
        }

        let io_error = |source| CreateError::Io {
            path: out.clone(),
            source,
        };
        if entry.file_type().is_dir() {
            fs::create_dir_all(&out).map_err(io_error)?;
            continue;
        }

        let bytes = fs::read(entry.path()).map_err(|source| CreateError::Io {
            path: entry.path().to_path_buf(),
            source,
        })?;
        match String::from_utf8(bytes) {
            Ok(text) => fs::write(&out, renderer.render_str(&name, &text, context)?).map_err(io_error)?,
            Err(binary) => fs::write(&out, binary.into_bytes()).map_err(io_error)?,
        }

        #[cfg(unix)]
        if let Ok(metadata) = entry.metadata() {
            fs::set_permissions(&out, metadata.permissions()).map_err(io_error)?;
        }
        files += 1;
    }

    debug!(files, target = %target.display(), "Rendered template");
    Ok(())
}
