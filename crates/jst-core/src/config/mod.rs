//! Project configuration (`jst.json`)
//!
//! The file is optional. Whatever it contains is merged over the built-in
//! defaults key by key, so a file that only sets `dirs.apps` keeps every other
//! default directory.

use serde_json::{json, Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "jst.json";
pub const DEFAULT_APPS_PATH: &str = "./core/apps/";
pub const DEFAULT_IMPORT_PATH: &str = "core.apps.";

/// Component kinds that have a directory and a stub
pub const COMPONENT_KINDS: &[&str] = &[
    "model",
    "serializer",
    "view",
    "permission",
    "admin",
    "test",
    "translation",
    "validator",
    "form",
    "filter",
    "signal",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration in {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuration file already exists: {}", .path.display())]
    AlreadyExists { path: PathBuf },
}

/// The built-in configuration
pub fn default_config() -> Value {
    let stubs: Map<String, Value> = std::iter::once("init")
        .chain(COMPONENT_KINDS.iter().copied())
        .map(|kind| {
            let file = if kind == "init" {
                "__init__.stub".to_string()
            } else {
                format!("{}.stub", kind)
            };
            (kind.to_string(), Value::String(file))
        })
        .collect();

    json!({
        "dirs": {
            "apps": DEFAULT_APPS_PATH,
            "models": "models/",
            "serializers": "serializers/",
            "views": "views/",
            "permissions": "permissions/",
            "admin": "admin/",
            "tests": "tests/",
            "translation": "translation/",
            "validators": "validators/",
            "forms": "forms/",
            "filters": "filters/",
            "signals": "signals/",
        },
        "import_path": DEFAULT_IMPORT_PATH,
        "stubs": stubs,
    })
}

/// Configuration of one project, bound to the file it was loaded from
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    path: PathBuf,
    values: Value,
}

impl ProjectConfig {
    /// Defaults only, without touching the filesystem
    pub fn defaults(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: default_config(),
        }
    }

    /// Load `path`, falling back to the defaults when it does not exist
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                return Ok(Self::defaults(path));
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        let loaded: Value = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        if !loaded.is_object() {
            return Err(ConfigError::Invalid {
                path,
                message: "configuration must be a JSON object".to_string(),
            });
        }

        let mut values = default_config();
        merge(&mut values, loaded);
        validate(&values).map_err(|message| ConfigError::Invalid {
            path: path.clone(),
            message,
        })?;

        debug!(path = %path.display(), "Loaded configuration");
        Ok(Self { path, values })
    }

    /// Write the default configuration to `path`; an existing file is never overwritten
    pub fn init(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::defaults(path);
        if config.path.exists() {
            return Err(ConfigError::AlreadyExists { path: config.path });
        }
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        validate(&self.values).map_err(|message| ConfigError::Invalid {
            path: self.path.clone(),
            message,
        })?;

        let write_error = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        let mut content = serde_json::to_string_pretty(&self.values)
            .map_err(|e| write_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        content.push('\n');
        std::fs::write(&self.path, content).map_err(write_error)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a dot-separated key such as `dirs.apps`
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.values, |current, part| current.as_object()?.get(part))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Set a dot-separated key, creating intermediate objects as needed
    ///
    /// Only the in-memory values change; call [`save`](Self::save) to persist them.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::Invalid {
            path: self.path.clone(),
            message,
        };

        let parts: Vec<&str> = key.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid(format!("invalid key '{}'", key)));
        }

        let mut updated = self.values.clone();
        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return Err(invalid(format!("invalid key '{}'", key))),
        };

        let mut current = &mut updated;
        for part in parents {
            let object = current
                .as_object_mut()
                .ok_or_else(|| invalid(format!("'{}' is not an object", key)))?;
            current = object
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        current
            .as_object_mut()
            .ok_or_else(|| invalid(format!("'{}' is not an object", key)))?
            .insert(last.to_string(), value);

        validate(&updated).map_err(invalid)?;
        self.values = updated;
        Ok(())
    }

    /// Directory of a component kind inside an app
    ///
    /// Looks up the plural key first (`dirs.models`), then the kind itself
    /// (`dirs.admin`), and falls back to `<kind>s/`.
    pub fn component_dir(&self, kind: &str) -> String {
        self.get_str(&format!("dirs.{}s", kind))
            .or_else(|| self.get_str(&format!("dirs.{}", kind)))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}s/", kind))
    }

    /// Root directory holding the project's apps
    pub fn apps_path(&self) -> &str {
        self.get_str("dirs.apps").unwrap_or(DEFAULT_APPS_PATH)
    }

    /// Python import prefix of the apps root
    pub fn import_path(&self) -> &str {
        self.get_str("import_path").unwrap_or(DEFAULT_IMPORT_PATH)
    }

    /// File name of the stub registered for `name`
    pub fn stub_file(&self, name: &str) -> String {
        self.get_str(&format!("stubs.{}", name))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.stub", name))
    }
}

/// Recursively merge `overlay` into `base`; objects merge, everything else replaces
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn validate(values: &Value) -> Result<(), String> {
    let object = values
        .as_object()
        .ok_or_else(|| "configuration must be a JSON object".to_string())?;

    for key in ["dirs", "stubs"] {
        if object.get(key).is_some_and(|v| !v.is_object()) {
            return Err(format!("'{}' must be an object", key));
        }
    }
    if object.get("import_path").is_some_and(|v| !v.is_string()) {
        return Err("'import_path' must be a string".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(tmp.path().join(CONFIG_FILE_NAME)).unwrap();

        assert_eq!(config.apps_path(), "./core/apps/");
        assert_eq!(config.import_path(), "core.apps.");
        assert_eq!(config.stub_file("init"), "__init__.stub");
        assert_eq!(config.stub_file("model"), "model.stub");
    }

    #[test]
    fn test_partial_file_keeps_nested_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), r#"{"dirs": {"apps": "./src/apps/"}}"#);

        let config = ProjectConfig::load(path).unwrap();

        assert_eq!(config.apps_path(), "./src/apps/");
        assert_eq!(config.component_dir("model"), "models/");
        assert_eq!(config.import_path(), "core.apps.");
    }

    #[test]
    fn test_component_dir_lookup() {
        let config = ProjectConfig::defaults(CONFIG_FILE_NAME);

        assert_eq!(config.component_dir("view"), "views/");
        assert_eq!(config.component_dir("admin"), "admin/");
        assert_eq!(config.component_dir("translation"), "translation/");
        assert_eq!(config.component_dir("widget"), "widgets/");
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), "{not json");

        let err = ProjectConfig::load(path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_invalid_shapes_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        for content in [r#"[1, 2]"#, r#"{"dirs": "apps"}"#, r#"{"stubs": []}"#, r#"{"import_path": 3}"#] {
            let path = write_config(tmp.path(), content);
            let err = ProjectConfig::load(path).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{}", content);
        }
    }

    #[test]
    fn test_get_with_dot_path() {
        let config = ProjectConfig::defaults(CONFIG_FILE_NAME);

        assert_eq!(config.get_str("dirs.forms"), Some("forms/"));
        assert!(config.get("dirs").unwrap().is_object());
        assert!(config.get("dirs.missing").is_none());
        assert!(config.get("import_path.nested").is_none());
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut config = ProjectConfig::defaults(CONFIG_FILE_NAME);

        config.set("extra.deep.key", json!("value")).unwrap();
        config.set("dirs.models", json!("db/models/")).unwrap();

        assert_eq!(config.get_str("extra.deep.key"), Some("value"));
        assert_eq!(config.component_dir("model"), "db/models/");
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = ProjectConfig::defaults(CONFIG_FILE_NAME);

        assert!(config.set("import_path", json!(42)).is_err());
        assert!(config.set("import_path.child", json!("x")).is_err());
        assert!(config.set("dirs..apps", json!("x")).is_err());
        assert_eq!(config.import_path(), "core.apps.");
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        let mut config = ProjectConfig::defaults(&path);
        config.set("import_path", json!("apps.")).unwrap();
        config.save().unwrap();

        let reloaded = ProjectConfig::load(&path).unwrap();
        assert_eq!(reloaded.import_path(), "apps.");
        assert_eq!(reloaded.apps_path(), "./core/apps/");
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);

        ProjectConfig::init(&path).unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, default_config());

        std::fs::write(&path, r#"{"import_path": "custom."}"#).unwrap();
        let err = ProjectConfig::init(&path).unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists { .. }));
        assert!(std::fs::read_to_string(&path).unwrap().contains("custom."));
    }
}
