//! Module names supplied by the operator

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleNameError {
    #[error("Module name cannot be empty")]
    Empty,

    #[error("Module name '{0}' must not contain whitespace")]
    Whitespace(String),

    #[error("Module name '{0}' must be a single directory name")]
    NotADirectoryName(String),
}

/// Name of an installed module, also used as its directory name and import name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleName(String);

impl ModuleName {
    pub fn parse(raw: &str) -> Result<Self, ModuleNameError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ModuleNameError::Empty);
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ModuleNameError::Whitespace(name.to_string()));
        }
        if name == "." || name == ".." || name.contains(&['/', '\\'][..]) {
            return Err(ModuleNameError::NotADirectoryName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// Parse a comma-separated list, dropping blank entries
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, ModuleNameError> {
        raw.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
