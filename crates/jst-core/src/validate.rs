//! Input validators shared by prompts and commands

use std::path::Path;
use thiserror::Error;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_MODULE_PATH_PARTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: String },

    #[error("Project name must contain at least one letter and only alphanumeric characters")]
    ProjectName,

    #[error("Phone number must be 10-15 digits")]
    PhoneNumber,

    #[error("Invalid path format. Expected: app_name/file_name/model_name")]
    ModulePath,

    #[error("Path does not exist: {0}")]
    PathMissing(String),

    #[error("Path already exists: {0}")]
    PathExists(String),

    #[error("Password must be at least {min} characters long")]
    WeakPassword { min: usize },

    #[error("Port must be a valid number")]
    PortNotNumber,

    #[error("Port must be between 1 and 65535")]
    PortOutOfRange,

    #[error("Value must be a positive number")]
    NotPositive,
}

fn empty(field: &str) -> ValidationError {
    ValidationError::Empty {
        field: field.to_string(),
    }
}

/// ASCII letters and digits only, with at least one letter
pub fn validate_project_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(empty("Name"));
    }
    let alphanumeric = name.chars().all(|c| c.is_ascii_alphanumeric());
    let has_letter = name.chars().any(|c| c.is_ascii_alphabetic());
    if !alphanumeric || !has_letter {
        return Err(ValidationError::ProjectName);
    }
    Ok(())
}

/// 10 to 15 ASCII digits
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    if phone.trim().is_empty() {
        return Err(empty("Phone number"));
    }
    if !(10..=15).contains(&phone.len()) || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PhoneNumber);
    }
    Ok(())
}

/// Split `app/file/name` style paths, requiring at least three parts
pub fn validate_module_path(path: &str) -> Result<Vec<String>, ValidationError> {
    if path.trim().is_empty() {
        return Err(empty("Path"));
    }
    let parts: Vec<String> = path.split('/').map(str::to_string).collect();
    if parts.len() < MIN_MODULE_PATH_PARTS {
        return Err(ValidationError::ModulePath);
    }
    Ok(parts)
}

/// Require `path` to exist (`must_exist`) or to be absent
pub fn validate_path_exists(path: &Path, must_exist: bool) -> Result<(), ValidationError> {
    match (must_exist, path.exists()) {
        (true, false) => Err(ValidationError::PathMissing(path.display().to_string())),
        (false, true) => Err(ValidationError::PathExists(path.display().to_string())),
        _ => Ok(()),
    }
}

pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(empty("Value"));
    }
    Ok(())
}

pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::WeakPassword {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

pub fn validate_port(port: &str) -> Result<(), ValidationError> {
    let port: i64 = port
        .trim()
        .parse()
        .map_err(|_| ValidationError::PortNotNumber)?;
    if !(1..=65535).contains(&port) {
        return Err(ValidationError::PortOutOfRange);
    }
    Ok(())
}

/// Positive integer, used for the line length question
pub fn validate_positive_number(value: &str) -> Result<(), ValidationError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(()),
        _ => Err(ValidationError::NotPositive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name() {
        assert!(validate_project_name("shop").is_ok());
        assert!(validate_project_name("shop2024").is_ok());
        assert_eq!(validate_project_name("2024"), Err(ValidationError::ProjectName));
        assert_eq!(validate_project_name("my-shop"), Err(ValidationError::ProjectName));
        assert_eq!(validate_project_name("my shop"), Err(ValidationError::ProjectName));
        assert!(matches!(validate_project_name("  "), Err(ValidationError::Empty { .. })));
    }

    #[test]
    fn test_phone_number() {
        assert!(validate_phone_number("998000000000").is_ok());
        assert!(validate_phone_number("1234567890").is_ok());
        assert_eq!(validate_phone_number("123456789"), Err(ValidationError::PhoneNumber));
        assert_eq!(validate_phone_number("1234567890123456"), Err(ValidationError::PhoneNumber));
        assert_eq!(validate_phone_number("+998000000000"), Err(ValidationError::PhoneNumber));
    }

    #[test]
    fn test_module_path() {
        assert_eq!(
            validate_module_path("shop/models/Product").unwrap(),
            vec!["shop", "models", "Product"]
        );
        assert_eq!(validate_module_path("shop/models"), Err(ValidationError::ModulePath));
        assert!(validate_module_path("").is_err());
    }

    #[test]
    fn test_path_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing");

        assert!(validate_path_exists(tmp.path(), true).is_ok());
        assert!(validate_path_exists(&missing, false).is_ok());
        assert!(matches!(validate_path_exists(&missing, true), Err(ValidationError::PathMissing(_))));
        assert!(matches!(validate_path_exists(tmp.path(), false), Err(ValidationError::PathExists(_))));
    }

    #[test]
    fn test_password_and_port() {
        assert!(validate_password_strength("admin123").is_ok());
        assert_eq!(
            validate_password_strength("short"),
            Err(ValidationError::WeakPassword { min: 8 })
        );

        assert!(validate_port("8081").is_ok());
        assert!(validate_port("65535").is_ok());
        assert_eq!(validate_port("0"), Err(ValidationError::PortOutOfRange));
        assert_eq!(validate_port("70000"), Err(ValidationError::PortOutOfRange));
        assert_eq!(validate_port("http"), Err(ValidationError::PortNotNumber));
    }

    #[test]
    fn test_not_empty_and_positive() {
        assert!(validate_not_empty("x").is_ok());
        assert!(validate_not_empty(" ").is_err());
        assert!(validate_positive_number("120").is_ok());
        assert!(validate_positive_number("0").is_err());
        assert!(validate_positive_number("wide").is_err());
    }
}
