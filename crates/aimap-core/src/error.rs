//! Error taxonomy shared by every extractor, renderer and the pipeline.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AimapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid API description: {0}")]
    InvalidSpec(String),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),
}

impl From<postgres::Error> for AimapError {
    fn from(err: postgres::Error) -> Self {
        AimapError::Database(err.to_string())
    }
}

impl From<mysql::Error> for AimapError {
    fn from(err: mysql::Error) -> Self {
        AimapError::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AimapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let err: AimapError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, AimapError::Io(_)));
        assert_eq!(err.to_string(), "IO error: gone");
    }

    #[test]
    fn path_not_found_message() {
        let err = AimapError::PathNotFound(PathBuf::from("/nope"));
        assert_eq!(err.to_string(), "Path not found: /nope");
    }
}
