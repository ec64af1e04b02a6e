use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Document load error: {0}")]
    Load(#[from] LoadError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure to fetch or parse a single document.
///
/// `Clone` is required so one failed load can be handed to every caller that
/// raced on the same path in the document cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Document not found: {path}")]
    NotFound { path: String },

    #[error("Failed to read document: {path} - {details}")]
    Io { path: String, details: String },

    #[error("Document is not parsable: {path} - {details}")]
    Unparsable { path: String, details: String },
}

impl LoadError {
    pub fn from_io(path: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_string(),
            },
            std::io::ErrorKind::InvalidData => LoadError::Unparsable {
                path: path.to_string(),
                details: err.to_string(),
            },
            _ => LoadError::Io {
                path: path.to_string(),
                details: err.to_string(),
            },
        }
    }

    pub fn path(&self) -> &str {
        match self {
            LoadError::NotFound { path }
            | LoadError::Io { path, .. }
            | LoadError::Unparsable { path, .. } => path,
        }
    }
}

/// Failure raised by a validator while inspecting one document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    #[error("{details}")]
    Failed { details: String },

    #[error("panicked: {details}")]
    Panicked { details: String },
}

impl ExtensionError {
    pub fn failed(details: impl Into<String>) -> Self {
        ExtensionError::Failed {
            details: details.into(),
        }
    }
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unknown extension: {name}")]
    UnknownExtension { name: String },

    #[error("Extension registered twice: {name}")]
    DuplicateExtension { name: String },

    #[error("Invalid glob pattern '{pattern}': {details}")]
    InvalidPattern { pattern: String, details: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
