use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid schema entry '{key}': {reason}")]
    InvalidSchema { key: String, reason: String },

    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Unknown keys in configuration: {}", .0.join(", "))]
    UnknownKeys(Vec<String>),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] confique::Error),

    #[error("No store path configured — call .path() or .app_name() on the builder")]
    PathRequired,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// One key that failed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    /// Dotted path of the offending key.
    pub key: String,
    pub reason: String,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.key, self.reason)
    }
}

/// Every failure found in one validation pass. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub failures: Vec<ValidationFailure>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration is invalid")?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
