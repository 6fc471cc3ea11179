use std::path::PathBuf;

use thiserror::Error;

/// A selector document or run configuration that cannot be used.
///
/// Always fatal: the run aborts before any tree file is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid pattern '{pattern}' in configuration: {message}")]
    Pattern { pattern: String, message: String },
}

/// A single tree file that cannot be analyzed. Recoverable: the file is skipped.
#[derive(Debug, Error)]
pub enum TreeReadError {
    #[error("failed to read tree file '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tree file '{}' is not a valid node document: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("tree file '{}' is malformed: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

impl TreeReadError {
    pub fn path(&self) -> &PathBuf {
        match self {
            TreeReadError::Io { path, .. }
            | TreeReadError::Json { path, .. }
            | TreeReadError::Malformed { path, .. } => path,
        }
    }
}
