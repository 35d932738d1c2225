/*!
Error types for the autobackup core engine.
*/

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type used throughout the autobackup core.
pub type Result<T> = std::result::Result<T, AutoBackupError>;

/// Errors that can occur while backing up or restoring profiles.
#[derive(Error, Debug)]
pub enum AutoBackupError {
    /// I/O errors during file operations
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A snapshot that parsed but is missing its identity block or session id
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// A session identifier that is not a 24 character hex object id
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// Session store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AutoBackupError {
    /// Wrap an I/O error with the path it happened on
    pub fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a new invalid snapshot error
    pub fn invalid_snapshot<S: Into<String>>(msg: S) -> Self {
        Self::InvalidSnapshot(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// True when the underlying cause is a missing file or directory
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
