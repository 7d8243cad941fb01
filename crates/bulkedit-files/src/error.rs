//! Error types for file and rollback-store operations

use std::path::{Path, PathBuf};

/// Result type for file operations
pub type Result<T> = std::result::Result<T, FileError>;

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// File not found at the specified path
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied for the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File content is not valid UTF-8 text
    #[error("Invalid content in {path}: {reason}")]
    InvalidContent {
        /// Offending file
        path: PathBuf,
        /// Why the content was rejected
        reason: String,
    },

    /// Invalid path provided
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid glob pattern
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as given
        pattern: String,
        /// Parser message
        reason: String,
    },

    /// Backup operation failed
    #[error("Backup failed: {0}")]
    BackupFailed(String),

    /// Backup integrity check failed: hash mismatch
    #[error("Backup integrity check failed for {0}: hash mismatch")]
    BackupCorrupted(PathBuf),

    /// Rollback session does not exist
    #[error("Rollback session not found: {0}")]
    SessionNotFound(String),

    /// IO error
    #[error("IO error on {path}: {source}")]
    Io {
        /// Path involved in the failed call
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Session metadata could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FileError {
    /// Maps an IO error to the most specific variant for `path`
    pub fn from_io(err: std::io::Error, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                FileError::PermissionDenied(path.to_path_buf())
            }
            std::io::ErrorKind::InvalidData => FileError::InvalidContent {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
            _ => FileError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Whether the error means the target does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, FileError::NotFound(_))
    }
}
