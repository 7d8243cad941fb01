//! Error types for the bulk edit engine

use std::fmt;
use std::path::PathBuf;

use bulkedit_files::FileError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Span;

/// Result type for bulk edit operations
pub type Result<T> = std::result::Result<T, BulkEditError>;

/// Errors that can occur while validating, running or rolling back a bulk edit
#[derive(Debug, Error)]
pub enum BulkEditError {
    /// Request rejected before any file was touched
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A file pattern matched nothing
    #[error("Pattern matched no files: {pattern}")]
    FileResolution {
        /// The pattern as given by the caller
        pattern: String,
    },

    /// The file could not be read while checking the condition
    #[error("Condition could not be evaluated for {path}: {reason}")]
    ConditionEvaluation {
        /// File being checked
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// Two or more edits on the same file overlap
    #[error("{}", describe_conflicts(.conflicts))]
    EditConflict {
        /// Every colliding pair
        conflicts: Vec<EditConflict>,
    },

    /// An edit addresses a position outside the document
    #[error("Edit out of range: {0}")]
    EditOutOfRange(String),

    /// Read or write failure on a target file
    #[error("IO error on {path}: {message}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying failure
        message: String,
    },

    /// Capturing or restoring a pre-image failed
    #[error("Backup error: {0}")]
    Backup(String),

    /// No rollback session with this id
    #[error("Rollback session not found: {0}")]
    RollbackSessionNotFound(String),

    /// Some files of a session could not be restored
    #[error("Rollback of session {session_id} restored {restored} file(s), {failed} failed")]
    RollbackPartialFailure {
        /// Session that was rolled back
        session_id: String,
        /// Files restored
        restored: usize,
        /// Files left unrestored
        failed: usize,
    },

    /// The run was cancelled before this work happened
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker stopped without reporting on its file
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine-readable error category carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`BulkEditError::InvalidRequest`]
    InvalidRequest,
    /// See [`BulkEditError::FileResolution`]
    FileResolution,
    /// See [`BulkEditError::ConditionEvaluation`]
    ConditionEvaluation,
    /// See [`BulkEditError::EditConflict`]
    EditConflict,
    /// See [`BulkEditError::EditOutOfRange`]
    EditOutOfRange,
    /// See [`BulkEditError::Io`]
    Io,
    /// See [`BulkEditError::Backup`]
    Backup,
    /// See [`BulkEditError::RollbackSessionNotFound`]
    RollbackSessionNotFound,
    /// See [`BulkEditError::RollbackPartialFailure`]
    RollbackPartialFailure,
    /// See [`BulkEditError::Cancelled`]
    Cancelled,
    /// See [`BulkEditError::Config`]
    Config,
    /// See [`BulkEditError::Internal`]
    Internal,
}

impl BulkEditError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BulkEditError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            BulkEditError::FileResolution { .. } => ErrorKind::FileResolution,
            BulkEditError::ConditionEvaluation { .. } => ErrorKind::ConditionEvaluation,
            BulkEditError::EditConflict { .. } => ErrorKind::EditConflict,
            BulkEditError::EditOutOfRange(_) => ErrorKind::EditOutOfRange,
            BulkEditError::Io { .. } => ErrorKind::Io,
            BulkEditError::Backup(_) => ErrorKind::Backup,
            BulkEditError::RollbackSessionNotFound(_) => ErrorKind::RollbackSessionNotFound,
            BulkEditError::RollbackPartialFailure { .. } => ErrorKind::RollbackPartialFailure,
            BulkEditError::Cancelled => ErrorKind::Cancelled,
            BulkEditError::Config(_) => ErrorKind::Config,
            BulkEditError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Attaches this error to a file for reporting
    pub fn for_path(&self, path: impl Into<PathBuf>) -> PerFileError {
        PerFileError {
            path: path.into(),
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<FileError> for BulkEditError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::SessionNotFound(id) => BulkEditError::RollbackSessionNotFound(id),
            FileError::BackupFailed(_) | FileError::BackupCorrupted(_) => {
                BulkEditError::Backup(err.to_string())
            }
            FileError::InvalidPattern { pattern, reason } => {
                BulkEditError::InvalidRequest(format!("invalid pattern '{}': {}", pattern, reason))
            }
            FileError::InvalidPath(reason) => BulkEditError::InvalidRequest(reason),
            FileError::NotFound(ref path)
            | FileError::PermissionDenied(ref path)
            | FileError::InvalidContent { ref path, .. }
            | FileError::Io { ref path, .. } => BulkEditError::Io {
                path: path.clone(),
                message: err.to_string(),
            },
            FileError::Serialization(e) => BulkEditError::Backup(e.to_string()),
        }
    }
}

impl From<config::ConfigError> for BulkEditError {
    fn from(err: config::ConfigError) -> Self {
        BulkEditError::Config(err.to_string())
    }
}

/// A pair of edits whose spans intersect
///
/// Indices refer to the edit list as submitted for the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditConflict {
    /// Index of the earlier edit in the pair
    pub first: usize,
    /// Index of the later edit in the pair
    pub second: usize,
    /// Span of `first`
    pub first_span: Span,
    /// Span of `second`
    pub second_span: Span,
}

impl fmt::Display for EditConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "edit #{} {} overlaps edit #{} {}",
            self.first, self.first_span, self.second, self.second_span
        )
    }
}

fn describe_conflicts(conflicts: &[EditConflict]) -> String {
    let pairs: Vec<String> = conflicts.iter().map(ToString::to_string).collect();
    format!("Edit conflict ({} pair(s)): {}", conflicts.len(), pairs.join("; "))
}

/// Error entry reported for one file, enough to retry exactly that file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerFileError {
    /// File (or unresolved pattern) the error belongs to
    pub path: PathBuf,
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    #[test]
    fn test_file_error_mapping() {
        let err: BulkEditError = FileError::NotFound(PathBuf::from("/w/a.txt")).into();
        assert_eq!(err.kind(), ErrorKind::Io);

        let err: BulkEditError = FileError::SessionNotFound("abc".to_string()).into();
        assert!(matches!(err, BulkEditError::RollbackSessionNotFound(id) if id == "abc"));

        let err: BulkEditError = FileError::BackupCorrupted(PathBuf::from("/w/a.txt")).into();
        assert_eq!(err.kind(), ErrorKind::Backup);
    }

    #[test]
    fn test_conflict_message_lists_every_pair() {
        let span = |l1, c1, l2, c2| Span::new(Position::new(l1, c1), Position::new(l2, c2));
        let err = BulkEditError::EditConflict {
            conflicts: vec![
                EditConflict {
                    first: 0,
                    second: 1,
                    first_span: span(0, 0, 0, 5),
                    second_span: span(0, 3, 0, 8),
                },
                EditConflict {
                    first: 1,
                    second: 2,
                    first_span: span(0, 3, 0, 8),
                    second_span: span(0, 6, 0, 9),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("2 pair(s)"));
        assert!(message.contains("edit #0"));
        assert!(message.contains("edit #2"));
    }

    #[test]
    fn test_error_kind_wire_names() {
        let entry = BulkEditError::FileResolution {
            pattern: "missing/*.rs".to_string(),
        }
        .for_path("missing/*.rs");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "file_resolution");
    }
}
