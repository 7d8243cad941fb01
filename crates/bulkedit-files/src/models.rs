//! Data models for file and rollback-store operations

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File metadata returned by a [`crate::FileSystem`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    /// File path
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Whether the path is a regular file
    pub is_file: bool,
    /// Last modification time
    pub modified: Option<DateTime<Utc>>,
    /// Whether the file is read-only
    pub is_readonly: bool,
}

/// A rollback session: the pre-edit content captured during one or more runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackSession {
    /// Opaque session id returned to callers as `rollbackId`
    pub id: String,
    /// When the first capture happened
    pub created_at: DateTime<Utc>,
    /// When the session becomes eligible for the expiry sweep
    pub expires_at: DateTime<Utc>,
    /// Captured files keyed by absolute path
    pub entries: BTreeMap<PathBuf, RollbackEntry>,
}

impl RollbackSession {
    /// Whether the session is past its expiry time
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Looks up the entry for a file
    pub fn entry(&self, path: &Path) -> Option<&RollbackEntry> {
        self.entries.get(path)
    }

    /// Summary used when listing sessions
    pub fn summary(&self) -> RollbackSessionSummary {
        RollbackSessionSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            file_count: self.entries.len(),
            total_bytes: self.entries.values().map(|e| e.size).sum(),
        }
    }
}

/// Pre-image of one file inside a rollback session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackEntry {
    /// Absolute path of the captured file
    pub file_path: PathBuf,
    /// SHA-256 of the original content
    pub checksum: String,
    /// Size of the original content in bytes
    pub size: u64,
    /// Blob file name inside the session directory
    pub blob: String,
    /// When the content was captured
    pub captured_at: DateTime<Utc>,
    /// SHA-256 of the content written by the edit, if it was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_checksum: Option<String>,
}

/// Listing view of a rollback session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackSessionSummary {
    /// Session id
    pub id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
    /// Number of captured files
    pub file_count: usize,
    /// Total size of captured content
    pub total_bytes: u64,
}

/// Represents a diff between two file versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path of the file
    pub path: PathBuf,
    /// List of hunks (sections of changes)
    pub hunks: Vec<DiffHunk>,
    /// Statistics about the diff
    pub stats: DiffStats,
}

/// A hunk is a section of changes in a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// Starting line number in the old file (1-based, as in unified diffs)
    pub old_start: usize,
    /// Number of lines in the old file
    pub old_count: usize,
    /// Starting line number in the new file (1-based)
    pub new_start: usize,
    /// Number of lines in the new file
    pub new_count: usize,
    /// Lines in this hunk
    pub lines: Vec<DiffLine>,
}

/// A single line in a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffLine {
    /// Context line (unchanged)
    Context(String),
    /// Added line
    Added(String),
    /// Removed line
    Removed(String),
    /// The line before it has no trailing newline
    NoNewline,
}

/// Statistics about a diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    /// Number of lines added
    pub additions: usize,
    /// Number of lines deleted
    pub deletions: usize,
    /// Number of files changed
    pub files_changed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, size: u64) -> RollbackEntry {
        RollbackEntry {
            file_path: PathBuf::from(path),
            checksum: "abc".to_string(),
            size,
            blob: "abc.bak".to_string(),
            captured_at: Utc::now(),
            applied_checksum: None,
        }
    }

    #[test]
    fn test_summary_totals() {
        let now = Utc::now();
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("/a"), entry("/a", 10));
        entries.insert(PathBuf::from("/b"), entry("/b", 5));
        let session = RollbackSession {
            id: "s1".to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
            entries,
        };

        let summary = session.summary();
        assert_eq!(summary.file_count, 2);
        assert_eq!(summary.total_bytes, 15);
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + chrono::Duration::hours(2)));
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let now = Utc::now();
        let session = RollbackSession {
            id: "s1".to_string(),
            created_at: now,
            expires_at: now,
            entries: BTreeMap::new(),
        };
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"expiresAt\""));
        let back: RollbackSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "s1");
    }
}
