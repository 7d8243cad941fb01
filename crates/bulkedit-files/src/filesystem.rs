//! File-system port
//!
//! The bulk edit engine never touches `std::fs` or `tokio::fs` directly. Every
//! read, write and directory walk goes through this trait so the engine can run
//! against the local disk or an in-memory tree.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::FileMetadata;

/// File operations needed by the bulk edit engine and the rollback store
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a file as UTF-8 text
    async fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Replace a file's content so readers never observe a partial write
    async fn write_atomic(&self, path: &Path, content: &str) -> Result<()>;

    /// Get file metadata
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Check whether a file or directory exists
    async fn exists(&self, path: &Path) -> bool;

    /// Create a directory and its parents
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Delete a file
    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Delete a directory and everything under it
    async fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// List the immediate children of a directory, sorted
    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Expand an absolute glob pattern to the regular files it matches, sorted
    async fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>>;

    /// Whether paths differing only in case name the same file
    fn is_case_insensitive(&self) -> bool {
        cfg!(any(windows, target_os = "macos"))
    }
}

/// Glob options shared by the adapters: `*` stays inside one path component,
/// `**` crosses directories.
pub(crate) fn glob_options() -> glob::MatchOptions {
    glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}
