//! Local disk adapter for the [`FileSystem`] port

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::{FileError, Result};
use crate::filesystem::{glob_options, FileSystem};
use crate::models::FileMetadata;

/// [`FileSystem`] backed by `tokio::fs`
///
/// Writes go to a temporary sibling file which is then renamed over the
/// target, so a crash mid-write leaves either the old or the new content.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    /// Creates a new LocalFileSystem instance
    pub fn new() -> Self {
        LocalFileSystem
    }

    /// Generates a temporary file path next to `path`
    fn temp_path(path: &Path) -> PathBuf {
        let mut temp_path = path.to_path_buf();
        let file_name = format!(
            ".tmp-{}-{}",
            Uuid::new_v4(),
            path.file_name().and_then(|n| n.to_str()).unwrap_or("file")
        );
        temp_path.set_file_name(file_name);
        temp_path
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .await
            .map_err(|e| FileError::from_io(e, path))
    }

    async fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| FileError::from_io(e, parent))?;
            }
        }

        let temp_path = Self::temp_path(path);
        fs::write(&temp_path, content)
            .await
            .map_err(|e| FileError::from_io(e, &temp_path))?;

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(FileError::from_io(e, path));
        }

        Ok(())
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| FileError::from_io(e, path))?;

        Ok(FileMetadata {
            path: path.to_path_buf(),
            size: meta.len(),
            is_file: meta.is_file(),
            modified: meta.modified().ok().map(chrono::DateTime::from),
            is_readonly: meta.permissions().readonly(),
        })
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| FileError::from_io(e, path))
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .map_err(|e| FileError::from_io(e, path))
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FileError::from_io(e, path)),
        }
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)
            .await
            .map_err(|e| FileError::from_io(e, path))?;

        let mut children = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FileError::from_io(e, path))?
        {
            children.push(entry.path());
        }
        children.sort();
        Ok(children)
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let pattern = pattern.to_string();
        // Directory walking is blocking; keep it off the async workers.
        tokio::task::spawn_blocking(move || {
            let paths = glob::glob_with(&pattern, glob_options()).map_err(|e| {
                FileError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                }
            })?;

            let mut files = Vec::new();
            for entry in paths {
                match entry {
                    Ok(path) if path.is_file() => files.push(path),
                    Ok(_) => {}
                    Err(e) => debug!("Skipping unreadable glob entry: {}", e),
                }
            }
            files.sort();
            Ok(files)
        })
        .await
        .map_err(|e| FileError::InvalidPath(format!("glob task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_atomic_creates_parents_and_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested").join("test.txt");
        let fs = LocalFileSystem::new();

        fs.write_atomic(&file_path, "hello").await.unwrap();

        assert_eq!(fs.read_to_string(&file_path).await.unwrap(), "hello");
        let children = fs.list_dir(file_path.parent().unwrap()).await.unwrap();
        assert_eq!(children, vec![file_path.clone()]);
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();

        let err = fs
            .read_to_string(&temp_dir.path().join("missing.txt"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_glob_returns_sorted_files_only() {
        let temp_dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        fs.write_atomic(&temp_dir.path().join("b.rs"), "b").await.unwrap();
        fs.write_atomic(&temp_dir.path().join("a.rs"), "a").await.unwrap();
        fs.write_atomic(&temp_dir.path().join("sub").join("c.rs"), "c")
            .await
            .unwrap();

        let pattern = format!("{}/*.rs", temp_dir.path().display());
        let files = fs.glob(&pattern).await.unwrap();
        assert_eq!(
            files,
            vec![temp_dir.path().join("a.rs"), temp_dir.path().join("b.rs")]
        );

        let pattern = format!("{}/**/*.rs", temp_dir.path().display());
        assert_eq!(fs.glob(&pattern).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_remove_dir_all_missing_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let fs = LocalFileSystem::new();
        assert!(fs.remove_dir_all(&temp_dir.path().join("gone")).await.is_ok());
    }

    #[tokio::test]
    async fn test_metadata_reports_size() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("sized.txt");
        let fs = LocalFileSystem::new();
        fs.write_atomic(&file_path, "12345").await.unwrap();

        let meta = fs.metadata(&file_path).await.unwrap();
        assert_eq!(meta.size, 5);
        assert!(meta.modified.is_some());
    }
}
