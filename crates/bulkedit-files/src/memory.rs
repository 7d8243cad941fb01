//! In-memory adapter for the [`FileSystem`] port
//!
//! Used by tests and dry runs. Tracks a write counter per file and can be told
//! to refuse reads or writes on chosen paths.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{FileError, Result};
use crate::filesystem::{glob_options, FileSystem};
use crate::models::FileMetadata;

#[derive(Debug, Clone)]
struct MemoryFile {
    content: String,
    modified: DateTime<Utc>,
    writes: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, MemoryFile>,
    deny_read: HashSet<PathBuf>,
    deny_write: HashSet<PathBuf>,
}

/// [`FileSystem`] holding files in a map
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileSystem {
    state: Arc<RwLock<MemoryState>>,
    case_insensitive: bool,
}

impl InMemoryFileSystem {
    /// Creates an empty in-memory file system
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a file system pre-populated with `(path, content)` pairs
    pub fn with_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<PathBuf>,
        C: Into<String>,
    {
        let now = Utc::now();
        let files = files
            .into_iter()
            .map(|(path, content)| {
                (
                    normalize(&path.into()),
                    MemoryFile {
                        content: content.into(),
                        modified: now,
                        writes: 0,
                    },
                )
            })
            .collect();

        Self {
            state: Arc::new(RwLock::new(MemoryState {
                files,
                ..Default::default()
            })),
            case_insensitive: false,
        }
    }

    /// Makes path comparisons case-insensitive, like a Windows or macOS volume
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Adds or replaces a file without counting it as a write
    pub async fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        let mut state = self.state.write().await;
        state.files.insert(
            normalize(&path.into()),
            MemoryFile {
                content: content.into(),
                modified: Utc::now(),
                writes: 0,
            },
        );
    }

    /// Removes a file, simulating an external deletion
    pub async fn remove(&self, path: &Path) {
        self.state.write().await.files.remove(&normalize(path));
    }

    /// Makes every read of `path` fail with `PermissionDenied`
    pub async fn deny_reads(&self, path: impl Into<PathBuf>) {
        self.state.write().await.deny_read.insert(normalize(&path.into()));
    }

    /// Makes every write under `path` fail with `PermissionDenied`
    pub async fn deny_writes(&self, path: impl Into<PathBuf>) {
        self.state.write().await.deny_write.insert(normalize(&path.into()));
    }

    /// Current content of a file, if present
    pub async fn contents(&self, path: &Path) -> Option<String> {
        self.state
            .read()
            .await
            .files
            .get(&normalize(path))
            .map(|f| f.content.clone())
    }

    /// How many times `write_atomic` replaced this file
    pub async fn write_count(&self, path: &Path) -> u64 {
        self.state
            .read()
            .await
            .files
            .get(&normalize(path))
            .map(|f| f.writes)
            .unwrap_or(0)
    }

    /// Paths of every file currently stored
    pub async fn paths(&self) -> Vec<PathBuf> {
        self.state.read().await.files.keys().cloned().collect()
    }
}

/// Resolves `.` and `..` lexically so map keys are canonical
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl InMemoryFileSystem {
    /// Canonical key for `path`, matching an existing file regardless of case
    /// when the volume is case-insensitive
    fn key(&self, state: &MemoryState, path: &Path) -> PathBuf {
        let path = normalize(path);
        if !self.case_insensitive || state.files.contains_key(&path) {
            return path;
        }
        let lower = path.to_string_lossy().to_lowercase();
        state
            .files
            .keys()
            .find(|k| k.to_string_lossy().to_lowercase() == lower)
            .cloned()
            .unwrap_or(path)
    }
}

fn denied(set: &HashSet<PathBuf>, path: &Path) -> bool {
    set.iter().any(|denied| path.starts_with(denied))
}

#[async_trait]
impl FileSystem for InMemoryFileSystem {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let state = self.state.read().await;
        let path = self.key(&state, path);
        if denied(&state.deny_read, &path) {
            return Err(FileError::PermissionDenied(path));
        }
        state
            .files
            .get(&path)
            .map(|f| f.content.clone())
            .ok_or(FileError::NotFound(path))
    }

    async fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let path = self.key(&state, path);
        if denied(&state.deny_write, &path) {
            return Err(FileError::PermissionDenied(path));
        }
        let writes = state.files.get(&path).map(|f| f.writes).unwrap_or(0);
        state.files.insert(
            path,
            MemoryFile {
                content: content.to_string(),
                modified: Utc::now(),
                writes: writes + 1,
            },
        );
        Ok(())
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let state = self.state.read().await;
        let path = self.key(&state, path);
        if denied(&state.deny_read, &path) {
            return Err(FileError::PermissionDenied(path));
        }
        let file = state
            .files
            .get(&path)
            .ok_or_else(|| FileError::NotFound(path.clone()))?;
        Ok(FileMetadata {
            size: file.content.len() as u64,
            is_file: true,
            modified: Some(file.modified),
            is_readonly: denied(&state.deny_write, &path),
            path,
        })
    }

    async fn exists(&self, path: &Path) -> bool {
        let path = normalize(path);
        let state = self.state.read().await;
        state.files.keys().any(|p| p.starts_with(&path))
    }

    async fn create_dir_all(&self, _path: &Path) -> Result<()> {
        // Directories are implicit in the key space.
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.write().await;
        let path = self.key(&state, path);
        if denied(&state.deny_write, &path) {
            return Err(FileError::PermissionDenied(path));
        }
        state
            .files
            .remove(&path)
            .map(|_| ())
            .ok_or(FileError::NotFound(path))
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        let mut state = self.state.write().await;
        if denied(&state.deny_write, &path) {
            return Err(FileError::PermissionDenied(path));
        }
        state.files.retain(|p, _| !p.starts_with(&path));
        Ok(())
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let path = normalize(path);
        let state = self.state.read().await;
        let children: BTreeSet<PathBuf> = state
            .files
            .keys()
            .filter_map(|p| p.strip_prefix(&path).ok())
            .filter_map(|rest| rest.components().next())
            .map(|first| path.join(first.as_os_str()))
            .collect();

        if children.is_empty() {
            return Err(FileError::NotFound(path));
        }
        Ok(children.into_iter().collect())
    }

    async fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let compiled = glob::Pattern::new(pattern).map_err(|e| FileError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let mut options = glob_options();
        options.case_sensitive = !self.case_insensitive;

        let state = self.state.read().await;
        Ok(state
            .files
            .keys()
            .filter(|p| compiled.matches_path_with(p, options))
            .cloned()
            .collect())
    }

    fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}
