//! File-set resolution
//!
//! Expands path and glob patterns into a sorted, de-duplicated list of
//! absolute file paths, then removes excluded paths.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bulkedit_files::FileSystem;
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BulkEditError, Result};

/// Output of a resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFiles {
    /// Matched files, sorted
    pub files: Vec<PathBuf>,
    /// Patterns that matched no file, in input order
    pub unresolved_patterns: Vec<String>,
}

/// Resolves file patterns against a workspace root
#[derive(Clone)]
pub struct FileSetResolver {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    protected: Vec<PathBuf>,
}

impl FileSetResolver {
    /// Creates a resolver for patterns relative to `root`
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: normalize_path(&root.into()),
            protected: Vec::new(),
        }
    }

    /// Never returns files under `dir`, whatever the patterns say
    pub fn with_protected_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let dir = if dir.is_absolute() {
            normalize_path(dir)
        } else {
            normalize_path(&self.root.join(dir))
        };
        self.protected.push(dir);
        self
    }

    /// Workspace root patterns are relative to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `pattern` contains glob metacharacters
    pub fn is_glob(pattern: &str) -> bool {
        pattern.contains(['*', '?', '['])
    }

    /// Checks glob syntax without touching the file system
    pub fn check_syntax(pattern: &str) -> std::result::Result<(), String> {
        if pattern.trim().is_empty() {
            return Err("file pattern is empty".to_string());
        }
        if Self::is_glob(pattern) {
            Pattern::new(pattern).map_err(|e| format!("invalid glob '{}': {}", pattern, e))?;
        }
        Ok(())
    }

    /// Expands `patterns`, removes duplicates, then drops `exclusions`
    ///
    /// # Arguments
    ///
    /// * `patterns` - Paths or globs, absolute or relative to the root
    /// * `exclusions` - Paths, directories or globs to remove from the result
    ///
    /// # Returns
    ///
    /// The sorted file list and the patterns that matched nothing
    pub async fn resolve(&self, patterns: &[String], exclusions: &[String]) -> Result<ResolvedFiles> {
        let case_insensitive = self.fs.is_case_insensitive();
        let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut unresolved = Vec::new();

        for pattern in patterns {
            Self::check_syntax(pattern).map_err(BulkEditError::InvalidRequest)?;

            let matches = if Self::is_glob(pattern) {
                self.fs.glob(&self.absolute_glob(pattern)).await?
            } else {
                let path = self.absolute_path(pattern);
                match self.fs.metadata(&path).await {
                    Ok(meta) if meta.is_file => vec![path],
                    _ => Vec::new(),
                }
            };

            if matches.is_empty() {
                debug!(pattern = %pattern, "Pattern matched no files");
                unresolved.push(pattern.clone());
                continue;
            }
            for path in matches {
                let path = normalize_path(&path);
                found
                    .entry(dedup_key(&path, case_insensitive))
                    .or_insert(path);
            }
        }

        let exclusions = exclusions
            .iter()
            .map(|e| Exclusion::compile(self, e))
            .collect::<Result<Vec<_>>>()?;
        let options = MatchOptions {
            case_sensitive: !case_insensitive,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        let mut files: Vec<PathBuf> = found
            .into_values()
            .filter(|path| !self.protected.iter().any(|dir| path.starts_with(dir)))
            .filter(|path| !exclusions.iter().any(|e| e.matches(path, &self.root, options)))
            .collect();
        files.sort();

        debug!(
            files = files.len(),
            unresolved = unresolved.len(),
            "Resolved file set"
        );
        Ok(ResolvedFiles {
            files,
            unresolved_patterns: unresolved,
        })
    }

    fn absolute_path(&self, pattern: &str) -> PathBuf {
        let path = Path::new(pattern);
        if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.root.join(path))
        }
    }

    fn absolute_glob(&self, pattern: &str) -> String {
        if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            let relative = pattern.trim_start_matches("./");
            let root = Pattern::escape(&self.root.to_string_lossy());
            format!("{}/{}", root.trim_end_matches('/'), relative)
        }
    }
}

enum Exclusion {
    Glob { absolute: Pattern, relative: Pattern },
    Path(PathBuf),
}

impl Exclusion {
    fn compile(resolver: &FileSetResolver, pattern: &str) -> Result<Self> {
        Self::build(resolver, pattern).map_err(BulkEditError::InvalidRequest)
    }

    fn build(resolver: &FileSetResolver, pattern: &str) -> std::result::Result<Self, String> {
        FileSetResolver::check_syntax(pattern)?;
        if FileSetResolver::is_glob(pattern) {
            let compile = |p: &str| Pattern::new(p).map_err(|e| format!("invalid glob '{}': {}", p, e));
            Ok(Exclusion::Glob {
                absolute: compile(&resolver.absolute_glob(pattern))?,
                relative: compile(pattern.trim_start_matches("./"))?,
            })
        } else {
            Ok(Exclusion::Path(resolver.absolute_path(pattern)))
        }
    }

    fn matches(&self, path: &Path, root: &Path, options: MatchOptions) -> bool {
        match self {
            Exclusion::Glob { absolute, relative } => {
                absolute.matches_path_with(path, options)
                    || path
                        .strip_prefix(root)
                        .is_ok_and(|rel| relative.matches_path_with(rel, options))
            }
            Exclusion::Path(excluded) => {
                if options.case_sensitive {
                    path.starts_with(excluded)
                } else {
                    let path = PathBuf::from(path.to_string_lossy().to_lowercase());
                    path.starts_with(excluded.to_string_lossy().to_lowercase())
                }
            }
        }
    }
}

fn dedup_key(path: &Path, case_insensitive: bool) -> String {
    let key = path.to_string_lossy();
    if case_insensitive {
        key.to_lowercase()
    } else {
        key.into_owned()
    }
}

/// Resolves `.` and `..` components without touching the file system
pub fn normalize_path(path: &Path) -> PathBuf {
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
