//! Read-only statistics over a resolved file set

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bulkedit_files::{FileError, FileSystem};
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{BulkEditError, Result};
use crate::resolver::FileSetResolver;
use crate::types::{ExtensionStats, FileSize, FileStatistics, InaccessibleFile};

const LARGEST_FILES: usize = 10;

/// Numbers taken from one file's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileCounts {
    pub(crate) bytes: u64,
    pub(crate) lines: usize,
    pub(crate) edits: usize,
}

/// A file read for analysis; its content is not kept
pub(crate) struct ScannedFile {
    pub(crate) path: PathBuf,
    pub(crate) read: std::result::Result<FileCounts, FileError>,
}

impl ScannedFile {
    pub(crate) fn size(&self) -> Option<FileSize> {
        self.read.as_ref().ok().map(|counts| FileSize {
            path: self.path.clone(),
            bytes: counts.bytes,
            lines: counts.lines,
        })
    }

    pub(crate) fn inaccessible(&self) -> Option<InaccessibleFile> {
        self.read.as_ref().err().map(|e| InaccessibleFile {
            path: self.path.clone(),
            error: e.to_string(),
        })
    }
}

/// Reads `files` with bounded concurrency, keeping input order
///
/// `count_edits` runs inside each read; at most `concurrency` contents are
/// held at once.
pub(crate) async fn scan<F>(
    fs: &Arc<dyn FileSystem>,
    files: Vec<PathBuf>,
    concurrency: usize,
    count_edits: F,
) -> Vec<ScannedFile>
where
    F: Fn(&Path, &str) -> usize,
{
    let count_edits = &count_edits;
    stream::iter(files.into_iter().map(|path| {
        let fs = fs.clone();
        async move {
            let read = fs.read_to_string(&path).await.map(|content| FileCounts {
                bytes: content.len() as u64,
                lines: content.lines().count(),
                edits: count_edits(&path, &content),
            });
            ScannedFile { path, read }
        }
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await
}

/// Collects size and line statistics without writing anything
#[derive(Clone)]
pub struct FileStatisticsCollector {
    fs: Arc<dyn FileSystem>,
    resolver: FileSetResolver,
    large_file_threshold: u64,
    concurrency: usize,
}

impl FileStatisticsCollector {
    /// Creates a collector rooted at the configured workspace
    pub fn new(fs: Arc<dyn FileSystem>, config: &EngineConfig) -> Self {
        Self {
            resolver: FileSetResolver::new(fs.clone(), config.workspace_root.clone())
                .with_protected_dir(config.resolved_backup_dir()),
            fs,
            large_file_threshold: config.large_file_threshold_bytes,
            concurrency: config.default_parallelism(),
        }
    }

    /// Resolves `files` and reports on every match
    ///
    /// Unreadable files are listed in `inaccessibleFiles` and left out of
    /// the size totals.
    pub async fn collect(&self, files: &[String], excluded: &[String]) -> Result<FileStatistics> {
        if files.is_empty() {
            return Err(BulkEditError::InvalidRequest(
                "no file patterns given".to_string(),
            ));
        }
        let resolved = self.resolver.resolve(files, excluded).await?;
        let scanned = scan(&self.fs, resolved.files, self.concurrency, |_, _| 0).await;

        let mut stats = summarize(&scanned, self.large_file_threshold);
        stats.unresolved_patterns = resolved.unresolved_patterns;
        debug!(
            files = stats.total_files,
            bytes = stats.total_bytes,
            "File statistics collected"
        );
        Ok(stats)
    }
}

fn summarize(scanned: &[ScannedFile], large_file_threshold: u64) -> FileStatistics {
    let mut stats = FileStatistics {
        total_files: scanned.len(),
        ..Default::default()
    };
    let mut sizes = Vec::new();

    for file in scanned {
        let Some(size) = file.size() else {
            stats.inaccessible_files.extend(file.inaccessible());
            continue;
        };
        stats.total_bytes += size.bytes;
        stats.total_lines += size.lines;
        if size.bytes > large_file_threshold {
            stats.oversized_files.push(size.path.clone());
        }

        let extension = size
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let entry: &mut ExtensionStats = stats.by_extension.entry(extension).or_default();
        entry.files += 1;
        entry.total_bytes += size.bytes;
        entry.total_lines += size.lines;

        sizes.push(size);
    }

    if !sizes.is_empty() {
        stats.average_bytes = stats.total_bytes / sizes.len() as u64;
    }
    sizes.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.path.cmp(&b.path)));
    sizes.truncate(LARGEST_FILES);
    stats.largest_files = sizes;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulkedit_files::InMemoryFileSystem;

    fn collector(fs: &InMemoryFileSystem, threshold: u64) -> FileStatisticsCollector {
        let config = EngineConfig {
            large_file_threshold_bytes: threshold,
            ..EngineConfig::default().with_workspace_root("/w")
        };
        FileStatisticsCollector::new(Arc::new(fs.clone()), &config)
    }

    #[tokio::test]
    async fn test_totals_and_extensions() {
        let fs = InMemoryFileSystem::with_files([
            ("/w/a.rs", "fn a() {}\n"),
            ("/w/b.rs", "x\ny\n"),
            ("/w/README", "hello"),
        ]);
        let stats = collector(&fs, 1024)
            .collect(&["*".to_string()], &[])
            .await
            .unwrap();

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_bytes, 19);
        assert_eq!(stats.total_lines, 4);
        assert_eq!(stats.average_bytes, 6);
        assert_eq!(stats.by_extension["rs"].files, 2);
        assert_eq!(stats.by_extension[""].total_bytes, 5);
        assert_eq!(stats.largest_files[0].path, PathBuf::from("/w/a.rs"));
    }

    #[tokio::test]
    async fn test_flags_oversized_and_inaccessible() {
        let fs = InMemoryFileSystem::with_files([("/w/big.txt", "0123456789"), ("/w/locked.txt", "x")]);
        fs.deny_reads("/w/locked.txt").await;
        let stats = collector(&fs, 5)
            .collect(&["*.txt".to_string(), "gone.txt".to_string()], &[])
            .await
            .unwrap();

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.oversized_files, vec![PathBuf::from("/w/big.txt")]);
        assert_eq!(stats.inaccessible_files.len(), 1);
        assert_eq!(stats.unresolved_patterns, vec!["gone.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_scan_counts_each_file_in_order() {
        let fs = InMemoryFileSystem::with_files([("/w/a.txt", "x x\nx\n"), ("/w/b.txt", "y")]);
        let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
        let files = vec![
            PathBuf::from("/w/b.txt"),
            PathBuf::from("/w/a.txt"),
            PathBuf::from("/w/missing.txt"),
        ];

        let scanned = scan(&shared, files, 2, |_, content| content.matches('x').count()).await;

        let paths: Vec<&Path> = scanned.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(
            paths,
            vec![Path::new("/w/b.txt"), Path::new("/w/a.txt"), Path::new("/w/missing.txt")]
        );
        assert_eq!(
            scanned[1].read.as_ref().ok(),
            Some(&FileCounts {
                bytes: 6,
                lines: 2,
                edits: 3
            })
        );
        assert_eq!(scanned[0].read.as_ref().map(|c| c.edits).ok(), Some(0));
        assert!(scanned[2].inaccessible().is_some());
    }

    #[tokio::test]
    async fn test_largest_files_capped() {
        let fs = InMemoryFileSystem::new();
        for i in 0..12 {
            fs.insert(format!("/w/f{:02}.txt", i), "x".repeat(i + 1)).await;
        }
        let stats = collector(&fs, 1024)
            .collect(&["*.txt".to_string()], &[])
            .await
            .unwrap();
        assert_eq!(stats.largest_files.len(), LARGEST_FILES);
        assert_eq!(stats.largest_files[0].bytes, 12);
    }
}
