//! Integration tests for the bulk edit pipeline and its tool surface

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bulkedit_core::{
    BackupManager, BulkEditOptions, BulkEditOrchestrator, BulkEditRequest, BulkEditTools,
    EngineConfig, ErrorKind, FileStatus, FileSystem, InMemoryFileSystem, RollbackManager,
};
use bulkedit_files::{FileMetadata, Result as FileResult};
use chrono::Duration;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Delegates to an in-memory tree and records the order of workspace reads
///
/// Can also cancel a token on every workspace read, or panic while reading
/// one chosen file.
#[derive(Clone)]
struct RecordingFileSystem {
    inner: InMemoryFileSystem,
    reads: Arc<Mutex<Vec<PathBuf>>>,
    cancel_on_read: Option<CancellationToken>,
    panic_on_read: Option<PathBuf>,
}

impl RecordingFileSystem {
    fn new(inner: InMemoryFileSystem) -> Self {
        Self {
            inner,
            reads: Arc::new(Mutex::new(Vec::new())),
            cancel_on_read: None,
            panic_on_read: None,
        }
    }

    fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_read = Some(token);
        self
    }

    fn panicking_on(mut self, path: &str) -> Self {
        self.panic_on_read = Some(PathBuf::from(path));
        self
    }

    fn take_reads(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.reads.lock().unwrap())
    }
}

#[async_trait]
impl FileSystem for RecordingFileSystem {
    async fn read_to_string(&self, path: &Path) -> FileResult<String> {
        if path.starts_with("/w") {
            self.reads.lock().unwrap().push(path.to_path_buf());
            if self.panic_on_read.as_deref() == Some(path) {
                panic!("worker crashed reading {}", path.display());
            }
            if let Some(token) = &self.cancel_on_read {
                token.cancel();
            }
        }
        self.inner.read_to_string(path).await
    }

    async fn write_atomic(&self, path: &Path, content: &str) -> FileResult<()> {
        self.inner.write_atomic(path, content).await
    }

    async fn metadata(&self, path: &Path) -> FileResult<FileMetadata> {
        self.inner.metadata(path).await
    }

    async fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> FileResult<()> {
        self.inner.create_dir_all(path).await
    }

    async fn remove_file(&self, path: &Path) -> FileResult<()> {
        self.inner.remove_file(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> FileResult<()> {
        self.inner.remove_dir_all(path).await
    }

    async fn list_dir(&self, path: &Path) -> FileResult<Vec<PathBuf>> {
        self.inner.list_dir(path).await
    }

    async fn glob(&self, pattern: &str) -> FileResult<Vec<PathBuf>> {
        self.inner.glob(pattern).await
    }
}

fn config() -> EngineConfig {
    EngineConfig::default().with_workspace_root("/w")
}

fn wire(fs: Arc<dyn FileSystem>) -> (BulkEditOrchestrator, RollbackManager) {
    let backups = BackupManager::new(fs.clone(), PathBuf::from("/store"), Duration::hours(1));
    (
        BulkEditOrchestrator::new(fs.clone(), backups.clone(), &config()),
        RollbackManager::new(fs, backups),
    )
}

fn ten_files() -> InMemoryFileSystem {
    InMemoryFileSystem::with_files(
        (0..10).map(|i| (format!("/w/f{}.txt", i), format!("foo {}", i))),
    )
}

#[tokio::test]
async fn test_missing_paths_are_reported_and_the_rest_applied() {
    let fs = ten_files();
    fs.remove(Path::new("/w/f3.txt")).await;
    fs.remove(Path::new("/w/f7.txt")).await;
    let (orchestrator, _) = wire(Arc::new(fs.clone()));

    let files: Vec<String> = (0..10).map(|i| format!("f{}.txt", i)).collect();
    let result = orchestrator
        .run(&BulkEditRequest::bulk_replace(files, "foo", "bar"))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.files_modified, 8);
    assert_eq!(result.per_file_errors.len(), 2);
    assert!(result
        .per_file_errors
        .iter()
        .all(|e| e.kind == ErrorKind::FileResolution));
    assert_eq!(result.unresolved_patterns, vec!["f3.txt", "f7.txt"]);
    assert_eq!(fs.contents(Path::new("/w/f0.txt")).await.unwrap(), "bar 0");
}

#[tokio::test]
async fn test_sequential_runs_process_in_resolver_order() {
    let recording = RecordingFileSystem::new(ten_files());
    recording.inner.deny_writes("/w/f2.txt").await;
    recording.inner.deny_writes("/w/f5.txt").await;
    let (orchestrator, _) = wire(Arc::new(recording.clone()));

    let request = BulkEditRequest::bulk_replace(["*.txt"], "foo", "bar").with_options(
        BulkEditOptions {
            max_parallelism: Some(1),
            create_backups: false,
            ..Default::default()
        },
    );
    let expected: Vec<PathBuf> = (0..10)
        .map(|i| PathBuf::from(format!("/w/f{}.txt", i)))
        .collect();

    let first = orchestrator.run(&request).await.unwrap();
    assert_eq!(recording.take_reads(), expected);

    // The second run sees the eight rewritten files as unchanged
    let second = orchestrator.run(&request).await.unwrap();
    assert_eq!(recording.take_reads(), expected);

    assert_eq!(first.per_file_errors, second.per_file_errors);
    let failed: Vec<&Path> = first
        .per_file_errors
        .iter()
        .map(|e| e.path.as_path())
        .collect();
    assert_eq!(failed, vec![Path::new("/w/f2.txt"), Path::new("/w/f5.txt")]);
}

#[tokio::test]
async fn test_cancel_while_first_file_is_in_flight() {
    let cancel = CancellationToken::new();
    let recording = RecordingFileSystem::new(InMemoryFileSystem::with_files([
        ("/w/a.txt", "foo"),
        ("/w/b.txt", "foo"),
        ("/w/c.txt", "foo"),
    ]))
    .cancelling(cancel.clone());
    let (orchestrator, _) = wire(Arc::new(recording.clone()));

    let request = BulkEditRequest::bulk_replace(["*.txt"], "foo", "bar").with_options(
        BulkEditOptions {
            max_parallelism: Some(1),
            ..Default::default()
        },
    );
    let result = orchestrator
        .run_with_cancellation(&request, cancel)
        .await
        .unwrap();

    // Only the in-flight file was read; it was abandoned before its write
    assert_eq!(recording.take_reads(), vec![PathBuf::from("/w/a.txt")]);
    assert!(!result.success);
    assert_eq!(result.files_modified, 0);
    assert!(result.rollback_id.is_none());
    assert_eq!(result.per_file_errors.len(), 3);
    assert!(result
        .per_file_errors
        .iter()
        .all(|e| e.kind == ErrorKind::Cancelled));

    let statuses: Vec<FileStatus> = result.file_outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![FileStatus::Failed, FileStatus::Skipped, FileStatus::Skipped]
    );
    for name in ["/w/a.txt", "/w/b.txt", "/w/c.txt"] {
        assert_eq!(recording.inner.contents(Path::new(name)).await.unwrap(), "foo");
        assert_eq!(recording.inner.write_count(Path::new(name)).await, 0);
    }
}

#[tokio::test]
async fn test_crashed_worker_fails_its_file() {
    let recording = RecordingFileSystem::new(ten_files()).panicking_on("/w/f4.txt");
    let (orchestrator, _) = wire(Arc::new(recording.clone()));

    let result = orchestrator
        .run(&BulkEditRequest::bulk_replace(["*.txt"], "foo", "bar"))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.files_modified, 9);
    assert_eq!(result.file_outcomes.len(), 10);
    assert_eq!(result.per_file_errors.len(), 1);
    assert_eq!(result.per_file_errors[0].path, PathBuf::from("/w/f4.txt"));
    assert_eq!(result.per_file_errors[0].kind, ErrorKind::Internal);
    let crashed = result
        .file_outcomes
        .iter()
        .find(|o| o.path == Path::new("/w/f4.txt"))
        .unwrap();
    assert_eq!(crashed.status, FileStatus::Failed);
}

#[tokio::test]
async fn test_retry_under_same_session_keeps_true_originals() {
    let fs = InMemoryFileSystem::with_files([("/w/a.txt", "v1"), ("/w/b.txt", "v1")]);
    fs.deny_writes("/w/b.txt").await;
    let (orchestrator, rollback) = wire(Arc::new(fs.clone()));
    let options = BulkEditOptions {
        rollback_id: Some("retry".to_string()),
        ..Default::default()
    };

    let first = orchestrator
        .run(&BulkEditRequest::bulk_replace(["*.txt"], "v1", "v2").with_options(options.clone()))
        .await
        .unwrap();
    assert!(!first.success);
    assert_eq!(first.files_modified, 1);

    // b.txt was captured before its write failed; a.txt is edited again and
    // must keep its first pre-image
    let second = orchestrator
        .run(&BulkEditRequest::bulk_replace(["a.txt"], "v2", "v3").with_options(options))
        .await
        .unwrap();
    assert!(second.success);
    assert_eq!(fs.contents(Path::new("/w/a.txt")).await.unwrap(), "v3");

    let restored = rollback.rollback("retry").await.unwrap();
    assert!(restored.success);
    assert_eq!(fs.contents(Path::new("/w/a.txt")).await.unwrap(), "v1");
    assert_eq!(fs.contents(Path::new("/w/b.txt")).await.unwrap(), "v1");
}

#[tokio::test]
async fn test_tool_scenarios() {
    let fs = InMemoryFileSystem::with_files([
        ("/w/a.txt", "// TODO: later\nbody\n"),
        ("/w/b.txt", "body\n"),
    ]);
    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    let backups = BackupManager::new(shared.clone(), PathBuf::from("/store"), Duration::hours(1));
    let tools = BulkEditTools::new(shared, backups, &config());

    let invalid = tools
        .call(
            "validate_bulk_edit",
            json!({
                "operationType": "bulk_replace",
                "files": ["*.txt"],
                "regexPattern": "[unclosed"
            }),
        )
        .await;
    assert_eq!(invalid.result.unwrap()["isValid"], false);
    assert_eq!(fs.write_count(Path::new("/w/a.txt")).await, 0);

    let conditional = tools
        .call(
            "conditional_edit",
            json!({
                "files": ["*.txt"],
                "condition": {"kind": "contains", "pattern": "TODO"},
                "edits": [{"type": "insert", "line": 1, "column": 0, "text": "// reviewed\n"}]
            }),
        )
        .await;
    assert!(conditional.success);
    assert_eq!(conditional.result.unwrap()["filesModified"], 1);
    assert_eq!(
        fs.contents(Path::new("/w/a.txt")).await.unwrap(),
        "// TODO: later\n// reviewed\nbody\n"
    );
    assert_eq!(fs.contents(Path::new("/w/b.txt")).await.unwrap(), "body\n");

    let refactor = tools
        .call(
            "preview_bulk_changes",
            json!({
                "operationType": "batchRefactor",
                "files": ["*.txt"],
                "refactorPattern": {
                    "kind": "rename",
                    "targetPattern": "body",
                    "replacementPattern": "content"
                }
            }),
        )
        .await;
    assert!(refactor.success);
    assert_eq!(refactor.result.unwrap()["totalFiles"], 2);
    assert_eq!(fs.write_count(Path::new("/w/b.txt")).await, 0);
}
