//! Bulk edit orchestration
//!
//! Validates a request, resolves its file set, then runs every file through
//! read → condition → plan → apply → backup → write on a bounded worker pool.
//! Preview runs the same pipeline and stops before the backup, rendering a
//! diff instead.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bulkedit_files::{BackupManager, ContentVerifier, DiffEngine, FileSystem};
use regex::Regex;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::applier::EditApplier;
use crate::condition::{CompiledCondition, ConditionEvaluator};
use crate::config::EngineConfig;
use crate::error::{BulkEditError, PerFileError, Result};
use crate::patterns::CompiledPattern;
use crate::planner::EditPlanner;
use crate::resolver::FileSetResolver;
use crate::types::{
    BulkEditRequest, BulkEditResult, BulkOperation, FileOutcome, FilePreview, FileStatus,
    OperationType, PreviewResult, TextEdit,
};
use crate::validator::RequestValidator;

/// Produces a file's edit list from its content, compiled once per run
enum FilePlanner {
    Replace { regex: Regex, replacement: String },
    Conditional { condition: CompiledCondition, edits: Vec<TextEdit> },
    Refactor(CompiledPattern),
    Static(BTreeMap<PathBuf, Vec<TextEdit>>),
}

impl FilePlanner {
    fn plan(&self, path: &Path, content: &str) -> Vec<TextEdit> {
        match self {
            FilePlanner::Replace { regex, replacement } => {
                EditPlanner::plan_replace(content, regex, replacement)
            }
            FilePlanner::Conditional { edits, .. } => edits.clone(),
            FilePlanner::Refactor(pattern) => EditPlanner::plan_refactor(content, pattern),
            FilePlanner::Static(per_file) => per_file.get(path).cloned().unwrap_or_default(),
        }
    }
}

struct RunPlan {
    planner: FilePlanner,
    files: Vec<PathBuf>,
    unresolved: Vec<String>,
}

/// What one worker reports for one file
#[derive(Debug)]
struct FileReport {
    path: PathBuf,
    status: FileStatus,
    edits: usize,
    error: Option<BulkEditError>,
    preview: Option<FilePreview>,
    warning: Option<String>,
}

impl FileReport {
    fn new(path: PathBuf, status: FileStatus) -> Self {
        Self {
            path,
            status,
            edits: 0,
            error: None,
            preview: None,
            warning: None,
        }
    }

    fn failed(path: PathBuf, error: BulkEditError) -> Self {
        warn!(path = %path.display(), error = %error, "File failed");
        Self {
            error: Some(error),
            ..Self::new(path, FileStatus::Failed)
        }
    }
}

/// Everything a run produced before it is shaped into a result
struct RunReport {
    operation: OperationType,
    reports: Vec<FileReport>,
    unresolved: Vec<String>,
    undispatched: Vec<PathBuf>,
    cancelled: Vec<PathBuf>,
    warnings: Vec<String>,
    session_id: String,
}

/// Per-file pipeline shared by the workers of one run
#[derive(Clone)]
struct Worker {
    fs: Arc<dyn FileSystem>,
    backups: BackupManager,
    diff: DiffEngine,
    applier: EditApplier,
    planner: Arc<FilePlanner>,
    preview: bool,
    create_backups: bool,
    session_id: String,
    cancel: CancellationToken,
}

impl Worker {
    async fn process(&self, path: PathBuf) -> FileReport {
        let read = self.fs.read_to_string(&path).await;

        if let FilePlanner::Conditional { condition, .. } = self.planner.as_ref() {
            match ConditionEvaluator::evaluate_read(condition, &path, read.as_deref()) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(path = %path.display(), "Condition not met");
                    return FileReport::new(path, FileStatus::Skipped);
                }
                Err(e) => return FileReport::failed(path, e),
            }
        }
        let content = match read {
            Ok(content) => content,
            Err(e) => return FileReport::failed(path, e.into()),
        };

        let edits = self.planner.plan(&path, &content);
        if edits.is_empty() {
            return FileReport::new(path, FileStatus::Unchanged);
        }
        let updated = match self.applier.apply(&content, &edits) {
            Ok(updated) => updated,
            Err(e) => return FileReport::failed(path, e),
        };
        if updated == content {
            return FileReport::new(path, FileStatus::Unchanged);
        }

        if self.preview {
            let diff = self.diff.generate_unified_diff(&content, &updated, path.clone());
            let preview = FilePreview {
                path: path.clone(),
                edits_planned: edits.len(),
                diff: self.diff.render(&diff),
                additions: diff.stats.additions,
                deletions: diff.stats.deletions,
            };
            return FileReport {
                edits: edits.len(),
                preview: Some(preview),
                ..FileReport::new(path, FileStatus::Modified)
            };
        }

        if self.cancel.is_cancelled() {
            return FileReport::failed(path, BulkEditError::Cancelled);
        }
        if self.create_backups {
            if let Err(e) = self.backups.capture(&self.session_id, &path, &content).await {
                return FileReport::failed(path, BulkEditError::Backup(e.to_string()));
            }
        }
        if self.cancel.is_cancelled() {
            return FileReport::failed(path, BulkEditError::Cancelled);
        }
        if let Err(e) = self.fs.write_atomic(&path, &updated).await {
            return FileReport::failed(path, e.into());
        }

        let mut report = FileReport {
            edits: edits.len(),
            ..FileReport::new(path, FileStatus::Modified)
        };
        if self.create_backups {
            let checksum = ContentVerifier::compute_hash(&updated);
            if let Err(e) = self
                .backups
                .record_applied(&self.session_id, &report.path, checksum)
                .await
            {
                report.warning = Some(format!(
                    "{}: applied checksum not recorded: {}",
                    report.path.display(),
                    e
                ));
            }
        }
        debug!(path = %report.path.display(), edits = report.edits, "File modified");
        report
    }
}

/// Top-level coordinator for bulk edits
#[derive(Clone)]
pub struct BulkEditOrchestrator {
    fs: Arc<dyn FileSystem>,
    resolver: FileSetResolver,
    backups: BackupManager,
    diff: DiffEngine,
    default_parallelism: usize,
}

impl BulkEditOrchestrator {
    /// Creates an orchestrator
    ///
    /// # Arguments
    ///
    /// * `fs` - File system every read and write goes through
    /// * `backups` - Rollback-session store for pre-images
    /// * `config` - Supplies the workspace root and default parallelism
    pub fn new(fs: Arc<dyn FileSystem>, backups: BackupManager, config: &EngineConfig) -> Self {
        Self {
            resolver: FileSetResolver::new(fs.clone(), config.workspace_root.clone())
                .with_protected_dir(backups.backup_dir()),
            fs,
            backups,
            diff: DiffEngine::new(),
            default_parallelism: config.default_parallelism(),
        }
    }

    /// The rollback-session store
    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// The file-set resolver
    pub fn resolver(&self) -> &FileSetResolver {
        &self.resolver
    }

    /// Runs a request to completion
    ///
    /// With `previewMode` nothing is written and the counts describe what
    /// would have happened.
    pub async fn run(&self, request: &BulkEditRequest) -> Result<BulkEditResult> {
        self.run_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Runs a request, stopping cooperatively when `cancel` fires
    ///
    /// A file in flight either completes its write or is abandoned before
    /// its backup and write; files not yet dispatched are reported as
    /// cancelled.
    pub async fn run_with_cancellation(
        &self,
        request: &BulkEditRequest,
        cancel: CancellationToken,
    ) -> Result<BulkEditResult> {
        let started = Instant::now();
        let preview = request.options.preview_mode;
        let run = self.execute(request, preview, cancel).await?;

        let mut errors = resolution_errors(&run.unresolved);
        let mut outcomes = Vec::with_capacity(run.reports.len());
        let mut warnings = run.warnings;
        let mut files_processed = 0;

        for report in run.reports {
            files_processed += 1;
            if let Some(error) = &report.error {
                errors.push(error.for_path(&report.path));
            }
            if let Some(warning) = report.warning {
                warnings.push(warning);
            }
            let edits_applied = if report.status == FileStatus::Modified {
                report.edits
            } else {
                0
            };
            outcomes.push(FileOutcome {
                path: report.path,
                status: report.status,
                edits_applied,
            });
        }
        for path in run.cancelled {
            errors.push(BulkEditError::Cancelled.for_path(&path));
            outcomes.push(skipped(path));
        }
        for path in run.undispatched {
            warnings.push(format!(
                "{}: not processed after an earlier failure",
                path.display()
            ));
            outcomes.push(skipped(path));
        }

        sort_errors(&mut errors);
        outcomes.sort_by(|a, b| a.path.cmp(&b.path));

        let modified: Vec<&FileOutcome> = outcomes
            .iter()
            .filter(|o| o.status == FileStatus::Modified)
            .collect();
        let files_modified = modified.len();
        let edits_applied = modified.iter().map(|o| o.edits_applied).sum();
        let files_skipped = outcomes
            .iter()
            .filter(|o| o.status == FileStatus::Skipped)
            .count();

        let rollback_id = if !preview
            && request.options.create_backups
            && self.backups.session(&run.session_id).await.is_some()
        {
            Some(run.session_id)
        } else {
            None
        };
        if preview {
            warnings.push("preview mode: no files were written".to_string());
        }

        let result = BulkEditResult {
            success: errors.is_empty(),
            files_modified,
            edits_applied,
            per_file_errors: errors,
            rollback_id,
            warnings,
            files_processed,
            files_skipped,
            unresolved_patterns: run.unresolved,
            file_outcomes: outcomes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            operation = %run.operation,
            success = result.success,
            files_modified = result.files_modified,
            edits_applied = result.edits_applied,
            errors = result.per_file_errors.len(),
            elapsed_ms = result.elapsed_ms,
            "Bulk edit finished"
        );
        Ok(result)
    }

    /// Plans a request and renders the diffs it would produce
    ///
    /// Goes through the same planning and conflict checks as [`Self::run`]
    /// but never captures a backup or writes a file.
    pub async fn preview(&self, request: &BulkEditRequest) -> Result<PreviewResult> {
        let run = self
            .execute(request, true, CancellationToken::new())
            .await?;

        let mut errors = resolution_errors(&run.unresolved);
        let mut files = Vec::new();
        for report in run.reports {
            if let Some(error) = &report.error {
                errors.push(error.for_path(&report.path));
            }
            if let Some(preview) = report.preview {
                files.push(preview);
            }
        }
        let mut warnings = run.warnings;
        for path in run.undispatched {
            warnings.push(format!(
                "{}: not processed after an earlier failure",
                path.display()
            ));
        }

        sort_errors(&mut errors);
        files.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(PreviewResult {
            operation: run.operation,
            total_files: files.len(),
            total_edits: files.iter().map(|f| f.edits_planned).sum(),
            files,
            errors,
            warnings,
        })
    }

    async fn execute(
        &self,
        request: &BulkEditRequest,
        preview: bool,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let validation = RequestValidator::validate(request);
        if !validation.is_valid {
            return Err(BulkEditError::InvalidRequest(
                validation.error_messages().join("; "),
            ));
        }
        let mut warnings: Vec<String> = validation
            .warning_messages()
            .into_iter()
            .map(str::to_string)
            .collect();

        let operation = request.operation_type();
        let plan = self.plan(request).await?;
        let session_id = request
            .options
            .rollback_id
            .clone()
            .unwrap_or_else(BackupManager::new_session_id);

        let mut run = RunReport {
            operation,
            reports: Vec::new(),
            unresolved: plan.unresolved,
            undispatched: Vec::new(),
            cancelled: Vec::new(),
            warnings: Vec::new(),
            session_id,
        };

        if request.options.fail_fast && !run.unresolved.is_empty() {
            warnings.push("fail-fast: unresolved patterns, no file was processed".to_string());
            run.undispatched = plan.files;
            run.warnings = warnings;
            return Ok(run);
        }
        if plan.files.is_empty() {
            warnings.push("no files to process".to_string());
            run.warnings = warnings;
            return Ok(run);
        }

        let parallelism = request
            .options
            .max_parallelism
            .unwrap_or(self.default_parallelism)
            .max(1);
        info!(
            operation = %operation,
            files = plan.files.len(),
            parallelism,
            preview,
            "Starting bulk edit"
        );

        let worker = Worker {
            fs: self.fs.clone(),
            backups: self.backups.clone(),
            diff: self.diff.clone(),
            applier: EditApplier::new(),
            planner: Arc::new(plan.planner),
            preview,
            create_backups: request.options.create_backups,
            session_id: run.session_id.clone(),
            cancel: cancel.clone(),
        };
        let fail_fast = request.options.fail_fast;
        let semaphore = Arc::new(Semaphore::new(parallelism));
        let failed = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel::<FileReport>();
        let mut tasks = JoinSet::new();

        let mut dispatched = Vec::with_capacity(plan.files.len());
        let mut pending = plan.files.into_iter();
        while let Some(path) = pending.next() {
            // Permits are taken in resolver order before spawning, so with a
            // single permit files run strictly one after another.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    run.cancelled.push(path);
                    run.cancelled.extend(pending.by_ref());
                    break;
                }
                permit = semaphore.clone().acquire_owned() => {
                    permit.map_err(|_| BulkEditError::Cancelled)?
                }
            };
            if fail_fast && failed.load(Ordering::SeqCst) {
                run.undispatched.push(path);
                run.undispatched.extend(pending.by_ref());
                break;
            }

            dispatched.push(path.clone());
            let worker = worker.clone();
            let tx = tx.clone();
            let failed = failed.clone();
            tasks.spawn(async move {
                let report = worker.process(path).await;
                if report.error.is_some() {
                    failed.store(true, Ordering::SeqCst);
                }
                drop(permit);
                let _ = tx.send(report);
            });
        }
        drop(tx);

        let mut aborted = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Worker task ended abnormally: {}", e);
                aborted.push(e.to_string());
            }
        }
        while let Some(report) = rx.recv().await {
            run.reports.push(report);
        }
        if !aborted.is_empty() {
            // A task that died never sent its report; fail those files
            let reported: HashSet<PathBuf> = run.reports.iter().map(|r| r.path.clone()).collect();
            for path in dispatched.into_iter().filter(|p| !reported.contains(p)) {
                let error = BulkEditError::Internal(format!(
                    "worker stopped before reporting: {}",
                    aborted.join("; ")
                ));
                run.reports.push(FileReport::failed(path, error));
            }
        }

        if !run.cancelled.is_empty() {
            warn!(remaining = run.cancelled.len(), "Bulk edit cancelled");
        }
        run.warnings = warnings;
        Ok(run)
    }

    async fn plan(&self, request: &BulkEditRequest) -> Result<RunPlan> {
        let invalid = |message: String| BulkEditError::InvalidRequest(message);

        let planner = match &request.operation {
            BulkOperation::BulkReplace {
                regex_pattern,
                replacement,
            } => FilePlanner::Replace {
                regex: Regex::new(regex_pattern)
                    .map_err(|e| invalid(format!("regex '{}': {}", regex_pattern, e)))?,
                replacement: replacement.clone(),
            },
            BulkOperation::ConditionalEdit { condition, edits } => FilePlanner::Conditional {
                condition: ConditionEvaluator::compile(condition)?,
                edits: edits.clone(),
            },
            BulkOperation::BatchRefactor { pattern } => {
                FilePlanner::Refactor(CompiledPattern::compile(pattern)?)
            }
            BulkOperation::MultiFileEdit { operations } => {
                let mut targets = Vec::with_capacity(operations.len());
                let mut unresolved = Vec::new();
                for operation in operations {
                    let resolved = self
                        .resolver
                        .resolve(
                            std::slice::from_ref(&operation.file_pattern),
                            &request.excluded_files,
                        )
                        .await?;
                    unresolved.extend(resolved.unresolved_patterns);
                    targets.push(resolved.files);
                }
                let merged = EditPlanner::merge_operations(operations, &targets);
                return Ok(RunPlan {
                    files: merged.keys().cloned().collect(),
                    planner: FilePlanner::Static(merged),
                    unresolved,
                });
            }
        };

        let resolved = self
            .resolver
            .resolve(&request.files, &request.excluded_files)
            .await?;
        Ok(RunPlan {
            planner,
            files: resolved.files,
            unresolved: resolved.unresolved_patterns,
        })
    }
}

fn resolution_errors(unresolved: &[String]) -> Vec<PerFileError> {
    unresolved
        .iter()
        .map(|pattern| {
            BulkEditError::FileResolution {
                pattern: pattern.clone(),
            }
            .for_path(pattern)
        })
        .collect()
}

fn skipped(path: PathBuf) -> FileOutcome {
    FileOutcome {
        path,
        status: FileStatus::Skipped,
        edits_applied: 0,
    }
}

fn sort_errors(errors: &mut [PerFileError]) {
    errors.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{BulkEditCondition, BulkEditOptions, MultiFileEditOperation, Position};
    use bulkedit_files::InMemoryFileSystem;
    use chrono::Duration;

    fn setup(files: &[(&str, &str)]) -> (InMemoryFileSystem, BulkEditOrchestrator) {
        let fs = InMemoryFileSystem::with_files(files.iter().map(|(p, c)| (*p, *c)));
        let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
        let backups = BackupManager::new(shared.clone(), PathBuf::from("/backups"), Duration::hours(24));
        let config = EngineConfig::default().with_workspace_root("/w");
        (fs, BulkEditOrchestrator::new(shared, backups, &config))
    }

    async fn content(fs: &InMemoryFileSystem, path: &str) -> String {
        fs.contents(Path::new(path)).await.unwrap()
    }

    #[tokio::test]
    async fn test_bulk_replace_scenario() {
        let (fs, orchestrator) = setup(&[("/w/a.txt", "foo baz foo")]);
        let result = orchestrator
            .run(&BulkEditRequest::bulk_replace(["a.txt"], "foo", "bar"))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.files_modified, 1);
        assert_eq!(result.edits_applied, 2);
        assert!(result.rollback_id.is_some());
        assert_eq!(content(&fs, "/w/a.txt").await, "bar baz bar");
    }

    #[tokio::test]
    async fn test_conditional_edit_only_touches_matching_files() {
        let (fs, orchestrator) = setup(&[("/w/a.txt", "// TODO\nx\n"), ("/w/b.txt", "done\n")]);
        let request = BulkEditRequest::conditional_edit(
            ["*.txt"],
            BulkEditCondition::contains("TODO"),
            vec![TextEdit::insert(Position::new(0, 0), "// checked\n")],
        );
        let result = orchestrator.run(&request).await.unwrap();

        assert!(result.success);
        assert_eq!(result.files_modified, 1);
        assert_eq!(result.files_skipped, 1);
        assert_eq!(content(&fs, "/w/a.txt").await, "// checked\n// TODO\nx\n");
        assert_eq!(fs.write_count(Path::new("/w/b.txt")).await, 0);
    }

    #[tokio::test]
    async fn test_unreadable_file_fails_condition_even_when_negated() {
        let (fs, orchestrator) = setup(&[("/w/a.txt", "x")]);
        fs.deny_reads("/w/a.txt").await;
        let request = BulkEditRequest::conditional_edit(
            ["a.txt"],
            BulkEditCondition::contains("TODO").negated(),
            vec![TextEdit::insert(Position::new(0, 0), "y")],
        );
        let result = orchestrator.run(&request).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.per_file_errors[0].kind, ErrorKind::ConditionEvaluation);
        assert_eq!(fs.write_count(Path::new("/w/a.txt")).await, 0);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_io() {
        let (fs, orchestrator) = setup(&[("/w/a.txt", "foo")]);
        let result = orchestrator
            .run(&BulkEditRequest::bulk_replace(["a.txt"], "(", "x"))
            .await;
        assert!(matches!(result, Err(BulkEditError::InvalidRequest(_))));
        assert_eq!(fs.write_count(Path::new("/w/a.txt")).await, 0);
    }

    #[tokio::test]
    async fn test_conflicting_edits_fail_the_file_only() {
        let (fs, orchestrator) = setup(&[("/w/a.txt", "abcdef"), ("/w/b.txt", "uvwxyz")]);
        let request = BulkEditRequest::multi_file_edit(vec![
            MultiFileEditOperation {
                file_pattern: "a.txt".to_string(),
                edits: vec![TextEdit::replace(Position::new(0, 0), Position::new(0, 3), "X")],
                priority: 2,
            },
            MultiFileEditOperation {
                file_pattern: "*.txt".to_string(),
                edits: vec![TextEdit::replace(Position::new(0, 2), Position::new(0, 4), "Y")],
                priority: 1,
            },
        ]);
        let result = orchestrator.run(&request).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.per_file_errors.len(), 1);
        assert_eq!(result.per_file_errors[0].path, PathBuf::from("/w/a.txt"));
        assert_eq!(result.per_file_errors[0].kind, ErrorKind::EditConflict);
        assert_eq!(content(&fs, "/w/a.txt").await, "abcdef");
        assert_eq!(content(&fs, "/w/b.txt").await, "uvYyz");
    }

    #[tokio::test]
    async fn test_backup_failure_blocks_the_write() {
        let (fs, orchestrator) = setup(&[("/w/a.txt", "foo")]);
        fs.deny_writes("/backups").await;
        let result = orchestrator
            .run(&BulkEditRequest::bulk_replace(["a.txt"], "foo", "bar"))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.per_file_errors[0].kind, ErrorKind::Backup);
        assert_eq!(content(&fs, "/w/a.txt").await, "foo");
        assert!(result.rollback_id.is_none());
    }

    #[tokio::test]
    async fn test_no_backups_means_no_rollback_id() {
        let (fs, orchestrator) = setup(&[("/w/a.txt", "foo")]);
        let request = BulkEditRequest::bulk_replace(["a.txt"], "foo", "bar").with_options(
            BulkEditOptions {
                create_backups: false,
                ..Default::default()
            },
        );
        let result = orchestrator.run(&request).await.unwrap();
        assert!(result.success);
        assert!(result.rollback_id.is_none());
        assert_eq!(content(&fs, "/w/a.txt").await, "bar");
    }

    #[tokio::test]
    async fn test_fail_fast_stops_dispatching() {
        let (fs, orchestrator) = setup(&[
            ("/w/a.txt", "foo"),
            ("/w/b.txt", "foo"),
            ("/w/c.txt", "foo"),
        ]);
        fs.deny_writes("/w/a.txt").await;
        let request = BulkEditRequest::bulk_replace(["*.txt"], "foo", "bar").with_options(
            BulkEditOptions {
                max_parallelism: Some(1),
                fail_fast: true,
                ..Default::default()
            },
        );
        let result = orchestrator.run(&request).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.files_processed, 1);
        assert_eq!(result.files_skipped, 2);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(content(&fs, "/w/b.txt").await, "foo");
    }

    #[tokio::test]
    async fn test_cancelled_run_writes_nothing() {
        let (fs, orchestrator) = setup(&[("/w/a.txt", "foo"), ("/w/b.txt", "foo")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = orchestrator
            .run_with_cancellation(&BulkEditRequest::bulk_replace(["*.txt"], "foo", "bar"), cancel)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.per_file_errors.len(), 2);
        assert!(result
            .per_file_errors
            .iter()
            .all(|e| e.kind == ErrorKind::Cancelled));
        assert_eq!(fs.write_count(Path::new("/w/a.txt")).await, 0);
    }

    #[tokio::test]
    async fn test_preview_renders_diff_without_writing() {
        let (fs, orchestrator) = setup(&[("/w/a.txt", "foo\nkeep\n")]);
        let preview = orchestrator
            .preview(&BulkEditRequest::bulk_replace(["a.txt"], "foo", "bar"))
            .await
            .unwrap();

        assert_eq!(preview.total_files, 1);
        assert_eq!(preview.total_edits, 1);
        assert!(preview.files[0].diff.contains("-foo\n+bar\n"));
        assert_eq!(fs.write_count(Path::new("/w/a.txt")).await, 0);
        assert!(fs.paths().await.iter().all(|p| !p.starts_with("/backups")));
    }

    #[tokio::test]
    async fn test_rollback_id_option_reuses_session() {
        let (_fs, orchestrator) = setup(&[("/w/a.txt", "foo")]);
        let request = BulkEditRequest::bulk_replace(["a.txt"], "foo", "bar").with_options(
            BulkEditOptions {
                rollback_id: Some("retry-1".to_string()),
                ..Default::default()
            },
        );
        let result = orchestrator.run(&request).await.unwrap();
        assert_eq!(result.rollback_id.as_deref(), Some("retry-1"));
    }
}
