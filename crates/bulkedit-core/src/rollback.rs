//! Rollback of bulk edit sessions
//!
//! Restores every file captured under a session to its pre-image. Failures
//! are collected per file; the remaining entries are still restored.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bulkedit_files::{
    BackupManager, ContentVerifier, FileSystem, RollbackEntry, RollbackSessionSummary,
};
use tracing::{debug, error, info, warn};

use crate::error::{BulkEditError, Result};
use crate::types::{BulkEditResult, FileOutcome, FileStatus};

/// Restores files from rollback sessions
#[derive(Clone)]
pub struct RollbackManager {
    fs: Arc<dyn FileSystem>,
    backups: BackupManager,
}

impl RollbackManager {
    /// Creates a rollback manager over the same store the orchestrator uses
    pub fn new(fs: Arc<dyn FileSystem>, backups: BackupManager) -> Self {
        Self { fs, backups }
    }

    /// Restores every file in `session_id`
    ///
    /// On full success the session is deleted. On partial failure only the
    /// failed entries stay in the session so the same id can be retried;
    /// nothing is retried automatically.
    ///
    /// # Arguments
    ///
    /// * `session_id` - The `rollbackId` returned by a previous run
    pub async fn rollback(&self, session_id: &str) -> Result<BulkEditResult> {
        let started = Instant::now();
        let session = self
            .backups
            .session(session_id)
            .await
            .ok_or_else(|| BulkEditError::RollbackSessionNotFound(session_id.to_string()))?;

        info!(
            session_id,
            files = session.entries.len(),
            "Starting rollback"
        );

        let mut result = BulkEditResult::default();
        let mut failed: Vec<PathBuf> = Vec::new();

        for entry in session.entries.values() {
            result.files_processed += 1;
            let path = entry.file_path.clone();
            match self.restore(session_id, entry, &mut result.warnings).await {
                Ok(status) => {
                    let edits_applied = usize::from(status == FileStatus::Modified);
                    result.files_modified += edits_applied;
                    result.edits_applied += edits_applied;
                    result.file_outcomes.push(FileOutcome {
                        path,
                        status,
                        edits_applied,
                    });
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Restore failed");
                    result.per_file_errors.push(e.for_path(&path));
                    result.file_outcomes.push(FileOutcome {
                        path: path.clone(),
                        status: FileStatus::Failed,
                        edits_applied: 0,
                    });
                    failed.push(path);
                }
            }
        }

        // Store cleanup failures never hide the per-file result: the files
        // are already restored at this point.
        if failed.is_empty() {
            if let Err(e) = self.backups.remove_session(session_id).await {
                warn!(session_id, error = %e, "Rollback session could not be deleted");
                result.warnings.push(format!(
                    "every file was restored but session {} could not be deleted: {}",
                    session_id, e
                ));
                result.rollback_id = Some(session_id.to_string());
            }
        } else {
            let partial = BulkEditError::RollbackPartialFailure {
                session_id: session_id.to_string(),
                restored: result.files_processed - failed.len(),
                failed: failed.len(),
            };
            warn!("{}", partial);
            result.warnings.push(format!(
                "{}; the session keeps the failed files for a retry",
                partial
            ));
            if let Err(e) = self.backups.retain_entries(session_id, &failed).await {
                warn!(session_id, error = %e, "Restored entries could not be dropped");
                result.warnings.push(format!(
                    "restored files are still listed in session {}: {}",
                    session_id, e
                ));
            }
            result.rollback_id = Some(session_id.to_string());
        }

        result.success = result.per_file_errors.is_empty();
        result.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            session_id,
            success = result.success,
            restored = result.files_processed - failed.len(),
            failed = failed.len(),
            "Rollback finished"
        );
        Ok(result)
    }

    /// Sessions that can still be rolled back, newest first
    pub async fn available(&self) -> Vec<RollbackSessionSummary> {
        self.backups.list_sessions().await
    }

    /// Deletes expired sessions; returns how many were removed
    pub async fn cleanup_expired(&self) -> Result<usize> {
        Ok(self.backups.cleanup_expired().await?)
    }

    async fn restore(
        &self,
        session_id: &str,
        entry: &RollbackEntry,
        warnings: &mut Vec<String>,
    ) -> Result<FileStatus> {
        let path = &entry.file_path;
        let original = self.backups.read_original(session_id, entry).await?;

        match self.fs.read_to_string(path).await {
            Ok(current) => {
                if current == original {
                    debug!(path = %path.display(), "Already at its original content");
                    return Ok(FileStatus::Unchanged);
                }
                let checksum = ContentVerifier::compute_hash(&current);
                if entry
                    .applied_checksum
                    .as_ref()
                    .is_some_and(|applied| *applied != checksum)
                {
                    warn!(path = %path.display(), "File changed after the edit, restoring anyway");
                    warnings.push(format!(
                        "{}: modified after the bulk edit; later changes were overwritten",
                        path.display()
                    ));
                }
            }
            Err(e) if e.is_not_found() => {
                warnings.push(format!(
                    "{}: no longer existed and was recreated",
                    path.display()
                ));
            }
            Err(e) => return Err(e.into()),
        }

        self.fs.write_atomic(path, &original).await?;
        debug!(path = %path.display(), "Restored");
        Ok(FileStatus::Modified)
    }
}
