//! Rollback-session store
//!
//! Captures the pre-edit content of files into sessions keyed by an opaque id.
//! Each session lives in its own directory under the backup root:
//!
//! ```text
//! <backup_dir>/<session-id>/session.json         id, creation and expiry times
//! <backup_dir>/<session-id>/<sha256>.bak         one blob per captured file
//! <backup_dir>/<session-id>/<sha256>.entry.json  one record per captured file
//! ```
//!
//! A file is captured at most once per session, so retrying a partially
//! failed run under the same id never overwrites the true original.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{FileError, Result};
use crate::filesystem::FileSystem;
use crate::models::{RollbackEntry, RollbackSession, RollbackSessionSummary};
use crate::verifier::ContentVerifier;

const SESSION_FILE: &str = "session.json";
const ENTRY_SUFFIX: &str = ".entry.json";

/// Session-level fields of `session.json`; entries have their own records
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionHeader {
    id: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// What a capture call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The content was stored as the file's pre-image
    Captured,
    /// The file already had a pre-image in this session; nothing changed
    AlreadyCaptured,
}

/// Manages rollback-session capture, lookup and expiry
#[derive(Clone)]
pub struct BackupManager {
    fs: Arc<dyn FileSystem>,
    backup_dir: PathBuf,
    ttl: Duration,
    verifier: ContentVerifier,
    sessions: Arc<Mutex<HashMap<String, RollbackSession>>>,
}

impl std::fmt::Debug for BackupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupManager")
            .field("backup_dir", &self.backup_dir)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl BackupManager {
    /// Creates a new BackupManager instance with no sessions loaded
    ///
    /// # Arguments
    ///
    /// * `fs` - File system used for blobs and metadata
    /// * `backup_dir` - Directory where sessions are stored
    /// * `ttl` - Lifetime of a session from its creation
    pub fn new(fs: Arc<dyn FileSystem>, backup_dir: PathBuf, ttl: Duration) -> Self {
        BackupManager {
            fs,
            backup_dir,
            ttl,
            verifier: ContentVerifier::new(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates a BackupManager and loads the sessions already on disk
    pub async fn open(fs: Arc<dyn FileSystem>, backup_dir: PathBuf, ttl: Duration) -> Result<Self> {
        let manager = Self::new(fs, backup_dir, ttl);
        let loaded = manager.load_sessions().await?;
        info!(
            backup_dir = %manager.backup_dir.display(),
            sessions = loaded,
            "Rollback store opened"
        );
        Ok(manager)
    }

    /// Directory holding all sessions
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Generates a fresh session id
    pub fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Reads every session directory under the backup root into memory
    ///
    /// Sessions without a readable `session.json` and malformed entry records
    /// are skipped with a warning.
    pub async fn load_sessions(&self) -> Result<usize> {
        if !self.fs.exists(&self.backup_dir).await {
            debug!("Backup directory does not exist, no sessions to load");
            return Ok(0);
        }

        let mut loaded = HashMap::new();
        for dir in self.fs.list_dir(&self.backup_dir).await? {
            match self.load_session(&dir).await {
                Ok(session) => {
                    loaded.insert(session.id.clone(), session);
                }
                Err(e) => warn!("Skipping rollback session at {}: {}", dir.display(), e),
            }
        }

        let count = loaded.len();
        let mut sessions = self.sessions.lock().await;
        for (id, session) in loaded {
            sessions.entry(id).or_insert(session);
        }
        Ok(count)
    }

    async fn load_session(&self, dir: &Path) -> Result<RollbackSession> {
        let raw = self.fs.read_to_string(&dir.join(SESSION_FILE)).await?;
        let header: SessionHeader = serde_json::from_str(&raw)?;
        let mut session = RollbackSession {
            id: header.id,
            created_at: header.created_at,
            expires_at: header.expires_at,
            entries: Default::default(),
        };

        for child in self.fs.list_dir(dir).await? {
            let is_record = child
                .file_name()
                .is_some_and(|name| name.to_string_lossy().ends_with(ENTRY_SUFFIX));
            if !is_record {
                continue;
            }
            let parsed = match self.fs.read_to_string(&child).await {
                Ok(raw) => serde_json::from_str::<RollbackEntry>(&raw).map_err(FileError::from),
                Err(e) => Err(e),
            };
            match parsed {
                Ok(entry) => {
                    session.entries.insert(entry.file_path.clone(), entry);
                }
                Err(e) => warn!("Skipping entry record {}: {}", child.display(), e),
            }
        }
        Ok(session)
    }

    /// Captures the pre-edit content of a file
    ///
    /// Creates the session on first use. A second capture of the same file in
    /// the same session is a no-op and returns [`CaptureOutcome::AlreadyCaptured`].
    ///
    /// # Arguments
    ///
    /// * `session_id` - Session to capture into
    /// * `path` - Absolute path of the file
    /// * `original` - Content read before editing
    pub async fn capture(
        &self,
        session_id: &str,
        path: &Path,
        original: &str,
    ) -> Result<CaptureOutcome> {
        validate_session_id(session_id)?;

        // The entry is reserved under the lock; its blob and record are
        // written after the lock is released.
        let entry = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get(session_id).map(|s| s.entries.contains_key(path)) {
                Some(true) => {
                    debug!(
                        session_id,
                        path = %path.display(),
                        "File already captured in session"
                    );
                    return Ok(CaptureOutcome::AlreadyCaptured);
                }
                Some(false) => {}
                None => {
                    let session = self.create_session(session_id).await?;
                    sessions.insert(session_id.to_string(), session);
                }
            }

            let entry = RollbackEntry {
                file_path: path.to_path_buf(),
                checksum: ContentVerifier::compute_hash(original),
                size: original.len() as u64,
                blob: ContentVerifier::blob_name(path),
                captured_at: Utc::now(),
                applied_checksum: None,
            };
            if let Some(session) = sessions.get_mut(session_id) {
                session.entries.insert(path.to_path_buf(), entry.clone());
            }
            entry
        };

        let session_dir = self.session_dir(session_id);
        let stored = match self
            .fs
            .write_atomic(&session_dir.join(&entry.blob), original)
            .await
        {
            Ok(()) => self.write_record(session_id, &entry).await,
            Err(e) => Err(e),
        };
        if let Err(e) = stored {
            self.release(session_id, &entry).await;
            return Err(FileError::BackupFailed(format!(
                "Failed to store pre-image of {}: {}",
                path.display(),
                e
            )));
        }

        debug!(session_id, path = %path.display(), "Captured pre-edit content");
        Ok(CaptureOutcome::Captured)
    }

    /// Writes the directory and header of a new session
    async fn create_session(&self, session_id: &str) -> Result<RollbackSession> {
        let now = Utc::now();
        let header = SessionHeader {
            id: session_id.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        let session_dir = self.session_dir(session_id);
        let json = serde_json::to_string_pretty(&header)?;
        self.fs
            .create_dir_all(&session_dir)
            .await
            .map_err(|e| FileError::BackupFailed(format!("Failed to create session directory: {}", e)))?;
        self.fs
            .write_atomic(&session_dir.join(SESSION_FILE), &json)
            .await
            .map_err(|e| FileError::BackupFailed(format!("Failed to write session metadata: {}", e)))?;

        info!(session_id, expires_at = %header.expires_at, "Rollback session created");
        Ok(RollbackSession {
            id: header.id,
            created_at: header.created_at,
            expires_at: header.expires_at,
            entries: Default::default(),
        })
    }

    /// Undoes a reservation whose blob or record could not be stored
    async fn release(&self, session_id: &str, entry: &RollbackEntry) {
        let session_dir = self.session_dir(session_id);
        for name in [entry.blob.clone(), record_name(&entry.blob)] {
            if let Err(e) = self.fs.remove_file(&session_dir.join(name)).await {
                if !e.is_not_found() {
                    warn!("Failed to clean up partial capture of {}: {}", entry.file_path.display(), e);
                }
            }
        }

        let mut sessions = self.sessions.lock().await;
        let emptied = match sessions.get_mut(session_id) {
            Some(session) => {
                session.entries.remove(&entry.file_path);
                session.entries.is_empty()
            }
            None => false,
        };
        if emptied && self.fs.remove_dir_all(&session_dir).await.is_ok() {
            sessions.remove(session_id);
        }
    }

    /// Records the checksum of the content written after an edit
    ///
    /// Rollback compares it with the file's current content to warn about
    /// modifications made after the edit.
    pub async fn record_applied(&self, session_id: &str, path: &Path, checksum: String) -> Result<()> {
        let entry = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| FileError::SessionNotFound(session_id.to_string()))?;
            let Some(entry) = session.entries.get_mut(path) else {
                return Ok(());
            };
            entry.applied_checksum = Some(checksum);
            entry.clone()
        };
        self.write_record(session_id, &entry).await
    }

    /// Returns a copy of a session
    pub async fn session(&self, session_id: &str) -> Option<RollbackSession> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    /// Reads a captured pre-image back, verifying its checksum
    pub async fn read_original(&self, session_id: &str, entry: &RollbackEntry) -> Result<String> {
        let blob_path = self.session_dir(session_id).join(&entry.blob);
        let content = self
            .fs
            .read_to_string(&blob_path)
            .await
            .map_err(|e| FileError::BackupFailed(format!("Failed to read backup blob: {}", e)))?;
        self.verifier
            .verify_content(&entry.file_path, &content, &entry.checksum)?;
        Ok(content)
    }

    /// Lists non-expired sessions, newest first
    pub async fn list_sessions(&self) -> Vec<RollbackSessionSummary> {
        let now = Utc::now();
        let sessions = self.sessions.lock().await;
        let mut summaries: Vec<RollbackSessionSummary> = sessions
            .values()
            .filter(|s| !s.is_expired(now))
            .map(RollbackSession::summary)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    /// Deletes a session and its blobs
    ///
    /// The session stays listed when its directory cannot be deleted, so the
    /// in-memory view never disagrees with what a reopen would load.
    pub async fn remove_session(&self, session_id: &str) -> Result<()> {
        validate_session_id(session_id)?;
        let mut sessions = self.sessions.lock().await;
        if !sessions.contains_key(session_id) {
            return Err(FileError::SessionNotFound(session_id.to_string()));
        }
        self.fs.remove_dir_all(&self.session_dir(session_id)).await?;
        sessions.remove(session_id);
        info!(session_id, "Rollback session removed");
        Ok(())
    }

    /// Keeps only the listed entries of a session, deleting the others
    ///
    /// An entry leaves the session only once its record is gone from disk.
    /// Returns the first record that could not be deleted.
    pub async fn retain_entries(&self, session_id: &str, keep: &[PathBuf]) -> Result<()> {
        let dropped: Vec<RollbackEntry> = {
            let sessions = self.sessions.lock().await;
            let session = sessions
                .get(session_id)
                .ok_or_else(|| FileError::SessionNotFound(session_id.to_string()))?;
            session
                .entries
                .values()
                .filter(|e| !keep.contains(&e.file_path))
                .cloned()
                .collect()
        };

        let session_dir = self.session_dir(session_id);
        let mut first_error = None;
        for entry in dropped {
            match self.fs.remove_file(&session_dir.join(record_name(&entry.blob))).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    warn!("Failed to delete entry record for {}: {}", entry.file_path.display(), e);
                    first_error.get_or_insert(e);
                    continue;
                }
            }
            if let Some(session) = self.sessions.lock().await.get_mut(session_id) {
                session.entries.remove(&entry.file_path);
            }
            if let Err(e) = self.fs.remove_file(&session_dir.join(&entry.blob)).await {
                warn!("Failed to delete blob for {}: {}", entry.file_path.display(), e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Deletes every expired session; returns how many were removed
    ///
    /// Safe to run repeatedly: a second sweep finds nothing to do.
    pub async fn cleanup_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let expired: Vec<String> = sessions
            .values()
            .filter(|s| s.is_expired(now))
            .map(|s| s.id.clone())
            .collect();

        for id in &expired {
            self.fs.remove_dir_all(&self.session_dir(id)).await?;
            sessions.remove(id);
        }

        if !expired.is_empty() {
            info!(removed = expired.len(), "Expired rollback sessions removed");
        }
        Ok(expired.len())
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.backup_dir.join(session_id)
    }

    async fn write_record(&self, session_id: &str, entry: &RollbackEntry) -> Result<()> {
        let json = serde_json::to_string_pretty(entry)?;
        self.fs
            .write_atomic(&self.session_dir(session_id).join(record_name(&entry.blob)), &json)
            .await
    }
}

/// Name of the metadata record stored next to a blob
fn record_name(blob: &str) -> String {
    format!("{}{}", blob.trim_end_matches(".bak"), ENTRY_SUFFIX)
}

/// Session ids become directory names, so only a safe alphabet is accepted
fn validate_session_id(session_id: &str) -> Result<()> {
    let valid = !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(FileError::InvalidPath(format!(
            "Invalid rollback session id: {:?}",
            session_id
        )))
    }
}
