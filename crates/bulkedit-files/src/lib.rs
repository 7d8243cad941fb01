#![warn(missing_docs)]

//! File layer for bulkedit
//!
//! Provides the file-system port used by the bulk edit engine, a local and an
//! in-memory adapter, content hashing, unified diffs, and the rollback-session
//! store that captures pre-edit file content.

pub mod backup;
pub mod diff;
pub mod error;
pub mod filesystem;
pub mod local;
pub mod memory;
pub mod models;
pub mod verifier;

// Re-export public API
pub use backup::{BackupManager, CaptureOutcome};
pub use diff::DiffEngine;
pub use error::{FileError, Result};
pub use filesystem::FileSystem;
pub use local::LocalFileSystem;
pub use memory::InMemoryFileSystem;
pub use models::{
    DiffHunk, DiffLine, DiffStats, FileDiff, FileMetadata, RollbackEntry, RollbackSession,
    RollbackSessionSummary,
};
pub use verifier::ContentVerifier;
