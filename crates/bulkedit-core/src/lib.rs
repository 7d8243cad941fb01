#![warn(missing_docs)]

//! BulkEdit Engine
//!
//! Applies structured text edits across many files concurrently, with dry-run
//! preview, pre-flight validation, impact estimation and session-based
//! rollback.
//!
//! # Architecture
//!
//! - **Resolution**: [`FileSetResolver`] expands patterns into a sorted,
//!   deduplicated file list
//! - **Planning**: [`EditPlanner`] turns each operation mode into per-file
//!   [`TextEdit`] lists; [`ConditionEvaluator`] and [`CompiledPattern`] feed it
//! - **Application**: [`EditApplier`] rejects overlapping spans and applies the
//!   rest from the end of the document backwards
//! - **Coordination**: [`BulkEditOrchestrator`] runs the per-file pipeline on a
//!   bounded worker pool, capturing pre-images before each write
//! - **Recovery**: [`RollbackManager`] restores a session's pre-images
//! - **Surface**: [`BulkEditTools`] decodes JSON arguments and answers with
//!   [`ToolResponse`]
//!
//! # Example
//!
//! ```ignore
//! use bulkedit_core::{BulkEditRequest, BulkEditTools, EngineConfig};
//!
//! let config = EngineConfig::load(None)?;
//! let tools = BulkEditTools::from_config(&config).await?;
//! let result = tools
//!     .orchestrator()
//!     .run(&BulkEditRequest::bulk_replace(["src/**/*.rs"], "old_name", "new_name"))
//!     .await?;
//! println!("{} file(s) modified", result.files_modified);
//! ```

pub mod applier;
pub mod condition;
pub mod config;
pub mod error;
pub mod impact;
pub mod orchestrator;
pub mod patterns;
pub mod planner;
pub mod resolver;
pub mod rollback;
pub mod statistics;
pub mod tools;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use applier::{EditApplier, LineIndex};
pub use condition::{CompiledCondition, ConditionEvaluator};
pub use config::EngineConfig;
pub use error::{BulkEditError, EditConflict, ErrorKind, PerFileError, Result};
pub use impact::ImpactEstimator;
pub use orchestrator::BulkEditOrchestrator;
pub use patterns::CompiledPattern;
pub use planner::EditPlanner;
pub use resolver::{FileSetResolver, ResolvedFiles};
pub use rollback::RollbackManager;
pub use statistics::FileStatisticsCollector;
pub use tools::{BulkEditTools, ToolResponse, TOOL_NAMES};
pub use types::{
    BulkEditCondition, BulkEditOptions, BulkEditRequest, BulkEditResult, BulkOperation,
    BulkRefactorPattern, ConditionKind, ExtensionStats, FileOutcome, FilePreview, FileSize,
    FileStatistics, FileStatus, ImpactEstimate, InaccessibleFile, MultiFileEditOperation,
    OperationType, Position, PreviewResult, RefactorKind, RiskLevel, Severity, Span, TextEdit,
    ValidationIssue, ValidationResult,
};
pub use validator::RequestValidator;

// Re-export the file layer so callers need only one dependency
pub use bulkedit_files::{
    BackupManager, FileSystem, InMemoryFileSystem, LocalFileSystem, RollbackSessionSummary,
};
