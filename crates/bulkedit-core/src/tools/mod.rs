//! Request/response surface of the engine
//!
//! Each tool takes a JSON argument object and returns a [`ToolResponse`].
//! Arguments are decoded into typed requests once, at this boundary; only
//! here are engine errors turned into wire strings.

pub mod args;
pub mod response;

use std::sync::Arc;

use bulkedit_files::{BackupManager, FileSystem, LocalFileSystem};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{BulkEditError, Result};
use crate::impact::ImpactEstimator;
use crate::orchestrator::BulkEditOrchestrator;
use crate::rollback::RollbackManager;
use crate::statistics::FileStatisticsCollector;
use crate::types::{BulkEditRequest, BulkEditResult, ValidationResult};
use crate::validator::RequestValidator;

pub use args::{
    BatchRefactorArgs, BulkReplaceArgs, ConditionalEditArgs, ModeArgs, MultiFileEditArgs,
    OptionsArgs, RollbackArgs, StatisticsArgs,
};
pub use response::ToolResponse;

/// Every tool [`BulkEditTools::call`] answers to
pub const TOOL_NAMES: [&str; 11] = [
    "bulk_replace",
    "conditional_edit",
    "batch_refactor",
    "multi_file_edit",
    "preview_bulk_changes",
    "validate_bulk_edit",
    "estimate_bulk_impact",
    "get_bulk_file_statistics",
    "rollback_bulk_edit",
    "get_available_rollbacks",
    "cleanup_expired_rollbacks",
];

/// The engine's components behind one dispatch point
#[derive(Clone)]
pub struct BulkEditTools {
    orchestrator: BulkEditOrchestrator,
    rollback: RollbackManager,
    impact: ImpactEstimator,
    statistics: FileStatisticsCollector,
}

impl BulkEditTools {
    /// Wires every component over one file system and rollback store
    pub fn new(fs: Arc<dyn FileSystem>, backups: BackupManager, config: &EngineConfig) -> Self {
        Self {
            orchestrator: BulkEditOrchestrator::new(fs.clone(), backups.clone(), config),
            rollback: RollbackManager::new(fs.clone(), backups),
            impact: ImpactEstimator::new(fs.clone(), config),
            statistics: FileStatisticsCollector::new(fs, config),
        }
    }

    /// Builds the tools over the local disk, loading persisted sessions
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new());
        let backups =
            BackupManager::open(fs.clone(), config.resolved_backup_dir(), config.rollback_ttl())
                .await?;
        Ok(Self::new(fs, backups, config))
    }

    /// The orchestrator behind the editing tools
    pub fn orchestrator(&self) -> &BulkEditOrchestrator {
        &self.orchestrator
    }

    /// The rollback manager behind the rollback tools
    pub fn rollback_manager(&self) -> &RollbackManager {
        &self.rollback
    }

    /// Dispatches one tool call
    ///
    /// Never fails: unknown tools, undecodable arguments and engine errors
    /// all come back as `{success: false, error}`.
    pub async fn call(&self, name: &str, args: Value) -> ToolResponse {
        debug!(tool = name, "Tool call");
        let outcome = match name {
            "bulk_replace" => self.edit::<BulkReplaceArgs>(name, args).await,
            "conditional_edit" => self.edit::<ConditionalEditArgs>(name, args).await,
            "batch_refactor" => self.edit::<BatchRefactorArgs>(name, args).await,
            "multi_file_edit" => self.edit::<MultiFileEditArgs>(name, args).await,
            "preview_bulk_changes" => self.preview(name, args).await,
            "validate_bulk_edit" => self.validate(name, args),
            "estimate_bulk_impact" => self.estimate(name, args).await,
            "get_bulk_file_statistics" => self.file_statistics(name, args).await,
            "rollback_bulk_edit" => self.rollback(name, args).await,
            "get_available_rollbacks" => Ok(ToolResponse::ok(&self.rollback.available().await)),
            "cleanup_expired_rollbacks" => self
                .rollback
                .cleanup_expired()
                .await
                .map(|removed| ToolResponse::ok(&json!({ "removed": removed }))),
            _ => return ToolResponse::err(format!("Unknown tool: {}", name)),
        };

        outcome.unwrap_or_else(|e| {
            warn!(tool = name, error = %e, "Tool call failed");
            ToolResponse::err(e.to_string())
        })
    }

    async fn edit<A>(&self, name: &str, args: Value) -> Result<ToolResponse>
    where
        A: DeserializeOwned + Into<BulkEditRequest>,
    {
        let request: BulkEditRequest = decode::<A>(name, args)?.into();
        if request.options.preview_mode {
            let preview = self.orchestrator.preview(&request).await?;
            return Ok(ToolResponse::ok(&preview));
        }
        let result = self.orchestrator.run(&request).await?;
        Ok(run_response(&result, None))
    }

    async fn preview(&self, name: &str, args: Value) -> Result<ToolResponse> {
        let request = mode_request(name, args)?;
        Ok(ToolResponse::ok(&self.orchestrator.preview(&request).await?))
    }

    fn validate(&self, name: &str, args: Value) -> Result<ToolResponse> {
        let validation = match decode::<ModeArgs>(name, args)?.into_request() {
            Ok(request) => RequestValidator::validate(&request),
            Err(issues) => ValidationResult {
                is_valid: false,
                issues,
            },
        };
        Ok(ToolResponse::ok(&validation))
    }

    async fn estimate(&self, name: &str, args: Value) -> Result<ToolResponse> {
        let args = decode::<ModeArgs>(name, args)?;
        let operation = args.operation_type;
        let files = args.files.clone();
        let mut excluded = args.excluded_files.clone();
        excluded.extend(args.options.excluded_files.iter().cloned());

        let detail = if args.has_detail() {
            Some(args.into_request().map_err(|issues| invalid_args(name, &issues))?)
        } else {
            None
        };
        let estimate = self
            .impact
            .estimate(
                operation,
                &files,
                &excluded,
                detail.as_ref().map(|request| &request.operation),
            )
            .await?;
        Ok(ToolResponse::ok(&estimate))
    }

    async fn file_statistics(&self, name: &str, args: Value) -> Result<ToolResponse> {
        let args = decode::<StatisticsArgs>(name, args)?;
        let stats = self
            .statistics
            .collect(&args.files, &args.excluded_files)
            .await?;
        Ok(ToolResponse::ok(&stats))
    }

    async fn rollback(&self, name: &str, args: Value) -> Result<ToolResponse> {
        let args = decode::<RollbackArgs>(name, args)?;
        let result = self.rollback.rollback(&args.rollback_id).await?;
        let error = (!result.success).then(|| {
            BulkEditError::RollbackPartialFailure {
                session_id: args.rollback_id.clone(),
                restored: result.files_processed - result.per_file_errors.len(),
                failed: result.per_file_errors.len(),
            }
            .to_string()
        });
        Ok(run_response(&result, error))
    }
}

fn decode<A: DeserializeOwned>(name: &str, args: Value) -> Result<A> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| {
        BulkEditError::InvalidRequest(format!("invalid arguments for {}: {}", name, e))
    })
}

fn mode_request(name: &str, args: Value) -> Result<BulkEditRequest> {
    decode::<ModeArgs>(name, args)?
        .into_request()
        .map_err(|issues| invalid_args(name, &issues))
}

fn invalid_args(name: &str, issues: &[crate::types::ValidationIssue]) -> BulkEditError {
    let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
    BulkEditError::InvalidRequest(format!(
        "invalid arguments for {}: {}",
        name,
        messages.join("; ")
    ))
}

fn run_response(result: &BulkEditResult, error: Option<String>) -> ToolResponse {
    let error = error.or_else(|| {
        (!result.success).then(|| {
            format!(
                "{} file(s) failed; see perFileErrors",
                result.per_file_errors.len()
            )
        })
    });
    ToolResponse::with_status(result.success, result, error)
}
