//! Impact estimation for bulk edits
//!
//! Counts what an operation would touch without writing anything, then
//! derives a risk level, an effort score and a recommended worker-pool size.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bulkedit_files::FileSystem;
use regex::Regex;
use tracing::debug;

use crate::condition::{CompiledCondition, ConditionEvaluator};
use crate::config::{host_parallelism, EngineConfig};
use crate::error::{BulkEditError, Result};
use crate::patterns::CompiledPattern;
use crate::planner::EditPlanner;
use crate::resolver::FileSetResolver;
use crate::statistics::scan;
use crate::types::{BulkOperation, ImpactEstimate, OperationType, RiskLevel};

const MAX_BATCH_SIZE: usize = 100;

/// How edits are counted for one file
enum EditCounter {
    Matches(Regex),
    Conditional(CompiledCondition, usize),
    Fixed(BTreeMap<PathBuf, usize>),
    Unknown,
}

impl EditCounter {
    fn count(&self, path: &Path, content: &str) -> usize {
        match self {
            EditCounter::Matches(regex) => regex.find_iter(content).count(),
            EditCounter::Conditional(condition, edits) => {
                if ConditionEvaluator::evaluate(condition, content) {
                    *edits
                } else {
                    0
                }
            }
            EditCounter::Fixed(per_file) => per_file.get(path).copied().unwrap_or(0),
            EditCounter::Unknown => 0,
        }
    }
}

/// Estimates the impact of an operation over its file set
#[derive(Clone)]
pub struct ImpactEstimator {
    fs: Arc<dyn FileSystem>,
    resolver: FileSetResolver,
    large_file_threshold: u64,
    host_parallelism: usize,
}

impl ImpactEstimator {
    /// Creates an estimator rooted at the configured workspace
    pub fn new(fs: Arc<dyn FileSystem>, config: &EngineConfig) -> Self {
        Self {
            resolver: FileSetResolver::new(fs.clone(), config.workspace_root.clone())
                .with_protected_dir(config.resolved_backup_dir()),
            fs,
            large_file_threshold: config.large_file_threshold_bytes,
            host_parallelism: host_parallelism(),
        }
    }

    /// Overrides the CPU count used for the parallelism recommendation
    pub fn with_host_parallelism(mut self, cpus: usize) -> Self {
        self.host_parallelism = cpus.max(1);
        self
    }

    /// Estimates `operation` over `files`
    ///
    /// Without `detail` the estimate covers sizes only and `estimatedEdits`
    /// stays 0. With it, edits are counted the way the planner would plan
    /// them.
    ///
    /// # Arguments
    ///
    /// * `operation` - Mode being estimated
    /// * `files` - File patterns; ignored for multi-file edits, whose
    ///   operations carry their own
    /// * `excluded` - Exclusion patterns
    /// * `detail` - Mode-specific fields, when the caller has them
    pub async fn estimate(
        &self,
        operation: OperationType,
        files: &[String],
        excluded: &[String],
        detail: Option<&BulkOperation>,
    ) -> Result<ImpactEstimate> {
        let mut warnings = Vec::new();

        let (targets, unresolved, counter) = match detail {
            Some(BulkOperation::MultiFileEdit { operations }) => {
                let mut targets = Vec::with_capacity(operations.len());
                let mut unresolved = Vec::new();
                for op in operations {
                    let resolved = self
                        .resolver
                        .resolve(std::slice::from_ref(&op.file_pattern), excluded)
                        .await?;
                    unresolved.extend(resolved.unresolved_patterns);
                    targets.push(resolved.files);
                }
                let merged = EditPlanner::merge_operations(operations, &targets);
                let counts: BTreeMap<PathBuf, usize> =
                    merged.iter().map(|(p, e)| (p.clone(), e.len())).collect();
                let files: Vec<PathBuf> = counts.keys().cloned().collect();
                (files, unresolved, EditCounter::Fixed(counts))
            }
            _ => {
                if files.is_empty() {
                    return Err(BulkEditError::InvalidRequest(
                        "no file patterns given".to_string(),
                    ));
                }
                let counter = match detail {
                    Some(op) => Self::counter(op)?,
                    None => {
                        warnings.push(
                            "no operation details given; estimatedEdits is not counted".to_string(),
                        );
                        EditCounter::Unknown
                    }
                };
                let resolved = self.resolver.resolve(files, excluded).await?;
                (resolved.files, resolved.unresolved_patterns, counter)
            }
        };

        let scanned = scan(&self.fs, targets, self.host_parallelism, |path, content| {
            counter.count(path, content)
        })
        .await;

        let mut estimate = ImpactEstimate {
            operation,
            total_files: scanned.len(),
            unresolved_patterns: unresolved,
            total_bytes: 0,
            total_lines: 0,
            estimated_edits: 0,
            files_with_matches: 0,
            oversized_files: Vec::new(),
            inaccessible_files: Vec::new(),
            risk_level: RiskLevel::Low,
            effort_score: 1,
            recommended_parallelism: 1,
            recommended_batch_size: 1,
            warnings: Vec::new(),
        };

        let mut readable = 0u64;
        for file in &scanned {
            let Ok(counts) = &file.read else {
                estimate.inaccessible_files.extend(file.inaccessible());
                continue;
            };
            readable += 1;
            estimate.total_bytes += counts.bytes;
            estimate.total_lines += counts.lines;
            if counts.bytes > self.large_file_threshold {
                estimate.oversized_files.push(file.path.clone());
            }
            if counts.edits > 0 {
                estimate.files_with_matches += 1;
                estimate.estimated_edits += counts.edits;
            }
        }

        estimate.risk_level = risk_level(estimate.estimated_edits, estimate.files_with_matches);
        estimate.effort_score = effort_score(estimate.total_files, estimate.estimated_edits);
        let average = if readable > 0 {
            estimate.total_bytes / readable
        } else {
            0
        };
        estimate.recommended_parallelism = recommended_parallelism(
            self.host_parallelism,
            estimate.total_files,
            average > self.large_file_threshold,
        );
        estimate.recommended_batch_size =
            recommended_batch_size(estimate.total_files, estimate.recommended_parallelism);

        if !estimate.unresolved_patterns.is_empty() {
            warnings.push(format!(
                "{} pattern(s) matched no files",
                estimate.unresolved_patterns.len()
            ));
        }
        if !estimate.inaccessible_files.is_empty() {
            warnings.push(format!(
                "{} file(s) could not be read",
                estimate.inaccessible_files.len()
            ));
        }
        if !estimate.oversized_files.is_empty() {
            warnings.push(format!(
                "{} file(s) exceed {} bytes",
                estimate.oversized_files.len(),
                self.large_file_threshold
            ));
        }
        if estimate.risk_level >= RiskLevel::High {
            warnings.push(format!(
                "{:?} risk: preview the change before applying it",
                estimate.risk_level
            ));
        }
        estimate.warnings = warnings;

        debug!(
            operation = %operation,
            files = estimate.total_files,
            edits = estimate.estimated_edits,
            risk = ?estimate.risk_level,
            "Impact estimated"
        );
        Ok(estimate)
    }

    fn counter(operation: &BulkOperation) -> Result<EditCounter> {
        Ok(match operation {
            BulkOperation::BulkReplace { regex_pattern, .. } => {
                EditCounter::Matches(Regex::new(regex_pattern).map_err(|e| {
                    BulkEditError::InvalidRequest(format!(
                        "regex '{}' does not compile: {}",
                        regex_pattern, e
                    ))
                })?)
            }
            BulkOperation::BatchRefactor { pattern } => {
                EditCounter::Matches(CompiledPattern::compile(pattern)?.regex().clone())
            }
            BulkOperation::ConditionalEdit { condition, edits } => {
                EditCounter::Conditional(ConditionEvaluator::compile(condition)?, edits.len())
            }
            BulkOperation::MultiFileEdit { .. } => EditCounter::Unknown,
        })
    }
}

/// Risk band for `edits x max(files_with_matches, 1)`
pub fn risk_level(edits: usize, files_with_matches: usize) -> RiskLevel {
    match edits.saturating_mul(files_with_matches.max(1)) {
        0..=10 => RiskLevel::Low,
        11..=100 => RiskLevel::Medium,
        101..=1000 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

/// Effort on a 1 to 10 scale
pub fn effort_score(files: usize, edits: usize) -> u32 {
    let raw = files / 10 + edits / 50 + 1;
    raw.min(10) as u32
}

/// Workers worth running for `files` files
pub fn recommended_parallelism(cpus: usize, files: usize, large_files: bool) -> usize {
    let parallelism = cpus.min(files).max(1);
    if large_files {
        (parallelism / 2).max(1)
    } else {
        parallelism
    }
}

/// Files per worker, clamped to `1..=100`
pub fn recommended_batch_size(files: usize, parallelism: usize) -> usize {
    files
        .div_ceil(parallelism.max(1))
        .clamp(1, MAX_BATCH_SIZE)
}
