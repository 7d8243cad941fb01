//! Per-file conditions for conditional edits

use std::path::Path;

use regex::Regex;

use crate::error::{BulkEditError, Result};
use crate::types::{BulkEditCondition, ConditionKind};

#[derive(Debug, Clone)]
enum Matcher {
    Contains(String),
    Regex(Regex),
    SizeAbove(u64),
    SizeBelow(u64),
    LinesAbove(usize),
    LinesBelow(usize),
}

/// A condition with its pattern parsed once for the whole run
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    matcher: Matcher,
    negate: bool,
}

/// Evaluates conditions over already-read file content
#[derive(Debug, Clone, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Parses the condition's pattern for its kind
    pub fn compile(condition: &BulkEditCondition) -> Result<CompiledCondition> {
        let pattern = condition.pattern.as_str();
        if pattern.is_empty() {
            return Err(BulkEditError::InvalidRequest(
                "condition pattern is empty".to_string(),
            ));
        }

        let matcher = match condition.kind {
            ConditionKind::Contains => Matcher::Contains(pattern.to_string()),
            ConditionKind::Regex => Matcher::Regex(Regex::new(pattern).map_err(|e| {
                BulkEditError::InvalidRequest(format!(
                    "condition regex '{}' does not compile: {}",
                    pattern, e
                ))
            })?),
            ConditionKind::SizeAbove => Matcher::SizeAbove(parse_count(condition)?),
            ConditionKind::SizeBelow => Matcher::SizeBelow(parse_count(condition)?),
            ConditionKind::LinesAbove => Matcher::LinesAbove(parse_count(condition)?),
            ConditionKind::LinesBelow => Matcher::LinesBelow(parse_count(condition)?),
        };

        Ok(CompiledCondition {
            matcher,
            negate: condition.negate,
        })
    }

    /// Tests `content`; `negate` is applied after the match
    pub fn evaluate(condition: &CompiledCondition, content: &str) -> bool {
        let matched = match &condition.matcher {
            Matcher::Contains(needle) => content.contains(needle.as_str()),
            Matcher::Regex(regex) => regex.is_match(content),
            Matcher::SizeAbove(limit) => content.len() as u64 > *limit,
            Matcher::SizeBelow(limit) => (content.len() as u64) < *limit,
            Matcher::LinesAbove(limit) => content.lines().count() > *limit,
            Matcher::LinesBelow(limit) => content.lines().count() < *limit,
        };
        matched != condition.negate
    }

    /// Evaluates the outcome of reading `path`
    ///
    /// A read failure is a `ConditionEvaluation` error whatever `negate`
    /// says, so an unreadable file is never selected.
    pub fn evaluate_read<E: std::fmt::Display>(
        condition: &CompiledCondition,
        path: &Path,
        read: std::result::Result<&str, E>,
    ) -> Result<bool> {
        match read {
            Ok(content) => Ok(Self::evaluate(condition, content)),
            Err(e) => Err(BulkEditError::ConditionEvaluation {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }
}

fn parse_count<T: std::str::FromStr>(condition: &BulkEditCondition) -> Result<T> {
    condition.pattern.trim().parse().map_err(|_| {
        BulkEditError::InvalidRequest(format!(
            "condition {:?} needs a non-negative number, got '{}'",
            condition.kind, condition.pattern
        ))
    })
}
