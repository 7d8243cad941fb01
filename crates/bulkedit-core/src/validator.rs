//! Pre-flight request validation
//!
//! Checks syntax and shape only; never touches the file system. Every
//! problem becomes its own issue.

use std::collections::HashSet;

use regex::Regex;

use crate::applier::EditApplier;
use crate::condition::ConditionEvaluator;
use crate::patterns::CompiledPattern;
use crate::resolver::FileSetResolver;
use crate::types::{
    BulkEditRequest, BulkOperation, Severity, Span, TextEdit, ValidationIssue, ValidationResult,
};

/// Validates requests before any work starts
#[derive(Debug, Clone, Default)]
pub struct RequestValidator;

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn error(&mut self, field: &str, message: impl Into<String>) {
        self.push(Severity::Error, field, message);
    }

    fn warning(&mut self, field: &str, message: impl Into<String>) {
        self.push(Severity::Warning, field, message);
    }

    fn push(&mut self, severity: Severity, field: &str, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            severity,
            message: message.into(),
            field: Some(field.to_string()),
        });
    }
}

impl RequestValidator {
    /// Validates a request
    pub fn validate(request: &BulkEditRequest) -> ValidationResult {
        let mut issues = Issues::default();

        if !matches!(request.operation, BulkOperation::MultiFileEdit { .. }) {
            Self::check_file_patterns(&request.files, &mut issues);
        }
        for pattern in &request.excluded_files {
            if let Err(reason) = FileSetResolver::check_syntax(pattern) {
                issues.error("excludedFiles", format!("exclusion: {}", reason));
            }
        }

        match &request.operation {
            BulkOperation::BulkReplace {
                regex_pattern,
                replacement: _,
            } => Self::check_regex(regex_pattern, &mut issues),
            BulkOperation::ConditionalEdit { condition, edits } => {
                if let Err(e) = ConditionEvaluator::compile(condition) {
                    issues.error("condition", e.to_string());
                }
                if edits.is_empty() {
                    issues.error("edits", "conditional edit has no edits");
                }
                Self::check_edits("edits", edits, &mut issues);
            }
            BulkOperation::BatchRefactor { pattern } => {
                if let Err(e) = CompiledPattern::compile(pattern) {
                    issues.error("refactorPattern", e.to_string());
                }
            }
            BulkOperation::MultiFileEdit { operations } => {
                if operations.is_empty() {
                    issues.error("operations", "multi-file edit has no operations");
                }
                let mut seen = HashSet::new();
                for (i, op) in operations.iter().enumerate() {
                    let field = format!("operations[{}]", i);
                    if let Err(reason) = FileSetResolver::check_syntax(&op.file_pattern) {
                        issues.error(&field, reason);
                    } else if !seen.insert(op.file_pattern.as_str()) {
                        issues.error(
                            &field,
                            format!("file pattern '{}' is used by more than one operation", op.file_pattern),
                        );
                    }
                    if op.edits.is_empty() {
                        issues.warning(&field, "operation has no edits");
                    }
                    Self::check_edits(&field, &op.edits, &mut issues);
                }
            }
        }

        if request.options.max_parallelism == Some(0) {
            issues.error("options.maxParallelism", "maxParallelism must be at least 1");
        }
        if let Some(id) = &request.options.rollback_id {
            let valid = !id.is_empty()
                && id.len() <= 128
                && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                issues.error(
                    "options.rollbackId",
                    format!("rollback id '{}' may only contain letters, digits, '-' and '_'", id),
                );
            }
        }
        if request.options.preview_mode && request.options.rollback_id.is_some() {
            issues.warning("options.rollbackId", "rollbackId is ignored in preview mode");
        }

        let is_valid = !issues.0.iter().any(|i| i.severity == Severity::Error);
        ValidationResult {
            is_valid,
            issues: issues.0,
        }
    }

    fn check_file_patterns(files: &[String], issues: &mut Issues) {
        if files.is_empty() {
            issues.error("files", "no file patterns given");
            return;
        }
        let mut valid = 0;
        for pattern in files {
            match FileSetResolver::check_syntax(pattern) {
                Ok(()) => valid += 1,
                Err(reason) => issues.error("files", reason),
            }
        }
        if valid == 0 {
            issues.error("files", "no valid file patterns remain");
        }
    }

    fn check_regex(pattern: &str, issues: &mut Issues) {
        if pattern.is_empty() {
            issues.error("regexPattern", "regex pattern is empty");
            return;
        }
        match Regex::new(pattern) {
            Ok(regex) => {
                if regex.is_match("") {
                    issues.warning(
                        "regexPattern",
                        format!("regex '{}' matches the empty string and will edit between characters", pattern),
                    );
                }
            }
            Err(e) => issues.error(
                "regexPattern",
                format!("regex '{}' does not compile: {}", pattern, e),
            ),
        }
    }

    fn check_edits(field: &str, edits: &[TextEdit], issues: &mut Issues) {
        let spans: Vec<Span> = edits.iter().map(TextEdit::span).collect();
        let mut well_formed = true;
        for (i, span) in spans.iter().enumerate() {
            if !span.is_well_formed() {
                well_formed = false;
                issues.error(field, format!("edit #{} starts after it ends {}", i, span));
            }
        }
        if well_formed {
            for conflict in EditApplier::find_conflicts(&spans) {
                issues.error(field, conflict.to_string());
            }
        }
    }
}
