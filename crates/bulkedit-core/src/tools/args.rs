//! Typed tool arguments
//!
//! Raw JSON is decoded here once; everything past this module works on
//! [`BulkEditRequest`]. Keys are camelCase and accept snake_case aliases.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::types::{
    BulkEditCondition, BulkEditOptions, BulkEditRequest, BulkOperation, BulkRefactorPattern,
    MultiFileEditOperation, OperationType, Severity, TextEdit, ValidationIssue,
};

/// `options` object accepted by every mode
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionsArgs {
    /// Run options
    #[serde(flatten)]
    pub options: BulkEditOptions,
    /// Exclusions given inside `options`
    #[serde(alias = "excluded_files")]
    pub excluded_files: Vec<String>,
}

/// Arguments of `bulk_replace`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReplaceArgs {
    /// File patterns
    pub files: Vec<String>,
    /// Exclusion patterns
    #[serde(default, alias = "excluded_files")]
    pub excluded_files: Vec<String>,
    /// Regex to search for
    #[serde(alias = "regex_pattern")]
    pub regex_pattern: String,
    /// Replacement text
    #[serde(default)]
    pub replacement: String,
    /// Run options
    #[serde(default)]
    pub options: OptionsArgs,
}

/// Arguments of `conditional_edit`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalEditArgs {
    /// File patterns
    pub files: Vec<String>,
    /// Exclusion patterns
    #[serde(default, alias = "excluded_files")]
    pub excluded_files: Vec<String>,
    /// Per-file predicate
    pub condition: BulkEditCondition,
    /// Edits for each selected file
    pub edits: Vec<TextEdit>,
    /// Run options
    #[serde(default)]
    pub options: OptionsArgs,
}

/// Arguments of `batch_refactor`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRefactorArgs {
    /// File patterns
    pub files: Vec<String>,
    /// Exclusion patterns
    #[serde(default, alias = "excluded_files")]
    pub excluded_files: Vec<String>,
    /// The transform
    #[serde(alias = "refactor_pattern", alias = "pattern")]
    pub refactor_pattern: BulkRefactorPattern,
    /// Run options
    #[serde(default)]
    pub options: OptionsArgs,
}

/// Arguments of `multi_file_edit`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiFileEditArgs {
    /// Operations, each with its own file pattern
    #[serde(alias = "multiFileOps", alias = "multi_file_ops")]
    pub operations: Vec<MultiFileEditOperation>,
    /// Exclusion patterns
    #[serde(default, alias = "excluded_files")]
    pub excluded_files: Vec<String>,
    /// Run options
    #[serde(default)]
    pub options: OptionsArgs,
}

/// Arguments naming a mode plus its (optional) mode-specific fields
///
/// Used by preview, validation and impact estimation. The structured
/// fields stay raw until [`ModeArgs::into_request`] so that decoding
/// problems can be reported as validation issues.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeArgs {
    /// Mode
    #[serde(alias = "operation_type", alias = "operation")]
    pub operation_type: OperationType,
    /// File patterns
    #[serde(default)]
    pub files: Vec<String>,
    /// Exclusion patterns
    #[serde(default, alias = "excluded_files")]
    pub excluded_files: Vec<String>,
    /// Regex for `bulk_replace`
    #[serde(default, alias = "regex_pattern")]
    pub regex_pattern: Option<String>,
    /// Literal search text for `bulk_replace` when no regex is given
    #[serde(default, alias = "search_pattern")]
    pub search_pattern: Option<String>,
    /// Replacement for `bulk_replace`
    #[serde(default)]
    pub replacement: Option<String>,
    /// Condition for `conditional_edit`
    #[serde(default)]
    pub condition: Option<Value>,
    /// Edits for `conditional_edit`
    #[serde(default)]
    pub edits: Option<Value>,
    /// Pattern for `batch_refactor`
    #[serde(default, alias = "refactor_pattern")]
    pub refactor_pattern: Option<Value>,
    /// Operations for `multi_file_edit`
    #[serde(default, alias = "multiFileOps", alias = "multi_file_ops")]
    pub operations: Option<Value>,
    /// Run options
    #[serde(default)]
    pub options: OptionsArgs,
}

/// Arguments of `get_bulk_file_statistics`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsArgs {
    /// File patterns
    pub files: Vec<String>,
    /// Exclusion patterns
    #[serde(default, alias = "excluded_files")]
    pub excluded_files: Vec<String>,
}

/// Arguments of `rollback_bulk_edit`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackArgs {
    /// Session id returned by a run
    #[serde(alias = "rollback_id", alias = "id")]
    pub rollback_id: String,
}

fn request(
    files: Vec<String>,
    mut excluded_files: Vec<String>,
    operation: BulkOperation,
    options: OptionsArgs,
) -> BulkEditRequest {
    excluded_files.extend(options.excluded_files);
    BulkEditRequest {
        files,
        excluded_files,
        operation,
        options: options.options,
    }
}

impl From<BulkReplaceArgs> for BulkEditRequest {
    fn from(args: BulkReplaceArgs) -> Self {
        request(
            args.files,
            args.excluded_files,
            BulkOperation::BulkReplace {
                regex_pattern: args.regex_pattern,
                replacement: args.replacement,
            },
            args.options,
        )
    }
}

impl From<ConditionalEditArgs> for BulkEditRequest {
    fn from(args: ConditionalEditArgs) -> Self {
        request(
            args.files,
            args.excluded_files,
            BulkOperation::ConditionalEdit {
                condition: args.condition,
                edits: args.edits,
            },
            args.options,
        )
    }
}

impl From<BatchRefactorArgs> for BulkEditRequest {
    fn from(args: BatchRefactorArgs) -> Self {
        request(
            args.files,
            args.excluded_files,
            BulkOperation::BatchRefactor {
                pattern: args.refactor_pattern,
            },
            args.options,
        )
    }
}

impl From<MultiFileEditArgs> for BulkEditRequest {
    fn from(args: MultiFileEditArgs) -> Self {
        request(
            Vec::new(),
            args.excluded_files,
            BulkOperation::MultiFileEdit {
                operations: args.operations,
            },
            args.options,
        )
    }
}

impl ModeArgs {
    /// Whether any mode-specific field was supplied
    pub fn has_detail(&self) -> bool {
        self.regex_pattern.is_some()
            || self.search_pattern.is_some()
            || self.condition.is_some()
            || self.edits.is_some()
            || self.refactor_pattern.is_some()
            || self.operations.is_some()
    }

    /// Builds the typed request, or every decoding problem found
    pub fn into_request(self) -> Result<BulkEditRequest, Vec<ValidationIssue>> {
        let mut problems = Vec::new();

        let operation = match self.operation_type {
            OperationType::BulkReplace => {
                let regex_pattern = match (self.regex_pattern, self.search_pattern) {
                    (Some(regex), _) => Some(regex),
                    (None, Some(search)) => Some(regex::escape(&search)),
                    (None, None) => {
                        problems.push(issue("regexPattern", "regexPattern is required for bulk_replace"));
                        None
                    }
                };
                regex_pattern.map(|regex_pattern| BulkOperation::BulkReplace {
                    regex_pattern,
                    replacement: self.replacement.unwrap_or_default(),
                })
            }
            OperationType::ConditionalEdit => {
                let condition = decode::<BulkEditCondition>("condition", self.condition, &mut problems);
                let edits = decode::<Vec<TextEdit>>("edits", self.edits, &mut problems);
                match (condition, edits) {
                    (Some(condition), Some(edits)) => {
                        Some(BulkOperation::ConditionalEdit { condition, edits })
                    }
                    _ => None,
                }
            }
            OperationType::BatchRefactor => {
                decode::<BulkRefactorPattern>("refactorPattern", self.refactor_pattern, &mut problems)
                    .map(|pattern| BulkOperation::BatchRefactor { pattern })
            }
            OperationType::MultiFileEdit => {
                decode::<Vec<MultiFileEditOperation>>("operations", self.operations, &mut problems)
                    .map(|operations| BulkOperation::MultiFileEdit { operations })
            }
        };

        match operation {
            Some(operation) if problems.is_empty() => Ok(request(
                self.files,
                self.excluded_files,
                operation,
                self.options,
            )),
            _ => Err(problems),
        }
    }
}

fn issue(field: &str, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        severity: Severity::Error,
        message: message.into(),
        field: Some(field.to_string()),
    }
}

fn decode<T: DeserializeOwned>(
    field: &str,
    value: Option<Value>,
    problems: &mut Vec<ValidationIssue>,
) -> Option<T> {
    let Some(value) = value else {
        problems.push(issue(field, format!("{} is required", field)));
        return None;
    };
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            problems.push(issue(field, format!("{} could not be decoded: {}", field, e)));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use serde_json::json;

    #[test]
    fn test_bulk_replace_args_merge_exclusions() {
        let args: BulkReplaceArgs = serde_json::from_value(json!({
            "files": ["*.rs"],
            "excluded_files": ["target"],
            "regex_pattern": "foo",
            "replacement": "bar",
            "options": {"maxParallelism": 2, "excludedFiles": ["vendor"], "fail_fast": true}
        }))
        .unwrap();
        let request = BulkEditRequest::from(args);

        assert_eq!(request.excluded_files, vec!["target", "vendor"]);
        assert_eq!(request.options.max_parallelism, Some(2));
        assert!(request.options.fail_fast);
        assert!(request.options.create_backups);
    }

    #[test]
    fn test_conditional_edit_args_decode_text_edits() {
        let args: ConditionalEditArgs = serde_json::from_value(json!({
            "files": ["a.txt"],
            "condition": {"type": "contains", "pattern": "TODO"},
            "edits": [{"type": "insert", "line": 0, "column": 0, "text": "x"}]
        }))
        .unwrap();
        assert_eq!(args.edits, vec![TextEdit::insert(Position::new(0, 0), "x")]);
    }

    #[test]
    fn test_mode_args_search_pattern_is_literal() {
        let args: ModeArgs = serde_json::from_value(json!({
            "operationType": "bulk_replace",
            "files": ["a.txt"],
            "searchPattern": "a.b",
            "replacement": "c"
        }))
        .unwrap();
        let request = args.into_request().unwrap();
        assert_eq!(
            request.operation,
            BulkOperation::BulkReplace {
                regex_pattern: r"a\.b".to_string(),
                replacement: "c".to_string()
            }
        );
    }

    #[test]
    fn test_mode_args_collects_every_problem() {
        let args: ModeArgs = serde_json::from_value(json!({
            "operation_type": "conditional_edit",
            "files": ["a.txt"],
            "edits": [{"type": "move"}]
        }))
        .unwrap();
        let problems = args.into_request().unwrap_err();
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].field.as_deref(), Some("condition"));
        assert_eq!(problems[1].field.as_deref(), Some("edits"));
    }
}
