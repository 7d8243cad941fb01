//! Core types for bulk edit requests and their reports

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PerFileError;

/// A location in a text file
///
/// Lines and columns are 0-based. Columns count characters within the line,
/// not counting the `\n` terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line index
    pub line: usize,
    /// Column index within the line
    pub column: usize,
}

impl Position {
    /// Creates a position
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open region `[start, end)` in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// First position covered
    pub start: Position,
    /// First position past the region
    pub end: Position,
}

impl Span {
    /// Creates a span
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether the span covers nothing (an insertion point)
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `start <= end`
    pub fn is_well_formed(&self) -> bool {
        self.start <= self.end
    }

    /// Whether two spans collide
    ///
    /// Non-empty spans collide when they share any position. An insertion
    /// point collides with a span that strictly contains it, and with another
    /// insertion point at the same position since their order is ambiguous.
    pub fn intersects(&self, other: &Span) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => self.start == other.start,
            (true, false) => other.start < self.start && self.start < other.end,
            (false, true) => self.start < other.start && other.start < self.end,
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-{})", self.start, self.end)
    }
}

/// A single text edit on one file
///
/// Serialized with a `type` tag and snake_case fields:
/// `{"type": "replace", "start_line": 0, "start_column": 0, "end_line": 0, "end_column": 3, "new_text": "bar"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextEdit {
    /// Replace the span with new text
    Replace {
        /// Start line
        start_line: usize,
        /// Start column
        start_column: usize,
        /// End line
        end_line: usize,
        /// End column
        end_column: usize,
        /// Replacement text
        #[serde(default)]
        new_text: String,
    },
    /// Insert text at a position
    Insert {
        /// Line
        line: usize,
        /// Column
        column: usize,
        /// Text to insert
        text: String,
    },
    /// Remove the span
    Delete {
        /// Start line
        start_line: usize,
        /// Start column
        start_column: usize,
        /// End line
        end_line: usize,
        /// End column
        end_column: usize,
    },
}

impl TextEdit {
    /// Replace edit over `[start, end)`
    pub fn replace(start: Position, end: Position, new_text: impl Into<String>) -> Self {
        TextEdit::Replace {
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
            new_text: new_text.into(),
        }
    }

    /// Insert edit at `at`
    pub fn insert(at: Position, text: impl Into<String>) -> Self {
        TextEdit::Insert {
            line: at.line,
            column: at.column,
            text: text.into(),
        }
    }

    /// Delete edit over `[start, end)`
    pub fn delete(start: Position, end: Position) -> Self {
        TextEdit::Delete {
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
        }
    }

    /// Region the edit replaces; inserts are zero-width
    pub fn span(&self) -> Span {
        match *self {
            TextEdit::Replace {
                start_line,
                start_column,
                end_line,
                end_column,
                ..
            }
            | TextEdit::Delete {
                start_line,
                start_column,
                end_line,
                end_column,
            } => Span::new(
                Position::new(start_line, start_column),
                Position::new(end_line, end_column),
            ),
            TextEdit::Insert { line, column, .. } => {
                let at = Position::new(line, column);
                Span::new(at, at)
            }
        }
    }

    /// Text written in place of the span
    pub fn new_text(&self) -> &str {
        match self {
            TextEdit::Replace { new_text, .. } => new_text,
            TextEdit::Insert { text, .. } => text,
            TextEdit::Delete { .. } => "",
        }
    }
}

/// What a condition tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Content contains the pattern as a substring
    #[serde(alias = "Contains")]
    Contains,
    /// Content matches the pattern as a regex
    #[serde(alias = "Regex")]
    Regex,
    /// Size in bytes is greater than the pattern
    #[serde(alias = "SizeAbove", alias = "sizeAbove")]
    SizeAbove,
    /// Size in bytes is less than the pattern
    #[serde(alias = "SizeBelow", alias = "sizeBelow")]
    SizeBelow,
    /// Line count is greater than the pattern
    #[serde(alias = "LinesAbove", alias = "linesAbove")]
    LinesAbove,
    /// Line count is less than the pattern
    #[serde(alias = "LinesBelow", alias = "linesBelow")]
    LinesBelow,
}

/// Per-file predicate gating a conditional edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkEditCondition {
    /// What to test
    #[serde(alias = "type")]
    pub kind: ConditionKind,
    /// Substring, regex, or number depending on `kind`
    #[serde(default)]
    pub pattern: String,
    /// Invert the result
    #[serde(default)]
    pub negate: bool,
}

impl BulkEditCondition {
    /// Condition that holds when the content contains `needle`
    pub fn contains(needle: impl Into<String>) -> Self {
        Self {
            kind: ConditionKind::Contains,
            pattern: needle.into(),
            negate: false,
        }
    }

    /// Condition that holds when the content matches `regex`
    pub fn regex(regex: impl Into<String>) -> Self {
        Self {
            kind: ConditionKind::Regex,
            pattern: regex.into(),
            negate: false,
        }
    }

    /// Inverts the condition
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

/// How a refactor pattern is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefactorKind {
    /// Whole-word identifier rename
    #[serde(alias = "Rename")]
    Rename,
    /// Plain substring replacement
    #[serde(alias = "Literal")]
    Literal,
    /// Regex with capture expansion in the replacement
    #[serde(alias = "Regex")]
    Regex,
    /// `{{name}}` placeholders bound in the target, reused in the replacement
    #[serde(alias = "Template")]
    Template,
}

/// A named transform applied to every file of a batch refactor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRefactorPattern {
    /// Interpretation of the two patterns
    #[serde(alias = "type")]
    pub kind: RefactorKind,
    /// What to look for
    #[serde(alias = "target_pattern", alias = "target")]
    pub target_pattern: String,
    /// What to write instead
    #[serde(alias = "replacement_pattern", alias = "replacement")]
    pub replacement_pattern: String,
}

impl BulkRefactorPattern {
    /// Creates a pattern
    pub fn new(
        kind: RefactorKind,
        target_pattern: impl Into<String>,
        replacement_pattern: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target_pattern: target_pattern.into(),
            replacement_pattern: replacement_pattern.into(),
        }
    }
}

/// One operation of a coordinated multi-file edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiFileEditOperation {
    /// File path or glob the edits apply to
    #[serde(alias = "file_pattern", alias = "filePath", alias = "file_path")]
    pub file_pattern: String,
    /// Edits applied to every matching file
    #[serde(default)]
    pub edits: Vec<TextEdit>,
    /// Higher priorities are merged first
    #[serde(default)]
    pub priority: i32,
}

/// Run options shared by every operation mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BulkEditOptions {
    /// Worker-pool size; the configured default when unset
    #[serde(alias = "max_parallelism")]
    pub max_parallelism: Option<usize>,
    /// Capture pre-images before writing
    #[serde(alias = "create_backups")]
    pub create_backups: bool,
    /// Plan and diff without writing
    #[serde(alias = "preview_mode")]
    pub preview_mode: bool,
    /// Stop dispatching files after the first failure
    #[serde(alias = "fail_fast")]
    pub fail_fast: bool,
    /// Capture into this session instead of a fresh one
    #[serde(alias = "rollback_id")]
    pub rollback_id: Option<String>,
}

impl Default for BulkEditOptions {
    fn default() -> Self {
        Self {
            max_parallelism: None,
            create_backups: true,
            preview_mode: false,
            fail_fast: false,
            rollback_id: None,
        }
    }
}

/// The four operation modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Regex replace over every file
    #[serde(alias = "bulkReplace", alias = "BulkReplace")]
    BulkReplace,
    /// Static edits on files passing a condition
    #[serde(alias = "conditionalEdit", alias = "ConditionalEdit")]
    ConditionalEdit,
    /// Named refactor pattern over every file
    #[serde(alias = "batchRefactor", alias = "BatchRefactor")]
    BatchRefactor,
    /// Priority-ordered static edits per file pattern
    #[serde(alias = "multiFileEdit", alias = "MultiFileEdit")]
    MultiFileEdit,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::BulkReplace => "bulk_replace",
            OperationType::ConditionalEdit => "conditional_edit",
            OperationType::BatchRefactor => "batch_refactor",
            OperationType::MultiFileEdit => "multi_file_edit",
        };
        f.write_str(name)
    }
}

/// Mode-specific part of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOperation {
    /// Replace every regex match
    BulkReplace {
        /// Regex to search for
        regex_pattern: String,
        /// Replacement, with `$1`/`${name}` expansion
        replacement: String,
    },
    /// Apply static edits to files passing a condition
    ConditionalEdit {
        /// Per-file predicate
        condition: BulkEditCondition,
        /// Edits applied to each selected file
        edits: Vec<TextEdit>,
    },
    /// Apply a refactor pattern
    BatchRefactor {
        /// The transform
        pattern: BulkRefactorPattern,
    },
    /// Apply priority-ordered operations
    MultiFileEdit {
        /// Operations, each with its own file pattern
        operations: Vec<MultiFileEditOperation>,
    },
}

impl BulkOperation {
    /// Mode of this operation
    pub fn operation_type(&self) -> OperationType {
        match self {
            BulkOperation::BulkReplace { .. } => OperationType::BulkReplace,
            BulkOperation::ConditionalEdit { .. } => OperationType::ConditionalEdit,
            BulkOperation::BatchRefactor { .. } => OperationType::BatchRefactor,
            BulkOperation::MultiFileEdit { .. } => OperationType::MultiFileEdit,
        }
    }
}

/// A fully decoded bulk edit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkEditRequest {
    /// File paths or globs; unused by multi-file edits
    pub files: Vec<String>,
    /// Paths or globs removed after resolution
    pub excluded_files: Vec<String>,
    /// Mode-specific part
    pub operation: BulkOperation,
    /// Run options
    pub options: BulkEditOptions,
}

impl BulkEditRequest {
    fn with_operation(files: Vec<String>, operation: BulkOperation) -> Self {
        Self {
            files,
            excluded_files: Vec::new(),
            operation,
            options: BulkEditOptions::default(),
        }
    }

    /// Regex replace request
    pub fn bulk_replace<S: Into<String>>(
        files: impl IntoIterator<Item = S>,
        regex_pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self::with_operation(
            files.into_iter().map(Into::into).collect(),
            BulkOperation::BulkReplace {
                regex_pattern: regex_pattern.into(),
                replacement: replacement.into(),
            },
        )
    }

    /// Conditional edit request
    pub fn conditional_edit<S: Into<String>>(
        files: impl IntoIterator<Item = S>,
        condition: BulkEditCondition,
        edits: Vec<TextEdit>,
    ) -> Self {
        Self::with_operation(
            files.into_iter().map(Into::into).collect(),
            BulkOperation::ConditionalEdit { condition, edits },
        )
    }

    /// Batch refactor request
    pub fn batch_refactor<S: Into<String>>(
        files: impl IntoIterator<Item = S>,
        pattern: BulkRefactorPattern,
    ) -> Self {
        Self::with_operation(
            files.into_iter().map(Into::into).collect(),
            BulkOperation::BatchRefactor { pattern },
        )
    }

    /// Multi-file edit request
    pub fn multi_file_edit(operations: Vec<MultiFileEditOperation>) -> Self {
        Self::with_operation(Vec::new(), BulkOperation::MultiFileEdit { operations })
    }

    /// Replaces the run options
    pub fn with_options(mut self, options: BulkEditOptions) -> Self {
        self.options = options;
        self
    }

    /// Adds exclusion patterns
    pub fn excluding<S: Into<String>>(mut self, patterns: impl IntoIterator<Item = S>) -> Self {
        self.excluded_files.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Mode of this request
    pub fn operation_type(&self) -> OperationType {
        self.operation.operation_type()
    }
}

/// What happened to one file during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// New content written (or, in preview, would be)
    Modified,
    /// Planned edits left the content as it was
    Unchanged,
    /// Not selected by the condition, or never dispatched
    Skipped,
    /// An error kept the file from being edited
    Failed,
}

/// Outcome for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    /// The file
    pub path: PathBuf,
    /// What happened
    pub status: FileStatus,
    /// Edits landed on the file
    pub edits_applied: usize,
}

/// Aggregate result of a bulk edit or rollback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEditResult {
    /// True when no error entry was recorded
    pub success: bool,
    /// Files whose content changed
    pub files_modified: usize,
    /// Edits landed across all files
    pub edits_applied: usize,
    /// One entry per failed file or unresolved pattern, sorted by path
    pub per_file_errors: Vec<PerFileError>,
    /// Session holding the pre-images, if any were captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_id: Option<String>,
    /// Advisory messages
    pub warnings: Vec<String>,
    /// Files that went through the pipeline
    pub files_processed: usize,
    /// Files not selected or never dispatched
    pub files_skipped: usize,
    /// Patterns that matched no file
    pub unresolved_patterns: Vec<String>,
    /// Per-file outcomes, sorted by path
    pub file_outcomes: Vec<FileOutcome>,
    /// Wall-clock time of the run
    pub elapsed_ms: u64,
}

/// Planned change to one file in a preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePreview {
    /// The file
    pub path: PathBuf,
    /// Edits that would be applied
    pub edits_planned: usize,
    /// Unified diff of the change
    pub diff: String,
    /// Lines added
    pub additions: usize,
    /// Lines removed
    pub deletions: usize,
}

/// Result of a dry run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    /// Mode previewed
    pub operation: OperationType,
    /// Files that would change, sorted by path
    pub files: Vec<FilePreview>,
    /// Number of files that would change
    pub total_files: usize,
    /// Edits across those files
    pub total_edits: usize,
    /// Files that would fail, sorted by path
    pub errors: Vec<PerFileError>,
    /// Advisory messages
    pub warnings: Vec<String>,
}

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks execution
    Error,
    /// Allowed but probably unintended
    Warning,
}

/// One problem found by the validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// How serious it is
    pub severity: Severity,
    /// What is wrong
    pub message: String,
    /// Request field the issue refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Result of pre-flight validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// True when no issue has [`Severity::Error`]
    pub is_valid: bool,
    /// Every problem found
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Messages of the error-severity issues
    pub fn error_messages(&self) -> Vec<&str> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .map(|i| i.message.as_str())
            .collect()
    }

    /// Messages of the warning-severity issues
    pub fn warning_messages(&self) -> Vec<&str> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .map(|i| i.message.as_str())
            .collect()
    }
}

/// Coarse risk of running an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Up to 10
    Low,
    /// 11 to 100
    Medium,
    /// 101 to 1000
    High,
    /// Above 1000
    Critical,
}

/// A file that could not be read during analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InaccessibleFile {
    /// The file
    pub path: PathBuf,
    /// Why it could not be read
    pub error: String,
}

/// Size of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSize {
    /// The file
    pub path: PathBuf,
    /// Size in bytes
    pub bytes: u64,
    /// Line count
    pub lines: usize,
}

/// Planning estimate for an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactEstimate {
    /// Mode estimated
    pub operation: OperationType,
    /// Files in the resolved set
    pub total_files: usize,
    /// Patterns that matched no file
    pub unresolved_patterns: Vec<String>,
    /// Sum of file sizes
    pub total_bytes: u64,
    /// Sum of line counts
    pub total_lines: usize,
    /// Edits the operation would plan
    pub estimated_edits: usize,
    /// Files with at least one planned edit
    pub files_with_matches: usize,
    /// Files above the large-file threshold
    pub oversized_files: Vec<PathBuf>,
    /// Files that could not be read
    pub inaccessible_files: Vec<InaccessibleFile>,
    /// Coarse risk
    pub risk_level: RiskLevel,
    /// 1 to 10
    pub effort_score: u32,
    /// Suggested `maxParallelism`
    pub recommended_parallelism: usize,
    /// Files per worker
    pub recommended_batch_size: usize,
    /// Advisory messages
    pub warnings: Vec<String>,
}

/// Aggregate counts for one extension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionStats {
    /// Files with this extension
    pub files: usize,
    /// Their total size
    pub total_bytes: u64,
    /// Their total line count
    pub total_lines: usize,
}

/// Read-only statistics over a file set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatistics {
    /// Files in the resolved set
    pub total_files: usize,
    /// Sum of readable file sizes
    pub total_bytes: u64,
    /// Sum of readable line counts
    pub total_lines: usize,
    /// Mean size of readable files
    pub average_bytes: u64,
    /// Ten largest files, biggest first
    pub largest_files: Vec<FileSize>,
    /// Totals keyed by extension (`""` for none)
    pub by_extension: BTreeMap<String, ExtensionStats>,
    /// Files above the large-file threshold
    pub oversized_files: Vec<PathBuf>,
    /// Files that could not be read
    pub inaccessible_files: Vec<InaccessibleFile>,
    /// Patterns that matched no file
    pub unresolved_patterns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(l1: usize, c1: usize, l2: usize, c2: usize) -> Span {
        Span::new(Position::new(l1, c1), Position::new(l2, c2))
    }

    #[test]
    fn test_intersections() {
        assert!(span(0, 0, 0, 5).intersects(&span(0, 4, 0, 6)));
        assert!(!span(0, 0, 0, 5).intersects(&span(0, 5, 0, 6)));
        assert!(span(0, 0, 2, 0).intersects(&span(1, 3, 1, 4)));

        // insertion points
        assert!(span(0, 3, 0, 3).intersects(&span(0, 0, 0, 5)));
        assert!(!span(0, 0, 0, 0).intersects(&span(0, 0, 0, 5)));
        assert!(!span(0, 5, 0, 5).intersects(&span(0, 0, 0, 5)));
        assert!(span(1, 2, 1, 2).intersects(&span(1, 2, 1, 2)));
    }

    #[test]
    fn test_text_edit_wire_shape() {
        let edit: TextEdit = serde_json::from_str(
            r#"{"type":"replace","start_line":1,"start_column":2,"end_line":1,"end_column":4,"new_text":"x"}"#,
        )
        .unwrap();
        assert_eq!(edit, TextEdit::replace(Position::new(1, 2), Position::new(1, 4), "x"));

        let insert: TextEdit =
            serde_json::from_str(r#"{"type":"insert","line":0,"column":0,"text":"// "}"#).unwrap();
        assert_eq!(insert.span(), span(0, 0, 0, 0));
        assert_eq!(insert.new_text(), "// ");

        let json = serde_json::to_value(TextEdit::delete(Position::new(0, 1), Position::new(0, 2))).unwrap();
        assert_eq!(json["type"], "delete");
        assert_eq!(json["end_column"], 2);
    }

    #[test]
    fn test_replace_without_new_text_deletes() {
        let edit: TextEdit = serde_json::from_str(
            r#"{"type":"replace","start_line":0,"start_column":0,"end_line":0,"end_column":1}"#,
        )
        .unwrap();
        assert_eq!(edit.new_text(), "");
    }

    #[test]
    fn test_options_defaults_and_aliases() {
        let options: BulkEditOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, BulkEditOptions::default());
        assert!(options.create_backups);

        let options: BulkEditOptions =
            serde_json::from_str(r#"{"max_parallelism":2,"previewMode":true}"#).unwrap();
        assert_eq!(options.max_parallelism, Some(2));
        assert!(options.preview_mode);
    }

    #[test]
    fn test_operation_type_accepts_both_casings() {
        let a: OperationType = serde_json::from_str(r#""bulk_replace""#).unwrap();
        let b: OperationType = serde_json::from_str(r#""bulkReplace""#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "bulk_replace");
    }

    #[test]
    fn test_request_builders() {
        let request = BulkEditRequest::bulk_replace(["src/**/*.rs"], "foo", "bar")
            .excluding(["src/generated/*"]);
        assert_eq!(request.operation_type(), OperationType::BulkReplace);
        assert_eq!(request.excluded_files, vec!["src/generated/*".to_string()]);
        assert!(request.options.create_backups);
    }
}
