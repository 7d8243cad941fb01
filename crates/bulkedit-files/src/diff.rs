//! Diff generation for previews

use std::fmt::Write as _;
use std::path::PathBuf;

use similar::{ChangeTag, TextDiff};

use crate::models::{DiffHunk, DiffLine, DiffStats, FileDiff};

/// Number of unchanged lines kept around each change
const CONTEXT_LINES: usize = 3;

/// Generates diffs between file versions
#[derive(Debug, Clone, Default)]
pub struct DiffEngine;

impl DiffEngine {
    /// Creates a new DiffEngine instance
    pub fn new() -> Self {
        Self
    }

    /// Generates a unified diff between two file versions
    ///
    /// # Arguments
    /// * `old` - The original file content
    /// * `new` - The new file content
    /// * `path` - The path of the file being diffed
    pub fn generate_unified_diff(&self, old: &str, new: &str, path: PathBuf) -> FileDiff {
        let hunks = self.extract_hunks(old, new);
        let stats = Self::compute_stats(&hunks);

        FileDiff { path, hunks, stats }
    }

    /// Renders a diff in the classic `---`/`+++`/`@@` text form
    pub fn render(&self, diff: &FileDiff) -> String {
        let mut out = String::new();
        if diff.hunks.is_empty() {
            return out;
        }

        let display = diff.path.display();
        let _ = writeln!(out, "--- a/{}", display);
        let _ = writeln!(out, "+++ b/{}", display);
        for hunk in &diff.hunks {
            let _ = writeln!(
                out,
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            );
            for line in &hunk.lines {
                let _ = match line {
                    DiffLine::Context(text) => writeln!(out, " {}", text),
                    DiffLine::Added(text) => writeln!(out, "+{}", text),
                    DiffLine::Removed(text) => writeln!(out, "-{}", text),
                    DiffLine::NoNewline => writeln!(out, "\\ No newline at end of file"),
                };
            }
        }
        out
    }

    /// Extracts hunks with surrounding context from a line diff
    fn extract_hunks(&self, old: &str, new: &str) -> Vec<DiffHunk> {
        let text_diff = TextDiff::from_lines(old, new);
        let mut hunks = Vec::new();

        for group in text_diff.grouped_ops(CONTEXT_LINES) {
            let (Some(first), Some(last)) = (group.first(), group.last()) else {
                continue;
            };
            let old_range = first.old_range().start..last.old_range().end;
            let new_range = first.new_range().start..last.new_range().end;

            let mut lines = Vec::new();
            for op in &group {
                for change in text_diff.iter_changes(op) {
                    // Only the newline is stripped; a `\r` stays visible
                    let value = change.value();
                    let text = value.strip_suffix('\n').unwrap_or(value).to_string();
                    lines.push(match change.tag() {
                        ChangeTag::Equal => DiffLine::Context(text),
                        ChangeTag::Insert => DiffLine::Added(text),
                        ChangeTag::Delete => DiffLine::Removed(text),
                    });
                    if change.missing_newline() {
                        lines.push(DiffLine::NoNewline);
                    }
                }
            }

            hunks.push(DiffHunk {
                old_start: old_range.start + 1,
                old_count: old_range.len(),
                new_start: new_range.start + 1,
                new_count: new_range.len(),
                lines,
            });
        }

        hunks
    }

    /// Computes statistics for a set of hunks
    fn compute_stats(hunks: &[DiffHunk]) -> DiffStats {
        let mut additions = 0;
        let mut deletions = 0;

        for hunk in hunks {
            for line in &hunk.lines {
                match line {
                    DiffLine::Added(_) => additions += 1,
                    DiffLine::Removed(_) => deletions += 1,
                    DiffLine::Context(_) | DiffLine::NoNewline => {}
                }
            }
        }

        DiffStats {
            additions,
            deletions,
            files_changed: if hunks.is_empty() { 0 } else { 1 },
        }
    }
}
