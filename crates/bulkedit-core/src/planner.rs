//! Edit planning
//!
//! Turns an operation's inputs into the concrete [`TextEdit`] list for each
//! file. Regex-driven plans are emitted in reverse document order.

use std::collections::BTreeMap;
use std::path::PathBuf;

use regex::Regex;

use crate::applier::LineIndex;
use crate::patterns::CompiledPattern;
use crate::types::{MultiFileEditOperation, TextEdit};

/// Derives per-file edit lists
#[derive(Debug, Clone, Default)]
pub struct EditPlanner;

impl EditPlanner {
    /// One `Replace` per match of `regex`, last match first
    ///
    /// `replacement` may refer to capture groups as `$1` or `${name}`.
    pub fn plan_replace(content: &str, regex: &Regex, replacement: &str) -> Vec<TextEdit> {
        let index = LineIndex::new(content);
        let mut edits: Vec<TextEdit> = regex
            .captures_iter(content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let mut text = String::new();
                caps.expand(replacement, &mut text);
                Some(TextEdit::replace(
                    index.position(whole.start()),
                    index.position(whole.end()),
                    text,
                ))
            })
            .collect();
        edits.reverse();
        edits
    }

    /// Edits for a compiled refactor pattern, last match first
    pub fn plan_refactor(content: &str, pattern: &CompiledPattern) -> Vec<TextEdit> {
        Self::plan_replace(content, pattern.regex(), pattern.replacement())
    }

    /// Operations sorted by priority, highest first; ties keep input order
    pub fn order_operations(
        operations: &[MultiFileEditOperation],
    ) -> Vec<(usize, &MultiFileEditOperation)> {
        let mut ordered: Vec<(usize, &MultiFileEditOperation)> =
            operations.iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| b.priority.cmp(&a.priority).then(ia.cmp(ib)));
        ordered
    }

    /// Merges the edits of every operation touching each file
    ///
    /// `targets[i]` holds the files operation `i` resolved to. Edits are
    /// concatenated in priority order; overlaps between them are left for the
    /// applier to reject, so preview and apply report the same conflicts.
    pub fn merge_operations(
        operations: &[MultiFileEditOperation],
        targets: &[Vec<PathBuf>],
    ) -> BTreeMap<PathBuf, Vec<TextEdit>> {
        let mut merged: BTreeMap<PathBuf, Vec<TextEdit>> = BTreeMap::new();
        for (index, operation) in Self::order_operations(operations) {
            let Some(files) = targets.get(index) else {
                continue;
            };
            for file in files {
                merged
                    .entry(file.clone())
                    .or_default()
                    .extend(operation.edits.iter().cloned());
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applier::EditApplier;
    use crate::types::{BulkRefactorPattern, Position, RefactorKind};

    #[test]
    fn test_plan_replace_reverse_document_order() {
        let regex = Regex::new("foo").unwrap();
        let edits = EditPlanner::plan_replace("foo baz\nfoo", &regex, "bar");
        assert_eq!(
            edits,
            vec![
                TextEdit::replace(Position::new(1, 0), Position::new(1, 3), "bar"),
                TextEdit::replace(Position::new(0, 0), Position::new(0, 3), "bar"),
            ]
        );
        let out = EditApplier::new().apply("foo baz\nfoo", &edits).unwrap();
        assert_eq!(out, "bar baz\nbar");
    }

    #[test]
    fn test_plan_replace_expands_groups() {
        let regex = Regex::new(r"(?P<name>\w+)\(\)").unwrap();
        let edits = EditPlanner::plan_replace("call()", &regex, "${name}(ctx)");
        assert_eq!(edits[0].new_text(), "call(ctx)");
    }

    #[test]
    fn test_plan_refactor() {
        let pattern = CompiledPattern::compile(&BulkRefactorPattern::new(
            RefactorKind::Rename,
            "old",
            "new",
        ))
        .unwrap();
        let edits = EditPlanner::plan_refactor("old(older, old)", &pattern);
        assert_eq!(edits.len(), 2);
    }

    #[test]
    fn test_no_matches_no_edits() {
        let regex = Regex::new("absent").unwrap();
        assert!(EditPlanner::plan_replace("text", &regex, "x").is_empty());
    }

    #[test]
    fn test_merge_respects_priority() {
        let op = |pattern: &str, text: &str, priority| MultiFileEditOperation {
            file_pattern: pattern.to_string(),
            edits: vec![TextEdit::insert(Position::new(0, 0), text)],
            priority,
        };
        let operations = vec![op("a", "low", 1), op("b", "high", 5), op("c", "mid", 3)];
        let file = PathBuf::from("/w/shared.txt");
        let targets = vec![vec![file.clone()], vec![file.clone()], vec![]];

        let ordered: Vec<usize> = EditPlanner::order_operations(&operations)
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(ordered, vec![1, 2, 0]);

        let merged = EditPlanner::merge_operations(&operations, &targets);
        let texts: Vec<&str> = merged[&file].iter().map(TextEdit::new_text).collect();
        assert_eq!(texts, vec!["high", "low"]);
    }
}
