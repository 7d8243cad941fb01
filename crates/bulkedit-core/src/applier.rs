//! Conflict-checked application of text edits
//!
//! Edits are validated against the document, checked pairwise for
//! overlapping spans, then applied from the end of the document toward the
//! beginning so earlier offsets stay valid without remapping.

use tracing::debug;

use crate::error::{BulkEditError, EditConflict, Result};
use crate::types::{Position, Span, TextEdit};

/// Maps between [`Position`]s and byte offsets of a text
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    /// Indexes the line starts of `text`
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    /// Number of addressable lines
    ///
    /// A text ending in `\n` has an empty last line where only column 0 is valid.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset of `pos`, or `EditOutOfRange` when it is outside the text
    pub fn offset(&self, pos: Position) -> Result<usize> {
        let line_start = *self.line_starts.get(pos.line).ok_or_else(|| {
            BulkEditError::EditOutOfRange(format!(
                "line {} is beyond the last line {}",
                pos.line,
                self.line_count() - 1
            ))
        })?;
        let line_end = self
            .line_starts
            .get(pos.line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let line = &self.text[line_start..line_end];

        if pos.column == 0 {
            return Ok(line_start);
        }
        match line.char_indices().nth(pos.column) {
            Some((byte, _)) => Ok(line_start + byte),
            None => {
                let width = line.chars().count();
                if pos.column == width {
                    Ok(line_end)
                } else {
                    Err(BulkEditError::EditOutOfRange(format!(
                        "column {} is beyond the end of line {} ({} characters)",
                        pos.column, pos.line, width
                    )))
                }
            }
        }
    }

    /// Position of a byte offset, which must lie on a char boundary
    pub fn position(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|start| *start <= offset) - 1;
        let column = self.text[self.line_starts[line]..offset].chars().count();
        Position::new(line, column)
    }
}

/// Applies edit lists to file content
#[derive(Debug, Clone, Default)]
pub struct EditApplier;

impl EditApplier {
    /// Creates a new EditApplier
    pub fn new() -> Self {
        Self
    }

    /// Finds every pair of colliding spans
    ///
    /// Spans are sorted by start and swept once; each span is compared with
    /// the following spans until one starts at or past its end. Pairs are
    /// reported with the lower submission index first, sorted.
    pub fn find_conflicts(spans: &[Span]) -> Vec<EditConflict> {
        let mut order: Vec<usize> = (0..spans.len()).collect();
        order.sort_by_key(|&i| (spans[i].start, spans[i].end, i));

        let mut conflicts = Vec::new();
        for (k, &i) in order.iter().enumerate() {
            let a = spans[i];
            for &j in &order[k + 1..] {
                let b = spans[j];
                // b.start >= a.start here; nothing further can reach back into a
                // unless it starts before a ends (or exactly at an insertion point).
                if b.start > a.end || (b.start == a.end && !(a.is_empty() && b.start == a.start)) {
                    break;
                }
                if a.intersects(&b) {
                    let (first, second) = if i < j { (i, j) } else { (j, i) };
                    conflicts.push(EditConflict {
                        first,
                        second,
                        first_span: spans[first],
                        second_span: spans[second],
                    });
                }
            }
        }
        conflicts.sort_by_key(|c| (c.first, c.second));
        conflicts
    }

    /// Rejects malformed spans and overlapping edits without looking at content
    pub fn check(edits: &[TextEdit]) -> Result<()> {
        let spans: Vec<Span> = edits.iter().map(TextEdit::span).collect();
        if let Some((index, span)) = spans.iter().enumerate().find(|(_, s)| !s.is_well_formed()) {
            return Err(BulkEditError::EditOutOfRange(format!(
                "edit #{} has its start after its end {}",
                index, span
            )));
        }
        let conflicts = Self::find_conflicts(&spans);
        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(BulkEditError::EditConflict { conflicts })
        }
    }

    /// Applies `edits` to `content`, returning the new text
    ///
    /// Either every edit lands or none does; `content` is not modified.
    pub fn apply(&self, content: &str, edits: &[TextEdit]) -> Result<String> {
        Self::check(edits)?;

        let index = LineIndex::new(content);
        let mut resolved = Vec::with_capacity(edits.len());
        for (i, edit) in edits.iter().enumerate() {
            let span = edit.span();
            let start = index.offset(span.start).map_err(|e| annotate(e, i))?;
            let end = index.offset(span.end).map_err(|e| annotate(e, i))?;
            resolved.push((start, end, edit.new_text()));
        }

        // Descending by (start, end): a wider edit sharing a start is applied
        // before the insertion at that start, which then lands in front of it.
        resolved.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));

        let mut output = content.to_string();
        for (start, end, text) in resolved {
            output.replace_range(start..end, text);
        }

        debug!(edits = edits.len(), "Applied edits");
        Ok(output)
    }
}

fn annotate(err: BulkEditError, index: usize) -> BulkEditError {
    match err {
        BulkEditError::EditOutOfRange(reason) => {
            BulkEditError::EditOutOfRange(format!("edit #{}: {}", index, reason))
        }
        other => other,
    }
}
