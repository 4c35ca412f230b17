//! Immutable versioned text.

use std::sync::Arc;

use lsp_types::{Position, TextDocumentContentChangeEvent};
use lumen_carton::{hash_str, SourceRange};
use ropey::Rope;

/// One version of a document's text. Edits produce a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    text: Arc<str>,
    version: i32,
}

impl Snapshot {
    pub fn new(text: impl Into<Arc<str>>, version: i32) -> Self {
        Self {
            text: text.into(),
            version,
        }
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    #[inline]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text between two byte offsets; empty when the range is invalid.
    pub fn get_text(&self, start: u32, end: u32) -> &str {
        let end = end.min(self.len());
        SourceRange::new(start.min(end), end)
            .slice(&self.text)
            .unwrap_or_default()
    }

    /// Same version and the very same text allocation. Two snapshots built
    /// from equal text are still different snapshots.
    pub fn same_as(&self, other: &Snapshot) -> bool {
        self.version == other.version && Arc::ptr_eq(&self.text, &other.text)
    }

    pub fn content_hash(&self) -> u64 {
        hash_str(&self.text)
    }

    /// Apply protocol text changes in order and return the next snapshot.
    ///
    /// Ranged changes use UTF-16 columns; positions past the end of a line
    /// clamp to the line end, lines past the end clamp to the document end.
    pub fn apply_changes(&self, changes: &[TextDocumentContentChangeEvent], version: i32) -> Self {
        let mut rope = Rope::from_str(&self.text);
        for change in changes {
            match change.range {
                Some(range) => {
                    let start = position_to_char(&rope, range.start);
                    let end = position_to_char(&rope, range.end).max(start);
                    rope.remove(start..end);
                    rope.insert(start, &change.text);
                }
                None => rope = Rope::from_str(&change.text),
            }
        }
        Self::new(String::from(rope), version)
    }
}

/// Convert a protocol position to a char index in the rope.
fn position_to_char(rope: &Rope, position: Position) -> usize {
    let line = position.line as usize;
    if line >= rope.len_lines() {
        return rope.len_chars();
    }

    let line_start = rope.line_to_char(line);
    let slice = rope.line(line);
    let mut line_len = slice.len_chars();
    while line_len > 0 && matches!(slice.char(line_len - 1), '\n' | '\r') {
        line_len -= 1;
    }
    let line_end = line_start + line_len;

    let start_cu = rope.char_to_utf16_cu(line_start);
    let end_cu = rope.char_to_utf16_cu(line_end);
    let target = (start_cu + position.character as usize).min(end_cu);
    rope.utf16_cu_to_char(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Range;

    fn ranged(start: (u32, u32), end: (u32, u32), text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range {
                start: Position::new(start.0, start.1),
                end: Position::new(end.0, end.1),
            }),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_incremental_change() {
        let snapshot = Snapshot::new("hello world", 1);
        let next = snapshot.apply_changes(&[ranged((0, 6), (0, 11), "universe")], 2);

        assert_eq!(next.text(), "hello universe");
        assert_eq!(next.version(), 2);
        assert_eq!(snapshot.text(), "hello world");
    }

    #[test]
    fn test_full_content_change() {
        let snapshot = Snapshot::new("hello world", 1);
        let change = TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "completely new content".to_string(),
        };

        assert_eq!(
            snapshot.apply_changes(&[change], 2).text(),
            "completely new content"
        );
    }

    #[test]
    fn test_changes_apply_in_order() {
        let snapshot = Snapshot::new("---\n---\n<div/>", 1);
        let next = snapshot.apply_changes(
            &[ranged((1, 0), (1, 0), "a: 1\n"), ranged((3, 1), (3, 4), "p")],
            2,
        );
        assert_eq!(next.text(), "---\na: 1\n---\n<p/>");
    }

    #[test]
    fn test_utf16_columns() {
        // "😀" is two UTF-16 code units
        let snapshot = Snapshot::new("a😀b\nc", 1);
        let next = snapshot.apply_changes(&[ranged((0, 3), (0, 4), "X")], 2);
        assert_eq!(next.text(), "a😀X\nc");
    }

    #[test]
    fn test_positions_clamp() {
        let snapshot = Snapshot::new("ab\ncd", 1);
        let next = snapshot.apply_changes(&[ranged((0, 10), (0, 10), "!")], 2);
        assert_eq!(next.text(), "ab!\ncd");

        let next = snapshot.apply_changes(&[ranged((9, 0), (9, 0), "?")], 2);
        assert_eq!(next.text(), "ab\ncd?");
    }

    #[test]
    fn test_get_text() {
        let snapshot = Snapshot::new("<div/>", 1);
        assert_eq!(snapshot.get_text(1, 4), "div");
        assert_eq!(snapshot.get_text(4, 100), "/>");
        assert_eq!(snapshot.get_text(9, 3), "");
    }
}
