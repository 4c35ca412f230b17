//! Line-start tables for converting between byte offsets and
//! `(line, column)` pairs.
//!
//! Lines and columns are 0-based. Columns are measured either in UTF-8
//! bytes or in UTF-16 code units, depending on who produced them: source
//! maps emitted by JavaScript tooling count UTF-16 units, the protocol
//! layer does too, while internal offsets are always bytes.

use memchr::memchr_iter;

/// Unit a column number is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnEncoding {
    /// Byte columns.
    #[default]
    Utf8,
    /// UTF-16 code unit columns.
    Utf16,
}

/// Precomputed line starts of one text buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = Vec::with_capacity(text.len() / 32 + 1);
        line_starts.push(0);
        line_starts.extend(memchr_iter(b'\n', text.as_bytes()).map(|i| i as u32 + 1));
        Self {
            line_starts,
            len: text.len() as u32,
        }
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn line_start(&self, line: u32) -> Option<u32> {
        self.line_starts.get(line as usize).copied()
    }

    /// End of the line's content, i.e. the offset of its `\n` (or the end
    /// of the text for the last line).
    pub fn line_end(&self, line: u32) -> Option<u32> {
        let line = line as usize;
        if line >= self.line_starts.len() {
            return None;
        }
        Some(match self.line_starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.len,
        })
    }

    /// Byte offset of `(line, byte column)`.
    ///
    /// Columns past the end of the line clamp to the line end; lines past
    /// the end of the text clamp to the text length.
    pub fn offset(&self, line: u32, column: u32) -> u32 {
        match (self.line_start(line), self.line_end(line)) {
            (Some(start), Some(end)) => start.saturating_add(column).min(end),
            _ => self.len,
        }
    }

    /// Byte offset of `(line, UTF-16 column)`. Same clamping as
    /// [`LineIndex::offset`]; a column that lands inside a surrogate pair
    /// resolves to the start of that character.
    pub fn offset_utf16(&self, text: &str, line: u32, column: u32) -> u32 {
        let (Some(start), Some(end)) = (self.line_start(line), self.line_end(line)) else {
            return self.len;
        };
        let Some(content) = text.get(start as usize..end as usize) else {
            return self.len;
        };

        let mut units = 0u32;
        for (byte, ch) in content.char_indices() {
            let width = ch.len_utf16() as u32;
            if units + width > column {
                return start + byte as u32;
            }
            units += width;
        }
        end
    }

    /// Byte offset of `(line, column)` in the given column unit.
    #[inline]
    pub fn offset_at(&self, text: &str, line: u32, column: u32, encoding: ColumnEncoding) -> u32 {
        match encoding {
            ColumnEncoding::Utf8 => self.offset(line, column),
            ColumnEncoding::Utf16 => self.offset_utf16(text, line, column),
        }
    }

    /// `(line, byte column)` of a byte offset, clamped to the text length.
    pub fn position(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line as u32, offset - self.line_starts[line])
    }

    /// `(line, UTF-16 column)` of a byte offset.
    pub fn position_utf16(&self, text: &str, offset: u32) -> (u32, u32) {
        let (line, column) = self.position(offset);
        let start = self.line_starts[line as usize] as usize;
        let prefix = text
            .get(start..start + column as usize)
            .unwrap_or_default();
        (line, prefix.encode_utf16().count() as u32)
    }
}
