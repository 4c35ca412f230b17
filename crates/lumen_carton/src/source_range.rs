//! Half-open byte ranges into a text buffer.

use serde::{Deserialize, Serialize};

/// A `[start, end)` byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: u32,
    pub end: u32,
}

impl SourceRange {
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Zero-width range at `offset`.
    #[inline]
    pub const fn empty_at(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Range of `len` bytes starting at `start`.
    #[inline]
    pub const fn with_len(start: u32, len: u32) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    /// Inclusive of `end` so that a cursor sitting right after the last
    /// character still resolves to the range.
    #[inline]
    pub const fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset <= self.end
    }

    /// Strict half-open containment.
    #[inline]
    pub const fn contains_exclusive(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }

    #[inline]
    pub const fn contains_range(&self, other: &SourceRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// The same range moved by `delta` bytes.
    #[inline]
    pub const fn shift(&self, delta: u32) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    #[inline]
    pub fn as_usize(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Slice `text` by this range, returning `None` when out of bounds or
    /// not on a char boundary.
    #[inline]
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.as_usize())
    }
}

impl From<std::ops::Range<u32>> for SourceRange {
    fn from(range: std::ops::Range<u32>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl std::fmt::Display for SourceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
