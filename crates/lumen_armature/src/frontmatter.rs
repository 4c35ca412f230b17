//! Detection of the `---` fenced prologue.

use lumen_relief::FrontmatterStatus;
use memchr::memchr;

const FENCE: &[u8] = FrontmatterStatus::FENCE.as_bytes();

/// Find the prologue fences.
///
/// Only whitespace may precede the opening fence. The closing fence is the
/// first later line that starts with `---`. Either fence must be followed by
/// whitespace or the end of input, so `----` and `---foo` are not fences.
pub fn scan_frontmatter(source: &str) -> FrontmatterStatus {
    let bytes = source.as_bytes();
    let start = source.len() - source.trim_start().len();
    if !is_fence(&bytes[start..]) {
        return FrontmatterStatus::DoesNotExist;
    }

    let mut cursor = start + FENCE.len();
    while let Some(newline) = memchr(b'\n', &bytes[cursor..]) {
        let line_start = cursor + newline + 1;
        if is_fence(&bytes[line_start..]) {
            return FrontmatterStatus::Closed {
                start: start as u32,
                end: (line_start + FENCE.len()) as u32,
            };
        }
        cursor = line_start;
    }

    FrontmatterStatus::Open {
        start: start as u32,
    }
}

fn is_fence(line: &[u8]) -> bool {
    line.starts_with(FENCE)
        && line
            .get(FENCE.len())
            .map_or(true, |next| next.is_ascii_whitespace())
}
