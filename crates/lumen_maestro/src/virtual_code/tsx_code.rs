//! TSX virtual code: the template compiler's output with a repaired map.
//!
//! Template compilers emit best-effort source maps that sometimes claim a
//! generated run is a copy of the source when it was altered. The map is
//! rebuilt here so that every mapping covers text that really matches:
//!
//! 1. segment positions become byte offsets through line-start tables
//! 2. each run between two consecutive segments is checked byte by byte and
//!    shrunk to the longest common prefix of the two sides
//! 3. runs that continue the previous mapping extend it
//! 4. runs inside `<script>` elements lose every capability
//! 5. the uncovered trailing statement maps to the whole source

use lumen_carton::{ColumnEncoding, LineIndex, SourceRange};
use lumen_relief::MarkupDocument;
use thiserror::Error;

use super::{Capabilities, Mapping, ScriptKind, VirtualCode, VirtualLanguage};
use crate::compiler::{CompileOutput, RawSegment};
use crate::regions::in_script_block;

/// Capabilities of runs inside `<script>` elements.
pub const SCRIPT_BLOCK_CAPABILITIES: Capabilities = Capabilities::empty();

/// Capabilities of the trailing catch-all mapping.
pub const CATCH_ALL_CAPABILITIES: Capabilities =
    Capabilities::DIAGNOSTICS.union(Capabilities::STRUCTURE);

/// Statement keywords that open a new top-level statement at a line start.
const STATEMENT_KEYWORDS: &[&str] = &[
    "export", "import", "function", "async", "const", "let", "var", "class", "type",
    "interface", "declare", "enum", "namespace",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepairError {
    #[error("segment {index} goes back to generated offset {offset} after {previous}")]
    UnorderedSegments {
        index: usize,
        previous: u32,
        offset: u32,
    },
}

/// Rebuild the mappings between `original` and `generated`.
///
/// Returns no mappings for empty output. Segments must be in non-decreasing
/// generated order.
pub fn repair_mappings(
    original: &str,
    generated: &str,
    segments: &[RawSegment],
    encoding: ColumnEncoding,
    markup: &MarkupDocument,
) -> Result<Vec<Mapping>, RepairError> {
    if generated.is_empty() {
        return Ok(Vec::new());
    }

    let original_index = LineIndex::new(original);
    let generated_index = LineIndex::new(generated);

    let mut mappings: Vec<Mapping> = Vec::new();
    // (generated, source) anchor of the previous sourced segment
    let mut pending: Option<(u32, u32)> = None;
    let mut previous = 0;

    for (index, segment) in segments.iter().enumerate() {
        let offset = generated_index.offset_at(
            generated,
            segment.generated_line,
            segment.generated_column,
            encoding,
        );
        if offset < previous {
            return Err(RepairError::UnorderedSegments {
                index,
                previous,
                offset,
            });
        }
        previous = offset;

        if let Some((generated_start, source_start)) = pending.take() {
            let claimed = offset - generated_start;
            if claimed > 0 {
                let len = common_prefix(original, source_start, generated, generated_start, claimed);
                if len < claimed {
                    tracing::debug!(
                        source = source_start,
                        generated = generated_start,
                        claimed,
                        kept = len,
                        "source map over-claims a copied run"
                    );
                }
                if len > 0 {
                    let capabilities = if in_script_block(markup, source_start) {
                        SCRIPT_BLOCK_CAPABILITIES
                    } else {
                        Capabilities::all()
                    };
                    push_coalesced(
                        &mut mappings,
                        Mapping::with_capabilities(
                            SourceRange::with_len(source_start, len),
                            SourceRange::with_len(generated_start, len),
                            capabilities,
                        ),
                    );
                }
            }
        }

        if let Some((line, column)) = segment.source {
            let source_offset = original_index.offset_at(original, line, column, encoding);
            pending = Some((offset, source_offset));
        }
    }

    let covered = mappings.last().map_or(0, |m| m.generated.end);
    if let Some(start) = trailing_statement_start(generated, covered) {
        mappings.push(Mapping::with_capabilities(
            SourceRange::new(0, original.len() as u32),
            SourceRange::new(start, generated.len() as u32),
            CATCH_ALL_CAPABILITIES,
        ));
    }

    Ok(mappings)
}

/// Length of the common byte prefix of the two runs, backed off to a char
/// boundary on both sides.
fn common_prefix(
    original: &str,
    source_start: u32,
    generated: &str,
    generated_start: u32,
    claimed: u32,
) -> u32 {
    let source_start = source_start as usize;
    let generated_start = generated_start as usize;
    let (Some(source), Some(target)) = (
        original.as_bytes().get(source_start..),
        generated.as_bytes().get(generated_start..),
    ) else {
        return 0;
    };

    let mut len = source
        .iter()
        .zip(target)
        .take(claimed as usize)
        .take_while(|(a, b)| a == b)
        .count();
    while len > 0
        && !(original.is_char_boundary(source_start + len)
            && generated.is_char_boundary(generated_start + len))
    {
        len -= 1;
    }
    len as u32
}

fn push_coalesced(mappings: &mut Vec<Mapping>, mapping: Mapping) {
    if let Some(last) = mappings.last_mut() {
        if last.generated.end == mapping.generated.start
            && last.source.end == mapping.source.start
            && last.capabilities == mapping.capabilities
        {
            last.generated.end = mapping.generated.end;
            last.source.end = mapping.source.end;
            return;
        }
    }
    mappings.push(mapping);
}

/// Start of the first top-level statement at or after `from`.
///
/// A statement starts at a line start outside brackets, strings and comments,
/// when the line opens with a declaration keyword or the previous significant
/// character ended a statement (`;` or `}`).
fn trailing_statement_start(code: &str, from: u32) -> Option<u32> {
    let bytes = code.as_bytes();
    let mut depth: i32 = 0;
    let mut last_significant: Option<u8> = None;
    let mut at_line_start = true;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];

        if at_line_start && !c.is_ascii_whitespace() {
            at_line_start = false;
            if depth == 0 && i as u32 >= from {
                let ends_statement = matches!(last_significant, None | Some(b';') | Some(b'}'));
                if ends_statement || starts_with_keyword(&code[i..]) {
                    return Some(i as u32);
                }
            }
        }

        match c {
            b'\n' => at_line_start = true,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 2;
                continue;
            }
            b'\'' | b'"' | b'`' => {
                let quote = c;
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    // Plain strings end at the line break
                    if bytes[i] == b'\n' && quote != b'`' {
                        break;
                    }
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if bytes.get(i) == Some(&b'\n') {
                    at_line_start = true;
                }
                last_significant = Some(quote);
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                last_significant = Some(c);
            }
            b')' | b']' | b'}' => {
                depth = (depth - 1).max(0);
                last_significant = Some(c);
            }
            c if c.is_ascii_whitespace() => {}
            _ => last_significant = Some(c),
        }
        i += 1;
    }
    None
}

fn starts_with_keyword(line: &str) -> bool {
    STATEMENT_KEYWORDS.iter().any(|keyword| {
        line.strip_prefix(keyword).is_some_and(|rest| {
            rest.chars()
                .next()
                .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '$'))
        })
    })
}

/// Build the `<id>.tsx` virtual code from a compile result.
pub fn tsx_virtual_code(
    source_id: &str,
    original: &str,
    output: &CompileOutput,
    markup: &MarkupDocument,
) -> Result<VirtualCode, RepairError> {
    let mappings = repair_mappings(
        original,
        &output.code,
        &output.segments,
        output.column_encoding,
        markup,
    )?;
    Ok(VirtualCode::new(
        format!("{source_id}.tsx"),
        VirtualLanguage::Script(ScriptKind::TypeScriptReact),
        output.code.as_str(),
        mappings,
    ))
}
