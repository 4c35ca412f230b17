//! Diagnostics surface.
//!
//! Diagnostics are kept as byte ranges in the source document until they
//! leave the core. Two things happen here: checker diagnostics reported
//! against the frontmatter projection are carried back to the source, and
//! offset diagnostics are converted to protocol diagnostics.

use lsp_types::{DiagnosticSeverity, NumberOrString, Position, Range};
use lumen_carton::{LineIndex, SourceRange};
use lumen_relief::{Diagnostic, DiagnosticSource, FrontmatterStatus, Severity};

use crate::virtual_code::{Capabilities, VirtualCode};

pub const MISSING_FRONTMATTER_MESSAGE: &str = "Frontmatter is required for this file.";

/// Checker codes for "properties are missing from this object".
const MISSING_PROPERTY_CODES: &[u32] = &[2739, 2740, 2741];

fn is_missing_property(diagnostic: &Diagnostic) -> bool {
    if diagnostic
        .code
        .is_some_and(|code| MISSING_PROPERTY_CODES.contains(&code))
    {
        return true;
    }
    let message = diagnostic.message.as_str();
    message.starts_with("Missing property")
        || (message.starts_with("Property ") && message.contains(" is missing"))
}

/// Carry checker diagnostics on a frontmatter projection back to the
/// source document.
///
/// Missing-property complaints point at the closing scaffolding of the
/// projection, so they are widened to the whole frontmatter block instead.
/// Other diagnostics go through the projection's diagnostic mappings and
/// are dropped when they land on scaffolding or there is no projection.
/// Without frontmatter, any complaint collapses into a single "frontmatter
/// is required" error.
pub fn reshape_frontmatter_diagnostics(
    diagnostics: &[Diagnostic],
    projection: Option<&VirtualCode>,
    status: FrontmatterStatus,
    text_len: u32,
) -> Vec<Diagnostic> {
    if diagnostics.is_empty() {
        return Vec::new();
    }
    let Some(block) = status.range(text_len) else {
        return vec![Diagnostic::error(
            DiagnosticSource::Schema,
            SourceRange::empty_at(0),
            MISSING_FRONTMATTER_MESSAGE,
        )];
    };

    diagnostics
        .iter()
        .filter_map(|diagnostic| {
            let range = if is_missing_property(diagnostic) {
                block
            } else {
                let mapped = projection.and_then(|code| {
                    code.source_map
                        .to_source_range(diagnostic.range, Capabilities::DIAGNOSTICS)
                });
                if mapped.is_none() {
                    tracing::trace!(range = %diagnostic.range, "dropping unmapped diagnostic");
                }
                mapped?
            };
            Some(Diagnostic {
                range,
                severity: Severity::Error,
                source: DiagnosticSource::Schema,
                ..diagnostic.clone()
            })
        })
        .collect()
}

fn lsp_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

/// Convert a byte range to a protocol range with UTF-16 columns.
pub fn lsp_range(text: &str, index: &LineIndex, range: SourceRange) -> Range {
    let position = |offset| {
        let (line, character) = index.position_utf16(text, offset);
        Position { line, character }
    };
    Range {
        start: position(range.start),
        end: position(range.end),
    }
}

/// Conversion to protocol types.
pub trait ToLsp {
    type Output;

    /// `text` is the document the offsets point into, `index` its line table.
    fn to_lsp(&self, text: &str, index: &LineIndex) -> Self::Output;
}

impl ToLsp for Diagnostic {
    type Output = lsp_types::Diagnostic;

    fn to_lsp(&self, text: &str, index: &LineIndex) -> lsp_types::Diagnostic {
        lsp_types::Diagnostic {
            range: lsp_range(text, index, self.range),
            severity: Some(lsp_severity(self.severity)),
            code: self.code.map(|code| NumberOrString::Number(code as i32)),
            source: Some(self.source.as_str().to_string()),
            message: self.message.clone(),
            ..Default::default()
        }
    }
}

impl ToLsp for [Diagnostic] {
    type Output = Vec<lsp_types::Diagnostic>;

    fn to_lsp(&self, text: &str, index: &LineIndex) -> Vec<lsp_types::Diagnostic> {
        self.iter().map(|d| d.to_lsp(text, index)).collect()
    }
}
