//! Offset-based diagnostics.
//!
//! Every stage reports problems as byte ranges into the source document;
//! conversion to protocol positions happens at the edge.

use lumen_carton::SourceRange;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// Which stage produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticSource {
    /// Markup parser.
    Markup,
    /// External template compiler, or the placeholder that replaces it.
    Compiler,
    /// Structured-data parser.
    Frontmatter,
    /// Schema checks reshaped from the typed-language checker.
    Schema,
}

impl DiagnosticSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Markup => "lumen/markup",
            Self::Compiler => "lumen/compiler",
            Self::Frontmatter => "lumen/frontmatter",
            Self::Schema => "lumen/schema",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: SourceRange,
    pub severity: Severity,
    pub code: Option<u32>,
    pub message: String,
    pub source: DiagnosticSource,
}

impl Diagnostic {
    pub fn error(source: DiagnosticSource, range: SourceRange, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            code: None,
            message: message.into(),
            source,
        }
    }

    pub fn warning(
        source: DiagnosticSource,
        range: SourceRange,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(source, range, message)
        }
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.code = Some(code);
        self
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let diag = Diagnostic::warning(DiagnosticSource::Markup, SourceRange::new(1, 2), "stray")
            .with_code(7);
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.code, Some(7));
        assert!(!diag.is_error());
        assert_eq!(diag.source.as_str(), "lumen/markup");
    }
}
