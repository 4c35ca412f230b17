//! Template compiler bridge.
//!
//! The template-to-TSX compiler is an external black box. This module fixes
//! its contract ([`TemplateCompiler`]), decodes the source maps it returns,
//! runs it on a worker thread behind a blocking call, and turns every failure
//! into an empty output plus one diagnostic.

mod source_map;
mod worker;

pub use source_map::decode_source_map;
pub use worker::WorkerCompiler;

use std::sync::Arc;
use std::time::Duration;

use lumen_carton::{ColumnEncoding, SourceRange};
use lumen_relief::{Diagnostic, DiagnosticSource};
use thiserror::Error;

/// Code of the diagnostic that replaces a failed compilation.
pub const COMPILER_FAILURE_CODE: u32 = 1000;

const COMPILER_FAILURE_MESSAGE: &str = "The template compiler encountered an unknown error while \
     parsing this file. An empty file is used instead.";

/// One decoded source map segment. Lines and columns are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSegment {
    pub generated_line: u32,
    pub generated_column: u32,
    /// `(line, column)` in the original document, absent for unmapped segments.
    pub source: Option<(u32, u32)>,
}

impl RawSegment {
    pub const fn mapped(generated: (u32, u32), source: (u32, u32)) -> Self {
        Self {
            generated_line: generated.0,
            generated_column: generated.1,
            source: Some(source),
        }
    }

    pub const fn unmapped(generated: (u32, u32)) -> Self {
        Self {
            generated_line: generated.0,
            generated_column: generated.1,
            source: None,
        }
    }
}

/// What a compiler returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileOutput {
    pub code: String,
    pub segments: Vec<RawSegment>,
    /// Unit of the segment columns.
    pub column_encoding: ColumnEncoding,
    /// Compiler diagnostics, in source offsets.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutput {
    /// Output carrying a v3 JSON source map, whose columns count UTF-16 units.
    pub fn from_source_map(code: impl Into<String>, map_json: &str) -> Result<Self, CompileError> {
        Ok(Self {
            code: code.into(),
            segments: decode_source_map(map_json)?,
            column_encoding: ColumnEncoding::Utf16,
            diagnostics: Vec::new(),
        })
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Stand-in for a failed compilation.
    pub fn placeholder() -> Self {
        Self {
            diagnostics: vec![Diagnostic::error(
                DiagnosticSource::Compiler,
                SourceRange::empty_at(0),
                COMPILER_FAILURE_MESSAGE,
            )
            .with_code(COMPILER_FAILURE_CODE)],
            ..Self::default()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.code.is_empty()
            && self
                .diagnostics
                .iter()
                .any(|d| d.code == Some(COMPILER_FAILURE_CODE))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("compiler failed: {0}")]
    Failed(String),
    #[error("compiler did not answer within {0:?}")]
    Timeout(Duration),
    #[error("compiler panicked")]
    Panicked,
    #[error("compiler worker is gone")]
    WorkerGone,
    #[error("malformed source map: {0}")]
    SourceMap(String),
}

/// Template-to-TSX compiler.
pub trait TemplateCompiler: Send + Sync {
    fn compile(&self, text: &str, filename: &str) -> Result<CompileOutput, CompileError>;
}

impl<T: TemplateCompiler + ?Sized> TemplateCompiler for Arc<T> {
    fn compile(&self, text: &str, filename: &str) -> Result<CompileOutput, CompileError> {
        (**self).compile(text, filename)
    }
}

impl<T: TemplateCompiler + ?Sized> TemplateCompiler for Box<T> {
    fn compile(&self, text: &str, filename: &str) -> Result<CompileOutput, CompileError> {
        (**self).compile(text, filename)
    }
}

/// Run the compiler; any error or an empty result becomes
/// [`CompileOutput::placeholder`].
pub fn compile_or_placeholder<C: TemplateCompiler + ?Sized>(
    compiler: &C,
    text: &str,
    filename: &str,
) -> CompileOutput {
    match compiler.compile(text, filename) {
        Ok(output) if !output.code.is_empty() => output,
        Ok(_) => {
            tracing::error!(filename, "template compiler returned no code");
            CompileOutput::placeholder()
        }
        Err(err) => {
            tracing::error!(filename, error = %err, "template compiler failed");
            CompileOutput::placeholder()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<CompileOutput, CompileError>);

    impl TemplateCompiler for Fixed {
        fn compile(&self, _text: &str, _filename: &str) -> Result<CompileOutput, CompileError> {
            self.0.clone()
        }
    }

    #[test]
    fn test_placeholder_on_error() {
        let output = compile_or_placeholder(&Fixed(Err(CompileError::Panicked)), "<div/>", "a.astro");

        assert!(output.code.is_empty());
        assert!(output.segments.is_empty());
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, Some(COMPILER_FAILURE_CODE));
        assert_eq!(output.diagnostics[0].range, SourceRange::empty_at(0));
        assert!(output.is_placeholder());
    }

    #[test]
    fn test_placeholder_on_empty_code() {
        let output = compile_or_placeholder(&Fixed(Ok(CompileOutput::default())), "", "a.astro");
        assert!(output.is_placeholder());
    }

    #[test]
    fn test_output_passes_through() {
        let produced = CompileOutput {
            code: "<div></div>;\n".into(),
            ..CompileOutput::default()
        };
        let output = compile_or_placeholder(&Fixed(Ok(produced.clone())), "<div/>", "a.astro");
        assert_eq!(output, produced);
        assert!(!output.is_placeholder());
    }

    #[test]
    fn test_from_source_map_rejects_garbage() {
        assert!(matches!(
            CompileOutput::from_source_map("x", "{not json"),
            Err(CompileError::SourceMap(_))
        ));
    }
}
