//! Structured-data parse errors.

use lumen_carton::SourceRange;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Error)]
pub enum ErrorCode {
    #[error("Missing closing quote")]
    UnterminatedString,
    #[error("Missing closing bracket of flow collection")]
    UnterminatedFlow,
    #[error("Bad indentation of a mapping or sequence entry")]
    BadIndentation,
    #[error("Implicit keys need to be followed by map values")]
    MissingValueSeparator,
    #[error("Tabs are not allowed as indentation")]
    TabIndentation,
    #[error("Map keys must be unique")]
    DuplicateKey,
    #[error("Unexpected content after value")]
    UnexpectedContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[error("{code} at {span}")]
pub struct YamlError {
    pub code: ErrorCode,
    pub span: SourceRange,
}

impl YamlError {
    pub const fn new(code: ErrorCode, span: SourceRange) -> Self {
        Self { code, span }
    }
}
