//! Markup parse errors.
//!
//! The parser never fails; it records these and keeps going.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[repr(u8)]
pub enum ErrorCode {
    #[error("Unexpected end of file inside a tag.")]
    EofInTag,
    #[error("Unexpected end of file inside a comment.")]
    EofInComment,
    #[error("Unexpected end of file inside an expression.")]
    EofInExpression,
    #[error("Unexpected end of file inside an attribute value.")]
    EofInAttributeValue,
    #[error("End tag has no matching start tag.")]
    InvalidEndTag,
    #[error("Element is missing its end tag.")]
    MissingEndTag,
    #[error("Frontmatter is never closed.")]
    UnclosedFrontmatter,
}

/// An [`ErrorCode`] at a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupError {
    pub code: ErrorCode,
    pub offset: u32,
}

impl MarkupError {
    pub const fn new(code: ErrorCode, offset: u32) -> Self {
        Self { code, offset }
    }
}
