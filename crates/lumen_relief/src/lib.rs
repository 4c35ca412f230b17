//! Relief - The sculptured AST surface for Lumen.
//!
//! Node types shared by the markup parser and the projection layer, plus
//! the diagnostic model every stage reports through.

pub mod ast;
pub mod diagnostic;
pub mod errors;

pub use ast::*;
pub use diagnostic::{Diagnostic, DiagnosticSource, Severity};
pub use errors::{ErrorCode, MarkupError};
