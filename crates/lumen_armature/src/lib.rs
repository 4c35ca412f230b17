//! Armature - The structural parser framework for Lumen.
//!
//! A tolerant markup parser for component templates: a `---` fenced
//! prologue, HTML-like elements, `{expression}` text and attribute
//! values, and raw-text elements whose bodies are left untouched.
//!
//! Parsing never fails. Problems are recorded on
//! [`MarkupDocument::errors`](lumen_relief::MarkupDocument) and the tree is
//! built as far as the input allows.
//!
//! # Example
//!
//! ```
//! use lumen_armature::parse;
//! use lumen_relief::FrontmatterStatus;
//!
//! let doc = parse("---\nconst a = 1;\n---\n<div>hi</div>");
//! assert!(matches!(doc.frontmatter, FrontmatterStatus::Closed { start: 0, end: 20 }));
//! assert_eq!(doc.node(doc.roots[1]).tag, "div");
//! ```

pub mod frontmatter;
pub mod parser;
pub mod tokenizer;

pub use frontmatter::scan_frontmatter;
pub use parser::{parse, Parser};
pub use tokenizer::{Callbacks, Tokenizer};
