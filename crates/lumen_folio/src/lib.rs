//! Folio - Structured frontmatter data for Lumen.
//!
//! A tolerant parser for the YAML subset people actually write in content
//! frontmatter, and the canonical literal encoder used when that data is
//! re-serialized as a typed object literal.
//!
//! Every node keeps the byte span it was parsed from and every scalar
//! keeps its raw source token, so callers can map re-encoded values back
//! to the text they came from.
//!
//! ```
//! use lumen_folio::{encode_literal, parse, Node};
//!
//! let doc = parse("title: 'It''s here'\ncount: 3\n");
//! assert!(doc.errors.is_empty());
//! let Some(Node::Mapping(map)) = &doc.root else { panic!() };
//! let Node::Scalar(title) = &map.pairs[0].value else { panic!() };
//! assert_eq!(encode_literal(title), r#""It's here""#);
//! assert_eq!(title.source, "'It''s here'");
//! ```

pub mod ast;
pub mod encode;
pub mod error;
pub mod parser;

pub use ast::*;
pub use encode::{encode_key, encode_literal};
pub use error::{ErrorCode, YamlError};
pub use parser::parse;
