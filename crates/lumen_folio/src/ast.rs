//! Structured-data tree.

use lumen_carton::SourceRange;
use serde::Serialize;

use crate::error::YamlError;

/// Resolved value of a scalar under the core schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// `YYYY-MM-DD`, optionally with a time part; kept as written.
    Date(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// `|` block
    Literal,
    /// `>` block
    Folded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scalar {
    pub value: ScalarValue,
    pub style: ScalarStyle,
    pub span: SourceRange,
    /// Raw text of the token, quotes included.
    pub source: String,
}

impl Scalar {
    /// An empty value, as in `key:` with nothing after it.
    pub fn empty(offset: u32) -> Self {
        Self {
            value: ScalarValue::Null,
            style: ScalarStyle::Plain,
            span: SourceRange::empty_at(offset),
            source: String::new(),
        }
    }

    /// Explicit `null`/`~` or an empty value.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.value == ScalarValue::Null
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pair {
    pub key: Scalar,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mapping {
    pub pairs: Vec<Pair>,
    pub span: SourceRange,
    pub flow: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sequence {
    pub items: Vec<Node>,
    pub span: SourceRange,
    pub flow: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    Scalar(Scalar),
    Mapping(Mapping),
    Sequence(Sequence),
}

impl Node {
    pub fn span(&self) -> SourceRange {
        match self {
            Node::Scalar(scalar) => scalar.span,
            Node::Mapping(mapping) => mapping.span,
            Node::Sequence(sequence) => sequence.span,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct YamlDocument {
    /// `None` when the text holds nothing but blank lines and comments.
    pub root: Option<Node>,
    pub errors: Vec<YamlError>,
}

impl YamlDocument {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
