//! Markup AST node types.
//!
//! The tree is stored as an arena: every node lives in
//! [`MarkupDocument::nodes`] and refers to its parent and children by
//! [`NodeId`]. Nodes are pushed in the order their start is seen, so
//! iterating the arena visits the document in pre-order.

use lumen_carton::{CompactString, SmallVec, SourceRange};
use serde::{Deserialize, Serialize};

use crate::errors::MarkupError;

/// Index of a node in [`MarkupDocument::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeKind {
    Element = 0,
    Text = 1,
    Comment = 2,
    /// `{ ... }` in text position.
    Expression = 3,
    Doctype = 4,
}

/// Quote style of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuoteType {
    Double,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeValueKind {
    Quoted(QuoteType),
    Unquoted,
    /// `name={expr}` or the shorthand `{expr}`.
    Expression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub kind: AttributeValueKind,
    /// Value without its quotes or braces.
    pub span: SourceRange,
    /// Value including its quotes or braces.
    pub raw_span: SourceRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: CompactString,
    pub name_span: SourceRange,
    pub value: Option<AttributeValue>,
}

impl Attribute {
    /// Whole attribute, name through closing quote.
    pub fn span(&self) -> SourceRange {
        match &self.value {
            Some(value) => SourceRange::new(self.name_span.start, value.raw_span.end),
            None => self.name_span,
        }
    }

    /// Literal value for quoted and unquoted attributes.
    pub fn static_value<'s>(&self, source: &'s str) -> Option<&'s str> {
        match &self.value {
            Some(value) if value.kind != AttributeValueKind::Expression => value.span.slice(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Tag name for elements, empty otherwise.
    pub tag: CompactString,
    pub span: SourceRange,
    /// Offset right after the `>` of the start tag.
    pub start_tag_end: Option<u32>,
    /// Offset of the `<` of the end tag.
    pub end_tag_start: Option<u32>,
    pub attributes: SmallVec<[Attribute; 4]>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind, span: SourceRange, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            tag: CompactString::default(),
            span,
            start_tag_end: None,
            end_tag_start: None,
            attributes: SmallVec::new(),
            children: Vec::new(),
            parent,
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Case-insensitive tag comparison.
    #[inline]
    pub fn is_tag(&self, tag: &str) -> bool {
        self.is_element() && self.tag.eq_ignore_ascii_case(tag)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    #[inline]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Range between the start tag and the end tag. An element whose end
    /// tag is missing runs to the end of its span.
    pub fn content_range(&self) -> Option<SourceRange> {
        let start = self.start_tag_end?;
        let end = self.end_tag_start.unwrap_or(self.span.end);
        (start <= end).then(|| SourceRange::new(start, end))
    }
}

/// Whether the document opens with a `---` fenced prologue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrontmatterStatus {
    #[default]
    DoesNotExist,
    /// Opening fence found at `start`, no closing fence.
    Open { start: u32 },
    /// Opening fence at `start`; `end` is right after the closing fence.
    Closed { start: u32, end: u32 },
}

impl FrontmatterStatus {
    pub const FENCE: &'static str = "---";

    #[inline]
    pub fn exists(&self) -> bool {
        !matches!(self, Self::DoesNotExist)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Fence-to-fence range, fences included.
    pub fn range(&self, text_len: u32) -> Option<SourceRange> {
        match *self {
            Self::DoesNotExist => None,
            Self::Open { start } => Some(SourceRange::new(start, text_len)),
            Self::Closed { start, end } => Some(SourceRange::new(start, end)),
        }
    }

    /// Range between the fences.
    pub fn content_range(&self, text_len: u32) -> Option<SourceRange> {
        let fence = Self::FENCE.len() as u32;
        match *self {
            Self::DoesNotExist => None,
            Self::Open { start } => Some(SourceRange::new((start + fence).min(text_len), text_len)),
            Self::Closed { start, end } => Some(SourceRange::new(start + fence, end - fence)),
        }
    }
}

/// A parsed markup document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupDocument {
    pub nodes: Vec<Node>,
    pub roots: Vec<NodeId>,
    pub frontmatter: FrontmatterStatus,
    pub errors: Vec<MarkupError>,
}

impl MarkupDocument {
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// All nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// All elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.iter().filter(|(_, node)| node.is_element())
    }

    /// Parent chain of `id`, nearest first, `id` excluded.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Node)> {
        let mut current = self.get(id).and_then(|node| node.parent);
        std::iter::from_fn(move || {
            let id = current?;
            let node = self.get(id)?;
            current = node.parent;
            Some((id, node))
        })
    }

    /// Innermost element whose span contains `offset`.
    pub fn find_node_at(&self, offset: u32) -> Option<NodeId> {
        let mut found = None;
        let mut candidates: &[NodeId] = &self.roots;
        'descend: loop {
            for &id in candidates {
                let node = self.node(id);
                if node.is_element() && node.span.contains_exclusive(offset) {
                    found = Some(id);
                    candidates = &node.children;
                    continue 'descend;
                }
            }
            return found;
        }
    }
}
