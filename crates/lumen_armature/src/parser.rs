//! Markup tree builder.
//!
//! Drives the [`Tokenizer`] and assembles a [`MarkupDocument`] arena.

use compact_str::CompactString;
use lumen_carton::SourceRange;
use lumen_relief::{
    Attribute, AttributeValue, AttributeValueKind, ErrorCode, FrontmatterStatus, MarkupDocument,
    MarkupError, Node, NodeId, NodeKind,
};

use crate::frontmatter::scan_frontmatter;
use crate::tokenizer::{Callbacks, Tokenizer};

/// Elements that never have content or an end tag.
pub static VOID_ELEMENTS: phf::Set<&'static str> = phf::phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
};

/// Parse a component template.
pub fn parse(source: &str) -> MarkupDocument {
    Parser::new(source).parse()
}

/// Parser context for building the tree
pub struct Parser<'a> {
    source: &'a str,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    /// Open elements, innermost last
    stack: Vec<NodeId>,
    /// Element whose start tag is being read
    current_element: Option<NodeId>,
    errors: Vec<MarkupError>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            nodes: Vec::new(),
            roots: Vec::new(),
            stack: Vec::new(),
            current_element: None,
            errors: Vec::new(),
        }
    }

    /// Parse the source and return the document
    pub fn parse(mut self) -> MarkupDocument {
        let frontmatter = scan_frontmatter(self.source);
        let markup_start = match frontmatter {
            FrontmatterStatus::DoesNotExist => 0,
            FrontmatterStatus::Open { start } => {
                self.errors
                    .push(MarkupError::new(ErrorCode::UnclosedFrontmatter, start));
                (start as usize + FrontmatterStatus::FENCE.len()).min(self.source.len())
            }
            FrontmatterStatus::Closed { end, .. } => end as usize,
        };

        let source = self.source;
        let mut tokenizer =
            Tokenizer::starting_at(source, ParserCallbacks { parser: &mut self }, markup_start);
        tokenizer.tokenize();

        MarkupDocument {
            nodes: self.nodes,
            roots: self.roots,
            frontmatter,
            errors: self.errors,
        }
    }

    fn len(&self) -> u32 {
        self.source.len() as u32
    }

    /// Append a node under the innermost open element (or the root).
    fn push_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let parent = self.stack.last().copied();
        node.parent = parent;
        self.nodes.push(node);
        match parent {
            Some(parent) => self.nodes[parent.index()].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn push_leaf(&mut self, kind: NodeKind, start: usize, end: usize) {
        if start < end {
            self.push_node(Node::new(
                kind,
                SourceRange::new(start as u32, end as u32),
                None,
            ));
        }
    }

    fn current_mut(&mut self) -> Option<&mut Node> {
        let id = self.current_element?;
        self.nodes.get_mut(id.index())
    }

    fn last_attribute_mut(&mut self) -> Option<&mut Attribute> {
        self.current_mut()?.attributes.last_mut()
    }

    fn on_open_tag_name_impl(&mut self, start: usize, end: usize) {
        // An element still waiting for its `>` was cut short by EOF.
        self.current_element = None;

        let mut node = Node::new(
            NodeKind::Element,
            SourceRange::new(start as u32 - 1, end as u32),
            None,
        );
        node.tag = CompactString::from(&self.source[start..end]);
        let id = self.push_node(node);
        self.current_element = Some(id);
    }

    fn on_open_tag_end_impl(&mut self, end: usize) {
        let Some(id) = self.current_element.take() else {
            return;
        };
        let node = &mut self.nodes[id.index()];
        node.start_tag_end = Some(end as u32 + 1);
        node.span.end = end as u32 + 1;
        if !VOID_ELEMENTS.contains(node.tag.as_str()) {
            self.stack.push(id);
        }
    }

    fn on_self_closing_tag_impl(&mut self, end: usize) {
        let Some(id) = self.current_element.take() else {
            return;
        };
        let node = &mut self.nodes[id.index()];
        node.start_tag_end = Some(end as u32 + 1);
        node.span.end = end as u32 + 1;
    }

    fn on_close_tag_impl(&mut self, tag_start: usize, name_start: usize, name_end: usize, end: usize) {
        let tag = &self.source[name_start..name_end];
        let close_end = (end as u32 + 1).min(self.len());

        let position = self
            .stack
            .iter()
            .rposition(|&id| self.nodes[id.index()].tag == tag)
            .or_else(|| {
                self.stack
                    .iter()
                    .rposition(|&id| self.nodes[id.index()].tag.eq_ignore_ascii_case(tag))
            });

        let Some(position) = position else {
            if !VOID_ELEMENTS.contains(tag) {
                self.errors
                    .push(MarkupError::new(ErrorCode::InvalidEndTag, tag_start as u32));
            }
            return;
        };

        // Everything opened after the match ends where the match's end tag begins.
        while self.stack.len() > position + 1 {
            if let Some(unclosed) = self.stack.pop() {
                let node = &mut self.nodes[unclosed.index()];
                node.span.end = tag_start as u32;
                self.errors
                    .push(MarkupError::new(ErrorCode::MissingEndTag, node.span.start));
            }
        }

        if let Some(matched) = self.stack.pop() {
            let node = &mut self.nodes[matched.index()];
            node.end_tag_start = Some(tag_start as u32);
            node.span.end = close_end;
        }
    }

    fn on_attrib_name_impl(&mut self, start: usize, end: usize) {
        let name = CompactString::from(&self.source[start..end]);
        if let Some(node) = self.current_mut() {
            node.attributes.push(Attribute {
                name,
                name_span: SourceRange::new(start as u32, end as u32),
                value: None,
            });
        }
    }

    fn on_attrib_value_impl(&mut self, kind: AttributeValueKind, start: usize, end: usize) {
        let span = SourceRange::new(start as u32, end as u32);
        let raw_span = match kind {
            AttributeValueKind::Unquoted => span,
            AttributeValueKind::Quoted(_) | AttributeValueKind::Expression => {
                SourceRange::new(span.start - 1, span.end + 1)
            }
        };
        if let Some(attr) = self.last_attribute_mut() {
            attr.value = Some(AttributeValue {
                kind,
                span,
                raw_span,
            });
        }
    }

    fn on_attrib_shorthand_impl(&mut self, start: usize, end: usize) {
        let raw_span = SourceRange::new(start as u32, end as u32);
        let inner = SourceRange::new(raw_span.start + 1, raw_span.end - 1);
        let name = CompactString::from(self.source[inner.as_usize()].trim());
        if let Some(node) = self.current_mut() {
            node.attributes.push(Attribute {
                name,
                name_span: raw_span,
                value: Some(AttributeValue {
                    kind: AttributeValueKind::Expression,
                    span: inner,
                    raw_span,
                }),
            });
        }
    }

    fn on_end_impl(&mut self) {
        let len = self.len();
        if let Some(id) = self.current_element.take() {
            self.nodes[id.index()].span.end = len;
        }
        while let Some(id) = self.stack.pop() {
            let node = &mut self.nodes[id.index()];
            node.span.end = len;
            self.errors
                .push(MarkupError::new(ErrorCode::MissingEndTag, node.span.start));
        }
    }
}

/// Callbacks adapter for the parser
struct ParserCallbacks<'a, 'b> {
    parser: &'b mut Parser<'a>,
}

impl Callbacks for ParserCallbacks<'_, '_> {
    fn on_text(&mut self, start: usize, end: usize) {
        self.parser.push_leaf(NodeKind::Text, start, end);
    }

    fn on_expression(&mut self, start: usize, end: usize) {
        self.parser.push_leaf(NodeKind::Expression, start, end);
    }

    fn on_open_tag_name(&mut self, start: usize, end: usize) {
        self.parser.on_open_tag_name_impl(start, end);
    }

    fn on_open_tag_end(&mut self, end: usize) {
        self.parser.on_open_tag_end_impl(end);
    }

    fn on_self_closing_tag(&mut self, end: usize) {
        self.parser.on_self_closing_tag_impl(end);
    }

    fn on_close_tag(&mut self, tag_start: usize, name_start: usize, name_end: usize, end: usize) {
        self.parser
            .on_close_tag_impl(tag_start, name_start, name_end, end);
    }

    fn on_attrib_name(&mut self, start: usize, end: usize) {
        self.parser.on_attrib_name_impl(start, end);
    }

    fn on_attrib_value(&mut self, kind: AttributeValueKind, start: usize, end: usize) {
        self.parser.on_attrib_value_impl(kind, start, end);
    }

    fn on_attrib_shorthand(&mut self, start: usize, end: usize) {
        self.parser.on_attrib_shorthand_impl(start, end);
    }

    fn on_comment(&mut self, start: usize, end: usize) {
        self.parser.push_leaf(NodeKind::Comment, start, end);
    }

    fn on_doctype(&mut self, start: usize, end: usize) {
        self.parser.push_leaf(NodeKind::Doctype, start, end);
    }

    fn on_end(&mut self) {
        self.parser.on_end_impl();
    }

    fn on_error(&mut self, code: ErrorCode, index: usize) {
        self.parser
            .errors
            .push(MarkupError::new(code, index as u32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element<'d>(doc: &'d MarkupDocument, tag: &str) -> &'d Node {
        doc.nodes
            .iter()
            .find(|node| node.is_tag(tag))
            .unwrap_or_else(|| panic!("no <{tag}> in document"))
    }

    mod structure {
        use super::*;

        #[test]
        fn test_nesting_and_spans() {
            let source = "<div><p>hi</p></div>";
            let doc = parse(source);
            assert_eq!(doc.roots.len(), 1);

            let div = doc.node(doc.roots[0]);
            assert_eq!(div.span, SourceRange::new(0, 20));
            assert_eq!(div.start_tag_end, Some(5));
            assert_eq!(div.end_tag_start, Some(14));

            let p = doc.node(div.children[0]);
            assert_eq!(p.tag, "p");
            assert_eq!(p.content_range().and_then(|r| r.slice(source)), Some("hi"));
            assert!(doc.errors.is_empty());
        }

        #[test]
        fn test_void_and_self_closing() {
            let doc = parse("<div><br><img src=a /><Card/></div>");
            let div = doc.node(doc.roots[0]);
            let tags: Vec<_> = div
                .children
                .iter()
                .map(|&id| doc.node(id).tag.as_str())
                .collect();
            assert_eq!(tags, vec!["br", "img", "Card"]);
            assert!(doc.errors.is_empty());
        }

        #[test]
        fn test_unclosed_child_ends_at_parent_end_tag() {
            let source = "<ul><li>one</ul>";
            let doc = parse(source);
            let li = element(&doc, "li");
            assert_eq!(li.span, SourceRange::new(4, 11));
            assert_eq!(doc.errors, vec![MarkupError::new(ErrorCode::MissingEndTag, 4)]);
        }

        #[test]
        fn test_stray_end_tag() {
            let doc = parse("<div></span></div>");
            assert_eq!(
                doc.errors,
                vec![MarkupError::new(ErrorCode::InvalidEndTag, 5)]
            );
            assert_eq!(doc.node(doc.roots[0]).span.end, 18);
        }

        #[test]
        fn test_unclosed_at_eof() {
            let doc = parse("<section><p>");
            assert_eq!(element(&doc, "section").span.end, 12);
            assert_eq!(doc.errors.len(), 2);
        }
    }

    mod frontmatter {
        use super::*;

        #[test]
        fn test_markup_starts_after_closing_fence() {
            let source = "---\nconst x = a < b;\n---\n<h1>{x}</h1>";
            let doc = parse(source);
            assert!(doc.frontmatter.is_closed());
            let h1 = element(&doc, "h1");
            let expr = doc.node(h1.children[0]);
            assert_eq!(expr.kind, NodeKind::Expression);
            assert_eq!(expr.span.slice(source), Some("{x}"));
        }

        #[test]
        fn test_open_frontmatter_is_reported() {
            let doc = parse("---\n<div/>");
            assert_eq!(doc.frontmatter, FrontmatterStatus::Open { start: 0 });
            assert!(doc
                .errors
                .contains(&MarkupError::new(ErrorCode::UnclosedFrontmatter, 0)));
            assert_eq!(element(&doc, "div").span, SourceRange::new(4, 10));
        }
    }

    mod attributes {
        use super::*;

        #[test]
        fn test_value_spans() {
            let source = r#"<p style="color: red" class={cls} {title}></p>"#;
            let doc = parse(source);
            let p = element(&doc, "p");

            let style = p.attribute("style").and_then(|a| a.value.as_ref());
            let style = style.map(|v| (v.span.slice(source), v.raw_span.slice(source)));
            assert_eq!(style, Some((Some("color: red"), Some("\"color: red\""))));

            let class = p.attribute("class");
            assert_eq!(class.and_then(|a| a.static_value(source)), None);
            assert_eq!(
                class.map(|a| a.span().slice(source)),
                Some(Some("class={cls}"))
            );

            let title = p.attribute("title");
            assert_eq!(
                title.and_then(|a| a.value.as_ref()).map(|v| v.kind),
                Some(AttributeValueKind::Expression)
            );
        }

        #[test]
        fn test_raw_script_body_kept_whole() {
            let source = "<script>const el = '<div>';</script><div></div>";
            let doc = parse(source);
            let script = element(&doc, "script");
            assert_eq!(
                script.content_range().and_then(|r| r.slice(source)),
                Some("const el = '<div>';")
            );
            assert_eq!(doc.elements().count(), 2);
        }
    }

    mod lookup {
        use super::*;

        #[test]
        fn test_find_node_at() {
            let source = "<div><script>let a;</script></div>";
            let doc = parse(source);
            let at_script = doc.find_node_at(15).map(|id| doc.node(id).tag.as_str());
            assert_eq!(at_script, Some("script"));
            let at_div = doc.find_node_at(2).map(|id| doc.node(id).tag.as_str());
            assert_eq!(at_div, Some("div"));
            assert_eq!(doc.find_node_at(40), None);
        }

        #[test]
        fn test_ancestors() {
            let doc = parse("<a><b><c></c></b></a>");
            let c = doc
                .elements()
                .find(|(_, node)| node.tag == "c")
                .map(|(id, _)| id);
            let chain: Vec<_> = c
                .into_iter()
                .flat_map(|id| doc.ancestors(id).map(|(_, n)| n.tag.as_str()))
                .collect();
            assert_eq!(chain, vec!["b", "a"]);
        }
    }
}
