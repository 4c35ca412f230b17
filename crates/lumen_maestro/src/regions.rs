//! Region scanner.
//!
//! Locates the frontmatter block and the embedded style/script ranges of a
//! parsed component. Pure function of the text and its markup tree.

use lumen_carton::SourceRange;
use lumen_relief::{AttributeValueKind, MarkupDocument, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// The fenced prologue, fences included.
    Frontmatter,
    /// Content of a `<style>` element.
    StyleBlock,
    /// Inner value of a quoted `style` attribute.
    StyleAttribute,
    /// Content of a `<script>` element.
    ScriptBlock,
    /// The whole document.
    TemplateRoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceRegion {
    pub kind: RegionKind,
    pub range: SourceRange,
    /// Element the region was taken from; lookup only.
    pub node: Option<NodeId>,
}

impl SourceRegion {
    #[inline]
    pub fn is(&self, kind: RegionKind) -> bool {
        self.kind == kind
    }
}

/// Collect regions in document order. The template root comes first and the
/// frontmatter, when present, second.
pub fn scan_regions(text: &str, document: &MarkupDocument) -> Vec<SourceRegion> {
    let len = text.len() as u32;
    let mut regions = vec![SourceRegion {
        kind: RegionKind::TemplateRoot,
        range: SourceRange::new(0, len),
        node: None,
    }];

    if let Some(range) = document.frontmatter.range(len) {
        regions.push(SourceRegion {
            kind: RegionKind::Frontmatter,
            range,
            node: None,
        });
    }

    for (id, node) in document.elements() {
        let tag_kind = if node.is_tag("style") {
            Some(RegionKind::StyleBlock)
        } else if node.is_tag("script") {
            Some(RegionKind::ScriptBlock)
        } else {
            None
        };

        // Blocks whose end tag is still missing are skipped until it is typed.
        if let (Some(kind), Some(start), Some(end)) =
            (tag_kind, node.start_tag_end, node.end_tag_start)
        {
            regions.push(SourceRegion {
                kind,
                range: SourceRange::new(start, end),
                node: Some(id),
            });
        }

        let style_value = node
            .attribute("style")
            .and_then(|attr| attr.value.as_ref())
            .filter(|value| matches!(value.kind, AttributeValueKind::Quoted(_)));
        if let Some(value) = style_value {
            regions.push(SourceRegion {
                kind: RegionKind::StyleAttribute,
                range: value.span,
                node: Some(id),
            });
        }
    }

    regions
}

/// Whether `offset` lies in the content of a `<script>` element.
pub fn in_script_block(document: &MarkupDocument, offset: u32) -> bool {
    document
        .find_node_at(offset)
        .is_some_and(|id| document.node(id).is_tag("script"))
}
