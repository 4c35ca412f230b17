//! Stylesheet projections.
//!
//! Every `<style>` block becomes its own stylesheet document. All quoted
//! `style` attributes of a component are gathered into one extra document,
//! each value wrapped in a throwaway rule so it parses standalone.

use lumen_carton::SourceRange;
use lumen_relief::MarkupDocument;

use super::{Capabilities, Mapping, StyleKind, VirtualCode, VirtualLanguage};
use crate::regions::{RegionKind, SourceRegion};

/// Reformatting a block would fight the indentation of the surrounding
/// markup.
pub const STYLE_BLOCK_CAPABILITIES: Capabilities =
    Capabilities::all().difference(Capabilities::FORMAT);

/// Attribute values only get color swatches and hover.
pub const STYLE_ATTRIBUTE_CAPABILITIES: Capabilities =
    Capabilities::COLOR.union(Capabilities::HOVER);

const RULE_OPEN: &str = "x { ";
const RULE_CLOSE: &str = " }\n";

/// One virtual stylesheet per `<style>` block, numbered in document order.
///
/// A block with an unsupported `lang` is skipped but keeps its number, so
/// the ids of the blocks after it do not move.
pub fn style_block_codes(
    source_id: &str,
    text: &str,
    document: &MarkupDocument,
    regions: &[SourceRegion],
) -> Vec<VirtualCode> {
    regions
        .iter()
        .filter(|region| region.is(RegionKind::StyleBlock))
        .enumerate()
        .filter_map(|(index, region)| {
            let lang = region
                .node
                .and_then(|id| document.get(id))
                .and_then(|node| node.attribute("lang"))
                .and_then(|attr| attr.static_value(text))
                .unwrap_or_default();
            let Some(kind) = StyleKind::from_lang(lang) else {
                tracing::debug!(lang, index, "skipping style block with unsupported lang");
                return None;
            };
            let content = region.range.slice(text)?;
            let language = VirtualLanguage::Style(kind);

            Some(VirtualCode::new(
                format!("{source_id}.{index}.{}", language.extension()),
                language,
                content,
                vec![Mapping::with_capabilities(
                    region.range,
                    SourceRange::with_len(0, region.range.len()),
                    STYLE_BLOCK_CAPABILITIES,
                )],
            ))
        })
        .collect()
}

/// All quoted `style` attributes as rules of one stylesheet, or `None`
/// when the component has none.
pub fn style_attribute_code(
    source_id: &str,
    text: &str,
    regions: &[SourceRegion],
) -> Option<VirtualCode> {
    let mut out = String::new();
    let mut mappings = Vec::new();

    for region in regions.iter().filter(|r| r.is(RegionKind::StyleAttribute)) {
        let Some(value) = region.range.slice(text) else {
            continue;
        };
        out.push_str(RULE_OPEN);
        let at = out.len() as u32;
        out.push_str(value);
        out.push_str(RULE_CLOSE);
        mappings.push(Mapping::with_capabilities(
            region.range,
            SourceRange::with_len(at, region.range.len()),
            STYLE_ATTRIBUTE_CAPABILITIES,
        ));
    }

    if mappings.is_empty() {
        return None;
    }
    Some(VirtualCode::new(
        format!("{source_id}.inline.css"),
        VirtualLanguage::Style(StyleKind::Css),
        out,
        mappings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::scan_regions;
    use lumen_armature::parse;

    fn blocks(text: &str) -> Vec<VirtualCode> {
        let document = parse(text);
        let regions = scan_regions(text, &document);
        style_block_codes("a.astro", text, &document, &regions)
    }

    fn inline(text: &str) -> Option<VirtualCode> {
        let document = parse(text);
        style_attribute_code("a.astro", text, &scan_regions(text, &document))
    }

    #[test]
    fn test_block_projection() {
        let text = "<div/>\n<style>\n  a { color: red; }\n</style>";
        let codes = blocks(text);

        assert_eq!(codes.len(), 1);
        let code = &codes[0];
        assert_eq!(code.id, "a.astro.0.css");
        assert_eq!(code.text(), "\n  a { color: red; }\n");
        assert_eq!(code.mappings().len(), 1);

        let mapping = code.mappings()[0];
        assert!(mapping.is_verbatim(text, code.text()));
        assert_eq!(mapping.generated.start, 0);
        assert_eq!(mapping.generated.end, code.len());
        assert!(!mapping.capabilities.contains(Capabilities::FORMAT));
        assert!(mapping.capabilities.contains(Capabilities::DIAGNOSTICS));
        assert!(mapping.capabilities.contains(Capabilities::COMPLETION));
    }

    #[test]
    fn test_block_lang_and_numbering() {
        let text = "<style lang=\"scss\">$a: 1;</style><style lang=\"stylus\">a</style><style lang='less'>@b: 2;</style>";
        let ids: Vec<_> = blocks(text)
            .into_iter()
            .map(|code| (code.id, code.language))
            .collect();

        assert_eq!(
            ids,
            vec![
                ("a.astro.0.scss".to_string(), VirtualLanguage::Style(StyleKind::Scss)),
                ("a.astro.2.less".to_string(), VirtualLanguage::Style(StyleKind::Less)),
            ]
        );
    }

    #[test]
    fn test_ids_stable_across_edits() {
        let before = blocks("<style>a{}</style><p>x</p><style>b{}</style>");
        let after = blocks("<style>a{}</style><p>changed text</p><style>b{}</style>");
        assert_eq!(before[1].id, after[1].id);
        assert!(before[0].same_content(&after[0]));
    }

    #[test]
    fn test_unclosed_block_skipped() {
        assert!(blocks("<style>a { color: red; }").is_empty());
    }

    #[test]
    fn test_attribute_rules() {
        let text = "<p style=\"color: red\">a</p><b style='margin: 0'>b</b>";
        let code = inline(text).unwrap();

        assert_eq!(code.id, "a.astro.inline.css");
        assert_eq!(code.text(), "x { color: red }\nx { margin: 0 }\n");
        assert_eq!(code.mappings().len(), 2);
        for mapping in code.mappings() {
            assert!(mapping.is_verbatim(text, code.text()));
            assert_eq!(mapping.capabilities, STYLE_ATTRIBUTE_CAPABILITIES);
        }
    }

    #[test]
    fn test_attribute_value_round_trips() {
        let text = "<div style=\"color: ;\"></div>";
        let code = inline(text).unwrap();
        let mapping = code.mappings()[0];

        let unwrapped = code
            .text()
            .strip_prefix(RULE_OPEN)
            .and_then(|rest| rest.strip_suffix(RULE_CLOSE))
            .unwrap();
        assert_eq!(unwrapped, "color: ;");
        assert_eq!(code.get_text(mapping.generated.start, mapping.generated.end), unwrapped);
        assert_eq!(mapping.source.start, text.find("color").unwrap() as u32);
        assert_eq!(mapping.source.slice(text), Some("color: ;"));
        assert!(!mapping.capabilities.contains(Capabilities::DIAGNOSTICS));
        assert!(!mapping.capabilities.contains(Capabilities::FORMAT));
        assert!(mapping.capabilities.contains(Capabilities::COLOR));
        assert!(mapping.capabilities.contains(Capabilities::HOVER));
    }

    #[test]
    fn test_no_attributes() {
        assert!(inline("<div style={s}></div><p class=\"a\"></p>").is_none());
    }
}
