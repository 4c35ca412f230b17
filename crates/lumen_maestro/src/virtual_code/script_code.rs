//! Client script passthroughs.

use lumen_carton::SourceRange;
use lumen_relief::{MarkupDocument, Node};

use super::{Capabilities, Mapping, ScriptKind, VirtualCode, VirtualLanguage};
use crate::regions::{RegionKind, SourceRegion};

/// Capabilities of an `is:inline` script, which is shipped untouched.
pub const INLINE_SCRIPT_CAPABILITIES: Capabilities =
    Capabilities::all().difference(Capabilities::FORMAT);

/// `type` values whose content is still script.
const SCRIPT_TYPES: &[&str] = &[
    "module",
    "text/javascript",
    "application/javascript",
    "text/partytown",
];

/// Whether a `<script>` element holds script rather than data.
fn holds_script(node: &Node, text: &str) -> bool {
    match node.attribute("type") {
        None => true,
        Some(attr) => attr.static_value(text).is_some_and(|ty| {
            let ty = ty.trim();
            SCRIPT_TYPES.iter().any(|known| known.eq_ignore_ascii_case(ty))
        }),
    }
}

/// One virtual script per `<script>` block, numbered in document order.
/// Data blocks (`application/json`, import maps, ...) keep their number but
/// produce nothing.
pub fn script_codes(
    source_id: &str,
    text: &str,
    document: &MarkupDocument,
    regions: &[SourceRegion],
) -> Vec<VirtualCode> {
    regions
        .iter()
        .filter(|region| region.is(RegionKind::ScriptBlock))
        .enumerate()
        .filter_map(|(index, region)| {
            let node = region.node.and_then(|id| document.get(id))?;
            if !holds_script(node, text) {
                return None;
            }

            let (kind, capabilities) = if node.has_attribute("is:inline") {
                (ScriptKind::JavaScript, INLINE_SCRIPT_CAPABILITIES)
            } else {
                (ScriptKind::TypeScript, Capabilities::all())
            };
            let language = VirtualLanguage::Script(kind);

            Some(VirtualCode::new(
                format!("{source_id}.{index}.{}", language.extension()),
                language,
                region.range.slice(text)?,
                vec![Mapping::with_capabilities(
                    region.range,
                    SourceRange::with_len(0, region.range.len()),
                    capabilities,
                )],
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::scan_regions;
    use lumen_armature::parse;

    fn scripts(text: &str) -> Vec<VirtualCode> {
        let document = parse(text);
        let regions = scan_regions(text, &document);
        script_codes("a.astro", text, &document, &regions)
    }

    #[test]
    fn test_nested_scripts() {
        let codes = scripts(
            "<script>console.log('hi')</script><div><script>console.log('hi2')</script></div>",
        );
        let ids: Vec<_> = codes.iter().map(|code| code.id.as_str()).collect();
        assert_eq!(ids, vec!["a.astro.0.ts", "a.astro.1.ts"]);
        assert_eq!(codes[1].text(), "console.log('hi2')");
        assert_eq!(codes[0].mappings()[0].capabilities, Capabilities::all());
    }

    #[test]
    fn test_json_skipped() {
        assert!(scripts("<script type=\"application/json\">{foo: \"bar\"}</script>").is_empty());
        assert!(scripts("<script type=\"importmap\">{}</script>").is_empty());
        assert_eq!(scripts("<script type=\"module\">let a;</script>").len(), 1);
    }

    #[test]
    fn test_inline_script() {
        let text = "<p/><script is:inline>console.log('hi')</script>";
        let codes = scripts(text);

        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].id, "a.astro.0.js");
        assert_eq!(codes[0].language, VirtualLanguage::Script(ScriptKind::JavaScript));
        let mapping = codes[0].mappings()[0];
        assert!(mapping.is_verbatim(text, codes[0].text()));
        assert!(!mapping.capabilities.contains(Capabilities::FORMAT));
        assert!(mapping.capabilities.contains(Capabilities::COMPLETION));
    }

    #[test]
    fn test_numbering_counts_data_blocks() {
        let codes =
            scripts("<script type=\"application/ld+json\">{}</script><script>let a;</script>");
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].id, "a.astro.1.ts");
    }
}
