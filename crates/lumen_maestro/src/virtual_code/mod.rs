//! Virtual Code Layer for embedded language support.
//!
//! Every open component is projected into a tree of virtual documents, one
//! per embedded language, each carrying a [`SourceMap`] back to the source.
//!
//! ## Architecture
//!
//! ```text
//! .astro component                      .md content entry
//!     │                                     │
//!     ▼                                     ▼
//! ┌─────────────────────────────────────────────────────┐
//! │ VirtualCodeGenerator                                 │
//! │ (markup parse → regions → projections)               │
//! └─────────────────────────────────────────────────────┘
//!     │                                     │
//!     ├─► <id>.tsx   (template compiler     ├─► yaml_frontmatter_<collection>
//!     │               output, repaired map) │   (fences blanked, 1:1)
//!     ├─► <id>.N.css (one per <style>)      └─► frontmatter-ts
//!     ├─► <id>.inline.css (style="")            (data → typed literal)
//!     └─► <id>.N.ts  (one per <script>)
//! ```

mod frontmatter_code;
mod generator;
mod script_code;
mod source_map;
mod style_code;
mod tsx_code;

pub use frontmatter_code::*;
pub use generator::*;
pub use script_code::*;
pub use source_map::*;
pub use style_code::*;
pub use tsx_code::*;

use std::sync::Arc;

use lumen_carton::{Fingerprint, SourceRange};
use lumen_relief::{Diagnostic, FrontmatterStatus};

use crate::document::DocumentKind;
use crate::regions::SourceRegion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Astro,
    Markdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    TypeScriptReact,
    TypeScript,
    JavaScript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StyleKind {
    #[default]
    Css,
    Scss,
    Less,
}

impl StyleKind {
    /// Resolve a `lang` attribute value.
    pub fn from_lang(lang: &str) -> Option<Self> {
        match lang.trim().to_ascii_lowercase().as_str() {
            "css" | "" => Some(Self::Css),
            "scss" | "sass" => Some(Self::Scss),
            "less" => Some(Self::Less),
            _ => None,
        }
    }
}

/// Virtual language types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualLanguage {
    /// Root projection of a source document
    Template(TemplateKind),
    /// TypeScript/JavaScript
    Script(ScriptKind),
    /// CSS/SCSS/Less
    Style(StyleKind),
    /// Frontmatter data passthrough
    StructuredData,
}

impl VirtualLanguage {
    /// Get the language ID for LSP.
    pub fn language_id(&self) -> &'static str {
        match self {
            VirtualLanguage::Template(TemplateKind::Astro) => "astro",
            VirtualLanguage::Template(TemplateKind::Markdown) => "markdown",
            VirtualLanguage::Script(ScriptKind::TypeScriptReact) => "typescriptreact",
            VirtualLanguage::Script(ScriptKind::TypeScript) => "typescript",
            VirtualLanguage::Script(ScriptKind::JavaScript) => "javascript",
            VirtualLanguage::Style(StyleKind::Css) => "css",
            VirtualLanguage::Style(StyleKind::Scss) => "scss",
            VirtualLanguage::Style(StyleKind::Less) => "less",
            VirtualLanguage::StructuredData => "yaml",
        }
    }

    /// Get the file extension for this virtual language.
    pub fn extension(&self) -> &'static str {
        match self {
            VirtualLanguage::Template(TemplateKind::Astro) => "astro",
            VirtualLanguage::Template(TemplateKind::Markdown) => "md",
            VirtualLanguage::Script(ScriptKind::TypeScriptReact) => "tsx",
            VirtualLanguage::Script(ScriptKind::TypeScript) => "ts",
            VirtualLanguage::Script(ScriptKind::JavaScript) => "js",
            VirtualLanguage::Style(StyleKind::Css) => "css",
            VirtualLanguage::Style(StyleKind::Scss) => "scss",
            VirtualLanguage::Style(StyleKind::Less) => "less",
            VirtualLanguage::StructuredData => "yaml",
        }
    }
}

/// A generated document plus its mappings back to the source.
///
/// Immutable once built; an edit produces new codes, and unchanged ones are
/// shared between consecutive trees through their `Arc`.
#[derive(Debug, Clone)]
pub struct VirtualCode {
    /// Virtual document id (e.g., "src/pages/index.astro.0.css")
    pub id: String,
    pub language: VirtualLanguage,
    text: Arc<str>,
    pub source_map: SourceMap,
    pub children: Vec<Arc<VirtualCode>>,
    fingerprint: u64,
}

impl VirtualCode {
    pub fn new(
        id: impl Into<String>,
        language: VirtualLanguage,
        text: impl Into<Arc<str>>,
        mappings: Vec<Mapping>,
    ) -> Self {
        let id = id.into();
        let text = text.into();
        let source_map = SourceMap::from_mappings(mappings);

        let mut fingerprint = Fingerprint::new()
            .str(&id)
            .str(language.language_id())
            .str(&text);
        for mapping in source_map.iter() {
            fingerprint = fingerprint
                .u32(mapping.source.start)
                .u32(mapping.source.end)
                .u32(mapping.generated.start)
                .u32(mapping.generated.end)
                .u32(mapping.capabilities.bits() as u32);
        }

        Self {
            id,
            language,
            text,
            source_map,
            children: Vec::new(),
            fingerprint: fingerprint.finish(),
        }
    }

    pub fn with_children(mut self, children: Vec<Arc<VirtualCode>>) -> Self {
        self.children = children;
        self
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text between two generated offsets; empty when the range is invalid.
    pub fn get_text(&self, start: u32, end: u32) -> &str {
        let end = end.min(self.len());
        SourceRange::new(start.min(end), end)
            .slice(&self.text)
            .unwrap_or_default()
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[inline]
    pub fn mappings(&self) -> &[Mapping] {
        self.source_map.mappings()
    }

    /// Same id, language, text and mappings. Children are not compared.
    pub fn same_content(&self, other: &VirtualCode) -> bool {
        self.fingerprint == other.fingerprint
            && self.id == other.id
            && self.language == other.language
            && self.text == other.text
            && self.source_map == other.source_map
    }

    /// This code and all of its descendants, depth first.
    pub fn walk(&self) -> Vec<&VirtualCode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(code) = stack.pop() {
            out.push(code);
            stack.extend(code.children.iter().rev().map(|child| &**child));
        }
        out
    }

    pub fn find(&self, id: &str) -> Option<&VirtualCode> {
        self.walk().into_iter().find(|code| code.id == id)
    }

    pub fn find_shared(&self, id: &str) -> Option<&Arc<VirtualCode>> {
        self.children.iter().find_map(|child| {
            if child.id == id {
                Some(child)
            } else {
                child.find_shared(id)
            }
        })
    }
}

/// Everything derived from one snapshot of a source document.
#[derive(Debug, Clone)]
pub struct VirtualCodeTree {
    pub source_id: String,
    pub version: i32,
    pub kind: DocumentKind,
    pub frontmatter: FrontmatterStatus,
    pub regions: Vec<SourceRegion>,
    pub root: Arc<VirtualCode>,
    pub diagnostics: Vec<Diagnostic>,
    /// Ids of codes whose content differs from the previous tree.
    pub changed: Vec<String>,
}

impl VirtualCodeTree {
    pub fn find(&self, id: &str) -> Option<&VirtualCode> {
        self.root.find(id)
    }

    pub fn codes(&self) -> Vec<&VirtualCode> {
        self.root.walk()
    }

    /// The typed-script projection, if any.
    pub fn tsx(&self) -> Option<&VirtualCode> {
        self.codes()
            .into_iter()
            .find(|code| code.language == VirtualLanguage::Script(ScriptKind::TypeScriptReact))
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_ids() {
        let style = VirtualLanguage::Style(StyleKind::Scss);
        assert_eq!(style.language_id(), "scss");
        assert_eq!(style.extension(), "scss");
        assert_eq!(
            VirtualLanguage::Script(ScriptKind::TypeScriptReact).extension(),
            "tsx"
        );
        assert_eq!(VirtualLanguage::StructuredData.language_id(), "yaml");
    }

    #[test]
    fn test_style_kind_from_lang() {
        assert_eq!(StyleKind::from_lang("SCSS"), Some(StyleKind::Scss));
        assert_eq!(StyleKind::from_lang("less"), Some(StyleKind::Less));
        assert_eq!(StyleKind::from_lang("stylus"), None);
    }

    #[test]
    fn test_get_text_clamps() {
        let code = VirtualCode::new("a.css", VirtualLanguage::Style(StyleKind::Css), "a{}", vec![]);
        assert_eq!(code.get_text(0, 2), "a{");
        assert_eq!(code.get_text(1, 99), "{}");
        assert_eq!(code.get_text(5, 2), "");
        assert_eq!(code.len(), 3);
    }

    #[test]
    fn test_same_content() {
        let css = VirtualLanguage::Style(StyleKind::Css);
        let a = VirtualCode::new("a.css", css, "a{}", vec![Mapping::verbatim(0, 0, 3)]);
        let b = VirtualCode::new("a.css", css, "a{}", vec![Mapping::verbatim(0, 0, 3)]);
        let c = VirtualCode::new("a.css", css, "a{}", vec![Mapping::verbatim(1, 0, 3)]);
        assert!(a.same_content(&b));
        assert!(!a.same_content(&c));
    }

    #[test]
    fn test_walk_and_find() {
        let css = VirtualLanguage::Style(StyleKind::Css);
        let leaf = Arc::new(VirtualCode::new("leaf", css, "", vec![]));
        let mid = Arc::new(VirtualCode::new("mid", css, "", vec![]).with_children(vec![leaf]));
        let root = VirtualCode::new("root", VirtualLanguage::Template(TemplateKind::Astro), "", vec![])
            .with_children(vec![mid]);

        let ids: Vec<_> = root.walk().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "mid", "leaf"]);
        assert!(root.find("leaf").is_some());
        assert!(root.find_shared("leaf").is_some());
        assert!(root.find("missing").is_none());
    }
}
