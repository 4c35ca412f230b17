//! Virtual code tree generation.
//!
//! One generator belongs to one open source document. It turns each new
//! snapshot into a complete [`VirtualCodeTree`] and carries the state that
//! makes consecutive generations cheap: the last compile result, keyed by
//! content hash, and the last frontmatter projection that parsed.

use std::sync::Arc;

use lumen_carton::{hash_str, SourceRange};
use lumen_relief::{Diagnostic, FrontmatterStatus};

use super::{
    blank_fences, script_codes, style_attribute_code, style_block_codes, tsx_virtual_code,
    Capabilities, FrontmatterProjector, Mapping, ScriptKind, TemplateKind, VirtualCode,
    VirtualCodeTree, VirtualLanguage,
};
use crate::compiler::{compile_or_placeholder, CompileOutput, TemplateCompiler};
use crate::document::{DocumentKind, Snapshot};
use crate::regions::{scan_regions, RegionKind, SourceRegion};

/// Capabilities of the structured-data passthrough.
pub const PASSTHROUGH_CAPABILITIES: Capabilities =
    Capabilities::all().difference(Capabilities::FORMAT);

/// Per-document generation state.
#[derive(Debug, Default)]
pub struct VirtualCodeGenerator {
    frontmatter: FrontmatterProjector,
    last_compile: Option<(u64, CompileOutput)>,
}

impl VirtualCodeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the tree for `snapshot`.
    ///
    /// Never fails: a child whose projection fails is replaced by an empty
    /// one and the failure is reported in the tree's diagnostics. Children
    /// equal to those of `previous` are shared with it.
    pub fn generate<C: TemplateCompiler + ?Sized>(
        &mut self,
        source_id: &str,
        snapshot: &Snapshot,
        kind: DocumentKind,
        collection: Option<&str>,
        compiler: &C,
        previous: Option<&VirtualCodeTree>,
    ) -> VirtualCodeTree {
        let span = tracing::debug_span!("generate", source_id, version = snapshot.version());
        let _guard = span.enter();

        let draft = match kind {
            DocumentKind::Template => self.template(source_id, snapshot.text(), compiler),
            DocumentKind::Content => self.content(source_id, snapshot.text(), collection),
        };

        let (root, changed) = share_unchanged(draft.root, draft.children, previous);
        tracing::debug!(changed = changed.len(), "virtual code tree generated");

        VirtualCodeTree {
            source_id: source_id.to_string(),
            version: snapshot.version(),
            kind,
            frontmatter: draft.frontmatter,
            regions: draft.regions,
            root,
            diagnostics: draft.diagnostics,
            changed,
        }
    }

    fn template<C: TemplateCompiler + ?Sized>(
        &mut self,
        source_id: &str,
        text: &str,
        compiler: &C,
    ) -> Draft {
        let markup = lumen_armature::parse(text);
        let regions = scan_regions(text, &markup);
        let output = self.compile(source_id, text, compiler);
        let mut diagnostics = output.diagnostics.clone();

        let tsx = tsx_virtual_code(source_id, text, &output, &markup).unwrap_or_else(|err| {
            tracing::error!(source_id, error = %err, "compiler source map is unusable");
            let placeholder = CompileOutput::placeholder();
            diagnostics.extend(placeholder.diagnostics.iter().cloned());
            VirtualCode::new(
                format!("{source_id}.tsx"),
                VirtualLanguage::Script(ScriptKind::TypeScriptReact),
                "",
                Vec::new(),
            )
        });

        let mut children = vec![tsx];
        children.extend(style_block_codes(source_id, text, &markup, &regions));
        children.extend(style_attribute_code(source_id, text, &regions));
        children.extend(script_codes(source_id, text, &markup, &regions));

        Draft {
            root: root_code(source_id, TemplateKind::Astro, text),
            children,
            frontmatter: markup.frontmatter,
            regions,
            diagnostics,
        }
    }

    fn content(&mut self, source_id: &str, text: &str, collection: Option<&str>) -> Draft {
        let frontmatter = lumen_armature::scan_frontmatter(text);
        let len = text.len() as u32;

        let mut regions = vec![SourceRegion {
            kind: RegionKind::TemplateRoot,
            range: SourceRange::new(0, len),
            node: None,
        }];
        if let Some(range) = frontmatter.range(len) {
            regions.push(SourceRegion {
                kind: RegionKind::Frontmatter,
                range,
                node: None,
            });
        }

        let mut children = Vec::new();
        let mut diagnostics = Vec::new();
        if let Some(collection) = collection {
            children.push(passthrough_code(source_id, text, frontmatter, collection));
            if let Some(projection) = self.frontmatter.project(text, frontmatter, collection) {
                diagnostics.extend(projection.diagnostics());
                let id = format!("{source_id}.frontmatter-ts.ts");
                children.push(projection.into_virtual_code(id));
            }
        }

        Draft {
            root: root_code(source_id, TemplateKind::Markdown, text),
            children,
            frontmatter,
            regions,
            diagnostics,
        }
    }

    /// Compile unless the text is the one compiled last time.
    fn compile<C: TemplateCompiler + ?Sized>(
        &mut self,
        source_id: &str,
        text: &str,
        compiler: &C,
    ) -> CompileOutput {
        let hash = hash_str(text);
        if let Some((last_hash, output)) = &self.last_compile {
            if *last_hash == hash {
                tracing::trace!(source_id, "reusing compile result");
                return output.clone();
            }
        }

        let output = compile_or_placeholder(compiler, text, source_id);
        // A failure may be transient, so only real output is remembered.
        self.last_compile = (!output.is_placeholder()).then(|| (hash, output.clone()));
        output
    }
}

/// Everything generated for one snapshot, before sharing with the previous
/// tree.
struct Draft {
    root: VirtualCode,
    children: Vec<VirtualCode>,
    frontmatter: FrontmatterStatus,
    regions: Vec<SourceRegion>,
    diagnostics: Vec<Diagnostic>,
}

fn root_code(source_id: &str, kind: TemplateKind, text: &str) -> VirtualCode {
    VirtualCode::new(
        source_id,
        VirtualLanguage::Template(kind),
        text,
        vec![Mapping::verbatim(0, 0, text.len() as u32)],
    )
}

/// Frontmatter block with blanked fences, mapped one to one. Empty without
/// frontmatter so the schema still sees a document.
fn passthrough_code(
    source_id: &str,
    text: &str,
    status: FrontmatterStatus,
    collection: &str,
) -> VirtualCode {
    let block = blank_fences(text, status).unwrap_or_default();
    let mappings = if block.is_empty() {
        Vec::new()
    } else {
        let len = block.len() as u32;
        vec![Mapping::with_capabilities(
            SourceRange::new(0, len),
            SourceRange::new(0, len),
            PASSTHROUGH_CAPABILITIES,
        )]
    };
    VirtualCode::new(
        format!("{source_id}.yaml_frontmatter_{collection}.yaml"),
        VirtualLanguage::StructuredData,
        block,
        mappings,
    )
}

/// Attach `children` to `root`, reusing every code of `previous` whose
/// content is unchanged. Returns the root and the ids that changed,
/// including ids that disappeared.
fn share_unchanged(
    root: VirtualCode,
    children: Vec<VirtualCode>,
    previous: Option<&VirtualCodeTree>,
) -> (Arc<VirtualCode>, Vec<String>) {
    let mut changed = Vec::new();

    let children: Vec<Arc<VirtualCode>> = children
        .into_iter()
        .map(|child| {
            match previous.and_then(|tree| tree.root.find_shared(&child.id)) {
                Some(old) if old.same_content(&child) => Arc::clone(old),
                _ => {
                    changed.push(child.id.clone());
                    Arc::new(child)
                }
            }
        })
        .collect();

    if let Some(tree) = previous {
        for old in &tree.root.children {
            if !children.iter().any(|child| child.id == old.id) {
                changed.push(old.id.clone());
            }
        }
    }

    let root = match previous {
        Some(tree)
            if tree.root.same_content(&root)
                && tree.root.children.len() == children.len()
                && tree
                    .root
                    .children
                    .iter()
                    .zip(&children)
                    .all(|(old, new)| Arc::ptr_eq(old, new)) =>
        {
            Arc::clone(&tree.root)
        }
        Some(tree) if tree.root.same_content(&root) => Arc::new(root.with_children(children)),
        _ => {
            changed.insert(0, root.id.clone());
            Arc::new(root.with_children(children))
        }
    };

    (root, changed)
}
