//! Frontmatter data projection.
//!
//! Content entries keep their frontmatter as data. To let the TypeScript
//! checker validate it against a collection schema, the data tree is written
//! out as an object literal wrapped in
//! `(...) satisfies InferEntrySchema<"<collection>">`, with a mapping for
//! every key and value.
//!
//! Only leaf tokens are mapped. Braces, brackets, commas and line breaks are
//! scaffolding that no mapping covers.

use lumen_carton::SourceRange;
use lumen_folio::{encode_key, encode_literal, Mapping as DataMapping, Node, Scalar, Sequence, YamlError};
use lumen_relief::{Diagnostic, DiagnosticSource, FrontmatterStatus};

use super::{Capabilities, Mapping, ScriptKind, VirtualCode, VirtualLanguage};

const PREAMBLE: &str = "import type { InferEntrySchema } from \"astro:content\";\n\n(\n";

/// Capabilities of key and value mappings.
pub const DATA_CAPABILITIES: Capabilities = Capabilities::DIAGNOSTICS
    .union(Capabilities::SEMANTIC)
    .union(Capabilities::NAVIGATION)
    .union(Capabilities::COMPLETION)
    .union(Capabilities::HOVER);

/// Capabilities of the zero-width anchors on leading and trailing blank lines.
pub const BLANK_LINE_CAPABILITIES: Capabilities = Capabilities::NAVIGATION;

/// Copy of the document up to the end of the frontmatter with both fences
/// replaced by spaces, so offsets into it are document offsets.
pub fn blank_fences(text: &str, status: FrontmatterStatus) -> Option<String> {
    let fence = FrontmatterStatus::FENCE.len();
    let (start, end) = match status {
        FrontmatterStatus::DoesNotExist => return None,
        FrontmatterStatus::Open { start } => (start as usize, text.len()),
        FrontmatterStatus::Closed { start, end } => (start as usize, end as usize),
    };

    let mut bytes = text.as_bytes().get(..end)?.to_vec();
    bytes.get_mut(start..start + fence)?.fill(b' ');
    if status.is_closed() {
        bytes.get_mut(end - fence..end)?.fill(b' ');
    }
    // Only ASCII fences were replaced
    String::from_utf8(bytes).ok()
}

/// Result of one projection.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontmatterProjection {
    pub text: String,
    pub mappings: Vec<Mapping>,
    pub errors: Vec<YamlError>,
    /// The body comes from the last valid projection because this one failed
    /// to parse.
    pub stale: bool,
}

impl FrontmatterProjection {
    /// Parse errors as diagnostics. They are warnings: the projection keeps
    /// serving the last valid content while the block is being typed.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.errors
            .iter()
            .map(|err| {
                Diagnostic::warning(DiagnosticSource::Frontmatter, err.span, err.code.to_string())
            })
            .collect()
    }

    pub fn into_virtual_code(self, id: impl Into<String>) -> VirtualCode {
        VirtualCode::new(
            id,
            VirtualLanguage::Script(ScriptKind::TypeScript),
            self.text,
            self.mappings,
        )
    }
}

#[derive(Debug, Clone)]
struct Body {
    text: String,
    mappings: Vec<Mapping>,
}

/// Projects frontmatter data, remembering the last body that parsed cleanly.
///
/// One projector belongs to one source document; the remembered body is
/// replaced by every later valid projection and dropped with the document.
#[derive(Debug, Default)]
pub struct FrontmatterProjector {
    last_valid: Option<Body>,
}

impl FrontmatterProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_last_valid(&self) -> bool {
        self.last_valid.is_some()
    }

    /// Project the frontmatter of `text`. Returns `None` without frontmatter.
    pub fn project(
        &mut self,
        text: &str,
        status: FrontmatterStatus,
        collection: &str,
    ) -> Option<FrontmatterProjection> {
        let block = blank_fences(text, status)?;
        let content = status.content_range(block.len() as u32)?;
        let document = lumen_folio::parse(&block);

        let (body, stale) = if document.is_valid() {
            let body = write_body(&block, status, content, document.root.as_ref());
            self.last_valid = Some(body.clone());
            (body, false)
        } else if let Some(last) = &self.last_valid {
            tracing::debug!(
                errors = document.errors.len(),
                "frontmatter does not parse, keeping last valid projection"
            );
            (last.clone(), true)
        } else {
            (write_body(&block, status, content, document.root.as_ref()), false)
        };

        let mut out = body.text;
        out.push_str(") satisfies InferEntrySchema<");
        out.push_str(&serde_json::Value::from(collection).to_string());
        out.push_str(">;\n\n");

        Some(FrontmatterProjection {
            text: out,
            mappings: body.mappings,
            errors: document.errors,
            stale,
        })
    }
}

/// Project one data tree, preamble included. `content` is the range
/// between the fences.
fn write_body(
    block: &str,
    status: FrontmatterStatus,
    content: SourceRange,
    root: Option<&Node>,
) -> Body {
    let mut writer = Writer {
        out: PREAMBLE.to_string(),
        mappings: Vec::new(),
    };
    let lines = content_lines(block, content, status.is_closed());

    if let Some(&(line_start, true)) = lines.first() {
        writer.anchor(line_start);
        writer.out.push('\n');
    }

    match root {
        Some(Node::Mapping(mapping)) => writer.mapping(mapping, false),
        Some(Node::Sequence(sequence)) => writer.sequence(sequence, false),
        Some(Node::Scalar(scalar)) if !scalar.is_null() => {
            writer.scalar(scalar);
            writer.out.push('\n');
        }
        _ => writer.out.push_str("{}\n"),
    }

    if lines.len() > 1 {
        if let Some(&(line_start, true)) = lines.last() {
            writer.anchor(line_start);
            writer.out.push('\n');
        }
    }

    Body {
        text: writer.out,
        mappings: writer.mappings,
    }
}

/// Start offset and blankness of every line strictly between the fence
/// lines.
fn content_lines(block: &str, content: SourceRange, closed: bool) -> Vec<(u32, bool)> {
    let Some(inner) = content.slice(block) else {
        return Vec::new();
    };
    let mut lines = Vec::new();
    let mut offset = content.start;
    for (i, line) in inner.split('\n').enumerate() {
        // The rest of the opening fence line and the start of the closing one
        let is_fence_line = i == 0;
        if !is_fence_line {
            lines.push((offset, line.trim().is_empty()));
        }
        offset += line.len() as u32 + 1;
    }
    if closed {
        // The closing fence line starts after the last line break
        lines.pop();
    }
    lines
}

struct Writer {
    out: String,
    mappings: Vec<Mapping>,
}

impl Writer {
    #[inline]
    fn position(&self) -> u32 {
        self.out.len() as u32
    }

    fn anchor(&mut self, source: u32) {
        let at = self.position();
        self.mappings.push(Mapping::with_capabilities(
            SourceRange::empty_at(source),
            SourceRange::empty_at(at),
            BLANK_LINE_CAPABILITIES,
        ));
    }

    fn emit(&mut self, source: SourceRange, text: &str) {
        let at = self.position();
        self.out.push_str(text);
        self.mappings.push(Mapping::with_capabilities(
            source,
            SourceRange::with_len(at, text.len() as u32),
            DATA_CAPABILITIES,
        ));
    }

    /// A value scalar. Null values are written but not mapped, so a checker
    /// complaint about them never lands on user text.
    fn scalar(&mut self, scalar: &Scalar) {
        if scalar.is_null() {
            self.out.push_str("null");
        } else {
            self.emit(scalar.span, &encode_literal(scalar));
        }
    }

    fn mapping(&mut self, mapping: &DataMapping, nested: bool) {
        self.out.push_str("{\n");
        for pair in &mapping.pairs {
            self.emit(pair.key.span, &encode_key(&pair.key));
            self.out.push_str(": ");
            match &pair.value {
                Node::Scalar(scalar) => {
                    self.scalar(scalar);
                    self.out.push_str(",\n");
                }
                Node::Mapping(inner) => self.mapping(inner, true),
                Node::Sequence(inner) => self.sequence(inner, true),
            }
        }
        self.out.push('}');
        if nested {
            self.out.push(',');
        }
        self.out.push('\n');
    }

    fn sequence(&mut self, sequence: &Sequence, nested: bool) {
        self.out.push('[');
        for item in &sequence.items {
            match item {
                Node::Scalar(scalar) => {
                    self.scalar(scalar);
                    self.out.push(',');
                }
                Node::Mapping(inner) => self.mapping(inner, true),
                Node::Sequence(inner) => self.sequence(inner, true),
            }
        }
        self.out.push(']');
        if nested {
            self.out.push(',');
        }
        self.out.push('\n');
    }
}
