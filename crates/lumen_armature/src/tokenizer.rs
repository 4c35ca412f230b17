//! Markup tokenizer for component templates.
//!
//! A byte-level state machine in the htmlparser2 tradition, extended with
//! `{expression}` sections (in text and as attribute values) and with
//! raw-text elements whose content is scanned only for the matching end
//! tag.

use lumen_relief::{AttributeValueKind, ErrorCode, QuoteType};

/// Character codes for fast comparison
pub mod char_codes {
    pub const TAB: u8 = 0x09;
    pub const NEWLINE: u8 = 0x0A;
    pub const FORM_FEED: u8 = 0x0C;
    pub const CARRIAGE_RETURN: u8 = 0x0D;
    pub const SPACE: u8 = 0x20;
    pub const EXCLAMATION_MARK: u8 = 0x21;
    pub const DOUBLE_QUOTE: u8 = 0x22;
    pub const SINGLE_QUOTE: u8 = 0x27;
    pub const DASH: u8 = 0x2D;
    pub const SLASH: u8 = 0x2F;
    pub const LT: u8 = 0x3C;
    pub const EQ: u8 = 0x3D;
    pub const GT: u8 = 0x3E;
    pub const UPPER_A: u8 = 0x41;
    pub const UPPER_Z: u8 = 0x5A;
    pub const BACKSLASH: u8 = 0x5C;
    pub const GRAVE_ACCENT: u8 = 0x60;
    pub const LOWER_A: u8 = 0x61;
    pub const LOWER_Z: u8 = 0x7A;
    pub const LEFT_BRACE: u8 = 0x7B;
    pub const RIGHT_BRACE: u8 = 0x7D;
}

use char_codes::*;

/// Elements whose content is not tokenized as markup.
pub static RAW_TEXT_ELEMENTS: phf::Set<&'static str> = phf::phf_set! {
    "script", "style", "textarea", "title",
};

/// All the states the tokenizer can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Text = 1,
    InTextExpression,

    // Tags
    BeforeTagName,
    InTagName,
    InSelfClosingTag,
    BeforeClosingTagName,
    InClosingTagName,
    AfterClosingTagName,

    // Attributes
    BeforeAttrName,
    InAttrName,
    AfterAttrName,
    BeforeAttrValue,
    InAttrValueDq,
    InAttrValueSq,
    InAttrValueNq,
    InAttrExpression,

    // Declarations & comments
    BeforeDeclaration,
    InDeclaration,
    BeforeComment,
    InComment,

    InRawText,
}

/// Tokenizer callbacks
///
/// Offsets are byte offsets into the full source. `end` arguments of the
/// `*_tag_end` callbacks are the index of the closing `>`.
pub trait Callbacks {
    fn on_text(&mut self, start: usize, end: usize);
    /// `{ ... }` in text position, braces included.
    fn on_expression(&mut self, start: usize, end: usize);

    fn on_open_tag_name(&mut self, start: usize, end: usize);
    fn on_open_tag_end(&mut self, end: usize);
    fn on_self_closing_tag(&mut self, end: usize);
    /// `tag_start` is the `<` of the end tag; `end` is its `>` or the end of
    /// input.
    fn on_close_tag(&mut self, tag_start: usize, name_start: usize, name_end: usize, end: usize);

    fn on_attrib_name(&mut self, start: usize, end: usize);
    /// Value span without quotes or braces.
    fn on_attrib_value(&mut self, kind: AttributeValueKind, start: usize, end: usize);
    /// Shorthand `{name}` / `{...spread}` attribute, braces included.
    fn on_attrib_shorthand(&mut self, start: usize, end: usize);

    /// Whole `<!-- ... -->`.
    fn on_comment(&mut self, start: usize, end: usize);
    /// Whole `<!DOCTYPE ...>`.
    fn on_doctype(&mut self, start: usize, end: usize);

    fn on_end(&mut self);
    fn on_error(&mut self, code: ErrorCode, index: usize);
}

/// Check if character is a tag start character (a-z, A-Z)
#[inline]
pub fn is_tag_start_char(c: u8) -> bool {
    (LOWER_A..=LOWER_Z).contains(&c) || (UPPER_A..=UPPER_Z).contains(&c)
}

/// Check if character is whitespace
#[inline]
pub fn is_whitespace(c: u8) -> bool {
    c == SPACE || c == NEWLINE || c == TAB || c == FORM_FEED || c == CARRIAGE_RETURN
}

/// Check if character ends a tag section
#[inline]
pub fn is_end_of_tag_section(c: u8) -> bool {
    c == SLASH || c == GT || is_whitespace(c)
}

/// Brace and string balancing inside `{ ... }`.
#[derive(Debug, Default, Clone, Copy)]
struct ExpressionScan {
    depth: u32,
    quote: Option<u8>,
    escaped: bool,
}

impl ExpressionScan {
    fn open() -> Self {
        Self {
            depth: 1,
            ..Self::default()
        }
    }

    /// Feed one byte; returns true when the outermost brace closes.
    fn step(&mut self, c: u8) -> bool {
        if let Some(quote) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if c == BACKSLASH {
                self.escaped = true;
            } else if c == quote {
                self.quote = None;
            }
            return false;
        }
        match c {
            DOUBLE_QUOTE | SINGLE_QUOTE | GRAVE_ACCENT => self.quote = Some(c),
            LEFT_BRACE => self.depth += 1,
            RIGHT_BRACE => {
                self.depth -= 1;
                return self.depth == 0;
            }
            _ => {}
        }
        false
    }
}

/// Markup tokenizer
pub struct Tokenizer<'a, C: Callbacks> {
    source: &'a str,
    input: &'a [u8],
    state: State,
    /// Buffer start position
    section_start: usize,
    index: usize,
    /// `<` of the tag, comment or declaration being read.
    tag_start: usize,
    /// Name of the start tag being read.
    open_tag: (usize, usize),
    /// Name of the raw-text element whose content is being skipped.
    raw_tag: Option<(usize, usize)>,
    /// Name of the end tag being read.
    close_tag: (usize, usize),
    expression: ExpressionScan,
    /// The current `{ ... }` is a shorthand attribute rather than a value.
    shorthand: bool,
    callbacks: C,
}

impl<'a, C: Callbacks> Tokenizer<'a, C> {
    pub fn new(source: &'a str, callbacks: C) -> Self {
        Self::starting_at(source, callbacks, 0)
    }

    /// Tokenize `source[start..]`, reporting offsets relative to the whole
    /// source.
    pub fn starting_at(source: &'a str, callbacks: C, start: usize) -> Self {
        let start = start.min(source.len());
        Self {
            source,
            input: source.as_bytes(),
            state: State::Text,
            section_start: start,
            index: start,
            tag_start: start,
            open_tag: (start, start),
            raw_tag: None,
            close_tag: (start, start),
            expression: ExpressionScan::default(),
            shorthand: false,
            callbacks,
        }
    }

    pub fn into_callbacks(self) -> C {
        self.callbacks
    }

    /// Tokenize the input
    pub fn tokenize(&mut self) {
        while self.index < self.input.len() {
            let c = self.input[self.index];

            match self.state {
                State::Text => self.state_text(c),
                State::InTextExpression => self.state_in_text_expression(c),
                State::BeforeTagName => self.state_before_tag_name(c),
                State::InTagName => self.state_in_tag_name(c),
                State::InSelfClosingTag => self.state_in_self_closing_tag(c),
                State::BeforeClosingTagName => self.state_before_closing_tag_name(c),
                State::InClosingTagName => self.state_in_closing_tag_name(c),
                State::AfterClosingTagName => self.state_after_closing_tag_name(c),
                State::BeforeAttrName => self.state_before_attr_name(c),
                State::InAttrName => self.state_in_attr_name(c),
                State::AfterAttrName => self.state_after_attr_name(c),
                State::BeforeAttrValue => self.state_before_attr_value(c),
                State::InAttrValueDq => self.state_in_attr_value_quoted(c, QuoteType::Double),
                State::InAttrValueSq => self.state_in_attr_value_quoted(c, QuoteType::Single),
                State::InAttrValueNq => self.state_in_attr_value_nq(c),
                State::InAttrExpression => self.state_in_attr_expression(c),
                State::BeforeDeclaration => self.state_before_declaration(c),
                State::InDeclaration => self.state_in_declaration(c),
                State::BeforeComment => self.state_before_comment(c),
                State::InComment => self.state_in_comment(c),
                State::InRawText => self.state_in_raw_text(c),
            }

            self.index += 1;
        }

        self.cleanup();
        self.callbacks.on_end();
    }

    fn cleanup(&mut self) {
        let len = self.input.len();
        match self.state {
            State::Text | State::InRawText => {
                if self.section_start < len {
                    self.callbacks.on_text(self.section_start, len);
                }
            }
            State::BeforeTagName => {
                // A lone `<` at the end is text.
                self.callbacks.on_text(self.tag_start, len);
            }
            State::InTextExpression => {
                self.callbacks.on_error(ErrorCode::EofInExpression, len);
                self.callbacks.on_expression(self.section_start, len);
            }
            State::InTagName => {
                self.callbacks.on_open_tag_name(self.section_start, len);
                self.callbacks.on_error(ErrorCode::EofInTag, len);
            }
            State::BeforeClosingTagName | State::InClosingTagName => {
                let (name_start, name_end) = if self.state == State::InClosingTagName {
                    (self.section_start, len)
                } else {
                    (len, len)
                };
                self.callbacks
                    .on_close_tag(self.tag_start, name_start, name_end, len);
                self.callbacks.on_error(ErrorCode::EofInTag, len);
            }
            State::AfterClosingTagName => {
                let (name_start, name_end) = self.close_tag;
                self.callbacks
                    .on_close_tag(self.tag_start, name_start, name_end, len);
                self.callbacks.on_error(ErrorCode::EofInTag, len);
            }
            State::InAttrValueDq | State::InAttrValueSq => {
                self.callbacks.on_error(ErrorCode::EofInAttributeValue, len);
            }
            State::InAttrExpression => {
                self.callbacks.on_error(ErrorCode::EofInExpression, len);
            }
            State::InSelfClosingTag
            | State::BeforeAttrName
            | State::InAttrName
            | State::AfterAttrName
            | State::BeforeAttrValue
            | State::InAttrValueNq => {
                self.callbacks.on_error(ErrorCode::EofInTag, len);
            }
            State::BeforeComment | State::InComment => {
                self.callbacks.on_error(ErrorCode::EofInComment, len);
                self.callbacks.on_comment(self.tag_start, len);
            }
            State::BeforeDeclaration | State::InDeclaration => {
                self.callbacks.on_error(ErrorCode::EofInTag, len);
                self.callbacks.on_doctype(self.tag_start, len);
            }
        }
    }

    // ========== State handlers ==========

    fn state_text(&mut self, c: u8) {
        if c == LT {
            self.emit_text();
            self.tag_start = self.index;
            self.state = State::BeforeTagName;
        } else if c == LEFT_BRACE {
            self.emit_text();
            self.section_start = self.index;
            self.expression = ExpressionScan::open();
            self.state = State::InTextExpression;
        }
    }

    fn emit_text(&mut self) {
        if self.index > self.section_start {
            self.callbacks.on_text(self.section_start, self.index);
        }
    }

    fn state_in_text_expression(&mut self, c: u8) {
        if self.expression.step(c) {
            self.callbacks
                .on_expression(self.section_start, self.index + 1);
            self.section_start = self.index + 1;
            self.state = State::Text;
        }
    }

    fn state_before_tag_name(&mut self, c: u8) {
        if c == EXCLAMATION_MARK {
            self.state = State::BeforeDeclaration;
        } else if is_tag_start_char(c) {
            self.section_start = self.index;
            self.state = State::InTagName;
        } else if c == GT {
            // `<>` fragment
            self.open_tag = (self.index, self.index);
            self.callbacks.on_open_tag_name(self.index, self.index);
            self.finish_open_tag();
        } else if c == SLASH {
            self.state = State::BeforeClosingTagName;
        } else {
            // Not a tag after all; resume text at the `<`.
            self.section_start = self.tag_start;
            self.state = State::Text;
            self.state_text(c);
        }
    }

    fn state_in_tag_name(&mut self, c: u8) {
        if is_end_of_tag_section(c) {
            self.open_tag = (self.section_start, self.index);
            self.callbacks
                .on_open_tag_name(self.section_start, self.index);
            self.section_start = self.index;
            self.state = State::BeforeAttrName;
            self.state_before_attr_name(c);
        }
    }

    fn finish_open_tag(&mut self) {
        self.callbacks.on_open_tag_end(self.index);
        self.section_start = self.index + 1;
        let (start, end) = self.open_tag;
        if RAW_TEXT_ELEMENTS.contains(&self.source[start..end]) {
            self.raw_tag = Some(self.open_tag);
            self.state = State::InRawText;
        } else {
            self.state = State::Text;
        }
    }

    fn state_in_self_closing_tag(&mut self, c: u8) {
        if c == GT {
            self.callbacks.on_self_closing_tag(self.index);
            self.state = State::Text;
            self.section_start = self.index + 1;
        } else if !is_whitespace(c) {
            self.state = State::BeforeAttrName;
            self.state_before_attr_name(c);
        }
    }

    fn state_before_closing_tag_name(&mut self, c: u8) {
        if is_whitespace(c) {
            // Skip
        } else if c == GT {
            // `</>` closes a fragment
            self.callbacks
                .on_close_tag(self.tag_start, self.index, self.index, self.index);
            self.state = State::Text;
            self.section_start = self.index + 1;
        } else {
            self.state = State::InClosingTagName;
            self.section_start = self.index;
        }
    }

    fn state_in_closing_tag_name(&mut self, c: u8) {
        if c == GT {
            self.callbacks
                .on_close_tag(self.tag_start, self.section_start, self.index, self.index);
            self.section_start = self.index + 1;
            self.state = State::Text;
        } else if is_whitespace(c) {
            self.close_tag = (self.section_start, self.index);
            self.state = State::AfterClosingTagName;
        }
    }

    fn state_after_closing_tag_name(&mut self, c: u8) {
        if c == GT {
            let (name_start, name_end) = self.close_tag;
            self.callbacks
                .on_close_tag(self.tag_start, name_start, name_end, self.index);
            self.state = State::Text;
            self.section_start = self.index + 1;
        }
    }

    fn state_before_attr_name(&mut self, c: u8) {
        if c == GT {
            self.finish_open_tag();
        } else if c == SLASH {
            self.state = State::InSelfClosingTag;
        } else if c == LEFT_BRACE {
            self.section_start = self.index;
            self.expression = ExpressionScan::open();
            self.shorthand = true;
            self.state = State::InAttrExpression;
        } else if !is_whitespace(c) {
            self.state = State::InAttrName;
            self.section_start = self.index;
        }
    }

    fn state_in_attr_name(&mut self, c: u8) {
        if c == EQ || is_end_of_tag_section(c) {
            self.callbacks
                .on_attrib_name(self.section_start, self.index);
            self.section_start = self.index;
            self.state = State::AfterAttrName;
            self.state_after_attr_name(c);
        }
    }

    fn state_after_attr_name(&mut self, c: u8) {
        if c == EQ {
            self.state = State::BeforeAttrValue;
        } else if c == SLASH || c == GT || !is_whitespace(c) {
            self.state = State::BeforeAttrName;
            self.state_before_attr_name(c);
        }
    }

    fn state_before_attr_value(&mut self, c: u8) {
        if c == DOUBLE_QUOTE {
            self.state = State::InAttrValueDq;
            self.section_start = self.index + 1;
        } else if c == SINGLE_QUOTE {
            self.state = State::InAttrValueSq;
            self.section_start = self.index + 1;
        } else if c == LEFT_BRACE {
            self.section_start = self.index;
            self.expression = ExpressionScan::open();
            self.shorthand = false;
            self.state = State::InAttrExpression;
        } else if c == GT {
            // `name=>`: treat as a valueless attribute
            self.finish_open_tag();
        } else if !is_whitespace(c) {
            self.section_start = self.index;
            self.state = State::InAttrValueNq;
        }
    }

    fn state_in_attr_value_quoted(&mut self, c: u8, quote: QuoteType) {
        let closing = match quote {
            QuoteType::Double => DOUBLE_QUOTE,
            QuoteType::Single => SINGLE_QUOTE,
        };
        if c == closing {
            self.callbacks.on_attrib_value(
                AttributeValueKind::Quoted(quote),
                self.section_start,
                self.index,
            );
            self.section_start = self.index + 1;
            self.state = State::BeforeAttrName;
        }
    }

    fn state_in_attr_value_nq(&mut self, c: u8) {
        if is_whitespace(c) || c == GT {
            self.callbacks.on_attrib_value(
                AttributeValueKind::Unquoted,
                self.section_start,
                self.index,
            );
            self.section_start = self.index;
            self.state = State::BeforeAttrName;
            self.state_before_attr_name(c);
        }
    }

    fn state_in_attr_expression(&mut self, c: u8) {
        if self.expression.step(c) {
            if self.shorthand {
                self.callbacks
                    .on_attrib_shorthand(self.section_start, self.index + 1);
            } else {
                self.callbacks.on_attrib_value(
                    AttributeValueKind::Expression,
                    self.section_start + 1,
                    self.index,
                );
            }
            self.section_start = self.index + 1;
            self.state = State::BeforeAttrName;
        }
    }

    fn state_before_declaration(&mut self, c: u8) {
        if c == DASH {
            self.state = State::BeforeComment;
        } else {
            self.state = State::InDeclaration;
            self.state_in_declaration(c);
        }
    }

    fn state_in_declaration(&mut self, c: u8) {
        if c == GT {
            self.callbacks.on_doctype(self.tag_start, self.index + 1);
            self.state = State::Text;
            self.section_start = self.index + 1;
        }
    }

    fn state_before_comment(&mut self, c: u8) {
        if c == DASH {
            self.state = State::InComment;
        } else {
            self.state = State::InDeclaration;
            self.state_in_declaration(c);
        }
    }

    fn state_in_comment(&mut self, c: u8) {
        if c == DASH && self.input[self.index..].starts_with(b"-->") {
            self.callbacks.on_comment(self.tag_start, self.index + 3);
            self.index += 2;
            self.state = State::Text;
            self.section_start = self.index + 1;
        }
    }

    fn state_in_raw_text(&mut self, c: u8) {
        if c != LT || !self.at_raw_end_tag() {
            return;
        }
        self.emit_text();
        self.raw_tag = None;
        self.tag_start = self.index;
        self.state = State::BeforeTagName;
    }

    /// Whether `</name` of the current raw-text element starts here.
    fn at_raw_end_tag(&self) -> bool {
        let Some((start, end)) = self.raw_tag else {
            return false;
        };
        let name = &self.input[start..end];
        let rest = &self.input[self.index..];
        if rest.len() < name.len() + 2 || rest[1] != SLASH {
            return false;
        }
        if !rest[2..2 + name.len()].eq_ignore_ascii_case(name) {
            return false;
        }
        rest.get(2 + name.len())
            .map_or(true, |&next| is_end_of_tag_section(next))
    }
}
