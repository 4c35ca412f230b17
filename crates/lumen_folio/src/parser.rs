//! Line-oriented parser for frontmatter data.
//!
//! Block structure is decided per line from its indentation; single-line
//! values (scalars, flow collections) are parsed with a byte cursor.
//! Errors are collected and parsing continues with the next line.

use lumen_carton::{FxHashSet, SourceRange};

use crate::ast::{Mapping, Node, Pair, Scalar, ScalarStyle, ScalarValue, Sequence, YamlDocument};
use crate::encode::encode_key;
use crate::error::{ErrorCode, YamlError};

/// Parse a frontmatter data block.
pub fn parse(text: &str) -> YamlDocument {
    let document = Parser::new(text).parse_document();
    if !document.errors.is_empty() {
        tracing::debug!(errors = document.errors.len(), "frontmatter data has errors");
    }
    document
}

#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    /// Width of the leading whitespace.
    indent: usize,
    content_start: usize,
    /// Trailing whitespace trimmed.
    content_end: usize,
    /// Before the line break.
    raw_end: usize,
}

impl Line {
    #[inline]
    fn is_empty(&self) -> bool {
        self.content_start == self.content_end
    }
}

/// Position inside a flow collection.
struct FlowCursor {
    pos: usize,
    end: usize,
}

#[inline]
fn is_space(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

#[inline]
fn is_flow_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n')
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Chomping {
    Clip,
    Strip,
    Keep,
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    lines: Vec<Line>,
    pos: usize,
    errors: Vec<YamlError>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        let mut parser = Self {
            text,
            bytes: text.as_bytes(),
            lines: Vec::new(),
            pos: 0,
            errors: Vec::new(),
        };
        parser.split_lines();
        parser
    }

    fn split_lines(&mut self) {
        let bytes = self.bytes;
        let mut start = 0;
        while start <= bytes.len() {
            let end = bytes[start..]
                .iter()
                .position(|&c| c == b'\n')
                .map_or(bytes.len(), |i| start + i);
            let raw_end = if end > start && bytes[end - 1] == b'\r' {
                end - 1
            } else {
                end
            };

            let mut content_start = start;
            let mut tab = None;
            while content_start < raw_end && is_space(bytes[content_start]) {
                if bytes[content_start] == b'\t' && tab.is_none() {
                    tab = Some(content_start);
                }
                content_start += 1;
            }
            let mut content_end = raw_end;
            while content_end > content_start && is_space(bytes[content_end - 1]) {
                content_end -= 1;
            }

            let line = Line {
                start,
                indent: content_start - start,
                content_start,
                content_end,
                raw_end,
            };
            if let Some(tab) = tab {
                if !self.is_blank(&line) {
                    self.error(ErrorCode::TabIndentation, tab, tab + 1);
                }
            }
            self.lines.push(line);
            start = end + 1;
        }
    }

    fn error(&mut self, code: ErrorCode, start: usize, end: usize) {
        self.errors.push(YamlError::new(code, range(start, end)));
    }

    /// Empty or comment-only.
    #[inline]
    fn is_blank(&self, line: &Line) -> bool {
        line.is_empty() || self.bytes[line.content_start] == b'#'
    }

    fn skip_blank(&mut self) {
        while self.pos < self.lines.len() && self.is_blank(&self.lines[self.pos]) {
            self.pos += 1;
        }
    }

    fn next_content_line(&self) -> Option<usize> {
        (self.pos..self.lines.len()).find(|&i| !self.is_blank(&self.lines[i]))
    }

    fn skip_spaces(&self, mut i: usize, end: usize) -> usize {
        while i < end && is_space(self.bytes[i]) {
            i += 1;
        }
        i
    }

    fn is_sequence_entry(&self, line: &Line) -> bool {
        let (start, end) = (line.content_start, line.content_end);
        start < end
            && self.bytes[start] == b'-'
            && (start + 1 == end || is_space(self.bytes[start + 1]))
    }

    /// Nothing but an optional comment from `start` on.
    #[inline]
    fn is_empty_value(&self, start: usize, end: usize) -> bool {
        start >= end || self.bytes[start] == b'#'
    }

    fn parse_document(mut self) -> YamlDocument {
        self.skip_blank();
        let root = match self.lines.get(self.pos) {
            Some(line) => {
                let indent = line.indent;
                Some(self.parse_block(indent))
            }
            None => None,
        };

        loop {
            self.skip_blank();
            let Some(&line) = self.lines.get(self.pos) else {
                break;
            };
            self.error(ErrorCode::BadIndentation, line.content_start, line.content_end);
            self.pos += 1;
        }

        YamlDocument {
            root,
            errors: self.errors,
        }
    }

    /// Parse the block starting at the current line, which is non-blank and
    /// indented by `indent`.
    fn parse_block(&mut self, indent: usize) -> Node {
        let line = self.lines[self.pos];
        if self.is_sequence_entry(&line) {
            return Node::Sequence(self.parse_sequence(indent));
        }
        if self
            .find_key(line.content_start, line.content_end)
            .is_some()
        {
            return Node::Mapping(self.parse_mapping(indent));
        }
        self.pos += 1;
        self.parse_inline(line.content_start, line.content_end, indent.saturating_sub(1))
    }

    fn parse_mapping(&mut self, indent: usize) -> Mapping {
        let start = self.lines[self.pos].content_start;
        let mut end = start;
        let mut pairs = Vec::new();
        let mut seen = FxHashSet::default();

        loop {
            self.skip_blank();
            let Some(&line) = self.lines.get(self.pos) else {
                break;
            };
            if line.indent < indent {
                break;
            }
            if line.indent > indent || self.is_sequence_entry(&line) {
                self.error(ErrorCode::BadIndentation, line.content_start, line.content_end);
                self.pos += 1;
                continue;
            }
            let Some((key_end, colon_end)) = self.find_key(line.content_start, line.content_end)
            else {
                self.error(
                    ErrorCode::MissingValueSeparator,
                    line.content_start,
                    line.content_end,
                );
                self.pos += 1;
                continue;
            };
            self.pos += 1;

            let key = self.parse_key(line.content_start, key_end);
            let value_start = self.skip_spaces(colon_end, line.content_end);
            let value = if self.is_empty_value(value_start, line.content_end) {
                self.parse_nested(indent, colon_end, true)
            } else {
                self.parse_inline(value_start, line.content_end, indent)
            };

            if !seen.insert(encode_key(&key)) {
                self.errors
                    .push(YamlError::new(ErrorCode::DuplicateKey, key.span));
            }
            end = end.max(key.span.end as usize).max(value.span().end as usize);
            pairs.push(Pair { key, value });
        }

        Mapping {
            pairs,
            span: range(start, end),
            flow: false,
        }
    }

    fn parse_sequence(&mut self, indent: usize) -> Sequence {
        let start = self.lines[self.pos].content_start;
        let mut end = start;
        let mut items = Vec::new();

        loop {
            self.skip_blank();
            let Some(&line) = self.lines.get(self.pos) else {
                break;
            };
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                self.error(ErrorCode::BadIndentation, line.content_start, line.content_end);
                self.pos += 1;
                continue;
            }
            if !self.is_sequence_entry(&line) {
                break;
            }

            let dash = line.content_start;
            let rest = self.skip_spaces(dash + 1, line.content_end);
            let item = if self.is_empty_value(rest, line.content_end) {
                self.pos += 1;
                self.parse_nested(indent, dash + 1, false)
            } else {
                // Re-read the rest of the line as if it started a block at
                // its own column, which makes `- key: value` a mapping.
                let item_indent = rest - line.start;
                self.lines[self.pos] = Line {
                    indent: item_indent,
                    content_start: rest,
                    ..line
                };
                self.parse_block(item_indent)
            };

            end = end.max(dash + 1).max(item.span().end as usize);
            items.push(item);
        }

        Sequence {
            items,
            span: range(start, end),
            flow: false,
        }
    }

    /// Value on the lines after `key:` or `-`.
    fn parse_nested(&mut self, parent_indent: usize, anchor: usize, allow_sequence: bool) -> Node {
        if let Some(i) = self.next_content_line() {
            let line = self.lines[i];
            let nested = line.indent > parent_indent
                || (allow_sequence && line.indent == parent_indent && self.is_sequence_entry(&line));
            if nested {
                self.pos = i;
                return self.parse_block(line.indent);
            }
        }
        Node::Scalar(Scalar::empty(anchor as u32))
    }

    /// `(key end, offset after the colon)` when the line holds `key: ...`.
    fn find_key(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let bytes = self.bytes;
        let is_separator =
            |i: usize| bytes[i] == b':' && (i + 1 >= end || is_space(bytes[i + 1]));

        if start >= end {
            return None;
        }
        match bytes[start] {
            b'"' | b'\'' => {
                let close = self.find_closing_quote(start, end)?;
                let colon = self.skip_spaces(close + 1, end);
                (colon < end && is_separator(colon)).then_some((close + 1, colon + 1))
            }
            b'[' | b'{' | b'#' => None,
            _ => {
                for i in start..end {
                    if bytes[i] == b'#' && i > start && is_space(bytes[i - 1]) {
                        return None;
                    }
                    if is_separator(i) {
                        let mut key_end = i;
                        while key_end > start && is_space(bytes[key_end - 1]) {
                            key_end -= 1;
                        }
                        return Some((key_end, i + 1));
                    }
                }
                None
            }
        }
    }

    fn find_closing_quote(&self, start: usize, end: usize) -> Option<usize> {
        let bytes = self.bytes;
        let quote = bytes[start];
        let mut i = start + 1;
        while i < end {
            let c = bytes[i];
            if quote == b'"' && c == b'\\' {
                i += 2;
                continue;
            }
            if c == quote {
                if quote == b'\'' && i + 1 < end && bytes[i + 1] == b'\'' {
                    i += 2;
                    continue;
                }
                return Some(i);
            }
            i += 1;
        }
        None
    }

    fn parse_key(&mut self, start: usize, end: usize) -> Scalar {
        match self.bytes.get(start) {
            Some(b'"' | b'\'') => self.parse_quoted(start, end).0,
            _ => self.plain_scalar(start, end),
        }
    }

    /// Value that starts on the current line. The line itself has already
    /// been consumed; block scalars and continuations consume more.
    fn parse_inline(&mut self, start: usize, end: usize, parent_indent: usize) -> Node {
        match self.bytes[start] {
            b'"' | b'\'' => {
                let (scalar, after) = self.parse_quoted(start, end);
                self.expect_line_end(after, end);
                Node::Scalar(scalar)
            }
            b'[' | b'{' => self.parse_flow_value(start, end, parent_indent),
            b'|' | b'>' => Node::Scalar(self.parse_block_scalar(start, end, parent_indent)),
            _ => Node::Scalar(self.parse_plain(start, end, parent_indent)),
        }
    }

    fn expect_line_end(&mut self, after: usize, end: usize) {
        let i = self.skip_spaces(after, end);
        if i < end && self.bytes[i] != b'#' {
            self.error(ErrorCode::UnexpectedContent, i, end);
        }
    }

    /// End of a plain scalar on one line: before a ` #` comment, trailing
    /// whitespace trimmed.
    fn plain_end(&self, start: usize, end: usize) -> usize {
        let bytes = self.bytes;
        let mut stop = end;
        for i in start..end {
            if bytes[i] == b'#' && i > start && is_space(bytes[i - 1]) {
                stop = i;
                break;
            }
        }
        while stop > start && is_space(bytes[stop - 1]) {
            stop -= 1;
        }
        stop
    }

    fn plain_scalar(&self, start: usize, end: usize) -> Scalar {
        let source = &self.text[start..end];
        Scalar {
            value: resolve_plain(source),
            style: ScalarStyle::Plain,
            span: range(start, end),
            source: source.to_string(),
        }
    }

    /// Plain scalar, folding more-indented continuation lines into it.
    fn parse_plain(&mut self, start: usize, end: usize, parent_indent: usize) -> Scalar {
        let text = self.text;
        let first_end = self.plain_end(start, end);
        let mut scalar_end = first_end;
        let mut folded: Option<String> = None;

        loop {
            let mut i = self.pos;
            let mut blank_lines = 0;
            while i < self.lines.len() && self.lines[i].is_empty() {
                i += 1;
                blank_lines += 1;
            }
            let Some(&line) = self.lines.get(i) else {
                break;
            };
            if line.indent <= parent_indent
                || self.bytes[line.content_start] == b'#'
                || self.find_key(line.content_start, line.content_end).is_some()
            {
                break;
            }

            let piece_end = self.plain_end(line.content_start, line.content_end);
            let value = folded.get_or_insert_with(|| text[start..first_end].to_string());
            if blank_lines == 0 {
                value.push(' ');
            } else {
                value.extend(std::iter::repeat('\n').take(blank_lines));
            }
            value.push_str(&text[line.content_start..piece_end]);
            scalar_end = piece_end;
            self.pos = i + 1;
        }

        let source = &text[start..scalar_end];
        let value = match folded {
            Some(folded) => ScalarValue::Str(folded),
            None => resolve_plain(source),
        };
        Scalar {
            value,
            style: ScalarStyle::Plain,
            span: range(start, scalar_end),
            source: source.to_string(),
        }
    }

    /// Quoted scalar starting at `start`; returns it with the offset after
    /// its closing quote.
    fn parse_quoted(&mut self, start: usize, end: usize) -> (Scalar, usize) {
        let text = self.text;
        let double = self.bytes[start] == b'"';
        let (inner_end, token_end) = match self.find_closing_quote(start, end) {
            Some(close) => (close, close + 1),
            None => {
                self.error(ErrorCode::UnterminatedString, start, end);
                (end, end)
            }
        };

        let inner = &text[start + 1..inner_end.max(start + 1)];
        let (value, style) = if double {
            (unescape_double(inner), ScalarStyle::DoubleQuoted)
        } else {
            (inner.replace("''", "'"), ScalarStyle::SingleQuoted)
        };

        let scalar = Scalar {
            value: ScalarValue::Str(value),
            style,
            span: range(start, token_end),
            source: text[start..token_end].to_string(),
        };
        (scalar, token_end)
    }

    /// `|` or `>` block scalar whose header starts at `start`.
    fn parse_block_scalar(&mut self, start: usize, end: usize, parent_indent: usize) -> Scalar {
        let text = self.text;
        let header_end = self.plain_end(start, end);
        let header = &text[start..header_end];
        let folded_style = header.starts_with('>');
        let chomping = if header.contains('-') {
            Chomping::Strip
        } else if header.contains('+') {
            Chomping::Keep
        } else {
            Chomping::Clip
        };

        let mut content_indent = None;
        let mut pieces: Vec<&str> = Vec::new();
        let mut pending_blank = 0;
        let mut last_end = header_end;

        while let Some(&line) = self.lines.get(self.pos) {
            if line.is_empty() {
                pending_blank += 1;
                self.pos += 1;
                continue;
            }
            if line.indent <= parent_indent {
                break;
            }
            let indent = *content_indent.get_or_insert(line.indent);
            if line.indent < indent {
                break;
            }
            pieces.extend(std::iter::repeat("").take(pending_blank));
            pending_blank = 0;
            pieces.push(&text[line.start + indent..line.raw_end]);
            last_end = line.raw_end;
            self.pos += 1;
        }

        let mut value = String::new();
        if folded_style {
            let mut previous_text = false;
            for piece in &pieces {
                if piece.is_empty() {
                    value.push('\n');
                    previous_text = false;
                } else {
                    if previous_text {
                        value.push(' ');
                    }
                    value.push_str(piece);
                    previous_text = true;
                }
            }
            if !pieces.is_empty() {
                value.push('\n');
            }
        } else {
            for piece in &pieces {
                value.push_str(piece);
                value.push('\n');
            }
        }

        match chomping {
            Chomping::Strip => value.truncate(value.trim_end_matches('\n').len()),
            Chomping::Clip => {
                value.truncate(value.trim_end_matches('\n').len());
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Chomping::Keep => value.extend(std::iter::repeat('\n').take(pending_blank)),
        }

        Scalar {
            value: ScalarValue::Str(value),
            style: if folded_style {
                ScalarStyle::Folded
            } else {
                ScalarStyle::Literal
            },
            span: range(start, last_end),
            source: text[start..last_end].to_string(),
        }
    }

    // ========== Flow collections ==========

    fn parse_flow_value(&mut self, start: usize, end: usize, parent_indent: usize) -> Node {
        let flow_end = self.flow_extent(start, end, parent_indent).unwrap_or(end);
        let mut cursor = FlowCursor {
            pos: start,
            end: flow_end,
        };
        let node = self.parse_flow_node(&mut cursor);

        let mut line_end = end;
        while let Some(line) = self.lines.get(self.pos) {
            if line.start >= flow_end {
                break;
            }
            line_end = line.content_end;
            self.pos += 1;
        }
        self.expect_line_end(cursor.pos, line_end);
        node
    }

    /// Offset after the bracket that closes the collection opened at
    /// `start`, following it onto more-indented lines.
    fn flow_extent(&self, start: usize, end: usize, parent_indent: usize) -> Option<usize> {
        let mut region_end = end;
        for line in &self.lines[self.pos..] {
            if !self.is_blank(line) && line.indent <= parent_indent {
                // A closing bracket may sit back at the parent's column.
                if matches!(self.bytes[line.content_start], b']' | b'}') {
                    region_end = line.raw_end;
                }
                break;
            }
            region_end = line.raw_end;
        }

        let bytes = self.bytes;
        let mut depth = 0usize;
        let mut quote = None;
        let mut i = start;
        while i < region_end {
            let c = bytes[i];
            match quote {
                Some(q) => {
                    if q == b'"' && c == b'\\' {
                        i += 1;
                    } else if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    b'"' | b'\'' => quote = Some(c),
                    b'[' | b'{' => depth += 1,
                    b']' | b'}' => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            return Some(i + 1);
                        }
                    }
                    b'#' if i > start && is_flow_space(bytes[i - 1]) => {
                        while i < region_end && bytes[i] != b'\n' {
                            i += 1;
                        }
                    }
                    _ => {}
                },
            }
            i += 1;
        }
        None
    }

    fn skip_flow_space(&self, cursor: &mut FlowCursor) {
        let bytes = self.bytes;
        while cursor.pos < cursor.end {
            let c = bytes[cursor.pos];
            if is_flow_space(c) {
                cursor.pos += 1;
            } else if c == b'#' && cursor.pos > 0 && is_flow_space(bytes[cursor.pos - 1]) {
                while cursor.pos < cursor.end && bytes[cursor.pos] != b'\n' {
                    cursor.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn parse_flow_node(&mut self, cursor: &mut FlowCursor) -> Node {
        self.skip_flow_space(cursor);
        if cursor.pos >= cursor.end {
            return Node::Scalar(Scalar::empty(cursor.pos as u32));
        }
        match self.bytes[cursor.pos] {
            b'[' => Node::Sequence(self.parse_flow_sequence(cursor)),
            b'{' => Node::Mapping(self.parse_flow_mapping(cursor)),
            b'"' | b'\'' => Node::Scalar(self.parse_flow_quoted(cursor)),
            _ => Node::Scalar(self.parse_flow_plain(cursor)),
        }
    }

    fn parse_flow_quoted(&mut self, cursor: &mut FlowCursor) -> Scalar {
        let (scalar, after) = self.parse_quoted(cursor.pos, cursor.end);
        cursor.pos = after;
        scalar
    }

    fn parse_flow_plain(&mut self, cursor: &mut FlowCursor) -> Scalar {
        let bytes = self.bytes;
        let start = cursor.pos;
        while cursor.pos < cursor.end {
            let c = bytes[cursor.pos];
            if matches!(c, b',' | b'[' | b']' | b'{' | b'}' | b'\n') {
                break;
            }
            if c == b':'
                && (cursor.pos + 1 >= cursor.end
                    || matches!(bytes[cursor.pos + 1], b' ' | b'\t' | b'\r' | b'\n' | b',' | b']' | b'}'))
            {
                break;
            }
            if c == b'#' && cursor.pos > start && is_space(bytes[cursor.pos - 1]) {
                break;
            }
            cursor.pos += 1;
        }
        let mut end = cursor.pos;
        while end > start && is_flow_space(bytes[end - 1]) {
            end -= 1;
        }
        self.plain_scalar(start, end)
    }

    /// After an entry: consume a `,`, accept the closer, flag anything else.
    fn finish_flow_entry(&mut self, cursor: &mut FlowCursor, closer: u8) {
        self.skip_flow_space(cursor);
        if cursor.pos >= cursor.end {
            return;
        }
        let c = self.bytes[cursor.pos];
        if c == b',' {
            cursor.pos += 1;
        } else if c != closer {
            self.error(ErrorCode::UnexpectedContent, cursor.pos, cursor.pos + 1);
            cursor.pos += 1;
        }
    }

    fn parse_flow_sequence(&mut self, cursor: &mut FlowCursor) -> Sequence {
        let open = cursor.pos;
        cursor.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_flow_space(cursor);
            if cursor.pos >= cursor.end {
                self.error(ErrorCode::UnterminatedFlow, open, cursor.end);
                break;
            }
            match self.bytes[cursor.pos] {
                b']' => {
                    cursor.pos += 1;
                    return Sequence {
                        items,
                        span: range(open, cursor.pos),
                        flow: true,
                    };
                }
                b',' => {
                    cursor.pos += 1;
                    continue;
                }
                _ => {}
            }

            let before = cursor.pos;
            items.push(self.parse_flow_node(cursor));
            self.finish_flow_entry(cursor, b']');
            if cursor.pos == before {
                cursor.pos += 1;
            }
        }

        Sequence {
            items,
            span: range(open, cursor.end),
            flow: true,
        }
    }

    fn parse_flow_mapping(&mut self, cursor: &mut FlowCursor) -> Mapping {
        let open = cursor.pos;
        cursor.pos += 1;
        let mut pairs = Vec::new();
        let mut seen = FxHashSet::default();

        loop {
            self.skip_flow_space(cursor);
            if cursor.pos >= cursor.end {
                self.error(ErrorCode::UnterminatedFlow, open, cursor.end);
                break;
            }
            match self.bytes[cursor.pos] {
                b'}' => {
                    cursor.pos += 1;
                    return Mapping {
                        pairs,
                        span: range(open, cursor.pos),
                        flow: true,
                    };
                }
                b',' => {
                    cursor.pos += 1;
                    continue;
                }
                _ => {}
            }

            let before = cursor.pos;
            let key = match self.bytes[cursor.pos] {
                b'"' | b'\'' => self.parse_flow_quoted(cursor),
                _ => self.parse_flow_plain(cursor),
            };
            self.skip_flow_space(cursor);
            let value = if cursor.pos < cursor.end && self.bytes[cursor.pos] == b':' {
                cursor.pos += 1;
                self.parse_flow_node(cursor)
            } else {
                Node::Scalar(Scalar::empty(cursor.pos as u32))
            };

            if !seen.insert(encode_key(&key)) {
                self.errors
                    .push(YamlError::new(ErrorCode::DuplicateKey, key.span));
            }
            pairs.push(Pair { key, value });
            self.finish_flow_entry(cursor, b'}');
            if cursor.pos == before {
                cursor.pos += 1;
            }
        }

        Mapping {
            pairs,
            span: range(open, cursor.end),
            flow: true,
        }
    }
}

#[inline]
fn range(start: usize, end: usize) -> SourceRange {
    SourceRange::new(start as u32, end as u32)
}

/// Resolve a plain scalar under the core schema, plus dates.
pub fn resolve_plain(source: &str) -> ScalarValue {
    match source {
        "" | "~" | "null" | "Null" | "NULL" => return ScalarValue::Null,
        "true" | "True" | "TRUE" => return ScalarValue::Bool(true),
        "false" | "False" | "FALSE" => return ScalarValue::Bool(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            return ScalarValue::Float(f64::INFINITY)
        }
        "-.inf" | "-.Inf" | "-.INF" => return ScalarValue::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => return ScalarValue::Float(f64::NAN),
        _ => {}
    }

    if let Some(hex) = source.strip_prefix("0x") {
        if let Ok(value) = i64::from_str_radix(hex, 16) {
            return ScalarValue::Int(value);
        }
    }
    if let Some(octal) = source.strip_prefix("0o") {
        if let Ok(value) = i64::from_str_radix(octal, 8) {
            return ScalarValue::Int(value);
        }
    }

    let digits = source.strip_prefix(['-', '+']).unwrap_or(source);
    if !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_digit()) {
        return match source.parse::<i64>() {
            Ok(value) => ScalarValue::Int(value),
            Err(_) => source
                .parse::<f64>()
                .map_or_else(|_| ScalarValue::Str(source.to_string()), ScalarValue::Float),
        };
    }
    if is_float(digits) {
        if let Ok(value) = source.parse::<f64>() {
            return ScalarValue::Float(value);
        }
    }
    if is_timestamp(source) {
        return ScalarValue::Date(source.to_string());
    }
    ScalarValue::Str(source.to_string())
}

/// `(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?`, sign already removed.
fn is_float(s: &str) -> bool {
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (mantissa, None),
    };
    let all_digits = |part: &str| part.bytes().all(|c| c.is_ascii_digit());
    let mantissa_ok = match frac_part {
        Some(frac) => {
            all_digits(int_part) && all_digits(frac) && !(int_part.is_empty() && frac.is_empty())
        }
        None => !int_part.is_empty() && all_digits(int_part),
    };
    let exponent_ok = exponent.map_or(true, |exp| {
        let exp = exp.strip_prefix(['-', '+']).unwrap_or(exp);
        !exp.is_empty() && all_digits(exp)
    });
    mantissa_ok && exponent_ok
}

/// `YYYY-MM-DD`, optionally followed by `T`/`t`/space and a time.
fn is_timestamp(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() < 10 {
        return false;
    }
    let date_ok = bytes[..10].iter().enumerate().all(|(i, &c)| match i {
        4 | 7 => c == b'-',
        _ => c.is_ascii_digit(),
    });
    if !date_ok {
        return false;
    }
    match bytes.get(10) {
        None => true,
        Some(b'T' | b't' | b' ') => {
            let time = &s[11..];
            time.len() >= 5
                && time.as_bytes()[0].is_ascii_digit()
                && time.contains(':')
                && time
                    .bytes()
                    .all(|c| c.is_ascii_digit() || matches!(c, b':' | b'.' | b'+' | b'-' | b'Z' | b'z' | b' '))
        }
        Some(_) => false,
    }
}

fn unescape_double(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            out.push('\\');
            break;
        };
        let hex_len = match escape {
            'x' => 2,
            'u' => 4,
            'U' => 8,
            _ => 0,
        };
        if hex_len > 0 {
            let hex: String = chars.by_ref().take(hex_len).collect();
            match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                Some(decoded) => out.push(decoded),
                None => {
                    out.push('\\');
                    out.push(escape);
                    out.push_str(&hex);
                }
            }
            continue;
        }
        out.push(match escape {
            'n' => '\n',
            't' | '\t' => '\t',
            'r' => '\r',
            '0' => '\0',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            'a' => '\u{7}',
            'e' => '\u{1b}',
            'N' => '\u{85}',
            '_' => '\u{a0}',
            'L' => '\u{2028}',
            'P' => '\u{2029}',
            other => other,
        });
    }
    out
}
