use std::ops::Range;
use tracing::{debug, warn};

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::image::Image;
use crate::inline::normalize;
use crate::table::{Table, TableCell, TableRow};
use crate::tokenizer::{decode_entities, end_tag_name, tokenize, Spanned, Tag, Token};

/// Elements without an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Unknown elements that still flow inside a paragraph
const OPAQUE_INLINE: &[&str] = &[
    "a", "span", "sub", "sup", "mark", "small", "abbr", "kbd", "q", "cite", "time",
];

/// Transparent table section wrappers
const TABLE_SECTIONS: &[&str] = &["thead", "tbody", "tfoot"];

/// Open elements allowed before nested content is kept verbatim
pub const MAX_DEPTH: usize = 128;

/// Elements that only make sense inside a list or a table
const CONTEXTUAL: &[&str] = &["li", "tr", "td", "th", "thead", "tbody", "tfoot"];

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

fn is_inline_tag(name: &str) -> bool {
    name == "img" || name == "br" || Mark::from_tag(name).is_some() || OPAQUE_INLINE.contains(&name)
}

/// Output of a permissive parse
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub document: Document,
    /// Recoveries performed while parsing, in source order
    pub errors: Vec<ParseError>,
}

impl Parsed {
    /// Whether the input needed any recovery
    pub fn is_lossless(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse markup permissively, discarding diagnostics
pub fn parse(source: &str) -> Document {
    parse_with_diagnostics(source).document
}

/// Parse markup permissively, keeping every recovery as a diagnostic
pub fn parse_with_diagnostics(source: &str) -> Parsed {
    let mut parser = Parser::new(source);
    let document = parser.parse_document();

    if !parser.errors.is_empty() {
        warn!(recoveries = parser.errors.len(), "Markup accepted with recoveries");
    }

    Parsed {
        document,
        errors: parser.errors,
    }
}

/// Parse markup, failing on the first recovery
pub fn parse_strict(source: &str) -> ParseResult<Document> {
    let parsed = parse_with_diagnostics(source);
    match parsed.errors.into_iter().next() {
        Some(error) => Err(error),
        None => Ok(parsed.document),
    }
}

/// Where an inline run stopped
enum InlineStop {
    /// The expected end tag was consumed
    Closed,
    /// Stopped before a token owned by an enclosing context
    Interrupted,
    Eof,
}

/// Recursive-descent parser over the token stream
struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Spanned<'src>>,
    pos: usize,
    /// Names of the elements currently open, outermost first
    open: Vec<String>,
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
            open: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn parse_document(&mut self) -> Document {
        let blocks = self.parse_blocks(None, &[]);
        debug!(blocks = blocks.len(), "Parsed markup document");
        Document::from_blocks(blocks)
    }

    fn peek(&self) -> Option<Spanned<'src>> {
        self.tokens.get(self.pos).cloned()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn eof_span(&self) -> Range<usize> {
        self.source.len()..self.source.len()
    }

    fn too_deep(&self) -> bool {
        self.open.len() >= MAX_DEPTH
    }

    fn is_open(&self, name: &str) -> bool {
        self.open.iter().any(|open| open == name)
    }

    fn with_open<T>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.open.push(name.to_string());
        let result = f(self);
        self.open.pop();
        result
    }

    fn report(&mut self, error: ParseError) {
        debug!(%error, "Markup recovery");
        self.errors.push(error);
    }

    /// Parse blocks until `close` (consumed), an end tag owned by an
    /// enclosing element, a start tag listed in `stop`, or the end of input.
    fn parse_blocks(&mut self, close: Option<&str>, stop: &[&str]) -> Vec<Block> {
        let mut blocks = Vec::new();
        // List items and cells routinely hold bare text
        let bare_text_expected = matches!(close, Some("li" | "td" | "th"));

        loop {
            let Some(Spanned {
                token,
                span,
                recovered,
            }) = self.peek()
            else {
                if let Some(name) = close {
                    let eof = self.eof_span();
                    self.report(ParseError::unclosed(name, eof));
                }
                break;
            };

            match token {
                Token::EndTag(raw) => {
                    let name = end_tag_name(raw);
                    if Some(name.as_str()) == close {
                        self.advance();
                        break;
                    }
                    if self.is_open(&name) {
                        if let Some(close) = close {
                            self.report(ParseError::unclosed(close, span));
                        }
                        break;
                    }
                    self.report(ParseError::unexpected_end(name, span));
                    self.advance();
                }

                Token::Text(text) if !recovered && text.trim().is_empty() => self.advance(),

                Token::Text(_) => {
                    if !bare_text_expected {
                        self.report(ParseError::ImplicitParagraph { span: span.into() });
                    }
                    blocks.push(self.parse_implicit_paragraph());
                }

                Token::Comment(raw) => {
                    blocks.push(Block::Opaque {
                        raw: raw.to_string(),
                    });
                    self.advance();
                }

                Token::Declaration(_) => self.advance(),

                Token::StartTag(raw) => {
                    let tag = Tag::parse(raw);
                    if stop.contains(&tag.name.as_str()) {
                        break;
                    }
                    if is_inline_tag(&tag.name) {
                        if !bare_text_expected {
                            self.report(ParseError::ImplicitParagraph { span: span.into() });
                        }
                        blocks.push(self.parse_implicit_paragraph());
                        continue;
                    }
                    self.advance();
                    blocks.push(self.parse_block(tag, span));
                }
            }
        }

        blocks
    }

    /// Parse the block whose start tag was just consumed
    fn parse_block(&mut self, tag: Tag, span: Range<usize>) -> Block {
        let Tag {
            name,
            attributes: attrs,
            self_closing,
        } = tag;

        match name.as_str() {
            "ul" | "ol" | "blockquote" | "table" if !self_closing && self.too_deep() => {
                self.report(ParseError::too_deep(name.as_str(), span.clone()));
                Block::Opaque {
                    raw: self.capture_nested(&name, span),
                }
            }
            "p" => {
                let content = self.parse_textblock_content("p", self_closing);
                Block::Paragraph { content, attrs }
            }
            "h1" | "h2" | "h3" => {
                let level = name[1..].parse().unwrap_or(1);
                let content = self.parse_textblock_content(&name, self_closing);
                Block::Heading {
                    level,
                    content,
                    attrs,
                }
            }
            "ul" | "ol" => {
                let items = if self_closing {
                    Vec::new()
                } else {
                    self.with_open(&name, |p| p.parse_list_items(&name))
                };
                if name == "ul" {
                    Block::BulletList { items, attrs }
                } else {
                    Block::OrderedList { items, attrs }
                }
            }
            "blockquote" => {
                let blocks = if self_closing {
                    Vec::new()
                } else {
                    self.with_open("blockquote", |p| p.parse_blocks(Some("blockquote"), &[]))
                };
                Block::Blockquote { blocks, attrs }
            }
            "hr" => Block::HorizontalRule { attrs },
            "table" => {
                let rows = if self_closing {
                    Vec::new()
                } else {
                    self.with_open("table", |p| p.parse_table_rows())
                };
                Block::Table(Table { rows, attrs })
            }
            _ => {
                if CONTEXTUAL.contains(&name.as_str()) {
                    self.report(ParseError::misplaced(name.as_str(), span.clone()));
                }
                Block::Opaque {
                    raw: self.capture_raw(&name, self_closing, span),
                }
            }
        }
    }

    fn parse_textblock_content(&mut self, name: &str, self_closing: bool) -> Vec<Inline> {
        let mut content = Vec::new();
        if !self_closing {
            let stop = self.with_open(name, |p| p.parse_inlines(Some(name), &MarkSet::new(), &mut content));
            if let InlineStop::Interrupted = stop {
                let at = self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span());
                self.report(ParseError::unclosed(name, at));
            }
        }
        normalize(&mut content);
        content
    }

    /// Paragraph synthesized around bare inline content
    fn parse_implicit_paragraph(&mut self) -> Block {
        let mut content = Vec::new();
        self.parse_inlines(None, &MarkSet::new(), &mut content);
        normalize(&mut content);
        Block::paragraph(content)
    }

    /// Parse inline content into `out`.
    ///
    /// With `close == None` the run ends before the first token that does not
    /// belong inside a paragraph.
    fn parse_inlines(&mut self, close: Option<&str>, marks: &MarkSet, out: &mut Vec<Inline>) -> InlineStop {
        loop {
            let Some(Spanned {
                token,
                span,
                recovered,
            }) = self.peek()
            else {
                if let Some(name) = close {
                    let eof = self.eof_span();
                    self.report(ParseError::unclosed(name, eof));
                }
                return InlineStop::Eof;
            };

            match token {
                Token::Text(text) => {
                    if recovered {
                        self.report(ParseError::MalformedTag { span: span.into() });
                    }
                    out.push(Inline::Text {
                        text: decode_entities(text),
                        marks: marks.clone(),
                    });
                    self.advance();
                }

                Token::Comment(raw) => {
                    out.push(Inline::Opaque {
                        raw: raw.to_string(),
                    });
                    self.advance();
                }

                Token::Declaration(_) => self.advance(),

                Token::EndTag(raw) => {
                    let name = end_tag_name(raw);
                    if Some(name.as_str()) == close {
                        self.advance();
                        return InlineStop::Closed;
                    }
                    if close.is_none() || self.is_open(&name) {
                        return InlineStop::Interrupted;
                    }
                    self.report(ParseError::unexpected_end(name, span));
                    self.advance();
                }

                Token::StartTag(raw) => {
                    let tag = Tag::parse(raw);
                    if !is_inline_tag(&tag.name) {
                        return InlineStop::Interrupted;
                    }
                    self.advance();

                    if let Some(mark) = Mark::from_tag(&tag.name) {
                        if tag.self_closing {
                            continue;
                        }
                        if self.too_deep() {
                            self.report(ParseError::too_deep(tag.name.as_str(), span.clone()));
                            out.push(Inline::Opaque {
                                raw: self.capture_nested(&tag.name, span),
                            });
                            continue;
                        }
                        let mut inner = marks.clone();
                        inner.insert(mark);
                        let name = tag.name;
                        let stop = self.with_open(&name, |p| p.parse_inlines(Some(&name), &inner, out));
                        if let InlineStop::Interrupted = stop {
                            // The interrupting token is handled by this level
                            self.report(ParseError::unclosed(name, span));
                        }
                        continue;
                    }

                    match tag.name.as_str() {
                        "img" => out.push(Inline::Image(Image::from_attributes(&tag.attributes))),
                        "br" => out.push(Inline::HardBreak),
                        _ => {
                            let raw = self.capture_raw(&tag.name, tag.self_closing, span);
                            out.push(Inline::Opaque { raw });
                        }
                    }
                }
            }
        }
    }

    fn parse_list_items(&mut self, list: &str) -> Vec<ListItem> {
        let mut items = Vec::new();

        loop {
            let Some(Spanned {
                token,
                span,
                recovered,
            }) = self.peek()
            else {
                let eof = self.eof_span();
                self.report(ParseError::unclosed(list, eof));
                break;
            };

            match token {
                Token::StartTag(raw) if Tag::parse(raw).name == "li" => {
                    let self_closing = Tag::parse(raw).self_closing;
                    self.advance();
                    let blocks = if self_closing {
                        Vec::new()
                    } else {
                        self.with_open("li", |p| p.parse_blocks(Some("li"), &["li"]))
                    };
                    items.push(ListItem { blocks });
                }
                Token::EndTag(raw) => {
                    let name = end_tag_name(raw);
                    if name == list {
                        self.advance();
                        break;
                    }
                    if self.is_open(&name) {
                        self.report(ParseError::unclosed(list, span));
                        break;
                    }
                    self.report(ParseError::unexpected_end(name, span));
                    self.advance();
                }
                Token::Text(text) if !recovered && text.trim().is_empty() => self.advance(),
                _ => {
                    // Content outside <li> becomes an item of its own
                    self.report(ParseError::misplaced(list, span));
                    let before = self.pos;
                    let blocks = self.parse_blocks(None, &["li"]);
                    if !blocks.is_empty() {
                        items.push(ListItem { blocks });
                    }
                    if self.pos == before {
                        self.advance();
                    }
                }
            }
        }

        items
    }

    fn parse_table_rows(&mut self) -> Vec<TableRow> {
        let mut rows = Vec::new();

        loop {
            let Some(Spanned {
                token,
                span,
                recovered,
            }) = self.peek()
            else {
                let eof = self.eof_span();
                self.report(ParseError::unclosed("table", eof));
                self.close_sections();
                break;
            };

            match token {
                Token::StartTag(raw) => {
                    let tag = Tag::parse(raw);
                    self.advance();
                    if TABLE_SECTIONS.contains(&tag.name.as_str()) {
                        if !tag.self_closing {
                            self.open.push(tag.name);
                        }
                    } else if tag.name == "tr" {
                        let cells = if tag.self_closing {
                            Vec::new()
                        } else {
                            self.with_open("tr", |p| p.parse_table_cells())
                        };
                        rows.push(TableRow { cells });
                    } else {
                        // Captions, colgroups and stray elements have no place in the grid
                        self.report(ParseError::dropped(tag.name.as_str(), span.clone()));
                        self.capture_raw(&tag.name, tag.self_closing, span);
                    }
                }
                Token::EndTag(raw) => {
                    let name = end_tag_name(raw);
                    if name == "table" {
                        self.advance();
                        self.close_sections();
                        break;
                    }
                    if TABLE_SECTIONS.contains(&name.as_str()) && self.open.last() == Some(&name) {
                        self.advance();
                        self.open.pop();
                        continue;
                    }
                    if self.is_open(&name) {
                        // The enclosing element owns this end tag
                        self.close_sections();
                        self.report(ParseError::unclosed("table", span));
                        break;
                    }
                    self.report(ParseError::unexpected_end(name, span));
                    self.advance();
                }
                Token::Text(text) if !recovered && text.trim().is_empty() => self.advance(),
                Token::Comment(_) | Token::Declaration(_) | Token::Text(_) => {
                    self.report(ParseError::dropped("#text", span));
                    self.advance();
                }
            }
        }

        rows
    }

    /// Pop table sections left open inside the current table
    fn close_sections(&mut self) {
        while self
            .open
            .last()
            .is_some_and(|last| TABLE_SECTIONS.contains(&last.as_str()))
        {
            self.open.pop();
        }
    }

    fn parse_table_cells(&mut self) -> Vec<TableCell> {
        let mut cells = Vec::new();

        loop {
            let Some(Spanned {
                token,
                span,
                recovered,
            }) = self.peek()
            else {
                let eof = self.eof_span();
                self.report(ParseError::unclosed("tr", eof));
                break;
            };

            match token {
                Token::StartTag(raw) => {
                    let tag = Tag::parse(raw);
                    match tag.name.as_str() {
                        "td" | "th" => {
                            self.advance();
                            let header = tag.name == "th";
                            let blocks = if tag.self_closing {
                                Vec::new()
                            } else {
                                let name = tag.name.clone();
                                self.with_open(&name, |p| p.parse_blocks(Some(&name), &["td", "th", "tr"]))
                            };
                            cells.push(TableCell {
                                header,
                                blocks,
                                attrs: tag.attributes,
                            });
                        }
                        "tr" => {
                            // The next row starts without closing this one
                            self.report(ParseError::unclosed("tr", span));
                            break;
                        }
                        _ => {
                            self.advance();
                            self.report(ParseError::dropped(tag.name.as_str(), span.clone()));
                            self.capture_raw(&tag.name, tag.self_closing, span);
                        }
                    }
                }
                Token::EndTag(raw) => {
                    let name = end_tag_name(raw);
                    if name == "tr" {
                        self.advance();
                        break;
                    }
                    if self.is_open(&name) {
                        self.report(ParseError::unclosed("tr", span));
                        break;
                    }
                    self.report(ParseError::unexpected_end(name, span));
                    self.advance();
                }
                Token::Text(text) if !recovered && text.trim().is_empty() => self.advance(),
                Token::Comment(_) | Token::Declaration(_) | Token::Text(_) => {
                    self.report(ParseError::dropped("#text", span));
                    self.advance();
                }
            }
        }

        cells
    }

    /// Verbatim source of an element whose start tag was just consumed
    fn capture_raw(&mut self, name: &str, self_closing: bool, start: Range<usize>) -> String {
        if self_closing || is_void(name) {
            return self.source[start].to_string();
        }

        match self.find_close(name) {
            Some((index, byte)) => {
                self.pos = index + 1;
                self.source[start.start..byte].to_string()
            }
            None => {
                // No end tag: keep only the start tag and let its content parse normally
                self.report(ParseError::unclosed(name, start.clone()));
                self.source[start].to_string()
            }
        }
    }

    /// Like [`Parser::capture_raw`], but an unclosed element swallows the
    /// rest of the input so its content is never parsed any deeper
    fn capture_nested(&mut self, name: &str, start: Range<usize>) -> String {
        match self.find_close(name) {
            Some((index, byte)) => {
                self.pos = index + 1;
                self.source[start.start..byte].to_string()
            }
            None => {
                self.pos = self.tokens.len();
                self.source[start.start..].to_string()
            }
        }
    }

    /// Token index and end byte of the end tag matching an element opened
    /// just before `self.pos`
    fn find_close(&self, name: &str) -> Option<(usize, usize)> {
        let mut depth = 1usize;
        for (index, spanned) in self.tokens.iter().enumerate().skip(self.pos) {
            match spanned.token {
                Token::StartTag(raw) => {
                    let tag = Tag::parse(raw);
                    if tag.name == name && !tag.self_closing {
                        depth += 1;
                    }
                }
                Token::EndTag(raw) if end_tag_name(raw) == name => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((index, spanned.span.end));
                    }
                }
                _ => {}
            }
        }
        None
    }
}
