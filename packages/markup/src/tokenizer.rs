use logos::Logos;
use std::fmt;
use std::ops::Range;

use crate::ast::Attributes;

/// Lexical units of the markup
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum Token<'src> {
    #[regex(r"<!--([^-]|-[^-])*-->", |lex| lex.slice())]
    Comment(&'src str),

    // Doctype and processing instructions carry no content
    #[regex(r"<[!?][a-zA-Z][^>]*>", |lex| lex.slice())]
    Declaration(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[ \t\r\n]*>", |lex| lex.slice())]
    EndTag(&'src str),

    #[regex(r#"<[a-zA-Z][a-zA-Z0-9-]*([^>"']|"[^"]*"|'[^']*')*>"#, |lex| lex.slice())]
    StartTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Comment(_) => write!(f, "comment"),
            Token::Declaration(s) => write!(f, "declaration {}", s),
            Token::EndTag(s) => write!(f, "end tag {}", s),
            Token::StartTag(s) => write!(f, "start tag {}", s),
            Token::Text(_) => write!(f, "text"),
        }
    }
}

/// Token with its byte range.
///
/// `recovered` marks input the lexer could not match (for example a stray
/// `<`); it is carried as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<'src> {
    pub token: Token<'src>,
    pub span: Range<usize>,
    pub recovered: bool,
}

/// Tokenize markup. Never fails: unmatched input becomes text.
pub fn tokenize(source: &str) -> Vec<Spanned<'_>> {
    let mut tokens: Vec<Spanned<'_>> = Vec::new();

    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push(Spanned {
                token,
                span,
                recovered: false,
            }),
            Err(()) => {
                // Glue consecutive unmatched input onto one recovered text token
                if let Some(last) = tokens.last_mut() {
                    if last.recovered && last.span.end == span.start {
                        last.span.end = span.end;
                        last.token = Token::Text(&source[last.span.clone()]);
                        continue;
                    }
                }
                tokens.push(Spanned {
                    token: Token::Text(&source[span.clone()]),
                    span,
                    recovered: true,
                });
            }
        }
    }

    tokens
}

/// Decomposed start tag
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub attributes: Attributes,
    pub self_closing: bool,
}

impl Tag {
    /// Parse the text of a start tag such as `<img src="a.png" />`
    pub fn parse(raw: &str) -> Self {
        let inner = raw
            .trim_start_matches('<')
            .strip_suffix('>')
            .unwrap_or(raw);
        let (inner, self_closing) = match inner.strip_suffix('/') {
            Some(stripped) => (stripped, true),
            None => (inner, false),
        };

        let name_end = inner
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(inner.len());
        let name = inner[..name_end].to_ascii_lowercase();

        Self {
            name,
            attributes: parse_attributes(&inner[name_end..]),
            self_closing,
        }
    }
}

/// Name of an end tag such as `</p >`
pub fn end_tag_name(raw: &str) -> String {
    raw.trim_start_matches("</")
        .trim_end_matches('>')
        .trim()
        .to_ascii_lowercase()
}

fn parse_attributes(mut rest: &str) -> Attributes {
    let mut attributes = Attributes::new();

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }

        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (value, remainder) = match after_eq.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    match body.find(quote) {
                        Some(close) => (&body[..close], &body[close + 1..]),
                        None => (body, ""),
                    }
                }
                _ => {
                    let end = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    (&after_eq[..end], &after_eq[end..])
                }
            };
            rest = remainder;
            decode_entities(value)
        } else {
            String::new()
        };

        if !name.is_empty() {
            attributes.set_if_absent(name, value);
        }
    }

    attributes
}

/// Decode the character references the printer emits plus numeric ones.
/// Unknown references are left untouched.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((ch, semi))
        });

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
