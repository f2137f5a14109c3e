//! Minimal render tree.
//!
//! Built from the markup tokens so the pass can see wrappers and containers
//! the document model treats as opaque. Untouched elements print back their
//! original text; only elements whose attributes changed are re-emitted.

use folio_markup::tokenizer::{end_tag_name, tokenize, Tag, Token};
use folio_markup::{Attributes, InlineStyle};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Open elements kept as tree nodes; deeper start tags stay raw
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Raw text, entities undecoded
    Text(String),
    /// Comments, declarations and stray end tags, verbatim
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    attributes: Attributes,
    pub children: Vec<Node>,
    raw_start: String,
    raw_end: Option<String>,
    dirty: bool,
}

impl Element {
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if self.attributes.get(name) != Some(value.as_str()) {
            self.attributes.set(name, value);
            self.dirty = true;
        }
    }

    pub fn has_class(&self, token: &str) -> bool {
        self.attr("class")
            .is_some_and(|class| class.split_whitespace().any(|t| t == token))
    }

    pub fn style(&self) -> InlineStyle {
        InlineStyle::parse(self.attr("style").unwrap_or_default())
    }

    pub fn set_style(&mut self, style: &InlineStyle) {
        self.set_attr("style", style.to_string());
    }

    /// Whether printing re-emits the start tag
    pub fn is_modified(&self) -> bool {
        self.dirty
    }
}

/// Build a forest from markup. Never fails: unmatched end tags are kept
/// verbatim and unclosed elements end at the end of input. Elements nested
/// deeper than [`MAX_DEPTH`] keep their tags as raw text and their content
/// flattened into the deepest element.
pub fn parse_fragment(source: &str) -> Vec<Node> {
    let mut stack: Vec<Element> = Vec::new();
    let mut roots: Vec<Node> = Vec::new();
    // Names of elements opened past the depth limit
    let mut flattened: Vec<String> = Vec::new();

    fn push(stack: &mut [Element], roots: &mut Vec<Node>, node: Node) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }

    for spanned in tokenize(source) {
        match spanned.token {
            Token::Text(text) => push(&mut stack, &mut roots, Node::Text(text.to_string())),
            Token::Comment(raw) | Token::Declaration(raw) => push(&mut stack, &mut roots, Node::Raw(raw.to_string())),
            Token::StartTag(raw) => {
                let tag = Tag::parse(raw);
                let element = Element {
                    name: tag.name,
                    attributes: tag.attributes,
                    children: Vec::new(),
                    raw_start: raw.to_string(),
                    raw_end: None,
                    dirty: false,
                };
                if tag.self_closing || VOID_ELEMENTS.contains(&element.name.as_str()) {
                    push(&mut stack, &mut roots, Node::Element(element));
                } else if stack.len() >= MAX_DEPTH {
                    flattened.push(element.name);
                    push(&mut stack, &mut roots, Node::Raw(raw.to_string()));
                } else {
                    stack.push(element);
                }
            }
            Token::EndTag(raw) => {
                let name = end_tag_name(raw);
                if let Some(depth) = flattened.iter().rposition(|open| *open == name) {
                    flattened.truncate(depth);
                    push(&mut stack, &mut roots, Node::Raw(raw.to_string()));
                    continue;
                }
                let Some(depth) = stack.iter().rposition(|open| open.name == name) else {
                    push(&mut stack, &mut roots, Node::Raw(raw.to_string()));
                    continue;
                };
                flattened.clear();
                // Implicitly close everything opened inside the matched element
                while stack.len() > depth + 1 {
                    if let Some(inner) = stack.pop() {
                        push(&mut stack, &mut roots, Node::Element(inner));
                    }
                }
                if let Some(mut element) = stack.pop() {
                    element.raw_end = Some(raw.to_string());
                    push(&mut stack, &mut roots, Node::Element(element));
                }
            }
        }
    }

    while let Some(element) = stack.pop() {
        push(&mut stack, &mut roots, Node::Element(element));
    }
    roots
}

/// Print a forest back to markup
pub fn print(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        print_node(node, &mut out);
    }
    out
}

fn print_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) | Node::Raw(text) => out.push_str(text),
        Node::Element(element) => {
            if element.dirty {
                out.push('<');
                out.push_str(&element.name);
                for (name, value) in element.attributes.iter() {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
            } else {
                out.push_str(&element.raw_start);
            }
            for child in &element.children {
                print_node(child, out);
            }
            if let Some(end) = &element.raw_end {
                out.push_str(end);
            }
        }
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
