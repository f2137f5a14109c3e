use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::image::Image;
use crate::table::Table;

/// Ordered attribute list.
///
/// Keeps source order for printing, but compares order-insensitively so that
/// structural equality ignores attribute ordering. Names are stored in ASCII
/// lowercase, the form the tokenizer reads them back in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Insert only if absent (first occurrence wins, as in HTML)
    pub fn set_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        if self.get(&name).is_none() {
            self.0.push((name, value.into()));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.0.iter().position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether `name` prints as a single attribute the tokenizer reads back
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && !name
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '<' | '>' | '/' | '='))
    }
}

impl From<Vec<(String, String)>> for Attributes {
    fn from(pairs: Vec<(String, String)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Attributes {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.set_if_absent(k, v);
        }
        attrs
    }
}

/// Root document node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All images in document order
    pub fn images(&self) -> Vec<&Image> {
        let mut images = Vec::new();
        for block in &self.blocks {
            block.collect_images(&mut images);
        }
        images
    }

    /// Plain text of all textblocks, one line per textblock
    pub fn text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            block.collect_text(&mut lines);
        }
        lines.join("\n")
    }
}

/// Heading levels supported by the markup contract
pub const MAX_HEADING_LEVEL: u8 = 3;

/// Block node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    Paragraph {
        content: Vec<Inline>,
        #[serde(default)]
        attrs: Attributes,
    },

    Heading {
        level: u8,
        content: Vec<Inline>,
        #[serde(default)]
        attrs: Attributes,
    },

    BulletList {
        items: Vec<ListItem>,
        #[serde(default)]
        attrs: Attributes,
    },

    OrderedList {
        items: Vec<ListItem>,
        #[serde(default)]
        attrs: Attributes,
    },

    Blockquote {
        blocks: Vec<Block>,
        #[serde(default)]
        attrs: Attributes,
    },

    HorizontalRule {
        #[serde(default)]
        attrs: Attributes,
    },

    Table(Table),

    /// Element outside the supported set, kept verbatim
    Opaque { raw: String },
}

/// List item (holds blocks)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub blocks: Vec<Block>,
}

impl ListItem {
    pub fn paragraph(content: Vec<Inline>) -> Self {
        Self {
            blocks: vec![Block::paragraph(content)],
        }
    }
}

impl Block {
    pub fn paragraph(content: Vec<Inline>) -> Self {
        Block::Paragraph {
            content,
            attrs: Attributes::new(),
        }
    }

    pub fn heading(level: u8, content: Vec<Inline>) -> Self {
        Block::Heading {
            level: level.clamp(1, MAX_HEADING_LEVEL),
            content,
            attrs: Attributes::new(),
        }
    }

    pub fn empty_paragraph() -> Self {
        Self::paragraph(Vec::new())
    }

    /// Paragraphs and headings hold inline content directly
    pub fn is_textblock(&self) -> bool {
        matches!(self, Block::Paragraph { .. } | Block::Heading { .. })
    }

    pub fn content(&self) -> Option<&Vec<Inline>> {
        match self {
            Block::Paragraph { content, .. } | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Block::Paragraph { content, .. } | Block::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    fn collect_images<'a>(&'a self, out: &mut Vec<&'a Image>) {
        match self {
            Block::Paragraph { content, .. } | Block::Heading { content, .. } => {
                out.extend(content.iter().filter_map(|inline| match inline {
                    Inline::Image(image) => Some(image),
                    _ => None,
                }));
            }
            Block::BulletList { items, .. } | Block::OrderedList { items, .. } => {
                for block in items.iter().flat_map(|item| &item.blocks) {
                    block.collect_images(out);
                }
            }
            Block::Blockquote { blocks, .. } => {
                for block in blocks {
                    block.collect_images(out);
                }
            }
            Block::Table(table) => {
                for block in table.rows.iter().flat_map(|r| &r.cells).flat_map(|c| &c.blocks) {
                    block.collect_images(out);
                }
            }
            Block::HorizontalRule { .. } | Block::Opaque { .. } => {}
        }
    }

    fn collect_text(&self, out: &mut Vec<String>) {
        match self {
            Block::Paragraph { content, .. } | Block::Heading { content, .. } => {
                out.push(
                    content
                        .iter()
                        .filter_map(|inline| match inline {
                            Inline::Text { text, .. } => Some(text.as_str()),
                            _ => None,
                        })
                        .collect(),
                );
            }
            Block::BulletList { items, .. } | Block::OrderedList { items, .. } => {
                for block in items.iter().flat_map(|item| &item.blocks) {
                    block.collect_text(out);
                }
            }
            Block::Blockquote { blocks, .. } => {
                for block in blocks {
                    block.collect_text(out);
                }
            }
            Block::Table(table) => {
                for block in table.rows.iter().flat_map(|r| &r.cells).flat_map(|c| &c.blocks) {
                    block.collect_text(out);
                }
            }
            Block::HorizontalRule { .. } | Block::Opaque { .. } => {}
        }
    }
}

/// Inline formatting mark.
///
/// Declaration order is the canonical nesting order used when printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
}

pub type MarkSet = BTreeSet<Mark>;

impl Mark {
    /// Tag emitted when printing
    pub fn tag(self) -> &'static str {
        match self {
            Mark::Bold => "strong",
            Mark::Italic => "em",
            Mark::Underline => "u",
            Mark::Strike => "s",
            Mark::Code => "code",
        }
    }

    /// Tags accepted when parsing
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "strong" | "b" => Some(Mark::Bold),
            "em" | "i" => Some(Mark::Italic),
            "u" => Some(Mark::Underline),
            "s" | "del" | "strike" => Some(Mark::Strike),
            "code" => Some(Mark::Code),
            _ => None,
        }
    }
}

/// Inline node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Inline {
    Text {
        text: String,
        #[serde(default)]
        marks: MarkSet,
    },

    Image(Image),

    HardBreak,

    /// Inline element outside the supported set, kept verbatim
    Opaque { raw: String },
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: MarkSet::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: impl IntoIterator<Item = Mark>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: marks.into_iter().collect(),
        }
    }
}
