//! # Image Node
//!
//! Image attribute (de)serialization is one-directional: `class` and the
//! size part of `style` are always derived from the node's stored attributes
//! when printing, and are never read back from `style` when parsing. Two
//! encodings of the same fact therefore cannot diverge across an edit/reload
//! cycle.
//!
//! - alignment → exactly one `align-*` class token, plus a `margin`
//!   declaration for explicit alignments
//! - width/height → `width`/`height` attributes plus an explicit inline style

use serde::{Deserialize, Serialize};

use crate::ast::Attributes;
use crate::style::InlineStyle;

const ALIGN_PREFIX: &str = "align-";

/// Horizontal placement of an image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::None => "none",
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }

    /// The single class token representing this alignment
    pub fn class_token(self) -> String {
        format!("{}{}", ALIGN_PREFIX, self.as_str())
    }

    pub fn from_class_token(token: &str) -> Option<Self> {
        match token.strip_prefix(ALIGN_PREFIX)? {
            "none" => Some(Alignment::None),
            "left" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            _ => None,
        }
    }

    pub fn is_class_token(token: &str) -> bool {
        Self::from_class_token(token).is_some()
    }

    /// Margin printed for this alignment; `None` leaves layout to the page
    pub fn margin(self) -> Option<&'static str> {
        match self {
            Alignment::None => None,
            Alignment::Left => Some("0px"),
            Alignment::Center => Some("0px auto"),
            Alignment::Right => Some("0px 0px 0px auto"),
        }
    }
}

/// Inline image node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub alt: String,
    pub alignment: Alignment,
    pub width: Option<u32>,
    pub height: Option<u32>,

    /// Class tokens other than the alignment token
    #[serde(default)]
    pub classes: Vec<String>,

    /// Style declarations other than the derived size declarations
    #[serde(default)]
    pub style: InlineStyle,

    /// Attributes outside the image contract
    #[serde(default)]
    pub attrs: Attributes,
}

impl Image {
    pub fn new(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: alt.into(),
            ..Default::default()
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Read an image from parsed `<img>` attributes
    pub fn from_attributes(attributes: &Attributes) -> Self {
        let mut image = Image::default();

        for (name, value) in attributes.iter() {
            match name {
                "src" => image.src = value.to_string(),
                "alt" => image.alt = value.to_string(),
                "class" => {
                    let mut aligned = false;
                    for token in value.split_whitespace() {
                        match Alignment::from_class_token(token) {
                            Some(alignment) if !aligned => {
                                image.alignment = alignment;
                                aligned = true;
                            }
                            // Later alignment tokens conflict with the first one
                            Some(_) => {}
                            None => image.classes.push(token.to_string()),
                        }
                    }
                }
                "width" => match parse_dimension(value) {
                    Some(width) => image.width = Some(width),
                    None => image.attrs.set(name, value),
                },
                "height" => match parse_dimension(value) {
                    Some(height) => image.height = Some(height),
                    None => image.attrs.set(name, value),
                },
                "style" => {
                    let mut style = InlineStyle::parse(value);
                    // Size is derived from the attributes, never read back
                    style.remove("width");
                    style.remove("height");
                    image.style = style;
                }
                _ => image.attrs.set(name, value),
            }
        }

        if image.alignment != Alignment::None {
            // Derived from the alignment class
            image.style.remove("margin");
        }

        image
    }

    /// Attributes to print, in canonical order
    pub fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.set("src", self.src.clone());
        attributes.set("alt", self.alt.clone());

        let mut class = self.alignment.class_token();
        for token in &self.classes {
            class.push(' ');
            class.push_str(token);
        }
        attributes.set("class", class);

        if let Some(width) = self.width {
            attributes.set("width", width.to_string());
        }
        if let Some(height) = self.height {
            attributes.set("height", height.to_string());
        }

        let style = self.derived_style();
        if !style.is_empty() {
            attributes.set("style", style.to_string());
        }

        for (name, value) in self.attrs.iter() {
            attributes.set_if_absent(name, value);
        }

        attributes
    }

    /// Inline style with size and margin declarations derived from the
    /// stored attributes, followed by passthrough declarations
    pub fn derived_style(&self) -> InlineStyle {
        let mut style = InlineStyle::new();
        if let Some(width) = self.width {
            style.set("width", format!("{width}px"));
        }
        if let Some(height) = self.height {
            style.set("height", format!("{height}px"));
        }
        if let Some(margin) = self.alignment.margin() {
            style.set("margin", margin);
        }
        for decl in &self.style.declarations {
            style.set(&decl.property, decl.value.clone());
        }
        style
    }
}

/// Accepts `320` and `320px`; anything else is not a stored dimension
fn parse_dimension(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value.strip_suffix("px").unwrap_or(value);
    digits.parse().ok()
}
