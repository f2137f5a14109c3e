//! Margin classification.
//!
//! A closed table over the margin patterns the editor produces. It is not a
//! CSS engine: anything outside the table is left-aligned.

use folio_markup::{Alignment, InlineStyle};
use serde::Serialize;

/// Alignment recovered from a stored margin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentHint {
    Left,
    Center,
    Right,
}

impl AlignmentHint {
    pub fn as_str(self) -> &'static str {
        match self {
            AlignmentHint::Left => "left",
            AlignmentHint::Center => "center",
            AlignmentHint::Right => "right",
        }
    }

    /// Margin written back by the layout rules; classifies to `self` again
    pub fn margin(self) -> &'static str {
        match self {
            AlignmentHint::Left => "0px",
            AlignmentHint::Center => "0px auto",
            AlignmentHint::Right => "0px 0px 0px auto",
        }
    }

    pub fn alignment(self) -> Alignment {
        match self {
            AlignmentHint::Left => Alignment::Left,
            AlignmentHint::Center => Alignment::Center,
            AlignmentHint::Right => Alignment::Right,
        }
    }
}

/// Classify a margin value. Total: every input yields a hint.
pub fn classify_margin(margin: Option<&str>) -> AlignmentHint {
    let Some(margin) = margin else {
        return AlignmentHint::Left;
    };
    let margin = margin.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase();

    // Center is tested first: "0px auto" also ends in " auto"
    if margin == "0px auto" {
        return AlignmentHint::Center;
    }
    if margin == "0px 0px 0px auto" || margin.ends_with(" auto") || margin == "auto 0px" {
        return AlignmentHint::Right;
    }
    AlignmentHint::Left
}

/// Classify the `margin` declaration of inline style text
pub fn classify_style(style: &str) -> AlignmentHint {
    classify_margin(InlineStyle::parse(style).get("margin"))
}

/// Layout assignments that pin an element to its classified position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutRules {
    pub float: &'static str,
    pub display: &'static str,
    pub margin: &'static str,
    pub clear: &'static str,
}

impl LayoutRules {
    pub fn for_hint(hint: AlignmentHint) -> Self {
        Self {
            float: "none",
            display: "block",
            margin: hint.margin(),
            clear: "both",
        }
    }

    /// Write the rules into `style`, replacing earlier values
    pub fn apply_to(&self, style: &mut InlineStyle) {
        style.set("float", self.float);
        style.set("display", self.display);
        style.set("margin", self.margin);
        style.set("clear", self.clear);
    }
}
