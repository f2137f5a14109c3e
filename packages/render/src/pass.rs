//! # Alignment Pass
//!
//! Re-derives image alignment from stored margins at render time.
//!
//! For every image the container style is read (the style of a wrapping
//! `div`, `figure` or `span`, else the image's own), classified, and the
//! layout rules for that classification are written to the image together
//! with the matching `align-*` class. The written margin classifies to the
//! same hint, so the pass is idempotent.

use folio_markup::Alignment;
use serde::Serialize;
use tracing::debug;

use crate::classify::{classify_style, AlignmentHint, LayoutRules};
use crate::dom::{parse_fragment, print, Element, Node};

pub const DEFAULT_CONTENT_CLASS: &str = "rich-content";

/// Elements whose style stands in for the image's container style
const WRAPPERS: &[&str] = &["div", "figure", "span"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub containers: usize,
    pub images: usize,
    /// Images whose attributes changed
    pub restyled: usize,
}

impl PassReport {
    fn merge(&mut self, other: PassReport) {
        self.containers += other.containers;
        self.images += other.images;
        self.restyled += other.restyled;
    }
}

/// Align every image in one container's content
pub fn apply_alignment(nodes: &mut [Node]) -> PassReport {
    let mut report = PassReport {
        containers: 1,
        ..PassReport::default()
    };
    align_images(nodes, None, &mut report);
    report
}

fn align_images(nodes: &mut [Node], wrapper_style: Option<&str>, report: &mut PassReport) {
    for node in nodes {
        let Node::Element(element) = node else {
            continue;
        };

        if element.name == "img" {
            report.images += 1;
            let own_style = element.attr("style").unwrap_or_default().to_string();
            let hint = classify_style(wrapper_style.unwrap_or(own_style.as_str()));
            if restyle(element, hint) {
                report.restyled += 1;
            }
            continue;
        }

        let style = if WRAPPERS.contains(&element.name.as_str()) {
            element.attr("style").map(str::to_string)
        } else {
            None
        };
        align_images(&mut element.children, style.as_deref(), report);
    }
}

/// Write layout rules and the alignment class. Returns whether anything changed.
fn restyle(image: &mut Element, hint: AlignmentHint) -> bool {
    let before = (image.attr("style").map(str::to_string), image.attr("class").map(str::to_string));

    let mut style = image.style();
    LayoutRules::for_hint(hint).apply_to(&mut style);
    image.set_style(&style);

    let mut tokens = vec![hint.alignment().class_token()];
    if let Some(class) = image.attr("class") {
        tokens.extend(
            class
                .split_whitespace()
                .filter(|token| !Alignment::is_class_token(token))
                .map(str::to_string),
        );
    }
    image.set_attr("class", tokens.join(" "));

    let after = (image.attr("style").map(str::to_string), image.attr("class").map(str::to_string));
    before != after
}

/// Finds rich-content containers in a page and aligns their images
#[derive(Debug, Clone)]
pub struct AlignmentPass {
    content_class: String,
}

impl AlignmentPass {
    pub fn new(content_class: impl Into<String>) -> Self {
        Self {
            content_class: content_class.into(),
        }
    }

    pub fn content_class(&self) -> &str {
        &self.content_class
    }

    /// Run over every container in `nodes`. Containers nested in a
    /// container are covered by the outer one.
    pub fn apply(&self, nodes: &mut [Node]) -> PassReport {
        let mut report = PassReport::default();
        for node in nodes {
            let Node::Element(element) = node else {
                continue;
            };
            if element.has_class(&self.content_class) {
                report.merge(apply_alignment(&mut element.children));
            } else {
                report.merge(self.apply(&mut element.children));
            }
        }
        report
    }

    /// Parse a page, align it and print it back
    pub fn render_page(&self, markup: &str) -> (String, PassReport) {
        let mut nodes = parse_fragment(markup);
        let report = self.apply(&mut nodes);
        debug!(
            containers = report.containers,
            images = report.images,
            restyled = report.restyled,
            "Alignment pass complete"
        );
        (print(&nodes), report)
    }
}

impl Default for AlignmentPass {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_CLASS)
    }
}

/// Align a markup fragment treated as the content of one container
pub fn render_rich_content(markup: &str) -> String {
    let mut nodes = parse_fragment(markup);
    apply_alignment(&mut nodes);
    print(&nodes)
}
