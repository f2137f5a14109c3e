//! Folio markup contract.
//!
//! Defines the document tree that rich content is edited as, and the
//! permissive parser and printer that move it to and from HTML-like markup.

pub mod ast;
pub mod error;
pub mod image;
pub mod inline;
pub mod parser;
pub mod serializer;
pub mod style;
pub mod table;
pub mod tokenizer;

pub use ast::{Attributes, Block, Document, Inline, ListItem, Mark, MarkSet, MAX_HEADING_LEVEL};
#[cfg(feature = "pretty-errors")]
pub use error::format_errors;
pub use error::{ParseError, ParseResult, Span};
pub use image::{Alignment, Image};
pub use parser::{parse, parse_strict, parse_with_diagnostics, Parsed, MAX_DEPTH};
pub use serializer::{serialize, serialize_with, SerializeOptions};
pub use style::{Declaration, InlineStyle};
pub use table::{Table, TableCell, TableRow};
pub use tokenizer::{tokenize, Token};

/// Parse then print, producing the canonical form of `source`
pub fn normalize_markup(source: &str) -> String {
    serialize(&parse(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_is_idempotent() {
        let source = "loose <b>text</b><ul><li>a<li>b</ul>";
        let once = normalize_markup(source);
        assert_eq!(normalize_markup(&once), once);
    }
}
