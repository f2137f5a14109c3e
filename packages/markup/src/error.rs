//! Parse diagnostics.
//!
//! Markup parsing is permissive: malformed input still produces a document.
//! Every recovery the parser performs is recorded as a [`ParseError`] so that
//! lossy input can be flagged instead of being fixed silently.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Byte range in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unclosed <{name}> at {}..{}", .span.start, .span.end)]
    UnclosedElement { name: String, span: Span },

    #[error("Unexpected </{name}> at {}..{}", .span.start, .span.end)]
    UnexpectedEndTag { name: String, span: Span },

    #[error("Malformed tag at {}..{}", .span.start, .span.end)]
    MalformedTag { span: Span },

    #[error("<{name}> is not allowed here at {}..{}", .span.start, .span.end)]
    MisplacedElement { name: String, span: Span },

    #[error("Text outside a block at {}..{} was wrapped in a paragraph", .span.start, .span.end)]
    ImplicitParagraph { span: Span },

    #[error("Dropped <{name}> at {}..{}", .span.start, .span.end)]
    DroppedContent { name: String, span: Span },

    #[error("<{name}> is nested too deeply at {}..{}", .span.start, .span.end)]
    NestingTooDeep { name: String, span: Span },
}

impl ParseError {
    pub fn unclosed(name: impl Into<String>, span: impl Into<Span>) -> Self {
        Self::UnclosedElement {
            name: name.into(),
            span: span.into(),
        }
    }

    pub fn unexpected_end(name: impl Into<String>, span: impl Into<Span>) -> Self {
        Self::UnexpectedEndTag {
            name: name.into(),
            span: span.into(),
        }
    }

    pub fn misplaced(name: impl Into<String>, span: impl Into<Span>) -> Self {
        Self::MisplacedElement {
            name: name.into(),
            span: span.into(),
        }
    }

    pub fn dropped(name: impl Into<String>, span: impl Into<Span>) -> Self {
        Self::DroppedContent {
            name: name.into(),
            span: span.into(),
        }
    }

    pub fn too_deep(name: impl Into<String>, span: impl Into<Span>) -> Self {
        Self::NestingTooDeep {
            name: name.into(),
            span: span.into(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ParseError::UnclosedElement { span, .. }
            | ParseError::UnexpectedEndTag { span, .. }
            | ParseError::MalformedTag { span }
            | ParseError::MisplacedElement { span, .. }
            | ParseError::ImplicitParagraph { span }
            | ParseError::DroppedContent { span, .. }
            | ParseError::NestingTooDeep { span, .. } => *span,
        }
    }

    /// Short label shown under the source excerpt
    pub fn label(&self) -> String {
        match self {
            ParseError::UnclosedElement { name, .. } => format!("<{name}> closed implicitly"),
            ParseError::UnexpectedEndTag { .. } => "ignored".to_string(),
            ParseError::MalformedTag { .. } => "kept as text".to_string(),
            ParseError::MisplacedElement { .. } => "kept verbatim".to_string(),
            ParseError::ImplicitParagraph { .. } => "wrapped in <p>".to_string(),
            ParseError::DroppedContent { .. } => "removed from the document".to_string(),
            ParseError::NestingTooDeep { .. } => "kept verbatim from here".to_string(),
        }
    }
}

/// Pretty-print diagnostics with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_errors(source: &str, filename: &str, errors: &[ParseError]) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let mut output = Vec::new();

    for error in errors {
        let span = error.span();
        let end = span.end.min(source.len()).max(span.start);

        let report = Report::build(ReportKind::Warning, filename, span.start)
            .with_message(error.to_string())
            .with_label(
                Label::new((filename, span.start..end))
                    .with_color(Color::Yellow)
                    .with_message(error.label()),
            )
            .finish();

        if report
            .write((filename, Source::from(source)), &mut output)
            .is_err()
        {
            tracing::warn!(error = %error, "Failed to format diagnostic");
        }
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}
