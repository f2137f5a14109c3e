//! # Folio Render
//!
//! Render-time alignment inference for images inside rich content.
//!
//! Stored markup carries layout intent only as inline margin text. This
//! crate classifies that text with a closed table and pins every image to the
//! classified position, independently of how the markup was produced and
//! without a browser DOM.
//!
//! ```rust,ignore
//! use folio_render::{render_rich_content, AlignmentPass};
//!
//! let html = render_rich_content(&stored_markup);
//! let (page, report) = AlignmentPass::default().render_page(&page_html);
//! ```

pub mod classify;
pub mod dom;
pub mod observer;
pub mod pass;

pub use classify::{classify_margin, classify_style, AlignmentHint, LayoutRules};
pub use dom::{parse_fragment, print, Element, Node, MAX_DEPTH};
pub use observer::{AlignmentObserver, MutationRecord, MutationSource};
pub use pass::{apply_alignment, render_rich_content, AlignmentPass, PassReport, DEFAULT_CONTENT_CLASS};
