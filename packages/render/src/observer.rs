//! Explicit content-changed notification for the alignment pass.
//!
//! The host calls [`AlignmentObserver::content_changed`] after it mutates
//! rendered content. Records written by the pass itself are ignored, and a
//! re-entrancy flag stops a host that feeds pass writes straight back in
//! from looping.

use std::cell::{Cell, RefCell};

use tracing::{debug, trace};

use crate::dom::{parse_fragment, print, Node};
use crate::pass::{apply_alignment, PassReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationSource {
    Host,
    AlignmentPass,
}

/// One observed change to rendered content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub source: MutationSource,
    /// Element name the change touched
    pub target: String,
}

impl MutationRecord {
    pub fn host(target: impl Into<String>) -> Self {
        Self {
            source: MutationSource::Host,
            target: target.into(),
        }
    }

    pub fn from_pass(target: impl Into<String>) -> Self {
        Self {
            source: MutationSource::AlignmentPass,
            target: target.into(),
        }
    }
}

type WriteHook = Box<dyn Fn(&[MutationRecord])>;

/// Rendered content of one rich-content container plus its pass state
pub struct AlignmentObserver {
    nodes: RefCell<Vec<Node>>,
    running: Cell<bool>,
    runs: Cell<usize>,
    on_write: Option<WriteHook>,
}

impl AlignmentObserver {
    /// Render `markup`; the pass runs once before the content is first read
    pub fn new(markup: &str) -> Self {
        let observer = Self {
            nodes: RefCell::new(Vec::new()),
            running: Cell::new(false),
            runs: Cell::new(0),
            on_write: None,
        };
        observer.replace_content(markup);
        observer
    }

    /// Receive the records of the pass's own writes, as a DOM observer would
    pub fn with_write_hook(mut self, hook: impl Fn(&[MutationRecord]) + 'static) -> Self {
        self.on_write = Some(Box::new(hook));
        self
    }

    /// Replace the rendered content and re-run the pass
    pub fn replace_content(&self, markup: &str) -> Option<PassReport> {
        if self.running.get() {
            return None;
        }
        *self.nodes.borrow_mut() = parse_fragment(markup);
        self.content_changed(&[MutationRecord::host("content")])
    }

    /// Re-run the pass if any record came from the host
    pub fn content_changed(&self, records: &[MutationRecord]) -> Option<PassReport> {
        if self.running.get() {
            trace!("Alignment pass already running, ignoring notification");
            return None;
        }
        if !records.iter().any(|record| record.source == MutationSource::Host) {
            return None;
        }

        self.running.set(true);
        let report = apply_alignment(&mut self.nodes.borrow_mut());
        self.runs.set(self.runs.get() + 1);
        debug!(images = report.images, restyled = report.restyled, "Re-aligned content");

        if report.restyled > 0 {
            if let Some(hook) = &self.on_write {
                let writes = vec![MutationRecord::from_pass("img"); report.restyled];
                hook(&writes);
            }
        }
        self.running.set(false);

        Some(report)
    }

    /// Number of completed pass runs
    pub fn runs(&self) -> usize {
        self.runs.get()
    }

    pub fn markup(&self) -> String {
        print(&self.nodes.borrow())
    }
}
