//! # Undo/Redo Stack
//!
//! Tracks document history and enables undo/redo operations.
//!
//! ## Design
//!
//! - Each history entry stores the document and selection before and after
//!   the change it records
//! - Undo restores the "before" snapshot and moves the entry to the redo stack
//! - Redo restores the "after" snapshot
//! - New entries clear the redo stack
//! - Supports batched operations (group several changes as one undo step)
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//!
//! stack.record(before, after, "Typing");
//!
//! if let Some(snapshot) = stack.undo() {
//!     editor.restore(snapshot);
//! }
//! ```

use folio_markup::Document;

use crate::selection::Selection;

/// Document state captured around an edit
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub doc: Document,
    pub selection: Option<Selection>,
}

/// One undoable step
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub before: Snapshot,
    pub after: Snapshot,

    /// Optional description of this step
    pub description: Option<String>,
}

/// Undo/redo stack for document editing
#[derive(Debug)]
pub struct UndoStack {
    /// Applied entries (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// Undone entries (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Currently building a batch
    current_batch: Option<PendingBatch>,
}

#[derive(Debug, Default)]
struct PendingBatch {
    before: Option<Snapshot>,
    after: Option<Snapshot>,
    description: Option<String>,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Record a change. Unchanged documents are not recorded.
    pub fn record(&mut self, before: Snapshot, after: Snapshot, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            // First "before" wins, last "after" wins
            batch.before.get_or_insert(before);
            batch.after = Some(after);
            batch.description.get_or_insert_with(|| description.into());
            return;
        }

        if before.doc == after.doc {
            return;
        }
        self.push_entry(HistoryEntry {
            before,
            after,
            description: Some(description.into()),
        });
    }

    /// Start a batch (will be undone/redone together)
    pub fn begin_batch(&mut self) {
        self.current_batch = Some(PendingBatch::default());
    }

    /// End the current batch and push it if it changed the document
    pub fn end_batch(&mut self) {
        let Some(batch) = self.current_batch.take() else {
            return;
        };
        if let (Some(before), Some(after)) = (batch.before, batch.after) {
            if before.doc != after.doc {
                self.push_entry(HistoryEntry {
                    before,
                    after,
                    description: batch.description,
                });
            }
        }
    }

    pub fn is_batching(&self) -> bool {
        self.current_batch.is_some()
    }

    /// Set description for current batch (if batching)
    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // New action invalidates the future
        self.redo_stack.clear();
    }

    /// Step back; returns the snapshot to restore
    pub fn undo(&mut self) -> Option<Snapshot> {
        let entry = self.undo_stack.pop()?;
        let snapshot = entry.before.clone();
        self.redo_stack.push(entry);
        Some(snapshot)
    }

    /// Step forward; returns the snapshot to restore
    pub fn redo(&mut self) -> Option<Snapshot> {
        let entry = self.redo_stack.pop()?;
        let snapshot = entry.after.clone();
        self.undo_stack.push(entry);
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    /// Description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }

    /// Description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_markup::parse;

    fn snapshot(markup: &str) -> Snapshot {
        Snapshot {
            doc: parse(markup),
            selection: None,
        }
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_record_undo_redo() {
        let mut stack = UndoStack::new();
        stack.record(snapshot("<p>Hello</p>"), snapshot("<p>World</p>"), "Typing");

        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.undo_description(), Some("Typing"));

        let restored = stack.undo().unwrap();
        assert_eq!(restored, snapshot("<p>Hello</p>"));
        assert_eq!(stack.redo_levels(), 1);

        let restored = stack.redo().unwrap();
        assert_eq!(restored, snapshot("<p>World</p>"));
        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_unchanged_document_not_recorded() {
        let mut stack = UndoStack::new();
        stack.record(snapshot("<p>x</p>"), snapshot("<p>x</p>"), "Noop");
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_batched_changes() {
        let mut stack = UndoStack::new();

        stack.begin_batch();
        stack.set_batch_description("Update greeting");
        stack.record(snapshot("<p>a</p>"), snapshot("<p>b</p>"), "Typing");
        stack.record(snapshot("<p>b</p>"), snapshot("<p>c</p>"), "Typing");
        stack.end_batch();

        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.undo_description(), Some("Update greeting"));
        assert_eq!(stack.undo().unwrap(), snapshot("<p>a</p>"));
    }

    #[test]
    fn test_batch_that_returns_to_start_is_dropped() {
        let mut stack = UndoStack::new();
        stack.begin_batch();
        stack.record(snapshot("<p>a</p>"), snapshot("<p>b</p>"), "Typing");
        stack.record(snapshot("<p>b</p>"), snapshot("<p>a</p>"), "Typing");
        stack.end_batch();
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_new_entry_clears_redo() {
        let mut stack = UndoStack::new();
        stack.record(snapshot("<p>a</p>"), snapshot("<p>b</p>"), "Typing");
        stack.undo();
        assert_eq!(stack.redo_levels(), 1);

        stack.record(snapshot("<p>a</p>"), snapshot("<p>c</p>"), "Typing");
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut stack = UndoStack::with_max_levels(2);
        for i in 0..3 {
            stack.record(
                snapshot(&format!("<p>{i}</p>")),
                snapshot(&format!("<p>{}</p>", i + 1)),
                "Typing",
            );
        }
        assert_eq!(stack.undo_levels(), 2);
        assert_eq!(stack.undo().unwrap(), snapshot("<p>2</p>"));
        assert_eq!(stack.undo().unwrap(), snapshot("<p>1</p>"));
        assert!(stack.undo().is_none());
    }
}
