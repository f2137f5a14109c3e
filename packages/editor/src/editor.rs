//! # Editor
//!
//! Owns the structured document and routes every change through
//! [`Editor::execute`], so history, upload anchors and change notification
//! are handled in one place.
//!
//! ```text
//! Command ──► EditorState ──► Remaps ──► anchors
//!                  │
//!                  ├──► UndoStack (before/after snapshots)
//!                  └──► on_change listeners (markup string)
//! ```

use std::collections::HashMap;

use folio_markup::{
    parse_strict, parse_with_diagnostics, serialize_with, Alignment, Attributes, Block, Document, Image,
    Mark, ParseError, SerializeOptions,
};
use tracing::{debug, info};

use crate::commands::{insert_image_at, BlockKind, Command, CommandError, EditorState};
use crate::config::EditorConfig;
use crate::errors::EditorError;
use crate::selection::{block_at, first_textblock_in, NodePath, Position, Remap, Selection, Step};
use crate::undo_stack::{Snapshot, UndoStack};

/// Handle for an insertion context captured before an async operation
pub type AnchorId = u64;

type ChangeListener = Box<dyn FnMut(&str) + Send>;

pub struct Editor {
    state: EditorState,
    history: UndoStack,
    listeners: Vec<ChangeListener>,
    /// `None` once the captured position stopped existing
    anchors: HashMap<AnchorId, Option<Position>>,
    next_anchor: AnchorId,
    version: u64,
    config: EditorConfig,
}

impl Editor {
    /// Editor holding one empty paragraph
    pub fn new(config: EditorConfig) -> Self {
        let doc = Document::from_blocks(vec![Block::empty_paragraph()]);
        Self {
            state: EditorState::new(doc),
            history: UndoStack::with_max_levels(config.history_depth),
            listeners: Vec::new(),
            anchors: HashMap::new(),
            next_anchor: 0,
            version: 0,
            config,
        }
    }

    /// Editor loaded from markup; recoveries are logged by the parser
    pub fn with_markup(markup: &str, config: EditorConfig) -> Self {
        let mut editor = Self::new(config);
        editor.set_markup(markup);
        editor
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.state.doc
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.state.selection.as_ref()
    }

    /// Incremented on every document change
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Serialize the current document
    pub fn get_markup(&self) -> String {
        self.print(&self.state.doc)
    }

    pub(crate) fn print(&self, doc: &Document) -> String {
        serialize_with(
            doc,
            SerializeOptions {
                pretty: self.config.pretty_markup,
            },
        )
    }

    /// Replace the document with parsed markup.
    ///
    /// This is the value-in side of the content store contract: history is
    /// cleared, anchors are invalidated and listeners are not notified.
    /// Returns the parse recoveries.
    pub fn set_markup(&mut self, markup: &str) -> Vec<ParseError> {
        let parsed = parse_with_diagnostics(markup);
        self.load(parsed.document);
        parsed.errors
    }

    /// Like [`Editor::set_markup`] but refuses markup that needs recovery
    pub fn set_markup_strict(&mut self, markup: &str) -> Result<(), EditorError> {
        let doc = parse_strict(markup)?;
        self.load(doc);
        Ok(())
    }

    fn load(&mut self, doc: Document) {
        self.state = EditorState::new(doc);
        self.history.clear();
        self.invalidate_anchors();
        self.version += 1;
        info!(blocks = self.state.doc.blocks.len(), "Loaded document");
    }

    /// Register a listener receiving the markup after every change
    pub fn on_change(&mut self, listener: impl FnMut(&str) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub(crate) fn notify(&mut self, markup: &str) {
        for listener in &mut self.listeners {
            listener(markup);
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            doc: self.state.doc.clone(),
            selection: self.state.selection.clone(),
        }
    }

    fn commit(&mut self) {
        self.version += 1;
        let markup = self.get_markup();
        debug!(version = self.version, listeners = self.listeners.len(), "Document changed");
        self.notify(&markup);
    }

    /// Apply a command. Returns whether the document changed.
    pub fn execute(&mut self, command: Command) -> Result<bool, EditorError> {
        let before = self.snapshot();
        let applied = command.apply(&mut self.state)?;
        if !applied.changed {
            return Ok(false);
        }

        self.map_anchors(&applied.remaps);
        let after = self.snapshot();
        self.history.record(before, after, command.name());
        self.commit();
        Ok(true)
    }

    /// Replace the whole document as one undoable step
    pub fn replace_document(&mut self, doc: Document, description: &str) -> bool {
        if doc == self.state.doc {
            return false;
        }
        let before = self.snapshot();
        self.state = EditorState::new(doc);
        self.invalidate_anchors();
        let after = self.snapshot();
        self.history.record(before, after, description);
        self.commit();
        true
    }

    /// Group the following changes into one history entry
    pub fn begin_batch(&mut self, description: &str) {
        self.history.begin_batch();
        self.history.set_batch_description(description);
    }

    pub fn end_batch(&mut self) {
        self.history.end_batch();
    }

    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditorError> {
        for position in [&selection.anchor, &selection.head] {
            if !position.resolves(&self.state.doc) {
                return Err(CommandError::InvalidPosition(position.clone()).into());
            }
        }
        self.state.selection = Some(selection);
        self.state.stored_marks = None;
        Ok(())
    }

    /// Put the cursor at the start of a table cell. Returns `false` when the
    /// coordinates fall outside the grid.
    pub fn select_cell(&mut self, table: &NodePath, row: usize, col: usize) -> bool {
        let Some(Block::Table(grid)) = block_at(&self.state.doc, table) else {
            return false;
        };
        let Some(cell) = grid.cell(row, col) else {
            return false;
        };
        let cell_path = table.child(Step::Cell { row, col });
        let Some(path) = first_textblock_in(&cell_path, &cell.blocks) else {
            return false;
        };

        self.state.selection = Some(Selection::collapsed(Position::new(path, 0)));
        self.state.stored_marks = None;
        true
    }

    pub fn toggle_mark(&mut self, mark: Mark) -> Result<bool, EditorError> {
        self.execute(Command::ToggleMark { mark })
    }

    pub fn set_block_type(&mut self, kind: BlockKind, attrs: Attributes) -> Result<bool, EditorError> {
        self.execute(Command::SetBlockType { kind, attrs })
    }

    pub fn insert_text(&mut self, text: &str) -> Result<bool, EditorError> {
        self.execute(Command::InsertText { text: text.to_string() })
    }

    pub fn insert_image(&mut self, src: &str, alt: &str, alignment: Alignment) -> Result<bool, EditorError> {
        self.execute(Command::InsertImage {
            src: src.to_string(),
            alt: alt.to_string(),
            alignment,
        })
    }

    pub fn insert_table(&mut self, rows: usize, cols: usize) -> Result<bool, EditorError> {
        self.execute(Command::InsertTable { rows, cols })
    }

    pub fn add_row_before(&mut self) -> Result<bool, EditorError> {
        self.execute(Command::AddRowBefore)
    }

    pub fn add_row_after(&mut self) -> Result<bool, EditorError> {
        self.execute(Command::AddRowAfter)
    }

    pub fn delete_row(&mut self) -> Result<bool, EditorError> {
        self.execute(Command::DeleteRow)
    }

    pub fn add_column_before(&mut self) -> Result<bool, EditorError> {
        self.execute(Command::AddColumnBefore)
    }

    pub fn add_column_after(&mut self) -> Result<bool, EditorError> {
        self.execute(Command::AddColumnAfter)
    }

    pub fn delete_column(&mut self) -> Result<bool, EditorError> {
        self.execute(Command::DeleteColumn)
    }

    pub fn toggle_header_row(&mut self) -> Result<bool, EditorError> {
        self.execute(Command::ToggleHeaderRow)
    }

    pub fn toggle_header_column(&mut self) -> Result<bool, EditorError> {
        self.execute(Command::ToggleHeaderColumn)
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.state.doc = snapshot.doc;
        self.state.selection = snapshot.selection;
        self.state.stored_marks = None;
        self.state.ensure_selection();
        // Positions captured against a different tree cannot be trusted
        self.invalidate_anchors();
        self.commit();
    }

    /// Remember the current cursor for a later insertion
    pub fn capture_anchor(&mut self) -> AnchorId {
        let id = self.next_anchor;
        self.next_anchor += 1;
        let position = self.state.selection.as_ref().map(|selection| selection.head.clone());
        debug!(anchor = id, ?position, "Captured anchor");
        self.anchors.insert(id, position);
        id
    }

    /// Insert an image where the anchor points, or append it in a new
    /// paragraph when the anchor no longer resolves
    pub fn insert_image_at_anchor(&mut self, anchor: AnchorId, image: Image) -> Result<(), CommandError> {
        let position = self.anchors.get(&anchor).cloned().flatten();
        if position.is_none() {
            debug!(anchor, "Anchor lost, appending image at document end");
        }

        let before = self.snapshot();
        let applied = insert_image_at(&mut self.state, position.as_ref(), image)?;
        self.map_anchors(&applied.remaps);
        let after = self.snapshot();
        self.history.record(before, after, "Insert image");
        self.commit();
        Ok(())
    }

    pub fn release_anchor(&mut self, anchor: AnchorId) {
        self.anchors.remove(&anchor);
    }

    fn map_anchors(&mut self, remaps: &[Remap]) {
        for position in self.anchors.values_mut() {
            for remap in remaps {
                *position = position.as_ref().and_then(|p| p.map(remap));
            }
        }
    }

    fn invalidate_anchors(&mut self) {
        for position in self.anchors.values_mut() {
            *position = None;
        }
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("anchors", &self.anchors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn compact() -> EditorConfig {
        EditorConfig {
            pretty_markup: false,
            ..EditorConfig::default()
        }
    }

    #[test]
    fn test_new_editor_has_cursor() {
        let mut editor = Editor::new(compact());
        editor.insert_text("Hello").unwrap();
        assert_eq!(editor.get_markup(), "<p>Hello</p>");
        assert_eq!(editor.version(), 1);
    }

    #[test]
    fn test_set_markup_does_not_notify_or_record() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut editor = Editor::new(compact());
        let sink = seen.clone();
        editor.on_change(move |markup| sink.lock().unwrap().push(markup.to_string()));

        editor.insert_text("x").unwrap();
        editor.set_markup("<p>loaded</p>");

        assert_eq!(seen.lock().unwrap().as_slice(), ["<p>x</p>"]);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_set_markup_strict_rejects_recovery() {
        let mut editor = Editor::new(compact());
        assert!(matches!(
            editor.set_markup_strict("<p>open"),
            Err(EditorError::Parse(_))
        ));
        assert_eq!(editor.get_markup(), "<p></p>");
    }

    #[test]
    fn test_undo_redo_restores_markup_and_notifies() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut editor = Editor::with_markup("<p>a</p>", compact());
        let sink = seen.clone();
        editor.on_change(move |markup| sink.lock().unwrap().push(markup.to_string()));

        editor.insert_text("b").unwrap();
        assert!(editor.undo());
        assert_eq!(editor.get_markup(), "<p>a</p>");
        assert!(editor.redo());
        assert_eq!(editor.get_markup(), "<p>ba</p>");
        assert!(!editor.redo());

        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut editor = Editor::new(EditorConfig {
            history_depth: 2,
            ..compact()
        });
        for text in ["a", "b", "c"] {
            editor.insert_text(text).unwrap();
        }
        assert!(editor.undo());
        assert!(editor.undo());
        assert!(!editor.undo());
        assert_eq!(editor.get_markup(), "<p>a</p>");
    }

    #[test]
    fn test_set_selection_validates() {
        let mut editor = Editor::with_markup("<p>abc</p>", compact());
        let outside = Selection::collapsed(Position::new(NodePath::block(0), 4));
        assert!(editor.set_selection(outside).is_err());

        let inside = Selection::collapsed(Position::new(NodePath::block(0), 3));
        editor.set_selection(inside).unwrap();
        editor.insert_text("d").unwrap();
        assert_eq!(editor.get_markup(), "<p>abcd</p>");
    }

    #[test]
    fn test_anchor_shifts_with_typing() {
        let mut editor = Editor::with_markup("<p>ab</p>", compact());
        editor
            .set_selection(Selection::collapsed(Position::new(NodePath::block(0), 1)))
            .unwrap();
        let anchor = editor.capture_anchor();

        editor
            .set_selection(Selection::collapsed(Position::new(NodePath::block(0), 0)))
            .unwrap();
        editor.insert_text("xx").unwrap();

        editor
            .insert_image_at_anchor(anchor, Image::new("https://cdn.example.com/i.png", ""))
            .unwrap();
        editor.release_anchor(anchor);

        assert_eq!(
            editor.get_markup(),
            r#"<p>xxa<img src="https://cdn.example.com/i.png" alt="" class="align-none">b</p>"#
        );
    }

    #[test]
    fn test_anchor_invalidated_by_set_markup() {
        let mut editor = Editor::with_markup("<p>ab</p>", compact());
        let anchor = editor.capture_anchor();
        editor.set_markup("<p>other</p>");

        editor.insert_image_at_anchor(anchor, Image::new("u.png", "")).unwrap();
        assert_eq!(
            editor.get_markup(),
            r#"<p>other</p><p><img src="u.png" alt="" class="align-none"></p>"#
        );
    }

    #[test]
    fn test_select_cell_out_of_grid_is_noop() {
        let mut editor = Editor::new(compact());
        editor.insert_table(2, 2).unwrap();
        let table = NodePath::block(1);
        assert!(editor.select_cell(&table, 1, 1));
        assert!(!editor.select_cell(&table, 5, 0));
        assert!(!editor.select_cell(&NodePath::block(0), 0, 0));
    }
}
