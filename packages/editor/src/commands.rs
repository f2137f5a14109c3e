//! # Editor Commands
//!
//! Every change to the structured document is a [`Command`] value applied to
//! an [`EditorState`]. Commands are serializable so that toolbars, keymaps and
//! tests can describe edits as data.
//!
//! ## Semantics
//!
//! - Commands that need a selection are no-ops without one
//! - Table commands act on the cell holding the selection head and are no-ops
//!   outside a table or outside the grid
//! - Deleting the last row or column removes the whole table
//! - Images never reference local-only sources (`blob:`, `data:`, empty)

use folio_markup::inline::{content_len, delete_range, insert_at, marks_at, node_len, range_has_mark, range_has_text, set_mark};
use folio_markup::{
    Alignment, Attributes, Block, Document, Image, Inline, ListItem, Mark, MarkSet, Table, MAX_HEADING_LEVEL,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::selection::{
    block_at, block_at_mut, block_list_mut, container_mut, first_textblock_in, textblock_paths, NodePath,
    Position, Remap, Selection, Step,
};

/// Target type for [`Command::SetBlockType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    BulletList,
    OrderedList,
    Blockquote,
}

/// Structured edits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Toggle a mark over the selection, or the stored marks when collapsed
    ToggleMark { mark: Mark },

    /// Convert the textblocks touched by the selection
    SetBlockType {
        kind: BlockKind,
        #[serde(default)]
        attrs: Attributes,
    },

    /// Type text at the selection
    InsertText { text: String },

    InsertImage {
        src: String,
        #[serde(default)]
        alt: String,
        #[serde(default)]
        alignment: Alignment,
    },

    /// Insert a `rows` × `cols` table after the selected textblock
    InsertTable { rows: usize, cols: usize },

    AddRowBefore,
    AddRowAfter,
    DeleteRow,
    AddColumnBefore,
    AddColumnAfter,
    DeleteColumn,
    ToggleHeaderRow,
    ToggleHeaderColumn,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Position does not address a textblock: {0:?}")]
    InvalidPosition(Position),

    #[error("Image source is a local reference: {0:?}")]
    LocalReference(String),
}

/// Document plus the selection state commands read and update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    pub doc: Document,
    pub selection: Option<Selection>,
    /// Marks for the next typed text on a collapsed selection
    pub stored_marks: Option<MarkSet>,
}

/// Result of applying a command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    pub changed: bool,
    /// Structural effects, in application order
    pub remaps: Vec<Remap>,
}

impl Applied {
    fn unchanged() -> Self {
        Self::default()
    }

    fn changed(remaps: Vec<Remap>) -> Self {
        Self { changed: true, remaps }
    }
}

/// Sources that only exist on the author's machine
pub fn is_local_reference(src: &str) -> bool {
    let src = src.trim();
    let lower = src.get(..5).map(str::to_ascii_lowercase);
    src.is_empty() || matches!(lower.as_deref(), Some("blob:" | "data:"))
}

impl EditorState {
    pub fn new(doc: Document) -> Self {
        let mut state = Self {
            doc,
            selection: None,
            stored_marks: None,
        };
        state.ensure_selection();
        state
    }

    /// Map the selection through edits, falling back to the document start
    pub fn map_selection(&mut self, remaps: &[Remap]) {
        let mut selection = self.selection.take();
        for remap in remaps {
            selection = selection.and_then(|s| s.map(remap));
        }
        self.selection = selection.filter(|s| s.anchor.resolves(&self.doc) && s.head.resolves(&self.doc));
        self.ensure_selection();
    }

    /// Place a collapsed selection at the first textblock if there is none
    pub fn ensure_selection(&mut self) {
        if self.selection.is_none() {
            self.selection = textblock_paths(&self.doc)
                .into_iter()
                .next()
                .map(|path| Selection::collapsed(Position::new(path, 0)));
        }
    }
}

impl Command {
    /// Short label used for history entries and logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::ToggleMark { .. } => "Toggle mark",
            Command::SetBlockType { .. } => "Set block type",
            Command::InsertText { .. } => "Typing",
            Command::InsertImage { .. } => "Insert image",
            Command::InsertTable { .. } => "Insert table",
            Command::AddRowBefore => "Add row before",
            Command::AddRowAfter => "Add row after",
            Command::DeleteRow => "Delete row",
            Command::AddColumnBefore => "Add column before",
            Command::AddColumnAfter => "Add column after",
            Command::DeleteColumn => "Delete column",
            Command::ToggleHeaderRow => "Toggle header row",
            Command::ToggleHeaderColumn => "Toggle header column",
        }
    }

    pub fn apply(&self, state: &mut EditorState) -> Result<Applied, CommandError> {
        debug!(command = self.name(), "Applying command");

        match self {
            Command::ToggleMark { mark } => Ok(toggle_mark(state, *mark)),
            Command::SetBlockType { kind, attrs } => Ok(set_block_type(state, *kind, attrs)),
            Command::InsertText { text } => insert_text(state, text),
            Command::InsertImage { src, alt, alignment } => {
                let image = Image::new(src.as_str(), alt.as_str()).with_alignment(*alignment);
                insert_image(state, image)
            }
            Command::InsertTable { rows, cols } => Ok(insert_table(state, *rows, *cols)),
            Command::AddRowBefore => Ok(table_command(state, TableOp::AddRow { after: false })),
            Command::AddRowAfter => Ok(table_command(state, TableOp::AddRow { after: true })),
            Command::DeleteRow => Ok(table_command(state, TableOp::DeleteRow)),
            Command::AddColumnBefore => Ok(table_command(state, TableOp::AddColumn { after: false })),
            Command::AddColumnAfter => Ok(table_command(state, TableOp::AddColumn { after: true })),
            Command::DeleteColumn => Ok(table_command(state, TableOp::DeleteColumn)),
            Command::ToggleHeaderRow => Ok(table_command(state, TableOp::ToggleHeaderRow)),
            Command::ToggleHeaderColumn => Ok(table_command(state, TableOp::ToggleHeaderColumn)),
        }
    }
}

fn content_at<'a>(doc: &'a Document, path: &NodePath) -> Option<&'a Vec<Inline>> {
    block_at(doc, path)?.content()
}

fn content_at_mut<'a>(doc: &'a mut Document, path: &NodePath) -> Option<&'a mut Vec<Inline>> {
    block_at_mut(doc, path)?.content_mut()
}

/// Textblock range edited by typing or inline insertion: the selected range
/// when it stays inside one textblock, otherwise the head
fn edit_range(state: &EditorState) -> Option<(NodePath, usize, usize)> {
    let selection = state.selection.as_ref()?;
    let (from, to) = selection.ordered(&state.doc);
    if from.path == to.path {
        Some((from.path, from.offset, to.offset))
    } else {
        let head = selection.head.clone();
        Some((head.path, head.offset, head.offset))
    }
}

/// Replace `start..end` of a textblock with `nodes`
fn replace_inline(
    doc: &mut Document,
    path: &NodePath,
    start: usize,
    end: usize,
    nodes: Vec<Inline>,
) -> Result<Remap, CommandError> {
    let content = content_at_mut(doc, path)
        .filter(|content| end <= content_len(content))
        .ok_or_else(|| CommandError::InvalidPosition(Position::new(path.clone(), end)))?;

    let inserted = nodes.iter().map(node_len).sum();
    delete_range(content, start, end);
    insert_at(content, start, nodes);

    Ok(Remap::Replaced {
        path: path.clone(),
        start,
        end,
        inserted,
    })
}

fn toggle_mark(state: &mut EditorState, mark: Mark) -> Applied {
    let Some(selection) = state.selection.clone() else {
        return Applied::unchanged();
    };

    if selection.is_collapsed() {
        let head = &selection.head;
        let mut marks = match state.stored_marks.take() {
            Some(marks) => marks,
            None => content_at(&state.doc, &head.path)
                .map(|content| marks_at(content, head.offset))
                .unwrap_or_default(),
        };
        if !marks.remove(&mark) {
            marks.insert(mark);
        }
        state.stored_marks = Some(marks);
        return Applied::unchanged();
    }

    let segments = selection.segments(&state.doc);
    let mut saw_text = false;
    let mut all_marked = true;
    for (path, start, end) in &segments {
        if let Some(content) = content_at(&state.doc, path) {
            if range_has_text(content, *start, *end) {
                saw_text = true;
                all_marked &= range_has_mark(content, *start, *end, mark);
            }
        }
    }
    if !saw_text {
        return Applied::unchanged();
    }

    for (path, start, end) in segments {
        if let Some(content) = content_at_mut(&mut state.doc, &path) {
            set_mark(content, start, end, mark, !all_marked);
        }
    }
    Applied::changed(Vec::new())
}

fn set_block_type(state: &mut EditorState, kind: BlockKind, extra: &Attributes) -> Applied {
    let Some(selection) = state.selection.clone() else {
        return Applied::unchanged();
    };
    let extra = &printable(extra);

    let mut changed = false;
    let mut remaps = Vec::new();

    // Textblocks are leaves, so wrapping one never moves another
    for (path, _, _) in selection.segments(&state.doc) {
        match kind {
            BlockKind::Paragraph | BlockKind::Heading { .. } => {
                if let Some(block) = block_at_mut(&mut state.doc, &path) {
                    changed |= retag(block, kind, extra);
                }
            }

            BlockKind::BulletList | BlockKind::OrderedList => {
                if let Some((list_path, _)) = path.enclosing_list_item() {
                    if let Some(block) = block_at_mut(&mut state.doc, &list_path) {
                        changed |= retype_list(block, kind == BlockKind::OrderedList);
                    }
                    continue;
                }

                let wrapped = wrap(&mut state.doc, &path, |textblock| {
                    let items = vec![ListItem {
                        blocks: vec![textblock],
                    }];
                    let attrs = extra.clone();
                    if kind == BlockKind::OrderedList {
                        Block::OrderedList { items, attrs }
                    } else {
                        Block::BulletList { items, attrs }
                    }
                });
                if wrapped {
                    changed = true;
                    remaps.push(Remap::Wrapped {
                        path,
                        inner: vec![Step::Item(0), Step::Block(0)],
                    });
                }
            }

            BlockKind::Blockquote => {
                if path.enclosing_quote(&state.doc).is_some() {
                    continue;
                }
                let wrapped = wrap(&mut state.doc, &path, |textblock| Block::Blockquote {
                    blocks: vec![textblock],
                    attrs: extra.clone(),
                });
                if wrapped {
                    changed = true;
                    remaps.push(Remap::Wrapped {
                        path,
                        inner: vec![Step::Block(0)],
                    });
                }
            }
        }
    }

    if !changed {
        return Applied::unchanged();
    }
    state.map_selection(&remaps);
    Applied::changed(remaps)
}

/// Attributes whose names survive printing; the rest are dropped
fn printable(attrs: &Attributes) -> Attributes {
    attrs
        .iter()
        .filter(|(name, _)| {
            let valid = Attributes::is_valid_name(name);
            if !valid {
                debug!(name, "Dropping unprintable block attribute");
            }
            valid
        })
        .collect()
}

/// Retag a textblock as paragraph or heading, keeping its content
fn retag(block: &mut Block, kind: BlockKind, extra: &Attributes) -> bool {
    let (content, mut attrs) = match block {
        Block::Paragraph { content, attrs } | Block::Heading { content, attrs, .. } => {
            (content.clone(), attrs.clone())
        }
        _ => return false,
    };
    for (name, value) in extra.iter() {
        attrs.set(name, value);
    }

    let retagged = match kind {
        BlockKind::Paragraph => Block::Paragraph { content, attrs },
        BlockKind::Heading { level } => Block::Heading {
            level: level.clamp(1, MAX_HEADING_LEVEL),
            content,
            attrs,
        },
        _ => return false,
    };

    if *block == retagged {
        return false;
    }
    *block = retagged;
    true
}

fn retype_list(block: &mut Block, ordered: bool) -> bool {
    let is_ordered = matches!(block, Block::OrderedList { .. });
    if is_ordered == ordered {
        return false;
    }
    if let Block::BulletList { items, attrs } | Block::OrderedList { items, attrs } = block {
        let items = std::mem::take(items);
        let attrs = std::mem::take(attrs);
        *block = if ordered {
            Block::OrderedList { items, attrs }
        } else {
            Block::BulletList { items, attrs }
        };
        return true;
    }
    false
}

/// Replace the textblock at `path` with `f(textblock)`
fn wrap(doc: &mut Document, path: &NodePath, f: impl FnOnce(Block) -> Block) -> bool {
    let Some((container, index)) = container_mut(doc, path) else {
        return false;
    };
    if !container[index].is_textblock() {
        return false;
    }
    let textblock = std::mem::replace(&mut container[index], Block::empty_paragraph());
    container[index] = f(textblock);
    true
}

fn insert_text(state: &mut EditorState, text: &str) -> Result<Applied, CommandError> {
    if text.is_empty() {
        return Ok(Applied::unchanged());
    }
    let Some((path, start, end)) = edit_range(state) else {
        return Ok(Applied::unchanged());
    };

    let stored = state.stored_marks.take();
    let marks = match stored {
        Some(stored) if start == end => stored,
        _ => content_at(&state.doc, &path)
            .map(|content| marks_at(content, start))
            .unwrap_or_default(),
    };

    let node = Inline::Text {
        text: text.to_string(),
        marks,
    };
    let remap = replace_inline(&mut state.doc, &path, start, end, vec![node])?;
    state.selection = Some(Selection::collapsed(Position::new(
        path,
        start + text.chars().count(),
    )));

    Ok(Applied::changed(vec![remap]))
}

fn insert_image(state: &mut EditorState, image: Image) -> Result<Applied, CommandError> {
    if is_local_reference(&image.src) {
        return Err(CommandError::LocalReference(image.src));
    }

    match edit_range(state) {
        Some((path, start, end)) => {
            let remap = replace_inline(&mut state.doc, &path, start, end, vec![Inline::Image(image)])?;
            state.selection = Some(Selection::collapsed(Position::new(path, start + 1)));
            Ok(Applied::changed(vec![remap]))
        }
        None => Ok(append_image(state, image)),
    }
}

/// Insert an image at a position held outside the selection (an upload
/// anchor). Falls back to a new paragraph at the end of the document when
/// the position no longer resolves.
pub(crate) fn insert_image_at(
    state: &mut EditorState,
    at: Option<&Position>,
    image: Image,
) -> Result<Applied, CommandError> {
    if is_local_reference(&image.src) {
        return Err(CommandError::LocalReference(image.src));
    }

    match at.filter(|position| position.resolves(&state.doc)) {
        Some(position) => {
            let remap = replace_inline(
                &mut state.doc,
                &position.path,
                position.offset,
                position.offset,
                vec![Inline::Image(image)],
            )?;
            state.map_selection(std::slice::from_ref(&remap));
            Ok(Applied::changed(vec![remap]))
        }
        None => Ok(append_image(state, image)),
    }
}

fn append_image(state: &mut EditorState, image: Image) -> Applied {
    let index = state.doc.blocks.len();
    state.doc.blocks.push(Block::paragraph(vec![Inline::Image(image)]));
    state.ensure_selection();
    Applied::changed(vec![Remap::BlockInserted {
        container: NodePath::root(),
        index,
    }])
}

fn insert_table(state: &mut EditorState, rows: usize, cols: usize) -> Applied {
    if rows == 0 || cols == 0 {
        return Applied::unchanged();
    }

    let (container, index) = state
        .selection
        .as_ref()
        .and_then(|selection| selection.head.path.split_last_block())
        .map(|(container, index)| (container, index + 1))
        .unwrap_or_else(|| (NodePath::root(), state.doc.blocks.len()));

    let Some(blocks) = block_list_mut(&mut state.doc, &container) else {
        return Applied::unchanged();
    };
    let index = index.min(blocks.len());
    blocks.insert(index, Block::Table(Table::new(rows, cols)));

    let first_cell = container
        .child(Step::Block(index))
        .child(Step::Cell { row: 0, col: 0 })
        .child(Step::Block(0));
    state.selection = Some(Selection::collapsed(Position::new(first_cell, 0)));
    state.stored_marks = None;

    Applied::changed(vec![Remap::BlockInserted { container, index }])
}

#[derive(Debug, Clone, Copy)]
enum TableOp {
    AddRow { after: bool },
    DeleteRow,
    AddColumn { after: bool },
    DeleteColumn,
    ToggleHeaderRow,
    ToggleHeaderColumn,
}

fn table_command(state: &mut EditorState, op: TableOp) -> Applied {
    let Some(head) = state.selection.as_ref().map(|selection| selection.head.clone()) else {
        return Applied::unchanged();
    };
    let Some((table_path, row, col)) = head.path.enclosing_cell() else {
        return Applied::unchanged();
    };
    let Some(Block::Table(table)) = block_at_mut(&mut state.doc, &table_path) else {
        return Applied::unchanged();
    };
    if table.cell(row, col).is_none() {
        return Applied::unchanged();
    }

    let table_ref = table_path.clone();
    let (changed, remap) = match op {
        TableOp::AddRow { after } => {
            let index = if after { row + 1 } else { row };
            (table.insert_row(index), Some(Remap::RowInserted { table: table_ref, index }))
        }
        TableOp::DeleteRow => (table.remove_row(row), Some(Remap::RowRemoved { table: table_ref, index: row })),
        TableOp::AddColumn { after } => {
            let index = if after { col + 1 } else { col };
            (table.insert_column(index), Some(Remap::ColumnInserted { table: table_ref, index }))
        }
        TableOp::DeleteColumn => (
            table.remove_column(col),
            Some(Remap::ColumnRemoved { table: table_ref, index: col }),
        ),
        TableOp::ToggleHeaderRow => (table.toggle_header_row(), None),
        TableOp::ToggleHeaderColumn => (table.toggle_header_column(), None),
    };
    if !changed {
        return Applied::unchanged();
    }

    let emptied = table.is_empty();
    let mut remaps: Vec<Remap> = remap.into_iter().collect();

    if emptied {
        // An empty grid cannot hold a cursor; the node goes away
        if let Some((container, index)) = table_path.split_last_block() {
            if let Some(blocks) = block_list_mut(&mut state.doc, &container) {
                blocks.remove(index);
                debug!(?table_path, "Removed empty table");
                remaps.push(Remap::BlockRemoved { container, index });
            }
        }
        if state.doc.blocks.is_empty() {
            // Keep somewhere to type, as a new editor has
            state.doc.blocks.push(Block::empty_paragraph());
            remaps.push(Remap::BlockInserted {
                container: NodePath::root(),
                index: 0,
            });
        }
    }

    state.map_selection_in_table(&remaps, (!emptied).then_some((&table_path, row, col)));
    Applied::changed(remaps)
}

impl EditorState {
    /// Like [`EditorState::map_selection`], but a selection lost with a
    /// deleted row or column moves to the nearest surviving cell
    fn map_selection_in_table(&mut self, remaps: &[Remap], table: Option<(&NodePath, usize, usize)>) {
        let mut selection = self.selection.take();
        for remap in remaps {
            selection = selection.and_then(|s| s.map(remap));
        }
        self.selection = selection.filter(|s| s.anchor.resolves(&self.doc) && s.head.resolves(&self.doc));

        if self.selection.is_none() {
            if let Some((table_path, row, col)) = table {
                self.selection = nearest_cell(&self.doc, table_path, row, col)
                    .map(|path| Selection::collapsed(Position::new(path, 0)));
            }
        }
        self.ensure_selection();
    }
}

fn nearest_cell(doc: &Document, table_path: &NodePath, row: usize, col: usize) -> Option<NodePath> {
    let Some(Block::Table(table)) = block_at(doc, table_path) else {
        return None;
    };
    let row = row.min(table.row_count().checked_sub(1)?);
    let cells = &table.rows.get(row)?.cells;
    let col = col.min(cells.len().checked_sub(1)?);
    let cell_path = table_path.child(Step::Cell { row, col });
    first_textblock_in(&cell_path, &cells.get(col)?.blocks)
}
