//! # Positions and Selections
//!
//! A position addresses a textblock by a path of steps from the document root
//! plus an offset into its inline content. Offsets count characters of text
//! and one unit for every other inline node.
//!
//! Paths are interpreted against the block tree:
//!
//! - `Block(i)` selects the i-th block of the current block list
//! - `Item(i)` enters the i-th item of a list
//! - `Cell { row, col }` enters a table cell
//!
//! Blockquotes are entered directly with another `Block` step.
//!
//! Edits that move content report a [`Remap`]; positions held outside the
//! document (the selection, upload anchors) are mapped through it so they
//! keep pointing at the same place.

use folio_markup::inline::content_len;
use folio_markup::{Block, Document};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    Block(usize),
    Item(usize),
    Cell { row: usize, col: usize },
}

/// Path from the document root to a block
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath(pub Vec<Step>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of a top-level block
    pub fn block(index: usize) -> Self {
        Self(vec![Step::Block(index)])
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn child(&self, step: Step) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Split into the enclosing block list and the index inside it
    pub fn split_last_block(&self) -> Option<(NodePath, usize)> {
        match self.0.split_last()? {
            (Step::Block(index), rest) => Some((NodePath(rest.to_vec()), *index)),
            _ => None,
        }
    }

    /// Innermost table cell on the path: `(table path, row, col)`
    pub fn enclosing_cell(&self) -> Option<(NodePath, usize, usize)> {
        let pos = self.0.iter().rposition(|step| matches!(step, Step::Cell { .. }))?;
        match self.0[pos] {
            Step::Cell { row, col } => Some((NodePath(self.0[..pos].to_vec()), row, col)),
            _ => None,
        }
    }

    /// Innermost list holding this block directly: `(list path, item)`
    pub fn enclosing_list_item(&self) -> Option<(NodePath, usize)> {
        match self.0.as_slice() {
            [list @ .., Step::Item(item), Step::Block(_)] => Some((NodePath(list.to_vec()), *item)),
            _ => None,
        }
    }

    /// Path of the blockquote holding this block directly
    pub fn enclosing_quote(&self, doc: &Document) -> Option<NodePath> {
        let (container, _) = self.split_last_block()?;
        match block_at(doc, &container)? {
            Block::Blockquote { .. } => Some(container),
            _ => None,
        }
    }
}

/// Point inside a textblock
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub path: NodePath,
    pub offset: usize,
}

impl Position {
    pub fn new(path: NodePath, offset: usize) -> Self {
        Self { path, offset }
    }

    /// Whether the position addresses an existing textblock offset
    pub fn resolves(&self, doc: &Document) -> bool {
        block_at(doc, &self.path)
            .and_then(Block::content)
            .is_some_and(|content| self.offset <= content_len(content))
    }

    /// Map through an edit. `None` when the addressed content was removed.
    pub fn map(&self, remap: &Remap) -> Option<Position> {
        let steps = &self.path.0;

        match remap {
            Remap::Replaced {
                path,
                start,
                end,
                inserted,
            } => {
                if &self.path != path {
                    return Some(self.clone());
                }
                let offset = if self.offset >= *end {
                    self.offset - (end - start) + inserted
                } else if self.offset > *start {
                    start + inserted
                } else {
                    self.offset
                };
                Some(Position::new(self.path.clone(), offset))
            }

            Remap::BlockInserted { container, index } => {
                self.map_step(container, |step| match step {
                    Step::Block(k) if k >= *index => Some(Step::Block(k + 1)),
                    other => Some(other),
                })
            }

            Remap::BlockRemoved { container, index } => {
                self.map_step(container, |step| match step {
                    Step::Block(k) if k == *index => None,
                    Step::Block(k) if k > *index => Some(Step::Block(k - 1)),
                    other => Some(other),
                })
            }

            Remap::Wrapped { path, inner } => {
                if !self.path.starts_with(path) {
                    return Some(self.clone());
                }
                let mut mapped = path.0.clone();
                mapped.extend_from_slice(inner);
                mapped.extend_from_slice(&steps[path.0.len()..]);
                Some(Position::new(NodePath(mapped), self.offset))
            }

            Remap::RowInserted { table, index } => self.map_step(table, |step| match step {
                Step::Cell { row, col } if row >= *index => Some(Step::Cell { row: row + 1, col }),
                other => Some(other),
            }),

            Remap::RowRemoved { table, index } => self.map_step(table, |step| match step {
                Step::Cell { row, .. } if row == *index => None,
                Step::Cell { row, col } if row > *index => Some(Step::Cell { row: row - 1, col }),
                other => Some(other),
            }),

            Remap::ColumnInserted { table, index } => self.map_step(table, |step| match step {
                Step::Cell { row, col } if col >= *index => Some(Step::Cell { row, col: col + 1 }),
                other => Some(other),
            }),

            Remap::ColumnRemoved { table, index } => self.map_step(table, |step| match step {
                Step::Cell { col, .. } if col == *index => None,
                Step::Cell { row, col } if col > *index => Some(Step::Cell { row, col: col - 1 }),
                other => Some(other),
            }),
        }
    }

    /// Rewrite the step right below `prefix`, if the path passes through it
    fn map_step(&self, prefix: &NodePath, f: impl FnOnce(Step) -> Option<Step>) -> Option<Position> {
        let depth = prefix.0.len();
        if !self.path.starts_with(prefix) || self.path.0.len() <= depth {
            return Some(self.clone());
        }
        let mut steps = self.path.0.clone();
        steps[depth] = f(steps[depth])?;
        Some(Position::new(NodePath(steps), self.offset))
    }
}

/// Structural effect of an edit, used to keep positions valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remap {
    /// Inline content `start..end` of a textblock was replaced by `inserted` units
    Replaced {
        path: NodePath,
        start: usize,
        end: usize,
        inserted: usize,
    },
    BlockInserted { container: NodePath, index: usize },
    BlockRemoved { container: NodePath, index: usize },
    /// The block at `path` now sits below `inner` extra steps
    Wrapped { path: NodePath, inner: Vec<Step> },
    RowInserted { table: NodePath, index: usize },
    RowRemoved { table: NodePath, index: usize },
    ColumnInserted { table: NodePath, index: usize },
    ColumnRemoved { table: NodePath, index: usize },
}

/// Anchor and head positions; collapsed when both are equal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
}

impl Selection {
    pub fn new(anchor: Position, head: Position) -> Self {
        Self { anchor, head }
    }

    pub fn collapsed(position: Position) -> Self {
        Self {
            anchor: position.clone(),
            head: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Map both ends; a lost end collapses onto the surviving one
    pub fn map(&self, remap: &Remap) -> Option<Selection> {
        match (self.anchor.map(remap), self.head.map(remap)) {
            (Some(anchor), Some(head)) => Some(Selection::new(anchor, head)),
            (Some(only), None) | (None, Some(only)) => Some(Selection::collapsed(only)),
            (None, None) => None,
        }
    }

    /// Ends in document order
    pub fn ordered(&self, doc: &Document) -> (Position, Position) {
        let paths = textblock_paths(doc);
        let rank = |position: &Position| {
            (
                paths.iter().position(|path| *path == position.path),
                position.offset,
            )
        };
        if rank(&self.anchor) <= rank(&self.head) {
            (self.anchor.clone(), self.head.clone())
        } else {
            (self.head.clone(), self.anchor.clone())
        }
    }

    /// Per-textblock `(path, start, end)` segments covered by the selection
    pub fn segments(&self, doc: &Document) -> Vec<(NodePath, usize, usize)> {
        let (from, to) = self.ordered(doc);
        if from.path == to.path {
            return vec![(from.path, from.offset, to.offset)];
        }

        let paths = textblock_paths(doc);
        let (Some(first), Some(last)) = (
            paths.iter().position(|path| *path == from.path),
            paths.iter().position(|path| *path == to.path),
        ) else {
            return Vec::new();
        };

        paths[first..=last]
            .iter()
            .map(|path| {
                let len = block_at(doc, path).and_then(Block::content).map(|c| content_len(c)).unwrap_or(0);
                let start = if *path == from.path { from.offset } else { 0 };
                let end = if *path == to.path { to.offset } else { len };
                (path.clone(), start, end)
            })
            .collect()
    }
}

/// Block at `path`
pub fn block_at<'a>(doc: &'a Document, path: &NodePath) -> Option<&'a Block> {
    resolve(&doc.blocks, &path.0)
}

fn resolve<'a>(blocks: &'a [Block], steps: &[Step]) -> Option<&'a Block> {
    let (Step::Block(index), rest) = steps.split_first()? else {
        return None;
    };
    let block = blocks.get(*index)?;
    if rest.is_empty() {
        return Some(block);
    }

    match (block, rest) {
        (Block::BulletList { items, .. } | Block::OrderedList { items, .. }, [Step::Item(item), rest @ ..]) => {
            resolve(&items.get(*item)?.blocks, rest)
        }
        (Block::Blockquote { blocks, .. }, rest) => resolve(blocks, rest),
        (Block::Table(table), [Step::Cell { row, col }, rest @ ..]) => {
            resolve(&table.cell(*row, *col)?.blocks, rest)
        }
        _ => None,
    }
}

pub fn block_at_mut<'a>(doc: &'a mut Document, path: &NodePath) -> Option<&'a mut Block> {
    let (container, index) = container_mut(doc, path)?;
    container.get_mut(index)
}

/// Block list holding the block at `path`, with the block's index in it
pub fn container_mut<'a>(doc: &'a mut Document, path: &NodePath) -> Option<(&'a mut Vec<Block>, usize)> {
    resolve_container(&mut doc.blocks, &path.0)
}

fn resolve_container<'a>(blocks: &'a mut Vec<Block>, steps: &[Step]) -> Option<(&'a mut Vec<Block>, usize)> {
    let (Step::Block(index), rest) = steps.split_first()? else {
        return None;
    };
    let index = *index;
    if rest.is_empty() {
        return (index < blocks.len()).then_some((blocks, index));
    }

    match (blocks.get_mut(index)?, rest) {
        (Block::BulletList { items, .. } | Block::OrderedList { items, .. }, [Step::Item(item), rest @ ..]) => {
            resolve_container(&mut items.get_mut(*item)?.blocks, rest)
        }
        (Block::Blockquote { blocks, .. }, rest) => resolve_container(blocks, rest),
        (Block::Table(table), [Step::Cell { row, col }, rest @ ..]) => {
            resolve_container(&mut table.cell_mut(*row, *col)?.blocks, rest)
        }
        _ => None,
    }
}

/// Block list addressed by a container path (`root()` is the document itself)
pub fn block_list_mut<'a>(doc: &'a mut Document, container: &NodePath) -> Option<&'a mut Vec<Block>> {
    if container.0.is_empty() {
        return Some(&mut doc.blocks);
    }
    let (parent, rest) = match container.0.split_last()? {
        (Step::Block(_), _) => (container.clone(), None),
        (step, prefix) => (NodePath(prefix.to_vec()), Some(*step)),
    };

    match (block_at_mut(doc, &parent)?, rest) {
        (Block::Blockquote { blocks, .. }, None) => Some(blocks),
        (Block::BulletList { items, .. } | Block::OrderedList { items, .. }, Some(Step::Item(item))) => {
            Some(&mut items.get_mut(item)?.blocks)
        }
        (Block::Table(table), Some(Step::Cell { row, col })) => Some(&mut table.cell_mut(row, col)?.blocks),
        _ => None,
    }
}

/// Paths of every textblock in document order
pub fn textblock_paths(doc: &Document) -> Vec<NodePath> {
    let mut paths = Vec::new();
    collect_textblocks(&doc.blocks, &mut Vec::new(), &mut paths);
    paths
}

/// First textblock inside `blocks`, which live under `container`
pub fn first_textblock_in(container: &NodePath, blocks: &[Block]) -> Option<NodePath> {
    let mut paths = Vec::new();
    collect_textblocks(blocks, &mut container.0.clone(), &mut paths);
    paths.into_iter().next()
}

fn collect_textblocks(blocks: &[Block], prefix: &mut Vec<Step>, out: &mut Vec<NodePath>) {
    for (index, block) in blocks.iter().enumerate() {
        prefix.push(Step::Block(index));
        match block {
            Block::Paragraph { .. } | Block::Heading { .. } => out.push(NodePath(prefix.clone())),
            Block::BulletList { items, .. } | Block::OrderedList { items, .. } => {
                for (item_index, item) in items.iter().enumerate() {
                    prefix.push(Step::Item(item_index));
                    collect_textblocks(&item.blocks, prefix, out);
                    prefix.pop();
                }
            }
            Block::Blockquote { blocks, .. } => collect_textblocks(blocks, prefix, out),
            Block::Table(table) => {
                for (row_index, row) in table.rows.iter().enumerate() {
                    for (col_index, cell) in row.cells.iter().enumerate() {
                        prefix.push(Step::Cell {
                            row: row_index,
                            col: col_index,
                        });
                        collect_textblocks(&cell.blocks, prefix, out);
                        prefix.pop();
                    }
                }
            }
            Block::HorizontalRule { .. } | Block::Opaque { .. } => {}
        }
        prefix.pop();
    }
}
