//! # Table Node
//!
//! Grid of rows and cells. Every operation is coordinate based and returns
//! `false` instead of failing when the coordinates fall outside the grid.
//!
//! Header toggling only flips `TableCell::header`; cell content is never
//! reshaped. Removing the last row or column leaves an empty table, which the
//! owner of the table is expected to delete (see [`Table::is_empty`]).

use serde::{Deserialize, Serialize};

use crate::ast::{Attributes, Block};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub attrs: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub header: bool,
    pub blocks: Vec<Block>,
    /// colspan, rowspan and anything else outside the contract
    #[serde(default)]
    pub attrs: Attributes,
}

impl TableCell {
    /// Cell holding one empty paragraph
    pub fn empty(header: bool) -> Self {
        Self {
            header,
            blocks: vec![Block::empty_paragraph()],
            attrs: Attributes::new(),
        }
    }
}

impl Table {
    /// `rows` × `cols` grid of empty data cells
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: (0..rows)
                .map(|_| TableRow {
                    cells: (0..cols).map(|_| TableCell::empty(false)).collect(),
                })
                .collect(),
            attrs: Attributes::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row (parsed tables may be ragged)
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).max().unwrap_or(0)
    }

    /// No rows or no columns left
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0 || self.column_count() == 0
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row)?.cells.get(col)
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.rows.get_mut(row)?.cells.get_mut(col)
    }

    pub fn is_header_row(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .map(|r| !r.cells.is_empty() && r.cells.iter().all(|c| c.header))
            .unwrap_or(false)
    }

    pub fn is_header_column(&self, col: usize) -> bool {
        let mut cells = self.rows.iter().filter_map(|r| r.cells.get(col)).peekable();
        cells.peek().is_some() && cells.all(|c| c.header)
    }

    /// Insert a row so that it ends up at index `at` (`at == row_count()` appends)
    pub fn insert_row(&mut self, at: usize) -> bool {
        if at > self.row_count() || self.column_count() == 0 {
            return false;
        }

        let cells = (0..self.column_count())
            .map(|col| TableCell::empty(self.is_header_column(col)))
            .collect();
        self.rows.insert(at, TableRow { cells });
        true
    }

    pub fn remove_row(&mut self, index: usize) -> bool {
        if index >= self.row_count() {
            return false;
        }
        self.rows.remove(index);
        true
    }

    /// Insert a column so that it ends up at index `at` in every row
    pub fn insert_column(&mut self, at: usize) -> bool {
        if at > self.column_count() || self.row_count() == 0 {
            return false;
        }

        let header_rows: Vec<bool> = (0..self.row_count()).map(|r| self.is_header_row(r)).collect();
        for (row, header) in self.rows.iter_mut().zip(header_rows) {
            let at = at.min(row.cells.len());
            row.cells.insert(at, TableCell::empty(header));
        }
        true
    }

    pub fn remove_column(&mut self, index: usize) -> bool {
        if index >= self.column_count() {
            return false;
        }
        for row in &mut self.rows {
            if index < row.cells.len() {
                row.cells.remove(index);
            }
        }
        true
    }

    /// Flip the header flag of the first row
    pub fn toggle_header_row(&mut self) -> bool {
        let header = !self.is_header_row(0);
        match self.rows.first_mut() {
            Some(row) if !row.cells.is_empty() => {
                for cell in &mut row.cells {
                    cell.header = header;
                }
                true
            }
            _ => false,
        }
    }

    /// Flip the header flag of the first column
    pub fn toggle_header_column(&mut self) -> bool {
        if self.column_count() == 0 {
            return false;
        }
        let header = !self.is_header_column(0);
        for cell in self.rows.iter_mut().filter_map(|r| r.cells.first_mut()) {
            cell.header = header;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_shape() {
        let table = Table::new(2, 3);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 3);
        assert!(!table.is_header_row(0));
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let mut table = Table::new(2, 2);
        let before = table.clone();
        assert!(!table.insert_row(5));
        assert!(!table.remove_row(2));
        assert!(!table.insert_column(3));
        assert!(!table.remove_column(9));
        assert_eq!(table, before);
    }

    #[test]
    fn test_remove_last_row_empties_table() {
        let mut table = Table::new(1, 2);
        assert!(table.remove_row(0));
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_column_from_zero_column_table() {
        let mut table = Table::new(2, 0);
        assert!(!table.remove_column(0));
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_header_toggle_keeps_content() {
        let mut table = Table::new(2, 2);
        table.rows[0].cells[1].blocks = vec![Block::paragraph(vec![crate::Inline::text("Name")])];
        let content_before = table.rows[0].cells[1].blocks.clone();

        assert!(table.toggle_header_row());
        assert!(table.is_header_row(0));
        assert_eq!(table.rows[0].cells[1].blocks, content_before);
        assert_eq!(table.rows[0].cells.len(), 2);

        assert!(table.toggle_header_row());
        assert!(!table.is_header_row(0));
    }

    #[test]
    fn test_new_cells_extend_headers() {
        let mut table = Table::new(2, 2);
        table.toggle_header_row();
        table.toggle_header_column();

        assert!(table.insert_column(2));
        assert!(table.cell(0, 2).unwrap().header);
        assert!(!table.cell(1, 2).unwrap().header);

        assert!(table.insert_row(2));
        assert!(table.cell(2, 0).unwrap().header);
        assert!(!table.cell(2, 1).unwrap().header);
    }
}
