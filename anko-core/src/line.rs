//! Line representation for the terminal grid and scrollback.
//!
//! A line is a row of cells. Lines are the unit the scrollback store
//! archives when rows scroll out of the visible region.

use crate::cell::Cell;
use crate::color::Color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    cells: Vec<Cell>,
}

impl Line {
    pub fn new(cols: usize) -> Self {
        Line {
            cells: vec![Cell::default(); cols],
        }
    }

    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Line { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    pub fn get_mut(&mut self, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(col)
    }

    pub fn set(&mut self, col: usize, cell: Cell) {
        if col < self.cells.len() {
            self.cells[col] = cell;
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.reset();
        }
    }

    pub fn clear_with_bg(&mut self, bg: Color) {
        for cell in &mut self.cells {
            cell.clear_with_bg(bg);
        }
    }

    pub fn clear_range_with_bg(&mut self, start: usize, end: usize, bg: Color) {
        let end = end.min(self.cells.len());
        for col in start..end {
            self.cells[col].clear_with_bg(bg);
        }
    }

    pub fn resize(&mut self, new_cols: usize) {
        self.cells.resize(new_cols, Cell::default());
    }

    /// Insert blank cells at `col`, shifting the rest right; cells pushed
    /// past the end of the row are dropped.
    pub fn insert_cells(&mut self, col: usize, count: usize) {
        if col >= self.cells.len() {
            return;
        }
        let count = count.min(self.cells.len() - col);
        for _ in 0..count {
            self.cells.pop();
            self.cells.insert(col, Cell::default());
        }
    }

    /// Delete cells at `col`, shifting the rest left; vacated positions at
    /// the end of the row get default cells.
    pub fn delete_cells(&mut self, col: usize, count: usize) {
        if col >= self.cells.len() {
            return;
        }
        let cols = self.cells.len();
        let count = count.min(cols - col);
        for _ in 0..count {
            self.cells.remove(col);
        }
        self.cells.resize(cols, Cell::default());
    }

    /// Plain-text content of the line, trailing whitespace trimmed
    pub fn text_content(&self) -> String {
        let mut s = String::new();
        for cell in &self.cells {
            if !cell.is_wide_spacer() {
                s.push(cell.c);
            }
        }
        s.trim_end().to_string()
    }
}
