//! Screen model for terminal emulation.
//!
//! The Screen maintains the visible grid of cells, the cursor, the
//! scroll region, the current drawing attributes, and per-row dirty
//! flags for incremental repaint. Rows that scroll out of the region
//! are returned to the caller (the parser archives them); the screen
//! itself never touches the scrollback store.

use crate::cell::{Attributes, Cell, CellFlags};
use crate::cursor::Cursor;
use crate::line::Line;
use serde::{Deserialize, Serialize};

/// Inclusive row range affected by scrolling operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollRegion {
    pub top: usize,
    pub bottom: usize,
}

impl ScrollRegion {
    pub fn new(top: usize, bottom: usize) -> Self {
        ScrollRegion { top, bottom }
    }

    pub fn full(rows: usize) -> Self {
        ScrollRegion {
            top: 0,
            bottom: rows.saturating_sub(1),
        }
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.top && row <= self.bottom
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top + 1
    }
}

#[derive(Debug, Clone)]
pub struct Screen {
    cols: usize,
    rows: usize,
    grid: Vec<Line>,
    cursor: Cursor,
    scroll_region: ScrollRegion,
    dirty: Vec<bool>,

    /// Current drawing attributes, inherited by new writes
    pub attrs: Attributes,
}

impl Screen {
    pub fn new(cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Screen {
            cols,
            rows,
            grid: (0..rows).map(|_| Line::new(cols)).collect(),
            cursor: Cursor::new(),
            scroll_region: ScrollRegion::full(rows),
            dirty: vec![true; rows],
            attrs: Attributes::default(),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    pub fn scroll_region(&self) -> &ScrollRegion {
        &self.scroll_region
    }

    pub fn line(&self, row: usize) -> Option<&Line> {
        self.grid.get(row)
    }

    /// Cell copy accessor; out-of-bounds reads return a default cell
    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.grid
            .get(row)
            .and_then(|line| line.get(col))
            .copied()
            .unwrap_or_default()
    }

    // --- dirty tracking ---

    pub fn is_dirty(&self, row: usize) -> bool {
        self.dirty.get(row).copied().unwrap_or(false)
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.iter_mut().for_each(|d| *d = false);
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty.iter_mut().for_each(|d| *d = true);
    }

    fn mark_dirty(&mut self, row: usize) {
        if let Some(d) = self.dirty.get_mut(row) {
            *d = true;
        }
    }

    fn mark_range_dirty(&mut self, start: usize, end: usize) {
        for row in start..=end.min(self.rows.saturating_sub(1)) {
            self.mark_dirty(row);
        }
    }

    // --- writing ---

    /// Place a character at the cursor with the current attributes and
    /// advance, wrapping to column 0 of the next row on overflow and
    /// scrolling the region if past its bottom. Returns any rows scrolled
    /// out of the region so the caller can archive them.
    pub fn write_char(&mut self, c: char) -> Vec<Line> {
        use unicode_width::UnicodeWidthChar;

        let width = c.width().unwrap_or(0);
        if width == 0 {
            return Vec::new();
        }

        let mut displaced = Vec::new();
        if self.cursor.col + width > self.cols {
            self.cursor.col = 0;
            displaced = self.linefeed();
        }

        let row = self.cursor.row;
        let col = self.cursor.col;
        let mut cell = Cell::with_attrs(c, &self.attrs);
        if width == 2 {
            cell.flags.insert(CellFlags::WIDE);
        }
        self.grid[row].set(col, cell);
        if width == 2 && col + 1 < self.cols {
            let mut spacer = Cell::with_attrs(' ', &self.attrs);
            spacer.flags.insert(CellFlags::WIDE_SPACER);
            self.grid[row].set(col + 1, spacer);
        }
        self.mark_dirty(row);

        self.cursor.col += width;
        if self.cursor.col >= self.cols {
            self.cursor.col = 0;
            displaced.extend(self.linefeed());
        }
        displaced
    }

    /// Move the cursor down one row, scrolling the region when it is at
    /// the region bottom. Returns any rows scrolled out.
    pub fn linefeed(&mut self) -> Vec<Line> {
        if self.cursor.row == self.scroll_region.bottom {
            self.scroll_up(1)
        } else {
            if self.cursor.row + 1 < self.rows {
                self.cursor.row += 1;
            }
            Vec::new()
        }
    }

    /// Move the cursor up one row, scrolling the region down when the
    /// cursor is at the region top (reverse index).
    pub fn reverse_linefeed(&mut self) {
        if self.cursor.row == self.scroll_region.top {
            self.scroll_down(1);
        } else if self.cursor.row > 0 {
            self.cursor.row -= 1;
        }
    }

    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
    }

    pub fn backspace(&mut self) {
        if self.cursor.col > 0 {
            self.cursor.col -= 1;
        }
    }

    /// Advance to the next multiple-of-8 column, clamped to the last column
    pub fn tab(&mut self) {
        let next = (self.cursor.col / 8 + 1) * 8;
        self.cursor.col = next.min(self.cols - 1);
    }

    // --- scrolling ---

    /// Shift rows `[top+n, bottom]` up into `[top, bottom-n]`, filling the
    /// vacated bottom rows with default cells. Returns copies of the rows
    /// pushed out of the region. Rows outside the region are untouched.
    pub fn scroll_up(&mut self, n: usize) -> Vec<Line> {
        let ScrollRegion { top, bottom } = self.scroll_region;
        if n == 0 || top > bottom {
            return Vec::new();
        }
        let n = n.min(bottom - top + 1);

        let displaced: Vec<Line> = self.grid[top..top + n].to_vec();
        for row in top..=bottom {
            self.grid[row] = if row + n <= bottom {
                self.grid[row + n].clone()
            } else {
                Line::new(self.cols)
            };
        }
        self.mark_range_dirty(top, bottom);
        displaced
    }

    /// Symmetric to [`Self::scroll_up`]; rows falling off the region top
    /// are discarded.
    pub fn scroll_down(&mut self, n: usize) {
        let ScrollRegion { top, bottom } = self.scroll_region;
        if n == 0 || top > bottom {
            return;
        }
        let n = n.min(bottom - top + 1);

        for row in (top..=bottom).rev() {
            self.grid[row] = if row >= top + n {
                self.grid[row - n].clone()
            } else {
                Line::new(self.cols)
            };
        }
        self.mark_range_dirty(top, bottom);
    }

    // --- cursor movement (always clamped) ---

    pub fn move_to(&mut self, row: usize, col: usize) {
        self.cursor.row = row.min(self.rows - 1);
        self.cursor.col = col.min(self.cols - 1);
    }

    pub fn move_up(&mut self, n: usize) {
        self.cursor.row = self.cursor.row.saturating_sub(n);
    }

    pub fn move_down(&mut self, n: usize) {
        self.cursor.row = (self.cursor.row + n).min(self.rows - 1);
    }

    pub fn move_forward(&mut self, n: usize) {
        self.cursor.col = (self.cursor.col + n).min(self.cols - 1);
    }

    pub fn move_backward(&mut self, n: usize) {
        self.cursor.col = self.cursor.col.saturating_sub(n);
    }

    pub fn move_to_col(&mut self, col: usize) {
        self.cursor.col = col.min(self.cols - 1);
    }

    pub fn move_to_row(&mut self, row: usize) {
        self.cursor.row = row.min(self.rows - 1);
    }

    // --- erasing ---

    /// Erase part of the display: mode 0 = cursor to end, 1 = start to
    /// cursor (inclusive), 2 = whole screen. Other modes are ignored.
    pub fn erase_in_display(&mut self, mode: u16) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        let bg = self.attrs.bg;

        match mode {
            0 => {
                let cols = self.cols;
                self.grid[row].clear_range_with_bg(col, cols, bg);
                for r in (row + 1)..self.rows {
                    self.grid[r].clear_with_bg(bg);
                }
                self.mark_range_dirty(row, self.rows - 1);
            }
            1 => {
                for r in 0..row {
                    self.grid[r].clear_with_bg(bg);
                }
                self.grid[row].clear_range_with_bg(0, col + 1, bg);
                self.mark_range_dirty(0, row);
            }
            2 => {
                for r in 0..self.rows {
                    self.grid[r].clear_with_bg(bg);
                }
                self.mark_all_dirty();
            }
            _ => {}
        }
    }

    /// Erase part of the cursor's line; same modes as `erase_in_display`
    pub fn erase_in_line(&mut self, mode: u16) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        let cols = self.cols;
        let bg = self.attrs.bg;

        match mode {
            0 => self.grid[row].clear_range_with_bg(col, cols, bg),
            1 => self.grid[row].clear_range_with_bg(0, col + 1, bg),
            2 => self.grid[row].clear_with_bg(bg),
            _ => return,
        }
        self.mark_dirty(row);
    }

    /// Erase `n` characters at the cursor without shifting the rest
    pub fn erase_chars(&mut self, n: usize) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        let end = (col + n).min(self.cols);
        let bg = self.attrs.bg;
        self.grid[row].clear_range_with_bg(col, end, bg);
        self.mark_dirty(row);
    }

    // --- intra-row shifting ---

    pub fn insert_chars(&mut self, n: usize) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        self.grid[row].insert_cells(col, n);
        self.mark_dirty(row);
    }

    pub fn delete_chars(&mut self, n: usize) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        self.grid[row].delete_cells(col, n);
        self.mark_dirty(row);
    }

    // --- line insertion/deletion (scroll pinned at the cursor row) ---

    /// Insert `n` blank lines at the cursor row, pushing lines below it
    /// toward the region bottom. No-op when the cursor is outside the
    /// scroll region.
    pub fn insert_lines(&mut self, n: usize) {
        let row = self.cursor.row;
        let bottom = self.scroll_region.bottom;
        if !self.scroll_region.contains(row) {
            return;
        }
        let n = n.min(bottom - row + 1);
        for _ in 0..n {
            self.grid.remove(bottom);
            self.grid.insert(row, Line::new(self.cols));
        }
        self.mark_range_dirty(row, bottom);
    }

    /// Delete `n` lines at the cursor row, pulling lines below it up and
    /// backfilling the region bottom. No-op outside the scroll region.
    pub fn delete_lines(&mut self, n: usize) {
        let row = self.cursor.row;
        let bottom = self.scroll_region.bottom;
        if !self.scroll_region.contains(row) {
            return;
        }
        let n = n.min(bottom - row + 1);
        for _ in 0..n {
            self.grid.remove(row);
            self.grid.insert(bottom, Line::new(self.cols));
        }
        self.mark_range_dirty(row, bottom);
    }

    // --- region / geometry ---

    /// Set the scroll region (0-indexed, inclusive) and home the cursor.
    /// Ignored unless `top < bottom` after clamping.
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let top = top.min(self.rows - 1);
        let bottom = bottom.min(self.rows - 1);
        if top < bottom {
            self.scroll_region = ScrollRegion::new(top, bottom);
            self.move_to(0, 0);
        }
    }

    pub fn reset_scroll_region(&mut self) {
        self.scroll_region = ScrollRegion::full(self.rows);
    }

    /// Rebuild the grid at the new size, copying the overlapping top-left
    /// region. Content outside the new bounds is lost; the scroll region
    /// resets to the full screen and every row is marked dirty.
    pub fn resize(&mut self, new_cols: usize, new_rows: usize) {
        let new_cols = new_cols.max(1);
        let new_rows = new_rows.max(1);
        if new_cols == self.cols && new_rows == self.rows {
            return;
        }

        let mut grid: Vec<Line> = (0..new_rows).map(|_| Line::new(new_cols)).collect();
        for row in 0..self.rows.min(new_rows) {
            for col in 0..self.cols.min(new_cols) {
                if let Some(cell) = self.grid[row].get(col) {
                    grid[row].set(col, *cell);
                }
            }
        }

        self.grid = grid;
        self.cols = new_cols;
        self.rows = new_rows;
        self.scroll_region = ScrollRegion::full(new_rows);
        self.cursor.row = self.cursor.row.min(new_rows - 1);
        self.cursor.col = self.cursor.col.min(new_cols - 1);
        self.dirty = vec![true; new_rows];
    }

    /// Full reset (RIS): clear the grid, cursor, attributes, and region
    pub fn reset(&mut self) {
        for line in &mut self.grid {
            line.clear();
        }
        self.cursor = Cursor::new();
        self.attrs = Attributes::default();
        self.scroll_region = ScrollRegion::full(self.rows);
        self.mark_all_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    #[test]
    fn test_new_screen() {
        let screen = Screen::new(80, 24);
        assert_eq!(screen.cols(), 80);
        assert_eq!(screen.rows(), 24);
        assert_eq!(screen.cursor().row, 0);
        assert_eq!(screen.cursor().col, 0);
    }

    #[test]
    fn test_write_char() {
        let mut screen = Screen::new(80, 24);
        let displaced = screen.write_char('A');
        assert!(displaced.is_empty());
        assert_eq!(screen.cell(0, 0).c, 'A');
        assert_eq!(screen.cursor().col, 1);
    }

    #[test]
    fn test_write_wraps() {
        let mut screen = Screen::new(10, 5);
        for i in 0..15 {
            screen.write_char((b'A' + (i % 26) as u8) as char);
        }
        assert_eq!(screen.cursor().row, 1);
        assert_eq!(screen.cursor().col, 5);
        assert_eq!(screen.cell(1, 0).c, 'K');
    }

    #[test]
    fn test_wrap_at_bottom_scrolls() {
        let mut screen = Screen::new(4, 2);
        let mut displaced = Vec::new();
        for _ in 0..9 {
            displaced.extend(screen.write_char('x'));
        }
        // 9 writes on a 4x2 screen push one full row out
        assert_eq!(displaced.len(), 1);
        assert_eq!(displaced[0].text_content(), "xxxx");
    }

    #[test]
    fn test_wide_char() {
        let mut screen = Screen::new(80, 24);
        screen.write_char('世');
        assert_eq!(screen.cell(0, 0).c, '世');
        assert!(screen.cell(0, 0).is_wide());
        assert!(screen.cell(0, 1).is_wide_spacer());
        assert_eq!(screen.cursor().col, 2);
    }

    #[test]
    fn test_linefeed_and_scroll() {
        let mut screen = Screen::new(80, 24);
        screen.write_char('A');
        screen.move_to(23, 0);
        let displaced = screen.linefeed();
        assert_eq!(displaced.len(), 1);
        assert_eq!(displaced[0].text_content(), "A");
        assert_eq!(screen.cursor().row, 23);
    }

    #[test]
    fn test_scroll_up_returns_displaced_rows() {
        let mut screen = Screen::new(10, 4);
        for row in 0..4 {
            screen.move_to(row, 0);
            screen.write_char((b'0' + row as u8) as char);
        }
        let displaced = screen.scroll_up(2);
        assert_eq!(displaced.len(), 2);
        assert_eq!(displaced[0].text_content(), "0");
        assert_eq!(displaced[1].text_content(), "1");
        assert_eq!(screen.cell(0, 0).c, '2');
        assert_eq!(screen.cell(3, 0).c, ' ');
    }

    #[test]
    fn test_scroll_up_then_down_restores() {
        let mut screen = Screen::new(10, 6);
        screen.set_scroll_region(1, 4);
        for row in 0..6 {
            screen.move_to(row, 0);
            screen.write_char((b'a' + row as u8) as char);
        }
        screen.scroll_up(2);
        screen.scroll_down(2);
        // Rows shifted out of the region bottom were refilled blank, but
        // rows that stayed inside round-trip; pinned rows are untouched.
        assert_eq!(screen.cell(0, 0).c, 'a');
        assert_eq!(screen.cell(5, 0).c, 'f');
        assert_eq!(screen.cell(3, 0).c, 'd');
        assert_eq!(screen.cell(4, 0).c, 'e');
    }

    #[test]
    fn test_scroll_region_pins_outside_rows() {
        let mut screen = Screen::new(10, 5);
        for row in 0..5 {
            screen.move_to(row, 0);
            screen.write_char((b'0' + row as u8) as char);
        }
        screen.set_scroll_region(1, 3);
        screen.scroll_up(1);
        assert_eq!(screen.cell(0, 0).c, '0');
        assert_eq!(screen.cell(1, 0).c, '2');
        assert_eq!(screen.cell(3, 0).c, ' ');
        assert_eq!(screen.cell(4, 0).c, '4');
    }

    #[test]
    fn test_erase_in_display() {
        let mut screen = Screen::new(80, 24);
        for _ in 0..10 {
            screen.write_char('X');
        }
        screen.move_to(0, 5);
        screen.erase_in_display(0);
        assert_eq!(screen.cell(0, 4).c, 'X');
        assert_eq!(screen.cell(0, 5).c, ' ');
    }

    #[test]
    fn test_erase_in_line_modes() {
        let mut screen = Screen::new(10, 2);
        for _ in 0..10 {
            screen.write_char('X');
        }
        screen.move_to(0, 4);
        screen.erase_in_line(1);
        assert_eq!(screen.cell(0, 4).c, ' ');
        assert_eq!(screen.cell(0, 5).c, 'X');
        screen.erase_in_line(0);
        assert_eq!(screen.cell(0, 5).c, ' ');
    }

    #[test]
    fn test_erase_uses_current_bg() {
        let mut screen = Screen::new(10, 2);
        screen.write_char('X');
        screen.attrs.bg = Color::Indexed(4);
        screen.move_to(0, 0);
        screen.erase_in_line(2);
        assert_eq!(screen.cell(0, 0).bg, Color::Indexed(4));
    }

    #[test]
    fn test_insert_delete_lines_respect_region() {
        let mut screen = Screen::new(10, 5);
        for row in 0..5 {
            screen.move_to(row, 0);
            screen.write_char((b'0' + row as u8) as char);
        }
        screen.set_scroll_region(1, 3);
        // Cursor homed by set_scroll_region: row 0 is outside the region
        screen.insert_lines(1);
        assert_eq!(screen.cell(1, 0).c, '1');

        screen.move_to(1, 0);
        screen.insert_lines(1);
        assert_eq!(screen.cell(1, 0).c, ' ');
        assert_eq!(screen.cell(2, 0).c, '1');
        assert_eq!(screen.cell(4, 0).c, '4');

        screen.delete_lines(1);
        assert_eq!(screen.cell(1, 0).c, '1');
        assert_eq!(screen.cell(3, 0).c, ' ');
    }

    #[test]
    fn test_cursor_movement_clamps() {
        let mut screen = Screen::new(80, 24);
        screen.move_to(100, 200);
        assert_eq!(screen.cursor().row, 23);
        assert_eq!(screen.cursor().col, 79);

        screen.move_up(50);
        assert_eq!(screen.cursor().row, 0);

        screen.move_backward(100);
        assert_eq!(screen.cursor().col, 0);
    }

    #[test]
    fn test_tab() {
        let mut screen = Screen::new(80, 24);
        screen.tab();
        assert_eq!(screen.cursor().col, 8);
        screen.write_char('A');
        screen.tab();
        assert_eq!(screen.cursor().col, 16);
        screen.move_to(0, 78);
        screen.tab();
        assert_eq!(screen.cursor().col, 79);
    }

    #[test]
    fn test_resize_copies_overlap() {
        let mut screen = Screen::new(80, 24);
        screen.write_char('A');
        screen.set_scroll_region(2, 10);
        screen.resize(100, 30);
        assert_eq!(screen.cols(), 100);
        assert_eq!(screen.rows(), 30);
        assert_eq!(screen.cell(0, 0).c, 'A');
        assert_eq!(screen.scroll_region().top, 0);
        assert_eq!(screen.scroll_region().bottom, 29);
        assert!(screen.is_dirty(29));
    }

    #[test]
    fn test_resize_clamps_cursor() {
        let mut screen = Screen::new(80, 24);
        screen.move_to(20, 70);
        screen.resize(40, 10);
        assert_eq!(screen.cursor().row, 9);
        assert_eq!(screen.cursor().col, 39);
    }

    #[test]
    fn test_cell_out_of_bounds() {
        let screen = Screen::new(80, 24);
        assert_eq!(screen.cell(100, 200), Cell::default());
    }

    #[test]
    fn test_dirty_tracking() {
        let mut screen = Screen::new(80, 24);
        screen.clear_dirty();
        assert!(!screen.is_dirty(0));
        screen.write_char('A');
        assert!(screen.is_dirty(0));
        assert!(!screen.is_dirty(1));
        screen.mark_all_dirty();
        assert!(screen.is_dirty(23));
    }

    #[test]
    fn test_reverse_linefeed_at_top_scrolls_down() {
        let mut screen = Screen::new(10, 3);
        screen.write_char('A');
        screen.move_to(0, 0);
        screen.reverse_linefeed();
        assert_eq!(screen.cell(1, 0).c, 'A');
        assert_eq!(screen.cell(0, 0).c, ' ');
        assert_eq!(screen.cursor().row, 0);
    }

    #[test]
    fn test_reset() {
        let mut screen = Screen::new(80, 24);
        screen.write_char('A');
        screen.attrs.flags.insert(CellFlags::BOLD);
        screen.set_scroll_region(2, 10);
        screen.reset();
        assert_eq!(screen.cell(0, 0).c, ' ');
        assert!(screen.attrs.flags.is_empty());
        assert_eq!(screen.scroll_region().bottom, 23);
        assert_eq!(screen.cursor().row, 0);
    }
}
