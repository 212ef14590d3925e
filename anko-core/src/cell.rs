//! Terminal cell representation
//!
//! A cell represents a single character position in the terminal grid:
//! a codepoint (space = empty), foreground and background colors, and
//! text attributes (bold, italic, underline, etc.).

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Flags for cell text attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellFlags {
    bits: u16,
}

impl CellFlags {
    pub const NONE: u16 = 0;
    pub const BOLD: u16 = 1 << 0;
    pub const DIM: u16 = 1 << 1;
    pub const ITALIC: u16 = 1 << 2;
    pub const UNDERLINE: u16 = 1 << 3;
    pub const BLINK: u16 = 1 << 4;
    pub const REVERSE: u16 = 1 << 5;
    pub const HIDDEN: u16 = 1 << 6;
    pub const STRIKETHROUGH: u16 = 1 << 7;
    pub const WIDE: u16 = 1 << 8;
    pub const WIDE_SPACER: u16 = 1 << 9;

    pub const fn empty() -> Self {
        CellFlags { bits: Self::NONE }
    }

    pub const fn new(bits: u16) -> Self {
        CellFlags { bits }
    }

    pub fn contains(&self, flag: u16) -> bool {
        self.bits & flag != 0
    }

    pub fn set(&mut self, flag: u16, value: bool) {
        if value {
            self.bits |= flag;
        } else {
            self.bits &= !flag;
        }
    }

    pub fn insert(&mut self, flag: u16) {
        self.bits |= flag;
    }

    pub fn remove(&mut self, flag: u16) {
        self.bits &= !flag;
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

/// A single cell in the terminal grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The character stored in this cell
    pub c: char,
    /// Foreground color
    pub fg: Color,
    /// Background color
    pub bg: Color,
    /// Text attributes
    pub flags: CellFlags,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            c: ' ',
            fg: Color::Default,
            bg: Color::Default,
            flags: CellFlags::empty(),
        }
    }
}

impl Cell {
    /// Create a new cell with the given character and default styling
    pub fn new(c: char) -> Self {
        Cell {
            c,
            ..Default::default()
        }
    }

    /// Create a cell with the given character and drawing attributes
    pub fn with_attrs(c: char, attrs: &Attributes) -> Self {
        Cell {
            c,
            fg: attrs.fg,
            bg: attrs.bg,
            flags: attrs.flags,
        }
    }

    /// Check if this cell is blank (space with default colors and no attributes)
    pub fn is_blank(&self) -> bool {
        self.c == ' '
            && self.fg == Color::Default
            && self.bg == Color::Default
            && self.flags.is_empty()
    }

    /// Reset the cell to default state
    pub fn reset(&mut self) {
        *self = Cell::default();
    }

    /// Reset the cell but keep the given background (background color erase)
    pub fn clear_with_bg(&mut self, bg: Color) {
        *self = Cell {
            bg,
            ..Default::default()
        };
    }

    /// Check if this cell holds a two-column character
    pub fn is_wide(&self) -> bool {
        self.flags.contains(CellFlags::WIDE)
    }

    /// Check if this cell is the spacer half of a two-column character
    pub fn is_wide_spacer(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_SPACER)
    }
}

/// Current drawing attributes: the template new writes inherit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attributes {
    pub fg: Color,
    pub bg: Color,
    pub flags: CellFlags,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all attributes to default
    pub fn reset(&mut self) {
        *self = Attributes::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_default() {
        let cell = Cell::default();
        assert_eq!(cell.c, ' ');
        assert_eq!(cell.fg, Color::Default);
        assert_eq!(cell.bg, Color::Default);
        assert!(cell.flags.is_empty());
        assert!(cell.is_blank());
    }

    #[test]
    fn test_cell_new() {
        let cell = Cell::new('A');
        assert_eq!(cell.c, 'A');
        assert!(!cell.is_blank());
    }

    #[test]
    fn test_cell_flags() {
        let mut flags = CellFlags::empty();
        assert!(!flags.contains(CellFlags::BOLD));

        flags.insert(CellFlags::BOLD);
        assert!(flags.contains(CellFlags::BOLD));

        flags.insert(CellFlags::ITALIC);
        assert!(flags.contains(CellFlags::BOLD));
        assert!(flags.contains(CellFlags::ITALIC));

        flags.remove(CellFlags::BOLD);
        assert!(!flags.contains(CellFlags::BOLD));
        assert!(flags.contains(CellFlags::ITALIC));
    }

    #[test]
    fn test_with_attrs() {
        let mut attrs = Attributes::new();
        attrs.fg = Color::Indexed(1);
        attrs.flags.insert(CellFlags::BOLD);

        let cell = Cell::with_attrs('X', &attrs);
        assert_eq!(cell.c, 'X');
        assert_eq!(cell.fg, Color::Indexed(1));
        assert!(cell.flags.contains(CellFlags::BOLD));
    }

    #[test]
    fn test_clear_with_bg() {
        let mut cell = Cell::new('X');
        cell.fg = Color::Indexed(2);
        cell.clear_with_bg(Color::Indexed(4));
        assert_eq!(cell.c, ' ');
        assert_eq!(cell.fg, Color::Default);
        assert_eq!(cell.bg, Color::Indexed(4));
    }
}
