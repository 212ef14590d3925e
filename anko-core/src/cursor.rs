//! Cursor state management
//!
//! The cursor tracks position, shape, and visibility. Position is kept
//! in-bounds by the screen's movement operations, not here.

use serde::{Deserialize, Serialize};

/// Cursor shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorStyle {
    /// Block cursor (default)
    #[default]
    Block,
    /// Underline cursor
    Underline,
    /// Bar/beam cursor
    Bar,
}

/// Cursor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Row position (0-indexed from top of visible area)
    pub row: usize,
    /// Column position (0-indexed)
    pub col: usize,
    /// Cursor shape
    pub style: CursorStyle,
    /// Whether the cursor is visible
    pub visible: bool,
    /// Whether the cursor is blinking
    pub blinking: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor {
            row: 0,
            col: 0,
            style: CursorStyle::Block,
            visible: true,
            blinking: true,
        }
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_default() {
        let cursor = Cursor::default();
        assert_eq!(cursor.row, 0);
        assert_eq!(cursor.col, 0);
        assert!(cursor.visible);
        assert!(cursor.blinking);
        assert_eq!(cursor.style, CursorStyle::Block);
    }
}
