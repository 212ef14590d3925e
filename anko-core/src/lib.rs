//! Anko Terminal Core
//!
//! This crate provides the platform-independent terminal emulator core:
//! - Cell and color model with the xterm 256-color palette
//! - Screen model with cursor, scroll region, and dirty-line tracking
//! - Hybrid scrollback store (in-memory ring + on-disk log)
//!
//! This crate has NO GUI dependencies and can be used headlessly for
//! testing. The escape-sequence parser that drives these types lives in
//! the `anko-parser` crate.

pub mod cell;
pub mod color;
pub mod cursor;
pub mod line;
pub mod screen;
pub mod scrollback;

pub use cell::{Attributes, Cell, CellFlags};
pub use color::{pack_color, palette_256, unpack_color, Color, Rgb};
pub use cursor::{Cursor, CursorStyle};
pub use line::Line;
pub use screen::{Screen, ScrollRegion};
pub use scrollback::{ScrollbackError, ScrollbackStore, RING_CAPACITY};

/// Default terminal dimensions
pub const DEFAULT_COLS: usize = 80;
pub const DEFAULT_ROWS: usize = 24;
