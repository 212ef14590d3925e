//! VT/xterm escape sequence parser
//!
//! A byte-at-a-time state machine that decodes UTF-8 and ANSI/VT100
//! escape sequences, mutating the screen it owns and archiving rows
//! that scroll out of the region into the scrollback store.
//!
//! The parser is streaming and handles arbitrary chunk boundaries. It
//! never fails on malformed input: unrecognized bytes in any non-ground
//! state drop the in-progress sequence and return to ground, and
//! resource-capped accumulators (intermediates, OSC) abort rather than
//! grow without bound.
//!
//! One parser per screen; a single logical output stream must be fed to
//! the same parser instance in order.

use std::sync::Arc;

use anko_core::{Attributes, CellFlags, Color, CursorStyle, Line, Rgb, Screen, ScrollbackStore};

use crate::params::Params;

const MAX_INTERMEDIATES: usize = 64;
const MAX_OSC_BYTES: usize = 64 * 1024;

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Normal character processing
    Ground,
    /// After ESC
    Escape,
    /// ESC intermediate bytes
    EscapeIntermediate,
    /// After ESC [
    CsiEntry,
    /// CSI parameter bytes
    CsiParam,
    /// CSI intermediate bytes
    CsiIntermediate,
    /// After ESC ] - collecting the string body
    OscString,
    /// After ESC P - consumed and ignored
    Dcs,
}

/// Sink for raw terminal output. Anything implementing this can be
/// driven from a persisted byte log (see [`crate::replay`]).
pub trait Feed {
    fn feed(&mut self, bytes: &[u8]);
}

/// The terminal parser: decode state plus the screen and scrollback
/// store it drives.
pub struct Parser {
    screen: Screen,
    scrollback: Arc<ScrollbackStore>,

    state: State,
    params: Params,
    intermediates: Vec<u8>,
    osc: Vec<u8>,

    /// Codepoint being assembled from a multi-byte UTF-8 sequence
    utf8_codepoint: u32,
    /// Continuation bytes still expected
    utf8_remaining: u8,

    title: String,
    on_title: Option<Box<dyn FnMut(&str) + Send>>,
}

impl Parser {
    pub fn new(screen: Screen, scrollback: Arc<ScrollbackStore>) -> Self {
        Parser {
            screen,
            scrollback,
            state: State::Ground,
            params: Params::new(),
            intermediates: Vec::with_capacity(4),
            osc: Vec::with_capacity(256),
            utf8_codepoint: 0,
            utf8_remaining: 0,
            title: String::new(),
            on_title: None,
        }
    }

    /// Install a callback fired whenever an OSC title sequence completes.
    /// Invoked synchronously from `feed`; it must not block.
    pub fn set_title_callback(&mut self, callback: impl FnMut(&str) + Send + 'static) {
        self.on_title = Some(Box::new(callback));
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn scrollback(&self) -> &Arc<ScrollbackStore> {
        &self.scrollback
    }

    /// Last title set by an OSC 0/1/2 sequence
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Process a chunk of raw output. Chunk boundaries are arbitrary;
    /// state carries across calls.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.advance(byte);
        }
    }

    fn advance(&mut self, byte: u8) {
        // Pending multi-byte UTF-8 decode takes priority in ground state
        if self.utf8_remaining > 0 && self.state == State::Ground {
            if byte & 0xC0 == 0x80 {
                self.utf8_codepoint = (self.utf8_codepoint << 6) | (byte & 0x3F) as u32;
                self.utf8_remaining -= 1;
                if self.utf8_remaining == 0 {
                    if let Some(c) = char::from_u32(self.utf8_codepoint) {
                        self.print(c);
                    }
                }
                return;
            }
            // Invalid continuation: the pending bytes are dropped and this
            // byte is reprocessed as freshly received
            self.utf8_remaining = 0;
        }

        match self.state {
            State::Ground => self.ground(byte),
            State::Escape => self.escape(byte),
            State::EscapeIntermediate => self.escape_intermediate(byte),
            State::CsiEntry => self.csi_entry(byte),
            State::CsiParam => self.csi_param(byte),
            State::CsiIntermediate => self.csi_intermediate(byte),
            State::OscString => self.osc_string(byte),
            State::Dcs => self.dcs(byte),
        }
    }

    fn clear_sequence(&mut self) {
        self.params.clear();
        self.intermediates.clear();
    }

    fn print(&mut self, c: char) {
        let displaced = self.screen.write_char(c);
        self.archive(displaced);
    }

    fn line_feed(&mut self) {
        let displaced = self.screen.linefeed();
        self.archive(displaced);
    }

    fn archive(&mut self, lines: Vec<Line>) {
        if !lines.is_empty() {
            self.scrollback.push(&lines);
        }
    }

    fn ground(&mut self, byte: u8) {
        match byte {
            0x07 => {} // BEL
            0x08 => self.screen.backspace(),
            0x09 => self.screen.tab(),
            0x0A | 0x0B | 0x0C => self.line_feed(),
            0x0D => self.screen.carriage_return(),
            0x1B => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            // Printable ASCII
            0x20..=0x7E => self.print(byte as char),
            // UTF-8 lead bytes
            0xC0..=0xDF => {
                self.utf8_codepoint = (byte & 0x1F) as u32;
                self.utf8_remaining = 1;
            }
            0xE0..=0xEF => {
                self.utf8_codepoint = (byte & 0x0F) as u32;
                self.utf8_remaining = 2;
            }
            0xF0..=0xF7 => {
                self.utf8_codepoint = (byte & 0x07) as u32;
                self.utf8_remaining = 3;
            }
            // Other C0 controls, DEL, and stray continuation bytes are dropped
            _ => {}
        }
    }

    fn escape(&mut self, byte: u8) {
        match byte {
            b'[' => self.state = State::CsiEntry,
            b']' => {
                self.osc.clear();
                self.state = State::OscString;
            }
            b'P' => self.state = State::Dcs,
            b'\\' => self.state = State::Ground, // ST
            b'c' => {
                // RIS - full reset
                self.screen.reset();
                self.state = State::Ground;
            }
            b'D' => {
                // IND
                self.line_feed();
                self.state = State::Ground;
            }
            b'E' => {
                // NEL
                self.line_feed();
                self.screen.carriage_return();
                self.state = State::Ground;
            }
            b'M' => {
                // RI - reverse index
                self.screen.reverse_linefeed();
                self.state = State::Ground;
            }
            // DECSC/DECRC accepted without effect
            b'7' | b'8' => self.state = State::Ground,
            0x1B => self.clear_sequence(),
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = State::EscapeIntermediate;
            }
            _ => self.state = State::Ground,
        }
    }

    fn escape_intermediate(&mut self, byte: u8) {
        match byte {
            0x20..=0x2F => {
                if self.intermediates.len() >= MAX_INTERMEDIATES {
                    self.state = State::Ground;
                } else {
                    self.intermediates.push(byte);
                }
            }
            0x1B => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            // Charset designation and friends: accepted, no effect
            _ => self.state = State::Ground,
        }
    }

    fn csi_entry(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' => {
                self.params.digit(byte - b'0');
                self.state = State::CsiParam;
            }
            b';' | b':' => {
                self.params.separator();
                self.state = State::CsiParam;
            }
            // Private markers
            b'?' | b'>' | b'!' => {
                self.intermediates.push(byte);
                self.state = State::CsiParam;
            }
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = State::CsiIntermediate;
            }
            0x40..=0x7E => {
                self.dispatch_csi(byte);
                self.state = State::Ground;
            }
            0x1B => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            _ => self.state = State::Ground,
        }
    }

    fn csi_param(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' => self.params.digit(byte - b'0'),
            b';' | b':' => self.params.separator(),
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = State::CsiIntermediate;
            }
            0x40..=0x7E => {
                self.dispatch_csi(byte);
                self.state = State::Ground;
            }
            0x1B => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            _ => self.state = State::Ground,
        }
    }

    fn csi_intermediate(&mut self, byte: u8) {
        match byte {
            0x20..=0x2F => {
                if self.intermediates.len() >= MAX_INTERMEDIATES {
                    self.state = State::Ground;
                } else {
                    self.intermediates.push(byte);
                }
            }
            0x40..=0x7E => {
                self.dispatch_csi(byte);
                self.state = State::Ground;
            }
            0x1B => {
                self.clear_sequence();
                self.state = State::Escape;
            }
            _ => self.state = State::Ground,
        }
    }

    fn dispatch_csi(&mut self, final_byte: u8) {
        self.params.finish();
        let private = self.intermediates.first() == Some(&b'?');
        let n = self.params.get_nonzero_or(0, 1) as usize;

        match final_byte {
            b'A' => self.screen.move_up(n),
            b'B' => self.screen.move_down(n),
            b'C' => self.screen.move_forward(n),
            b'D' => self.screen.move_backward(n),
            b'E' => {
                self.screen.move_down(n);
                self.screen.carriage_return();
            }
            b'F' => {
                self.screen.move_up(n);
                self.screen.carriage_return();
            }
            b'G' => self.screen.move_to_col(n - 1),
            b'H' | b'f' => {
                let row = self.params.get_nonzero_or(0, 1) as usize;
                let col = self.params.get_nonzero_or(1, 1) as usize;
                self.screen.move_to(row - 1, col - 1);
            }
            b'J' => self.screen.erase_in_display(self.params.get_or(0, 0)),
            b'K' => self.screen.erase_in_line(self.params.get_or(0, 0)),
            b'L' => self.screen.insert_lines(n),
            b'M' => self.screen.delete_lines(n),
            b'P' => self.screen.delete_chars(n),
            b'S' => {
                let displaced = self.screen.scroll_up(n);
                self.archive(displaced);
            }
            b'T' => self.screen.scroll_down(n),
            b'X' => self.screen.erase_chars(n),
            b'@' => self.screen.insert_chars(n),
            b'd' => self.screen.move_to_row(n - 1),
            b'h' => self.set_modes(private, true),
            b'l' => self.set_modes(private, false),
            b'm' => self.apply_sgr(),
            b'r' => {
                let rows = self.screen.rows();
                let top = self.params.get_nonzero_or(0, 1) as usize;
                let bottom = self.params.get_nonzero_or(1, rows.min(u16::MAX as usize) as u16) as usize;
                self.screen.set_scroll_region(top - 1, bottom - 1);
            }
            b'q' if self.intermediates == [b' '] => self.set_cursor_style(),
            // ANSI save/restore cursor: accepted without effect
            b's' | b'u' => {}
            // Device status, window manipulation, device attributes, etc.
            _ => log::trace!("ignored CSI final {:#04x}", final_byte),
        }
    }

    fn set_modes(&mut self, private: bool, enable: bool) {
        if !private {
            return;
        }
        for mode in self.params.iter() {
            match mode {
                25 => self.screen.cursor_mut().visible = enable,
                // Alternate screen: accepted without effect
                1049 => {}
                _ => {}
            }
        }
    }

    fn set_cursor_style(&mut self) {
        let cursor = self.screen.cursor_mut();
        match self.params.get_or(0, 0) {
            0 | 1 => {
                cursor.style = CursorStyle::Block;
                cursor.blinking = true;
            }
            2 => {
                cursor.style = CursorStyle::Block;
                cursor.blinking = false;
            }
            3 => {
                cursor.style = CursorStyle::Underline;
                cursor.blinking = true;
            }
            4 => {
                cursor.style = CursorStyle::Underline;
                cursor.blinking = false;
            }
            5 => {
                cursor.style = CursorStyle::Bar;
                cursor.blinking = true;
            }
            6 => {
                cursor.style = CursorStyle::Bar;
                cursor.blinking = false;
            }
            _ => {}
        }
    }

    fn apply_sgr(&mut self) {
        let mut attrs = self.screen.attrs;
        if self.params.is_empty() {
            attrs = Attributes::default();
        }

        let mut i = 0;
        while let Some(code) = self.params.get(i) {
            match code {
                0 => attrs = Attributes::default(),
                1 => attrs.flags.insert(CellFlags::BOLD),
                2 => attrs.flags.insert(CellFlags::DIM),
                3 => attrs.flags.insert(CellFlags::ITALIC),
                4 | 21 => attrs.flags.insert(CellFlags::UNDERLINE),
                5 => attrs.flags.insert(CellFlags::BLINK),
                7 => attrs.flags.insert(CellFlags::REVERSE),
                8 => attrs.flags.insert(CellFlags::HIDDEN),
                9 => attrs.flags.insert(CellFlags::STRIKETHROUGH),
                22 => {
                    attrs.flags.remove(CellFlags::BOLD);
                    attrs.flags.remove(CellFlags::DIM);
                }
                23 => attrs.flags.remove(CellFlags::ITALIC),
                24 => attrs.flags.remove(CellFlags::UNDERLINE),
                25 => attrs.flags.remove(CellFlags::BLINK),
                27 => attrs.flags.remove(CellFlags::REVERSE),
                28 => attrs.flags.remove(CellFlags::HIDDEN),
                29 => attrs.flags.remove(CellFlags::STRIKETHROUGH),
                30..=37 => attrs.fg = Color::Indexed((code - 30) as u8),
                90..=97 => attrs.fg = Color::Indexed((code - 90 + 8) as u8),
                40..=47 => attrs.bg = Color::Indexed((code - 40) as u8),
                100..=107 => attrs.bg = Color::Indexed((code - 100 + 8) as u8),
                39 => attrs.fg = Color::Default,
                49 => attrs.bg = Color::Default,
                38 | 48 => {
                    let (color, consumed) = self.extended_color(i);
                    if let Some(color) = color {
                        if code == 38 {
                            attrs.fg = color;
                        } else {
                            attrs.bg = color;
                        }
                    }
                    i += consumed;
                }
                _ => {}
            }
            i += 1;
        }

        self.screen.attrs = attrs;
    }

    /// Consume an extended-color sub-sequence starting at the 38/48
    /// selector. Returns the parsed color (if complete) and how many
    /// extra parameters were consumed; short sequences are safely
    /// truncated.
    fn extended_color(&self, i: usize) -> (Option<Color>, usize) {
        match self.params.get(i + 1) {
            Some(5) => match self.params.get(i + 2) {
                Some(index) => (Some(Color::Indexed(index.min(255) as u8)), 2),
                None => (None, 1),
            },
            Some(2) => {
                match (
                    self.params.get(i + 2),
                    self.params.get(i + 3),
                    self.params.get(i + 4),
                ) {
                    (Some(r), Some(g), Some(b)) => (
                        Some(Color::Rgb(Rgb::new(
                            r.min(255) as u8,
                            g.min(255) as u8,
                            b.min(255) as u8,
                        ))),
                        4,
                    ),
                    _ => (None, self.params.len().saturating_sub(i + 1)),
                }
            }
            Some(_) => (None, 1),
            None => (None, 0),
        }
    }

    fn osc_string(&mut self, byte: u8) {
        match byte {
            0x07 => {
                // BEL terminates (xterm extension)
                self.dispatch_osc();
                self.state = State::Ground;
            }
            0x1B => {
                // ESC terminates; a following `\` (ST) is consumed by the
                // escape state
                self.dispatch_osc();
                self.clear_sequence();
                self.state = State::Escape;
            }
            _ => {
                if self.osc.len() >= MAX_OSC_BYTES {
                    // Length guard: drop the accumulated string entirely
                    self.osc.clear();
                    self.state = State::Ground;
                } else {
                    self.osc.push(byte);
                }
            }
        }
    }

    fn dispatch_osc(&mut self) {
        let body = std::mem::take(&mut self.osc);
        let (command, payload) = match body.iter().position(|&b| b == b';') {
            Some(split) => (&body[..split], &body[split + 1..]),
            None => (&body[..], &[][..]),
        };
        let command = std::str::from_utf8(command)
            .ok()
            .and_then(|s| s.parse::<u32>().ok());
        match command {
            // Icon name and/or window title
            Some(0) | Some(1) | Some(2) => {
                self.title = String::from_utf8_lossy(payload).into_owned();
                if let Some(callback) = self.on_title.as_mut() {
                    callback(&self.title);
                }
            }
            // Other OSC commands (colors, clipboard, ...) are ignored
            _ => log::trace!("ignored OSC command {command:?}"),
        }
    }

    fn dcs(&mut self, byte: u8) {
        // Device control strings are consumed and ignored; ESC hands off
        // to the escape state so ST (ESC \) ends the string
        if byte == 0x1B {
            self.clear_sequence();
            self.state = State::Escape;
        }
    }
}

impl Feed for Parser {
    fn feed(&mut self, bytes: &[u8]) {
        Parser::feed(self, bytes);
    }
}
