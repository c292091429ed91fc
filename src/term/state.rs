//! Per-screen emulation state.
//!
//! The terminal keeps two [`State`] values — one for the primary screen and
//! one for the alternate screen — and swaps them when mode `?47`/`?1049` is
//! toggled. Everything a full-screen program can change about "its" screen
//! lives here; the modes shared between both screens (mouse reporting,
//! keypad mode, bracketed paste, …) live on the terminal itself.

// Rust guideline compliant 2025-06

use crate::buffer::{Buffer, EvictFn};
use crate::cell::Cell;
use crate::color::Color;

/// Cursor key encoding (DECCKM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    #[default]
    Normal,
    Application,
}

/// Keypad encoding (DECKPAM / DECKPNM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeypadMode {
    #[default]
    Normal,
    Application,
}

/// Which mouse events the application asked to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    #[default]
    Off,
    /// Button presses and releases only (mode 1000).
    Normal,
    /// Presses, releases, and drag motion (mode 1002).
    ButtonEvent,
    /// Every mouse event including bare motion (mode 1003).
    All,
}

/// How outgoing mouse events are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseEncoding {
    /// The original single-byte X10/X11 encoding.
    #[default]
    Default,
    /// UTF-8 coordinates (mode 1005); recognized but refused.
    Utf8,
    /// SGR decimal encoding (mode 1006).
    Sgr,
}

/// The mutable state of one screen.
#[derive(Debug)]
pub struct State {
    /// The cell grid, which also tracks the cursor position.
    pub buffer: Buffer,
    /// Template cell carrying the SGR-accumulated attributes; every
    /// printable write stamps a copy of this cell into the grid.
    pub cell: Cell,
    /// Position of the last printable character written, used to mark the
    /// end-of-line cell when a line feed arrives.
    pub last_character: Option<(usize, usize)>,
    /// First row of the scroll region (inclusive).
    pub scroll_start: usize,
    /// One past the last row of the scroll region (exclusive).
    pub scroll_end: usize,
    /// Whether SGR inverse video is active (fg and bg are swapped in
    /// [`State::cell`] while set).
    pub inverse_mode: bool,
    cursor_stack: Vec<(usize, usize)>,
}

impl State {
    /// Creates a reset state with the given dimensions and default colors.
    #[must_use]
    pub fn new(width: usize, height: usize, fg: Color, bg: Color) -> Self {
        Self {
            buffer: Buffer::new(width, height, Cell::new(fg, bg)),
            cell: Cell::new(fg, bg),
            last_character: None,
            scroll_start: 0,
            scroll_end: height,
            inverse_mode: false,
            cursor_stack: Vec::new(),
        }
    }

    /// Resets the state to its post-construction defaults: cleared buffer,
    /// cursor home, full-screen scroll region, default template cell.
    pub fn reset(&mut self, fg: Color, bg: Color) {
        let fill = Cell::new(fg, bg);
        for y in 0..self.buffer.height() {
            self.buffer.fill_row(y, fill);
        }
        self.buffer.set_cursor(0, 0);
        self.cell = fill;
        self.last_character = None;
        self.scroll_start = 0;
        self.scroll_end = self.buffer.height();
        self.inverse_mode = false;
        self.cursor_stack.clear();
    }

    /// Pushes the current cursor position (DECSC).
    pub fn save_cursor(&mut self) {
        self.cursor_stack.push(self.buffer.cursor());
    }

    /// Pops and restores a saved cursor position, clamped to the buffer
    /// (DECRC). Popping an empty stack is a no-op.
    pub fn restore_cursor(&mut self) {
        if let Some((x, y)) = self.cursor_stack.pop() {
            let x = x.min(self.buffer.width() - 1);
            let y = y.min(self.buffer.height() - 1);
            self.buffer.set_cursor(x, y);
        }
    }

    /// Marks the cell at the last-character position as the end of its
    /// logical line.
    pub fn mark_line_end(&mut self) {
        if let Some((x, y)) = self.last_character {
            self.buffer.at_mut(x, y).set_line_end(true);
        }
    }

    /// Forgets the last-character position.
    pub fn invalidate_last_character(&mut self) {
        self.last_character = None;
    }

    /// Resizes the buffer (reflowing logical lines), resets the scroll
    /// region to the full new height, and forgets the last-character
    /// position. `evict` receives rows scrolled out during the reflow.
    pub fn resize(&mut self, width: usize, height: usize, fill: Cell, evict: Option<EvictFn<'_>>) {
        self.buffer.resize(width, height, fill, evict);
        self.scroll_start = 0;
        self.scroll_end = height;
        self.last_character = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> State {
        State::new(10, 4, Color::WHITE, Color::BLACK)
    }

    #[test]
    fn save_restore_round_trip() {
        let mut s = state();
        s.buffer.set_cursor(3, 2);
        s.save_cursor();
        s.buffer.set_cursor(7, 1);
        s.restore_cursor();
        assert_eq!(s.buffer.cursor(), (3, 2));
    }

    #[test]
    fn restore_clamps_to_buffer() {
        let mut s = state();
        s.buffer.set_cursor(9, 3);
        s.save_cursor();
        s.resize(4, 2, Cell::default(), None);
        s.restore_cursor();
        assert_eq!(s.buffer.cursor(), (3, 1));
    }

    #[test]
    fn restore_on_empty_stack_is_noop() {
        let mut s = state();
        s.buffer.set_cursor(5, 1);
        s.restore_cursor();
        assert_eq!(s.buffer.cursor(), (5, 1));
    }

    #[test]
    fn mark_line_end_uses_last_character() {
        let mut s = state();
        s.last_character = Some((4, 1));
        s.mark_line_end();
        assert!(s.buffer.at(4, 1).is_line_end());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut s = state();
        s.buffer.set_cursor(5, 2);
        s.scroll_start = 1;
        s.scroll_end = 3;
        s.cell.font.set_bold(true);
        s.inverse_mode = true;
        s.reset(Color::WHITE, Color::BLACK);
        assert_eq!(s.buffer.cursor(), (0, 0));
        assert_eq!(s.scroll_start, 0);
        assert_eq!(s.scroll_end, 4);
        assert!(!s.cell.font.bold());
        assert!(!s.inverse_mode);
    }

    #[test]
    fn resize_resets_scroll_region() {
        let mut s = state();
        s.scroll_start = 1;
        s.scroll_end = 3;
        s.resize(20, 8, Cell::default(), None);
        assert_eq!(s.scroll_start, 0);
        assert_eq!(s.scroll_end, 8);
    }
}
