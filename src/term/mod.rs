//! The ANSI/VT100 terminal emulation engine.
//!
//! [`Screen`] is the heart of the crate: it consumes the untrusted byte
//! stream coming out of a pseudoterminal, parses escape sequences
//! incrementally, and mutates a cell grid plus scrollback history. It is
//! deliberately headless — no threads, no I/O — so it can be driven byte
//! by byte in tests.
//!
//! [`AnsiTerminal`] wraps a [`Screen`] with the runtime pieces: the PTY,
//! the internal reader thread feeding [`Screen::process_input`], the
//! priority lock arbitrating between that thread and the renderer, and the
//! outbound encoding of keyboard, mouse, and paste input.
//!
//! # Architecture
//!
//! ```text
//! AnsiTerminal
//!  ├── screen: Arc<PriorityLock<Screen>>   (grid, modes, history)
//!  ├── pty: Arc<dyn Pty>                   (byte channel to the child)
//!  ├── listener: Arc<dyn EventListener>    (title/bell/clipboard/t++ events)
//!  └── reader thread                       (pty.receive → screen.process_input)
//! ```
//!
//! The reader thread acquires the lock in normal mode for each processed
//! chunk; renderer-side calls acquire it in priority mode, so the UI keeps
//! bounded latency even when the child is flooding the terminal.
//!
//! # Thread Safety
//!
//! `Screen` is not thread-safe on its own; `AnsiTerminal` serializes all
//! access through the priority lock. Events and query replies produced
//! while the lock is held are queued on the screen and drained by the
//! reader thread after release, so listener callbacks never run under the
//! lock.

pub mod selection;
pub mod state;

use std::sync::Arc;
use std::thread;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers, MouseButton};
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

use crate::buffer::EvictFn;
use crate::cell::{Cell, Cursor};
use crate::color::Color;
use crate::history::History;
use crate::input::{encode_mouse_button, encode_mouse_event};
use crate::keys;
use crate::lock::{PriorityLock, PriorityLockGuard};
use crate::palette::Palette;
use crate::parser::{decode_utf8, CsiSequence, OscSequence, Parse};
use crate::pty::Pty;
use crate::tpp::{capabilities_reply, TppKind, TppSequence};

pub use selection::Selection;
pub use state::{CursorMode, KeypadMode, MouseEncoding, MouseMode, State};

/// Log target for recognized escape sequences.
pub(crate) const SEQ: &str = "vt100::seq";
/// Log target for unknown or invalid sequences.
pub(crate) const SEQ_UNKNOWN: &str = "vt100::seq_unknown";
/// Log target for sequences that are well-formed but out of range.
pub(crate) const SEQ_ERROR: &str = "vt100::seq_error";
/// Log target for recognized sequences this terminal refuses to support.
pub(crate) const SEQ_WONT_SUPPORT: &str = "vt100::seq_wont_support";
/// Log target for bytes sent back to the application.
pub(crate) const SEQ_SENT: &str = "vt100::seq_sent";

/// Characters the DEC line-drawing set maps onto codepoints `j..=x`.
/// Zero entries are left unmapped.
const LINE_DRAWING_CHARS: [char; 15] = [
    '\u{2518}', '\u{2510}', '\u{250c}', '\u{2514}', '\u{253c}', '\0', '\0', '\u{2500}', '\0',
    '\0', '\u{251c}', '\u{2524}', '\u{2534}', '\u{252c}', '\u{2502}',
];

/// Size of the PTY reader buffer. One read rarely carries more than a few
/// kilobytes even under heavy output, and leftovers of partial sequences
/// are carried across reads anyway.
const READ_BUFFER_SIZE: usize = 4096;

/// Which built-in palette a terminal starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteKind {
    /// The classic 16-color palette.
    Colors16,
    /// The xterm 256-color palette.
    #[default]
    Xterm256,
}

/// Construction knobs for a terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalOptions {
    /// Initial width in columns.
    pub cols: usize,
    /// Initial height in rows.
    pub rows: usize,
    /// Scrollback limit in rows; 0 disables the scrollback.
    pub max_history_rows: usize,
    /// Whether SGR bold also brightens the 30–37 foreground colors.
    pub bold_is_bright: bool,
    /// The starting palette.
    pub palette: PaletteKind,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            max_history_rows: 1000,
            bold_is_bright: false,
            palette: PaletteKind::Xterm256,
        }
    }
}

/// Events the engine surfaces to its renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// OSC 0/2 window title change.
    TitleChange(String),
    /// BEL arrived.
    Notification,
    /// OSC 52 asked for the clipboard to be set.
    ClipboardSetRequest(String),
    /// A t++ sequence the engine does not handle itself.
    Tpp(TppSequence),
}

/// Receives [`TerminalEvent`]s from the engine.
///
/// Callbacks run on the PTY reader thread with the screen lock released;
/// they must not call back into the terminal's mutating operations.
pub trait EventListener: Send + Sync {
    fn send_event(&self, event: TerminalEvent);
}

/// An [`EventListener`] that discards every event.
#[derive(Debug, Clone, Copy)]
pub struct NoopListener;

impl EventListener for NoopListener {
    fn send_event(&self, _event: TerminalEvent) {}
}

// ── Screen ────────────────────────────────────────────────────────────────────

/// The headless emulation state machine.
pub struct Screen {
    palette: Palette,
    state: State,
    state_backup: State,
    alternate_mode: bool,
    history: History,
    cursor: Cursor,
    default_cursor: Cursor,
    cursor_mode: CursorMode,
    keypad_mode: KeypadMode,
    mouse_mode: MouseMode,
    mouse_encoding: MouseEncoding,
    mouse_buttons_down: usize,
    mouse_last_button: u32,
    bracketed_paste: bool,
    line_drawing_set: bool,
    bold_is_bright: bool,
    selection: Option<Selection>,
    pending_replies: Vec<Vec<u8>>,
    pending_events: Vec<TerminalEvent>,
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("cols", &self.width())
            .field("rows", &self.height())
            .field("alternate_mode", &self.alternate_mode)
            .field("history_rows", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl Screen {
    /// Creates a screen from the options, using the built-in palette they
    /// select.
    #[must_use]
    pub fn new(options: &TerminalOptions) -> Self {
        let palette = match options.palette {
            PaletteKind::Colors16 => Palette::colors16(),
            PaletteKind::Xterm256 => Palette::xterm256(),
        };
        Self::with_palette(options, palette)
    }

    /// Creates a screen over an explicit palette.
    ///
    /// # Panics
    ///
    /// Panics if the palette has fewer than the 16 colors the SGR base
    /// color codes address.
    #[must_use]
    pub fn with_palette(options: &TerminalOptions, palette: Palette) -> Self {
        assert!(palette.len() >= 16, "palette must cover the 16 base colors");
        let cols = options.cols.max(1);
        let rows = options.rows.max(1);
        let fg = palette.default_foreground();
        let bg = palette.default_background();
        Self {
            state: State::new(cols, rows, fg, bg),
            state_backup: State::new(cols, rows, fg, bg),
            palette,
            alternate_mode: false,
            history: History::new(options.max_history_rows),
            cursor: Cursor::default(),
            default_cursor: Cursor::default(),
            cursor_mode: CursorMode::Normal,
            keypad_mode: KeypadMode::Normal,
            mouse_mode: MouseMode::Off,
            mouse_encoding: MouseEncoding::Default,
            mouse_buttons_down: 0,
            mouse_last_button: 3,
            bracketed_paste: false,
            line_drawing_set: false,
            bold_is_bright: options.bold_is_bright,
            selection: None,
            pending_replies: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    // ── Read interface ────────────────────────────────────────────────────────

    /// Width in columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.state.buffer.width()
    }

    /// Height in rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.state.buffer.height()
    }

    /// Cursor position; `x` may transiently equal the width after a write
    /// into the last column.
    #[must_use]
    pub fn cursor_position(&self) -> (usize, usize) {
        self.state.buffer.cursor()
    }

    /// Cursor presentation state.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Cell of the live grid.
    ///
    /// # Panics
    ///
    /// Panics if the position is out of bounds.
    #[must_use]
    pub fn cell(&self, x: usize, y: usize) -> &Cell {
        self.state.buffer.at(x, y)
    }

    /// The scrollback history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Whether the alternate screen is active.
    #[must_use]
    pub fn alternate_mode(&self) -> bool {
        self.alternate_mode
    }

    #[must_use]
    pub fn cursor_mode(&self) -> CursorMode {
        self.cursor_mode
    }

    #[must_use]
    pub fn keypad_mode(&self) -> KeypadMode {
        self.keypad_mode
    }

    #[must_use]
    pub fn mouse_mode(&self) -> MouseMode {
        self.mouse_mode
    }

    #[must_use]
    pub fn mouse_encoding(&self) -> MouseEncoding {
        self.mouse_encoding
    }

    #[must_use]
    pub fn bracketed_paste(&self) -> bool {
        self.bracketed_paste
    }

    /// The palette colors are resolved against.
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// One row of the live grid as plain text.
    #[must_use]
    pub fn row_text(&self, y: usize) -> String {
        self.state
            .buffer
            .row(y)
            .iter()
            .map(|c| c.codepoint)
            .collect()
    }

    /// The whole live grid as text, rows separated by newlines. Intended
    /// for tests and debugging, not rendering.
    #[must_use]
    pub fn contents(&self) -> String {
        let mut out = String::new();
        for y in 0..self.height() {
            if y > 0 {
                out.push('\n');
            }
            out.push_str(&self.row_text(y));
        }
        out
    }

    // ── Input processing ──────────────────────────────────────────────────────

    /// Consumes bytes from the PTY stream.
    ///
    /// Returns how many bytes were fully processed. A return short of
    /// `input.len()` means the window ended inside a multi-byte construct;
    /// the caller keeps the tail and re-delivers it with the next chunk.
    /// No state is mutated for the unconsumed tail.
    pub fn process_input(&mut self, input: &[u8]) -> usize {
        let mut x = 0;
        while x < input.len() {
            match input[x] {
                0x1b => {
                    let processed = self.parse_escape_sequence(&input[x..]);
                    if processed == 0 {
                        return x;
                    }
                    x += processed;
                }
                0x07 => {
                    self.pending_events.push(TerminalEvent::Notification);
                    x += 1;
                }
                0x08 => {
                    self.parse_backspace();
                    x += 1;
                }
                0x09 => {
                    self.parse_tab();
                    x += 1;
                }
                0x0a => {
                    self.parse_lf();
                    x += 1;
                }
                0x0d => {
                    self.parse_cr();
                    x += 1;
                }
                b if b < 0x20 => {
                    // Remaining C0 controls are ignored.
                    x += 1;
                }
                _ => match decode_utf8(&input[x..]) {
                    Parse::Complete(cp, n) => {
                        self.write_codepoint(cp);
                        x += n;
                    }
                    _ => return x,
                },
            }
        }
        input.len()
    }

    /// Drains the query replies produced by processing (device attributes,
    /// status reports, t++ handshakes). The caller writes them to the PTY.
    pub fn drain_replies(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.pending_replies)
    }

    /// Drains the renderer events produced by processing.
    pub fn drain_events(&mut self) -> Vec<TerminalEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // ── Resizing ──────────────────────────────────────────────────────────────

    /// Resizes both screens, reflowing logical lines and rewrapping the
    /// scrollback for the new width. Rows scrolled out of the primary
    /// screen during the reflow go to the history.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        let cols = cols.max(1);
        let rows = rows.max(1);
        if cols == self.width() && rows == self.height() {
            return;
        }
        if cols != self.width() {
            self.history.rewrap(cols);
        }
        let fill = Cell::new(
            self.palette.default_foreground(),
            self.palette.default_background(),
        );
        let (primary, secondary) = if self.alternate_mode {
            (&mut self.state_backup, &mut self.state)
        } else {
            (&mut self.state, &mut self.state_backup)
        };
        let history = &mut self.history;
        let mut evict = |row: Box<[Cell]>| history.push(row, cols);
        let evict: EvictFn<'_> = &mut evict;
        primary.resize(cols, rows, fill, Some(evict));
        secondary.resize(cols, rows, fill, None);
    }

    // ── Outbound input encoding ───────────────────────────────────────────────

    /// Encodes a non-printable key press. Printable keys return `None`;
    /// they arrive through [`Screen::encode_key_char`] instead.
    #[must_use]
    pub fn encode_key_down(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<Vec<u8>> {
        if keys::is_printable(code, modifiers) {
            return None;
        }
        let seq = keys::sequence_for(code, modifiers)?;
        let mut bytes = seq.to_vec();
        // Application cursor mode rewrites the unmodified cursor keys from
        // `ESC [ X` to `ESC O X`.
        if self.cursor_mode == CursorMode::Application
            && modifiers == KeyModifiers::NONE
            && matches!(
                code,
                KeyCode::Up
                    | KeyCode::Down
                    | KeyCode::Left
                    | KeyCode::Right
                    | KeyCode::Home
                    | KeyCode::End
            )
            && bytes.len() > 1
        {
            bytes[1] = b'O';
        }
        Some(bytes)
    }

    /// Encodes a printable character as UTF-8. Control characters are not
    /// accepted here.
    #[must_use]
    pub fn encode_key_char(c: char) -> Option<Vec<u8>> {
        if (c as u32) < 0x20 {
            return None;
        }
        let mut buf = [0u8; 4];
        Some(c.encode_utf8(&mut buf).as_bytes().to_vec())
    }

    /// Encodes a button press for the wire, if mouse reporting is active.
    #[must_use]
    pub fn encode_mouse_down(
        &mut self,
        x: usize,
        y: usize,
        button: MouseButton,
        modifiers: KeyModifiers,
    ) -> Option<Vec<u8>> {
        self.mouse_buttons_down += 1;
        if self.mouse_mode == MouseMode::Off {
            return None;
        }
        self.mouse_last_button = encode_mouse_button(button, modifiers);
        self.encode_mouse(self.mouse_last_button, x, y, true)
    }

    /// Encodes a button release.
    #[must_use]
    pub fn encode_mouse_up(
        &mut self,
        x: usize,
        y: usize,
        button: MouseButton,
        modifiers: KeyModifiers,
    ) -> Option<Vec<u8>> {
        if self.mouse_buttons_down == 0 {
            return None;
        }
        self.mouse_buttons_down -= 1;
        if self.mouse_mode == MouseMode::Off {
            return None;
        }
        self.mouse_last_button = encode_mouse_button(button, modifiers);
        self.encode_mouse(self.mouse_last_button, x, y, false)
    }

    /// Encodes a motion event. Sent only when the application asked for
    /// motion: always in mode 1003, during a drag in mode 1002.
    #[must_use]
    pub fn encode_mouse_move(&mut self, x: usize, y: usize) -> Option<Vec<u8>> {
        let wanted = self.mouse_mode == MouseMode::All
            || (self.mouse_mode == MouseMode::ButtonEvent && self.mouse_buttons_down > 0);
        if !wanted || x >= self.width() || y >= self.height() {
            return None;
        }
        self.encode_mouse(self.mouse_last_button + 32, x, y, true)
    }

    /// Encodes a wheel event; wheel direction is carried as left/right
    /// button plus the wheel bit.
    #[must_use]
    pub fn encode_mouse_wheel(
        &mut self,
        x: usize,
        y: usize,
        delta: i32,
        modifiers: KeyModifiers,
    ) -> Option<Vec<u8>> {
        if self.mouse_mode == MouseMode::Off {
            return None;
        }
        let button = if delta > 0 {
            MouseButton::Left
        } else {
            MouseButton::Right
        };
        self.mouse_last_button = encode_mouse_button(button, modifiers) + 64;
        self.encode_mouse(self.mouse_last_button, x, y, true)
    }

    fn encode_mouse(&self, button: u32, x: usize, y: usize, press: bool) -> Option<Vec<u8>> {
        if self.mouse_encoding == MouseEncoding::Utf8 {
            log::debug!(target: SEQ_WONT_SUPPORT, "utf8 mouse encoding");
            return None;
        }
        encode_mouse_event(self.mouse_encoding, button, x, y, press)
    }

    /// Frames pasted text for the wire, honoring bracketed paste mode.
    #[must_use]
    pub fn encode_paste(&self, text: &str) -> Vec<u8> {
        if self.bracketed_paste {
            let mut out = Vec::with_capacity(text.len() + 12);
            out.extend_from_slice(b"\x1b[200~");
            out.extend_from_slice(text.as_bytes());
            out.extend_from_slice(b"\x1b[201~");
            out
        } else {
            text.as_bytes().to_vec()
        }
    }

    // ── Escape dispatch ───────────────────────────────────────────────────────

    fn parse_escape_sequence(&mut self, window: &[u8]) -> usize {
        debug_assert_eq!(window[0], 0x1b);
        if window.len() < 2 {
            return 0;
        }
        match window[1] {
            b'[' => match CsiSequence::parse(&window[2..]) {
                Parse::Complete(seq, n) => {
                    self.handle_csi(seq);
                    2 + n
                }
                Parse::Invalid(n) => {
                    log::debug!(
                        target: SEQ_UNKNOWN,
                        "unknown, possibly invalid CSI sequence: {:?}",
                        String::from_utf8_lossy(&window[..2 + n])
                    );
                    2 + n
                }
                Parse::Incomplete => 0,
            },
            b']' => match OscSequence::parse(&window[2..]) {
                Parse::Complete(seq, n) => {
                    self.handle_osc(&seq);
                    2 + n
                }
                Parse::Invalid(n) => {
                    log::debug!(
                        target: SEQ_UNKNOWN,
                        "invalid OSC sequence: {:?}",
                        String::from_utf8_lossy(&window[..2 + n])
                    );
                    2 + n
                }
                Parse::Incomplete => 0,
            },
            b'P' => {
                if window.len() < 3 {
                    return 0;
                }
                if window[2] == b'+' {
                    match TppSequence::parse(&window[3..]) {
                        Parse::Complete(seq, n) => {
                            self.handle_tpp(seq);
                            3 + n
                        }
                        Parse::Invalid(n) => {
                            log::debug!(target: SEQ_UNKNOWN, "t++ sequence without a kind");
                            3 + n
                        }
                        Parse::Incomplete => 0,
                    }
                } else {
                    log::debug!(target: SEQ_UNKNOWN, "unknown DCS sequence");
                    2
                }
            }
            b'7' => {
                log::trace!(target: SEQ, "DECSC: cursor position saved");
                self.state.save_cursor();
                2
            }
            b'8' => {
                log::trace!(target: SEQ, "DECRC: cursor position restored");
                self.state.restore_cursor();
                2
            }
            b'M' => {
                log::trace!(target: SEQ, "RI: move cursor 1 line up");
                let (x, y) = self.state.buffer.cursor();
                if y == self.state.scroll_start {
                    let cell = self.state.cell;
                    let (top, bottom) = (self.state.scroll_start, self.state.scroll_end);
                    self.insert_lines(1, top, bottom, cell);
                } else {
                    self.state.buffer.set_cursor(x, y.saturating_sub(1));
                }
                2
            }
            b'(' => {
                if window.len() < 3 {
                    return 0;
                }
                match window[2] {
                    b'0' => {
                        log::trace!(target: SEQ, "line drawing set selected");
                        self.line_drawing_set = true;
                    }
                    b'B' => {
                        log::trace!(target: SEQ, "normal character set selected");
                        self.line_drawing_set = false;
                    }
                    other => self.charset_final(other),
                }
                3
            }
            b')' | b'*' | b'+' => {
                if window.len() < 3 {
                    return 0;
                }
                self.charset_final(window[2]);
                3
            }
            b'=' => {
                log::trace!(target: SEQ, "application keypad mode enabled");
                self.keypad_mode = KeypadMode::Application;
                2
            }
            b'>' => {
                log::trace!(target: SEQ, "normal keypad mode enabled");
                self.keypad_mode = KeypadMode::Normal;
                2
            }
            other => {
                log::debug!(
                    target: SEQ_UNKNOWN,
                    "unknown escape sequence ESC {:?}",
                    other as char
                );
                2
            }
        }
    }

    fn charset_final(&mut self, byte: u8) {
        if byte != b'B' {
            log::debug!(
                target: SEQ_WONT_SUPPORT,
                "unknown (possibly mismatched) character set final char {:?}",
                byte as char
            );
        }
    }

    // ── C0 controls ───────────────────────────────────────────────────────────

    fn parse_tab(&mut self) {
        self.normalize_cursor();
        let (x, y) = self.state.buffer.cursor();
        let next = (x / 8 + 1) * 8;
        self.state.buffer.set_cursor(next.min(self.width()), y);
        log::trace!(target: SEQ, "TAB: cursor col is {}", next.min(self.width()));
    }

    fn parse_lf(&mut self) {
        log::trace!(target: SEQ, "LF");
        self.state.mark_line_end();
        // Double width and height end with the line.
        self.state.cell.font.set_size(1).set_double_width(false);
        let (x, y) = self.state.buffer.cursor();
        let mut y = y + 1;
        if y == self.state.scroll_end {
            let cell = self.state.cell;
            let (top, bottom) = (self.state.scroll_start, self.state.scroll_end);
            self.delete_lines(1, top, bottom, cell);
            y -= 1;
        }
        self.state.buffer.set_cursor(x, y);
        // LF takes immediate effect on the cursor.
        self.normalize_cursor();
    }

    fn parse_cr(&mut self) {
        log::trace!(target: SEQ, "CR");
        let (_, y) = self.state.buffer.cursor();
        self.state.buffer.set_cursor(0, y);
    }

    fn parse_backspace(&mut self) {
        log::trace!(target: SEQ, "BACKSPACE");
        let (x, y) = self.state.buffer.cursor();
        if x == 0 {
            let y = y.saturating_sub(1);
            self.state.buffer.set_cursor(self.width() - 1, y);
        } else {
            self.state.buffer.set_cursor(x - 1, y);
        }
    }

    // ── Printable characters ──────────────────────────────────────────────────

    fn write_codepoint(&mut self, codepoint: char) {
        let mut codepoint = codepoint;
        if self.line_drawing_set && ('\u{6a}'..='\u{78}').contains(&codepoint) {
            let mapped = LINE_DRAWING_CHARS[codepoint as usize - 0x6a];
            if mapped != '\0' {
                codepoint = mapped;
            }
        }
        self.normalize_cursor();
        let (x, y) = self.state.buffer.cursor();
        let template = self.state.cell;
        let cell = self.state.buffer.at_mut(x, y);
        *cell = template;
        cell.codepoint = codepoint;
        self.state.buffer.set_cursor(x + 1, y);
        // A two-column codepoint forces the double-width font on its cell.
        if UnicodeWidthChar::width(codepoint) == Some(2) && !template.font.double_width() {
            self.state.buffer.at_mut(x, y).font.set_double_width(true);
        }
    }

    /// Reconciles a transiently off-screen cursor before a write. This is
    /// the single choke point where deferred wrapping (and the scrolling it
    /// may cause) actually happens.
    fn normalize_cursor(&mut self) {
        let width = self.state.buffer.width();
        let height = self.state.buffer.height();
        let (mut x, mut y) = self.state.buffer.cursor();
        while x >= width {
            x -= width;
            y += 1;
            if y == self.state.scroll_end {
                let cell = self.state.cell;
                let (top, bottom) = (self.state.scroll_start, self.state.scroll_end);
                self.delete_lines(1, top, bottom, cell);
                y -= 1;
            }
        }
        if y >= height {
            y = height - 1;
        }
        self.state.buffer.set_cursor(x, y);
        self.state.last_character = Some((x, y));
    }

    // ── Line and character editing ────────────────────────────────────────────

    fn insert_lines(&mut self, lines: usize, top: usize, bottom: usize, fill: Cell) {
        if top >= bottom || bottom > self.state.buffer.height() {
            return;
        }
        for _ in 0..lines {
            self.state.buffer.insert_line(top, bottom, fill);
        }
    }

    /// Deletes lines inside `top..bottom`. Lines leaving through the top of
    /// the screen are captured into the scrollback, unless the alternate
    /// screen is active or the scrollback is disabled.
    fn delete_lines(&mut self, lines: usize, top: usize, bottom: usize, fill: Cell) {
        if top >= bottom || bottom > self.state.buffer.height() {
            return;
        }
        for _ in 0..lines {
            if !self.alternate_mode && self.history.max_rows() > 0 && top == 0 {
                let row = self
                    .state
                    .buffer
                    .copy_row(top, self.palette.default_background());
                let width = self.state.buffer.width();
                self.history.push(row, width);
            }
            self.state.buffer.delete_line(top, bottom, fill);
        }
    }

    fn insert_characters(&mut self, count: usize) {
        let (x, y) = self.state.buffer.cursor();
        let width = self.state.buffer.width();
        if x >= width || y >= self.state.buffer.height() {
            return;
        }
        let count = count.min(width - x);
        if count == 0 {
            return;
        }
        let template = self.state.cell;
        let row = self.state.buffer.row_mut(y);
        row[x..].rotate_right(count);
        for cell in &mut row[x..x + count] {
            *cell = template;
        }
    }

    fn delete_characters(&mut self, count: usize) {
        let (x, y) = self.state.buffer.cursor();
        let width = self.state.buffer.width();
        if x >= width || y >= self.state.buffer.height() {
            return;
        }
        let count = count.min(width - x);
        if count == 0 {
            return;
        }
        let template = self.state.cell;
        let row = self.state.buffer.row_mut(y);
        row[x..].rotate_left(count);
        for cell in &mut row[width - count..] {
            *cell = template;
        }
    }

    // ── CSI ───────────────────────────────────────────────────────────────────

    fn handle_csi(&mut self, mut seq: CsiSequence) {
        if !self.try_csi(&mut seq) {
            log::debug!(target: SEQ_UNKNOWN, "unknown CSI sequence {seq}");
        }
    }

    #[allow(clippy::too_many_lines, reason = "one arm per CSI final byte")]
    fn try_csi(&mut self, seq: &mut CsiSequence) -> bool {
        match seq.first_byte() {
            0 => {}
            b'?' => {
                return match seq.final_byte() {
                    b'h' => {
                        self.set_private_modes(seq, true);
                        true
                    }
                    b'l' => {
                        self.set_private_modes(seq, false);
                        true
                    }
                    b's' | b'r' => {
                        for i in 0..seq.num_args() {
                            log::debug!(
                                target: SEQ_WONT_SUPPORT,
                                "private mode {}, id {}",
                                if seq.final_byte() == b's' { "save" } else { "restore" },
                                seq.arg(i)
                            );
                        }
                        true
                    }
                    _ => false,
                };
            }
            b'>' => {
                if seq.final_byte() == b'c' && seq.arg(0) == 0 {
                    log::trace!(target: SEQ, "secondary device attributes - VT100 sent");
                    self.reply(b"\x1b[>0;0;0c");
                    return true;
                }
                return false;
            }
            _ => return false,
        }
        let width = self.state.buffer.width();
        let height = self.state.buffer.height();
        match seq.final_byte() {
            // ICH: insert blank characters.
            b'@' => {
                seq.set_default(0, 1);
                log::trace!(target: SEQ, "ICH: insertCharacter {}", seq.arg(0));
                self.insert_characters(seq.arg(0).max(0) as usize);
                true
            }
            // CUU: cursor up.
            b'A' => {
                seq.set_default(0, 1);
                if seq.num_args() != 1 {
                    return false;
                }
                let (x, y) = self.state.buffer.cursor();
                let y = y.saturating_sub(seq.arg(0).max(0) as usize);
                log::trace!(target: SEQ, "CUU: setCursor {x}, {y}");
                self.state.buffer.set_cursor(x, y);
                true
            }
            // CUD: cursor down.
            b'B' => {
                seq.set_default(0, 1);
                if seq.num_args() != 1 {
                    return false;
                }
                let (x, y) = self.state.buffer.cursor();
                let y = (y + seq.arg(0).max(0) as usize).min(height - 1);
                log::trace!(target: SEQ, "CUD: setCursor {x}, {y}");
                self.state.buffer.set_cursor(x, y);
                true
            }
            // CUF: cursor forward.
            b'C' => {
                seq.set_default(0, 1);
                if seq.num_args() != 1 {
                    return false;
                }
                let (x, y) = self.state.buffer.cursor();
                let x = (x + seq.arg(0).max(0) as usize).min(width);
                log::trace!(target: SEQ, "CUF: setCursor {x}, {y}");
                self.state.buffer.set_cursor(x, y);
                true
            }
            // CUB: cursor backward.
            b'D' => {
                seq.set_default(0, 1);
                if seq.num_args() != 1 {
                    return false;
                }
                let (x, y) = self.state.buffer.cursor();
                let x = x.saturating_sub(seq.arg(0).max(0) as usize);
                log::trace!(target: SEQ, "CUB: setCursor {x}, {y}");
                self.state.buffer.set_cursor(x, y);
                true
            }
            // CHA: cursor character absolute.
            b'G' => {
                seq.set_default(0, 1);
                let x = (seq.arg(0).max(1) as usize - 1).min(width - 1);
                let (_, y) = self.state.buffer.cursor();
                log::trace!(target: SEQ, "CHA: set column {x}");
                self.state.buffer.set_cursor(x, y);
                true
            }
            // CUP / HVP: set cursor position.
            b'H' | b'f' => {
                seq.set_default(0, 1).set_default(1, 1);
                if seq.num_args() != 2 {
                    return false;
                }
                seq.conditional_replace(0, 0, 1);
                seq.conditional_replace(1, 0, 1);
                let x = (seq.arg(1) as usize - 1).min(width - 1);
                let y = (seq.arg(0) as usize - 1).min(height - 1);
                log::trace!(target: SEQ, "CUP: setCursor {x}, {y}");
                self.state.buffer.set_cursor(x, y);
                true
            }
            // ED: erase display.
            b'J' => {
                if seq.num_args() > 1 {
                    return false;
                }
                let fill = self.state.cell;
                match seq.arg(0) {
                    0 => {
                        self.normalize_cursor();
                        let (x, y) = self.state.buffer.cursor();
                        self.state.buffer.fill_rect(x..width, y..y + 1, fill);
                        self.state.buffer.fill_rect(0..width, y + 1..height, fill);
                        true
                    }
                    1 => {
                        self.normalize_cursor();
                        let (x, y) = self.state.buffer.cursor();
                        self.state.buffer.fill_rect(0..width, 0..y, fill);
                        self.state.buffer.fill_rect(0..x + 1, y..y + 1, fill);
                        true
                    }
                    2 => {
                        self.state.buffer.fill_rect(0..width, 0..height, fill);
                        true
                    }
                    _ => false,
                }
            }
            // EL: erase in line.
            b'K' => {
                if seq.num_args() > 1 {
                    return false;
                }
                let fill = self.state.cell;
                match seq.arg(0) {
                    0 => {
                        self.normalize_cursor();
                        let (x, y) = self.state.buffer.cursor();
                        self.state.buffer.fill_rect(x..width, y..y + 1, fill);
                        true
                    }
                    1 => {
                        self.normalize_cursor();
                        let (x, y) = self.state.buffer.cursor();
                        self.state.buffer.fill_rect(0..x + 1, y..y + 1, fill);
                        true
                    }
                    2 => {
                        self.normalize_cursor();
                        let (_, y) = self.state.buffer.cursor();
                        self.state.buffer.fill_rect(0..width, y..y + 1, fill);
                        true
                    }
                    _ => false,
                }
            }
            // IL: insert lines at the cursor.
            b'L' => {
                seq.set_default(0, 1);
                log::trace!(target: SEQ, "IL: insert {} lines", seq.arg(0));
                let (_, y) = self.state.buffer.cursor();
                let (cell, bottom) = (self.state.cell, self.state.scroll_end);
                self.insert_lines(seq.arg(0).max(0) as usize, y, bottom, cell);
                true
            }
            // DL: delete lines at the cursor.
            b'M' => {
                seq.set_default(0, 1);
                log::trace!(target: SEQ, "DL: delete {} lines", seq.arg(0));
                let (_, y) = self.state.buffer.cursor();
                let (cell, bottom) = (self.state.cell, self.state.scroll_end);
                self.delete_lines(seq.arg(0).max(0) as usize, y, bottom, cell);
                true
            }
            // DCH: delete characters.
            b'P' => {
                seq.set_default(0, 1);
                log::trace!(target: SEQ, "DCH: deleteCharacter {}", seq.arg(0));
                self.delete_characters(seq.arg(0).max(0) as usize);
                true
            }
            // SU: scroll region up.
            b'S' => {
                seq.set_default(0, 1);
                log::trace!(target: SEQ, "SU: scrollUp {}", seq.arg(0));
                let (cell, top, bottom) =
                    (self.state.cell, self.state.scroll_start, self.state.scroll_end);
                self.delete_lines(seq.arg(0).max(0) as usize, top, bottom, cell);
                true
            }
            // SD: scroll region down.
            b'T' => {
                seq.set_default(0, 1);
                log::trace!(target: SEQ, "SD: scrollDown {}", seq.arg(0));
                let (cell, top, bottom) =
                    (self.state.cell, self.state.scroll_start, self.state.scroll_end);
                self.insert_lines(seq.arg(0).max(0) as usize, top, bottom, cell);
                true
            }
            // ECH: erase characters forward, wrapping across rows.
            b'X' => {
                seq.set_default(0, 1);
                if seq.num_args() != 1 {
                    return false;
                }
                self.normalize_cursor();
                let fill = self.state.cell;
                let (x, y) = self.state.buffer.cursor();
                let mut n = seq.arg(0).max(0) as usize;
                let first = n.min(width - x);
                self.state.buffer.fill_rect(x..x + first, y..y + 1, fill);
                n -= first;
                let mut row = y + 1;
                while n >= width && row < height {
                    self.state.buffer.fill_row(row, fill);
                    row += 1;
                    n -= width;
                }
                if n != 0 && row < height {
                    self.state.buffer.fill_rect(0..n, row..row + 1, fill);
                }
                true
            }
            // REP: repeat the previous cell.
            b'b' => {
                seq.set_default(0, 1);
                let n = seq.arg(0).max(0) as usize;
                let (x, y) = self.state.buffer.cursor();
                if x == 0 || x + n >= width {
                    log::warn!(target: SEQ_ERROR, "repeat previous character out of bounds");
                } else {
                    log::trace!(target: SEQ, "repeat previous character {n} times");
                    let prev = *self.state.buffer.at(x - 1, y);
                    for i in 0..n {
                        *self.state.buffer.at_mut(x + i, y) = prev;
                    }
                    self.state.buffer.set_cursor(x + n, y);
                }
                true
            }
            // DA: primary device attributes.
            b'c' => {
                if seq.arg(0) != 0 {
                    return false;
                }
                log::trace!(target: SEQ, "device attributes - VT102 sent");
                self.reply(b"\x1b[?6c");
                true
            }
            // VPA: line position absolute.
            b'd' => {
                seq.set_default(0, 1);
                if seq.num_args() != 1 {
                    return false;
                }
                let row = (seq.arg(0).clamp(1, height as i32) as usize) - 1;
                let (x, _) = self.state.buffer.cursor();
                log::trace!(target: SEQ, "VPA: setCursor {x}, {row}");
                self.state.buffer.set_cursor(x, row);
                true
            }
            // SM: none of the non-private set-modes are supported.
            b'h' => false,
            // RM: replace mode (IRM) is the only mode we run in; disabling
            // insert mode is therefore accepted silently.
            b'l' => {
                seq.set_default(0, 0);
                seq.arg(0) == 4
            }
            b'm' => {
                self.handle_sgr(seq);
                true
            }
            // DSR: status report.
            b'n' => match seq.arg(0) {
                5 => {
                    self.reply(b"\x1b[0n");
                    true
                }
                6 => {
                    let (x, y) = self.state.buffer.cursor();
                    let reply = format!("\x1b[{};{}R", y + 1, x + 1);
                    self.reply(reply.as_bytes());
                    true
                }
                _ => false,
            },
            // DECSTBM: set the scroll region.
            b'r' => {
                seq.set_default(0, 1).set_default(1, height as i32);
                if seq.num_args() != 2 {
                    return false;
                }
                seq.conditional_replace(0, 0, 1);
                seq.conditional_replace(1, 0, 1);
                let start = seq.arg(0) as usize;
                let end = seq.arg(1) as usize;
                if start > height || end > height || start > end {
                    return false;
                }
                self.state.scroll_start = (start - 1).min(height - 1);
                self.state.scroll_end = end.min(height);
                self.state.buffer.set_cursor(0, 0);
                log::trace!(
                    target: SEQ,
                    "scroll region set to {} - {}",
                    self.state.scroll_start,
                    self.state.scroll_end
                );
                true
            }
            // Window manipulation: recognize the title stack save/restore
            // pair, ignore the rest.
            b't' => {
                seq.set_default(0, 0).set_default(1, 0).set_default(2, 0);
                matches!(seq.arg(0), 22 | 23) && seq.arg(1) == 0 && seq.arg(2) == 0
            }
            _ => false,
        }
    }

    fn set_private_modes(&mut self, seq: &mut CsiSequence, value: bool) {
        for i in 0..seq.num_args() {
            match seq.arg(i) {
                // DECCKM: application cursor keys.
                1 => {
                    self.cursor_mode = if value {
                        CursorMode::Application
                    } else {
                        CursorMode::Normal
                    };
                    log::trace!(target: SEQ, "application cursor mode: {value}");
                }
                4 => log::debug!(target: SEQ_WONT_SUPPORT, "smooth scrolling: {value}"),
                // DECAWM stays enabled.
                7 => {
                    if value {
                        log::trace!(target: SEQ, "autowrap mode enable (by default)");
                    } else {
                        log::debug!(
                            target: SEQ_UNKNOWN,
                            "CSI?7l, DECAWM does not support being disabled"
                        );
                    }
                }
                12 => {
                    self.cursor.blink = value;
                    log::trace!(target: SEQ, "cursor blinking: {value}");
                }
                25 => {
                    self.cursor.visible = value;
                    log::trace!(target: SEQ, "cursor visible: {value}");
                }
                1000 => {
                    self.mouse_mode = if value { MouseMode::Normal } else { MouseMode::Off };
                    log::trace!(target: SEQ, "normal mouse tracking: {value}");
                }
                // Highlight tracking can hang the terminal without a
                // cooperating application.
                1001 => log::debug!(target: SEQ_WONT_SUPPORT, "hilite mouse mode"),
                1002 => {
                    self.mouse_mode = if value {
                        MouseMode::ButtonEvent
                    } else {
                        MouseMode::Off
                    };
                    log::trace!(target: SEQ, "button-event mouse tracking: {value}");
                }
                1003 => {
                    self.mouse_mode = if value { MouseMode::All } else { MouseMode::Off };
                    log::trace!(target: SEQ, "all mouse tracking: {value}");
                }
                1005 => log::debug!(target: SEQ_WONT_SUPPORT, "UTF8 mouse encoding: {value}"),
                1006 => {
                    self.mouse_encoding = if value {
                        MouseEncoding::Sgr
                    } else {
                        MouseEncoding::Default
                    };
                    log::trace!(target: SEQ, "SGR mouse encoding: {value}");
                }
                47 | 1049 => self.set_alternate_mode(value),
                2004 => {
                    self.bracketed_paste = value;
                    log::trace!(target: SEQ, "bracketed paste: {value}");
                }
                _ => {
                    log::debug!(target: SEQ_UNKNOWN, "invalid get/set command: {seq}");
                }
            }
        }
    }

    fn set_alternate_mode(&mut self, value: bool) {
        if self.alternate_mode == value {
            return;
        }
        // Any selection spans the old coordinate space; drop it.
        self.selection = None;
        std::mem::swap(&mut self.state, &mut self.state_backup);
        self.alternate_mode = value;
        if value {
            self.state.reset(
                self.palette.default_foreground(),
                self.palette.default_background(),
            );
            self.state.invalidate_last_character();
            log::trace!(target: SEQ, "alternate mode on");
        } else {
            log::trace!(target: SEQ, "alternate mode off");
        }
    }

    // ── SGR ───────────────────────────────────────────────────────────────────

    fn handle_sgr(&mut self, seq: &mut CsiSequence) {
        seq.set_default(0, 0);
        let mut i = 0;
        while i < seq.num_args() {
            match seq.arg(i) {
                0 => {
                    let fg = self.palette.default_foreground();
                    let bg = self.palette.default_background();
                    self.state.cell.fg = fg;
                    self.state.cell.decor = fg;
                    self.state.cell.bg = bg;
                    self.state.cell.font = crate::cell::Font::new();
                    self.state.inverse_mode = false;
                    log::trace!(target: SEQ, "font fg bg reset");
                }
                1 => {
                    self.state.cell.font.set_bold(true);
                    log::trace!(target: SEQ, "bold set");
                }
                2 => log::debug!(target: SEQ_WONT_SUPPORT, "faint font"),
                3 => {
                    self.state.cell.font.set_italic(true);
                    log::trace!(target: SEQ, "italics set");
                }
                4 => {
                    self.state.cell.font.set_underline(true);
                    log::trace!(target: SEQ, "underline set");
                }
                5 => {
                    self.state.cell.font.set_blink(true);
                    log::trace!(target: SEQ, "blink set");
                }
                7 => {
                    if !self.state.inverse_mode {
                        self.state.inverse_mode = true;
                        let fg = self.state.cell.fg;
                        let bg = self.state.cell.bg;
                        self.state.cell.fg = bg;
                        self.state.cell.decor = bg;
                        self.state.cell.bg = fg;
                        log::trace!(target: SEQ, "inverse mode on");
                    }
                }
                9 => {
                    self.state.cell.font.set_strikethrough(true);
                    log::trace!(target: SEQ, "strikethrough");
                }
                21 => {
                    self.state.cell.font.set_bold(false);
                    log::trace!(target: SEQ, "bold off");
                }
                22 => {
                    self.state.cell.font.set_bold(false).set_italic(false);
                    log::trace!(target: SEQ, "normal font set");
                }
                23 => {
                    self.state.cell.font.set_italic(false);
                    log::trace!(target: SEQ, "italic off");
                }
                24 => {
                    self.state.cell.font.set_underline(false);
                    log::trace!(target: SEQ, "underline off");
                }
                25 => {
                    self.state.cell.font.set_blink(false);
                    log::trace!(target: SEQ, "blink off");
                }
                27 => {
                    if self.state.inverse_mode {
                        self.state.inverse_mode = false;
                        let fg = self.state.cell.fg;
                        let bg = self.state.cell.bg;
                        self.state.cell.fg = bg;
                        self.state.cell.decor = bg;
                        self.state.cell.bg = fg;
                        log::trace!(target: SEQ, "inverse mode off");
                    }
                }
                29 => {
                    self.state.cell.font.set_strikethrough(false);
                    log::trace!(target: SEQ, "strikethrough off");
                }
                38 => {
                    let fg = self.sgr_extended_color(seq, &mut i);
                    self.state.cell.fg = fg;
                    self.state.cell.decor = fg;
                    log::trace!(target: SEQ, "fg set to {fg:?}");
                }
                39 => {
                    let fg = self.palette.default_foreground();
                    self.state.cell.fg = fg;
                    self.state.cell.decor = fg;
                    log::trace!(target: SEQ, "fg reset");
                }
                48 => {
                    let bg = self.sgr_extended_color(seq, &mut i);
                    self.state.cell.bg = bg;
                    log::trace!(target: SEQ, "bg set to {bg:?}");
                }
                49 => {
                    self.state.cell.bg = self.palette.default_background();
                    log::trace!(target: SEQ, "bg reset");
                }
                v @ 30..=37 => {
                    let mut index = (v - 30) as usize;
                    if self.bold_is_bright && self.state.cell.font.bold() {
                        index += 8;
                    }
                    let fg = self.palette.color(index);
                    self.state.cell.fg = fg;
                    self.state.cell.decor = fg;
                    log::trace!(target: SEQ, "fg set to {fg:?}");
                }
                v @ 40..=47 => {
                    self.state.cell.bg = self.palette.color((v - 40) as usize);
                }
                v @ 90..=97 => {
                    let fg = self.palette.color((v - 82) as usize);
                    self.state.cell.fg = fg;
                    self.state.cell.decor = fg;
                }
                v @ 100..=107 => {
                    self.state.cell.bg = self.palette.color((v - 92) as usize);
                }
                _ => {
                    log::debug!(target: SEQ_UNKNOWN, "invalid SGR code: {seq}");
                }
            }
            i += 1;
        }
    }

    /// Parses the extended color forms of SGR 38/48: `5 ; index` and
    /// `2 ; r ; g ; b`. Malformed or out-of-range specifications are logged
    /// and substituted with white.
    fn sgr_extended_color(&self, seq: &CsiSequence, i: &mut usize) -> Color {
        *i += 1;
        if *i < seq.num_args() {
            let mode = seq.arg(*i);
            *i += 1;
            match mode {
                5 => {
                    let index = seq.arg(*i);
                    if *i < seq.num_args()
                        && (0..=255).contains(&index)
                        && (index as usize) < self.palette.len()
                    {
                        return self.palette.color(index as usize);
                    }
                }
                2 => {
                    *i += 2;
                    if *i < seq.num_args() {
                        let (r, g, b) = (seq.arg(*i - 2), seq.arg(*i - 1), seq.arg(*i));
                        if (0..=255).contains(&r) && (0..=255).contains(&g) && (0..=255).contains(&b)
                        {
                            return Color::rgb(r as u8, g as u8, b as u8);
                        }
                    }
                }
                _ => {}
            }
        }
        log::debug!(target: SEQ_UNKNOWN, "invalid extended color: {seq}");
        Color::WHITE
    }

    // ── OSC ───────────────────────────────────────────────────────────────────

    fn handle_osc(&mut self, seq: &OscSequence) {
        match seq.num() {
            // Window title (and icon name, which tracks the title).
            0 | 2 => {
                log::trace!(target: SEQ, "title change to {}", seq.value());
                self.pending_events
                    .push(TerminalEvent::TitleChange(seq.value().to_owned()));
            }
            // Icon name alone.
            1 => {}
            // Clipboard access.
            52 => {
                if let Some(text) = seq.value().strip_prefix("c;") {
                    log::trace!(target: SEQ, "clipboard set to {text}");
                    self.pending_events
                        .push(TerminalEvent::ClipboardSetRequest(text.to_owned()));
                } else {
                    log::debug!(target: SEQ_UNKNOWN, "invalid OSC sequence: {seq}");
                }
            }
            // Reset cursor color.
            112 => {
                log::trace!(target: SEQ, "cursor color reset");
                self.cursor.color = self.default_cursor.color;
            }
            _ => {
                log::debug!(target: SEQ_UNKNOWN, "invalid OSC sequence: {seq}");
            }
        }
    }

    // ── t++ ───────────────────────────────────────────────────────────────────

    fn handle_tpp(&mut self, seq: TppSequence) {
        log::trace!(
            target: SEQ,
            "t++ sequence {}, payload size {}",
            seq.kind,
            seq.payload.len()
        );
        match seq.kind {
            TppKind::Capabilities => self.reply(capabilities_reply()),
            _ => self.pending_events.push(TerminalEvent::Tpp(seq)),
        }
    }

    fn reply(&mut self, bytes: &[u8]) {
        log::trace!(target: SEQ_SENT, "{:?}", String::from_utf8_lossy(bytes));
        self.pending_replies.push(bytes.to_vec());
    }
}

// ── AnsiTerminal ──────────────────────────────────────────────────────────────

/// A running terminal: a [`Screen`] bound to a PTY with an internal reader
/// thread and an event listener.
pub struct AnsiTerminal {
    screen: Arc<PriorityLock<Screen>>,
    pty: Arc<dyn Pty>,
    reader: Option<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for AnsiTerminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnsiTerminal").finish_non_exhaustive()
    }
}

impl AnsiTerminal {
    /// Creates the terminal and starts its PTY reader thread.
    pub fn new(
        options: &TerminalOptions,
        pty: Box<dyn Pty>,
        listener: impl EventListener + 'static,
    ) -> Self {
        let screen = Arc::new(PriorityLock::new(Screen::new(options)));
        let pty: Arc<dyn Pty> = Arc::from(pty);
        let listener: Arc<dyn EventListener> = Arc::new(listener);
        let reader = Self::spawn_reader(Arc::clone(&screen), Arc::clone(&pty), listener);
        Self {
            screen,
            pty,
            reader: Some(reader),
        }
    }

    fn spawn_reader(
        screen: Arc<PriorityLock<Screen>>,
        pty: Arc<dyn Pty>,
        listener: Arc<dyn EventListener>,
    ) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            log::info!("PTY reader thread started");
            let mut pending: Vec<u8> = Vec::new();
            let mut chunk = [0u8; READ_BUFFER_SIZE];
            loop {
                match pty.receive(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        pending.extend_from_slice(&chunk[..n]);
                        let (consumed, replies, events) = {
                            let mut screen = screen.lock();
                            let consumed = screen.process_input(&pending);
                            (consumed, screen.drain_replies(), screen.drain_events())
                        };
                        pending.drain(..consumed);
                        for reply in replies {
                            if let Err(e) = pty.send(&reply) {
                                log::warn!("failed to send terminal reply: {e}");
                            }
                        }
                        for event in events {
                            listener.send_event(event);
                        }
                    }
                    Err(e) => {
                        log::warn!("PTY read failed: {e}");
                        break;
                    }
                }
            }
            log::info!("PTY reader thread exiting");
        })
    }

    /// Locks the screen in priority mode for reading cells, cursor, and
    /// history. Renderers hold the guard only while painting.
    pub fn screen(&self) -> PriorityLockGuard<'_, Screen> {
        self.screen.lock_priority()
    }

    /// Injects a key press.
    pub fn key_down(&self, code: KeyCode, modifiers: KeyModifiers) {
        let bytes = self.screen.lock_priority().encode_key_down(code, modifiers);
        if let Some(bytes) = bytes {
            self.send(&bytes);
        }
    }

    /// Key releases carry no wire encoding; provided for interface
    /// symmetry.
    pub fn key_up(&self, _code: KeyCode, _modifiers: KeyModifiers) {}

    /// Injects a printable character.
    pub fn key_char(&self, c: char) {
        if let Some(bytes) = Screen::encode_key_char(c) {
            self.send(&bytes);
        }
    }

    /// Injects a mouse button press at cell coordinates.
    pub fn mouse_down(&self, x: usize, y: usize, button: MouseButton, modifiers: KeyModifiers) {
        let bytes = self
            .screen
            .lock_priority()
            .encode_mouse_down(x, y, button, modifiers);
        if let Some(bytes) = bytes {
            self.send(&bytes);
        }
    }

    /// Injects a mouse button release.
    pub fn mouse_up(&self, x: usize, y: usize, button: MouseButton, modifiers: KeyModifiers) {
        let bytes = self
            .screen
            .lock_priority()
            .encode_mouse_up(x, y, button, modifiers);
        if let Some(bytes) = bytes {
            self.send(&bytes);
        }
    }

    /// Injects mouse motion.
    pub fn mouse_move(&self, x: usize, y: usize) {
        let bytes = self.screen.lock_priority().encode_mouse_move(x, y);
        if let Some(bytes) = bytes {
            self.send(&bytes);
        }
    }

    /// Injects a wheel event; positive `delta` scrolls up.
    pub fn mouse_wheel(&self, x: usize, y: usize, delta: i32, modifiers: KeyModifiers) {
        let bytes = self
            .screen
            .lock_priority()
            .encode_mouse_wheel(x, y, delta, modifiers);
        if let Some(bytes) = bytes {
            self.send(&bytes);
        }
    }

    /// Sends pasted text, framed when bracketed paste is active.
    pub fn paste(&self, text: &str) {
        let bytes = self.screen.lock_priority().encode_paste(text);
        self.send(&bytes);
    }

    /// Resizes both the emulated screen and the PTY.
    pub fn set_size(&self, cols: usize, rows: usize) {
        self.screen.lock_priority().resize(cols, rows);
        if let Err(e) = self.pty.resize(cols as u16, rows as u16) {
            log::warn!("failed to resize PTY: {e}");
        }
    }

    /// Terminates the child process; the reader thread exits on the
    /// resulting EOF.
    pub fn terminate(&self) {
        self.pty.terminate();
    }

    /// Waits for the child process to exit.
    pub fn wait_for(&self) -> Result<u32> {
        self.pty.wait_for()
    }

    fn send(&self, bytes: &[u8]) {
        log::trace!(target: SEQ_SENT, "{:?}", String::from_utf8_lossy(bytes));
        if let Err(e) = self.pty.send(bytes) {
            log::warn!("failed to send input to PTY: {e}");
        }
    }
}

impl Drop for AnsiTerminal {
    fn drop(&mut self) {
        self.pty.terminate();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}
