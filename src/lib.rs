//! A VT100/ANSI terminal emulation engine.
//!
//! `termpp` turns the byte stream of a child process behind a
//! pseudoterminal into a 2D cell grid with scrollback, and encodes
//! renderer-side keyboard, mouse, and paste input back into the byte
//! sequences applications expect.
//!
//! The crate is renderer-agnostic: [`Screen`] is a headless state machine
//! that can be driven byte by byte, and [`AnsiTerminal`] adds the runtime
//! around it — a [`Pty`] connection, an internal reader thread, and a
//! priority lock giving the UI bounded latency over a flooding child.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::path::Path;
//!
//! use crossterm::event::{KeyCode, KeyModifiers};
//! use termpp::{build_command, AnsiTerminal, LocalPty, NoopListener, TerminalOptions};
//!
//! let options = TerminalOptions::default();
//! let command = build_command("sh", Path::new("/"), &HashMap::new());
//! let pty = LocalPty::spawn(command, options.cols as u16, options.rows as u16)?;
//! let term = AnsiTerminal::new(&options, Box::new(pty), NoopListener);
//!
//! term.key_char('l');
//! term.key_char('s');
//! term.key_down(KeyCode::Enter, KeyModifiers::NONE);
//! # anyhow::Ok(())
//! ```

// Library modules
pub mod buffer;
pub mod cell;
pub mod color;
pub mod history;
pub mod input;
pub mod keys;
pub mod lock;
pub mod palette;
pub mod parser;
pub mod pty;
pub mod term;
pub mod tpp;

// Re-export commonly used types
pub use buffer::Buffer;
pub use cell::{Cell, CellFlags, Cursor, Font, FontFlags};
pub use color::Color;
pub use history::History;
pub use lock::{PriorityLock, PriorityLockGuard};
pub use palette::Palette;
pub use pty::{build_command, LocalPty, Pty};
pub use term::{
    AnsiTerminal, CursorMode, EventListener, KeypadMode, MouseEncoding, MouseMode, NoopListener,
    PaletteKind, Screen, Selection, TerminalEvent, TerminalOptions,
};
pub use tpp::{TppKind, TppSequence};
