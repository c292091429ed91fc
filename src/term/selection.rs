//! Selection over the combined scrollback and live grid.
//!
//! Selections live in the combined coordinate space: history rows come
//! first (oldest at row 0), the live grid follows. Extraction walks the
//! selected cells and produces plain text, honoring end-of-line markers.

use super::Screen;

/// A half-open selection `[start, end)` over the combined
/// history-plus-live grid.
///
/// `end.1` is the first row *not* included; `end.0` bounds the last
/// included row. Rows in between span the full width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Starting cell `(x, y)` in combined coordinates, inclusive.
    pub start: (usize, usize),
    /// Ending cell `(x, y)` in combined coordinates, exclusive.
    pub end: (usize, usize),
}

impl Selection {
    /// Creates a selection from two corner points.
    #[must_use]
    pub fn new(start: (usize, usize), end: (usize, usize)) -> Self {
        Self { start, end }
    }
}

impl Screen {
    /// Stores the active selection.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    /// The active selection, if any.
    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Clears the active selection.
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Extracts the selected cells as text.
    ///
    /// Rows are concatenated in order. When a row's last included cell
    /// carries the end-of-line marker, a newline is emitted and trailing
    /// spaces and tabs on that line are trimmed. History rows narrower
    /// than the selected columns contribute only the cells they have.
    #[must_use]
    pub fn selection_text(&self, selection: &Selection) -> String {
        let mut result = String::new();
        let (mut col, mut row) = selection.start;
        let end_row = selection.end.1;
        let top = if self.alternate_mode {
            0
        } else {
            self.history.len()
        };
        while row < end_row {
            let col_limit = if row + 1 < end_row {
                self.width()
            } else {
                selection.end.0
            };
            let (cells, end_col) = if row < top {
                let cells = self.history.row(row);
                (cells, col_limit.min(cells.len()))
            } else {
                let y = row - top;
                if y >= self.height() {
                    break;
                }
                (self.state.buffer.row(y), col_limit.min(self.width()))
            };
            let mut line = String::new();
            while col < end_col {
                let cell = &cells[col];
                line.push(cell.codepoint);
                if cell.is_line_end() {
                    line.push('\n');
                }
                col += 1;
            }
            if !line.is_empty() {
                let trimmed = line.trim_end_matches([' ', '\t']);
                if trimmed.ends_with('\n') {
                    result.push_str(trimmed);
                } else {
                    result.push_str(&line);
                }
            }
            row += 1;
            col = 0;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::term::{PaletteKind, Screen, TerminalOptions};

    use super::*;

    fn screen(cols: usize, rows: usize, history: usize) -> Screen {
        Screen::new(&TerminalOptions {
            cols,
            rows,
            max_history_rows: history,
            palette: PaletteKind::Colors16,
            ..TerminalOptions::default()
        })
    }

    fn feed(s: &mut Screen, input: &[u8]) {
        assert_eq!(s.process_input(input), input.len());
    }

    #[test]
    fn extracts_simple_rows() {
        let mut s = screen(10, 3, 0);
        feed(&mut s, b"hello\r\nworld");
        let text = s.selection_text(&Selection::new((0, 0), (5, 2)));
        assert_eq!(text, "hello\nworld");
    }

    #[test]
    fn trims_trailing_whitespace_on_ended_lines() {
        let mut s = screen(10, 3, 0);
        feed(&mut s, b"hi\r\nrest");
        // Select the full first row; the cells after the line end are
        // spaces and must not survive extraction.
        let text = s.selection_text(&Selection::new((0, 0), (10, 1)));
        assert_eq!(text, "hi\n");
    }

    #[test]
    fn unfinished_lines_keep_their_spaces() {
        let mut s = screen(10, 2, 0);
        feed(&mut s, b"ab  ");
        let text = s.selection_text(&Selection::new((0, 0), (4, 1)));
        assert_eq!(text, "ab  ");
    }

    #[test]
    fn spans_history_and_live_grid() {
        let mut s = screen(5, 2, 10);
        feed(&mut s, b"one\r\ntwo\r\nthree");
        assert_eq!(s.history().len(), 1);
        // Combined rows: history "one", live "two", "three".
        let text = s.selection_text(&Selection::new((0, 0), (5, 3)));
        assert_eq!(text, "one\ntwo\nthree");
    }

    #[test]
    fn short_history_rows_contribute_nothing_past_their_width() {
        let mut s = screen(5, 2, 10);
        feed(&mut s, b"ab\r\nnext\r\nmore");
        // History row "ab" is 2 cells wide; selecting from column 3 on it
        // yields nothing for that row.
        let text = s.selection_text(&Selection::new((3, 0), (5, 2)));
        assert_eq!(text, "next\n");
    }

    #[test]
    fn wide_characters_extract_as_codepoints() {
        let mut s = screen(10, 1, 0);
        feed(&mut s, "世x".as_bytes());
        let text = s.selection_text(&Selection::new((0, 0), (2, 1)));
        assert_eq!(text, "世x");
    }

    #[test]
    fn stored_selection_is_cleared_by_alternate_screen() {
        let mut s = screen(10, 2, 0);
        s.set_selection(Selection::new((0, 0), (5, 1)));
        assert!(s.selection().is_some());
        feed(&mut s, b"\x1b[?1049h");
        assert!(s.selection().is_none());
    }
}
