//! End-to-end byte-stream scenarios against the headless screen.

use pretty_assertions::assert_eq;
use termpp::{Color, PaletteKind, Screen, TerminalOptions};

fn options(cols: usize, rows: usize) -> TerminalOptions {
    TerminalOptions {
        cols,
        rows,
        max_history_rows: 100,
        palette: PaletteKind::Colors16,
        ..TerminalOptions::default()
    }
}

fn screen(cols: usize, rows: usize) -> Screen {
    Screen::new(&options(cols, rows))
}

fn feed(s: &mut Screen, input: &[u8]) {
    assert_eq!(s.process_input(input), input.len());
}

#[test]
fn plain_text_into_default_buffer() {
    let mut s = screen(80, 24);
    feed(&mut s, b"ABC");
    for (x, c) in ['A', 'B', 'C'].into_iter().enumerate() {
        let cell = s.cell(x, 0);
        assert_eq!(cell.codepoint, c);
        assert_eq!(cell.fg, s.palette().default_foreground());
        assert_eq!(cell.bg, s.palette().default_background());
    }
    assert_eq!(s.cursor_position(), (3, 0));
}

#[test]
fn carriage_return_line_feed() {
    let mut s = screen(80, 24);
    feed(&mut s, b"ABC\r\nDEF");
    assert_eq!(s.row_text(0).trim_end(), "ABC");
    assert_eq!(s.row_text(1).trim_end(), "DEF");
    assert_eq!(s.cursor_position(), (3, 1));
    // The line feed marked the end of the first logical line.
    assert!(s.cell(2, 0).is_line_end());
}

#[test]
fn sgr_color_covers_only_its_span() {
    let mut s = screen(80, 24);
    feed(&mut s, b"\x1b[31mX\x1b[0mY");
    assert_eq!(s.cell(0, 0).codepoint, 'X');
    assert_eq!(s.cell(0, 0).fg, Color::DARK_RED);
    assert_eq!(s.cell(1, 0).codepoint, 'Y');
    assert_eq!(s.cell(1, 0).fg, s.palette().default_foreground());
}

#[test]
fn clear_screen_and_home() {
    let mut s = screen(80, 24);
    feed(&mut s, b"some earlier output\r\nmore");
    feed(&mut s, b"\x1b[2J\x1b[H");
    assert_eq!(s.contents().trim(), "");
    assert_eq!(s.cursor_position(), (0, 0));
    for y in 0..s.height() {
        for x in 0..s.width() {
            assert_eq!(s.cell(x, y).codepoint, ' ');
            assert_eq!(s.cell(x, y).bg, s.palette().default_background());
        }
    }
}

#[test]
fn alternate_screen_round_trip_preserves_primary() {
    let mut s = screen(80, 24);
    feed(&mut s, b"shell prompt $ ");
    let contents = s.contents();
    let cursor = s.cursor_position();
    feed(&mut s, b"\x1b[?1049h\x1b[H");
    feed(&mut s, b"A");
    assert!(s.alternate_mode());
    assert_eq!(s.cell(0, 0).codepoint, 'A');
    feed(&mut s, b"\x1b[?1049l");
    assert!(!s.alternate_mode());
    assert_eq!(s.contents(), contents);
    assert_eq!(s.cursor_position(), cursor);
}

#[test]
fn autowrap_and_reflowing_resize() {
    let mut s = screen(5, 3);
    feed(&mut s, b"Hello World");
    // The text wrapped over three rows.
    assert_eq!(s.row_text(0), "Hello");
    assert_eq!(s.contents().replace('\n', "").trim_end(), "Hello World");
    s.resize(11, 3);
    assert_eq!(s.row_text(0), "Hello World");
    assert!(!s.cell(4, 0).is_line_end());
    // The cursor sits one past the last column until the next write.
    assert_eq!(s.cursor_position(), (11, 0));
    feed(&mut s, b"x");
    assert_eq!(s.cursor_position(), (1, 1));
}

#[test]
fn cursor_invariants_hold_after_arbitrary_input() {
    let mut s = screen(10, 4);
    let stream: &[u8] =
        b"\x1b[99;99Hxyz\x1b[1;1H\x1b[5Luvw\x1b[9Mfill\x1b[3;8r\r\n\r\n\r\n\r\n\x1b[rdone\x1b[6n";
    feed(&mut s, stream);
    let (x, y) = s.cursor_position();
    assert!(x <= s.width());
    assert!(y < s.height());
}

#[test]
fn erase_characters_stops_at_buffer_bottom() {
    let mut s = screen(4, 2);
    feed(&mut s, b"aaaa\r\nbbbb");
    feed(&mut s, b"\x1b[2;3H\x1b[99X");
    assert_eq!(s.row_text(0), "aaaa");
    assert_eq!(s.row_text(1), "bb  ");
}

#[test]
fn history_keeps_trimmed_scrolled_rows() {
    let mut s = screen(10, 2);
    feed(&mut s, b"first\r\nsecond\r\nthird");
    assert_eq!(s.history().len(), 1);
    let row = s.history().row(0);
    let text: String = row.iter().map(|c| c.codepoint).collect();
    assert_eq!(text, "first");
    assert!(row.last().unwrap().is_line_end());
    assert!(s.history().len() <= 100);
}

#[test]
fn device_status_replies_are_wire_exact() {
    let mut s = screen(80, 24);
    feed(&mut s, b"\x1b[c\x1b[5n\x1b[3;7H\x1b[6n\x1b[>c");
    let replies = s.drain_replies();
    let flat: Vec<&[u8]> = replies.iter().map(Vec::as_slice).collect();
    assert_eq!(
        flat,
        vec![
            b"\x1b[?6c" as &[u8],
            b"\x1b[0n",
            b"\x1b[3;7R",
            b"\x1b[>0;0;0c",
        ]
    );
}
