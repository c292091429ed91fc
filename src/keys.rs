//! The static key-to-bytes table.
//!
//! Maps `(key, modifiers)` pairs to the byte sequences a VT100-style
//! terminal sends for them: plain and modified letters and digits, the Alt
//! symbol row, arrows and function keys with their `ESC [ 1 ; m X`
//! modifier forms, and the handful of Ctrl punctuation controls.
//!
//! The table is pure data, built once per process on first use and never
//! mutated afterwards.

use std::collections::HashMap;
use std::sync::OnceLock;

use crossterm::event::{KeyCode, KeyModifiers};

const ESC: u8 = 0x1b;

type KeyMap = HashMap<(KeyCode, KeyModifiers), Vec<u8>>;

/// The seven modifier combinations that use the `ESC [ <base> ; m <final>`
/// form, with `m = 1 + shift(1) + alt(2) + ctrl(4)`.
const MODIFIER_COMBOS: [KeyModifiers; 7] = [
    KeyModifiers::SHIFT,
    KeyModifiers::ALT,
    KeyModifiers::SHIFT.union(KeyModifiers::ALT),
    KeyModifiers::CONTROL,
    KeyModifiers::CONTROL.union(KeyModifiers::SHIFT),
    KeyModifiers::CONTROL.union(KeyModifiers::ALT),
    KeyModifiers::CONTROL
        .union(KeyModifiers::ALT)
        .union(KeyModifiers::SHIFT),
];

fn modifier_code(mods: KeyModifiers) -> u8 {
    1 + u8::from(mods.contains(KeyModifiers::SHIFT))
        + 2 * u8::from(mods.contains(KeyModifiers::ALT))
        + 4 * u8::from(mods.contains(KeyModifiers::CONTROL))
}

fn build_key_map() -> KeyMap {
    let mut map = KeyMap::new();
    let mut key = |code: KeyCode, mods: KeyModifiers, seq: Vec<u8>| {
        map.insert((code, mods), seq);
    };

    // Letters and their Shift/Ctrl/Alt combinations. Stored uppercase;
    // lookups normalize the case (see `normalize`).
    for c in b'A'..=b'Z' {
        let code = KeyCode::Char(c as char);
        let lower = c + 32;
        let ctrl = c - b'A' + 1;
        key(code, KeyModifiers::NONE, vec![lower]);
        key(code, KeyModifiers::SHIFT, vec![c]);
        key(code, KeyModifiers::CONTROL, vec![ctrl]);
        key(code, KeyModifiers::CONTROL | KeyModifiers::SHIFT, vec![ctrl]);
        key(code, KeyModifiers::ALT, vec![ESC, lower]);
        key(code, KeyModifiers::ALT | KeyModifiers::SHIFT, vec![ESC, c]);
        key(code, KeyModifiers::ALT | KeyModifiers::CONTROL, vec![ESC, ctrl]);
        key(
            code,
            KeyModifiers::ALT | KeyModifiers::CONTROL | KeyModifiers::SHIFT,
            vec![ESC, ctrl],
        );
    }

    // Digits, their Alt variants, and the Alt+Shift symbol row.
    for c in b'0'..=b'9' {
        let code = KeyCode::Char(c as char);
        key(code, KeyModifiers::NONE, vec![c]);
        key(code, KeyModifiers::ALT, vec![ESC, c]);
    }
    key(KeyCode::Char('0'), KeyModifiers::CONTROL, vec![0]);
    for (i, s) in b")!@#$%^&*(".iter().enumerate() {
        key(
            KeyCode::Char((b'0' + i as u8) as char),
            KeyModifiers::ALT | KeyModifiers::SHIFT,
            vec![ESC, *s],
        );
    }

    // Punctuation with Alt, in both the unshifted and shifted spellings so
    // renderers reporting either form resolve.
    for &(base, shifted) in &[
        (b'`', b'~'),
        (b'-', b'_'),
        (b'=', b'+'),
        (b'[', b'{'),
        (b']', b'}'),
        (b'\\', b'|'),
        (b';', b':'),
        (b'\'', b'"'),
        (b',', b'<'),
        (b'.', b'>'),
        (b'/', b'?'),
    ] {
        key(KeyCode::Char(base as char), KeyModifiers::ALT, vec![ESC, base]);
        key(
            KeyCode::Char(base as char),
            KeyModifiers::ALT | KeyModifiers::SHIFT,
            vec![ESC, shifted],
        );
        key(
            KeyCode::Char(shifted as char),
            KeyModifiers::ALT,
            vec![ESC, shifted],
        );
    }

    // Arrows, editing keys, and function keys.
    let plain: &[(KeyCode, &[u8])] = &[
        (KeyCode::Up, b"\x1b[A"),
        (KeyCode::Down, b"\x1b[B"),
        (KeyCode::Right, b"\x1b[C"),
        (KeyCode::Left, b"\x1b[D"),
        (KeyCode::Home, b"\x1b[H"),
        (KeyCode::End, b"\x1b[F"),
        (KeyCode::PageUp, b"\x1b[5~"),
        (KeyCode::PageDown, b"\x1b[6~"),
        (KeyCode::Insert, b"\x1b[2~"),
        (KeyCode::Delete, b"\x1b[3~"),
        (KeyCode::F(1), b"\x1bOP"),
        (KeyCode::F(2), b"\x1bOQ"),
        (KeyCode::F(3), b"\x1bOR"),
        (KeyCode::F(4), b"\x1bOS"),
        (KeyCode::F(5), b"\x1b[15~"),
        (KeyCode::F(6), b"\x1b[17~"),
        (KeyCode::F(7), b"\x1b[18~"),
        (KeyCode::F(8), b"\x1b[19~"),
        (KeyCode::F(9), b"\x1b[20~"),
        (KeyCode::F(10), b"\x1b[21~"),
        (KeyCode::F(11), b"\x1b[23~"),
        (KeyCode::F(12), b"\x1b[24~"),
        (KeyCode::Enter, b"\r"),
        (KeyCode::Tab, b"\t"),
        (KeyCode::Esc, b"\x1b"),
        (KeyCode::Backspace, b"\x7f"),
    ];
    for &(code, seq) in plain {
        key(code, KeyModifiers::NONE, seq.to_vec());
    }

    // `ESC [ <base> ; m <final>` modifier variants.
    let modified: &[(KeyCode, &[u8], u8)] = &[
        (KeyCode::Up, b"\x1b[1;", b'A'),
        (KeyCode::Down, b"\x1b[1;", b'B'),
        (KeyCode::Left, b"\x1b[1;", b'D'),
        (KeyCode::Right, b"\x1b[1;", b'C'),
        (KeyCode::Home, b"\x1b[1;", b'H'),
        (KeyCode::End, b"\x1b[1;", b'F'),
        (KeyCode::PageUp, b"\x1b[5;", b'~'),
        (KeyCode::PageDown, b"\x1b[6;", b'~'),
        (KeyCode::F(1), b"\x1b[1;", b'P'),
        (KeyCode::F(2), b"\x1b[1;", b'Q'),
        (KeyCode::F(3), b"\x1b[1;", b'R'),
        (KeyCode::F(4), b"\x1b[1;", b'S'),
        (KeyCode::F(5), b"\x1b[15;", b'~'),
        (KeyCode::F(6), b"\x1b[17;", b'~'),
        (KeyCode::F(7), b"\x1b[18;", b'~'),
        (KeyCode::F(8), b"\x1b[19;", b'~'),
        (KeyCode::F(9), b"\x1b[20;", b'~'),
        (KeyCode::F(10), b"\x1b[21;", b'~'),
        (KeyCode::F(11), b"\x1b[23;", b'~'),
        (KeyCode::F(12), b"\x1b[24;", b'~'),
    ];
    for &(code, prefix, final_byte) in modified {
        for mods in MODIFIER_COMBOS {
            let mut seq = prefix.to_vec();
            seq.push(b'0' + modifier_code(mods));
            seq.push(final_byte);
            key(code, mods, seq);
        }
    }

    // Ctrl punctuation controls.
    key(KeyCode::Char('['), KeyModifiers::CONTROL, vec![0x1b]);
    key(KeyCode::Char('\\'), KeyModifiers::CONTROL, vec![0x1c]);
    key(KeyCode::Char(']'), KeyModifiers::CONTROL, vec![0x1d]);

    map
}

fn key_map() -> &'static KeyMap {
    static MAP: OnceLock<KeyMap> = OnceLock::new();
    MAP.get_or_init(build_key_map)
}

/// Folds the case of letter keys into the canonical uppercase-plus-SHIFT
/// form the table is keyed by.
fn normalize(code: KeyCode, modifiers: KeyModifiers) -> (KeyCode, KeyModifiers) {
    match code {
        KeyCode::Char(c) if c.is_ascii_lowercase() => {
            (KeyCode::Char(c.to_ascii_uppercase()), modifiers)
        }
        KeyCode::Char(c) if c.is_ascii_uppercase() => {
            (KeyCode::Char(c), modifiers | KeyModifiers::SHIFT)
        }
        _ => (code, modifiers),
    }
}

/// The byte sequence for a key press, if the table has one.
#[must_use]
pub fn sequence_for(code: KeyCode, modifiers: KeyModifiers) -> Option<&'static [u8]> {
    let (code, modifiers) = normalize(code, modifiers);
    key_map().get(&(code, modifiers)).map(Vec::as_slice)
}

/// Whether the key press produces a printable character and therefore
/// arrives through the character-input path instead of the key table
/// (letters with or without Shift, unmodified digits).
#[must_use]
pub fn is_printable(code: KeyCode, modifiers: KeyModifiers) -> bool {
    let (code, modifiers) = normalize(code, modifiers);
    match code {
        KeyCode::Char(c) if c.is_ascii_uppercase() => {
            modifiers.difference(KeyModifiers::SHIFT).is_empty()
        }
        KeyCode::Char(c) if c.is_ascii_digit() => modifiers.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_shifted_letters() {
        assert_eq!(sequence_for(KeyCode::Char('a'), KeyModifiers::NONE), Some(b"a" as &[u8]));
        assert_eq!(
            sequence_for(KeyCode::Char('A'), KeyModifiers::SHIFT),
            Some(b"A" as &[u8])
        );
        // Uppercase without the explicit SHIFT flag resolves too.
        assert_eq!(
            sequence_for(KeyCode::Char('A'), KeyModifiers::NONE),
            Some(b"A" as &[u8])
        );
    }

    #[test]
    fn control_letters() {
        assert_eq!(
            sequence_for(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(&[3u8] as &[u8])
        );
        assert_eq!(
            sequence_for(KeyCode::Char('z'), KeyModifiers::CONTROL),
            Some(&[26u8] as &[u8])
        );
    }

    #[test]
    fn alt_letters_are_escape_prefixed() {
        assert_eq!(
            sequence_for(KeyCode::Char('a'), KeyModifiers::ALT),
            Some(b"\x1ba" as &[u8])
        );
        assert_eq!(
            sequence_for(KeyCode::Char('A'), KeyModifiers::ALT | KeyModifiers::SHIFT),
            Some(b"\x1bA" as &[u8])
        );
    }

    #[test]
    fn arrows_and_modified_arrows() {
        assert_eq!(sequence_for(KeyCode::Up, KeyModifiers::NONE), Some(b"\x1b[A" as &[u8]));
        assert_eq!(
            sequence_for(KeyCode::Up, KeyModifiers::SHIFT),
            Some(b"\x1b[1;2A" as &[u8])
        );
        assert_eq!(
            sequence_for(KeyCode::Up, KeyModifiers::CONTROL),
            Some(b"\x1b[1;5A" as &[u8])
        );
        assert_eq!(
            sequence_for(
                KeyCode::Up,
                KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SHIFT
            ),
            Some(b"\x1b[1;8A" as &[u8])
        );
    }

    #[test]
    fn function_keys() {
        assert_eq!(sequence_for(KeyCode::F(1), KeyModifiers::NONE), Some(b"\x1bOP" as &[u8]));
        assert_eq!(
            sequence_for(KeyCode::F(5), KeyModifiers::NONE),
            Some(b"\x1b[15~" as &[u8])
        );
        assert_eq!(
            sequence_for(KeyCode::F(5), KeyModifiers::SHIFT),
            Some(b"\x1b[15;2~" as &[u8])
        );
        // F6 skips 16 in the VT numbering.
        assert_eq!(
            sequence_for(KeyCode::F(6), KeyModifiers::NONE),
            Some(b"\x1b[17~" as &[u8])
        );
    }

    #[test]
    fn editing_keys() {
        assert_eq!(sequence_for(KeyCode::Enter, KeyModifiers::NONE), Some(b"\r" as &[u8]));
        assert_eq!(
            sequence_for(KeyCode::Backspace, KeyModifiers::NONE),
            Some(b"\x7f" as &[u8])
        );
        assert_eq!(
            sequence_for(KeyCode::Delete, KeyModifiers::NONE),
            Some(b"\x1b[3~" as &[u8])
        );
    }

    #[test]
    fn ctrl_punctuation() {
        assert_eq!(
            sequence_for(KeyCode::Char('['), KeyModifiers::CONTROL),
            Some(&[0x1bu8] as &[u8])
        );
        assert_eq!(
            sequence_for(KeyCode::Char(']'), KeyModifiers::CONTROL),
            Some(&[0x1du8] as &[u8])
        );
    }

    #[test]
    fn alt_symbol_row() {
        assert_eq!(
            sequence_for(KeyCode::Char('2'), KeyModifiers::ALT | KeyModifiers::SHIFT),
            Some(b"\x1b@" as &[u8])
        );
        assert_eq!(
            sequence_for(KeyCode::Char(','), KeyModifiers::ALT | KeyModifiers::SHIFT),
            Some(b"\x1b<" as &[u8])
        );
    }

    #[test]
    fn printable_classification() {
        assert!(is_printable(KeyCode::Char('a'), KeyModifiers::NONE));
        assert!(is_printable(KeyCode::Char('A'), KeyModifiers::SHIFT));
        assert!(is_printable(KeyCode::Char('5'), KeyModifiers::NONE));
        assert!(!is_printable(KeyCode::Char('a'), KeyModifiers::CONTROL));
        assert!(!is_printable(KeyCode::Char('5'), KeyModifiers::ALT));
        assert!(!is_printable(KeyCode::Enter, KeyModifiers::NONE));
    }
}
