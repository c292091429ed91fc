//! Outbound input encoding.
//!
//! Helpers turning renderer-side mouse events into the byte sequences the
//! application expects, in either the classic single-byte encoding or the
//! SGR decimal encoding. Keyboard sequences come from the static table in
//! [`crate::keys`]; paste framing is handled by the terminal itself.

use crossterm::event::{KeyModifiers, MouseButton};

use crate::term::state::MouseEncoding;

/// Encodes a button plus modifiers into the mouse protocol button value.
///
/// Buttons are 0 (left), 1 (right), 2 (middle/wheel); modifiers add
/// shift = 4, alt = 8, ctrl = 16. Wheel events add 64 and motion events
/// add 32 on top of this, at the call site.
#[must_use]
pub fn encode_mouse_button(button: MouseButton, modifiers: KeyModifiers) -> u32 {
    let mods = u32::from(modifiers.contains(KeyModifiers::SHIFT)) * 4
        + u32::from(modifiers.contains(KeyModifiers::ALT)) * 8
        + u32::from(modifiers.contains(KeyModifiers::CONTROL)) * 16;
    mods + match button {
        MouseButton::Left => 0,
        MouseButton::Right => 1,
        MouseButton::Middle => 2,
    }
}

/// Encodes one mouse event for the wire.
///
/// `x` and `y` are 0-based cell coordinates; `press` distinguishes press
/// (`M` final) from release (`m` final in SGR, button bits `3` in the
/// default encoding). Returns `None` when the event cannot be encoded —
/// out-of-range coordinates in the default encoding, or the refused UTF-8
/// encoding.
#[must_use]
pub fn encode_mouse_event(
    encoding: MouseEncoding,
    button: u32,
    x: usize,
    y: usize,
    press: bool,
) -> Option<Vec<u8>> {
    // The wire protocol is 1-based.
    let (x, y) = (x + 1, y + 1);
    match encoding {
        MouseEncoding::Default => {
            let button = if press { button } else { button | 3 };
            let (x, y) = (x + 32, y + 32);
            if x > 255 || y > 255 {
                return None;
            }
            Some(vec![
                0x1b,
                b'[',
                b'M',
                (button + 32) as u8,
                x as u8,
                y as u8,
            ])
        }
        MouseEncoding::Sgr => {
            let end = if press { 'M' } else { 'm' };
            Some(format!("\x1b[<{button};{x};{y}{end}").into_bytes())
        }
        MouseEncoding::Utf8 => None,
    }
}
