//! Terminal grid cells and the attributes stored on them.
//!
//! A [`Cell`] is the unit of the screen grid: one codepoint plus the colors
//! and font attributes it was written with. Cells are plain `Copy` records
//! so that whole rows can be filled and rotated cheaply.
//!
//! The [`CellFlags::END_OF_LINE`] flag records where a logical line ended
//! (the last cell written before a line feed). It drives the reflowing
//! resize, the trimmed scrollback copies, and selection extraction.

// Rust guideline compliant 2025-06

use bitflags::bitflags;

use crate::color::Color;

bitflags! {
    /// Style attributes of a [`Font`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontFlags: u16 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
        const BLINK = 1 << 4;
        /// The glyph occupies two columns.
        const DOUBLE_WIDTH = 1 << 5;
        /// Top half of a double-height line.
        const DOUBLE_HEIGHT_TOP = 1 << 6;
        /// Bottom half of a double-height line.
        const DOUBLE_HEIGHT_BOTTOM = 1 << 7;
    }
}

bitflags! {
    /// Per-cell marker flags, orthogonal to the font.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        /// The cell is the last one written on its logical line.
        const END_OF_LINE = 1 << 0;
    }
}

/// Font attributes of a single cell.
///
/// The size is a small integer starting at 1; sizes above 1 are used by the
/// double-width/height line modes and by renderers that scale glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Font {
    size: u8,
    flags: FontFlags,
}

impl Font {
    /// A size-1 font with no attributes set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            size: 1,
            flags: FontFlags::empty(),
        }
    }

    /// Font size; at least 1.
    #[must_use]
    pub const fn size(&self) -> u8 {
        self.size
    }

    /// Sets the font size, clamped to a minimum of 1.
    pub fn set_size(&mut self, size: u8) -> &mut Self {
        self.size = size.max(1);
        self
    }

    /// Number of columns a glyph in this font occupies (1 or 2).
    #[must_use]
    pub const fn width(&self) -> usize {
        if self.flags.contains(FontFlags::DOUBLE_WIDTH) {
            2
        } else {
            1
        }
    }

    /// All style flags.
    #[must_use]
    pub const fn flags(&self) -> FontFlags {
        self.flags
    }

    #[must_use]
    pub const fn bold(&self) -> bool {
        self.flags.contains(FontFlags::BOLD)
    }

    #[must_use]
    pub const fn italic(&self) -> bool {
        self.flags.contains(FontFlags::ITALIC)
    }

    #[must_use]
    pub const fn underline(&self) -> bool {
        self.flags.contains(FontFlags::UNDERLINE)
    }

    #[must_use]
    pub const fn strikethrough(&self) -> bool {
        self.flags.contains(FontFlags::STRIKETHROUGH)
    }

    #[must_use]
    pub const fn blink(&self) -> bool {
        self.flags.contains(FontFlags::BLINK)
    }

    #[must_use]
    pub const fn double_width(&self) -> bool {
        self.flags.contains(FontFlags::DOUBLE_WIDTH)
    }

    pub fn set_bold(&mut self, value: bool) -> &mut Self {
        self.flags.set(FontFlags::BOLD, value);
        self
    }

    pub fn set_italic(&mut self, value: bool) -> &mut Self {
        self.flags.set(FontFlags::ITALIC, value);
        self
    }

    pub fn set_underline(&mut self, value: bool) -> &mut Self {
        self.flags.set(FontFlags::UNDERLINE, value);
        self
    }

    pub fn set_strikethrough(&mut self, value: bool) -> &mut Self {
        self.flags.set(FontFlags::STRIKETHROUGH, value);
        self
    }

    pub fn set_blink(&mut self, value: bool) -> &mut Self {
        self.flags.set(FontFlags::BLINK, value);
        self
    }

    pub fn set_double_width(&mut self, value: bool) -> &mut Self {
        self.flags.set(FontFlags::DOUBLE_WIDTH, value);
        self
    }
}

impl Default for Font {
    fn default() -> Self {
        Self::new()
    }
}

/// One cell of the terminal grid.
///
/// The default cell is a space on the default (black) background, which is
/// what a cleared screen is filled with before a palette is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// The codepoint displayed in the cell.
    pub codepoint: char,
    /// Foreground (glyph) color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
    /// Decoration color (underline, strikethrough).
    pub decor: Color,
    /// Font attributes.
    pub font: Font,
    /// Border color, if the cell carries one.
    pub border: Option<Color>,
    /// Marker flags.
    pub flags: CellFlags,
}

impl Cell {
    /// Creates a default cell (space) over the given colors.
    #[must_use]
    pub fn new(fg: Color, bg: Color) -> Self {
        Self {
            codepoint: ' ',
            fg,
            bg,
            decor: fg,
            font: Font::new(),
            border: None,
            flags: CellFlags::empty(),
        }
    }

    /// Whether the cell ends a logical line.
    #[must_use]
    pub const fn is_line_end(&self) -> bool {
        self.flags.contains(CellFlags::END_OF_LINE)
    }

    /// Marks or clears the end-of-line flag.
    pub fn set_line_end(&mut self, value: bool) {
        self.flags.set(CellFlags::END_OF_LINE, value);
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new(Color::WHITE, Color::BLACK)
    }
}

/// Cursor presentation state.
///
/// The cursor's position lives with the buffer; this structure only holds
/// how it is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Whether the cursor is drawn at all (DECTCEM).
    pub visible: bool,
    /// Whether the cursor blinks.
    pub blink: bool,
    /// The codepoint renderers use to draw the cursor.
    pub codepoint: char,
    /// Cursor color.
    pub color: Color,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            visible: true,
            blink: true,
            codepoint: '\u{2581}',
            color: Color::WHITE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cell_is_space_on_black() {
        let cell = Cell::default();
        assert_eq!(cell.codepoint, ' ');
        assert_eq!(cell.bg, Color::BLACK);
        assert!(!cell.is_line_end());
    }

    #[test]
    fn font_size_has_floor_of_one() {
        let mut font = Font::new();
        font.set_size(0);
        assert_eq!(font.size(), 1);
        font.set_size(4);
        assert_eq!(font.size(), 4);
    }

    #[test]
    fn font_width_follows_double_width_flag() {
        let mut font = Font::new();
        assert_eq!(font.width(), 1);
        font.set_double_width(true);
        assert_eq!(font.width(), 2);
    }

    #[test]
    fn line_end_flag_round_trips() {
        let mut cell = Cell::default();
        cell.set_line_end(true);
        assert!(cell.is_line_end());
        cell.set_line_end(false);
        assert!(!cell.is_line_end());
    }

    #[test]
    fn cell_equality_is_structural() {
        let a = Cell::default();
        let mut b = Cell::default();
        assert_eq!(a, b);
        b.font.set_bold(true);
        assert_ne!(a, b);
    }
}
