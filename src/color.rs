//! RGBA color values for terminal cells.
//!
//! Colors are plain 8-bit-per-channel values with an alpha channel so that
//! renderers can blend decorations over the grid. Two special values exist:
//! [`Color::TRANSPARENT`] (fully see-through black) and [`Color::NONE`], a
//! sentinel meaning "no color specified" that compares unequal to every
//! real color including the transparent one.

// Rust guideline compliant 2025-06

use serde::{Deserialize, Serialize};

/// An RGBA color.
///
/// Equality is structural; two colors are the same only if all four
/// channels match. This is what makes [`Color::NONE`] usable as a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel, 255 is fully opaque.
    pub a: u8,
}

impl Color {
    /// Creates an opaque color from the three channels.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Creates a color with an explicit alpha channel.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully transparent black.
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    /// The "no color" sentinel.
    ///
    /// Distinct from [`Color::TRANSPARENT`]: a transparent cell still has a
    /// color, while `NONE` means the attribute is absent (unset borders,
    /// unset decorations).
    pub const NONE: Color = Color::rgba(255, 255, 255, 0);

    /// Returns `true` if this is the [`Color::NONE`] sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.a == Self::NONE.a
            && self.r == Self::NONE.r
            && self.g == Self::NONE.g
            && self.b == Self::NONE.b
    }

    /// Returns `true` if the color is fully opaque.
    #[must_use]
    pub const fn is_opaque(self) -> bool {
        self.a == 255
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const GRAY: Color = Color::rgb(196, 196, 196);
    pub const DARK_GREEN: Color = Color::rgb(0, 128, 0);
    pub const DARK_BLUE: Color = Color::rgb(0, 0, 128);
    pub const DARK_RED: Color = Color::rgb(128, 0, 0);
    pub const DARK_MAGENTA: Color = Color::rgb(128, 0, 128);
    pub const DARK_CYAN: Color = Color::rgb(0, 128, 128);
    pub const DARK_YELLOW: Color = Color::rgb(128, 128, 0);
    pub const DARK_GRAY: Color = Color::rgb(128, 128, 128);
}

impl Default for Color {
    /// Opaque black, matching a freshly cleared terminal.
    fn default() -> Self {
        Color::BLACK
    }
}
