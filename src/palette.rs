//! Indexed color palettes.
//!
//! The terminal resolves SGR color indices through a [`Palette`]. Two
//! presets are provided: the classic 16-color table and the xterm 256-color
//! table (16 base colors, a 6×6×6 cube, and a 24-step grayscale ramp).

use crate::color::Color;

/// The xterm color cube component values for indices 16..=231.
const CUBE_STEPS: [u8; 6] = [0, 95, 135, 175, 215, 255];

/// An indexed color table with configurable default foreground and
/// background indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
    default_fg: usize,
    default_bg: usize,
}

impl Palette {
    /// Creates a palette from explicit colors.
    ///
    /// # Panics
    ///
    /// Panics if either default index is out of range.
    #[must_use]
    pub fn new(colors: Vec<Color>, default_fg: usize, default_bg: usize) -> Self {
        assert!(default_fg < colors.len() && default_bg < colors.len());
        Self {
            colors,
            default_fg,
            default_bg,
        }
    }

    /// The classic 16-color palette. White on black by default.
    #[must_use]
    pub fn colors16() -> Self {
        Self::new(
            vec![
                Color::BLACK,        // 0
                Color::DARK_RED,     // 1
                Color::DARK_GREEN,   // 2
                Color::DARK_YELLOW,  // 3
                Color::DARK_BLUE,    // 4
                Color::DARK_MAGENTA, // 5
                Color::DARK_CYAN,    // 6
                Color::GRAY,         // 7
                Color::DARK_GRAY,    // 8
                Color::RED,          // 9
                Color::GREEN,        // 10
                Color::YELLOW,       // 11
                Color::BLUE,         // 12
                Color::MAGENTA,      // 13
                Color::CYAN,         // 14
                Color::WHITE,        // 15
            ],
            15,
            0,
        )
    }

    /// The xterm 256-color palette.
    ///
    /// Entries 0..=15 are the 16-color preset, 16..=231 the 6×6×6 color
    /// cube with components {0, 95, 135, 175, 215, 255} in rgb-major order,
    /// 232..=255 a grayscale ramp from 8 to 238 in steps of 10.
    #[must_use]
    pub fn xterm256() -> Self {
        let mut colors = Vec::with_capacity(256);
        colors.extend_from_slice(&Self::colors16().colors);
        for r in CUBE_STEPS {
            for g in CUBE_STEPS {
                for b in CUBE_STEPS {
                    colors.push(Color::rgb(r, g, b));
                }
            }
        }
        for step in 0..24u8 {
            let x = 8 + step * 10;
            colors.push(Color::rgb(x, x, x));
        }
        Self::new(colors, 15, 0)
    }

    /// Number of colors in the palette.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The color used for default foreground.
    #[must_use]
    pub fn default_foreground(&self) -> Color {
        self.colors[self.default_fg]
    }

    /// The color used for default background.
    #[must_use]
    pub fn default_background(&self) -> Color {
        self.colors[self.default_bg]
    }

    /// Changes which index is the default foreground.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    pub fn set_default_foreground_index(&mut self, index: usize) {
        assert!(index < self.colors.len());
        self.default_fg = index;
    }

    /// Changes which index is the default background.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    pub fn set_default_background_index(&mut self, index: usize) {
        assert!(index < self.colors.len());
        self.default_bg = index;
    }

    /// Color at the given index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    #[must_use]
    pub fn color(&self, index: usize) -> Color {
        self.colors[index]
    }

    /// Replaces the color at the given index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range.
    pub fn set_color(&mut self, index: usize, color: Color) {
        self.colors[index] = color;
    }
}

impl std::ops::Index<usize> for Palette {
    type Output = Color;

    fn index(&self, index: usize) -> &Color {
        &self.colors[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors16_defaults() {
        let p = Palette::colors16();
        assert_eq!(p.len(), 16);
        assert_eq!(p.default_foreground(), Color::WHITE);
        assert_eq!(p.default_background(), Color::BLACK);
        assert_eq!(p[1], Color::DARK_RED);
        assert_eq!(p[9], Color::RED);
    }

    #[test]
    fn xterm256_base_matches_colors16() {
        let p16 = Palette::colors16();
        let p256 = Palette::xterm256();
        assert_eq!(p256.len(), 256);
        for i in 0..16 {
            assert_eq!(p256[i], p16[i]);
        }
    }

    #[test]
    fn xterm256_cube_values() {
        let p = Palette::xterm256();
        // First cube entry is black, last is white.
        assert_eq!(p[16], Color::rgb(0, 0, 0));
        assert_eq!(p[231], Color::rgb(255, 255, 255));
        // rgb-major ordering: index 16 + 36r + 6g + b.
        assert_eq!(p[16 + 36], Color::rgb(95, 0, 0));
        assert_eq!(p[16 + 6], Color::rgb(0, 95, 0));
        assert_eq!(p[17], Color::rgb(0, 0, 95));
        assert_eq!(p[16 + 36 * 3 + 6 * 2 + 4], Color::rgb(175, 135, 215));
    }

    #[test]
    fn xterm256_grayscale_ramp() {
        let p = Palette::xterm256();
        assert_eq!(p[232], Color::rgb(8, 8, 8));
        assert_eq!(p[233], Color::rgb(18, 18, 18));
        assert_eq!(p[255], Color::rgb(238, 238, 238));
    }

    #[test]
    fn default_index_overrides() {
        let mut p = Palette::colors16();
        p.set_default_foreground_index(7);
        p.set_default_background_index(4);
        assert_eq!(p.default_foreground(), Color::GRAY);
        assert_eq!(p.default_background(), Color::DARK_BLUE);
    }
}
