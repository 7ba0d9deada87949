/*!
 * Display-ready colors and the pixel buffer the renderer composites into.
 *
 * Every cell keeps two pieces of bookkeeping next to its RGBA value: the 2-bit
 * source color index that produced it (so sprites can tell which background
 * pixels were "color 0" and may be covered) and the priority flag of the tile
 * that produced it (so background tiles can force themselves above sprites).
 */

use strum_macros::{Display, EnumIter, EnumString};

/// Transform applied to every pixel on its way into the pixel buffer,
/// modelling LCD panel response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CorrectionMode {
    /// Blend toward white proportionally to brightness. Identity at 0.0.
    Washout,
    /// Scale channel magnitude by brightness. Identity at 1.0.
    Scale,
}

/// Named shade quadruples for the monochrome hardware generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ShadeTheme {
    Green,
    Purple,
}

impl ShadeTheme {
    /// The four display colors for monochrome shade indices 0 (lightest)
    /// through 3 (darkest).
    pub const fn shades(self) -> [Color; 4] {
        match self {
            ShadeTheme::Green => [
                Color::rgb(224, 248, 208),
                Color::rgb(136, 192, 112),
                Color::rgb(48, 108, 80),
                Color::rgb(0, 0, 0),
            ],
            ShadeTheme::Purple => [
                Color::rgb(250, 255, 206),
                Color::rgb(252, 167, 184),
                Color::rgb(249, 99, 152),
                Color::rgb(208, 57, 127),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,

    /// The logical palette index (0-3) this pixel was resolved from. Kept so
    /// the sprite pass can distinguish color-0 background pixels, which never
    /// occlude sprites.
    pub color_number: u8,

    /// Set when the producing background/window tile declared itself above
    /// sprites.
    pub priority: bool,
}

pub const WHITE: Color = Color::rgb(255, 255, 255);
pub const BLACK: Color = Color::rgb(0, 0, 0);

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Color {
        Color {
            red,
            green,
            blue,
            alpha: 255,
            color_number: 0,
            priority: false,
        }
    }

    /// Expand a little-endian RGB555 byte pair into a display color.
    /// 5-bit channels are widened to 8 bits by repeating the top bits.
    pub fn from_rgb555(low: u8, high: u8) -> Color {
        let raw = u16::from_le_bytes([low, high]);
        let r5 = (raw & 0x1f) as u8;
        let g5 = ((raw >> 5) & 0x1f) as u8;
        let b5 = ((raw >> 10) & 0x1f) as u8;
        Color::rgb((r5 << 3) | (r5 >> 2), (g5 << 3) | (g5 >> 2), (b5 << 3) | (b5 >> 2))
    }

    /// Apply the display-correction transform in place. Called for every
    /// pixel written to the pixel buffer, never for a subset.
    pub fn correct(&mut self, mode: CorrectionMode, brightness: f32) {
        let apply = |channel: u8| -> u8 {
            let c = channel as f32;
            let corrected = match mode {
                CorrectionMode::Washout => c + (255.0 - c) * brightness,
                CorrectionMode::Scale => c * brightness,
            };
            corrected.clamp(0.0, 255.0) as u8
        };
        self.red = apply(self.red);
        self.green = apply(self.green);
        self.blue = apply(self.blue);
    }

    /// Overwrite this cell with a sprite pixel, subject to the occlusion rule:
    /// an existing non-zero background/window pixel wins when it carries the
    /// priority flag or the sprite declared itself behind the background.
    /// `force` bypasses the test (preview tooling). Returns whether the cell
    /// was replaced.
    pub fn replace_with_sprite_pixel(
        &mut self,
        replace_with: &Color,
        color_number: u8,
        behind_bg: bool,
        force: bool,
    ) -> bool {
        if !force && self.color_number != 0 && (self.priority || behind_bg) {
            return false;
        }
        self.red = replace_with.red;
        self.green = replace_with.green;
        self.blue = replace_with.blue;
        self.alpha = replace_with.alpha;
        self.color_number = color_number;
        // a sprite pixel never asserts background priority
        self.priority = false;
        true
    }
}

/// A 2D grid of display-ready cells. Allocated once; cells are overwritten in
/// place, one scanline at a time.
#[derive(Clone)]
pub struct ColorBuffer {
    pub width: usize,
    pub height: usize,
    pixels: Vec<Color>,
}

impl ColorBuffer {
    pub fn new(width: usize, height: usize) -> ColorBuffer {
        ColorBuffer {
            width,
            height,
            pixels: vec![BLACK; width * height],
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> &Color {
        &self.pixels[self.width * y + x]
    }

    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut Color {
        &mut self.pixels[self.width * y + x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        self.pixels[self.width * y + x] = color;
    }

    /// Reset every cell to opaque black with no source index or priority.
    pub fn zero(&mut self) {
        self.pixels.fill(BLACK);
    }

    pub fn as_slice(&self) -> &[Color] {
        &self.pixels
    }
}
