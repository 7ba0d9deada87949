/*!
 * Palette state for both hardware generations.
 *
 * The monochrome generation packs four 2-bit shades into one register byte
 * (BGP/OBP0/OBP1). The color generation keeps 64 bytes of palette RAM per
 * use (background and sprites): 8 palettes of 4 colors, each color a
 * little-endian RGB555 byte pair, addressed through an auto-incrementing
 * index/data register pair.
 */

use crate::color::Color;

/// One packed monochrome palette register.
#[derive(Debug, Clone, Copy)]
pub struct MonochromePalette {
    pub register_value: u8,
}

impl MonochromePalette {
    pub fn new() -> Self {
        Self { register_value: 0 }
    }

    /// Map a 2-bit source color index to its 2-bit shade slot.
    pub fn shade(&self, color_number: u8) -> u8 {
        (self.register_value >> (2 * (color_number & 0b11))) & 0b11
    }
}

/// 64 bytes of color palette RAM behind an index/data register pair.
#[derive(Clone)]
pub struct ColorPalette {
    ram: [u8; 64],
    /// bits 0-5: address, bit 7: auto-increment on data write
    index: u8,
}

impl ColorPalette {
    pub fn new() -> Self {
        Self {
            ram: [0xff; 64],
            index: 0,
        }
    }

    pub fn write_index(&mut self, value: u8) {
        self.index = value & 0xbf;
    }

    pub fn read_index(&self) -> u8 {
        // bit 6 is unimplemented and reads as 1
        self.index | 0x40
    }

    pub fn write_data(&mut self, value: u8) {
        let address = usize::from(self.index & 0x3f);
        self.ram[address] = value;
        if self.index & 0x80 != 0 {
            self.index = 0x80 | ((self.index + 1) & 0x3f);
        }
    }

    pub fn read_data(&self) -> u8 {
        self.ram[usize::from(self.index & 0x3f)]
    }

    /// Resolve one stored 15-bit color to a display color.
    pub fn color(&self, palette: u8, color_number: u8) -> Color {
        let base = usize::from(palette & 0b111) * 8 + usize::from(color_number & 0b11) * 2;
        Color::from_rgb555(self.ram[base], self.ram[base + 1])
    }
}

/// Per-tile attribute byte from VRAM bank 1 (color generation only).
#[derive(Debug, Clone, Copy)]
pub struct CgbTileAttribute(pub u8);

impl CgbTileAttribute {
    pub fn palette(&self) -> u8 {
        self.0 & 0b111
    }

    pub fn vram_bank(&self) -> bool {
        self.0 >> 3 & 1 == 1
    }

    pub fn x_flip(&self) -> bool {
        self.0 >> 5 & 1 == 1
    }

    pub fn y_flip(&self) -> bool {
        self.0 >> 6 & 1 == 1
    }

    /// BG-to-OAM priority: this tile's colors 1-3 display above sprites.
    pub fn priority(&self) -> bool {
        self.0 >> 7 & 1 == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monochrome_palette_maps_all_indices() {
        // shades: index 0 -> 0, 1 -> 1, 2 -> 2, 3 -> 3
        let identity = MonochromePalette {
            register_value: 0b11100100,
        };
        for index in 0..4 {
            assert_eq!(identity.shade(index), index);
        }

        // inverted mapping
        let inverted = MonochromePalette {
            register_value: 0b00011011,
        };
        assert_eq!(inverted.shade(0), 3);
        assert_eq!(inverted.shade(3), 0);
    }

    #[test]
    fn color_palette_round_trips_byte_pairs() {
        let mut palette = ColorPalette::new();
        palette.write_index(0x00);
        palette.write_data(0x34);
        palette.write_index(0x01);
        palette.write_data(0x12);

        palette.write_index(0x00);
        assert_eq!(palette.read_data(), 0x34);
        palette.write_index(0x01);
        assert_eq!(palette.read_data(), 0x12);
    }

    #[test]
    fn data_writes_auto_increment_when_requested() {
        let mut palette = ColorPalette::new();
        palette.write_index(0x80);
        for value in 0..8u8 {
            palette.write_data(value);
        }

        for address in 0..8u8 {
            palette.write_index(address);
            assert_eq!(palette.read_data(), address);
        }

        // without bit 7 the index stays put
        palette.write_index(0x10);
        palette.write_data(0xaa);
        assert_eq!(palette.read_data(), 0xaa);
    }

    #[test]
    fn auto_increment_wraps_within_ram() {
        let mut palette = ColorPalette::new();
        palette.write_index(0x80 | 0x3f);
        palette.write_data(0x55);
        // wrapped to address 0, auto-increment flag preserved
        assert_eq!(palette.read_index() & 0x3f, 0);
        assert_eq!(palette.read_index() & 0x80, 0x80);
    }

    #[test]
    fn stored_colors_resolve_to_display_colors() {
        let mut palette = ColorPalette::new();
        // palette 2, color 1 = pure red (0x001f)
        palette.write_index(2 * 8 + 1 * 2);
        palette.write_data(0x1f);
        palette.write_index(2 * 8 + 1 * 2 + 1);
        palette.write_data(0x00);

        assert_eq!(palette.color(2, 1), Color::rgb(255, 0, 0));
    }

    #[test]
    fn tile_attribute_unpacks_fields() {
        let attr = CgbTileAttribute(0b1010_1101);
        assert_eq!(attr.palette(), 0b101);
        assert!(attr.vram_bank());
        assert!(attr.x_flip());
        assert!(!attr.y_flip());
        assert!(attr.priority());
    }
}
