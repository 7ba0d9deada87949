/*!
 * The PPU is the memory-mapped video controller of the emulated machine. It
 * owns VRAM and OAM, the LCD control/status/position registers, the scanline
 * timing state machine, the palette pipelines, and the pixel buffer the
 * presentation layer reads after each frame.
 */

pub(crate) mod base_ppu;
mod debug_view;
mod dma;
mod lcd;
pub(crate) mod palette;
mod renderer;

pub use base_ppu::Ppu;
pub use dma::DmaUnit;
pub use lcd::{Lcd, LcdControl, LcdMode, LcdStatus};
pub use renderer::{decode_tile_row, TilePixelRow};

use strum_macros::{Display, EnumString};

/// Size of one VRAM bank in bytes. The second bank is always allocated even
/// on monochrome hardware, where it is simply never selectable.
pub const VRAM_BANK_SIZE: usize = 0x2000;
pub const VRAM_SIZE: usize = VRAM_BANK_SIZE * 2;
/// OAM holds 40 sprite descriptors of 4 bytes each.
pub const OAM_SIZE: usize = 0xa0;
pub const NUM_SPRITES: usize = 40;

pub const LCD_WIDTH: usize = 160;
pub const LCD_HEIGHT: usize = 144;

/// Which hardware generation is being emulated. The color generation adds
/// VRAM banking, indexed 15-bit color palettes, and OAM-order sprite
/// priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum HardwareGeneration {
    Dmg,
    Cgb,
}

/// Selects how tile-map bytes index into tile data.
#[derive(Debug, Clone, Copy)]
pub enum TileDataAddressingMethod {
    Method8000,
    Method8800,
}

/// Read-only view of one 4-byte OAM sprite descriptor, computed from the raw
/// OAM table on demand so the two never drift apart.
#[derive(Debug, Clone)]
pub struct OamData {
    data: [u8; 4],
}

impl OamData {
    pub fn new(data: &[u8]) -> OamData {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&data[..4]);
        OamData { data: bytes }
    }

    pub fn y_pos(&self) -> u8 {
        self.data[0]
    }

    pub fn x_pos(&self) -> u8 {
        self.data[1]
    }

    pub fn tile_index(&self) -> u8 {
        self.data[2]
    }

    /// Returns the tile indices of this sprite in 8x16 mode. (top, bottom)
    pub fn tile_index_16(&self) -> (u8, u8) {
        (self.data[2] & 0xfe, self.data[2] | 0x01)
    }

    /// Monochrome palette select: OBP0 or OBP1.
    pub fn palette_number(&self) -> u8 {
        self.data[3] >> 4 & 1
    }

    /// Color-generation palette select (0-7).
    pub fn cgb_palette(&self) -> u8 {
        self.data[3] & 0b111
    }

    /// Color generation only: which VRAM bank holds this sprite's tile data.
    pub fn vram_bank(&self) -> bool {
        self.data[3] >> 3 & 1 == 1
    }

    /// true iff horizontally mirrored
    pub fn x_flip(&self) -> bool {
        self.data[3] >> 5 & 1 == 1
    }

    /// true iff vertically mirrored
    pub fn y_flip(&self) -> bool {
        self.data[3] >> 6 & 1 == 1
    }

    /// false=No, true=BG and Window colors 1-3 over the OBJ
    pub fn bg_window_over_obj(&self) -> bool {
        self.data[3] >> 7 & 1 == 1
    }
}
