/*!
 * On-demand preview buffers for debugging frontends: the raw tile data
 * banks, the 40 sprite descriptors, and the active palettes. Each view is
 * recomputed from current state when requested and never touched during
 * normal advancement.
 */

use crate::color::{Color, ColorBuffer};

use super::base_ppu::PpuState;
use super::renderer::decode_tile_row;
use super::{HardwareGeneration, NUM_SPRITES};

pub const TILE_VIEW_WIDTH: usize = 256;
pub const TILE_VIEW_HEIGHT: usize = 256;

/// Sprite cells are 10x18 (an 8x16 sprite plus a border), arranged 8 wide
/// by 5 tall to cover all 40 descriptors.
pub const SPRITE_VIEW_WIDTH: usize = 80;
pub const SPRITE_VIEW_HEIGHT: usize = 90;

const SPRITE_CELL_WIDTH: usize = 10;
const SPRITE_CELL_HEIGHT: usize = 18;
const SPRITE_GRID_COLUMNS: usize = 8;

pub const PALETTE_VIEW_WIDTH: usize = 40;
const PALETTE_SWATCH_CELL: usize = 10;

const TILES_PER_BANK: usize = 384;
const TILES_PER_ROW: usize = TILE_VIEW_WIDTH / 8;

/// Palette-free shading for the tile view; tiles carry indices, not colors.
const GRAY_RAMP: [Color; 4] = [
    Color::rgb(255, 255, 255),
    Color::rgb(170, 170, 170),
    Color::rgb(85, 85, 85),
    Color::rgb(0, 0, 0),
];

/// Render both tile data banks as a 256x256 sheet: 384 tiles per bank, 32
/// per row. Bank 1 is drawn below bank 0 on color hardware; the unused
/// remainder of the sheet stays black.
pub fn tile_view(state: &PpuState) -> ColorBuffer {
    let mut view = ColorBuffer::new(TILE_VIEW_WIDTH, TILE_VIEW_HEIGHT);

    let banks = match state.generation {
        HardwareGeneration::Dmg => 1,
        HardwareGeneration::Cgb => 2,
    };
    let bank_height = TILES_PER_BANK / TILES_PER_ROW * 8;

    for bank in 0..banks {
        for tile in 0..TILES_PER_BANK {
            let origin_x = tile % TILES_PER_ROW * 8;
            let origin_y = bank * bank_height + tile / TILES_PER_ROW * 8;
            for row in 0..8 {
                let low = state.vram_byte(bank, tile * 16 + row * 2);
                let high = state.vram_byte(bank, tile * 16 + row * 2 + 1);
                let pixels = decode_tile_row(low, high, false);
                for (column, &index) in pixels.0.iter().enumerate() {
                    let mut color = GRAY_RAMP[usize::from(index)];
                    color.correct(state.correction_mode, state.brightness);
                    view.set_pixel(origin_x + column, origin_y + row, color);
                }
            }
        }
    }

    view
}

/// Render each OAM descriptor into its own cell of an 8x5 grid, palettes
/// applied. Transparent sprite pixels leave the cell background black, so
/// sprite shape and colors are both visible.
pub fn sprite_view(state: &PpuState) -> ColorBuffer {
    let mut view = ColorBuffer::new(SPRITE_VIEW_WIDTH, SPRITE_VIEW_HEIGHT);
    let tall = state.lcd.control.obj_size;
    let height = if tall { 16 } else { 8 };

    for index in 0..NUM_SPRITES {
        let sprite = state.oam_entry(index);
        let origin_x = index % SPRITE_GRID_COLUMNS * SPRITE_CELL_WIDTH + 1;
        let origin_y = index / SPRITE_GRID_COLUMNS * SPRITE_CELL_HEIGHT + 1;

        let bank = match state.generation {
            HardwareGeneration::Cgb if sprite.vram_bank() => 1,
            _ => 0,
        };

        for y in 0..height {
            let row = if sprite.y_flip() { height - 1 - y } else { y };
            let tile_index = if tall {
                let (top, bottom) = sprite.tile_index_16();
                if row < 8 {
                    top
                } else {
                    bottom
                }
            } else {
                sprite.tile_index()
            };
            let tile_offset = usize::from(tile_index) * 16 + row % 8 * 2;
            let low = state.vram_byte(bank, tile_offset);
            let high = state.vram_byte(bank, tile_offset + 1);
            let pixels = decode_tile_row(low, high, sprite.x_flip());

            for (column, &color_number) in pixels.0.iter().enumerate() {
                if color_number == 0 {
                    continue;
                }
                let mut color = match state.generation {
                    HardwareGeneration::Dmg => {
                        let palette = if sprite.palette_number() == 0 {
                            &state.object_palette_0
                        } else {
                            &state.object_palette_1
                        };
                        state.shade_theme.shades()[usize::from(palette.shade(color_number))]
                    }
                    HardwareGeneration::Cgb => state
                        .obj_color_palette
                        .color(sprite.cgb_palette(), color_number),
                };
                color.correct(state.correction_mode, state.brightness);
                view.set_pixel(origin_x + column, origin_y + y, color);
            }
        }
    }

    view
}

/// Render the active palettes as rows of four swatches. Monochrome hardware
/// shows three rows (background, object 0, object 1); color hardware shows
/// the 8 background palettes followed by the 8 object palettes.
pub fn palette_view(state: &PpuState) -> ColorBuffer {
    let rows = match state.generation {
        HardwareGeneration::Dmg => 3,
        HardwareGeneration::Cgb => 16,
    };
    let mut view = ColorBuffer::new(PALETTE_VIEW_WIDTH, rows * PALETTE_SWATCH_CELL);

    for row in 0..rows {
        for slot in 0..4u8 {
            let mut color = match state.generation {
                HardwareGeneration::Dmg => {
                    let palette = match row {
                        0 => &state.background_palette,
                        1 => &state.object_palette_0,
                        _ => &state.object_palette_1,
                    };
                    state.shade_theme.shades()[usize::from(palette.shade(slot))]
                }
                HardwareGeneration::Cgb => {
                    if row < 8 {
                        state.bg_color_palette.color(row as u8, slot)
                    } else {
                        state.obj_color_palette.color((row - 8) as u8, slot)
                    }
                }
            };
            color.correct(state.correction_mode, state.brightness);

            let origin_x = usize::from(slot) * PALETTE_SWATCH_CELL + 1;
            let origin_y = row * PALETTE_SWATCH_CELL + 1;
            for y in 0..8 {
                for x in 0..8 {
                    view.set_pixel(origin_x + x, origin_y + y, color);
                }
            }
        }
    }

    view
}
