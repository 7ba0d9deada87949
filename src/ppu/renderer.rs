/*!
 * Per-scanline compositing: background, window, then sprites, in that order,
 * into the pixel-buffer row for the current line.
 */

use crate::color::{Color, ColorBuffer, WHITE};

use super::base_ppu::PpuState;
use super::palette::CgbTileAttribute;
use super::{
    HardwareGeneration, OamData, TileDataAddressingMethod, LCD_HEIGHT, LCD_WIDTH, NUM_SPRITES,
};

/// 8 decoded 2-bit color indices for one row of one tile. Purely a decode
/// scratch value; produced and consumed within a single renderer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePixelRow(pub [u8; 8]);

/// Combine the two bit planes of one tile row into color indices. Bit 7 of
/// each plane is pixel 0 unless horizontally flipped, in which case the
/// pixels read in mirrored column order. The low plane contributes the low
/// bit of each index.
pub fn decode_tile_row(low: u8, high: u8, horizontal_flip: bool) -> TilePixelRow {
    let mut pixels = [0u8; 8];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        let bit = if horizontal_flip { i } else { 7 - i };
        let low_bit = (low >> bit) & 1;
        let high_bit = (high >> bit) & 1;
        *pixel = (high_bit << 1) | low_bit;
    }
    TilePixelRow(pixels)
}

/// Uses the tile addressing method to adjust a tile-map byte into a flat tile
/// number (0-383).
pub fn adjust_tile_index(tile_index: usize, method: TileDataAddressingMethod) -> usize {
    match method {
        TileDataAddressingMethod::Method8000 => tile_index,
        TileDataAddressingMethod::Method8800 => {
            if tile_index <= 127 {
                tile_index + 256
            } else {
                tile_index
            }
        }
    }
}

pub(crate) struct Renderer {
    pub frame: ColorBuffer,

    current_scanline_objects: Vec<OamData>,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            frame: ColorBuffer::new(LCD_WIDTH, LCD_HEIGHT),
            current_scanline_objects: Vec::new(),
        }
    }

    /// Composite one full row of the pixel buffer. Called exactly once per
    /// visible line, at the pixel-transfer to h-blank boundary.
    pub fn render_line(&mut self, state: &PpuState) {
        let y = state.lcd.ly;
        if usize::from(y) >= LCD_HEIGHT {
            return;
        }

        self.render_background_line(state, y);
        self.render_window_line(state, y);
        self.render_sprite_line(state, y, false);
    }

    fn render_background_line(&mut self, state: &PpuState, y: u8) {
        if !state.lcd.control.bg_enable {
            // blank row: lightest shade, color 0, no priority
            let mut blank = match state.generation {
                HardwareGeneration::Dmg => state.shade_theme.shades()[0],
                HardwareGeneration::Cgb => WHITE,
            };
            blank.correct(state.correction_mode, state.brightness);
            for x in 0..LCD_WIDTH {
                self.frame.set_pixel(x, usize::from(y), blank);
            }
            return;
        }

        let bg_y = state.scy.wrapping_add(y);
        let mut x: usize = 0;
        while x < LCD_WIDTH {
            let bg_x = state.scx.wrapping_add(x as u8);
            let (pixels, attr) =
                fetch_tile_row(state, state.lcd.control.bg_tile_map_area, bg_x, bg_y);
            for sub in usize::from(bg_x % 8)..8 {
                if x >= LCD_WIDTH {
                    break;
                }
                self.put_tile_pixel(state, x, usize::from(y), pixels.0[sub], attr);
                x += 1;
            }
        }
    }

    fn render_window_line(&mut self, state: &PpuState, y: u8) {
        if !state.lcd.control.window_enable || y < state.wy || state.wx > 166 {
            return;
        }

        let win_y = state.lcd.window_line_counter;
        let x_start = usize::from(state.wx.saturating_sub(7));
        let mut x = x_start;
        while x < LCD_WIDTH {
            let win_x = (x - x_start) as u8;
            let (pixels, attr) =
                fetch_tile_row(state, state.lcd.control.window_tile_map_area, win_x, win_y);
            for sub in usize::from(win_x % 8)..8 {
                if x >= LCD_WIDTH {
                    break;
                }
                self.put_tile_pixel(state, x, usize::from(y), pixels.0[sub], attr);
                x += 1;
            }
        }
    }

    /// Sprite pass. `force` bypasses the sprite-enable bit and the occlusion
    /// test; it exists for the preview views, never the timed path.
    pub(crate) fn render_sprite_line(&mut self, state: &PpuState, y: u8, force: bool) {
        if !force && !state.lcd.control.obj_enable {
            return;
        }

        self.current_scanline_objects = select_scanline_sprites(state, y);

        for x in 0..LCD_WIDTH {
            if let Some((color, color_number, behind_bg)) = self.sprite_pixel(state, x as u8, y) {
                self.frame.pixel_mut(x, usize::from(y)).replace_with_sprite_pixel(
                    &color,
                    color_number,
                    behind_bg,
                    force,
                );
            }
        }
    }

    fn put_tile_pixel(
        &mut self,
        state: &PpuState,
        x: usize,
        y: usize,
        color_number: u8,
        attr: CgbTileAttribute,
    ) {
        let mut color = match state.generation {
            HardwareGeneration::Dmg => {
                state.shade_theme.shades()[usize::from(state.background_palette.shade(color_number))]
            }
            HardwareGeneration::Cgb => state.bg_color_palette.color(attr.palette(), color_number),
        };
        color.color_number = color_number;
        color.priority = state.generation == HardwareGeneration::Cgb && attr.priority();
        color.correct(state.correction_mode, state.brightness);
        self.frame.set_pixel(x, y, color);
    }

    /// First non-transparent sprite pixel covering this column, in priority
    /// order. Returns the resolved color, its source index, and the sprite's
    /// behind-background flag.
    fn sprite_pixel(&self, state: &PpuState, x: u8, y: u8) -> Option<(Color, u8, bool)> {
        for object in self.current_scanline_objects.iter() {
            let x_pos = i16::from(object.x_pos()) - 8;
            // skip over objects that don't contain this x value
            if !(x_pos <= x.into() && i16::from(x) < x_pos + 8) {
                continue;
            }

            let y_pos = i16::from(object.y_pos()) - 16;

            let tile_index = if !state.lcd.control.obj_size {
                // 8x8
                object.tile_index()
            } else {
                // 8x16: vertical flip swaps which half is on top
                let (top_idx, bot_idx) = object.tile_index_16();
                if (i16::from(y) - y_pos < 8) ^ object.y_flip() {
                    top_idx
                } else {
                    bot_idx
                }
            };

            let mut tile_sub_y = (i16::from(y) - y_pos) % 8;
            if object.y_flip() {
                tile_sub_y = 7 - tile_sub_y;
            }

            let bank = if state.generation == HardwareGeneration::Cgb && object.vram_bank() {
                1
            } else {
                0
            };
            let row_address = usize::from(tile_index) * 16 + tile_sub_y as usize * 2;
            let pixels = decode_tile_row(
                state.vram_byte(bank, row_address),
                state.vram_byte(bank, row_address + 1),
                object.x_flip(),
            );

            let color_number = pixels.0[(i16::from(x) - x_pos) as usize];
            // color 0 is transparent for sprites
            if color_number == 0 {
                continue;
            }

            let mut color = match state.generation {
                HardwareGeneration::Dmg => {
                    let palette = match object.palette_number() {
                        0 => &state.object_palette_0,
                        _ => &state.object_palette_1,
                    };
                    state.shade_theme.shades()[usize::from(palette.shade(color_number))]
                }
                HardwareGeneration::Cgb => {
                    state.obj_color_palette.color(object.cgb_palette(), color_number)
                }
            };
            color.correct(state.correction_mode, state.brightness);
            return Some((color, color_number, object.bg_window_over_obj()));
        }

        None
    }
}

/// Fetch and decode the tile row covering map coordinate (map_x, map_y),
/// along with its color-generation attributes.
fn fetch_tile_row(
    state: &PpuState,
    use_alt_map: bool,
    map_x: u8,
    map_y: u8,
) -> (TilePixelRow, CgbTileAttribute) {
    let map_base: usize = if use_alt_map { 0x1c00 } else { 0x1800 };
    let map_offset = map_base + usize::from(map_y / 8) * 32 + usize::from(map_x / 8);

    let tile_index = state.vram_byte(0, map_offset);
    let attr = if state.generation == HardwareGeneration::Cgb {
        CgbTileAttribute(state.vram_byte(1, map_offset))
    } else {
        CgbTileAttribute(0)
    };

    let method = if state.lcd.control.tile_data_area {
        TileDataAddressingMethod::Method8000
    } else {
        TileDataAddressingMethod::Method8800
    };
    let tile_number = adjust_tile_index(usize::from(tile_index), method);

    let mut row = usize::from(map_y % 8);
    if attr.y_flip() {
        row = 7 - row;
    }

    let bank = if state.generation == HardwareGeneration::Cgb && attr.vram_bank() {
        1
    } else {
        0
    };
    let row_address = tile_number * 16 + row * 2;
    let pixels = decode_tile_row(
        state.vram_byte(bank, row_address),
        state.vram_byte(bank, row_address + 1),
        attr.x_flip(),
    );
    (pixels, attr)
}

/// Select up to 10 sprite descriptors whose vertical extent covers this line,
/// scanning all 40 in OAM order. On monochrome hardware the draw order then
/// prefers lower X (stable sort keeps OAM order for ties); the color
/// generation decides by OAM index alone.
fn select_scanline_sprites(state: &PpuState, y: u8) -> Vec<OamData> {
    let mut objects = Vec::with_capacity(10);

    for object in state.oam.chunks_exact(4).take(NUM_SPRITES) {
        let y_pos = i16::from(object[0]) - 16;

        let y_upper = y_pos + if state.lcd.control.obj_size { 16 } else { 8 };

        if y_pos <= y.into() && i16::from(y) < y_upper {
            // chunks_exact(4) guarantees a full descriptor
            objects.push(OamData::new(object));
        }

        if objects.len() == 10 {
            break;
        }
    }

    if state.generation == HardwareGeneration::Dmg {
        objects.sort_by_key(|oam| oam.x_pos());
    }

    objects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ShadeTheme;

    fn dmg_state() -> PpuState {
        let mut state = PpuState::new(HardwareGeneration::Dmg);
        state.lcd.control.write(0x91); // lcd on, bg on, 8000 addressing
        state.background_palette.register_value = 0b11100100;
        state.object_palette_0.register_value = 0b11100100;
        state.object_palette_1.register_value = 0b11100100;
        state
    }

    fn shade(theme: ShadeTheme, index: usize) -> Color {
        theme.shades()[index]
    }

    /// Write one row of a tile into VRAM bank 0.
    fn poke_tile_row(state: &mut PpuState, tile: usize, row: usize, low: u8, high: u8) {
        state.vram[tile * 16 + row * 2] = low;
        state.vram[tile * 16 + row * 2 + 1] = high;
    }

    #[test]
    fn decode_combines_bit_planes() {
        let row = decode_tile_row(0b11010000, 0b11000000, false);
        assert_eq!(row.0, [3, 3, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn decode_flips_column_order() {
        let row = decode_tile_row(0b11010000, 0b11000000, true);
        assert_eq!(row.0, [0, 0, 0, 0, 1, 0, 3, 3]);
    }

    #[test]
    fn decode_all_indices() {
        // pixel i has index i % 4
        let row = decode_tile_row(0b01010101, 0b00110011, false);
        assert_eq!(row.0, [0, 1, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn background_pass_draws_mapped_tile() {
        let mut state = dmg_state();
        // tile 1: all pixels color 3
        for row in 0..8 {
            poke_tile_row(&mut state, 1, row, 0xff, 0xff);
        }
        // top-left map entry points at tile 1
        state.vram[0x1800] = 1;

        let mut renderer = Renderer::new();
        renderer.render_line(&state);

        let cell = renderer.frame.get_pixel(0, 0);
        assert_eq!(cell.color_number, 3);
        assert_eq!(
            (cell.red, cell.green, cell.blue),
            (0, 0, 0) // green theme shade 3
        );
        // columns 8.. fall on tile 0, which is blank
        assert_eq!(renderer.frame.get_pixel(8, 0).color_number, 0);
    }

    #[test]
    fn background_pass_honors_scroll() {
        let mut state = dmg_state();
        for row in 0..8 {
            poke_tile_row(&mut state, 1, row, 0xff, 0x00); // color 1
        }
        // map entry (1, 0) -> tile 1
        state.vram[0x1801] = 1;
        state.scx = 8;

        let mut renderer = Renderer::new();
        renderer.render_line(&state);

        // with scx=8 the second map column lands at screen x 0
        assert_eq!(renderer.frame.get_pixel(0, 0).color_number, 1);
        assert_eq!(renderer.frame.get_pixel(8, 0).color_number, 0);
    }

    #[test]
    fn disabled_background_renders_lightest_shade() {
        let mut state = dmg_state();
        state.lcd.control.bg_enable = false;
        for row in 0..8 {
            poke_tile_row(&mut state, 0, row, 0xff, 0xff);
        }

        let mut renderer = Renderer::new();
        renderer.render_line(&state);

        let cell = renderer.frame.get_pixel(0, 0);
        assert_eq!(cell.color_number, 0);
        assert_eq!(*cell, {
            let mut expected = shade(ShadeTheme::Green, 0);
            expected.color_number = 0;
            expected
        });
    }

    #[test]
    fn window_pass_overwrites_background() {
        let mut state = dmg_state();
        state.lcd.control.window_enable = true;
        state.lcd.control.window_tile_map_area = true; // window map at 0x9c00
        state.wx = 7 + 8; // window starts at screen x 8
        state.wy = 0;

        for row in 0..8 {
            poke_tile_row(&mut state, 2, row, 0x00, 0xff); // color 2
        }
        state.vram[0x1c00] = 2;

        let mut renderer = Renderer::new();
        renderer.render_line(&state);

        // left of the window: background tile 0 (blank)
        assert_eq!(renderer.frame.get_pixel(0, 0).color_number, 0);
        // inside the window: window tile 2
        assert_eq!(renderer.frame.get_pixel(8, 0).color_number, 2);
    }

    #[test]
    fn window_does_not_cover_lines_above_wy() {
        let mut state = dmg_state();
        state.lcd.control.window_enable = true;
        state.wy = 10;
        state.lcd.ly = 5;

        for row in 0..8 {
            poke_tile_row(&mut state, 2, row, 0xff, 0xff);
        }
        state.vram[0x1800] = 0;
        state.vram[0x1c00] = 2;

        let mut renderer = Renderer::new();
        renderer.render_line(&state);
        assert_eq!(renderer.frame.get_pixel(0, 5).color_number, 0);
    }

    fn poke_sprite(state: &mut PpuState, index: usize, y: u8, x: u8, tile: u8, attr: u8) {
        let base = index * 4;
        state.oam[base] = y;
        state.oam[base + 1] = x;
        state.oam[base + 2] = tile;
        state.oam[base + 3] = attr;
    }

    #[test]
    fn sprite_pass_draws_opaque_pixels_only() {
        let mut state = dmg_state();
        state.lcd.control.obj_enable = true;
        // tile 4 row 0: pixels [3, 0, 0, 0, 0, 0, 0, 0]
        poke_tile_row(&mut state, 4, 0, 0x80, 0x80);
        // sprite at screen (0, 0)
        poke_sprite(&mut state, 0, 16, 8, 4, 0);

        let mut renderer = Renderer::new();
        renderer.render_line(&state);

        assert_eq!(renderer.frame.get_pixel(0, 0).color_number, 3);
        // transparent sprite pixel leaves the background cell alone
        assert_eq!(renderer.frame.get_pixel(1, 0).color_number, 0);
    }

    #[test]
    fn sprite_behind_background_hides_under_nonzero_pixels() {
        let mut state = dmg_state();
        state.lcd.control.obj_enable = true;
        // background tile 1: all color 2
        for row in 0..8 {
            poke_tile_row(&mut state, 1, row, 0x00, 0xff);
        }
        state.vram[0x1800] = 1;
        // sprite tile 4: all color 1
        for row in 0..8 {
            poke_tile_row(&mut state, 4, row, 0xff, 0x00);
        }
        poke_sprite(&mut state, 0, 16, 8, 4, 0x80); // behind background

        let mut renderer = Renderer::new();
        renderer.render_line(&state);

        assert_eq!(renderer.frame.get_pixel(0, 0).color_number, 2);
    }

    #[test]
    fn sprite_priority_prefers_lower_x_on_dmg() {
        let mut state = dmg_state();
        state.lcd.control.obj_enable = true;
        // tile 4: color 1, tile 5: color 3
        for row in 0..8 {
            poke_tile_row(&mut state, 4, row, 0xff, 0x00);
            poke_tile_row(&mut state, 5, row, 0xff, 0xff);
        }
        // sprite 0 at x=12, sprite 1 at x=8; both overlap column 4..8
        poke_sprite(&mut state, 0, 16, 12, 4, 0);
        poke_sprite(&mut state, 1, 16, 8, 5, 0);

        let mut renderer = Renderer::new();
        renderer.render_line(&state);

        // sprite 1 has the lower x and wins the overlap
        assert_eq!(renderer.frame.get_pixel(4, 0).color_number, 3);
    }

    #[test]
    fn sprite_priority_uses_oam_order_on_cgb() {
        let mut state = PpuState::new(HardwareGeneration::Cgb);
        state.lcd.control.write(0x93);
        // identity-ish sprite palette 0: color 1 and 3 distinct
        state.obj_color_palette.write_index(0x80 | 2);
        state.obj_color_palette.write_data(0x1f); // color 1 = red
        state.obj_color_palette.write_data(0x00);
        state.obj_color_palette.write_index(0x80 | 6);
        state.obj_color_palette.write_data(0xe0); // color 3 = green-ish
        state.obj_color_palette.write_data(0x03);

        for row in 0..8 {
            state.vram[4 * 16 + row * 2] = 0xff; // tile 4: color 1
            state.vram[5 * 16 + row * 2] = 0xff; // tile 5: color 3
            state.vram[5 * 16 + row * 2 + 1] = 0xff;
        }
        // sprite 0 at higher x than sprite 1; OAM order still wins on cgb
        poke_sprite(&mut state, 0, 16, 12, 4, 0);
        poke_sprite(&mut state, 1, 16, 8, 5, 0);

        let mut renderer = Renderer::new();
        renderer.render_line(&state);

        assert_eq!(renderer.frame.get_pixel(4, 0).color_number, 1);
    }

    #[test]
    fn sprite_horizontal_flip_mirrors_columns() {
        let mut state = dmg_state();
        state.lcd.control.obj_enable = true;
        // row 0: leftmost pixel color 3, rest 0
        poke_tile_row(&mut state, 4, 0, 0x80, 0x80);
        poke_sprite(&mut state, 0, 16, 8, 4, 0x20); // x-flip

        let mut renderer = Renderer::new();
        renderer.render_line(&state);

        assert_eq!(renderer.frame.get_pixel(0, 0).color_number, 0);
        assert_eq!(renderer.frame.get_pixel(7, 0).color_number, 3);
    }

    #[test]
    fn tall_sprite_vertical_flip_swaps_tiles() {
        let mut state = dmg_state();
        state.lcd.control.obj_enable = true;
        state.lcd.control.obj_size = true;
        // top tile (6) color 1, bottom tile (7) color 3
        for row in 0..8 {
            poke_tile_row(&mut state, 6, row, 0xff, 0x00);
            poke_tile_row(&mut state, 7, row, 0xff, 0xff);
        }
        poke_sprite(&mut state, 0, 16, 8, 6, 0x40); // y-flip

        let mut renderer = Renderer::new();
        renderer.render_line(&state); // ly = 0, top row on screen

        // with y-flip the bottom tile shows on the top half
        assert_eq!(renderer.frame.get_pixel(0, 0).color_number, 3);
    }

    #[test]
    fn at_most_ten_sprites_per_line() {
        let mut state = dmg_state();
        state.lcd.control.obj_enable = true;
        for row in 0..8 {
            poke_tile_row(&mut state, 4, row, 0xff, 0xff);
        }
        // 12 sprites all covering line 0, spread across the row
        for i in 0..12 {
            poke_sprite(&mut state, i, 16, 8 + (i as u8) * 8, 4, 0);
        }

        let mut renderer = Renderer::new();
        renderer.render_line(&state);

        // the 11th and 12th sprites (x = 88, 96) were not selected
        assert_eq!(renderer.frame.get_pixel(80, 0).color_number, 0);
        assert_eq!(renderer.frame.get_pixel(88, 0).color_number, 0);
        // the 10th was
        assert_eq!(renderer.frame.get_pixel(72, 0).color_number, 3);
    }

    #[test]
    fn cgb_background_uses_attributes() {
        let mut state = PpuState::new(HardwareGeneration::Cgb);
        state.lcd.control.write(0x91);
        // palette 1, color 2 = blue-ish
        state.bg_color_palette.write_index(8 + 4);
        state.bg_color_palette.write_data(0x00);
        state.bg_color_palette.write_index(8 + 5);
        state.bg_color_palette.write_data(0x7c); // 0x7c00 = pure blue

        // tile 1: all color 2
        for row in 0..8 {
            state.vram[16 + row * 2 + 1] = 0xff;
        }
        state.vram[0x1800] = 1;
        // bank-1 attribute: palette 1, priority set
        state.vram[super::super::VRAM_BANK_SIZE + 0x1800] = 0x80 | 0x01;

        let mut renderer = Renderer::new();
        renderer.render_line(&state);

        let cell = renderer.frame.get_pixel(0, 0);
        assert_eq!(cell.color_number, 2);
        assert!(cell.priority);
        assert_eq!((cell.red, cell.green, cell.blue), (0, 0, 255));
    }
}
