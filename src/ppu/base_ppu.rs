use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

use crate::color::{ColorBuffer, CorrectionMode, ShadeTheme};
use crate::component::{Address, Addressable, DmaByteSource, TCycles};
use crate::error::{Error, Result};
use crate::interrupt::{Interrupt, InterruptRegs};

use super::debug_view;
use super::dma::DmaUnit;
use super::lcd::{Lcd, LcdMode, FIRST_VBLANK_LINE};
use super::palette::{ColorPalette, MonochromePalette};
use super::renderer::Renderer;
use super::{HardwareGeneration, OamData, NUM_SPRITES, OAM_SIZE, VRAM_BANK_SIZE, VRAM_SIZE};

/// Everything the renderer reads: memory banks, registers, palettes, and
/// configuration. Split from `Ppu` so the renderer can borrow it immutably
/// while writing the frame.
pub struct PpuState {
    pub generation: HardwareGeneration,

    /// Both VRAM banks, back to back. Bank 1 is reachable only on the color
    /// generation but always allocated.
    pub(crate) vram: Vec<u8>,
    pub(crate) vram_bank: usize,
    /// Raw OAM table; the 40 sprite descriptors are views computed on read.
    pub(crate) oam: Vec<u8>,

    pub lcd: Lcd,

    pub(crate) background_palette: MonochromePalette,
    pub(crate) object_palette_0: MonochromePalette,
    pub(crate) object_palette_1: MonochromePalette,
    pub(crate) bg_color_palette: ColorPalette,
    pub(crate) obj_color_palette: ColorPalette,

    /// Register values
    pub scy: u8,
    pub scx: u8,
    pub wy: u8,
    pub wx: u8,

    pub(crate) dma: DmaUnit,

    pub(crate) correction_mode: CorrectionMode,
    pub(crate) brightness: f32,
    pub(crate) shade_theme: ShadeTheme,
}

impl PpuState {
    pub fn new(generation: HardwareGeneration) -> Self {
        Self {
            generation,
            vram: vec![0; VRAM_SIZE],
            vram_bank: 0,
            oam: vec![0; OAM_SIZE],
            lcd: Lcd::new(),
            background_palette: MonochromePalette::new(),
            object_palette_0: MonochromePalette::new(),
            object_palette_1: MonochromePalette::new(),
            bg_color_palette: ColorPalette::new(),
            obj_color_palette: ColorPalette::new(),
            scy: 0,
            scx: 0,
            wy: 0,
            wx: 0,
            dma: DmaUnit::new(),
            correction_mode: CorrectionMode::Scale,
            brightness: 1.0,
            shade_theme: ShadeTheme::Green,
        }
    }

    /// Renderer-side VRAM access: explicit bank, never locked.
    pub(crate) fn vram_byte(&self, bank: usize, offset: usize) -> u8 {
        self.vram[bank * VRAM_BANK_SIZE + offset]
    }

    /// Descriptor view of one OAM entry, computed from the raw table.
    pub(crate) fn oam_entry(&self, index: usize) -> OamData {
        debug_assert!(index < NUM_SPRITES);
        OamData::new(&self.oam[index * 4..index * 4 + 4])
    }

    /// External VRAM access is locked while the renderer owns it.
    fn vram_locked(&self) -> bool {
        self.lcd.control.lcd_enable && self.lcd.stat.mode == LcdMode::PixelTransfer
    }

    /// OAM is additionally locked during OAM search.
    fn oam_locked(&self) -> bool {
        self.lcd.control.lcd_enable
            && matches!(
                self.lcd.stat.mode,
                LcdMode::PixelTransfer | LcdMode::OamSearch
            )
    }

    fn is_cgb(&self) -> bool {
        self.generation == HardwareGeneration::Cgb
    }

    fn read(&self, address: Address) -> Result<u8> {
        let value = match address {
            0x8000..=0x9fff => {
                if self.vram_locked() {
                    // locked window reads an open bus; approximated as all-ones
                    0xff
                } else {
                    self.vram[self.vram_bank * VRAM_BANK_SIZE + (address - 0x8000)]
                }
            }
            0xfe00..=0xfe9f => {
                if self.oam_locked() {
                    0xff
                } else {
                    self.oam[address - 0xfe00]
                }
            }
            0xff40 => self.lcd.control.read(),
            0xff41 => self.lcd.stat.read(),
            0xff42 => self.scy,
            0xff43 => self.scx,
            0xff44 => self.lcd.ly,
            0xff45 => self.lcd.lyc,
            0xff46 => self.dma.source,
            0xff47 => self.background_palette.register_value,
            0xff48 => self.object_palette_0.register_value,
            0xff49 => self.object_palette_1.register_value,
            0xff4a => self.wy,
            0xff4b => self.wx,
            0xff4f => {
                if self.is_cgb() {
                    0xfe | self.vram_bank as u8
                } else {
                    0xff
                }
            }
            0xff68 => {
                if self.is_cgb() {
                    self.bg_color_palette.read_index()
                } else {
                    0xff
                }
            }
            0xff69 => {
                if self.is_cgb() && !self.vram_locked() {
                    self.bg_color_palette.read_data()
                } else {
                    0xff
                }
            }
            0xff6a => {
                if self.is_cgb() {
                    self.obj_color_palette.read_index()
                } else {
                    0xff
                }
            }
            0xff6b => {
                if self.is_cgb() && !self.vram_locked() {
                    self.obj_color_palette.read_data()
                } else {
                    0xff
                }
            }
            // mapped but meaningless addresses in the controller's windows
            0xff4c..=0xff6f => 0xff,
            _ => {
                return Err(Error::from_address_with_source(
                    address,
                    "ppu read".to_string(),
                ))
            }
        };

        Ok(value)
    }

    fn write(&mut self, address: Address, data: u8) -> Result<()> {
        match address {
            0x8000..=0x9fff => {
                if self.vram_locked() {
                    trace!("dropped vram write {:#04x} to {:#06x}", data, address);
                } else {
                    trace!("write to vram: {:#x} into {:#x}", data, address);
                    self.vram[self.vram_bank * VRAM_BANK_SIZE + (address - 0x8000)] = data;
                }
            }
            0xfe00..=0xfe9f => {
                if self.oam_locked() {
                    trace!("dropped oam write {:#04x} to {:#06x}", data, address);
                } else {
                    self.oam[address - 0xfe00] = data;
                }
            }
            0xff40 => self.lcd.write_control(data),
            0xff41 => self.lcd.stat.write(data),
            0xff42 => self.scy = data,
            0xff43 => self.scx = data,
            0xff44 => (), // ly: lcd y coordinate is read only
            0xff47 => self.background_palette.register_value = data,
            0xff48 => self.object_palette_0.register_value = data,
            0xff49 => self.object_palette_1.register_value = data,
            0xff4a => self.wy = data,
            0xff4b => self.wx = data,
            0xff4f => {
                if self.is_cgb() {
                    self.vram_bank = usize::from(data & 1);
                }
            }
            0xff68 => {
                if self.is_cgb() {
                    self.bg_color_palette.write_index(data);
                }
            }
            0xff69 => {
                if self.is_cgb() && !self.vram_locked() {
                    self.bg_color_palette.write_data(data);
                }
            }
            0xff6a => {
                if self.is_cgb() {
                    self.obj_color_palette.write_index(data);
                }
            }
            0xff6b => {
                if self.is_cgb() && !self.vram_locked() {
                    self.obj_color_palette.write_data(data);
                }
            }
            0xff4c..=0xff6f => (), // mapped but meaningless; silently dropped
            _ => {
                return Err(Error::from_address_with_source(
                    address,
                    "ppu write".to_string(),
                ))
            }
        }

        Ok(())
    }
}

/// The video controller: timing state machine, memory banks, registers,
/// renderer, and palette pipelines behind one set of entry points.
pub struct Ppu {
    pub(crate) state: PpuState,
    renderer: Renderer,
    interrupts: Rc<RefCell<InterruptRegs>>,
    dma_source: Option<Rc<RefCell<dyn DmaByteSource>>>,
}

impl Ppu {
    pub fn new(generation: HardwareGeneration, interrupts: Rc<RefCell<InterruptRegs>>) -> Self {
        Self {
            state: PpuState::new(generation),
            renderer: Renderer::new(),
            interrupts,
            dma_source: None,
        }
    }

    /// Return the controller to power-on state, optionally switching hardware
    /// generation. Collaborator wiring survives the reset.
    pub fn reset(&mut self, generation: HardwareGeneration) {
        self.state = PpuState::new(generation);
        self.renderer.frame.zero();
    }

    /// Supply the byte-read collaborator the OAM DMA unit copies through.
    pub fn set_dma_source(&mut self, source: Rc<RefCell<dyn DmaByteSource>>) {
        self.dma_source = Some(source);
    }

    pub fn hardware_generation(&self) -> HardwareGeneration {
        self.state.generation
    }

    /// Consume elapsed hardware cycles, crossing as many mode boundaries as
    /// they cover. Rendering, register updates, and interrupt edges all
    /// complete before this returns. Holds while the LCD is disabled.
    pub fn advance(&mut self, t_cycles: TCycles) -> Result<()> {
        if !self.state.lcd.control.lcd_enable {
            return Ok(());
        }

        self.state.lcd.accumulate(t_cycles);
        while self.state.lcd.try_consume_boundary() {
            let (wx, wy) = (self.state.wx, self.state.wy);
            let mut interrupts = self.interrupts.borrow_mut();
            match self.state.lcd.stat.mode {
                LcdMode::OamSearch => {
                    self.state
                        .lcd
                        .change_mode(LcdMode::PixelTransfer, &mut interrupts);
                }
                LcdMode::PixelTransfer => {
                    self.renderer.render_line(&self.state);
                    self.state.lcd.change_mode(LcdMode::HBlank, &mut interrupts);
                }
                LcdMode::HBlank => {
                    self.state.lcd.increment_ly(wx, wy, &mut interrupts);
                    if self.state.lcd.ly == FIRST_VBLANK_LINE {
                        self.state.lcd.change_mode(LcdMode::VBlank, &mut interrupts);
                        interrupts.interrupt(Interrupt::VBlank);
                        self.state.lcd.frame_count += 1;
                    } else {
                        self.state
                            .lcd
                            .change_mode(LcdMode::OamSearch, &mut interrupts);
                    }
                }
                LcdMode::VBlank => {
                    self.state.lcd.increment_ly(wx, wy, &mut interrupts);
                    if self.state.lcd.ly == 0 {
                        self.state
                            .lcd
                            .change_mode(LcdMode::OamSearch, &mut interrupts);
                    }
                }
            }
        }

        Ok(())
    }

    /// The finished 160x144 pixel buffer. Complete after entry into V-Blank;
    /// callers must not hold it across an `advance`.
    pub fn frame_buffer(&self) -> &ColorBuffer {
        &self.renderer.frame
    }

    pub fn clear_frame_buffer(&mut self) {
        self.renderer.frame.zero();
    }

    /// Frames completed since reset.
    pub fn frame_count(&self) -> u128 {
        self.state.lcd.frame_count
    }

    pub fn set_correction_mode(&mut self, mode: CorrectionMode) {
        self.state.correction_mode = mode;
    }

    /// Brightness for the correction transform, clamped to [0, 1].
    pub fn set_brightness(&mut self, value: f32) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::precondition("brightness must be finite"));
        }
        self.state.brightness = value.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn set_shade_theme(&mut self, theme: ShadeTheme) {
        self.state.shade_theme = theme;
    }

    /// 256x256 preview of the tile data banks, computed on demand.
    pub fn compute_tile_view(&self) -> ColorBuffer {
        debug_view::tile_view(&self.state)
    }

    /// 8x5 grid preview of the 40 sprite descriptors.
    pub fn compute_sprite_view(&self) -> ColorBuffer {
        debug_view::sprite_view(&self.state)
    }

    /// Swatch preview of the active palettes.
    pub fn compute_palette_view(&self) -> ColorBuffer {
        debug_view::palette_view(&self.state)
    }

    fn run_dma(&mut self, source: u8) -> Result<()> {
        let bus = self
            .dma_source
            .as_ref()
            .ok_or_else(|| Error::precondition("dma register written with no source configured"))?
            .clone();
        let mut bus = bus.borrow_mut();
        let state = &mut self.state;
        state.dma.transfer(source, &mut *bus, &mut state.oam)
    }
}

impl Addressable for Ppu {
    fn read_u8(&mut self, address: Address) -> Result<u8> {
        self.state.read(address)
    }

    fn write_u8(&mut self, address: Address, data: u8) -> Result<()> {
        match address {
            0xff45 => {
                self.state.lcd.lyc = data;
                let mut interrupts = self.interrupts.borrow_mut();
                self.state.lcd.compare_line(&mut interrupts);
                Ok(())
            }
            // the dma trigger bypasses arbitration entirely
            0xff46 => self.run_dma(data),
            _ => self.state.write(address, data),
        }
    }
}
