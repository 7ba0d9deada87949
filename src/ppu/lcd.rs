/*!
 * LCD control/status registers and the scanline timing state machine.
 *
 * A line is 456 T-cycles: 80 of OAM search, a pixel-transfer window, and
 * horizontal blank for the remainder. 144 visible lines are followed by 10
 * lines of vertical blank, giving a 70224-cycle frame. The pixel-transfer
 * window is modelled as a fixed 172 cycles; real hardware stretches it with
 * sprite and window load (up to 289 cycles), which only moves the
 * mode-3/mode-0 boundary and is not observable through this crate's
 * contract.
 */

use log::trace;

use crate::component::TCycles;
use crate::interrupt::{Interrupt, InterruptRegs};

pub const OAM_SEARCH_CYCLES: TCycles = 80;
pub const PIXEL_TRANSFER_CYCLES: TCycles = 172;
pub const HBLANK_CYCLES: TCycles = 456 - OAM_SEARCH_CYCLES - PIXEL_TRANSFER_CYCLES;
pub const LINE_CYCLES: TCycles = 456;
pub const LINES_PER_FRAME: u8 = 154;
pub const FIRST_VBLANK_LINE: u8 = 144;

/// Represents the LCD Control register at 0xff40
#[derive(Debug, Clone, Copy)]
pub struct LcdControl {
    pub bg_enable: bool,
    pub obj_enable: bool,
    /// false: 8x8 sprites, true: 8x16
    pub obj_size: bool,
    /// false: background map at 0x9800, true: 0x9c00
    pub bg_tile_map_area: bool,
    /// false: 0x8800 addressing, true: 0x8000 addressing
    pub tile_data_area: bool,
    pub window_enable: bool,
    /// false: window map at 0x9800, true: 0x9c00
    pub window_tile_map_area: bool,
    pub lcd_enable: bool,
}

impl LcdControl {
    pub fn new() -> Self {
        Self {
            bg_enable: false,
            obj_enable: false,
            obj_size: false,
            bg_tile_map_area: false,
            tile_data_area: false,
            window_enable: false,
            window_tile_map_area: false,
            lcd_enable: false,
        }
    }

    pub fn read(&self) -> u8 {
        (self.bg_enable as u8)
            | (self.obj_enable as u8) << 1
            | (self.obj_size as u8) << 2
            | (self.bg_tile_map_area as u8) << 3
            | (self.tile_data_area as u8) << 4
            | (self.window_enable as u8) << 5
            | (self.window_tile_map_area as u8) << 6
            | (self.lcd_enable as u8) << 7
    }

    pub fn write(&mut self, value: u8) {
        self.bg_enable = value & 1 == 1;
        self.obj_enable = (value >> 1) & 1 == 1;
        self.obj_size = (value >> 2) & 1 == 1;
        self.bg_tile_map_area = (value >> 3) & 1 == 1;
        self.tile_data_area = (value >> 4) & 1 == 1;
        self.window_enable = (value >> 5) & 1 == 1;
        self.window_tile_map_area = (value >> 6) & 1 == 1;
        self.lcd_enable = (value >> 7) & 1 == 1;
    }
}

/// The four hardware timing modes, in STAT register encoding.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LcdMode {
    HBlank,
    VBlank,
    OamSearch,
    PixelTransfer,
}

impl LcdMode {
    pub fn bits(self) -> u8 {
        match self {
            LcdMode::HBlank => 0,
            LcdMode::VBlank => 1,
            LcdMode::OamSearch => 2,
            LcdMode::PixelTransfer => 3,
        }
    }
}

/// Represents the LCD Status register at 0xff41. The mode and line-compare
/// flag are read-only through the packed byte; only the interrupt-source
/// enables are writable.
#[derive(Debug, Clone, Copy)]
pub struct LcdStatus {
    pub mode: LcdMode,
    pub lyc_match: bool,
    pub hblank_interrupt_enable: bool,
    pub vblank_interrupt_enable: bool,
    pub oam_interrupt_enable: bool,
    pub lyc_interrupt_enable: bool,
}

impl LcdStatus {
    pub fn new() -> Self {
        Self {
            mode: LcdMode::HBlank,
            lyc_match: false,
            hblank_interrupt_enable: false,
            vblank_interrupt_enable: false,
            oam_interrupt_enable: false,
            lyc_interrupt_enable: false,
        }
    }

    pub fn read(&self) -> u8 {
        // bit 7 is unimplemented on hardware and reads as 1
        0x80 | self.mode.bits()
            | (self.lyc_match as u8) << 2
            | (self.hblank_interrupt_enable as u8) << 3
            | (self.vblank_interrupt_enable as u8) << 4
            | (self.oam_interrupt_enable as u8) << 5
            | (self.lyc_interrupt_enable as u8) << 6
    }

    pub fn write(&mut self, value: u8) {
        self.hblank_interrupt_enable = (value >> 3) & 1 == 1;
        self.vblank_interrupt_enable = (value >> 4) & 1 == 1;
        self.oam_interrupt_enable = (value >> 5) & 1 == 1;
        self.lyc_interrupt_enable = (value >> 6) & 1 == 1;
    }
}

pub struct Lcd {
    /// LY: current scanline, 0-153 (read only externally)
    pub ly: u8,
    /// LYC: line-compare target
    pub lyc: u8,
    pub control: LcdControl,
    pub stat: LcdStatus,
    /// One entry per STAT source (hblank, vblank, oam, lyc). The STAT
    /// interrupt fires on the rising edge of the OR of these.
    stat_interrupt_line: [bool; 4],

    /// Accumulated T-cycles not yet consumed by a mode boundary.
    t_acc: TCycles,
    /// Rows of the window rendered so far this frame. The window keeps its
    /// own row counter so hiding and re-showing it mid-frame resumes where it
    /// left off.
    pub window_line_counter: u8,

    /// Count of frames completed since reset, incremented at VBlank entry.
    pub frame_count: u128,
}

const STAT_SOURCE_HBLANK: usize = 0;
const STAT_SOURCE_VBLANK: usize = 1;
const STAT_SOURCE_OAM: usize = 2;
const STAT_SOURCE_LYC: usize = 3;

impl Lcd {
    pub fn new() -> Lcd {
        Lcd {
            ly: 0,
            lyc: 0,
            control: LcdControl::new(),
            stat: LcdStatus::new(),
            stat_interrupt_line: [false; 4],
            t_acc: 0,
            window_line_counter: 0,
            frame_count: 0,
        }
    }

    /// Cycles the current mode segment occupies before the next boundary.
    fn mode_cycles(&self) -> TCycles {
        match self.stat.mode {
            LcdMode::OamSearch => OAM_SEARCH_CYCLES,
            LcdMode::PixelTransfer => PIXEL_TRANSFER_CYCLES,
            LcdMode::HBlank => HBLANK_CYCLES,
            // vblank advances one whole line at a time
            LcdMode::VBlank => LINE_CYCLES,
        }
    }

    pub(crate) fn accumulate(&mut self, t_cycles: TCycles) {
        self.t_acc += t_cycles;
    }

    /// Consume one mode boundary if enough cycles have accumulated.
    pub(crate) fn try_consume_boundary(&mut self) -> bool {
        let budget = self.mode_cycles();
        if self.t_acc < budget {
            return false;
        }
        self.t_acc -= budget;
        true
    }

    pub(crate) fn change_mode(&mut self, mode: LcdMode, interrupts: &mut InterruptRegs) {
        trace!("mode {:?} -> {:?} at ly {}", self.stat.mode, mode, self.ly);
        self.stat.mode = mode;

        self.update_stat_interrupt_line(
            STAT_SOURCE_HBLANK,
            self.stat.hblank_interrupt_enable && mode == LcdMode::HBlank,
            interrupts,
        );
        self.update_stat_interrupt_line(
            STAT_SOURCE_VBLANK,
            self.stat.vblank_interrupt_enable && mode == LcdMode::VBlank,
            interrupts,
        );
        self.update_stat_interrupt_line(
            STAT_SOURCE_OAM,
            self.stat.oam_interrupt_enable && mode == LcdMode::OamSearch,
            interrupts,
        );
    }

    /// Advance to the next scanline, maintaining the window row counter and
    /// the line-compare flag. Wraps 153 -> 0.
    pub(crate) fn increment_ly(&mut self, wx: u8, wy: u8, interrupts: &mut InterruptRegs) {
        if self.control.window_enable
            && self.ly < FIRST_VBLANK_LINE
            && self.ly >= wy
            && wx <= 166
        {
            self.window_line_counter += 1;
        }

        self.ly = (self.ly + 1) % LINES_PER_FRAME;
        if self.ly == 0 {
            self.window_line_counter = 0;
        }

        self.compare_line(interrupts);
    }

    /// Recompute the line-compare flag. Fires STAT on the enabled false->true
    /// edge. Called on every LY change and on LYC writes.
    pub(crate) fn compare_line(&mut self, interrupts: &mut InterruptRegs) {
        self.stat.lyc_match = self.ly == self.lyc;
        self.update_stat_interrupt_line(
            STAT_SOURCE_LYC,
            self.stat.lyc_interrupt_enable && self.stat.lyc_match,
            interrupts,
        );
    }

    /// Handle a write to the control register, including LCD power
    /// transitions. Powering off holds the state machine: LY is forced to 0,
    /// the mode reports HBlank, and all memory unlocks.
    pub(crate) fn write_control(&mut self, value: u8) {
        let was_enabled = self.control.lcd_enable;
        self.control.write(value);

        if was_enabled && !self.control.lcd_enable {
            trace!("lcd powered off");
            self.ly = 0;
            self.t_acc = 0;
            self.window_line_counter = 0;
            self.stat.mode = LcdMode::HBlank;
            self.stat.lyc_match = self.lyc == 0;
            self.stat_interrupt_line = [false; 4];
        } else if !was_enabled && self.control.lcd_enable {
            trace!("lcd powered on");
            self.t_acc = 0;
            self.stat.mode = LcdMode::OamSearch;
            self.stat.lyc_match = self.ly == self.lyc;
        }
    }

    fn update_stat_interrupt_line(
        &mut self,
        index: usize,
        value: bool,
        interrupts: &mut InterruptRegs,
    ) {
        if self.stat_interrupt_line[index] == value {
            return;
        }

        if !value {
            self.stat_interrupt_line[index] = false;
            return;
        }

        // Or all the stat interrupt line values together; a source going high
        // only interrupts if the combined line was low.
        let old_line_value = self.stat_interrupt_line.iter().any(|&line| line);
        self.stat_interrupt_line[index] = true;
        if !old_line_value {
            interrupts.interrupt(Interrupt::Stat);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_register_packs_and_unpacks() {
        let mut control = LcdControl::new();
        control.write(0b1010_0101);
        assert!(control.lcd_enable);
        assert!(control.window_enable);
        assert!(control.bg_enable);
        assert!(control.obj_size);
        assert!(!control.obj_enable);
        assert_eq!(control.read(), 0b1010_0101);
    }

    #[test]
    fn status_register_keeps_mode_and_match_read_only() {
        let mut stat = LcdStatus::new();
        stat.mode = LcdMode::PixelTransfer;
        stat.lyc_match = true;

        // attempt to clear everything; only the enables may change
        stat.write(0x00);
        assert_eq!(stat.read() & 0b11, 3);
        assert_eq!(stat.read() & 0b100, 0b100);

        stat.write(0b0111_1000);
        assert!(stat.hblank_interrupt_enable);
        assert!(stat.vblank_interrupt_enable);
        assert!(stat.oam_interrupt_enable);
        assert!(stat.lyc_interrupt_enable);
        assert_eq!(stat.read() & 0x80, 0x80);
    }

    #[test]
    fn lyc_match_follows_ly() {
        let mut lcd = Lcd::new();
        let mut interrupts = InterruptRegs::new();
        lcd.lyc = 5;
        lcd.ly = 4;
        lcd.compare_line(&mut interrupts);
        assert!(!lcd.stat.lyc_match);

        lcd.increment_ly(0, 0, &mut interrupts);
        assert!(lcd.stat.lyc_match);
        // no enable bit set, so no interrupt
        assert_eq!(interrupts.interrupt_flag, 0);
    }

    #[test]
    fn lyc_interrupt_fires_on_enabled_edge_only() {
        let mut lcd = Lcd::new();
        let mut interrupts = InterruptRegs::new();
        lcd.stat.lyc_interrupt_enable = true;
        lcd.lyc = 1;

        lcd.increment_ly(0, 0, &mut interrupts);
        assert_eq!(interrupts.interrupt_flag, 0b10);

        // staying in match does not re-fire
        interrupts.interrupt_flag = 0;
        lcd.compare_line(&mut interrupts);
        assert_eq!(interrupts.interrupt_flag, 0);

        // leaving and re-entering the match fires again
        lcd.increment_ly(0, 0, &mut interrupts);
        assert_eq!(interrupts.interrupt_flag, 0);
        lcd.lyc = 2;
        lcd.compare_line(&mut interrupts);
        assert_eq!(interrupts.interrupt_flag, 0b10);
    }

    #[test]
    fn ly_wraps_after_last_line() {
        let mut lcd = Lcd::new();
        let mut interrupts = InterruptRegs::new();
        lcd.ly = 153;
        lcd.increment_ly(0, 0, &mut interrupts);
        assert_eq!(lcd.ly, 0);
    }

    #[test]
    fn vblank_stat_source_fires_on_mode_entry() {
        let mut lcd = Lcd::new();
        let mut interrupts = InterruptRegs::new();
        lcd.stat.vblank_interrupt_enable = true;

        lcd.change_mode(LcdMode::VBlank, &mut interrupts);
        assert_eq!(interrupts.interrupt_flag, 0b10);

        // the source stays high for the rest of vblank; no second edge
        interrupts.interrupt_flag = 0;
        lcd.change_mode(LcdMode::VBlank, &mut interrupts);
        assert_eq!(interrupts.interrupt_flag, 0);

        // leaving vblank drops the source, re-entry is a fresh edge
        lcd.change_mode(LcdMode::OamSearch, &mut interrupts);
        lcd.change_mode(LcdMode::VBlank, &mut interrupts);
        assert_eq!(interrupts.interrupt_flag, 0b10);
    }

    #[test]
    fn stat_line_suppresses_overlapping_sources() {
        let mut lcd = Lcd::new();
        let mut interrupts = InterruptRegs::new();
        lcd.stat.hblank_interrupt_enable = true;
        lcd.stat.oam_interrupt_enable = true;

        lcd.change_mode(LcdMode::HBlank, &mut interrupts);
        assert_eq!(interrupts.interrupt_flag, 0b10);

        // hblank line is still high when oam goes high in the same step
        interrupts.interrupt_flag = 0;
        lcd.change_mode(LcdMode::OamSearch, &mut interrupts);
        // hblank source dropped before oam rose, so this is a fresh edge
        assert_eq!(interrupts.interrupt_flag, 0b10);
    }

    #[test]
    fn powering_off_holds_and_resets_line() {
        let mut lcd = Lcd::new();
        lcd.write_control(0x80);
        assert_eq!(lcd.stat.mode, LcdMode::OamSearch);

        lcd.ly = 77;
        lcd.write_control(0x00);
        assert_eq!(lcd.ly, 0);
        assert_eq!(lcd.stat.mode, LcdMode::HBlank);
    }
}
